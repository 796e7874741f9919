pub mod strategies;

pub use strategies::{BackoffRetry, Growth};
