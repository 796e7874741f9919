pub mod retry;

pub use retry::{BackoffRetry, Growth};
