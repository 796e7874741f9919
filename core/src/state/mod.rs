//! # Run state
//!
//! Phase state machine, per-stage progress counters and lifecycle events for the
//! active run. Readers poll a `watch` snapshot or subscribe to a `broadcast` of
//! [`RunEvent`]s; neither can block the pipeline.

pub mod manager;
pub mod transitions;
pub mod types;

pub use manager::StateManager;
pub use transitions::{StateTransition, TransitionError};
pub use types::{ProgressSnapshot, RunEvent, RunPhase, StageProgress};
