//! Run orchestration state machine.
//!
//! ```text
//! Idle → Collecting → Analyzing → Archiving → Completed
//!   └──────────┴──────────┴───────────┴──→ Failed   (run-level fatal only)
//! ```
//!
//! Collection and analysis overlap: each capture is handed to the analysis stage as
//! soon as it finishes. The phase moves to `Analyzing` once every capture is in.

mod engine;

pub use engine::{new_run_id, Orchestrator};
