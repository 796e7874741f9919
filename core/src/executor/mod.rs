//! Bounded per-stage scheduling shared by collection and analysis.
//!
//! # Architecture
//!
//! ```text
//! &[DeviceSpec] / Receiver<(index, capture)>
//!   ↓
//! Semaphore(C | M) + FuturesUnordered
//!   ↓
//! run_with_retry(RetryStrategy, CancelToken)
//!   ↓
//! slots[index] → Vec<Result> in inventory order
//! ```

mod cancel;
mod context;
mod scheduler;
pub mod traits;

pub use cancel::CancelToken;
pub use context::StageContext;
pub use scheduler::{execute_indexed, run_with_retry};
pub use traits::{FixedRetry, NoRetry, RetryStrategy};
