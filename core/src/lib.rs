//! Fleet inspection pipeline: concurrent device collection, local-model analysis and
//! a write-once run archive.

pub mod analysis;
pub mod archive;
pub mod collector;
pub mod config;
pub mod error;
pub mod executor;
pub mod inference;
pub mod inventory;
pub mod orchestrator;
pub mod record;
pub mod session;
pub mod state;

pub use archive::{ArchiveStore, MemoryArchiveStore};
pub use config::{AppConfig, RunConfig};
pub use error::{ArchiveError, DeviceError, InferenceError, InventoryError, RunError, SessionError};
pub use executor::{CancelToken, RetryStrategy};
pub use inference::{InferenceBackend, InferenceClient};
pub use inventory::{CommandSet, DeviceSpec, FileInventory, Inventory, InventorySource, Secret};
pub use orchestrator::Orchestrator;
pub use record::{RunRecord, RunSummary, RunVerdict};
pub use session::{RemoteSession, SessionTransport};
pub use state::{ProgressSnapshot, RunEvent, RunPhase};
