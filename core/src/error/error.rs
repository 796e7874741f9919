use thiserror::Error;

use crate::state::TransitionError;

use super::store::{ArchiveError, InventoryError};

/// Run-level fatal conditions. Per-device faults never surface here.
#[derive(Error, Debug)]
pub enum RunError {
    #[error("inventory load failed: {0}")]
    InventoryLoad(#[from] InventoryError),

    #[error("no devices configured")]
    NoDevices,

    #[error("archive store unwritable: {0}")]
    Archive(#[from] ArchiveError),

    #[error("another run is already in progress")]
    AlreadyRunning,

    #[error("invalid phase transition: {0}")]
    Transition(#[from] TransitionError),
}
