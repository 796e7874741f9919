pub mod device;
#[allow(clippy::module_inception)]
pub mod error;
pub mod store;

pub use device::{DeviceError, InferenceError, SessionError};
pub use error::RunError;
pub use store::{ArchiveError, InventoryError};
