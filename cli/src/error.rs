use netsentinel_core::error::{ArchiveError, InventoryError, RunError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("config error: {0}")]
    Config(String),
    #[error("{0}")]
    Inventory(#[from] InventoryError),
    #[error("{0}")]
    Archive(#[from] ArchiveError),
    #[error("inference endpoint unavailable: {0}")]
    InferenceUnavailable(String),
    #[error("run failed: {0}")]
    Run(#[from] RunError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("anyhow error: {0}")]
    Anyhow(#[from] anyhow::Error),
}

/// Exit status of a run that finished but is partial (device failures or cancellation).
pub const EXIT_PARTIAL: i32 = 2;

impl CliError {
    // 0: success
    // 2: partial run (not an error)
    // 11: config / inventory error
    // 20: archive / IO error
    // 30: inference endpoint unavailable
    // 50: internal/uncategorized
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) | Self::Inventory(_) => 11,
            Self::Archive(_) | Self::Io(_) => 20,
            Self::InferenceUnavailable(_) => 30,
            Self::Run(run) => match run {
                RunError::InventoryLoad(_) | RunError::NoDevices => 11,
                RunError::Archive(_) => 20,
                RunError::AlreadyRunning | RunError::Transition(_) => 50,
            },
            Self::Anyhow(_) => 50,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(CliError::Config("bad".into()).exit_code(), 11);
        assert_eq!(CliError::Run(RunError::NoDevices).exit_code(), 11);
        assert_eq!(
            CliError::Run(RunError::Archive(ArchiveError::NotFound("r".into()))).exit_code(),
            20
        );
        assert_eq!(
            CliError::Archive(ArchiveError::NotFound("r".into())).exit_code(),
            20
        );
        assert_eq!(CliError::InferenceUnavailable("down".into()).exit_code(), 30);
        assert_eq!(CliError::Run(RunError::AlreadyRunning).exit_code(), 50);
    }
}
