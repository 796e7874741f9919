use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Faults raised while talking to one device over a remote session.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// Host unreachable, refused, reset or the login prompt never appeared.
    #[error("connection error: {0}")]
    Connection(String),

    #[error("authentication failed: {0}")]
    Authentication(String),

    #[error("command '{command}' timed out after {timeout_ms}ms")]
    CommandTimeout { command: String, timeout_ms: u64 },
}

/// Faults raised by the local inference endpoint.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InferenceError {
    #[error("inference timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("inference endpoint unavailable: {0}")]
    Unavailable(String),

    /// The endpoint answered but the answer is unusable (4xx, empty text, bad body).
    #[error("inference rejected: {0}")]
    Rejected(String),
}

/// Per-device fault as recorded in capture and analysis results.
///
/// Every fault that happens below the device boundary ends up here and is persisted
/// with the run; nothing of this type ever aborts a run.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum DeviceError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("authentication failed: {0}")]
    Authentication(String),

    #[error("command '{command}' timed out after {timeout_ms}ms")]
    CommandTimeout { command: String, timeout_ms: u64 },

    #[error("inference timed out after {timeout_ms}ms")]
    InferenceTimeout { timeout_ms: u64 },

    #[error("inference endpoint unavailable: {0}")]
    InferenceUnavailable(String),

    #[error("inference rejected: {0}")]
    InferenceRejected(String),

    #[error("run cancelled before this device was processed")]
    Cancelled,
}

impl DeviceError {
    /// Authentication, rejected inference and cancellation are never retried.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Connection(_)
                | Self::CommandTimeout { .. }
                | Self::InferenceTimeout { .. }
                | Self::InferenceUnavailable(_)
        )
    }

    /// Stable snake_case name used in logs and the report.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Connection(_) => "connection",
            Self::Authentication(_) => "authentication",
            Self::CommandTimeout { .. } => "command_timeout",
            Self::InferenceTimeout { .. } => "inference_timeout",
            Self::InferenceUnavailable(_) => "inference_unavailable",
            Self::InferenceRejected(_) => "inference_rejected",
            Self::Cancelled => "cancelled",
        }
    }
}

impl From<SessionError> for DeviceError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::Connection(msg) => Self::Connection(msg),
            SessionError::Authentication(msg) => Self::Authentication(msg),
            SessionError::CommandTimeout {
                command,
                timeout_ms,
            } => Self::CommandTimeout {
                command,
                timeout_ms,
            },
        }
    }
}

impl From<InferenceError> for DeviceError {
    fn from(err: InferenceError) -> Self {
        match err {
            InferenceError::Timeout { timeout_ms } => Self::InferenceTimeout { timeout_ms },
            InferenceError::Unavailable(msg) => Self::InferenceUnavailable(msg),
            InferenceError::Rejected(msg) => Self::InferenceRejected(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_classification() {
        assert!(DeviceError::Connection("refused".into()).is_retryable());
        assert!(DeviceError::CommandTimeout {
            command: "display version".into(),
            timeout_ms: 10
        }
        .is_retryable());
        assert!(DeviceError::InferenceUnavailable("down".into()).is_retryable());
        assert!(!DeviceError::Authentication("denied".into()).is_retryable());
        assert!(!DeviceError::InferenceRejected("404".into()).is_retryable());
        assert!(!DeviceError::Cancelled.is_retryable());
    }

    #[test]
    fn test_session_error_keeps_message() {
        let err: DeviceError = SessionError::Connection("no route to host".into()).into();
        assert_eq!(err.to_string(), "connection error: no route to host");
    }

    #[test]
    fn test_serde_tagging() {
        let err = DeviceError::InferenceTimeout { timeout_ms: 300 };
        let json = serde_json::to_string(&err).unwrap();
        assert_eq!(
            json,
            r#"{"kind":"inference_timeout","detail":{"timeout_ms":300}}"#
        );
        let back: DeviceError = serde_json::from_str(&json).unwrap();
        assert_eq!(back, err);

        let json = serde_json::to_string(&DeviceError::Cancelled).unwrap();
        assert_eq!(json, r#"{"kind":"cancelled"}"#);
    }
}
