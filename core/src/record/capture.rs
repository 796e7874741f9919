use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DeviceError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResultStatus {
    Success,
    Failed,
}

/// One device's raw diagnostic output for one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawCaptureResult {
    pub device_id: String,
    pub status: ResultStatus,
    pub raw_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<DeviceError>,
    pub captured_at: DateTime<Utc>,
    /// Session attempts made, including the final one. Zero when never dispatched.
    #[serde(default)]
    pub attempts: u32,
}

impl RawCaptureResult {
    pub fn success(device_id: impl Into<String>, raw_text: String) -> Self {
        Self {
            device_id: device_id.into(),
            status: ResultStatus::Success,
            raw_text,
            error: None,
            captured_at: Utc::now(),
            attempts: 1,
        }
    }

    pub fn failed(device_id: impl Into<String>, error: DeviceError) -> Self {
        Self {
            device_id: device_id.into(),
            status: ResultStatus::Failed,
            raw_text: String::new(),
            error: Some(error),
            captured_at: Utc::now(),
            attempts: 1,
        }
    }

    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts;
        self
    }

    pub fn is_success(&self) -> bool {
        self.status == ResultStatus::Success
    }
}

/// Model-generated analysis of one capture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub device_id: String,
    pub report_text: String,
    pub status: ResultStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<DeviceError>,
    pub analyzed_at: DateTime<Utc>,
    /// Inference attempts made. Zero when inference was skipped.
    #[serde(default)]
    pub attempts: u32,
}

impl AnalysisResult {
    pub fn success(device_id: impl Into<String>, report_text: String, attempts: u32) -> Self {
        Self {
            device_id: device_id.into(),
            report_text,
            status: ResultStatus::Success,
            error: None,
            analyzed_at: Utc::now(),
            attempts,
        }
    }

    pub fn failed(device_id: impl Into<String>, error: DeviceError, attempts: u32) -> Self {
        Self {
            device_id: device_id.into(),
            report_text: String::new(),
            status: ResultStatus::Failed,
            error: Some(error),
            analyzed_at: Utc::now(),
            attempts,
        }
    }

    /// Analysis for a capture that failed: inference is skipped and the capture error is kept.
    pub fn mirror_capture(capture: &RawCaptureResult) -> Self {
        let error = capture.error.clone().unwrap_or(DeviceError::Cancelled);
        Self::failed(capture.device_id.clone(), error, 0)
    }

    pub fn is_success(&self) -> bool {
        self.status == ResultStatus::Success
    }
}
