//! Write-once result records produced by a run.

mod capture;
mod run;

pub use capture::{AnalysisResult, RawCaptureResult, ResultStatus};
pub use run::{DeviceRef, DeviceResult, RunRecord, RunStatus, RunSummary, RunVerdict};
