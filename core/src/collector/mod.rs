//! Fleet-wide collection: one session per device, bounded concurrency, results in
//! inventory order.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::config::CollectorOptions;
use crate::error::DeviceError;
use crate::executor::{execute_indexed, run_with_retry, RetryStrategy, StageContext};
use crate::inventory::{CommandSet, DeviceSpec};
use crate::record::RawCaptureResult;
use crate::session::{SessionClient, SessionTransport};

/// Finished captures forwarded to the analysis stage as they complete.
pub type CaptureSender = mpsc::Sender<(usize, RawCaptureResult)>;

#[derive(Clone)]
pub struct FleetCollector {
    client: SessionClient,
    concurrency: usize,
    retry: Arc<dyn RetryStrategy>,
}

impl FleetCollector {
    /// `concurrency` is the collection bound C; values below 1 are raised to 1.
    pub fn new(client: SessionClient, concurrency: usize, retry: Arc<dyn RetryStrategy>) -> Self {
        Self {
            client,
            concurrency: concurrency.max(1),
            retry,
        }
    }

    /// Collector over `transport` with the timeouts, bound and retry of `opts`.
    pub fn from_options(transport: Arc<dyn SessionTransport>, opts: &CollectorOptions) -> Self {
        Self::new(
            SessionClient::new(transport, opts.connect_timeout, opts.command_timeout),
            opts.concurrency,
            opts.retry.clone(),
        )
    }

    /// Capture every device. Always returns exactly `devices.len()` results, in order.
    ///
    /// Devices not yet dispatched when the run is cancelled get a `Cancelled` capture.
    pub async fn collect(
        &self,
        devices: &[DeviceSpec],
        commands: &CommandSet,
        ctx: &StageContext,
        forward: Option<CaptureSender>,
    ) -> Vec<RawCaptureResult> {
        let forward = forward.as_ref();

        execute_indexed(devices, self.concurrency, |index, device| async move {
            let capture = self.capture_one(device, commands, ctx).await;

            if capture.is_success() {
                tracing::debug!(device = %device.id, attempts = capture.attempts, "captured");
            } else if let Some(err) = &capture.error {
                tracing::warn!(device = %device.id, kind = err.kind(), error = %err, "capture failed");
            }
            if let Some(state) = &ctx.state {
                state.record_capture(index, &device.id, capture.is_success());
            }
            if let Some(tx) = forward {
                // The receiver only goes away when analysis has already given up.
                let _ = tx.send((index, capture.clone())).await;
            }
            capture
        })
        .await
    }

    async fn capture_one(
        &self,
        device: &DeviceSpec,
        commands: &CommandSet,
        ctx: &StageContext,
    ) -> RawCaptureResult {
        if ctx.cancel.is_cancelled() {
            return RawCaptureResult::failed(&device.id, DeviceError::Cancelled).with_attempts(0);
        }

        let client = &self.client;
        let (outcome, attempts) =
            run_with_retry(self.retry.as_ref(), &ctx.cancel, &device.id, |_| async move {
                client
                    .collect(device, commands)
                    .await
                    .map_err(DeviceError::from)
            })
            .await;

        match outcome {
            Ok(text) => RawCaptureResult::success(&device.id, text),
            Err(err) => RawCaptureResult::failed(&device.id, err),
        }
        .with_attempts(attempts)
    }
}
