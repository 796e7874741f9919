use std::sync::Arc;
use std::time::Duration;

use crate::error::SessionError;
use crate::inventory::{CommandSet, DeviceSpec};
use crate::record::RawCaptureResult;

use super::{RemoteSession, SessionTransport};

const CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

pub fn capture_header(device: &DeviceSpec) -> String {
    format!("=== Device: {} ({}) ===\n", device.id, device.host)
}

/// Drives a [`SessionTransport`] for a single device with hard deadlines.
#[derive(Clone)]
pub struct SessionClient {
    transport: Arc<dyn SessionTransport>,
    connect_timeout: Duration,
    command_timeout: Duration,
}

impl SessionClient {
    pub fn new(
        transport: Arc<dyn SessionTransport>,
        connect_timeout: Duration,
        command_timeout: Duration,
    ) -> Self {
        Self {
            transport,
            connect_timeout,
            command_timeout,
        }
    }

    /// Open, run every command in order, close. The session is closed on every
    /// path once it was opened.
    pub async fn collect(
        &self,
        device: &DeviceSpec,
        commands: &CommandSet,
    ) -> Result<String, SessionError> {
        let mut session = match tokio::time::timeout(
            self.connect_timeout,
            self.transport.open(device),
        )
        .await
        {
            Ok(opened) => opened?,
            Err(_) => {
                return Err(SessionError::Connection(format!(
                    "no session to {}:{} within {}ms",
                    device.host,
                    device.port,
                    self.connect_timeout.as_millis()
                )))
            }
        };

        let result = self.run_all(session.as_mut(), device, commands).await;

        if tokio::time::timeout(CLOSE_TIMEOUT, session.close())
            .await
            .is_err()
        {
            tracing::warn!(device = %device.id, "session close timed out");
        }

        result
    }

    /// Same as [`collect`](Self::collect) with the outcome folded into a capture record.
    pub async fn capture(&self, device: &DeviceSpec, commands: &CommandSet) -> RawCaptureResult {
        match self.collect(device, commands).await {
            Ok(text) => RawCaptureResult::success(&device.id, text),
            Err(err) => RawCaptureResult::failed(&device.id, err.into()),
        }
    }

    async fn run_all(
        &self,
        session: &mut dyn RemoteSession,
        device: &DeviceSpec,
        commands: &CommandSet,
    ) -> Result<String, SessionError> {
        let mut out = capture_header(device);

        for command in commands.iter() {
            let output = tokio::time::timeout(self.command_timeout, session.run(command))
                .await
                .map_err(|_| SessionError::CommandTimeout {
                    command: command.to_string(),
                    timeout_ms: self.command_timeout.as_millis() as u64,
                })??;

            tracing::debug!(device = %device.id, command, bytes = output.len(), "command done");
            out.push_str(&format!("\n[Command: {command}]\n{output}\n"));
        }

        Ok(out)
    }
}
