//! Remote command sessions: one device, one session, an ordered command list.

mod client;

use async_trait::async_trait;

use crate::error::SessionError;
use crate::inventory::DeviceSpec;

pub use client::{capture_header, SessionClient};

/// Opens remote sessions. Implementations only deal with the wire; deadlines are
/// enforced by [`SessionClient`].
#[async_trait]
pub trait SessionTransport: Send + Sync {
    fn name(&self) -> &str;

    /// Connect and authenticate; resolves once the device is ready for commands.
    async fn open(&self, device: &DeviceSpec) -> Result<Box<dyn RemoteSession>, SessionError>;
}

/// An authenticated session on one device.
#[async_trait]
pub trait RemoteSession: Send {
    /// Run one command and return its cleaned output.
    async fn run(&mut self, command: &str) -> Result<String, SessionError>;

    /// Release the session. Must be safe to call after a failed or abandoned `run`.
    async fn close(&mut self);
}
