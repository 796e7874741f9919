//! Device inventory and command set, loaded once per run and read-only afterwards.

mod load;

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use crate::error::{InventoryError, SessionError};

pub use load::{parse_inventory, FileInventory, StaticInventory};

/// One device to inspect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceSpec {
    pub id: String,
    pub host: String,
    pub port: u16,
    pub credentials: Credentials,
}

impl DeviceSpec {
    pub fn new(id: impl Into<String>, host: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            host: host.into(),
            port: 22,
            credentials: Credentials {
                username: username.into(),
                secret: Secret::None,
            },
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_secret(mut self, secret: Secret) -> Self {
        self.credentials.secret = secret;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub secret: Secret,
}

/// Where the device password (or key) comes from.
#[derive(Clone, PartialEq, Eq)]
pub enum Secret {
    Password(String),
    /// Name of an environment variable holding the password.
    Env(String),
    KeyFile(PathBuf),
    /// Agent or default keys.
    None,
}

impl Secret {
    /// Resolve to a password, if this secret is password based.
    ///
    /// An unresolvable reference is an authentication fault: retrying cannot fix it.
    pub fn resolve_password(&self) -> Result<Option<String>, SessionError> {
        match self {
            Self::Password(p) => Ok(Some(p.clone())),
            Self::Env(var) => match std::env::var(var) {
                Ok(v) if !v.is_empty() => Ok(Some(v)),
                _ => Err(SessionError::Authentication(format!(
                    "secret reference ${var} is not set"
                ))),
            },
            Self::KeyFile(_) | Self::None => Ok(None),
        }
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Password(_) => f.write_str("Password(<redacted>)"),
            Self::Env(var) => write!(f, "Env({var})"),
            Self::KeyFile(path) => write!(f, "KeyFile({})", path.display()),
            Self::None => f.write_str("None"),
        }
    }
}

/// Ordered diagnostic commands shared by every device of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSet(Arc<[String]>);

impl CommandSet {
    pub fn new<I, S>(commands: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(commands.into_iter().map(Into::into).collect())
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Inventory {
    pub devices: Vec<DeviceSpec>,
    /// Overrides the configured command set when present.
    pub commands: Option<CommandSet>,
}

impl Inventory {
    pub fn new(devices: Vec<DeviceSpec>) -> Self {
        Self {
            devices,
            commands: None,
        }
    }

    pub fn validate(&self) -> Result<(), InventoryError> {
        let mut seen = std::collections::HashSet::new();
        for (index, device) in self.devices.iter().enumerate() {
            if device.id.trim().is_empty() {
                return Err(InventoryError::EmptyField { index, field: "id" });
            }
            if device.host.trim().is_empty() {
                return Err(InventoryError::EmptyField {
                    index,
                    field: "host",
                });
            }
            if device.credentials.username.trim().is_empty() {
                return Err(InventoryError::EmptyField {
                    index,
                    field: "username",
                });
            }
            if !seen.insert(device.id.as_str()) {
                return Err(InventoryError::DuplicateId(device.id.clone()));
            }
        }
        if matches!(&self.commands, Some(c) if c.is_empty()) {
            return Err(InventoryError::EmptyCommandSet);
        }
        Ok(())
    }
}

/// Loads the inventory at run start.
#[async_trait::async_trait]
pub trait InventorySource: Send + Sync {
    async fn load(&self) -> Result<Inventory, InventoryError>;

    fn describe(&self) -> String;
}
