use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::InventoryError;

use super::{CommandSet, Credentials, DeviceSpec, Inventory, InventorySource, Secret};

#[derive(Debug, Deserialize)]
struct InventoryFile {
    #[serde(default)]
    commands: Option<Vec<String>>,
    #[serde(default)]
    devices: Vec<DeviceEntry>,
}

#[derive(Debug, Deserialize)]
struct DeviceEntry {
    #[serde(default, alias = "hostname")]
    id: Option<String>,
    #[serde(alias = "ip")]
    host: String,
    #[serde(default = "default_port")]
    port: u16,
    username: String,
    #[serde(default)]
    password: Option<String>,
    #[serde(default)]
    password_env: Option<String>,
    #[serde(default)]
    key_file: Option<PathBuf>,
}

fn default_port() -> u16 {
    22
}

impl DeviceEntry {
    fn into_spec(self) -> DeviceSpec {
        let secret = if let Some(p) = self.password {
            Secret::Password(p)
        } else if let Some(var) = self.password_env {
            Secret::Env(var)
        } else if let Some(path) = self.key_file {
            Secret::KeyFile(path)
        } else {
            Secret::None
        };
        let id = self
            .id
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| self.host.clone());

        DeviceSpec {
            id,
            host: self.host,
            port: self.port,
            credentials: Credentials {
                username: self.username,
                secret,
            },
        }
    }
}

/// Parse an inventory document. `origin` is only used in error messages.
pub fn parse_inventory(s: &str, origin: &Path) -> Result<Inventory, InventoryError> {
    let file: InventoryFile = toml::from_str(s).map_err(|e| InventoryError::Parse {
        path: origin.to_path_buf(),
        message: e.to_string(),
    })?;

    let inventory = Inventory {
        devices: file.devices.into_iter().map(DeviceEntry::into_spec).collect(),
        commands: file.commands.map(CommandSet::new),
    };
    inventory.validate()?;
    Ok(inventory)
}

/// TOML inventory file on disk.
#[derive(Debug, Clone)]
pub struct FileInventory {
    path: PathBuf,
}

impl FileInventory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl InventorySource for FileInventory {
    async fn load(&self) -> Result<Inventory, InventoryError> {
        let s = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|source| InventoryError::Io {
                path: self.path.clone(),
                source,
            })?;
        parse_inventory(&s, &self.path)
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Inventory held in memory, for embedding and tests.
#[derive(Debug, Clone)]
pub struct StaticInventory(pub Inventory);

#[async_trait]
impl InventorySource for StaticInventory {
    async fn load(&self) -> Result<Inventory, InventoryError> {
        self.0.validate()?;
        Ok(self.0.clone())
    }

    fn describe(&self) -> String {
        format!("static ({} devices)", self.0.devices.len())
    }
}
