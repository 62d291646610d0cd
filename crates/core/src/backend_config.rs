//! The backend's main configuration object, as edited through
//! `GET/POST /api/config`.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

pub const MIN_SERVER_WEIGHT: u32 = 1;
pub const MAX_SERVER_WEIGHT: u32 = 100;

/// One generation server entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerEntry {
    #[serde(default)]
    pub address: String,
    #[serde(default = "default_weight")]
    pub weight: u32,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_weight() -> u32 {
    MIN_SERVER_WEIGHT
}

fn default_enabled() -> bool {
    true
}

impl ServerEntry {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            weight: default_weight(),
            enabled: true,
        }
    }
}

/// Main configuration object.
///
/// Fields this client does not edit are kept in `extra` so a save never
/// drops them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BackendConfig {
    #[serde(default)]
    pub servers: Vec<ServerEntry>,
    #[serde(default)]
    pub auto_save: bool,
    #[serde(default)]
    pub auto_zip: bool,
    #[serde(default)]
    pub default_workflow: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl BackendConfig {
    /// Drop server rows with an empty address and trim the rest.
    pub fn normalize(&mut self) {
        self.servers.retain(|s| !s.address.trim().is_empty());
        for server in &mut self.servers {
            server.address = server.address.trim().to_string();
        }
    }

    /// Check server weights are within `1..=100`.
    pub fn validate(&self) -> Result<(), CoreError> {
        for server in &self.servers {
            if !(MIN_SERVER_WEIGHT..=MAX_SERVER_WEIGHT).contains(&server.weight) {
                return Err(CoreError::Validation(format!(
                    "Server '{}' weight must be between {MIN_SERVER_WEIGHT} and {MAX_SERVER_WEIGHT}, got {}",
                    server.address, server.weight
                )));
            }
        }
        Ok(())
    }

    /// Add a server or update the weight/enabled flag of an existing one.
    pub fn upsert_server(&mut self, entry: ServerEntry) {
        match self.servers.iter_mut().find(|s| s.address == entry.address) {
            Some(existing) => *existing = entry,
            None => self.servers.push(entry),
        }
    }

    /// Remove a server by address. Returns whether anything was removed.
    pub fn remove_server(&mut self, address: &str) -> bool {
        let before = self.servers.len();
        self.servers.retain(|s| s.address != address);
        self.servers.len() != before
    }
}
