// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Persistence of receiver configurations.
//!
//! All configured receivers are kept in one pretty-printed JSON file:
//!
//! ```json
//! {
//!   "devices": [
//!     { "identifier": "192.168.1.40_53", "name": "Den", "connection_type": "TCP", ... }
//!   ]
//! }
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::event::DeviceId;
use crate::manager::DeviceConfig;

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoredConfig {
    #[serde(default)]
    devices: Vec<DeviceConfig>,
}

/// Receiver configurations backed by a JSON file.
///
/// Mutations are written through immediately.
///
/// # Examples
///
/// ```no_run
/// use nadav_lib::manager::DeviceConfig;
/// use nadav_lib::persistence::ConfigStore;
///
/// # fn example() -> Result<(), nadav_lib::error::ConfigError> {
/// let mut store = ConfigStore::open("/var/lib/nadav/config.json")?;
/// store.upsert(DeviceConfig::tcp("192.168.1.40").with_name("Den"))?;
///
/// for config in store.all() {
///     println!("{} -> {}", config.identifier, config.address());
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ConfigStore {
    path: PathBuf,
    devices: Vec<DeviceConfig>,
}

impl ConfigStore {
    /// Loads the store at `path`. A missing file yields an empty store.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Io` if the file cannot be read and
    /// `ConfigError::Json` if it is malformed.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        if !path.exists() {
            tracing::info!(path = %path.display(), "no config file, starting empty");
            return Ok(Self {
                path,
                devices: Vec::new(),
            });
        }

        let contents = fs::read_to_string(&path)?;
        let stored: StoredConfig = serde_json::from_str(&contents)?;
        tracing::info!(
            path = %path.display(),
            devices = stored.devices.len(),
            "loaded configuration"
        );
        Ok(Self {
            path,
            devices: stored.devices,
        })
    }

    /// Returns the backing file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns all configurations in insertion order.
    #[must_use]
    pub fn all(&self) -> &[DeviceConfig] {
        &self.devices
    }

    /// Returns the configuration with `id`.
    #[must_use]
    pub fn get(&self, id: &DeviceId) -> Option<&DeviceConfig> {
        self.devices.iter().find(|config| &config.identifier == id)
    }

    /// Returns `true` if a configuration with `id` exists.
    #[must_use]
    pub fn contains(&self, id: &DeviceId) -> bool {
        self.get(id).is_some()
    }

    /// Returns the number of configurations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.devices.len()
    }

    /// Returns `true` if no receivers are configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Adds `config`, replacing any configuration with the same identifier,
    /// and saves.
    ///
    /// # Errors
    ///
    /// Returns the validation error for an invalid configuration, or the
    /// error that prevented saving.
    pub fn upsert(&mut self, config: DeviceConfig) -> Result<(), ConfigError> {
        config.validate()?;
        match self
            .devices
            .iter_mut()
            .find(|existing| existing.identifier == config.identifier)
        {
            Some(existing) => *existing = config,
            None => self.devices.push(config),
        }
        self.save()
    }

    /// Removes the configuration with `id` and saves.
    ///
    /// Returns `false` if there was none.
    ///
    /// # Errors
    ///
    /// Returns the error that prevented saving.
    pub fn remove(&mut self, id: &DeviceId) -> Result<bool, ConfigError> {
        let before = self.devices.len();
        self.devices.retain(|config| &config.identifier != id);
        if self.devices.len() == before {
            return Ok(false);
        }
        self.save()?;
        Ok(true)
    }

    /// Writes all configurations, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Io` if the file cannot be written.
    pub fn save(&self) -> Result<(), ConfigError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let stored = StoredConfig {
            devices: self.devices.clone(),
        };
        fs::write(&self.path, serde_json::to_string_pretty(&stored)?)?;

        tracing::info!(path = %self.path.display(), "saved configuration");
        Ok(())
    }
}
