// Copyright 2025 Sushanth (https://github.com/sushanthpy)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Config file for the `reactlog` binary
//!
//! ```toml
//! [kernel]
//! enabled = true
//! max_plugin_failures = 3
//!
//! [remote_log]
//! endpoint = "http://localhost:4318/logs"
//! batch_size = 50
//! flush_interval_ms = 5000
//! sample_rate = 1.0
//! ```

use anyhow::{Context, Result};
use reactlog_core::KernelSettings;
use reactlog_plugins::RemoteLogConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CliConfig {
    #[serde(default)]
    pub kernel: KernelSettings,

    /// Remote logging is off unless this table is present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_log: Option<RemoteLogConfig>,
}

impl CliConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml(&raw).with_context(|| format!("Invalid config file {}", path.display()))
    }

    pub fn from_toml(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw).context("Failed to parse TOML")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.kernel.validate()?;
        if let Some(remote) = &self.remote_log {
            remote.validate()?;
        }
        Ok(())
    }

    /// Apply `REACTLOG_*` environment overrides to the kernel settings.
    pub fn with_env_overrides(mut self) -> Self {
        self.kernel = self.kernel.with_env_overrides();
        self
    }

    /// Point remote logging at `endpoint`, keeping any other remote settings.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        let endpoint = endpoint.into();
        self.remote_log = Some(match self.remote_log.take() {
            Some(mut remote) => {
                remote.endpoint = endpoint;
                remote
            }
            None => RemoteLogConfig::new(endpoint),
        });
        self
    }
}
