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

//! Kernel options, settings and configuration resolution.
//!
//! [`KernelOptions`] is what the host hands over: plugin objects plus
//! [`KernelSettings`]. Resolving the options validates them as a whole and
//! produces the immutable [`KernelConfig`] the kernel runs with.
//!
//! # Example JSON Settings
//!
//! ```json
//! {
//!     "enabled": true,
//!     "max_plugin_failures": 3
//! }
//! ```
//!
//! Unknown keys are ignored so newer settings files load on older kernels.

use crate::error::KernelResult;
use crate::plugin::PluginRef;
use crate::registry::{validate_names, PluginEntry};
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use thiserror::Error;

/// Serializable, plugin-independent part of the kernel options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KernelSettings {
    /// Global kill switch. When false no plugin hook ever runs.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Disable a plugin after this many hook failures.
    #[serde(default)]
    pub max_plugin_failures: Option<u32>,
}

fn default_enabled() -> bool {
    true
}

impl Default for KernelSettings {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            max_plugin_failures: None,
        }
    }
}

impl KernelSettings {
    /// Parse settings from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Parse settings from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml_str).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Defaults overridden by `REACTLOG_*` environment variables.
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Apply `REACTLOG_ENABLED` and `REACTLOG_MAX_PLUGIN_FAILURES` on top of
    /// these settings. Unparseable values are ignored.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(v) = env::var("REACTLOG_ENABLED") {
            match v.as_str() {
                "true" | "1" => self.enabled = true,
                "false" | "0" => self.enabled = false,
                _ => {}
            }
        }
        if let Some(n) = env::var("REACTLOG_MAX_PLUGIN_FAILURES")
            .ok()
            .and_then(|v| v.parse().ok())
        {
            self.max_plugin_failures = Some(n);
        }
        self
    }

    /// Validate the settings.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_plugin_failures == Some(0) {
            return Err(ConfigError::InvalidValue {
                field: "max_plugin_failures",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

/// Errors that can occur while loading settings.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

/// Options passed to `Kernel::configure`.
#[derive(Clone, Default)]
pub struct KernelOptions {
    pub plugins: Vec<PluginRef>,
    pub settings: KernelSettings,
}

impl fmt::Debug for KernelOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<_> = self.plugins.iter().map(|p| p.name().to_string()).collect();
        f.debug_struct("KernelOptions")
            .field("plugins", &names)
            .field("settings", &self.settings)
            .finish()
    }
}

impl KernelOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_plugin(mut self, plugin: PluginRef) -> Self {
        self.plugins.push(plugin);
        self
    }

    pub fn with_plugins(mut self, plugins: impl IntoIterator<Item = PluginRef>) -> Self {
        self.plugins.extend(plugins);
        self
    }

    pub fn with_settings(mut self, settings: KernelSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.settings.enabled = enabled;
        self
    }

    pub fn with_max_plugin_failures(mut self, max: u32) -> Self {
        self.settings.max_plugin_failures = Some(max);
        self
    }

    /// Validate the options into a running configuration.
    ///
    /// Fails as a whole on the first empty or duplicate plugin name; nothing
    /// is activated by resolution itself.
    pub fn resolve(self) -> KernelResult<KernelConfig> {
        validate_names(self.plugins.iter().map(|p| p.name()))?;
        self.settings.validate()?;

        Ok(KernelConfig {
            plugins: self.plugins.into_iter().map(PluginEntry::new).collect(),
            enabled: self.settings.enabled,
            max_plugin_failures: self.settings.max_plugin_failures,
        })
    }
}

/// Immutable configuration of one kernel session.
#[derive(Debug, Clone)]
pub struct KernelConfig {
    pub(crate) plugins: Vec<PluginEntry>,
    pub(crate) enabled: bool,
    pub(crate) max_plugin_failures: Option<u32>,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            plugins: Vec::new(),
            enabled: default_enabled(),
            max_plugin_failures: None,
        }
    }
}

impl KernelConfig {
    pub fn plugins(&self) -> &[PluginEntry] {
        &self.plugins
    }

    pub fn plugin_names(&self) -> Vec<&str> {
        self.plugins.iter().map(|e| e.name.as_str()).collect()
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn max_plugin_failures(&self) -> Option<u32> {
        self.max_plugin_failures
    }
}
