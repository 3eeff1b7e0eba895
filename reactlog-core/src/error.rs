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

//! Kernel and plugin error types

use crate::config::ConfigError;
use crate::event::ComponentId;
use crate::kernel::KernelState;
use crate::plugin::HookKind;
use std::sync::Arc;
use thiserror::Error;

/// Result type for kernel operations
pub type KernelResult<T> = Result<T, KernelError>;

/// Result returned by every plugin hook
pub type HookResult = Result<(), HookError>;

/// Errors raised inside a plugin hook.
#[derive(Debug, Clone, Error)]
pub enum HookError {
    #[error("Hook execution failed: {0}")]
    Failed(String),

    #[error("Hook panicked: {0}")]
    Panicked(String),

    #[error("{0:#}")]
    Other(Arc<anyhow::Error>),
}

impl From<anyhow::Error> for HookError {
    fn from(err: anyhow::Error) -> Self {
        HookError::Other(Arc::new(err))
    }
}

impl HookError {
    pub fn failed(message: impl Into<String>) -> Self {
        HookError::Failed(message.into())
    }

    pub(crate) fn from_panic(payload: Box<dyn std::any::Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_string()
        };
        HookError::Panicked(message)
    }
}

/// Errors that can occur in the kernel
#[derive(Debug, Clone, Error)]
pub enum KernelError {
    // Registration / configuration errors
    #[error("Plugin name already registered: {0}")]
    DuplicateName(String),

    #[error("Plugin at index {index} has an empty name")]
    MissingName { index: usize },

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    // Recorder inconsistencies
    #[error("Component already mounted: {0}")]
    DuplicateMount(ComponentId),

    #[error("Unknown component: {0}")]
    UnknownComponent(ComponentId),

    // State errors
    #[error("Kernel is {state}, dropped {operation}")]
    KernelNotActive {
        state: KernelState,
        operation: String,
    },

    #[error("Invalid kernel transition: {from} -> {to}")]
    InvalidTransition { from: KernelState, to: KernelState },

    // Plugin errors
    #[error("Plugin '{plugin}' failed in {hook}: {source}")]
    PluginHandlerFailure {
        plugin: String,
        hook: HookKind,
        #[source]
        source: HookError,
    },
}

impl KernelError {
    /// Name of the plugin involved, for plugin failures.
    pub fn plugin_name(&self) -> Option<&str> {
        match self {
            KernelError::PluginHandlerFailure { plugin, .. } => Some(plugin),
            KernelError::DuplicateName(name) => Some(name),
            _ => None,
        }
    }

    /// Whether the error was raised by plugin code rather than the kernel.
    pub fn is_plugin_failure(&self) -> bool {
        matches!(self, KernelError::PluginHandlerFailure { .. })
    }
}
