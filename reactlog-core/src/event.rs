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

//! Lifecycle signals emitted by the host framework and the read-only event
//! data handed to plugins.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Props or state snapshot: key to JSON value.
pub type Snapshot = BTreeMap<String, serde_json::Value>;

/// Stable identity of one component instance.
///
/// Two instances of the same component type carry different ids; the display
/// name is not an identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ComponentId(String);

impl ComponentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a random id for hosts that have no stable identity of their own.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ComponentId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for ComponentId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// The five lifecycle event kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Mount,
    Update,
    Render,
    Effect,
    Unmount,
}

impl EventKind {
    pub const ALL: [EventKind; 5] = [
        EventKind::Mount,
        EventKind::Update,
        EventKind::Render,
        EventKind::Effect,
        EventKind::Unmount,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::Mount => "mount",
            EventKind::Update => "update",
            EventKind::Render => "render",
            EventKind::Effect => "effect",
            EventKind::Unmount => "unmount",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A lifecycle signal as emitted by the host framework.
///
/// Serialized with an internal `kind` tag so traces can be stored as JSON
/// lines:
///
/// ```json
/// {"kind":"mount","component_id":"c1","display_name":"Widget","props":{"size":3}}
/// {"kind":"render","component_id":"c1","display_name":"Widget"}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LifecycleSignal {
    Mount {
        component_id: ComponentId,
        display_name: String,
        #[serde(default)]
        props: Snapshot,
        #[serde(default)]
        state: Snapshot,
    },
    Update {
        component_id: ComponentId,
        display_name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        props: Option<Snapshot>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        state: Option<Snapshot>,
    },
    Render {
        component_id: ComponentId,
        display_name: String,
        /// Set when the render failed.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    Effect {
        component_id: ComponentId,
        display_name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        payload: Option<serde_json::Value>,
    },
    Unmount {
        component_id: ComponentId,
        display_name: String,
    },
}

impl LifecycleSignal {
    pub fn mount(component_id: impl Into<ComponentId>, display_name: impl Into<String>) -> Self {
        Self::mount_with(component_id, display_name, Snapshot::new(), Snapshot::new())
    }

    pub fn mount_with(
        component_id: impl Into<ComponentId>,
        display_name: impl Into<String>,
        props: Snapshot,
        state: Snapshot,
    ) -> Self {
        LifecycleSignal::Mount {
            component_id: component_id.into(),
            display_name: display_name.into(),
            props,
            state,
        }
    }

    pub fn update(
        component_id: impl Into<ComponentId>,
        display_name: impl Into<String>,
        props: Option<Snapshot>,
        state: Option<Snapshot>,
    ) -> Self {
        LifecycleSignal::Update {
            component_id: component_id.into(),
            display_name: display_name.into(),
            props,
            state,
        }
    }

    pub fn render(component_id: impl Into<ComponentId>, display_name: impl Into<String>) -> Self {
        LifecycleSignal::Render {
            component_id: component_id.into(),
            display_name: display_name.into(),
            error: None,
        }
    }

    pub fn render_failed(
        component_id: impl Into<ComponentId>,
        display_name: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        LifecycleSignal::Render {
            component_id: component_id.into(),
            display_name: display_name.into(),
            error: Some(error.into()),
        }
    }

    pub fn effect(
        component_id: impl Into<ComponentId>,
        display_name: impl Into<String>,
        payload: Option<serde_json::Value>,
    ) -> Self {
        LifecycleSignal::Effect {
            component_id: component_id.into(),
            display_name: display_name.into(),
            payload,
        }
    }

    pub fn unmount(component_id: impl Into<ComponentId>, display_name: impl Into<String>) -> Self {
        LifecycleSignal::Unmount {
            component_id: component_id.into(),
            display_name: display_name.into(),
        }
    }

    pub fn kind(&self) -> EventKind {
        match self {
            LifecycleSignal::Mount { .. } => EventKind::Mount,
            LifecycleSignal::Update { .. } => EventKind::Update,
            LifecycleSignal::Render { .. } => EventKind::Render,
            LifecycleSignal::Effect { .. } => EventKind::Effect,
            LifecycleSignal::Unmount { .. } => EventKind::Unmount,
        }
    }

    pub fn component_id(&self) -> &ComponentId {
        match self {
            LifecycleSignal::Mount { component_id, .. }
            | LifecycleSignal::Update { component_id, .. }
            | LifecycleSignal::Render { component_id, .. }
            | LifecycleSignal::Effect { component_id, .. }
            | LifecycleSignal::Unmount { component_id, .. } => component_id,
        }
    }

    pub fn display_name(&self) -> &str {
        match self {
            LifecycleSignal::Mount { display_name, .. }
            | LifecycleSignal::Update { display_name, .. }
            | LifecycleSignal::Render { display_name, .. }
            | LifecycleSignal::Effect { display_name, .. }
            | LifecycleSignal::Unmount { display_name, .. } => display_name,
        }
    }
}

/// Data passed to `on_mount`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MountData {
    pub component_id: ComponentId,
    pub props: Snapshot,
    pub state: Snapshot,
    pub mounted_at: DateTime<Utc>,
}

/// Data passed to `on_update`, reflecting the record after the merge.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpdateData {
    pub component_id: ComponentId,
    pub props: Snapshot,
    pub state: Snapshot,
    pub render_count: u64,
    /// False when the kernel had no record and synthesized one.
    pub tracked: bool,
}

/// Data passed to `on_render`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderData {
    pub component_id: ComponentId,
    /// Ordinal of this render, 1-indexed.
    pub render_count: u64,
    pub error: Option<String>,
    pub tracked: bool,
}

/// Data passed to `on_effect`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EffectData {
    pub component_id: ComponentId,
    pub render_count: u64,
    pub payload: Option<serde_json::Value>,
    pub tracked: bool,
}
