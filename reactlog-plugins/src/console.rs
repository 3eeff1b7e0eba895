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

//! Plugin that logs every lifecycle event through `tracing`.

use reactlog_core::{
    EffectData, HookResult, HookKind, HookSet, MountData, Plugin, RenderData, UpdateData,
};

/// Mounts and unmounts log at info, failed renders at warn, the rest at debug.
#[derive(Debug, Clone)]
pub struct ConsoleLogger {
    name: String,
}

impl ConsoleLogger {
    pub fn new() -> Self {
        Self::named("console")
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Default for ConsoleLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl Plugin for ConsoleLogger {
    fn name(&self) -> &str {
        &self.name
    }

    fn hooks(&self) -> HookSet {
        [
            HookKind::Mount,
            HookKind::Update,
            HookKind::Render,
            HookKind::Effect,
            HookKind::Unmount,
        ]
        .into_iter()
        .collect()
    }

    fn on_mount(&self, display_name: &str, data: &MountData) -> HookResult {
        tracing::info!(
            plugin = %self.name,
            component = display_name,
            component_id = %data.component_id,
            props = data.props.len(),
            "Component mounted"
        );
        Ok(())
    }

    fn on_update(&self, display_name: &str, data: &UpdateData) -> HookResult {
        tracing::debug!(
            plugin = %self.name,
            component = display_name,
            component_id = %data.component_id,
            render_count = data.render_count,
            tracked = data.tracked,
            "Component updated"
        );
        Ok(())
    }

    fn on_render(&self, display_name: &str, data: &RenderData) -> HookResult {
        match &data.error {
            Some(error) => tracing::warn!(
                plugin = %self.name,
                component = display_name,
                render_count = data.render_count,
                error = %error,
                "Render failed"
            ),
            None => tracing::debug!(
                plugin = %self.name,
                component = display_name,
                render_count = data.render_count,
                "Component rendered"
            ),
        }
        Ok(())
    }

    fn on_effect(&self, display_name: &str, data: &EffectData) -> HookResult {
        tracing::debug!(
            plugin = %self.name,
            component = display_name,
            render_count = data.render_count,
            has_payload = data.payload.is_some(),
            "Effect ran"
        );
        Ok(())
    }

    fn on_unmount(&self, display_name: &str) -> HookResult {
        tracing::info!(plugin = %self.name, component = display_name, "Component unmounted");
        Ok(())
    }
}
