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

//! Plugin contract and a closure-based plugin implementation.

use crate::error::HookResult;
use crate::event::{EffectData, EventKind, MountData, RenderData, UpdateData};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Every hook a plugin can implement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HookKind {
    Init,
    Mount,
    Update,
    Render,
    Effect,
    Unmount,
    Destroy,
}

impl HookKind {
    pub const ALL: [HookKind; 7] = [
        HookKind::Init,
        HookKind::Mount,
        HookKind::Update,
        HookKind::Render,
        HookKind::Effect,
        HookKind::Unmount,
        HookKind::Destroy,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            HookKind::Init => "on_init",
            HookKind::Mount => "on_mount",
            HookKind::Update => "on_update",
            HookKind::Render => "on_render",
            HookKind::Effect => "on_effect",
            HookKind::Unmount => "on_unmount",
            HookKind::Destroy => "on_destroy",
        }
    }

    /// Component lifecycle hooks, as opposed to kernel init and destroy.
    pub fn is_lifecycle(self) -> bool {
        !matches!(self, HookKind::Init | HookKind::Destroy)
    }

    fn bit(self) -> u8 {
        1 << (self as u8)
    }
}

impl From<EventKind> for HookKind {
    fn from(kind: EventKind) -> Self {
        match kind {
            EventKind::Mount => HookKind::Mount,
            EventKind::Update => HookKind::Update,
            EventKind::Render => HookKind::Render,
            EventKind::Effect => HookKind::Effect,
            EventKind::Unmount => HookKind::Unmount,
        }
    }
}

impl fmt::Display for HookKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Set of hooks a plugin implements. The kernel skips plugins whose set
/// does not contain the hook of the current pass.
#[derive(Clone, Copy, PartialEq, Eq, Default)]
pub struct HookSet(u8);

impl HookSet {
    pub const fn empty() -> Self {
        HookSet(0)
    }

    pub fn all() -> Self {
        HookKind::ALL.into_iter().collect()
    }

    pub fn with(mut self, kind: HookKind) -> Self {
        self.0 |= kind.bit();
        self
    }

    pub fn contains(&self, kind: HookKind) -> bool {
        self.0 & kind.bit() != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = HookKind> + '_ {
        HookKind::ALL.into_iter().filter(move |k| self.contains(*k))
    }
}

impl FromIterator<HookKind> for HookSet {
    fn from_iter<I: IntoIterator<Item = HookKind>>(iter: I) -> Self {
        iter.into_iter().fold(HookSet::empty(), HookSet::with)
    }
}

impl fmt::Debug for HookSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

/// A lifecycle plugin.
///
/// Only [`Plugin::name`] is required. Hooks default to no-ops; a plugin that
/// overrides a subset should narrow [`Plugin::hooks`] accordingly so the
/// kernel can skip it for the others.
///
/// Hooks run synchronously on the thread that called `Kernel::notify` and
/// must not block. Asynchronous work (network flushes, timers) is scheduled by
/// the plugin itself.
pub trait Plugin: Send + Sync {
    /// Unique plugin name.
    fn name(&self) -> &str;

    /// Hooks implemented by this plugin.
    fn hooks(&self) -> HookSet {
        HookSet::all()
    }

    fn on_init(&self) -> HookResult {
        Ok(())
    }

    fn on_mount(&self, _display_name: &str, _data: &MountData) -> HookResult {
        Ok(())
    }

    fn on_update(&self, _display_name: &str, _data: &UpdateData) -> HookResult {
        Ok(())
    }

    fn on_render(&self, _display_name: &str, _data: &RenderData) -> HookResult {
        Ok(())
    }

    fn on_effect(&self, _display_name: &str, _data: &EffectData) -> HookResult {
        Ok(())
    }

    fn on_unmount(&self, _display_name: &str) -> HookResult {
        Ok(())
    }

    fn on_destroy(&self) -> HookResult {
        Ok(())
    }
}

/// Shared handle to a plugin.
pub type PluginRef = Arc<dyn Plugin>;

type LifecycleFn = Box<dyn Fn() -> HookResult + Send + Sync>;
type DataFn<D> = Box<dyn Fn(&str, &D) -> HookResult + Send + Sync>;
type NameFn = Box<dyn Fn(&str) -> HookResult + Send + Sync>;

/// Plugin assembled from optional closures.
///
/// The implemented hook set is exactly the set of closures supplied.
///
/// ```rust
/// use reactlog_core::{CallbackPlugin, HookKind, Plugin};
///
/// let plugin = CallbackPlugin::builder("counter")
///     .on_mount(|name, _data| {
///         println!("mounted {name}");
///         Ok(())
///     })
///     .build();
///
/// assert!(plugin.hooks().contains(HookKind::Mount));
/// assert!(!plugin.hooks().contains(HookKind::Render));
/// ```
pub struct CallbackPlugin {
    name: String,
    on_init: Option<LifecycleFn>,
    on_mount: Option<DataFn<MountData>>,
    on_update: Option<DataFn<UpdateData>>,
    on_render: Option<DataFn<RenderData>>,
    on_effect: Option<DataFn<EffectData>>,
    on_unmount: Option<NameFn>,
    on_destroy: Option<LifecycleFn>,
}

impl CallbackPlugin {
    pub fn builder(name: impl Into<String>) -> CallbackPluginBuilder {
        CallbackPluginBuilder {
            plugin: CallbackPlugin {
                name: name.into(),
                on_init: None,
                on_mount: None,
                on_update: None,
                on_render: None,
                on_effect: None,
                on_unmount: None,
                on_destroy: None,
            },
        }
    }
}

impl fmt::Debug for CallbackPlugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackPlugin")
            .field("name", &self.name)
            .field("hooks", &self.hooks())
            .finish()
    }
}

impl Plugin for CallbackPlugin {
    fn name(&self) -> &str {
        &self.name
    }

    fn hooks(&self) -> HookSet {
        let mut set = HookSet::empty();
        let present = [
            (HookKind::Init, self.on_init.is_some()),
            (HookKind::Mount, self.on_mount.is_some()),
            (HookKind::Update, self.on_update.is_some()),
            (HookKind::Render, self.on_render.is_some()),
            (HookKind::Effect, self.on_effect.is_some()),
            (HookKind::Unmount, self.on_unmount.is_some()),
            (HookKind::Destroy, self.on_destroy.is_some()),
        ];
        for (kind, is_present) in present {
            if is_present {
                set = set.with(kind);
            }
        }
        set
    }

    fn on_init(&self) -> HookResult {
        self.on_init.as_ref().map_or(Ok(()), |f| f())
    }

    fn on_mount(&self, display_name: &str, data: &MountData) -> HookResult {
        self.on_mount
            .as_ref()
            .map_or(Ok(()), |f| f(display_name, data))
    }

    fn on_update(&self, display_name: &str, data: &UpdateData) -> HookResult {
        self.on_update
            .as_ref()
            .map_or(Ok(()), |f| f(display_name, data))
    }

    fn on_render(&self, display_name: &str, data: &RenderData) -> HookResult {
        self.on_render
            .as_ref()
            .map_or(Ok(()), |f| f(display_name, data))
    }

    fn on_effect(&self, display_name: &str, data: &EffectData) -> HookResult {
        self.on_effect
            .as_ref()
            .map_or(Ok(()), |f| f(display_name, data))
    }

    fn on_unmount(&self, display_name: &str) -> HookResult {
        self.on_unmount.as_ref().map_or(Ok(()), |f| f(display_name))
    }

    fn on_destroy(&self) -> HookResult {
        self.on_destroy.as_ref().map_or(Ok(()), |f| f())
    }
}

/// Builder for [`CallbackPlugin`].
pub struct CallbackPluginBuilder {
    plugin: CallbackPlugin,
}

impl CallbackPluginBuilder {
    pub fn on_init<F>(mut self, f: F) -> Self
    where
        F: Fn() -> HookResult + Send + Sync + 'static,
    {
        self.plugin.on_init = Some(Box::new(f));
        self
    }

    pub fn on_mount<F>(mut self, f: F) -> Self
    where
        F: Fn(&str, &MountData) -> HookResult + Send + Sync + 'static,
    {
        self.plugin.on_mount = Some(Box::new(f));
        self
    }

    pub fn on_update<F>(mut self, f: F) -> Self
    where
        F: Fn(&str, &UpdateData) -> HookResult + Send + Sync + 'static,
    {
        self.plugin.on_update = Some(Box::new(f));
        self
    }

    pub fn on_render<F>(mut self, f: F) -> Self
    where
        F: Fn(&str, &RenderData) -> HookResult + Send + Sync + 'static,
    {
        self.plugin.on_render = Some(Box::new(f));
        self
    }

    pub fn on_effect<F>(mut self, f: F) -> Self
    where
        F: Fn(&str, &EffectData) -> HookResult + Send + Sync + 'static,
    {
        self.plugin.on_effect = Some(Box::new(f));
        self
    }

    pub fn on_unmount<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) -> HookResult + Send + Sync + 'static,
    {
        self.plugin.on_unmount = Some(Box::new(f));
        self
    }

    pub fn on_destroy<F>(mut self, f: F) -> Self
    where
        F: Fn() -> HookResult + Send + Sync + 'static,
    {
        self.plugin.on_destroy = Some(Box::new(f));
        self
    }

    pub fn build(self) -> CallbackPlugin {
        self.plugin
    }

    /// Build straight into a shared handle.
    pub fn into_ref(self) -> PluginRef {
        Arc::new(self.plugin)
    }
}
