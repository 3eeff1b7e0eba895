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

//! The kernel: lifecycle state machine and notify passes.

use crate::config::{KernelConfig, KernelOptions};
use crate::error::{HookError, HookResult, KernelError, KernelResult};
use crate::event::{
    ComponentId, EffectData, EventKind, LifecycleSignal, MountData, RenderData, UpdateData,
};
use crate::plugin::{HookKind, Plugin, PluginRef};
use crate::recorder::{ComponentRecord, LifecycleRecorder};
use crate::registry::{PluginEntry, PluginRegistry, RegistrySnapshot};
use crate::sink::{ErrorSink, TracingSink};
use parking_lot::{Mutex, ReentrantMutex, RwLock};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

/// Kernel lifecycle. `Destroyed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum KernelState {
    Uninitialized,
    Active,
    Destroyed,
}

impl KernelState {
    fn transition(self, to: KernelState) -> KernelResult<KernelState> {
        use KernelState::*;

        match (self, to) {
            (Uninitialized, Active) | (Active, Destroyed) => Ok(to),
            _ => Err(KernelError::InvalidTransition { from: self, to }),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            KernelState::Uninitialized => "uninitialized",
            KernelState::Active => "active",
            KernelState::Destroyed => "destroyed",
        }
    }
}

impl fmt::Display for KernelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one notify pass.
#[derive(Debug, Clone, Serialize)]
pub struct DispatchReport {
    pub kind: EventKind,
    pub component_id: ComponentId,
    /// Plugins invoked, in dispatch order.
    pub invoked: Vec<String>,
    /// Plugins whose hook failed during this pass.
    pub failed: Vec<String>,
    /// Total pass time in microseconds.
    pub total_time_us: u64,
}

impl DispatchReport {
    fn empty(kind: EventKind, component_id: ComponentId) -> Self {
        Self {
            kind,
            component_id,
            invoked: Vec::new(),
            failed: Vec::new(),
            total_time_us: 0,
        }
    }

    pub fn all_successful(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn failure_count(&self) -> usize {
        self.failed.len()
    }
}

#[derive(Debug, Clone, Copy)]
struct RunningSettings {
    enabled: bool,
    max_plugin_failures: Option<u32>,
}

impl From<&KernelConfig> for RunningSettings {
    fn from(config: &KernelConfig) -> Self {
        Self {
            enabled: config.enabled,
            max_plugin_failures: config.max_plugin_failures,
        }
    }
}

/// Event data assembled once per pass and shared read-only by every plugin.
enum Payload {
    Mount(MountData),
    Update(UpdateData),
    Render(RenderData),
    Effect(EffectData),
    Unmount,
}

impl Payload {
    fn deliver(&self, plugin: &dyn Plugin, display_name: &str) -> HookResult {
        match self {
            Payload::Mount(data) => plugin.on_mount(display_name, data),
            Payload::Update(data) => plugin.on_update(display_name, data),
            Payload::Render(data) => plugin.on_render(display_name, data),
            Payload::Effect(data) => plugin.on_effect(display_name, data),
            Payload::Unmount => plugin.on_unmount(display_name),
        }
    }
}

/// Lifecycle-event micro-kernel.
///
/// # Concurrency Model
///
/// Every notify pass (and every init/destroy/reconfigure) runs under one
/// kernel-wide re-entrant gate, so passes from different threads are
/// serialized. Recorder and registry locks are released before any plugin
/// runs; a plugin may call back into the kernel (for example to unregister a
/// plugin) on the same thread without deadlocking, and such calls only affect
/// later passes.
pub struct Kernel {
    state: Mutex<KernelState>,
    recorder: Mutex<LifecycleRecorder>,
    registry: PluginRegistry,
    settings: RwLock<RunningSettings>,
    failures: Mutex<HashMap<String, u32>>,
    sink: Arc<dyn ErrorSink>,
    pass_gate: ReentrantMutex<()>,
}

impl fmt::Debug for Kernel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Kernel")
            .field("state", &*self.state.lock())
            .field("plugins", &self.registry.names())
            .field("live_components", &self.recorder.lock().len())
            .finish()
    }
}

impl Default for Kernel {
    fn default() -> Self {
        Self::new(KernelConfig::default())
    }
}

impl Kernel {
    /// Create an uninitialized kernel from a resolved configuration.
    pub fn new(config: KernelConfig) -> Self {
        let settings = RunningSettings::from(&config);
        // Names were validated during resolution
        let registry = PluginRegistry::from_entries(config.plugins).unwrap_or_default();

        Self {
            state: Mutex::new(KernelState::Uninitialized),
            recorder: Mutex::new(LifecycleRecorder::new()),
            registry,
            settings: RwLock::new(settings),
            failures: Mutex::new(HashMap::new()),
            sink: Arc::new(TracingSink),
            pass_gate: ReentrantMutex::new(()),
        }
    }

    /// Resolve options and create an uninitialized kernel.
    pub fn with_options(options: KernelOptions) -> KernelResult<Self> {
        Ok(Self::new(options.resolve()?))
    }

    /// Replace the error sink.
    pub fn with_sink(mut self, sink: Arc<dyn ErrorSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn state(&self) -> KernelState {
        *self.state.lock()
    }

    pub fn is_enabled(&self) -> bool {
        self.settings.read().enabled
    }

    pub fn sink(&self) -> &Arc<dyn ErrorSink> {
        &self.sink
    }

    /// `Uninitialized -> Active`, firing every `on_init` exactly once.
    pub fn init(&self) -> KernelResult<()> {
        let _gate = self.pass_gate.lock();
        self.advance(KernelState::Active)?;

        tracing::debug!(plugins = self.registry.len(), "Kernel active");
        if self.is_enabled() {
            self.broadcast(&self.registry.snapshot(), HookKind::Init);
        }
        Ok(())
    }

    /// `Active -> Destroyed`, firing every `on_destroy` exactly once.
    ///
    /// Lifecycle records are dropped; the kernel cannot be revived.
    pub fn destroy(&self) -> KernelResult<()> {
        let _gate = self.pass_gate.lock();
        self.advance(KernelState::Destroyed)?;

        if self.is_enabled() {
            self.broadcast(&self.registry.snapshot(), HookKind::Destroy);
        }
        *self.recorder.lock() = LifecycleRecorder::new();
        tracing::debug!("Kernel destroyed");
        Ok(())
    }

    /// Replace the whole plugin set and settings.
    ///
    /// Options are resolved before anything else happens: an invalid
    /// configuration leaves the current one untouched. On an active kernel
    /// the old plugins get `on_destroy`, then the new ones get `on_init`.
    /// Lifecycle records survive reconfiguration.
    pub fn reconfigure(&self, options: KernelOptions) -> KernelResult<()> {
        let config = options.resolve()?;
        let _gate = self.pass_gate.lock();

        let state = self.state();
        if state == KernelState::Destroyed {
            return Err(self.not_active(state, "reconfigure"));
        }
        let live = state == KernelState::Active;
        let next_settings = RunningSettings::from(&config);

        if live && self.is_enabled() {
            self.broadcast(&self.registry.snapshot(), HookKind::Destroy);
        }

        self.registry.replace(config.plugins)?;
        *self.settings.write() = next_settings;
        self.failures.lock().clear();

        tracing::debug!(
            plugins = ?self.registry.names(),
            enabled = next_settings.enabled,
            "Kernel reconfigured"
        );

        if live && next_settings.enabled {
            self.broadcast(&self.registry.snapshot(), HookKind::Init);
        }
        Ok(())
    }

    /// Apply a configuration, activating the kernel if needed.
    ///
    /// Calling this twice fully replaces the first configuration.
    pub fn configure(&self, options: KernelOptions) -> KernelResult<()> {
        let _gate = self.pass_gate.lock();
        self.reconfigure(options)?;
        if self.state() == KernelState::Uninitialized {
            self.init()?;
        }
        Ok(())
    }

    /// Register a plugin at the end of the dispatch order.
    ///
    /// On an active kernel the plugin's `on_init` runs immediately. It sees
    /// lifecycle events from the next notify pass on.
    pub fn register(&self, plugin: PluginRef) -> KernelResult<()> {
        let _gate = self.pass_gate.lock();
        let entry = PluginEntry::new(Arc::clone(&plugin));
        self.registry.register(plugin)?;

        if self.state() == KernelState::Active && self.is_enabled() && entry.handles(HookKind::Init)
        {
            self.invoke(&entry, HookKind::Init, |p| p.on_init());
        }
        Ok(())
    }

    /// Remove a plugin. On an active kernel its `on_destroy` runs.
    ///
    /// A pass already in flight keeps invoking it; later passes do not.
    pub fn unregister(&self, name: &str) -> Option<PluginEntry> {
        let _gate = self.pass_gate.lock();
        let entry = self.registry.unregister(name)?;
        self.failures.lock().remove(name);

        if self.state() == KernelState::Active
            && self.is_enabled()
            && entry.hooks.contains(HookKind::Destroy)
        {
            self.invoke(&entry, HookKind::Destroy, |p| p.on_destroy());
        }
        Some(entry)
    }

    /// Enable or disable a plugin without removing it.
    pub fn set_enabled(&self, name: &str, enabled: bool) -> bool {
        let found = self.registry.set_enabled(name, enabled);
        if found && enabled {
            self.failures.lock().remove(name);
        }
        found
    }

    /// Deliver one lifecycle signal to every enabled plugin.
    ///
    /// Returns `KernelNotActive` (also reported to the sink) outside the
    /// `Active` state. Plugin failures and recorder inconsistencies are
    /// reported to the sink and never turn into an `Err` here.
    pub fn notify(&self, signal: LifecycleSignal) -> KernelResult<DispatchReport> {
        let start = Instant::now();
        let _gate = self.pass_gate.lock();
        let kind = signal.kind();

        let state = self.state();
        if state != KernelState::Active {
            let err = self.not_active(state, kind.as_str());
            self.sink.report(err.clone());
            return Err(err);
        }

        if !self.is_enabled() {
            return Ok(DispatchReport::empty(kind, signal.component_id().clone()));
        }

        let (component_id, display_name, payload, issue) = self.record(signal);
        if let Some(err) = issue {
            self.sink.report(err);
        }

        let snapshot = self.registry.snapshot();
        let hook = HookKind::from(kind);
        let mut report = DispatchReport::empty(kind, component_id);

        for entry in snapshot.participants(hook) {
            report.invoked.push(entry.name.clone());
            if !self.invoke(entry, hook, |p| payload.deliver(p, &display_name)) {
                report.failed.push(entry.name.clone());
            }
        }

        report.total_time_us = start.elapsed().as_micros() as u64;

        tracing::debug!(
            kind = %kind,
            component_id = %report.component_id,
            invoked = report.invoked.len(),
            failures = report.failure_count(),
            total_time_us = report.total_time_us,
            "Notify pass completed"
        );

        Ok(report)
    }

    /// Copy of the record for a live component.
    pub fn component(&self, component_id: &ComponentId) -> Option<ComponentRecord> {
        self.recorder.lock().get(component_id).cloned()
    }

    pub fn live_components(&self) -> Vec<ComponentId> {
        self.recorder.lock().live_ids()
    }

    pub fn plugin_names(&self) -> Vec<String> {
        self.registry.names()
    }

    /// Point-in-time view of the registered plugins.
    pub fn plugins(&self) -> RegistrySnapshot {
        self.registry.snapshot()
    }

    fn advance(&self, to: KernelState) -> KernelResult<()> {
        let mut state = self.state.lock();
        *state = state.transition(to)?;
        Ok(())
    }

    fn not_active(&self, state: KernelState, operation: &str) -> KernelError {
        KernelError::KernelNotActive {
            state,
            operation: operation.to_string(),
        }
    }

    /// Update the recorder and assemble the pass payload.
    ///
    /// Returns the recorder inconsistency, if any, so it is reported after
    /// the recorder lock is released.
    fn record(
        &self,
        signal: LifecycleSignal,
    ) -> (ComponentId, String, Payload, Option<KernelError>) {
        let mut recorder = self.recorder.lock();
        let mut issue = None;

        match signal {
            LifecycleSignal::Mount {
                component_id,
                display_name,
                props,
                state,
            } => {
                let mounted_at = match recorder.on_mount(
                    component_id.clone(),
                    display_name.clone(),
                    props.clone(),
                    state.clone(),
                ) {
                    Ok(record) => record.mounted_at,
                    Err(err) => {
                        issue = Some(err);
                        recorder
                            .get(&component_id)
                            .map(|r| r.mounted_at)
                            .unwrap_or_else(chrono::Utc::now)
                    }
                };
                let data = MountData {
                    component_id: component_id.clone(),
                    props,
                    state,
                    mounted_at,
                };
                (component_id, display_name, Payload::Mount(data), issue)
            }
            LifecycleSignal::Update {
                component_id,
                display_name,
                props,
                state,
            } => {
                let (record, tracked) =
                    match recorder.on_update(&component_id, props.clone(), state.clone()) {
                        Ok(record) => (record, true),
                        Err(err) => {
                            issue = Some(err);
                            let mut record =
                                ComponentRecord::synthesized(component_id.clone(), &display_name);
                            record.props = props.unwrap_or_default();
                            record.state = state.unwrap_or_default();
                            (record, false)
                        }
                    };
                let data = UpdateData {
                    component_id: component_id.clone(),
                    props: record.props,
                    state: record.state,
                    render_count: record.render_count,
                    tracked,
                };
                (component_id, display_name, Payload::Update(data), issue)
            }
            LifecycleSignal::Render {
                component_id,
                display_name,
                error,
            } => {
                let (render_count, tracked) = match recorder.on_render(&component_id) {
                    Ok(count) => (count, true),
                    Err(err) => {
                        issue = Some(err);
                        (1, false)
                    }
                };
                let data = RenderData {
                    component_id: component_id.clone(),
                    render_count,
                    error,
                    tracked,
                };
                (component_id, display_name, Payload::Render(data), issue)
            }
            LifecycleSignal::Effect {
                component_id,
                display_name,
                payload,
            } => {
                let render_count = recorder.get(&component_id).map(|r| r.render_count);
                if render_count.is_none() {
                    issue = Some(KernelError::UnknownComponent(component_id.clone()));
                }
                let data = EffectData {
                    component_id: component_id.clone(),
                    render_count: render_count.unwrap_or(0),
                    payload,
                    tracked: render_count.is_some(),
                };
                (component_id, display_name, Payload::Effect(data), issue)
            }
            LifecycleSignal::Unmount {
                component_id,
                display_name,
            } => {
                if recorder.on_unmount(&component_id).is_none() {
                    tracing::trace!(
                        component_id = %component_id,
                        "Unmount for untracked component"
                    );
                }
                (component_id, display_name, Payload::Unmount, issue)
            }
        }
    }

    /// Run `hook` on every participant of a snapshot.
    fn broadcast(&self, snapshot: &RegistrySnapshot, hook: HookKind) {
        for entry in snapshot.participants(hook) {
            self.invoke(entry, hook, |p| match hook {
                HookKind::Init => p.on_init(),
                HookKind::Destroy => p.on_destroy(),
                _ => Ok(()),
            });
        }
    }

    /// Invoke one hook inside a failure boundary. Returns `true` on success.
    fn invoke<F>(&self, entry: &PluginEntry, hook: HookKind, call: F) -> bool
    where
        F: FnOnce(&dyn Plugin) -> HookResult,
    {
        let plugin = entry.plugin.as_ref();
        let outcome = catch_unwind(AssertUnwindSafe(|| call(plugin)))
            .unwrap_or_else(|payload| Err(HookError::from_panic(payload)));

        match outcome {
            Ok(()) => true,
            Err(source) => {
                self.sink.report(KernelError::PluginHandlerFailure {
                    plugin: entry.name.clone(),
                    hook,
                    source,
                });
                self.charge_failure(&entry.name);
                false
            }
        }
    }

    /// Count a failure against the plugin's budget, disabling it when spent.
    fn charge_failure(&self, name: &str) {
        let Some(max) = self.settings.read().max_plugin_failures else {
            return;
        };

        let mut failures = self.failures.lock();
        let count = failures.entry(name.to_string()).or_insert(0);
        *count += 1;
        if *count == max {
            drop(failures);
            tracing::warn!(
                plugin = %name,
                failures = max,
                "Plugin exceeded failure budget, disabling"
            );
            self.registry.set_enabled(name, false);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Snapshot;
    use crate::plugin::CallbackPlugin;
    use crate::sink::MemorySink;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn kernel_with(plugins: Vec<PluginRef>) -> (Kernel, Arc<MemorySink>) {
        let sink = Arc::new(MemorySink::new());
        let kernel = Kernel::with_options(KernelOptions::new().with_plugins(plugins))
            .unwrap()
            .with_sink(sink.clone());
        (kernel, sink)
    }

    fn counting(name: &str, counter: Arc<AtomicUsize>) -> PluginRef {
        let init = counter.clone();
        CallbackPlugin::builder(name)
            .on_init(move || {
                init.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .on_destroy(move || {
                counter.fetch_add(100, Ordering::SeqCst);
                Ok(())
            })
            .into_ref()
    }

    #[test]
    fn test_state_transitions() {
        assert!(KernelState::Uninitialized
            .transition(KernelState::Active)
            .is_ok());
        assert!(KernelState::Active.transition(KernelState::Destroyed).is_ok());
        assert!(KernelState::Uninitialized
            .transition(KernelState::Destroyed)
            .is_err());
        assert!(KernelState::Destroyed.transition(KernelState::Active).is_err());
        assert!(KernelState::Active.transition(KernelState::Active).is_err());
    }

    #[test]
    fn test_init_and_destroy_fire_once() {
        let counter = Arc::new(AtomicUsize::new(0));
        let (kernel, _) = kernel_with(vec![counting("p", counter.clone())]);

        kernel.init().unwrap();
        assert!(matches!(
            kernel.init(),
            Err(KernelError::InvalidTransition { .. })
        ));
        assert_eq!(counter.load(Ordering::SeqCst), 1);

        kernel.destroy().unwrap();
        assert!(kernel.destroy().is_err());
        assert_eq!(counter.load(Ordering::SeqCst), 101);
        assert_eq!(kernel.state(), KernelState::Destroyed);
    }

    #[test]
    fn test_notify_rejected_outside_active() {
        let (kernel, sink) = kernel_with(vec![]);

        let err = kernel.notify(LifecycleSignal::mount("c1", "W")).unwrap_err();
        assert!(matches!(
            err,
            KernelError::KernelNotActive {
                state: KernelState::Uninitialized,
                ..
            }
        ));
        assert_eq!(sink.messages(), vec![err.to_string()]);

        kernel.init().unwrap();
        kernel.destroy().unwrap();
        assert!(kernel.notify(LifecycleSignal::render("c1", "W")).is_err());

        assert_eq!(
            sink.count_where(|e| matches!(e, KernelError::KernelNotActive { .. })),
            2
        );
        assert!(kernel.component(&ComponentId::new("c1")).is_none());
    }

    #[test]
    fn test_render_sees_current_count() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink_seen = seen.clone();
        let plugin = CallbackPlugin::builder("p")
            .on_render(move |_, data| {
                sink_seen.lock().push(data.render_count);
                Ok(())
            })
            .into_ref();
        let (kernel, _) = kernel_with(vec![plugin]);
        kernel.init().unwrap();

        kernel.notify(LifecycleSignal::mount("c1", "W")).unwrap();
        for _ in 0..3 {
            kernel.notify(LifecycleSignal::render("c1", "W")).unwrap();
        }

        assert_eq!(*seen.lock(), vec![1, 2, 3]);
        assert_eq!(
            kernel.component(&ComponentId::new("c1")).unwrap().render_count,
            3
        );
    }

    #[test]
    fn test_update_unknown_component_synthesizes_record() {
        let seen = Arc::new(Mutex::new(None));
        let captured = seen.clone();
        let plugin = CallbackPlugin::builder("p")
            .on_update(move |name, data| {
                *captured.lock() = Some((name.to_string(), data.clone()));
                Ok(())
            })
            .into_ref();
        let (kernel, sink) = kernel_with(vec![plugin]);
        kernel.init().unwrap();

        let mut props = Snapshot::new();
        props.insert("x".to_string(), serde_json::json!(1));
        let report = kernel
            .notify(LifecycleSignal::update("ghost", "Ghost", Some(props), None))
            .unwrap();

        assert_eq!(report.invoked, vec!["p"]);
        let (name, data) = seen.lock().clone().unwrap();
        assert_eq!(name, "Ghost");
        assert!(!data.tracked);
        assert_eq!(data.props["x"], serde_json::json!(1));
        assert_eq!(
            sink.count_where(|e| matches!(e, KernelError::UnknownComponent(_))),
            1
        );
        // Nothing was recorded for the unknown id
        assert!(kernel.live_components().is_empty());
    }

    #[test]
    fn test_duplicate_mount_reported_and_pass_continues() {
        let mounts = Arc::new(AtomicUsize::new(0));
        let counter = mounts.clone();
        let plugin = CallbackPlugin::builder("p")
            .on_mount(move |_, _| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .into_ref();
        let (kernel, sink) = kernel_with(vec![plugin]);
        kernel.init().unwrap();

        kernel.notify(LifecycleSignal::mount("c1", "W")).unwrap();
        kernel.notify(LifecycleSignal::render("c1", "W")).unwrap();
        kernel.notify(LifecycleSignal::mount("c1", "W")).unwrap();

        assert_eq!(mounts.load(Ordering::SeqCst), 2);
        assert_eq!(
            sink.count_where(|e| matches!(e, KernelError::DuplicateMount(_))),
            1
        );
        // The original record is not overwritten
        assert_eq!(
            kernel.component(&ComponentId::new("c1")).unwrap().render_count,
            1
        );
    }

    #[test]
    fn test_panicking_plugin_isolated() {
        let after = Arc::new(AtomicUsize::new(0));
        let counter = after.clone();
        let bad = CallbackPlugin::builder("bad")
            .on_mount(|_, _| panic!("plugin blew up"))
            .into_ref();
        let good = CallbackPlugin::builder("good")
            .on_mount(move |_, _| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .into_ref();
        let (kernel, sink) = kernel_with(vec![bad, good]);
        kernel.init().unwrap();

        let report = kernel.notify(LifecycleSignal::mount("c1", "W")).unwrap();

        assert_eq!(report.invoked, vec!["bad", "good"]);
        assert_eq!(report.failed, vec!["bad"]);
        assert_eq!(after.load(Ordering::SeqCst), 1);
        assert_eq!(sink.len(), 1);
        assert!(sink.messages()[0].contains("plugin blew up"));
    }

    #[test]
    fn test_kill_switch_drops_events() {
        let counter = Arc::new(AtomicUsize::new(0));
        let sink = Arc::new(MemorySink::new());
        let kernel = Kernel::with_options(
            KernelOptions::new()
                .with_plugin(counting("p", counter.clone()))
                .enabled(false),
        )
        .unwrap()
        .with_sink(sink.clone());

        kernel.init().unwrap();
        let report = kernel.notify(LifecycleSignal::mount("c1", "W")).unwrap();
        kernel.destroy().unwrap();

        assert!(report.invoked.is_empty());
        assert_eq!(counter.load(Ordering::SeqCst), 0);
        assert!(kernel.component(&ComponentId::new("c1")).is_none());
        assert!(sink.is_empty());
    }

    #[test]
    fn test_failure_budget_disables_plugin() {
        let plugin = CallbackPlugin::builder("flaky")
            .on_render(|_, _| Err(HookError::failed("always")))
            .into_ref();
        let sink = Arc::new(MemorySink::new());
        let kernel = Kernel::with_options(
            KernelOptions::new()
                .with_plugin(plugin)
                .with_max_plugin_failures(2),
        )
        .unwrap()
        .with_sink(sink.clone());
        kernel.init().unwrap();
        kernel.notify(LifecycleSignal::mount("c1", "W")).unwrap();

        for _ in 0..5 {
            kernel.notify(LifecycleSignal::render("c1", "W")).unwrap();
        }

        assert_eq!(sink.count_where(KernelError::is_plugin_failure), 2);
        assert_eq!(kernel.plugins().iter().next().map(|e| e.enabled), Some(false));

        // Re-enabling resets the budget
        assert!(kernel.set_enabled("flaky", true));
        kernel.notify(LifecycleSignal::render("c1", "W")).unwrap();
        assert_eq!(sink.count_where(KernelError::is_plugin_failure), 3);
    }

    #[test]
    fn test_disabled_plugin_still_destroyed() {
        let counter = Arc::new(AtomicUsize::new(0));
        let (kernel, _) = kernel_with(vec![counting("p", counter.clone())]);
        kernel.init().unwrap();

        assert!(kernel.set_enabled("p", false));
        kernel.notify(LifecycleSignal::mount("c1", "W")).unwrap();
        kernel.destroy().unwrap();

        assert_eq!(counter.load(Ordering::SeqCst), 101);
    }

    #[test]
    fn test_plugin_disabled_before_init_pairs_hooks() {
        let counter = Arc::new(AtomicUsize::new(0));
        let (kernel, _) = kernel_with(vec![counting("p", counter.clone())]);
        kernel.set_enabled("p", false);

        kernel.init().unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 1);

        kernel.set_enabled("p", true);
        kernel.destroy().unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 101);
    }

    #[test]
    fn test_budget_disabled_plugin_still_destroyed() {
        let destroyed = Arc::new(AtomicUsize::new(0));
        let seen = destroyed.clone();
        let plugin = CallbackPlugin::builder("flaky")
            .on_render(|_, _| Err(HookError::failed("always")))
            .on_destroy(move || {
                seen.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .into_ref();
        let kernel = Kernel::with_options(
            KernelOptions::new()
                .with_plugin(plugin)
                .with_max_plugin_failures(1),
        )
        .unwrap()
        .with_sink(Arc::new(MemorySink::new()));
        kernel.init().unwrap();
        kernel.notify(LifecycleSignal::mount("c1", "W")).unwrap();
        kernel.notify(LifecycleSignal::render("c1", "W")).unwrap();
        assert_eq!(kernel.plugins().iter().next().map(|e| e.enabled), Some(false));

        kernel.destroy().unwrap();
        assert_eq!(destroyed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_register_on_active_kernel_runs_init() {
        let counter = Arc::new(AtomicUsize::new(0));
        let (kernel, _) = kernel_with(vec![]);
        kernel.init().unwrap();

        kernel.register(counting("late", counter.clone())).unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 1);

        let removed = kernel.unregister("late").unwrap();
        assert_eq!(removed.name, "late");
        assert_eq!(counter.load(Ordering::SeqCst), 101);
        assert!(kernel.unregister("late").is_none());
    }

    #[test]
    fn test_configure_activates_then_replaces() {
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));
        let kernel = Kernel::default();

        kernel
            .configure(KernelOptions::new().with_plugin(counting("a", first.clone())))
            .unwrap();
        assert_eq!(kernel.state(), KernelState::Active);
        assert_eq!(first.load(Ordering::SeqCst), 1);

        kernel
            .configure(KernelOptions::new().with_plugin(counting("b", second.clone())))
            .unwrap();
        assert_eq!(first.load(Ordering::SeqCst), 101);
        assert_eq!(second.load(Ordering::SeqCst), 1);
        assert_eq!(kernel.plugin_names(), vec!["b"]);
    }

    #[test]
    fn test_reconfigure_on_destroyed_kernel() {
        let kernel = Kernel::default();
        kernel.init().unwrap();
        kernel.destroy().unwrap();

        assert!(matches!(
            kernel.reconfigure(KernelOptions::new()),
            Err(KernelError::KernelNotActive { .. })
        ));
    }
}
