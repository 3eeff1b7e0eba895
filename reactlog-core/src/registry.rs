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

//! Plugin registry with copy-on-write snapshots.
//!
//! Entries live in an `Arc<[PluginEntry]>`. Every mutation builds a new slice
//! and swaps it in, so a snapshot taken before the mutation keeps iterating
//! the old slice unchanged.

use crate::error::{KernelError, KernelResult};
use crate::plugin::{HookKind, HookSet, PluginRef};
use parking_lot::RwLock;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// A registered plugin.
#[derive(Clone)]
pub struct PluginEntry {
    /// Unique name, taken from the plugin at registration.
    pub name: String,
    pub plugin: PluginRef,
    /// Hooks the plugin implements, captured at registration.
    pub hooks: HookSet,
    pub enabled: bool,
}

impl PluginEntry {
    pub fn new(plugin: PluginRef) -> Self {
        Self {
            name: plugin.name().to_string(),
            hooks: plugin.hooks(),
            plugin,
            enabled: true,
        }
    }

    /// Whether this entry takes part in a pass for `hook`.
    ///
    /// Disabling only mutes lifecycle hooks. Init and destroy still reach a
    /// disabled entry so whatever it set up in `on_init` is torn down.
    pub fn handles(&self, hook: HookKind) -> bool {
        self.hooks.contains(hook) && (self.enabled || !hook.is_lifecycle())
    }
}

impl fmt::Debug for PluginEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginEntry")
            .field("name", &self.name)
            .field("hooks", &self.hooks)
            .field("enabled", &self.enabled)
            .finish()
    }
}

/// Immutable, ordered point-in-time view of the registry.
#[derive(Debug, Clone)]
pub struct RegistrySnapshot {
    entries: Arc<[PluginEntry]>,
}

impl RegistrySnapshot {
    pub fn iter(&self) -> impl Iterator<Item = &PluginEntry> {
        self.entries.iter()
    }

    /// Entries that take part in a pass for `hook`, in registration order.
    pub fn participants(&self, hook: HookKind) -> impl Iterator<Item = &PluginEntry> {
        self.entries.iter().filter(move |e| e.handles(hook))
    }

    pub fn names(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Check that every name is non-empty and unique, in order.
///
/// The first offending name wins, so for `[a, b, a]` the error names `a`.
pub fn validate_names<'a>(names: impl IntoIterator<Item = &'a str>) -> KernelResult<()> {
    let mut seen = HashSet::new();
    for (index, name) in names.into_iter().enumerate() {
        if name.is_empty() {
            return Err(KernelError::MissingName { index });
        }
        if !seen.insert(name) {
            return Err(KernelError::DuplicateName(name.to_string()));
        }
    }
    Ok(())
}

/// Ordered collection of uniquely named plugins.
pub struct PluginRegistry {
    entries: RwLock<Arc<[PluginEntry]>>,
}

impl Default for PluginRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginRegistry")
            .field("entries", &self.entries.read())
            .finish()
    }
}

impl PluginRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Arc::from(Vec::new())),
        }
    }

    /// Create a registry from validated entries.
    pub fn from_entries(entries: Vec<PluginEntry>) -> KernelResult<Self> {
        validate_names(entries.iter().map(|e| e.name.as_str()))?;
        Ok(Self {
            entries: RwLock::new(Arc::from(entries)),
        })
    }

    /// Register a plugin at the end of the dispatch order.
    pub fn register(&self, plugin: PluginRef) -> KernelResult<()> {
        let entry = PluginEntry::new(plugin);
        validate_names([entry.name.as_str()])?;

        let mut entries = self.entries.write();
        if entries.iter().any(|e| e.name == entry.name) {
            return Err(KernelError::DuplicateName(entry.name));
        }

        let mut next = entries.to_vec();
        next.push(entry);
        *entries = Arc::from(next);
        Ok(())
    }

    /// Remove a plugin by name, returning its entry. Unknown names are a no-op.
    pub fn unregister(&self, name: &str) -> Option<PluginEntry> {
        let mut entries = self.entries.write();
        let position = entries.iter().position(|e| e.name == name)?;

        let mut next = entries.to_vec();
        let removed = next.remove(position);
        *entries = Arc::from(next);
        Some(removed)
    }

    /// Enable or disable a plugin without removing it.
    ///
    /// Returns `false` if no plugin has that name.
    pub fn set_enabled(&self, name: &str, enabled: bool) -> bool {
        let mut entries = self.entries.write();
        let Some(position) = entries.iter().position(|e| e.name == name) else {
            return false;
        };
        if entries[position].enabled == enabled {
            return true;
        }

        let mut next = entries.to_vec();
        next[position].enabled = enabled;
        *entries = Arc::from(next);
        true
    }

    /// Replace every entry at once, returning the previous entries.
    ///
    /// Names are validated first; on error the registry is unchanged.
    pub fn replace(&self, entries: Vec<PluginEntry>) -> KernelResult<RegistrySnapshot> {
        validate_names(entries.iter().map(|e| e.name.as_str()))?;
        let previous = std::mem::replace(&mut *self.entries.write(), Arc::from(entries));
        Ok(RegistrySnapshot { entries: previous })
    }

    /// Take a point-in-time view for a notify pass.
    pub fn snapshot(&self) -> RegistrySnapshot {
        RegistrySnapshot {
            entries: Arc::clone(&self.entries.read()),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.read().iter().any(|e| e.name == name)
    }

    pub fn is_enabled(&self, name: &str) -> Option<bool> {
        self.entries
            .read()
            .iter()
            .find(|e| e.name == name)
            .map(|e| e.enabled)
    }

    pub fn names(&self) -> Vec<String> {
        self.entries.read().iter().map(|e| e.name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::{CallbackPlugin, Plugin};

    struct Named(&'static str);

    impl Plugin for Named {
        fn name(&self) -> &str {
            self.0
        }
    }

    fn plugin(name: &'static str) -> PluginRef {
        Arc::new(Named(name))
    }

    #[test]
    fn test_register_preserves_order() {
        let registry = PluginRegistry::new();
        registry.register(plugin("a")).unwrap();
        registry.register(plugin("b")).unwrap();
        registry.register(plugin("c")).unwrap();

        assert_eq!(registry.names(), vec!["a", "b", "c"]);
        assert_eq!(registry.snapshot().names(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let registry = PluginRegistry::new();
        let first = CallbackPlugin::builder("dup").on_init(|| Ok(())).into_ref();
        let second = CallbackPlugin::builder("dup").on_mount(|_, _| Ok(())).into_ref();

        registry.register(first).unwrap();
        let err = registry.register(second).unwrap_err();
        assert!(matches!(err, KernelError::DuplicateName(ref n) if n == "dup"));

        // Only the first plugin remains
        let snapshot = registry.snapshot();
        assert_eq!(snapshot.len(), 1);
        let entry = snapshot.iter().next().unwrap();
        assert!(entry.hooks.contains(HookKind::Init));
        assert!(!entry.hooks.contains(HookKind::Mount));
    }

    #[test]
    fn test_empty_name_rejected() {
        let registry = PluginRegistry::new();
        assert!(matches!(
            registry.register(plugin("")),
            Err(KernelError::MissingName { index: 0 })
        ));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_unregister_unknown_is_noop() {
        let registry = PluginRegistry::new();
        registry.register(plugin("a")).unwrap();

        assert!(registry.unregister("missing").is_none());
        assert_eq!(registry.len(), 1);

        let removed = registry.unregister("a").unwrap();
        assert_eq!(removed.name, "a");
        assert!(registry.is_empty());
    }

    #[test]
    fn test_snapshot_isolated_from_mutation() {
        let registry = PluginRegistry::new();
        registry.register(plugin("a")).unwrap();
        registry.register(plugin("b")).unwrap();

        let snapshot = registry.snapshot();
        registry.unregister("a");
        registry.register(plugin("c")).unwrap();
        registry.set_enabled("b", false);

        assert_eq!(snapshot.names(), vec!["a", "b"]);
        assert!(snapshot.iter().all(|e| e.enabled));
        assert_eq!(registry.names(), vec!["b", "c"]);
    }

    #[test]
    fn test_set_enabled_filters_participants() {
        let registry = PluginRegistry::new();
        registry.register(plugin("a")).unwrap();
        registry.register(plugin("b")).unwrap();

        assert!(registry.set_enabled("a", false));
        assert!(!registry.set_enabled("missing", false));
        assert_eq!(registry.is_enabled("a"), Some(false));

        let snapshot = registry.snapshot();
        let names: Vec<_> = snapshot
            .participants(HookKind::Render)
            .map(|e| e.name.as_str())
            .collect();
        assert_eq!(names, vec!["b"]);
        // Still registered
        assert_eq!(snapshot.len(), 2);
    }

    #[test]
    fn test_disabled_entry_keeps_init_and_destroy() {
        let registry = PluginRegistry::new();
        registry.register(plugin("a")).unwrap();
        registry.set_enabled("a", false);

        let snapshot = registry.snapshot();
        assert_eq!(snapshot.participants(HookKind::Render).count(), 0);
        assert_eq!(snapshot.participants(HookKind::Init).count(), 1);
        assert_eq!(snapshot.participants(HookKind::Destroy).count(), 1);
    }

    #[test]
    fn test_participants_respect_hook_set() {
        let registry = PluginRegistry::new();
        registry
            .register(CallbackPlugin::builder("renders").on_render(|_, _| Ok(())).into_ref())
            .unwrap();
        registry
            .register(CallbackPlugin::builder("mounts").on_mount(|_, _| Ok(())).into_ref())
            .unwrap();

        let snapshot = registry.snapshot();
        let renderers: Vec<_> = snapshot
            .participants(HookKind::Render)
            .map(|e| e.name.clone())
            .collect();
        assert_eq!(renderers, vec!["renders"]);
    }

    #[test]
    fn test_replace_is_atomic() {
        let registry = PluginRegistry::new();
        registry.register(plugin("old")).unwrap();

        let bad = vec![PluginEntry::new(plugin("x")), PluginEntry::new(plugin("x"))];
        assert!(registry.replace(bad).is_err());
        assert_eq!(registry.names(), vec!["old"]);

        let previous = registry
            .replace(vec![PluginEntry::new(plugin("new1")), PluginEntry::new(plugin("new2"))])
            .unwrap();
        assert_eq!(previous.names(), vec!["old"]);
        assert_eq!(registry.names(), vec!["new1", "new2"]);
    }

    #[test]
    fn test_validate_names_reports_first_conflict() {
        assert!(validate_names(["a", "b", "c"]).is_ok());
        assert!(matches!(
            validate_names(["a", "b", "a", "b"]),
            Err(KernelError::DuplicateName(ref n)) if n == "a"
        ));
        assert!(matches!(
            validate_names(["a", ""]),
            Err(KernelError::MissingName { index: 1 })
        ));
    }
}
