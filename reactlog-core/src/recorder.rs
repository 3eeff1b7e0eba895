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

//! Per-component lifecycle records.
//!
//! The recorder owns one [`ComponentRecord`] per live component id. It never
//! calls into plugins; the kernel hands plugins copies of the records.

use crate::error::{KernelError, KernelResult};
use crate::event::{ComponentId, Snapshot};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;

/// Lifecycle state of one component instance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComponentRecord {
    pub component_id: ComponentId,
    pub display_name: String,
    pub props: Snapshot,
    pub state: Snapshot,
    /// Number of render events seen since mount.
    pub render_count: u64,
    /// Set once at mount.
    pub mounted_at: DateTime<Utc>,
}

impl ComponentRecord {
    fn new(
        component_id: ComponentId,
        display_name: String,
        props: Snapshot,
        state: Snapshot,
    ) -> Self {
        Self {
            component_id,
            display_name,
            props,
            state,
            render_count: 0,
            mounted_at: Utc::now(),
        }
    }

    /// Minimal stand-in for a component the recorder never saw mount.
    pub fn synthesized(component_id: ComponentId, display_name: impl Into<String>) -> Self {
        Self::new(component_id, display_name.into(), Snapshot::new(), Snapshot::new())
    }
}

/// Owner of all live component records.
#[derive(Debug, Default)]
pub struct LifecycleRecorder {
    records: HashMap<ComponentId, ComponentRecord>,
}

impl LifecycleRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a record for a newly mounted component.
    ///
    /// A live record for the same id is left untouched and
    /// [`KernelError::DuplicateMount`] is returned: it points at an identity
    /// bug in the host, not at user error.
    pub fn on_mount(
        &mut self,
        component_id: ComponentId,
        display_name: impl Into<String>,
        props: Snapshot,
        state: Snapshot,
    ) -> KernelResult<ComponentRecord> {
        if self.records.contains_key(&component_id) {
            return Err(KernelError::DuplicateMount(component_id));
        }

        let record = ComponentRecord::new(component_id.clone(), display_name.into(), props, state);
        self.records.insert(component_id, record.clone());
        Ok(record)
    }

    /// Replace the props and/or state snapshots of a live record.
    ///
    /// Snapshots that are `None` keep their previous value.
    pub fn on_update(
        &mut self,
        component_id: &ComponentId,
        props: Option<Snapshot>,
        state: Option<Snapshot>,
    ) -> KernelResult<ComponentRecord> {
        let record = self
            .records
            .get_mut(component_id)
            .ok_or_else(|| KernelError::UnknownComponent(component_id.clone()))?;

        if let Some(props) = props {
            record.props = props;
        }
        if let Some(state) = state {
            record.state = state;
        }
        Ok(record.clone())
    }

    /// Count one render and return the new render count.
    pub fn on_render(&mut self, component_id: &ComponentId) -> KernelResult<u64> {
        let record = self
            .records
            .get_mut(component_id)
            .ok_or_else(|| KernelError::UnknownComponent(component_id.clone()))?;
        record.render_count += 1;
        Ok(record.render_count)
    }

    /// Remove a record. Unknown ids are a no-op.
    pub fn on_unmount(&mut self, component_id: &ComponentId) -> Option<ComponentRecord> {
        self.records.remove(component_id)
    }

    pub fn get(&self, component_id: &ComponentId) -> Option<&ComponentRecord> {
        self.records.get(component_id)
    }

    /// Ids of all live components, sorted.
    pub fn live_ids(&self) -> Vec<ComponentId> {
        let mut ids: Vec<_> = self.records.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn id(s: &str) -> ComponentId {
        ComponentId::new(s)
    }

    fn props(pairs: &[(&str, serde_json::Value)]) -> Snapshot {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_mount_creates_record() {
        let mut recorder = LifecycleRecorder::new();
        let record = recorder
            .on_mount(id("c1"), "Widget", props(&[("size", json!(3))]), Snapshot::new())
            .unwrap();

        assert_eq!(record.display_name, "Widget");
        assert_eq!(record.render_count, 0);
        assert_eq!(recorder.len(), 1);
        assert_eq!(recorder.get(&id("c1")).unwrap().props["size"], json!(3));
    }

    #[test]
    fn test_duplicate_mount_keeps_original() {
        let mut recorder = LifecycleRecorder::new();
        recorder
            .on_mount(id("c1"), "Widget", props(&[("v", json!(1))]), Snapshot::new())
            .unwrap();
        let mounted_at = recorder.get(&id("c1")).unwrap().mounted_at;

        let err = recorder
            .on_mount(id("c1"), "Other", props(&[("v", json!(2))]), Snapshot::new())
            .unwrap_err();
        assert!(matches!(err, KernelError::DuplicateMount(ref c) if c.as_str() == "c1"));

        let record = recorder.get(&id("c1")).unwrap();
        assert_eq!(record.display_name, "Widget");
        assert_eq!(record.props["v"], json!(1));
        assert_eq!(record.mounted_at, mounted_at);
    }

    #[test]
    fn test_instances_of_same_type_do_not_collide() {
        let mut recorder = LifecycleRecorder::new();
        recorder
            .on_mount(id("a"), "Widget", Snapshot::new(), Snapshot::new())
            .unwrap();
        recorder
            .on_mount(id("b"), "Widget", Snapshot::new(), Snapshot::new())
            .unwrap();
        recorder.on_render(&id("a")).unwrap();

        assert_eq!(recorder.get(&id("a")).unwrap().render_count, 1);
        assert_eq!(recorder.get(&id("b")).unwrap().render_count, 0);
        assert_eq!(recorder.live_ids(), vec![id("a"), id("b")]);
    }

    #[test]
    fn test_update_replaces_only_provided_snapshots() {
        let mut recorder = LifecycleRecorder::new();
        recorder
            .on_mount(
                id("c1"),
                "Widget",
                props(&[("p", json!(1))]),
                props(&[("s", json!("a"))]),
            )
            .unwrap();

        let record = recorder
            .on_update(&id("c1"), Some(props(&[("p", json!(2))])), None)
            .unwrap();
        assert_eq!(record.props["p"], json!(2));
        assert_eq!(record.state["s"], json!("a"));

        let record = recorder
            .on_update(&id("c1"), None, Some(props(&[("s", json!("b"))])))
            .unwrap();
        assert_eq!(record.props["p"], json!(2));
        assert_eq!(record.state["s"], json!("b"));
    }

    #[test]
    fn test_update_and_render_unknown_component() {
        let mut recorder = LifecycleRecorder::new();
        assert!(matches!(
            recorder.on_update(&id("ghost"), None, None),
            Err(KernelError::UnknownComponent(_))
        ));
        assert!(matches!(
            recorder.on_render(&id("ghost")),
            Err(KernelError::UnknownComponent(_))
        ));
        assert!(recorder.is_empty());
    }

    #[test]
    fn test_render_count_increments_by_one() {
        let mut recorder = LifecycleRecorder::new();
        recorder
            .on_mount(id("c1"), "Widget", Snapshot::new(), Snapshot::new())
            .unwrap();
        for expected in 1..=5 {
            assert_eq!(recorder.on_render(&id("c1")).unwrap(), expected);
        }
    }

    #[test]
    fn test_unmount_removes_and_unknown_is_noop() {
        let mut recorder = LifecycleRecorder::new();
        recorder
            .on_mount(id("c1"), "Widget", Snapshot::new(), Snapshot::new())
            .unwrap();

        let removed = recorder.on_unmount(&id("c1")).unwrap();
        assert_eq!(removed.component_id, id("c1"));
        assert!(recorder.get(&id("c1")).is_none());

        assert!(recorder.on_unmount(&id("never-mounted")).is_none());
        assert!(recorder.is_empty());
    }

    #[test]
    fn test_remount_after_unmount() {
        let mut recorder = LifecycleRecorder::new();
        recorder
            .on_mount(id("c1"), "Widget", Snapshot::new(), Snapshot::new())
            .unwrap();
        recorder.on_render(&id("c1")).unwrap();
        recorder.on_unmount(&id("c1"));

        let record = recorder
            .on_mount(id("c1"), "Widget", Snapshot::new(), Snapshot::new())
            .unwrap();
        assert_eq!(record.render_count, 0);
    }
}
