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

//! Render statistics per display name.

use parking_lot::Mutex;
use reactlog_core::{HookKind, HookResult, HookSet, Plugin, RenderData};
use serde::Serialize;
use std::collections::BTreeMap;

/// Counts for one display name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RenderTally {
    pub renders: u64,
    pub failed: u64,
    /// Highest per-instance render count observed.
    pub max_render_count: u64,
}

/// Aggregates renders across all instances sharing a display name.
///
/// Share it as `Arc<RenderCounter>`: register a clone and read the counts
/// from the other.
#[derive(Debug, Default)]
pub struct RenderCounter {
    tallies: Mutex<BTreeMap<String, RenderTally>>,
}

impl RenderCounter {
    pub const NAME: &'static str = "render-counter";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, display_name: &str) -> Option<RenderTally> {
        self.tallies.lock().get(display_name).copied()
    }

    /// All tallies, ordered by display name.
    pub fn snapshot(&self) -> BTreeMap<String, RenderTally> {
        self.tallies.lock().clone()
    }

    pub fn total_renders(&self) -> u64 {
        self.tallies.lock().values().map(|t| t.renders).sum()
    }

    pub fn reset(&self) {
        self.tallies.lock().clear();
    }
}

impl Plugin for RenderCounter {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn hooks(&self) -> HookSet {
        HookSet::empty().with(HookKind::Render)
    }

    fn on_render(&self, display_name: &str, data: &RenderData) -> HookResult {
        let mut tallies = self.tallies.lock();
        let tally = tallies.entry(display_name.to_string()).or_default();
        tally.renders += 1;
        if data.error.is_some() {
            tally.failed += 1;
        }
        tally.max_render_count = tally.max_render_count.max(data.render_count);
        Ok(())
    }
}
