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

//! Sampling wrapper
//!
//! [`Sampled`] forwards each lifecycle hook to the wrapped plugin with
//! probability `rate`. `on_init` and `on_destroy` always pass through so the
//! inner plugin can start and drain its resources.

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use reactlog_core::{
    EffectData, HookResult, HookSet, MountData, Plugin, RenderData, UpdateData,
};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

pub struct Sampled<P: Plugin + ?Sized> {
    inner: Arc<P>,
    rate: f64,
    rng: Mutex<StdRng>,
    forwarded: AtomicU64,
    dropped: AtomicU64,
}

impl<P: Plugin + ?Sized> Sampled<P> {
    /// Wrap `inner`. The rate is clamped to `[0, 1]`.
    pub fn new(inner: Arc<P>, rate: f64) -> Self {
        Self::with_rng(inner, rate, StdRng::from_entropy())
    }

    /// Deterministic sampling for reproducible runs.
    pub fn with_seed(inner: Arc<P>, rate: f64, seed: u64) -> Self {
        Self::with_rng(inner, rate, StdRng::seed_from_u64(seed))
    }

    fn with_rng(inner: Arc<P>, rate: f64, rng: StdRng) -> Self {
        let rate = if rate.is_nan() { 0.0 } else { rate.clamp(0.0, 1.0) };
        Self {
            inner,
            rate,
            rng: Mutex::new(rng),
            forwarded: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
        }
    }

    pub fn inner(&self) -> &Arc<P> {
        &self.inner
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    /// Lifecycle events passed to the inner plugin.
    pub fn forwarded(&self) -> u64 {
        self.forwarded.load(Ordering::Relaxed)
    }

    /// Lifecycle events withheld from the inner plugin.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    fn admit(&self) -> bool {
        let admitted = if self.rate >= 1.0 {
            true
        } else if self.rate <= 0.0 {
            false
        } else {
            self.rng.lock().gen::<f64>() < self.rate
        };

        let counter = if admitted { &self.forwarded } else { &self.dropped };
        counter.fetch_add(1, Ordering::Relaxed);
        admitted
    }
}

impl<P: Plugin + ?Sized> std::fmt::Debug for Sampled<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sampled")
            .field("inner", &self.inner.name())
            .field("rate", &self.rate)
            .field("forwarded", &self.forwarded())
            .field("dropped", &self.dropped())
            .finish()
    }
}

impl<P: Plugin + ?Sized> Plugin for Sampled<P> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn hooks(&self) -> HookSet {
        self.inner.hooks()
    }

    fn on_init(&self) -> HookResult {
        self.inner.on_init()
    }

    fn on_mount(&self, display_name: &str, data: &MountData) -> HookResult {
        if self.admit() {
            self.inner.on_mount(display_name, data)
        } else {
            Ok(())
        }
    }

    fn on_update(&self, display_name: &str, data: &UpdateData) -> HookResult {
        if self.admit() {
            self.inner.on_update(display_name, data)
        } else {
            Ok(())
        }
    }

    fn on_render(&self, display_name: &str, data: &RenderData) -> HookResult {
        if self.admit() {
            self.inner.on_render(display_name, data)
        } else {
            Ok(())
        }
    }

    fn on_effect(&self, display_name: &str, data: &EffectData) -> HookResult {
        if self.admit() {
            self.inner.on_effect(display_name, data)
        } else {
            Ok(())
        }
    }

    fn on_unmount(&self, display_name: &str) -> HookResult {
        if self.admit() {
            self.inner.on_unmount(display_name)
        } else {
            Ok(())
        }
    }

    fn on_destroy(&self) -> HookResult {
        self.inner.on_destroy()
    }
}
