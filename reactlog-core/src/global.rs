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

//! Process-wide default kernel.
//!
//! A thin wrapper over one explicitly constructed [`Kernel`] for hosts that
//! want a single shared instance. Tests and embedders that need isolation
//! should construct their own kernels instead.

use crate::config::KernelOptions;
use crate::error::{KernelError, KernelResult};
use crate::event::LifecycleSignal;
use crate::kernel::{DispatchReport, Kernel, KernelState};
use once_cell::sync::Lazy;
use parking_lot::{ReentrantMutex, RwLock};
use std::sync::Arc;

static DEFAULT: Lazy<RwLock<Option<Arc<Kernel>>>> = Lazy::new(|| RwLock::new(None));

/// Serializes `configure` and `shutdown` across the whole check-and-install.
/// Reentrant so hooks they run may call back into this module.
static SLOT_GATE: Lazy<ReentrantMutex<()>> = Lazy::new(|| ReentrantMutex::new(()));

/// The current default kernel, if one was configured.
pub fn kernel() -> Option<Arc<Kernel>> {
    DEFAULT.read().clone()
}

/// Configure the default kernel, creating and activating it on first use.
///
/// A second call fully replaces the first configuration. After
/// [`shutdown`], the next call starts a fresh kernel.
pub fn configure(options: KernelOptions) -> KernelResult<Arc<Kernel>> {
    let _gate = SLOT_GATE.lock();
    // Hooks run without the slot lock held so they may use this module
    if let Some(current) = kernel().filter(|k| k.state() != KernelState::Destroyed) {
        current.configure(options)?;
        return Ok(current);
    }

    let fresh = Arc::new(Kernel::with_options(options)?);
    fresh.init()?;
    *DEFAULT.write() = Some(Arc::clone(&fresh));
    Ok(fresh)
}

/// Notify the default kernel.
pub fn notify(signal: LifecycleSignal) -> KernelResult<DispatchReport> {
    match kernel() {
        Some(k) => k.notify(signal),
        None => Err(KernelError::KernelNotActive {
            state: KernelState::Uninitialized,
            operation: signal.kind().as_str().to_string(),
        }),
    }
}

/// Destroy and clear the default kernel. A no-op when none is configured.
pub fn shutdown() -> KernelResult<()> {
    let _gate = SLOT_GATE.lock();
    let Some(current) = DEFAULT.write().take() else {
        return Ok(());
    };
    if current.state() == KernelState::Active {
        current.destroy()?;
    }
    Ok(())
}
