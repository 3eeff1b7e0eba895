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

//! ReactLog Kernel
//!
//! A micro-kernel that instruments the lifecycle of UI components and routes
//! every lifecycle signal through an ordered set of plugins.
//!
//! # Architecture
//!
//! - **Recorder** ([`LifecycleRecorder`]): one [`ComponentRecord`] per live component
//! - **Registry** ([`PluginRegistry`]): ordered, uniquely named plugins with
//!   copy-on-write snapshots
//! - **Dispatcher** ([`Kernel`]): `Uninitialized -> Active -> Destroyed` state
//!   machine that runs each notify pass with per-plugin failure isolation
//! - **Resolver** ([`KernelOptions::resolve`]): validates options into a [`KernelConfig`]
//!
//! A plugin that fails (by returning an error or by panicking) never affects
//! the other plugins of the pass or the host; the failure goes to the kernel's
//! [`ErrorSink`].
//!
//! # Example
//!
//! ```rust
//! use reactlog_core::{CallbackPlugin, Kernel, KernelOptions, LifecycleSignal};
//! use std::sync::Arc;
//!
//! let plugin = CallbackPlugin::builder("printer")
//!     .on_render(|name, data| {
//!         println!("{name} rendered {} times", data.render_count);
//!         Ok(())
//!     })
//!     .build();
//!
//! let kernel = Kernel::with_options(KernelOptions::new().with_plugin(Arc::new(plugin))).unwrap();
//! kernel.init().unwrap();
//! kernel.notify(LifecycleSignal::mount("c1", "Widget")).unwrap();
//! kernel.notify(LifecycleSignal::render("c1", "Widget")).unwrap();
//! kernel.destroy().unwrap();
//! ```

pub mod config;
pub mod error;
pub mod event;
pub mod global;
pub mod kernel;
pub mod plugin;
pub mod recorder;
pub mod registry;
pub mod sink;

pub use config::{ConfigError, KernelConfig, KernelOptions, KernelSettings};
pub use error::{HookError, HookResult, KernelError, KernelResult};
pub use event::{
    ComponentId, EffectData, EventKind, LifecycleSignal, MountData, RenderData, Snapshot,
    UpdateData,
};
pub use kernel::{DispatchReport, Kernel, KernelState};
pub use plugin::{CallbackPlugin, CallbackPluginBuilder, HookKind, HookSet, Plugin, PluginRef};
pub use recorder::{ComponentRecord, LifecycleRecorder};
pub use registry::{PluginEntry, PluginRegistry, RegistrySnapshot};
pub use sink::{ErrorSink, MemorySink, TracingSink};
