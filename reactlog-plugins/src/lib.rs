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

//! ReactLog Plugins
//!
//! Reference plugins for the ReactLog kernel:
//!
//! - [`RemoteLogPlugin`]: batches lifecycle events and POSTs them to an HTTP sink
//! - [`ConsoleLogger`]: logs lifecycle events through `tracing`
//! - [`RenderCounter`]: render statistics per display name
//! - [`Sampled`]: forwards a random fraction of events to any plugin
//!
//! The [`buffer`] module holds the generic batching machinery the remote log
//! plugin is built on.

pub mod buffer;
pub mod console;
pub mod remote_log;
pub mod render_counter;
pub mod sampling;

pub use buffer::{BatchBuffer, BatchStats, BatchTransport, Batcher, FlushTimer, TransportError};
pub use console::ConsoleLogger;
pub use remote_log::{
    HttpTransport, LogBatch, LogEntry, RemoteLogConfig, RemoteLogError, RemoteLogPlugin,
    API_KEY_HEADER,
};
pub use render_counter::{RenderCounter, RenderTally};
pub use sampling::Sampled;
