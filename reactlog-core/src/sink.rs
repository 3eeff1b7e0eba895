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

//! Kernel error sinks.
//!
//! Every error the kernel swallows to protect the host (plugin failures,
//! recorder inconsistencies, dropped events) ends up in exactly one sink.

use crate::error::KernelError;
use parking_lot::Mutex;

/// Receiver for errors the kernel does not propagate to the host.
pub trait ErrorSink: Send + Sync {
    fn report(&self, error: KernelError);
}

/// Sink that logs through `tracing`. This is the kernel default.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl ErrorSink for TracingSink {
    fn report(&self, error: KernelError) {
        match &error {
            KernelError::PluginHandlerFailure { plugin, hook, source } => {
                tracing::error!(
                    plugin = %plugin,
                    hook = %hook,
                    error = %source,
                    "Plugin hook failed"
                );
            }
            KernelError::UnknownComponent(id) | KernelError::DuplicateMount(id) => {
                tracing::warn!(component_id = %id, "{}", error);
            }
            _ => tracing::warn!("{}", error),
        }
    }
}

/// Sink that keeps every reported error in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    errors: Mutex<Vec<KernelError>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.errors.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.lock().is_empty()
    }

    /// Display strings of all errors, oldest first.
    pub fn messages(&self) -> Vec<String> {
        self.errors.lock().iter().map(|e| e.to_string()).collect()
    }

    /// Count errors matching a predicate.
    pub fn count_where(&self, predicate: impl Fn(&KernelError) -> bool) -> usize {
        self.errors.lock().iter().filter(|e| predicate(e)).count()
    }

    /// Remove and return all collected errors.
    pub fn drain(&self) -> Vec<KernelError> {
        std::mem::take(&mut *self.errors.lock())
    }
}

impl ErrorSink for MemorySink {
    fn report(&self, error: KernelError) {
        self.errors.lock().push(error);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::ComponentId;

    #[test]
    fn test_memory_sink_collects() {
        let sink = MemorySink::new();
        assert!(sink.is_empty());

        sink.report(KernelError::UnknownComponent(ComponentId::new("c1")));
        sink.report(KernelError::DuplicateName("p".to_string()));

        assert_eq!(sink.len(), 2);
        assert_eq!(
            sink.count_where(|e| matches!(e, KernelError::UnknownComponent(_))),
            1
        );
        assert_eq!(sink.messages()[0], "Unknown component: c1");

        let drained = sink.drain();
        assert_eq!(drained.len(), 2);
        assert!(sink.is_empty());
    }

    #[test]
    fn test_tracing_sink_does_not_panic_without_subscriber() {
        TracingSink.report(KernelError::DuplicateMount(ComponentId::new("c1")));
    }
}
