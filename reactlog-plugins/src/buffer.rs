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

//! Batching with requeue-on-failure for buffering plugins
//!
//! Entries are collected in memory and handed to a [`BatchTransport`] either:
//! - When `batch_size` entries are pending, OR
//! - When the flush timer ticks, OR
//! - Once more when the timer is cancelled (drain on shutdown)
//!
//! A size-triggered flush is only scheduled when none is pending, and not at
//! all while the last flush failed: a sink that is down is retried by the
//! timer alone.
//!
//! Delivery is at-least-once: a batch the transport rejects goes back to the
//! front of the pending queue in its original order. A sink that never
//! recovers therefore grows the queue without bound; bounding it is up to the
//! owner of the batcher.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Errors returned by a batch transport.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Request failed: {0}")]
    Request(String),

    #[error("Sink responded with HTTP {0}")]
    Status(u16),

    #[error("Transport unavailable: {0}")]
    Unavailable(String),
}

/// Destination of flushed batches.
#[async_trait]
pub trait BatchTransport<T>: Send + Sync {
    async fn send(&self, batch: &[T]) -> Result<(), TransportError>;
}

/// Pending entries, in arrival order.
#[derive(Debug)]
pub struct BatchBuffer<T> {
    pending: VecDeque<T>,
    batch_size: usize,
}

impl<T> BatchBuffer<T> {
    /// Create a buffer that asks for a flush every `batch_size` entries.
    pub fn new(batch_size: usize) -> Self {
        let batch_size = batch_size.max(1);
        Self {
            pending: VecDeque::with_capacity(batch_size),
            batch_size,
        }
    }

    /// Append an entry. Returns `true` once a full batch is pending.
    pub fn push(&mut self, entry: T) -> bool {
        self.pending.push_back(entry);
        self.pending.len() >= self.batch_size
    }

    /// Remove every pending entry for sending.
    pub fn take(&mut self) -> Vec<T> {
        self.pending.drain(..).collect()
    }

    /// Put a failed batch back in front of anything pushed since it was taken.
    pub fn requeue(&mut self, batch: Vec<T>) {
        for entry in batch.into_iter().rev() {
            self.pending.push_front(entry);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.pending.iter()
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

/// Counters for a [`Batcher`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchStats {
    /// Flushes that reached the transport.
    pub flushes: u64,
    /// Flushes the transport rejected.
    pub failed_flushes: u64,
    /// Entries delivered successfully.
    pub entries_sent: u64,
    /// Entries put back after a failed flush.
    pub entries_requeued: u64,
}

/// Buffer plus transport. Flushes are serialized: one batch in flight at a time.
pub struct Batcher<T> {
    buffer: Mutex<BatchBuffer<T>>,
    transport: Arc<dyn BatchTransport<T>>,
    stats: Mutex<BatchStats>,
    in_flight: tokio::sync::Mutex<()>,
    flush_scheduled: AtomicBool,
    last_flush_failed: AtomicBool,
}

impl<T: Send + Sync + 'static> Batcher<T> {
    pub fn new(batch_size: usize, transport: Arc<dyn BatchTransport<T>>) -> Self {
        Self {
            buffer: Mutex::new(BatchBuffer::new(batch_size)),
            transport,
            stats: Mutex::new(BatchStats::default()),
            in_flight: tokio::sync::Mutex::new(()),
            flush_scheduled: AtomicBool::new(false),
            last_flush_failed: AtomicBool::new(false),
        }
    }

    /// Buffer an entry without flushing. Returns `true` when a flush is due.
    ///
    /// For synchronous callers (plugin hooks) that schedule the flush
    /// themselves.
    pub fn enqueue(&self, entry: T) -> bool {
        self.buffer.lock().push(entry)
    }

    /// Buffer an entry and flush right away if a full batch is pending.
    ///
    /// Returns the number of entries delivered (0 when no flush happened).
    pub async fn push(&self, entry: T) -> Result<usize, TransportError> {
        if self.enqueue(entry) {
            self.flush().await
        } else {
            Ok(0)
        }
    }

    /// Spawn a flush for a full batch unless one is already scheduled or the
    /// last flush failed. Returns whether a task was spawned.
    pub fn schedule_flush(self: &Arc<Self>, runtime: &Handle) -> bool {
        if self.last_flush_failed.load(Ordering::Acquire)
            || self.flush_scheduled.swap(true, Ordering::AcqRel)
        {
            return false;
        }

        let batcher = Arc::clone(self);
        runtime.spawn(async move {
            // Failures were requeued and logged by flush()
            let _ = batcher.flush().await;
            batcher.flush_scheduled.store(false, Ordering::Release);
        });
        true
    }

    /// Whether the most recent flush that reached the transport failed.
    pub fn is_backing_off(&self) -> bool {
        self.last_flush_failed.load(Ordering::Acquire)
    }

    /// Send everything pending. On failure the batch is requeued in order.
    pub async fn flush(&self) -> Result<usize, TransportError> {
        let _in_flight = self.in_flight.lock().await;

        let batch = self.buffer.lock().take();
        if batch.is_empty() {
            return Ok(0);
        }
        let size = batch.len();

        let result = self.transport.send(&batch).await;
        let mut stats = self.stats.lock();
        stats.flushes += 1;

        match result {
            Ok(()) => {
                stats.entries_sent += size as u64;
                self.last_flush_failed.store(false, Ordering::Release);
                debug!(entries = size, "Flushed batch");
                Ok(size)
            }
            Err(e) => {
                stats.failed_flushes += 1;
                stats.entries_requeued += size as u64;
                drop(stats);
                self.last_flush_failed.store(true, Ordering::Release);
                self.buffer.lock().requeue(batch);
                warn!(entries = size, error = %e, "Flush failed, batch requeued");
                Err(e)
            }
        }
    }

    /// Start a background task flushing every `period`.
    ///
    /// Cancelling the returned timer stops the ticks and performs one last
    /// flush before the task exits.
    pub fn spawn_timer(self: &Arc<Self>, period: Duration, runtime: &Handle) -> FlushTimer {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let batcher = Arc::clone(self);

        let task = runtime.spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = token.cancelled() => {
                        if let Err(e) = batcher.flush().await {
                            warn!(error = %e, "Final flush failed");
                        }
                        break;
                    }
                    _ = ticker.tick() => {
                        // Failures were requeued and logged by flush()
                        let _ = batcher.flush().await;
                    }
                }
            }
        });

        FlushTimer { cancel, task }
    }

    pub fn stats(&self) -> BatchStats {
        *self.stats.lock()
    }

    pub fn pending_len(&self) -> usize {
        self.buffer.lock().len()
    }
}

impl<T: Clone + Send + Sync + 'static> Batcher<T> {
    /// Copy of the pending entries, oldest first.
    pub fn pending(&self) -> Vec<T> {
        self.buffer.lock().iter().cloned().collect()
    }
}

/// Handle to a running flush timer.
#[derive(Debug)]
pub struct FlushTimer {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl FlushTimer {
    /// Stop ticking and start the final flush. The returned handle completes
    /// once that flush is done.
    pub fn cancel(self) -> JoinHandle<()> {
        self.cancel.cancel();
        self.task
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    /// Transport that records batches and can be switched to fail.
    #[derive(Default)]
    struct MockTransport {
        calls: AtomicUsize,
        failing: AtomicBool,
        delivered: Mutex<Vec<Vec<u32>>>,
    }

    #[async_trait]
    impl BatchTransport<u32> for MockTransport {
        async fn send(&self, batch: &[u32]) -> Result<(), TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.failing.load(Ordering::SeqCst) {
                return Err(TransportError::Unavailable("simulated".to_string()));
            }
            self.delivered.lock().push(batch.to_vec());
            Ok(())
        }
    }

    #[test]
    fn test_buffer_requeue_preserves_order() {
        let mut buffer = BatchBuffer::new(3);
        assert!(!buffer.push(1));
        assert!(!buffer.push(2));
        let batch = buffer.take();
        buffer.push(3);

        buffer.requeue(batch);
        assert_eq!(buffer.iter().copied().collect::<Vec<_>>(), vec![1, 2, 3]);
    }

    #[test]
    fn test_buffer_zero_batch_size_clamped() {
        let mut buffer = BatchBuffer::new(0);
        assert_eq!(buffer.batch_size(), 1);
        assert!(buffer.push("a"));
    }

    #[tokio::test]
    async fn test_full_batch_triggers_one_flush() {
        let transport = Arc::new(MockTransport::default());
        let batcher = Batcher::new(4, transport.clone());

        for i in 0..4 {
            batcher.push(i).await.unwrap();
        }

        assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
        assert_eq!(*transport.delivered.lock(), vec![vec![0, 1, 2, 3]]);
        assert_eq!(batcher.pending_len(), 0);
        assert_eq!(batcher.stats().entries_sent, 4);
    }

    #[tokio::test]
    async fn test_failed_flush_requeues_in_order() {
        let transport = Arc::new(MockTransport::default());
        transport.failing.store(true, Ordering::SeqCst);
        let batcher = Batcher::new(3, transport.clone());

        batcher.push(10).await.unwrap();
        batcher.push(20).await.unwrap();
        assert!(batcher.push(30).await.is_err());

        assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
        assert_eq!(batcher.pending(), vec![10, 20, 30]);
        let stats = batcher.stats();
        assert_eq!(stats.failed_flushes, 1);
        assert_eq!(stats.entries_requeued, 3);

        // Sink recovers: everything goes out in original order
        transport.failing.store(false, Ordering::SeqCst);
        batcher.push(40).await.unwrap();
        assert_eq!(transport.delivered.lock().last().unwrap(), &vec![10, 20, 30, 40]);
        assert_eq!(batcher.pending_len(), 0);
    }

    #[tokio::test]
    async fn test_scheduled_flush_not_duplicated() {
        let transport = Arc::new(MockTransport::default());
        let batcher = Arc::new(Batcher::new(1, transport.clone()));

        assert!(batcher.enqueue(1));
        assert!(batcher.schedule_flush(&Handle::current()));
        assert!(batcher.enqueue(2));
        assert!(!batcher.schedule_flush(&Handle::current()));

        while transport.calls.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }
        tokio::task::yield_now().await;

        // One request carried both entries
        assert_eq!(*transport.delivered.lock(), vec![vec![1, 2]]);
        assert!(batcher.schedule_flush(&Handle::current()));
    }

    #[tokio::test]
    async fn test_failing_sink_suppresses_scheduled_flushes() {
        let transport = Arc::new(MockTransport::default());
        transport.failing.store(true, Ordering::SeqCst);
        let batcher = Arc::new(Batcher::new(2, transport.clone()));

        batcher.enqueue(1);
        batcher.enqueue(2);
        assert!(batcher.flush().await.is_err());
        assert!(batcher.is_backing_off());

        for i in 3..20 {
            if batcher.enqueue(i) {
                assert!(!batcher.schedule_flush(&Handle::current()));
            }
        }
        assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
        assert_eq!(batcher.pending_len(), 19);

        // A successful flush (timer or drain) lifts the backoff
        transport.failing.store(false, Ordering::SeqCst);
        assert_eq!(batcher.flush().await.unwrap(), 19);
        assert!(!batcher.is_backing_off());
    }

    #[tokio::test]
    async fn test_flush_empty_is_noop() {
        let transport = Arc::new(MockTransport::default());
        let batcher: Batcher<u32> = Batcher::new(3, transport.clone());

        assert_eq!(batcher.flush().await.unwrap(), 0);
        assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_flushes_partial_batch() {
        let transport = Arc::new(MockTransport::default());
        let batcher = Arc::new(Batcher::new(100, transport.clone()));
        let timer = batcher.spawn_timer(Duration::from_secs(1), &Handle::current());

        batcher.enqueue(1);
        batcher.enqueue(2);
        tokio::time::sleep(Duration::from_millis(1500)).await;

        assert_eq!(*transport.delivered.lock(), vec![vec![1, 2]]);
        assert!(!timer.is_finished());
        timer.cancel().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_drains_pending() {
        let transport = Arc::new(MockTransport::default());
        let batcher = Arc::new(Batcher::new(100, transport.clone()));
        let timer = batcher.spawn_timer(Duration::from_secs(3600), &Handle::current());

        batcher.enqueue(7);
        batcher.enqueue(8);
        timer.cancel().await.unwrap();

        assert_eq!(*transport.delivered.lock(), vec![vec![7, 8]]);
        assert_eq!(batcher.pending_len(), 0);
    }
}
