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

//! Remote log plugin
//!
//! Buffers one [`LogEntry`] per lifecycle event and ships them in batches to
//! an HTTP endpoint:
//!
//! ```text
//! POST {endpoint}
//! X-ReactLog-API-Key: <key>        (optional)
//!
//! {"entries":[{"type":"render","componentName":"Widget","timestamp":1700000000000,"data":{"renderCount":1}}]}
//! ```
//!
//! The flush timer starts in `on_init` and is cancelled in `on_destroy`,
//! which triggers a final best-effort flush. Await [`RemoteLogPlugin::drained`]
//! to wait for it.

use crate::buffer::{BatchStats, BatchTransport, Batcher, FlushTimer, TransportError};
use async_trait::async_trait;
use parking_lot::Mutex;
use reactlog_core::{
    EffectData, EventKind, HookResult, HookSet, MountData, Plugin, RenderData, UpdateData,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Header carrying the optional API key.
pub const API_KEY_HEADER: &str = "X-ReactLog-API-Key";

fn default_batch_size() -> usize {
    50
}

fn default_flush_interval_ms() -> u64 {
    5000
}

fn default_sample_rate() -> f64 {
    1.0
}

/// Remote log settings, the `[remote_log]` table of a config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteLogConfig {
    pub endpoint: String,

    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    #[serde(default = "default_flush_interval_ms")]
    pub flush_interval_ms: u64,

    #[serde(default)]
    pub api_key: Option<String>,

    /// Fraction of lifecycle events forwarded, applied by the caller through
    /// [`crate::Sampled`].
    #[serde(default = "default_sample_rate")]
    pub sample_rate: f64,
}

impl RemoteLogConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            batch_size: default_batch_size(),
            flush_interval_ms: default_flush_interval_ms(),
            api_key: None,
            sample_rate: default_sample_rate(),
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_flush_interval(mut self, interval: Duration) -> Self {
        self.flush_interval_ms = interval.as_millis() as u64;
        self
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn flush_interval(&self) -> Duration {
        Duration::from_millis(self.flush_interval_ms)
    }

    pub fn validate(&self) -> Result<(), RemoteLogError> {
        if self.endpoint.is_empty() {
            return Err(RemoteLogError::InvalidConfig(
                "endpoint must not be empty".to_string(),
            ));
        }
        if self.batch_size == 0 {
            return Err(RemoteLogError::InvalidConfig(
                "batch_size must be at least 1".to_string(),
            ));
        }
        if self.flush_interval_ms == 0 {
            return Err(RemoteLogError::InvalidConfig(
                "flush_interval_ms must be at least 1".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.sample_rate) {
            return Err(RemoteLogError::InvalidConfig(format!(
                "sample_rate must be within [0, 1], got {}",
                self.sample_rate
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum RemoteLogError {
    #[error("Invalid remote log config: {0}")]
    InvalidConfig(String),

    #[error("No tokio runtime available to drive the flush timer")]
    NoRuntime,

    #[error("Failed to build HTTP client: {0}")]
    Client(String),
}

/// One buffered lifecycle event, as sent on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    #[serde(rename = "type")]
    pub kind: String,
    pub component_name: String,
    /// Unix milliseconds.
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl LogEntry {
    pub fn new(kind: EventKind, component_name: &str, data: Option<Value>) -> Self {
        Self {
            kind: kind.as_str().to_string(),
            component_name: component_name.to_string(),
            timestamp: chrono::Utc::now().timestamp_millis(),
            data,
        }
    }
}

/// Request body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogBatch {
    pub entries: Vec<LogEntry>,
}

#[derive(Serialize)]
struct LogBatchRef<'a> {
    entries: &'a [LogEntry],
}

/// POSTs batches as JSON.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl HttpTransport {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: Option<String>,
    ) -> Result<Self, RemoteLogError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| RemoteLogError::Client(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            api_key,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl BatchTransport<LogEntry> for HttpTransport {
    async fn send(&self, batch: &[LogEntry]) -> Result<(), TransportError> {
        let mut request = self
            .client
            .post(&self.endpoint)
            .json(&LogBatchRef { entries: batch });

        if let Some(api_key) = &self.api_key {
            request = request.header(API_KEY_HEADER, api_key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| TransportError::Request(e.to_string()))?;

        if response.status().is_success() {
            debug!(entries = batch.len(), endpoint = %self.endpoint, "Exported log batch");
            Ok(())
        } else {
            Err(TransportError::Status(response.status().as_u16()))
        }
    }
}

/// Plugin buffering lifecycle events for a remote sink.
pub struct RemoteLogPlugin {
    batcher: Arc<Batcher<LogEntry>>,
    flush_interval: Duration,
    runtime: Handle,
    timer: Mutex<Option<FlushTimer>>,
    drain: Mutex<Option<JoinHandle<()>>>,
}

impl RemoteLogPlugin {
    pub const NAME: &'static str = "remote-log";

    /// Build the plugin with an HTTP transport on the current tokio runtime.
    pub fn new(config: &RemoteLogConfig) -> Result<Self, RemoteLogError> {
        let runtime = Handle::try_current().map_err(|_| RemoteLogError::NoRuntime)?;
        let transport = HttpTransport::new(config.endpoint.clone(), config.api_key.clone())?;
        Self::with_transport(config, Arc::new(transport), runtime)
    }

    /// Build the plugin around any transport.
    pub fn with_transport(
        config: &RemoteLogConfig,
        transport: Arc<dyn BatchTransport<LogEntry>>,
        runtime: Handle,
    ) -> Result<Self, RemoteLogError> {
        config.validate()?;
        Ok(Self {
            batcher: Arc::new(Batcher::new(config.batch_size, transport)),
            flush_interval: config.flush_interval(),
            runtime,
            timer: Mutex::new(None),
            drain: Mutex::new(None),
        })
    }

    pub fn stats(&self) -> BatchStats {
        self.batcher.stats()
    }

    pub fn pending(&self) -> Vec<LogEntry> {
        self.batcher.pending()
    }

    /// Wait for the final flush started by `on_destroy`.
    pub async fn drained(&self) {
        let handle = self.drain.lock().take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                warn!(error = %e, "Remote log drain task failed");
            }
        }
    }

    fn record(&self, entry: LogEntry) {
        if self.batcher.enqueue(entry) {
            self.batcher.schedule_flush(&self.runtime);
        }
    }
}

impl std::fmt::Debug for RemoteLogPlugin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteLogPlugin")
            .field("flush_interval", &self.flush_interval)
            .field("pending", &self.batcher.pending_len())
            .field("stats", &self.batcher.stats())
            .finish()
    }
}

impl Plugin for RemoteLogPlugin {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn hooks(&self) -> HookSet {
        HookSet::all()
    }

    fn on_init(&self) -> HookResult {
        let mut timer = self.timer.lock();
        if timer.is_none() {
            *timer = Some(self.batcher.spawn_timer(self.flush_interval, &self.runtime));
            info!(
                interval_ms = self.flush_interval.as_millis() as u64,
                "Remote log flush timer started"
            );
        }
        Ok(())
    }

    fn on_mount(&self, display_name: &str, data: &MountData) -> HookResult {
        self.record(LogEntry::new(
            EventKind::Mount,
            display_name,
            Some(json!({ "props": data.props, "state": data.state })),
        ));
        Ok(())
    }

    fn on_update(&self, display_name: &str, data: &UpdateData) -> HookResult {
        self.record(LogEntry::new(
            EventKind::Update,
            display_name,
            Some(json!({
                "props": data.props,
                "state": data.state,
                "renderCount": data.render_count,
            })),
        ));
        Ok(())
    }

    fn on_render(&self, display_name: &str, data: &RenderData) -> HookResult {
        let mut body = json!({ "renderCount": data.render_count });
        if let Some(error) = &data.error {
            body["error"] = Value::String(error.clone());
        }
        self.record(LogEntry::new(EventKind::Render, display_name, Some(body)));
        Ok(())
    }

    fn on_effect(&self, display_name: &str, data: &EffectData) -> HookResult {
        let mut body = json!({ "renderCount": data.render_count });
        if let Some(payload) = &data.payload {
            body["payload"] = payload.clone();
        }
        self.record(LogEntry::new(EventKind::Effect, display_name, Some(body)));
        Ok(())
    }

    fn on_unmount(&self, display_name: &str) -> HookResult {
        self.record(LogEntry::new(EventKind::Unmount, display_name, None));
        Ok(())
    }

    fn on_destroy(&self) -> HookResult {
        let handle = match self.timer.lock().take() {
            Some(timer) => timer.cancel(),
            None => {
                let batcher = Arc::clone(&self.batcher);
                self.runtime.spawn(async move {
                    if let Err(e) = batcher.flush().await {
                        warn!(error = %e, "Final flush failed");
                    }
                })
            }
        };
        *self.drain.lock() = Some(handle);
        debug!(pending = self.batcher.pending_len(), "Remote log draining");
        Ok(())
    }
}
