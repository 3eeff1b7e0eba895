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

//! Trace replay
//!
//! A trace is a JSON-lines file with one [`LifecycleSignal`] per line. Blank
//! lines are skipped.

use crate::config::CliConfig;
use anyhow::{Context, Result};
use reactlog_core::{Kernel, KernelOptions, LifecycleSignal, MemorySink, PluginRef};
use reactlog_plugins::{
    BatchStats, ConsoleLogger, RemoteLogPlugin, RenderCounter, RenderTally, Sampled,
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::BufRead;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Outcome of a replay run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReplaySummary {
    pub events: usize,
    pub by_kind: BTreeMap<String, usize>,
    pub renders: BTreeMap<String, RenderTally>,
    /// Components still mounted when the trace ended.
    pub live_components: Vec<String>,
    pub errors: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_log: Option<BatchStats>,
}

pub fn read_trace(path: &Path) -> Result<Vec<LifecycleSignal>> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open trace {}", path.display()))?;
    parse_trace(std::io::BufReader::new(file))
        .with_context(|| format!("Invalid trace {}", path.display()))
}

pub fn parse_trace(reader: impl BufRead) -> Result<Vec<LifecycleSignal>> {
    let mut signals = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let signal: LifecycleSignal = serde_json::from_str(&line)
            .with_context(|| format!("Line {}: not a lifecycle signal", index + 1))?;
        signals.push(signal);
    }
    Ok(signals)
}

/// Run `signals` through a fresh kernel built from `config`.
///
/// Must be called inside a tokio runtime when remote logging is configured.
pub async fn replay(signals: Vec<LifecycleSignal>, config: &CliConfig) -> Result<ReplaySummary> {
    let sink = Arc::new(MemorySink::new());
    let counter = Arc::new(RenderCounter::new());
    let mut plugins: Vec<PluginRef> = vec![Arc::new(ConsoleLogger::new()), counter.clone()];

    let remote = match &config.remote_log {
        Some(remote_config) => {
            let remote = Arc::new(RemoteLogPlugin::new(remote_config)?);
            if remote_config.sample_rate < 1.0 {
                plugins.push(Arc::new(Sampled::new(
                    remote.clone(),
                    remote_config.sample_rate,
                )));
            } else {
                plugins.push(remote.clone());
            }
            info!(endpoint = %remote_config.endpoint, "Remote logging enabled");
            Some(remote)
        }
        None => None,
    };

    let kernel = Kernel::with_options(
        KernelOptions::new()
            .with_plugins(plugins)
            .with_settings(config.kernel.clone()),
    )?
    .with_sink(sink.clone());
    kernel.init()?;

    let mut summary = ReplaySummary {
        events: signals.len(),
        ..Default::default()
    };
    for signal in signals {
        *summary
            .by_kind
            .entry(signal.kind().as_str().to_string())
            .or_default() += 1;
        // Failures are collected by the sink
        if let Err(e) = kernel.notify(signal) {
            debug!(error = %e, "Signal dropped");
        }
    }

    summary.live_components = kernel
        .live_components()
        .into_iter()
        .map(|id| id.to_string())
        .collect();

    kernel.destroy()?;
    if let Some(remote) = &remote {
        remote.drained().await;
        summary.remote_log = Some(remote.stats());
    }

    summary.renders = counter.snapshot();
    summary.errors = sink.messages();
    Ok(summary)
}
