// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.

//! Edge node load model and processing history

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, VecDeque};
use tracing::trace;

use super::summarizers::{summarize, Analysis};
use super::EdgeConfig;
use crate::devices::{GeoPoint, Reading};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeNodeState {
    Online,
    Offline,
}

/// What an edge node forwards upstream instead of the raw reading
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedSummary {
    pub device_id: String,
    pub timestamp: DateTime<Utc>,
    pub location: GeoPoint,
    #[serde(flatten)]
    pub analysis: Analysis,
    pub processed_at: DateTime<Utc>,
    pub edge_node_id: String,
}

/// One entry of the bounded processing history
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingRecord {
    pub timestamp: DateTime<Utc>,
    pub device_id: String,
    pub raw_size: usize,
    pub processed: ProcessedSummary,
    pub data_saved_bytes: usize,
    pub processing_time_ms: f64,
}

/// Point-in-time view of a node for hosts and dashboards
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeNodeStatus {
    pub id: String,
    pub name: String,
    pub location: GeoPoint,
    pub status: EdgeNodeState,
    pub connected_devices: usize,
    pub cpu_usage: f64,
    pub memory_usage: f64,
    pub energy_consumption: f64,
    pub cloud_data_saved: f64,
    pub recent_processing: Vec<ProcessingRecord>,
}

/// Simulated local compute resource.
///
/// CPU load rises with every processed reading and decays on maintenance
/// ticks. `cloud_data_saved_mb` only ever grows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeNode {
    pub id: String,
    pub name: String,
    pub location: GeoPoint,
    pub processing_power_gflops: f64,
    pub status: EdgeNodeState,
    connected_device_ids: BTreeSet<String>,
    cpu_usage_percent: f64,
    memory_usage_percent: f64,
    energy_consumption_watts: f64,
    cloud_data_saved_mb: f64,
    history: VecDeque<ProcessingRecord>,
    #[serde(skip)]
    tuning: EdgeConfig,
}

const RECENT_PROCESSING_SHOWN: usize = 5;

impl EdgeNode {
    pub fn new(id: &str, name: &str, location: GeoPoint, processing_power_gflops: f64) -> Self {
        Self::with_config(id, name, location, processing_power_gflops, EdgeConfig::default())
    }

    pub fn with_config(
        id: &str,
        name: &str,
        location: GeoPoint,
        processing_power_gflops: f64,
        tuning: EdgeConfig,
    ) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            location,
            processing_power_gflops,
            status: EdgeNodeState::Online,
            connected_device_ids: BTreeSet::new(),
            cpu_usage_percent: 0.0,
            memory_usage_percent: 0.0,
            energy_consumption_watts: tuning.base_power_watts,
            cloud_data_saved_mb: 0.0,
            history: VecDeque::with_capacity(tuning.history_capacity),
            tuning,
        }
    }

    /// Returns false if the device was already connected
    pub fn connect_device(&mut self, device_id: &str) -> bool {
        self.connected_device_ids.insert(device_id.to_string())
    }

    pub fn disconnect_device(&mut self, device_id: &str) -> bool {
        self.connected_device_ids.remove(device_id)
    }

    pub fn connected_device_ids(&self) -> impl Iterator<Item = &str> {
        self.connected_device_ids.iter().map(String::as_str)
    }

    pub fn connected_count(&self) -> usize {
        self.connected_device_ids.len()
    }

    pub fn cpu_usage_percent(&self) -> f64 {
        self.cpu_usage_percent
    }

    pub fn energy_consumption_watts(&self) -> f64 {
        self.energy_consumption_watts
    }

    pub fn cloud_data_saved_mb(&self) -> f64 {
        self.cloud_data_saved_mb
    }

    pub fn history(&self) -> &VecDeque<ProcessingRecord> {
        &self.history
    }

    /// Estimated processing time: 50 ms plus 10 ms per KB of raw reading
    pub fn estimate_processing_ms(raw_size: usize) -> f64 {
        50.0 + (raw_size as f64 / 1000.0) * 10.0
    }

    /// Summarize a reading and account for the work done.
    pub fn process_reading(&mut self, reading: &Reading, now: DateTime<Utc>) -> ProcessedSummary {
        let raw_size = reading.serialized_size();
        let processing_time_ms = Self::estimate_processing_ms(raw_size);
        self.set_cpu(self.cpu_usage_percent + processing_time_ms * self.tuning.cpu_load_per_ms);
        self.memory_usage_percent =
            (self.history.len() as f64 / self.tuning.history_capacity.max(1) as f64) * 100.0;

        let processed = ProcessedSummary {
            device_id: reading.device_id.clone(),
            timestamp: reading.timestamp,
            location: reading.location,
            analysis: summarize(&reading.payload),
            processed_at: now,
            edge_node_id: self.id.clone(),
        };

        let processed_size = serde_json::to_vec(&processed).map(|v| v.len()).unwrap_or(raw_size);
        let data_saved_bytes = raw_size.saturating_sub(processed_size);
        self.cloud_data_saved_mb += data_saved_bytes as f64 / 1024.0;

        trace!(
            edge_node = %self.id,
            device_id = %reading.device_id,
            raw_size,
            processed_size,
            cpu = self.cpu_usage_percent,
            "Processed reading"
        );

        self.history.push_back(ProcessingRecord {
            timestamp: now,
            device_id: reading.device_id.clone(),
            raw_size,
            processed: processed.clone(),
            data_saved_bytes,
            processing_time_ms,
        });
        while self.history.len() > self.tuning.history_capacity {
            self.history.pop_front();
        }

        processed
    }

    /// Maintenance tick: decay CPU load by one step
    pub fn cool_down(&mut self) {
        self.set_cpu(self.cpu_usage_percent - self.tuning.cooldown_step);
    }

    fn set_cpu(&mut self, value: f64) {
        self.cpu_usage_percent = value.clamp(0.0, 100.0);
        self.energy_consumption_watts =
            self.tuning.base_power_watts + self.cpu_usage_percent * self.tuning.watts_per_cpu_percent;
    }

    pub fn status(&self) -> EdgeNodeStatus {
        let skip = self.history.len().saturating_sub(RECENT_PROCESSING_SHOWN);
        EdgeNodeStatus {
            id: self.id.clone(),
            name: self.name.clone(),
            location: self.location,
            status: self.status,
            connected_devices: self.connected_count(),
            cpu_usage: self.cpu_usage_percent,
            memory_usage: self.memory_usage_percent,
            energy_consumption: self.energy_consumption_watts,
            cloud_data_saved: self.cloud_data_saved_mb,
            recent_processing: self.history.iter().skip(skip).cloned().collect(),
        }
    }
}
