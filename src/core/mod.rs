//! Core simulation module - scheduler, events, scenarios and the city engine

mod clock;
mod engine;
mod event_bus;
pub mod scenarios;
mod scheduler;

pub use clock::{Clock, SystemClock, VirtualClock};
pub use engine::{CitySimulation, ScenarioResult};
pub use event_bus::{CityEvent, CitySnapshot, DeviceData, DeviceSnapshot, Event, EventBus};
pub use scenarios::{EmergencyAlert, EmergencyType, ScenarioKind};
pub use scheduler::{DeferredQueue, DeferredTask};

use serde::{Deserialize, Serialize};

use crate::devices::Device;
use crate::edge::EdgeNode;
use crate::security::SecurityStatus;

/// grams of CO2 per MB kept off the uplink
const CO2_GRAMS_PER_MB: f64 = 0.5;

/// Derived energy snapshot; recomputed from devices and edge nodes
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnergyStats {
    pub total_consumption_watts: f64,
    #[serde(rename = "cloudDataSavedMB")]
    pub cloud_data_saved_mb: f64,
    pub co2_reduction_kg_per_hour: f64,
}

impl EnergyStats {
    pub fn compute(devices: &[Device], edge_nodes: &[EdgeNode]) -> Self {
        let device_watts: f64 = devices
            .iter()
            .filter(|d| d.is_reporting())
            .map(|d| d.energy_draw_watts)
            .sum();
        let edge_watts: f64 = edge_nodes.iter().map(|n| n.energy_consumption_watts()).sum();
        let cloud_data_saved_mb: f64 = edge_nodes.iter().map(|n| n.cloud_data_saved_mb()).sum();

        Self {
            total_consumption_watts: device_watts + edge_watts,
            cloud_data_saved_mb,
            co2_reduction_kg_per_hour: cloud_data_saved_mb * CO2_GRAMS_PER_MB / 1000.0,
        }
    }
}

/// City-wide summary for hosts
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CityStatus {
    pub devices: usize,
    pub online_devices: usize,
    pub edge_nodes: usize,
    pub active_alerts: usize,
    pub energy_stats: EnergyStats,
    pub security_status: SecurityStatus,
    pub is_running: bool,
}

/// Outcome counts of one main tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TickReport {
    pub processed: usize,
    pub skipped_offline: usize,
    pub failed: usize,
}
