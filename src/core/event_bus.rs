// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.

//! Event bus the simulation publishes to; hosts subscribe

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::broadcast;

use super::scenarios::EmergencyAlert;
use super::EnergyStats;
use crate::devices::{Device, DeviceKind, DeviceStatus, GeoPoint, NetworkType, Reading};
use crate::edge::{EdgeNodeStatus, ProcessedSummary};
use crate::security::{EncryptedPacket, PacketAnalysis, SecurityStatus};

/// Device fields carried on the wire
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceSnapshot {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: DeviceKind,
    pub location: GeoPoint,
    pub status: DeviceStatus,
    pub battery_level: f64,
    pub network_type: NetworkType,
    pub connected_edge_node: Option<String>,
}

impl From<&Device> for DeviceSnapshot {
    fn from(device: &Device) -> Self {
        Self {
            id: device.id.clone(),
            kind: device.kind,
            location: device.location,
            status: device.status,
            battery_level: device.battery_level,
            network_type: device.network_type,
            connected_edge_node: device.assigned_edge_node_id.clone(),
        }
    }
}

/// One device's trip through security and its edge node
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceData {
    pub device: DeviceSnapshot,
    pub raw_data: Reading,
    pub encrypted_packet: EncryptedPacket,
    pub processed_data: ProcessedSummary,
    pub edge_node_id: String,
    pub security: PacketAnalysis,
}

/// Full state sent once when the simulation starts
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CitySnapshot {
    pub devices: Vec<DeviceSnapshot>,
    pub edge_nodes: Vec<EdgeNodeStatus>,
    pub energy_stats: EnergyStats,
    pub security_status: SecurityStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum CityEvent {
    CityInitialized(Box<CitySnapshot>),
    DeviceData(Box<DeviceData>),
    EdgeNodesStatus(Vec<EdgeNodeStatus>),
    SecurityStatus(Box<SecurityStatus>),
    EnergyStats(EnergyStats),
    EmergencyAlert(EmergencyAlert),
    #[serde(rename_all = "camelCase")]
    AlertCleared { alert_id: String },
    #[serde(rename_all = "camelCase")]
    DeviceRepaired { device_id: String },
}

impl CityEvent {
    pub fn name(&self) -> &'static str {
        match self {
            CityEvent::CityInitialized(_) => "city_initialized",
            CityEvent::DeviceData(_) => "device_data",
            CityEvent::EdgeNodesStatus(_) => "edge_nodes_status",
            CityEvent::SecurityStatus(_) => "security_status",
            CityEvent::EnergyStats(_) => "energy_stats",
            CityEvent::EmergencyAlert(_) => "emergency_alert",
            CityEvent::AlertCleared { .. } => "alert_cleared",
            CityEvent::DeviceRepaired { .. } => "device_repaired",
        }
    }
}

/// Generic event wrapper
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: u64,
    pub timestamp: DateTime<Utc>,
    pub payload: CityEvent,
}

/// Fan-out channel for simulation output.
///
/// Publishing never blocks; with no subscribers events are dropped, and a
/// lagging subscriber loses the oldest ones.
pub struct EventBus {
    event_tx: broadcast::Sender<Event>,
    event_counter: AtomicU64,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (event_tx, _) = broadcast::channel(capacity.max(1));

        Self {
            event_tx,
            event_counter: AtomicU64::new(0),
        }
    }

    pub fn publish(&self, payload: CityEvent, timestamp: DateTime<Utc>) {
        let id = self.event_counter.fetch_add(1, Ordering::Relaxed);
        let _ = self.event_tx.send(Event { id, timestamp, payload });
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.event_tx.receiver_count()
    }

    /// Events published so far, delivered or not
    pub fn published(&self) -> u64 {
        self.event_counter.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_and_subscribe() {
        let bus = EventBus::new(8);
        bus.publish(CityEvent::AlertCleared { alert_id: "dropped".into() }, Utc::now());

        let mut rx = bus.subscribe();
        bus.publish(CityEvent::DeviceRepaired { device_id: "cctv_cam_1".into() }, Utc::now());

        let event = rx.try_recv().unwrap();
        assert_eq!(event.id, 1);
        assert_eq!(event.payload.name(), "device_repaired");
        assert_eq!(bus.published(), 2);
    }

    #[test]
    fn test_event_json_shape() {
        let event = CityEvent::AlertCleared { alert_id: "incident_1".into() };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "alert_cleared");
        assert_eq!(json["data"]["alertId"], "incident_1");
    }
}
