// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.

//! Device identity, status and battery model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::Reading;

/// Device kinds deployed across the city.
///
/// This is the one canonical kind tag: readings, edge summarizers, security
/// rules and department filters all dispatch on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeviceKind {
    Camera,             // CCTV, 4K video analytics
    TrafficSensor,      // Speed / count / classification loops
    WasteBin,           // Fill-level sensor
    Streetlight,        // Smart light doubling as a 5G small cell
    PollutionSensor,    // PM2.5/PM10/NO2/CO/O3/SO2
    WaterQualitySensor, // pH, turbidity, dissolved oxygen
    NoiseSensor,        // Sound level meter
    ParkingSensor,      // Bay occupancy
}

impl DeviceKind {
    pub const ALL: [DeviceKind; 8] = [
        DeviceKind::Camera,
        DeviceKind::TrafficSensor,
        DeviceKind::WasteBin,
        DeviceKind::Streetlight,
        DeviceKind::PollutionSensor,
        DeviceKind::WaterQualitySensor,
        DeviceKind::NoiseSensor,
        DeviceKind::ParkingSensor,
    ];

    /// Prefix used when minting device ids (`cctv_cam_3`, `waste_bin_12`, ...)
    pub fn id_prefix(self) -> &'static str {
        match self {
            DeviceKind::Camera => "cctv_cam",
            DeviceKind::TrafficSensor => "traffic_sensor",
            DeviceKind::WasteBin => "waste_bin",
            DeviceKind::Streetlight => "smart_light",
            DeviceKind::PollutionSensor => "pollution_sensor",
            DeviceKind::WaterQualitySensor => "water_quality",
            DeviceKind::NoiseSensor => "noise_sensor",
            DeviceKind::ParkingSensor => "parking_sensor",
        }
    }

    /// JSON key under which this kind's payload appears in a serialized reading
    pub fn payload_key(self) -> &'static str {
        match self {
            DeviceKind::Camera => "videoFrame",
            DeviceKind::TrafficSensor => "traffic",
            DeviceKind::WasteBin => "waste",
            DeviceKind::Streetlight => "lighting",
            DeviceKind::PollutionSensor => "airQuality",
            DeviceKind::WaterQualitySensor => "waterQuality",
            DeviceKind::NoiseSensor => "noiseLevel",
            DeviceKind::ParkingSensor => "parkingStatus",
        }
    }

    /// Guess a device's kind from a substring of its id.
    pub fn infer_from_id(device_id: &str) -> Option<DeviceKind> {
        const MARKERS: [(&str, DeviceKind); 8] = [
            ("cctv", DeviceKind::Camera),
            ("traffic", DeviceKind::TrafficSensor),
            ("waste", DeviceKind::WasteBin),
            ("light", DeviceKind::Streetlight),
            ("pollution", DeviceKind::PollutionSensor),
            ("water", DeviceKind::WaterQualitySensor),
            ("noise", DeviceKind::NoiseSensor),
            ("parking", DeviceKind::ParkingSensor),
        ];
        MARKERS
            .iter()
            .find(|(marker, _)| device_id.contains(marker))
            .map(|(_, kind)| *kind)
    }

    /// Default radio for the kind
    pub fn default_network(self) -> NetworkType {
        match self {
            DeviceKind::Camera | DeviceKind::Streetlight => NetworkType::FiveG,
            DeviceKind::TrafficSensor | DeviceKind::PollutionSensor | DeviceKind::NoiseSensor => {
                NetworkType::WiFi6
            }
            DeviceKind::WasteBin | DeviceKind::WaterQualitySensor | DeviceKind::ParkingSensor => {
                NetworkType::Lpwan
            }
        }
    }

    /// Nominal power draw in watts
    pub fn energy_draw_watts(self) -> f64 {
        match self {
            DeviceKind::Camera => 25.0,
            DeviceKind::TrafficSensor => 15.0,
            DeviceKind::WasteBin => 5.0,
            DeviceKind::Streetlight => 45.0,
            DeviceKind::PollutionSensor => 12.0,
            DeviceKind::WaterQualitySensor => 8.0,
            DeviceKind::NoiseSensor => 12.0,
            DeviceKind::ParkingSensor => 5.0,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            DeviceKind::Camera => "Camera",
            DeviceKind::TrafficSensor => "TrafficSensor",
            DeviceKind::WasteBin => "WasteBin",
            DeviceKind::Streetlight => "Streetlight",
            DeviceKind::PollutionSensor => "PollutionSensor",
            DeviceKind::WaterQualitySensor => "WaterQualitySensor",
            DeviceKind::NoiseSensor => "NoiseSensor",
            DeviceKind::ParkingSensor => "ParkingSensor",
        }
    }

    /// Parse a kind name, case-insensitively
    pub fn parse(name: &str) -> Option<DeviceKind> {
        DeviceKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.name().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Radio technology a device uses to reach its edge node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NetworkType {
    #[serde(rename = "5G")]
    FiveG,
    #[serde(rename = "WiFi6")]
    WiFi6,
    #[serde(rename = "LPWAN")]
    Lpwan,
    #[serde(rename = "unknown")]
    Unknown,
}

impl NetworkType {
    /// Radios a device can be fitted with at setup
    pub const RADIOS: [NetworkType; 3] = [NetworkType::FiveG, NetworkType::WiFi6, NetworkType::Lpwan];

    /// Battery percent lost per battery tick
    pub fn drain_rate(self) -> f64 {
        match self {
            NetworkType::FiveG => 0.5,
            NetworkType::WiFi6 => 0.3,
            NetworkType::Lpwan => 0.1,
            NetworkType::Unknown => DEFAULT_DRAIN_RATE,
        }
    }

    /// Never fails: unrecognised names become `Unknown`.
    pub fn parse(name: &str) -> NetworkType {
        match name.trim().to_ascii_lowercase().as_str() {
            "5g" => NetworkType::FiveG,
            "wifi6" | "wifi 6" | "wi-fi6" | "wi-fi 6" => NetworkType::WiFi6,
            "lpwan" => NetworkType::Lpwan,
            _ => NetworkType::Unknown,
        }
    }
}

/// Drain rate for radios we do not recognise
pub const DEFAULT_DRAIN_RATE: f64 = 0.2;

/// Below this battery percentage an online device reports `LowBattery`
pub const LOW_BATTERY_THRESHOLD: f64 = 10.0;

const EMPTY_EPSILON: f64 = 1e-9;

/// Device operational status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceStatus {
    Online,
    LowBattery,
    Offline,
    Malfunction,
}

/// WGS84 coordinate
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// Per-kind state that persists between readings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorState {
    Camera { resolution: String, frame_rate: u32 },
    WasteBin { fill_level: f64, capacity_liters: f64 },
    Streetlight { brightness: f64 },
    Stateless,
}

/// A simulated field device.
///
/// Identity fields never change after creation; battery, status and the
/// per-kind sensor state are mutated by the scheduler only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Device {
    pub id: String,
    pub kind: DeviceKind,
    pub location: GeoPoint,
    pub network_type: NetworkType,
    pub energy_draw_watts: f64,
    pub battery_level: f64,
    pub status: DeviceStatus,
    pub assigned_edge_node_id: Option<String>,
    pub last_update: DateTime<Utc>,
    pub sensor_state: SensorState,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub last_reading: Option<Reading>,
}

impl Device {
    pub fn new(id: &str, kind: DeviceKind, location: GeoPoint, now: DateTime<Utc>) -> Self {
        let sensor_state = match kind {
            DeviceKind::Camera => SensorState::Camera {
                resolution: "4K".to_string(),
                frame_rate: 30,
            },
            DeviceKind::WasteBin => SensorState::WasteBin {
                fill_level: 0.0,
                capacity_liters: 100.0,
            },
            DeviceKind::Streetlight => SensorState::Streetlight { brightness: 100.0 },
            _ => SensorState::Stateless,
        };

        Self {
            id: id.to_string(),
            kind,
            location,
            network_type: kind.default_network(),
            energy_draw_watts: kind.energy_draw_watts(),
            battery_level: 100.0,
            status: DeviceStatus::Online,
            assigned_edge_node_id: None,
            last_update: now,
            sensor_state,
            last_reading: None,
        }
    }

    pub fn with_network(mut self, network_type: NetworkType) -> Self {
        self.network_type = network_type;
        self
    }

    /// Start from a given charge; status follows the level.
    pub fn with_battery(mut self, level: f64) -> Self {
        self.battery_level = level.clamp(0.0, 100.0);
        self.refresh_battery_status();
        self
    }

    pub fn with_fill_level(mut self, level: f64) -> Self {
        if let SensorState::WasteBin { fill_level, .. } = &mut self.sensor_state {
            *fill_level = level.clamp(0.0, 100.0);
        }
        self
    }

    /// Current waste-bin fill level, `None` for other kinds
    pub fn fill_level(&self) -> Option<f64> {
        match self.sensor_state {
            SensorState::WasteBin { fill_level, .. } => Some(fill_level),
            _ => None,
        }
    }

    pub fn is_online(&self) -> bool {
        self.status == DeviceStatus::Online
    }

    /// Offline devices produce no readings
    pub fn is_reporting(&self) -> bool {
        self.status != DeviceStatus::Offline
    }

    /// Apply `ticks` battery ticks at the radio's drain rate.
    ///
    /// Returns true when the status changed.
    pub fn drain_battery(&mut self, ticks: u32) -> bool {
        let before = self.status;
        let drained = self.network_type.drain_rate() * f64::from(ticks);
        self.battery_level = (self.battery_level - drained).max(0.0);
        if self.battery_level < EMPTY_EPSILON {
            self.battery_level = 0.0;
        }
        self.refresh_battery_status();
        self.status != before
    }

    /// External reset (battery swap)
    pub fn recharge(&mut self) {
        self.battery_level = 100.0;
        if matches!(self.status, DeviceStatus::LowBattery | DeviceStatus::Offline) {
            self.status = DeviceStatus::Online;
        }
    }

    /// Bring a malfunctioning device back; returns false for any other status
    pub fn repair(&mut self) -> bool {
        if self.status != DeviceStatus::Malfunction {
            return false;
        }
        self.status = DeviceStatus::Online;
        self.refresh_battery_status();
        true
    }

    fn refresh_battery_status(&mut self) {
        if self.battery_level == 0.0 {
            self.status = DeviceStatus::Offline;
        } else if self.battery_level < LOW_BATTERY_THRESHOLD && self.status == DeviceStatus::Online {
            self.status = DeviceStatus::LowBattery;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn device(network: NetworkType) -> Device {
        Device::new("traffic_sensor_1", DeviceKind::TrafficSensor, GeoPoint::new(40.75, -73.98), Utc::now())
            .with_network(network)
    }

    #[test]
    fn test_drain_rates_per_network() {
        let mut d = device(NetworkType::FiveG);
        d.drain_battery(1);
        assert!((d.battery_level - 99.5).abs() < 1e-9);

        let mut d = device(NetworkType::Lpwan);
        d.drain_battery(10);
        assert!((d.battery_level - 99.0).abs() < 1e-9);

        let mut d = device(NetworkType::parse("Wi-Fi 6"));
        d.drain_battery(1);
        assert!((d.battery_level - 99.7).abs() < 1e-9);

        let mut d = device(NetworkType::parse("satellite"));
        assert_eq!(d.network_type, NetworkType::Unknown);
        d.drain_battery(1);
        assert!((d.battery_level - 99.8).abs() < 1e-9);
    }

    #[test]
    fn test_low_battery_then_offline() {
        let mut d = device(NetworkType::FiveG).with_battery(10.2);
        assert_eq!(d.status, DeviceStatus::Online);

        assert!(d.drain_battery(1));
        assert_eq!(d.status, DeviceStatus::LowBattery);

        d.drain_battery(100);
        assert_eq!(d.battery_level, 0.0);
        assert_eq!(d.status, DeviceStatus::Offline);
    }

    #[test]
    fn test_lpwan_reaches_exactly_zero() {
        let mut d = device(NetworkType::Lpwan);
        for _ in 0..1000 {
            d.drain_battery(1);
        }
        assert_eq!(d.battery_level, 0.0);
        assert_eq!(d.status, DeviceStatus::Offline);
    }

    #[test]
    fn test_malfunction_survives_low_battery() {
        let mut d = device(NetworkType::FiveG).with_battery(10.2);
        d.status = DeviceStatus::Malfunction;
        d.drain_battery(1);
        assert_eq!(d.status, DeviceStatus::Malfunction);
    }

    #[test]
    fn test_repair_only_from_malfunction() {
        let mut d = device(NetworkType::Lpwan);
        assert!(!d.repair());

        d.status = DeviceStatus::Malfunction;
        assert!(d.repair());
        assert_eq!(d.status, DeviceStatus::Online);

        let mut low = device(NetworkType::Lpwan).with_battery(5.0);
        low.status = DeviceStatus::Malfunction;
        assert!(low.repair());
        assert_eq!(low.status, DeviceStatus::LowBattery);
    }

    #[test]
    fn test_recharge() {
        let mut d = device(NetworkType::FiveG).with_battery(0.0);
        assert_eq!(d.status, DeviceStatus::Offline);
        d.recharge();
        assert_eq!(d.status, DeviceStatus::Online);
        assert_eq!(d.battery_level, 100.0);
    }

    #[test]
    fn test_infer_kind_from_id() {
        assert_eq!(DeviceKind::infer_from_id("cctv_cam_4"), Some(DeviceKind::Camera));
        assert_eq!(DeviceKind::infer_from_id("smart_light_2"), Some(DeviceKind::Streetlight));
        assert_eq!(DeviceKind::infer_from_id("network_monitor"), None);
        for kind in DeviceKind::ALL {
            let id = format!("{}_1", kind.id_prefix());
            assert_eq!(DeviceKind::infer_from_id(&id), Some(kind));
        }
    }

    proptest! {
        #[test]
        fn battery_stays_in_range(start in 0.0f64..=100.0, ticks in proptest::collection::vec(0u32..50, 0..40), net in 0usize..4) {
            let network = [NetworkType::FiveG, NetworkType::WiFi6, NetworkType::Lpwan, NetworkType::Unknown][net];
            let mut d = device(network).with_battery(start);
            for t in ticks {
                let before = d.battery_level;
                d.drain_battery(t);
                prop_assert!(d.battery_level >= 0.0 && d.battery_level <= 100.0);
                prop_assert!(d.battery_level <= before);
                if d.status == DeviceStatus::Offline {
                    prop_assert_eq!(d.battery_level, 0.0);
                }
            }
        }
    }
}
