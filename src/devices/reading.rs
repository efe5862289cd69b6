// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.

//! Timestamped device readings and their per-kind payloads

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{DeviceKind, DeviceStatus, GeoPoint};

/// A single reading as it leaves a device.
///
/// Serializes to a flat JSON object: the common header fields plus one
/// payload key (`videoFrame`, `traffic`, `airQuality`, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reading {
    pub device_id: String,
    pub device_type: DeviceKind,
    pub timestamp: DateTime<Utc>,
    pub status: DeviceStatus,
    pub battery_level: f64,
    pub location: GeoPoint,
    #[serde(flatten)]
    pub payload: Payload,
}

impl Reading {
    /// Kind implied by the payload carried
    pub fn payload_kind(&self) -> DeviceKind {
        self.payload.kind()
    }

    /// Size in bytes of the JSON encoding
    pub fn serialized_size(&self) -> usize {
        serde_json::to_vec(self).map(|v| v.len()).unwrap_or(0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Payload {
    VideoFrame(VideoFrame),
    Traffic(TrafficData),
    Waste(WasteData),
    Lighting(LightingData),
    AirQuality(AirQuality),
    WaterQuality(WaterQuality),
    NoiseLevel(NoiseLevel),
    ParkingStatus(ParkingStatus),
}

impl Payload {
    pub fn kind(&self) -> DeviceKind {
        match self {
            Payload::VideoFrame(_) => DeviceKind::Camera,
            Payload::Traffic(_) => DeviceKind::TrafficSensor,
            Payload::Waste(_) => DeviceKind::WasteBin,
            Payload::Lighting(_) => DeviceKind::Streetlight,
            Payload::AirQuality(_) => DeviceKind::PollutionSensor,
            Payload::WaterQuality(_) => DeviceKind::WaterQualitySensor,
            Payload::NoiseLevel(_) => DeviceKind::NoiseSensor,
            Payload::ParkingStatus(_) => DeviceKind::ParkingSensor,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoFrame {
    pub resolution: String,
    pub frame_rate: u32,
    /// Frame size in KB
    pub data_size: u32,
    pub detections: Detections,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Detections {
    pub vehicles: u32,
    pub pedestrians: u32,
    pub incidents: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CongestionLevel {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrafficData {
    /// km/h
    pub speed: u32,
    pub vehicle_count: u32,
    pub average_speed: u32,
    pub congestion_level: CongestionLevel,
    pub vehicle_types: VehicleMix,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleMix {
    pub cars: u32,
    pub trucks: u32,
    pub buses: u32,
    pub motorcycles: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WasteData {
    /// Percent full
    pub fill_level: f64,
    /// Liters
    pub capacity: f64,
    pub temperature: u32,
    pub last_emptied: DateTime<Utc>,
    pub needs_collection: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LightingData {
    pub brightness: f64,
    pub motion_detected: bool,
    /// Watts
    pub energy_consumption: f64,
    pub operating_mode: String,
    pub small_cell: SmallCell,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SmallCell {
    pub is_active: bool,
    pub connected_devices: u32,
    /// MB
    pub data_traffic: u32,
    /// dBm
    pub signal_strength: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AirQuality {
    pub pm25: f64,
    pub pm10: f64,
    pub no2: f64,
    pub co: f64,
    pub o3: f64,
    pub so2: f64,
    pub aqi: f64,
    pub temperature: f64,
    pub humidity: f64,
    pub wind_speed: f64,
}

impl AirQuality {
    /// Pollutants in reporting order
    pub fn pollutants(&self) -> [(&'static str, f64); 6] {
        [
            ("PM2.5", self.pm25),
            ("PM10", self.pm10),
            ("NO2", self.no2),
            ("CO", self.co),
            ("O3", self.o3),
            ("SO2", self.so2),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WaterQuality {
    pub ph: f64,
    /// NTU
    pub turbidity: f64,
    /// mg/L
    pub dissolved_oxygen: f64,
    pub temperature: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoiseLevel {
    pub decibels: f64,
    /// Hz
    pub frequency: u32,
    /// Seconds
    pub duration: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParkingStatus {
    pub occupied: bool,
    pub vehicle_type: String,
    /// Minutes
    pub duration: u32,
    pub payment_status: String,
}
