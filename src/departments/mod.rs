//! Department views - per-department device filters, dashboards and
//! threshold alerts. Read-only over the device set.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::debug;

use crate::devices::{
    AirQuality, CongestionLevel, Detections, Device, DeviceKind, DeviceStatus, GeoPoint, LightingData,
    NetworkType, Payload, SmallCell, VehicleMix,
};
use crate::error::{CityError, CityResult};

#[derive(Debug, Clone, Copy, Serialize)]
pub struct ContactInfo {
    pub email: &'static str,
    pub phone: &'static str,
    pub address: &'static str,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Department {
    pub id: &'static str,
    pub name: &'static str,
    pub api_endpoint: &'static str,
    pub device_kinds: &'static [DeviceKind],
    pub contact_info: ContactInfo,
    pub responsibilities: &'static [&'static str],
}

impl Department {
    pub fn handles(&self, kind: DeviceKind) -> bool {
        self.device_kinds.contains(&kind)
    }
}

pub static DEPARTMENTS: [Department; 4] = [
    Department {
        id: "chennai_police",
        name: "Chennai Police Department",
        api_endpoint: "/api/departments/police",
        device_kinds: &[DeviceKind::Camera, DeviceKind::TrafficSensor],
        contact_info: ContactInfo {
            email: "traffic.control@chennaicity.gov.in",
            phone: "+91-44-2854-0500",
            address: "Chennai Police Headquarters, Egmore",
        },
        responsibilities: &[
            "Traffic Light Controls",
            "CCTV Monitoring",
            "Traffic Flow Management",
            "Security Surveillance",
            "Emergency Response",
        ],
    },
    Department {
        id: "urbaser_cleaning",
        name: "Urbaser Sumeet Cleaning Services",
        api_endpoint: "/api/departments/cleaning",
        device_kinds: &[DeviceKind::WasteBin],
        contact_info: ContactInfo {
            email: "operations@urbasersumeet.com",
            phone: "+91-44-2851-2345",
            address: "Urbaser Sumeet Office, Chennai",
        },
        responsibilities: &["Waste Collection", "Street Cleaning", "Bin Monitoring", "Route Optimization"],
    },
    Department {
        id: "tnpcb_environment",
        name: "Tamil Nadu Pollution Control Board",
        api_endpoint: "/api/departments/environment",
        device_kinds: &[
            DeviceKind::PollutionSensor,
            DeviceKind::WaterQualitySensor,
            DeviceKind::NoiseSensor,
        ],
        contact_info: ContactInfo {
            email: "monitoring@tnpcb.gov.in",
            phone: "+91-44-2432-1267",
            address: "TNPCB Office, Guindy, Chennai",
        },
        responsibilities: &[
            "Air Quality Monitoring",
            "Water Quality Assessment",
            "Noise Level Control",
            "Environmental Compliance",
            "Pollution Alerts",
        ],
    },
    Department {
        id: "chennai_municipal",
        name: "Greater Chennai Corporation",
        api_endpoint: "/api/departments/municipal",
        device_kinds: &[DeviceKind::Streetlight, DeviceKind::WaterQualitySensor],
        contact_info: ContactInfo {
            email: "smartcity@chennaicorporation.gov.in",
            phone: "+91-44-2854-1234",
            address: "Ripon Building, Chennai Corporation",
        },
        responsibilities: &[
            "Street Lighting",
            "Public Infrastructure",
            "Water Supply Monitoring",
            "City Maintenance",
        ],
    },
];

pub fn get_department(department_id: &str) -> CityResult<&'static Department> {
    DEPARTMENTS
        .iter()
        .find(|d| d.id == department_id)
        .ok_or_else(|| CityError::DepartmentNotFound(department_id.to_string()))
}

/// First department (registry order) that handles `kind`
pub fn department_for_kind(kind: DeviceKind) -> Option<&'static Department> {
    DEPARTMENTS.iter().find(|d| d.handles(kind))
}

/// Per-kind alert thresholds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlertThresholds {
    pub offline_after: Duration,
    /// Waste bins above this percent need collection
    pub fill_level: Option<f64>,
    /// Pollution sensors above this AQI raise an alert
    pub aqi: Option<f64>,
}

/// Kinds without thresholds never raise department alerts
pub fn thresholds(kind: DeviceKind) -> Option<AlertThresholds> {
    let base = |minutes| AlertThresholds {
        offline_after: Duration::minutes(minutes),
        fill_level: None,
        aqi: None,
    };
    match kind {
        DeviceKind::Camera => Some(base(5)),
        DeviceKind::TrafficSensor => Some(base(3)),
        DeviceKind::WasteBin => Some(AlertThresholds { fill_level: Some(85.0), ..base(60) }),
        DeviceKind::PollutionSensor => Some(AlertThresholds { aqi: Some(150.0), ..base(30) }),
        DeviceKind::Streetlight => Some(base(30)),
        DeviceKind::WaterQualitySensor | DeviceKind::NoiseSensor | DeviceKind::ParkingSensor => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DepartmentAlertType {
    DeviceOffline,
    SecurityIncident,
    TrafficCongestion,
    WasteCollectionNeeded,
    PollutionAlert,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertPriority {
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentAlert {
    #[serde(rename = "type")]
    pub alert_type: DepartmentAlertType,
    pub device_id: String,
    pub device_type: DeviceKind,
    pub severity: AlertPriority,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<GeoPoint>,
    pub timestamp: DateTime<Utc>,
}

/// Kind-specific detail taken from a device's latest reading
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum DeviceDetail {
    Cctv {
        resolution: String,
        detections: Detections,
    },
    #[serde(rename_all = "camelCase")]
    Traffic {
        speed: u32,
        vehicle_count: u32,
        congestion_level: CongestionLevel,
        vehicle_types: VehicleMix,
    },
    #[serde(rename_all = "camelCase")]
    Waste {
        fill_level: f64,
        needs_collection: bool,
        last_emptied: DateTime<Utc>,
        temperature: u32,
    },
    Pollution(AirQuality),
    #[serde(rename_all = "camelCase")]
    Lighting {
        brightness: f64,
        motion_detected: bool,
        energy_consumption: f64,
        operating_mode: String,
        small_cell: SmallCell,
    },
}

impl DeviceDetail {
    fn from_payload(payload: &Payload) -> Option<Self> {
        let detail = match payload {
            Payload::VideoFrame(frame) => DeviceDetail::Cctv {
                resolution: frame.resolution.clone(),
                detections: frame.detections.clone(),
            },
            Payload::Traffic(t) => DeviceDetail::Traffic {
                speed: t.speed,
                vehicle_count: t.vehicle_count,
                congestion_level: t.congestion_level,
                vehicle_types: t.vehicle_types.clone(),
            },
            Payload::Waste(w) => DeviceDetail::Waste {
                fill_level: w.fill_level,
                needs_collection: w.needs_collection,
                last_emptied: w.last_emptied,
                temperature: w.temperature,
            },
            Payload::AirQuality(aq) => DeviceDetail::Pollution(aq.clone()),
            Payload::Lighting(LightingData {
                brightness,
                motion_detected,
                energy_consumption,
                operating_mode,
                small_cell,
            }) => DeviceDetail::Lighting {
                brightness: *brightness,
                motion_detected: *motion_detected,
                energy_consumption: *energy_consumption,
                operating_mode: operating_mode.clone(),
                small_cell: small_cell.clone(),
            },
            Payload::WaterQuality(_) | Payload::NoiseLevel(_) | Payload::ParkingStatus(_) => return None,
        };
        Some(detail)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceView {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: DeviceKind,
    pub location: GeoPoint,
    pub status: DeviceStatus,
    pub battery_level: f64,
    pub last_update: DateTime<Utc>,
    pub network_type: NetworkType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<DeviceDetail>,
}

impl From<&Device> for DeviceView {
    fn from(device: &Device) -> Self {
        Self {
            id: device.id.clone(),
            kind: device.kind,
            location: device.location,
            status: device.status,
            battery_level: device.battery_level,
            last_update: device.last_update,
            network_type: device.network_type,
            detail: device
                .last_reading
                .as_ref()
                .and_then(|r| DeviceDetail::from_payload(&r.payload)),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CameraSection {
    pub total: usize,
    pub active: usize,
    pub incidents_detected: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrafficSection {
    pub total: usize,
    pub active: usize,
    pub high_congestion_areas: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WasteSection {
    pub total: usize,
    pub needing_collection: usize,
    pub average_fill_level: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentSection {
    pub total: usize,
    pub active: usize,
    pub alerts_active: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LightingSection {
    pub total: usize,
    pub active: usize,
    /// Watts, summed over the latest readings
    pub energy_consumption: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentSummary {
    pub total_devices: usize,
    pub online_devices: usize,
    pub offline_devices: usize,
    pub low_battery_devices: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cctv: Option<CameraSection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub traffic: Option<TrafficSection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub waste_bins: Option<WasteSection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment: Option<EnvironmentSection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lighting: Option<LightingSection>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentInfo {
    pub id: &'static str,
    pub name: &'static str,
    pub contact_info: ContactInfo,
    pub responsibilities: &'static [&'static str],
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardPayload {
    pub department: DepartmentInfo,
    pub timestamp: DateTime<Utc>,
    pub device_count: usize,
    pub devices: Vec<DeviceView>,
    pub summary: DepartmentSummary,
    pub alerts: Vec<DepartmentAlert>,
}

/// Devices whose kind the department handles
pub fn filter_for_department(devices: &[Device], department_id: &str) -> CityResult<Vec<Device>> {
    let department = get_department(department_id)?;
    Ok(devices.iter().filter(|d| department.handles(d.kind)).cloned().collect())
}

pub fn format_for_department(
    devices: &[Device],
    department_id: &str,
    now: DateTime<Utc>,
) -> CityResult<DashboardPayload> {
    let department = get_department(department_id)?;
    let relevant: Vec<&Device> = devices.iter().filter(|d| department.handles(d.kind)).collect();
    let alerts = evaluate_alerts(&relevant, now);
    debug!(
        department = department.id,
        devices = relevant.len(),
        alerts = alerts.len(),
        "Formatted department dashboard"
    );

    Ok(DashboardPayload {
        department: DepartmentInfo {
            id: department.id,
            name: department.name,
            contact_info: department.contact_info,
            responsibilities: department.responsibilities,
        },
        timestamp: now,
        device_count: relevant.len(),
        devices: relevant.iter().map(|d| DeviceView::from(*d)).collect(),
        summary: summarize(department, &relevant),
        alerts,
    })
}

/// Threshold alerts for the department's devices
pub fn check_device_alerts(
    devices: &[Device],
    department_id: &str,
    now: DateTime<Utc>,
) -> CityResult<Vec<DepartmentAlert>> {
    let department = get_department(department_id)?;
    let relevant: Vec<&Device> = devices.iter().filter(|d| department.handles(d.kind)).collect();
    Ok(evaluate_alerts(&relevant, now))
}

fn evaluate_alerts(devices: &[&Device], now: DateTime<Utc>) -> Vec<DepartmentAlert> {
    let mut alerts = Vec::new();

    for device in devices {
        let Some(limits) = thresholds(device.kind) else {
            continue;
        };
        let alert = |alert_type, severity, message: String, location| DepartmentAlert {
            alert_type,
            device_id: device.id.clone(),
            device_type: device.kind,
            severity,
            message,
            location,
            timestamp: now,
        };

        if device.status == DeviceStatus::Offline {
            let offline_for = now - device.last_update;
            if offline_for > limits.offline_after {
                alerts.push(alert(
                    DepartmentAlertType::DeviceOffline,
                    AlertPriority::High,
                    format!("Device {} has been offline for {} minutes", device.id, offline_for.num_minutes()),
                    None,
                ));
            }
        }

        if let Some(limit) = limits.fill_level {
            if let Some(level) = device.fill_level().filter(|level| *level > limit) {
                alerts.push(alert(
                    DepartmentAlertType::WasteCollectionNeeded,
                    AlertPriority::Medium,
                    format!("Waste bin is {}% full and needs collection", level.round()),
                    Some(device.location),
                ));
            }
        }

        match device.last_reading.as_ref().map(|r| &r.payload) {
            Some(Payload::VideoFrame(frame)) if !frame.detections.incidents.is_empty() => {
                alerts.push(alert(
                    DepartmentAlertType::SecurityIncident,
                    AlertPriority::Critical,
                    format!("Security incident detected: {}", frame.detections.incidents.join(", ")),
                    Some(device.location),
                ));
            }
            Some(Payload::Traffic(t)) if t.congestion_level == CongestionLevel::High => {
                alerts.push(alert(
                    DepartmentAlertType::TrafficCongestion,
                    AlertPriority::Medium,
                    "High traffic congestion detected".to_string(),
                    Some(device.location),
                ));
            }
            Some(Payload::AirQuality(aq)) if limits.aqi.map_or(false, |limit| aq.aqi > limit) => {
                alerts.push(alert(
                    DepartmentAlertType::PollutionAlert,
                    AlertPriority::High,
                    format!("Air Quality Index exceeds safe levels: {}", aq.aqi),
                    Some(device.location),
                ));
            }
            _ => {}
        }
    }

    alerts
}

fn summarize(department: &Department, devices: &[&Device]) -> DepartmentSummary {
    let count_status = |status: DeviceStatus| devices.iter().filter(|d| d.status == status).count();
    let of_kind = |kind: DeviceKind| devices.iter().copied().filter(move |d| d.kind == kind);
    let active = |kind: DeviceKind| of_kind(kind).filter(|d| d.is_online()).count();
    let payloads = |kind: DeviceKind| of_kind(kind).filter_map(|d| d.last_reading.as_ref().map(|r| &r.payload));

    let mut summary = DepartmentSummary {
        total_devices: devices.len(),
        online_devices: count_status(DeviceStatus::Online),
        offline_devices: count_status(DeviceStatus::Offline),
        low_battery_devices: count_status(DeviceStatus::LowBattery),
        ..Default::default()
    };

    if department.handles(DeviceKind::Camera) {
        summary.cctv = Some(CameraSection {
            total: of_kind(DeviceKind::Camera).count(),
            active: active(DeviceKind::Camera),
            incidents_detected: payloads(DeviceKind::Camera)
                .map(|p| match p {
                    Payload::VideoFrame(frame) => frame.detections.incidents.len(),
                    _ => 0,
                })
                .sum(),
        });
    }

    if department.handles(DeviceKind::TrafficSensor) {
        summary.traffic = Some(TrafficSection {
            total: of_kind(DeviceKind::TrafficSensor).count(),
            active: active(DeviceKind::TrafficSensor),
            high_congestion_areas: payloads(DeviceKind::TrafficSensor)
                .filter(|p| matches!(p, Payload::Traffic(t) if t.congestion_level == CongestionLevel::High))
                .count(),
        });
    }

    if department.handles(DeviceKind::WasteBin) {
        let levels: Vec<f64> = of_kind(DeviceKind::WasteBin).filter_map(Device::fill_level).collect();
        let limit = thresholds(DeviceKind::WasteBin).and_then(|t| t.fill_level).unwrap_or(85.0);
        summary.waste_bins = Some(WasteSection {
            total: levels.len(),
            needing_collection: levels.iter().filter(|level| **level > limit).count(),
            average_fill_level: if levels.is_empty() {
                0.0
            } else {
                levels.iter().sum::<f64>() / levels.len() as f64
            },
        });
    }

    if department.handles(DeviceKind::PollutionSensor) {
        let limit = thresholds(DeviceKind::PollutionSensor).and_then(|t| t.aqi).unwrap_or(150.0);
        summary.environment = Some(EnvironmentSection {
            total: of_kind(DeviceKind::PollutionSensor).count(),
            active: active(DeviceKind::PollutionSensor),
            alerts_active: payloads(DeviceKind::PollutionSensor)
                .filter(|p| matches!(p, Payload::AirQuality(aq) if aq.aqi > limit))
                .count(),
        });
    }

    if department.handles(DeviceKind::Streetlight) {
        summary.lighting = Some(LightingSection {
            total: of_kind(DeviceKind::Streetlight).count(),
            active: active(DeviceKind::Streetlight),
            energy_consumption: payloads(DeviceKind::Streetlight)
                .map(|p| match p {
                    Payload::Lighting(l) => l.energy_consumption,
                    _ => 0.0,
                })
                .sum(),
        });
    }

    summary
}
