// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.

//! Synthetic incident generators

use chrono::{DateTime, Duration, Utc};
use rand::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::scheduler::DeferredTask;
use crate::devices::{Device, DeviceKind, DeviceStatus, GeoPoint};
use crate::security::Severity;

/// Bins above this fill level qualify for a collection alert
pub const WASTE_ALERT_FILL_LEVEL: f64 = 85.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioKind {
    TrafficAccident,
    PollutionSpike,
    WasteCollection,
    DeviceMalfunction,
    SecurityBreach,
}

impl ScenarioKind {
    /// `device_failure` is accepted for `device_malfunction`
    pub fn parse(name: &str) -> Option<ScenarioKind> {
        match name {
            "traffic_accident" => Some(ScenarioKind::TrafficAccident),
            "pollution_spike" => Some(ScenarioKind::PollutionSpike),
            "waste_collection" => Some(ScenarioKind::WasteCollection),
            "device_malfunction" | "device_failure" => Some(ScenarioKind::DeviceMalfunction),
            "security_breach" => Some(ScenarioKind::SecurityBreach),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ScenarioKind::TrafficAccident => "traffic_accident",
            ScenarioKind::PollutionSpike => "pollution_spike",
            ScenarioKind::WasteCollection => "waste_collection",
            ScenarioKind::DeviceMalfunction => "device_malfunction",
            ScenarioKind::SecurityBreach => "security_breach",
        }
    }
}

impl fmt::Display for ScenarioKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmergencyType {
    TrafficIncident,
    PollutionSpike,
    WasteCollection,
    DeviceMalfunction,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmergencyAlert {
    pub id: String,
    #[serde(rename = "type")]
    pub alert_type: EmergencyType,
    pub severity: Severity,
    pub location: GeoPoint,
    pub device_id: String,
    pub description: String,
    pub timestamp: DateTime<Utc>,
    /// When the alert clears itself; `None` means it stays until cleared
    pub auto_clear_after: Option<DateTime<Utc>>,
}

impl EmergencyAlert {
    fn new(
        prefix: &str,
        alert_type: EmergencyType,
        severity: Severity,
        device: &Device,
        description: String,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: format!("{}_{}", prefix, Uuid::new_v4().simple()),
            alert_type,
            severity,
            location: device.location,
            device_id: device.id.clone(),
            description,
            timestamp: now,
            auto_clear_after: None,
        }
    }
}

/// Inclusive delay window in seconds
#[derive(Debug, Clone, Copy)]
pub struct DelayWindow {
    pub min_secs: u64,
    pub max_secs: u64,
}

impl DelayWindow {
    pub fn new(min_secs: u64, max_secs: u64) -> Self {
        Self { min_secs, max_secs: max_secs.max(min_secs) }
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        let secs = rng.gen_range(self.min_secs..=self.max_secs);
        Duration::seconds(i64::try_from(secs).unwrap_or(i64::MAX / 1000))
    }
}

/// What a generator produced: the alert plus an optional follow-up task
#[derive(Debug, Clone)]
pub struct ScenarioOutcome {
    pub alert: EmergencyAlert,
    pub deferred: Option<(DateTime<Utc>, DeferredTask)>,
}

fn pick<'a, R, F>(devices: &'a [Device], rng: &mut R, filter: F) -> Option<&'a Device>
where
    R: Rng + ?Sized,
    F: Fn(&Device) -> bool,
{
    let candidates: Vec<&Device> = devices.iter().filter(|&d| filter(d)).collect();
    candidates.choose(rng).copied()
}

/// Accident at a random online traffic sensor; clears itself later
pub fn traffic_accident<R: Rng + ?Sized>(
    devices: &[Device],
    rng: &mut R,
    now: DateTime<Utc>,
    clear_after: DelayWindow,
) -> Option<ScenarioOutcome> {
    let device = pick(devices, rng, |d| d.kind == DeviceKind::TrafficSensor && d.is_online())?;
    let severity = *[Severity::Low, Severity::Medium, Severity::High]
        .choose(rng)
        .unwrap_or(&Severity::Medium);

    let mut alert = EmergencyAlert::new(
        "incident",
        EmergencyType::TrafficIncident,
        severity,
        device,
        "Traffic accident detected - emergency services notified".to_string(),
        now,
    );
    let clear_at = now + clear_after.sample(rng);
    alert.auto_clear_after = Some(clear_at);
    let task = DeferredTask::ClearAlert(alert.id.clone());

    Some(ScenarioOutcome { alert, deferred: Some((clear_at, task)) })
}

/// Air quality emergency at a random online pollution sensor; never auto-clears
pub fn pollution_spike<R: Rng + ?Sized>(
    devices: &[Device],
    rng: &mut R,
    now: DateTime<Utc>,
) -> Option<ScenarioOutcome> {
    let device = pick(devices, rng, |d| d.kind == DeviceKind::PollutionSensor && d.is_online())?;
    let alert = EmergencyAlert::new(
        "pollution_alert",
        EmergencyType::PollutionSpike,
        Severity::High,
        device,
        "Dangerous air quality levels detected - public health advisory issued".to_string(),
        now,
    );
    Some(ScenarioOutcome { alert, deferred: None })
}

/// Collection request for a random bin above the fill threshold
pub fn waste_collection<R: Rng + ?Sized>(
    devices: &[Device],
    rng: &mut R,
    now: DateTime<Utc>,
) -> Option<ScenarioOutcome> {
    let device = pick(devices, rng, |d| {
        d.fill_level().map_or(false, |level| level > WASTE_ALERT_FILL_LEVEL)
    })?;
    let alert = EmergencyAlert::new(
        "waste_alert",
        EmergencyType::WasteCollection,
        Severity::Medium,
        device,
        "Waste bin requires immediate collection".to_string(),
        now,
    );
    Some(ScenarioOutcome { alert, deferred: None })
}

/// Knock a random online device into malfunction and schedule its repair
pub fn device_malfunction<R: Rng + ?Sized>(
    devices: &mut [Device],
    rng: &mut R,
    now: DateTime<Utc>,
    repair_after: DelayWindow,
) -> Option<ScenarioOutcome> {
    let online: Vec<usize> = devices
        .iter()
        .enumerate()
        .filter(|(_, d)| d.is_online())
        .map(|(i, _)| i)
        .collect();
    let index = *online.choose(rng)?;
    let device = &mut devices[index];
    device.status = DeviceStatus::Malfunction;
    device.last_update = now;

    let alert = EmergencyAlert::new(
        "malfunction",
        EmergencyType::DeviceMalfunction,
        Severity::Medium,
        device,
        format!("{} device malfunction detected - maintenance required", device.kind),
        now,
    );
    let repair_at = now + repair_after.sample(rng);
    let task = DeferredTask::RepairDevice(device.id.clone());

    Some(ScenarioOutcome { alert, deferred: Some((repair_at, task)) })
}
