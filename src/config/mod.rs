// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.

//! Configuration module

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::devices::{CityBounds, DeviceKind};
use crate::edge::EdgeConfig;
use crate::security::SecurityConfig;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Application name
    pub app_name: String,

    /// Log level
    pub log_level: String,

    /// Fixed seed for placement, readings and scenarios; random when unset
    pub seed: Option<u64>,

    /// Simulation configuration
    pub simulation: SimulationConfig,

    /// Edge node configuration
    pub edge: EdgeConfig,

    /// Security configuration
    pub security: SecurityConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app_name: "CityGrid".to_string(),
            log_level: "info".to_string(),
            seed: None,
            simulation: SimulationConfig::default(),
            edge: EdgeConfig::default(),
            security: SecurityConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Load or create default configuration
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            let config = Self::default();

            // Create parent directories
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            config.save(path)?;
            Ok(config)
        }
    }

    /// Get configuration directory
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .map(|d| d.join("citygrid"))
            .unwrap_or_else(|| PathBuf::from("./config"))
    }

    /// Get default configuration path
    pub fn default_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Reject values the simulation cannot run with
    pub fn validate(&self) -> Result<()> {
        let sim = &self.simulation;
        for (name, ms) in [
            ("main_interval_ms", sim.main_interval_ms),
            ("maintenance_interval_ms", sim.maintenance_interval_ms),
            ("security_interval_ms", sim.security_interval_ms),
            ("battery_interval_ms", sim.battery_interval_ms),
        ] {
            if ms == 0 {
                return Err(anyhow!("simulation.{} must be positive", name));
            }
        }
        if sim.auto_clear_min_secs > sim.auto_clear_max_secs {
            return Err(anyhow!("simulation.auto_clear_min_secs exceeds auto_clear_max_secs"));
        }
        if sim.auto_repair_min_secs > sim.auto_repair_max_secs {
            return Err(anyhow!("simulation.auto_repair_min_secs exceeds auto_repair_max_secs"));
        }
        if !(-12..=14).contains(&sim.utc_offset_hours) {
            return Err(anyhow!("simulation.utc_offset_hours must be within -12..=14"));
        }
        if sim.event_bus_capacity == 0 {
            return Err(anyhow!("simulation.event_bus_capacity must be positive"));
        }
        Ok(())
    }
}

/// Simulation scheduling and population
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Device processing, energy stats and random events
    pub main_interval_ms: u64,

    /// Edge node cool-down and deferred task polling
    pub maintenance_interval_ms: u64,

    /// Alert retention sweep and simulated attacks
    pub security_interval_ms: u64,

    /// Battery drain
    pub battery_interval_ms: u64,

    pub device_counts: DeviceCounts,

    pub event_probabilities: EventProbabilities,

    /// Traffic incidents clear after a random delay in this range
    pub auto_clear_min_secs: u64,
    pub auto_clear_max_secs: u64,

    /// Malfunctioning devices are repaired after a random delay in this range
    pub auto_repair_min_secs: u64,
    pub auto_repair_max_secs: u64,

    /// Drop pending auto-clear/auto-repair tasks when the simulation stops
    pub cancel_deferred_on_stop: bool,

    /// Broadcast buffer per subscriber
    pub event_bus_capacity: usize,

    /// Area devices are scattered over
    pub bounds: CityBounds,

    /// City local time relative to UTC; streetlights follow local day/night
    pub utc_offset_hours: i32,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            main_interval_ms: 2000,
            maintenance_interval_ms: 1000,
            security_interval_ms: 5000,
            battery_interval_ms: 30_000,
            device_counts: DeviceCounts::default(),
            event_probabilities: EventProbabilities::default(),
            auto_clear_min_secs: 60,
            auto_clear_max_secs: 360,
            auto_repair_min_secs: 120,
            auto_repair_max_secs: 720,
            cancel_deferred_on_stop: false,
            event_bus_capacity: 1024,
            bounds: CityBounds::default(),
            utc_offset_hours: 0,
        }
    }
}

/// Number of devices deployed per kind
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceCounts {
    pub cameras: usize,
    pub traffic_sensors: usize,
    pub waste_bins: usize,
    pub streetlights: usize,
    pub pollution_sensors: usize,
    pub water_quality_sensors: usize,
    pub noise_sensors: usize,
    pub parking_sensors: usize,
}

impl DeviceCounts {
    pub fn count(&self, kind: DeviceKind) -> usize {
        match kind {
            DeviceKind::Camera => self.cameras,
            DeviceKind::TrafficSensor => self.traffic_sensors,
            DeviceKind::WasteBin => self.waste_bins,
            DeviceKind::Streetlight => self.streetlights,
            DeviceKind::PollutionSensor => self.pollution_sensors,
            DeviceKind::WaterQualitySensor => self.water_quality_sensors,
            DeviceKind::NoiseSensor => self.noise_sensors,
            DeviceKind::ParkingSensor => self.parking_sensors,
        }
    }

    pub fn total(&self) -> usize {
        DeviceKind::ALL.iter().map(|k| self.count(*k)).sum()
    }
}

impl Default for DeviceCounts {
    fn default() -> Self {
        Self {
            cameras: 18,
            traffic_sensors: 14,
            waste_bins: 22,
            streetlights: 26,
            pollution_sensors: 10,
            water_quality_sensors: 8,
            noise_sensors: 12,
            parking_sensors: 16,
        }
    }
}

/// Per main tick probability of each random incident; rolled independently
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EventProbabilities {
    pub traffic_accident: f64,
    pub waste_collection: f64,
    pub pollution_spike: f64,
    pub device_malfunction: f64,
}

impl Default for EventProbabilities {
    fn default() -> Self {
        Self {
            traffic_accident: 0.01,
            waste_collection: 0.005,
            pollution_spike: 0.008,
            device_malfunction: 0.003,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.simulation.device_counts.total(), 126);
        assert_eq!(config.simulation.main_interval_ms, 2000);
        assert_eq!(config.security.alert_cap, 1000);
        assert_eq!(config.edge.history_capacity, 100);
        assert!(!config.simulation.cancel_deferred_on_stop);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_toml_round_trip_and_partial_files() {
        let text = toml::to_string_pretty(&Config::default()).unwrap();
        let back: Config = toml::from_str(&text).unwrap();
        assert_eq!(back.simulation.device_counts.waste_bins, 22);

        let partial: Config = toml::from_str(
            "seed = 7\n[simulation]\nmain_interval_ms = 500\n[security]\nretention_policy = \"all_severities_within_window\"\n",
        )
        .unwrap();
        assert_eq!(partial.seed, Some(7));
        assert_eq!(partial.simulation.main_interval_ms, 500);
        assert_eq!(partial.simulation.battery_interval_ms, 30_000);
        assert_eq!(
            partial.security.retention_policy,
            crate::security::RetentionPolicy::AllSeveritiesWithinWindow
        );
    }

    #[test]
    fn test_validate_rejects_bad_windows() {
        let mut config = Config::default();
        config.simulation.auto_repair_min_secs = 900;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.simulation.main_interval_ms = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.simulation.utc_offset_hours = 15;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_or_create_writes_default() {
        let dir = std::env::temp_dir().join(format!("citygrid-config-{}", uuid::Uuid::new_v4()));
        let path = dir.join("config.toml");

        let created = Config::load_or_create(&path).unwrap();
        assert!(path.exists());
        let loaded = Config::load_or_create(&path).unwrap();
        assert_eq!(created.app_name, loaded.app_name);

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
