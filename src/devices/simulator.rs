// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.

//! Reading synthesis for simulated devices

use chrono::{DateTime, Duration, Timelike, Utc};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

use super::reading::*;
use super::{Device, DeviceKind, SensorState};

/// Produces randomized, kind-specific readings.
///
/// All randomness comes from the owned ChaCha stream, so a fixed seed gives
/// byte-identical readings across runs.
pub struct ReadingGenerator {
    rng: ChaCha8Rng,
    incident_probability: f64,
    motion_probability: f64,
    utc_offset: Duration,
}

impl ReadingGenerator {
    pub fn from_seed(seed: u64) -> Self {
        Self::with_rng(ChaCha8Rng::seed_from_u64(seed))
    }

    pub fn from_entropy() -> Self {
        Self::with_rng(ChaCha8Rng::from_entropy())
    }

    fn with_rng(rng: ChaCha8Rng) -> Self {
        Self {
            rng,
            incident_probability: 0.05,
            motion_probability: 0.3,
            utc_offset: Duration::zero(),
        }
    }

    /// Streetlights switch between day and night on the city's local
    /// clock, `utc_offset_hours` ahead of UTC.
    pub fn with_utc_offset(mut self, utc_offset_hours: i32) -> Self {
        self.utc_offset = Duration::hours(i64::from(utc_offset_hours));
        self
    }

    /// Synthesize a fresh reading.
    ///
    /// Only the device's per-kind sensor state moves (bin fill, lamp
    /// brightness); identity fields are left alone.
    pub fn generate(&mut self, device: &mut Device, now: DateTime<Utc>) -> Reading {
        let payload = match device.kind {
            DeviceKind::Camera => self.video_frame(&device.sensor_state),
            DeviceKind::TrafficSensor => self.traffic(),
            DeviceKind::WasteBin => self.waste(&mut device.sensor_state, now),
            DeviceKind::Streetlight => self.lighting(&mut device.sensor_state, now),
            DeviceKind::PollutionSensor => self.air_quality(),
            DeviceKind::WaterQualitySensor => self.water_quality(),
            DeviceKind::NoiseSensor => self.noise(),
            DeviceKind::ParkingSensor => self.parking(),
        };

        Reading {
            device_id: device.id.clone(),
            device_type: device.kind,
            timestamp: now,
            status: device.status,
            battery_level: device.battery_level,
            location: device.location,
            payload,
        }
    }

    fn video_frame(&mut self, state: &SensorState) -> Payload {
        let (resolution, frame_rate) = match state {
            SensorState::Camera { resolution, frame_rate } => (resolution.clone(), *frame_rate),
            _ => ("4K".to_string(), 30),
        };
        let incidents = if self.rng.gen_bool(self.incident_probability) {
            vec!["suspicious_activity".to_string()]
        } else {
            vec![]
        };

        Payload::VideoFrame(VideoFrame {
            resolution,
            frame_rate,
            data_size: self.rng.gen_range(1000..1500),
            detections: Detections {
                vehicles: self.rng.gen_range(0..20),
                pedestrians: self.rng.gen_range(0..15),
                incidents,
            },
        })
    }

    fn traffic(&mut self) -> Payload {
        let congestion_level = *[CongestionLevel::Low, CongestionLevel::Medium, CongestionLevel::High]
            .choose(&mut self.rng)
            .unwrap_or(&CongestionLevel::Low);

        Payload::Traffic(TrafficData {
            speed: self.rng.gen_range(20..80),
            vehicle_count: self.rng.gen_range(0..50),
            average_speed: self.rng.gen_range(30..75),
            congestion_level,
            vehicle_types: VehicleMix {
                cars: self.rng.gen_range(0..30),
                trucks: self.rng.gen_range(0..5),
                buses: self.rng.gen_range(0..3),
                motorcycles: self.rng.gen_range(0..10),
            },
        })
    }

    fn waste(&mut self, state: &mut SensorState, now: DateTime<Utc>) -> Payload {
        let (fill_level, capacity) = match state {
            SensorState::WasteBin { fill_level, capacity_liters } => {
                // Bins fill up a little on every report
                *fill_level = (*fill_level + self.rng.gen_range(0.0..2.0)).min(100.0);
                (*fill_level, *capacity_liters)
            }
            _ => (0.0, 100.0),
        };
        let emptied_ago = Duration::seconds(self.rng.gen_range(0..7 * 24 * 3600));

        Payload::Waste(WasteData {
            fill_level,
            capacity,
            temperature: self.rng.gen_range(20..35),
            last_emptied: now - emptied_ago,
            needs_collection: fill_level > 80.0,
        })
    }

    fn lighting(&mut self, state: &mut SensorState, now: DateTime<Utc>) -> Payload {
        let hour = (now + self.utc_offset).hour();
        let is_dark = hour < 6 || hour > 20;
        let motion_detected = self.rng.gen_bool(self.motion_probability);
        let brightness = match (is_dark, motion_detected) {
            (true, true) => 100.0,
            (true, false) => 50.0,
            (false, _) => 0.0,
        };
        if let SensorState::Streetlight { brightness: current } = state {
            *current = brightness;
        }

        Payload::Lighting(LightingData {
            brightness,
            motion_detected,
            energy_consumption: brightness * 0.45,
            operating_mode: if is_dark { "night" } else { "day" }.to_string(),
            small_cell: SmallCell {
                is_active: true,
                connected_devices: self.rng.gen_range(0..20),
                data_traffic: self.rng.gen_range(0..1000),
                signal_strength: -self.rng.gen_range(50..80),
            },
        })
    }

    fn air_quality(&mut self) -> Payload {
        Payload::AirQuality(AirQuality {
            pm25: f64::from(self.rng.gen_range(10u32..60)),
            pm10: f64::from(self.rng.gen_range(20u32..100)),
            no2: f64::from(self.rng.gen_range(10u32..50)),
            co: f64::from(self.rng.gen_range(1u32..3)),
            o3: f64::from(self.rng.gen_range(20u32..80)),
            so2: f64::from(self.rng.gen_range(5u32..25)),
            aqi: f64::from(self.rng.gen_range(50u32..200)),
            temperature: f64::from(self.rng.gen_range(15u32..40)),
            humidity: f64::from(self.rng.gen_range(40u32..80)),
            wind_speed: f64::from(self.rng.gen_range(5u32..25)),
        })
    }

    fn water_quality(&mut self) -> Payload {
        Payload::WaterQuality(WaterQuality {
            ph: round_to(self.rng.gen_range(6.0..10.0), 2),
            turbidity: round_to(self.rng.gen_range(0.0..10.0), 2),
            dissolved_oxygen: round_to(self.rng.gen_range(0.0..15.0), 2),
            temperature: round_to(self.rng.gen_range(5.0..25.0), 1),
        })
    }

    fn noise(&mut self) -> Payload {
        Payload::NoiseLevel(NoiseLevel {
            decibels: round_to(self.rng.gen_range(30.0..90.0), 1),
            frequency: self.rng.gen_range(20..8020),
            duration: self.rng.gen_range(1..301),
        })
    }

    fn parking(&mut self) -> Payload {
        let vehicle_type = ["car", "motorcycle", "truck"]
            .choose(&mut self.rng)
            .copied()
            .unwrap_or("car");
        let payment_status = ["paid", "unpaid", "expired"]
            .choose(&mut self.rng)
            .copied()
            .unwrap_or("paid");

        Payload::ParkingStatus(ParkingStatus {
            occupied: self.rng.gen_bool(0.4),
            vehicle_type: vehicle_type.to_string(),
            duration: self.rng.gen_range(0..240),
            payment_status: payment_status.to_string(),
        })
    }
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::devices::GeoPoint;
    use chrono::TimeZone;

    fn device(kind: DeviceKind) -> Device {
        let id = format!("{}_1", kind.id_prefix());
        Device::new(&id, kind, GeoPoint::new(40.755, -73.978), Utc::now())
    }

    #[test]
    fn test_fixed_seed_is_reproducible() {
        let now = Utc::now();
        let mut a = ReadingGenerator::from_seed(42);
        let mut b = ReadingGenerator::from_seed(42);

        for kind in DeviceKind::ALL {
            let mut da = device(kind);
            let mut db = device(kind);
            assert_eq!(a.generate(&mut da, now), b.generate(&mut db, now));
        }
    }

    #[test]
    fn test_payload_matches_kind() {
        let mut generator = ReadingGenerator::from_seed(7);
        let now = Utc::now();
        for kind in DeviceKind::ALL {
            let mut d = device(kind);
            let reading = generator.generate(&mut d, now);
            assert_eq!(reading.payload_kind(), kind);
            assert_eq!(reading.device_id, d.id);
            assert_eq!(reading.timestamp, now);
        }
    }

    #[test]
    fn test_ranges() {
        let mut generator = ReadingGenerator::from_seed(3);
        let now = Utc::now();
        let mut cam = device(DeviceKind::Camera);
        let mut air = device(DeviceKind::PollutionSensor);
        let mut noise = device(DeviceKind::NoiseSensor);

        for _ in 0..200 {
            if let Payload::VideoFrame(frame) = generator.generate(&mut cam, now).payload {
                assert!(frame.detections.vehicles < 20);
                assert!(frame.detections.pedestrians < 15);
                assert!((1000..1500).contains(&frame.data_size));
            } else {
                panic!("camera produced wrong payload");
            }
            if let Payload::AirQuality(aq) = generator.generate(&mut air, now).payload {
                assert!((50.0..200.0).contains(&aq.aqi));
                assert!((10.0..60.0).contains(&aq.pm25));
            } else {
                panic!("pollution sensor produced wrong payload");
            }
            if let Payload::NoiseLevel(n) = generator.generate(&mut noise, now).payload {
                assert!((30.0..=90.0).contains(&n.decibels));
            } else {
                panic!("noise sensor produced wrong payload");
            }
        }
    }

    #[test]
    fn test_waste_bin_fills_and_caps() {
        let mut generator = ReadingGenerator::from_seed(11);
        let mut bin = device(DeviceKind::WasteBin).with_fill_level(99.5);
        let now = Utc::now();
        let mut last = bin.fill_level().unwrap();
        for _ in 0..20 {
            let reading = generator.generate(&mut bin, now);
            let level = bin.fill_level().unwrap();
            assert!(level >= last && level <= 100.0);
            if let Payload::Waste(w) = reading.payload {
                assert_eq!(w.fill_level, level);
                assert!(w.needs_collection);
            }
            last = level;
        }
    }

    #[test]
    fn test_streetlight_night_follows_local_offset() {
        // 18:00 UTC: day in UTC, 23:00 at +5, 10:00 at -8
        let at = Utc.with_ymd_and_hms(2026, 3, 1, 18, 0, 0).unwrap();
        let mode = |generator: &mut ReadingGenerator| {
            let mut d = device(DeviceKind::Streetlight);
            match generator.generate(&mut d, at).payload {
                Payload::Lighting(l) => l.operating_mode,
                other => panic!("unexpected payload {:?}", other),
            }
        };

        assert_eq!(mode(&mut ReadingGenerator::from_seed(9)), "day");
        assert_eq!(mode(&mut ReadingGenerator::from_seed(9).with_utc_offset(5)), "night");
        assert_eq!(mode(&mut ReadingGenerator::from_seed(9).with_utc_offset(-8)), "day");
    }

    #[test]
    fn test_reading_json_shape() {
        let mut generator = ReadingGenerator::from_seed(5);
        let mut d = device(DeviceKind::PollutionSensor);
        let reading = generator.generate(&mut d, Utc::now());
        let value = serde_json::to_value(&reading).unwrap();

        assert!(value.get("airQuality").is_some());
        assert!(value.get("timestamp").is_some());
        assert_eq!(value["deviceId"], "pollution_sensor_1");

        let back: Reading = serde_json::from_value(value).unwrap();
        assert_eq!(back, reading);
    }
}
