// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.

//! Security module - packet screening, alerting, encryption, authentication

mod auth;
mod encryption;
pub mod ids;
mod secure_memory;

pub use auth::*;
pub use encryption::*;
pub use ids::{risk_level, RiskLevel, Severity};
pub use secure_memory::*;

use chrono::{DateTime, Duration, Utc};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::VecDeque;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::devices::Reading;
use crate::error::{CityError, CityResult};

/// Device id used for alerts raised by network-level monitoring
pub const NETWORK_MONITOR_ID: &str = "network_monitor";

/// Security configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Serialized packet size (bytes) above which a packet is anomalous
    pub packet_size_threshold: usize,

    /// Allowed distance between packet and wall-clock time
    pub timestamp_skew_secs: i64,

    /// Active alerts kept (oldest dropped)
    pub alert_cap: usize,

    /// Log entries kept (oldest dropped)
    pub log_cap: usize,

    /// Age window used by `clear_old_alerts`
    pub retention_window_secs: i64,

    pub retention_policy: RetentionPolicy,

    /// Chance per security sweep of a simulated network attack
    pub attack_probability: f64,

    /// Alerts considered for the overall threat level
    pub threat_window: usize,

    /// Alerts considered for the recent/critical counts in status
    pub status_window: usize,

    /// Log entries included in status
    pub recent_events_shown: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            packet_size_threshold: 1000,
            timestamp_skew_secs: 300,
            alert_cap: 1000,
            log_cap: 10_000,
            retention_window_secs: 3600, // 1 hour
            retention_policy: RetentionPolicy::default(),
            attack_probability: 0.02,
            threat_window: 100,
            status_window: 50,
            recent_events_shown: 20,
        }
    }
}

/// Which alerts survive a retention sweep
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetentionPolicy {
    /// Only high-severity alerts inside the window; medium and low are always dropped
    #[default]
    HighSeverityWithinWindow,
    /// Every alert inside the window, whatever its severity
    AllSeveritiesWithinWindow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    AnomalousPacketSize,
    SuspiciousPayload,
    DataInconsistency,
    TimestampAnomaly,
    DecryptionFailure,
    AuthenticationFailure,
    PotentialBreach,
    DdosAttempt,
    PortScan,
    BruteForce,
}

impl AlertType {
    /// Automated action taken for a high-severity alert of this type
    pub fn response_action(self) -> &'static str {
        match self {
            AlertType::SuspiciousPayload => "Device temporarily quarantined",
            AlertType::AnomalousPacketSize => "Enhanced monitoring activated",
            AlertType::PotentialBreach => "Security team notified, access restricted",
            _ => "Manual review required",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityAlert {
    pub id: String,
    #[serde(rename = "type")]
    pub alert_type: AlertType,
    pub severity: Severity,
    pub message: String,
    pub device_id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub affected_devices: Option<u32>,
}

impl SecurityAlert {
    pub fn new(alert_type: AlertType, severity: Severity, message: String, device_id: &str, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().simple().to_string(),
            alert_type,
            severity,
            message,
            device_id: device_id.to_string(),
            timestamp: now,
            affected_devices: None,
        }
    }
}

/// Advisory record of an automated response; no device is actually touched
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityResponse {
    pub alert_id: String,
    pub action: String,
    pub timestamp: DateTime<Utc>,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "category", rename_all = "snake_case")]
pub enum SecurityEvent {
    Alert(SecurityAlert),
    SecurityResponse(SecurityResponse),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityLogEntry {
    pub log_id: String,
    pub logged_at: DateTime<Utc>,
    pub event: SecurityEvent,
}

/// Outcome of screening one packet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PacketAnalysis {
    pub is_secure: bool,
    pub alerts: Vec<SecurityAlert>,
    pub risk_level: RiskLevel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThreatLevel {
    Low,
    Medium,
    High,
    Critical,
}

/// Aggregate threat from alert severities (oldest first).
///
/// >=5 high is critical; >2 high or >10 medium is high; >5 medium is medium.
pub fn threat_level<'a, I>(alerts: I) -> ThreatLevel
where
    I: IntoIterator<Item = &'a SecurityAlert>,
{
    let (mut high, mut medium) = (0usize, 0usize);
    for alert in alerts {
        match alert.severity {
            Severity::High => high += 1,
            Severity::Medium => medium += 1,
            Severity::Low => {}
        }
    }

    if high >= 5 {
        ThreatLevel::Critical
    } else if high > 2 || medium > 10 {
        ThreatLevel::High
    } else if medium > 5 {
        ThreatLevel::Medium
    } else {
        ThreatLevel::Low
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityStatus {
    pub total_alerts: usize,
    pub recent_alerts: usize,
    pub critical_alerts: usize,
    pub overall_threat_level: ThreatLevel,
    pub authenticated_devices: usize,
    pub recent_security_events: Vec<SecurityLogEntry>,
    pub encryption_status: String,
}

/// Owns all security state for one simulation instance.
pub struct SecurityService {
    config: SecurityConfig,
    alerts: VecDeque<SecurityAlert>,
    log: VecDeque<SecurityLogEntry>,
    cipher: DeviceCipher,
    auth: DeviceAuthenticator,
    rng: ChaCha8Rng,
}

impl SecurityService {
    pub fn new(config: SecurityConfig) -> Self {
        Self::with_rng(config, ChaCha8Rng::from_entropy())
    }

    /// Seed the attack simulator for reproducible runs
    pub fn with_seed(config: SecurityConfig, seed: u64) -> Self {
        Self::with_rng(config, ChaCha8Rng::seed_from_u64(seed))
    }

    fn with_rng(config: SecurityConfig, rng: ChaCha8Rng) -> Self {
        Self {
            config,
            alerts: VecDeque::new(),
            log: VecDeque::new(),
            cipher: DeviceCipher::new(),
            auth: DeviceAuthenticator::new(),
            rng,
        }
    }

    pub fn config(&self) -> &SecurityConfig {
        &self.config
    }

    /// Run every intrusion rule over a packet and record what fires.
    ///
    /// All four rules are evaluated; none short-circuits the others.
    pub fn analyze_packet(&mut self, packet: &Value, device_id: &str, now: DateTime<Utc>) -> PacketAnalysis {
        let serialized = packet.to_string();
        let mut alerts = Vec::new();

        if serialized.len() > self.config.packet_size_threshold {
            alerts.push(SecurityAlert::new(
                AlertType::AnomalousPacketSize,
                Severity::Medium,
                format!("Unusually large packet from device {}: {} bytes", device_id, serialized.len()),
                device_id,
                now,
            ));
        }

        if let Some(signature) = ids::find_suspicious_pattern(&serialized) {
            debug!(device_id, signature, "Suspicious payload signature");
            alerts.push(SecurityAlert::new(
                AlertType::SuspiciousPayload,
                Severity::High,
                format!("Suspicious payload detected from device {}", device_id),
                device_id,
                now,
            ));
        }

        if ids::is_inconsistent(packet, device_id) {
            alerts.push(SecurityAlert::new(
                AlertType::DataInconsistency,
                Severity::Medium,
                format!("Data inconsistent with device type for {}", device_id),
                device_id,
                now,
            ));
        }

        let skew = Duration::seconds(self.config.timestamp_skew_secs);
        if ids::has_timestamp_anomaly(packet, now, skew) {
            alerts.push(SecurityAlert::new(
                AlertType::TimestampAnomaly,
                Severity::Low,
                format!("Timestamp anomaly detected from device {}", device_id),
                device_id,
                now,
            ));
        }

        for alert in &alerts {
            self.process_alert(alert.clone(), now);
        }

        PacketAnalysis {
            is_secure: alerts.is_empty(),
            risk_level: risk_level(alerts.iter().map(|a| a.severity)),
            alerts,
        }
    }

    pub fn analyze_reading(&mut self, reading: &Reading, now: DateTime<Utc>) -> CityResult<PacketAnalysis> {
        let packet = serde_json::to_value(reading)?;
        Ok(self.analyze_packet(&packet, &reading.device_id, now))
    }

    /// Record an alert: store, log and, for high severity, respond
    pub fn process_alert(&mut self, alert: SecurityAlert, now: DateTime<Utc>) {
        if alert.severity == Severity::High {
            warn!(device_id = %alert.device_id, alert_type = ?alert.alert_type, "{}", alert.message);
        } else {
            debug!(device_id = %alert.device_id, alert_type = ?alert.alert_type, "{}", alert.message);
        }

        self.alerts.push_back(alert.clone());
        while self.alerts.len() > self.config.alert_cap {
            self.alerts.pop_front();
        }
        self.log_event(SecurityEvent::Alert(alert.clone()), now);

        if alert.severity == Severity::High {
            self.initiate_response(&alert, now);
        }
    }

    fn initiate_response(&mut self, alert: &SecurityAlert, now: DateTime<Utc>) {
        let response = SecurityResponse {
            alert_id: alert.id.clone(),
            action: alert.alert_type.response_action().to_string(),
            timestamp: now,
            status: "executed".to_string(),
        };
        info!(device_id = %alert.device_id, "Automated response: {}", response.action);
        self.log_event(SecurityEvent::SecurityResponse(response), now);
    }

    fn log_event(&mut self, event: SecurityEvent, now: DateTime<Utc>) {
        self.log.push_back(SecurityLogEntry {
            log_id: Uuid::new_v4().simple().to_string(),
            logged_at: now,
            event,
        });

        // Keep only the newest entries in memory
        while self.log.len() > self.config.log_cap {
            self.log.pop_front();
        }
    }

    /// Encrypt a JSON payload with the device's key
    pub fn encrypt(&mut self, data: &Value, device_id: &str, now: DateTime<Utc>) -> CityResult<EncryptedPacket> {
        let plaintext = serde_json::to_vec(data)?;
        self.cipher.encrypt(&plaintext, device_id, now)
    }

    /// Decrypt and parse a packet; `None` on any failure, which is also
    /// recorded as a high-severity `decryption_failure` alert.
    pub fn decrypt(&mut self, packet: &EncryptedPacket, device_id: &str, now: DateTime<Utc>) -> Option<Value> {
        let parsed = self
            .cipher
            .decrypt(packet, device_id)
            .and_then(|plaintext| serde_json::from_slice::<Value>(&plaintext).map_err(CityError::from));

        match parsed {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(device_id, error = %e, "Decryption failed");
                self.process_alert(
                    SecurityAlert::new(
                        AlertType::DecryptionFailure,
                        Severity::High,
                        format!("Failed to decrypt data from device {}", device_id),
                        device_id,
                        now,
                    ),
                    now,
                );
                None
            }
        }
    }

    /// Check a device token; the first contact issues a token and is refused.
    pub fn authenticate_device(&mut self, device_id: &str, token: &str, now: DateTime<Utc>) -> bool {
        match self.auth.verify(device_id, token) {
            Ok(AuthOutcome::Valid) => true,
            Ok(AuthOutcome::FirstContact) => false,
            Ok(AuthOutcome::Invalid) => {
                self.process_alert(
                    SecurityAlert::new(
                        AlertType::AuthenticationFailure,
                        Severity::Medium,
                        format!("Authentication failed for device {}", device_id),
                        device_id,
                        now,
                    ),
                    now,
                );
                false
            }
            Err(e) => {
                warn!(device_id, error = %e, "Token issue failed");
                false
            }
        }
    }

    pub fn issue_token(&mut self, device_id: &str) -> CityResult<String> {
        self.auth.issue_token(device_id)
    }

    pub fn device_token(&self, device_id: &str) -> Option<&str> {
        self.auth.token(device_id)
    }

    /// Record one simulated network-level attack
    pub fn simulate_network_attack(&mut self, now: DateTime<Utc>) -> SecurityAlert {
        let (alert_type, severity, message, affected) = match self.rng.gen_range(0..3) {
            0 => (
                AlertType::DdosAttempt,
                Severity::High,
                "Distributed Denial of Service attack detected",
                self.rng.gen_range(1..=10),
            ),
            1 => (AlertType::PortScan, Severity::Medium, "Port scanning activity detected", 1),
            _ => (
                AlertType::BruteForce,
                Severity::High,
                "Brute force authentication attempt detected",
                1,
            ),
        };

        let mut alert = SecurityAlert::new(alert_type, severity, message.to_string(), NETWORK_MONITOR_ID, now);
        alert.affected_devices = Some(affected);
        self.process_alert(alert.clone(), now);
        alert
    }

    /// Security sweep roll; attacks at `attack_probability`
    pub fn maybe_simulate_attack(&mut self, now: DateTime<Utc>) -> Option<SecurityAlert> {
        let p = self.config.attack_probability.clamp(0.0, 1.0);
        if self.rng.gen_bool(p) {
            Some(self.simulate_network_attack(now))
        } else {
            None
        }
    }

    /// Retention sweep per the configured policy; returns how many were dropped
    pub fn clear_old_alerts(&mut self, now: DateTime<Utc>) -> usize {
        let cutoff = now - Duration::seconds(self.config.retention_window_secs);
        let policy = self.config.retention_policy;
        let before = self.alerts.len();

        self.alerts.retain(|alert| {
            let fresh = alert.timestamp > cutoff;
            match policy {
                RetentionPolicy::HighSeverityWithinWindow => fresh && alert.severity == Severity::High,
                RetentionPolicy::AllSeveritiesWithinWindow => fresh,
            }
        });

        before - self.alerts.len()
    }

    pub fn active_alerts(&self) -> &VecDeque<SecurityAlert> {
        &self.alerts
    }

    pub fn security_log(&self) -> &VecDeque<SecurityLogEntry> {
        &self.log
    }

    pub fn overall_threat_level(&self) -> ThreatLevel {
        let skip = self.alerts.len().saturating_sub(self.config.threat_window);
        threat_level(self.alerts.iter().skip(skip))
    }

    pub fn status(&self) -> SecurityStatus {
        let skip = self.alerts.len().saturating_sub(self.config.status_window);
        let recent: Vec<&SecurityAlert> = self.alerts.iter().skip(skip).collect();
        let log_skip = self.log.len().saturating_sub(self.config.recent_events_shown);

        SecurityStatus {
            total_alerts: self.alerts.len(),
            recent_alerts: recent.len(),
            critical_alerts: recent.iter().filter(|a| a.severity == Severity::High).count(),
            overall_threat_level: self.overall_threat_level(),
            authenticated_devices: self.auth.len(),
            recent_security_events: self.log.iter().skip(log_skip).cloned().collect(),
            encryption_status: "active".to_string(),
        }
    }
}

impl Default for SecurityService {
    fn default() -> Self {
        Self::new(SecurityConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::devices::{Device, DeviceKind, GeoPoint, ReadingGenerator};
    use proptest::prelude::*;
    use serde_json::json;

    fn service() -> SecurityService {
        SecurityService::with_seed(SecurityConfig::default(), 1)
    }

    fn alert(severity: Severity, at: DateTime<Utc>) -> SecurityAlert {
        SecurityAlert::new(AlertType::PortScan, severity, "test".into(), NETWORK_MONITOR_ID, at)
    }

    #[test]
    fn test_clean_reading_is_secure() {
        let mut security = service();
        let now = Utc::now();
        let mut generator = ReadingGenerator::from_seed(1);
        for kind in DeviceKind::ALL {
            let id = format!("{}_1", kind.id_prefix());
            let mut device = Device::new(&id, kind, GeoPoint::new(40.75, -73.98), now);
            let reading = generator.generate(&mut device, now);
            let analysis = security.analyze_reading(&reading, now).unwrap();
            assert!(analysis.is_secure, "{} flagged: {:?}", kind, analysis.alerts);
            assert_eq!(analysis.risk_level, RiskLevel::Low);
        }
        assert!(security.active_alerts().is_empty());
    }

    #[test]
    fn test_sql_injection_raises_high_alert() {
        let mut security = service();
        let now = Utc::now();
        let packet = json!({
            "deviceId": "traffic_sensor_1",
            "timestamp": now.to_rfc3339(),
            "note": "1; SELECT password FROM users"
        });

        let analysis = security.analyze_packet(&packet, "traffic_sensor_1", now);
        assert!(!analysis.is_secure);
        assert!(analysis.alerts.iter().any(|a| a.severity == Severity::High));
        assert_eq!(analysis.risk_level, RiskLevel::Medium);

        // High alerts get an automated response in the log
        let responses: Vec<_> = security
            .security_log()
            .iter()
            .filter_map(|e| match &e.event {
                SecurityEvent::SecurityResponse(r) => Some(r),
                _ => None,
            })
            .collect();
        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0].action, "Device temporarily quarantined");
    }

    #[test]
    fn test_all_rules_evaluated() {
        let mut security = service();
        let now = Utc::now();
        let big = "x".repeat(1200);
        let packet = json!({
            "videoFrame": { "blob": big },
            "cmd": "<script>alert(1)</script>"
        });

        let analysis = security.analyze_packet(&packet, "waste_bin_9", now);
        let types: Vec<_> = analysis.alerts.iter().map(|a| a.alert_type).collect();
        assert_eq!(
            types,
            vec![
                AlertType::AnomalousPacketSize,
                AlertType::SuspiciousPayload,
                AlertType::DataInconsistency,
                AlertType::TimestampAnomaly,
            ]
        );
        // 3 + 5 + 3 + 1
        assert_eq!(analysis.risk_level, RiskLevel::High);
    }

    #[test]
    fn test_threat_levels() {
        let now = Utc::now();
        let six_high: Vec<_> = (0..6).map(|_| alert(Severity::High, now)).collect();
        assert_eq!(threat_level(&six_high), ThreatLevel::Critical);

        let five_high: Vec<_> = (0..5).map(|_| alert(Severity::High, now)).collect();
        assert_eq!(threat_level(&five_high), ThreatLevel::Critical);

        let four_high: Vec<_> = (0..4).map(|_| alert(Severity::High, now)).collect();
        assert_eq!(threat_level(&four_high), ThreatLevel::High);

        let three_high: Vec<_> = (0..3).map(|_| alert(Severity::High, now)).collect();
        assert_eq!(threat_level(&three_high), ThreatLevel::High);

        let eleven_medium: Vec<_> = (0..11).map(|_| alert(Severity::Medium, now)).collect();
        assert_eq!(threat_level(&eleven_medium), ThreatLevel::High);

        let six_medium: Vec<_> = (0..6).map(|_| alert(Severity::Medium, now)).collect();
        assert_eq!(threat_level(&six_medium), ThreatLevel::Medium);

        let two_high: Vec<_> = (0..2).map(|_| alert(Severity::High, now)).collect();
        assert_eq!(threat_level(&two_high), ThreatLevel::Low);
    }

    #[test]
    fn test_service_threat_level_and_status() {
        let mut security = service();
        let now = Utc::now();
        for _ in 0..6 {
            security.process_alert(alert(Severity::High, now), now);
        }
        let status = security.status();
        assert_eq!(status.overall_threat_level, ThreatLevel::Critical);
        assert_eq!(status.total_alerts, 6);
        assert_eq!(status.critical_alerts, 6);
        assert_eq!(status.recent_security_events.len(), 12);
        assert_eq!(status.encryption_status, "active");
    }

    #[test]
    fn test_alert_and_log_caps() {
        let config = SecurityConfig { alert_cap: 10, log_cap: 15, ..Default::default() };
        let mut security = SecurityService::with_seed(config, 2);
        let now = Utc::now();
        for _ in 0..40 {
            security.process_alert(alert(Severity::Low, now), now);
        }
        assert_eq!(security.active_alerts().len(), 10);
        assert_eq!(security.security_log().len(), 15);
    }

    #[test]
    fn test_encrypt_decrypt_round_trip() {
        let mut security = service();
        let now = Utc::now();
        let payload = json!({"deviceId": "pollution_sensor_2", "airQuality": {"aqi": 120.5}, "tags": [1, 2]});

        let packet = security.encrypt(&payload, "pollution_sensor_2", now).unwrap();
        assert_eq!(packet.algorithm, "aes-256-gcm");
        assert_eq!(security.decrypt(&packet, "pollution_sensor_2", now), Some(payload));
        assert!(security.active_alerts().is_empty());
    }

    /// Arbitrary JSON trees: nested containers, unicode strings, finite
    /// floats and integer extremes
    fn json_value() -> impl Strategy<Value = serde_json::Value> {
        let leaf = prop_oneof![
            Just(serde_json::Value::Null),
            any::<bool>().prop_map(serde_json::Value::from),
            any::<i64>().prop_map(serde_json::Value::from),
            any::<u64>().prop_map(serde_json::Value::from),
            prop_oneof![Just(i64::MIN), Just(i64::MAX), Just(-1i64)].prop_map(serde_json::Value::from),
            Just(serde_json::Value::from(u64::MAX)),
            any::<f64>().prop_filter_map("json floats are finite", |f| {
                serde_json::Number::from_f64(f).map(serde_json::Value::Number)
            }),
            any::<String>().prop_map(serde_json::Value::from),
        ];
        leaf.prop_recursive(4, 64, 8, |inner| {
            prop_oneof![
                proptest::collection::vec(inner.clone(), 0..8).prop_map(serde_json::Value::Array),
                proptest::collection::btree_map(any::<String>(), inner, 0..8)
                    .prop_map(|m| serde_json::Value::Object(m.into_iter().collect())),
            ]
        })
    }

    proptest! {
        #[test]
        fn encrypt_decrypt_preserves_any_json(payload in json_value()) {
            let mut security = service();
            let now = Utc::now();

            let packet = security.encrypt(&payload, "noise_sensor_4", now).unwrap();
            prop_assert_eq!(security.decrypt(&packet, "noise_sensor_4", now), Some(payload));
            prop_assert!(security.active_alerts().is_empty());
        }
    }

    #[test]
    fn test_decrypt_failure_records_alert() {
        let mut security = service();
        let now = Utc::now();
        let packet = security.encrypt(&json!({"a": 1}), "cctv_cam_1", now).unwrap();

        assert_eq!(security.decrypt(&packet, "cctv_cam_2", now), None);
        let last = security.active_alerts().back().unwrap();
        assert_eq!(last.alert_type, AlertType::DecryptionFailure);
        assert_eq!(last.severity, Severity::High);
    }

    #[test]
    fn test_authenticate_device() {
        let mut security = service();
        let now = Utc::now();

        assert!(!security.authenticate_device("smart_light_1", "00", now));
        assert!(security.active_alerts().is_empty());

        let token = security.device_token("smart_light_1").unwrap().to_string();
        assert!(security.authenticate_device("smart_light_1", &token, now));

        assert!(!security.authenticate_device("smart_light_1", "00", now));
        let last = security.active_alerts().back().unwrap();
        assert_eq!(last.alert_type, AlertType::AuthenticationFailure);
        assert_eq!(last.severity, Severity::Medium);
        assert_eq!(security.status().authenticated_devices, 1);
    }

    #[test]
    fn test_retention_policies() {
        let now = Utc::now();
        let old = now - Duration::hours(2);
        let seed = |security: &mut SecurityService| {
            security.process_alert(alert(Severity::High, now), now);
            security.process_alert(alert(Severity::Medium, now), now);
            security.process_alert(alert(Severity::High, old), old);
            security.process_alert(alert(Severity::Low, old), old);
        };

        let mut strict = service();
        seed(&mut strict);
        assert_eq!(strict.clear_old_alerts(now), 3);
        assert_eq!(strict.active_alerts().len(), 1);

        let config = SecurityConfig {
            retention_policy: RetentionPolicy::AllSeveritiesWithinWindow,
            ..Default::default()
        };
        let mut lenient = SecurityService::with_seed(config, 3);
        seed(&mut lenient);
        assert_eq!(lenient.clear_old_alerts(now), 2);
        assert_eq!(lenient.active_alerts().len(), 2);
    }

    #[test]
    fn test_simulated_attack() {
        let mut security = service();
        let now = Utc::now();
        let alert = security.simulate_network_attack(now);
        assert_eq!(alert.device_id, NETWORK_MONITOR_ID);
        assert!(matches!(
            alert.alert_type,
            AlertType::DdosAttempt | AlertType::PortScan | AlertType::BruteForce
        ));
        assert!(alert.affected_devices.unwrap() >= 1);
        assert_eq!(security.active_alerts().len(), 1);

        let config = SecurityConfig { attack_probability: 0.0, ..Default::default() };
        let mut quiet = SecurityService::with_seed(config, 4);
        assert!(quiet.maybe_simulate_attack(now).is_none());
    }
}
