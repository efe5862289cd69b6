// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.

//! Intrusion detection rules applied to every packet

use chrono::{DateTime, Duration, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::devices::DeviceKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    /// Weight used when scoring a packet's alerts
    pub fn weight(self) -> u32 {
        match self {
            Severity::Low => 1,
            Severity::Medium => 3,
            Severity::High => 5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

/// Score a packet from its alert severities: >=10 high, >=5 medium.
pub fn risk_level<I>(severities: I) -> RiskLevel
where
    I: IntoIterator<Item = Severity>,
{
    let score: u32 = severities.into_iter().map(Severity::weight).sum();
    if score >= 10 {
        RiskLevel::High
    } else if score >= 5 {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}

struct SuspiciousPattern {
    name: &'static str,
    regex: Regex,
}

static SUSPICIOUS_PATTERNS: Lazy<Vec<SuspiciousPattern>> = Lazy::new(|| {
    [
        ("sql_injection", r"(?i)select.*from"),
        ("sql_injection", r"(?i)union.*select"),
        ("xss", r"(?i)<script.*>.*</script>"),
        ("xss", r"(?i)javascript:"),
        ("path_traversal", r"\.\./\.\./"),
        ("command_injection", r"(?i)cmd=|exec=|system="),
    ]
    .into_iter()
    .map(|(name, pattern)| SuspiciousPattern {
        name,
        regex: Regex::new(pattern).expect("static pattern compiles"),
    })
    .collect()
});

/// Name of the first attack signature found in `payload`
pub fn find_suspicious_pattern(payload: &str) -> Option<&'static str> {
    SUSPICIOUS_PATTERNS
        .iter()
        .find(|p| p.regex.is_match(payload))
        .map(|p| p.name)
}

/// True when the packet carries another kind's payload than the one its id implies.
///
/// Ids that do not name a known kind are never flagged.
pub fn is_inconsistent(packet: &Value, device_id: &str) -> bool {
    let Some(expected) = DeviceKind::infer_from_id(device_id) else {
        return false;
    };
    DeviceKind::ALL
        .iter()
        .filter(|kind| **kind != expected)
        .any(|kind| packet.get(kind.payload_key()).is_some())
}

/// Missing, unparseable or skewed timestamps are anomalies
pub fn has_timestamp_anomaly(packet: &Value, now: DateTime<Utc>, max_skew: Duration) -> bool {
    let stamp = packet
        .get("timestamp")
        .and_then(Value::as_str)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok());

    match stamp {
        Some(ts) => {
            (now - ts.with_timezone(&Utc)).num_milliseconds().abs() > max_skew.num_milliseconds()
        }
        None => true,
    }
}
