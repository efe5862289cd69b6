// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.

//! Per-kind summarizers run at the edge

use serde::{Deserialize, Serialize};

use crate::devices::{AirQuality, CongestionLevel, Payload, TrafficData, VideoFrame};

/// Result of summarizing one reading
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Analysis {
    #[serde(rename = "analysis")]
    VideoAnalysis(VideoAnalysis),
    TrafficSummary(TrafficSummary),
    PollutionSummary(PollutionSummary),
    /// Pass-through for kinds without a dedicated summarizer
    Summary(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrafficFlow {
    Light,
    Moderate,
    Heavy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    Normal,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoAnalysis {
    pub vehicle_count: u32,
    pub pedestrian_count: u32,
    pub traffic_flow: TrafficFlow,
    pub incidents: Vec<String>,
    pub alert_level: AlertLevel,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrafficSummary {
    pub avg_speed: u32,
    /// Percent
    pub density: u32,
    pub congestion_level: CongestionLevel,
    pub recommendation: String,
    /// kg/hour
    pub co2_emission: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollutionSummary {
    #[serde(rename = "overallAQI")]
    pub overall_aqi: f64,
    pub health_risk: String,
    pub dominant_pollutant: String,
    pub trend: String,
    pub recommendations: Vec<String>,
}

pub const GENERIC_SUMMARY: &str = "Data processed at edge";

/// Dispatch a payload to its summarizer
pub fn summarize(payload: &Payload) -> Analysis {
    match payload {
        Payload::VideoFrame(frame) => Analysis::VideoAnalysis(summarize_video(frame)),
        Payload::Traffic(traffic) => Analysis::TrafficSummary(summarize_traffic(traffic)),
        Payload::AirQuality(air) => Analysis::PollutionSummary(summarize_pollution(air)),
        _ => Analysis::Summary(GENERIC_SUMMARY.to_string()),
    }
}

pub fn summarize_video(frame: &VideoFrame) -> VideoAnalysis {
    let detections = &frame.detections;
    VideoAnalysis {
        vehicle_count: detections.vehicles,
        pedestrian_count: detections.pedestrians,
        traffic_flow: traffic_flow(detections.vehicles),
        incidents: detections.incidents.clone(),
        alert_level: if detections.incidents.is_empty() {
            AlertLevel::Normal
        } else {
            AlertLevel::High
        },
    }
}

pub fn summarize_traffic(traffic: &TrafficData) -> TrafficSummary {
    let recommendation = if traffic.congestion_level == CongestionLevel::High {
        "Consider alternative routes or adjust signal timing"
    } else {
        "Traffic flow is optimal"
    };

    TrafficSummary {
        avg_speed: traffic.average_speed,
        density: traffic_density(traffic.vehicle_count),
        congestion_level: traffic.congestion_level,
        recommendation: recommendation.to_string(),
        co2_emission: co2_emission(traffic),
    }
}

pub fn summarize_pollution(air: &AirQuality) -> PollutionSummary {
    let mean = (air.pm25 + air.pm10 + air.no2) / 3.0;
    PollutionSummary {
        overall_aqi: air.aqi,
        health_risk: health_risk(air.aqi).to_string(),
        dominant_pollutant: dominant_pollutant(air).to_string(),
        trend: if mean > 40.0 { "increasing" } else { "stable" }.to_string(),
        recommendations: pollution_recommendations(air),
    }
}

pub fn traffic_flow(vehicles: u32) -> TrafficFlow {
    match vehicles {
        0..=4 => TrafficFlow::Light,
        5..=14 => TrafficFlow::Moderate,
        _ => TrafficFlow::Heavy,
    }
}

/// Density percentage, two points per vehicle
pub fn traffic_density(vehicles: u32) -> u32 {
    vehicles.saturating_mul(2).min(100)
}

/// kg CO2 per hour; slow traffic burns more
pub fn co2_emission(traffic: &TrafficData) -> f64 {
    let base = f64::from(traffic.vehicle_count) * 0.2;
    let speed_factor = if traffic.average_speed < 30 { 1.5 } else { 1.0 };
    base * speed_factor
}

pub fn health_risk(aqi: f64) -> &'static str {
    if aqi <= 50.0 {
        "Good"
    } else if aqi <= 100.0 {
        "Moderate"
    } else if aqi <= 150.0 {
        "Unhealthy for Sensitive Groups"
    } else if aqi <= 200.0 {
        "Unhealthy"
    } else {
        "Hazardous"
    }
}

/// Pollutant with the strictly greatest value; the earliest wins ties.
pub fn dominant_pollutant(air: &AirQuality) -> &'static str {
    let pollutants = air.pollutants();
    let mut best = pollutants[0];
    for candidate in &pollutants[1..] {
        if candidate.1 > best.1 {
            best = *candidate;
        }
    }
    best.0
}

fn pollution_recommendations(air: &AirQuality) -> Vec<String> {
    let mut recommendations = Vec::new();
    if air.pm25 > 35.0 {
        recommendations.push("Reduce outdoor activities".to_string());
    }
    if air.no2 > 40.0 {
        recommendations.push("Limit vehicle emissions".to_string());
    }
    if air.aqi > 100.0 {
        recommendations.push("Use air purifiers indoors".to_string());
    }
    recommendations
}
