//! Edge computing layer - per-node summarization and load accounting

mod node;
pub mod summarizers;

pub use node::{EdgeNode, EdgeNodeState, EdgeNodeStatus, ProcessedSummary, ProcessingRecord};
pub use summarizers::{Analysis, PollutionSummary, TrafficSummary, VideoAnalysis};

use serde::{Deserialize, Serialize};

use crate::devices::GeoPoint;

/// Edge node tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EdgeConfig {
    /// Processed records kept per node
    pub history_capacity: usize,

    /// CPU percent shed per maintenance tick
    pub cooldown_step: f64,

    /// Idle draw in watts
    pub base_power_watts: f64,

    /// Extra watts per CPU percent
    pub watts_per_cpu_percent: f64,

    /// CPU percent added per millisecond of estimated processing time
    pub cpu_load_per_ms: f64,
}

impl Default for EdgeConfig {
    fn default() -> Self {
        Self {
            history_capacity: 100,
            cooldown_step: 5.0,
            base_power_watts: 150.0,
            watts_per_cpu_percent: 2.0,
            cpu_load_per_ms: 0.02,
        }
    }
}

/// The five fixed edge sites: (name, lat, lon)
pub const EDGE_SITES: [(&str, f64, f64); 5] = [
    ("Downtown Hub", 40.7559, -73.9781),
    ("Business District", 40.7519, -73.9801),
    ("Residential North", 40.7579, -73.9761),
    ("Industrial South", 40.7509, -73.9781),
    ("Transport Junction", 40.7539, -73.9821),
];

/// Build the standard edge node set, `edge_node_1` .. `edge_node_5`
pub fn standard_edge_nodes(config: &EdgeConfig) -> Vec<EdgeNode> {
    EDGE_SITES
        .iter()
        .enumerate()
        .map(|(i, (name, lat, lon))| {
            EdgeNode::with_config(
                &format!("edge_node_{}", i + 1),
                name,
                GeoPoint::new(*lat, *lon),
                1500.0 + 200.0 * i as f64,
                config.clone(),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_nodes() {
        let nodes = standard_edge_nodes(&EdgeConfig::default());
        assert_eq!(nodes.len(), 5);
        assert_eq!(nodes[0].id, "edge_node_1");
        assert_eq!(nodes[4].name, "Transport Junction");
        assert_eq!(nodes[2].processing_power_gflops, 1900.0);
    }
}
