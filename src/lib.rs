// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.

//! CityGrid - Smart-City IoT Network Simulator
//!
//! Simulates a city's field devices and the infrastructure behind them:
//! - Eight device kinds with seedable reading synthesis and battery drain
//! - Nearest-edge-node assignment over great-circle distance
//! - Edge nodes that summarize readings and track CPU, energy and saved bandwidth
//! - Per-packet intrusion screening, AES-256-GCM transport and device tokens
//! - Scheduled incidents with auto-clear and auto-repair timers
//! - Department dashboards with threshold alerts
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                       CitySimulation                         │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌─────────┐   ┌──────────┐   ┌───────────┐   ┌───────────┐  │
//! │  │ Devices │ → │ Security │ → │ Edge Node │ → │ Event Bus │  │
//! │  │         │   │ Service  │   │ Processor │   │           │  │
//! │  └─────────┘   └──────────┘   └───────────┘   └───────────┘  │
//! │       ↑              ↑              ↑               ↓        │
//! │  ┌────────────────────────────────────────┐  ┌────────────┐  │
//! │  │ Ticks: main / maintenance / security / │  │ Department │  │
//! │  │ battery + deferred task queue          │  │ Views      │  │
//! │  └────────────────────────────────────────┘  └────────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod core;
pub mod departments;
pub mod devices;
pub mod edge;
pub mod error;
pub mod security;

// Re-exports for convenience
pub use config::Config;
pub use core::{CityEvent, CitySimulation, Clock, EnergyStats, EventBus, ScenarioResult, VirtualClock};
pub use departments::DashboardPayload;
pub use devices::{Device, DeviceKind, DeviceStatus, Reading};
pub use edge::EdgeNode;
pub use error::{CityError, CityResult};
pub use security::SecurityService;

/// CityGrid version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// CityGrid name
pub const NAME: &str = "CityGrid";
