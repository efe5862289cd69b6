//! Device module - kinds, readings, synthesis and placement

mod traits;
mod reading;
mod simulator;
mod spatial;

pub use traits::{
    Device, DeviceKind, DeviceStatus, GeoPoint, NetworkType, SensorState, DEFAULT_DRAIN_RATE,
    LOW_BATTERY_THRESHOLD,
};
pub use reading::*;
pub use simulator::ReadingGenerator;
pub use spatial::{haversine_km, nearest_edge_node, CityBounds, EARTH_RADIUS_KM};
