// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.

//! City simulation engine - owns devices, edge nodes and security state and
//! drives the periodic ticks

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use std::sync::Arc;
use std::time::Duration as StdDuration;
use tokio::runtime::Handle;
use tokio::sync::{broadcast, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::clock::{Clock, SystemClock};
use super::event_bus::{CityEvent, CitySnapshot, DeviceData, DeviceSnapshot, Event, EventBus};
use super::scenarios::{self, DelayWindow, EmergencyAlert, ScenarioKind, ScenarioOutcome};
use super::scheduler::{DeferredQueue, DeferredTask};
use super::{CityStatus, EnergyStats, TickReport};
use crate::config::{Config, EventProbabilities};
use crate::departments::{self, DashboardPayload};
use crate::devices::{nearest_edge_node, Device, DeviceKind, NetworkType, Reading, ReadingGenerator};
use crate::edge::{standard_edge_nodes, EdgeNode, EdgeNodeStatus};
use crate::error::{CityError, CityResult};
use crate::security::{SecurityAlert, SecurityService, SecurityStatus};

/// What a scenario trigger did
#[derive(Debug, Clone)]
pub enum ScenarioResult {
    Emergency(EmergencyAlert),
    Security(SecurityAlert),
    /// Known scenario, but no device qualified
    NoTarget(ScenarioKind),
    /// Unrecognized scenario name; nothing changed
    Unknown(String),
}

/// Everything the ticks mutate, guarded by one lock
struct CityState {
    running: bool,
    devices: Vec<Device>,
    edge_nodes: Vec<EdgeNode>,
    security: SecurityService,
    generator: ReadingGenerator,
    rng: ChaCha8Rng,
    deferred: DeferredQueue,
    emergency_alerts: Vec<EmergencyAlert>,
}

struct Inner {
    config: Config,
    clock: Arc<dyn Clock>,
    bus: EventBus,
    state: Mutex<CityState>,
}

struct Driver {
    shutdown: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

/// Smart-city simulation.
///
/// All state sits behind one mutex so a tick never observes another tick
/// half-applied. The periodic tasks run on a single driver task spawned by
/// [`start`](Self::start); every tick method is also callable directly, which
/// is how tests step the simulation.
pub struct CitySimulation {
    inner: Arc<Inner>,
    driver: Mutex<Option<Driver>>,
}

impl CitySimulation {
    pub fn new(config: Config) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: Config, clock: Arc<dyn Clock>) -> Self {
        let now = clock.now();
        let (mut rng, generator, security) = match config.seed {
            Some(seed) => (
                ChaCha8Rng::seed_from_u64(seed),
                ReadingGenerator::from_seed(seed.wrapping_add(1)).with_utc_offset(config.simulation.utc_offset_hours),
                SecurityService::with_seed(config.security.clone(), seed.wrapping_add(2)),
            ),
            None => (
                ChaCha8Rng::from_entropy(),
                ReadingGenerator::from_entropy().with_utc_offset(config.simulation.utc_offset_hours),
                SecurityService::new(config.security.clone()),
            ),
        };

        let (devices, edge_nodes) = build_city(&config, &mut rng, now);
        info!(
            devices = devices.len(),
            edge_nodes = edge_nodes.len(),
            seeded = config.seed.is_some(),
            "City initialized"
        );

        let state = CityState {
            running: false,
            devices,
            edge_nodes,
            security,
            generator,
            rng,
            deferred: DeferredQueue::new(),
            emergency_alerts: Vec::new(),
        };

        Self {
            inner: Arc::new(Inner {
                bus: EventBus::new(config.simulation.event_bus_capacity),
                config,
                clock,
                state: Mutex::new(state),
            }),
            driver: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// stopped -> running. Publishes the initial snapshot and spawns the
    /// periodic tasks on the current tokio runtime. No-op when running.
    pub fn start(&self) -> CityResult<()> {
        let runtime = Handle::try_current().map_err(|_| CityError::NoRuntime)?;
        let mut driver = self.driver.lock();
        let now = self.inner.clock.now();

        let snapshot = {
            let mut state = self.inner.state.lock();
            if state.running {
                return Ok(());
            }
            state.running = true;
            state.snapshot()
        };

        info!(
            devices = snapshot.devices.len(),
            edge_nodes = snapshot.edge_nodes.len(),
            "Starting city simulation"
        );
        self.inner.bus.publish(CityEvent::CityInitialized(Box::new(snapshot)), now);

        let (shutdown, shutdown_rx) = oneshot::channel();
        let handle = runtime.spawn(drive(Arc::clone(&self.inner), shutdown_rx));
        *driver = Some(Driver { shutdown, handle });
        Ok(())
    }

    /// running -> stopped. Cancels all four periodic tasks together.
    ///
    /// Pending auto-clear/auto-repair tasks stay queued unless
    /// `cancel_deferred_on_stop` is set, but nothing polls them while
    /// stopped: they are paused until the next `poll_deferred` call or the
    /// first maintenance tick after a restart, which fires every task that
    /// came due in between.
    pub fn stop(&self) {
        let driver = self.driver.lock().take();
        let was_running = {
            let mut state = self.inner.state.lock();
            let was_running = state.running;
            state.running = false;
            if self.inner.config.simulation.cancel_deferred_on_stop {
                state.deferred.clear();
            }
            was_running
        };

        if let Some(driver) = driver {
            let _ = driver.shutdown.send(());
            driver.handle.abort();
        }
        if was_running {
            info!("City simulation stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.inner.state.lock().running
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.inner.bus.subscribe()
    }

    /// One main tick: every reporting device through security and its edge
    /// node, then status, energy and random incidents.
    pub fn run_main_tick(&self) -> TickReport {
        self.inner.main_tick(false).unwrap_or_default()
    }

    pub fn run_maintenance_tick(&self) {
        self.inner.maintenance_tick(false);
    }

    pub fn run_security_sweep(&self) {
        self.inner.security_sweep(false);
    }

    /// Returns how many devices changed status
    pub fn run_battery_tick(&self) -> usize {
        self.inner.battery_tick(false).unwrap_or_default()
    }

    /// Fire deferred tasks that are due; returns how many fired
    pub fn poll_deferred(&self) -> usize {
        self.inner
            .with_state(false, |state, now, events| state.fire_due(now, events))
            .unwrap_or_default()
    }

    /// Fire a scenario by name, running or not
    pub fn trigger_scenario(&self, name: &str) -> ScenarioResult {
        match ScenarioKind::parse(name) {
            Some(kind) => self.trigger(kind),
            None => {
                warn!("Unknown scenario type: {}", name);
                ScenarioResult::Unknown(name.to_string())
            }
        }
    }

    pub fn trigger(&self, kind: ScenarioKind) -> ScenarioResult {
        info!(scenario = %kind, "Triggering emergency scenario");
        let config = &self.inner.config;
        self.inner
            .with_state(false, |state, now, events| state.run_scenario(kind, config, now, events))
            .unwrap_or(ScenarioResult::NoTarget(kind))
    }

    pub fn clear_alert(&self, alert_id: &str) -> CityResult<()> {
        let cleared = self
            .inner
            .with_state(false, |state, _, events| state.clear_alert(alert_id, events))
            .unwrap_or(false);
        if cleared {
            Ok(())
        } else {
            Err(CityError::AlertNotFound(alert_id.to_string()))
        }
    }

    pub fn get_devices(&self) -> Vec<Device> {
        self.inner.state.lock().devices.clone()
    }

    pub fn get_device(&self, device_id: &str) -> CityResult<Device> {
        self.inner
            .state
            .lock()
            .devices
            .iter()
            .find(|d| d.id == device_id)
            .cloned()
            .ok_or_else(|| CityError::DeviceNotFound(device_id.to_string()))
    }

    pub fn get_devices_by_kind(&self, kind: DeviceKind) -> Vec<Device> {
        self.inner
            .state
            .lock()
            .devices
            .iter()
            .filter(|d| d.kind == kind)
            .cloned()
            .collect()
    }

    pub fn get_edge_nodes(&self) -> Vec<EdgeNode> {
        self.inner.state.lock().edge_nodes.clone()
    }

    pub fn get_edge_node(&self, node_id: &str) -> CityResult<EdgeNode> {
        self.inner
            .state
            .lock()
            .edge_nodes
            .iter()
            .find(|n| n.id == node_id)
            .cloned()
            .ok_or_else(|| CityError::EdgeNodeNotFound(node_id.to_string()))
    }

    pub fn get_edge_node_statuses(&self) -> Vec<EdgeNodeStatus> {
        self.inner.state.lock().edge_nodes.iter().map(EdgeNode::status).collect()
    }

    pub fn get_energy_stats(&self) -> EnergyStats {
        let state = self.inner.state.lock();
        EnergyStats::compute(&state.devices, &state.edge_nodes)
    }

    pub fn get_security_status(&self) -> SecurityStatus {
        self.inner.state.lock().security.status()
    }

    pub fn get_security_alerts(&self) -> Vec<SecurityAlert> {
        self.inner.state.lock().security.active_alerts().iter().cloned().collect()
    }

    pub fn get_active_alerts(&self) -> Vec<EmergencyAlert> {
        self.inner.state.lock().emergency_alerts.clone()
    }

    pub fn get_city_status(&self) -> CityStatus {
        let state = self.inner.state.lock();
        CityStatus {
            devices: state.devices.len(),
            online_devices: state.devices.iter().filter(|d| d.is_online()).count(),
            edge_nodes: state.edge_nodes.len(),
            active_alerts: state.emergency_alerts.len(),
            energy_stats: EnergyStats::compute(&state.devices, &state.edge_nodes),
            security_status: state.security.status(),
            is_running: state.running,
        }
    }

    /// Department dashboard over the current device set
    pub fn department_view(&self, department_id: &str) -> CityResult<DashboardPayload> {
        let now = self.inner.clock.now();
        let state = self.inner.state.lock();
        departments::format_for_department(&state.devices, department_id, now)
    }

    pub fn authenticate_device(&self, device_id: &str, token: &str) -> bool {
        let now = self.inner.clock.now();
        self.inner.state.lock().security.authenticate_device(device_id, token, now)
    }

    pub fn issue_device_token(&self, device_id: &str) -> CityResult<String> {
        let mut state = self.inner.state.lock();
        if !state.devices.iter().any(|d| d.id == device_id) {
            return Err(CityError::DeviceNotFound(device_id.to_string()));
        }
        state.security.issue_token(device_id)
    }
}

impl Drop for CitySimulation {
    fn drop(&mut self) {
        if let Some(driver) = self.driver.get_mut().take() {
            driver.handle.abort();
        }
    }
}

impl Inner {
    /// Run `f` under the state lock, then publish what it collected.
    ///
    /// With `require_running` the closure is skipped once the simulation has
    /// stopped, so a tick racing `stop` cannot mutate anything.
    fn with_state<T>(
        &self,
        require_running: bool,
        f: impl FnOnce(&mut CityState, DateTime<Utc>, &mut Vec<CityEvent>) -> T,
    ) -> Option<T> {
        let now = self.clock.now();
        let mut events = Vec::new();
        let result = {
            let mut state = self.state.lock();
            if require_running && !state.running {
                return None;
            }
            f(&mut state, now, &mut events)
        };
        for event in events {
            self.bus.publish(event, now);
        }
        Some(result)
    }

    fn main_tick(&self, require_running: bool) -> Option<TickReport> {
        let config = &self.config;
        self.with_state(require_running, |state, now, events| {
            let report = state.process_devices(now, events);
            events.push(CityEvent::EdgeNodesStatus(
                state.edge_nodes.iter().map(EdgeNode::status).collect(),
            ));
            events.push(CityEvent::SecurityStatus(Box::new(state.security.status())));
            events.push(CityEvent::EnergyStats(EnergyStats::compute(&state.devices, &state.edge_nodes)));
            state.roll_random_events(config, now, events);
            report
        })
    }

    fn maintenance_tick(&self, require_running: bool) {
        self.with_state(require_running, |state, now, events| {
            for node in state.edge_nodes.iter_mut() {
                node.cool_down();
            }
            state.fire_due(now, events);
        });
    }

    fn security_sweep(&self, require_running: bool) {
        self.with_state(require_running, |state, now, _| {
            let dropped = state.security.clear_old_alerts(now);
            if dropped > 0 {
                debug!(dropped, "Cleared old security alerts");
            }
            state.security.maybe_simulate_attack(now);
        });
    }

    fn battery_tick(&self, require_running: bool) -> Option<usize> {
        self.with_state(require_running, |state, _, _| {
            let mut changed = 0;
            for device in state.devices.iter_mut() {
                if device.drain_battery(1) {
                    debug!(device_id = %device.id, status = ?device.status, "Device status changed");
                    changed += 1;
                }
            }
            changed
        })
    }
}

impl CityState {
    fn snapshot(&self) -> CitySnapshot {
        CitySnapshot {
            devices: self.devices.iter().map(DeviceSnapshot::from).collect(),
            edge_nodes: self.edge_nodes.iter().map(EdgeNode::status).collect(),
            energy_stats: EnergyStats::compute(&self.devices, &self.edge_nodes),
            security_status: self.security.status(),
        }
    }

    fn process_devices(&mut self, now: DateTime<Utc>, events: &mut Vec<CityEvent>) -> TickReport {
        let mut report = TickReport::default();

        for index in 0..self.devices.len() {
            if !self.devices[index].is_reporting() {
                report.skipped_offline += 1;
                continue;
            }
            match self.process_device(index, now) {
                Ok(Some(data)) => {
                    report.processed += 1;
                    events.push(CityEvent::DeviceData(Box::new(data)));
                }
                Ok(None) => report.failed += 1,
                Err(e) => {
                    warn!(device_id = %self.devices[index].id, error = %e, "Device tick failed");
                    report.failed += 1;
                }
            }
        }

        report
    }

    /// generate -> screen -> encrypt -> decrypt -> edge node.
    ///
    /// `Ok(None)` means the packet failed decryption; the security layer has
    /// already recorded that.
    fn process_device(&mut self, index: usize, now: DateTime<Utc>) -> CityResult<Option<DeviceData>> {
        let device = &mut self.devices[index];
        let reading = self.generator.generate(device, now);
        device.last_update = now;
        device.last_reading = Some(reading.clone());
        let device_id = device.id.clone();
        let node_id = device
            .assigned_edge_node_id
            .clone()
            .ok_or_else(|| CityError::EdgeNodeNotFound(format!("none assigned to {}", device_id)))?;
        let snapshot = DeviceSnapshot::from(&*device);

        let security = self.security.analyze_reading(&reading, now)?;
        let packet = serde_json::to_value(&reading)?;
        let encrypted_packet = self.security.encrypt(&packet, &device_id, now)?;
        let Some(decrypted) = self.security.decrypt(&encrypted_packet, &device_id, now) else {
            return Ok(None);
        };
        let parsed: Reading = serde_json::from_value(decrypted)?;

        let node = self
            .edge_nodes
            .iter_mut()
            .find(|n| n.id == node_id)
            .ok_or_else(|| CityError::EdgeNodeNotFound(node_id.clone()))?;
        let processed_data = node.process_reading(&parsed, now);

        Ok(Some(DeviceData {
            device: snapshot,
            raw_data: reading,
            encrypted_packet,
            processed_data,
            edge_node_id: node_id,
            security,
        }))
    }

    /// Each incident kind is rolled independently
    fn roll_random_events(&mut self, config: &Config, now: DateTime<Utc>, events: &mut Vec<CityEvent>) {
        let EventProbabilities {
            traffic_accident,
            waste_collection,
            pollution_spike,
            device_malfunction,
        } = config.simulation.event_probabilities;

        for (kind, p) in [
            (ScenarioKind::TrafficAccident, traffic_accident),
            (ScenarioKind::WasteCollection, waste_collection),
            (ScenarioKind::PollutionSpike, pollution_spike),
            (ScenarioKind::DeviceMalfunction, device_malfunction),
        ] {
            if self.rng.gen_bool(p.clamp(0.0, 1.0)) {
                debug!(scenario = %kind, "Random incident");
                self.run_scenario(kind, config, now, events);
            }
        }
    }

    fn run_scenario(
        &mut self,
        kind: ScenarioKind,
        config: &Config,
        now: DateTime<Utc>,
        events: &mut Vec<CityEvent>,
    ) -> ScenarioResult {
        let sim = &config.simulation;
        let outcome = match kind {
            ScenarioKind::TrafficAccident => scenarios::traffic_accident(
                &self.devices,
                &mut self.rng,
                now,
                DelayWindow::new(sim.auto_clear_min_secs, sim.auto_clear_max_secs),
            ),
            ScenarioKind::PollutionSpike => scenarios::pollution_spike(&self.devices, &mut self.rng, now),
            ScenarioKind::WasteCollection => scenarios::waste_collection(&self.devices, &mut self.rng, now),
            ScenarioKind::DeviceMalfunction => scenarios::device_malfunction(
                &mut self.devices,
                &mut self.rng,
                now,
                DelayWindow::new(sim.auto_repair_min_secs, sim.auto_repair_max_secs),
            ),
            ScenarioKind::SecurityBreach => {
                return ScenarioResult::Security(self.security.simulate_network_attack(now));
            }
        };

        match outcome {
            Some(outcome) => ScenarioResult::Emergency(self.record_outcome(outcome, events)),
            None => {
                debug!(scenario = %kind, "No device qualified for scenario");
                ScenarioResult::NoTarget(kind)
            }
        }
    }

    fn record_outcome(&mut self, outcome: ScenarioOutcome, events: &mut Vec<CityEvent>) -> EmergencyAlert {
        let ScenarioOutcome { alert, deferred } = outcome;
        info!(
            alert_id = %alert.id,
            device_id = %alert.device_id,
            severity = ?alert.severity,
            "{}",
            alert.description
        );
        if let Some((fire_at, task)) = deferred {
            self.deferred.schedule(fire_at, task);
        }
        self.emergency_alerts.push(alert.clone());
        events.push(CityEvent::EmergencyAlert(alert.clone()));
        alert
    }

    fn clear_alert(&mut self, alert_id: &str, events: &mut Vec<CityEvent>) -> bool {
        let before = self.emergency_alerts.len();
        self.emergency_alerts.retain(|a| a.id != alert_id);
        if self.emergency_alerts.len() == before {
            return false;
        }
        info!(alert_id, "Alert cleared");
        events.push(CityEvent::AlertCleared { alert_id: alert_id.to_string() });
        true
    }

    fn fire_due(&mut self, now: DateTime<Utc>, events: &mut Vec<CityEvent>) -> usize {
        let due = self.deferred.pop_due(now);
        let fired = due.len();

        for task in due {
            debug!(task = ?task, "Deferred task firing");
            match task {
                DeferredTask::ClearAlert(alert_id) => {
                    self.clear_alert(&alert_id, events);
                }
                DeferredTask::RepairDevice(device_id) => {
                    let Some(device) = self.devices.iter_mut().find(|d| d.id == device_id) else {
                        continue;
                    };
                    if device.repair() {
                        device.last_update = now;
                        info!(device_id = %device_id, "Device repaired");
                        events.push(CityEvent::DeviceRepaired { device_id });
                    }
                }
            }
        }

        fired
    }
}

/// Place devices at random with a random radio and starting charge, then
/// assign each to its nearest edge node
fn build_city(config: &Config, rng: &mut ChaCha8Rng, now: DateTime<Utc>) -> (Vec<Device>, Vec<EdgeNode>) {
    let sim = &config.simulation;
    let mut edge_nodes = standard_edge_nodes(&config.edge);
    let mut devices = Vec::with_capacity(sim.device_counts.total());

    for kind in DeviceKind::ALL {
        for n in 1..=sim.device_counts.count(kind) {
            let id = format!("{}_{}", kind.id_prefix(), n);
            let location = sim.bounds.random_point(rng);
            let network = NetworkType::RADIOS.choose(rng).copied().unwrap_or(NetworkType::Unknown);
            let battery = f64::from(rng.gen_range(1u32..=100));
            let mut device = Device::new(&id, kind, location, now)
                .with_network(network)
                .with_battery(battery);
            if kind == DeviceKind::WasteBin {
                device = device.with_fill_level(f64::from(rng.gen_range(0u32..100)));
            }
            device.assigned_edge_node_id = nearest_edge_node(&device.location, &edge_nodes).map(str::to_string);
            devices.push(device);
        }
    }

    for device in &devices {
        let Some(node_id) = device.assigned_edge_node_id.as_deref() else {
            continue;
        };
        if let Some(node) = edge_nodes.iter_mut().find(|n| n.id == node_id) {
            node.connect_device(&device.id);
        }
    }

    (devices, edge_nodes)
}

fn ticker(period_ms: u64) -> Interval {
    let period = StdDuration::from_millis(period_ms.max(1));
    let mut interval = interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}

/// The four periodic tasks on one loop; the shutdown signal ends all of them
async fn drive(inner: Arc<Inner>, mut shutdown: oneshot::Receiver<()>) {
    let sim = &inner.config.simulation;
    let mut main = ticker(sim.main_interval_ms);
    let mut maintenance = ticker(sim.maintenance_interval_ms);
    let mut security = ticker(sim.security_interval_ms);
    let mut battery = ticker(sim.battery_interval_ms);

    loop {
        tokio::select! {
            biased;
            _ = &mut shutdown => break,
            _ = main.tick() => {
                if let Some(report) = inner.main_tick(true) {
                    debug!(
                        processed = report.processed,
                        skipped = report.skipped_offline,
                        failed = report.failed,
                        "Main tick"
                    );
                }
            }
            _ = maintenance.tick() => inner.maintenance_tick(true),
            _ = security.tick() => inner.security_sweep(true),
            _ = battery.tick() => {
                inner.battery_tick(true);
            }
        }
    }

    debug!("Simulation driver exited");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::VirtualClock;
    use crate::devices::{haversine_km, DeviceStatus};
    use chrono::TimeZone;

    fn quiet_config(seed: u64) -> Config {
        let mut config = Config::default();
        config.seed = Some(seed);
        config.simulation.event_probabilities = EventProbabilities {
            traffic_accident: 0.0,
            waste_collection: 0.0,
            pollution_spike: 0.0,
            device_malfunction: 0.0,
        };
        config.security.attack_probability = 0.0;
        config
    }

    fn virtual_sim(config: Config) -> (CitySimulation, VirtualClock) {
        let clock = VirtualClock::new(Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap());
        let sim = CitySimulation::with_clock(config, Arc::new(clock.clone()));
        (sim, clock)
    }

    fn drain(rx: &mut broadcast::Receiver<Event>) -> Vec<Event> {
        let mut out = Vec::new();
        while let Ok(event) = rx.try_recv() {
            out.push(event);
        }
        out
    }

    #[test]
    fn test_every_device_assigned_to_nearest_node() {
        let (sim, _) = virtual_sim(quiet_config(7));
        let devices = sim.get_devices();
        let nodes = sim.get_edge_nodes();
        assert_eq!(devices.len(), 126);
        assert_eq!(nodes.len(), 5);

        for device in &devices {
            let assigned = device.assigned_edge_node_id.as_deref().unwrap();
            let node = nodes.iter().find(|n| n.id == assigned).unwrap();
            let best = nodes
                .iter()
                .map(|n| haversine_km(&device.location, &n.location))
                .fold(f64::INFINITY, f64::min);
            assert_eq!(haversine_km(&device.location, &node.location), best);
            assert!(node.connected_device_ids().any(|id| id == device.id));
        }
        assert_eq!(nodes.iter().map(EdgeNode::connected_count).sum::<usize>(), 126);
    }

    #[test]
    fn test_seeded_placement_is_reproducible() {
        let (a, _) = virtual_sim(quiet_config(42));
        let (b, _) = virtual_sim(quiet_config(42));
        let placed = |sim: &CitySimulation| {
            sim.get_devices()
                .into_iter()
                .map(|d| (d.fill_level(), d.battery_level, d.network_type, d.location, d.id))
                .collect::<Vec<_>>()
        };
        assert_eq!(placed(&a), placed(&b));
    }

    #[test]
    fn test_initial_radios_and_charge_are_mixed() {
        let (sim, _) = virtual_sim(quiet_config(42));
        let devices = sim.get_devices();

        for radio in NetworkType::RADIOS {
            assert!(devices.iter().any(|d| d.network_type == radio), "no {:?} device", radio);
        }
        assert!(devices.iter().all(|d| (1.0..=100.0).contains(&d.battery_level)));
        assert!(devices.iter().all(|d| d.status != DeviceStatus::Offline));

        let first = devices[0].battery_level;
        assert!(devices.iter().any(|d| d.battery_level != first));
        for d in devices.iter().filter(|d| d.battery_level < 10.0) {
            assert_eq!(d.status, DeviceStatus::LowBattery);
        }
    }

    #[test]
    fn test_main_tick_processes_every_device() {
        let (sim, _) = virtual_sim(quiet_config(3));
        let mut rx = sim.subscribe();

        let report = sim.run_main_tick();
        assert_eq!(report, TickReport { processed: 126, skipped_offline: 0, failed: 0 });

        let events = drain(&mut rx);
        let device_events = events.iter().filter(|e| e.payload.name() == "device_data").count();
        assert_eq!(device_events, 126);
        let names: Vec<&str> = events.iter().skip(126).map(|e| e.payload.name()).collect();
        assert_eq!(names, ["edge_nodes_status", "security_status", "energy_stats"]);

        let stats = sim.get_energy_stats();
        assert!(stats.total_consumption_watts > 0.0);
        assert!(sim.get_devices().iter().all(|d| d.last_reading.is_some()));
        assert!(sim.get_security_status().total_alerts == 0);
    }

    #[test]
    fn test_device_data_matches_assignment() {
        let (sim, _) = virtual_sim(quiet_config(5));
        let mut rx = sim.subscribe();
        sim.run_main_tick();

        for event in drain(&mut rx) {
            if let CityEvent::DeviceData(data) = event.payload {
                let device = sim.get_device(&data.device.id).unwrap();
                assert_eq!(device.assigned_edge_node_id.as_deref(), Some(data.edge_node_id.as_str()));
                assert_eq!(data.processed_data.edge_node_id, data.edge_node_id);
                assert!(data.security.is_secure);
            }
        }
    }

    #[test]
    fn test_offline_devices_are_skipped() {
        let mut config = quiet_config(9);
        config.simulation.device_counts = crate::config::DeviceCounts {
            cameras: 2,
            traffic_sensors: 2,
            waste_bins: 2,
            streetlights: 2,
            pollution_sensors: 0,
            water_quality_sensors: 0,
            noise_sensors: 0,
            parking_sensors: 0,
        };
        let (sim, _) = virtual_sim(config);

        // 5G drains 0.5 per tick, LPWAN 0.1
        for _ in 0..1000 {
            sim.run_battery_tick();
        }
        assert!(sim.get_devices().iter().all(|d| d.status == DeviceStatus::Offline));

        let report = sim.run_main_tick();
        assert_eq!(report.processed, 0);
        assert_eq!(report.skipped_offline, 8);
    }

    #[test]
    fn test_device_failure_repairs_after_timer() {
        let (sim, clock) = virtual_sim(quiet_config(11));
        let mut rx = sim.subscribe();

        let alert = match sim.trigger_scenario("device_failure") {
            ScenarioResult::Emergency(alert) => alert,
            other => panic!("unexpected {:?}", other),
        };
        assert_eq!(sim.get_device(&alert.device_id).unwrap().status, DeviceStatus::Malfunction);
        assert_eq!(sim.get_active_alerts().len(), 1);

        // repair window is 120-720 s
        clock.advance_secs(119);
        assert_eq!(sim.poll_deferred(), 0);
        assert_eq!(sim.get_device(&alert.device_id).unwrap().status, DeviceStatus::Malfunction);

        clock.advance_secs(602);
        assert_eq!(sim.poll_deferred(), 1);
        assert_eq!(sim.get_device(&alert.device_id).unwrap().status, DeviceStatus::Online);

        let repaired = drain(&mut rx)
            .into_iter()
            .any(|e| matches!(e.payload, CityEvent::DeviceRepaired { ref device_id } if *device_id == alert.device_id));
        assert!(repaired);
    }

    #[test]
    fn test_traffic_accident_auto_clears() {
        let (sim, clock) = virtual_sim(quiet_config(12));
        let mut rx = sim.subscribe();

        let alert = match sim.trigger_scenario("traffic_accident") {
            ScenarioResult::Emergency(alert) => alert,
            other => panic!("unexpected {:?}", other),
        };
        assert!(alert.auto_clear_after.is_some());
        assert_eq!(sim.get_active_alerts().len(), 1);

        clock.advance_secs(361);
        sim.run_maintenance_tick();
        assert!(sim.get_active_alerts().is_empty());

        let names: Vec<&str> = drain(&mut rx).iter().map(|e| e.payload.name()).collect();
        assert_eq!(names, ["emergency_alert", "alert_cleared"]);
    }

    #[test]
    fn test_unknown_scenario_changes_nothing() {
        let (sim, _) = virtual_sim(quiet_config(13));
        let mut rx = sim.subscribe();
        let before = sim.get_devices();

        assert!(matches!(sim.trigger_scenario("alien_invasion"), ScenarioResult::Unknown(_)));
        assert!(sim.get_active_alerts().is_empty());
        assert_eq!(sim.get_security_status().total_alerts, 0);
        let after = sim.get_devices();
        assert!(before.iter().zip(&after).all(|(a, b)| a.status == b.status));
        assert!(drain(&mut rx).is_empty());
    }

    #[test]
    fn test_security_breach_records_alert() {
        let (sim, _) = virtual_sim(quiet_config(14));
        match sim.trigger_scenario("security_breach") {
            ScenarioResult::Security(alert) => assert_eq!(alert.device_id, "network_monitor"),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(sim.get_security_status().total_alerts, 1);
        assert!(sim.get_active_alerts().is_empty());
    }

    #[test]
    fn test_clear_alert() {
        let (sim, _) = virtual_sim(quiet_config(15));
        let alert = match sim.trigger_scenario("pollution_spike") {
            ScenarioResult::Emergency(alert) => alert,
            other => panic!("unexpected {:?}", other),
        };
        assert!(sim.clear_alert(&alert.id).is_ok());
        assert!(sim.clear_alert(&alert.id).unwrap_err().is_not_found());
    }

    #[test]
    fn test_lookups_report_not_found() {
        let (sim, _) = virtual_sim(quiet_config(16));
        assert!(sim.get_device("cctv_cam_1").is_ok());
        assert!(sim.get_device("cctv_cam_999").unwrap_err().is_not_found());
        assert!(sim.get_edge_node("edge_node_1").is_ok());
        assert!(sim.get_edge_node("edge_node_9").unwrap_err().is_not_found());
        assert!(sim.department_view("nowhere").unwrap_err().is_not_found());
        assert_eq!(sim.get_devices_by_kind(DeviceKind::WasteBin).len(), 22);
    }

    #[test]
    fn test_device_tokens() {
        let (sim, _) = virtual_sim(quiet_config(17));
        let token = sim.issue_device_token("cctv_cam_1").unwrap();
        assert!(sim.authenticate_device("cctv_cam_1", &token));
        assert!(!sim.authenticate_device("cctv_cam_1", "forged"));
        assert!(sim.issue_device_token("ghost_1").is_err());
    }

    #[test]
    fn test_start_needs_runtime() {
        let (sim, _) = virtual_sim(quiet_config(18));
        assert!(matches!(sim.start(), Err(CityError::NoRuntime)));
        assert!(!sim.is_running());
    }

    #[tokio::test]
    async fn test_start_stop_idempotent() {
        let (sim, _) = virtual_sim(quiet_config(19));
        let mut rx = sim.subscribe();

        sim.start().unwrap();
        sim.start().unwrap();
        assert!(sim.is_running());
        assert!(sim.get_city_status().is_running);

        let first = rx.recv().await.unwrap();
        assert_eq!(first.payload.name(), "city_initialized");

        sim.stop();
        sim.stop();
        assert!(!sim.is_running());
        // stopped ticks are gated
        assert!(sim.inner.main_tick(true).is_none());
    }

    #[tokio::test]
    async fn test_deferred_tasks_pause_while_stopped() {
        let (sim, clock) = virtual_sim(quiet_config(20));
        sim.start().unwrap();
        let ScenarioResult::Emergency(alert) = sim.trigger(ScenarioKind::DeviceMalfunction) else {
            panic!("no device malfunctioned");
        };
        sim.stop();

        // due, but nothing polls the queue while stopped
        clock.advance_secs(721);
        tokio::task::yield_now().await;
        assert_eq!(sim.get_device(&alert.device_id).unwrap().status, DeviceStatus::Malfunction);

        assert!(sim.poll_deferred() >= 1);
        assert_eq!(sim.get_device(&alert.device_id).unwrap().status, DeviceStatus::Online);
    }

    #[tokio::test]
    async fn test_cancel_deferred_on_stop() {
        let mut config = quiet_config(21);
        config.simulation.cancel_deferred_on_stop = true;
        let (sim, clock) = virtual_sim(config);
        sim.start().unwrap();
        let ScenarioResult::Emergency(alert) = sim.trigger(ScenarioKind::DeviceMalfunction) else {
            panic!("no device malfunctioned");
        };
        sim.stop();

        clock.advance_secs(721);
        assert_eq!(sim.poll_deferred(), 0);
        assert_eq!(sim.get_device(&alert.device_id).unwrap().status, DeviceStatus::Malfunction);
    }
}
