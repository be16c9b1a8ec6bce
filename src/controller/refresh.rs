//! Refresh Scheduler
//!
//! Runs enumerate → invoke → parse → normalize on a fixed interval and
//! publishes the result as an immutable snapshot.
//!
//! ```text
//!            ┌──────────────────────────────┐
//!            ▼                              │ scan failed (nothing published yet)
//!   Idle ──▶ Refreshing ──▶ Published ──────┤
//!                 ▲             │           │ scan failed (previous snapshot kept)
//!                 └─────────────┘◀──────────┘
//! ```
//!
//! Readers go through [`SnapshotHandle`] and always see the last complete
//! snapshot; publishing swaps an `Arc` under a short write lock.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::stream::{self, StreamExt};
use parking_lot::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::domain::events::RefreshEvent;
use crate::domain::ports::EventPublisher;
use crate::error::Result;
use crate::hardware::{Device, DeviceEnumerator};
use crate::metrics::{normalize, MetricSample, PublishedSnapshot, Snapshot};
use crate::parser::{self, ParsedDevice};
use crate::smartctl::SmartctlInvoker;

// =============================================================================
// Configuration
// =============================================================================

/// Configuration for the refresh scheduler
#[derive(Debug, Clone)]
pub struct RefreshConfig {
    /// Pause between the end of one cycle and the start of the next
    pub interval: Duration,

    /// Devices queried in parallel within a cycle
    pub max_concurrent: usize,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            max_concurrent: 4,
        }
    }
}

impl RefreshConfig {
    /// A published snapshot older than this is reported as stale.
    pub fn stale_after(&self) -> Duration {
        self.interval * 2
    }
}

/// Scheduler lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshState {
    Idle,
    Refreshing,
    Published,
}

// =============================================================================
// Snapshot Handle
// =============================================================================

/// Cloneable read side of the published snapshot.
#[derive(Debug, Clone)]
pub struct SnapshotHandle {
    current: Arc<RwLock<Option<Arc<PublishedSnapshot>>>>,
    stale_after: Duration,
}

impl SnapshotHandle {
    pub fn new(stale_after: Duration) -> Self {
        Self {
            current: Arc::new(RwLock::new(None)),
            stale_after,
        }
    }

    /// The last published snapshot, if any.
    pub fn current(&self) -> Option<Arc<PublishedSnapshot>> {
        self.current.read().clone()
    }

    /// Whether at least one cycle has been published.
    pub fn is_ready(&self) -> bool {
        self.current.read().is_some()
    }

    pub fn age(&self) -> Option<Duration> {
        self.current.read().as_ref().map(|s| s.age())
    }

    /// True when a snapshot exists but is older than the staleness bound.
    pub fn is_stale(&self) -> bool {
        self.age().map_or(false, |age| age > self.stale_after)
    }

    fn publish(&self, snapshot: PublishedSnapshot) -> Arc<PublishedSnapshot> {
        let snapshot = Arc::new(snapshot);
        *self.current.write() = Some(snapshot.clone());
        snapshot
    }
}

// =============================================================================
// Scheduler
// =============================================================================

/// Drives refresh cycles and owns the published snapshot.
pub struct RefreshScheduler {
    config: RefreshConfig,
    enumerator: DeviceEnumerator,
    invoker: SmartctlInvoker,
    events: Arc<dyn EventPublisher>,
    snapshot: SnapshotHandle,
    state: RwLock<RefreshState>,
}

impl RefreshScheduler {
    /// Create a new scheduler
    pub fn new(config: RefreshConfig, invoker: SmartctlInvoker, events: Arc<dyn EventPublisher>) -> Self {
        let enumerator = DeviceEnumerator::new(invoker.clone(), events.clone());
        let snapshot = SnapshotHandle::new(config.stale_after());
        Self {
            config,
            enumerator,
            invoker,
            events,
            snapshot,
            state: RwLock::new(RefreshState::Idle),
        }
    }

    /// Read handle for the HTTP layer.
    pub fn handle(&self) -> SnapshotHandle {
        self.snapshot.clone()
    }

    pub fn state(&self) -> RefreshState {
        *self.state.read()
    }

    /// Run the scheduler until `cancel` fires.
    ///
    /// The first cycle starts immediately. The interval is measured from the
    /// end of a cycle, so slow invocations never stack up cycles. Cancelling
    /// mid-cycle drops in-flight invocations, which kills their processes.
    #[instrument(skip(self, cancel))]
    pub async fn run(self: Arc<Self>, cancel: CancellationToken) {
        info!("Starting refresh scheduler with {:?}", self.config);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                result = self.run_cycle() => {
                    if let Err(e) = result {
                        error!("Refresh cycle failed: {}", e);
                    }
                }
            }

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.config.interval) => {}
            }
        }

        info!("Refresh scheduler shutting down");
    }

    /// Run one full cycle and publish its snapshot.
    ///
    /// On a scan failure the previous snapshot stays published, a
    /// `ScanFailed` event is emitted and the error is returned.
    #[instrument(skip(self))]
    pub async fn run_cycle(&self) -> Result<Arc<PublishedSnapshot>> {
        let previous = std::mem::replace(&mut *self.state.write(), RefreshState::Refreshing);
        let started = Instant::now();

        let devices = match self.enumerator.enumerate().await {
            Ok(devices) => devices,
            Err(e) => {
                *self.state.write() = match previous {
                    RefreshState::Refreshing => RefreshState::Idle,
                    state => state,
                };
                self.emit(vec![RefreshEvent::scan_failed(e.to_string())]).await;
                return Err(e);
            }
        };

        // Owned devices keep the cycle future Send for tokio::spawn.
        let per_device: Vec<Vec<MetricSample>> = stream::iter(devices.iter().cloned())
            .map(|device| async move { self.process_device(&device).await })
            .buffered(self.config.max_concurrent.max(1))
            .collect()
            .await;

        let snapshot = Snapshot::new(per_device.into_iter().flatten().collect());
        let duration = started.elapsed();
        let samples = snapshot.len();

        let published = self
            .snapshot
            .publish(PublishedSnapshot::new(snapshot, devices.len(), duration));
        *self.state.write() = RefreshState::Published;

        self.emit(vec![RefreshEvent::snapshot_published(
            devices.len(),
            samples,
            duration,
        )])
        .await;

        Ok(published)
    }

    /// Invoke, parse and normalize one device. Failures only shrink this
    /// device's contribution.
    #[instrument(skip(self, device), fields(drive = %device.path))]
    async fn process_device(&self, device: &Device) -> Vec<MetricSample> {
        let result = self.invoker.invoke(device).await;
        let mut events = Vec::new();

        let parsed = match parser::parse(&result) {
            Ok(parsed) if parsed.has_device_data() => {
                if !parsed.errors.is_empty() {
                    warn!(exit_code = result.exit_code, errors = ?parsed.errors, "smartctl reported errors");
                }
                parsed
            }
            Ok(parsed) => {
                warn!(
                    exit_code = result.exit_code,
                    errors = ?parsed.errors,
                    "smartctl returned no data for the device"
                );
                events.push(RefreshEvent::invocation_failed(&device.path, result.exit_code));
                parsed
            }
            Err(e) => {
                warn!("{}", e);
                events.push(RefreshEvent::invocation_failed(&device.path, result.exit_code));
                ParsedDevice::unavailable(device.protocol)
            }
        };

        let normalized = normalize(device, &parsed, result.exit_code);

        events.extend(
            parsed
                .failures
                .iter()
                .chain(normalized.rejected.iter())
                .map(|f| RefreshEvent::attribute_rejected(&device.path, &f.field, &f.value)),
        );
        self.emit(events).await;

        debug!(samples = normalized.samples.len(), "Normalized device");
        normalized.samples
    }

    async fn emit(&self, events: Vec<RefreshEvent>) {
        if events.is_empty() {
            return;
        }
        if let Err(e) = self.events.publish_all(events).await {
            warn!("Failed to publish refresh events: {}", e);
        }
    }
}

impl std::fmt::Debug for RefreshScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshScheduler")
            .field("config", &self.config)
            .field("state", &self.state())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::InMemoryEventCollector;
    use crate::domain::ports::{CommandOutput, CommandRunner};
    use crate::error::Error;
    use crate::smartctl::{InvokerConfig, FAILED_EXIT_CODE};
    use assert_matches::assert_matches;
    use async_trait::async_trait;
    use parking_lot::Mutex;

    const SCAN: &str = r#"{"devices":[
        {"name":"/dev/sda","type":"sat","protocol":"ATA"},
        {"name":"/dev/sdb","type":"sat","protocol":"ATA"}
    ]}"#;

    const SDA_INFO: &str = r#"{
        "device": {"protocol": "ATA"},
        "model_name": "ST1000DM003",
        "serial_number": "Z1D5ABCD",
        "smart_status": {"passed": true},
        "ata_smart_attributes": {"table": [
            {"name": "Power_On_Hours", "value": 73, "raw": {"value": 24299, "string": "24299"}},
            {"name": "Unknown_Attribute", "value": "---", "raw": {"string": "n/a"}}
        ]}
    }"#;

    const SDZ_OPEN_FAILED: &str = r#"{"smartctl":{"exit_status":2,"messages":[
        {"string":"Smartctl open device: /dev/sdz failed: No such device","severity":"error"}
    ]}}"#;

    /// Scan answer is swappable; `/dev/sdb` never answers.
    struct FakeRunner {
        scan: Mutex<CommandOutput>,
    }

    #[async_trait]
    impl CommandRunner for FakeRunner {
        async fn run(&self, args: &[String], timeout: Duration) -> Result<CommandOutput> {
            if args.iter().any(|a| a == "--scan-open") {
                return Ok(self.scan.lock().clone());
            }
            match args.last().map(String::as_str) {
                Some("/dev/sda") => Ok(CommandOutput::new(0, SDA_INFO.as_bytes().to_vec())),
                Some("/dev/sdz") => Ok(CommandOutput::new(2, SDZ_OPEN_FAILED.as_bytes().to_vec())),
                _ => Err(Error::CommandTimeout {
                    command: args.join(" "),
                    timeout,
                }),
            }
        }
    }

    fn scheduler() -> (RefreshScheduler, Arc<FakeRunner>, Arc<InMemoryEventCollector>) {
        let runner = Arc::new(FakeRunner {
            scan: Mutex::new(CommandOutput::new(0, SCAN.as_bytes().to_vec())),
        });
        let events = Arc::new(InMemoryEventCollector::new());
        let invoker = SmartctlInvoker::new(InvokerConfig::default(), runner.clone());
        let scheduler = RefreshScheduler::new(RefreshConfig::default(), invoker, events.clone());
        (scheduler, runner, events)
    }

    #[tokio::test]
    async fn test_cycle_publishes_snapshot() {
        let (scheduler, _, events) = scheduler();
        let handle = scheduler.handle();
        assert!(!handle.is_ready());
        assert_eq!(scheduler.state(), RefreshState::Idle);

        let published = scheduler.run_cycle().await.unwrap();

        assert_eq!(scheduler.state(), RefreshState::Published);
        assert!(handle.is_ready());
        assert!(!handle.is_stale());
        assert_eq!(published.devices, 2);

        let names: Vec<&str> = published
            .snapshot
            .for_drive("/dev/sda")
            .map(|s| s.name.as_str())
            .collect();
        assert_eq!(
            names,
            vec![
                "smartprom_smart_passed",
                "smartprom_exit_code",
                "smartprom_power_on_hours",
                "smartprom_power_on_hours_raw",
            ]
        );
        assert_eq!(events.events_of_type("AttributeRejected").len(), 1);
        assert_eq!(events.events_of_type("SnapshotPublished").len(), 1);
    }

    #[tokio::test]
    async fn test_failed_device_keeps_meta_metrics() {
        let (scheduler, _, events) = scheduler();

        let published = scheduler.run_cycle().await.unwrap();
        let sdb: Vec<&MetricSample> = published.snapshot.for_drive("/dev/sdb").collect();

        assert_eq!(sdb.len(), 1);
        assert_eq!(sdb[0].name, "smartprom_exit_code");
        assert_eq!(sdb[0].value, FAILED_EXIT_CODE as f64);
        assert_matches!(
            events.events_of_type("InvocationFailed").as_slice(),
            [RefreshEvent::InvocationFailed { exit_code: -1, .. }]
        );
    }

    #[tokio::test]
    async fn test_error_envelope_raises_invocation_failed() {
        let (scheduler, runner, events) = scheduler();
        *runner.scan.lock() = CommandOutput::new(
            0,
            br#"{"devices":[{"name":"/dev/sdz","type":"auto"}]}"#.to_vec(),
        );

        let published = scheduler.run_cycle().await.unwrap();
        let sdz: Vec<&MetricSample> = published.snapshot.for_drive("/dev/sdz").collect();

        assert_eq!(sdz.len(), 1);
        assert_eq!(sdz[0].name, "smartprom_exit_code");
        assert_eq!(sdz[0].value, 2.0);
        assert_matches!(
            events.events_of_type("InvocationFailed").as_slice(),
            [RefreshEvent::InvocationFailed { exit_code: 2, .. }]
        );
    }

    #[tokio::test]
    async fn test_scan_failure_before_first_publish() {
        let (scheduler, runner, events) = scheduler();
        *runner.scan.lock() = CommandOutput::new(1, Vec::new());

        assert_matches!(scheduler.run_cycle().await, Err(Error::ScanFailed(_)));
        assert_eq!(scheduler.state(), RefreshState::Idle);
        assert!(scheduler.handle().current().is_none());
        assert_eq!(events.events_of_type("ScanFailed").len(), 1);
    }

    #[tokio::test]
    async fn test_scan_failure_keeps_previous_snapshot() {
        let (scheduler, runner, _) = scheduler();
        let first = scheduler.run_cycle().await.unwrap();

        *runner.scan.lock() = CommandOutput::new(2, Vec::new());
        assert!(scheduler.run_cycle().await.is_err());

        let current = scheduler.handle().current().unwrap();
        assert!(Arc::ptr_eq(&first, &current));
        assert_eq!(scheduler.state(), RefreshState::Published);
    }

    #[tokio::test]
    async fn test_empty_scan_publishes_empty_snapshot() {
        let (scheduler, runner, _) = scheduler();
        *runner.scan.lock() = CommandOutput::new(0, br#"{"devices":[]}"#.to_vec());

        let published = scheduler.run_cycle().await.unwrap();

        assert!(published.snapshot.is_empty());
        assert!(scheduler.handle().is_ready());
    }

    fn assert_send<T: Send>(_: &T) {}

    #[test]
    fn test_cycle_future_is_send() {
        let (scheduler, _, _) = scheduler();
        let scheduler = Arc::new(scheduler);

        let run = scheduler.clone().run(CancellationToken::new());
        assert_send(&run);
        assert_send(&scheduler.run_cycle());
    }

    #[tokio::test]
    async fn test_run_stops_on_cancel() {
        let (scheduler, _, _) = scheduler();
        let scheduler = Arc::new(scheduler);
        let handle = scheduler.handle();
        let cancel = CancellationToken::new();

        let task = tokio::spawn(scheduler.clone().run(cancel.clone()));
        while !handle.is_ready() {
            tokio::task::yield_now().await;
        }
        cancel.cancel();

        tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .unwrap()
            .unwrap();
    }

    #[test]
    fn test_stale_bound() {
        let config = RefreshConfig {
            interval: Duration::from_secs(30),
            max_concurrent: 1,
        };
        assert_eq!(config.stale_after(), Duration::from_secs(60));
        assert!(!SnapshotHandle::new(Duration::ZERO).is_stale());
    }
}
