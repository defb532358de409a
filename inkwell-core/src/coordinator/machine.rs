//! The refresh synchronization state machine

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use super::belief::{BeliefState, Observation, RefreshPlan, plan};
use super::config::{CoordinatorConfig, MIN_REFRESH_RATE};
use super::error::CoordinatorError;
use super::lease::CoordinatorLease;
use super::override_guard::RateOverride;
use super::state::{CoordinatorEvent, CycleReason, CycleReport, SyncState};
use crate::clock::{Clock, same_instant};
use crate::device::{DeviceClient, DeviceProfile, DeviceRecord};

/// The render-and-publish cycle the coordinator triggers
#[async_trait]
pub trait RefreshCycle: Send + Sync {
    /// Render and publish every active plugin. Never fails as a whole.
    async fn run_cycle(&self, reason: CycleReason) -> CycleReport;
}

/// Fetch the device and its model once at startup.
///
/// Any failure here is fatal: an unreachable device, a rate below the
/// floor, or unusable panel geometry.
pub async fn identify(
    client: &dyn DeviceClient,
    device_id: &str,
) -> Result<DeviceProfile, CoordinatorError> {
    let unreachable = |source| CoordinatorError::DeviceUnreachable {
        device: device_id.to_string(),
        source,
    };
    let device = client.get_device(device_id).await.map_err(unreachable)?;
    check_rate(&device)?;
    let model = client
        .get_model(&device.model_id)
        .await
        .map_err(unreachable)?;
    DeviceProfile::new(device, model).map_err(|e| CoordinatorError::InvalidGeometry(e.to_string()))
}

fn check_rate(device: &DeviceRecord) -> Result<Duration, CoordinatorError> {
    let rate = device.refresh_interval();
    if rate < MIN_REFRESH_RATE {
        return Err(CoordinatorError::rate_too_low(rate, MIN_REFRESH_RATE));
    }
    Ok(rate)
}

/// How long an in-flight render cycle may keep running after shutdown
pub const CYCLE_SHUTDOWN_GRACE: Duration = Duration::from_secs(30);

/// Tracks one device's refresh timing and triggers render cycles ahead of it
pub struct Coordinator {
    device_id: String,
    client: Arc<dyn DeviceClient>,
    cycle: Arc<dyn RefreshCycle>,
    clock: Arc<dyn Clock>,
    config: CoordinatorConfig,
    belief: BeliefState,
    state: SyncState,
    pending: Option<RefreshPlan>,
    owed_restore: Option<RateOverride>,
    events: broadcast::Sender<CoordinatorEvent>,
}

impl Coordinator {
    pub fn new(
        device_id: impl Into<String>,
        client: Arc<dyn DeviceClient>,
        cycle: Arc<dyn RefreshCycle>,
        clock: Arc<dyn Clock>,
        config: CoordinatorConfig,
    ) -> Result<Self, CoordinatorError> {
        config.validate()?;
        let (events, _) = broadcast::channel(64);
        Ok(Self {
            device_id: device_id.into(),
            client,
            cycle,
            clock,
            config,
            belief: BeliefState::unknown(),
            state: SyncState::Unsynced,
            pending: None,
            owed_restore: None,
            events,
        })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CoordinatorEvent> {
        self.events.subscribe()
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    pub fn belief(&self) -> &BeliefState {
        &self.belief
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    /// Take the device lease, then [`run_with_lease`](Self::run_with_lease)
    pub async fn run(&mut self, shutdown: CancellationToken) -> Result<(), CoordinatorError> {
        let lease = CoordinatorLease::acquire(&self.device_id, &self.config.lock_dir())?;
        self.run_with_lease(lease, shutdown).await
    }

    /// Run until `shutdown` is cancelled or a fatal error occurs.
    ///
    /// `lease` must be held for this coordinator's device and is released on
    /// return. A temporary rate override still owed is restored before this
    /// returns, whatever the exit path.
    pub async fn run_with_lease(
        &mut self,
        lease: CoordinatorLease,
        shutdown: CancellationToken,
    ) -> Result<(), CoordinatorError> {
        if lease.device_id() != self.device_id {
            return Err(CoordinatorError::InvalidConfig(format!(
                "lease is for device {}, not {}",
                lease.device_id(),
                self.device_id
            )));
        }
        info!(device = %self.device_id, "Coordinator started");

        let result = self.drive(&shutdown).await;

        if let Some(mut guard) = self.owed_restore.take() {
            let original = guard.original_secs();
            if guard.restore().await.is_ok() {
                self.emit(CoordinatorEvent::RateRestored {
                    original_secs: original,
                });
            }
        }

        info!(device = %self.device_id, "Coordinator stopped");
        drop(lease);
        result
    }

    async fn drive(&mut self, shutdown: &CancellationToken) -> Result<(), CoordinatorError> {
        loop {
            let next = match self.state {
                SyncState::Unsynced => self.start_up(shutdown).await?,
                SyncState::WaitingForRefresh => self.recover(shutdown).await?,
                SyncState::SteadyState => self.await_trigger(shutdown).await,
                SyncState::Refreshing => self.refresh(shutdown).await?,
                SyncState::Disconnected => self.handle_missed(shutdown).await,
            };
            match next {
                Some(state) => self.transition(state),
                None => return Ok(()),
            }
        }
    }

    /// Capture the device's current rate and timestamp, then render once
    async fn start_up(
        &mut self,
        shutdown: &CancellationToken,
    ) -> Result<Option<SyncState>, CoordinatorError> {
        let Some(device) = self.poll(shutdown).await else {
            return Ok(None);
        };
        self.belief.interval = check_rate(&device)?;
        self.belief.observe(device.updated_at);
        debug!(device = %self.device_id, last_refresh = %device.updated_at, rate = device.refresh_rate, "Initial device status");

        if !self.trigger(CycleReason::Initial, None, shutdown).await {
            return Ok(None);
        }
        Ok(Some(SyncState::WaitingForRefresh))
    }

    /// Poll until the refresh timestamp changes, optionally with a shortened
    /// device rate. Only an observed change re-enables prediction.
    async fn recover(
        &mut self,
        shutdown: &CancellationToken,
    ) -> Result<Option<SyncState>, CoordinatorError> {
        let Some(device) = self.poll(shutdown).await else {
            return Ok(None);
        };
        let rate = check_rate(&device)?;

        if let Some(last) = self.belief.last_observed_refresh
            && !same_instant(last, device.updated_at)
        {
            self.belief.observe(device.updated_at);
            return Ok(Some(self.synced(device.updated_at, rate)));
        }
        self.belief.observe(device.updated_at);
        let baseline = device.updated_at;

        let guard = if self.config.override_rate
            && self.owed_restore.is_none()
            && rate > self.config.recovery_rate
        {
            match RateOverride::apply(
                self.client.clone(),
                &self.device_id,
                device.refresh_rate,
                self.config.recovery_rate.as_secs(),
            )
            .await
            {
                Ok(guard) => {
                    self.emit(CoordinatorEvent::RateOverridden {
                        original_secs: guard.original_secs(),
                        temporary_secs: guard.temporary_secs(),
                    });
                    Some(guard)
                }
                Err(e) => {
                    warn!(device = %self.device_id, error = %e, "Could not shorten refresh rate, waiting at device rate");
                    None
                }
            }
        } else {
            None
        };

        info!(device = %self.device_id, baseline = %baseline, "Waiting for device refresh");
        self.belief.expecting_refresh_next_poll = true;
        let observed = self.wait_for_change(baseline, shutdown).await;

        let interval = match guard {
            Some(mut guard) => {
                let original = guard.original_secs();
                if guard.restore().await.is_ok() {
                    self.emit(CoordinatorEvent::RateRestored {
                        original_secs: original,
                    });
                } else {
                    self.owed_restore = Some(guard);
                }
                self.config.recovery_rate
            }
            None => rate,
        };

        let Some(observed) = observed else {
            return Ok(None);
        };
        self.belief.observe(observed);
        Ok(Some(self.synced(observed, interval)))
    }

    fn synced(&mut self, observed: DateTime<Utc>, interval: Duration) -> SyncState {
        info!(device = %self.device_id, observed = %observed, interval_secs = interval.as_secs(), "Device refresh observed, synchronized");
        self.belief = BeliefState::synced(observed, interval);
        self.emit(CoordinatorEvent::Recovered { observed });
        SyncState::SteadyState
    }

    /// Sleep until the trigger instant of the next predicted refresh
    async fn await_trigger(&mut self, shutdown: &CancellationToken) -> Option<SyncState> {
        let Some(plan) = plan(&self.belief, &self.config, self.clock.now()) else {
            return Some(SyncState::WaitingForRefresh);
        };

        if plan.imminent {
            debug!(device = %self.device_id, predicted = %plan.predicted, "Refresh imminent, triggering now");
        } else {
            debug!(device = %self.device_id, predicted = %plan.predicted, trigger_at = %plan.trigger_at, "Sleeping until trigger");
            if !self.sleep_until(plan.trigger_at, shutdown).await {
                return None;
            }
        }

        self.pending = Some(plan);
        Some(SyncState::Refreshing)
    }

    /// Render, then verify the predicted refresh actually happened
    async fn refresh(
        &mut self,
        shutdown: &CancellationToken,
    ) -> Result<Option<SyncState>, CoordinatorError> {
        let Some(plan) = self.pending.take() else {
            return Ok(Some(SyncState::SteadyState));
        };

        if !self
            .trigger(CycleReason::Scheduled, Some(plan.predicted), shutdown)
            .await
        {
            return Ok(None);
        }
        if !self.sleep_until(plan.verify_at, shutdown).await {
            return Ok(None);
        }

        self.belief.expecting_refresh_next_poll = true;
        let Some(device) = self.poll(shutdown).await else {
            return Ok(None);
        };
        let last_observed = self.belief.last_observed_refresh;

        match self.belief.observe(device.updated_at) {
            Observation::Advanced { at } => {
                let rate = check_rate(&device)?;
                self.belief.interval = rate;
                let next_predicted = super::belief::later(at, rate);
                info!(device = %self.device_id, observed = %at, next = %next_predicted, "Refresh confirmed");
                self.emit(CoordinatorEvent::RefreshConfirmed {
                    observed: at,
                    next_predicted,
                });
                Ok(Some(SyncState::SteadyState))
            }
            Observation::Unchanged => {
                let last_observed = last_observed.unwrap_or(device.updated_at);
                warn!(device = %self.device_id, expected = %plan.predicted, last = %last_observed, "Expected refresh did not happen");
                self.emit(CoordinatorEvent::RefreshMissed {
                    expected: plan.predicted,
                    last_observed,
                });
                Ok(Some(SyncState::Disconnected))
            }
        }
    }

    /// Re-render defensively, then fall back to recovery
    async fn handle_missed(&mut self, shutdown: &CancellationToken) -> Option<SyncState> {
        self.belief.desync();
        if !self.trigger(CycleReason::Defensive, None, shutdown).await {
            return None;
        }
        Some(SyncState::WaitingForRefresh)
    }

    /// Run a render cycle; `false` if shutdown interrupted it.
    ///
    /// A cycle already running when shutdown fires is given
    /// [`CYCLE_SHUTDOWN_GRACE`] to finish so publishing is not cut short.
    async fn trigger(
        &self,
        reason: CycleReason,
        predicted: Option<DateTime<Utc>>,
        shutdown: &CancellationToken,
    ) -> bool {
        if shutdown.is_cancelled() {
            return false;
        }
        info!(device = %self.device_id, %reason, "Render cycle triggered");
        self.emit(CoordinatorEvent::RenderTriggered {
            at: self.clock.now(),
            reason,
            predicted,
        });

        let cycle = self.cycle.run_cycle(reason);
        tokio::pin!(cycle);
        let (report, interrupted) = tokio::select! {
            biased;
            report = &mut cycle => (report, false),
            _ = shutdown.cancelled() => {
                info!(device = %self.device_id, %reason, "Shutdown requested, finishing render cycle");
                match tokio::time::timeout(CYCLE_SHUTDOWN_GRACE, &mut cycle).await {
                    Ok(report) => (report, true),
                    Err(_) => {
                        error!(device = %self.device_id, %reason, "Render cycle did not finish before shutdown, abandoning it");
                        return false;
                    }
                }
            }
        };

        if report.fallbacks > 0 || report.publish_failures > 0 {
            warn!(
                device = %self.device_id,
                %reason,
                published = report.published,
                fallbacks = report.fallbacks,
                publish_failures = report.publish_failures,
                "Render cycle completed with failures"
            );
        } else {
            info!(device = %self.device_id, %reason, published = report.published, "Render cycle completed");
        }
        self.emit(CoordinatorEvent::CycleCompleted { reason, report });
        !interrupted
    }

    /// Poll device status, retrying failures every tick; `None` on shutdown
    async fn poll(&mut self, shutdown: &CancellationToken) -> Option<DeviceRecord> {
        loop {
            self.settle_restore().await;
            let result = tokio::select! {
                biased;
                _ = shutdown.cancelled() => return None,
                result = self.client.get_device(&self.device_id) => result,
            };
            match result {
                Ok(device) => return Some(device),
                Err(e) => {
                    warn!(device = %self.device_id, error = %e, "Device status poll failed, retrying");
                    if !self.sleep(self.config.poll_interval, shutdown).await {
                        return None;
                    }
                }
            }
        }
    }

    async fn wait_for_change(
        &mut self,
        baseline: DateTime<Utc>,
        shutdown: &CancellationToken,
    ) -> Option<DateTime<Utc>> {
        loop {
            if !self.sleep(self.config.poll_interval, shutdown).await {
                return None;
            }
            self.settle_restore().await;
            let result = tokio::select! {
                biased;
                _ = shutdown.cancelled() => return None,
                result = self.client.get_device(&self.device_id) => result,
            };
            match result {
                Ok(device) if !same_instant(device.updated_at, baseline) => {
                    return Some(device.updated_at);
                }
                Ok(_) => trace!(device = %self.device_id, "No refresh yet"),
                Err(e) => warn!(device = %self.device_id, error = %e, "Device status poll failed"),
            }
        }
    }

    /// One attempt at a rate restore that failed earlier
    async fn settle_restore(&mut self) {
        let Some(guard) = self.owed_restore.as_mut() else {
            return;
        };
        match guard.try_restore().await {
            Ok(()) => {
                let original = guard.original_secs();
                self.owed_restore = None;
                self.emit(CoordinatorEvent::RateRestored {
                    original_secs: original,
                });
            }
            Err(e) => warn!(device = %self.device_id, error = %e, "Refresh rate still not restored"),
        }
    }

    async fn sleep_until(&self, deadline: DateTime<Utc>, shutdown: &CancellationToken) -> bool {
        self.sleep(self.clock.until(deadline), shutdown).await
    }

    /// Cancellable sleep; `false` if shutdown fired first
    async fn sleep(&self, duration: Duration, shutdown: &CancellationToken) -> bool {
        tokio::select! {
            biased;
            _ = shutdown.cancelled() => false,
            _ = tokio::time::sleep(duration) => true,
        }
    }

    fn transition(&mut self, to: SyncState) {
        let from = self.state;
        if from == to {
            return;
        }
        debug!(device = %self.device_id, %from, %to, "Coordinator state change");
        self.state = to;
        self.emit(CoordinatorEvent::StateChanged { from, to });
    }

    fn emit(&self, event: CoordinatorEvent) {
        let _ = self.events.send(event);
    }
}
