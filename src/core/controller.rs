//! Refresh state machine.
//!
//! `Uninitialized -> Refreshing -> {Ready, Degraded}`, and both settled
//! states can go back to `Refreshing`. Timer ticks, manual refreshes and
//! on-demand snapshot requests all go through [`RefreshController::refresh`],
//! which joins an in-flight cycle instead of starting a second one.
//!
//! Each cycle runs on its own task. Callers that stop waiting do not cancel
//! it; dropping the controller does.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::{BoxFuture, FutureExt, Shared};
use thiserror::Error;
use tokio::sync::broadcast;
use tokio::task::{AbortHandle, JoinError, JoinHandle};
use tokio::time::MissedTickBehavior;

use crate::core::credits::{aggregate_active_sum, aggregate_total_sum};
use crate::core::error::ApiError;
use crate::core::formatter::{format_currency, format_detail_line};
use crate::core::models::display::DisplayUpdate;
use crate::core::models::subscription::Subscription;
use crate::core::repository::SubscriptionSource;

pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(60);

/// Totals closer than this count as unchanged.
const CHANGE_EPSILON: f64 = 1e-6;
const UPDATE_CHANNEL_CAPACITY: usize = 16;

/// Supplies the API key on every cycle; `None` means not configured.
pub type CredentialSupplier = Arc<dyn Fn() -> Option<String> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Uninitialized,
    Refreshing,
    Ready,
    Degraded,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RefreshError {
    #[error("API key is not configured")]
    Unconfigured,
    #[error("{0}")]
    Failed(String),
}

/// Active subscriptions and the figures derived from them, produced by one
/// successful poll.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateSnapshot {
    pub subscriptions: Vec<Subscription>,
    /// Balance plus remaining refills across all active subscriptions
    pub total: f64,
    /// Balance only
    pub active_sum: f64,
    pub fetched_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct CycleOutcome {
    update: DisplayUpdate,
    result: Result<Arc<AggregateSnapshot>, RefreshError>,
}

type SharedCycle = Shared<BoxFuture<'static, CycleOutcome>>;

struct InFlight {
    cycle: SharedCycle,
    task: AbortHandle,
}

struct State {
    phase: Phase,
    snapshot: Option<Arc<AggregateSnapshot>>,
    /// Total from the previous successful poll, for change detection
    baseline: Option<f64>,
    last_update: Option<DisplayUpdate>,
    in_flight: Option<InFlight>,
}

struct Inner {
    source: Arc<dyn SubscriptionSource>,
    credentials: CredentialSupplier,
    state: Mutex<State>,
    updates: broadcast::Sender<DisplayUpdate>,
}

pub struct RefreshController {
    inner: Arc<Inner>,
    interval: Duration,
    timer: Mutex<Option<JoinHandle<()>>>,
}

impl RefreshController {
    pub fn new(
        source: Arc<dyn SubscriptionSource>,
        credentials: CredentialSupplier,
        interval: Duration,
    ) -> Self {
        let (updates, _) = broadcast::channel(UPDATE_CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                source,
                credentials,
                state: Mutex::new(State {
                    phase: Phase::Uninitialized,
                    snapshot: None,
                    baseline: None,
                    last_update: None,
                    in_flight: None,
                }),
                updates,
            }),
            interval,
            timer: Mutex::new(None),
        }
    }

    /// Run a poll cycle, or wait for the one already running, and return
    /// the resulting display update.
    pub async fn refresh(&self) -> DisplayUpdate {
        self.inner.refresh().await.update
    }

    /// The cached snapshot when `Ready`; otherwise waits for a fresh cycle.
    pub async fn ensure_snapshot(&self) -> Result<Arc<AggregateSnapshot>, RefreshError> {
        {
            let state = self.inner.lock();
            if state.phase == Phase::Ready {
                if let Some(snapshot) = &state.snapshot {
                    return Ok(Arc::clone(snapshot));
                }
            }
        }
        self.inner.refresh().await.result
    }

    /// Reset one subscription's credits.
    ///
    /// Errors go back to the caller only; the polling state is left alone.
    /// On success the current snapshot is stale, so a new cycle runs (after
    /// any cycle that was already in flight) before returning.
    pub async fn reset_credits(&self, subscription_id: &str) -> Result<String, ApiError> {
        let api_key = (self.inner.credentials)().unwrap_or_default();
        let message = self
            .inner
            .source
            .reset_credits(&api_key, subscription_id)
            .await?;
        tracing::debug!(subscription_id, "credits reset, refreshing");

        let pending = self.inner.lock().in_flight.as_ref().map(|f| f.cycle.clone());
        if let Some(cycle) = pending {
            cycle.await;
        }
        self.inner.refresh().await;
        Ok(message)
    }

    /// Start the interval timer. The first tick fires immediately.
    /// Calling this while the timer is running does nothing.
    pub fn start(&self) {
        let mut timer = self.timer.lock().unwrap_or_else(PoisonError::into_inner);
        if timer.as_ref().is_some_and(|handle| !handle.is_finished()) {
            return;
        }

        let inner = Arc::clone(&self.inner);
        let period = self.interval.max(Duration::from_millis(1));
        tracing::debug!(interval_ms = period.as_millis() as u64, "starting refresh timer");
        *timer = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                inner.refresh().await;
            }
        }));
    }

    /// Cancel the interval timer. Manual refreshes keep working.
    pub fn stop(&self) {
        let handle = self
            .timer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            tracing::debug!("stopping refresh timer");
            handle.abort();
        }
    }

    pub fn is_running(&self) -> bool {
        self.timer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Receive every display update emitted from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<DisplayUpdate> {
        self.inner.updates.subscribe()
    }

    pub fn phase(&self) -> Phase {
        self.inner.lock().phase
    }

    pub fn last_update(&self) -> Option<DisplayUpdate> {
        self.inner.lock().last_update.clone()
    }

    /// Most recent successful snapshot, even while degraded.
    pub fn last_snapshot(&self) -> Option<Arc<AggregateSnapshot>> {
        self.inner.lock().snapshot.clone()
    }
}

impl Drop for RefreshController {
    fn drop(&mut self) {
        self.stop();
        if let Some(in_flight) = self.inner.lock().in_flight.take() {
            tracing::debug!("aborting in-flight refresh");
            in_flight.task.abort();
        }
    }
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn refresh(self: &Arc<Self>) -> CycleOutcome {
        let cycle = {
            let mut state = self.lock();
            match &state.in_flight {
                Some(in_flight) => {
                    tracing::debug!("joining in-flight refresh");
                    in_flight.cycle.clone()
                }
                None => {
                    // The task finishes by taking this lock, so it cannot
                    // clear `in_flight` before it is set below.
                    let task = tokio::spawn(Arc::clone(self).run_cycle());
                    let abort = task.abort_handle();
                    let weak = Arc::downgrade(self);
                    let cycle = async move {
                        match task.await {
                            Ok(outcome) => outcome,
                            Err(err) => Inner::abandoned(&weak, err),
                        }
                    }
                    .boxed()
                    .shared();
                    state.in_flight = Some(InFlight {
                        cycle: cycle.clone(),
                        task: abort,
                    });
                    state.phase = Phase::Refreshing;
                    cycle
                }
            }
        };
        cycle.await
    }

    async fn run_cycle(self: Arc<Self>) -> CycleOutcome {
        let polled = self.poll().await;

        // Snapshot, phase and update change together under one lock.
        let mut state = self.lock();
        state.in_flight = None;
        let outcome = match polled {
            Ok(subscriptions) => {
                let total = aggregate_total_sum(&subscriptions);
                let changed = state
                    .baseline
                    .is_some_and(|previous| (previous - total).abs() > CHANGE_EPSILON);
                state.baseline = Some(total);

                let update = DisplayUpdate::Ready {
                    sum_text: format_currency(total),
                    detail_lines: subscriptions.iter().map(format_detail_line).collect(),
                    changed,
                };
                let snapshot = Arc::new(AggregateSnapshot {
                    active_sum: aggregate_active_sum(&subscriptions),
                    subscriptions,
                    total,
                    fetched_at: Utc::now(),
                });
                state.phase = Phase::Ready;
                state.snapshot = Some(Arc::clone(&snapshot));
                tracing::debug!(total, changed, "refresh succeeded");

                CycleOutcome {
                    update,
                    result: Ok(snapshot),
                }
            }
            Err(err) => {
                state.baseline = None;
                state.phase = Phase::Degraded;
                let update = match &err {
                    RefreshError::Unconfigured => DisplayUpdate::Unconfigured,
                    RefreshError::Failed(reason) => DisplayUpdate::Degraded {
                        reason_text: reason.clone(),
                    },
                };
                CycleOutcome {
                    update,
                    result: Err(err),
                }
            }
        };
        state.last_update = Some(outcome.update.clone());
        drop(state);

        // No subscribers is fine.
        let _ = self.updates.send(outcome.update.clone());
        outcome
    }

    /// Settle the state after a cycle task panicked or was aborted.
    fn abandoned(weak: &Weak<Inner>, err: JoinError) -> CycleOutcome {
        let reason = if err.is_cancelled() {
            "refresh cancelled"
        } else {
            "refresh task panicked"
        };
        tracing::warn!(reason, "refresh cycle did not finish");
        let update = DisplayUpdate::Degraded {
            reason_text: reason.to_string(),
        };
        if let Some(inner) = weak.upgrade() {
            let mut state = inner.lock();
            state.in_flight = None;
            state.baseline = None;
            state.phase = Phase::Degraded;
            state.last_update = Some(update.clone());
        }
        CycleOutcome {
            update,
            result: Err(RefreshError::Failed(reason.to_string())),
        }
    }

    async fn poll(&self) -> Result<Vec<Subscription>, RefreshError> {
        let api_key = match (self.credentials)() {
            Some(key) if !key.trim().is_empty() => key,
            _ => {
                tracing::debug!("no API key configured");
                return Err(RefreshError::Unconfigured);
            }
        };

        match self.source.fetch_active(&api_key).await {
            Ok(subscriptions) => Ok(subscriptions),
            Err(ApiError::MissingCredential) => Err(RefreshError::Unconfigured),
            Err(e) => {
                tracing::warn!(error = %e, "refresh failed");
                Err(RefreshError::Failed(e.to_string()))
            }
        }
    }
}
