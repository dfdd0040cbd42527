//! Periodic token refresh.
//!
//! Each adapter owns one [`RefreshJob`]. While running, the job wakes once
//! per interval, lists every credential record, and refreshes the tokens of
//! each user connected to its provider, one user at a time. The first pass
//! happens one full interval after start.
//!
//! Passes never overlap: a single task runs them back to back and a pass
//! that overruns pushes the next tick out instead of stacking it. A stop
//! takes effect between users, so a refresh already talking to the provider
//! always finishes storing its result.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use calconnect_core::parse_interval;

use crate::error::{CalendarError, CalendarResult};
use crate::provider::{BoxFuture, ProviderKind};
use crate::store::CredentialStore;
use crate::tokens::RefreshOutcome;

/// Parses a refresh job interval. Zero is rejected: the job could never tick.
pub fn job_interval(interval: &str) -> CalendarResult<Duration> {
    let parsed = parse_interval(interval)?;
    if parsed.is_zero() {
        return Err(CalendarError::invalid_interval(format!(
            "refresh interval must be greater than zero: {interval:?}"
        )));
    }
    Ok(parsed)
}

/// Refreshes one user's tokens. Called once per connected user per pass.
pub type RefreshFn =
    Arc<dyn Fn(String) -> BoxFuture<'static, CalendarResult<RefreshOutcome>> + Send + Sync>;

/// Tally of one refresh pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub refreshed: usize,
    pub still_valid: usize,
    /// Records with no tokens for this provider.
    pub skipped: usize,
    pub failed: usize,
    /// Set when the store could not be listed; the pass did nothing else.
    pub store_error: Option<String>,
}

impl CycleReport {
    fn begin() -> Self {
        let now = Utc::now();
        Self {
            started_at: now,
            finished_at: now,
            refreshed: 0,
            still_valid: 0,
            skipped: 0,
            failed: 0,
            store_error: None,
        }
    }

    pub fn attempted(&self) -> usize {
        self.refreshed + self.still_valid + self.failed
    }
}

/// Observable job state.
#[derive(Debug, Clone, Default)]
pub struct JobState {
    pub cycles_completed: u64,
    pub last_cycle: Option<CycleReport>,
}

struct RunningJob {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Stopped/running lifecycle around the periodic refresh task.
pub struct RefreshJob {
    provider: ProviderKind,
    interval: Duration,
    state: Arc<RwLock<JobState>>,
    running: Mutex<Option<RunningJob>>,
}

impl RefreshJob {
    pub fn new(provider: ProviderKind, interval: Duration) -> Self {
        Self {
            provider,
            interval,
            state: Arc::new(RwLock::new(JobState::default())),
            running: Mutex::new(None),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Spawns the periodic task on the current tokio runtime.
    ///
    /// Returns `Ok(false)` when the job was already running.
    pub fn start(&self, store: Arc<dyn CredentialStore>, refresh: RefreshFn) -> CalendarResult<bool> {
        let mut running = self.running.lock().unwrap_or_else(PoisonError::into_inner);
        if running.as_ref().is_some_and(|job| !job.handle.is_finished()) {
            debug!(provider = %self.provider, "refresh job already running");
            return Ok(false);
        }
        if self.interval.is_zero() {
            return Err(CalendarError::invalid_interval(
                "refresh interval must be greater than zero",
            ));
        }

        let runtime = tokio::runtime::Handle::try_current().map_err(|e| {
            CalendarError::internal("refresh job needs a running tokio runtime").with_source(e)
        })?;

        let cancel = CancellationToken::new();
        let handle = runtime.spawn(run_loop(
            self.provider,
            self.interval,
            store,
            refresh,
            Arc::clone(&self.state),
            cancel.clone(),
        ));

        info!(
            provider = %self.provider,
            interval_secs = self.interval.as_secs(),
            "refresh job started"
        );
        *running = Some(RunningJob { cancel, handle });
        Ok(true)
    }

    /// Cancels the task. Returns `false` when nothing was running.
    pub fn stop(&self) -> bool {
        let job = self
            .running
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        match job {
            Some(job) => {
                job.cancel.cancel();
                info!(provider = %self.provider, "refresh job stopped");
                true
            }
            None => false,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|job| !job.cancel.is_cancelled() && !job.handle.is_finished())
    }

    pub async fn state(&self) -> JobState {
        self.state.read().await.clone()
    }
}

impl Drop for RefreshJob {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for RefreshJob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshJob")
            .field("provider", &self.provider)
            .field("interval", &self.interval)
            .field("running", &self.is_running())
            .finish()
    }
}

async fn run_loop(
    provider: ProviderKind,
    interval: Duration,
    store: Arc<dyn CredentialStore>,
    refresh: RefreshFn,
    state: Arc<RwLock<JobState>>,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        match cycle(provider, store.as_ref(), &refresh, &cancel).await {
            Some(report) => {
                let mut state = state.write().await;
                state.cycles_completed += 1;
                state.last_cycle = Some(report);
            }
            None => {
                debug!(%provider, "refresh pass interrupted by stop");
                break;
            }
        }
    }

    debug!(%provider, "refresh loop exited");
}

/// Runs one refresh pass over every stored record.
///
/// Per-user failures are logged and counted; they never abort the pass.
pub async fn run_cycle(
    provider: ProviderKind,
    store: &dyn CredentialStore,
    refresh: &RefreshFn,
) -> CycleReport {
    cycle(provider, store, refresh, &CancellationToken::new())
        .await
        .unwrap_or_else(CycleReport::begin)
}

/// One pass; `None` when `cancel` fired before every user was visited.
async fn cycle(
    provider: ProviderKind,
    store: &dyn CredentialStore,
    refresh: &RefreshFn,
    cancel: &CancellationToken,
) -> Option<CycleReport> {
    let mut report = CycleReport::begin();

    let records = match store.list().await {
        Ok(records) => records,
        Err(e) => {
            error!(%provider, error = %e, "failed to list credential records");
            report.store_error = Some(e.to_string());
            report.finished_at = Utc::now();
            return Some(report);
        }
    };

    for record in records {
        if cancel.is_cancelled() {
            return None;
        }
        if record.tokens(provider).is_none() {
            report.skipped += 1;
            continue;
        }

        match refresh(record.user_id.clone()).await {
            Ok(RefreshOutcome::Refreshed) => report.refreshed += 1,
            Ok(RefreshOutcome::StillValid) => report.still_valid += 1,
            Err(e) => {
                warn!(%provider, user_id = %record.user_id, error = %e, "token refresh failed");
                report.failed += 1;
            }
        }
    }

    report.finished_at = Utc::now();
    info!(
        %provider,
        refreshed = report.refreshed,
        still_valid = report.still_valid,
        skipped = report.skipped,
        failed = report.failed,
        "refresh pass finished"
    );
    Some(report)
}
