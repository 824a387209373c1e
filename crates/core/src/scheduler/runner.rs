//! Scheduler implementation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{broadcast, Mutex, OwnedMutexGuard, RwLock};
use tracing::{debug, info, warn};

use super::types::{SchedulerError, SchedulerStatus};
use crate::config::ScheduleConfig;
use crate::pipeline::{PipelineOrchestrator, RunReport};

/// Whether a run is due: never ran, or at least `frequency` has passed.
pub fn is_due(
    last_started: Option<DateTime<Utc>>,
    frequency: Duration,
    now: DateTime<Utc>,
) -> bool {
    match last_started {
        None => true,
        Some(last) => (now - last)
            .to_std()
            .map(|elapsed| elapsed >= frequency)
            .unwrap_or(false),
    }
}

#[derive(Default)]
struct RunState {
    /// Reference point for the next due check.
    anchor: Option<DateTime<Utc>>,
    last_run_started: Option<DateTime<Utc>>,
    runs_completed: u64,
    last_report: Option<RunReport>,
}

/// What a run needs, cloneable into the polling task.
#[derive(Clone)]
struct RunContext {
    orchestrator: Arc<PipelineOrchestrator>,
    run_lock: Arc<Mutex<()>>,
    state: Arc<RwLock<RunState>>,
}

impl RunContext {
    fn try_acquire(&self) -> Result<OwnedMutexGuard<()>, SchedulerError> {
        Arc::clone(&self.run_lock)
            .try_lock_owned()
            .map_err(|_| SchedulerError::AlreadyRunning)
    }

    /// Execute one full run while holding the run lock.
    async fn execute(&self, _guard: OwnedMutexGuard<()>) -> RunReport {
        {
            let now = Utc::now();
            let mut state = self.state.write().await;
            state.anchor = Some(now);
            state.last_run_started = Some(now);
        }

        let report = self.orchestrator.run_all().await;

        let mut state = self.state.write().await;
        state.runs_completed += 1;
        state.last_report = Some(report.clone());
        report
    }
}

/// Drives [`PipelineOrchestrator::run_all`] on a fixed interval.
pub struct Scheduler {
    ctx: RunContext,
    frequency: Duration,
    poll_interval: Duration,
    run_on_start: bool,

    // Runtime state
    running: Arc<AtomicBool>,
    trigger: Arc<AtomicBool>,
    shutdown_tx: broadcast::Sender<()>,
}

impl Scheduler {
    /// Create a new scheduler.
    pub fn new(orchestrator: Arc<PipelineOrchestrator>, config: &ScheduleConfig) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            ctx: RunContext {
                orchestrator,
                run_lock: Arc::new(Mutex::new(())),
                state: Arc::new(RwLock::new(RunState::default())),
            },
            frequency: Duration::from_secs(config.frequency_hours as u64 * 3600),
            poll_interval: Duration::from_secs(config.poll_interval_secs),
            run_on_start: config.run_on_start,
            running: Arc::new(AtomicBool::new(false)),
            trigger: Arc::new(AtomicBool::new(false)),
            shutdown_tx,
        }
    }

    /// Override the run interval and the due-check poll.
    pub fn with_intervals(mut self, frequency: Duration, poll_interval: Duration) -> Self {
        self.frequency = frequency;
        self.poll_interval = poll_interval;
        self
    }

    pub fn orchestrator(&self) -> &Arc<PipelineOrchestrator> {
        &self.ctx.orchestrator
    }

    /// Start the polling loop (spawns a background task).
    pub async fn start(&self) {
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("Scheduler already running");
            return;
        }

        info!(
            frequency_secs = self.frequency.as_secs(),
            poll_secs = self.poll_interval.as_secs(),
            run_on_start = self.run_on_start,
            "Starting scheduler"
        );

        if !self.run_on_start {
            let mut state = self.ctx.state.write().await;
            state.anchor.get_or_insert_with(Utc::now);
        }

        self.spawn_poll_loop();
    }

    fn spawn_poll_loop(&self) {
        let ctx = self.ctx.clone();
        let running = Arc::clone(&self.running);
        let trigger = Arc::clone(&self.trigger);
        let frequency = self.frequency;
        let poll_interval = self.poll_interval;
        let run_on_start = self.run_on_start;
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            info!("Scheduler loop started");

            if run_on_start {
                match ctx.try_acquire() {
                    Ok(guard) => {
                        ctx.execute(guard).await;
                    }
                    Err(_) => debug!("Run already in progress at start"),
                }
            }

            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        info!("Scheduler loop received shutdown signal");
                        break;
                    }
                    _ = tokio::time::sleep(poll_interval) => {
                        if !running.load(Ordering::Relaxed) {
                            break;
                        }

                        let requested = trigger.swap(false, Ordering::SeqCst);
                        let anchor = ctx.state.read().await.anchor;
                        if !requested && !is_due(anchor, frequency, Utc::now()) {
                            continue;
                        }

                        match ctx.try_acquire() {
                            Ok(guard) => {
                                ctx.execute(guard).await;
                            }
                            Err(_) => {
                                debug!("Run already in progress, skipping tick");
                                if requested {
                                    trigger.store(true, Ordering::SeqCst);
                                }
                            }
                        }
                    }
                }
            }
            info!("Scheduler loop stopped");
        });
    }

    /// Stop the polling loop. A run already executing finishes on its own.
    pub async fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            warn!("Scheduler not running");
            return;
        }

        info!("Stopping scheduler");
        let _ = self.shutdown_tx.send(());
    }

    /// Ask the polling loop to run at its next tick.
    pub fn trigger(&self) {
        self.trigger.store(true, Ordering::SeqCst);
    }

    /// Run immediately and wait for the report.
    pub async fn run_now(&self) -> Result<RunReport, SchedulerError> {
        let guard = self.ctx.try_acquire()?;
        Ok(self.ctx.execute(guard).await)
    }

    /// Start a run in the background, returning once it has been claimed.
    pub fn spawn_run(&self) -> Result<(), SchedulerError> {
        let guard = self.ctx.try_acquire()?;
        let ctx = self.ctx.clone();
        tokio::spawn(async move {
            ctx.execute(guard).await;
        });
        Ok(())
    }

    pub fn is_run_in_progress(&self) -> bool {
        self.ctx.run_lock.try_lock().is_err()
    }

    /// Get current scheduler status.
    pub async fn status(&self) -> SchedulerStatus {
        let running = self.running.load(Ordering::Relaxed);
        let state = self.ctx.state.read().await;
        let next_run_due = if running {
            match state.anchor {
                Some(anchor) => chrono::Duration::from_std(self.frequency)
                    .ok()
                    .map(|frequency| anchor + frequency),
                None => Some(Utc::now()),
            }
        } else {
            None
        };

        SchedulerStatus {
            running,
            run_in_progress: self.is_run_in_progress(),
            last_run_started: state.last_run_started,
            next_run_due,
            runs_completed: state.runs_completed,
        }
    }

    /// Report of the most recent completed run.
    pub async fn last_report(&self) -> Option<RunReport> {
        self.ctx.state.read().await.last_report.clone()
    }
}
