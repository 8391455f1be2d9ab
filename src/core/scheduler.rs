use crate::core::schedule::Schedule;
use crate::core::watch::WatchEngine;
use crate::core::{Clock, CycleOutcome, Mailer, MenuSource, Sleeper};
use crate::utils::error::{Result, WatchError};
use async_trait::async_trait;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Checking,
    Sleeping,
    ClosedSkip,
    FatalStopped,
}

/// What to do when the menu cannot be fetched or parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchFailurePolicy {
    /// Stop the scheduler; the supervisor restarts the process.
    #[default]
    Stop,
    /// Log it and try again after the next sleep.
    Skip,
}

#[derive(Debug, Clone)]
pub struct SchedulerOptions {
    pub period: Duration,
    pub force: bool,
    pub on_fetch_failure: FetchFailurePolicy,
}

impl SchedulerOptions {
    pub fn from_hours(period_hours: u64, force: bool, on_fetch_failure: FetchFailurePolicy) -> Self {
        Self {
            period: Duration::from_secs(period_hours * 3600),
            force,
            on_fetch_failure,
        }
    }
}

/// One fetch-match-notify pass, as seen by the scheduler.
#[async_trait]
pub trait Cycle: Send + Sync {
    async fn run_once(&self, force: bool) -> Result<CycleOutcome>;
}

#[async_trait]
impl<S: MenuSource, M: Mailer> Cycle for WatchEngine<S, M> {
    async fn run_once(&self, force: bool) -> Result<CycleOutcome> {
        self.run_cycle(force).await
    }
}

pub struct Scheduler<W: Cycle, C: Clock, Z: Sleeper> {
    cycle: W,
    clock: C,
    sleeper: Z,
    schedule: Schedule,
    options: SchedulerOptions,
    state: SchedulerState,
    last_outcome: Option<CycleOutcome>,
    fatal: Option<WatchError>,
}

impl<W: Cycle, C: Clock, Z: Sleeper> Scheduler<W, C, Z> {
    pub fn new(cycle: W, clock: C, sleeper: Z, schedule: Schedule, options: SchedulerOptions) -> Self {
        Self {
            cycle,
            clock,
            sleeper,
            schedule,
            options,
            state: SchedulerState::Checking,
            last_outcome: None,
            fatal: None,
        }
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn last_outcome(&self) -> Option<&CycleOutcome> {
        self.last_outcome.as_ref()
    }

    pub fn fatal_error(&self) -> Option<&WatchError> {
        self.fatal.as_ref()
    }

    /// Advance the state machine by one transition.
    pub async fn step(&mut self) -> SchedulerState {
        let next = match self.state {
            SchedulerState::Checking => self.check().await,
            SchedulerState::ClosedSkip => SchedulerState::Sleeping,
            SchedulerState::Sleeping => {
                tracing::debug!("Sleeping for {:?}", self.options.period);
                self.sleeper.sleep(self.options.period).await;
                SchedulerState::Checking
            }
            SchedulerState::FatalStopped => SchedulerState::FatalStopped,
        };
        self.state = next;
        next
    }

    /// Run until a fatal error stops the loop, and hand that error back.
    pub async fn run(mut self) -> WatchError {
        loop {
            if self.step().await == SchedulerState::FatalStopped {
                return self
                    .fatal
                    .take()
                    .unwrap_or_else(|| WatchError::config("scheduler stopped without an error"));
            }
        }
    }

    async fn check(&mut self) -> SchedulerState {
        let now = self.clock.now();
        if !self.options.force && !self.schedule.is_open(&now) {
            tracing::info!(
                "Restaurant closed at {}, skipping this cycle",
                now.format("%a %H:%M")
            );
            return SchedulerState::ClosedSkip;
        }

        match self.cycle.run_once(self.options.force).await {
            Ok(outcome) => {
                self.last_outcome = Some(outcome);
                SchedulerState::Sleeping
            }
            Err(e) => {
                tracing::error!(severity = "critical", "Menu check failed: {}", e);
                match self.options.on_fetch_failure {
                    FetchFailurePolicy::Stop => {
                        self.fatal = Some(e);
                        SchedulerState::FatalStopped
                    }
                    FetchFailurePolicy::Skip => SchedulerState::Sleeping,
                }
            }
        }
    }
}
