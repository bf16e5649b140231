//! Reminder scheduler
//!
//! One background task wakes on a fixed interval, pulls due reminders from the
//! store and pushes them out one at a time, earliest first. Ticks never
//! overlap because a single task runs them back to back.
//!
//! - **Version**: 2.0.0
//! - **Since**: 0.1.0
//!
//! ## Changelog
//! - 2.0.0: Store/delivery injection, quota-aware status transitions, separable `run_tick`
//! - 1.0.0: Initial reminder loop

use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use super::delivery::{DeliveryClient, DeliveryOutcome};
use crate::database::{Reminder, ReminderStore, StoreError};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerSettings {
    pub poll_interval: Duration,
    /// Skip dispatch entirely while the monthly quota is saturated.
    /// Off by default: saturation is only a signal for other components.
    pub skip_when_saturated: bool,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            skip_when_saturated: false,
        }
    }
}

/// Where the scheduler is within its cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Scanning,
    Dispatching,
}

/// What one tick did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Reminders found due at the start of the tick
    pub due: usize,
    pub sent: usize,
    pub quota_failed: usize,
    /// Left pending for the next tick
    pub transient: usize,
    /// Not attempted because the quota was saturated
    pub skipped: usize,
    /// Status writes that failed after a delivery attempt
    pub mark_errors: usize,
}

pub struct ReminderScheduler {
    store: Arc<dyn ReminderStore>,
    delivery: DeliveryClient,
    settings: SchedulerSettings,
    state: watch::Sender<SchedulerState>,
}

impl ReminderScheduler {
    pub fn new(
        store: Arc<dyn ReminderStore>,
        delivery: DeliveryClient,
        settings: SchedulerSettings,
    ) -> Self {
        let (state, _) = watch::channel(SchedulerState::Idle);
        Self {
            store,
            delivery,
            settings,
            state,
        }
    }

    pub fn state(&self) -> SchedulerState {
        *self.state.borrow()
    }

    /// Observe state changes, including from outside the scheduler task
    pub fn subscribe_state(&self) -> watch::Receiver<SchedulerState> {
        self.state.subscribe()
    }

    fn set_state(&self, state: SchedulerState) {
        self.state.send_replace(state);
    }

    /// Run a single scan-and-dispatch cycle as of `now`
    ///
    /// Store read failures abort the tick before anything is sent. Failures on
    /// individual reminders are logged and counted, never propagated.
    pub async fn run_tick(&self, now: DateTime<Utc>) -> Result<TickReport, StoreError> {
        let result = self.tick(now).await;
        self.set_state(SchedulerState::Idle);
        result
    }

    async fn tick(&self, now: DateTime<Utc>) -> Result<TickReport, StoreError> {
        self.set_state(SchedulerState::Scanning);
        let due = self.store.get_pending(now).await?;
        let mut report = TickReport {
            due: due.len(),
            ..TickReport::default()
        };

        if due.is_empty() {
            return Ok(report);
        }

        if self.settings.skip_when_saturated && self.store.is_quota_saturated(now).await? {
            warn!(
                "Delivery quota saturated this month, skipping {} due reminder(s)",
                due.len()
            );
            report.skipped = due.len();
            return Ok(report);
        }

        self.set_state(SchedulerState::Dispatching);
        for reminder in &due {
            self.dispatch(reminder, &mut report).await;
        }

        Ok(report)
    }

    async fn dispatch(&self, reminder: &Reminder, report: &mut TickReport) {
        debug!(
            "Delivering {} reminder {} to {} (due {})",
            reminder.status, reminder.id, reminder.owner_id, reminder.due_at
        );

        match self
            .delivery
            .deliver(&reminder.owner_id, &reminder.text)
            .await
        {
            DeliveryOutcome::Success => {
                report.sent += 1;
                match self.store.mark_sent(reminder.id).await {
                    Ok(true) => info!("Delivered reminder {} to {}", reminder.id, reminder.owner_id),
                    Ok(false) => debug!(
                        "Reminder {} delivered but already terminal or deleted",
                        reminder.id
                    ),
                    Err(e) => {
                        report.mark_errors += 1;
                        error!("Failed to mark reminder {} as sent: {e}", reminder.id);
                    }
                }
            }
            DeliveryOutcome::QuotaExceeded(reason) => {
                report.quota_failed += 1;
                warn!(
                    "Push quota exhausted delivering reminder {}: {reason}",
                    reminder.id
                );
                if let Err(e) = self.store.mark_failed(reminder.id).await {
                    report.mark_errors += 1;
                    error!("Failed to mark reminder {} as failed: {e}", reminder.id);
                }
            }
            DeliveryOutcome::TransientFailure(reason) => {
                report.transient += 1;
                warn!(
                    "Reminder {} not delivered, will retry next tick: {reason}",
                    reminder.id
                );
            }
        }
    }

    /// Tick every `poll_interval` until `shutdown` is cancelled
    ///
    /// Cancellation is checked between ticks; a tick already dispatching runs
    /// to completion.
    pub async fn run(self, shutdown: CancellationToken) {
        let mut interval = tokio::time::interval(self.settings.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            "⏰ Reminder scheduler started (interval: {}s)",
            self.settings.poll_interval.as_secs_f64()
        );

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = interval.tick() => {}
            }

            match self.run_tick(Utc::now()).await {
                Ok(report) if report.due > 0 => info!(
                    "Reminder tick: {} due, {} sent, {} quota-failed, {} retrying, {} skipped",
                    report.due, report.sent, report.quota_failed, report.transient, report.skipped
                ),
                Ok(_) => debug!("Reminder tick: nothing due"),
                Err(e) => error!("Reminder tick aborted: {e}"),
            }
        }

        info!("Reminder scheduler stopped");
    }

    pub fn spawn(self, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }
}
