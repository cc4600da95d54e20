//! Timers that feed typed tasks to a single runner.
//!
//! Timers never touch the registry themselves. They only push a
//! [`ScheduledTask`] carrying the request id; the [`ReconciliationRunner`]
//! pops tasks one at a time and calls the matching registry method.

use std::{sync::Arc, time::Duration};

use napthe_types::CardPayment;
use tokio::{
    sync::mpsc,
    task::JoinHandle,
    time::{Instant, MissedTickBehavior},
};
use tracing::{debug, trace};

use crate::registry::PaymentRegistry;

const LOG_TARGET: &str = "napthe::payment";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScheduledTask {
    /// Periodic pass over every pending payment.
    Sweep,
    /// One accelerated status check for a payment that stayed pending too long.
    Recheck {
        request_id: String,
        interval: Duration,
        attempts_left: u32,
    },
}

/// Handle used to arm one-shot and repeating timers.
#[derive(Debug, Clone)]
pub struct TaskScheduler {
    tx: mpsc::UnboundedSender<ScheduledTask>,
}

impl TaskScheduler {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ScheduledTask>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Deliver `task` once after `delay`. Must be called inside a tokio runtime.
    pub fn schedule_once(&self, delay: Duration, task: ScheduledTask) -> JoinHandle<()> {
        let tx = self.tx.clone();
        let deadline = Instant::now() + delay;
        tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            if tx.send(task).is_err() {
                trace!(target: LOG_TARGET, "Runner gone, dropping one-shot task");
            }
        })
    }

    /// Deliver `task` every `interval`, first after one full interval.
    /// Stops once the runner is dropped.
    pub fn schedule_every(&self, interval: Duration, task: ScheduledTask) -> JoinHandle<()> {
        let tx = self.tx.clone();
        let interval = interval.max(Duration::from_millis(1));
        let start = Instant::now() + interval;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(start, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if tx.send(task.clone()).is_err() {
                    trace!(target: LOG_TARGET, "Runner gone, stopping repeating task");
                    break;
                }
            }
        })
    }
}

/// Executes scheduled tasks against the registry, strictly one after another.
pub struct ReconciliationRunner {
    registry: Arc<PaymentRegistry>,
    rx: mpsc::UnboundedReceiver<ScheduledTask>,
}

impl ReconciliationRunner {
    pub fn new(registry: Arc<PaymentRegistry>, rx: mpsc::UnboundedReceiver<ScheduledTask>) -> Self {
        Self { registry, rx }
    }

    /// Process tasks until the channel closes or the surrounding task is aborted.
    pub async fn run(mut self) {
        while let Some(task) = self.rx.recv().await {
            self.dispatch(task).await;
        }
        debug!(target: LOG_TARGET, "Reconciliation runner stopped");
    }

    /// Process the next task, if one arrives. Returns `None` once the channel is closed.
    pub async fn run_next(&mut self) -> Option<Vec<CardPayment>> {
        let task = self.rx.recv().await?;
        Some(self.dispatch(task).await)
    }

    /// Execute one task and return the payments it resolved.
    pub async fn dispatch(&self, task: ScheduledTask) -> Vec<CardPayment> {
        match task {
            ScheduledTask::Sweep => {
                if !self.registry.has_pending() {
                    trace!(target: LOG_TARGET, "Nothing pending, skipping sweep");
                    return Vec::new();
                }
                self.registry.reconcile_pending().await
            }
            ScheduledTask::Recheck {
                request_id,
                interval,
                attempts_left,
            } => self
                .registry
                .run_accelerated_recheck(&request_id, interval, attempts_left)
                .await
                .into_iter()
                .collect(),
        }
    }
}
