use crate::clock::{Clock, SystemClock};
use crate::error::{Result, StorageError};
use crate::token::Token;
use async_trait::async_trait;
use jiff::Timestamp;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, trace, warn};

/// Where the reconciler publishes each batch of removed tokens.
///
/// Publishing never waits: a batch that does not fit, or that nobody is
/// listening for, is dropped.
pub type RemovedSink = mpsc::Sender<Vec<Token>>;

/// Bulk removal of expired links, implemented by backends without native TTL.
#[async_trait]
pub trait Sweeper: Send + Sync + 'static {
    /// Deletes every link whose `expires_at` is before `now` and returns
    /// the removed tokens.
    async fn sweep_expired(&self, now: Timestamp) -> Result<Vec<Token>>;
}

/// Rejects a zero sweep interval.
///
/// Backends call this before [`StartOnce::claim`] so a bad interval does not
/// use up their single start.
pub fn validate_interval(interval: Duration) -> Result<()> {
    if interval.is_zero() {
        return Err(StorageError::Operation(
            "expiry interval must be greater than zero".to_string(),
        ));
    }
    Ok(())
}

/// Periodically sweeps expired links out of a backend.
///
/// One reconciler runs per repository instance, on its own task, and never
/// shares a lock with request handling. A failed sweep is logged and the loop
/// carries on at the next tick.
pub struct ExpiryReconciler<S, C = SystemClock> {
    sweeper: S,
    clock: C,
    interval: Duration,
    sink: RemovedSink,
}

impl<S: Sweeper> ExpiryReconciler<S> {
    pub fn new(sweeper: S, interval: Duration, sink: RemovedSink) -> Self {
        Self::with_clock(sweeper, SystemClock, interval, sink)
    }
}

impl<S: Sweeper, C: Clock> ExpiryReconciler<S, C> {
    pub fn with_clock(sweeper: S, clock: C, interval: Duration, sink: RemovedSink) -> Self {
        Self {
            sweeper,
            clock,
            interval,
            sink,
        }
    }

    /// Runs a single reconciliation pass and returns how many links it removed.
    ///
    /// The batch is published even when empty.
    pub async fn tick(&self) -> Result<usize> {
        let now = self.clock.now();
        let removed = self.sweeper.sweep_expired(now).await?;
        let count = removed.len();
        self.publish(removed);
        Ok(count)
    }

    fn publish(&self, batch: Vec<Token>) {
        match self.sink.try_send(batch) {
            Ok(()) => trace!("published removed tokens"),
            Err(TrySendError::Full(batch)) => {
                warn!(dropped = batch.len(), "removed-token sink is full, dropping batch");
            }
            Err(TrySendError::Closed(batch)) => {
                trace!(dropped = batch.len(), "removed-token sink has no consumer");
            }
        }
    }

    /// Starts the loop on a new tokio task.
    ///
    /// The first sweep happens one interval after start. The loop ends when
    /// [`ReconcilerHandle::stop`] is called or the handle is dropped.
    pub fn spawn(self) -> Result<ReconcilerHandle> {
        validate_interval(self.interval)?;

        let (stop_tx, stop_rx) = watch::channel(false);
        let task = tokio::spawn(self.run(stop_rx));

        Ok(ReconcilerHandle {
            stop: stop_tx,
            task,
        })
    }

    async fn run(self, mut stop: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(interval = ?self.interval, "expiry reconciler started");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match self.tick().await {
                        Ok(removed) => debug!(removed, "expiry sweep finished"),
                        Err(e) => warn!(error = %e, "expiry sweep failed, retrying next tick"),
                    }
                }
                changed = stop.changed() => {
                    if changed.is_err() || *stop.borrow() {
                        break;
                    }
                }
            }
        }

        info!("expiry reconciler stopped");
    }
}

/// Owner of a running reconciler task.
#[derive(Debug)]
pub struct ReconcilerHandle {
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl ReconcilerHandle {
    /// Signals the loop to stop and waits for it to finish.
    ///
    /// A sweep already in flight completes first.
    pub async fn stop(self) {
        let _ = self.stop.send(true);
        if let Err(e) = self.task.await {
            warn!(error = %e, "expiry reconciler task ended abnormally");
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

/// What `start_expiry_loop` set up for a backend.
#[derive(Debug)]
pub enum ExpiryLoop {
    /// The backend expires links itself; nothing runs.
    Native,
    /// A reconciler task sweeps the backend.
    Sweeping(ReconcilerHandle),
}

impl ExpiryLoop {
    pub fn is_native(&self) -> bool {
        matches!(self, ExpiryLoop::Native)
    }

    /// Stops the reconciler, if there is one.
    pub async fn stop(self) {
        if let ExpiryLoop::Sweeping(handle) = self {
            handle.stop().await;
        }
    }
}

/// Enforces that a repository starts its expiry loop at most once.
#[derive(Debug, Default)]
pub struct StartOnce(AtomicBool);

impl StartOnce {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims the single start. Fails if it was already claimed.
    pub fn claim(&self) -> Result<()> {
        if self.0.swap(true, Ordering::AcqRel) {
            return Err(StorageError::ExpiryLoopAlreadyStarted);
        }
        Ok(())
    }
}
