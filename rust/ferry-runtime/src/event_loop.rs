//! Engine-thread scheduling.
//!
//! Workers never touch the engine. When an async handler finishes, the
//! settlement is packaged as an [`EngineJob`] and handed to an
//! [`EngineScheduler`], which must run it on the engine thread later.
//!
//! [`job_queue`] builds the default scheduler: an unbounded
//! [`crossbeam_channel`] whose sending half ([`JobSender`]) is shared with
//! workers and whose receiving half ([`JobQueue`]) is pumped by the engine
//! thread. Jobs run in the order they were scheduled.

use crossbeam_channel::{self as cb, RecvTimeoutError};
use std::fmt;
use std::time::{Duration, Instant};

/// A closure that needs exclusive access to the engine.
pub type EngineJob<E> = Box<dyn FnOnce(&mut E) + Send + 'static>;

/// Delivers jobs to the engine thread.
///
/// Implementations must eventually run every scheduled job on the engine
/// thread, in scheduling order.
pub trait EngineScheduler<E>: Send + Sync {
    fn schedule(&self, job: EngineJob<E>);
}

/// Create a connected scheduler / queue pair.
pub fn job_queue<E>() -> (JobSender<E>, JobQueue<E>) {
    let (tx, rx) = cb::unbounded();
    (
        JobSender { inner: tx.clone() },
        JobQueue {
            receiver: rx,
            sender: tx,
        },
    )
}

// ---------------------------------------------------------------------------
// JobSender
// ---------------------------------------------------------------------------

/// Sending half, usable from any thread.
pub struct JobSender<E> {
    inner: cb::Sender<EngineJob<E>>,
}

impl<E> Clone for JobSender<E> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<E> fmt::Debug for JobSender<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobSender")
            .field("queued", &self.inner.len())
            .finish()
    }
}

impl<E> EngineScheduler<E> for JobSender<E> {
    fn schedule(&self, job: EngineJob<E>) {
        if self.inner.send(job).is_err() {
            tracing::warn!("engine job queue is closed; dropping job");
        }
    }
}

// ---------------------------------------------------------------------------
// JobQueue
// ---------------------------------------------------------------------------

/// Receiving half, owned by the engine thread.
pub struct JobQueue<E> {
    receiver: cb::Receiver<EngineJob<E>>,
    sender: cb::Sender<EngineJob<E>>,
}

impl<E> JobQueue<E> {
    /// Another scheduler feeding this queue.
    pub fn sender(&self) -> JobSender<E> {
        JobSender {
            inner: self.sender.clone(),
        }
    }

    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }

    /// Run every job that is already queued. Returns how many ran.
    pub fn run_pending(&self, engine: &mut E) -> usize {
        let mut ran = 0;
        while let Ok(job) = self.receiver.try_recv() {
            job(engine);
            ran += 1;
        }
        ran
    }

    /// Wait up to `timeout` for one job and run it.
    pub fn run_next(&self, engine: &mut E, timeout: Duration) -> bool {
        match self.receiver.recv_timeout(timeout) {
            Ok(job) => {
                job(engine);
                true
            }
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => false,
        }
    }

    /// Run jobs until `done` reports `true` or `timeout` elapses.
    ///
    /// `done` is checked before waiting and after every job. Returns whether
    /// the condition was met.
    pub fn run_until(
        &self,
        engine: &mut E,
        timeout: Duration,
        mut done: impl FnMut(&mut E) -> bool,
    ) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            if done(engine) {
                return true;
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() || !self.run_next(engine, remaining) {
                return done(engine);
            }
        }
    }
}

impl<E> fmt::Debug for JobQueue<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobQueue")
            .field("queued", &self.receiver.len())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
