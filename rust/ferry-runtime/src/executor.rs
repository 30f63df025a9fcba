//! Worker executor: where async handler bodies run.
//!
//! [`WorkerExecutor`] is the seam; any thread pool can implement it. The
//! bundled [`WorkerPool`] is a work-stealing pool: each worker owns a FIFO
//! deque, new work enters a global [`Injector`], and idle workers steal.
//!
//! # Worker loop
//!
//! 1. Pop from the local deque.
//! 2. Steal a batch from the global injector into the local deque.
//! 3. Steal from a random peer.
//! 4. Exit if shutdown was requested, otherwise park for 1 ms and retry.
//!
//! Shutdown is graceful: a worker only exits once it finds no work anywhere,
//! so everything submitted before [`WorkerPool::shutdown`] still runs.

use crate::panic_boundary::catch_panic;
use crossbeam_deque::{Injector, Steal, Stealer, Worker};
use std::fmt;
use std::io;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// A unit of work submitted to an executor.
pub type Work = Box<dyn FnOnce() + Send + 'static>;

/// Runs work on some thread other than the engine thread.
pub trait WorkerExecutor: Send + Sync {
    fn execute(&self, work: Work);
}

// ---------------------------------------------------------------------------
// Task
// ---------------------------------------------------------------------------

struct Task {
    work: Option<Work>,
}

impl Task {
    fn new(work: Work) -> Self {
        Self { work: Some(work) }
    }

    /// Run the work once. A panic is logged and swallowed so the worker
    /// thread survives it.
    fn run(&mut self, worker: usize) -> bool {
        let Some(work) = self.work.take() else {
            return false;
        };
        if let Err(err) = catch_panic(AssertUnwindSafe(work)) {
            tracing::error!(worker, "task panicked on worker: {}", err.message());
        }
        true
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("has_work", &self.work.is_some())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// WorkerPool
// ---------------------------------------------------------------------------

/// Work-stealing thread pool implementing [`WorkerExecutor`].
pub struct WorkerPool {
    injector: Arc<Injector<Task>>,
    handles: Vec<thread::JoinHandle<()>>,
    shutdown: Arc<AtomicBool>,
    worker_count: usize,
    submitted: AtomicUsize,
    completed: Arc<AtomicUsize>,
}

impl WorkerPool {
    /// Start a pool with `threads` workers; `0` means one per CPU.
    pub fn new(threads: usize) -> io::Result<Self> {
        let worker_count = if threads == 0 {
            num_cpus::get().max(1)
        } else {
            threads
        };

        let injector = Arc::new(Injector::<Task>::new());
        let shutdown = Arc::new(AtomicBool::new(false));
        let completed = Arc::new(AtomicUsize::new(0));

        let locals: Vec<Worker<Task>> = (0..worker_count).map(|_| Worker::new_fifo()).collect();
        let stealers: Arc<Vec<Stealer<Task>>> =
            Arc::new(locals.iter().map(Worker::stealer).collect());

        let mut pool = Self {
            injector,
            handles: Vec::with_capacity(worker_count),
            shutdown,
            worker_count,
            submitted: AtomicUsize::new(0),
            completed,
        };

        for (idx, local) in locals.into_iter().enumerate() {
            let injector = Arc::clone(&pool.injector);
            let stealers = Arc::clone(&stealers);
            let shutdown = Arc::clone(&pool.shutdown);
            let completed = Arc::clone(&pool.completed);

            // On spawn failure the pool drops here, which joins the workers
            // already started.
            let handle = thread::Builder::new()
                .name(format!("ferry-worker-{}", idx))
                .spawn(move || worker_loop(idx, local, injector, stealers, shutdown, completed))?;
            pool.handles.push(handle);
        }

        tracing::debug!(workers = worker_count, "worker pool started");
        Ok(pool)
    }

    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    pub fn submitted_count(&self) -> usize {
        self.submitted.load(Ordering::Acquire)
    }

    pub fn completed_count(&self) -> usize {
        self.completed.load(Ordering::Acquire)
    }

    /// Convenience for submitting a closure without boxing it first.
    pub fn spawn_fn<F: FnOnce() + Send + 'static>(&self, f: F) {
        self.execute(Box::new(f));
    }

    /// Block until at least `expected` tasks have completed or `timeout`
    /// elapses. Returns the completed count when the wait ended.
    pub fn wait_for_completion(&self, expected: usize, timeout: Duration) -> usize {
        let deadline = Instant::now() + timeout;
        loop {
            let current = self.completed_count();
            if current >= expected || Instant::now() >= deadline {
                return current;
            }
            thread::sleep(Duration::from_millis(1));
        }
    }

    /// Stop accepting work, let workers drain their queues, and join them.
    pub fn shutdown(&mut self) {
        self.shutdown.store(true, Ordering::Release);
        for handle in self.handles.drain(..) {
            let _ = handle.join();
        }
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }
}

impl WorkerExecutor for WorkerPool {
    fn execute(&self, work: Work) {
        if self.is_shutdown() {
            tracing::warn!("worker pool is shut down; dropping submitted work");
            return;
        }
        self.submitted.fetch_add(1, Ordering::AcqRel);
        self.injector.push(Task::new(work));
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        if !self.handles.is_empty() {
            self.shutdown();
        }
    }
}

impl fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerPool")
            .field("worker_count", &self.worker_count)
            .field("completed_count", &self.completed_count())
            .field("shutdown", &self.is_shutdown())
            .finish()
    }
}

// -- worker loop --------------------------------------------------------------

/// xorshift32; each worker keeps its own state.
fn xorshift32(state: &mut u32) -> u32 {
    let mut x = *state;
    x ^= x << 13;
    x ^= x >> 17;
    x ^= x << 5;
    *state = x;
    x
}

fn worker_loop(
    idx: usize,
    local: Worker<Task>,
    injector: Arc<Injector<Task>>,
    stealers: Arc<Vec<Stealer<Task>>>,
    shutdown: Arc<AtomicBool>,
    completed: Arc<AtomicUsize>,
) {
    // Zero is a fixpoint of xorshift.
    let mut rng_state: u32 = (idx as u32).wrapping_mul(2_654_435_761).max(1);

    let run = |mut task: Task| {
        if task.run(idx) {
            completed.fetch_add(1, Ordering::Release);
        }
    };

    loop {
        if let Some(task) = local.pop() {
            run(task);
            continue;
        }

        match injector.steal_batch_and_pop(&local) {
            Steal::Success(task) => {
                run(task);
                continue;
            }
            Steal::Retry => {
                thread::yield_now();
                continue;
            }
            Steal::Empty => {}
        }

        let peers = stealers.len();
        let mut retry = false;
        if peers > 1 {
            let start = xorshift32(&mut rng_state) as usize % peers;
            let mut stolen = None;
            for offset in 0..peers {
                let peer = (start + offset) % peers;
                if peer == idx {
                    continue;
                }
                match stealers[peer].steal_batch_and_pop(&local) {
                    Steal::Success(task) => {
                        stolen = Some(task);
                        break;
                    }
                    Steal::Retry => retry = true,
                    Steal::Empty => {}
                }
            }
            if let Some(task) = stolen {
                run(task);
                continue;
            }
        }

        if shutdown.load(Ordering::Acquire) && !retry && injector.is_empty() {
            return;
        }
        thread::park_timeout(Duration::from_millis(1));
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
