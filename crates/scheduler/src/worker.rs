//! Render worker threads and the inline job runner.
//!
//! Workers run on their own threads, pulling jobs from the shared scheduler
//! and handing them to the executor callback. Executors report results
//! through a [`crate::CompletionQueue`]; workers never touch session state.

use crate::{Job, JobScheduler};
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Runs one job. Shared by every worker and by [`run_until_idle`].
///
/// Workers invoke this callback for each job they pull from the scheduler.
pub type JobExecutor = Arc<dyn Fn(&Job) + Send + Sync>;

/// Configuration for the render worker pool.
#[derive(Debug, Clone)]
pub struct WorkerPoolConfig {
    /// Threads to spawn (default: logical CPU count)
    pub num_workers: usize,

    /// Time an idle worker sleeps before polling the scheduler again.
    /// Default: 10ms.
    pub poll_interval: Duration,
}

impl Default for WorkerPoolConfig {
    fn default() -> Self {
        Self { num_workers: num_cpus(), poll_interval: Duration::from_millis(10) }
    }
}

impl WorkerPoolConfig {
    /// Pool of `num_workers` threads with the default poll interval.
    pub fn new(num_workers: usize) -> Self {
        Self { num_workers, ..Self::default() }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }
}

/// Threads draining a [`JobScheduler`].
///
/// Dropping the pool signals the workers and waits for their current jobs
/// to finish.
///
/// # Example
///
/// ```
/// use folio_scheduler::{Job, JobPriority, JobScheduler, JobType, WorkerPool, WorkerPoolConfig};
/// use std::sync::Arc;
///
/// let scheduler = Arc::new(JobScheduler::new());
/// let executor = Arc::new(|job: &Job| {
///     if let JobType::RenderPage { page_index, .. } = job.job_type {
///         println!("rendering page {page_index}");
///     }
/// });
///
/// let pool = WorkerPool::new(scheduler.clone(), executor, WorkerPoolConfig::new(2))
///     .expect("spawn workers");
/// scheduler.submit(JobPriority::Page, JobType::RenderPage {
///     tab_id: 1,
///     page_index: 0,
///     scale: 2.0,
///     generation: 0,
/// });
/// pool.shutdown();
/// ```
pub struct WorkerPool {
    workers: Vec<Worker>,
    shutdown: Arc<AtomicBool>,
}

impl WorkerPool {
    /// Spawn the workers.
    ///
    /// # Arguments
    ///
    /// * `scheduler` - Job scheduler to pull jobs from
    /// * `executor` - Job executor callback for executing jobs
    /// * `config` - Worker pool configuration
    pub fn new(
        scheduler: Arc<JobScheduler>,
        executor: JobExecutor,
        config: WorkerPoolConfig,
    ) -> io::Result<Self> {
        let shutdown = Arc::new(AtomicBool::new(false));
        let mut pool = Self { workers: Vec::with_capacity(config.num_workers), shutdown };

        for id in 0..config.num_workers {
            // On error the partially built pool is dropped, stopping the
            // workers already spawned.
            let worker = Worker::new(
                id,
                scheduler.clone(),
                executor.clone(),
                pool.shutdown.clone(),
                config.poll_interval,
            )?;
            pool.workers.push(worker);
        }

        tracing::debug!(workers = pool.workers.len(), "worker pool started");
        Ok(pool)
    }

    pub fn num_workers(&self) -> usize {
        self.workers.len()
    }

    /// Whether shutdown has been signalled.
    pub fn is_shutting_down(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }

    /// Stop the workers.
    ///
    /// Blocks until every worker has finished its current job and exited.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        self.shutdown.store(true, Ordering::Release);
        for worker in self.workers.drain(..) {
            worker.join();
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.stop();
    }
}

/// One named render thread.
struct Worker {
    thread: Option<JoinHandle<()>>,
}

impl Worker {
    fn new(
        id: usize,
        scheduler: Arc<JobScheduler>,
        executor: JobExecutor,
        shutdown: Arc<AtomicBool>,
        poll_interval: Duration,
    ) -> io::Result<Self> {
        let thread = thread::Builder::new()
            .name(format!("folio-render-worker-{}", id))
            .spawn(move || Self::run(scheduler, executor, shutdown, poll_interval))?;

        Ok(Self { thread: Some(thread) })
    }

    /// Main worker loop.
    fn run(
        scheduler: Arc<JobScheduler>,
        executor: JobExecutor,
        shutdown: Arc<AtomicBool>,
        poll_interval: Duration,
    ) {
        while !shutdown.load(Ordering::Acquire) {
            if let Some(job) = scheduler.next_job() {
                execute(&scheduler, &executor, &job);
            } else {
                thread::sleep(poll_interval);
            }
        }
    }

    fn join(mut self) {
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                tracing::error!("render worker panicked");
            }
        }
    }
}

/// Execute queued jobs on the calling thread until the queue is empty.
///
/// Returns the number of jobs executed. Used when no pool is running.
pub fn run_until_idle(scheduler: &JobScheduler, executor: &JobExecutor) -> usize {
    let mut executed = 0;
    while let Some(job) = scheduler.next_job() {
        execute(scheduler, executor, &job);
        executed += 1;
    }
    executed
}

/// Run one job and mark it complete, even if the executor panics.
fn execute(scheduler: &JobScheduler, executor: &JobExecutor, job: &Job) {
    if panic::catch_unwind(AssertUnwindSafe(|| executor(job))).is_err() {
        tracing::error!(job = job.id, job_type = ?job.job_type, "job executor panicked");
    }
    scheduler.complete_job(job.id);
}

/// Logical CPU count, falling back to 4.
pub(crate) fn num_cpus() -> usize {
    thread::available_parallelism().map(|n| n.get()).unwrap_or(4)
}
