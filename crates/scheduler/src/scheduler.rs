//! Job scheduler implementation
//!
//! Provides a high-level job scheduler that manages job submission,
//! priority-based execution ordering, and job lifecycle.

use crate::priority::{Job, JobId, JobPriority, JobType, PriorityQueue, TabId};
use parking_lot::Mutex;

/// Job scheduler statistics
#[derive(Debug, Clone, Default)]
pub struct SchedulerStats {
    /// Total jobs submitted
    pub jobs_submitted: u64,

    /// Total jobs completed
    pub jobs_completed: u64,

    /// Total jobs removed from the queue before they ran
    pub jobs_cancelled: u64,

    /// Current queue size
    pub queue_size: usize,
}

impl SchedulerStats {
    /// Number of jobs submitted but not yet completed or cancelled
    pub fn pending_jobs(&self) -> u64 {
        self.jobs_submitted - self.jobs_completed - self.jobs_cancelled
    }
}

/// Job scheduler with priority queue
///
/// Thread-safe scheduler shared between the session (which submits) and the
/// workers (which pull). There is no cancellation of running jobs: results
/// are checked for staleness when they are committed. Jobs still queued for
/// a closed tab can be dropped with [`JobScheduler::cancel_tab_jobs`].
///
/// # Example
///
/// ```
/// use folio_scheduler::{JobScheduler, JobPriority, JobType};
///
/// let scheduler = JobScheduler::new();
/// scheduler.submit(JobPriority::Page, JobType::RenderPage {
///     tab_id: 1,
///     page_index: 0,
///     scale: 2.0,
///     generation: 0,
/// });
///
/// if let Some(job) = scheduler.next_job() {
///     // ... render ...
///     scheduler.complete_job(job.id);
/// }
/// assert_eq!(scheduler.stats().pending_jobs(), 0);
/// ```
pub struct JobScheduler {
    queue: PriorityQueue,
    stats: Mutex<SchedulerStats>,
}

impl JobScheduler {
    /// Create a new job scheduler
    pub fn new() -> Self {
        Self { queue: PriorityQueue::new(), stats: Mutex::new(SchedulerStats::default()) }
    }

    /// Submit a job to the scheduler
    ///
    /// The job will be queued according to its priority and executed when
    /// a worker becomes available.
    pub fn submit(&self, priority: JobPriority, job_type: JobType) -> JobId {
        tracing::trace!(?priority, ?job_type, "job submitted");
        let job_id = self.queue.push(priority, job_type);
        self.stats.lock().jobs_submitted += 1;
        job_id
    }

    /// Submit a job unless an identical one is already queued
    ///
    /// Returns `None` when the job was deduplicated.
    pub fn submit_unique(&self, priority: JobPriority, job_type: JobType) -> Option<JobId> {
        if self.queue.any(|job| job.job_type == job_type) {
            return None;
        }
        Some(self.submit(priority, job_type))
    }

    /// Get the next job to execute
    ///
    /// Returns the highest priority job from the queue, or `None` if the queue is empty.
    pub fn next_job(&self) -> Option<Job> {
        self.queue.pop()
    }

    /// Mark a job as completed
    pub fn complete_job(&self, _job_id: JobId) {
        self.stats.lock().jobs_completed += 1;
    }

    /// Remove all queued jobs matching a predicate
    ///
    /// Returns the number of jobs removed.
    pub fn cancel_jobs_if<F>(&self, predicate: F) -> usize
    where
        F: Fn(&Job) -> bool,
    {
        let removed = self.queue.remove_if(predicate);
        if removed > 0 {
            self.stats.lock().jobs_cancelled += removed as u64;
        }
        removed
    }

    /// Remove all queued jobs for a tab
    ///
    /// Used when a tab is closed.
    pub fn cancel_tab_jobs(&self, tab_id: TabId) -> usize {
        self.cancel_jobs_if(|job| job.job_type.tab_id() == tab_id)
    }

    /// Get the current number of queued jobs
    pub fn pending_jobs(&self) -> usize {
        self.queue.len()
    }

    /// Check if the scheduler has any queued jobs
    pub fn has_pending_jobs(&self) -> bool {
        !self.queue.is_empty()
    }

    /// Drop every queued job
    pub fn clear(&self) {
        let cancelled = self.queue.len();
        self.queue.clear();
        if cancelled > 0 {
            self.stats.lock().jobs_cancelled += cancelled as u64;
        }
    }

    /// Get scheduler statistics
    pub fn stats(&self) -> SchedulerStats {
        let mut stats = self.stats.lock().clone();
        stats.queue_size = self.queue.len();
        stats
    }
}

impl Default for JobScheduler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(tab_id: TabId, page_index: u32) -> JobType {
        JobType::RenderPage { tab_id, page_index, scale: 2.0, generation: 0 }
    }

    #[test]
    fn test_submit_and_complete() {
        let scheduler = JobScheduler::new();
        let id = scheduler.submit(JobPriority::Page, page(1, 0));
        assert!(scheduler.has_pending_jobs());

        let job = scheduler.next_job().unwrap();
        assert_eq!(job.id, id);
        scheduler.complete_job(job.id);

        let stats = scheduler.stats();
        assert_eq!(stats.jobs_submitted, 1);
        assert_eq!(stats.jobs_completed, 1);
        assert_eq!(stats.pending_jobs(), 0);
        assert_eq!(stats.queue_size, 0);
    }

    #[test]
    fn test_cancel_tab_jobs() {
        let scheduler = JobScheduler::new();
        scheduler.submit(JobPriority::Page, page(1, 0));
        scheduler.submit(JobPriority::Thumbnail, JobType::RenderThumbnail { tab_id: 1, page_index: 2 });
        scheduler.submit(JobPriority::Page, page(2, 0));

        assert_eq!(scheduler.cancel_tab_jobs(1), 2);
        assert_eq!(scheduler.pending_jobs(), 1);
        assert_eq!(scheduler.stats().jobs_cancelled, 2);
        assert_eq!(scheduler.stats().pending_jobs(), 1);
    }

    #[test]
    fn test_submit_unique_deduplicates() {
        let scheduler = JobScheduler::new();
        let thumb = JobType::RenderThumbnail { tab_id: 1, page_index: 0 };
        assert!(scheduler.submit_unique(JobPriority::Thumbnail, thumb.clone()).is_some());
        assert!(scheduler.submit_unique(JobPriority::Thumbnail, thumb).is_none());
        assert_eq!(scheduler.pending_jobs(), 1);
    }

    #[test]
    fn test_clear() {
        let scheduler = JobScheduler::default();
        scheduler.submit(JobPriority::Page, page(1, 0));
        scheduler.submit(JobPriority::Page, page(1, 1));
        scheduler.clear();

        assert!(!scheduler.has_pending_jobs());
        assert_eq!(scheduler.stats().jobs_cancelled, 2);
    }
}
