//! Priority-based job queue
//!
//! Jobs are dequeued in priority order, FIFO within a priority level.

use parking_lot::Mutex;
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::Arc;

/// Job priority levels
///
/// Higher numeric values have higher priority and are executed first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum JobPriority {
    /// Thumbnail strip (low priority)
    Thumbnail = 0,

    /// The page the user is looking at
    Page = 1,
}

/// Unique job identifier
pub type JobId = u64;

/// Identifier of the tab a job belongs to
pub type TabId = u64;

/// Job type enumeration
#[derive(Debug, Clone, PartialEq)]
pub enum JobType {
    /// Rasterize a page at the tab's base scale
    RenderPage {
        tab_id: TabId,
        page_index: u32,
        scale: f32,
        /// Render-cache generation the request was issued for
        generation: u64,
    },

    /// Warm the thumbnail cache for one page
    RenderThumbnail { tab_id: TabId, page_index: u32 },
}

impl JobType {
    pub fn tab_id(&self) -> TabId {
        match self {
            JobType::RenderPage { tab_id, .. } | JobType::RenderThumbnail { tab_id, .. } => *tab_id,
        }
    }

    pub fn page_index(&self) -> u32 {
        match self {
            JobType::RenderPage { page_index, .. }
            | JobType::RenderThumbnail { page_index, .. } => *page_index,
        }
    }
}

/// A scheduled job with priority
///
/// Jobs are ordered by priority (higher priority first), then by insertion order
/// (earlier jobs first) to ensure FIFO ordering within the same priority level.
#[derive(Debug, Clone)]
pub struct Job {
    /// Unique job identifier
    pub id: JobId,

    /// Job priority level
    pub priority: JobPriority,

    /// Job type and parameters
    pub job_type: JobType,

    /// Insertion order (used for FIFO within same priority)
    insertion_order: u64,
}

impl Job {
    /// Create a new job
    pub fn new(id: JobId, priority: JobPriority, job_type: JobType, insertion_order: u64) -> Self {
        Self { id, priority, job_type, insertion_order }
    }
}

impl PartialEq for Job {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Job {}

impl PartialOrd for Job {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Job {
    fn cmp(&self, other: &Self) -> Ordering {
        match self.priority.cmp(&other.priority) {
            // BinaryHeap is a max heap, so earlier insertions must compare greater
            Ordering::Equal => other.insertion_order.cmp(&self.insertion_order),
            other => other,
        }
    }
}

/// Thread-safe priority queue for jobs
pub struct PriorityQueue {
    state: Arc<Mutex<QueueState>>,
}

struct QueueState {
    /// Binary heap for priority-ordered jobs (max heap)
    heap: BinaryHeap<Job>,

    /// Next job ID (for automatic ID assignment)
    next_job_id: JobId,

    /// Insertion counter (for FIFO ordering within same priority)
    insertion_counter: u64,
}

impl PriorityQueue {
    /// Create a new empty priority queue
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(QueueState {
                heap: BinaryHeap::new(),
                next_job_id: 1,
                insertion_counter: 0,
            })),
        }
    }

    /// Push a job onto the queue and return its assigned ID
    pub fn push(&self, priority: JobPriority, job_type: JobType) -> JobId {
        let mut state = self.state.lock();
        let job_id = state.next_job_id;
        state.next_job_id += 1;

        let insertion_order = state.insertion_counter;
        state.insertion_counter += 1;

        state.heap.push(Job::new(job_id, priority, job_type, insertion_order));
        job_id
    }

    /// Pop the highest priority job, or `None` if the queue is empty
    pub fn pop(&self) -> Option<Job> {
        self.state.lock().heap.pop()
    }

    pub fn len(&self) -> usize {
        self.state.lock().heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().heap.is_empty()
    }

    pub fn clear(&self) {
        self.state.lock().heap.clear();
    }

    /// Remove all jobs matching a predicate
    ///
    /// Returns the number of jobs removed.
    pub fn remove_if<F>(&self, predicate: F) -> usize
    where
        F: Fn(&Job) -> bool,
    {
        let mut state = self.state.lock();
        let original_len = state.heap.len();
        let heap = std::mem::take(&mut state.heap);
        state.heap = heap.into_iter().filter(|job| !predicate(job)).collect();
        original_len - state.heap.len()
    }

    /// Whether any queued job matches a predicate
    pub fn any<F>(&self, predicate: F) -> bool
    where
        F: Fn(&Job) -> bool,
    {
        self.state.lock().heap.iter().any(predicate)
    }
}

impl Default for PriorityQueue {
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

    fn thumb(tab_id: TabId, page_index: u32) -> JobType {
        JobType::RenderThumbnail { tab_id, page_index }
    }

    #[test]
    fn test_job_priority_ordering() {
        assert!(JobPriority::Page > JobPriority::Thumbnail);
    }

    #[test]
    fn test_priority_queue_basic() {
        let queue = PriorityQueue::new();
        assert!(queue.is_empty());

        let id1 = queue.push(JobPriority::Page, page(1, 0));
        assert_eq!(queue.len(), 1);

        let job = queue.pop().unwrap();
        assert_eq!(job.id, id1);
        assert_eq!(job.priority, JobPriority::Page);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_page_jobs_before_thumbnails() {
        let queue = PriorityQueue::new();
        queue.push(JobPriority::Thumbnail, thumb(1, 0));
        queue.push(JobPriority::Thumbnail, thumb(1, 1));
        let page_id = queue.push(JobPriority::Page, page(1, 4));

        assert_eq!(queue.pop().unwrap().id, page_id);
        assert_eq!(queue.pop().unwrap().job_type.page_index(), 0);
        assert_eq!(queue.pop().unwrap().job_type.page_index(), 1);
        assert!(queue.pop().is_none());
    }

    #[test]
    fn test_fifo_within_same_priority() {
        let queue = PriorityQueue::new();
        let id1 = queue.push(JobPriority::Page, page(1, 0));
        let id2 = queue.push(JobPriority::Page, page(2, 0));
        let id3 = queue.push(JobPriority::Page, page(3, 0));

        assert_eq!(queue.pop().unwrap().id, id1);
        assert_eq!(queue.pop().unwrap().id, id2);
        assert_eq!(queue.pop().unwrap().id, id3);
    }

    #[test]
    fn test_remove_if_by_tab() {
        let queue = PriorityQueue::new();
        queue.push(JobPriority::Page, page(1, 0));
        queue.push(JobPriority::Thumbnail, thumb(1, 3));
        queue.push(JobPriority::Page, page(2, 0));

        let removed = queue.remove_if(|job| job.job_type.tab_id() == 1);
        assert_eq!(removed, 2);
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.pop().unwrap().job_type.tab_id(), 2);
    }

    #[test]
    fn test_any() {
        let queue = PriorityQueue::new();
        queue.push(JobPriority::Thumbnail, thumb(1, 3));
        assert!(queue.any(|job| job.job_type == thumb(1, 3)));
        assert!(!queue.any(|job| job.job_type == thumb(1, 4)));
    }

    #[test]
    fn test_clear() {
        let queue = PriorityQueue::default();
        queue.push(JobPriority::Page, page(1, 0));
        queue.push(JobPriority::Thumbnail, thumb(1, 0));
        queue.clear();
        assert!(queue.is_empty());
    }
}
