//! Folio Scheduler Library
//!
//! Priority job queue, render worker pool, and the completion queue that
//! carries results back to the session thread.
//!
//! Page renders run ahead of thumbnail renders; within a priority level jobs
//! run in submission order.
//!
//! # Example
//!
//! ```
//! use folio_scheduler::{run_until_idle, CompletionQueue, Job, JobExecutor, JobPriority, JobScheduler, JobType};
//! use std::sync::Arc;
//!
//! let scheduler = JobScheduler::new();
//! let completions = CompletionQueue::new();
//! let sender = completions.sender();
//!
//! let executor: JobExecutor = Arc::new(move |job: &Job| {
//!     sender.send(job.job_type.page_index());
//! });
//!
//! scheduler.submit(JobPriority::Thumbnail, JobType::RenderThumbnail { tab_id: 1, page_index: 4 });
//! scheduler.submit(JobPriority::Page, JobType::RenderPage {
//!     tab_id: 1,
//!     page_index: 0,
//!     scale: 2.0,
//!     generation: 0,
//! });
//!
//! run_until_idle(&scheduler, &executor);
//! assert_eq!(completions.drain(), vec![0, 4]);
//! ```

mod completion;
mod priority;
mod scheduler;
mod worker;

// Re-export public API
pub use completion::{CompletionQueue, CompletionSender};
pub use priority::{Job, JobId, JobPriority, JobType, TabId};
pub use scheduler::{JobScheduler, SchedulerStats};
pub use worker::{run_until_idle, JobExecutor, WorkerPool, WorkerPoolConfig};
