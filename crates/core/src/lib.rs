//! Folio Core Library
//!
//! Editing session engine: a set of tabs, each with a base-render cache,
//! a thumbnail cache and snapshot-based undo/redo.
//!
//! # Example
//!
//! ```no_run
//! use folio_core::{Session, SessionConfig};
//! use std::sync::Arc;
//!
//! let config = SessionConfig::default().with_worker_threads(0);
//! let mut session = Session::new(config, Arc::new(folio_engine::default_opener()))?;
//!
//! session.open_file("report.pdf")?;
//! session.run_queued_jobs();
//! for event in session.process_completions() {
//!     println!("{event:?}");
//! }
//! session.zoom_in()?;
//! # Ok::<(), folio_core::SessionError>(())
//! ```

pub mod command;
pub mod config;
pub mod error;
pub mod logging;
pub mod session;
pub mod snapshot;
pub mod tab;
pub mod undo;

pub use command::{Command, CommandOutcome};
pub use config::{ConfigError, SessionConfig, DEFAULT_UNDO_DEPTH};
pub use error::{SessionError, SessionResult};
pub use session::{Session, SessionEvent, ViewState};
pub use snapshot::{Snapshot, SnapshotStore, SNAPSHOT_PREFIX, SNAPSHOT_SUFFIX};
pub use tab::{tab_title, HistoryOutcome, Selection, Tab};
pub use undo::UndoManager;
