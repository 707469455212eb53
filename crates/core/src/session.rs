//! Session: the ordered set of open tabs and the single owner of their state.
//!
//! Everything that changes tab state runs on the thread that owns the
//! [`Session`]. Render workers only read documents; their results come back
//! through a completion queue and are committed by
//! [`Session::process_completions`].

use crate::config::SessionConfig;
use crate::error::{SessionError, SessionResult};
use crate::snapshot::SnapshotStore;
use crate::tab::{HistoryOutcome, Selection, Tab};
use folio_cache::{CommitOutcome, DisplaySize, RenderTicket, ThumbnailCache, Viewport};
use folio_engine::{
    share, DocumentHandle, DocumentOpener, EngineError, PageImage, RgbaImage, SharedDocument,
};
use folio_scheduler::{
    run_until_idle, CompletionQueue, CompletionSender, Job, JobExecutor, JobPriority, JobScheduler,
    JobType, TabId, WorkerPool, WorkerPoolConfig,
};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// What workers need to reach a tab without touching the tab itself.
#[derive(Clone)]
struct TabResources {
    document: SharedDocument,
    thumbnails: Arc<ThumbnailCache>,
}

type Registry = Arc<RwLock<HashMap<TabId, TabResources>>>;

/// A worker result on its way back to the session thread.
#[derive(Debug)]
enum Completion {
    Page {
        tab_id: TabId,
        ticket: RenderTicket,
        result: Result<RgbaImage, EngineError>,
    },
    Thumbnail {
        tab_id: TabId,
        page: u32,
    },
}

/// Something the presentation layer should react to.
#[derive(Debug)]
pub enum SessionEvent {
    /// A new base image is cached for the tab's current page
    PageRendered { tab_id: TabId, page: u32 },

    /// A render finished after the user moved on; nothing changed
    RenderDiscarded { tab_id: TabId, page: u32 },

    /// Rendering failed; the previous image is still shown
    RenderFailed { tab_id: TabId, error: SessionError },

    /// A thumbnail is now cached
    ThumbnailReady { tab_id: TabId, page: u32 },
}

/// Snapshot of what the active tab should display.
#[derive(Debug, Clone)]
pub struct ViewState {
    pub tab_id: TabId,
    pub title: String,
    /// Current page (0-based)
    pub page: u32,
    pub page_count: u32,
    pub zoom: f32,
    pub image: Option<PageImage>,
    pub display_size: Option<DisplaySize>,
    pub rendering: bool,
    pub can_undo: bool,
    pub can_redo: bool,
    pub stale: bool,
}

impl ViewState {
    /// "Page 3 of 10"
    pub fn page_label(&self) -> String {
        format!("Page {} of {}", self.page + 1, self.page_count)
    }

    pub fn zoom_percent(&self) -> u32 {
        (self.zoom * 100.0).round() as u32
    }
}

pub struct Session {
    // Declared first so workers stop before anything they reach is dropped.
    pool: Option<WorkerPool>,
    config: SessionConfig,
    opener: Arc<dyn DocumentOpener>,
    snapshots: SnapshotStore,
    tabs: Vec<Tab>,
    active: Option<TabId>,
    next_tab_id: TabId,
    selection: Selection,
    registry: Registry,
    scheduler: Arc<JobScheduler>,
    executor: JobExecutor,
    completions: CompletionQueue<Completion>,
}

impl Session {
    /// Create an empty session
    ///
    /// Starts `config.worker_threads` render workers. With zero workers jobs
    /// only run when [`Session::run_queued_jobs`] is called.
    pub fn new(config: SessionConfig, opener: Arc<dyn DocumentOpener>) -> SessionResult<Self> {
        config.validate()?;

        let registry: Registry = Arc::default();
        let scheduler = Arc::new(JobScheduler::new());
        let completions = CompletionQueue::new();
        let executor = render_executor(registry.clone(), completions.sender());

        let pool = if config.worker_threads > 0 {
            let pool_config = WorkerPoolConfig::new(config.worker_threads)
                .with_poll_interval(Duration::from_millis(config.poll_interval_ms));
            let pool = WorkerPool::new(scheduler.clone(), executor.clone(), pool_config)
                .map_err(SessionError::Workers)?;
            Some(pool)
        } else {
            None
        };

        tracing::info!(workers = config.worker_threads, "session started");

        Ok(Self {
            pool,
            snapshots: SnapshotStore::new(config.snapshot_dir.clone()),
            config,
            opener,
            tabs: Vec::new(),
            active: None,
            next_tab_id: 1,
            selection: Selection::default(),
            registry,
            scheduler,
            executor,
            completions,
        })
    }

    /// Session using the on-disk config and the default PDF opener.
    pub fn from_environment() -> SessionResult<Self> {
        let config = SessionConfig::load_or_default()?;
        Self::new(config, Arc::new(folio_engine::default_opener()))
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn scheduler(&self) -> &Arc<JobScheduler> {
        &self.scheduler
    }

    pub fn has_workers(&self) -> bool {
        self.pool.is_some()
    }

    // ---- tabs -----------------------------------------------------------

    /// Open `path` in a new tab and make it active.
    ///
    /// Encrypted files fail with [`SessionError::PasswordRequired`]; retry
    /// with [`Session::open_with_password`].
    pub fn open_file(&mut self, path: impl AsRef<Path>) -> SessionResult<TabId> {
        let path = path.as_ref();
        let document = self
            .opener
            .open(path)
            .map_err(|err| SessionError::load(path.to_path_buf(), err))?;
        Ok(self.add_tab(document))
    }

    pub fn open_with_password(&mut self, path: impl AsRef<Path>, password: &str) -> SessionResult<TabId> {
        let path = path.as_ref();
        let document = self
            .opener
            .open_with_password(path, password)
            .map_err(|err| SessionError::load(path.to_path_buf(), err))?;
        Ok(self.add_tab(document))
    }

    fn add_tab(&mut self, document: Box<dyn DocumentHandle>) -> TabId {
        let id = self.next_tab_id;
        self.next_tab_id += 1;

        let mut tab = Tab::new(id, share(document), &self.config);
        self.registry.write().insert(
            id,
            TabResources { document: tab.document().clone(), thumbnails: tab.thumbnails().clone() },
        );

        let ticket = tab.render_cache_mut().request_render();
        tracing::info!(tab = id, title = tab.title(), pages = tab.page_count(), "document opened");

        self.stash_selection();
        self.tabs.push(tab);
        self.active = Some(id);
        self.selection = Selection::default();
        submit_page(&self.scheduler, id, ticket);
        id
    }

    pub fn tabs(&self) -> &[Tab] {
        &self.tabs
    }

    pub fn tab_ids(&self) -> Vec<TabId> {
        self.tabs.iter().map(Tab::id).collect()
    }

    pub fn tab(&self, id: TabId) -> Option<&Tab> {
        self.tabs.iter().find(|tab| tab.id() == id)
    }

    pub fn active_tab_id(&self) -> Option<TabId> {
        self.active
    }

    pub fn active_tab(&self) -> Option<&Tab> {
        self.active.and_then(|id| self.tab(id))
    }

    /// Switch the view to another tab. Never triggers a render.
    pub fn activate_tab(&mut self, id: TabId) -> SessionResult<()> {
        let index = self.index_of(id)?;
        if self.active == Some(id) {
            return Ok(());
        }

        self.stash_selection();
        self.selection = self.tabs[index].selection().clone();
        self.active = Some(id);
        tracing::debug!(tab = id, "tab activated");
        Ok(())
    }

    /// Close a tab, deleting its undo snapshots and dropping its caches.
    pub fn close_tab(&mut self, id: TabId) -> SessionResult<()> {
        let index = self.index_of(id)?;
        let mut tab = self.tabs.remove(index);

        let cancelled = self.scheduler.cancel_tab_jobs(id);
        self.registry.write().remove(&id);
        tab.close();
        tracing::info!(tab = id, cancelled, "tab closed");

        if self.active == Some(id) {
            match self.tabs.get(index).or_else(|| self.tabs.last()) {
                Some(next) => {
                    self.active = Some(next.id());
                    self.selection = next.selection().clone();
                }
                None => {
                    self.active = None;
                    self.selection = Selection::default();
                }
            }
        }
        Ok(())
    }

    fn index_of(&self, id: TabId) -> SessionResult<usize> {
        self.tabs.iter().position(|tab| tab.id() == id).ok_or(SessionError::TabNotFound(id))
    }

    fn active_index(&self) -> SessionResult<usize> {
        let id = self.active.ok_or(SessionError::NoActiveTab)?;
        self.index_of(id)
    }

    fn active_mut(&mut self) -> SessionResult<&mut Tab> {
        let index = self.active_index()?;
        Ok(&mut self.tabs[index])
    }

    /// Copy the view selection back into the active tab.
    fn stash_selection(&mut self) {
        let selection = std::mem::take(&mut self.selection);
        if let Ok(tab) = self.active_mut() {
            tab.set_selection(selection);
        }
    }

    // ---- viewer ---------------------------------------------------------

    pub fn current_page(&self) -> Option<u32> {
        self.active_tab().map(|tab| tab.render_cache().current_page())
    }

    pub fn go_to_page(&mut self, page: u32) -> SessionResult<()> {
        let tab = self.active_mut()?;
        let ticket = tab.go_to_page(page);
        let id = tab.id();
        submit_page(&self.scheduler, id, ticket);
        Ok(())
    }

    pub fn next_page(&mut self) -> SessionResult<()> {
        let tab = self.active_mut()?;
        let ticket = tab.next_page();
        let id = tab.id();
        submit_page(&self.scheduler, id, ticket);
        Ok(())
    }

    pub fn previous_page(&mut self) -> SessionResult<()> {
        let tab = self.active_mut()?;
        let ticket = tab.previous_page();
        let id = tab.id();
        submit_page(&self.scheduler, id, ticket);
        Ok(())
    }

    pub fn zoom_in(&mut self) -> SessionResult<Option<DisplaySize>> {
        Ok(self.active_mut()?.render_cache_mut().zoom_in())
    }

    pub fn zoom_out(&mut self) -> SessionResult<Option<DisplaySize>> {
        Ok(self.active_mut()?.render_cache_mut().zoom_out())
    }

    pub fn set_zoom(&mut self, zoom: f32) -> SessionResult<Option<DisplaySize>> {
        Ok(self.active_mut()?.render_cache_mut().apply_zoom(zoom))
    }

    pub fn fit_to_page(&mut self) -> SessionResult<Option<DisplaySize>> {
        Ok(self.active_mut()?.fit_to_page())
    }

    pub fn fit_to_width(&mut self) -> SessionResult<Option<DisplaySize>> {
        Ok(self.active_mut()?.fit_to_width())
    }

    /// Record the size of the area pages are shown in, for the fit modes.
    pub fn set_viewport(&mut self, width: f32, height: f32) -> SessionResult<()> {
        self.active_mut()?.set_viewport(Viewport::new(width, height));
        Ok(())
    }

    /// What the active tab should display right now.
    pub fn view(&self) -> Option<ViewState> {
        let tab = self.active_tab()?;
        let cache = tab.render_cache();
        Some(ViewState {
            tab_id: tab.id(),
            title: tab.title().to_owned(),
            page: cache.current_page(),
            page_count: tab.page_count(),
            zoom: cache.zoom(),
            image: cache.image().cloned(),
            display_size: cache.display_size(),
            rendering: cache.is_rendering(),
            can_undo: tab.can_undo(),
            can_redo: tab.can_redo(),
            stale: tab.is_stale(),
        })
    }

    // ---- editing --------------------------------------------------------

    /// Apply a file-level edit to the active tab as one undoable step.
    pub fn apply_edit<F>(&mut self, label: &str, edit: F) -> SessionResult<()>
    where
        F: FnOnce(&mut dyn DocumentHandle) -> Result<(), EngineError>,
    {
        let index = self.active_index()?;
        let tab = &mut self.tabs[index];
        let ticket = tab.apply_edit(&self.snapshots, label, edit)?;
        submit_page(&self.scheduler, tab.id(), ticket);
        Ok(())
    }

    pub fn can_undo(&self) -> bool {
        self.active_tab().is_some_and(Tab::can_undo)
    }

    pub fn can_redo(&self) -> bool {
        self.active_tab().is_some_and(Tab::can_redo)
    }

    pub fn undo(&mut self) -> SessionResult<HistoryOutcome> {
        let index = self.active_index()?;
        let tab = &mut self.tabs[index];
        let (outcome, ticket) = tab.undo(&self.snapshots)?;
        submit_page(&self.scheduler, tab.id(), ticket);
        Ok(outcome)
    }

    pub fn redo(&mut self) -> SessionResult<HistoryOutcome> {
        let index = self.active_index()?;
        let tab = &mut self.tabs[index];
        let (outcome, ticket) = tab.redo(&self.snapshots)?;
        submit_page(&self.scheduler, tab.id(), ticket);
        Ok(outcome)
    }

    /// Re-read the active document from disk, clearing a stale mark.
    pub fn reload(&mut self) -> SessionResult<()> {
        let tab = self.active_mut()?;
        let page = tab.render_cache().current_page();
        let ticket = tab.reload_at(page)?;
        let id = tab.id();
        submit_page(&self.scheduler, id, ticket);
        Ok(())
    }

    pub fn save(&mut self) -> SessionResult<()> {
        self.active_mut()?.save()
    }

    pub fn save_as(&mut self, path: impl AsRef<Path>) -> SessionResult<()> {
        let path = path.as_ref();
        let tab = self.active_mut()?;
        tab.save_as(path)?;
        tracing::info!(tab = tab.id(), path = %path.display(), "saved as");
        Ok(())
    }

    // ---- selection ------------------------------------------------------

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn clear_selection(&mut self) {
        self.selection = Selection::default();
    }

    /// Select all text on the current page.
    pub fn select_all(&mut self) -> SessionResult<&Selection> {
        let tab = &self.tabs[self.active_index()?];
        let page = tab.render_cache().current_page();
        let text = tab.extract_text(page)?;

        if text.trim().is_empty() {
            self.selection = Selection::default();
            return Err(SessionError::NoText);
        }
        self.selection = Selection { text, page: Some(page) };
        Ok(&self.selection)
    }

    /// Text to put on the clipboard, selecting the current page if needed.
    pub fn copy_selection(&mut self) -> SessionResult<String> {
        let page = self.tabs[self.active_index()?].render_cache().current_page();
        if self.selection.is_empty() || self.selection.page != Some(page) {
            self.select_all()?;
        }
        Ok(self.selection.text.clone())
    }

    // ---- thumbnails -----------------------------------------------------

    /// Thumbnail of `page` in the active tab, rendering it on a miss.
    ///
    /// A miss renders on the calling thread. Thumbnail strips and lists
    /// should use [`Session::request_thumbnail`] and wait for
    /// [`SessionEvent::ThumbnailReady`] instead.
    pub fn thumbnail(&self, page: u32) -> SessionResult<PageImage> {
        let tab = self.active_tab().ok_or(SessionError::NoActiveTab)?;
        Ok(tab.thumbnails().get_thumbnail(page))
    }

    /// Warm the thumbnail for `page` in the background.
    ///
    /// Returns `false` if it is already cached or already queued.
    pub fn request_thumbnail(&mut self, page: u32) -> SessionResult<bool> {
        let tab = self.active_tab().ok_or(SessionError::NoActiveTab)?;
        if tab.thumbnails().contains(page) {
            return Ok(false);
        }
        let job = JobType::RenderThumbnail { tab_id: tab.id(), page_index: page };
        Ok(self.scheduler.submit_unique(JobPriority::Thumbnail, job).is_some())
    }

    // ---- completions ----------------------------------------------------

    /// Run every queued job on this thread. Returns how many ran.
    pub fn run_queued_jobs(&self) -> usize {
        run_until_idle(&self.scheduler, &self.executor)
    }

    /// Commit every finished job and report what changed.
    pub fn process_completions(&mut self) -> Vec<SessionEvent> {
        self.completions
            .drain()
            .into_iter()
            .filter_map(|completion| self.commit(completion))
            .collect()
    }

    /// Wait up to `timeout` for at least one job to finish, then commit.
    pub fn wait_for_completions(&mut self, timeout: Duration) -> Vec<SessionEvent> {
        let Some(first) = self.completions.next_timeout(timeout) else {
            return Vec::new();
        };
        let mut events: Vec<_> = self.commit(first).into_iter().collect();
        events.extend(self.process_completions());
        events
    }

    fn commit(&mut self, completion: Completion) -> Option<SessionEvent> {
        match completion {
            Completion::Page { tab_id, ticket, result } => {
                // Results for closed tabs are dropped.
                let tab = self.tabs.iter_mut().find(|tab| tab.id() == tab_id)?;
                let commit = tab.render_cache_mut().complete(ticket, result);
                submit_page(&self.scheduler, tab_id, commit.follow_up);

                let event = match commit.outcome {
                    CommitOutcome::Applied => {
                        SessionEvent::PageRendered { tab_id, page: ticket.page }
                    }
                    CommitOutcome::Stale => {
                        SessionEvent::RenderDiscarded { tab_id, page: ticket.page }
                    }
                    CommitOutcome::Failed(source) => {
                        tracing::warn!(tab = tab_id, page = ticket.page, error = %source, "render failed");
                        SessionEvent::RenderFailed {
                            tab_id,
                            error: SessionError::Render { page: ticket.page, source },
                        }
                    }
                };
                Some(event)
            }
            Completion::Thumbnail { tab_id, page } => {
                self.tab(tab_id)?;
                Some(SessionEvent::ThumbnailReady { tab_id, page })
            }
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if let Some(pool) = self.pool.take() {
            pool.shutdown();
        }
        for tab in &mut self.tabs {
            tab.close();
        }
    }
}

fn submit_page(scheduler: &JobScheduler, tab_id: TabId, ticket: Option<RenderTicket>) {
    let Some(ticket) = ticket else {
        return;
    };
    scheduler.submit(
        JobPriority::Page,
        JobType::RenderPage {
            tab_id,
            page_index: ticket.page,
            scale: ticket.scale,
            generation: ticket.generation,
        },
    );
}

/// Job executor shared by the worker pool and [`Session::run_queued_jobs`].
fn render_executor(registry: Registry, sender: CompletionSender<Completion>) -> JobExecutor {
    Arc::new(move |job: &Job| {
        let tab_id = job.job_type.tab_id();
        let resources = registry.read().get(&tab_id).cloned();
        let Some(resources) = resources else {
            tracing::debug!(tab = tab_id, "job for closed tab skipped");
            return;
        };

        match job.job_type {
            JobType::RenderPage { page_index, scale, generation, .. } => {
                // A panic still reports, so the page does not stay in flight.
                let result = panic::catch_unwind(AssertUnwindSafe(|| {
                    resources.document.read().render_page(page_index, scale)
                }))
                .unwrap_or_else(|_| Err(EngineError::Backend("renderer panicked".to_owned())));
                let ticket = RenderTicket { page: page_index, scale, generation };
                sender.send(Completion::Page { tab_id, ticket, result });
            }
            JobType::RenderThumbnail { page_index, .. } => {
                let rendered = panic::catch_unwind(AssertUnwindSafe(|| {
                    resources.thumbnails.get_thumbnail(page_index);
                }));
                if rendered.is_err() {
                    tracing::error!(tab = tab_id, page = page_index, "thumbnail render panicked");
                }
                sender.send(Completion::Thumbnail { tab_id, page: page_index });
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_engine::mock::MockOpener;
    use std::fs;

    fn inline_session(opener: &MockOpener, dir: &Path) -> Session {
        let config = SessionConfig::default()
            .with_worker_threads(0)
            .with_snapshot_dir(dir.join("snaps"));
        Session::new(config, Arc::new(opener.clone())).unwrap()
    }

    fn pump(session: &mut Session) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        while session.run_queued_jobs() > 0 {
            events.extend(session.process_completions());
        }
        events.extend(session.process_completions());
        events
    }

    #[test]
    fn test_open_renders_first_page() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.pdf");
        fs::write(&path, b"one").unwrap();

        let opener = MockOpener::new(3);
        let mut session = inline_session(&opener, dir.path());
        let id = session.open_file(&path).unwrap();

        assert_eq!(session.active_tab_id(), Some(id));
        assert!(session.view().unwrap().rendering);

        let events = pump(&mut session);
        assert!(matches!(events[..], [SessionEvent::PageRendered { page: 0, .. }]));

        let view = session.view().unwrap();
        assert!(!view.rendering);
        assert_eq!(view.page_label(), "Page 1 of 3");
        assert_eq!(view.title, "a.pdf");
        assert_eq!(opener.probe().renders(), 1);
    }

    #[test]
    fn test_page_dropped_while_in_flight_is_rendered_after() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.pdf");
        fs::write(&path, b"one").unwrap();

        let opener = MockOpener::new(5);
        let mut session = inline_session(&opener, dir.path());
        session.open_file(&path).unwrap();

        // Page 0 is in flight; this trigger is dropped by single-flight.
        session.go_to_page(3).unwrap();
        assert_eq!(session.scheduler().pending_jobs(), 1);

        let events = pump(&mut session);
        assert!(events.iter().any(|e| matches!(e, SessionEvent::RenderDiscarded { page: 0, .. })));
        assert!(events.iter().any(|e| matches!(e, SessionEvent::PageRendered { page: 3, .. })));
        assert_eq!(session.active_tab().unwrap().render_cache().cached_page(), Some(3));
    }

    #[test]
    fn test_render_failure_keeps_previous_image() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.pdf");
        fs::write(&path, b"one").unwrap();

        let opener = MockOpener::new(3);
        let mut session = inline_session(&opener, dir.path());
        session.open_file(&path).unwrap();
        pump(&mut session);

        opener.probe().set_fail_render(true);
        session.next_page().unwrap();
        let events = pump(&mut session);

        assert!(matches!(
            events[..],
            [SessionEvent::RenderFailed { error: SessionError::Render { page: 1, .. }, .. }]
        ));
        let tab = session.active_tab().unwrap();
        assert_eq!(tab.render_cache().cached_page(), Some(0));
        assert!(!tab.render_cache().is_rendering());
    }

    #[test]
    fn test_render_panic_reports_failure_and_releases_page() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.pdf");
        fs::write(&path, b"one").unwrap();

        let opener = MockOpener::new(3);
        let mut session = inline_session(&opener, dir.path());
        session.open_file(&path).unwrap();
        pump(&mut session);

        opener.probe().set_panic_render(true);
        session.next_page().unwrap();
        let events = pump(&mut session);
        assert!(matches!(
            events[..],
            [SessionEvent::RenderFailed { error: SessionError::Render { page: 1, .. }, .. }]
        ));
        assert!(!session.active_tab().unwrap().render_cache().is_rendering());

        opener.probe().set_panic_render(false);
        session.next_page().unwrap();
        let events = pump(&mut session);
        assert!(events.iter().any(|e| matches!(e, SessionEvent::PageRendered { page: 2, .. })));
        assert_eq!(session.active_tab().unwrap().render_cache().cached_page(), Some(2));
    }

    #[test]
    fn test_completion_for_closed_tab_is_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.pdf");
        fs::write(&path, b"one").unwrap();

        let opener = MockOpener::new(3);
        let mut session = inline_session(&opener, dir.path());
        let id = session.open_file(&path).unwrap();
        session.close_tab(id).unwrap();

        assert_eq!(session.run_queued_jobs(), 0);
        assert!(session.process_completions().is_empty());
        assert_eq!(opener.probe().renders(), 0);
    }

    #[test]
    fn test_request_thumbnail_is_deduplicated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.pdf");
        fs::write(&path, b"one").unwrap();

        let opener = MockOpener::new(3);
        let mut session = inline_session(&opener, dir.path());
        let id = session.open_file(&path).unwrap();
        pump(&mut session);

        assert!(session.request_thumbnail(2).unwrap());
        assert!(!session.request_thumbnail(2).unwrap());

        let events = pump(&mut session);
        assert!(matches!(events[..], [SessionEvent::ThumbnailReady { tab_id, page: 2 }] if tab_id == id));
        assert!(!session.request_thumbnail(2).unwrap());
    }

    #[test]
    fn test_viewer_calls_without_tab() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = inline_session(&MockOpener::new(1), dir.path());

        assert!(session.view().is_none());
        assert!(matches!(session.next_page(), Err(SessionError::NoActiveTab)));
        assert!(matches!(session.undo(), Err(SessionError::NoActiveTab)));
        assert!(matches!(session.activate_tab(9), Err(SessionError::TabNotFound(9))));
    }

    #[test]
    fn test_workers_render_in_background() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.pdf");
        fs::write(&path, b"one").unwrap();

        let opener = MockOpener::new(2);
        let config = SessionConfig::default()
            .with_worker_threads(2)
            .with_snapshot_dir(dir.path().join("snaps"));
        let mut session = Session::new(config, Arc::new(opener.clone())).unwrap();
        assert!(session.has_workers());

        session.open_file(&path).unwrap();
        let mut rendered = false;
        for _ in 0..200 {
            let events = session.wait_for_completions(Duration::from_millis(25));
            if events.iter().any(|e| matches!(e, SessionEvent::PageRendered { .. })) {
                rendered = true;
                break;
            }
        }
        assert!(rendered);
        assert!(session.view().unwrap().image.is_some());
    }
}
