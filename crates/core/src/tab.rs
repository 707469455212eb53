//! One open document and everything cached for it.
//!
//! A tab owns its render cache, thumbnail cache and undo history. All of the
//! file-level edit protocol lives here: snapshot, mutate, reload, record.

use crate::config::SessionConfig;
use crate::error::{SessionError, SessionResult};
use crate::snapshot::SnapshotStore;
use crate::undo::{discard, UndoManager};
use folio_cache::{DisplaySize, RenderCache, RenderTicket, ThumbnailCache, Viewport};
use folio_engine::{DocumentHandle, EngineError, SharedDocument};
use folio_scheduler::TabId;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Text selected in a tab, and the page it came from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    pub text: String,
    pub page: Option<u32>,
}

impl Selection {
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Result of an undo or redo request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryOutcome {
    Applied,
    NothingToUndo,
    NothingToRedo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Undo,
    Redo,
}

/// Display title for a document path: its file name, or "Untitled".
pub fn tab_title(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "Untitled".to_owned())
}

pub struct Tab {
    id: TabId,
    title: String,
    document: SharedDocument,
    render: RenderCache,
    thumbnails: Arc<ThumbnailCache>,
    undo: UndoManager,
    selection: Selection,
    viewport: Viewport,
    stale: bool,
}

impl Tab {
    pub(crate) fn new(id: TabId, document: SharedDocument, config: &SessionConfig) -> Self {
        let title = tab_title(document.read().path());
        let thumbnails = Arc::new(ThumbnailCache::new(config.thumbnail_scale));
        thumbnails.set_document(Some(document.clone()));

        Self {
            id,
            title,
            document,
            render: RenderCache::new(config.base_scale, config.zoom_limits(), config.default_zoom),
            thumbnails,
            undo: UndoManager::new(config.undo_depth),
            selection: Selection::default(),
            viewport: config.viewport(),
            stale: false,
        }
    }

    pub fn id(&self) -> TabId {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn path(&self) -> PathBuf {
        self.document.read().path().to_path_buf()
    }

    pub fn page_count(&self) -> u32 {
        self.document.read().page_count()
    }

    pub fn document(&self) -> &SharedDocument {
        &self.document
    }

    pub fn render_cache(&self) -> &RenderCache {
        &self.render
    }

    pub(crate) fn render_cache_mut(&mut self) -> &mut RenderCache {
        &mut self.render
    }

    pub fn thumbnails(&self) -> &Arc<ThumbnailCache> {
        &self.thumbnails
    }

    pub fn undo_manager(&self) -> &UndoManager {
        &self.undo
    }

    pub fn can_undo(&self) -> bool {
        self.undo.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.undo.can_redo()
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub(crate) fn set_selection(&mut self, selection: Selection) {
        self.selection = selection;
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub(crate) fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    pub(crate) fn fit_to_page(&mut self) -> Option<DisplaySize> {
        let viewport = self.viewport;
        self.render.fit_to_page(viewport)
    }

    pub(crate) fn fit_to_width(&mut self) -> Option<DisplaySize> {
        let viewport = self.viewport;
        self.render.fit_to_width(viewport)
    }

    /// Whether the file changed on disk and could not be reloaded.
    pub fn is_stale(&self) -> bool {
        self.stale
    }

    pub(crate) fn go_to_page(&mut self, page: u32) -> Option<RenderTicket> {
        let page_count = self.page_count();
        self.render.go_to_page(page, page_count)
    }

    pub(crate) fn next_page(&mut self) -> Option<RenderTicket> {
        let page = self.render.current_page().saturating_add(1);
        self.go_to_page(page)
    }

    pub(crate) fn previous_page(&mut self) -> Option<RenderTicket> {
        let page = self.render.current_page().checked_sub(1)?;
        self.go_to_page(page)
    }

    /// Run a mutating edit under the snapshot protocol
    ///
    /// 1. Snapshot the file. Failure aborts before anything changes.
    /// 2. Apply `edit`. Failure deletes the snapshot.
    /// 3. Reload. Failure deletes the snapshot and marks the tab stale.
    /// 4. Record the snapshot as an undo step and refresh both caches.
    pub(crate) fn apply_edit<F>(
        &mut self,
        store: &SnapshotStore,
        label: &str,
        edit: F,
    ) -> SessionResult<Option<RenderTicket>>
    where
        F: FnOnce(&mut dyn DocumentHandle) -> Result<(), EngineError>,
    {
        if self.stale {
            return Err(SessionError::StaleTab { path: self.path() });
        }

        let path = self.path();
        let page = self.render.current_page();
        let snapshot = store
            .create(&path)
            .map_err(|source| SessionError::Snapshot { path: path.clone(), source })?;

        {
            let mut document = self.document.write();
            if let Err(source) = edit(&mut **document) {
                discard(snapshot);
                return Err(SessionError::Mutation { label: label.to_owned(), source });
            }
        }

        let ticket = match self.reload_at(page) {
            Ok(ticket) => ticket,
            Err(err) => {
                discard(snapshot);
                return Err(err);
            }
        };

        self.undo.push_undo(snapshot);
        tracing::info!(tab = self.id, label, "edit applied");
        Ok(ticket)
    }

    pub(crate) fn undo(&mut self, store: &SnapshotStore) -> SessionResult<(HistoryOutcome, Option<RenderTicket>)> {
        self.step_history(store, Direction::Undo)
    }

    pub(crate) fn redo(&mut self, store: &SnapshotStore) -> SessionResult<(HistoryOutcome, Option<RenderTicket>)> {
        self.step_history(store, Direction::Redo)
    }

    fn step_history(
        &mut self,
        store: &SnapshotStore,
        direction: Direction,
    ) -> SessionResult<(HistoryOutcome, Option<RenderTicket>)> {
        let (available, empty) = match direction {
            Direction::Undo => (self.undo.can_undo(), HistoryOutcome::NothingToUndo),
            Direction::Redo => (self.undo.can_redo(), HistoryOutcome::NothingToRedo),
        };
        if !available {
            return Ok((empty, None));
        }

        let path = self.path();
        let page = self.render.current_page();
        let current = store
            .create(&path)
            .map_err(|source| SessionError::Snapshot { path: path.clone(), source })?;

        let popped = match direction {
            Direction::Undo => self.undo.pop_undo(),
            Direction::Redo => self.undo.pop_redo(),
        };
        let Some(target) = popped else {
            discard(current);
            return Ok((empty, None));
        };

        if let Err(source) = target.restore_to(&path) {
            // The popped entry goes back where it came from; nothing is lost.
            match direction {
                Direction::Undo => self.undo.push_undo_keep_redo(target),
                Direction::Redo => self.undo.push_redo(target),
            }
            discard(current);
            return Err(SessionError::Restore { path, source });
        }

        match direction {
            Direction::Undo => self.undo.push_redo(current),
            // Redo records a new undo step, which clears the redo stack.
            Direction::Redo => self.undo.push_undo(current),
        }
        discard(target);

        let ticket = self.reload_at(page)?;
        tracing::info!(tab = self.id, ?direction, "history step applied");
        Ok((HistoryOutcome::Applied, ticket))
    }

    /// Re-read the document and return to `page`, invalidating both caches.
    pub(crate) fn reload_at(&mut self, page: u32) -> SessionResult<Option<RenderTicket>> {
        let reloaded = self.document.write().reload();
        if let Err(source) = reloaded {
            self.stale = true;
            tracing::warn!(tab = self.id, error = %source, "reload failed, tab is stale");
            return Err(SessionError::Reload { path: self.path(), source });
        }
        self.stale = false;

        let page_count = self.page_count();
        self.render.invalidate();
        self.render.restore_page(page, page_count);
        self.thumbnails.invalidate();
        Ok(self.render.request_render())
    }

    pub(crate) fn save(&mut self) -> SessionResult<()> {
        let path = self.path();
        self.document.write().save().map_err(|source| SessionError::Save { path, source })
    }

    /// Write to `path` and make it the tab's file. Undo history is dropped
    /// since its snapshots belong to the old file.
    pub(crate) fn save_as(&mut self, path: &Path) -> SessionResult<()> {
        self.document
            .write()
            .save_as(path)
            .map_err(|source| SessionError::Save { path: path.to_path_buf(), source })?;
        self.title = tab_title(path);
        self.undo.clear_all();
        Ok(())
    }

    pub(crate) fn extract_text(&self, page: u32) -> SessionResult<String> {
        self.document.read().extract_text(page).map_err(SessionError::Text)
    }

    /// Release everything the tab holds on disk and in memory.
    pub(crate) fn close(&mut self) {
        self.undo.clear_all();
        self.thumbnails.set_document(None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tab_title() {
        assert_eq!(tab_title(Path::new("/docs/report.pdf")), "report.pdf");
        assert_eq!(tab_title(Path::new("")), "Untitled");
        assert_eq!(tab_title(Path::new("/")), "Untitled");
    }

    #[test]
    fn test_selection_is_empty() {
        assert!(Selection::default().is_empty());
        assert!(Selection { text: "  \n".into(), page: Some(0) }.is_empty());
        assert!(!Selection { text: "hi".into(), page: Some(0) }.is_empty());
    }
}
