//! User intents as data, for front ends that queue or replay input.

use crate::error::SessionResult;
use crate::session::Session;
use crate::tab::HistoryOutcome;
use folio_cache::DisplaySize;
use folio_scheduler::TabId;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Open(PathBuf),
    OpenWithPassword { path: PathBuf, password: String },
    Activate(TabId),
    Close(TabId),
    GoToPage(u32),
    NextPage,
    PreviousPage,
    ZoomIn,
    ZoomOut,
    SetZoom(f32),
    FitToPage,
    FitToWidth,
    SetViewport { width: f32, height: f32 },
    Undo,
    Redo,
    Reload,
    Save,
    SaveAs(PathBuf),
    SelectAll,
    CopySelection,
    RequestThumbnail(u32),
}

#[derive(Debug, Clone, PartialEq)]
pub enum CommandOutcome {
    /// A tab was opened
    Opened(TabId),
    /// New display size after a zoom change, if an image is cached
    Zoomed(Option<DisplaySize>),
    History(HistoryOutcome),
    /// Selected or copied text
    Text(String),
    /// Whether a background job was queued
    Scheduled(bool),
    Done,
}

impl Session {
    /// Apply one command to the session.
    pub fn dispatch(&mut self, command: Command) -> SessionResult<CommandOutcome> {
        tracing::trace!(?command, "dispatch");
        let outcome = match command {
            Command::Open(path) => CommandOutcome::Opened(self.open_file(path)?),
            Command::OpenWithPassword { path, password } => {
                CommandOutcome::Opened(self.open_with_password(path, &password)?)
            }
            Command::Activate(id) => {
                self.activate_tab(id)?;
                CommandOutcome::Done
            }
            Command::Close(id) => {
                self.close_tab(id)?;
                CommandOutcome::Done
            }
            Command::GoToPage(page) => {
                self.go_to_page(page)?;
                CommandOutcome::Done
            }
            Command::NextPage => {
                self.next_page()?;
                CommandOutcome::Done
            }
            Command::PreviousPage => {
                self.previous_page()?;
                CommandOutcome::Done
            }
            Command::ZoomIn => CommandOutcome::Zoomed(self.zoom_in()?),
            Command::ZoomOut => CommandOutcome::Zoomed(self.zoom_out()?),
            Command::SetZoom(zoom) => CommandOutcome::Zoomed(self.set_zoom(zoom)?),
            Command::FitToPage => CommandOutcome::Zoomed(self.fit_to_page()?),
            Command::FitToWidth => CommandOutcome::Zoomed(self.fit_to_width()?),
            Command::SetViewport { width, height } => {
                self.set_viewport(width, height)?;
                CommandOutcome::Done
            }
            Command::Undo => CommandOutcome::History(self.undo()?),
            Command::Redo => CommandOutcome::History(self.redo()?),
            Command::Reload => {
                self.reload()?;
                CommandOutcome::Done
            }
            Command::Save => {
                self.save()?;
                CommandOutcome::Done
            }
            Command::SaveAs(path) => {
                self.save_as(path)?;
                CommandOutcome::Done
            }
            Command::SelectAll => CommandOutcome::Text(self.select_all()?.text.clone()),
            Command::CopySelection => CommandOutcome::Text(self.copy_selection()?),
            Command::RequestThumbnail(page) => {
                CommandOutcome::Scheduled(self.request_thumbnail(page)?)
            }
        };
        Ok(outcome)
    }
}
