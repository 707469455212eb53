use crate::config::ConfigError;
use folio_engine::EngineError;
use folio_scheduler::TabId;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("{} is encrypted and needs a password", .path.display())]
    PasswordRequired { path: PathBuf },
    #[error("failed to open {}: {source}", .path.display())]
    DocumentLoad {
        path: PathBuf,
        #[source]
        source: EngineError,
    },
    #[error("failed to render page {}: {source}", .page + 1)]
    Render {
        page: u32,
        #[source]
        source: EngineError,
    },
    #[error("failed to snapshot {}: {source}", .path.display())]
    Snapshot {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to restore {}: {source}", .path.display())]
    Restore {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to reload {}: {source}", .path.display())]
    Reload {
        path: PathBuf,
        #[source]
        source: EngineError,
    },
    #[error("{label} failed: {source}")]
    Mutation {
        label: String,
        #[source]
        source: EngineError,
    },
    #[error("failed to save {}: {source}", .path.display())]
    Save {
        path: PathBuf,
        #[source]
        source: EngineError,
    },
    #[error("failed to extract text: {0}")]
    Text(#[source] EngineError),
    #[error("no tab with id {0}")]
    TabNotFound(TabId),
    #[error("no document is open")]
    NoActiveTab,
    #[error("{} changed on disk but could not be reloaded", .path.display())]
    StaleTab { path: PathBuf },
    #[error("no selectable text found on this page")]
    NoText,
    #[error("failed to start render workers: {0}")]
    Workers(#[source] std::io::Error),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl SessionError {
    /// Classify an open failure, keeping the password case distinct.
    pub(crate) fn load(path: PathBuf, source: EngineError) -> Self {
        match source {
            EngineError::PasswordRequired { .. } => Self::PasswordRequired { path },
            source => Self::DocumentLoad { path, source },
        }
    }

    pub fn is_password_required(&self) -> bool {
        matches!(self, Self::PasswordRequired { .. })
    }
}

pub type SessionResult<T> = Result<T, SessionError>;
