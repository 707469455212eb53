use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("PDF parse error: {0}")]
    Parse(#[from] lopdf::Error),
    #[error("{} is encrypted and needs a password", .path.display())]
    PasswordRequired { path: PathBuf },
    #[error("the supplied password was rejected")]
    InvalidPassword,
    #[error("page {page} out of range (page_count={page_count})")]
    PageOutOfRange { page: u32, page_count: u32 },
    #[error("no render backend is available")]
    BackendUnavailable,
    #[error("backend error: {0}")]
    Backend(String),
    #[error("image decode error: {0}")]
    Decode(#[from] image::ImageError),
    #[error("write failed: {0}")]
    Write(String),
}

impl EngineError {
    pub fn is_password_required(&self) -> bool {
        matches!(self, Self::PasswordRequired { .. })
    }

    pub(crate) fn check_page(page: u32, page_count: u32) -> Result<(), Self> {
        if page < page_count {
            Ok(())
        } else {
            Err(Self::PageOutOfRange { page, page_count })
        }
    }
}
