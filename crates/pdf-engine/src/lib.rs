//! Document access for the folio session engine.
//!
//! The session never parses PDF itself. It talks to a [`DocumentHandle`],
//! obtained from a [`DocumentOpener`], and rasterizes through an explicitly
//! supplied [`RenderBackend`].

mod backend;
mod document;
mod error;
mod raster;

#[cfg(any(test, feature = "test-support"))]
pub mod mock;

pub use backend::{dpi_for_scale, BackendRequest, PopplerBackend, RenderBackend, MAX_DPI, MIN_DPI};
pub use document::{
    share, DocumentHandle, DocumentOpener, PageSize, PdfDocument, PdfOpener, SharedDocument,
};
pub use error::EngineError;
pub use raster::{
    blank_page, thumbnail_placeholder, PageImage, RgbaImage, LETTER_HEIGHT_PT, LETTER_WIDTH_PT,
};

use std::sync::Arc;

/// Opener backed by poppler when its tools are installed, blank pages otherwise.
pub fn default_opener() -> PdfOpener {
    let backend = PopplerBackend::detect().map(|backend| Arc::new(backend) as Arc<dyn RenderBackend>);
    if backend.is_none() {
        tracing::warn!("pdftoppm not found, pages will render as blanks");
    }
    PdfOpener::new(backend)
}
