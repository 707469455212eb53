//! In-memory test doubles for documents and render backends.
//!
//! `MockDocument` treats its file as opaque bytes: rendering produces an
//! image whose colour is derived from those bytes, so tests can tell two
//! file states apart without a real PDF.

use crate::backend::{BackendRequest, RenderBackend};
use crate::document::{DocumentHandle, DocumentOpener};
use crate::{EngineError, RgbaImage};
use image::Rgba;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// Files whose contents start with this marker need a password to open.
pub const LOCKED_MARKER: &[u8] = b"LOCKED";

/// Counters and failure switches shared by every document a `MockOpener` produces.
#[derive(Debug, Default)]
pub struct MockProbe {
    pub renders: AtomicUsize,
    pub reloads: AtomicUsize,
    pub fail_render: AtomicBool,
    pub panic_render: AtomicBool,
    pub fail_reload: AtomicBool,
    pub fail_save: AtomicBool,
}

impl MockProbe {
    pub fn renders(&self) -> usize {
        self.renders.load(Ordering::SeqCst)
    }

    pub fn reloads(&self) -> usize {
        self.reloads.load(Ordering::SeqCst)
    }

    pub fn set_fail_render(&self, fail: bool) {
        self.fail_render.store(fail, Ordering::SeqCst);
    }

    /// Make `render_page` panic instead of returning an error.
    pub fn set_panic_render(&self, panic: bool) {
        self.panic_render.store(panic, Ordering::SeqCst);
    }

    pub fn set_fail_reload(&self, fail: bool) {
        self.fail_reload.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_save(&self, fail: bool) {
        self.fail_save.store(fail, Ordering::SeqCst);
    }
}

/// Checksum used as the red channel of rendered pages.
pub fn content_tag(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |acc, b| acc.wrapping_mul(31).wrapping_add(*b))
}

pub struct MockDocument {
    path: PathBuf,
    page_count: u32,
    contents: Vec<u8>,
    probe: Arc<MockProbe>,
}

impl MockDocument {
    pub fn open(path: &Path, page_count: u32, probe: Arc<MockProbe>) -> Result<Self, EngineError> {
        let contents = fs::read(path)?;
        Ok(Self { path: path.to_path_buf(), page_count, contents, probe })
    }

    pub fn contents(&self) -> &[u8] {
        &self.contents
    }
}

impl DocumentHandle for MockDocument {
    fn path(&self) -> &Path {
        &self.path
    }

    fn page_count(&self) -> u32 {
        self.page_count
    }

    fn save(&mut self) -> Result<(), EngineError> {
        if self.probe.fail_save.load(Ordering::SeqCst) {
            return Err(EngineError::Write("injected save failure".to_owned()));
        }
        fs::write(&self.path, &self.contents)?;
        Ok(())
    }

    fn save_as(&mut self, path: &Path) -> Result<(), EngineError> {
        if self.probe.fail_save.load(Ordering::SeqCst) {
            return Err(EngineError::Write("injected save failure".to_owned()));
        }
        fs::write(path, &self.contents)?;
        self.path = path.to_path_buf();
        Ok(())
    }

    fn reload(&mut self) -> Result<(), EngineError> {
        self.probe.reloads.fetch_add(1, Ordering::SeqCst);
        if self.probe.fail_reload.load(Ordering::SeqCst) {
            return Err(EngineError::Backend("injected reload failure".to_owned()));
        }
        self.contents = fs::read(&self.path)?;
        Ok(())
    }

    fn render_page(&self, page: u32, scale: f32) -> Result<RgbaImage, EngineError> {
        EngineError::check_page(page, self.page_count)?;
        self.probe.renders.fetch_add(1, Ordering::SeqCst);
        if self.probe.fail_render.load(Ordering::SeqCst) {
            return Err(EngineError::Backend("injected render failure".to_owned()));
        }
        if self.probe.panic_render.load(Ordering::SeqCst) {
            panic!("injected render panic on page {page}");
        }
        let width = (100.0 * scale).round().max(1.0) as u32;
        let height = (140.0 * scale).round().max(1.0) as u32;
        let pixel = Rgba([content_tag(&self.contents), page as u8, 0, 255]);
        Ok(RgbaImage::from_pixel(width, height, pixel))
    }

    fn extract_text(&self, page: u32) -> Result<String, EngineError> {
        EngineError::check_page(page, self.page_count)?;
        Ok(format!("page {}: {}", page + 1, String::from_utf8_lossy(&self.contents).trim()))
    }
}

/// Opens `MockDocument`s with a fixed page count.
#[derive(Clone)]
pub struct MockOpener {
    page_count: u32,
    password: String,
    probe: Arc<MockProbe>,
}

impl MockOpener {
    pub fn new(page_count: u32) -> Self {
        Self { page_count, password: "secret".to_owned(), probe: Arc::default() }
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = password.into();
        self
    }

    pub fn probe(&self) -> Arc<MockProbe> {
        self.probe.clone()
    }
}

impl DocumentOpener for MockOpener {
    fn open(&self, path: &Path) -> Result<Box<dyn DocumentHandle>, EngineError> {
        let doc = MockDocument::open(path, self.page_count, self.probe.clone())?;
        if doc.contents.starts_with(LOCKED_MARKER) {
            return Err(EngineError::PasswordRequired { path: path.to_path_buf() });
        }
        Ok(Box::new(doc))
    }

    fn open_with_password(
        &self,
        path: &Path,
        password: &str,
    ) -> Result<Box<dyn DocumentHandle>, EngineError> {
        let doc = MockDocument::open(path, self.page_count, self.probe.clone())?;
        if doc.contents.starts_with(LOCKED_MARKER) && password != self.password {
            return Err(EngineError::InvalidPassword);
        }
        Ok(Box::new(doc))
    }
}

/// Backend that returns solid rasters and counts calls.
#[derive(Debug, Default)]
pub struct CountingBackend {
    pub renders: AtomicUsize,
}

impl RenderBackend for CountingBackend {
    fn name(&self) -> &str {
        "counting"
    }

    fn can_render(&self) -> bool {
        true
    }

    fn render_page(&self, request: BackendRequest<'_>) -> Result<RgbaImage, EngineError> {
        self.renders.fetch_add(1, Ordering::SeqCst);
        let width = (100.0 * request.scale).round().max(1.0) as u32;
        let height = (140.0 * request.scale).round().max(1.0) as u32;
        Ok(RgbaImage::from_pixel(width, height, Rgba([255, 255, 255, 255])))
    }

    fn extract_text(&self, request: BackendRequest<'_>) -> Result<String, EngineError> {
        Ok(format!("page {}", request.page_index + 1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locked_files_need_the_password() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("locked.pdf");
        fs::write(&path, b"LOCKED body").expect("write");

        let opener = MockOpener::new(2);
        let err = opener.open(&path).err().expect("password required");
        assert!(err.is_password_required());

        let err = opener.open_with_password(&path, "wrong").err().expect("bad password");
        assert!(matches!(err, EngineError::InvalidPassword));

        let doc = opener.open_with_password(&path, "secret").expect("correct password");
        assert_eq!(doc.page_count(), 2);
    }

    #[test]
    fn render_colour_follows_file_contents() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("doc.pdf");
        fs::write(&path, b"one").expect("write");

        let opener = MockOpener::new(1);
        let mut doc = opener.open(&path).expect("open");
        let first = doc.render_page(0, 1.0).expect("render");

        fs::write(&path, b"two").expect("write");
        doc.reload().expect("reload");
        let second = doc.render_page(0, 1.0).expect("render");

        assert_ne!(first.get_pixel(0, 0), second.get_pixel(0, 0));
        assert_eq!(opener.probe().renders(), 2);
        assert_eq!(opener.probe().reloads(), 1);
    }
}
