use crate::backend::{BackendRequest, RenderBackend};
use crate::raster::{self, LETTER_HEIGHT_PT, LETTER_WIDTH_PT};
use crate::{EngineError, RgbaImage};
use lopdf::Document;
use parking_lot::RwLock;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// An open PDF file. Mutating calls come from the session thread; `render_page`
/// and `extract_text` may run on workers while a read lock is held.
pub trait DocumentHandle: Send + Sync {
    fn path(&self) -> &Path;
    fn page_count(&self) -> u32;
    fn save(&mut self) -> Result<(), EngineError>;
    fn save_as(&mut self, path: &Path) -> Result<(), EngineError>;
    /// Re-reads the file at `path()`. On error the previous state is kept.
    fn reload(&mut self) -> Result<(), EngineError>;
    fn render_page(&self, page: u32, scale: f32) -> Result<RgbaImage, EngineError>;
    fn extract_text(&self, page: u32) -> Result<String, EngineError>;
}

pub type SharedDocument = Arc<RwLock<Box<dyn DocumentHandle>>>;

pub fn share(document: Box<dyn DocumentHandle>) -> SharedDocument {
    Arc::new(RwLock::new(document))
}

/// Opens documents. Implementations carry whatever render capability the
/// documents they produce should use.
pub trait DocumentOpener: Send + Sync {
    fn open(&self, path: &Path) -> Result<Box<dyn DocumentHandle>, EngineError>;
    fn open_with_password(
        &self,
        path: &Path,
        password: &str,
    ) -> Result<Box<dyn DocumentHandle>, EngineError>;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSize {
    pub width_pt: f32,
    pub height_pt: f32,
}

impl Default for PageSize {
    fn default() -> Self {
        Self { width_pt: LETTER_WIDTH_PT, height_pt: LETTER_HEIGHT_PT }
    }
}

pub struct PdfDocument {
    path: PathBuf,
    password: Option<String>,
    inner: Document,
    page_sizes: Vec<PageSize>,
    backend: Option<Arc<dyn RenderBackend>>,
}

impl PdfDocument {
    pub fn open(
        path: impl Into<PathBuf>,
        backend: Option<Arc<dyn RenderBackend>>,
    ) -> Result<Self, EngineError> {
        Self::open_inner(path.into(), None, backend)
    }

    pub fn open_with_password(
        path: impl Into<PathBuf>,
        password: &str,
        backend: Option<Arc<dyn RenderBackend>>,
    ) -> Result<Self, EngineError> {
        Self::open_inner(path.into(), Some(password.to_owned()), backend)
    }

    fn open_inner(
        path: PathBuf,
        password: Option<String>,
        backend: Option<Arc<dyn RenderBackend>>,
    ) -> Result<Self, EngineError> {
        let inner = Self::load(&path, password.as_deref())?;
        let page_sizes = Self::parse_sizes(&inner)?;
        tracing::debug!(path = %path.display(), pages = page_sizes.len(), "opened pdf");
        Ok(Self { path, password, inner, page_sizes, backend })
    }

    fn load(path: &Path, password: Option<&str>) -> Result<Document, EngineError> {
        let bytes = fs::read(path)?;
        let encrypted = bytes.windows("/Encrypt".len()).any(|window| window == b"/Encrypt");

        match password {
            None if encrypted => match Document::load_mem(&bytes) {
                // Empty user password: the parser already decrypted it.
                Ok(doc) if !doc.is_encrypted() => Ok(doc),
                _ => Err(EngineError::PasswordRequired { path: path.to_path_buf() }),
            },
            None => Ok(Document::load_mem(&bytes)?),
            Some(password) => {
                let mut doc = Document::load_mem(&bytes)?;
                if doc.is_encrypted() {
                    doc.decrypt(password).map_err(|_| EngineError::InvalidPassword)?;
                }
                Ok(doc)
            }
        }
    }

    fn parse_sizes(doc: &Document) -> Result<Vec<PageSize>, EngineError> {
        let pages = doc.get_pages();
        let mut sizes = Vec::with_capacity(pages.len());

        for (_, object_id) in pages {
            let dict = doc.get_dictionary(object_id)?;
            let size = dict
                .get(b"MediaBox")
                .ok()
                .and_then(|obj| obj.as_array().ok())
                .and_then(|array| {
                    if array.len() != 4 {
                        return None;
                    }
                    let x0 = array[0].as_float().ok()?;
                    let y0 = array[1].as_float().ok()?;
                    let x1 = array[2].as_float().ok()?;
                    let y1 = array[3].as_float().ok()?;
                    Some(PageSize { width_pt: (x1 - x0).abs(), height_pt: (y1 - y0).abs() })
                })
                .unwrap_or_default();

            sizes.push(size);
        }

        if sizes.is_empty() {
            return Err(EngineError::Backend("document has no pages".to_owned()));
        }

        Ok(sizes)
    }

    pub fn page_size(&self, page: u32) -> Result<PageSize, EngineError> {
        EngineError::check_page(page, self.page_count())?;
        Ok(self.page_sizes[page as usize])
    }

    fn request(&self, page: u32, scale: f32) -> BackendRequest<'_> {
        BackendRequest { path: &self.path, page_index: page, scale, password: self.password.as_deref() }
    }

    fn live_backend(&self) -> Option<&Arc<dyn RenderBackend>> {
        self.backend.as_ref().filter(|backend| backend.can_render())
    }
}

impl DocumentHandle for PdfDocument {
    fn path(&self) -> &Path {
        &self.path
    }

    fn page_count(&self) -> u32 {
        self.page_sizes.len() as u32
    }

    fn save(&mut self) -> Result<(), EngineError> {
        let path = self.path.clone();
        self.inner.save(&path).map_err(|err| EngineError::Write(err.to_string()))?;
        Ok(())
    }

    fn save_as(&mut self, path: &Path) -> Result<(), EngineError> {
        self.inner.save(path).map_err(|err| EngineError::Write(err.to_string()))?;
        self.path = path.to_path_buf();
        Ok(())
    }

    fn reload(&mut self) -> Result<(), EngineError> {
        let inner = Self::load(&self.path, self.password.as_deref())?;
        let page_sizes = Self::parse_sizes(&inner)?;
        self.inner = inner;
        self.page_sizes = page_sizes;
        Ok(())
    }

    fn render_page(&self, page: u32, scale: f32) -> Result<RgbaImage, EngineError> {
        let size = self.page_size(page)?;
        match self.live_backend() {
            Some(backend) => backend.render_page(self.request(page, scale)),
            None => Ok(raster::blank_page(size.width_pt, size.height_pt, scale)),
        }
    }

    fn extract_text(&self, page: u32) -> Result<String, EngineError> {
        EngineError::check_page(page, self.page_count())?;
        let backend = self.live_backend().ok_or(EngineError::BackendUnavailable)?;
        backend.extract_text(self.request(page, 1.0))
    }
}

/// Opens `PdfDocument`s wired to one render backend.
#[derive(Clone, Default)]
pub struct PdfOpener {
    backend: Option<Arc<dyn RenderBackend>>,
}

impl PdfOpener {
    pub fn new(backend: Option<Arc<dyn RenderBackend>>) -> Self {
        Self { backend }
    }
}

impl DocumentOpener for PdfOpener {
    fn open(&self, path: &Path) -> Result<Box<dyn DocumentHandle>, EngineError> {
        Ok(Box::new(PdfDocument::open(path, self.backend.clone())?))
    }

    fn open_with_password(
        &self,
        path: &Path,
        password: &str,
    ) -> Result<Box<dyn DocumentHandle>, EngineError> {
        Ok(Box::new(PdfDocument::open_with_password(path, password, self.backend.clone())?))
    }
}
