//! Read-through thumbnail cache
//!
//! Thumbnails are rendered on first request at a small fixed scale and kept
//! until the document changes. Lookups take a read lock; rendering happens
//! with no lock held, so a slow render never blocks other lookups.

use folio_engine::{thumbnail_placeholder, PageImage, SharedDocument};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Scale thumbnails are rasterized at.
pub const DEFAULT_THUMBNAIL_SCALE: f32 = 0.35;

/// Placeholder size used when a thumbnail cannot be rendered.
pub const PLACEHOLDER_WIDTH: u32 = 120;
pub const PLACEHOLDER_HEIGHT: u32 = 160;

/// Statistics about thumbnail cache usage
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ThumbnailStats {
    /// Number of cached thumbnails
    pub entries: usize,

    /// Lookups served from the cache
    pub hits: u64,

    /// Lookups that had to render
    pub misses: u64,

    /// Renders that failed and produced a placeholder
    pub failures: u64,
}

impl ThumbnailStats {
    /// Calculate the cache hit rate (0.0 to 1.0)
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

struct ThumbnailState {
    document: Option<SharedDocument>,
    entries: HashMap<u32, PageImage>,
    /// Bumped whenever the document is replaced or invalidated
    generation: u64,
}

/// Per-tab thumbnail cache
///
/// Safe to share between the session thread and render workers.
pub struct ThumbnailCache {
    scale: f32,
    state: RwLock<ThumbnailState>,
    placeholder: PageImage,
    hits: AtomicU64,
    misses: AtomicU64,
    failures: AtomicU64,
}

impl ThumbnailCache {
    /// Create an empty cache with no document
    pub fn new(scale: f32) -> Self {
        let scale = if scale > 0.0 { scale } else { DEFAULT_THUMBNAIL_SCALE };
        Self {
            scale,
            state: RwLock::new(ThumbnailState {
                document: None,
                entries: HashMap::new(),
                generation: 0,
            }),
            placeholder: Arc::new(thumbnail_placeholder(PLACEHOLDER_WIDTH, PLACEHOLDER_HEIGHT)),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            failures: AtomicU64::new(0),
        }
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    /// Replace the document and drop every cached thumbnail
    pub fn set_document(&self, document: Option<SharedDocument>) {
        let mut state = self.state.write();
        state.document = document;
        state.entries.clear();
        state.generation += 1;
    }

    /// Drop every cached thumbnail but keep the document
    ///
    /// Used after the document was reloaded in place.
    pub fn invalidate(&self) {
        let mut state = self.state.write();
        state.entries.clear();
        state.generation += 1;
    }

    /// Thumbnail for `page`, rendering it on a miss
    ///
    /// Never fails: without a document, or if rendering fails, the shared
    /// placeholder is returned and nothing is cached.
    pub fn get_thumbnail(&self, page: u32) -> PageImage {
        let (document, generation) = {
            let state = self.state.read();
            if let Some(image) = state.entries.get(&page) {
                self.hits.fetch_add(1, Ordering::Relaxed);
                return image.clone();
            }
            match &state.document {
                Some(document) => (document.clone(), state.generation),
                None => return self.placeholder.clone(),
            }
        };

        self.misses.fetch_add(1, Ordering::Relaxed);
        let rendered = document.read().render_page(page, self.scale);

        match rendered {
            Ok(image) => {
                let image = Arc::new(image);
                let mut state = self.state.write();
                // A document swap during the render makes this image stale.
                if state.generation == generation {
                    state.entries.insert(page, image.clone());
                }
                image
            }
            Err(err) => {
                self.failures.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(page, error = %err, "thumbnail render failed");
                self.placeholder.clone()
            }
        }
    }

    /// Whether `image` is the shared placeholder
    pub fn is_placeholder(&self, image: &PageImage) -> bool {
        Arc::ptr_eq(image, &self.placeholder)
    }

    pub fn contains(&self, page: u32) -> bool {
        self.state.read().entries.contains_key(&page)
    }

    pub fn len(&self) -> usize {
        self.state.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.read().entries.is_empty()
    }

    pub fn stats(&self) -> ThumbnailStats {
        ThumbnailStats {
            entries: self.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
        }
    }
}

impl Default for ThumbnailCache {
    fn default() -> Self {
        Self::new(DEFAULT_THUMBNAIL_SCALE)
    }
}
