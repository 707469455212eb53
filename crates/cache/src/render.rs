//! Base-render cache and zoom engine
//!
//! A page is rasterized once at a fixed base scale. Zooming only changes the
//! size the cached image is displayed at, so zoom gestures never touch the
//! renderer. A new render is needed only when the page changes or the cache
//! is invalidated after the document was reloaded.
//!
//! Rendering itself happens elsewhere. The cache hands out [`RenderTicket`]s
//! and later receives the result through [`RenderCache::complete`], which
//! decides whether the result is still wanted.

use folio_engine::{EngineError, PageImage, RgbaImage};
use parking_lot::Mutex;
use std::sync::Arc;

/// Scale pages are rasterized at, independent of zoom.
pub const DEFAULT_BASE_SCALE: f32 = 2.0;

/// Smallest zoom factor.
pub const MIN_ZOOM: f32 = 0.25;

/// Largest zoom factor.
pub const MAX_ZOOM: f32 = 5.0;

/// Multiplier applied by one zoom-in or zoom-out step.
pub const ZOOM_STEP: f32 = 1.25;

/// Zoom bounds and step size
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoomLimits {
    /// Minimum zoom factor
    pub min: f32,

    /// Maximum zoom factor
    pub max: f32,

    /// Multiplicative step for zoom in/out
    pub step: f32,
}

impl Default for ZoomLimits {
    fn default() -> Self {
        Self { min: MIN_ZOOM, max: MAX_ZOOM, step: ZOOM_STEP }
    }
}

impl ZoomLimits {
    /// Clamp a zoom factor into `[min, max]`
    ///
    /// Swapped bounds are put back in order, and non-finite bounds fall back
    /// to the defaults. A NaN zoom becomes 1.0 before clamping.
    pub fn clamp(&self, zoom: f32) -> f32 {
        let (lo, hi) = self.bounds();
        let zoom = if zoom.is_nan() { 1.0 } else { zoom };
        zoom.clamp(lo, hi)
    }

    fn bounds(&self) -> (f32, f32) {
        let min = if self.min.is_finite() { self.min } else { MIN_ZOOM };
        let max = if self.max.is_finite() { self.max } else { MAX_ZOOM };
        (min.min(max), min.max(max))
    }
}

/// Visible area available to a page, in display pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    fn is_usable(&self) -> bool {
        self.width > 0.0 && self.height > 0.0
    }
}

/// Size the cached base image should be drawn at for the current zoom
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplaySize {
    pub width: u32,
    pub height: u32,
}

/// Permission to render one page, issued by the cache
///
/// The ticket records the page and cache generation it was issued for. A
/// result is committed only if both still match when it comes back.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderTicket {
    /// Page to rasterize (0-based)
    pub page: u32,

    /// Scale to rasterize at
    pub scale: f32,

    /// Cache generation at issue time
    pub generation: u64,
}

/// Coarse state of the cache
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderState {
    /// Nothing cached, nothing rendering
    Empty,

    /// A render is in flight
    Rendering,

    /// An image is cached (possibly displayed zoomed)
    Cached,
}

/// What happened to a render result
#[derive(Debug)]
pub enum CommitOutcome {
    /// The image is now the cached base image
    Applied,

    /// The user moved on, or the document was reloaded, before it finished
    Stale,

    /// Rendering failed; the previous image is kept
    Failed(EngineError),
}

/// Result of [`RenderCache::complete`]
#[derive(Debug)]
pub struct Commit {
    pub outcome: CommitOutcome,

    /// A render to start next, if the current page still is not cached
    pub follow_up: Option<RenderTicket>,
}

/// Lock-protected in-flight flag allowing at most one render at a time.
#[derive(Debug, Default)]
pub struct SingleFlight {
    busy: Mutex<bool>,
}

impl SingleFlight {
    /// Claim the flag. Returns `false` if a render is already in flight.
    pub fn try_acquire(&self) -> bool {
        let mut busy = self.busy.lock();
        if *busy {
            false
        } else {
            *busy = true;
            true
        }
    }

    pub fn release(&self) {
        *self.busy.lock() = false;
    }

    pub fn is_busy(&self) -> bool {
        *self.busy.lock()
    }
}

/// Per-tab base-render cache
///
/// # Example
///
/// ```
/// use folio_cache::{RenderCache, ZoomLimits};
/// use folio_engine::RgbaImage;
///
/// let mut cache = RenderCache::new(2.0, ZoomLimits::default(), 1.0);
/// let ticket = cache.request_render().expect("empty cache needs a render");
///
/// // ... a worker rasterizes ticket.page at ticket.scale ...
/// let commit = cache.complete(ticket, Ok(RgbaImage::new(1224, 1584)));
/// assert!(commit.follow_up.is_none());
///
/// let size = cache.apply_zoom(0.5).expect("image cached");
/// assert_eq!((size.width, size.height), (306, 396));
/// ```
#[derive(Debug)]
pub struct RenderCache {
    base_scale: f32,
    limits: ZoomLimits,
    zoom: f32,
    current_page: u32,
    cached_page: Option<u32>,
    cached_image: Option<PageImage>,
    generation: u64,
    flight: SingleFlight,
}

impl RenderCache {
    /// Create an empty cache
    ///
    /// # Arguments
    ///
    /// * `base_scale` - Scale every page is rasterized at
    /// * `limits` - Zoom bounds and step
    /// * `initial_zoom` - Starting zoom, clamped into `limits`
    pub fn new(base_scale: f32, limits: ZoomLimits, initial_zoom: f32) -> Self {
        let base_scale = if base_scale > 0.0 { base_scale } else { DEFAULT_BASE_SCALE };
        Self {
            base_scale,
            limits,
            zoom: limits.clamp(initial_zoom),
            current_page: 0,
            cached_page: None,
            cached_image: None,
            generation: 0,
            flight: SingleFlight::default(),
        }
    }

    pub fn base_scale(&self) -> f32 {
        self.base_scale
    }

    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    pub fn limits(&self) -> ZoomLimits {
        self.limits
    }

    /// Page the user asked for (0-based)
    pub fn current_page(&self) -> u32 {
        self.current_page
    }

    /// Page the cached image belongs to
    pub fn cached_page(&self) -> Option<u32> {
        self.cached_page
    }

    pub fn image(&self) -> Option<&PageImage> {
        self.cached_image.as_ref()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_rendering(&self) -> bool {
        self.flight.is_busy()
    }

    pub fn state(&self) -> RenderState {
        if self.flight.is_busy() {
            RenderState::Rendering
        } else if self.cached_image.is_some() {
            RenderState::Cached
        } else {
            RenderState::Empty
        }
    }

    /// Size the cached image should be displayed at: `base * zoom / base_scale`
    pub fn display_size(&self) -> Option<DisplaySize> {
        let image = self.cached_image.as_ref()?;
        let factor = self.zoom / self.base_scale;
        Some(DisplaySize {
            width: (image.width() as f32 * factor).round().max(1.0) as u32,
            height: (image.height() as f32 * factor).round().max(1.0) as u32,
        })
    }

    /// Whether the current page lacks a cached image
    pub fn needs_render(&self) -> bool {
        self.cached_page != Some(self.current_page)
    }

    /// Ask for a render of the current page
    ///
    /// Returns `None` if the page is already cached or another render holds
    /// the single-flight flag. A dropped request is picked up again when the
    /// in-flight render completes.
    pub fn request_render(&mut self) -> Option<RenderTicket> {
        if !self.needs_render() || !self.flight.try_acquire() {
            return None;
        }
        Some(RenderTicket {
            page: self.current_page,
            scale: self.base_scale,
            generation: self.generation,
        })
    }

    /// Navigate to `page`
    ///
    /// A no-op for out-of-range pages and for the current page.
    pub fn go_to_page(&mut self, page: u32, page_count: u32) -> Option<RenderTicket> {
        if page >= page_count || page == self.current_page {
            return None;
        }
        self.current_page = page;
        self.request_render()
    }

    /// Set the current page without the navigation no-op rules
    ///
    /// Used after a reload, when the page number must be restored even if it
    /// did not change. Clamped into `[0, page_count)`.
    pub fn restore_page(&mut self, page: u32, page_count: u32) {
        self.current_page = page.min(page_count.saturating_sub(1));
    }

    /// Hand back the result of a ticket
    pub fn complete(&mut self, ticket: RenderTicket, result: Result<RgbaImage, EngineError>) -> Commit {
        self.flight.release();

        let stale = ticket.page != self.current_page || ticket.generation != self.generation;
        let outcome = match result {
            Ok(image) if !stale => {
                self.cached_page = Some(ticket.page);
                self.cached_image = Some(Arc::new(image));
                CommitOutcome::Applied
            }
            Ok(_) => CommitOutcome::Stale,
            Err(err) if stale => {
                tracing::debug!(page = ticket.page, error = %err, "stale render failed");
                CommitOutcome::Stale
            }
            Err(err) => CommitOutcome::Failed(err),
        };

        let follow_up = match &outcome {
            CommitOutcome::Failed(_) => None,
            _ => self.request_render(),
        };

        Commit { outcome, follow_up }
    }

    /// Drop the cached image after the document changed on disk
    pub fn invalidate(&mut self) {
        self.cached_page = None;
        self.cached_image = None;
        self.generation += 1;
    }

    /// Set the zoom factor, clamped. Never renders.
    pub fn apply_zoom(&mut self, zoom: f32) -> Option<DisplaySize> {
        self.zoom = self.limits.clamp(zoom);
        self.display_size()
    }

    pub fn zoom_in(&mut self) -> Option<DisplaySize> {
        self.apply_zoom(self.zoom * self.limits.step)
    }

    pub fn zoom_out(&mut self) -> Option<DisplaySize> {
        self.apply_zoom(self.zoom / self.limits.step)
    }

    /// Zoom so the whole page fits the viewport. No-op without a cached image.
    pub fn fit_to_page(&mut self, viewport: Viewport) -> Option<DisplaySize> {
        let (width, height) = self.base_dimensions()?;
        if !viewport.is_usable() {
            return self.display_size();
        }
        let zoom_w = viewport.width * self.base_scale / width;
        let zoom_h = viewport.height * self.base_scale / height;
        self.apply_zoom(zoom_w.min(zoom_h))
    }

    /// Zoom so the page width fills the viewport. No-op without a cached image.
    pub fn fit_to_width(&mut self, viewport: Viewport) -> Option<DisplaySize> {
        let (width, _) = self.base_dimensions()?;
        if viewport.width <= 0.0 {
            return self.display_size();
        }
        self.apply_zoom(viewport.width * self.base_scale / width)
    }

    fn base_dimensions(&self) -> Option<(f32, f32)> {
        let image = self.cached_image.as_ref()?;
        if image.width() == 0 || image.height() == 0 {
            return None;
        }
        Some((image.width() as f32, image.height() as f32))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page_image() -> RgbaImage {
        // Letter page at 2x
        RgbaImage::new(1224, 1584)
    }

    fn cached() -> RenderCache {
        let mut cache = RenderCache::new(2.0, ZoomLimits::default(), 1.0);
        let ticket = cache.request_render().unwrap();
        let commit = cache.complete(ticket, Ok(page_image()));
        assert!(matches!(commit.outcome, CommitOutcome::Applied));
        cache
    }

    #[test]
    fn test_new_cache_is_empty() {
        let cache = RenderCache::new(2.0, ZoomLimits::default(), 1.0);
        assert_eq!(cache.state(), RenderState::Empty);
        assert!(cache.image().is_none());
        assert!(cache.cached_page().is_none());
        assert!(cache.display_size().is_none());
    }

    #[test]
    fn test_render_lifecycle() {
        let mut cache = RenderCache::new(2.0, ZoomLimits::default(), 1.0);
        let ticket = cache.request_render().unwrap();
        assert_eq!(ticket.page, 0);
        assert_eq!(ticket.scale, 2.0);
        assert_eq!(cache.state(), RenderState::Rendering);

        let commit = cache.complete(ticket, Ok(page_image()));
        assert!(matches!(commit.outcome, CommitOutcome::Applied));
        assert!(commit.follow_up.is_none());
        assert_eq!(cache.state(), RenderState::Cached);
        assert_eq!(cache.cached_page(), Some(0));
    }

    #[test]
    fn test_go_to_current_page_is_noop() {
        let mut cache = cached();
        assert!(cache.go_to_page(0, 3).is_none());
        assert_eq!(cache.cached_page(), Some(0));
    }

    #[test]
    fn test_go_to_page_out_of_range_is_noop() {
        let mut cache = cached();
        assert!(cache.go_to_page(3, 3).is_none());
        assert_eq!(cache.current_page(), 0);
    }

    #[test]
    fn test_single_flight_drops_second_trigger() {
        let mut cache = cached();
        let first = cache.go_to_page(1, 5).unwrap();
        assert!(cache.go_to_page(2, 5).is_none());

        // Page 1 came back after the user moved to page 2
        let commit = cache.complete(first, Ok(page_image()));
        assert!(matches!(commit.outcome, CommitOutcome::Stale));
        assert_eq!(cache.cached_page(), Some(0));

        let follow_up = commit.follow_up.unwrap();
        assert_eq!(follow_up.page, 2);
        let commit = cache.complete(follow_up, Ok(page_image()));
        assert!(matches!(commit.outcome, CommitOutcome::Applied));
        assert_eq!(cache.cached_page(), Some(2));
    }

    #[test]
    fn test_zoom_never_touches_cache() {
        let mut cache = cached();
        let image = cache.image().cloned().unwrap();

        cache.zoom_in();
        cache.zoom_out();

        assert!((cache.zoom() - 1.0).abs() < 1e-6);
        assert!(Arc::ptr_eq(cache.image().unwrap(), &image));
        assert_eq!(cache.cached_page(), Some(0));
        assert!(!cache.is_rendering());
    }

    #[test]
    fn test_display_size_is_base_over_scale() {
        let mut cache = cached();
        assert_eq!(cache.display_size(), Some(DisplaySize { width: 612, height: 792 }));
        assert_eq!(cache.apply_zoom(2.0), Some(DisplaySize { width: 1224, height: 1584 }));
    }

    #[test]
    fn test_zoom_is_clamped() {
        let mut cache = cached();
        cache.apply_zoom(100.0);
        assert_eq!(cache.zoom(), MAX_ZOOM);
        cache.apply_zoom(0.0);
        assert_eq!(cache.zoom(), MIN_ZOOM);
        cache.zoom_out();
        assert_eq!(cache.zoom(), MIN_ZOOM);
    }

    #[test]
    fn test_swapped_zoom_limits_still_clamp() {
        let limits = ZoomLimits { min: 4.0, max: 0.5, step: ZOOM_STEP };
        assert_eq!(limits.clamp(10.0), 4.0);
        assert_eq!(limits.clamp(0.1), 0.5);
        assert_eq!(limits.clamp(2.0), 2.0);
        assert_eq!(limits.clamp(f32::NAN), 1.0);

        let mut cache = RenderCache::new(2.0, limits, 1.0);
        cache.apply_zoom(100.0);
        assert_eq!(cache.zoom(), 4.0);
    }

    #[test]
    fn test_non_finite_zoom_limits_use_defaults() {
        let limits = ZoomLimits { min: f32::NAN, max: f32::INFINITY, step: ZOOM_STEP };
        assert_eq!(limits.clamp(100.0), MAX_ZOOM);
        assert_eq!(limits.clamp(0.0), MIN_ZOOM);
    }

    #[test]
    fn test_zoom_without_image_sets_value_only() {
        let mut cache = RenderCache::new(2.0, ZoomLimits::default(), 1.0);
        assert!(cache.apply_zoom(1.5).is_none());
        assert_eq!(cache.zoom(), 1.5);
    }

    #[test]
    fn test_fit_to_page_uses_smaller_ratio() {
        let mut cache = cached();
        // 612x792 at 1.0; 396 tall viewport halves it
        let size = cache.fit_to_page(Viewport::new(1000.0, 396.0)).unwrap();
        assert!((cache.zoom() - 0.5).abs() < 1e-4);
        assert_eq!(size.height, 396);
    }

    #[test]
    fn test_fit_to_width() {
        let mut cache = cached();
        let size = cache.fit_to_width(Viewport::new(1224.0, 100.0)).unwrap();
        assert!((cache.zoom() - 2.0).abs() < 1e-4);
        assert_eq!(size.width, 1224);
    }

    #[test]
    fn test_fit_without_image_is_noop() {
        let mut cache = RenderCache::new(2.0, ZoomLimits::default(), 1.0);
        assert!(cache.fit_to_page(Viewport::new(800.0, 600.0)).is_none());
        assert_eq!(cache.zoom(), 1.0);
    }

    #[test]
    fn test_failed_render_keeps_previous_image() {
        let mut cache = cached();
        let ticket = cache.go_to_page(1, 2).unwrap();
        let commit = cache.complete(ticket, Err(EngineError::Backend("boom".into())));

        assert!(matches!(commit.outcome, CommitOutcome::Failed(_)));
        assert!(commit.follow_up.is_none());
        assert_eq!(cache.cached_page(), Some(0));
        assert!(cache.image().is_some());
        assert!(!cache.is_rendering());
    }

    #[test]
    fn test_invalidate_rejects_older_results() {
        let mut cache = cached();
        cache.invalidate();
        let before_reload = cache.request_render().unwrap();
        cache.invalidate();

        let commit = cache.complete(before_reload, Ok(page_image()));
        assert!(matches!(commit.outcome, CommitOutcome::Stale));
        assert!(cache.image().is_none());

        let retry = commit.follow_up.unwrap();
        assert_eq!(retry.generation, cache.generation());
    }

    #[test]
    fn test_restore_page_clamps() {
        let mut cache = RenderCache::new(2.0, ZoomLimits::default(), 1.0);
        cache.restore_page(9, 4);
        assert_eq!(cache.current_page(), 3);
    }
}
