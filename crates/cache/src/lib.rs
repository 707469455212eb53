//! Folio Cache Library
//!
//! Per-tab page caches: a base-render cache that decouples zoom from
//! rendering, and a read-through thumbnail cache.

pub mod render;
pub mod thumbnail;

pub use render::{
    Commit, CommitOutcome, DisplaySize, RenderCache, RenderState, RenderTicket, SingleFlight,
    Viewport, ZoomLimits, DEFAULT_BASE_SCALE, MAX_ZOOM, MIN_ZOOM, ZOOM_STEP,
};
pub use thumbnail::{
    ThumbnailCache, ThumbnailStats, DEFAULT_THUMBNAIL_SCALE, PLACEHOLDER_HEIGHT,
    PLACEHOLDER_WIDTH,
};
