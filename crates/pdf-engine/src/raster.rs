use image::{ImageBuffer, Rgba};
use std::sync::Arc;

pub type RgbaImage = ImageBuffer<Rgba<u8>, Vec<u8>>;

/// Shared, immutable page raster. Caches hand these out by cloning the `Arc`.
pub type PageImage = Arc<RgbaImage>;

/// Letter size in points, used when the real page size is unknown.
pub const LETTER_WIDTH_PT: f32 = 612.0;
pub const LETTER_HEIGHT_PT: f32 = 792.0;

const PAGE_FILL: Rgba<u8> = Rgba([255, 255, 255, 255]);
const PAGE_BORDER: Rgba<u8> = Rgba([220, 220, 220, 255]);
const THUMB_FILL: Rgba<u8> = Rgba([245, 245, 245, 255]);
const THUMB_BORDER: Rgba<u8> = Rgba([200, 200, 200, 255]);

/// Blank page with a thin border, `width_pt` x `height_pt` points at `scale`.
pub fn blank_page(width_pt: f32, height_pt: f32, scale: f32) -> RgbaImage {
    let scale = if scale <= 0.0 { 1.0 } else { scale };
    let width = (width_pt * scale).round().max(1.0) as u32;
    let height = (height_pt * scale).round().max(1.0) as u32;
    bordered(width, height, PAGE_FILL, PAGE_BORDER)
}

/// Stand-in shown in the thumbnail strip when a page cannot be rendered.
pub fn thumbnail_placeholder(width: u32, height: u32) -> RgbaImage {
    bordered(width.max(1), height.max(1), THUMB_FILL, THUMB_BORDER)
}

fn bordered(width: u32, height: u32, fill: Rgba<u8>, border: Rgba<u8>) -> RgbaImage {
    let mut image = RgbaImage::from_pixel(width, height, fill);

    if width >= 4 && height >= 4 {
        for x in 0..width {
            image.put_pixel(x, 0, border);
            image.put_pixel(x, height - 1, border);
        }
        for y in 0..height {
            image.put_pixel(0, y, border);
            image.put_pixel(width - 1, y, border);
        }
    }

    image
}
