//! Portrait-orientation square crop around the plate circle.

use image::{GrayImage, RgbImage};

use crate::plate::Circle;

/// Square crop window, guaranteed to lie inside the source image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct CropRect {
    pub x: u32,
    pub y: u32,
    pub side: u32,
}

/// Crop window for a portrait image, derived from the plate circle.
///
/// The circle's bounding box is grown on all sides by its smallest
/// clearance to the image border (shrunk, when the box pokes outside and
/// the clearance is negative), which yields a centered square that always
/// fits. Landscape and square images are left alone, as is any circle
/// whose adjusted box would collapse.
pub(crate) fn crop_rect(width: u32, height: u32, circle: Circle) -> Option<CropRect> {
    if height <= width {
        return None;
    }
    let (w, h) = (width as i32, height as i32);
    let x0 = circle.cx - circle.r;
    let y0 = circle.cy - circle.r;
    let x1 = circle.cx + circle.r;
    let y1 = circle.cy + circle.r;
    let m = x0.min(y0).min(w - 1 - x1).min(h - 1 - y1);
    let side = 2 * (circle.r + m);
    if side <= 0 {
        return None;
    }
    Some(CropRect {
        x: (x0 - m) as u32,
        y: (y0 - m) as u32,
        side: side as u32,
    })
}

pub(crate) fn apply_gray(img: &GrayImage, rect: CropRect) -> GrayImage {
    image::imageops::crop_imm(img, rect.x, rect.y, rect.side, rect.side).to_image()
}

pub(crate) fn apply_rgb(img: &RgbImage, rect: CropRect) -> RgbImage {
    image::imageops::crop_imm(img, rect.x, rect.y, rect.side, rect.side).to_image()
}
