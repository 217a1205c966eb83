//! Shared synthetic fixtures for image-based unit tests.
//!
//! Colonies render dark on bright agar in the color images, matching the
//! photographs the pipeline is built for; the binary builders produce the
//! white-foreground masks the segmenters consume.

use image::{GrayImage, Luma, Rgb, RgbImage};
use imageproc::drawing::draw_filled_circle_mut;

/// Binary blob mask: white filled disks on black.
pub(crate) fn draw_blobs(w: u32, h: u32, blobs: &[(i32, i32, i32)]) -> GrayImage {
    let mut img = GrayImage::new(w, h);
    for &(cx, cy, r) in blobs {
        draw_filled_circle_mut(&mut img, (cx, cy), r, Luma([255]));
    }
    img
}

/// Color render of the same blobs: dark colonies on bright agar.
pub(crate) fn draw_blobs_rgb(w: u32, h: u32, blobs: &[(i32, i32, i32)]) -> RgbImage {
    let mut img = RgbImage::from_pixel(w, h, Rgb([205, 205, 200]));
    for &(cx, cy, r) in blobs {
        draw_filled_circle_mut(&mut img, (cx, cy), r, Rgb([70, 64, 60]));
    }
    img
}

/// Full plate photograph: bright dish on a dark bench, dark colonies.
pub(crate) fn draw_plate_photo(
    w: u32,
    h: u32,
    plate: (i32, i32, i32),
    colonies: &[(i32, i32, i32)],
) -> RgbImage {
    let mut img = RgbImage::from_pixel(w, h, Rgb([40, 40, 40]));
    let (cx, cy, r) = plate;
    draw_filled_circle_mut(&mut img, (cx, cy), r, Rgb([205, 205, 200]));
    for &(ccx, ccy, cr) in colonies {
        draw_filled_circle_mut(&mut img, (ccx, ccy), cr, Rgb([70, 64, 60]));
    }
    img
}
