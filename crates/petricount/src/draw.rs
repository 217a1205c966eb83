//! Overlay and presentation drawing helpers.

use image::{GrayImage, Rgb, RgbImage};
use imageproc::drawing::draw_hollow_circle_mut;

/// Side border of the framed output image (pixels).
const FRAME_BORDER: u32 = 10;

/// Draw a circle outline with the given stroke thickness.
///
/// The stroke grows outward from `radius`.
pub(crate) fn circle_outline(
    canvas: &mut RgbImage,
    center: (i32, i32),
    radius: i32,
    thickness: i32,
    color: Rgb<u8>,
) {
    for t in 0..thickness.max(1) {
        draw_hollow_circle_mut(canvas, center, radius + t, color);
    }
}

/// Promote a grayscale image to RGB for preview sinks.
pub(crate) fn gray_to_rgb(gray: &GrayImage) -> RgbImage {
    let (w, h) = gray.dimensions();
    let mut out = RgbImage::new(w, h);
    for (x, y, p) in gray.enumerate_pixels() {
        let v = p[0];
        out.put_pixel(x, y, Rgb([v, v, v]));
    }
    out
}

/// Compose the annotated image onto a colored presentation frame.
pub fn framed(annotated: &RgbImage, color: Rgb<u8>) -> RgbImage {
    let (w, h) = annotated.dimensions();
    let mut canvas = RgbImage::from_pixel(w + 2 * FRAME_BORDER, h + 2 * FRAME_BORDER, color);
    for (x, y, p) in annotated.enumerate_pixels() {
        canvas.put_pixel(x + FRAME_BORDER, y + FRAME_BORDER, *p);
    }
    canvas
}
