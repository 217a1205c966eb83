//! Input conditioning ahead of segmentation: Laplacian sharpening on the
//! color image, grayscale reduction, Otsu binarization and a small
//! morphological clean-up pass.

use image::{GrayImage, Rgb, RgbImage};
use imageproc::contrast::{self, ThresholdType};
use imageproc::distance_transform::Norm;
use imageproc::morphology;

use crate::config::SharpenKernel;

/// Laplacian sharpening with replicated borders.
///
/// Subtracts the per-channel Laplacian response from the source, so edges
/// overshoot on their bright side and undershoot on their dark side while
/// flat regions pass through untouched.
pub(crate) fn sharpen(img: &RgbImage, kernel: SharpenKernel) -> RgbImage {
    let weights: [[i32; 3]; 3] = match kernel {
        SharpenKernel::Cross => [[0, 1, 0], [1, -4, 1], [0, 1, 0]],
        SharpenKernel::Full => [[1, 1, 1], [1, -8, 1], [1, 1, 1]],
    };
    let (w, h) = img.dimensions();
    let (wi, hi) = (w as i32, h as i32);
    let mut out = RgbImage::new(w, h);
    for y in 0..hi {
        for x in 0..wi {
            let mut lap = [0i32; 3];
            for (ky, row) in weights.iter().enumerate() {
                for (kx, &wt) in row.iter().enumerate() {
                    if wt == 0 {
                        continue;
                    }
                    let sx = (x + kx as i32 - 1).clamp(0, wi - 1);
                    let sy = (y + ky as i32 - 1).clamp(0, hi - 1);
                    let p = img.get_pixel(sx as u32, sy as u32);
                    for (acc, &v) in lap.iter_mut().zip(p.0.iter()) {
                        *acc += wt * i32::from(v);
                    }
                }
            }
            let p = img.get_pixel(x as u32, y as u32);
            let mut sharp = [0u8; 3];
            for c in 0..3 {
                sharp[c] = (i32::from(p[c]) - lap[c]).clamp(0, 255) as u8;
            }
            out.put_pixel(x as u32, y as u32, Rgb(sharp));
        }
    }
    out
}

/// Otsu threshold into a strict {0, 255} image.
pub(crate) fn binarize(img: &GrayImage) -> GrayImage {
    let level = contrast::otsu_level(img);
    contrast::threshold(img, level, ThresholdType::Binary)
}

/// 3x3 morphological opening; drops specks smaller than the structuring
/// element without moving larger component boundaries.
pub(crate) fn denoise(img: &GrayImage) -> GrayImage {
    morphology::open(img, Norm::LInf, 1)
}

/// Full conditioning chain: sharpen, grayscale, threshold, open.
pub(crate) fn binarize_image(original: &RgbImage, kernel: SharpenKernel) -> GrayImage {
    let gray = image::imageops::grayscale(&sharpen(original, kernel));
    denoise(&binarize(&gray))
}

/// True when white dominates the binary image, i.e. the foreground of
/// interest is the 0-valued population.
pub(crate) fn detect_inverted(binary: &GrayImage) -> bool {
    let white = binary.as_raw().iter().filter(|&&v| v == 255).count();
    white * 2 > binary.as_raw().len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn step_edge(w: u32, h: u32, split: u32, lo: u8, hi: u8) -> GrayImage {
        GrayImage::from_fn(w, h, |x, _| Luma([if x < split { lo } else { hi }]))
    }

    fn step_edge_rgb(w: u32, h: u32, split: u32, lo: [u8; 3], hi: [u8; 3]) -> RgbImage {
        RgbImage::from_fn(w, h, |x, _| Rgb(if x < split { lo } else { hi }))
    }

    #[test]
    fn sharpen_leaves_flat_regions_alone() {
        let img = RgbImage::from_pixel(16, 16, Rgb([120, 80, 40]));
        for kernel in [SharpenKernel::Cross, SharpenKernel::Full] {
            let out = sharpen(&img, kernel);
            assert_eq!(out.as_raw(), img.as_raw(), "kernel {kernel:?} altered a flat image");
        }
    }

    #[test]
    fn sharpen_overshoots_across_an_edge() {
        let img = step_edge_rgb(16, 16, 8, [40, 60, 80], [140, 160, 180]);
        let out = sharpen(&img, SharpenKernel::Cross);
        let bright = out.get_pixel(8, 8);
        let dark = out.get_pixel(7, 8);
        for c in 0..3 {
            assert!(
                bright[c] > 140,
                "bright side channel {c} should overshoot, got {}",
                bright[c]
            );
            assert!(
                dark[c] < 40,
                "dark side channel {c} should undershoot, got {}",
                dark[c]
            );
        }
    }

    #[test]
    fn binarize_separates_two_populations() {
        let img = step_edge(20, 10, 10, 40, 200);
        let out = binarize(&img);
        for (x, _, p) in out.enumerate_pixels() {
            let expect = if x < 10 { 0 } else { 255 };
            assert_eq!(p[0], expect, "pixel column {x}");
        }
    }

    #[test]
    fn binarize_is_deterministic_for_a_fixed_image() {
        let img = GrayImage::from_fn(32, 32, |x, y| Luma([(x * 5 + y * 2) as u8]));
        let level = contrast::otsu_level(&img);
        assert_eq!(level, contrast::otsu_level(&img), "threshold varies between calls");
        assert_eq!(binarize(&img).as_raw(), binarize(&img).as_raw());
    }

    #[test]
    fn binarize_image_yields_a_strict_binary_mask() {
        let mut img = RgbImage::from_pixel(64, 64, Rgb([205, 205, 200]));
        imageproc::drawing::draw_filled_circle_mut(&mut img, (32, 32), 10, Rgb([70, 64, 60]));
        let out = binarize_image(&img, SharpenKernel::Cross);
        assert!(
            out.as_raw().iter().all(|&v| v == 0 || v == 255),
            "mask must contain only 0 and 255"
        );
        assert_eq!(out.get_pixel(32, 32)[0], 0, "colony interior binarizes dark");
        assert_eq!(out.get_pixel(2, 2)[0], 255, "agar background binarizes light");
    }

    #[test]
    fn denoise_drops_specks_and_keeps_blobs() {
        let mut img = GrayImage::new(32, 32);
        img.put_pixel(5, 5, Luma([255]));
        for y in 12..19 {
            for x in 12..19 {
                img.put_pixel(x, y, Luma([255]));
            }
        }
        let out = denoise(&img);
        assert_eq!(out.get_pixel(5, 5)[0], 0, "isolated speck should vanish");
        assert_eq!(out.get_pixel(15, 15)[0], 255, "7x7 blob should survive");
    }

    #[test]
    fn detect_inverted_follows_the_majority() {
        let mut img = GrayImage::from_pixel(10, 10, Luma([255]));
        assert!(detect_inverted(&img));
        for y in 0..10 {
            for x in 0..6 {
                img.put_pixel(x, y, Luma([0]));
            }
        }
        assert!(!detect_inverted(&img));
    }
}
