//! Watershed colony counter: distance-transform seeds flooded over the
//! color image until competing regions meet.
//!
//! Seeds are the confident blob interiors, everything above the seed cutoff
//! of the normalized distance transform. Meyer's flooding grows them along
//! intensity gradients of the color image; the ridge lines where two seeds
//! collide become the highlight overlay and the seed component count is the
//! colony count.

use std::collections::VecDeque;

use image::{GrayImage, Luma, RgbImage};
use imageproc::distance_transform::Norm;
use imageproc::morphology;
use imageproc::region_labelling::{connected_components, Connectivity};

use super::Segmentation;
use crate::config::CounterConfig;

/// 3x3 chamfer weights approximating Euclidean distance.
const CHAMFER_ORTHO: f32 = 0.955;
const CHAMFER_DIAG: f32 = 1.3693;

/// Label-map sentinels during flooding.
const BOUNDARY: i32 = -1;
const IN_QUEUE: i32 = -2;
const BORDER_SEED: i32 = 255;

/// Count colonies in the tuned binary image.
///
/// `original` and `tuned` must share dimensions; the returned image is a
/// copy of `original` with the segmentation ridges painted in the highlight
/// color.
pub fn count(original: &RgbImage, tuned: &GrayImage, config: &CounterConfig) -> Segmentation {
    assert_eq!(
        original.dimensions(),
        tuned.dimensions(),
        "color image and tuned binary must agree on size"
    );
    let (w, h) = tuned.dimensions();

    let border = border_map(tuned);
    let dist = chamfer_distance(tuned);
    let norm = normalize_distances(&dist);

    let seed_raw: Vec<u8> = norm
        .iter()
        .map(|&v| if v > config.seed_threshold { 255 } else { 0 })
        .collect();
    let seeds = GrayImage::from_raw(w, h, seed_raw).expect("seed buffer matches image size");
    let labels = connected_components(&seeds, Connectivity::Eight, Luma([0u8]));
    let mut seed_components = 0u32;
    for &l in labels.as_raw() {
        seed_components = seed_components.max(l);
    }

    // compress labels below the border sentinel, truncating
    let scale = 255.0 / (seed_components as f32 + 2.0);
    let mut markers: Vec<i32> = labels
        .as_raw()
        .iter()
        .map(|&l| (l as f32 * scale) as i32)
        .collect();
    for (m, &b) in markers.iter_mut().zip(border.as_raw()) {
        if b == 255 {
            *m = BORDER_SEED;
        }
    }

    flood(original, &mut markers, w as usize, h as usize);

    // ridge pixels, plus anything the flood never reached, form the overlay
    let highlight_raw: Vec<u8> = markers.iter().map(|&m| if m <= 0 { 255 } else { 0 }).collect();
    let highlight =
        GrayImage::from_raw(w, h, highlight_raw).expect("highlight buffer matches image size");
    let highlight = morphology::dilate(&highlight, Norm::LInf, 1);

    let mut annotated = original.clone();
    let color = config.highlight_rgb();
    let hl = highlight.as_raw();
    let stride = w as usize;
    for (x, y, p) in annotated.enumerate_pixels_mut() {
        if hl[y as usize * stride + x as usize] == 255 {
            *p = color;
        }
    }

    let count = seed_components as usize;
    tracing::debug!(count, "watershed segmentation finished");
    Segmentation { annotated, count }
}

/// Pixels gained by dilation but lost by the following erosion, i.e. a thin
/// band along every object boundary.
fn border_map(binary: &GrayImage) -> GrayImage {
    let mut border = morphology::dilate(binary, Norm::LInf, 1);
    let eroded = morphology::erode(&border, Norm::LInf, 1);
    let eroded_raw = eroded.as_raw();
    let stride = border.width() as usize;
    for (x, y, p) in border.enumerate_pixels_mut() {
        if eroded_raw[y as usize * stride + x as usize] == 255 {
            p[0] = 0;
        }
    }
    border
}

/// Two-pass chamfer distance of every foreground pixel to the nearest
/// background pixel. Foreground with no background anywhere stays infinite.
fn chamfer_distance(binary: &GrayImage) -> Vec<f32> {
    let (w, h) = binary.dimensions();
    let (wi, hi) = (w as i32, h as i32);
    let stride = w as usize;
    let mut dist: Vec<f32> = binary
        .as_raw()
        .iter()
        .map(|&v| if v == 0 { 0.0 } else { f32::INFINITY })
        .collect();
    let idx = |x: i32, y: i32| y as usize * stride + x as usize;

    for y in 0..hi {
        for x in 0..wi {
            let i = idx(x, y);
            if dist[i] == 0.0 {
                continue;
            }
            let mut best = dist[i];
            if x > 0 {
                best = best.min(dist[idx(x - 1, y)] + CHAMFER_ORTHO);
            }
            if y > 0 {
                best = best.min(dist[idx(x, y - 1)] + CHAMFER_ORTHO);
                if x > 0 {
                    best = best.min(dist[idx(x - 1, y - 1)] + CHAMFER_DIAG);
                }
                if x < wi - 1 {
                    best = best.min(dist[idx(x + 1, y - 1)] + CHAMFER_DIAG);
                }
            }
            dist[i] = best;
        }
    }
    for y in (0..hi).rev() {
        for x in (0..wi).rev() {
            let i = idx(x, y);
            if dist[i] == 0.0 {
                continue;
            }
            let mut best = dist[i];
            if x < wi - 1 {
                best = best.min(dist[idx(x + 1, y)] + CHAMFER_ORTHO);
            }
            if y < hi - 1 {
                best = best.min(dist[idx(x, y + 1)] + CHAMFER_ORTHO);
                if x < wi - 1 {
                    best = best.min(dist[idx(x + 1, y + 1)] + CHAMFER_DIAG);
                }
                if x > 0 {
                    best = best.min(dist[idx(x - 1, y + 1)] + CHAMFER_DIAG);
                }
            }
            dist[i] = best;
        }
    }
    dist
}

/// Min/max normalization into [0, 255], truncating.
///
/// A flat transform (all-background input) must not divide by zero and maps
/// to all zeros; unreachable foreground maps to 255.
fn normalize_distances(dist: &[f32]) -> Vec<u8> {
    let mut min = f32::INFINITY;
    let mut max = 0.0f32;
    for &d in dist {
        if !d.is_finite() {
            continue;
        }
        if d < min {
            min = d;
        }
        if d > max {
            max = d;
        }
    }
    if !min.is_finite() || max <= min {
        return dist
            .iter()
            .map(|&d| if d.is_finite() { 0 } else { 255 })
            .collect();
    }
    let scale = 255.0 / (max - min);
    dist.iter()
        .map(|&d| {
            if d.is_finite() {
                ((d - min) * scale).clamp(0.0, 255.0) as u8
            } else {
                255
            }
        })
        .collect()
}

/// Meyer's flooding over the color image.
///
/// `markers` holds scaled seed labels (> 0) and 0 for unknown; on return
/// every reachable pixel carries a label or `BOUNDARY`. Pixels enter a
/// 256-bucket queue keyed by the maximum channel difference to the labeled
/// neighbor that discovered them; buckets drain lowest level first. The
/// outer 1-pixel frame is boundary by construction.
fn flood(img: &RgbImage, markers: &mut [i32], w: usize, h: usize) {
    for x in 0..w {
        markers[x] = BOUNDARY;
        markers[(h - 1) * w + x] = BOUNDARY;
    }
    for y in 0..h {
        markers[y * w] = BOUNDARY;
        markers[y * w + w - 1] = BOUNDARY;
    }
    if w < 3 || h < 3 {
        return;
    }

    let raw = img.as_raw();
    let diff = |a: usize, b: usize| -> usize {
        let pa = &raw[a * 3..a * 3 + 3];
        let pb = &raw[b * 3..b * 3 + 3];
        let mut d = 0u8;
        for c in 0..3 {
            d = d.max(pa[c].abs_diff(pb[c]));
        }
        d as usize
    };

    let mut queues: Vec<VecDeque<usize>> = (0..256).map(|_| VecDeque::new()).collect();
    let mut active = queues.len();

    // every unknown pixel touching a seed enters at its cheapest edge
    for y in 1..h - 1 {
        for x in 1..w - 1 {
            let i = y * w + x;
            if markers[i] != 0 {
                continue;
            }
            let mut level = usize::MAX;
            for n in [i - 1, i + 1, i - w, i + w] {
                if markers[n] > 0 {
                    level = level.min(diff(i, n));
                }
            }
            if level != usize::MAX {
                markers[i] = IN_QUEUE;
                queues[level].push_back(i);
                active = active.min(level);
            }
        }
    }

    loop {
        if active >= queues.len() {
            break;
        }
        let Some(i) = queues[active].pop_front() else {
            active += 1;
            continue;
        };

        // adopt the label the labeled neighbors agree on; disagreement
        // makes a ridge pixel, which does not propagate
        let mut lab = 0i32;
        for n in [i - 1, i + 1, i - w, i + w] {
            let m = markers[n];
            if m > 0 {
                if lab == 0 {
                    lab = m;
                } else if m != lab {
                    lab = BOUNDARY;
                }
            }
        }
        markers[i] = lab;
        if lab == BOUNDARY {
            continue;
        }
        for n in [i - 1, i + 1, i - w, i + w] {
            if markers[n] == 0 {
                let level = diff(i, n);
                markers[n] = IN_QUEUE;
                queues[level].push_back(n);
                active = active.min(level);
            }
        }
    }
}
