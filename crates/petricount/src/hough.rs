//! Gradient-voting Hough transform for circle detection.
//!
//! Two-stage method: edge pixels vote for center candidates along their
//! gradient direction at every radius in [r_min, r_max], then each accepted
//! center gets its radius from a histogram of edge-pixel distances. Both the
//! plate finder and the circle counter run on this primitive.

use image::GrayImage;

/// Configuration for the circle transform.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct HoughConfig {
    /// Minimum circle radius (pixels).
    pub r_min: f32,
    /// Maximum circle radius (pixels).
    pub r_max: f32,
    /// Canny high threshold; the low threshold is half of it.
    pub edge_threshold: f32,
    /// Minimum votes for a center candidate and minimum edge support for
    /// its estimated radius.
    pub accumulator_threshold: f32,
    /// Accumulator downscale factor (1 = full resolution).
    pub accumulator_scale: f32,
    /// Minimum distance between accepted centers (pixels).
    pub min_center_dist: f32,
}

impl Default for HoughConfig {
    fn default() -> Self {
        Self {
            r_min: 10.0,
            r_max: 50.0,
            edge_threshold: 100.0,
            accumulator_threshold: 10.0,
            accumulator_scale: 1.0,
            min_center_dist: 20.0,
        }
    }
}

/// A detected circle with the edge support behind its radius estimate.
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
pub struct CircleCandidate {
    /// Center x coordinate (pixels).
    pub cx: f32,
    /// Center y coordinate (pixels).
    pub cy: f32,
    /// Estimated radius (pixels).
    pub r: f32,
    /// Number of edge pixels supporting the radius.
    pub votes: f32,
}

/// Deposit a weighted vote into the accumulator using bilinear interpolation.
#[inline]
fn bilinear_add_in_bounds(accum: &mut [f32], stride: usize, x: f32, y: f32, weight: f32) {
    let x0 = x as usize;
    let y0 = y as usize;
    let fx = x - x0 as f32;
    let fy = y - y0 as f32;
    let base = y0 * stride + x0;
    accum[base] += weight * (1.0 - fx) * (1.0 - fy);
    accum[base + 1] += weight * fx * (1.0 - fy);
    accum[base + stride] += weight * (1.0 - fx) * fy;
    accum[base + stride + 1] += weight * fx * fy;
}

/// Detect circles via gradient voting.
///
/// Returns candidates sorted by edge support (highest first). Degenerate
/// inputs (tiny image, inverted radius band, no edges) yield an empty vec.
pub fn detect_circles(gray: &GrayImage, config: &HoughConfig) -> Vec<CircleCandidate> {
    let (w, h) = gray.dimensions();
    if w < 8 || h < 8 {
        return Vec::new();
    }
    if config.r_max < config.r_min {
        return Vec::new();
    }

    let thr = config.edge_threshold.max(1.0);
    let edges = imageproc::edges::canny(gray, 0.5 * thr, thr);
    let gx = imageproc::gradients::horizontal_sobel(gray);
    let gy = imageproc::gradients::vertical_sobel(gray);
    let edge_raw = edges.as_raw();
    let gx_raw = gx.as_raw();
    let gy_raw = gy.as_raw();

    // Edge pixels with their normalized gradient direction
    let stride = w as usize;
    let mut edge_pixels: Vec<(f32, f32, f32, f32)> = Vec::new();
    for y in 0..h as usize {
        let y_base = y * stride;
        for x in 0..stride {
            let idx = y_base + x;
            if edge_raw[idx] == 0 {
                continue;
            }
            let gxv = gx_raw[idx] as f32;
            let gyv = gy_raw[idx] as f32;
            let mag = (gxv * gxv + gyv * gyv).sqrt();
            if mag < 1e-6 {
                continue;
            }
            edge_pixels.push((x as f32, y as f32, gxv / mag, gyv / mag));
        }
    }
    if edge_pixels.is_empty() {
        return Vec::new();
    }

    let mut radii = Vec::new();
    let mut r = config.r_min.max(1.0);
    while r <= config.r_max {
        radii.push(r);
        r += 1.0;
    }
    if radii.is_empty() {
        return Vec::new();
    }

    // Center vote accumulation, downscaled by the accumulator scale
    let dp = config.accumulator_scale.max(1.0);
    let aw = ((w as f32 / dp).ceil() as usize).max(2);
    let ah = ((h as f32 / dp).ceil() as usize).max(2);
    let mut accum = vec![0.0f32; aw * ah];
    let ax_limit = (aw - 1) as f32;
    let ay_limit = (ah - 1) as f32;
    for &(xf, yf, dx, dy) in &edge_pixels {
        for &r in &radii {
            let vx_pos = (xf + dx * r) / dp;
            let vy_pos = (yf + dy * r) / dp;
            if vx_pos >= 0.0 && vx_pos < ax_limit && vy_pos >= 0.0 && vy_pos < ay_limit {
                bilinear_add_in_bounds(&mut accum, aw, vx_pos, vy_pos, 1.0);
            }

            let vx_neg = (xf - dx * r) / dp;
            let vy_neg = (yf - dy * r) / dp;
            if vx_neg >= 0.0 && vx_neg < ax_limit && vy_neg >= 0.0 && vy_neg < ay_limit {
                bilinear_add_in_bounds(&mut accum, aw, vx_neg, vy_neg, 1.0);
            }
        }
    }

    // Non-maximum suppression over the 8-neighborhood
    let offsets: [isize; 8] = [
        -(aw as isize) - 1,
        -(aw as isize),
        -(aw as isize) + 1,
        -1,
        1,
        aw as isize - 1,
        aw as isize,
        aw as isize + 1,
    ];
    let mut peaks: Vec<(f32, usize, usize)> = Vec::new();
    for y in 1..ah - 1 {
        for x in 1..aw - 1 {
            let idx = y * aw + x;
            let val = accum[idx];
            if val < config.accumulator_threshold {
                continue;
            }
            let mut is_max = true;
            for &off in &offsets {
                let nidx = idx.wrapping_add_signed(off);
                if accum[nidx] > val || (accum[nidx] == val && nidx < idx) {
                    is_max = false;
                    break;
                }
            }
            if is_max {
                peaks.push((val, x, y));
            }
        }
    }
    peaks.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap());

    // Greedy center thinning, strongest peak first
    let min_d_sq = config.min_center_dist.max(0.0).powi(2);
    let mut centers: Vec<(f32, f32)> = Vec::new();
    for &(_, ax, ay) in &peaks {
        let cx = ax as f32 * dp;
        let cy = ay as f32 * dp;
        let clear = centers.iter().all(|&(ox, oy)| {
            let ddx = cx - ox;
            let ddy = cy - oy;
            ddx * ddx + ddy * ddy >= min_d_sq
        });
        if clear {
            centers.push((cx, cy));
        }
    }

    // Radius from the best-supported distance bin; ties go to the larger
    // radius
    let r_lo = radii[0].round() as usize;
    let r_hi = (config.r_max.round() as usize).max(r_lo);
    let mut candidates = Vec::new();
    for (cx, cy) in centers {
        let mut hist = vec![0u32; r_hi - r_lo + 1];
        for &(xf, yf, _, _) in &edge_pixels {
            let d = ((xf - cx).powi(2) + (yf - cy).powi(2)).sqrt();
            let ri = d.round() as usize;
            if (r_lo..=r_hi).contains(&ri) {
                hist[ri - r_lo] += 1;
            }
        }
        let mut best_r = r_lo;
        let mut best_support = 0u32;
        for (i, &count) in hist.iter().enumerate() {
            if count >= best_support {
                best_support = count;
                best_r = r_lo + i;
            }
        }
        if (best_support as f32) < config.accumulator_threshold {
            continue;
        }
        candidates.push(CircleCandidate {
            cx,
            cy,
            r: best_r as f32,
            votes: best_support as f32,
        });
    }

    candidates.sort_by(|a, b| b.votes.partial_cmp(&a.votes).unwrap());
    candidates
}
