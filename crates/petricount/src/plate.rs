//! Plate rim detection: an interactively tuned Hough search over a narrow
//! radius band near half the image size, yielding the rim circle and its
//! filled interior mask.

use image::{GrayImage, Luma, RgbImage};
use imageproc::drawing::draw_filled_circle_mut;

use crate::config::CounterConfig;
use crate::controls::{param, refine, ControlSource, ControlSpec, PreviewSink};
use crate::draw::circle_outline;
use crate::hough::{detect_circles, HoughConfig};

/// Integer circle in image coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Circle {
    pub cx: i32,
    pub cy: i32,
    pub r: i32,
}

/// Confirmed plate: the rim circle and its filled interior mask.
#[derive(Debug, Clone)]
pub struct Plate {
    pub circle: Circle,
    pub mask: GrayImage,
}

pub(crate) const PLATE_STAGE: &str = "plate";

const PLATE_SPECS: [ControlSpec; 2] = [
    ControlSpec::new("plate radius", 0, 50, 25),
    ControlSpec::new("radius offset", 0, 200, 100),
];

/// One Hough pass over the rim band implied by the trackbar values.
///
/// The band's upper edge sits at half the short image side plus the dialed
/// percentage of it, the lower edge 10 px below that. Among the candidates
/// the largest radius wins (first such candidate on ties), then the
/// radius-offset percentage rescales it, truncating.
pub(crate) fn find_plate_circle(
    binary: &GrayImage,
    plate_radius: i32,
    radius_offset: i32,
) -> Option<Circle> {
    let max_possible = binary.width().min(binary.height()) as f32 / 2.0;
    let max_radius = max_possible * (plate_radius as f32 / 100.0) + max_possible * 0.5;
    let config = HoughConfig {
        r_min: max_radius - 10.0,
        r_max: max_radius,
        edge_threshold: 100.0,
        accumulator_threshold: 10.0,
        accumulator_scale: 1.0,
        min_center_dist: 20.0,
    };
    let candidates = detect_circles(binary, &config);
    let mut best = *candidates.first()?;
    for c in &candidates[1..] {
        if c.r > best.r {
            best = *c;
        }
    }
    Some(Circle {
        cx: best.cx.round() as i32,
        cy: best.cy.round() as i32,
        r: (best.r.round() * (radius_offset as f32 / 100.0)) as i32,
    })
}

/// Filled rim interior as a {0, 255} mask.
pub(crate) fn plate_mask(width: u32, height: u32, circle: Circle) -> GrayImage {
    let mut mask = GrayImage::new(width, height);
    draw_filled_circle_mut(&mut mask, (circle.cx, circle.cy), circle.r, Luma([255]));
    mask
}

/// Interactive plate search over the binary image, previewed on the color
/// original (rim outline and center dot in the configured highlight).
///
/// The last circle found persists across snapshots, so a band that loses
/// the rim keeps the previous fit on screen and in the confirmed result.
/// Returns `None` only when no snapshot ever produced a circle.
pub fn detect(
    binary: &GrayImage,
    color: &RgbImage,
    config: &CounterConfig,
    source: &mut dyn ControlSource,
    sink: &mut dyn PreviewSink,
) -> Option<Plate> {
    let highlight = config.highlight_rgb();
    let mut last: Option<Circle> = None;
    let found = refine(PLATE_STAGE, &PLATE_SPECS, source, sink, |values| {
        if let Some(c) = find_plate_circle(
            binary,
            param(values, &PLATE_SPECS, 0),
            param(values, &PLATE_SPECS, 1),
        ) {
            last = Some(c);
        }
        let mut preview = color.clone();
        if let Some(c) = last {
            circle_outline(&mut preview, (c.cx, c.cy), c.r, 2, highlight);
            draw_filled_circle_mut(&mut preview, (c.cx, c.cy), 3, highlight);
        }
        (last, preview)
    });
    let circle = found?;
    tracing::debug!(cx = circle.cx, cy = circle.cy, r = circle.r, "plate rim confirmed");
    Some(Plate {
        circle,
        mask: plate_mask(binary.width(), binary.height(), circle),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controls::{NullPreview, ScriptedControls};
    use image::Rgb;

    /// Sink keeping the most recent preview for inspection.
    #[derive(Default)]
    struct LastPreview(Option<RgbImage>);

    impl PreviewSink for LastPreview {
        fn show(&mut self, _stage: &str, preview: &RgbImage) {
            self.0 = Some(preview.clone());
        }
    }

    /// Thin bright ring, optionally missing its fourth quadrant.
    fn stamp_ring(img: &mut GrayImage, cx: f32, cy: f32, r: f32, dashed: bool) {
        for y in 0..img.height() {
            for x in 0..img.width() {
                let dx = x as f32 - cx;
                let dy = y as f32 - cy;
                if dashed && dx > 0.0 && dy < 0.0 {
                    continue;
                }
                if ((dx * dx + dy * dy).sqrt() - r).abs() <= 1.0 {
                    img.put_pixel(x, y, Luma([255]));
                }
            }
        }
    }

    #[test]
    fn mask_is_a_filled_circle() {
        let mask = plate_mask(100, 100, Circle { cx: 50, cy: 50, r: 30 });
        assert_eq!(mask.get_pixel(50, 50)[0], 255);
        assert_eq!(mask.get_pixel(50, 22)[0], 255, "just inside the rim");
        assert_eq!(mask.get_pixel(50, 19)[0], 0, "just outside the rim");
        assert_eq!(mask.get_pixel(95, 95)[0], 0);
        let white = mask.as_raw().iter().filter(|&&v| v == 255).count();
        assert!(
            (2500..3100).contains(&white),
            "filled area {white} far from the expected disk area"
        );
    }

    #[test]
    fn largest_radius_wins_over_stronger_support() {
        // band for plate_radius = 10 on a 300 px short side: [80, 90]
        let mut img = GrayImage::new(600, 300);
        stamp_ring(&mut img, 440.0, 150.0, 85.0, false);
        stamp_ring(&mut img, 150.0, 150.0, 89.0, true);
        let circle = find_plate_circle(&img, 10, 100).unwrap();
        assert!(
            (circle.cx - 150).abs() <= 4 && (circle.cy - 150).abs() <= 4,
            "expected the larger dashed ring's center, got {circle:?}"
        );
        assert!((87..=91).contains(&circle.r), "radius {} not near 89", circle.r);
    }

    #[test]
    fn radius_offset_rescales_the_result() {
        let mut img = GrayImage::new(600, 300);
        stamp_ring(&mut img, 150.0, 150.0, 85.0, false);
        let full = find_plate_circle(&img, 10, 100).unwrap();
        let half = find_plate_circle(&img, 10, 50).unwrap();
        assert_eq!(half.cx, full.cx);
        assert_eq!(half.r, (full.r as f32 * 0.5) as i32);
    }

    #[test]
    fn empty_band_gives_none() {
        let img = GrayImage::new(300, 300);
        assert_eq!(find_plate_circle(&img, 25, 100), None);
    }

    #[test]
    fn detect_confirms_a_plate_with_mask() {
        // default band on a 300 px short side: [102.5, 112.5]
        let mut binary = GrayImage::new(300, 300);
        stamp_ring(&mut binary, 150.0, 150.0, 107.0, false);
        let color = RgbImage::new(300, 300);
        let config = CounterConfig::default();
        let mut source = ScriptedControls::defaults();
        let mut sink = NullPreview;
        let plate = detect(&binary, &color, &config, &mut source, &mut sink)
            .expect("rim in the default band should be found");
        assert!((plate.circle.cx - 150).abs() <= 4);
        assert!((105..=110).contains(&plate.circle.r), "radius {}", plate.circle.r);
        assert_eq!(plate.mask.get_pixel(150, 150)[0], 255);
        assert_eq!(plate.mask.get_pixel(2, 2)[0], 0);
    }

    #[test]
    fn detect_without_a_rim_is_none() {
        let binary = GrayImage::new(300, 300);
        let color = RgbImage::new(300, 300);
        let config = CounterConfig::default();
        let mut source = ScriptedControls::defaults();
        let mut sink = NullPreview;
        assert!(detect(&binary, &color, &config, &mut source, &mut sink).is_none());
    }

    #[test]
    fn confirmed_circle_survives_a_failed_final_snapshot() {
        // bands per snapshot on a 300 px short side: [102.5, 112.5], then
        // [65, 75] where the ring cannot be found
        let mut binary = GrayImage::new(300, 300);
        stamp_ring(&mut binary, 150.0, 150.0, 107.0, false);
        let color = RgbImage::new(300, 300);
        let config = CounterConfig::default();
        let mut source =
            ScriptedControls::defaults().stage(PLATE_STAGE, vec![vec![25, 100], vec![0, 100]]);
        let mut sink = NullPreview;
        let plate = detect(&binary, &color, &config, &mut source, &mut sink)
            .expect("circle from the first snapshot must survive the empty band");
        assert!((plate.circle.cx - 150).abs() <= 4);
        assert!((105..=110).contains(&plate.circle.r), "radius {}", plate.circle.r);
    }

    #[test]
    fn preview_uses_the_configured_highlight() {
        let mut binary = GrayImage::new(300, 300);
        stamp_ring(&mut binary, 150.0, 150.0, 107.0, false);
        let color = RgbImage::new(300, 300);
        let config = CounterConfig {
            highlight: [0, 200, 255],
            ..CounterConfig::default()
        };
        let mut source = ScriptedControls::defaults();
        let mut sink = LastPreview::default();
        let plate = detect(&binary, &color, &config, &mut source, &mut sink)
            .expect("rim in the default band should be found");
        let preview = sink.0.expect("detect must push a preview");
        let c = plate.circle;
        let rim = preview.get_pixel(c.cx as u32, (c.cy - c.r) as u32);
        assert_eq!(rim, &Rgb([0, 200, 255]), "rim outline ignores the config color");
        let dot = preview.get_pixel(c.cx as u32, c.cy as u32);
        assert_eq!(dot, &Rgb([0, 200, 255]), "center dot ignores the config color");
    }
}
