//! Hough colony counter: interactively tuned circle detection over the
//! tuned binary image.

use image::{GrayImage, RgbImage};

use super::Segmentation;
use crate::config::CounterConfig;
use crate::controls::{param, refine, ControlSource, ControlSpec, PreviewSink};
use crate::draw::circle_outline;
use crate::hough::{detect_circles, HoughConfig};

pub(crate) const HOUGH_STAGE: &str = "hough";

const HOUGH_SPECS: [ControlSpec; 5] = [
    ControlSpec::new("sensitivity", 0, 10, 0),
    ControlSpec::new("n-hood", 0, 30, 20),
    ControlSpec::new("accumulator", 1, 50, 20),
    ControlSpec::new("min radius", 0, 30, 15),
    ControlSpec::new("max radius", 0, 30, 15),
];

/// Interactive circle counting.
///
/// Every dialed value is shifted by +1 before reaching the transform, so
/// degenerate zeros never do. Each detected circle's outline is drawn on a
/// copy of the color image; the count is the number of circles in the last
/// pass before confirmation, zero when nothing was detected. Overlapping
/// detections count separately.
pub fn count(
    original: &RgbImage,
    tuned: &GrayImage,
    config: &CounterConfig,
    source: &mut dyn ControlSource,
    sink: &mut dyn PreviewSink,
) -> Segmentation {
    let color = config.highlight_rgb();
    refine(HOUGH_STAGE, &HOUGH_SPECS, source, sink, |values| {
        let hough = HoughConfig {
            accumulator_scale: (param(values, &HOUGH_SPECS, 0) + 1) as f32,
            min_center_dist: (param(values, &HOUGH_SPECS, 1) + 1) as f32,
            accumulator_threshold: (param(values, &HOUGH_SPECS, 2) + 1) as f32,
            r_min: (param(values, &HOUGH_SPECS, 3) + 1) as f32,
            r_max: (param(values, &HOUGH_SPECS, 4) + 1) as f32,
            edge_threshold: 101.0,
        };
        let circles = detect_circles(tuned, &hough);
        tracing::trace!(circles = circles.len(), "counting pass");
        let mut preview = original.clone();
        for c in &circles {
            circle_outline(
                &mut preview,
                (c.cx.round() as i32, c.cy.round() as i32),
                c.r.round() as i32,
                2,
                color,
            );
        }
        let state = Segmentation { annotated: preview.clone(), count: circles.len() };
        (state, preview)
    })
}
