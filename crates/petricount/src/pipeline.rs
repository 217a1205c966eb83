//! End-to-end counting run: binarize, find the plate, tune the mask, count.

use image::RgbImage;

use crate::config::CounterConfig;
use crate::controls::{ControlSource, PreviewSink};
use crate::crop::{apply_rgb, crop_rect};
use crate::draw::circle_outline;
use crate::plate::{self, Circle};
use crate::preprocess;
use crate::segment::{self, Method};
use crate::tune;

/// Everything a finished run produces.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// Color image with the segmentation overlay, cropped like the tuned
    /// binary.
    pub annotated: RgbImage,
    /// Metadata serialized next to the annotated image.
    pub summary: RunSummary,
}

/// Run metadata for the JSON summary and the CSV log.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct RunSummary {
    pub method: Method,
    pub count: usize,
    /// Confirmed plate rim, absent when the detector found none.
    pub plate: Option<Circle>,
    /// Input dimensions [width, height] before cropping.
    pub image_size: [u32; 2],
    /// Whether the auto-inversion heuristic fired on the binarized input.
    pub inverted: bool,
}

/// Drive the full counting pipeline over a loaded color image.
///
/// `original` is the resized photograph. The interactive stages poll
/// `source` and publish previews to `sink`; the chosen segmenter produces
/// the annotated image and the colony count. A run without a confirmed
/// plate skips masking and cropping and counts the full frame.
pub fn run(
    original: &RgbImage,
    method: Method,
    config: &CounterConfig,
    source: &mut dyn ControlSource,
    sink: &mut dyn PreviewSink,
) -> RunOutcome {
    let binary = preprocess::binarize_image(original, config.sharpen);
    let inverted = preprocess::detect_inverted(&binary);
    tracing::info!(
        width = original.width(),
        height = original.height(),
        inverted,
        "image binarized"
    );

    let plate = plate::detect(&binary, original, config, source, sink);
    if plate.is_none() {
        tracing::warn!("no plate rim confirmed, counting the full frame");
    }

    // rim overlay goes onto the color image before any cropping
    let mut color = original.clone();
    if let Some(p) = &plate {
        circle_outline(
            &mut color,
            (p.circle.cx, p.circle.cy),
            p.circle.r,
            2,
            config.highlight_rgb(),
        );
        if let Some(rect) = crop_rect(color.width(), color.height(), p.circle) {
            color = apply_rgb(&color, rect);
        }
    }

    let tuned = tune::tune(
        &binary,
        plate.as_ref(),
        inverted,
        config.inversion_defaults,
        source,
        sink,
    );

    let segmentation = match method {
        Method::Watershed => segment::watershed::count(&color, &tuned, config),
        Method::Hough => segment::hough::count(&color, &tuned, config, source, sink),
    };
    tracing::info!(count = segmentation.count, method = ?method, "run finished");

    RunOutcome {
        summary: RunSummary {
            method,
            count: segmentation.count,
            plate: plate.as_ref().map(|p| p.circle),
            image_size: [original.width(), original.height()],
            inverted,
        },
        annotated: segmentation.annotated,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controls::{NullPreview, ScriptedControls};
    use crate::plate::PLATE_STAGE;
    use crate::segment::hough::HOUGH_STAGE;
    use crate::test_utils::draw_plate_photo;

    #[test]
    fn watershed_run_counts_colonies_on_a_plate() {
        let photo = draw_plate_photo(
            400,
            400,
            (200, 200, 170),
            &[(150, 150, 12), (250, 160, 12), (200, 260, 12)],
        );
        // rim radius 170 needs the band widened to [160, 170]
        let mut source = ScriptedControls::defaults().stage(PLATE_STAGE, vec![vec![35, 100]]);
        let outcome = run(
            &photo,
            Method::Watershed,
            &CounterConfig::default(),
            &mut source,
            &mut NullPreview,
        );
        assert_eq!(outcome.summary.count, 3);
        assert!(outcome.summary.inverted, "plate fills most of the frame");
        let plate = outcome.summary.plate.expect("rim should be confirmed");
        assert!((plate.cx - 200).abs() <= 3 && (plate.cy - 200).abs() <= 3, "{plate:?}");
        assert!((168..=172).contains(&plate.r), "rim radius {}", plate.r);
        assert_eq!(outcome.summary.image_size, [400, 400]);
        assert_eq!(outcome.annotated.dimensions(), (400, 400), "square input is not cropped");
    }

    #[test]
    fn hough_run_counts_colonies_on_a_plate() {
        let photo = draw_plate_photo(
            400,
            400,
            (200, 200, 170),
            &[(150, 150, 12), (250, 160, 12), (200, 260, 12)],
        );
        let mut source = ScriptedControls::defaults()
            .stage(PLATE_STAGE, vec![vec![35, 100]])
            .stage(HOUGH_STAGE, vec![vec![0, 20, 20, 8, 18]]);
        let outcome = run(
            &photo,
            Method::Hough,
            &CounterConfig::default(),
            &mut source,
            &mut NullPreview,
        );
        assert_eq!(outcome.summary.count, 3);
        assert_eq!(outcome.summary.method, Method::Hough);
    }

    #[test]
    fn run_without_a_plate_counts_the_full_frame() {
        let mut photo = RgbImage::from_pixel(300, 300, image::Rgb([30, 30, 30]));
        for &(cx, cy, r) in &[(90i32, 90i32, 8i32), (210, 200, 8)] {
            imageproc::drawing::draw_filled_circle_mut(
                &mut photo,
                (cx, cy),
                r,
                image::Rgb([220, 220, 220]),
            );
        }
        let mut source = ScriptedControls::defaults();
        let outcome = run(
            &photo,
            Method::Watershed,
            &CounterConfig::default(),
            &mut source,
            &mut NullPreview,
        );
        assert!(outcome.summary.plate.is_none(), "no rim exists in the default band");
        assert!(!outcome.summary.inverted);
        assert_eq!(outcome.summary.count, 2);
        assert_eq!(outcome.annotated.dimensions(), (300, 300));
    }

    #[test]
    fn portrait_run_crops_to_the_plate() {
        let photo = draw_plate_photo(
            320,
            400,
            (160, 200, 150),
            &[(120, 180, 10), (200, 240, 10)],
        );
        // band [140.4, 150.4] for a 320 px short side
        let mut source = ScriptedControls::defaults().stage(PLATE_STAGE, vec![vec![44, 100]]);
        let outcome = run(
            &photo,
            Method::Watershed,
            &CounterConfig::default(),
            &mut source,
            &mut NullPreview,
        );
        assert_eq!(outcome.summary.count, 2);
        let (w, h) = outcome.annotated.dimensions();
        assert_eq!(w, h, "crop must be square");
        assert!((300..=330).contains(&w), "crop side {w} out of range");
        assert_eq!(outcome.summary.image_size, [320, 400], "summary keeps the input size");
    }
}
