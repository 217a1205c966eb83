//! Interactive mask tuning: plate-mask application, portrait crop and the
//! inversion/denoise toggles, refined live until the operator confirms.

use image::GrayImage;
use imageproc::distance_transform::Norm;
use imageproc::morphology;

use crate::config::InversionDefaults;
use crate::controls::{param, refine, ControlSource, ControlSpec, PreviewSink};
use crate::crop::{apply_gray, crop_rect};
use crate::draw::gray_to_rgb;
use crate::plate::Plate;

pub(crate) const TUNE_STAGE: &str = "tune";

/// Interactive clean-up of the binary image inside the plate.
///
/// Per tick: pixels outside the plate mask become `255 * invert mask`, the
/// portrait-crop rule is applied, `process more` runs an erode/dilate/erode
/// pass and `invert plate` flips the whole image. Without a plate the mask
/// and crop steps are skipped. The `auto_invert` flag seeds the toggle
/// defaults according to `wiring`.
pub(crate) fn tune(
    binary: &GrayImage,
    plate: Option<&Plate>,
    auto_invert: bool,
    wiring: InversionDefaults,
    source: &mut dyn ControlSource,
    sink: &mut dyn PreviewSink,
) -> GrayImage {
    let flag = i32::from(auto_invert);
    let plate_default = match wiring {
        InversionDefaults::Both => flag,
        InversionDefaults::MaskOnly => 0,
    };
    let specs = [
        ControlSpec::new("invert plate", 0, 1, plate_default),
        ControlSpec::new("invert mask", 0, 1, flag),
        ControlSpec::new("process more", 0, 1, 0),
    ];

    refine(TUNE_STAGE, &specs, source, sink, |values| {
        let invert_plate = param(values, &specs, 0) != 0;
        let invert_mask = param(values, &specs, 1) != 0;
        let process_more = param(values, &specs, 2) != 0;

        let mut tuned = binary.clone();
        if let Some(plate) = plate {
            let fill = if invert_mask { 255 } else { 0 };
            let mask_raw = plate.mask.as_raw();
            let stride = tuned.width() as usize;
            for (x, y, p) in tuned.enumerate_pixels_mut() {
                if mask_raw[y as usize * stride + x as usize] == 0 {
                    p[0] = fill;
                }
            }
            if let Some(rect) = crop_rect(tuned.width(), tuned.height(), plate.circle) {
                tuned = apply_gray(&tuned, rect);
            }
        }
        if process_more {
            tuned = morphology::erode(&tuned, Norm::LInf, 1);
            tuned = morphology::dilate(&tuned, Norm::LInf, 1);
            tuned = morphology::erode(&tuned, Norm::LInf, 1);
        }
        if invert_plate {
            image::imageops::invert(&mut tuned);
        }
        let preview = gray_to_rgb(&tuned);
        (tuned, preview)
    })
}
