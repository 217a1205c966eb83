//! Colony segmentation: two interchangeable counters over the tuned binary
//! image, one non-interactive (watershed), one interactively tuned (Hough).

use image::RgbImage;

pub mod hough;
pub mod watershed;

/// Counting method selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    Watershed,
    Hough,
}

impl Method {
    /// Single-letter tag used in output filenames and the CSV log.
    pub fn letter(self) -> char {
        match self {
            Method::Watershed => 'w',
            Method::Hough => 'h',
        }
    }
}

/// A segmentation outcome: the annotated color image plus the colony count.
#[derive(Debug, Clone)]
pub struct Segmentation {
    pub annotated: RgbImage,
    pub count: usize,
}
