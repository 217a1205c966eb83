//! petricount: bacterial colony counting on agar-plate photographs.
//!
//! The pipeline stages are:
//!
//! 1. **Preprocess** – Laplacian sharpening, Otsu binarization,
//!    morphological opening.
//! 2. **Plate** – interactive Hough search for the dish rim in a narrow
//!    radius band near half the image size.
//! 3. **Tune** – plate masking, portrait square crop, inversion and
//!    denoise toggles, interactively refined.
//! 4. **Segment** – colony counting by seeded watershed flooding or by
//!    direct Hough circle detection.
//!
//! # Public API
//! - [`pipeline::run`] as the primary entry point
//! - [`controls`] for driving the interactive stages (live UI or scripted)
//! - [`CounterConfig`] for tuning
//!
//! Terminal prompts, preview files and output writing live in the CLI
//! crate; the library stays synchronous and UI-free.

mod crop;
mod draw;
mod hough;
mod plate;
mod preprocess;
mod tune;

pub mod config;
pub mod controls;
pub mod pipeline;
pub mod segment;

#[cfg(test)]
mod test_utils;

pub use config::{CounterConfig, InversionDefaults, SharpenKernel};
pub use draw::framed;
pub use hough::{detect_circles, CircleCandidate, HoughConfig};
pub use pipeline::{run, RunOutcome, RunSummary};
pub use plate::{Circle, Plate};
pub use segment::{Method, Segmentation};
