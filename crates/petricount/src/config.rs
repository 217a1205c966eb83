//! Pipeline configuration shared by the analysis stages.

use image::Rgb;

/// Seed threshold applied to the normalized distance transform (0-255).
///
/// Foreground pixels above this value become watershed seed regions. The
/// value trades seed stability against small-colony recall: higher keeps
/// only deep blob interiors, lower admits shallower peaks.
pub const SEED_THRESHOLD: u8 = 110;

/// Stricter seed threshold from an earlier tuning pass.
///
/// Keeps only the deepest interiors; drops colonies whose normalized
/// distance peak stays below it. Available for plates with large, well
/// separated colonies.
pub const SEED_THRESHOLD_STRICT: u8 = 150;

/// Laplacian kernel used by the sharpening pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SharpenKernel {
    /// 4-connected cross kernel `[[0,1,0],[1,-4,1],[0,1,0]]`.
    #[default]
    Cross,
    /// 8-connected kernel `[[1,1,1],[1,-8,1],[1,1,1]]`; stronger response,
    /// more halo around sharp edges.
    Full,
}

/// Wiring of the auto-detected inversion flag into the mask-stage toggles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InversionDefaults {
    /// Both `invert plate` and `invert mask` start from the detected flag.
    #[default]
    Both,
    /// Only `invert mask` starts from the detected flag; `invert plate`
    /// starts off and is left to the operator.
    MaskOnly,
}

/// Tunable constants of the counting pipeline.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct CounterConfig {
    /// RGB color used for segment boundaries, circle outlines and the
    /// output frame.
    pub highlight: [u8; 3],
    /// Laplacian kernel for the sharpening pass.
    pub sharpen: SharpenKernel,
    /// Watershed seed threshold on the normalized distance map (0-255).
    pub seed_threshold: u8,
    /// How the auto-detected inversion flag seeds the mask-stage toggles.
    pub inversion_defaults: InversionDefaults,
}

impl Default for CounterConfig {
    fn default() -> Self {
        Self {
            highlight: [255, 0, 0],
            sharpen: SharpenKernel::Cross,
            seed_threshold: SEED_THRESHOLD,
            inversion_defaults: InversionDefaults::Both,
        }
    }
}

impl CounterConfig {
    /// The highlight color as an `image` pixel.
    pub fn highlight_rgb(&self) -> Rgb<u8> {
        Rgb(self.highlight)
    }
}
