//! Interactive stage machinery: parameter sources, preview sinks and the
//! polling loop shared by the adjustable pipeline stages.
//!
//! A stage declares its parameters once, then loops: read a snapshot,
//! recompute, push a preview, check for confirmation. The pacing lives in
//! the source (a terminal source blocks on operator input, a scripted
//! source returns instantly), so the same stage code runs live and headless.

use image::RgbImage;

/// Declaration of one adjustable integer parameter.
#[derive(Debug, Clone, Copy)]
pub struct ControlSpec {
    pub name: &'static str,
    pub min: i32,
    pub max: i32,
    pub default: i32,
}

impl ControlSpec {
    pub const fn new(name: &'static str, min: i32, max: i32, default: i32) -> Self {
        Self {
            name,
            min,
            max,
            default,
        }
    }

    /// Clamp a raw value into the declared range.
    pub fn clamp(&self, value: i32) -> i32 {
        value.clamp(self.min, self.max)
    }
}

/// Live source of parameter values for an interactive stage.
pub trait ControlSource {
    /// Called once when a stage starts; declares its adjustable parameters.
    fn begin(&mut self, stage: &str, specs: &[ControlSpec]);

    /// Current parameter snapshot, in declaration order. May block briefly
    /// while waiting for operator input.
    fn values(&mut self) -> Vec<i32>;

    /// True once the operator has accepted the current values.
    fn confirmed(&self) -> bool;
}

/// Receiver for per-snapshot preview renders.
pub trait PreviewSink {
    fn show(&mut self, stage: &str, preview: &RgbImage);
}

/// `PreviewSink` that discards every preview.
#[derive(Debug, Default)]
pub struct NullPreview;

impl PreviewSink for NullPreview {
    fn show(&mut self, _stage: &str, _preview: &RgbImage) {}
}

/// `ControlSource` replaying fixed snapshot sequences, keyed by stage name.
///
/// Each stage consumes its queued snapshots in order (values clamped to the
/// declared ranges, missing entries padded with defaults) and confirms once
/// the sequence is exhausted. Stages without a queued sequence run a single
/// pass on their declared defaults. This is the harness used by the crate's
/// own tests and by embedding code that wants a non-interactive run.
#[derive(Debug, Clone, Default)]
pub struct ScriptedControls {
    scripts: Vec<(String, Vec<Vec<i32>>)>,
    specs: Vec<ControlSpec>,
    current: Vec<Vec<i32>>,
    cursor: usize,
}

impl ScriptedControls {
    /// Run every stage straight through on its declared defaults.
    pub fn defaults() -> Self {
        Self::default()
    }

    /// Queue a snapshot sequence for the named stage.
    pub fn stage(mut self, stage: &str, snapshots: Vec<Vec<i32>>) -> Self {
        self.scripts.push((stage.to_string(), snapshots));
        self
    }
}

impl ControlSource for ScriptedControls {
    fn begin(&mut self, stage: &str, specs: &[ControlSpec]) {
        self.specs = specs.to_vec();
        self.current = self
            .scripts
            .iter()
            .find(|(name, _)| name == stage)
            .map(|(_, snapshots)| snapshots.clone())
            .unwrap_or_default();
        self.cursor = 0;
        tracing::debug!(stage, snapshots = self.current.len(), "scripted stage armed");
    }

    fn values(&mut self) -> Vec<i32> {
        let snapshot = self.current.get(self.cursor);
        if snapshot.is_some() {
            self.cursor += 1;
        }
        self.specs
            .iter()
            .enumerate()
            .map(|(i, spec)| {
                let raw = snapshot.and_then(|s| s.get(i).copied()).unwrap_or(spec.default);
                spec.clamp(raw)
            })
            .collect()
    }

    fn confirmed(&self) -> bool {
        self.cursor >= self.current.len()
    }
}

/// Drive one interactive stage to confirmation.
///
/// `render` maps a parameter snapshot to the stage state plus its preview;
/// the preview goes to the sink and the state from the last snapshot before
/// confirmation is returned.
pub fn refine<S, F>(
    stage: &str,
    specs: &[ControlSpec],
    source: &mut dyn ControlSource,
    sink: &mut dyn PreviewSink,
    mut render: F,
) -> S
where
    F: FnMut(&[i32]) -> (S, RgbImage),
{
    source.begin(stage, specs);
    tracing::info!(stage, "interactive stage started");
    loop {
        let values = source.values();
        let (state, preview) = render(&values);
        sink.show(stage, &preview);
        if source.confirmed() {
            tracing::info!(stage, "stage confirmed");
            return state;
        }
    }
}

/// Snapshot value at `idx`, falling back to the declared default when the
/// source returned a short vector.
pub(crate) fn param(values: &[i32], specs: &[ControlSpec], idx: usize) -> i32 {
    values.get(idx).copied().unwrap_or(specs[idx].default)
}
