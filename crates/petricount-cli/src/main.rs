//! petricount CLI: count bacterial colonies on a photographed agar plate.
//!
//! Loads a plate photograph, walks the operator through the interactive
//! stages on the terminal (plate rim, mask tuning, Hough parameters), then
//! writes the annotated result image, a JSON summary and a CSV log line.

use clap::{Parser, ValueEnum};
use std::path::{Path, PathBuf};
use std::time::Instant;

use image::{imageops::FilterType, Rgb, RgbImage};
use petricount::controls::{ControlSource, ControlSpec, PreviewSink};
use petricount::{framed, pipeline, CounterConfig, Method, RunOutcome};

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "petricount")]
#[command(
    about = "Count bacterial colonies on a photographed agar plate (seeded watershed or Hough circles)"
)]
#[command(version)]
struct Cli {
    /// Image file name, looked up under the `images/` directory.
    file: String,

    /// Counting method: `w` = seeded watershed, `h` = Hough circles.
    #[arg(value_enum, ignore_case = true)]
    method: MethodArg,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum MethodArg {
    /// Seeded watershed over the distance transform of the tuned mask.
    #[value(name = "w", alias = "watershed")]
    Watershed,
    /// Hough circle detection on the tuned mask.
    #[value(name = "h", alias = "hough")]
    Hough,
}

impl MethodArg {
    fn to_core(self) -> Method {
        match self {
            Self::Watershed => Method::Watershed,
            Self::Hough => Method::Hough,
        }
    }
}

// ── bench layout ───────────────────────────────────────────────────────

/// Fixed I/O layout: inputs under `images/`, results under `outputs/`,
/// one CSV log line appended to `data.csv` per run.
struct IoConfig {
    images_dir: PathBuf,
    out_dir: PathBuf,
    log_csv: PathBuf,
    target_width: u32,
}

impl Default for IoConfig {
    fn default() -> Self {
        Self {
            images_dir: PathBuf::from("images"),
            out_dir: PathBuf::from("outputs"),
            log_csv: PathBuf::from("data.csv"),
            target_width: 980,
        }
    }
}

// ── terminal controls ──────────────────────────────────────────────────

/// `ControlSource` that drives the interactive stages from stdin.
///
/// Each stage prints its parameters with their ranges, then reads lines of
/// the form `<name> <value>` (or `<name>=<value>`) and re-renders after
/// each one. `ok`, an empty read or end of input confirms the stage.
struct TerminalControls {
    specs: Vec<ControlSpec>,
    values: Vec<i32>,
    confirmed: bool,
    first_pass: bool,
}

impl TerminalControls {
    fn new() -> Self {
        Self {
            specs: Vec::new(),
            values: Vec::new(),
            confirmed: false,
            first_pass: true,
        }
    }

    fn print_state(&self) {
        for (spec, value) in self.specs.iter().zip(&self.values) {
            println!(
                "  {:<16} {:>4}   [{}..{}]",
                spec.name, value, spec.min, spec.max
            );
        }
        println!("Adjust with `<name> <value>`, confirm with `ok`.");
    }

    /// Apply one `name value` line. Unknown names and bad numbers are
    /// reported and leave the current values untouched.
    fn apply_line(&mut self, line: &str) {
        let (name, value) = match line.split_once('=') {
            Some((n, v)) => (n.trim(), v.trim()),
            // Parameter names contain spaces, so split at the last one.
            None => match line.rsplit_once(' ') {
                Some((n, v)) => (n.trim(), v.trim()),
                None => {
                    println!("Expected `<name> <value>`, got {:?}", line);
                    return;
                }
            },
        };
        let Some(idx) = self.specs.iter().position(|s| s.name == name) else {
            let names: Vec<&str> = self.specs.iter().map(|s| s.name).collect();
            println!("Unknown parameter {:?}; available: {}", name, names.join(", "));
            return;
        };
        match value.parse::<i32>() {
            Ok(v) => self.values[idx] = self.specs[idx].clamp(v),
            Err(e) => println!("Bad value {:?} for {:?}: {}", value, name, e),
        }
    }
}

impl ControlSource for TerminalControls {
    fn begin(&mut self, stage: &str, specs: &[ControlSpec]) {
        self.specs = specs.to_vec();
        self.values = specs.iter().map(|s| s.default).collect();
        self.confirmed = false;
        self.first_pass = true;
        println!();
        println!("── stage: {} ──", stage);
        self.print_state();
    }

    fn values(&mut self) -> Vec<i32> {
        if self.first_pass {
            // Render the defaults once so a preview exists before the
            // operator types anything.
            self.first_pass = false;
            return self.values.clone();
        }
        let mut line = String::new();
        match std::io::stdin().read_line(&mut line) {
            Ok(0) => self.confirmed = true,
            Ok(_) => {
                let line = line.trim();
                if line.eq_ignore_ascii_case("ok") {
                    self.confirmed = true;
                } else if !line.is_empty() {
                    self.apply_line(line);
                    self.print_state();
                }
                // An empty line falls through and re-renders as-is.
            }
            Err(e) => {
                tracing::warn!("stdin read failed, confirming stage: {}", e);
                self.confirmed = true;
            }
        }
        self.values.clone()
    }

    fn confirmed(&self) -> bool {
        self.confirmed
    }
}

// ── file previews ──────────────────────────────────────────────────────

/// `PreviewSink` that writes each stage preview into the output directory,
/// overwriting the previous snapshot of the same stage.
struct FilePreview {
    out_dir: PathBuf,
}

impl PreviewSink for FilePreview {
    fn show(&mut self, stage: &str, preview: &RgbImage) {
        let path = self.out_dir.join(format!("preview_{}.png", stage));
        match preview.save(&path) {
            Ok(()) => println!("Preview: {}", path.display()),
            Err(e) => tracing::warn!("Failed to save preview {}: {}", path.display(), e),
        }
    }
}

// ── image loading ──────────────────────────────────────────────────────

/// Load `file` from the images directory and scale it to the bench width,
/// truncating the height to whole pixels.
fn load_image(io: &IoConfig, file: &str) -> CliResult<RgbImage> {
    let path = io.images_dir.join(file);
    tracing::info!("Loading image: {}", path.display());
    let img = image::open(&path)
        .map_err(|e| -> CliError { format!("Failed to open image {}: {}", path.display(), e).into() })?
        .to_rgb8();

    let (w, h) = img.dimensions();
    if w == io.target_width {
        return Ok(img);
    }
    let scale = io.target_width as f32 / w as f32;
    let height = ((h as f32 * scale) as u32).max(1);
    tracing::debug!("Resized {}x{} -> {}x{}", w, h, io.target_width, height);
    Ok(image::imageops::resize(
        &img,
        io.target_width,
        height,
        FilterType::Triangle,
    ))
}

// ── output writing ─────────────────────────────────────────────────────

/// Write the framed result image, the JSON summary and the CSV log line.
fn write_outputs(
    io: &IoConfig,
    file: &str,
    outcome: &RunOutcome,
    highlight: Rgb<u8>,
    elapsed: f64,
) -> CliResult<()> {
    let stem = Path::new(file)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(file);
    let letter = outcome.summary.method.letter();

    let image_path = io
        .out_dir
        .join(format!("{}_{}_C{}.png", stem, letter, outcome.summary.count));
    framed(&outcome.annotated, highlight).save(&image_path)?;
    tracing::info!("Annotated image written to {}", image_path.display());

    let json = serde_json::to_string_pretty(&outcome.summary)?;
    let json_path = io.out_dir.join(format!("{}_{}.json", stem, letter));
    std::fs::write(&json_path, &json)?;
    tracing::info!("Summary written to {}", json_path.display());

    use std::io::Write as _;
    let mut log = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&io.log_csv)?;
    writeln!(log, "{},{},{},{}", file, elapsed, outcome.summary.count, letter)?;
    tracing::info!("Run logged to {}", io.log_csv.display());

    Ok(())
}

fn main() -> CliResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let io = IoConfig::default();
    let config = CounterConfig::default();
    let method = cli.method.to_core();

    let original = load_image(&io, &cli.file)?;
    std::fs::create_dir_all(&io.out_dir).map_err(|e| -> CliError {
        format!("Failed to create {}: {}", io.out_dir.display(), e).into()
    })?;

    let start = Instant::now();
    let mut controls = TerminalControls::new();
    let mut previews = FilePreview {
        out_dir: io.out_dir.clone(),
    };
    let outcome = pipeline::run(&original, method, &config, &mut controls, &mut previews);
    let elapsed = start.elapsed().as_secs_f64();

    println!();
    println!(
        "Final result: {} colonies found in {:.2} s",
        outcome.summary.count, elapsed
    );
    write_outputs(&io, &cli.file, &outcome, config.highlight_rgb(), elapsed)?;

    Ok(())
}
