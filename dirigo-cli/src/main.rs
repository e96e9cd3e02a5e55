//! Headless companion to the control panel.
//!
//! `plan` prints the stack plan and scan timing for a set of panel settings;
//! `acquire` runs a series or stack on the simulated engine and logs frames.
#![allow(clippy::uninlined_format_args)]

use std::path::PathBuf;
use std::thread;
use std::time::Instant;

use clap::{Args, Parser, Subcommand, ValueEnum};
use thiserror::Error;

use dirigo_core::session::POLL_INTERVAL;
use dirigo_core::timing::{frame_rate, line_rate};
use dirigo_core::{
    AcquisitionRequest, AcquisitionSession, CaptureMode, EditForm, FieldModel, FrameAverage,
    FrameField, FrameSpecModel, FramesPerFile, Frequency, LoggerSettings, ScanDirection,
    SessionOptions, StackAcquisitionSpec, StackField, StackSpecModel, ValidationError,
};
use dirigo_sim::{SimConfig, SimEngine};

/// Result type for CLI operations.
type Result<T> = std::result::Result<T, CliError>;

/// CLI error types.
#[derive(Error, Debug)]
enum CliError {
    #[error("invalid {field}: {source}")]
    Invalid {
        field: String,
        #[source]
        source: ValidationError,
    },

    #[error("acquisition error: {0}")]
    Core(#[from] dirigo_core::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Acquisition kinds that write frames to disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// Finite frame series
    Series,
    /// Z-stack through the configured depths
    Stack,
}

impl From<Mode> for CaptureMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Series => CaptureMode::Series,
            Mode::Stack => CaptureMode::Stack,
        }
    }
}

/// Frame settings, entered as on the panel (values carry units).
#[derive(Args, Debug, Clone, Default)]
struct FrameArgs {
    /// Frame width, e.g. "400 um"
    #[arg(long)]
    frame_width: Option<String>,
    /// Frame height; defaults to the width for square frames
    #[arg(long)]
    frame_height: Option<String>,
    /// Pixel width, e.g. "2 um"
    #[arg(long)]
    pixel_width: Option<String>,
    /// Pixel height; defaults to the width for square pixels
    #[arg(long)]
    pixel_height: Option<String>,
    /// Pixel dwell time for point-scanned systems, e.g. "1 us"
    #[arg(long)]
    pixel_time: Option<String>,
    /// Fraction of the line period spent acquiring, in (0, 1]
    #[arg(long)]
    fill_fraction: Option<String>,
    /// Frames per series
    #[arg(long)]
    frames: Option<String>,
    /// Scan in one direction only
    #[arg(long)]
    unidirectional: bool,
}

/// Stack bounds, entered as on the panel.
#[derive(Args, Debug, Clone, Default)]
struct StackArgs {
    /// Lower depth limit, e.g. "-200 um"
    #[arg(long)]
    lower: Option<String>,
    /// Upper depth limit
    #[arg(long)]
    upper: Option<String>,
    /// Depth spacing
    #[arg(long)]
    spacing: Option<String>,
    /// Number of depths; overrides the spacing
    #[arg(long)]
    depths: Option<String>,
}

/// Planning and headless acquisition for laser-scanning microscopes.
#[derive(Parser)]
#[command(name = "dirigo")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print frame shape, scan timing and the stack plan
    Plan {
        #[command(flatten)]
        frame: FrameArgs,

        #[command(flatten)]
        stack: StackArgs,

        /// Fast scanner frequency
        #[arg(long, default_value = "7.91 kHz")]
        scanner_frequency: String,

        /// Print the stack acquisition request as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run an acquisition on the simulated instrument and log it to TIFF
    Acquire {
        #[arg(short, long, value_enum, default_value = "series")]
        mode: Mode,

        #[command(flatten)]
        frame: FrameArgs,

        #[command(flatten)]
        stack: StackArgs,

        /// Directory the TIFF files are written to
        #[arg(short, long)]
        output: PathBuf,

        /// File basename
        #[arg(long, default_value = "")]
        basename: String,

        /// Frames per file, or "inf"
        #[arg(long, default_value = "256")]
        frames_per_file: String,

        /// Log digitizer frames instead of processed ones
        #[arg(long)]
        raw: bool,

        /// Rolling average window, 1 to 99
        #[arg(long, default_value = "1")]
        frames_averaged: String,

        /// Pace frames at the scanner's frame rate
        #[arg(long)]
        realtime: bool,
    },
}

fn invalid(field: impl ToString) -> impl FnOnce(ValidationError) -> CliError {
    move |source| CliError::Invalid {
        field: field.to_string(),
        source,
    }
}

/// Applies `(field, text)` edits in order through an [`EditForm`].
fn apply_edits<M: FieldModel>(
    model: M,
    edits: &[(M::Field, &Option<String>)],
) -> Result<M>
where
    M::Field: std::fmt::Display,
{
    let mut form = EditForm::new(model);
    for (field, raw) in edits {
        if let Some(raw) = raw {
            form.edit(*field, raw).map_err(invalid(field))?;
        }
    }
    Ok(form.snapshot())
}

impl FrameArgs {
    fn model(&self) -> Result<FrameSpecModel> {
        let mut model = match &self.pixel_time {
            Some(raw) => FrameSpecModel::with_pixel_time(
                dirigo_core::Time::parse(raw).map_err(invalid("pixel time"))?,
            ),
            None => FrameSpecModel::default(),
        };
        if self.unidirectional {
            model.direction = ScanDirection::Unidirectional;
        }
        model.square_frame = self.frame_height.is_none();
        model.square_pixel = self.pixel_height.is_none();
        apply_edits(
            model,
            &[
                (FrameField::FrameWidth, &self.frame_width),
                (FrameField::FrameHeight, &self.frame_height),
                (FrameField::PixelWidth, &self.pixel_width),
                (FrameField::PixelHeight, &self.pixel_height),
                (FrameField::PixelTime, &self.pixel_time),
                (FrameField::FillFraction, &self.fill_fraction),
                (FrameField::FramesPerSeries, &self.frames),
            ],
        )
    }
}

impl StackArgs {
    fn model(&self) -> Result<StackSpecModel> {
        apply_edits(
            StackSpecModel::default(),
            &[
                (StackField::Lower, &self.lower),
                (StackField::Upper, &self.upper),
                (StackField::Spacing, &self.spacing),
                (StackField::Depths, &self.depths),
            ],
        )
    }
}

fn plan(frame: &FrameArgs, stack: &StackArgs, scanner: &str, json: bool) -> Result<()> {
    let frame_model = frame.model()?;
    let stack_model = stack.model()?;
    let scanner = Frequency::parse(scanner).map_err(invalid("scanner frequency"))?;
    let spec = frame_model.generate_spec();

    if json {
        let request = StackAcquisitionSpec::new(spec, &stack_model);
        println!("{}", serde_json::to_string_pretty(&request)?);
        return Ok(());
    }

    let (width, height) = frame_model.shape();
    println!("Frame: {} x {}", frame_model.frame_width(), frame_model.frame_height());
    println!("Pixel: {} x {}", frame_model.pixel_width(), frame_model.pixel_height());
    println!("Shape: {} x {} pixels", width, height);
    println!("Scan: {}", frame_model.direction);
    println!("Line rate: {}", line_rate(&spec, scanner));
    println!("Frame rate: {}", frame_rate(&spec, scanner));
    println!();
    println!(
        "Stack: {} to {}, spacing {}, {} depth(s)",
        stack_model.lower(),
        stack_model.upper(),
        stack_model.spacing(),
        stack_model.depths()
    );
    let count = u32::try_from(stack_model.depths()).unwrap_or(0);
    for i in 0..count {
        println!("  {:>4}  {}", i, stack_model.depth(i));
    }
    Ok(())
}

struct AcquireArgs {
    mode: Mode,
    frame: FrameArgs,
    stack: StackArgs,
    output: PathBuf,
    basename: String,
    frames_per_file: String,
    raw: bool,
    frames_averaged: String,
    realtime: bool,
}

fn acquire(args: AcquireArgs) -> Result<()> {
    let frame = args.frame.model()?.generate_spec();
    let stack = args.stack.model()?;
    let logger = LoggerSettings {
        save_path: args.output,
        basename: args.basename,
        frames_per_file: args
            .frames_per_file
            .parse::<FramesPerFile>()
            .map_err(invalid("frames per file"))?,
        save_raw: args.raw,
    };
    let frames_averaged = args
        .frames_averaged
        .parse::<FrameAverage>()
        .map_err(invalid("frames averaged"))?;

    let engine = SimEngine::new(SimConfig {
        realtime: args.realtime,
        ..SimConfig::default()
    });
    let request: AcquisitionRequest = CaptureMode::from(args.mode).request(frame, &stack);
    let total = request.total_frames();
    let options = SessionOptions {
        logger: Some(logger.clone()),
        frames_averaged,
        ..SessionOptions::default()
    };

    let start = Instant::now();
    let mut session = AcquisitionSession::start(&engine, request, options)?;
    while session.is_alive() {
        thread::sleep(POLL_INTERVAL);
        log::debug!(
            "{} of {} frame(s) logged",
            session.frames_logged().unwrap_or(0),
            total.map_or_else(|| "?".to_string(), |t| t.to_string())
        );
    }
    session.stop()?;

    println!(
        "Logged {} frame(s) to {} in {:.2}s",
        session.frames_logged().unwrap_or(0),
        logger.save_path.display(),
        start.elapsed().as_secs_f64()
    );
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Plan {
            frame,
            stack,
            scanner_frequency,
            json,
        } => plan(&frame, &stack, &scanner_frequency, json),
        Commands::Acquire {
            mode,
            frame,
            stack,
            output,
            basename,
            frames_per_file,
            raw,
            frames_averaged,
            realtime,
        } => acquire(AcquireArgs {
            mode,
            frame,
            stack,
            output,
            basename,
            frames_per_file,
            raw,
            frames_averaged,
            realtime,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_args_follow_panel_rules() {
        let args = FrameArgs {
            frame_width: Some("100 um".into()),
            pixel_width: Some("5 um".into()),
            frames: Some("4".into()),
            ..FrameArgs::default()
        };
        let model = args.model().unwrap();
        assert_eq!(model.shape(), (20, 20));
        assert_eq!(model.frames_per_series(), 4);
    }

    #[test]
    fn test_rejected_frame_value_names_the_field() {
        let args = FrameArgs {
            pixel_width: Some("5".into()),
            ..FrameArgs::default()
        };
        let err = args.model().unwrap_err();
        assert!(matches!(err, CliError::Invalid { .. }));
        assert!(err.to_string().contains("Pixel width"));
    }

    #[test]
    fn test_stack_args_apply_in_order() {
        let args = StackArgs {
            upper: Some("0 um".into()),
            spacing: Some("50 um".into()),
            ..StackArgs::default()
        };
        assert_eq!(args.model().unwrap().depths(), 5);

        let args = StackArgs {
            depths: Some("0".into()),
            ..StackArgs::default()
        };
        assert!(args.model().is_err());
    }

    #[test]
    fn test_cli_parses_acquire() {
        let cli = Cli::try_parse_from([
            "dirigo", "acquire", "--mode", "stack", "--output", "/tmp/x", "--lower", "-10 um",
        ])
        .unwrap();
        match cli.command {
            Commands::Acquire {
                mode, stack, output, ..
            } => {
                assert_eq!(mode, Mode::Stack);
                assert_eq!(stack.lower.as_deref(), Some("-10 um"));
                assert_eq!(output, PathBuf::from("/tmp/x"));
            }
            Commands::Plan { .. } => panic!("parsed the wrong subcommand"),
        }
    }

    #[test]
    fn test_acquire_series_writes_tiff() {
        let dir = tempfile::tempdir().unwrap();
        acquire(AcquireArgs {
            mode: Mode::Series,
            frame: FrameArgs {
                pixel_width: Some("40 um".into()),
                frames: Some("3".into()),
                ..FrameArgs::default()
            },
            stack: StackArgs::default(),
            output: dir.path().to_path_buf(),
            basename: "run".into(),
            frames_per_file: "inf".into(),
            raw: false,
            frames_averaged: "2".into(),
            realtime: false,
        })
        .unwrap();
        assert!(dir.path().join("run.tif").is_file());
    }
}
