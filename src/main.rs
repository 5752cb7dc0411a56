mod app;
mod config;
mod data;
mod error;
mod log;
mod pipeline;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};

use app::{Action, Outcome};
use config::Settings;
use data::volume::VoxelUnit;
use error::ConvertError;
use crate::log::reproducibility::ReproLog;
use pipeline::conversion::{CancelToken, ConversionRequest, FileStatus, Resolution, SampleFormat};
use pipeline::preview::PreviewRequest;
use pipeline::resize::TargetSize;

/// Convert MRC image stacks to multi-page TIFF.
#[derive(Parser, Debug)]
#[command(name = "mrc2tiff", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Convert MRC files into TIFF stacks, one output file per input
    Convert(ConvertArgs),
    /// Render one frame with its scale bar to a PNG
    Preview(PreviewArgs),
}

#[derive(Args, Debug)]
struct ConvertArgs {
    /// Input MRC files
    files: Vec<PathBuf>,

    /// Output directory (created if missing)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// full, 1920x1080, 1280x720 or 640x480
    #[arg(long)]
    resolution: Option<Resolution>,

    /// Reverse the frame order
    #[arg(long)]
    reverse: bool,

    /// Gaussian blur, sigma 1
    #[arg(long)]
    denoise: bool,

    /// Gaussian blur, sigma 2
    #[arg(long)]
    smooth: bool,

    /// Burn a 500 nm scale bar into every page (implies 8-bit output)
    #[arg(long)]
    scale_bar: bool,

    /// Output sample type
    #[arg(long, value_enum)]
    format: Option<SampleFormat>,

    /// Pixel size in nm, replacing the header calibration
    #[arg(long)]
    pixel_size_nm: Option<f64>,

    /// Unit of the header voxel size [default: nm]
    #[arg(long, value_enum)]
    voxel_unit: Option<VoxelUnit>,

    /// Files converted in parallel
    #[arg(short, long)]
    jobs: Option<usize>,

    /// Skip the remaining files after the first failure
    #[arg(long)]
    fail_fast: bool,

    /// JSON settings file; flags override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// Save the reproducibility log (.json, .sh or text)
    #[arg(long)]
    log: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct PreviewArgs {
    /// Input MRC file
    file: PathBuf,

    /// Frame index, 0-based
    #[arg(long, default_value_t = 0)]
    frame: usize,

    /// Preview size as WIDTHxHEIGHT [default: 500x500]
    #[arg(long)]
    size: Option<TargetSize>,

    /// Pixel size in nm, replacing the header calibration
    #[arg(long)]
    pixel_size_nm: Option<f64>,

    /// Unit of the header voxel size
    #[arg(long, value_enum, default_value_t = VoxelUnit::Nm)]
    voxel_unit: VoxelUnit,

    /// Output PNG
    #[arg(short, long)]
    output: PathBuf,

    /// Save the reproducibility log (.json, .sh or text)
    #[arg(long)]
    log: Option<PathBuf>,
}

impl ConvertArgs {
    /// Layer the command-line flags over the settings file.
    fn into_request(self) -> Result<(ConversionRequest, Option<PathBuf>), ConvertError> {
        let mut settings = match &self.config {
            Some(path) => Settings::load(path)?,
            None => Settings::default(),
        };

        if self.output.is_some() {
            settings.output_dir = self.output;
        }
        if self.log.is_some() {
            settings.log_file = self.log;
        }
        let opts = &mut settings.conversion;
        if let Some(resolution) = self.resolution {
            opts.resolution = resolution;
        }
        opts.reverse_order |= self.reverse;
        opts.denoise |= self.denoise;
        opts.smooth |= self.smooth;
        opts.scale_bar |= self.scale_bar;
        opts.fail_fast |= self.fail_fast;
        if let Some(format) = self.format {
            opts.sample_format = format;
        }
        if self.pixel_size_nm.is_some() {
            opts.pixel_size_nm = self.pixel_size_nm;
        }
        if let Some(unit) = self.voxel_unit {
            opts.voxel_unit = unit;
        }
        if let Some(jobs) = self.jobs {
            opts.jobs = jobs;
        }
        settings.validate()?;

        let request = ConversionRequest {
            inputs: self.files,
            output_dir: settings.output_dir,
            options: settings.conversion,
        };
        Ok((request, settings.log_file))
    }
}

fn run(cli: Cli) -> Result<bool, ConvertError> {
    let (action, log_file) = match cli.command {
        Command::Convert(args) => {
            let (request, log_file) = args.into_request()?;
            (Action::Convert(request), log_file)
        }
        Command::Preview(args) => {
            if let Some(px) = args.pixel_size_nm {
                if !px.is_finite() || px <= 0.0 {
                    return Err(ConvertError::InvalidCalibration(px));
                }
            }
            let request = PreviewRequest {
                input: args.file,
                frame: args.frame,
                size: args.size,
                pixel_size_nm: args.pixel_size_nm,
                voxel_unit: args.voxel_unit,
                output: args.output,
            };
            (Action::Preview(request), args.log)
        }
    };

    let cancel = CancelToken::new();
    let mut repro = ReproLog::new();
    let result = app::dispatch(action, &cancel, &mut repro);

    if let Some(path) = log_file {
        match repro.save(&path) {
            Ok(()) => ::log::info!("Reproducibility log saved to {}", path.display()),
            Err(e) => ::log::error!("Failed to save log {}: {}", path.display(), e),
        }
    }

    let outcome = result?;
    if let Outcome::Converted(report) = &outcome {
        for o in &report.outcomes {
            match &o.status {
                FileStatus::Converted { output, pages } => {
                    println!("{} -> {} ({} pages)", o.input.display(), output.display(), pages)
                }
                FileStatus::Failed(e) => println!("{}: FAILED: {}", o.input.display(), e),
                FileStatus::Skipped => println!("{}: skipped", o.input.display()),
            }
        }
        println!("{}", report.summary());
    }
    Ok(outcome.is_success())
}

fn main() -> ExitCode {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_secs()
        .init();

    ::log::debug!("mrc2tiff v{}", env!("CARGO_PKG_VERSION"));

    match run(Cli::parse()) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            ::log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::test_support::scratch_dir;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("mrc2tiff").chain(args.iter().copied())).unwrap()
    }

    fn convert_args(args: &[&str]) -> ConvertArgs {
        match parse(args).command {
            Command::Convert(a) => a,
            other => panic!("expected convert, got {:?}", other),
        }
    }

    #[test]
    fn test_convert_flags() {
        let (req, log) = convert_args(&[
            "convert", "a.mrc", "b.mrc", "-o", "out", "--resolution", "640x480", "--reverse",
            "--denoise", "--format", "u8", "--pixel-size-nm", "1.2", "-j", "3", "--log", "run.sh",
        ])
        .into_request()
        .unwrap();

        assert_eq!(req.inputs, vec![PathBuf::from("a.mrc"), PathBuf::from("b.mrc")]);
        assert_eq!(req.output_dir, Some(PathBuf::from("out")));
        assert_eq!(req.options.resolution, Resolution::Vga);
        assert!(req.options.reverse_order && req.options.denoise);
        assert!(!req.options.smooth && !req.options.scale_bar);
        assert_eq!(req.options.sample_format, SampleFormat::U8);
        assert_eq!(req.options.pixel_size_nm, Some(1.2));
        assert_eq!(req.options.voxel_unit, VoxelUnit::Nm);
        assert!(!req.options.fail_fast);
        assert_eq!(req.options.jobs, 3);
        assert_eq!(log, Some(PathBuf::from("run.sh")));
    }

    #[test]
    fn test_flags_override_config() {
        let dir = scratch_dir();
        let cfg = dir.join("cfg.json");
        std::fs::write(
            &cfg,
            r#"{ "output_dir": "from-config", "conversion": { "resolution": "1280x720", "smooth": true, "jobs": 2 } }"#,
        )
        .unwrap();

        let (req, _) = convert_args(&[
            "convert", "x.mrc", "--config", cfg.to_str().unwrap(), "--resolution", "full",
        ])
        .into_request()
        .unwrap();
        assert_eq!(req.output_dir, Some(PathBuf::from("from-config")));
        assert_eq!(req.options.resolution, Resolution::Full);
        assert!(req.options.smooth);
        assert_eq!(req.options.jobs, 2);
    }

    #[test]
    fn test_voxel_unit_flag() {
        let (req, _) = convert_args(&["convert", "a.mrc", "-o", "o", "--voxel-unit", "angstrom"])
            .into_request()
            .unwrap();
        assert_eq!(req.options.voxel_unit, VoxelUnit::Angstrom);
        assert!(!req.options.fail_fast);

        match parse(&["preview", "a.mrc", "-o", "p.png"]).command {
            Command::Preview(a) => assert_eq!(a.voxel_unit, VoxelUnit::Nm),
            other => panic!("expected preview, got {:?}", other),
        }
    }

    #[test]
    fn test_rejects_bad_values() {
        let bad_res = Cli::try_parse_from(["mrc2tiff", "convert", "a.mrc", "--resolution", "800x600"]);
        assert!(bad_res.is_err());

        let bad_px = convert_args(&["convert", "a.mrc", "-o", "o", "--pixel-size-nm", "0"]).into_request();
        assert!(matches!(bad_px, Err(ConvertError::InvalidCalibration(_))));

        let bad_jobs = convert_args(&["convert", "a.mrc", "-o", "o", "-j", "0"]).into_request();
        assert!(matches!(bad_jobs, Err(ConvertError::Config(_))));
    }

    #[test]
    fn test_preview_args() {
        match parse(&["preview", "a.mrc", "--frame", "2", "--size", "320x240", "-o", "p.png"]).command {
            Command::Preview(a) => {
                assert_eq!(a.frame, 2);
                assert_eq!(a.size, Some(TargetSize::new(320, 240).unwrap()));
                assert_eq!(a.output, PathBuf::from("p.png"));
            }
            other => panic!("expected preview, got {:?}", other),
        }
    }
}
