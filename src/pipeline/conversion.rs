/// Batch conversion of MRC volumes into multi-page TIFF stacks
///
/// Every input file goes through the same fixed chain:
/// load → reverse → denoise → smooth → resize → encode → write.
/// Files are independent; a failure on one is recorded in the report and the
/// batch moves on to the next.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::command::ToolCommand;
use super::filters;
use super::resize::{resize, TargetSize};
use super::scale_bar::add_scale_bar;
use crate::data::tiff_stack::{write_tiff_stack, TiffStack};
use crate::data::volume::{load_volume, Volume, VoxelUnit};
use crate::error::ConvertError;
use crate::log::reproducibility::ReproLog;

/// Output resolution preset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Resolution {
    #[default]
    #[serde(rename = "full")]
    Full,
    #[serde(rename = "1920x1080")]
    Hd1080,
    #[serde(rename = "1280x720")]
    Hd720,
    #[serde(rename = "640x480")]
    Vga,
}

impl Resolution {
    pub const ALL: [Resolution; 4] = [
        Resolution::Full,
        Resolution::Hd1080,
        Resolution::Hd720,
        Resolution::Vga,
    ];

    /// Target `(width, height)`, `None` to keep the source size.
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        match self {
            Resolution::Full => None,
            Resolution::Hd1080 => Some((1920, 1080)),
            Resolution::Hd720 => Some((1280, 720)),
            Resolution::Vga => Some((640, 480)),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Resolution::Full => "full",
            Resolution::Hd1080 => "1920x1080",
            Resolution::Hd720 => "1280x720",
            Resolution::Vga => "640x480",
        }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Resolution {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Resolution::ALL
            .into_iter()
            .find(|r| r.label() == wanted)
            .ok_or_else(|| {
                format!(
                    "unknown resolution '{}' (expected one of: full, 1920x1080, 1280x720, 640x480)",
                    s
                )
            })
    }
}

/// Sample type written to the TIFF pages
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum SampleFormat {
    /// 32-bit float, source intensities
    #[default]
    F32,
    /// 8-bit, contrast-stretched per frame
    U8,
}

impl fmt::Display for SampleFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SampleFormat::F32 => "f32",
            SampleFormat::U8 => "u8",
        })
    }
}

/// Per-run conversion settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversionOptions {
    pub resolution: Resolution,
    pub reverse_order: bool,
    pub denoise: bool,
    pub smooth: bool,
    /// Burn a 500 nm scale bar into every page (forces 8-bit output)
    pub scale_bar: bool,
    pub sample_format: SampleFormat,
    /// Replaces the pixel size read from the header
    pub pixel_size_nm: Option<f64>,
    /// Unit of the header voxel size
    pub voxel_unit: VoxelUnit,
    /// Files converted concurrently; 1 is sequential
    pub jobs: usize,
    /// Cancel the rest of the batch after the first failed file
    pub fail_fast: bool,
}

impl Default for ConversionOptions {
    fn default() -> Self {
        Self {
            resolution: Resolution::Full,
            reverse_order: false,
            denoise: false,
            smooth: false,
            scale_bar: false,
            sample_format: SampleFormat::F32,
            pixel_size_nm: None,
            voxel_unit: VoxelUnit::Nm,
            jobs: 1,
            fail_fast: false,
        }
    }
}

impl ConversionOptions {
    /// Sample type actually written; a scale bar needs 8-bit pages.
    pub fn effective_format(&self) -> SampleFormat {
        if self.scale_bar {
            SampleFormat::U8
        } else {
            self.sample_format
        }
    }

    /// The `mrc2tiff` invocation that converts `input` with these options.
    pub fn to_command(&self, input: &Path, output_dir: &Path) -> ToolCommand {
        let mut cmd = ToolCommand::new("mrc2tiff")
            .arg("convert")
            .path(input)
            .arg("-o")
            .path(output_dir)
            .option("--resolution", self.resolution)
            .flag("--reverse", self.reverse_order)
            .flag("--denoise", self.denoise)
            .flag("--smooth", self.smooth)
            .flag("--scale-bar", self.scale_bar)
            .option("--format", self.sample_format);
        if let Some(px) = self.pixel_size_nm {
            cmd = cmd.option("--pixel-size-nm", px);
        }
        if self.voxel_unit == VoxelUnit::Angstrom {
            cmd = cmd.option("--voxel-unit", "angstrom");
        }
        cmd.describe(&format!("convert {}", input.display()))
    }
}

/// Everything one batch needs; no state is kept between requests.
#[derive(Debug, Clone, Default)]
pub struct ConversionRequest {
    pub inputs: Vec<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub options: ConversionOptions,
}

/// Shared flag that stops a batch before its next file.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug)]
pub enum FileStatus {
    Converted { output: PathBuf, pages: usize },
    Failed(ConvertError),
    /// Not started because the batch was cancelled
    Skipped,
}

#[derive(Debug)]
pub struct FileOutcome {
    pub input: PathBuf,
    pub status: FileStatus,
}

/// Per-file results of a batch, in input order.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub outcomes: Vec<FileOutcome>,
}

impl BatchReport {
    pub fn converted(&self) -> usize {
        self.count(|s| matches!(s, FileStatus::Converted { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(|s| matches!(s, FileStatus::Failed(_)))
    }

    pub fn skipped(&self) -> usize {
        self.count(|s| matches!(s, FileStatus::Skipped))
    }

    pub fn has_failures(&self) -> bool {
        self.failed() > 0
    }

    fn count(&self, pred: impl Fn(&FileStatus) -> bool) -> usize {
        self.outcomes.iter().filter(|o| pred(&o.status)).count()
    }

    pub fn summary(&self) -> String {
        format!(
            "{} converted, {} failed, {} skipped",
            self.converted(),
            self.failed(),
            self.skipped()
        )
    }
}

/// `<output_dir>/<input stem>.tiff`
pub fn output_path(input: &Path, output_dir: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "output".to_string());
    output_dir.join(format!("{}.tiff", stem))
}

/// Apply the optional reorder, filter and resize steps in their fixed order.
pub fn transform_volume(
    mut volume: Volume,
    options: &ConversionOptions,
    log: &mut ReproLog,
) -> Result<Volume, ConvertError> {
    if options.reverse_order {
        volume.reverse();
        log.add_entry("Reverse", &format!("{} frames", volume.len()), "");
    }
    if options.denoise {
        volume = volume.map_frames(filters::denoise);
        log.add_entry(
            "Denoise",
            &format!("Gaussian blur, sigma {}", filters::DENOISE_SIGMA),
            "",
        );
    }
    if options.smooth {
        volume = volume.map_frames(filters::smooth);
        log.add_entry(
            "Smooth",
            &format!("Gaussian blur, sigma {}", filters::SMOOTH_SIGMA),
            "",
        );
    }
    if let Some((w, h)) = options.resolution.dimensions() {
        let size = TargetSize::new(w, h)?;
        let (src_w, src_h) = volume.dimensions();
        let pixel_size = volume.pixel_size_nm() * src_w as f64 / w as f64;
        volume = volume.map_frames(|f| resize(f, size));
        volume.set_pixel_size_nm(pixel_size);
        log.add_entry(
            "Resize",
            &format!(
                "Lanczos3 {}x{} -> {}, pixel size {:.4} nm",
                src_w, src_h, size, pixel_size
            ),
            "",
        );
    }
    Ok(volume)
}

/// Turn every frame into a page of the run's sample type.
pub fn encode_stack(volume: &Volume, options: &ConversionOptions) -> Result<TiffStack, ConvertError> {
    let (w, h) = volume.dimensions();
    let (width, height) = (w as u32, h as u32);

    if options.scale_bar {
        let pages = volume
            .frames()
            .iter()
            .map(|f| add_scale_bar(&f.to_gray8(), volume.pixel_size_nm()).map(|img| img.into_raw()))
            .collect::<Result<Vec<_>, _>>()?;
        return Ok(TiffStack::Gray8 {
            width,
            height,
            pages,
        });
    }

    Ok(match options.sample_format {
        SampleFormat::F32 => TiffStack::Float32 {
            width,
            height,
            pages: volume.frames().iter().map(|f| f.data().to_vec()).collect(),
        },
        SampleFormat::U8 => TiffStack::Gray8 {
            width,
            height,
            pages: volume
                .frames()
                .iter()
                .map(|f| f.to_gray8().into_raw())
                .collect(),
        },
    })
}

/// Convert one file and return the written path and page count.
pub fn convert_file(
    input: &Path,
    output_dir: &Path,
    options: &ConversionOptions,
    log: &mut ReproLog,
) -> Result<(PathBuf, usize), ConvertError> {
    let mut volume = load_volume(input, options.voxel_unit)?;
    let (w, h) = volume.dimensions();
    log.add_entry(
        "Load",
        &format!(
            "{}: {} frames of {}x{}, pixel size {:.4} nm",
            input.display(),
            volume.len(),
            w,
            h,
            volume.pixel_size_nm()
        ),
        "",
    );

    if let Some(px) = options.pixel_size_nm {
        volume.set_pixel_size_nm(px);
        log.add_entry("Calibrate", &format!("pixel size set to {} nm", px), "");
    }

    let volume = transform_volume(volume, options, log)?;
    let stack = encode_stack(&volume, options)?;
    if options.scale_bar {
        log.add_entry(
            "Scale Bar",
            &format!("500 nm bar at {:.4} nm/px", volume.pixel_size_nm()),
            "",
        );
    }

    let output = output_path(input, output_dir);
    write_tiff_stack(&output, &stack).map_err(|e| ConvertError::write(&output, e))?;
    log.add_entry(
        "Write",
        &format!(
            "{} {} pages to {}",
            stack.page_count(),
            stack.sample_name(),
            output.display()
        ),
        &options.to_command(input, output_dir).to_command_string(),
    );
    log::info!(
        "Converted {} -> {} ({} pages)",
        input.display(),
        output.display(),
        stack.page_count()
    );

    Ok((output, stack.page_count()))
}

/// Pair each input with the earlier input that already claims its output
/// path, if any.
fn plan_outputs<'a>(
    inputs: &'a [PathBuf],
    output_dir: &Path,
) -> Vec<(&'a PathBuf, Option<&'a PathBuf>)> {
    let mut claimed: HashMap<PathBuf, &PathBuf> = HashMap::new();
    inputs
        .iter()
        .map(|input| {
            let output = output_path(input, output_dir);
            let clash = claimed.get(&output).copied();
            claimed.entry(output).or_insert(input);
            (input, clash)
        })
        .collect()
}

/// Convert every input of `request`.
///
/// Fails only when the request itself is unusable; per-file errors end up in
/// the returned report. Each file logs into its own `ReproLog`, appended to
/// `log` in input order.
pub fn convert_batch(
    request: &ConversionRequest,
    cancel: &CancelToken,
    log: &mut ReproLog,
) -> Result<BatchReport, ConvertError> {
    if request.inputs.is_empty() {
        return Err(ConvertError::NoInputFiles);
    }
    let output_dir = request
        .output_dir
        .as_deref()
        .ok_or(ConvertError::NoOutputDirectory)?;
    fs::create_dir_all(output_dir).map_err(|e| ConvertError::write(output_dir, e))?;

    let options = &request.options;
    let jobs = options.jobs.max(1);
    log.add_entry(
        "Batch",
        &format!(
            "{} files -> {} (resolution {}, format {}, jobs {})",
            request.inputs.len(),
            output_dir.display(),
            options.resolution,
            options.effective_format(),
            jobs
        ),
        "",
    );

    let planned = plan_outputs(&request.inputs, output_dir);

    let run_one = |&(input, clash): &(&PathBuf, Option<&PathBuf>)| -> (FileOutcome, ReproLog) {
        let mut file_log = ReproLog::new();
        file_log.set_source(&input.display().to_string());
        if let Some(first) = clash {
            let e = ConvertError::OutputCollision {
                output: output_path(input, output_dir),
                first: first.clone(),
            };
            log::error!("{}", e);
            file_log.add_entry("Failed", &e.to_string(), "");
            return (
                FileOutcome {
                    input: input.clone(),
                    status: FileStatus::Failed(e),
                },
                file_log,
            );
        }
        if cancel.is_cancelled() {
            log::warn!("Cancelled, skipping {}", input.display());
            file_log.add_entry("Skip", &format!("{}: batch cancelled", input.display()), "");
            return (
                FileOutcome {
                    input: input.clone(),
                    status: FileStatus::Skipped,
                },
                file_log,
            );
        }
        let status = match convert_file(input, output_dir, options, &mut file_log) {
            Ok((output, pages)) => FileStatus::Converted { output, pages },
            Err(e) => {
                log::error!("{}", e);
                file_log.add_entry("Failed", &e.to_string(), "");
                if options.fail_fast {
                    cancel.cancel();
                }
                FileStatus::Failed(e)
            }
        };
        (
            FileOutcome {
                input: input.clone(),
                status,
            },
            file_log,
        )
    };

    let results: Vec<(FileOutcome, ReproLog)> = if jobs == 1 {
        planned.iter().map(&run_one).collect()
    } else {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(jobs)
            .build()
            .map_err(|e| ConvertError::Config(format!("cannot start {} workers: {}", jobs, e)))?;
        pool.install(|| planned.par_iter().map(&run_one).collect())
    };

    let mut report = BatchReport::default();
    for (outcome, file_log) in results {
        log.append(file_log);
        report.outcomes.push(outcome);
    }
    log::info!("Batch finished: {}", report.summary());
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolution_parse_and_display() {
        for r in Resolution::ALL {
            assert_eq!(r.to_string().parse::<Resolution>().unwrap(), r);
        }
        assert_eq!("FULL".parse::<Resolution>().unwrap(), Resolution::Full);
        assert!("800x600".parse::<Resolution>().is_err());
        assert_eq!(Resolution::Vga.dimensions(), Some((640, 480)));
        assert_eq!(Resolution::Full.dimensions(), None);
    }

    #[test]
    fn test_options_serde_defaults() {
        let opts: ConversionOptions =
            serde_json::from_str(r#"{"resolution": "1280x720", "denoise": true}"#).unwrap();
        assert_eq!(opts.resolution, Resolution::Hd720);
        assert!(opts.denoise);
        assert!(!opts.smooth);
        assert_eq!(opts.sample_format, SampleFormat::F32);
        assert_eq!(opts.jobs, 1);

        let json = serde_json::to_string(&opts).unwrap();
        assert!(json.contains("\"1280x720\""));
        assert!(json.contains("\"f32\""));
    }

    #[test]
    fn test_scale_bar_forces_u8() {
        let mut opts = ConversionOptions::default();
        assert_eq!(opts.effective_format(), SampleFormat::F32);
        opts.scale_bar = true;
        assert_eq!(opts.effective_format(), SampleFormat::U8);
    }

    #[test]
    fn test_output_path_replaces_extension() {
        let dir = Path::new("/out");
        assert_eq!(
            output_path(Path::new("/data/run_01.mrc"), dir),
            PathBuf::from("/out/run_01.tiff")
        );
        assert_eq!(
            output_path(Path::new("stack.st.mrcs"), dir),
            PathBuf::from("/out/stack.st.tiff")
        );
    }

    #[test]
    fn test_command_line() {
        let opts = ConversionOptions {
            resolution: Resolution::Vga,
            denoise: true,
            pixel_size_nm: Some(1.5),
            ..Default::default()
        };
        let cmd = opts
            .to_command(Path::new("/d/a.mrc"), Path::new("/o"))
            .to_command_string();
        assert_eq!(
            cmd,
            "mrc2tiff convert /d/a.mrc -o /o --resolution 640x480 --denoise --format f32 --pixel-size-nm 1.5"
        );
    }

    #[test]
    fn test_plan_flags_shared_output_names() {
        let inputs = vec![
            PathBuf::from("x/a.mrc"),
            PathBuf::from("y/b.mrc"),
            PathBuf::from("y/a.mrc"),
            PathBuf::from("z/a.mrcs"),
        ];
        let plan = plan_outputs(&inputs, Path::new("/out"));
        let clashes: Vec<Option<&PathBuf>> = plan.iter().map(|(_, c)| *c).collect();
        assert_eq!(
            clashes,
            vec![None, None, Some(&inputs[0]), Some(&inputs[0])]
        );
    }

    #[test]
    fn test_cancel_token_is_shared() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
    }

    #[test]
    fn test_report_counts() {
        let report = BatchReport {
            outcomes: vec![
                FileOutcome {
                    input: "a".into(),
                    status: FileStatus::Converted {
                        output: "a.tiff".into(),
                        pages: 3,
                    },
                },
                FileOutcome {
                    input: "b".into(),
                    status: FileStatus::Failed(ConvertError::NoInputFiles),
                },
                FileOutcome {
                    input: "c".into(),
                    status: FileStatus::Skipped,
                },
            ],
        };
        assert_eq!(report.summary(), "1 converted, 1 failed, 1 skipped");
        assert!(report.has_failures());
    }
}
