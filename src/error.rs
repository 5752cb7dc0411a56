/// Error kinds surfaced by loading, converting and writing stacks.
use std::io;
use std::path::PathBuf;

use mrc_io::ReadError;
use thiserror::Error;

/// Failures while encoding an output file (TIFF stack or PNG preview).
#[derive(Error, Debug)]
pub enum EncodeError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("TIFF error: {0}")]
    Tiff(#[from] tiff::TiffError),
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}

#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("Failed to load {}: {source}", .path.display())]
    Load {
        path: PathBuf,
        #[source]
        source: ReadError,
    },
    #[error("Invalid volume: {0}")]
    InvalidVolume(String),
    #[error("No output directory selected")]
    NoOutputDirectory,
    #[error("No input files selected")]
    NoInputFiles,
    #[error("Failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: EncodeError,
    },
    #[error("Invalid pixel size {0} nm: must be finite and greater than zero")]
    InvalidCalibration(f64),
    #[error("Invalid target size {width}x{height}: both dimensions must be positive")]
    InvalidSize { width: u32, height: u32 },
    #[error("Frame {index} out of range: volume has {count} frames")]
    FrameOutOfRange { index: usize, count: usize },
    #[error("Output {} is already written for {}", .output.display(), .first.display())]
    OutputCollision { output: PathBuf, first: PathBuf },
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ConvertError {
    pub fn write(path: impl Into<PathBuf>, source: impl Into<EncodeError>) -> Self {
        ConvertError::Write {
            path: path.into(),
            source: source.into(),
        }
    }
}
