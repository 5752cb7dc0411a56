/// In-memory volumes and frames, and the MRC volume loader.
///
/// A `Volume` is an ordered stack of equally sized floating-point frames
/// together with the physical pixel size used for scale bars.
use std::path::Path;

use image::{GrayImage, Luma};
use mrc_io::read_mrc_file;

use crate::error::ConvertError;

pub const ANGSTROM_PER_NM: f64 = 10.0;

/// Unit of the header's voxel size.
///
/// The header value is taken as nm per pixel. Files written to the MRC2014
/// convention store Ångström and need `Angstrom` to get the right scale.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum VoxelUnit {
    #[default]
    Nm,
    Angstrom,
}

impl VoxelUnit {
    pub fn to_nm(&self, voxel: f64) -> f64 {
        match self {
            VoxelUnit::Nm => voxel,
            VoxelUnit::Angstrom => voxel / ANGSTROM_PER_NM,
        }
    }
}

/// One 2D frame of `f32` intensities, row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    width: usize,
    height: usize,
    data: Vec<f32>,
}

impl Frame {
    /// Wrap `data` as a `width × height` frame. Returns `None` when the sample
    /// count does not match.
    #[cfg(test)]
    pub fn from_vec(width: usize, height: usize, data: Vec<f32>) -> Option<Self> {
        if data.len() != width * height {
            return None;
        }
        Some(Self {
            width,
            height,
            data,
        })
    }

    pub fn filled(width: usize, height: usize, value: f32) -> Self {
        Self {
            width,
            height,
            data: vec![value; width * height],
        }
    }

    /// Build a frame by evaluating `f(x, y)` for every pixel.
    pub fn from_fn(width: usize, height: usize, f: impl Fn(usize, usize) -> f32) -> Self {
        let mut data = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                data.push(f(x, y));
            }
        }
        Self {
            width,
            height,
            data,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn get(&self, x: usize, y: usize) -> f32 {
        self.data[y * self.width + x]
    }

    pub fn row(&self, y: usize) -> &[f32] {
        &self.data[y * self.width..(y + 1) * self.width]
    }

    /// Minimum and maximum over the finite samples, `None` if there are none.
    pub fn min_max(&self) -> Option<(f32, f32)> {
        self.data
            .iter()
            .copied()
            .filter(|v| v.is_finite())
            .fold(None, |acc, v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
    }

    /// Per-frame contrast stretch to 8 bits:
    /// `(v - min) / (max - min) * 255`, rounded.
    ///
    /// A constant frame maps to black; non-finite samples map to 0.
    pub fn to_gray8(&self) -> GrayImage {
        let (lo, hi) = self.min_max().unwrap_or((0.0, 0.0));
        let range = hi as f64 - lo as f64;
        let scaled: Vec<u8> = self
            .data
            .iter()
            .map(|&v| {
                if !v.is_finite() || range <= 0.0 {
                    0
                } else {
                    ((v as f64 - lo as f64) / range * 255.0).round().clamp(0.0, 255.0) as u8
                }
            })
            .collect();
        let width = self.width;
        GrayImage::from_fn(self.width as u32, self.height as u32, |x, y| {
            Luma([scaled[y as usize * width + x as usize]])
        })
    }

}

/// Ordered stack of equally sized frames plus the x/y pixel size.
#[derive(Debug, Clone, PartialEq)]
pub struct Volume {
    frames: Vec<Frame>,
    pixel_size_nm: f64,
}

impl Volume {
    /// Build a volume; every frame must share the first frame's dimensions.
    pub fn new(frames: Vec<Frame>, pixel_size_nm: f64) -> Result<Self, ConvertError> {
        let first = frames
            .first()
            .ok_or_else(|| ConvertError::InvalidVolume("volume has no frames".to_string()))?
            .dimensions();
        if let Some((i, f)) = frames
            .iter()
            .enumerate()
            .find(|(_, f)| f.dimensions() != first)
        {
            return Err(ConvertError::InvalidVolume(format!(
                "frame {} is {}x{}, expected {}x{}",
                i, f.width, f.height, first.0, first.1
            )));
        }
        Ok(Self {
            frames,
            pixel_size_nm,
        })
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn frame(&self, index: usize) -> Option<&Frame> {
        self.frames.get(index)
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// `(width, height)` shared by all frames.
    pub fn dimensions(&self) -> (usize, usize) {
        self.frames
            .first()
            .map(|f| f.dimensions())
            .unwrap_or((0, 0))
    }

    pub fn pixel_size_nm(&self) -> f64 {
        self.pixel_size_nm
    }

    pub fn set_pixel_size_nm(&mut self, pixel_size_nm: f64) {
        self.pixel_size_nm = pixel_size_nm;
    }

    pub fn reverse(&mut self) {
        self.frames.reverse();
    }

    /// Apply `f` to every frame. `f` must map all frames to the same size.
    pub fn map_frames(self, f: impl Fn(&Frame) -> Frame) -> Self {
        Self {
            frames: self.frames.iter().map(f).collect(),
            pixel_size_nm: self.pixel_size_nm,
        }
    }
}

/// Load every section of an MRC file as `f32` frames.
///
/// The pixel size is the x-axis voxel size read in `unit`.
pub fn load_volume(path: &Path, unit: VoxelUnit) -> Result<Volume, ConvertError> {
    let mrc = read_mrc_file(path).map_err(|source| ConvertError::Load {
        path: path.to_path_buf(),
        source,
    })?;

    let (nx, ny, nz) = mrc.header.dimensions();
    let voxel = mrc.header.voxel_size();
    let pixel_size_nm = unit.to_nm(voxel.x as f64);

    log::info!(
        "Loaded {}: {} frames of {}x{} ({}), pixel size {:.4} nm",
        path.display(),
        nz,
        nx,
        ny,
        mrc.header.mode,
        pixel_size_nm
    );

    let frames = mrc
        .data
        .chunks_exact(nx * ny)
        .map(|section| Frame {
            width: nx,
            height: ny,
            data: section.to_vec(),
        })
        .collect();
    Volume::new(frames, pixel_size_nm)
}
