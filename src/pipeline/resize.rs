/// Lanczos-3 resampling of float frames to a target resolution.
///
/// Unlike a plain Lanczos resize, output samples are clamped to the finite
/// `[min, max]` of the source frame, so kernel overshoot at sharp edges never
/// produces values outside the input range.
use std::fmt;
use std::str::FromStr;

use image::imageops::{self, FilterType};
use image::{ImageBuffer, Luma};

use crate::data::volume::Frame;
use crate::error::ConvertError;

/// A validated output size; both dimensions are positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetSize {
    width: u32,
    height: u32,
}

impl TargetSize {
    pub fn new(width: u32, height: u32) -> Result<Self, ConvertError> {
        if width == 0 || height == 0 {
            return Err(ConvertError::InvalidSize { width, height });
        }
        Ok(Self { width, height })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }
}

impl fmt::Display for TargetSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl FromStr for TargetSize {
    type Err = String;

    /// Parse `WIDTHxHEIGHT`, e.g. `500x500`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (w, h) = s
            .trim()
            .split_once(['x', 'X'])
            .ok_or_else(|| format!("expected WIDTHxHEIGHT, got '{}'", s))?;
        let parse = |v: &str| {
            v.trim()
                .parse::<u32>()
                .map_err(|e| format!("invalid dimension '{}': {}", v, e))
        };
        TargetSize::new(parse(w)?, parse(h)?).map_err(|e| e.to_string())
    }
}

/// Resample `frame` to exactly `size` with a Lanczos-3 kernel.
///
/// Intensities are mapped to `[0, 1]` for resampling and mapped back, so
/// results stay within the source frame's finite range.
pub fn resize(frame: &Frame, size: TargetSize) -> Frame {
    let (w, h) = (size.width as usize, size.height as usize);
    let (lo, hi) = match frame.min_max() {
        Some(range) => range,
        None => return Frame::filled(w, h, f32::NAN),
    };
    if hi <= lo {
        return Frame::filled(w, h, lo);
    }
    let range = hi - lo;

    let unit: ImageBuffer<Luma<f32>, Vec<f32>> = ImageBuffer::from_fn(
        frame.width() as u32,
        frame.height() as u32,
        |x, y| Luma([(frame.get(x as usize, y as usize) - lo) / range]),
    );
    let resized = imageops::resize(&unit, size.width, size.height, FilterType::Lanczos3);

    Frame::from_fn(w, h, |x, y| {
        resized.get_pixel(x as u32, y as u32)[0].clamp(0.0, 1.0) * range + lo
    })
}
