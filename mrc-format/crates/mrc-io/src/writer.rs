//! MRC writer: header + voxel block to files or streams.

use byteorder::{BigEndian, LittleEndian};
use mrc_core::{Endian, Mode, MrcHeader};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use thiserror::Error;

use crate::samples::encode_samples;

#[derive(Error, Debug)]
pub enum WriteError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Cannot write data mode: {0}")]
    UnsupportedMode(Mode),
    #[error("Sample count mismatch: header describes {expected}, got {got}")]
    Length { expected: usize, got: usize },
}

/// Fill DMIN, DMAX, DMEAN and RMS from the samples.
pub fn update_statistics(header: &mut MrcHeader, data: &[f32]) {
    if data.is_empty() {
        return;
    }
    let (mut min, mut max, mut sum) = (f32::INFINITY, f32::NEG_INFINITY, 0.0f64);
    for &v in data {
        min = min.min(v);
        max = max.max(v);
        sum += v as f64;
    }
    let mean = sum / data.len() as f64;
    let var = data
        .iter()
        .map(|&v| (v as f64 - mean).powi(2))
        .sum::<f64>()
        / data.len() as f64;

    header.dmin = min;
    header.dmax = max;
    header.dmean = mean as f32;
    header.rms = var.sqrt() as f32;
}

/// Write a complete volume. The extended header, if `nsymbt > 0`, is
/// zero-filled. Header statistics are recomputed from `data`.
pub fn write_volume<W: Write>(
    writer: &mut W,
    header: &MrcHeader,
    data: &[f32],
) -> Result<(), WriteError> {
    let (nx, ny, nz) = header.dimensions();
    let expected = nx * ny * nz;
    if data.len() != expected {
        return Err(WriteError::Length {
            expected,
            got: data.len(),
        });
    }

    let mut header = header.clone();
    update_statistics(&mut header, data);

    let body = match header.endian {
        Endian::Little => encode_samples::<LittleEndian>(data, header.mode),
        Endian::Big => encode_samples::<BigEndian>(data, header.mode),
    }
    .ok_or(WriteError::UnsupportedMode(header.mode))?;

    writer.write_all(&header.to_bytes())?;
    writer.write_all(&vec![0u8; header.nsymbt.max(0) as usize])?;
    writer.write_all(&body)?;
    Ok(())
}

/// Create `path` and write the volume into it.
pub fn write_mrc_file(path: &Path, header: &MrcHeader, data: &[f32]) -> Result<(), WriteError> {
    let mut out = BufWriter::new(File::create(path)?);
    write_volume(&mut out, header, data)?;
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_length_mismatch() {
        let header = MrcHeader::new(2, 2, 2, Mode::Float32);
        let mut out = Vec::new();
        assert!(matches!(
            write_volume(&mut out, &header, &[0.0; 7]),
            Err(WriteError::Length { expected: 8, got: 7 })
        ));
        assert!(out.is_empty());
    }

    #[test]
    fn test_statistics() {
        let mut header = MrcHeader::new(4, 1, 1, Mode::Float32);
        update_statistics(&mut header, &[1.0, 3.0, 1.0, 3.0]);
        assert_eq!(header.dmin, 1.0);
        assert_eq!(header.dmax, 3.0);
        assert_eq!(header.dmean, 2.0);
        assert_eq!(header.rms, 1.0);
    }

    #[test]
    fn test_half_precision_not_written() {
        let header = MrcHeader::new(1, 1, 1, Mode::Float16);
        let mut out = Vec::new();
        assert!(matches!(
            write_volume(&mut out, &header, &[0.0]),
            Err(WriteError::UnsupportedMode(Mode::Float16))
        ));
    }
}
