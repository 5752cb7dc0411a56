//! MRC reader: header + voxel block from files or streams.

use byteorder::{BigEndian, LittleEndian};
use mrc_core::{Endian, HeaderError, Mode, MrcHeader, HEADER_BYTES};
use std::fs::File;
use std::io::{self, BufReader, Read, Seek, SeekFrom};
use std::path::Path;
use thiserror::Error;

use crate::samples::decode_samples;

#[derive(Error, Debug)]
pub enum ReadError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Invalid header: {0}")]
    Header(#[from] HeaderError),
    #[error("Unsupported data mode: {0}")]
    UnsupportedMode(Mode),
    #[error("Data truncated: expected {expected} bytes, got {got}")]
    Truncated { expected: usize, got: usize },
}

/// A fully loaded volume with samples widened to `f32`.
#[derive(Debug, Clone)]
pub struct MrcVolume {
    pub header: MrcHeader,
    /// `nz` sections of `ny` rows of `nx` samples, x fastest.
    pub data: Vec<f32>,
}

impl MrcVolume {
    /// Samples of section `z`, or `None` when out of range.
    pub fn section(&self, z: usize) -> Option<&[f32]> {
        let len = self.header.section_len();
        self.data.get(z * len..(z + 1) * len)
    }

    pub fn section_count(&self) -> usize {
        self.header.nz as usize
    }
}

/// Read and parse the 1024-byte main header.
pub fn read_header<R: Read>(reader: &mut R) -> Result<MrcHeader, ReadError> {
    let mut buf = vec![0u8; HEADER_BYTES];
    let mut got = 0;
    while got < HEADER_BYTES {
        let n = reader.read(&mut buf[got..])?;
        if n == 0 {
            return Err(HeaderError::TooShort(got).into());
        }
        got += n;
    }
    Ok(MrcHeader::from_bytes(&buf)?)
}

/// Read a complete volume: header, skip the extended header, then every
/// section converted to `f32`.
pub fn read_volume<R: Read + Seek>(reader: &mut R) -> Result<MrcVolume, ReadError> {
    let header = read_header(reader)?;
    if !header.mode.is_real() {
        return Err(ReadError::UnsupportedMode(header.mode));
    }
    let expected = header
        .data_bytes()
        .ok_or(ReadError::UnsupportedMode(header.mode))?;

    // Check the claimed size against the stream before allocating for it.
    let end = reader.seek(SeekFrom::End(0))?;
    let available = end.saturating_sub(header.data_offset());
    if available < expected as u64 {
        return Err(ReadError::Truncated {
            expected,
            got: available as usize,
        });
    }

    reader.seek(SeekFrom::Start(header.data_offset()))?;
    let mut raw = Vec::with_capacity(expected);
    reader.by_ref().take(expected as u64).read_to_end(&mut raw)?;
    if raw.len() < expected {
        return Err(ReadError::Truncated {
            expected,
            got: raw.len(),
        });
    }

    let data = match header.endian {
        Endian::Little => decode_samples::<LittleEndian>(&raw, header.mode),
        Endian::Big => decode_samples::<BigEndian>(&raw, header.mode),
    }
    .ok_or(ReadError::UnsupportedMode(header.mode))?;

    Ok(MrcVolume { header, data })
}

/// Open `path` read-only and load the whole volume.
pub fn read_mrc_file(path: &Path) -> Result<MrcVolume, ReadError> {
    let mut reader = BufReader::new(File::open(path)?);
    read_volume(&mut reader)
}

/// Open `path` read-only and parse only its main header.
pub fn read_mrc_header(path: &Path) -> Result<MrcHeader, ReadError> {
    let mut reader = BufReader::new(File::open(path)?);
    read_header(&mut reader)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::write_volume;
    use std::io::Cursor;

    fn encoded(header: &MrcHeader, data: &[f32]) -> Vec<u8> {
        let mut out = Vec::new();
        write_volume(&mut out, header, data).unwrap();
        out
    }

    #[test]
    fn test_read_sections_in_order() {
        let header = MrcHeader::new(3, 2, 2, Mode::Float32);
        let data: Vec<f32> = (0..12).map(|v| v as f32).collect();
        let vol = read_volume(&mut Cursor::new(encoded(&header, &data))).unwrap();

        assert_eq!(vol.section_count(), 2);
        assert_eq!(vol.section(0).unwrap(), &[0.0, 1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!(vol.section(1).unwrap(), &[6.0, 7.0, 8.0, 9.0, 10.0, 11.0]);
        assert!(vol.section(2).is_none());
    }

    #[test]
    fn test_skips_extended_header() {
        let mut header = MrcHeader::new(2, 2, 1, Mode::Int16);
        header.endian = Endian::Big;
        header.nsymbt = 16;
        let data = [1.0, -2.0, 300.0, 4.0];
        let bytes = encoded(&header, &data);
        assert_eq!(bytes.len(), HEADER_BYTES + 16 + 8);

        let vol = read_volume(&mut Cursor::new(bytes)).unwrap();
        assert_eq!(vol.data, data.to_vec());
    }

    #[test]
    fn test_truncated_data() {
        let header = MrcHeader::new(4, 4, 2, Mode::Float32);
        let mut bytes = encoded(&header, &[0.5; 32]);
        bytes.truncate(bytes.len() - 10);

        match read_volume(&mut Cursor::new(bytes)) {
            Err(ReadError::Truncated { expected, got }) => {
                assert_eq!(expected, 128);
                assert_eq!(got, 118);
            }
            other => panic!("expected truncation, got {:?}", other),
        }
    }

    #[test]
    fn test_complex_mode_rejected() {
        let mut header = MrcHeader::new(2, 2, 1, Mode::ComplexFloat32);
        header.endian = Endian::Little;
        let mut bytes = header.to_bytes();
        bytes.extend_from_slice(&[0u8; 32]);

        assert!(matches!(
            read_volume(&mut Cursor::new(bytes)),
            Err(ReadError::UnsupportedMode(Mode::ComplexFloat32))
        ));
    }

    #[test]
    fn test_huge_claimed_size_is_truncation() {
        let mut header = MrcHeader::new(65536, 65536, 1024, Mode::Float32);
        header.endian = Endian::Little;
        let bytes = header.to_bytes();
        assert_eq!(bytes.len(), HEADER_BYTES);

        match read_volume(&mut Cursor::new(bytes)) {
            Err(ReadError::Truncated { expected, got }) => {
                assert_eq!(expected, 65536 * 65536 * 1024 * 4);
                assert_eq!(got, 0);
            }
            other => panic!("expected truncation, got {:?}", other),
        }
    }

    #[test]
    fn test_overflowing_dimensions() {
        let mut header = MrcHeader::new(i32::MAX, i32::MAX, i32::MAX, Mode::Float32);
        header.endian = Endian::Little;
        assert!(matches!(
            read_volume(&mut Cursor::new(header.to_bytes())),
            Err(ReadError::Header(HeaderError::TooLarge { .. }))
        ));
    }

    #[test]
    fn test_short_header() {
        assert!(matches!(
            read_volume(&mut Cursor::new(vec![0u8; 10])),
            Err(ReadError::Header(HeaderError::TooShort(10)))
        ));
    }
}
