//! MRC header: 1024 bytes of 4-byte words followed by an optional extended
//! header and the voxel block.
//!
//! Layout follows MRC2014. The voxel size along an axis is `CELLA / M` for
//! that axis, in whatever length unit the writer used for the cell (Ångström
//! per MRC2014, nanometres for some acquisition software).

use crate::mode::*;
use byteorder::{BigEndian, ByteOrder, LittleEndian};
use serde::Serialize;
use thiserror::Error;

// ─── Constants ──────────────────────────────────────────────────────────────

/// Main header size in bytes.
pub const HEADER_BYTES: usize = 1024;
/// Number of text labels in the header.
pub const LABEL_COUNT: usize = 10;
/// Width of one text label.
pub const LABEL_BYTES: usize = 80;
/// Format version written by this crate.
pub const MRC_VERSION: i32 = 20140;
/// Largest dimension accepted when guessing byte order of unstamped files.
const PLAUSIBLE_DIM: i32 = 1 << 20;

// ─── Byte locations ─────────────────────────────────────────────────────────

pub const NX: usize = 0;
pub const NY: usize = 4;
pub const NZ: usize = 8;
pub const MODE: usize = 12;
pub const NXSTART: usize = 16;
pub const MX: usize = 28;
pub const CELLA: usize = 40;
pub const CELLB: usize = 52;
pub const MAPC: usize = 64;
pub const DMIN: usize = 76;
pub const DMAX: usize = 80;
pub const DMEAN: usize = 84;
pub const ISPG: usize = 88;
pub const NSYMBT: usize = 92;
pub const EXTTYP: usize = 104;
pub const NVERSION: usize = 108;
pub const ORIGIN: usize = 196;
pub const MAP: usize = 208;
pub const MACHST: usize = 212;
pub const RMS: usize = 216;
pub const NLABL: usize = 220;
pub const LABELS: usize = 224;

#[derive(Error, Debug)]
pub enum HeaderError {
    #[error("Header too short: expected 1024 bytes, got {0}")]
    TooShort(usize),
    #[error("Unknown data mode {0}")]
    UnknownMode(i32),
    #[error("Invalid dimensions {nx}x{ny}x{nz}")]
    InvalidDimensions { nx: i32, ny: i32, nz: i32 },
    #[error("Cannot determine byte order (machine stamp {0:02x?})")]
    ByteOrder([u8; 4]),
    #[error("Negative extended header size {0}")]
    ExtendedHeader(i32),
    #[error("Volume {nx}x{ny}x{nz} is too large to address")]
    TooLarge { nx: i32, ny: i32, nz: i32 },
}

/// Physical size of one voxel along each axis, in the cell's length unit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VoxelSize {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

/// Parsed MRC main header.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MrcHeader {
    pub nx: i32,
    pub ny: i32,
    pub nz: i32,
    pub mode: Mode,
    /// NXSTART, NYSTART, NZSTART.
    pub start: [i32; 3],
    /// MX, MY, MZ: sampling intervals along each cell edge.
    pub sampling: [i32; 3],
    /// Cell edge lengths.
    pub cell_lengths: [f32; 3],
    /// Cell angles in degrees.
    pub cell_angles: [f32; 3],
    /// MAPC, MAPR, MAPS.
    pub axis_map: [i32; 3],
    pub dmin: f32,
    pub dmax: f32,
    pub dmean: f32,
    pub ispg: i32,
    /// Extended header length in bytes.
    pub nsymbt: i32,
    pub exttyp: String,
    pub nversion: i32,
    pub origin: [f32; 3],
    pub endian: Endian,
    pub rms: f32,
    pub labels: Vec<String>,
}

impl MrcHeader {
    /// Header for a fresh `nx × ny × nz` volume, one voxel per cell unit.
    pub fn new(nx: i32, ny: i32, nz: i32, mode: Mode) -> Self {
        Self {
            nx,
            ny,
            nz,
            mode,
            start: [0; 3],
            sampling: [nx, ny, nz],
            cell_lengths: [0.0; 3],
            cell_angles: [90.0; 3],
            axis_map: [1, 2, 3],
            dmin: 0.0,
            dmax: -1.0,
            dmean: -2.0,
            ispg: 0,
            nsymbt: 0,
            exttyp: String::new(),
            nversion: MRC_VERSION,
            origin: [0.0; 3],
            endian: Endian::native(),
            rms: -1.0,
            labels: Vec::new(),
        }
    }

    /// Parse a header, detecting byte order from the machine stamp.
    pub fn from_bytes(buf: &[u8]) -> Result<Self, HeaderError> {
        if buf.len() < HEADER_BYTES {
            return Err(HeaderError::TooShort(buf.len()));
        }
        let endian = match Endian::from_stamp(&buf[MACHST..MACHST + 4]) {
            Some(e) => e,
            None => guess_endian(buf)?,
        };
        let header = match endian {
            Endian::Little => decode::<LittleEndian>(buf, endian)?,
            Endian::Big => decode::<BigEndian>(buf, endian)?,
        };
        header.validate()?;
        Ok(header)
    }

    /// Serialize to 1024 bytes in `self.endian` order.
    pub fn to_bytes(&self) -> Vec<u8> {
        match self.endian {
            Endian::Little => encode::<LittleEndian>(self),
            Endian::Big => encode::<BigEndian>(self),
        }
    }

    fn validate(&self) -> Result<(), HeaderError> {
        if self.nx <= 0 || self.ny <= 0 || self.nz <= 0 {
            return Err(HeaderError::InvalidDimensions {
                nx: self.nx,
                ny: self.ny,
                nz: self.nz,
            });
        }
        if self.nsymbt < 0 {
            return Err(HeaderError::ExtendedHeader(self.nsymbt));
        }
        let bytes_per_sample = self.mode.sample_bytes().unwrap_or(1);
        if self.voxel_count().and_then(|n| n.checked_mul(bytes_per_sample)).is_none() {
            return Err(HeaderError::TooLarge {
                nx: self.nx,
                ny: self.ny,
                nz: self.nz,
            });
        }
        Ok(())
    }

    /// `(nx, ny, nz)` as sizes.
    pub fn dimensions(&self) -> (usize, usize, usize) {
        (self.nx as usize, self.ny as usize, self.nz as usize)
    }

    /// Voxel size per axis; zero along an axis whose sampling is zero.
    pub fn voxel_size(&self) -> VoxelSize {
        let axis = |i: usize| {
            if self.sampling[i] == 0 {
                0.0
            } else {
                self.cell_lengths[i] / self.sampling[i] as f32
            }
        };
        VoxelSize {
            x: axis(0),
            y: axis(1),
            z: axis(2),
        }
    }

    /// Set the cell lengths so that `voxel_size()` returns `size`.
    pub fn set_voxel_size(&mut self, size: VoxelSize) {
        self.cell_lengths = [
            size.x * self.sampling[0] as f32,
            size.y * self.sampling[1] as f32,
            size.z * self.sampling[2] as f32,
        ];
    }

    /// Byte offset of the first voxel.
    pub fn data_offset(&self) -> u64 {
        HEADER_BYTES as u64 + self.nsymbt.max(0) as u64
    }

    /// Number of samples in one section (frame).
    pub fn section_len(&self) -> usize {
        (self.nx.max(0) as usize).saturating_mul(self.ny.max(0) as usize)
    }

    /// `nx · ny · nz`, `None` on overflow.
    pub fn voxel_count(&self) -> Option<usize> {
        let (nx, ny, nz) = (
            self.nx.max(0) as usize,
            self.ny.max(0) as usize,
            self.nz.max(0) as usize,
        );
        nx.checked_mul(ny)?.checked_mul(nz)
    }

    /// Size of the voxel block in bytes. `None` when the mode has no
    /// whole-byte sample or the size overflows.
    pub fn data_bytes(&self) -> Option<usize> {
        self.voxel_count()?.checked_mul(self.mode.sample_bytes()?)
    }
}

/// Pick the byte order whose MODE and dimensions look sane.
fn guess_endian(buf: &[u8]) -> Result<Endian, HeaderError> {
    let plausible = |nx: i32, ny: i32, nz: i32, mode: i32| {
        Mode::from_code(mode).is_some()
            && [nx, ny, nz].iter().all(|&d| d > 0 && d < PLAUSIBLE_DIM)
    };
    let le = |o: usize| LittleEndian::read_i32(&buf[o..o + 4]);
    let be = |o: usize| BigEndian::read_i32(&buf[o..o + 4]);
    if plausible(le(NX), le(NY), le(NZ), le(MODE)) {
        Ok(Endian::Little)
    } else if plausible(be(NX), be(NY), be(NZ), be(MODE)) {
        Ok(Endian::Big)
    } else {
        let mut stamp = [0u8; 4];
        stamp.copy_from_slice(&buf[MACHST..MACHST + 4]);
        Err(HeaderError::ByteOrder(stamp))
    }
}

fn read_i32x3<B: ByteOrder>(buf: &[u8], at: usize) -> [i32; 3] {
    [
        B::read_i32(&buf[at..]),
        B::read_i32(&buf[at + 4..]),
        B::read_i32(&buf[at + 8..]),
    ]
}

fn read_f32x3<B: ByteOrder>(buf: &[u8], at: usize) -> [f32; 3] {
    [
        B::read_f32(&buf[at..]),
        B::read_f32(&buf[at + 4..]),
        B::read_f32(&buf[at + 8..]),
    ]
}

fn text(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes)
        .trim_end_matches(|c: char| c == '\0' || c.is_whitespace())
        .to_string()
}

fn decode<B: ByteOrder>(buf: &[u8], endian: Endian) -> Result<MrcHeader, HeaderError> {
    let mode_code = B::read_i32(&buf[MODE..]);
    let mode = Mode::from_code(mode_code).ok_or(HeaderError::UnknownMode(mode_code))?;

    let nlabl = (B::read_i32(&buf[NLABL..]).max(0) as usize).min(LABEL_COUNT);
    let labels = (0..nlabl)
        .map(|i| text(&buf[LABELS + i * LABEL_BYTES..LABELS + (i + 1) * LABEL_BYTES]))
        .collect();

    Ok(MrcHeader {
        nx: B::read_i32(&buf[NX..]),
        ny: B::read_i32(&buf[NY..]),
        nz: B::read_i32(&buf[NZ..]),
        mode,
        start: read_i32x3::<B>(buf, NXSTART),
        sampling: read_i32x3::<B>(buf, MX),
        cell_lengths: read_f32x3::<B>(buf, CELLA),
        cell_angles: read_f32x3::<B>(buf, CELLB),
        axis_map: read_i32x3::<B>(buf, MAPC),
        dmin: B::read_f32(&buf[DMIN..]),
        dmax: B::read_f32(&buf[DMAX..]),
        dmean: B::read_f32(&buf[DMEAN..]),
        ispg: B::read_i32(&buf[ISPG..]),
        nsymbt: B::read_i32(&buf[NSYMBT..]),
        exttyp: text(&buf[EXTTYP..EXTTYP + 4]),
        nversion: B::read_i32(&buf[NVERSION..]),
        origin: read_f32x3::<B>(buf, ORIGIN),
        endian,
        rms: B::read_f32(&buf[RMS..]),
        labels,
    })
}

fn encode<B: ByteOrder>(h: &MrcHeader) -> Vec<u8> {
    let mut buf = vec![0u8; HEADER_BYTES];

    let put_i32x3 = |buf: &mut [u8], at: usize, v: &[i32; 3]| {
        for (i, x) in v.iter().enumerate() {
            B::write_i32(&mut buf[at + 4 * i..], *x);
        }
    };
    let put_f32x3 = |buf: &mut [u8], at: usize, v: &[f32; 3]| {
        for (i, x) in v.iter().enumerate() {
            B::write_f32(&mut buf[at + 4 * i..], *x);
        }
    };

    B::write_i32(&mut buf[NX..], h.nx);
    B::write_i32(&mut buf[NY..], h.ny);
    B::write_i32(&mut buf[NZ..], h.nz);
    B::write_i32(&mut buf[MODE..], h.mode.code());
    put_i32x3(&mut buf, NXSTART, &h.start);
    put_i32x3(&mut buf, MX, &h.sampling);
    put_f32x3(&mut buf, CELLA, &h.cell_lengths);
    put_f32x3(&mut buf, CELLB, &h.cell_angles);
    put_i32x3(&mut buf, MAPC, &h.axis_map);
    B::write_f32(&mut buf[DMIN..], h.dmin);
    B::write_f32(&mut buf[DMAX..], h.dmax);
    B::write_f32(&mut buf[DMEAN..], h.dmean);
    B::write_i32(&mut buf[ISPG..], h.ispg);
    B::write_i32(&mut buf[NSYMBT..], h.nsymbt);
    for (i, b) in h.exttyp.bytes().take(4).enumerate() {
        buf[EXTTYP + i] = b;
    }
    B::write_i32(&mut buf[NVERSION..], h.nversion);
    put_f32x3(&mut buf, ORIGIN, &h.origin);
    buf[MAP..MAP + 4].copy_from_slice(b"MAP ");
    buf[MACHST..MACHST + 4].copy_from_slice(&h.endian.stamp());
    B::write_f32(&mut buf[RMS..], h.rms);

    let labels: Vec<&String> = h.labels.iter().take(LABEL_COUNT).collect();
    B::write_i32(&mut buf[NLABL..], labels.len() as i32);
    for (i, label) in labels.iter().enumerate() {
        let at = LABELS + i * LABEL_BYTES;
        for (j, b) in label.bytes().take(LABEL_BYTES).enumerate() {
            buf[at + j] = b;
        }
    }
    buf
}
