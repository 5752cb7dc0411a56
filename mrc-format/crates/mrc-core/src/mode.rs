//! MRC data modes and byte-order stamps.
//!
//! The MODE word selects the sample type of the voxel block. Only the
//! real-valued modes are loadable; complex and packed data are recognised so
//! that they can be rejected with a precise message.

use serde::Serialize;
use std::fmt;

// ─── Machine stamp bytes ────────────────────────────────────────────────────

/// First machine-stamp byte written by little-endian producers.
pub const MACHST_LITTLE: u8 = 0x44;
/// First machine-stamp byte written by big-endian producers.
pub const MACHST_BIG: u8 = 0x11;

/// Sample type of the voxel block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Mode {
    /// 8-bit signed integer (MRC2014; older files used unsigned).
    Int8,
    Int16,
    Float32,
    /// Complex 16-bit integer pairs (Fourier transforms).
    ComplexInt16,
    /// Complex 32-bit float pairs (Fourier transforms).
    ComplexFloat32,
    Uint16,
    /// IEEE 754 half precision.
    Float16,
    /// Two 4-bit samples per byte.
    Packed4Bit,
}

impl Mode {
    pub fn from_code(code: i32) -> Option<Mode> {
        match code {
            0 => Some(Mode::Int8),
            1 => Some(Mode::Int16),
            2 => Some(Mode::Float32),
            3 => Some(Mode::ComplexInt16),
            4 => Some(Mode::ComplexFloat32),
            6 => Some(Mode::Uint16),
            12 => Some(Mode::Float16),
            101 => Some(Mode::Packed4Bit),
            _ => None,
        }
    }

    pub fn code(&self) -> i32 {
        match self {
            Mode::Int8 => 0,
            Mode::Int16 => 1,
            Mode::Float32 => 2,
            Mode::ComplexInt16 => 3,
            Mode::ComplexFloat32 => 4,
            Mode::Uint16 => 6,
            Mode::Float16 => 12,
            Mode::Packed4Bit => 101,
        }
    }

    /// Bytes per stored sample, or `None` for packed 4-bit data.
    pub fn sample_bytes(&self) -> Option<usize> {
        match self {
            Mode::Int8 => Some(1),
            Mode::Int16 | Mode::Uint16 | Mode::Float16 => Some(2),
            Mode::Float32 | Mode::ComplexInt16 => Some(4),
            Mode::ComplexFloat32 => Some(8),
            Mode::Packed4Bit => None,
        }
    }

    /// Whether samples of this mode can be read as real-valued intensities.
    pub fn is_real(&self) -> bool {
        matches!(
            self,
            Mode::Int8 | Mode::Int16 | Mode::Float32 | Mode::Uint16 | Mode::Float16
        )
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Mode::Int8 => "int8",
            Mode::Int16 => "int16",
            Mode::Float32 => "float32",
            Mode::ComplexInt16 => "complex int16",
            Mode::ComplexFloat32 => "complex float32",
            Mode::Uint16 => "uint16",
            Mode::Float16 => "float16",
            Mode::Packed4Bit => "packed 4-bit",
        };
        write!(f, "{} (mode {})", name, self.code())
    }
}

/// Byte order of a file's header and voxel data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Endian {
    Little,
    Big,
}

impl Endian {
    /// Interpret the first machine-stamp byte.
    pub fn from_stamp(stamp: &[u8]) -> Option<Endian> {
        match stamp.first() {
            Some(&MACHST_LITTLE) => Some(Endian::Little),
            Some(&MACHST_BIG) => Some(Endian::Big),
            _ => None,
        }
    }

    /// The 4-byte machine stamp written for this byte order.
    pub fn stamp(&self) -> [u8; 4] {
        match self {
            Endian::Little => [0x44, 0x44, 0x00, 0x00],
            Endian::Big => [0x11, 0x11, 0x00, 0x00],
        }
    }

    pub fn native() -> Endian {
        if cfg!(target_endian = "big") {
            Endian::Big
        } else {
            Endian::Little
        }
    }
}
