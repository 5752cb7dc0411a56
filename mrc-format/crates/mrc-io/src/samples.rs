//! Sample decoding and encoding between raw voxel bytes and `f32`.
//!
//! Every real-valued MRC mode is widened to `f32` on load. Half precision is
//! converted bit-wise since no platform type exists for it.

use byteorder::ByteOrder;
use mrc_core::Mode;

/// Decode `buf` (raw voxel bytes of `mode`) into `f32` samples.
///
/// Returns `None` for modes that are not real-valued.
pub fn decode_samples<B: ByteOrder>(buf: &[u8], mode: Mode) -> Option<Vec<f32>> {
    let out = match mode {
        Mode::Int8 => buf.iter().map(|&b| b as i8 as f32).collect(),
        Mode::Int16 => {
            let mut tmp = vec![0i16; buf.len() / 2];
            B::read_i16_into(buf, &mut tmp);
            tmp.into_iter().map(f32::from).collect()
        }
        Mode::Uint16 => {
            let mut tmp = vec![0u16; buf.len() / 2];
            B::read_u16_into(buf, &mut tmp);
            tmp.into_iter().map(f32::from).collect()
        }
        Mode::Float16 => {
            let mut tmp = vec![0u16; buf.len() / 2];
            B::read_u16_into(buf, &mut tmp);
            tmp.into_iter().map(f16_bits_to_f32).collect()
        }
        Mode::Float32 => {
            let mut tmp = vec![0f32; buf.len() / 4];
            B::read_f32_into(buf, &mut tmp);
            tmp
        }
        Mode::ComplexInt16 | Mode::ComplexFloat32 | Mode::Packed4Bit => return None,
    };
    Some(out)
}

/// Encode `f32` samples as raw voxel bytes of `mode`.
///
/// Integer modes round to nearest and saturate. Returns `None` for modes
/// this crate does not write (half precision, complex, packed).
pub fn encode_samples<B: ByteOrder>(data: &[f32], mode: Mode) -> Option<Vec<u8>> {
    let out = match mode {
        Mode::Int8 => data.iter().map(|&v| v.round() as i8 as u8).collect(),
        Mode::Int16 => {
            let tmp: Vec<i16> = data.iter().map(|&v| v.round() as i16).collect();
            let mut buf = vec![0u8; tmp.len() * 2];
            B::write_i16_into(&tmp, &mut buf);
            buf
        }
        Mode::Uint16 => {
            let tmp: Vec<u16> = data.iter().map(|&v| v.round() as u16).collect();
            let mut buf = vec![0u8; tmp.len() * 2];
            B::write_u16_into(&tmp, &mut buf);
            buf
        }
        Mode::Float32 => {
            let mut buf = vec![0u8; data.len() * 4];
            B::write_f32_into(data, &mut buf);
            buf
        }
        Mode::Float16 | Mode::ComplexInt16 | Mode::ComplexFloat32 | Mode::Packed4Bit => {
            return None
        }
    };
    Some(out)
}

/// Convert IEEE 754 binary16 bits to `f32`.
pub fn f16_bits_to_f32(bits: u16) -> f32 {
    let sign = ((bits >> 15) & 0x1) as u32;
    let exp = ((bits >> 10) & 0x1F) as u32;
    let frac = (bits & 0x3FF) as u32;

    let out = match (exp, frac) {
        (0, 0) => sign << 31,
        (0, _) => {
            // Subnormal: value = frac * 2^-24
            let v = frac as f32 * (1.0 / 16_777_216.0);
            return if sign == 1 { -v } else { v };
        }
        (0x1F, 0) => (sign << 31) | 0x7F80_0000,
        (0x1F, _) => (sign << 31) | 0x7FC0_0000 | (frac << 13),
        _ => (sign << 31) | ((exp + 127 - 15) << 23) | (frac << 13),
    };
    f32::from_bits(out)
}
