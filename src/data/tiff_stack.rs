/// Multi-page grayscale TIFF output.
///
/// Each frame becomes one page (IFD) with a single sample per pixel and
/// BlackIsZero photometric interpretation. A stack holds one sample type for
/// all of its pages.
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use tiff::encoder::{colortype, TiffEncoder};

use crate::error::EncodeError;

/// Pages ready to encode, all of the same size and sample type.
#[derive(Debug, Clone, PartialEq)]
pub enum TiffStack {
    Float32 {
        width: u32,
        height: u32,
        pages: Vec<Vec<f32>>,
    },
    Gray8 {
        width: u32,
        height: u32,
        pages: Vec<Vec<u8>>,
    },
}

impl TiffStack {
    pub fn page_count(&self) -> usize {
        match self {
            TiffStack::Float32 { pages, .. } => pages.len(),
            TiffStack::Gray8 { pages, .. } => pages.len(),
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            TiffStack::Float32 { width, height, .. } | TiffStack::Gray8 { width, height, .. } => {
                (*width, *height)
            }
        }
    }

    pub fn sample_name(&self) -> &'static str {
        match self {
            TiffStack::Float32 { .. } => "32-bit float",
            TiffStack::Gray8 { .. } => "8-bit",
        }
    }
}

/// Write every page of `stack` into a new file at `path`.
pub fn write_tiff_stack(path: &Path, stack: &TiffStack) -> Result<(), EncodeError> {
    let mut out = BufWriter::new(File::create(path)?);
    {
        let mut tiff = TiffEncoder::new(&mut out)?;
        match stack {
            TiffStack::Float32 {
                width,
                height,
                pages,
            } => {
                for page in pages {
                    tiff.write_image::<colortype::Gray32Float>(*width, *height, page)?;
                }
            }
            TiffStack::Gray8 {
                width,
                height,
                pages,
            } => {
                for page in pages {
                    tiff.write_image::<colortype::Gray8>(*width, *height, page)?;
                }
            }
        }
    }
    out.flush()?;

    log::debug!(
        "Wrote {} {} pages ({}x{}) to {}",
        stack.page_count(),
        stack.sample_name(),
        stack.dimensions().0,
        stack.dimensions().1,
        path.display()
    );
    Ok(())
}

/// Decode every page of a TIFF written by `write_tiff_stack`.
#[cfg(test)]
pub fn read_tiff_stack(path: &Path) -> Result<TiffStack, EncodeError> {
    use std::io::BufReader;
    use tiff::decoder::{Decoder, DecodingResult};
    use tiff::tags::Tag;

    let mut decoder = Decoder::new(BufReader::new(File::open(path)?))?;
    let (width, height) = decoder.dimensions()?;
    let mut floats = Vec::new();
    let mut bytes = Vec::new();
    loop {
        assert_eq!(decoder.dimensions()?, (width, height));
        assert_eq!(decoder.get_tag_u32(Tag::PhotometricInterpretation)?, 1);
        match decoder.read_image()? {
            DecodingResult::F32(page) => floats.push(page),
            DecodingResult::U8(page) => bytes.push(page),
            other => panic!("unexpected sample type {:?}", std::mem::discriminant(&other)),
        }
        if !decoder.more_images() {
            break;
        }
        decoder.next_image()?;
    }
    assert!(floats.is_empty() || bytes.is_empty(), "mixed sample types");
    Ok(if bytes.is_empty() {
        TiffStack::Float32 {
            width,
            height,
            pages: floats,
        }
    } else {
        TiffStack::Gray8 {
            width,
            height,
            pages: bytes,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::test_support::scratch_dir;

    #[test]
    fn test_float_stack_roundtrip() {
        let path = scratch_dir().join("float.tiff");
        let stack = TiffStack::Float32 {
            width: 3,
            height: 2,
            pages: vec![
                vec![0.0, 1.5, -2.0, 3.25, 4.0, 5.0],
                vec![6.0, 7.0, 8.0, 9.0, 10.0, -11.5],
            ],
        };
        write_tiff_stack(&path, &stack).unwrap();
        assert_eq!(read_tiff_stack(&path).unwrap(), stack);
    }

    #[test]
    fn test_gray8_pages() {
        let path = scratch_dir().join("gray.tiff");
        let stack = TiffStack::Gray8 {
            width: 4,
            height: 1,
            pages: vec![vec![0, 64, 128, 255]; 3],
        };
        write_tiff_stack(&path, &stack).unwrap();

        let back = read_tiff_stack(&path).unwrap();
        assert_eq!(back.page_count(), 3);
        assert_eq!(back, stack);
    }

    #[test]
    fn test_unwritable_destination() {
        let path = scratch_dir().join("no-such-dir").join("out.tiff");
        let stack = TiffStack::Gray8 {
            width: 1,
            height: 1,
            pages: vec![vec![0]],
        };
        assert!(matches!(
            write_tiff_stack(&path, &stack),
            Err(EncodeError::Io(_))
        ));
    }
}
