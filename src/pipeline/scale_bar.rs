/// Scale bar compositing.
///
/// A fixed physical length is converted to pixels with the frame's pixel
/// size, then a white bar and its label on a black background are burned into
/// a copy of an 8-bit frame, anchored to the bottom-right corner:
///
/// ```text
///   ┌──────────────────────────────┐
///   │                              │
///   │          ██████████ label    │  ← background, bar_top-45 .. bar_top-5
///   │          ▀▀▀▀▀▀▀▀▀▀          │  ← bar, 20 px tall
///   │                        20 px │
///   └──────────────────────────────┘
/// ```
use image::{GrayImage, Luma};

use super::font;
use crate::error::ConvertError;

/// Physical length of the bar.
pub const SCALE_BAR_LENGTH_NM: f64 = 500.0;
pub const BAR_HEIGHT: i64 = 20;
/// Distance from the bar to the right and bottom borders.
pub const MARGIN: i64 = 20;
pub const FONT_SIZE: u32 = 30;
/// Padding between label background and bar / text.
pub const TEXT_OFFSET: i64 = 5;

const WHITE: Luma<u8> = Luma([255]);
const BLACK: Luma<u8> = Luma([0]);

/// Half-open pixel rectangle `[x0, x1) × [y0, y1)`; may extend off canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x0: i64,
    pub y0: i64,
    pub x1: i64,
    pub y1: i64,
}

impl Rect {
    fn fill(&self, img: &mut GrayImage, color: Luma<u8>) {
        let (w, h) = (img.width() as i64, img.height() as i64);
        for y in self.y0.max(0)..self.y1.min(h) {
            for x in self.x0.max(0)..self.x1.min(w) {
                img.put_pixel(x as u32, y as u32, color);
            }
        }
    }
}

/// Where the bar, its label background and its text go on a given frame.
#[derive(Debug, Clone, PartialEq)]
pub struct ScaleBarLayout {
    pub label: String,
    pub bar: Rect,
    pub background: Rect,
    /// Top-left corner of the label text.
    pub text_origin: (i64, i64),
}

/// Label for a bar of `length_nm`: micrometres from 1000 nm upward.
pub fn scale_label(length_nm: f64) -> String {
    if length_nm >= 1000.0 {
        format!("{:.1} µm", length_nm / 1000.0)
    } else {
        format!("{} nm", length_nm)
    }
}

/// `round(length_nm / pixel_size_nm)`.
pub fn bar_length_px(length_nm: f64, pixel_size_nm: f64) -> Result<u32, ConvertError> {
    if !pixel_size_nm.is_finite() || pixel_size_nm <= 0.0 {
        return Err(ConvertError::InvalidCalibration(pixel_size_nm));
    }
    Ok((length_nm / pixel_size_nm).round().min(u32::MAX as f64) as u32)
}

/// Compute the bar geometry for a `width × height` frame.
///
/// The bar is not clamped to the frame; a bar longer than the frame is
/// logged and later clipped while drawing.
pub fn layout(
    width: u32,
    height: u32,
    length_nm: f64,
    pixel_size_nm: f64,
) -> Result<ScaleBarLayout, ConvertError> {
    let length_px = bar_length_px(length_nm, pixel_size_nm)?;
    if length_px as i64 + MARGIN > width as i64 {
        log::warn!(
            "Scale bar of {} px ({} at {} nm/px) does not fit a {} px wide frame",
            length_px,
            scale_label(length_nm),
            pixel_size_nm,
            width
        );
    }

    let (w, h) = (width as i64, height as i64);
    let bar = Rect {
        x0: w - MARGIN - length_px as i64,
        y0: h - MARGIN - BAR_HEIGHT,
        x1: w - MARGIN,
        y1: h - MARGIN,
    };
    let background_height = FONT_SIZE as i64 + 2 * TEXT_OFFSET;
    let text_origin = (bar.x0, bar.y0 - background_height);
    let background = Rect {
        x0: bar.x0,
        y0: text_origin.1 - TEXT_OFFSET,
        x1: bar.x1,
        y1: bar.y0 - TEXT_OFFSET,
    };

    Ok(ScaleBarLayout {
        label: scale_label(length_nm),
        bar,
        background,
        text_origin,
    })
}

/// Burn a 500 nm scale bar into a copy of `image`.
pub fn add_scale_bar(image: &GrayImage, pixel_size_nm: f64) -> Result<GrayImage, ConvertError> {
    let layout = layout(
        image.width(),
        image.height(),
        SCALE_BAR_LENGTH_NM,
        pixel_size_nm,
    )?;
    let mut out = image.clone();
    layout.background.fill(&mut out, BLACK);
    layout.bar.fill(&mut out, WHITE);
    font::draw_text(
        &mut out,
        &layout.label,
        layout.text_origin.0,
        layout.text_origin.1,
        WHITE,
        font::scale_for_height(FONT_SIZE),
    );
    Ok(out)
}
