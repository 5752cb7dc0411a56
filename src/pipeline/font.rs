/// Built-in 3×5 bitmap font for burning labels into 8-bit images.
///
/// Glyphs are scaled by an integer factor so that a glyph cell is
/// `3·scale` wide and `5·scale` tall, with one scaled column of spacing.
use image::{GrayImage, Luma};

/// Rows of a glyph, top to bottom; the low three bits are the pixels.
fn glyph(c: char) -> [u8; 5] {
    match c {
        '0' => [0b111, 0b101, 0b101, 0b101, 0b111],
        '1' => [0b010, 0b110, 0b010, 0b010, 0b111],
        '2' => [0b111, 0b001, 0b111, 0b100, 0b111],
        '3' => [0b111, 0b001, 0b111, 0b001, 0b111],
        '4' => [0b101, 0b101, 0b111, 0b001, 0b001],
        '5' => [0b111, 0b100, 0b111, 0b001, 0b111],
        '6' => [0b111, 0b100, 0b111, 0b101, 0b111],
        '7' => [0b111, 0b001, 0b010, 0b010, 0b010],
        '8' => [0b111, 0b101, 0b111, 0b101, 0b111],
        '9' => [0b111, 0b101, 0b111, 0b001, 0b111],
        '.' => [0b000, 0b000, 0b000, 0b000, 0b010],
        '-' => [0b000, 0b000, 0b111, 0b000, 0b000],
        ' ' => [0b000, 0b000, 0b000, 0b000, 0b000],
        'µ' | 'μ' | 'u' => [0b000, 0b101, 0b101, 0b111, 0b100],
        'n' => [0b000, 0b110, 0b101, 0b101, 0b101],
        'm' => [0b000, 0b111, 0b111, 0b101, 0b101],
        'A' | 'a' => [0b010, 0b101, 0b111, 0b101, 0b101],
        'M' => [0b101, 0b111, 0b111, 0b101, 0b101],
        _ => [0b000, 0b000, 0b010, 0b000, 0b000],
    }
}

/// Integer scale that makes glyphs `font_px` pixels tall.
pub fn scale_for_height(font_px: u32) -> u32 {
    (font_px / 5).max(1)
}

/// Draw `text` with its top-left corner at `(x, y)`; pixels outside the
/// image are skipped.
pub fn draw_text(img: &mut GrayImage, text: &str, x: i64, y: i64, color: Luma<u8>, scale: u32) {
    let scale = scale.max(1) as i64;
    let (w, h) = (img.width() as i64, img.height() as i64);
    let mut cx = x;
    for ch in text.chars() {
        for (row, &bits) in glyph(ch).iter().enumerate() {
            for col in 0..3i64 {
                if (bits >> (2 - col)) & 1 == 0 {
                    continue;
                }
                for sy in 0..scale {
                    for sx in 0..scale {
                        let px = cx + col * scale + sx;
                        let py = y + row as i64 * scale + sy;
                        if px >= 0 && px < w && py >= 0 && py < h {
                            img.put_pixel(px as u32, py as u32, color);
                        }
                    }
                }
            }
        }
        cx += 4 * scale;
    }
}
