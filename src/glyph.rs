//! Pixel → glyph conversion.
//!
//! Brightness is Rec.709 luma, `(0.2126 R + 0.7152 G + 0.0722 B) / 255`, and the
//! glyph is `GLYPH_RAMP[floor(brightness * 9)]`. The hot loop evaluates luma in
//! fixed point (weights scaled by 10_000) so pure white maps exactly to the last
//! ramp entry instead of landing one slot short through float rounding.

use crate::frame::{RenderedFrame, RgbFrame};

/// Darkest to lightest.
pub const GLYPH_RAMP: &[u8; 10] = b"@%#*+=-:. ";

const LUMA_WEIGHT_R: u32 = 2126;
const LUMA_WEIGHT_G: u32 = 7152;
const LUMA_WEIGHT_B: u32 = 722;
const LUMA_SCALE: u32 = 10_000;
const LUMA_MAX: u32 = 255 * LUMA_SCALE;

const FOREGROUND_PREFIX: &[u8] = b"\x1b[38;2;";
const RESET: &[u8] = b"\x1b[0m";
// "\x1b[38;2;255;255;255m" + glyph + reset
const MAX_COLORED_GLYPH_LEN: usize = 19 + 1 + RESET.len();

/// Decimal digits of every channel value, padded to three bytes, with the used length.
static CHANNEL_DIGITS: [([u8; 3], usize); 256] = channel_digit_table();

const fn channel_digit_table() -> [([u8; 3], usize); 256] {
    let mut table = [([0u8; 3], 0usize); 256];
    let mut value = 0;
    while value < 256 {
        let v = value as u8;
        table[value] = if v >= 100 {
            ([b'0' + v / 100, b'0' + v / 10 % 10, b'0' + v % 10], 3)
        } else if v >= 10 {
            ([b'0' + v / 10, b'0' + v % 10, 0], 2)
        } else {
            ([b'0' + v, 0, 0], 1)
        };
        value += 1;
    }
    table
}

#[inline]
fn push_channel(out: &mut Vec<u8>, value: u8) {
    let (digits, len) = &CHANNEL_DIGITS[value as usize];
    out.extend_from_slice(&digits[..*len]);
}

/// Perceived brightness in `[0, 1]`.
pub fn perceived_brightness(r: u8, g: u8, b: u8) -> f32 {
    let luma = 0.2126 * r as f32 + 0.7152 * g as f32 + 0.0722 * b as f32;
    (luma / 255.0).clamp(0.0, 1.0)
}

/// Ramp index for a brightness value, `clamp(floor(brightness * (len - 1)), 0, len - 1)`.
pub fn brightness_to_glyph_index(brightness: f32) -> usize {
    let last = GLYPH_RAMP.len() - 1;
    let scaled = (brightness.clamp(0.0, 1.0) * last as f32).floor();
    (scaled as usize).min(last)
}

#[inline]
fn glyph_for_pixel(r: u8, g: u8, b: u8) -> u8 {
    let luma = LUMA_WEIGHT_R * r as u32 + LUMA_WEIGHT_G * g as u32 + LUMA_WEIGHT_B * b as u32;
    let last = (GLYPH_RAMP.len() - 1) as u32;
    let index = (luma * last / LUMA_MAX).min(last);
    GLYPH_RAMP[index as usize]
}

/// Renders `frame` as `height` lines of `width` glyphs joined by `\n`.
///
/// With `color`, every glyph is wrapped in its own 24-bit foreground escape and a
/// reset, so no color state carries from one glyph to the next.
pub fn render_frame(frame: &RgbFrame, color: bool, index: u64) -> RenderedFrame {
    let width = frame.width() as usize;
    let height = frame.height() as usize;
    let text = if width == 0 || height == 0 {
        String::new()
    } else if color {
        render_colored(frame.pixels(), width, height)
    } else {
        render_plain(frame.pixels(), width, height)
    };
    RenderedFrame::new(index, text)
}

fn render_plain(pixels: &[u8], width: usize, height: usize) -> String {
    let mut out = Vec::with_capacity(height * (width + 1));
    for (row_index, row) in pixels.chunks_exact(width * 3).take(height).enumerate() {
        if row_index > 0 {
            out.push(b'\n');
        }
        out.extend(row.chunks_exact(3).map(|px| glyph_for_pixel(px[0], px[1], px[2])));
    }
    // Ramp bytes and '\n' are ASCII.
    String::from_utf8(out).unwrap_or_default()
}

fn render_colored(pixels: &[u8], width: usize, height: usize) -> String {
    let mut out = Vec::with_capacity(height * (width * MAX_COLORED_GLYPH_LEN + 1));
    for (row_index, row) in pixels.chunks_exact(width * 3).take(height).enumerate() {
        if row_index > 0 {
            out.push(b'\n');
        }
        for px in row.chunks_exact(3) {
            out.extend_from_slice(FOREGROUND_PREFIX);
            push_channel(&mut out, px[0]);
            out.push(b';');
            push_channel(&mut out, px[1]);
            out.push(b';');
            push_channel(&mut out, px[2]);
            out.push(b'm');
            out.push(glyph_for_pixel(px[0], px[1], px[2]));
            out.extend_from_slice(RESET);
        }
    }
    // Escapes, digits and ramp bytes are ASCII.
    String::from_utf8(out).unwrap_or_default()
}
