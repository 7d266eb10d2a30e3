//! Synthesizes a 320x240 JPEG carrying a large text label, so a node that has crashed or failed
//! setup still produces a frame every cycle instead of going dark.
//!
//! Text is rasterized with a fixed 5x7 bitmap glyph table rather than a shaped font — nothing in
//! this codebase's dependency corpus pulls in a text-shaping stack, and the message set is small
//! and fixed (`SETUP ERR`, `RUNTIME ERROR`, `LOAD FAIL`, `NO SIGNAL`, a truncated error string,
//! and a timestamp), so a blocky bitmap keeps the only new dependency `image` itself.

use image::{ImageEncoder, Rgb, RgbImage};

const WIDTH: u32 = 320;
const HEIGHT: u32 = 240;
const GLYPH_W: u32 = 5;
const GLYPH_H: u32 = 7;

/// Rows of the 5x7 glyph, each byte's low 5 bits are the pixels left-to-right (bit 4 = leftmost).
type Glyph = [u8; 7];

const BLANK: Glyph = [0, 0, 0, 0, 0, 0, 0];
const FALLBACK: Glyph = [0b11111, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b11111];

fn glyph_for(c: char) -> Glyph {
    match c.to_ascii_uppercase() {
        ' ' => BLANK,
        'A' => [0b01110, 0b10001, 0b10001, 0b11111, 0b10001, 0b10001, 0b10001],
        'D' => [0b11110, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b11110],
        'E' => [0b11111, 0b10000, 0b10000, 0b11110, 0b10000, 0b10000, 0b11111],
        'F' => [0b11111, 0b10000, 0b10000, 0b11110, 0b10000, 0b10000, 0b10000],
        'G' => [0b01110, 0b10001, 0b10000, 0b10111, 0b10001, 0b10001, 0b01110],
        'I' => [0b01110, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100, 0b01110],
        'L' => [0b10000, 0b10000, 0b10000, 0b10000, 0b10000, 0b10000, 0b11111],
        'M' => [0b10001, 0b11011, 0b10101, 0b10101, 0b10001, 0b10001, 0b10001],
        'N' => [0b10001, 0b11001, 0b10101, 0b10101, 0b10011, 0b10001, 0b10001],
        'O' => [0b01110, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01110],
        'P' => [0b11110, 0b10001, 0b10001, 0b11110, 0b10000, 0b10000, 0b10000],
        'R' => [0b11110, 0b10001, 0b10001, 0b11110, 0b10100, 0b10010, 0b10001],
        'S' => [0b01111, 0b10000, 0b10000, 0b01110, 0b00001, 0b00001, 0b11110],
        'T' => [0b11111, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100],
        'U' => [0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01110],
        '0' => [0b01110, 0b10011, 0b10101, 0b10101, 0b11001, 0b10001, 0b01110],
        '1' => [0b00100, 0b01100, 0b00100, 0b00100, 0b00100, 0b00100, 0b01110],
        '2' => [0b01110, 0b10001, 0b00001, 0b00110, 0b01000, 0b10000, 0b11111],
        '3' => [0b11110, 0b00001, 0b00001, 0b01110, 0b00001, 0b00001, 0b11110],
        '4' => [0b00010, 0b00110, 0b01010, 0b10010, 0b11111, 0b00010, 0b00010],
        '5' => [0b11111, 0b10000, 0b11110, 0b00001, 0b00001, 0b10001, 0b01110],
        '6' => [0b01110, 0b10000, 0b10000, 0b11110, 0b10001, 0b10001, 0b01110],
        '7' => [0b11111, 0b00001, 0b00010, 0b00100, 0b01000, 0b01000, 0b01000],
        '8' => [0b01110, 0b10001, 0b10001, 0b01110, 0b10001, 0b10001, 0b01110],
        '9' => [0b01110, 0b10001, 0b10001, 0b01111, 0b00001, 0b00001, 0b01110],
        ':' => [0b00000, 0b00100, 0b00000, 0b00000, 0b00000, 0b00100, 0b00000],
        '.' => [0b00000, 0b00000, 0b00000, 0b00000, 0b00000, 0b01100, 0b01100],
        '-' => [0b00000, 0b00000, 0b00000, 0b11111, 0b00000, 0b00000, 0b00000],
        _ => FALLBACK,
    }
}

/// Draw `text` at `(x, y)` in `color`, each glyph cell scaled by `scale` pixels per dot and
/// padded by one dot-width of spacing between characters.
fn draw_text(image: &mut RgbImage, text: &str, x: u32, y: u32, scale: u32, color: Rgb<u8>) {
    let mut cursor_x = x;
    for c in text.chars() {
        let glyph = glyph_for(c);
        for (row, bits) in glyph.iter().enumerate() {
            for col in 0..GLYPH_W {
                if bits & (1 << (GLYPH_W - 1 - col)) != 0 {
                    fill_block(image, cursor_x + col * scale, y + row as u32 * scale, scale, color);
                }
            }
        }
        cursor_x += (GLYPH_W + 1) * scale;
    }
}

fn fill_block(image: &mut RgbImage, x: u32, y: u32, size: u32, color: Rgb<u8>) {
    for dy in 0..size {
        for dx in 0..size {
            let (px, py) = (x + dx, y + dy);
            if px < image.width() && py < image.height() {
                image.put_pixel(px, py, color);
            }
        }
    }
}

fn text_width(text: &str, scale: u32) -> u32 {
    text.chars().count() as u32 * (GLYPH_W + 1) * scale
}

fn encode_jpeg(image: &RgbImage) -> bytes::Bytes {
    let mut buf = Vec::new();
    let encoder = image::codecs::jpeg::JpegEncoder::new(&mut buf);
    encoder
        .write_image(image.as_raw(), image.width(), image.height(), image::ExtendedColorType::Rgb8)
        .expect("invariant: a freshly built RgbImage encodes to JPEG without error");
    bytes::Bytes::from(buf)
}

fn centered(image: &mut RgbImage, lines: &[&str], scale: u32, color: Rgb<u8>) {
    let line_height = GLYPH_H * scale + scale * 2;
    let total_height = line_height * lines.len() as u32;
    let mut y = (HEIGHT.saturating_sub(total_height)) / 2;
    for line in lines {
        let x = (WIDTH.saturating_sub(text_width(line, scale))) / 2;
        draw_text(image, line, x, y, scale, color);
        y += line_height;
    }
}

/// Which kind of failure this error frame represents, per `SPEC_FULL.md` §4.9.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A node's `setup()` raised.
    SetupError,
    /// A node's `loop()`/`produce()`/`process()` raised mid-run.
    RuntimeError,
    /// The supervisor could not load the node module at all.
    LoadFailure,
}

impl ErrorKind {
    fn label(self) -> &'static str {
        match self {
            Self::SetupError => "SETUP ERR",
            Self::RuntimeError => "RUNTIME ERROR",
            Self::LoadFailure => "LOAD FAIL",
        }
    }
}

/// Render an error frame: large red label, the (shortened) error message, and a timestamp.
#[must_use]
pub fn render_error_frame(kind: ErrorKind, message: &str, now_secs: f64) -> bytes::Bytes {
    let mut image = RgbImage::from_pixel(WIDTH, HEIGHT, Rgb([20, 20, 20]));
    let shortened: String = message.chars().take(28).collect();
    let timestamp = format!("{now_secs:.0}");
    centered(&mut image, &[kind.label(), &shortened, &timestamp], 3, Rgb([220, 30, 30]));
    encode_jpeg(&image)
}

/// Render the gateway's "no signal" placeholder for a topic that has gone quiet.
#[must_use]
pub fn render_no_signal_frame(topic: &str) -> bytes::Bytes {
    let mut image = RgbImage::from_pixel(WIDTH, HEIGHT, Rgb([40, 40, 40]));
    centered(&mut image, &["NO SIGNAL", topic], 3, Rgb([180, 180, 180]));
    encode_jpeg(&image)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_frame_is_valid_jpeg() {
        let bytes = render_error_frame(ErrorKind::RuntimeError, "boom: divide by zero", 1_700_000_000.0);
        assert!(!bytes.is_empty());
        assert_eq!(&bytes[0..2], &[0xFF, 0xD8], "JPEG frames start with the SOI marker");
    }

    #[test]
    fn no_signal_frame_is_valid_jpeg() {
        let bytes = render_no_signal_frame("cam-1");
        assert_eq!(&bytes[0..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn long_message_is_shortened() {
        let long = "x".repeat(500);
        // Should not panic while drawing an oversized message off the edges of the canvas.
        let bytes = render_error_frame(ErrorKind::SetupError, &long, 0.0);
        assert!(!bytes.is_empty());
    }
}
