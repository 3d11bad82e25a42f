//! Helpers to assemble GIF streams and drive playback in tests.

use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

use crate::canvas::{Bitmap, Color, Gfx};
use crate::timer::Clock;

pub const RED: Color = Color::new(0xff, 0, 0);
pub const GREEN: Color = Color::new(0, 0xff, 0);
pub const BLUE: Color = Color::new(0, 0, 0xff);
pub const WHITE: Color = Color::new(0xff, 0xff, 0xff);

/// Pack `(code, width)` pairs LSB first.
pub fn pack_codes(codes: &[(u16, u8)]) -> Vec<u8> {
    let mut bytes = Vec::new();
    let mut buffer: u32 = 0;
    let mut bits = 0;

    for &(code, width) in codes {
        buffer |= u32::from(code) << bits;
        bits += u32::from(width);
        while bits >= 8 {
            bytes.push(buffer as u8);
            buffer >>= 8;
            bits -= 8;
        }
    }
    if bits > 0 {
        bytes.push(buffer as u8);
    }

    bytes
}

/// LZW code stream which only uses literal codes, clearing before the
/// table would force a wider code.
pub fn encode_literal(min_code_size: u8, indices: &[u8]) -> Vec<u8> {
    let clear_code = 1u16 << min_code_size;
    let width = min_code_size + 1;
    let chunk_len = usize::from(clear_code) - 2;

    let mut codes = vec![(clear_code, width)];
    for (i, chunk) in indices.chunks(chunk_len).enumerate() {
        if i > 0 {
            codes.push((clear_code, width));
        }
        codes.extend(chunk.iter().map(|index| (u16::from(*index), width)));
    }
    codes.push((clear_code + 1, width));

    pack_codes(&codes)
}

/// Split `data` into data sub-blocks followed by the block terminator.
pub fn sub_blocks(data: &[u8]) -> Vec<u8> {
    let mut bytes = Vec::new();
    for block in data.chunks(255) {
        bytes.push(block.len() as u8);
        bytes.extend_from_slice(block);
    }
    bytes.push(0);

    bytes
}

fn min_code_size_for(indices: &[u8]) -> u8 {
    let max = indices.iter().copied().max().unwrap_or(0);
    (8 - max.leading_zeros() as u8).max(2)
}

fn color_table(colors: &[Color]) -> (u8, Vec<u8>) {
    let mut size_exp = 0;
    while (2 << size_exp) < colors.len() {
        size_exp += 1;
    }

    let mut bytes = Vec::new();
    for i in 0..(2usize << size_exp) {
        let color = colors.get(i).copied().unwrap_or_default();
        bytes.extend_from_slice(&[color.red, color.green, color.blue]);
    }

    (size_exp as u8, bytes)
}

/// Assembles a GIF89a byte stream block by block.
pub struct GifBuilder {
    bytes: Vec<u8>,
}

impl GifBuilder {
    pub fn new(width: u16, height: u16) -> Self {
        let mut bytes = b"GIF89a".to_vec();
        bytes.extend_from_slice(&width.to_le_bytes());
        bytes.extend_from_slice(&height.to_le_bytes());
        bytes.extend_from_slice(&[0, 0, 0]);

        Self { bytes }
    }

    /// Has to directly follow `new`.
    pub fn global_color_table(mut self, colors: &[Color], background_index: u8) -> Self {
        let (size_exp, table) = color_table(colors);
        self.bytes[10] = 0b1000_0000 | size_exp;
        self.bytes[11] = background_index;
        self.bytes.extend_from_slice(&table);
        self
    }

    pub fn graphic_control(mut self, disposal: u8, delay: u16, transparent: Option<u8>) -> Self {
        let packed = (disposal << 2) | u8::from(transparent.is_some());
        let delay = delay.to_le_bytes();
        self.bytes.extend_from_slice(&[
            0x21,
            0xf9,
            0x04,
            packed,
            delay[0],
            delay[1],
            transparent.unwrap_or(0),
            0x00,
        ]);
        self
    }

    pub fn looping(mut self, loop_count: u16) -> Self {
        self.bytes.extend_from_slice(&[0x21, 0xff, 0x0b]);
        self.bytes.extend_from_slice(b"NETSCAPE2.0");
        self.bytes.push(0x03);
        self.bytes.push(0x01);
        self.bytes.extend_from_slice(&loop_count.to_le_bytes());
        self.bytes.push(0x00);
        self
    }

    pub fn comment(mut self, text: &[u8]) -> Self {
        self.bytes.extend_from_slice(&[0x21, 0xfe]);
        self.bytes.extend_from_slice(&sub_blocks(text));
        self
    }

    pub fn image(self, left: u16, top: u16, width: u16, height: u16, indices: &[u8]) -> Self {
        let min_code_size = min_code_size_for(indices);
        self.descriptor(left, top, width, height, 0)
            .image_data(min_code_size, &encode_literal(min_code_size, indices))
    }

    pub fn image_with_local_table(
        self,
        left: u16,
        top: u16,
        width: u16,
        height: u16,
        colors: &[Color],
        indices: &[u8],
    ) -> Self {
        let (size_exp, table) = color_table(colors);
        let min_code_size = min_code_size_for(indices);
        self.descriptor(left, top, width, height, 0b1000_0000 | size_exp)
            .raw(&table)
            .image_data(min_code_size, &encode_literal(min_code_size, indices))
    }

    /// Image with an already compressed code stream.
    pub fn image_raw(
        self,
        left: u16,
        top: u16,
        width: u16,
        height: u16,
        min_code_size: u8,
        data: &[u8],
    ) -> Self {
        self.descriptor(left, top, width, height, 0).image_data(min_code_size, data)
    }

    pub fn raw(mut self, bytes: &[u8]) -> Self {
        self.bytes.extend_from_slice(bytes);
        self
    }

    pub fn trailer(mut self) -> Self {
        self.bytes.push(0x3b);
        self
    }

    pub fn build(self) -> Vec<u8> {
        self.bytes
    }

    fn descriptor(mut self, left: u16, top: u16, width: u16, height: u16, packed: u8) -> Self {
        self.bytes.push(0x2c);
        for value in [left, top, width, height] {
            self.bytes.extend_from_slice(&value.to_le_bytes());
        }
        self.bytes.push(packed);
        self
    }

    fn image_data(mut self, min_code_size: u8, data: &[u8]) -> Self {
        self.bytes.push(min_code_size);
        self.bytes.extend_from_slice(&sub_blocks(data));
        self
    }
}

/// Clock which only moves when told to.
#[derive(Clone)]
pub struct ManualClock {
    now: Rc<Cell<Instant>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Rc::new(Cell::new(Instant::now())),
        }
    }

    pub fn advance(&self, duration: Duration) {
        self.now.set(self.now.get() + duration);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.now.get()
    }
}

/// Surface which counts every write it receives.
pub struct RecordingGfx {
    pub bitmap: Bitmap,
    pub writes: usize,
}

impl RecordingGfx {
    pub fn new(width: u16, height: u16) -> Self {
        Self {
            bitmap: Bitmap::try_new(width, height).unwrap(),
            writes: 0,
        }
    }
}

impl Gfx for RecordingGfx {
    fn width(&self) -> u16 {
        self.bitmap.width()
    }

    fn height(&self) -> u16 {
        self.bitmap.height()
    }

    fn draw_pixel(&mut self, x: i32, y: i32, color: Color) {
        self.writes += 1;
        self.bitmap.draw_pixel(x, y, color);
    }

    fn fill_rect(&mut self, x: i32, y: i32, width: u16, height: u16, color: Color) {
        self.writes += 1;
        self.bitmap.fill_rect(x, y, width, height, color);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_encoding_packs_expected_codes() {
        // clear, 1, 2, clear, 3, end at 3 bits
        let data = encode_literal(2, &[1, 2, 3]);
        assert_eq!(data, pack_codes(&[(4, 3), (1, 3), (2, 3), (4, 3), (3, 3), (5, 3)]));
        assert_eq!(sub_blocks(&data), [3, data[0], data[1], data[2], 0]);
    }
}
