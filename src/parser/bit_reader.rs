/// Source of code stream bytes, one byte at a time.
pub trait CodeStream {
    /// Next byte, or `None` once the stream is exhausted.
    fn next_byte(&mut self) -> Option<u8>;
}

impl<F: FnMut() -> Option<u8>> CodeStream for F {
    fn next_byte(&mut self) -> Option<u8> {
        self()
    }
}

/// Reads LSB-first codes of up to 12 bits which may straddle byte
/// boundaries.
#[derive(Debug, Default)]
pub struct BitReader {
    buffer: u32,
    // number of valid bits in `buffer`
    bits: u8,
}

impl BitReader {
    pub fn reset(&mut self) {
        self.buffer = 0;
        self.bits = 0;
    }

    pub fn read_code<R: CodeStream + ?Sized>(&mut self, width: u8, input: &mut R) -> Option<u16> {
        debug_assert!(width <= 12);

        while self.bits < width {
            let byte = input.next_byte()?;
            self.buffer |= u32::from(byte) << self.bits;
            self.bits += 8;
        }

        let code = self.buffer & ((1 << width) - 1);
        self.buffer >>= width;
        self.bits -= width;

        Some(code as u16)
    }
}
