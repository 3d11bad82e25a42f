use log::trace;

use super::bit_reader::{BitReader, CodeStream};
use crate::error::{GifError, Result};

/// Max. number of codes, 2^12.
pub const CODE_LIMIT: usize = 4096;

/// Max. number of bytes a single code can expand to.
const STACK_SIZE: usize = 4096;

const MIN_CODE_SIZE: u8 = 2;
const MAX_CODE_SIZE: u8 = 11;

/// Sink of decoded palette indices.
pub trait IndexStream {
    fn write_index(&mut self, index: u8) -> Result<()>;
}

impl<F: FnMut(u8) -> Result<()>> IndexStream for F {
    fn write_index(&mut self, index: u8) -> Result<()> {
        self(index)
    }
}

/// GIF flavoured LZW decompressor.
///
/// The tables are allocated once and reused for every image; `init` has to
/// be called before each image's code stream.
pub struct LzwDecoder {
    min_code_size: u8,
    clear_code: u16,
    end_code: u16,
    next_code: u16,
    max_code: u16,
    code_width: u8,
    awaiting_first_code: bool,
    first_byte: u8,
    prev_code: u16,
    bits: BitReader,
    // entry n expands to the string of `prefix[n]` followed by `suffix[n]`
    prefix: Box<[u16; CODE_LIMIT]>,
    suffix: Box<[u8; CODE_LIMIT]>,
    stack: Box<[u8; STACK_SIZE]>,
    stack_len: usize,
}

impl Default for LzwDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl LzwDecoder {
    pub fn new() -> Self {
        Self {
            min_code_size: 0,
            clear_code: 0,
            end_code: 0,
            next_code: 0,
            max_code: 0,
            code_width: 0,
            awaiting_first_code: true,
            first_byte: 0,
            prev_code: 0,
            bits: BitReader::default(),
            prefix: Box::new([0; CODE_LIMIT]),
            suffix: Box::new([0; CODE_LIMIT]),
            stack: Box::new([0; STACK_SIZE]),
            stack_len: 0,
        }
    }

    /// Prepare for a new code stream with the given minimum code size.
    pub fn init(&mut self, min_code_size: u8) -> Result<()> {
        if !(MIN_CODE_SIZE..=MAX_CODE_SIZE).contains(&min_code_size) {
            return Err(GifError::FormatUnsupported(format!(
                "lzw minimum code size {min_code_size} is not supported"
            )));
        }

        self.min_code_size = min_code_size;
        self.clear_code = 1 << min_code_size;
        self.end_code = self.clear_code + 1;
        self.bits.reset();
        self.stack_len = 0;
        self.clear();

        Ok(())
    }

    /// Decode codes from `input` until the end code, writing every index to
    /// `output`.
    pub fn decode<R, W>(&mut self, input: &mut R, output: &mut W) -> Result<()>
    where
        R: CodeStream + ?Sized,
        W: IndexStream + ?Sized,
    {
        if self.clear_code == 0 {
            return Err(GifError::DecodeError("decoder is not initialized".into()));
        }

        loop {
            let code = self.bits.read_code(self.code_width, input).ok_or_else(|| {
                GifError::DecodeError("code stream ended before the end code".into())
            })?;

            if code == self.end_code {
                trace!("end code reached, {} codes in table", self.next_code);
                return Ok(());
            } else if code == self.clear_code {
                self.clear();
            } else {
                self.decompress(code, output)?;
            }
        }
    }

    fn clear(&mut self) {
        self.next_code = self.end_code + 1;
        self.max_code = 2 * self.clear_code - 1;
        self.code_width = self.min_code_size + 1;
        self.awaiting_first_code = true;
    }

    fn decompress<W: IndexStream + ?Sized>(&mut self, code: u16, output: &mut W) -> Result<()> {
        if self.awaiting_first_code {
            if code > self.end_code {
                return Err(GifError::DecodeError(format!(
                    "first code {code} after a clear exceeds end code {}",
                    self.end_code
                )));
            }

            self.first_byte = code as u8;
            self.prev_code = code;
            self.awaiting_first_code = false;

            return output.write_index(code as u8);
        }

        let in_code = code;
        let mut code = code;

        // KwKwK: the code is the entry about to be created
        if code >= self.next_code {
            if code != self.next_code {
                return Err(GifError::DecodeError(format!(
                    "code {code} is beyond the next free code {}",
                    self.next_code
                )));
            }
            self.push(self.first_byte)?;
            code = self.prev_code;
        }

        while code >= self.clear_code {
            let entry = usize::from(code);
            self.push(self.suffix[entry])?;
            code = self.prefix[entry];
        }

        self.first_byte = code as u8;
        self.push(self.first_byte)?;

        while self.stack_len > 0 {
            self.stack_len -= 1;
            output.write_index(self.stack[self.stack_len])?;
        }

        if usize::from(self.next_code) < CODE_LIMIT {
            let entry = usize::from(self.next_code);
            self.prefix[entry] = self.prev_code;
            self.suffix[entry] = self.first_byte;
            self.next_code += 1;

            if self.next_code > self.max_code && usize::from(self.next_code) < CODE_LIMIT {
                self.max_code = 2 * self.max_code + 1;
                self.code_width += 1;
            }
        }

        self.prev_code = in_code;

        Ok(())
    }

    fn push(&mut self, byte: u8) -> Result<()> {
        if self.stack_len >= STACK_SIZE {
            return Err(GifError::DecodeError("decode stack overflow".into()));
        }
        self.stack[self.stack_len] = byte;
        self.stack_len += 1;

        Ok(())
    }
}
