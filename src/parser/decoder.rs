use std::time::Duration;

use log::{debug, trace, warn};

use super::bit_reader::CodeStream;
use super::lzw::LzwDecoder;
use super::DisposalMethod;
use crate::canvas::{Canvas, Color, Gfx};
use crate::compositor::FrameWriter;
use crate::error::{GifError, Result};
use crate::stream::ByteStream;

const SIGNATURE: &[u8] = b"GIF";

const EXTENSION_INTRODUCER: u8 = 0x21;
const IMAGE_DESCRIPTOR_LABEL: u8 = 0x2c;
const TRAILER_LABEL: u8 = 0x3b;

// Extension labels
const APPLICATION_EXTENSION: u8 = 0xff;
const COMMENT_EXTENSION: u8 = 0xfe;
const GRAPHIC_CONTROL_EXTENSION: u8 = 0xf9;
const PLAIN_TEXT_EXTENSION: u8 = 0x01;

const GRAPHIC_CONTROL_BLOCK_SIZE: u8 = 4;
const APPLICATION_BLOCK_SIZE: u8 = 11;
const LOOPING_SUB_BLOCK_SIZE: u8 = 3;
const LOOPING_SUB_BLOCK_ID: u8 = 0x01;

const MAX_SUB_BLOCK_SIZE: usize = 255;

/// Application extensions which carry the animation loop count.
const LOOPING_APPLICATIONS: [&[u8; 11]; 2] = [b"NETSCAPE2.0", b"ANIMEXTS1.0"];

#[derive(Debug)]
enum ExtensionType {
    Application,
    Comment,
    GraphicControl,
    PlainText,
    Unknown(u8),
}

impl From<u8> for ExtensionType {
    fn from(value: u8) -> Self {
        use ExtensionType::*;

        match value {
            APPLICATION_EXTENSION => Application,
            COMMENT_EXTENSION => Comment,
            GRAPHIC_CONTROL_EXTENSION => GraphicControl,
            PLAIN_TEXT_EXTENSION => PlainText,
            label => Unknown(label),
        }
    }
}

/// Top level block kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Block {
    Extension,
    Image,
    Trailer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Version {
    V87a,
    V89a,
}

impl TryFrom<&[u8]> for Version {
    type Error = GifError;

    fn try_from(value: &[u8]) -> std::result::Result<Self, Self::Error> {
        match value {
            b"87a" => Ok(Version::V87a),
            b"89a" => Ok(Version::V89a),
            version => Err(GifError::FormatUnsupported(format!(
                "version {} in the header is unsupported",
                String::from_utf8_lossy(version)
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogicalScreenDescriptor {
    pub screen_width: u16,
    pub screen_height: u16,
    pub global_color_table_flag: bool,
    pub color_resolution: u8,
    pub sort_flag: bool,
    pub global_color_table_size_exp: u8,
    pub background_color_index: u8,
    pub pixel_aspect_ratio: u8,
}

/// RGB palette, either global or local to one image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorTable {
    colors: Vec<Color>,
}

impl ColorTable {
    /// Size in bytes of a table with the given size exponent: 3 * 2^(exp + 1).
    pub fn byte_len(size_exp: u8) -> usize {
        3 * (1 << (usize::from(size_exp & 0b111) + 1))
    }

    pub fn from_rgb(bytes: &[u8]) -> Self {
        let colors = bytes
            .chunks_exact(3)
            .map(|rgb| Color::new(rgb[0], rgb[1], rgb[2]))
            .collect();

        Self { colors }
    }

    pub fn get(&self, index: u8) -> Option<Color> {
        self.colors.get(usize::from(index)).copied()
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GraphicControlExtension {
    pub disposal_method: DisposalMethod,
    pub user_input_flag: bool,
    pub transparent_color_flag: bool,

    /// In 1/100 s.
    pub delay_time: u16,
    pub transparent_color_index: u8,
}

impl GraphicControlExtension {
    pub fn transparent_index(&self) -> Option<u8> {
        self.transparent_color_flag.then_some(self.transparent_color_index)
    }

    pub fn delay(&self) -> Duration {
        Duration::from_millis(u64::from(self.delay_time) * 10)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageDescriptor {
    pub left: u16,
    pub top: u16,
    pub width: u16,
    pub height: u16,
    pub local_color_table_flag: bool,
    pub interlace_flag: bool,
    pub sort_flag: bool,
    pub local_color_table_size_exp: u8,
}

/// Looping state declared by a NETSCAPE2.0 application extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Animation {
    /// Remaining passes, 0 means forever.
    pub loop_count: u16,
    /// Stream position right after the looping extension.
    pub restart_position: u64,
}

/// Block level GIF parser working directly on a seekable stream.
///
/// The decoder never reads ahead: between two calls the stream is always
/// positioned on the next block id, which is what makes playback resumable.
pub struct Decoder {
    inner: Box<dyn ByteStream>,
    screen: LogicalScreenDescriptor,
    global_color_table: Option<ColorTable>,
    local_color_table: Option<ColorTable>,
    graphic_control: Option<GraphicControlExtension>,
    animation: Option<Animation>,
    lzw: Box<LzwDecoder>,
}

impl Decoder {
    /// Parse header, logical screen descriptor and global color table.
    pub fn open(mut inner: Box<dyn ByteStream>, allow_gif87a: bool) -> Result<Self> {
        let mut header = [0; 6];
        inner
            .read_into(&mut header)
            .map_err(|err| GifError::FormatInvalid(format!("failed to read header: {err}")))?;

        if &header[..3] != SIGNATURE {
            return Err(GifError::FormatUnsupported("signature is invalid".into()));
        }
        let version = Version::try_from(&header[3..])?;
        if version == Version::V87a && !allow_gif87a {
            return Err(GifError::FormatUnsupported("version 87a is not enabled".into()));
        }
        debug!("processed header, got {:?}", version);

        let mut decoder = Self {
            inner,
            screen: LogicalScreenDescriptor {
                screen_width: 0,
                screen_height: 0,
                global_color_table_flag: false,
                color_resolution: 0,
                sort_flag: false,
                global_color_table_size_exp: 0,
                background_color_index: 0,
                pixel_aspect_ratio: 0,
            },
            global_color_table: None,
            local_color_table: None,
            graphic_control: None,
            animation: None,
            lzw: Box::new(LzwDecoder::new()),
        };

        decoder.screen = decoder.read_logical_screen_descriptor()?;
        if decoder.screen.screen_width == 0 || decoder.screen.screen_height == 0 {
            return Err(GifError::FormatUnsupported(format!(
                "logical screen of {}x{} pixels",
                decoder.screen.screen_width, decoder.screen.screen_height
            )));
        }

        if decoder.screen.global_color_table_flag {
            let table = decoder.read_color_table(decoder.screen.global_color_table_size_exp, "global color table")?;
            debug!("processed global color table with {} colors", table.len());
            decoder.global_color_table = Some(table);
        }

        Ok(decoder)
    }

    pub fn screen(&self) -> &LogicalScreenDescriptor {
        &self.screen
    }

    pub fn global_color_table(&self) -> Option<&ColorTable> {
        self.global_color_table.as_ref()
    }

    pub fn local_color_table(&self) -> Option<&ColorTable> {
        self.local_color_table.as_ref()
    }

    /// Background color, always looked up in the global color table.
    pub fn background_color(&self) -> Option<Color> {
        self.global_color_table
            .as_ref()
            .and_then(|table| table.get(self.screen.background_color_index))
    }

    pub fn animation(&self) -> Option<&Animation> {
        self.animation.as_ref()
    }

    pub fn animation_mut(&mut self) -> Option<&mut Animation> {
        self.animation.as_mut()
    }

    /// Graphic control for the next image; defaults if none was parsed.
    pub fn take_graphic_control(&mut self) -> GraphicControlExtension {
        self.graphic_control.take().unwrap_or_default()
    }

    pub fn position(&mut self) -> Result<u64> {
        self.inner
            .position()
            .map_err(|err| GifError::FormatInvalid(format!("failed to query stream position: {err}")))
    }

    /// Seek back to the block right after the looping extension.
    pub fn restart(&mut self) -> Result<()> {
        let animation = self
            .animation
            .ok_or_else(|| GifError::FormatInvalid("restart without a looping extension".into()))?;

        self.inner
            .seek_to(animation.restart_position)
            .map_err(|err| GifError::FormatInvalid(format!("failed to seek to animation start: {err}")))?;
        self.graphic_control = None;
        debug!("restarted animation at {}", animation.restart_position);

        Ok(())
    }

    pub fn next_block(&mut self) -> Result<Block> {
        match self.read_byte("block id")? {
            EXTENSION_INTRODUCER => Ok(Block::Extension),
            IMAGE_DESCRIPTOR_LABEL => Ok(Block::Image),
            TRAILER_LABEL => Ok(Block::Trailer),
            label => Err(GifError::FormatInvalid(format!(
                "encountered unexpected block id 0x{label:02x}"
            ))),
        }
    }

    /// Parse an extension, the extension introducer is already consumed.
    pub fn process_extension(&mut self) -> Result<()> {
        use ExtensionType::*;

        let label = ExtensionType::from(self.read_byte("extension label")?);
        debug!("processing extension type: {:?}", label);

        match label {
            GraphicControl => self.process_graphic_control(),
            Application => self.process_application(),
            Comment | PlainText => self.skip_sub_blocks(),
            Unknown(label) => {
                debug!("skipping unknown extension 0x{label:02x}");
                self.skip_sub_blocks()
            }
        }
    }

    /// Parse the image descriptor and its optional local color table, the
    /// image separator is already consumed.
    pub fn read_image_descriptor(&mut self) -> Result<ImageDescriptor> {
        let mut body = [0; 9];
        self.read_bytes(&mut body, "image descriptor")?;

        let packed_fields = body[8];
        let descriptor = ImageDescriptor {
            left: u16::from_le_bytes([body[0], body[1]]),
            top: u16::from_le_bytes([body[2], body[3]]),
            width: u16::from_le_bytes([body[4], body[5]]),
            height: u16::from_le_bytes([body[6], body[7]]),
            local_color_table_flag: packed_fields & 0b1000_0000 != 0,
            interlace_flag: packed_fields & 0b0100_0000 != 0,
            sort_flag: packed_fields & 0b0010_0000 != 0,
            local_color_table_size_exp: packed_fields & 0b0000_0111,
        };
        debug!("processed image descriptor, got: {:?}", descriptor);

        self.local_color_table = None;
        if descriptor.local_color_table_flag {
            let table = self.read_color_table(descriptor.local_color_table_size_exp, "local color table")?;
            self.local_color_table = Some(table);
        }

        if descriptor.interlace_flag {
            debug!("interlaced image is drawn in raster order");
        }

        Ok(descriptor)
    }

    /// Decode the image data following an image descriptor into `scene`.
    pub fn decode_image(
        &mut self,
        image: &ImageDescriptor,
        control: &GraphicControlExtension,
        scene: &mut dyn Gfx,
    ) -> Result<()> {
        let min_code_size = self.read_byte("lzw minimum code size")?;
        self.lzw.init(min_code_size)?;

        let palette = self.local_color_table.as_ref().or(self.global_color_table.as_ref());
        let canvas = Canvas::new(
            scene,
            i32::from(image.left),
            i32::from(image.top),
            image.width,
            image.height,
        );
        let mut writer = FrameWriter::new(canvas, palette, control.transparent_index());
        let mut blocks = SubBlockReader::new(&mut *self.inner);

        self.lzw.decode(&mut blocks, &mut writer)?;
        trace!("decoded {} indices", writer.written());

        let block_terminator = self.read_byte("image data terminator")?;
        if block_terminator != 0 {
            return Err(GifError::FormatInvalid(format!(
                "expected image data terminator, got 0x{block_terminator:02x}"
            )));
        }

        Ok(())
    }

    fn read_logical_screen_descriptor(&mut self) -> Result<LogicalScreenDescriptor> {
        let mut body = [0; 7];
        self.read_bytes(&mut body, "logical screen descriptor")?;

        let packed_fields = body[4];
        let screen = LogicalScreenDescriptor {
            screen_width: u16::from_le_bytes([body[0], body[1]]),
            screen_height: u16::from_le_bytes([body[2], body[3]]),
            global_color_table_flag: packed_fields & 0b1000_0000 != 0,
            color_resolution: (packed_fields >> 4) & 0b0000_0111,
            sort_flag: packed_fields & 0b0000_1000 != 0,
            global_color_table_size_exp: packed_fields & 0b0000_0111,
            background_color_index: body[5],
            pixel_aspect_ratio: body[6],
        };
        debug!("processed logical screen descriptor, got: {:#?}", screen);

        Ok(screen)
    }

    fn read_color_table(&mut self, size_exp: u8, what: &str) -> Result<ColorTable> {
        let mut buffer = vec![0; ColorTable::byte_len(size_exp)];
        self.read_bytes(&mut buffer, what)?;

        Ok(ColorTable::from_rgb(&buffer))
    }

    fn process_graphic_control(&mut self) -> Result<()> {
        let block_size = self.read_byte("graphic control block size")?;
        if block_size != GRAPHIC_CONTROL_BLOCK_SIZE {
            return Err(GifError::FormatInvalid(format!(
                "graphic control extension has block size {block_size}, expected {GRAPHIC_CONTROL_BLOCK_SIZE}"
            )));
        }

        let mut body = [0; 4];
        self.read_bytes(&mut body, "graphic control extension")?;

        // packed fields definition
        // XXXYYYZW
        // XXX = reserved, not needed
        // YYY = disposal method, indicates what to do with graphic after displaying
        // Z = user input flag
        // W = transparent color flag
        let packed_fields = body[0];
        let raw_disposal_method = (packed_fields >> 2) & 0b0000_0111;
        let disposal_method = DisposalMethod::from_u8(raw_disposal_method).unwrap_or_else(|| {
            debug!("reserved disposal method {raw_disposal_method}, no disposal applied");
            DisposalMethod::Unspecified
        });

        let block_terminator = self.read_byte("graphic control terminator")?;
        if block_terminator != 0 {
            return Err(GifError::FormatInvalid(format!(
                "expected graphic control terminator, got 0x{block_terminator:02x}"
            )));
        }

        let graphic_control = GraphicControlExtension {
            disposal_method,
            user_input_flag: packed_fields & 0b0000_0010 != 0,
            transparent_color_flag: packed_fields & 0b0000_0001 != 0,
            delay_time: u16::from_le_bytes([body[1], body[2]]),
            transparent_color_index: body[3],
        };
        debug!("processed graphic control extension: {:?}", graphic_control);

        self.graphic_control = Some(graphic_control);
        Ok(())
    }

    fn process_application(&mut self) -> Result<()> {
        let block_size = self.read_byte("application block size")?;
        if block_size != APPLICATION_BLOCK_SIZE {
            debug!("skipping application extension with block size {block_size}");
            self.skip(u64::from(block_size), "application extension")?;
            return self.skip_sub_blocks();
        }

        let mut application = [0; APPLICATION_BLOCK_SIZE as usize];
        self.read_bytes(&mut application, "application extension")?;
        debug!(
            "processing application extension {}",
            String::from_utf8_lossy(&application)
        );

        if LOOPING_APPLICATIONS.iter().any(|name| **name == application) {
            self.process_looping_sub_blocks()
        } else {
            self.skip_sub_blocks()
        }
    }

    /// Parse the loop count sub-block. Anything unexpected turns the file
    /// into a non looping one instead of failing.
    fn process_looping_sub_blocks(&mut self) -> Result<()> {
        let sub_block_size = self.read_byte("looping sub-block size")?;
        if sub_block_size != LOOPING_SUB_BLOCK_SIZE {
            warn!("looping sub-block has size {sub_block_size}, playing without loop");
            return self.skip_sub_blocks_from(sub_block_size);
        }

        let mut body = [0; LOOPING_SUB_BLOCK_SIZE as usize];
        self.read_bytes(&mut body, "looping sub-block")?;
        if body[0] != LOOPING_SUB_BLOCK_ID {
            warn!("looping sub-block has id 0x{:02x}, playing without loop", body[0]);
            return self.skip_sub_blocks();
        }

        let block_terminator = self.read_byte("looping extension terminator")?;
        if block_terminator != 0 {
            warn!("looping extension is not terminated, playing without loop");
            return self.skip_sub_blocks_from(block_terminator);
        }

        let loop_count = u16::from_le_bytes([body[1], body[2]]);
        let restart_position = self.position()?;
        self.animation = Some(Animation {
            loop_count,
            restart_position,
        });
        debug!("processed looping extension, loop count {loop_count}, restart at {restart_position}");

        Ok(())
    }

    fn skip_sub_blocks(&mut self) -> Result<()> {
        let size = self.read_byte("sub-block size")?;
        self.skip_sub_blocks_from(size)
    }

    fn skip_sub_blocks_from(&mut self, mut size: u8) -> Result<()> {
        while size != 0 {
            self.skip(u64::from(size), "sub-block")?;
            size = self.read_byte("sub-block size")?;
        }

        Ok(())
    }

    fn skip(&mut self, count: u64, what: &str) -> Result<()> {
        self.inner
            .skip(count)
            .map_err(|err| GifError::FormatInvalid(format!("failed to skip {what}: {err}")))
    }

    fn read_bytes(&mut self, buffer: &mut [u8], what: &str) -> Result<()> {
        self.inner
            .read_into(buffer)
            .map_err(|err| GifError::FormatInvalid(format!("failed to read {what}: {err}")))
    }

    fn read_byte(&mut self, what: &str) -> Result<u8> {
        let mut buffer = [0; 1];
        self.read_bytes(&mut buffer, what)?;
        Ok(buffer[0])
    }
}

/// Feeds the LZW decoder from consecutive data sub-blocks, loading one
/// sub-block at a time.
struct SubBlockReader<'a> {
    inner: &'a mut dyn ByteStream,
    block: [u8; MAX_SUB_BLOCK_SIZE],
    len: usize,
    idx: usize,
    exhausted: bool,
}

impl<'a> SubBlockReader<'a> {
    fn new(inner: &'a mut dyn ByteStream) -> Self {
        Self {
            inner,
            block: [0; MAX_SUB_BLOCK_SIZE],
            len: 0,
            idx: 0,
            exhausted: false,
        }
    }

    fn load_next(&mut self) -> bool {
        let mut size = [0; 1];
        if let Err(err) = self.inner.read_into(&mut size) {
            debug!("failed to read data sub-block size: {err}");
            return false;
        }

        let len = usize::from(size[0]);
        if len == 0 {
            return false;
        }
        if let Err(err) = self.inner.read_into(&mut self.block[..len]) {
            debug!("failed to read data sub-block: {err}");
            return false;
        }

        self.len = len;
        self.idx = 0;
        true
    }
}

impl CodeStream for SubBlockReader<'_> {
    fn next_byte(&mut self) -> Option<u8> {
        if self.idx >= self.len {
            if self.exhausted || !self.load_next() {
                self.exhausted = true;
                return None;
            }
        }

        let byte = self.block[self.idx];
        self.idx += 1;
        Some(byte)
    }
}
