mod bit_reader;
mod decoder;
mod lzw;

pub use bit_reader::CodeStream;
pub use decoder::{
    Animation, Block, ColorTable, Decoder, GraphicControlExtension, ImageDescriptor,
    LogicalScreenDescriptor,
};
pub use lzw::{IndexStream, LzwDecoder};

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisposalMethod {
    #[default]
    Unspecified = 0,
    DoNotDispose = 1,
    RestoreToBackgroundColor = 2,
    RestoreToPrevious = 3,
}

impl DisposalMethod {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(DisposalMethod::Unspecified),
            1 => Some(DisposalMethod::DoNotDispose),
            2 => Some(DisposalMethod::RestoreToBackgroundColor),
            3 => Some(DisposalMethod::RestoreToPrevious),
            _ => None,
        }
    }
}
