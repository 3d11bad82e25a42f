use std::io;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum GifError {
    #[error("file {0} not found")]
    FileNotFound(String),

    #[error("a gif is already opened, close it first")]
    AlreadyOpen,

    #[error("no gif is opened")]
    NotOpen,

    #[error("invalid gif format: {0}")]
    FormatInvalid(String),

    #[error("unsupported gif format: {0}")]
    FormatUnsupported(String),

    #[error("image of {width}x{height} pixels is too big")]
    ImageTooBig {
        width: u16,
        height: u16,
    },

    #[error("lzw decoding failed: {0}")]
    DecodeError(String),

    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, GifError>;
