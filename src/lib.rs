//! GIF decoding and non-blocking playback for LED-matrix displays.

pub mod canvas;
pub mod compositor;
pub mod error;
pub mod parser;
pub mod player;
pub mod stream;
pub mod timer;

#[cfg(test)]
mod test_util;

pub use canvas::{Bitmap, Canvas, Color, Gfx};
pub use error::{GifError, Result};
pub use player::{GifPlayer, PlayState, PlayerConfig};
pub use stream::{ByteStream, LoadMode};
pub use timer::{Clock, SystemClock};
