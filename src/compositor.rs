//! Turns decoded palette indices into scene pixels.

use log::{trace, warn};

use crate::canvas::{Canvas, Color, Gfx};
use crate::error::{GifError, Result};
use crate::parser::{ColorTable, DisposalMethod, IndexStream};

/// Writes the indices of one image, row by row, into its sub-rectangle of
/// the scene.
pub struct FrameWriter<'c, 'p> {
    canvas: Canvas<'c>,
    palette: Option<&'p ColorTable>,
    transparent: Option<u8>,
    x: u16,
    y: u16,
    written: usize,
}

impl<'c, 'p> FrameWriter<'c, 'p> {
    pub fn new(canvas: Canvas<'c>, palette: Option<&'p ColorTable>, transparent: Option<u8>) -> Self {
        Self {
            canvas,
            palette,
            transparent,
            x: 0,
            y: 0,
            written: 0,
        }
    }

    /// Number of indices received so far.
    pub fn written(&self) -> usize {
        self.written
    }
}

impl IndexStream for FrameWriter<'_, '_> {
    fn write_index(&mut self, index: u8) -> Result<()> {
        let palette = self
            .palette
            .filter(|table| !table.is_empty())
            .ok_or_else(|| GifError::FormatInvalid("image has no color table".into()))?;
        let color = palette.get(index).ok_or_else(|| {
            GifError::FormatInvalid(format!(
                "color index {index} is outside of a table with {} colors",
                palette.len()
            ))
        })?;

        if self.transparent != Some(index) {
            self.canvas.draw_pixel(i32::from(self.x), i32::from(self.y), color);
        }

        self.x += 1;
        if self.x >= self.canvas.width() {
            self.x = 0;
            self.y = self.y.saturating_add(1);
        }
        self.written += 1;

        Ok(())
    }
}

/// Apply the disposal of the previously shown image to the scene.
pub fn dispose(scene: &mut dyn Gfx, method: DisposalMethod, background: Option<Color>) {
    match method {
        DisposalMethod::RestoreToBackgroundColor => {
            let color = background.unwrap_or_else(|| {
                warn!("background color is not in a global color table, using black");
                Color::BLACK
            });
            let (width, height) = (scene.width(), scene.height());
            scene.fill_rect(0, 0, width, height, color);
        }
        DisposalMethod::RestoreToPrevious => {
            trace!("restore to previous is not supported, keeping the scene");
        }
        DisposalMethod::Unspecified | DisposalMethod::DoNotDispose => {}
    }
}
