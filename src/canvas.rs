//! Drawing surfaces the compositor writes into.

use crate::error::{GifError, Result};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

impl Color {
    pub const BLACK: Color = Color::new(0, 0, 0);

    pub const fn new(red: u8, green: u8, blue: u8) -> Self {
        Self { red, green, blue }
    }
}

/// Pixel surface. Writes outside of `width` x `height` are ignored.
pub trait Gfx {
    fn width(&self) -> u16;
    fn height(&self) -> u16;

    fn draw_pixel(&mut self, x: i32, y: i32, color: Color);

    fn fill_rect(&mut self, x: i32, y: i32, width: u16, height: u16, color: Color) {
        for y_pos in y..y.saturating_add(i32::from(height)) {
            for x_pos in x..x.saturating_add(i32::from(width)) {
                self.draw_pixel(x_pos, y_pos, color);
            }
        }
    }
}

/// Owned in-memory surface, used as the scene of a playback session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitmap {
    width: u16,
    height: u16,
    pixels: Vec<Color>,
}

impl Bitmap {
    /// Allocate a black bitmap, failing instead of aborting when memory is
    /// not available.
    pub fn try_new(width: u16, height: u16) -> Result<Self> {
        let len = usize::from(width) * usize::from(height);
        let mut pixels = Vec::new();
        pixels
            .try_reserve_exact(len)
            .map_err(|_| GifError::ImageTooBig { width, height })?;
        pixels.resize(len, Color::BLACK);

        Ok(Self { width, height, pixels })
    }

    pub fn get_color(&self, x: u16, y: u16) -> Option<Color> {
        if x < self.width && y < self.height {
            self.pixels.get(usize::from(y) * usize::from(self.width) + usize::from(x)).copied()
        } else {
            None
        }
    }

    pub fn pixels(&self) -> &[Color] {
        &self.pixels
    }

    /// Copy the whole bitmap into `gfx` with its top left corner at `(x, y)`.
    pub fn draw_to(&self, gfx: &mut dyn Gfx, x: i32, y: i32) {
        for (i, color) in self.pixels.iter().enumerate() {
            let x_pos = (i % usize::from(self.width)) as i32;
            let y_pos = (i / usize::from(self.width)) as i32;
            gfx.draw_pixel(x.saturating_add(x_pos), y.saturating_add(y_pos), *color);
        }
    }
}

impl Gfx for Bitmap {
    fn width(&self) -> u16 {
        self.width
    }

    fn height(&self) -> u16 {
        self.height
    }

    fn draw_pixel(&mut self, x: i32, y: i32, color: Color) {
        if x < 0 || y < 0 || x >= i32::from(self.width) || y >= i32::from(self.height) {
            return;
        }
        let idx = y as usize * usize::from(self.width) + x as usize;
        self.pixels[idx] = color;
    }

    fn fill_rect(&mut self, x: i32, y: i32, width: u16, height: u16, color: Color) {
        let x_start = x.clamp(0, i32::from(self.width)) as usize;
        let x_end = x.saturating_add(i32::from(width)).clamp(0, i32::from(self.width)) as usize;
        let y_start = y.clamp(0, i32::from(self.height)) as usize;
        let y_end = y.saturating_add(i32::from(height)).clamp(0, i32::from(self.height)) as usize;

        for row in y_start..y_end {
            let offset = row * usize::from(self.width);
            self.pixels[offset + x_start..offset + x_end].fill(color);
        }
    }
}

/// Clipped window into a parent surface.
///
/// Coordinates are relative to the window's top left corner; anything
/// outside the window or the parent is dropped.
pub struct Canvas<'a> {
    parent: &'a mut dyn Gfx,
    offset_x: i32,
    offset_y: i32,
    width: u16,
    height: u16,
}

impl<'a> Canvas<'a> {
    pub fn new(parent: &'a mut dyn Gfx, offset_x: i32, offset_y: i32, width: u16, height: u16) -> Self {
        Self {
            parent,
            offset_x,
            offset_y,
            width,
            height,
        }
    }

    pub fn parent_width(&self) -> u16 {
        self.parent.width()
    }

    pub fn parent_height(&self) -> u16 {
        self.parent.height()
    }
}

impl Gfx for Canvas<'_> {
    fn width(&self) -> u16 {
        self.width
    }

    fn height(&self) -> u16 {
        self.height
    }

    fn draw_pixel(&mut self, x: i32, y: i32, color: Color) {
        if x < 0 || y < 0 || x >= i32::from(self.width) || y >= i32::from(self.height) {
            return;
        }
        self.parent
            .draw_pixel(self.offset_x.saturating_add(x), self.offset_y.saturating_add(y), color);
    }

    fn fill_rect(&mut self, x: i32, y: i32, width: u16, height: u16, color: Color) {
        let x_start = x.max(0);
        let y_start = y.max(0);
        let x_end = x.saturating_add(i32::from(width)).min(i32::from(self.width));
        let y_end = y.saturating_add(i32::from(height)).min(i32::from(self.height));
        if x_start >= x_end || y_start >= y_end {
            return;
        }

        self.parent.fill_rect(
            self.offset_x.saturating_add(x_start),
            self.offset_y.saturating_add(y_start),
            (x_end - x_start) as u16,
            (y_end - y_start) as u16,
            color,
        );
    }
}
