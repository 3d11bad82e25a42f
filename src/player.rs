//! Non-blocking GIF playback.
//!
//! `GifPlayer::play` is meant to be called from a render loop: it returns
//! right away while the current frame's delay is running and otherwise
//! decodes up to the next frame of the animation.

use std::path::Path;

use log::{debug, info, warn};

use crate::canvas::{Bitmap, Gfx};
use crate::compositor;
use crate::error::{GifError, Result};
use crate::parser::{Block, Decoder, DisposalMethod, GraphicControlExtension};
use crate::stream::{self, ByteStream, LoadMode};
use crate::timer::{Clock, SimpleTimer, SystemClock};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayerConfig {
    /// Largest logical screen, in pixels, a session is opened for.
    pub max_pixels: usize,
    /// Also accept `GIF87a` headers.
    pub allow_gif87a: bool,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            max_pixels: 1 << 20,
            allow_gif87a: false,
        }
    }
}

/// Outcome of a single `play` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayState {
    /// At least one image was drawn and copied to the caller's surface.
    Frame,
    /// The current frame's delay has not elapsed yet.
    Waiting,
    /// Playback is over.
    Finished,
}

struct Session {
    decoder: Decoder,
    scene: Bitmap,
    // disposal of the last drawn image, applied before the next one
    pending_disposal: DisposalMethod,
    timer: SimpleTimer,
    finished: bool,
    trailer_found: bool,
    images_in_pass: usize,
}

impl Session {
    fn play<C: Clock>(&mut self, clock: &C, gfx: &mut dyn Gfx, x: i32, y: i32) -> Result<PlayState> {
        if self.finished {
            return Ok(PlayState::Finished);
        }

        if self.timer.is_running() {
            if !self.timer.is_timeout(clock.now()) {
                return Ok(PlayState::Waiting);
            }
            self.timer.stop();
        }

        let mut images_drawn = 0;
        loop {
            match self.decoder.next_block()? {
                Block::Extension => self.decoder.process_extension()?,
                Block::Image => {
                    let control = self.draw_next_image()?;
                    images_drawn += 1;

                    if self.decoder.animation().is_some() {
                        self.timer.start(clock.now(), control.delay());
                        break;
                    }
                }
                Block::Trailer => {
                    self.trailer_found = true;
                    if self.end_of_pass()? {
                        self.finished = true;
                        break;
                    }
                }
            }
        }

        if images_drawn == 0 {
            return Ok(PlayState::Finished);
        }

        self.scene.draw_to(gfx, x, y);
        Ok(PlayState::Frame)
    }

    fn draw_next_image(&mut self) -> Result<GraphicControlExtension> {
        let image = self.decoder.read_image_descriptor()?;
        let control = self.decoder.take_graphic_control();

        compositor::dispose(&mut self.scene, self.pending_disposal, self.decoder.background_color());
        self.decoder.decode_image(&image, &control, &mut self.scene)?;
        self.pending_disposal = control.disposal_method;
        self.images_in_pass += 1;

        debug!(
            "drew image {}x{} at ({}, {}), delay {:?}",
            image.width,
            image.height,
            image.left,
            image.top,
            control.delay()
        );

        Ok(control)
    }

    /// Handle the trailer, returns whether playback is over.
    fn end_of_pass(&mut self) -> Result<bool> {
        let images_shown = std::mem::take(&mut self.images_in_pass);

        let Some(animation) = self.decoder.animation_mut() else {
            info!("reached trailer, {images_shown} images drawn");
            return Ok(true);
        };

        if images_shown == 0 {
            warn!("animation pass without images, stopping playback");
            return Ok(true);
        }

        if animation.loop_count > 0 {
            animation.loop_count -= 1;
            if animation.loop_count == 0 {
                info!("last animation loop finished");
                return Ok(true);
            }
        }

        self.decoder.restart()?;
        Ok(false)
    }
}

/// Plays one GIF at a time onto a caller provided surface.
pub struct GifPlayer<C: Clock = SystemClock> {
    config: PlayerConfig,
    clock: C,
    session: Option<Session>,
}

impl Default for GifPlayer<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl GifPlayer<SystemClock> {
    pub fn new() -> Self {
        Self::with_config(PlayerConfig::default())
    }

    pub fn with_config(config: PlayerConfig) -> Self {
        Self::with_clock(config, SystemClock)
    }
}

impl<C: Clock> GifPlayer<C> {
    pub fn with_clock(config: PlayerConfig, clock: C) -> Self {
        Self {
            config,
            clock,
            session: None,
        }
    }

    /// Start a session on `stream`, parsing the header, logical screen
    /// descriptor and global color table.
    pub fn open<S: ByteStream + 'static>(&mut self, stream: S) -> Result<()> {
        self.open_boxed(Box::new(stream))
    }

    pub fn open_file<P: AsRef<Path>>(&mut self, path: P, mode: LoadMode) -> Result<()> {
        if self.session.is_some() {
            return Err(GifError::AlreadyOpen);
        }

        let stream = stream::open_file(&path, mode)?;
        info!("opening {} ({:?})", path.as_ref().display(), mode);
        self.open_boxed(stream)
    }

    fn open_boxed(&mut self, stream: Box<dyn ByteStream>) -> Result<()> {
        if self.session.is_some() {
            return Err(GifError::AlreadyOpen);
        }

        let decoder = Decoder::open(stream, self.config.allow_gif87a)?;
        let screen = *decoder.screen();
        let (width, height) = (screen.screen_width, screen.screen_height);
        if usize::from(width) * usize::from(height) > self.config.max_pixels {
            warn!(
                "gif of {width}x{height} pixels exceeds the limit of {} pixels",
                self.config.max_pixels
            );
            return Err(GifError::ImageTooBig { width, height });
        }
        let scene = Bitmap::try_new(width, height)?;

        info!("opened gif of {width}x{height} pixels");
        self.session = Some(Session {
            decoder,
            scene,
            pending_disposal: DisposalMethod::Unspecified,
            timer: SimpleTimer::default(),
            finished: false,
            trailer_found: false,
            images_in_pass: 0,
        });

        Ok(())
    }

    /// Release the stream, color tables and scene. No-op when nothing is open.
    pub fn close(&mut self) {
        if self.session.take().is_some() {
            debug!("closed gif");
        }
    }

    /// Advance playback without blocking, drawing at the top left corner
    /// of `gfx`.
    ///
    /// Any error closes the session.
    pub fn play(&mut self, gfx: &mut dyn Gfx) -> Result<PlayState> {
        self.play_at(gfx, 0, 0)
    }

    /// Like `play`, with the GIF's top left corner placed at `(x, y)` of `gfx`.
    pub fn play_at(&mut self, gfx: &mut dyn Gfx, x: i32, y: i32) -> Result<PlayState> {
        let session = self.session.as_mut().ok_or(GifError::NotOpen)?;

        let result = session.play(&self.clock, gfx, x, y);
        if let Err(err) = &result {
            warn!("playback failed, closing gif: {err}");
            self.session = None;
        }

        result
    }

    /// Copy the last composited frame to `gfx` again.
    pub fn draw(&self, gfx: &mut dyn Gfx) -> Result<()> {
        self.draw_at(gfx, 0, 0)
    }

    pub fn draw_at(&self, gfx: &mut dyn Gfx, x: i32, y: i32) -> Result<()> {
        let session = self.session.as_ref().ok_or(GifError::NotOpen)?;
        session.scene.draw_to(gfx, x, y);
        Ok(())
    }

    pub fn is_open(&self) -> bool {
        self.session.is_some()
    }

    pub fn is_finished(&self) -> bool {
        self.session.as_ref().is_some_and(|session| session.finished)
    }

    /// Whether the trailer was reached at least once.
    pub fn is_trailer_found(&self) -> bool {
        self.session.as_ref().is_some_and(|session| session.trailer_found)
    }

    pub fn width(&self) -> Option<u16> {
        self.session.as_ref().map(|session| session.scene.width())
    }

    pub fn height(&self) -> Option<u16> {
        self.session.as_ref().map(|session| session.scene.height())
    }

    pub fn stream_position(&mut self) -> Result<u64> {
        let session = self.session.as_mut().ok_or(GifError::NotOpen)?;
        session.decoder.position()
    }
}
