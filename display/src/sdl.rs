use sdl2::event::Event;
use sdl2::keyboard::Keycode;
use sdl2::pixels::PixelFormatEnum;

use chip8_core::Display;

use crate::frontend::{Frontend, FrontendError, FrontendEvent};
use crate::keymap::keymap;

fn sdl_error(e: impl ToString) -> FrontendError {
    FrontendError::Sdl(e.to_string())
}

/// # SDL frontend
/// The Chip-8 display is composed of 64x32 black/white pixels, each drawn as a
/// `scale`x`scale` square in a window.
pub struct SdlFrontend {
    canvas: sdl2::render::WindowCanvas,
    events: sdl2::EventPump,
    width: u32,
    height: u32,
}

impl SdlFrontend {
    /// Opens a window sized for the Chip-8 display.
    ///
    /// # Arguments
    /// * `width` the horizontal size of the display measured in pixels
    /// * `height` the vertical size of the display measured in pixels
    /// * `scale` the size multiplier for each pixel
    pub fn new(width: u32, height: u32, scale: u32) -> Result<Self, FrontendError> {
        let sdl = sdl2::init().map_err(sdl_error)?;
        let video_subsystem = sdl.video().map_err(sdl_error)?;
        let window = video_subsystem
            .window("Chip-8", width * scale, height * scale)
            .position_centered()
            .opengl()
            .build()
            .map_err(sdl_error)?;
        let canvas = window.into_canvas().build().map_err(sdl_error)?;
        let events = sdl.event_pump().map_err(sdl_error)?;

        Ok(SdlFrontend {
            canvas,
            events,
            width,
            height,
        })
    }

    /// Formats a Chip-8 display for rendering as an SDL2 texture.
    ///
    /// An SDL2 texture is a 1D array of ints that represent concatenated rows of RGB pixels.
    ///
    /// This creates a black and white rendering by:
    /// - Flattening the 2D display into a 1D array by concatenating its rows
    /// - Triplicating each element of that 1D array to represent the RGB values of each pixel
    /// - Mapping each value from a binary state to 0-255 intensity
    fn frame_to_sdl_texture(display: &Display) -> Vec<u8> {
        display
            .rows()
            .flat_map(|row| row.iter())
            .flat_map(|on| std::iter::repeat(if *on { 255 } else { 0 }).take(3))
            .collect()
    }

    fn translate(key: Keycode, down: bool) -> Option<FrontendEvent> {
        if key == Keycode::Escape {
            return Some(FrontendEvent::Quit);
        }
        if key == Keycode::Space {
            return Some(FrontendEvent::FastForward(down));
        }
        if key == Keycode::Backspace {
            return Some(FrontendEvent::Rewind(down));
        }

        // Keycode names of letters and digits are a single character
        let name = key.name();
        let mut chars = name.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => keymap(c).map(|k| {
                if down {
                    FrontendEvent::KeyDown(k)
                } else {
                    FrontendEvent::KeyUp(k)
                }
            }),
            _ => None,
        }
    }
}

impl Frontend for SdlFrontend {
    /// Formats the Chip-8 display as an SDL2 RGB24 texture and renders it.
    fn render(&mut self, display: &Display) -> Result<(), FrontendError> {
        let texture_creator = self.canvas.texture_creator();

        let mut texture = texture_creator
            .create_texture_streaming(PixelFormatEnum::RGB24, self.width, self.height)
            .map_err(sdl_error)?;

        let frame = SdlFrontend::frame_to_sdl_texture(display);
        texture
            .with_lock(None, |buffer: &mut [u8], _pitch: usize| {
                buffer.copy_from_slice(&frame);
            })
            .map_err(sdl_error)?;

        self.canvas.copy(&texture, None, None).map_err(sdl_error)?;
        self.canvas.present();
        Ok(())
    }

    fn poll_events(&mut self) -> Result<Vec<FrontendEvent>, FrontendError> {
        let events = self
            .events
            .poll_iter()
            .filter_map(|event| match event {
                Event::Quit { .. } => Some(FrontendEvent::Quit),
                Event::KeyDown {
                    keycode: Some(key),
                    repeat: false,
                    ..
                } => SdlFrontend::translate(key, true),
                Event::KeyUp {
                    keycode: Some(key), ..
                } => SdlFrontend::translate(key, false),
                _ => None,
            })
            .collect();
        Ok(events)
    }
}
