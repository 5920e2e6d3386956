use std::io;

use chip8_core::Display;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FrontendError {
    #[error("terminal error: {0}")]
    Io(#[from] io::Error),

    #[error("sdl error: {0}")]
    Sdl(String),
}

/// Something the user did that the emulator loop should react to
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FrontendEvent {
    Quit,
    /// A keypad key (0x0..=0xF) went down
    KeyDown(u8),
    /// A keypad key (0x0..=0xF) went up
    KeyUp(u8),
    /// Whether the default clock speed should be ignored
    FastForward(bool),
    /// Whether the machine's state should be cycled backwards
    Rewind(bool),
}

/// # Frontend
/// Presents the Chip-8 display to the user and collects their input.
///
/// The interpreter knows nothing about frontends; the run loop hands the display over
/// whenever it changed and feeds the returned events into the keypad.
pub trait Frontend {
    /// Draws the current contents of the display
    fn render(&mut self, display: &Display) -> Result<(), FrontendError>;

    /// Returns everything that happened since the last call, without blocking
    fn poll_events(&mut self) -> Result<Vec<FrontendEvent>, FrontendError>;

    /// Starts or stops the tone played while the sound timer is running
    fn set_tone(&mut self, _active: bool) -> Result<(), FrontendError> {
        Ok(())
    }
}
