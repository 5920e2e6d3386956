pub use frontend::{Frontend, FrontendError, FrontendEvent};
pub use keymap::keymap;
#[cfg(feature = "sdl")]
pub use sdl::SdlFrontend;
pub use terminal::TerminalFrontend;

mod frontend;
mod keymap;
#[cfg(feature = "sdl")]
mod sdl;
mod terminal;
