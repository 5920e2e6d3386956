pub use constants::{CLOCK_SPEED, DISPLAY_HEIGHT, DISPLAY_WIDTH, KEY_COUNT};
pub use display::Display;
pub use error::{DecodeError, KeyError, LoadError, MachineError};
pub use history::History;
pub use instruction::Instruction;
pub use keypad::Keypad;
pub use machine::{Machine, Step};
pub use opcode::Opcode;
pub use rom::{Disassembly, Rom, Word};
pub use timer::Timers;

pub mod constants;
mod display;
mod error;
mod history;
mod instruction;
mod keypad;
mod machine;
mod opcode;
mod rom;
mod timer;
