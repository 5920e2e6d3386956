use std::io;

use thiserror::Error;

use crate::opcode::Opcode;

/// An opcode that isn't part of the instruction set
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    #[error("unknown opcode {0}")]
    UnknownOpcode(Opcode),
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyError {
    #[error("key {0:#X} is not on the keypad")]
    OutOfRange(u8),
}

/// Everything that can stop the machine in the middle of a cycle
///
/// Only `Decode` is something a caller may reasonably step over; the other
/// variants mean the program (or the interpreter) is broken.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MachineError {
    #[error("{error} at {pc:#05X}")]
    Decode { error: DecodeError, pc: u16 },

    #[error("stack overflow: more than 16 nested calls at {pc:#05X}")]
    StackOverflow { pc: u16 },

    #[error("stack underflow: return without a call at {pc:#05X}")]
    StackUnderflow { pc: u16 },

    #[error("address {address:#X} is out of bounds at {pc:#05X}")]
    AddressOutOfBounds { address: usize, pc: u16 },

    #[error("write to the font region at {address:#05X} from {pc:#05X}")]
    ProtectedWrite { address: usize, pc: u16 },

    #[error("register value {key:#X} is not a key at {pc:#05X}")]
    InvalidKey { key: u8, pc: u16 },
}

impl MachineError {
    /// Whether this is the recoverable "unknown opcode" signal rather than a fault.
    pub fn is_decode_failure(&self) -> bool {
        matches!(self, MachineError::Decode { .. })
    }
}

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("program is {len} bytes but only {max} fit in memory")]
    TooLarge { len: usize, max: usize },

    #[error("could not read program: {0}")]
    Io(#[from] io::Error),
}
