use std::fmt;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use tracing::debug;

use crate::constants::{MAX_ROM_SIZE, PROGRAM_START};
use crate::error::{DecodeError, LoadError};
use crate::instruction::Instruction;
use crate::opcode::Opcode;

/// # ROM
/// A Chip-8 program image, checked to fit in memory above 0x200.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Rom {
    bytes: Vec<u8>,
}

impl Rom {
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, LoadError> {
        if bytes.len() > MAX_ROM_SIZE {
            return Err(LoadError::TooLarge {
                len: bytes.len(),
                max: MAX_ROM_SIZE,
            });
        }
        Ok(Rom { bytes })
    }

    /// Load a rom from a source file
    ///
    /// # Arguments
    /// * `reader` a file reader that contains a ROM
    pub fn from_reader(reader: impl Read) -> Result<Self, LoadError> {
        let mut bytes = Vec::new();
        // Read one byte past the limit so oversized images are caught without reading them whole
        reader
            .take(MAX_ROM_SIZE as u64 + 1)
            .read_to_end(&mut bytes)?;
        Self::from_bytes(bytes)
    }

    pub fn open(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let rom = Self::from_reader(BufReader::new(File::open(path)?))?;
        debug!(path = %path.display(), len = rom.len(), "read rom");
        Ok(rom)
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Decodes every 2-byte word of the program without running anything.
    ///
    /// Data mixed in with code will show up as unknown or nonsensical instructions.
    pub fn disassemble(&self) -> impl Iterator<Item = Disassembly> + '_ {
        let words = self.bytes.chunks_exact(2);
        let trailing = words.remainder().first().map(|&byte| Disassembly {
            address: (PROGRAM_START + self.bytes.len() - 1) as u16,
            word: Word::Byte(byte),
        });

        words
            .enumerate()
            .map(|(index, word)| {
                let opcode = Opcode::new(word[0], word[1]);
                Disassembly {
                    address: (PROGRAM_START + index * 2) as u16,
                    word: Word::Opcode(opcode, Instruction::decode(opcode)),
                }
            })
            .chain(trailing)
    }
}

/// One line of a disassembly listing
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Disassembly {
    pub address: u16,
    pub word: Word,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Word {
    Opcode(Opcode, Result<Instruction, DecodeError>),
    /// A trailing odd byte at the end of the program
    Byte(u8),
}

impl fmt::Display for Disassembly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.word {
            Word::Opcode(op, Ok(instruction)) => {
                write!(f, "{:#05X}  {}  {}", self.address, op, instruction)
            }
            Word::Opcode(op, Err(_)) => write!(f, "{:#05X}  {}  ???", self.address, op),
            Word::Byte(byte) => write!(f, "{:#05X}  {:02X}    DB {:#04X}", self.address, byte, byte),
        }
    }
}
