use std::fmt;

/// # Opcodes
///
/// Chip-8 opcodes are 16 bits each, stored big-endian as a `high` and a `low` byte.
/// Their behavior is cased on some combination of:
/// - `(n, _, _, _)` broad categorization; applies to all opcodes
/// - `(_, _, _, n)` specific behavior within a category
/// - `(_, _, n, n)` more specific behavior within a category
/// - `(_, n, n, n)` some fixed function that doesn't require variables (e.g. CLS; clear screen)
///
/// Nibbles not used to determine the operation often (but not always) carry important data.
/// - `(_, n, n, n)` represent a 12-bit address
/// - `(_, _, n, n)` encodes some data that is assigned to and/or compared with Vx
/// - `(_, n, _, _)` refers either to the register Vx or a range of registers V0..Vx
/// - `(_, _, n, _)` refers to the the register Vy
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Opcode {
    high: u8,
    low: u8,
}

impl Opcode {
    /// Builds an opcode from its two bytes in program order.
    pub const fn new(high: u8, low: u8) -> Self {
        Opcode { high, low }
    }

    /// The full 16-bit word.
    pub const fn word(&self) -> u16 {
        (self.high as u16) << 8 | self.low as u16
    }

    /// Returns the Opcode's component nibbles, most significant first.
    pub const fn nibbles(&self) -> (u8, u8, u8, u8) {
        (self.high >> 4, self.x(), self.y(), self.n())
    }

    /// The Opcode's second nibble.
    /// `[_x__]`
    pub const fn x(&self) -> u8 {
        self.high & 0x0F
    }

    /// The Opcode's third nibble.
    /// `[__y_]`
    pub const fn y(&self) -> u8 {
        self.low >> 4
    }

    /// The Opcode's fourth nibble.
    /// `[___n]`
    pub const fn n(&self) -> u8 {
        self.low & 0x0F
    }

    /// The Opcode's least significant byte.
    /// `[__kk]`
    pub const fn kk(&self) -> u8 {
        self.low
    }

    /// The Opcode without its most significant nibble.
    /// `[_adr]`
    pub const fn addr(&self) -> u16 {
        self.word() & 0x0FFF
    }
}

impl From<u16> for Opcode {
    fn from(word: u16) -> Self {
        let [high, low] = word.to_be_bytes();
        Opcode { high, low }
    }
}

impl From<Opcode> for u16 {
    fn from(op: Opcode) -> Self {
        op.word()
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02X}{:02X}", self.high, self.low)
    }
}
