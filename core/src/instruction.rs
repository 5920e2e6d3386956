use std::convert::TryFrom;
use std::fmt;

use crate::error::DecodeError;
use crate::opcode::Opcode;

/// One decoded Chip-8 instruction with its operands.
///
/// `x` and `y` are register indices, `kk` an immediate byte, `addr` a 12-bit address
/// and `n` the 4-bit sprite height.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Instruction {
    /// clear
    Cls,
    /// PC = STACK.pop()
    Ret,
    /// PC = addr
    Jump { addr: u16 },
    /// STACK.push(PC); PC = addr
    Call { addr: u16 },
    /// if Vx == kk then skip
    SkipEqByte { x: u8, kk: u8 },
    /// if Vx != kk then skip
    SkipNeByte { x: u8, kk: u8 },
    /// if Vx == Vy then skip
    SkipEqReg { x: u8, y: u8 },
    /// Vx = kk
    LoadByte { x: u8, kk: u8 },
    /// Vx += kk
    AddByte { x: u8, kk: u8 },
    /// Vx = Vy
    Move { x: u8, y: u8 },
    /// Vx |= Vy
    Or { x: u8, y: u8 },
    /// Vx &= Vy
    And { x: u8, y: u8 },
    /// Vx ^= Vy
    Xor { x: u8, y: u8 },
    /// Vx += Vy; VF = carry
    AddReg { x: u8, y: u8 },
    /// Vx -= Vy; VF = !borrow
    Sub { x: u8, y: u8 },
    /// Vx >>= 1; VF = lsb
    ShiftRight { x: u8 },
    /// Vx = Vy - Vx; VF = !borrow
    SubN { x: u8, y: u8 },
    /// Vx <<= 1; VF = msb
    ShiftLeft { x: u8 },
    /// if Vx != Vy then skip
    SkipNeReg { x: u8, y: u8 },
    /// I = addr
    LoadIndex { addr: u16 },
    /// PC = V0 + addr
    JumpOffset { addr: u16 },
    /// Vx = rand_byte & kk
    Random { x: u8, kk: u8 },
    /// draw_sprite(x=Vx y=Vy size=n)
    Draw { x: u8, y: u8, n: u8 },
    /// if Vx.pressed then skip
    SkipKeyPressed { x: u8 },
    /// if !Vx.pressed then skip
    SkipKeyReleased { x: u8 },
    /// Vx = DT
    LoadDelay { x: u8 },
    /// await keypress for Vx
    WaitKey { x: u8 },
    /// DT = Vx
    SetDelay { x: u8 },
    /// ST = Vx
    SetSound { x: u8 },
    /// I += Vx
    AddIndex { x: u8 },
    /// I = Vx * 5
    LoadGlyph { x: u8 },
    /// mem[I..I+3] = bcd(Vx)
    StoreBcd { x: u8 },
    /// mem[I..=I+x] = V0..=Vx
    StoreRegisters { x: u8 },
    /// V0..=Vx = mem[I..=I+x]
    LoadRegisters { x: u8 },
}

impl Instruction {
    /// Selects the correct Instruction for a given Opcode
    pub fn decode(op: Opcode) -> Result<Self, DecodeError> {
        use Instruction::*;

        let (x, y, n, kk, addr) = (op.x(), op.y(), op.n(), op.kk(), op.addr());
        let instruction = match op.nibbles() {
            (0x0, 0x0, 0xE, 0x0) => Cls,
            (0x0, 0x0, 0xE, 0xE) => Ret,
            (0x1, ..) => Jump { addr },
            (0x2, ..) => Call { addr },
            (0x3, ..) => SkipEqByte { x, kk },
            (0x4, ..) => SkipNeByte { x, kk },
            (0x5, .., 0x0) => SkipEqReg { x, y },
            (0x6, ..) => LoadByte { x, kk },
            (0x7, ..) => AddByte { x, kk },
            (0x8, .., 0x0) => Move { x, y },
            (0x8, .., 0x1) => Or { x, y },
            (0x8, .., 0x2) => And { x, y },
            (0x8, .., 0x3) => Xor { x, y },
            (0x8, .., 0x4) => AddReg { x, y },
            (0x8, .., 0x5) => Sub { x, y },
            (0x8, .., 0x6) => ShiftRight { x },
            (0x8, .., 0x7) => SubN { x, y },
            (0x8, .., 0xE) => ShiftLeft { x },
            (0x9, .., 0x0) => SkipNeReg { x, y },
            (0xA, ..) => LoadIndex { addr },
            (0xB, ..) => JumpOffset { addr },
            (0xC, ..) => Random { x, kk },
            (0xD, ..) => Draw { x, y, n },
            (0xE, _, 0x9, 0xE) => SkipKeyPressed { x },
            (0xE, _, 0xA, 0x1) => SkipKeyReleased { x },
            (0xF, _, 0x0, 0x7) => LoadDelay { x },
            (0xF, _, 0x0, 0xA) => WaitKey { x },
            (0xF, _, 0x1, 0x5) => SetDelay { x },
            (0xF, _, 0x1, 0x8) => SetSound { x },
            (0xF, _, 0x1, 0xE) => AddIndex { x },
            (0xF, _, 0x2, 0x9) => LoadGlyph { x },
            (0xF, _, 0x3, 0x3) => StoreBcd { x },
            (0xF, _, 0x5, 0x5) => StoreRegisters { x },
            (0xF, _, 0x6, 0x5) => LoadRegisters { x },
            _ => return Err(DecodeError::UnknownOpcode(op)),
        };
        Ok(instruction)
    }

    /// Whether executing this instruction sets the PC itself.
    pub fn is_control_transfer(&self) -> bool {
        matches!(
            self,
            Instruction::Ret
                | Instruction::Jump { .. }
                | Instruction::Call { .. }
                | Instruction::JumpOffset { .. }
        )
    }
}

impl TryFrom<Opcode> for Instruction {
    type Error = DecodeError;

    fn try_from(op: Opcode) -> Result<Self, Self::Error> {
        Instruction::decode(op)
    }
}

/// Conventional assembler mnemonics, as used in disassembly listings.
impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Instruction::*;

        match *self {
            Cls => write!(f, "CLS"),
            Ret => write!(f, "RET"),
            Jump { addr } => write!(f, "JP {:#05X}", addr),
            Call { addr } => write!(f, "CALL {:#05X}", addr),
            SkipEqByte { x, kk } => write!(f, "SE V{:X}, {:#04X}", x, kk),
            SkipNeByte { x, kk } => write!(f, "SNE V{:X}, {:#04X}", x, kk),
            SkipEqReg { x, y } => write!(f, "SE V{:X}, V{:X}", x, y),
            LoadByte { x, kk } => write!(f, "LD V{:X}, {:#04X}", x, kk),
            AddByte { x, kk } => write!(f, "ADD V{:X}, {:#04X}", x, kk),
            Move { x, y } => write!(f, "LD V{:X}, V{:X}", x, y),
            Or { x, y } => write!(f, "OR V{:X}, V{:X}", x, y),
            And { x, y } => write!(f, "AND V{:X}, V{:X}", x, y),
            Xor { x, y } => write!(f, "XOR V{:X}, V{:X}", x, y),
            AddReg { x, y } => write!(f, "ADD V{:X}, V{:X}", x, y),
            Sub { x, y } => write!(f, "SUB V{:X}, V{:X}", x, y),
            ShiftRight { x } => write!(f, "SHR V{:X}", x),
            SubN { x, y } => write!(f, "SUBN V{:X}, V{:X}", x, y),
            ShiftLeft { x } => write!(f, "SHL V{:X}", x),
            SkipNeReg { x, y } => write!(f, "SNE V{:X}, V{:X}", x, y),
            LoadIndex { addr } => write!(f, "LD I, {:#05X}", addr),
            JumpOffset { addr } => write!(f, "JP V0, {:#05X}", addr),
            Random { x, kk } => write!(f, "RND V{:X}, {:#04X}", x, kk),
            Draw { x, y, n } => write!(f, "DRW V{:X}, V{:X}, {}", x, y, n),
            SkipKeyPressed { x } => write!(f, "SKP V{:X}", x),
            SkipKeyReleased { x } => write!(f, "SKNP V{:X}", x),
            LoadDelay { x } => write!(f, "LD V{:X}, DT", x),
            WaitKey { x } => write!(f, "LD V{:X}, K", x),
            SetDelay { x } => write!(f, "LD DT, V{:X}", x),
            SetSound { x } => write!(f, "LD ST, V{:X}", x),
            AddIndex { x } => write!(f, "ADD I, V{:X}", x),
            LoadGlyph { x } => write!(f, "LD F, V{:X}", x),
            StoreBcd { x } => write!(f, "LD B, V{:X}", x),
            StoreRegisters { x } => write!(f, "LD [I], V{:X}", x),
            LoadRegisters { x } => write!(f, "LD V{:X}, [I]", x),
        }
    }
}
