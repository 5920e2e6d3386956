use std::fmt;
use std::ops::Range;
use std::time::Instant;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, trace};

use crate::constants::{
    FONT_END, FONT_SET, FONT_START, GLYPH_SIZE, KEY_COUNT, MAX_ROM_SIZE, MEMORY_SIZE,
    PROGRAM_START, REGISTER_COUNT, STACK_DEPTH,
};
use crate::display::Display;
use crate::error::{KeyError, LoadError, MachineError};
use crate::instruction::Instruction;
use crate::keypad::Keypad;
use crate::opcode::Opcode;
use crate::timer::Timers;

type Result<T> = std::result::Result<T, MachineError>;

/// What a single call to `step` achieved
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Step {
    /// The instruction ran to completion
    Executed(Instruction),
    /// The machine is suspended on `LD Vx, K` until a new key goes down
    AwaitingKey,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Mode {
    Running,
    /// `held` are the keys that were already down, only a fresh press resumes execution
    AwaitingKey {
        register: u8,
        held: [bool; KEY_COUNT],
    },
}

/// # Chip-8
/// Chip-8 is a virtual machine and corresponding interpreted language.
///
/// ## CPU
/// Registers
/// - (v) 16 primary 8-bit registers (V0..VF)
///     - the first 15 (V0..VE) are general purpose registers
///     - the 16th (VF) is the carry flag
/// - (i) a 16-bit memory address register
///
/// Counter
/// - (pc) a 16-bit program counter
///
/// Pointer
/// - (sp) the number of return addresses on the stack
///
/// Timers
/// - 2 8-bit timers (delay & sound) decremented at 60Hz
///
/// ## Memory
/// - 16 entry stack of return addresses
/// - 4096 bytes of addressable memory
///     - 0x000..0x050 holds the font and is read-only
///     - 0x200.. is where ROMs are loaded
/// - a 64x32 `Display`
///
/// ## Input
/// - a `Keypad` shared with whatever produces key presses
/// - execution halts on `LD Vx, K` until a key is pressed
#[derive(Clone)]
pub struct Machine {
    memory: [u8; MEMORY_SIZE],
    v: [u8; REGISTER_COUNT],
    i: u16,
    pc: u16,
    sp: usize,
    stack: [u16; STACK_DEPTH],
    timers: Timers,
    keypad: Keypad,
    display: Display,
    rng: StdRng,
    mode: Mode,
}

impl Machine {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// A machine whose `RND` instruction produces a reproducible sequence
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        let mut memory = [0; MEMORY_SIZE];
        memory[FONT_START..FONT_END].copy_from_slice(&FONT_SET);

        Machine {
            memory,
            v: [0; REGISTER_COUNT],
            i: 0,
            pc: PROGRAM_START as u16,
            sp: 0,
            stack: [0; STACK_DEPTH],
            timers: Timers::new(Instant::now()),
            keypad: Keypad::new(),
            display: Display::new(),
            rng,
            mode: Mode::Running,
        }
    }

    /// Copies a program into memory at 0x200
    ///
    /// Memory is left untouched if the program doesn't fit.
    pub fn load(&mut self, program: &[u8]) -> std::result::Result<(), LoadError> {
        if program.len() > MAX_ROM_SIZE {
            return Err(LoadError::TooLarge {
                len: program.len(),
                max: MAX_ROM_SIZE,
            });
        }
        self.memory[PROGRAM_START..PROGRAM_START + program.len()].copy_from_slice(program);
        debug!(len = program.len(), "loaded program");
        Ok(())
    }

    /// Advances the machine by a single cycle using the current time for the timers
    pub fn step(&mut self) -> Result<Step> {
        self.step_at(Instant::now())
    }

    /// Advances the machine by a single cycle
    /// - resumes a pending `LD Vx, K` if a new key went down, otherwise
    /// - fetches, decodes and executes the opcode at the pc
    /// - then ticks the timers if a 60th of a second passed since they last ticked
    ///
    /// An unknown opcode is skipped over (the pc moves on by 2) and reported as
    /// `MachineError::Decode`. Any other error leaves the machine as it was
    /// before the faulting instruction.
    pub fn step_at(&mut self, now: Instant) -> Result<Step> {
        let step = match self.mode {
            Mode::AwaitingKey { register, held } => Ok(self.poll_key(register, held)),
            Mode::Running => self.cycle(),
        };
        self.timers.tick(now);
        step
    }

    fn cycle(&mut self) -> Result<Step> {
        let pc = self.pc;
        let op = self.fetch()?;
        let instruction = match Instruction::decode(op) {
            Ok(instruction) => instruction,
            Err(error) => {
                self.pc += 0x2;
                return Err(MachineError::Decode { error, pc });
            }
        };
        trace!(
            "{:#05X} {} {:<16} v{:02X?} i{:#05X}",
            pc,
            op,
            instruction.to_string(),
            self.v,
            self.i
        );

        self.execute(instruction)?;
        Ok(match self.mode {
            Mode::Running => Step::Executed(instruction),
            Mode::AwaitingKey { .. } => Step::AwaitingKey,
        })
    }

    /// Gets the opcode currently pointed at by the pc.
    /// Memory is stored as bytes, but opcodes are 16 bits so we combine two subsequent bytes.
    fn fetch(&self) -> Result<Opcode> {
        let at = self.readable(self.pc as usize, 2)?;
        Ok(Opcode::new(self.memory[at.start], self.memory[at.start + 1]))
    }

    fn execute(&mut self, instruction: Instruction) -> Result<()> {
        use Instruction::*;

        let pc = self.pc;
        match instruction {
            Cls => self.display.clear(),
            Ret => {
                if self.sp == 0 {
                    return Err(MachineError::StackUnderflow { pc });
                }
                self.sp -= 1;
                self.pc = self.stack[self.sp];
            }
            Jump { addr } => self.pc = addr,
            Call { addr } => {
                if self.sp == STACK_DEPTH {
                    return Err(MachineError::StackOverflow { pc });
                }
                self.stack[self.sp] = pc + 0x2;
                self.sp += 1;
                self.pc = addr;
            }
            SkipEqByte { x, kk } => self.skip_if(self.v[x as usize] == kk),
            SkipNeByte { x, kk } => self.skip_if(self.v[x as usize] != kk),
            SkipEqReg { x, y } => self.skip_if(self.v[x as usize] == self.v[y as usize]),
            LoadByte { x, kk } => self.v[x as usize] = kk,
            // No carry, overflow is dropped
            AddByte { x, kk } => self.v[x as usize] = self.v[x as usize].wrapping_add(kk),
            Move { x, y } => self.v[x as usize] = self.v[y as usize],
            Or { x, y } => self.logic(x, y, |a, b| a | b),
            And { x, y } => self.logic(x, y, |a, b| a & b),
            Xor { x, y } => self.logic(x, y, |a, b| a ^ b),
            AddReg { x, y } => {
                let (res, carry) = self.v[x as usize].overflowing_add(self.v[y as usize]);
                self.set_with_flag(x, res, carry);
            }
            Sub { x, y } => {
                let (res, borrow) = self.v[x as usize].overflowing_sub(self.v[y as usize]);
                self.set_with_flag(x, res, !borrow);
            }
            SubN { x, y } => {
                let (res, borrow) = self.v[y as usize].overflowing_sub(self.v[x as usize]);
                self.set_with_flag(x, res, !borrow);
            }
            ShiftRight { x } => {
                let vx = self.v[x as usize];
                self.set_with_flag(x, vx >> 1, vx & 0x1 == 0x1);
            }
            ShiftLeft { x } => {
                let vx = self.v[x as usize];
                self.set_with_flag(x, vx << 1, vx & 0x80 == 0x80);
            }
            SkipNeReg { x, y } => self.skip_if(self.v[x as usize] != self.v[y as usize]),
            LoadIndex { addr } => self.i = addr,
            JumpOffset { addr } => {
                let target = u16::from(self.v[0x0]) + addr;
                self.readable(target as usize, 2)?;
                self.pc = target;
            }
            Random { x, kk } => self.v[x as usize] = self.rng.gen::<u8>() & kk,
            Draw { x, y, n } => self.draw(x, y, n)?,
            SkipKeyPressed { x } => {
                let pressed = self.key(x)?;
                self.skip_if(pressed);
            }
            SkipKeyReleased { x } => {
                let pressed = self.key(x)?;
                self.skip_if(!pressed);
            }
            LoadDelay { x } => self.v[x as usize] = self.timers.delay,
            WaitKey { x } => {
                let held = self.keypad.snapshot();
                debug!(register = x, "waiting for a key press");
                self.mode = Mode::AwaitingKey { register: x, held };
            }
            SetDelay { x } => self.timers.delay = self.v[x as usize],
            SetSound { x } => self.timers.sound = self.v[x as usize],
            AddIndex { x } => {
                let i = self.i + u16::from(self.v[x as usize]);
                if i as usize >= MEMORY_SIZE {
                    return Err(MachineError::AddressOutOfBounds {
                        address: i as usize,
                        pc,
                    });
                }
                self.i = i;
            }
            LoadGlyph { x } => {
                self.i = (FONT_START + self.v[x as usize] as usize * GLYPH_SIZE) as u16;
            }
            StoreBcd { x } => {
                let vx = self.v[x as usize];
                let at = self.writable(self.i as usize, 3)?;
                self.memory[at].copy_from_slice(&[vx / 100, vx / 10 % 10, vx % 10]);
            }
            StoreRegisters { x } => {
                let count = x as usize + 1;
                let at = self.writable(self.i as usize, count)?;
                self.memory[at].copy_from_slice(&self.v[..count]);
            }
            LoadRegisters { x } => {
                let count = x as usize + 1;
                let at = self.readable(self.i as usize, count)?;
                self.v[..count].copy_from_slice(&self.memory[at]);
            }
        }

        // Control transfers already set the pc, and a pending key wait stays on its instruction
        if !instruction.is_control_transfer() && self.mode == Mode::Running {
            self.pc += 0x2;
        }
        Ok(())
    }

    /// Skipping moves the pc past the next instruction too
    fn skip_if(&mut self, condition: bool) {
        if condition {
            self.pc += 0x2;
        }
    }

    /// Vx = Vx op Vy; VF = 0
    fn logic(&mut self, x: u8, y: u8, op: impl Fn(u8, u8) -> u8) {
        self.v[x as usize] = op(self.v[x as usize], self.v[y as usize]);
        self.v[0xF] = 0x0;
    }

    /// The flag is written last so it survives when `x` is VF
    fn set_with_flag(&mut self, x: u8, value: u8, flag: bool) {
        self.v[x as usize] = value;
        self.v[0xF] = u8::from(flag);
    }

    /// draw_sprite(x=Vx y=Vy size=n)
    /// XORs a sprite from memory i..i+n at position Vx, Vy on the display with wrapping.
    /// Sets VF if any pixels were erased
    fn draw(&mut self, x: u8, y: u8, n: u8) -> Result<()> {
        let at = self.readable(self.i as usize, n as usize)?;
        let (px, py) = (self.v[x as usize] as usize, self.v[y as usize] as usize);

        // Reset the carry flag (used for collision detection)
        self.v[0xF] = 0x0;
        let erased = self.display.draw_sprite(&self.memory[at], px, py);
        self.v[0xF] = u8::from(erased);
        Ok(())
    }

    fn key(&self, x: u8) -> Result<bool> {
        let key = self.v[x as usize];
        self.keypad
            .is_pressed(key)
            .map_err(|_| MachineError::InvalidKey { key, pc: self.pc })
    }

    /// Completes a pending `LD Vx, K` once a key that wasn't already down is pressed.
    /// When several are, the lowest one wins.
    fn poll_key(&mut self, register: u8, held: [bool; KEY_COUNT]) -> Step {
        let keys = self.keypad.snapshot();
        match (0..KEY_COUNT).find(|&key| keys[key] && !held[key]) {
            Some(key) => {
                debug!(register, key, "key press received");
                self.v[register as usize] = key as u8;
                self.mode = Mode::Running;
                self.pc += 0x2;
                Step::Executed(Instruction::WaitKey { x: register })
            }
            None => {
                // A released key counts as new the next time it's pressed
                let mut still_held = held;
                for (was, down) in still_held.iter_mut().zip(keys) {
                    *was &= down;
                }
                self.mode = Mode::AwaitingKey {
                    register,
                    held: still_held,
                };
                Step::AwaitingKey
            }
        }
    }

    fn readable(&self, start: usize, len: usize) -> Result<Range<usize>> {
        let end = start + len;
        if end > MEMORY_SIZE {
            return Err(MachineError::AddressOutOfBounds {
                address: end - 1,
                pc: self.pc,
            });
        }
        Ok(start..end)
    }

    fn writable(&self, start: usize, len: usize) -> Result<Range<usize>> {
        let range = self.readable(start, len)?;
        if !range.is_empty() && range.start < FONT_END {
            return Err(MachineError::ProtectedWrite {
                address: range.start,
                pc: self.pc,
            });
        }
        Ok(range)
    }

    /// Puts an earlier snapshot back in place.
    /// The live keypad and timer reference are kept so that neither input nor wall-clock
    /// bookkeeping go back in time.
    pub(crate) fn restore(&mut self, snapshot: Machine) {
        let keypad = self.keypad.clone();
        let last_tick = self.timers.last_tick();

        *self = snapshot;
        self.keypad = keypad;
        self.timers.rebase(last_tick);
        self.display.mark_dirty();
    }

    /// Set or unset the pressed status of `key`
    pub fn set_key(&self, key: u8, pressed: bool) -> std::result::Result<(), KeyError> {
        self.keypad.set(key, pressed)
    }

    /// A handle onto the keypad for an input source to write to
    pub fn keypad(&self) -> Keypad {
        self.keypad.clone()
    }

    pub fn pc(&self) -> u16 {
        self.pc
    }

    pub fn i(&self) -> u16 {
        self.i
    }

    pub fn sp(&self) -> usize {
        self.sp
    }

    pub fn registers(&self) -> &[u8; REGISTER_COUNT] {
        &self.v
    }

    /// The return addresses currently on the stack, oldest first
    pub fn stack(&self) -> &[u16] {
        &self.stack[..self.sp]
    }

    pub fn memory(&self) -> &[u8; MEMORY_SIZE] {
        &self.memory
    }

    pub fn timers(&self) -> &Timers {
        &self.timers
    }

    pub fn delay_timer(&self) -> u8 {
        self.timers.delay
    }

    pub fn sound_timer(&self) -> u8 {
        self.timers.sound
    }

    pub fn display(&self) -> &Display {
        &self.display
    }

    /// Tells the machine a renderer has caught up with the display
    pub fn mark_display_clean(&mut self) {
        self.display.mark_clean();
    }

    pub fn is_awaiting_key(&self) -> bool {
        matches!(self.mode, Mode::AwaitingKey { .. })
    }
}

impl Default for Machine {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Machine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Machine")
            .field("pc", &format_args!("{:#05X}", self.pc))
            .field("i", &format_args!("{:#05X}", self.i))
            .field("v", &format_args!("{:02X?}", self.v))
            .field("stack", &format_args!("{:03X?}", self.stack()))
            .field("timers", &self.timers)
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::constants::{DISPLAY_WIDTH, TIMER_PERIOD};
    use crate::error::DecodeError;

    /// A machine with `program` loaded at 0x200
    fn machine(program: &[u16]) -> Machine {
        let bytes: Vec<u8> = program.iter().flat_map(|op| op.to_be_bytes()).collect();
        let mut machine = Machine::with_seed(0);
        machine.load(&bytes).unwrap();
        machine
    }

    /// Steps without letting any time pass for the timers
    fn step(machine: &mut Machine) -> Result<Step> {
        let now = machine.timers.last_tick();
        machine.step_at(now)
    }

    fn run(machine: &mut Machine, steps: usize) {
        for _ in 0..steps {
            step(machine).unwrap();
        }
    }

    #[test]
    fn test_starts_with_font_and_pc_at_program() {
        let machine = Machine::new();
        assert_eq!(machine.pc(), 0x200);
        assert_eq!(&machine.memory()[..80], &FONT_SET[..]);
        assert_eq!(machine.registers(), &[0; 16]);
        assert_eq!(machine.sp(), 0);
    }

    #[test]
    fn test_load_copies_to_0x200() {
        let mut machine = Machine::new();
        machine.load(&[0xAA, 0xBB]).unwrap();
        assert_eq!(&machine.memory()[0x200..0x202], &[0xAA, 0xBB]);
    }

    #[test]
    fn test_load_accepts_exactly_full_memory() {
        let mut machine = Machine::new();
        machine.load(&vec![0x1; MAX_ROM_SIZE]).unwrap();
        assert_eq!(machine.memory()[MEMORY_SIZE - 1], 0x1);
    }

    #[test]
    fn test_load_rejects_oversized_program() {
        let mut machine = Machine::new();
        let err = machine.load(&vec![0x1; MAX_ROM_SIZE + 1]).unwrap_err();
        assert!(matches!(err, LoadError::TooLarge { len, .. } if len == MAX_ROM_SIZE + 1));
        assert_eq!(machine.memory()[0x200], 0x0);
    }

    #[test]
    fn test_00e0_cls() {
        let mut machine = machine(&[0x00E0]);
        machine.display.set_pixel(0, 0, true);
        run(&mut machine, 1);
        assert!(!machine.display().pixel_at(0, 0));
        assert_eq!(machine.pc(), 0x202);
    }

    #[test]
    fn test_2nnn_call_and_00ee_ret() {
        let mut machine = machine(&[0x2206, 0x0000, 0x0000, 0x00EE]);
        assert_eq!(step(&mut machine), Ok(Step::Executed(Instruction::Call { addr: 0x206 })));
        assert_eq!(machine.pc(), 0x206);
        assert_eq!(machine.stack(), &[0x202]);

        run(&mut machine, 1);
        assert_eq!(machine.pc(), 0x202);
        assert_eq!(machine.sp(), 0);
    }

    #[test]
    fn test_00ee_underflow() {
        let mut machine = machine(&[0x00EE]);
        assert_eq!(
            step(&mut machine),
            Err(MachineError::StackUnderflow { pc: 0x200 })
        );
        assert_eq!(machine.pc(), 0x200);
    }

    #[test]
    fn test_2nnn_overflow() {
        // Calls itself forever
        let mut machine = machine(&[0x2200]);
        run(&mut machine, STACK_DEPTH);
        assert_eq!(machine.sp(), STACK_DEPTH);
        assert_eq!(
            step(&mut machine),
            Err(MachineError::StackOverflow { pc: 0x200 })
        );
        assert_eq!(machine.sp(), STACK_DEPTH);
    }

    #[test]
    fn test_1nnn_jp() {
        let mut machine = machine(&[0x1ABC]);
        run(&mut machine, 1);
        assert_eq!(machine.pc(), 0x0ABC);
    }

    #[test]
    fn test_3xkk_se_skips() {
        let mut machine = machine(&[0x6111, 0x3111]);
        run(&mut machine, 2);
        assert_eq!(machine.pc(), 0x0206);
    }

    #[test]
    fn test_3xkk_se_doesntskip() {
        let mut machine = machine(&[0x3111]);
        run(&mut machine, 1);
        assert_eq!(machine.pc(), 0x0202);
    }

    #[test]
    fn test_4xkk_sne_skips() {
        let mut machine = machine(&[0x4111]);
        run(&mut machine, 1);
        assert_eq!(machine.pc(), 0x0204);
    }

    #[test]
    fn test_4xkk_sne_doesntskip() {
        let mut machine = machine(&[0x6111, 0x4111]);
        run(&mut machine, 2);
        assert_eq!(machine.pc(), 0x0204);
    }

    #[test]
    fn test_5xy0_se_skips() {
        let mut machine = machine(&[0x6111, 0x6211, 0x5120]);
        run(&mut machine, 3);
        assert_eq!(machine.pc(), 0x0208);
    }

    #[test]
    fn test_5xy0_se_doesntskip() {
        let mut machine = machine(&[0x6111, 0x5120]);
        run(&mut machine, 2);
        assert_eq!(machine.pc(), 0x0204);
    }

    #[test]
    fn test_6xkk_ld() {
        let mut machine = machine(&[0x6122]);
        run(&mut machine, 1);
        assert_eq!(machine.registers()[0x1], 0x22);
    }

    #[test]
    fn test_7xkk_add_wraps_without_flag() {
        let mut machine = machine(&[0x61FF, 0x7102]);
        run(&mut machine, 2);
        assert_eq!(machine.registers()[0x1], 0x01);
        assert_eq!(machine.registers()[0xF], 0x0);
    }

    #[test]
    fn test_8xy0_ld() {
        let mut machine = machine(&[0x6201, 0x8120]);
        run(&mut machine, 2);
        assert_eq!(machine.registers()[0x1], 0x1);
    }

    #[test]
    fn test_8xy1_or_resets_vf() {
        let mut machine = machine(&[0x6106, 0x6203, 0x6F01, 0x8121]);
        run(&mut machine, 4);
        assert_eq!(machine.registers()[0x1], 0x7);
        assert_eq!(machine.registers()[0xF], 0x0);
    }

    #[test]
    fn test_8xy2_and() {
        let mut machine = machine(&[0x6106, 0x6203, 0x8122]);
        run(&mut machine, 3);
        assert_eq!(machine.registers()[0x1], 0x2);
    }

    #[test]
    fn test_8xy3_xor() {
        let mut machine = machine(&[0x6106, 0x6203, 0x8123]);
        run(&mut machine, 3);
        assert_eq!(machine.registers()[0x1], 0x5);
    }

    #[test]
    fn test_8xy4_add_nocarry() {
        let mut machine = machine(&[0x6101, 0x6201, 0x8124]);
        run(&mut machine, 3);
        assert_eq!(machine.registers()[0x1], 0x2);
        assert_eq!(machine.registers()[0xF], 0x0);
    }

    #[test]
    fn test_8xy4_add_carry() {
        let mut machine = machine(&[0x61FF, 0x6201, 0x8124]);
        run(&mut machine, 3);
        assert_eq!(machine.registers()[0x1], 0x0);
        assert_eq!(machine.registers()[0xF], 0x1);
    }

    #[test]
    fn test_8xy4_flag_wins_over_vf_result() {
        let mut machine = machine(&[0x6FFF, 0x6101, 0x8F14]);
        run(&mut machine, 3);
        assert_eq!(machine.registers()[0xF], 0x1);
    }

    #[test]
    fn test_8xy5_flag_wins_over_vf_result() {
        let mut machine = machine(&[0x6F03, 0x6201, 0x8F25]);
        run(&mut machine, 3);
        assert_eq!(machine.registers()[0xF], 0x1);
    }

    #[test]
    fn test_8xy5_sub_noborrow() {
        let mut machine = machine(&[0x6102, 0x6201, 0x8125]);
        run(&mut machine, 3);
        assert_eq!(machine.registers()[0x1], 0x1);
        assert_eq!(machine.registers()[0xF], 0x1);
    }

    #[test]
    fn test_8xy5_sub_borrow() {
        let mut machine = machine(&[0x6101, 0x6202, 0x8125]);
        run(&mut machine, 3);
        assert_eq!(machine.registers()[0x1], 0xFF);
        assert_eq!(machine.registers()[0xF], 0x0);
    }

    #[test]
    fn test_8xy6_shr_lsb() {
        let mut machine = machine(&[0x6105, 0x8106]);
        run(&mut machine, 2);
        assert_eq!(machine.registers()[0x1], 0x2);
        assert_eq!(machine.registers()[0xF], 0x1);
    }

    #[test]
    fn test_8xy6_shr_nolsb() {
        let mut machine = machine(&[0x6104, 0x8106]);
        run(&mut machine, 2);
        assert_eq!(machine.registers()[0x1], 0x2);
        assert_eq!(machine.registers()[0xF], 0x0);
    }

    #[test]
    fn test_8xy6_flag_wins_over_vf_result() {
        let mut machine = machine(&[0x6F02, 0x8F06]);
        run(&mut machine, 2);
        assert_eq!(machine.registers()[0xF], 0x0);
    }

    #[test]
    fn test_8xy7_subn_noborrow() {
        let mut machine = machine(&[0x6101, 0x6203, 0x8127]);
        run(&mut machine, 3);
        assert_eq!(machine.registers()[0x1], 0x2);
        assert_eq!(machine.registers()[0xF], 0x1);
    }

    #[test]
    fn test_8xy7_subn_borrow() {
        let mut machine = machine(&[0x6103, 0x6201, 0x8127]);
        run(&mut machine, 3);
        assert_eq!(machine.registers()[0x1], 0xFE);
        assert_eq!(machine.registers()[0xF], 0x0);
    }

    #[test]
    fn test_8xye_shl_msb() {
        let mut machine = machine(&[0x6181, 0x810E]);
        run(&mut machine, 2);
        assert_eq!(machine.registers()[0x1], 0x02);
        assert_eq!(machine.registers()[0xF], 0x1);
    }

    #[test]
    fn test_8xye_shl_nomsb() {
        let mut machine = machine(&[0x6141, 0x810E]);
        run(&mut machine, 2);
        assert_eq!(machine.registers()[0x1], 0x82);
        assert_eq!(machine.registers()[0xF], 0x0);
    }

    #[test]
    fn test_8xye_flag_wins_over_vf_result() {
        let mut machine = machine(&[0x6F81, 0x8F0E]);
        run(&mut machine, 2);
        assert_eq!(machine.registers()[0xF], 0x1);
    }

    #[test]
    fn test_8xy7_flag_wins_over_vf_result() {
        let mut machine = machine(&[0x6F01, 0x6203, 0x8F27]);
        run(&mut machine, 3);
        assert_eq!(machine.registers()[0xF], 0x1);
    }

    #[test]
    fn test_9xy0_sne_skips() {
        let mut machine = machine(&[0x6101, 0x9120]);
        run(&mut machine, 2);
        assert_eq!(machine.pc(), 0x0206);
    }

    #[test]
    fn test_9xy0_sne_doesntskip() {
        let mut machine = machine(&[0x9120]);
        run(&mut machine, 1);
        assert_eq!(machine.pc(), 0x0202);
    }

    #[test]
    fn test_annn_ld() {
        let mut machine = machine(&[0xAABC]);
        run(&mut machine, 1);
        assert_eq!(machine.i(), 0x0ABC);
    }

    #[test]
    fn test_bnnn_jp() {
        let mut machine = machine(&[0x6002, 0xB300]);
        run(&mut machine, 2);
        assert_eq!(machine.pc(), 0x0302);
    }

    #[test]
    fn test_bnnn_jp_out_of_memory() {
        let mut machine = machine(&[0x60FF, 0xBFFF]);
        run(&mut machine, 1);
        assert!(matches!(
            step(&mut machine),
            Err(MachineError::AddressOutOfBounds { pc: 0x202, .. })
        ));
        assert_eq!(machine.pc(), 0x202);
    }

    #[test]
    fn test_cxkk_rnd_is_masked() {
        let mut machine = machine(&[0xC100, 0xC20F]);
        run(&mut machine, 2);
        assert_eq!(machine.registers()[0x1], 0x0);
        assert_eq!(machine.registers()[0x2] & 0xF0, 0x0);
    }

    #[test]
    fn test_cxkk_rnd_is_reproducible_with_a_seed() {
        let program = [0xC1FF, 0xC2FF, 0xC3FF];
        let mut a = machine(&program);
        let mut b = machine(&program);
        run(&mut a, 3);
        run(&mut b, 3);
        assert_eq!(a.registers(), b.registers());
    }

    #[test]
    fn test_dxyn_drw_draws() {
        // Draw the "0" glyph at (1, 2)
        let mut machine = machine(&[0x6001, 0x6102, 0xA000, 0xD015]);
        run(&mut machine, 4);
        let display = machine.display();
        assert!(display.pixel_at(1, 2));
        assert!(display.pixel_at(4, 2));
        assert!(!display.pixel_at(2, 3));
        assert!(display.pixel_at(4, 6));
        assert_eq!(machine.registers()[0xF], 0x0);
    }

    #[test]
    fn test_dxyn_drw_collides() {
        let mut machine = machine(&[0xA000, 0xD015, 0xD015]);
        run(&mut machine, 3);
        assert_eq!(machine.registers()[0xF], 0x1);
        assert!(machine.display().rows().flatten().all(|on| !on));
    }

    #[test]
    fn test_dxyn_drw_resets_vf() {
        let mut machine = machine(&[0x6F01, 0x6010, 0xA000, 0xD001]);
        run(&mut machine, 4);
        assert_eq!(machine.registers()[0xF], 0x0);
    }

    #[test]
    fn test_dxyn_drw_wraps_coordinates() {
        let mut machine = machine(&[0x6000 | (DISPLAY_WIDTH as u16 - 1), 0xA000, 0xD011]);
        run(&mut machine, 3);
        // "0" glyph's top row is 0xF0
        assert!(machine.display().pixel_at(DISPLAY_WIDTH - 1, 0));
        assert!(machine.display().pixel_at(0, 0));
        assert!(machine.display().pixel_at(2, 0));
        assert!(!machine.display().pixel_at(3, 0));
    }

    #[test]
    fn test_dxyn_drw_reading_past_memory() {
        let mut machine = machine(&[0xAFFF, 0xD002]);
        run(&mut machine, 1);
        assert!(matches!(
            step(&mut machine),
            Err(MachineError::AddressOutOfBounds { address: 0x1000, .. })
        ));
    }

    #[test]
    fn test_ex9e_skp_skips() {
        let mut machine = machine(&[0x6105, 0xE19E]);
        machine.set_key(0x5, true).unwrap();
        run(&mut machine, 2);
        assert_eq!(machine.pc(), 0x0206);
    }

    #[test]
    fn test_ex9e_skp_doesntskip() {
        let mut machine = machine(&[0x6105, 0xE19E]);
        run(&mut machine, 2);
        assert_eq!(machine.pc(), 0x0204);
    }

    #[test]
    fn test_exa1_sknp_skips() {
        let mut machine = machine(&[0x6105, 0xE1A1]);
        run(&mut machine, 2);
        assert_eq!(machine.pc(), 0x0206);
    }

    #[test]
    fn test_exa1_sknp_doesntskip() {
        let mut machine = machine(&[0x6105, 0xE1A1]);
        machine.set_key(0x5, true).unwrap();
        run(&mut machine, 2);
        assert_eq!(machine.pc(), 0x0204);
    }

    #[test]
    fn test_ex9e_invalid_key() {
        let mut machine = machine(&[0x6110, 0xE19E]);
        run(&mut machine, 1);
        assert_eq!(
            step(&mut machine),
            Err(MachineError::InvalidKey { key: 0x10, pc: 0x202 })
        );
    }

    #[test]
    fn test_fx07_ld() {
        let mut machine = machine(&[0xF107]);
        machine.timers.delay = 0x42;
        run(&mut machine, 1);
        assert_eq!(machine.registers()[0x1], 0x42);
    }

    #[test]
    fn test_fx0a_waits_for_a_new_press() {
        let mut machine = machine(&[0xF10A, 0x6201]);
        assert_eq!(step(&mut machine), Ok(Step::AwaitingKey));
        assert!(machine.is_awaiting_key());
        assert_eq!(machine.pc(), 0x200);

        // Nothing happens until a key goes down
        assert_eq!(step(&mut machine), Ok(Step::AwaitingKey));
        assert_eq!(machine.pc(), 0x200);

        machine.set_key(0xE, true).unwrap();
        assert_eq!(
            step(&mut machine),
            Ok(Step::Executed(Instruction::WaitKey { x: 0x1 }))
        );
        assert_eq!(machine.registers()[0x1], 0xE);
        assert_eq!(machine.pc(), 0x202);
        assert!(!machine.is_awaiting_key());

        run(&mut machine, 1);
        assert_eq!(machine.registers()[0x2], 0x1);
    }

    #[test]
    fn test_fx0a_ignores_keys_held_before_the_wait() {
        let mut machine = machine(&[0xF10A]);
        machine.set_key(0x3, true).unwrap();
        run(&mut machine, 2);
        assert!(machine.is_awaiting_key());

        // Releasing and pressing again is a new press
        machine.set_key(0x3, false).unwrap();
        run(&mut machine, 1);
        machine.set_key(0x3, true).unwrap();
        run(&mut machine, 1);
        assert!(!machine.is_awaiting_key());
        assert_eq!(machine.registers()[0x1], 0x3);
    }

    #[test]
    fn test_fx0a_keeps_timers_running() {
        let mut machine = machine(&[0xF10A]);
        machine.timers.delay = 2;
        let start = machine.timers.last_tick();
        machine.step_at(start).unwrap();
        machine.step_at(start + TIMER_PERIOD).unwrap();
        assert_eq!(machine.delay_timer(), 1);
        assert!(machine.is_awaiting_key());
    }

    #[test]
    fn test_fx15_ld() {
        let mut machine = machine(&[0x6142, 0xF115]);
        run(&mut machine, 2);
        assert_eq!(machine.delay_timer(), 0x42);
    }

    #[test]
    fn test_fx18_ld() {
        let mut machine = machine(&[0x6142, 0xF118]);
        run(&mut machine, 2);
        assert_eq!(machine.sound_timer(), 0x42);
        assert!(machine.timers().sound_active());
    }

    #[test]
    fn test_fx1e_add() {
        let mut machine = machine(&[0xA300, 0x6142, 0xF11E]);
        run(&mut machine, 3);
        assert_eq!(machine.i(), 0x0342);
    }

    #[test]
    fn test_fx1e_add_past_memory() {
        let mut machine = machine(&[0xAFFF, 0x6101, 0xF11E]);
        run(&mut machine, 2);
        assert!(matches!(
            step(&mut machine),
            Err(MachineError::AddressOutOfBounds { address: 0x1000, .. })
        ));
        assert_eq!(machine.i(), 0xFFF);
    }

    #[test]
    fn test_fx29_ld() {
        let mut machine = machine(&[0x610A, 0xF129]);
        run(&mut machine, 2);
        assert_eq!(machine.i(), 0xA * 5);
    }

    #[test]
    fn test_fx33_ld() {
        let mut machine = machine(&[0x619D, 0xA300, 0xF133]);
        run(&mut machine, 3);
        assert_eq!(&machine.memory()[0x300..0x303], &[1, 5, 7]);
    }

    #[test]
    fn test_fx33_into_font_is_rejected() {
        let mut machine = machine(&[0x619D, 0xA010, 0xF133]);
        run(&mut machine, 2);
        assert_eq!(
            step(&mut machine),
            Err(MachineError::ProtectedWrite { address: 0x010, pc: 0x204 })
        );
        assert_eq!(&machine.memory()[..80], &FONT_SET[..]);
    }

    #[test]
    fn test_fx55_ld() {
        let mut machine = machine(&[0x6001, 0x6102, 0x6203, 0xA300, 0xF155]);
        run(&mut machine, 5);
        assert_eq!(&machine.memory()[0x300..0x303], &[0x1, 0x2, 0x0]);
        assert_eq!(machine.i(), 0x300);
    }

    #[test]
    fn test_fx65_ld() {
        let mut machine = machine(&[0xA000, 0xF265]);
        run(&mut machine, 2);
        assert_eq!(&machine.registers()[..4], &[0xF0, 0x90, 0x90, 0x00]);
    }

    #[test]
    fn test_unknown_opcode_advances_by_two() {
        let mut machine = machine(&[0x00FF]);
        assert_eq!(
            step(&mut machine),
            Err(MachineError::Decode {
                error: DecodeError::UnknownOpcode(Opcode::from(0x00FF)),
                pc: 0x200
            })
        );
        assert_eq!(machine.pc(), 0x202);
    }

    #[test]
    fn test_display_is_only_changed_by_the_program() {
        let mut machine = machine(&[0x6101]);
        assert!(machine.display().is_dirty());
        machine.mark_display_clean();
        assert!(!machine.display().is_dirty());

        run(&mut machine, 1);
        assert!(!machine.display().is_dirty());
        assert!(machine.display().rows().flatten().all(|on| !on));
    }

    #[test]
    fn test_fetch_past_memory() {
        let mut machine = machine(&[0x1FFF]);
        run(&mut machine, 1);
        assert!(matches!(
            step(&mut machine),
            Err(MachineError::AddressOutOfBounds { address: 0x1000, .. })
        ));
    }

    #[test]
    fn test_restore_keeps_live_keypad() {
        let mut machine = machine(&[0x6101]);
        let snapshot = machine.clone();
        run(&mut machine, 1);
        machine.set_key(0x2, true).unwrap();

        machine.restore(snapshot);
        assert_eq!(machine.pc(), 0x200);
        assert_eq!(machine.registers()[0x1], 0x0);
        assert!(machine.keypad().is_pressed(0x2).unwrap());
        assert!(machine.display().is_dirty());
    }
}
