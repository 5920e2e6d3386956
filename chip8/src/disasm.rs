use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::Context;
use clap::Args;

use chip8_core::Rom;

#[derive(Args, Debug)]
pub struct DisasmOpt {
    /// Path to the ROM
    rom: PathBuf,
}

impl DisasmOpt {
    pub fn exec(self) -> anyhow::Result<()> {
        let rom = Rom::open(&self.rom)
            .with_context(|| format!("could not load {}", self.rom.display()))?;

        let stdout = io::stdout();
        let mut out = stdout.lock();
        for line in rom.disassemble() {
            writeln!(out, "{}", line)?;
        }
        Ok(())
    }
}
