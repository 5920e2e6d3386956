use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use tracing::{debug, info, warn};

use chip8_core::{Display, History, Machine, Rom, CLOCK_SPEED};
use chip8_display::{Frontend, FrontendEvent, TerminalFrontend};

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum FrontendKind {
    /// Draw in the terminal
    Terminal,
    /// Draw in an SDL window
    Sdl,
}

impl FrontendKind {
    fn open(self, display: &Display) -> Result<Box<dyn Frontend>> {
        match self {
            FrontendKind::Terminal => {
                let frontend = TerminalFrontend::new().context("could not set up the terminal")?;
                Ok(Box::new(frontend))
            }
            FrontendKind::Sdl => open_sdl(display),
        }
    }
}

#[cfg(feature = "sdl")]
fn open_sdl(display: &Display) -> Result<Box<dyn Frontend>> {
    let (width, height) = (display.width() as u32, display.height() as u32);
    let frontend = chip8_display::SdlFrontend::new(width, height, 10)
        .context("could not open a window")?;
    Ok(Box::new(frontend))
}

#[cfg(not(feature = "sdl"))]
fn open_sdl(_display: &Display) -> Result<Box<dyn Frontend>> {
    anyhow::bail!("this build has no SDL support, rebuild with `--features sdl`")
}

/// Instructions per second when running at `CLOCK_SPEED`
const DEFAULT_SPEED: u32 = (1_000_000_000 / CLOCK_SPEED.as_nanos()) as u32;

#[derive(Args, Debug)]
pub struct RunOpt {
    /// Path to the ROM
    rom: PathBuf,

    /// Instructions executed per second
    #[arg(long, default_value_t = DEFAULT_SPEED, value_parser = clap::value_parser!(u32).range(1..))]
    speed: u32,

    /// Where to draw the display
    #[arg(long, value_enum, default_value_t = FrontendKind::Terminal)]
    frontend: FrontendKind,

    /// Skip over opcodes that don't decode instead of stopping
    #[arg(long)]
    skip_unknown: bool,

    /// Seed for the random number generator
    #[arg(long)]
    seed: Option<u64>,
}

impl RunOpt {
    fn cycle_time(&self) -> Duration {
        Duration::from_secs(1) / self.speed
    }

    pub fn exec(self) -> Result<()> {
        let rom = Rom::open(&self.rom)
            .with_context(|| format!("could not load {}", self.rom.display()))?;
        let mut machine = match self.seed {
            Some(seed) => Machine::with_seed(seed),
            None => Machine::new(),
        };
        machine.load(rom.bytes())?;
        info!(rom = %self.rom.display(), len = rom.len(), speed = self.speed, "loaded ROM");

        let mut frontend = self.frontend.open(machine.display())?;
        let mut history = History::new();

        let cycle_time = self.cycle_time();
        let mut last_cycle = Instant::now();

        // Whether or not the clock speed should be respected
        let mut fast_forward = false;
        // Whether the machine's state should be cycled forwards or backwards
        let mut rewind = false;

        'event: loop {
            if machine.display().is_dirty() {
                frontend.render(machine.display())?;
                machine.mark_display_clean();
            }

            for event in frontend.poll_events()? {
                match event {
                    FrontendEvent::Quit => break 'event,
                    FrontendEvent::KeyDown(key) => machine.set_key(key, true)?,
                    FrontendEvent::KeyUp(key) => machine.set_key(key, false)?,
                    FrontendEvent::FastForward(on) => {
                        debug!(on, "fast forward");
                        fast_forward = on;
                    }
                    FrontendEvent::Rewind(on) => {
                        debug!(on, "rewind");
                        rewind = on;
                    }
                }
            }

            if rewind {
                history.rewind(&mut machine);
            } else {
                history.record(&machine);
                match machine.step() {
                    Ok(_) => {}
                    Err(e) if e.is_decode_failure() && self.skip_unknown => {
                        warn!("skipping: {}", e);
                    }
                    Err(e) => return Err(e).context("the machine stopped"),
                }
            }
            frontend.set_tone(machine.timers().sound_active())?;

            let current_time = Instant::now();
            let elapsed_cycle_time = current_time - last_cycle;
            if !fast_forward && cycle_time > elapsed_cycle_time {
                std::thread::sleep(cycle_time - elapsed_cycle_time);
            }
            last_cycle = Instant::now();
        }

        info!("quitting");
        Ok(())
    }
}
