use std::time::Instant;

use tracing::trace;

use crate::constants::TIMER_PERIOD;

/// # Timers
/// The delay and sound timers count down towards 0 at 60Hz.
///
/// The countdown is driven by wall-clock time rather than by the number of CPU cycles,
/// so it stays correct however fast (or slowly) the CPU is stepped. Each `tick` decrements
/// at most once and restarts the period from the time of that tick.
#[derive(Copy, Clone, Debug)]
pub struct Timers {
    pub delay: u8,
    pub sound: u8,
    last_tick: Instant,
}

impl Timers {
    pub fn new(now: Instant) -> Self {
        Timers {
            delay: 0,
            sound: 0,
            last_tick: now,
        }
    }

    /// When the previous decrement happened
    pub fn last_tick(&self) -> Instant {
        self.last_tick
    }

    /// Decrements both timers if a full period elapsed since the last tick.
    /// Returns whether the period elapsed.
    pub fn tick(&mut self, now: Instant) -> bool {
        if now.saturating_duration_since(self.last_tick) < TIMER_PERIOD {
            return false;
        }

        self.delay = self.delay.saturating_sub(1);
        self.sound = self.sound.saturating_sub(1);
        self.last_tick = now;
        trace!(delay = self.delay, sound = self.sound, "timers ticked");
        true
    }

    /// A tone should be playing while the sound timer is non-zero
    pub fn sound_active(&self) -> bool {
        self.sound > 0
    }

    /// Moves the tick reference without touching the counters
    pub(crate) fn rebase(&mut self, last_tick: Instant) {
        self.last_tick = last_tick;
    }
}
