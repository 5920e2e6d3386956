use std::collections::HashMap;
use std::io::{self, Stdout, Write};
use std::time::{Duration, Instant};

use crossterm::cursor::{Hide, MoveTo, Show};
use crossterm::event::{
    self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, KeyboardEnhancementFlags,
    PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
};
use crossterm::style::Print;
use crossterm::terminal::{self, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::{execute, queue};
use tracing::{debug, warn};

use chip8_core::Display;

use crate::frontend::{Frontend, FrontendError, FrontendEvent};
use crate::keymap::keymap;

/// How long a key counts as held after its last press when the terminal
/// can't tell us about releases
const HOLD: Duration = Duration::from_millis(150);

/// Keys whose release the frontend has to track
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
enum Held {
    Keypad(u8),
    Rewind,
}

impl Held {
    fn event(self, down: bool) -> FrontendEvent {
        match (self, down) {
            (Held::Keypad(key), true) => FrontendEvent::KeyDown(key),
            (Held::Keypad(key), false) => FrontendEvent::KeyUp(key),
            (Held::Rewind, down) => FrontendEvent::Rewind(down),
        }
    }
}

/// # Terminal frontend
/// Draws the display with block characters, two pixel rows per line of text, and
/// reads the keyboard through the terminal in raw mode.
///
/// Most terminals only report key presses (and auto-repeats), so a key is released
/// once no press for it was seen for a short while. Terminals that support the
/// kitty keyboard protocol report real releases instead.
pub struct TerminalFrontend {
    out: Stdout,
    keys: KeyTracker,
    tone: bool,
}

/// Turns terminal key events into frontend events
#[derive(Debug, Default)]
struct KeyTracker {
    reports_releases: bool,
    held: HashMap<Held, Instant>,
    fast_forward: bool,
}

impl TerminalFrontend {
    pub fn new() -> Result<Self, FrontendError> {
        let mut out = io::stdout();
        terminal::enable_raw_mode()?;
        execute!(out, EnterAlternateScreen, Hide)?;

        let reports_releases = terminal::supports_keyboard_enhancement().unwrap_or(false);
        if reports_releases {
            execute!(
                out,
                PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
            )?;
        }
        debug!(reports_releases, "terminal ready");

        Ok(TerminalFrontend {
            out,
            keys: KeyTracker {
                reports_releases,
                ..KeyTracker::default()
            },
            tone: false,
        })
    }

    /// Turns the display into lines of text using half blocks.
    fn frame_to_lines(display: &Display) -> Vec<String> {
        let rows: Vec<_> = display.rows().collect();
        rows.chunks(2)
            .map(|pair| {
                let top = pair[0];
                let bottom = pair.get(1);
                top.iter()
                    .enumerate()
                    .map(|(x, on)| match (*on, bottom.map_or(false, |row| row[x])) {
                        (true, true) => '█',
                        (true, false) => '▀',
                        (false, true) => '▄',
                        (false, false) => ' ',
                    })
                    .collect()
            })
            .collect()
    }
}

impl KeyTracker {
    fn translate(&mut self, key: KeyEvent, now: Instant, events: &mut Vec<FrontendEvent>) {
        let held = match key.code {
            KeyCode::Esc => {
                events.push(FrontendEvent::Quit);
                return;
            }
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                events.push(FrontendEvent::Quit);
                return;
            }
            KeyCode::Char(' ') => {
                // No reliable release for space, so it toggles
                if key.kind == KeyEventKind::Press {
                    self.fast_forward = !self.fast_forward;
                    events.push(FrontendEvent::FastForward(self.fast_forward));
                }
                return;
            }
            KeyCode::Backspace => Held::Rewind,
            KeyCode::Char(c) => match keymap(c) {
                Some(k) => Held::Keypad(k),
                None => return,
            },
            _ => return,
        };

        match key.kind {
            KeyEventKind::Press | KeyEventKind::Repeat => {
                if self.held.insert(held, now).is_none() {
                    events.push(held.event(true));
                }
            }
            KeyEventKind::Release => {
                if self.held.remove(&held).is_some() {
                    events.push(held.event(false));
                }
            }
        }
    }

    /// Releases keys that haven't been pressed again within `HOLD`
    fn expire(&mut self, now: Instant, events: &mut Vec<FrontendEvent>) {
        self.held.retain(|held, pressed| {
            let alive = now.saturating_duration_since(*pressed) < HOLD;
            if !alive {
                events.push(held.event(false));
            }
            alive
        });
    }
}

impl Frontend for TerminalFrontend {
    fn render(&mut self, display: &Display) -> Result<(), FrontendError> {
        for (row, line) in TerminalFrontend::frame_to_lines(display).iter().enumerate() {
            queue!(self.out, MoveTo(0, row as u16), Print(line))?;
        }
        self.out.flush()?;
        Ok(())
    }

    fn poll_events(&mut self) -> Result<Vec<FrontendEvent>, FrontendError> {
        let mut events = Vec::new();
        let now = Instant::now();
        while event::poll(Duration::ZERO)? {
            if let Event::Key(key) = event::read()? {
                self.keys.translate(key, now, &mut events);
            }
        }
        if !self.keys.reports_releases {
            self.keys.expire(now, &mut events);
        }
        Ok(events)
    }

    /// Rings the terminal bell when the tone starts
    fn set_tone(&mut self, active: bool) -> Result<(), FrontendError> {
        if active && !self.tone {
            execute!(self.out, Print('\u{7}'))?;
        }
        self.tone = active;
        Ok(())
    }
}

impl Drop for TerminalFrontend {
    fn drop(&mut self) {
        if self.keys.reports_releases {
            let _ = execute!(self.out, PopKeyboardEnhancementFlags);
        }
        if let Err(e) = execute!(self.out, Show, LeaveAlternateScreen) {
            warn!("could not restore the terminal: {}", e);
        }
        let _ = terminal::disable_raw_mode();
    }
}
