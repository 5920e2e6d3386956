use crate::constants::{DISPLAY_HEIGHT, DISPLAY_WIDTH};

/// # Display
/// The Chip-8 display is composed of 64x32 black/white pixels.
///
/// Pixels are stored row-major and indexed as `[y][x]`. Sprites are XORed onto the
/// display, so drawing the same sprite twice erases it again; whether that happened
/// is reported back to the interpreter as a collision.
///
/// Any mutation marks the display as dirty so that renderers can skip unchanged frames.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Display {
    pixels: [[bool; DISPLAY_WIDTH]; DISPLAY_HEIGHT],
    dirty: bool,
}

impl Display {
    pub fn new() -> Self {
        Display {
            pixels: [[false; DISPLAY_WIDTH]; DISPLAY_HEIGHT],
            dirty: true,
        }
    }

    pub fn width(&self) -> usize {
        DISPLAY_WIDTH
    }

    pub fn height(&self) -> usize {
        DISPLAY_HEIGHT
    }

    /// Turns every pixel off
    pub fn clear(&mut self) {
        self.pixels = [[false; DISPLAY_WIDTH]; DISPLAY_HEIGHT];
        self.dirty = true;
    }

    /// # Panics
    /// If `x` or `y` lies outside of the display.
    pub fn pixel_at(&self, x: usize, y: usize) -> bool {
        self.pixels[y][x]
    }

    /// # Panics
    /// If `x` or `y` lies outside of the display.
    pub fn set_pixel(&mut self, x: usize, y: usize, on: bool) {
        self.pixels[y][x] = on;
        self.dirty = true;
    }

    /// XORs a sprite onto the display with its top left corner at `x`, `y`.
    ///
    /// Each row is 8 pixels wide with the most significant bit on the left.
    /// Coordinates past the right or bottom edges wrap around to the opposite side.
    ///
    /// Returns true if any pixel that was on got turned off.
    pub fn draw_sprite(&mut self, rows: &[u8], x: usize, y: usize) -> bool {
        let mut erased = false;

        for (row, byte) in rows.iter().enumerate() {
            let py = (y + row) % DISPLAY_HEIGHT;
            for bit in 0..8 {
                if (byte >> (7 - bit)) & 1 == 0 {
                    continue;
                }
                let px = (x + bit) % DISPLAY_WIDTH;
                let pixel = &mut self.pixels[py][px];
                erased |= *pixel;
                *pixel = !*pixel;
            }
        }

        self.dirty = true;
        erased
    }

    /// Iterates over the rows of the display from top to bottom
    pub fn rows(&self) -> impl Iterator<Item = &[bool; DISPLAY_WIDTH]> {
        self.pixels.iter()
    }

    /// Whether the display changed since the last call to `mark_clean`
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }
}

impl Default for Display {
    fn default() -> Self {
        Self::new()
    }
}
