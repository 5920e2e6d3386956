use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::constants::KEY_COUNT;
use crate::error::KeyError;

/// # Keypad
/// Chip-8 input is generated with a 16 key hexadecimal keypad.
///
/// ```text
/// |1|2|3|C|
/// |4|5|6|D|
/// |7|8|9|E|
/// |A|0|B|F|
/// ```
///
/// Every clone of a `Keypad` refers to the same set of keys, so an input source
/// can hold on to one (possibly on another thread) while the interpreter reads another.
#[derive(Clone, Debug, Default)]
pub struct Keypad {
    keys: Arc<[AtomicBool; KEY_COUNT]>,
}

impl Keypad {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the pressed status of `key`
    pub fn press(&self, key: u8) -> Result<(), KeyError> {
        self.set(key, true)
    }

    /// Unset the pressed status of `key`
    pub fn release(&self, key: u8) -> Result<(), KeyError> {
        self.set(key, false)
    }

    pub fn set(&self, key: u8, pressed: bool) -> Result<(), KeyError> {
        self.flag(key)?.store(pressed, Ordering::Relaxed);
        Ok(())
    }

    pub fn is_pressed(&self, key: u8) -> Result<bool, KeyError> {
        Ok(self.flag(key)?.load(Ordering::Relaxed))
    }

    /// The state of every key at this instant
    pub fn snapshot(&self) -> [bool; KEY_COUNT] {
        let mut keys = [false; KEY_COUNT];
        for (pressed, flag) in keys.iter_mut().zip(self.keys.iter()) {
            *pressed = flag.load(Ordering::Relaxed);
        }
        keys
    }

    fn flag(&self, key: u8) -> Result<&AtomicBool, KeyError> {
        self.keys.get(key as usize).ok_or(KeyError::OutOfRange(key))
    }
}
