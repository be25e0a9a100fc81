//! Halcyon keyboard key handling
//!
//! This crate turns the clean press/release stream coming out of the matrix
//! scanner (already merged across both halves of the split) into logical
//! keyboard events.  Along the way it handles layers, dual-function tap/hold
//! keys, multi-key combos, and shortcuts that have to be typed differently
//! depending on which host operating system we are plugged into.
//!
//! The pieces, in the order an event flows through them:
//!
//! - [`combo`]: holds back presses that might be part of a combo.
//! - [`keymap`]: resolves a physical key against the active [`layers`].
//! - [`tap_hold`]: decides between the tap and hold half of dual-role keys.
//! - [`dispatch`]: turns the resolved action into [`Output`] events, consulting
//!   the [`host`] remap tables for canonical actions.
//!
//! [`engine::Engine`] ties these together.

#![cfg_attr(not(any(feature = "std", test)), no_std)]
// #![deny(missing_docs)]

#[cfg(not(any(feature = "std", test)))]
extern crate core as std;

extern crate alloc;

use bitflags::bitflags;

pub use usbd_human_interface_device::page::Keyboard;

pub use action::{CanonicalAction, Interrupt, LogicalAction, MacroStep, TapHold};
pub use engine::Engine;
pub use host::HostOs;
pub use keys::PhysicalKey;
pub use layers::{LayerId, LayerState};

pub mod action;
pub mod combo;
pub mod dispatch;
pub mod engine;
pub mod host;
pub mod indicator;
pub mod keymap;
pub mod keys;
pub mod layers;
pub mod layout;
pub mod settings;
pub mod tap_hold;

#[cfg(test)]
mod testlog;

cfg_if::cfg_if! {
    if #[cfg(feature = "defmt")] {
        mod log {
            pub use defmt::{debug, info, warn};
        }
    } else if #[cfg(any(feature = "log", test))] {
        mod log {
            pub use ::log::{debug, info, warn};
        }
    } else {
        mod log {
            macro_rules! discard {
                ($($arg:tt)*) => {{
                    let _ = format_args!($($arg)*);
                }};
            }
            pub(crate) use discard as debug;
            pub(crate) use discard as info;
            pub(crate) use discard as warn;
        }
    }
}

/// Time, in milliseconds, as stamped on events by the scanner.
pub type Millis = u32;

/// Time elapsed from `start` to `now`.
///
/// The scanner clock is a free running `u32` that wraps after about 49 days,
/// so the difference is taken modulo 2^32.  A difference of more than half the
/// range can only be the clock stepping backwards, and is clamped to zero.
pub fn elapsed(start: Millis, now: Millis) -> Millis {
    let delta = now.wrapping_sub(start);
    if delta > Millis::MAX / 2 {
        crate::log::warn!("clock went backwards: {} -> {}", start, now);
        0
    } else {
        delta
    }
}

/// Key events indicate a physical key going up or down, at a given time.
#[derive(Clone, Copy, Eq, PartialEq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct KeyEvent {
    pub key: PhysicalKey,
    pub pressed: bool,
    pub time: Millis,
}

impl KeyEvent {
    /// Build an event from the raw scanner representation.
    pub fn new(key: u16, pressed: bool, time: Millis) -> KeyEvent {
        KeyEvent {
            key: PhysicalKey::new(key),
            pressed,
            time,
        }
    }

    pub fn press(key: PhysicalKey, time: Millis) -> KeyEvent {
        KeyEvent { key, pressed: true, time }
    }

    pub fn release(key: PhysicalKey, time: Millis) -> KeyEvent {
        KeyEvent { key, pressed: false, time }
    }

    pub fn is_press(&self) -> bool {
        self.pressed
    }

    pub fn is_release(&self) -> bool {
        !self.pressed
    }
}

bitflags! {
    /// A modifier set.  The bit layout matches the modifier byte of a HID
    /// keyboard report, so left and right modifiers are distinct.
    #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
    pub struct Mods: u8 {
        const CONTROL = 0b0000_0001;
        const SHIFT = 0b0000_0010;
        const ALT = 0b0000_0100;
        const GUI = 0b0000_1000;
        const RCONTROL = 0b0001_0000;
        const RSHIFT = 0b0010_0000;
        const RALT = 0b0100_0000;
        const RGUI = 0b1000_0000;
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Mods {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(fmt, "Mods({=u8:#x})", self.bits())
    }
}

/// The modifier keycodes, in bit order of [`Mods`].
const MOD_KEYS: [Keyboard; 8] = [
    Keyboard::LeftControl,
    Keyboard::LeftShift,
    Keyboard::LeftAlt,
    Keyboard::LeftGUI,
    Keyboard::RightControl,
    Keyboard::RightShift,
    Keyboard::RightAlt,
    Keyboard::RightGUI,
];

impl Mods {
    /// The modifier set for a single modifier keycode, or empty if the
    /// keycode is not a modifier.
    pub fn from_keycode(key: Keyboard) -> Mods {
        match MOD_KEYS.iter().position(|&k| k == key) {
            Some(bit) => Mods::from_bits_truncate(1 << bit),
            None => Mods::empty(),
        }
    }

    /// The keycodes for these modifiers, in press order.
    pub fn keycodes(self) -> impl DoubleEndedIterator<Item = Keyboard> {
        (0..8)
            .filter(move |bit| self.bits() & (1 << bit) != 0)
            .map(|bit| MOD_KEYS[bit])
    }
}

/// Something that the key handling produces for the host or the indicators.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Output {
    /// A HID keycode (including modifier keycodes) going down or up.
    Key { code: Keyboard, pressed: bool },
    /// A custom action, handled outside of the key core (mouse keys, media,
    /// backlight and the like).
    Custom { id: u16, pressed: bool },
    /// The set of active layers changed.
    Layers(LayerState),
}

impl Output {
    pub fn press(code: Keyboard) -> Output {
        Output::Key { code, pressed: true }
    }

    pub fn release(code: Keyboard) -> Output {
        Output::Key { code, pressed: false }
    }
}

/// A queue of outputs, in the order they should be sent.
pub trait OutputQueue {
    fn push(&mut self, val: Output);
}

impl OutputQueue for alloc::vec::Vec<Output> {
    fn push(&mut self, val: Output) {
        alloc::vec::Vec::push(self, val);
    }
}

impl<const N: usize> OutputQueue for arraydeque::ArrayDeque<Output, N> {
    // Outputs are discarded if the queue is full.
    fn push(&mut self, val: Output) {
        if self.push_back(val).is_err() {
            crate::log::warn!("output queue full, dropping {:?}", val);
        }
    }
}
