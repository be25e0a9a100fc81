//! Host operating system handling
//!
//! Shortcuts such as copy or word-left are typed differently depending on the
//! host.  The keymap refers to them as [`CanonicalAction`]s, and each host has
//! a complete [`RemapTable`] giving the keys to send.  The host is detected
//! outside of this crate (from the USB enumeration pattern), and reported
//! once with [`HostContext::set`].  Until then, the Linux table is used.

use core::fmt;
use core::sync::atomic::{AtomicU8, Ordering};

use enumset::EnumSet;
use minicbor::{Decode, Encode};

use crate::action::CanonicalAction;
use crate::keymap::ConfigError;
use crate::log::info;
use crate::{Keyboard, Mods};

/// The host operating system.
#[derive(Debug, Decode, Encode, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cbor(index_only)]
pub enum HostOs {
    /// Detection hasn't finished, or wasn't conclusive.
    #[n(0)]
    Unknown,
    #[n(1)]
    Linux,
    #[n(2)]
    Windows,
    #[n(3)]
    MacOs,
}

impl HostOs {
    fn from_u8(value: u8) -> HostOs {
        match value {
            1 => HostOs::Linux,
            2 => HostOs::Windows,
            3 => HostOs::MacOs,
            _ => HostOs::Unknown,
        }
    }
}

impl fmt::Display for HostOs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HostOs::Unknown => "unknown",
            HostOs::Linux => "Linux",
            HostOs::Windows => "Windows",
            HostOs::MacOs => "macOS",
        };
        f.write_str(name)
    }
}

/// The detected host.
///
/// Only the engine's own thread ever changes this, but it is readable through
/// a shared reference, and the swap of the host (and thus of the remap table
/// in use) is a single store.
#[derive(Debug)]
pub struct HostContext {
    os: AtomicU8,
}

impl HostContext {
    pub const fn new() -> HostContext {
        HostContext {
            os: AtomicU8::new(HostOs::Unknown as u8),
        }
    }

    /// Record the detected host.  Setting the same host again does nothing.
    /// Returns true if the host changed.
    pub fn set(&self, os: HostOs) -> bool {
        let old = self.get();
        if old == os {
            return false;
        }
        // Load and store only, so this works on cores without compare and swap.
        self.os.store(os as u8, Ordering::Release);
        info!("host os: {} -> {}", old, os);
        true
    }

    pub fn get(&self) -> HostOs {
        HostOs::from_u8(self.os.load(Ordering::Acquire))
    }
}

impl Default for HostContext {
    fn default() -> Self {
        HostContext::new()
    }
}

/// A concrete key combination: modifiers held around a single key tap.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct KeyCombo {
    pub mods: Mods,
    pub key: Keyboard,
}

impl KeyCombo {
    pub const fn new(mods: Mods, key: Keyboard) -> KeyCombo {
        KeyCombo { mods, key }
    }

    pub const fn plain(key: Keyboard) -> KeyCombo {
        KeyCombo::new(Mods::empty(), key)
    }
}

/// The key combination for every canonical action, for one host.
#[derive(Clone, Copy, Debug)]
pub struct RemapTable {
    entries: &'static [(CanonicalAction, KeyCombo)],
}

impl RemapTable {
    pub const fn new(entries: &'static [(CanonicalAction, KeyCombo)]) -> RemapTable {
        RemapTable { entries }
    }

    /// The key combination for an action.  Only `None` if the table was never
    /// validated.
    pub fn lookup(&self, action: CanonicalAction) -> Option<KeyCombo> {
        self.entries
            .iter()
            .find(|(a, _)| *a == action)
            .map(|&(_, combo)| combo)
    }

    /// Check that every canonical action has exactly one entry.
    pub fn validate(&self, os: HostOs) -> Result<(), ConfigError> {
        let mut seen = EnumSet::<CanonicalAction>::new();
        for &(action, _) in self.entries {
            if !seen.insert(action) {
                return Err(ConfigError::DuplicateRemap { os, action });
            }
        }
        match EnumSet::<CanonicalAction>::all().difference(seen).iter().next() {
            Some(action) => Err(ConfigError::MissingRemap { os, action }),
            None => Ok(()),
        }
    }
}

/// One remap table per host.  An unknown host gets the Linux table.
#[derive(Clone, Copy, Debug)]
pub struct RemapTables {
    pub linux: RemapTable,
    pub windows: RemapTable,
    pub macos: RemapTable,
}

impl RemapTables {
    pub fn for_host(&self, os: HostOs) -> &RemapTable {
        match os {
            HostOs::Unknown | HostOs::Linux => &self.linux,
            HostOs::Windows => &self.windows,
            HostOs::MacOs => &self.macos,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.linux.validate(HostOs::Linux)?;
        self.windows.validate(HostOs::Windows)?;
        self.macos.validate(HostOs::MacOs)
    }
}

impl Default for RemapTables {
    fn default() -> Self {
        RemapTables {
            linux: RemapTable::new(&PC_REMAP),
            windows: RemapTable::new(&PC_REMAP),
            macos: RemapTable::new(&MAC_REMAP),
        }
    }
}

const fn ctl(key: Keyboard) -> KeyCombo {
    KeyCombo::new(Mods::CONTROL, key)
}

const fn gui(key: Keyboard) -> KeyCombo {
    KeyCombo::new(Mods::GUI, key)
}

/// Linux and Windows agree on all of these.
pub static PC_REMAP: [(CanonicalAction, KeyCombo); 11] = [
    (CanonicalAction::Copy, ctl(Keyboard::C)),
    (CanonicalAction::Cut, ctl(Keyboard::X)),
    (CanonicalAction::Paste, ctl(Keyboard::V)),
    (CanonicalAction::Undo, ctl(Keyboard::Z)),
    (CanonicalAction::Redo, ctl(Keyboard::Y)),
    (CanonicalAction::SelectAll, ctl(Keyboard::A)),
    (CanonicalAction::Save, ctl(Keyboard::S)),
    (CanonicalAction::WordLeft, ctl(Keyboard::LeftArrow)),
    (CanonicalAction::WordRight, ctl(Keyboard::RightArrow)),
    (CanonicalAction::LineStart, KeyCombo::plain(Keyboard::Home)),
    (CanonicalAction::LineEnd, KeyCombo::plain(Keyboard::End)),
];

pub static MAC_REMAP: [(CanonicalAction, KeyCombo); 11] = [
    (CanonicalAction::Copy, gui(Keyboard::C)),
    (CanonicalAction::Cut, gui(Keyboard::X)),
    (CanonicalAction::Paste, gui(Keyboard::V)),
    (CanonicalAction::Undo, gui(Keyboard::Z)),
    (
        CanonicalAction::Redo,
        KeyCombo::new(Mods::SHIFT.union(Mods::GUI), Keyboard::Z),
    ),
    (CanonicalAction::SelectAll, gui(Keyboard::A)),
    (CanonicalAction::Save, gui(Keyboard::S)),
    (CanonicalAction::WordLeft, KeyCombo::new(Mods::ALT, Keyboard::LeftArrow)),
    (CanonicalAction::WordRight, KeyCombo::new(Mods::ALT, Keyboard::RightArrow)),
    (CanonicalAction::LineStart, gui(Keyboard::LeftArrow)),
    (CanonicalAction::LineEnd, gui(Keyboard::RightArrow)),
];
