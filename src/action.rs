//! Logical actions
//!
//! Every position of every layer holds a [`LogicalAction`].  Actions are
//! small `Copy` values so that whole layers can live in static tables.  The
//! larger actions (tap-hold bindings and macros) are referenced through
//! `&'static`, which keeps tap-hold from being nested by value; nesting by
//! reference is rejected when the keymap is validated.

use enumset::EnumSetType;

use crate::layers::LayerId;
use crate::{Keyboard, Mods};

/// What a key does once it has been resolved through the layers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LogicalAction {
    /// Fall through to the next lower active layer.
    Transparent,
    /// Do nothing.
    NoOp,
    /// A plain keycode.  Modifier keycodes act like [`LogicalAction::Modifier`].
    Basic(Keyboard),
    /// A keycode sent with the given modifiers held around it.
    Chord(Keyboard, Mods),
    /// Modifiers held while the key is held.
    Modifier(Mods),
    /// Layer active while the key is held.
    LayerMomentary(LayerId),
    /// Flip whether the layer is active.
    LayerToggle(LayerId),
    /// Layer active for the next non-layer key.
    LayerOneShot(LayerId),
    /// Replace the base layer.
    DefaultLayerSwitch(LayerId),
    /// A dual-function key.
    TapHold(&'static TapHold),
    /// A host independent shortcut, see [`crate::host`].
    Canonical(CanonicalAction),
    /// A short sequence typed as a unit when the key goes down.
    Macro(&'static [MacroStep]),
    /// Handled outside of the key core.
    Custom(u16),
}

impl LogicalAction {
    /// Does this action only change layers.
    pub fn is_layer(&self) -> bool {
        matches!(
            self,
            LogicalAction::LayerMomentary(_)
                | LogicalAction::LayerToggle(_)
                | LogicalAction::LayerOneShot(_)
                | LogicalAction::DefaultLayerSwitch(_)
        )
    }

    /// The layer this action refers to, if any.
    pub fn layer(&self) -> Option<LayerId> {
        match *self {
            LogicalAction::LayerMomentary(l)
            | LogicalAction::LayerToggle(l)
            | LogicalAction::LayerOneShot(l)
            | LogicalAction::DefaultLayerSwitch(l) => Some(l),
            _ => None,
        }
    }
}

/// How a pending tap-hold key reacts to another key being pressed before
/// the hold timeout.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Interrupt {
    /// Resolve to hold right away.  Home row modifiers want this so that a
    /// quick chord registers as modified.
    Hold,
    /// Resolve to tap right away.
    Tap,
}

/// A dual-function key binding.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TapHold {
    pub tap: LogicalAction,
    pub hold: LogicalAction,
    pub interrupt: Interrupt,
}

impl TapHold {
    pub const fn new(tap: LogicalAction, hold: LogicalAction, interrupt: Interrupt) -> TapHold {
        TapHold { tap, hold, interrupt }
    }

    /// A modifier when held, a key when tapped.
    pub const fn mod_tap(mods: Mods, key: Keyboard) -> TapHold {
        TapHold::new(LogicalAction::Basic(key), LogicalAction::Modifier(mods), Interrupt::Hold)
    }

    /// A momentary layer when held, a key when tapped.
    pub const fn layer_tap(layer: LayerId, key: Keyboard) -> TapHold {
        TapHold::new(
            LogicalAction::Basic(key),
            LogicalAction::LayerMomentary(layer),
            Interrupt::Hold,
        )
    }

    /// Same binding, resolving to tap when interrupted.
    pub const fn tap_on_interrupt(self) -> TapHold {
        TapHold {
            interrupt: Interrupt::Tap,
            ..self
        }
    }
}

/// One step of a macro.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MacroStep {
    /// Press and release a key.
    Tap(Keyboard),
    /// Press and release a key with modifiers held around it.
    TapChord(Keyboard, Mods),
    Press(Keyboard),
    Release(Keyboard),
    /// Lift whichever of these modifiers are currently held, remembering them.
    ClearMods(Mods),
    /// Put back exactly the modifiers the last `ClearMods` lifted.
    RestoreMods,
    /// Type a host dependent shortcut.
    Canonical(CanonicalAction),
}

/// Shortcuts that are typed differently depending on the host.
#[derive(EnumSetType, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CanonicalAction {
    Copy,
    Cut,
    Paste,
    Undo,
    Redo,
    SelectAll,
    Save,
    WordLeft,
    WordRight,
    LineStart,
    LineEnd,
}
