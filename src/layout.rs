//! Keyboard layouts
//!
//! Layouts are written in the visual order of the keys (see
//! [`crate::keys::LAYOUT`]) and placed onto the matrix here.  Matrix
//! positions that have no key on the board are filled with
//! [`LogicalAction::NoOp`].

use crate::action::LogicalAction;
use crate::keymap::Layer;
use crate::keys::{LAYOUT, LAYOUT_KEYS, NKEYS};

pub mod kyria;

/// A layer from its visual layout.
pub fn layer_from_layout(keys: &[LogicalAction; LAYOUT_KEYS]) -> Layer {
    let mut layer = [LogicalAction::NoOp; NKEYS];
    for (pos, action) in LAYOUT.iter().zip(keys) {
        layer[pos.index()] = *action;
    }
    layer
}
