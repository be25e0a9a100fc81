//! Layer stack
//!
//! Layers are numbered, and a higher number wins when more than one active
//! layer has something to say about a key.  The default (base) layer is
//! always active, below everything else, regardless of its number.
//!
//! Layers can be active for several reasons at once: toggled on, held by a
//! momentary key, or armed as a one-shot.  Momentary activations are tracked
//! per holder, so that a layer pushed by one key is only ever popped by that
//! same key's release, even when another key holds the same layer or a
//! toggle happens in between.

use arrayvec::ArrayVec;

use crate::keys::PhysicalKey;
use crate::log::{info, warn};

/// Index of a layer in the keymap.
pub type LayerId = u8;

/// Layers are tracked in a 16 bit mask.
pub const MAX_LAYERS: usize = 16;

/// Number of momentary activations that can be held at once.
const MAX_MOMENTARY: usize = 16;

/// A snapshot of which layers are active.
///
/// This is what the resolver consults, and what is handed to the indicators
/// when the layers change.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LayerState {
    /// Active layers above the default, one bit per layer.
    active: u16,
    /// The base layer.
    default: LayerId,
}

impl LayerState {
    /// Only the given default layer is active.
    pub const fn new(default: LayerId) -> LayerState {
        LayerState { active: 0, default }
    }

    /// The same state with another layer active.
    pub const fn with(self, layer: LayerId) -> LayerState {
        LayerState {
            active: self.active | (1 << layer),
            default: self.default,
        }
    }

    pub fn default_layer(&self) -> LayerId {
        self.default
    }

    pub fn is_active(&self, layer: LayerId) -> bool {
        layer == self.default || (layer as usize) < MAX_LAYERS && self.active & (1 << layer) != 0
    }

    /// The layer that currently wins.
    pub fn highest(&self) -> LayerId {
        self.iter().next().unwrap_or(self.default)
    }

    /// Active layers from highest to lowest priority, ending with the
    /// default layer.
    pub fn iter(&self) -> impl Iterator<Item = LayerId> {
        let active = self.active & !(1u16 << self.default);
        (0..MAX_LAYERS as LayerId)
            .rev()
            .filter(move |&l| active & (1 << l) != 0)
            .chain(core::iter::once(self.default))
    }
}

/// Whatever is holding a momentary layer down.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Holder {
    Key(PhysicalKey),
    /// A combo, by its index in the keymap.
    Combo(u8),
}

/// The mutable layer state.
#[derive(Debug)]
pub struct LayerStack {
    momentary: ArrayVec<(Holder, LayerId), MAX_MOMENTARY>,
    toggled: u16,
    one_shot: Option<LayerId>,
    default: LayerId,
}

impl LayerStack {
    pub fn new(default: LayerId) -> LayerStack {
        LayerStack {
            momentary: ArrayVec::new(),
            toggled: 0,
            one_shot: None,
            default,
        }
    }

    /// The current layer state.
    pub fn state(&self) -> LayerState {
        let mut active = self.toggled;
        for &(_, layer) in &self.momentary {
            active |= 1 << layer;
        }
        if let Some(layer) = self.one_shot {
            active |= 1 << layer;
        }
        LayerState {
            active,
            default: self.default,
        }
    }

    /// Activate a layer for as long as `holder` is held.  Returns true if the
    /// layer state changed.
    pub fn push_momentary(&mut self, holder: Holder, layer: LayerId) -> bool {
        let before = self.state();
        if self.momentary.try_push((holder, layer)).is_err() {
            warn!("too many momentary layers held, ignoring layer {}", layer);
            return false;
        }
        self.changed(before)
    }

    /// Release the activation `holder` made for `layer`.
    pub fn pop_momentary(&mut self, holder: Holder, layer: LayerId) -> bool {
        let before = self.state();
        match self.momentary.iter().position(|&m| m == (holder, layer)) {
            Some(pos) => {
                self.momentary.remove(pos);
            }
            None => {
                warn!("momentary layer {} released by {:?} without a push", layer, holder);
                return false;
            }
        }
        self.changed(before)
    }

    pub fn toggle(&mut self, layer: LayerId) -> bool {
        let before = self.state();
        self.toggled ^= 1 << layer;
        self.changed(before)
    }

    /// Arm a layer until the next non-layer key resolves.
    pub fn one_shot(&mut self, layer: LayerId) -> bool {
        let before = self.state();
        self.one_shot = Some(layer);
        self.changed(before)
    }

    /// Drop the one-shot layer, if there is one.
    pub fn consume_one_shot(&mut self) -> bool {
        let before = self.state();
        match self.one_shot.take() {
            Some(_) => self.changed(before),
            None => false,
        }
    }

    /// Replace the base layer.
    pub fn set_default(&mut self, layer: LayerId) -> bool {
        let before = self.state();
        self.default = layer;
        self.changed(before)
    }

    fn changed(&self, before: LayerState) -> bool {
        let after = self.state();
        if after != before {
            info!("layers now {:?}", after);
            true
        } else {
            false
        }
    }
}
