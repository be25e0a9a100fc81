//! The keymap
//!
//! A [`Keymap`] is the static configuration of the keyboard: a table of
//! actions for every layer and physical key, the combo definitions, the
//! timing constants and the per-host remap tables.  It is built once at
//! startup (see [`crate::layout`]), validated, and handed to the engine.
//!
//! Resolution of a key against the active layers is done by [`resolve`],
//! which has no state of its own.

use alloc::vec::Vec;
use core::fmt;

use minicbor::{Decode, Encode};

use crate::action::{CanonicalAction, LogicalAction};
use crate::host::{HostOs, RemapTables};
use crate::keys::{KeySet, PhysicalKey, NKEYS};
use crate::layers::{LayerId, LayerState, MAX_LAYERS};
use crate::log::warn;

/// Number of combos a keymap can define.
pub const MAX_COMBOS: usize = 32;

/// Largest number of keys in a single combo.
pub const MAX_COMBO_KEYS: usize = 4;

/// One layer: an action for every physical key.
pub type Layer = [LogicalAction; NKEYS];

/// A layer with nothing on it.
pub const TRANSPARENT_LAYER: Layer = [LogicalAction::Transparent; NKEYS];

/// Timing constants, all in milliseconds.  These are also part of the
/// persisted [`Settings`](crate::settings::Settings).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Encode, Decode)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cbor(map)]
pub struct Timing {
    /// A tap-hold key held this long becomes a hold.
    #[n(0)]
    pub hold_timeout_ms: u16,
    /// All keys of a combo have to go down within this window.
    #[n(1)]
    pub combo_window_ms: u16,
    /// Pressing a tap-hold key again this soon after its tap repeats the tap.
    #[n(2)]
    pub anti_repeat_ms: u16,
}

impl Default for Timing {
    fn default() -> Self {
        Timing {
            hold_timeout_ms: 200,
            combo_window_ms: 50,
            anti_repeat_ms: 120,
        }
    }
}

/// A set of physical keys that, pressed together, produce `output` instead of
/// their own actions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ComboDef {
    keys: KeySet,
    pub output: LogicalAction,
}

impl ComboDef {
    pub fn new(keys: &[PhysicalKey], output: LogicalAction) -> Result<ComboDef, ConfigError> {
        if keys.len() < 2 || keys.len() > MAX_COMBO_KEYS {
            return Err(ConfigError::ComboSize(keys.len()));
        }
        let mut set = KeySet::empty();
        for &key in keys {
            if !key.is_valid() {
                return Err(ConfigError::ComboKeyOutOfRange(key));
            }
            if set.contains(key) {
                return Err(ConfigError::DuplicateComboKey(key));
            }
            set.insert(key);
        }
        Ok(ComboDef { keys: set, output })
    }

    pub fn keys(&self) -> KeySet {
        self.keys
    }
}

/// The static keyboard configuration.
#[derive(Clone, Debug)]
pub struct Keymap {
    layers: Vec<Layer>,
    combos: Vec<ComboDef>,
    pub timing: Timing,
    pub remap: RemapTables,
    default_layer: LayerId,
}

impl Keymap {
    /// An empty keymap with default timing and remap tables.
    pub fn new() -> Keymap {
        Keymap {
            layers: Vec::new(),
            combos: Vec::new(),
            timing: Timing::default(),
            remap: RemapTables::default(),
            default_layer: 0,
        }
    }

    /// Add the next layer, returning its id.
    pub fn add_layer(&mut self, layer: Layer) -> Result<LayerId, ConfigError> {
        if self.layers.len() >= MAX_LAYERS {
            return Err(ConfigError::TooManyLayers);
        }
        self.layers.push(layer);
        Ok((self.layers.len() - 1) as LayerId)
    }

    pub fn add_combo(&mut self, combo: ComboDef) -> Result<(), ConfigError> {
        if self.combos.len() >= MAX_COMBOS {
            return Err(ConfigError::TooManyCombos);
        }
        self.combos.push(combo);
        Ok(())
    }

    pub fn set_default_layer(&mut self, layer: LayerId) {
        self.default_layer = layer;
    }

    pub fn default_layer(&self) -> LayerId {
        self.default_layer
    }

    pub fn layer(&self, id: LayerId) -> Option<&Layer> {
        self.layers.get(id as usize)
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    /// Combos in definition order.  This is also their priority order.
    pub fn combos(&self) -> &[ComboDef] {
        &self.combos
    }

    /// Check the whole keymap for references that can't work.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let result = self.check();
        if let Err(e) = &result {
            warn!("keymap rejected: {}", e);
        }
        result
    }

    fn check(&self) -> Result<(), ConfigError> {
        if self.layers.is_empty() {
            return Err(ConfigError::NoLayers);
        }
        if self.default_layer as usize >= self.layers.len() {
            return Err(ConfigError::DefaultLayerOutOfRange(self.default_layer));
        }
        for layer in &self.layers {
            for action in layer {
                self.check_action(action, false)?;
            }
        }
        for combo in &self.combos {
            if let LogicalAction::TapHold(_) = combo.output {
                return Err(ConfigError::TapHoldInCombo);
            }
            self.check_action(&combo.output, false)?;
        }
        self.remap.validate()
    }

    fn check_action(&self, action: &LogicalAction, in_tap_hold: bool) -> Result<(), ConfigError> {
        match *action {
            LogicalAction::TapHold(th) => {
                if in_tap_hold {
                    return Err(ConfigError::NestedTapHold);
                }
                for half in [&th.tap, &th.hold] {
                    if *half == LogicalAction::Transparent {
                        return Err(ConfigError::TransparentTapHold);
                    }
                    self.check_action(half, true)?;
                }
                Ok(())
            }
            LogicalAction::Macro(steps) => {
                if steps.is_empty() {
                    return Err(ConfigError::EmptyMacro);
                }
                Ok(())
            }
            ref other => match other.layer() {
                Some(layer) if layer as usize >= self.layers.len() => {
                    Err(ConfigError::UnknownLayer(layer))
                }
                _ => Ok(()),
            },
        }
    }
}

impl Default for Keymap {
    fn default() -> Self {
        Keymap::new()
    }
}

/// Resolve a physical key against a layer snapshot.
///
/// Active layers are scanned from the highest priority down to the default
/// layer, and the first action that isn't [`LogicalAction::Transparent`] wins.
/// If every layer is transparent for this key, the result is
/// [`LogicalAction::NoOp`].
pub fn resolve(keymap: &Keymap, key: PhysicalKey, layers: &LayerState) -> LogicalAction {
    if !key.is_valid() {
        return LogicalAction::NoOp;
    }
    layers
        .iter()
        .filter_map(|id| keymap.layer(id))
        .map(|layer| layer[key.index()])
        .find(|action| *action != LogicalAction::Transparent)
        .unwrap_or(LogicalAction::NoOp)
}

/// Problems with a keymap.  These are detected at startup, and mean the
/// configuration was built wrong.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConfigError {
    NoLayers,
    TooManyLayers,
    TooManyCombos,
    /// An action refers to a layer that doesn't exist.
    UnknownLayer(LayerId),
    DefaultLayerOutOfRange(LayerId),
    /// A tap-hold with another tap-hold as one of its halves.
    NestedTapHold,
    /// A tap-hold with a transparent half.
    TransparentTapHold,
    /// Combos fire on press, so they can't be tap-holds.
    TapHoldInCombo,
    EmptyMacro,
    /// Combos need between two and [`MAX_COMBO_KEYS`] keys.
    ComboSize(usize),
    ComboKeyOutOfRange(PhysicalKey),
    DuplicateComboKey(PhysicalKey),
    MissingRemap { os: HostOs, action: CanonicalAction },
    DuplicateRemap { os: HostOs, action: CanonicalAction },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::NoLayers => write!(f, "keymap has no layers"),
            ConfigError::TooManyLayers => write!(f, "more than {} layers", MAX_LAYERS),
            ConfigError::TooManyCombos => write!(f, "more than {} combos", MAX_COMBOS),
            ConfigError::UnknownLayer(l) => write!(f, "reference to undefined layer {}", l),
            ConfigError::DefaultLayerOutOfRange(l) => {
                write!(f, "default layer {} is not defined", l)
            }
            ConfigError::NestedTapHold => write!(f, "tap-hold inside a tap-hold"),
            ConfigError::TransparentTapHold => write!(f, "tap-hold with a transparent half"),
            ConfigError::TapHoldInCombo => write!(f, "combo output can't be a tap-hold"),
            ConfigError::EmptyMacro => write!(f, "macro with no steps"),
            ConfigError::ComboSize(n) => {
                write!(f, "combo has {} keys, needs 2 to {}", n, MAX_COMBO_KEYS)
            }
            ConfigError::ComboKeyOutOfRange(k) => write!(f, "combo key {} is not on the matrix", k.id()),
            ConfigError::DuplicateComboKey(k) => write!(f, "combo lists key {} twice", k.id()),
            ConfigError::MissingRemap { os, action } => {
                write!(f, "no {:?} mapping for {} hosts", action, os)
            }
            ConfigError::DuplicateRemap { os, action } => {
                write!(f, "{:?} mapped twice for {} hosts", action, os)
            }
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for ConfigError {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "{}", defmt::Display2Format(self))
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ConfigError {}

#[cfg(test)]
mod test {
    use super::*;
    use crate::action::TapHold;
    use crate::{Keyboard, Mods};

    const K0: PhysicalKey = PhysicalKey::new(0);
    const K1: PhysicalKey = PhysicalKey::new(1);

    fn two_layers() -> Keymap {
        let mut base = TRANSPARENT_LAYER;
        base[0] = LogicalAction::Basic(Keyboard::A);
        base[1] = LogicalAction::Basic(Keyboard::B);
        let mut upper = TRANSPARENT_LAYER;
        upper[0] = LogicalAction::Basic(Keyboard::Keyboard1);

        let mut keymap = Keymap::new();
        keymap.add_layer(base).unwrap();
        keymap.add_layer(upper).unwrap();
        keymap
    }

    #[test]
    fn resolve_falls_through_transparent() {
        let keymap = two_layers();
        let base = LayerState::new(0);
        let upper = base.with(1);
        assert_eq!(resolve(&keymap, K0, &base), LogicalAction::Basic(Keyboard::A));
        assert_eq!(
            resolve(&keymap, K0, &upper),
            LogicalAction::Basic(Keyboard::Keyboard1)
        );
        assert_eq!(resolve(&keymap, K1, &upper), LogicalAction::Basic(Keyboard::B));
        // Nothing anywhere.
        assert_eq!(
            resolve(&keymap, PhysicalKey::new(5), &upper),
            LogicalAction::NoOp
        );
        assert_eq!(
            resolve(&keymap, PhysicalKey::new(500), &upper),
            LogicalAction::NoOp
        );
    }

    #[test]
    fn resolve_ignores_missing_layers() {
        let keymap = two_layers();
        let state = LayerState::new(0).with(9);
        assert_eq!(resolve(&keymap, K0, &state), LogicalAction::Basic(Keyboard::A));
    }

    static NESTED_INNER: TapHold = TapHold::mod_tap(Mods::SHIFT, Keyboard::A);
    static NESTED: TapHold = TapHold::new(
        LogicalAction::Basic(Keyboard::B),
        LogicalAction::TapHold(&NESTED_INNER),
        crate::action::Interrupt::Hold,
    );
    static SEE_THROUGH: TapHold = TapHold::new(
        LogicalAction::Transparent,
        LogicalAction::Modifier(Mods::SHIFT),
        crate::action::Interrupt::Hold,
    );

    #[test]
    fn validation() {
        assert_eq!(Keymap::new().validate(), Err(ConfigError::NoLayers));

        let mut keymap = two_layers();
        assert_eq!(keymap.validate(), Ok(()));

        keymap.set_default_layer(2);
        assert_eq!(keymap.validate(), Err(ConfigError::DefaultLayerOutOfRange(2)));
        keymap.set_default_layer(1);
        assert_eq!(keymap.validate(), Ok(()));

        let mut bad = two_layers();
        let mut layer = TRANSPARENT_LAYER;
        layer[3] = LogicalAction::LayerMomentary(7);
        bad.add_layer(layer).unwrap();
        assert_eq!(bad.validate(), Err(ConfigError::UnknownLayer(7)));

        let mut bad = two_layers();
        let mut layer = TRANSPARENT_LAYER;
        layer[3] = LogicalAction::TapHold(&NESTED);
        bad.add_layer(layer).unwrap();
        assert_eq!(bad.validate(), Err(ConfigError::NestedTapHold));

        let mut bad = two_layers();
        let mut layer = TRANSPARENT_LAYER;
        layer[3] = LogicalAction::TapHold(&SEE_THROUGH);
        bad.add_layer(layer).unwrap();
        assert_eq!(bad.validate(), Err(ConfigError::TransparentTapHold));
    }

    #[test]
    fn combo_validation() {
        assert_eq!(
            ComboDef::new(&[K0], LogicalAction::NoOp),
            Err(ConfigError::ComboSize(1))
        );
        assert_eq!(
            ComboDef::new(&[K0, K0], LogicalAction::NoOp),
            Err(ConfigError::DuplicateComboKey(K0))
        );
        let off = PhysicalKey::new(NKEYS as u16);
        assert_eq!(
            ComboDef::new(&[K0, off], LogicalAction::NoOp),
            Err(ConfigError::ComboKeyOutOfRange(off))
        );

        let mut keymap = two_layers();
        keymap
            .add_combo(ComboDef::new(&[K0, K1], LogicalAction::TapHold(&SEE_THROUGH)).unwrap())
            .unwrap();
        assert_eq!(keymap.validate(), Err(ConfigError::TapHoldInCombo));

        let mut keymap = two_layers();
        keymap
            .add_combo(ComboDef::new(&[K0, K1], LogicalAction::LayerToggle(4)).unwrap())
            .unwrap();
        assert_eq!(keymap.validate(), Err(ConfigError::UnknownLayer(4)));
    }

    #[test]
    fn layer_limit() {
        let mut keymap = Keymap::new();
        for i in 0..MAX_LAYERS {
            assert_eq!(keymap.add_layer(TRANSPARENT_LAYER), Ok(i as LayerId));
        }
        assert_eq!(keymap.add_layer(TRANSPARENT_LAYER), Err(ConfigError::TooManyLayers));
    }
}
