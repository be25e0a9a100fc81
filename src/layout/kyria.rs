//! Default layout for the Kyria with Halcyon modules.
//!
//! Colemak-DH base with home row modifiers on R S T and N E I, thumb
//! layer-taps for the select, nav and symbol layers, and a Dvorak base that
//! can be switched to from the adjust layer.  The encoders mute on press.
//!
//! Host dependent editing shortcuts (copy, paste, word movement and so on)
//! are canonical actions, so they follow the detected host.
//!
//! A few combos on the top and bottom rows type the French accented letters
//! through AltGr.

use smart_leds::RGB8;

use crate::action::{CanonicalAction, LogicalAction, MacroStep, TapHold};
use crate::keymap::{ComboDef, ConfigError, Keymap};
use crate::keys::{layout_key, PhysicalKey, LAYOUT_KEYS};
use crate::layers::LayerId;
use crate::layout::layer_from_layout;
use crate::{Keyboard as K, Mods};

pub const COLEMAK_DH: LayerId = 0;
pub const SYM: LayerId = 1;
pub const NAV: LayerId = 2;
pub const SELECT: LayerId = 3;
pub const FUNCTION: LayerId = 4;
pub const ADJUST: LayerId = 5;
pub const DVORAK: LayerId = 6;

/// Ids of the custom actions.  These are handled by the board: mouse keys,
/// consumer page media keys, the RGB matrix, caps word and autocorrect.
pub mod custom {
    pub const MS_UP: u16 = 0x100;
    pub const MS_DOWN: u16 = 0x101;
    pub const MS_LEFT: u16 = 0x102;
    pub const MS_RIGHT: u16 = 0x103;
    pub const MS_WHEEL_UP: u16 = 0x104;
    pub const MS_WHEEL_DOWN: u16 = 0x105;
    pub const MS_BTN1: u16 = 0x110;
    pub const MS_BTN2: u16 = 0x111;
    pub const MS_BTN3: u16 = 0x112;

    pub const MEDIA_PREV: u16 = 0x200;
    pub const MEDIA_PLAY: u16 = 0x201;
    pub const MEDIA_NEXT: u16 = 0x202;

    pub const RGB_TOGGLE: u16 = 0x300;
    pub const RGB_NEXT: u16 = 0x301;
    pub const RGB_PREV: u16 = 0x302;
    pub const RGB_HUE_UP: u16 = 0x303;
    pub const RGB_HUE_DOWN: u16 = 0x304;
    pub const RGB_SAT_UP: u16 = 0x305;
    pub const RGB_SAT_DOWN: u16 = 0x306;
    pub const RGB_VAL_UP: u16 = 0x307;
    pub const RGB_VAL_DOWN: u16 = 0x308;

    pub const CAPS_WORD: u16 = 0x400;
    pub const AUTOCORRECT: u16 = 0x401;
}

/// Indicator color for each layer.
pub const LAYER_COLORS: [RGB8; 7] = [
    RGB8 { r: 0, g: 0, b: 0 },
    RGB8 { r: 0, g: 160, b: 255 },
    RGB8 { r: 0, g: 255, b: 64 },
    RGB8 { r: 255, g: 160, b: 0 },
    RGB8 { r: 160, g: 0, b: 255 },
    RGB8 { r: 255, g: 0, b: 0 },
    RGB8 { r: 255, g: 255, b: 255 },
];

const ___: LogicalAction = LogicalAction::Transparent;
const XXX: LogicalAction = LogicalAction::NoOp;

const fn k(code: K) -> LogicalAction {
    LogicalAction::Basic(code)
}

const fn s(code: K) -> LogicalAction {
    LogicalAction::Chord(code, Mods::SHIFT)
}

const fn ralt(code: K) -> LogicalAction {
    LogicalAction::Chord(code, Mods::RALT)
}

const fn th(binding: &'static TapHold) -> LogicalAction {
    LogicalAction::TapHold(binding)
}

const fn canon(action: CanonicalAction) -> LogicalAction {
    LogicalAction::Canonical(action)
}

const fn cu(id: u16) -> LogicalAction {
    LogicalAction::Custom(id)
}

static HOME_R: TapHold = TapHold::mod_tap(Mods::ALT, K::R);
static HOME_S: TapHold = TapHold::mod_tap(Mods::CONTROL, K::S);
static HOME_T: TapHold = TapHold::mod_tap(Mods::SHIFT, K::T);
static HOME_N: TapHold = TapHold::mod_tap(Mods::SHIFT, K::N);
static HOME_E: TapHold = TapHold::mod_tap(Mods::CONTROL, K::E);
static HOME_I: TapHold = TapHold::mod_tap(Mods::ALT, K::I);

static CTL_QUOT: TapHold = TapHold::mod_tap(Mods::RCONTROL, K::Apostrophe).tap_on_interrupt();
static CTL_MINS: TapHold = TapHold::mod_tap(Mods::RCONTROL, K::Minus).tap_on_interrupt();
static CTL_ESC: TapHold = TapHold::mod_tap(Mods::CONTROL, K::Escape).tap_on_interrupt();
static ALT_ENT: TapHold = TapHold::mod_tap(Mods::ALT, K::ReturnEnter).tap_on_interrupt();

static SELECT_SPC: TapHold = TapHold::layer_tap(SELECT, K::Space);
static NAV_TAB: TapHold = TapHold::layer_tap(NAV, K::Tab);
static SYM_BSPC: TapHold = TapHold::layer_tap(SYM, K::DeleteBackspace);

const FKEYS: LogicalAction = LogicalAction::LayerMomentary(FUNCTION);
const MO_ADJUST: LogicalAction = LogicalAction::LayerMomentary(ADJUST);
const MO_NAV: LogicalAction = LogicalAction::LayerMomentary(NAV);
const MO_SYM: LogicalAction = LogicalAction::LayerMomentary(SYM);
const DF_COLEMAK: LogicalAction = LogicalAction::DefaultLayerSwitch(COLEMAK_DH);
const DF_DVORAK: LogicalAction = LogicalAction::DefaultLayerSwitch(DVORAK);

const COPY: LogicalAction = canon(CanonicalAction::Copy);
const CUT: LogicalAction = canon(CanonicalAction::Cut);
const PASTE: LogicalAction = canon(CanonicalAction::Paste);
const UNDO: LogicalAction = canon(CanonicalAction::Undo);
const REDO: LogicalAction = canon(CanonicalAction::Redo);
const SLCTALL: LogicalAction = canon(CanonicalAction::SelectAll);
const PREV_W: LogicalAction = canon(CanonicalAction::WordLeft);
const NEXT_W: LogicalAction = canon(CanonicalAction::WordRight);

const SEL_W_LEFT: LogicalAction =
    LogicalAction::Chord(K::LeftArrow, Mods::CONTROL.union(Mods::SHIFT));
const SEL_W_RIGHT: LogicalAction =
    LogicalAction::Chord(K::RightArrow, Mods::CONTROL.union(Mods::SHIFT));

type LayoutTable = [LogicalAction; LAYOUT_KEYS];

#[rustfmt::skip]
static COLEMAK_DH_LAYOUT: LayoutTable = [
    k(K::Escape), k(K::Q), k(K::W), k(K::F), k(K::P), k(K::B),
    k(K::J), k(K::L), k(K::U), k(K::Y), k(K::Semicolon), k(K::DeleteBackspace),

    k(K::LeftShift), k(K::A), th(&HOME_R), th(&HOME_S), th(&HOME_T), k(K::G),
    k(K::M), th(&HOME_N), th(&HOME_E), th(&HOME_I), k(K::O), th(&CTL_QUOT),

    k(K::LeftControl), k(K::Z), k(K::X), k(K::C), k(K::D), k(K::V), cu(custom::CAPS_WORD), k(K::CapsLock),
    FKEYS, k(K::RightBrace), k(K::K), k(K::H), k(K::Comma), k(K::Dot), k(K::ForwardSlash), k(K::RightShift),

    cu(custom::AUTOCORRECT), k(K::LeftGUI), th(&ALT_ENT), th(&SELECT_SPC), th(&NAV_TAB),
    k(K::ReturnEnter), th(&SYM_BSPC), k(K::RightAlt), k(K::RightGUI), k(K::Application),

    k(K::Mute), XXX, XXX, XXX, XXX,
    k(K::Mute), XXX, XXX, XXX, XXX,
];

#[rustfmt::skip]
static SYM_LAYOUT: LayoutTable = [
    k(K::Grave), s(K::Keyboard2), s(K::Keyboard3), s(K::Keyboard9), s(K::Keyboard0), s(K::Keyboard4),
    k(K::Keyboard6), k(K::Keyboard7), k(K::Keyboard8), k(K::Keyboard9), k(K::KeypadMultiply), k(K::KeypadEqual),

    k(K::LeftShift), s(K::Keyboard1), s(K::Keyboard2), k(K::Apostrophe), k(K::Grave), k(K::Semicolon),
    s(K::Keyboard6), k(K::Keyboard4), k(K::Keyboard5), k(K::Keyboard6), k(K::ForwardSlash), k(K::ReturnEnter),

    k(K::NonUSBackslash), s(K::Keyboard7), s(K::Keyboard5), s(K::ForwardSlash), s(K::Keyboard1), k(K::Backslash), ___, ___,
    ___, ___, k(K::Keyboard0), k(K::Keyboard1), k(K::Keyboard2), k(K::Keyboard3), k(K::Dot), s(K::ForwardSlash),

    ___, ___, k(K::LeftBrace), k(K::Space), k(K::RightBrace),
    ___, ___, ___, ___, ___,

    k(K::Mute), XXX, XXX, XXX, XXX,
    k(K::Mute), XXX, XXX, XXX, XXX,
];

#[rustfmt::skip]
static NAV_LAYOUT: LayoutTable = [
    ___, ___, PREV_W, k(K::UpArrow), NEXT_W, ___,
    k(K::PageUp), cu(custom::MS_WHEEL_UP), cu(custom::MS_UP), cu(custom::MS_WHEEL_DOWN), k(K::VolumeUp), k(K::DeleteForward),

    ___, ___, k(K::LeftArrow), k(K::DownArrow), k(K::RightArrow), ___,
    k(K::PageDown), cu(custom::MS_LEFT), cu(custom::MS_DOWN), cu(custom::MS_RIGHT), k(K::VolumeDown), k(K::Insert),

    ___, ___, ___, ___, ___, ___, ___, k(K::ScrollLock),
    ___, ___, k(K::Pause), cu(custom::MEDIA_PREV), cu(custom::MEDIA_PLAY), cu(custom::MEDIA_NEXT), k(K::Mute), k(K::PrintScreen),

    ___, ___, ___, ___, ___,
    cu(custom::MS_BTN3), cu(custom::MS_BTN1), cu(custom::MS_BTN2), ___, ___,

    k(K::Mute), XXX, XXX, XXX, XXX,
    k(K::Mute), XXX, XXX, XXX, XXX,
];

#[rustfmt::skip]
static SELECT_LAYOUT: LayoutTable = [
    k(K::Tab), COPY, s(K::LeftArrow), s(K::UpArrow), s(K::RightArrow), SLCTALL,
    k(K::Y), k(K::U), k(K::I), k(K::O), k(K::P), k(K::DeleteBackspace),

    th(&CTL_ESC), PASTE, SEL_W_LEFT, s(K::DownArrow), SEL_W_RIGHT, UNDO,
    k(K::H), k(K::J), k(K::K), k(K::L), k(K::Semicolon), th(&CTL_QUOT),

    k(K::LeftShift), CUT, k(K::X), k(K::C), k(K::V), k(K::B), k(K::LeftBrace), k(K::CapsLock),
    REDO, k(K::RightBrace), k(K::N), k(K::M), k(K::Comma), k(K::Dot), k(K::ForwardSlash), k(K::RightShift),

    MO_ADJUST, k(K::LeftGUI), th(&ALT_ENT), k(K::Space), MO_NAV,
    MO_SYM, k(K::Space), k(K::RightAlt), k(K::RightGUI), k(K::Application),

    k(K::Mute), XXX, XXX, XXX, XXX,
    k(K::Mute), XXX, XXX, XXX, XXX,
];

#[rustfmt::skip]
static FUNCTION_LAYOUT: LayoutTable = [
    ___, k(K::F9), k(K::F10), k(K::F11), k(K::F12), ___,
    ___, ___, ___, ___, ___, ___,

    ___, k(K::F5), k(K::F6), k(K::F7), k(K::F8), ___,
    ___, k(K::RightShift), k(K::RightControl), k(K::LeftAlt), k(K::RightGUI), ___,

    ___, k(K::F1), k(K::F2), k(K::F3), k(K::F4), ___, ___, ___,
    ___, ___, ___, ___, ___, ___, ___, ___,

    ___, ___, ___, ___, ___,
    ___, ___, ___, ___, ___,

    k(K::Mute), XXX, XXX, XXX, XXX,
    k(K::Mute), XXX, XXX, XXX, XXX,
];

// The top row position above the Dvorak switch held a layer number where a
// keycode belonged, which sends nothing.  It is left as a no-op here.
#[rustfmt::skip]
static ADJUST_LAYOUT: LayoutTable = [
    ___, ___, ___, XXX, ___, ___,
    ___, ___, ___, ___, ___, ___,

    ___, ___, ___, DF_DVORAK, ___, ___,
    cu(custom::RGB_TOGGLE), cu(custom::RGB_SAT_UP), cu(custom::RGB_HUE_UP), cu(custom::RGB_VAL_UP), cu(custom::RGB_NEXT), ___,

    ___, ___, ___, DF_COLEMAK, ___, ___, ___, ___,
    ___, ___, ___, cu(custom::RGB_SAT_DOWN), cu(custom::RGB_HUE_DOWN), cu(custom::RGB_VAL_DOWN), cu(custom::RGB_PREV), ___,

    ___, ___, ___, ___, ___,
    ___, ___, ___, ___, ___,

    k(K::Mute), XXX, XXX, XXX, XXX,
    k(K::Mute), XXX, XXX, XXX, XXX,
];

#[rustfmt::skip]
static DVORAK_LAYOUT: LayoutTable = [
    k(K::Tab), k(K::Apostrophe), k(K::Comma), k(K::Dot), k(K::P), k(K::Y),
    k(K::F), k(K::G), k(K::C), k(K::R), k(K::L), k(K::DeleteBackspace),

    th(&CTL_ESC), k(K::A), k(K::O), k(K::E), k(K::U), k(K::I),
    k(K::D), k(K::H), k(K::T), k(K::N), k(K::S), th(&CTL_MINS),

    k(K::LeftShift), k(K::Semicolon), k(K::Q), k(K::J), k(K::K), k(K::X), k(K::LeftBrace), k(K::CapsLock),
    FKEYS, k(K::RightBrace), k(K::B), k(K::M), k(K::W), k(K::V), k(K::Z), k(K::RightShift),

    MO_ADJUST, k(K::LeftGUI), th(&ALT_ENT), k(K::Space), MO_NAV,
    MO_SYM, k(K::Space), k(K::RightAlt), k(K::RightGUI), k(K::Application),

    k(K::Mute), XXX, XXX, XXX, XXX,
    k(K::Mute), XXX, XXX, XXX, XXX,
];

/// The layers, in id order.
static LAYERS: [&LayoutTable; 7] = [
    &COLEMAK_DH_LAYOUT,
    &SYM_LAYOUT,
    &NAV_LAYOUT,
    &SELECT_LAYOUT,
    &FUNCTION_LAYOUT,
    &ADJUST_LAYOUT,
    &DVORAK_LAYOUT,
];

// Visual positions of the combo keys (Colemak-DH legends).
const POS_Q: usize = 1;
const POS_W: usize = 2;
const POS_F: usize = 3;
const POS_P: usize = 4;
const POS_L: usize = 7;
const POS_U: usize = 8;
const POS_Y: usize = 9;
const POS_Z: usize = 25;
const POS_X: usize = 26;
const POS_C: usize = 27;
const POS_D: usize = 28;

/// â: dead circumflex, then the vowel.
static A_CIRC: [MacroStep; 4] = [
    MacroStep::ClearMods(Mods::SHIFT.union(Mods::RSHIFT)),
    MacroStep::TapChord(K::Keyboard6, Mods::RALT),
    MacroStep::RestoreMods,
    MacroStep::Tap(K::A),
];

/// ê
static E_CIRC: [MacroStep; 4] = [
    MacroStep::ClearMods(Mods::SHIFT.union(Mods::RSHIFT)),
    MacroStep::TapChord(K::Keyboard6, Mods::RALT),
    MacroStep::RestoreMods,
    MacroStep::Tap(K::E),
];

static COMBOS: [([usize; 2], LogicalAction); 8] = [
    ([POS_W, POS_F], ralt(K::G)),                     // é
    ([POS_F, POS_P], ralt(K::F)),                     // è
    ([POS_Z, POS_X], ralt(K::Z)),                     // à
    ([POS_U, POS_Y], ralt(K::H)),                     // ù
    ([POS_X, POS_C], ralt(K::C)),                     // ç
    ([POS_C, POS_D], ralt(K::Keyboard5)),             // €
    ([POS_Q, POS_W], LogicalAction::Macro(&A_CIRC)),  // â
    ([POS_L, POS_U], LogicalAction::Macro(&E_CIRC)),  // ê
];

/// The physical key at a visual position.
pub fn key(pos: usize) -> PhysicalKey {
    layout_key(pos)
}

/// Build the default keymap.
pub fn keymap() -> Result<Keymap, ConfigError> {
    let mut keymap = Keymap::new();
    for layout in LAYERS {
        keymap.add_layer(layer_from_layout(layout))?;
    }
    for (positions, output) in &COMBOS {
        let keys = positions.map(key);
        keymap.add_combo(ComboDef::new(&keys, *output)?)?;
    }
    keymap.set_default_layer(COLEMAK_DH);
    Ok(keymap)
}
