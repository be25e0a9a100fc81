//! Engine scenarios
//!
//! Each test is a script of events and time passing, interleaved with the
//! outputs expected at that point.  The keymap is a small one built here so
//! the scripts can use key numbers directly.

use arraydeque::ArrayDeque;
use hlc_keyboard::keymap::{ComboDef, ConfigError, Keymap, TRANSPARENT_LAYER};
use hlc_keyboard::{
    CanonicalAction, Engine, HostOs, KeyEvent, Keyboard, LayerState, LogicalAction, MacroStep,
    Millis, Mods, Output, PhysicalKey, TapHold,
};

static CTRL_A: TapHold = TapHold::mod_tap(Mods::CONTROL, Keyboard::A);
static CTRL_ESC: TapHold = TapHold::mod_tap(Mods::CONTROL, Keyboard::Escape).tap_on_interrupt();
static LT1_SPC: TapHold = TapHold::layer_tap(1, Keyboard::Space);

static E_CIRC: [MacroStep; 4] = [
    MacroStep::ClearMods(Mods::SHIFT.union(Mods::RSHIFT)),
    MacroStep::TapChord(Keyboard::Keyboard6, Mods::RALT),
    MacroStep::RestoreMods,
    MacroStep::Tap(Keyboard::E),
];

// Key numbers.
const HOME_A: u16 = 0;
const ESC_CTL: u16 = 1;
const B: u16 = 2;
const C: u16 = 3;
const D: u16 = 4;
const COPY: u16 = 5;
const MO1: u16 = 6;
const OS1: u16 = 7;
const SPC1: u16 = 8;
const SHIFT: u16 = 9;
const TG1: u16 = 10;
const F: u16 = 11;

/// B+C is escape, C+F types ê.  D is in no combo.
fn keymap() -> Keymap {
    let mut base = TRANSPARENT_LAYER;
    let mut set = |key: u16, action| base[key as usize] = action;
    set(HOME_A, LogicalAction::TapHold(&CTRL_A));
    set(ESC_CTL, LogicalAction::TapHold(&CTRL_ESC));
    set(B, LogicalAction::Basic(Keyboard::B));
    set(C, LogicalAction::Basic(Keyboard::C));
    set(D, LogicalAction::Basic(Keyboard::D));
    set(COPY, LogicalAction::Canonical(CanonicalAction::Copy));
    set(MO1, LogicalAction::LayerMomentary(1));
    set(OS1, LogicalAction::LayerOneShot(1));
    set(SPC1, LogicalAction::TapHold(&LT1_SPC));
    set(SHIFT, LogicalAction::Basic(Keyboard::LeftShift));
    set(TG1, LogicalAction::LayerToggle(1));
    set(F, LogicalAction::Basic(Keyboard::F));

    let mut upper = TRANSPARENT_LAYER;
    upper[D as usize] = LogicalAction::Basic(Keyboard::X);

    let mut keymap = Keymap::new();
    keymap.add_layer(base).unwrap();
    keymap.add_layer(upper).unwrap();
    keymap
        .add_combo(combo(&[B, C], LogicalAction::Basic(Keyboard::Escape)))
        .unwrap();
    keymap
        .add_combo(combo(&[C, F], LogicalAction::Macro(&E_CIRC)))
        .unwrap();
    keymap
}

fn combo(keys: &[u16], output: LogicalAction) -> ComboDef {
    let keys: Vec<PhysicalKey> = keys.iter().map(|&k| PhysicalKey::new(k)).collect();
    ComboDef::new(&keys, output).unwrap()
}

enum Step {
    Press(u16, Millis),
    Release(u16, Millis),
    /// Let time pass up to this point.
    Tick(Millis),
    Host(HostOs),
    /// The next output should be this one.
    Expect(Output),
}

fn down(code: Keyboard) -> Step {
    Step::Expect(Output::press(code))
}

fn up(code: Keyboard) -> Step {
    Step::Expect(Output::release(code))
}

fn layers(state: LayerState) -> Step {
    Step::Expect(Output::Layers(state))
}

/// Run the script, checking outputs in order, and that nothing is left over.
fn run(steps: &[Step]) -> Engine {
    let _ = env_logger::builder().is_test(true).try_init();

    let mut engine = Engine::new(keymap()).unwrap();
    let mut out: Vec<Output> = Vec::new();
    let mut seen = 0;

    for (n, step) in steps.iter().enumerate() {
        match *step {
            Step::Press(key, time) => engine.handle_event(KeyEvent::new(key, true, time), &mut out),
            Step::Release(key, time) => {
                engine.handle_event(KeyEvent::new(key, false, time), &mut out)
            }
            Step::Tick(time) => engine.tick(time, &mut out),
            Step::Host(os) => engine.set_host_os(os),
            Step::Expect(ref expect) => {
                match out.get(seen) {
                    Some(got) => assert_eq!(got, expect, "step {}", n),
                    None => panic!("step {}: expected {:?}, but none found", n, expect),
                }
                seen += 1;
            }
        }
    }

    if seen != out.len() {
        panic!("Expected no outputs to be pending, but found {:?}", &out[seen..]);
    }
    engine
}

#[test]
fn quick_tap() {
    run(&[
        Step::Press(HOME_A, 0),
        Step::Release(HOME_A, 50),
        down(Keyboard::A),
        up(Keyboard::A),
    ]);
}

#[test]
fn hold_by_timeout() {
    let engine = run(&[
        Step::Press(HOME_A, 0),
        Step::Tick(100),
        Step::Tick(250),
        down(Keyboard::LeftControl),
        Step::Release(HOME_A, 300),
        up(Keyboard::LeftControl),
    ]);
    assert!(!engine.is_waiting());
}

#[test]
fn hold_on_interrupt() {
    run(&[
        Step::Press(HOME_A, 0),
        Step::Press(D, 30),
        down(Keyboard::LeftControl),
        down(Keyboard::D),
        Step::Release(D, 60),
        up(Keyboard::D),
        Step::Release(HOME_A, 90),
        up(Keyboard::LeftControl),
    ]);
}

#[test]
fn tap_on_interrupt() {
    run(&[
        Step::Press(ESC_CTL, 0),
        Step::Press(D, 30),
        down(Keyboard::Escape),
        up(Keyboard::Escape),
        down(Keyboard::D),
        Step::Release(D, 40),
        up(Keyboard::D),
        // Already resolved, nothing more to send.
        Step::Release(ESC_CTL, 60),
    ]);
}

#[test]
fn hold_on_interrupt_by_combo_key() {
    run(&[
        Step::Press(HOME_A, 0),
        // C might still be part of a combo, but it is a press all the same.
        Step::Press(C, 10),
        down(Keyboard::LeftControl),
        // C went down while control was held.
        Step::Release(HOME_A, 40),
        down(Keyboard::C),
        up(Keyboard::LeftControl),
        Step::Release(C, 45),
        up(Keyboard::C),
    ]);
}

#[test]
fn tap_on_interrupt_by_combo_key() {
    run(&[
        Step::Press(ESC_CTL, 0),
        Step::Press(B, 180),
        down(Keyboard::Escape),
        up(Keyboard::Escape),
        // Past the hold timeout, but already resolved.
        Step::Tick(200),
        Step::Tick(230),
        down(Keyboard::B),
        Step::Release(B, 240),
        up(Keyboard::B),
        Step::Release(ESC_CTL, 260),
    ]);
}

#[test]
fn hold_across_clock_wrap() {
    run(&[
        Step::Press(HOME_A, Millis::MAX - 50),
        Step::Tick(100),
        Step::Tick(150),
        down(Keyboard::LeftControl),
        Step::Release(HOME_A, 200),
        up(Keyboard::LeftControl),
    ]);
}

#[test]
fn anti_repeat() {
    run(&[
        Step::Press(HOME_A, 0),
        Step::Release(HOME_A, 50),
        down(Keyboard::A),
        up(Keyboard::A),
        // Back down soon after the tap: the tap key is held, no hold.
        Step::Press(HOME_A, 100),
        down(Keyboard::A),
        Step::Tick(400),
        Step::Release(HOME_A, 450),
        up(Keyboard::A),
        // Long after, it is a tap-hold key again.
        Step::Press(HOME_A, 1000),
        Step::Tick(1200),
        down(Keyboard::LeftControl),
        Step::Release(HOME_A, 1300),
        up(Keyboard::LeftControl),
    ]);
}

#[test]
fn combo_in_any_order() {
    run(&[
        Step::Press(C, 0),
        Step::Press(B, 20),
        down(Keyboard::Escape),
        Step::Release(B, 40),
        up(Keyboard::Escape),
        Step::Release(C, 50),
        Step::Press(B, 100),
        Step::Press(C, 110),
        down(Keyboard::Escape),
        Step::Release(C, 130),
        up(Keyboard::Escape),
        Step::Release(B, 140),
    ]);
}

#[test]
fn partial_combo_replayed_on_expiry() {
    run(&[
        Step::Press(B, 0),
        Step::Tick(49),
        Step::Tick(50),
        down(Keyboard::B),
        Step::Release(B, 80),
        up(Keyboard::B),
    ]);
}

#[test]
fn partial_combo_replayed_on_release() {
    run(&[
        Step::Press(B, 0),
        Step::Release(B, 20),
        down(Keyboard::B),
        up(Keyboard::B),
    ]);
}

#[test]
fn partial_combo_replayed_on_other_key() {
    run(&[
        Step::Press(B, 0),
        Step::Press(D, 10),
        down(Keyboard::B),
        down(Keyboard::D),
        Step::Release(B, 30),
        up(Keyboard::B),
        Step::Release(D, 40),
        up(Keyboard::D),
    ]);
}

#[test]
fn accent_macro_keeps_shift() {
    run(&[
        Step::Press(SHIFT, 0),
        down(Keyboard::LeftShift),
        Step::Press(C, 10),
        Step::Press(F, 20),
        // Shift lifted for the dead key, then back for the letter.
        up(Keyboard::LeftShift),
        down(Keyboard::RightAlt),
        down(Keyboard::Keyboard6),
        up(Keyboard::Keyboard6),
        up(Keyboard::RightAlt),
        down(Keyboard::LeftShift),
        down(Keyboard::E),
        up(Keyboard::E),
        Step::Release(C, 40),
        Step::Release(F, 45),
        Step::Release(SHIFT, 50),
        up(Keyboard::LeftShift),
    ]);
}

#[test]
fn copy_follows_host() {
    run(&[
        Step::Press(COPY, 0),
        down(Keyboard::LeftControl),
        down(Keyboard::C),
        up(Keyboard::C),
        up(Keyboard::LeftControl),
        Step::Release(COPY, 10),
        Step::Host(HostOs::MacOs),
        Step::Press(COPY, 20),
        down(Keyboard::LeftGUI),
        down(Keyboard::C),
        up(Keyboard::C),
        up(Keyboard::LeftGUI),
        Step::Release(COPY, 30),
        // Unknown falls back to the Linux table.
        Step::Host(HostOs::Unknown),
        Step::Press(COPY, 40),
        down(Keyboard::LeftControl),
        down(Keyboard::C),
        up(Keyboard::C),
        up(Keyboard::LeftControl),
        Step::Release(COPY, 50),
    ]);
}

#[test]
fn momentary_layer() {
    let base = LayerState::new(0);
    let engine = run(&[
        Step::Press(MO1, 0),
        layers(base.with(1)),
        Step::Press(D, 10),
        down(Keyboard::X),
        Step::Release(MO1, 20),
        layers(base),
        // Released as it was pressed.
        Step::Release(D, 30),
        up(Keyboard::X),
        Step::Press(D, 40),
        down(Keyboard::D),
        Step::Release(D, 50),
        up(Keyboard::D),
    ]);
    assert_eq!(engine.layers(), base);
}

#[test]
fn toggle_layer() {
    let base = LayerState::new(0);
    let engine = run(&[
        Step::Press(TG1, 0),
        layers(base.with(1)),
        Step::Release(TG1, 10),
        Step::Press(D, 20),
        down(Keyboard::X),
        Step::Release(D, 30),
        up(Keyboard::X),
        Step::Press(TG1, 40),
        layers(base),
        Step::Release(TG1, 50),
        Step::Press(D, 60),
        down(Keyboard::D),
        Step::Release(D, 70),
        up(Keyboard::D),
    ]);
    assert_eq!(engine.layers(), base);
}

#[test]
fn one_shot_layer() {
    let base = LayerState::new(0);
    run(&[
        Step::Press(OS1, 0),
        layers(base.with(1)),
        Step::Release(OS1, 10),
        Step::Press(D, 20),
        down(Keyboard::X),
        layers(base),
        Step::Release(D, 30),
        up(Keyboard::X),
        Step::Press(D, 40),
        down(Keyboard::D),
        Step::Release(D, 50),
        up(Keyboard::D),
    ]);
}

#[test]
fn layer_tap() {
    let base = LayerState::new(0);
    run(&[
        Step::Press(SPC1, 0),
        Step::Press(D, 10),
        layers(base.with(1)),
        down(Keyboard::X),
        Step::Release(D, 20),
        up(Keyboard::X),
        Step::Release(SPC1, 30),
        layers(base),
        Step::Press(SPC1, 500),
        Step::Release(SPC1, 520),
        down(Keyboard::Space),
        up(Keyboard::Space),
    ]);
}

#[test]
fn stray_release_and_backwards_clock() {
    run(&[
        Step::Release(D, 0),
        Step::Press(HOME_A, 1000),
        // The clock going backwards doesn't make the key a hold.
        Step::Tick(900),
        Step::Release(HOME_A, 950),
        down(Keyboard::A),
        up(Keyboard::A),
    ]);
}

#[test]
fn bounded_output_queue() {
    let _ = env_logger::builder().is_test(true).try_init();

    let mut engine = Engine::new(keymap()).unwrap();
    let mut out: ArrayDeque<Output, 3> = ArrayDeque::new();
    // Copy is four reports, the last one doesn't fit.
    engine.handle_event(KeyEvent::new(COPY, true, 0), &mut out);
    engine.handle_event(KeyEvent::new(COPY, false, 10), &mut out);
    assert_eq!(
        out.iter().copied().collect::<Vec<_>>(),
        [
            Output::press(Keyboard::LeftControl),
            Output::press(Keyboard::C),
            Output::release(Keyboard::C),
        ]
    );

    // Once drained, there is room again.
    out.clear();
    engine.handle_event(KeyEvent::new(D, true, 20), &mut out);
    assert_eq!(out.pop_front(), Some(Output::press(Keyboard::D)));
}

#[test]
fn bad_keymaps_refused() {
    static EMPTY: [MacroStep; 0] = [];
    static SHIFT_A: TapHold = TapHold::mod_tap(Mods::SHIFT, Keyboard::A);

    let mut keymap = keymap();
    keymap.set_default_layer(4);
    assert_eq!(Engine::new(keymap).err(), Some(ConfigError::DefaultLayerOutOfRange(4)));

    let mut base = TRANSPARENT_LAYER;
    base[0] = LogicalAction::LayerToggle(3);
    let mut keymap = Keymap::new();
    keymap.add_layer(base).unwrap();
    assert_eq!(Engine::new(keymap).err(), Some(ConfigError::UnknownLayer(3)));

    let mut base = TRANSPARENT_LAYER;
    base[0] = LogicalAction::Macro(&EMPTY);
    let mut keymap = Keymap::new();
    keymap.add_layer(base).unwrap();
    assert_eq!(Engine::new(keymap).err(), Some(ConfigError::EmptyMacro));

    let mut keymap = Keymap::new();
    keymap.add_layer(TRANSPARENT_LAYER).unwrap();
    keymap
        .add_combo(combo(&[1, 2], LogicalAction::TapHold(&SHIFT_A)))
        .unwrap();
    assert_eq!(Engine::new(keymap).err(), Some(ConfigError::TapHoldInCombo));

    assert_eq!(
        ComboDef::new(&[PhysicalKey::new(1)], LogicalAction::NoOp).err(),
        Some(ConfigError::ComboSize(1))
    );
}
