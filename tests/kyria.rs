//! Tests for the Kyria layout
//!
//! These run the real default keymap, addressing keys by their visual
//! position, to check that the thumb layer-taps, home row modifiers, combos
//! and base layer switching all come together.

use hlc_keyboard::keys::layout_key;
use hlc_keyboard::layout::kyria::{self, ADJUST, COLEMAK_DH, DVORAK, NAV, SELECT};
use hlc_keyboard::{Engine, HostOs, KeyEvent, Keyboard, LayerState, Millis, Output};

// Visual positions.
const Q: usize = 1;
const W: usize = 2;
const F: usize = 3;
const A: usize = 13;
const S: usize = 15;
const T: usize = 16;
const C: usize = 27;
const THUMB_OUTER: usize = 40;
const SELECT_SPC: usize = 43;
const NAV_TAB: usize = 44;
const LEFT_ENCODER: usize = 50;

enum Step {
    Press(usize, Millis),
    Release(usize, Millis),
    Tick(Millis),
    Host(HostOs),
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

fn run(steps: &[Step]) -> Engine {
    let _ = env_logger::builder().is_test(true).try_init();

    let mut engine = Engine::new(kyria::keymap().unwrap()).unwrap();
    let mut out: Vec<Output> = Vec::new();
    let mut seen = 0;

    for (n, step) in steps.iter().enumerate() {
        match *step {
            Step::Press(pos, time) => {
                engine.handle_event(KeyEvent::press(layout_key(pos), time), &mut out)
            }
            Step::Release(pos, time) => {
                engine.handle_event(KeyEvent::release(layout_key(pos), time), &mut out)
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
fn thumb_tap_is_space() {
    run(&[
        Step::Press(SELECT_SPC, 0),
        Step::Release(SELECT_SPC, 100),
        down(Keyboard::Space),
        up(Keyboard::Space),
    ]);
}

#[test]
fn home_row_shift() {
    run(&[
        Step::Press(T, 0),
        Step::Press(A, 30),
        down(Keyboard::LeftShift),
        down(Keyboard::A),
        Step::Release(A, 60),
        up(Keyboard::A),
        Step::Release(T, 80),
        up(Keyboard::LeftShift),
        // On its own it is just a T.
        Step::Press(T, 500),
        Step::Release(T, 560),
        down(Keyboard::T),
        up(Keyboard::T),
    ]);
}

#[test]
fn home_row_ctrl_with_combo_key() {
    run(&[
        Step::Press(S, 0),
        // C is in the ç and € combos.
        Step::Press(C, 20),
        down(Keyboard::LeftControl),
        Step::Release(C, 50),
        down(Keyboard::C),
        up(Keyboard::C),
        Step::Release(S, 80),
        up(Keyboard::LeftControl),
    ]);
}

#[test]
fn switch_to_dvorak_and_back() {
    let colemak = LayerState::new(COLEMAK_DH);
    let dvorak = LayerState::new(DVORAK);
    let engine = run(&[
        Step::Press(SELECT_SPC, 0),
        Step::Tick(250),
        layers(colemak.with(SELECT)),
        Step::Press(THUMB_OUTER, 300),
        layers(colemak.with(SELECT).with(ADJUST)),
        Step::Press(S, 320),
        layers(dvorak.with(SELECT).with(ADJUST)),
        Step::Release(S, 340),
        Step::Release(THUMB_OUTER, 360),
        layers(dvorak.with(SELECT)),
        Step::Release(SELECT_SPC, 380),
        layers(dvorak),
        // Where Q was.
        Step::Press(Q, 400),
        Step::Release(Q, 420),
        down(Keyboard::Apostrophe),
        up(Keyboard::Apostrophe),
    ]);
    assert_eq!(engine.layers(), dvorak);
}

#[test]
fn accent_combo() {
    run(&[
        Step::Press(F, 0),
        Step::Press(W, 15),
        down(Keyboard::RightAlt),
        down(Keyboard::G),
        Step::Release(W, 60),
        up(Keyboard::G),
        up(Keyboard::RightAlt),
        Step::Release(F, 70),
    ]);
}

#[test]
fn nav_word_movement_follows_host() {
    let colemak = LayerState::new(COLEMAK_DH);
    run(&[
        Step::Press(NAV_TAB, 0),
        Step::Tick(200),
        layers(colemak.with(NAV)),
        // W is a combo key, so it goes out once released.
        Step::Press(W, 250),
        Step::Release(W, 270),
        down(Keyboard::LeftControl),
        down(Keyboard::LeftArrow),
        up(Keyboard::LeftArrow),
        up(Keyboard::LeftControl),
        Step::Host(HostOs::MacOs),
        Step::Press(W, 300),
        Step::Tick(350),
        down(Keyboard::LeftAlt),
        down(Keyboard::LeftArrow),
        up(Keyboard::LeftArrow),
        up(Keyboard::LeftAlt),
        Step::Release(W, 360),
        Step::Press(F, 400),
        Step::Release(F, 410),
        down(Keyboard::UpArrow),
        up(Keyboard::UpArrow),
        Step::Release(NAV_TAB, 500),
        layers(colemak),
    ]);
}

#[test]
fn encoder_mutes() {
    run(&[
        Step::Press(LEFT_ENCODER, 0),
        down(Keyboard::Mute),
        Step::Release(LEFT_ENCODER, 20),
        up(Keyboard::Mute),
    ]);
}
