//! Combo detection
//!
//! A combo is a set of physical keys that, pressed together, produce a single
//! action of their own instead of each key's action.  The detector sits in
//! front of everything else, so that it sees physical keys before layers or
//! tap-hold get involved.
//!
//! Presses of keys that could start or continue a combo are held back in a
//! small buffer.  The attempt ends in one of these ways:
//!
//! - Every key of some combo is down: the combo fires.  The first combo (in
//!   definition order) to complete wins, its keys are consumed, and their
//!   individual actions are never sent.
//! - The window runs out, a buffered key is released, or a key that can't
//!   continue any candidate combo is pressed: the attempt is abandoned, and
//!   the buffered presses are replayed, in order, as ordinary presses.
//!
//! A consumed key can't take part in another combo until it is released.  The
//! combo's output is released when the first of its keys comes up.

use arraydeque::ArrayDeque;
use arrayvec::ArrayVec;

use crate::keymap::{ComboDef, MAX_COMBOS, MAX_COMBO_KEYS};
use crate::keys::{KeySet, PhysicalKey};
use crate::log::{debug, warn};
use crate::{elapsed, KeyEvent, Millis};

/// The state of a single combo.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ComboState {
    Idle,
    /// Some of the keys are down, since `start`.
    Armed { down: KeySet, start: Millis },
    /// Fired.  `held` are the member keys still down, and `active` is whether
    /// the output is still pressed.
    Fired { held: KeySet, active: bool },
}

/// What the detector hands on to the rest of the engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Forward {
    /// An ordinary key event (possibly a replayed press).
    Key(KeyEvent),
    /// Press the output of the combo with this index.
    ComboPress { index: u8, time: Millis },
    /// Release the output of the combo with this index.
    ComboRelease { index: u8, time: Millis },
}

/// The most that a single event can produce: the replay of a full buffer,
/// the event itself, and one combo event.
pub type Forwards = ArrayVec<Forward, { MAX_COMBO_KEYS + 2 }>;

pub struct ComboDetector {
    states: ArrayVec<ComboState, MAX_COMBOS>,
    /// Presses held back, in arrival order.
    buffer: ArrayDeque<KeyEvent, MAX_COMBO_KEYS>,
    /// Keys belonging to fired combos, until released.
    consumed: KeySet,
}

impl ComboDetector {
    pub fn new(combos: &[ComboDef]) -> ComboDetector {
        let mut states = ArrayVec::new();
        for _ in combos.iter().take(MAX_COMBOS) {
            states.push(ComboState::Idle);
        }
        ComboDetector {
            states,
            buffer: ArrayDeque::new(),
            consumed: KeySet::empty(),
        }
    }

    pub fn state(&self, index: usize) -> Option<ComboState> {
        self.states.get(index).copied()
    }

    /// Is anything being held back.
    pub fn is_buffering(&self) -> bool {
        !self.buffer.is_empty()
    }

    /// Is this key's press being held back.
    pub fn is_buffered(&self, key: PhysicalKey) -> bool {
        self.buffer.iter().any(|ev| ev.key == key)
    }

    /// Give up on the current attempt now, returning the held back presses.
    pub fn flush(&mut self) -> Forwards {
        let mut out = Forwards::new();
        self.abandon(&mut out);
        out
    }

    fn buffered_keys(&self) -> KeySet {
        let mut keys = KeySet::empty();
        for ev in self.buffer.iter() {
            keys.insert(ev.key);
        }
        keys
    }

    fn start(&self) -> Option<Millis> {
        self.buffer.front().map(|ev| ev.time)
    }

    /// Process an event, returning what should be passed on.
    pub fn handle_event(&mut self, combos: &[ComboDef], event: KeyEvent) -> Forwards {
        let mut out = Forwards::new();
        if event.pressed {
            self.press(combos, event, &mut out);
        } else {
            self.release(event, &mut out);
        }
        out
    }

    /// Abandon the current attempt if its window has run out.
    pub fn expire(&mut self, now: Millis, combo_window: Millis) -> Forwards {
        let mut out = Forwards::new();
        if let Some(start) = self.start() {
            if elapsed(start, now) >= combo_window {
                debug!("combo window expired");
                self.abandon(&mut out);
            }
        }
        out
    }

    fn press(&mut self, combos: &[ComboDef], event: KeyEvent, out: &mut Forwards) {
        let mut down = self.buffered_keys().with(event.key);
        if !self.has_candidate(combos, down) {
            if self.buffer.is_empty() {
                push(out, Forward::Key(event));
                return;
            }
            self.abandon(out);
            down = KeySet::empty().with(event.key);
            if !self.has_candidate(combos, down) {
                push(out, Forward::Key(event));
                return;
            }
        }

        if self.buffer.push_back(event).is_err() {
            // Can't happen, combos are never larger than the buffer.
            warn!("combo buffer full");
            self.abandon(out);
            push(out, Forward::Key(event));
            return;
        }
        let start = self.start().unwrap_or(event.time);

        let mut fire = None;
        for (i, combo) in combos.iter().enumerate().take(self.states.len()) {
            if matches!(self.states[i], ComboState::Fired { .. }) {
                continue;
            }
            if self.eligible(combo, down) {
                self.states[i] = ComboState::Armed { down, start };
                if fire.is_none() && combo.keys() == down {
                    fire = Some(i);
                }
            } else {
                self.states[i] = ComboState::Idle;
            }
        }

        if let Some(index) = fire {
            debug!("combo {} fired", index);
            self.buffer.clear();
            self.disarm();
            let keys = combos[index].keys();
            self.consumed = self.consumed.union(keys);
            self.states[index] = ComboState::Fired {
                held: keys,
                active: true,
            };
            push(
                out,
                Forward::ComboPress {
                    index: index as u8,
                    time: event.time,
                },
            );
        }
    }

    fn release(&mut self, event: KeyEvent, out: &mut Forwards) {
        if self.buffer.iter().any(|ev| ev.key == event.key) {
            debug!("combo key {} released early", event.key.id());
            self.abandon(out);
            push(out, Forward::Key(event));
            return;
        }

        if !self.consumed.contains(event.key) {
            push(out, Forward::Key(event));
            return;
        }
        self.consumed.remove(event.key);

        for (i, state) in self.states.iter_mut().enumerate() {
            let ComboState::Fired { held, active } = state else {
                continue;
            };
            if !held.contains(event.key) {
                continue;
            }
            held.remove(event.key);
            if *active {
                *active = false;
                push(
                    out,
                    Forward::ComboRelease {
                        index: i as u8,
                        time: event.time,
                    },
                );
            }
            if held.is_empty() {
                *state = ComboState::Idle;
            }
            return;
        }
        warn!("consumed key {} not in any fired combo", event.key.id());
    }

    /// Could `down` still grow into some combo.
    fn has_candidate(&self, combos: &[ComboDef], down: KeySet) -> bool {
        combos
            .iter()
            .zip(self.states.iter())
            .any(|(combo, state)| {
                !matches!(state, ComboState::Fired { .. }) && self.eligible(combo, down)
            })
    }

    fn eligible(&self, combo: &ComboDef, down: KeySet) -> bool {
        down.is_subset(combo.keys()) && !combo.keys().intersects(self.consumed)
    }

    fn disarm(&mut self) {
        for state in self.states.iter_mut() {
            if let ComboState::Armed { .. } = state {
                *state = ComboState::Idle;
            }
        }
    }

    /// Give up on the current attempt, replaying what was held back.
    fn abandon(&mut self, out: &mut Forwards) {
        if !self.buffer.is_empty() {
            debug!("combo abandoned, replaying {} keys", self.buffer.len());
        }
        while let Some(ev) = self.buffer.pop_front() {
            push(out, Forward::Key(ev));
        }
        self.disarm();
    }
}

fn push(out: &mut Forwards, fwd: Forward) {
    if out.try_push(fwd).is_err() {
        warn!("combo output overflow, dropping {:?}", fwd);
    }
}
