//! The key handling engine
//!
//! Events from the scanner flow through the combo detector, are resolved
//! against the active layers, go through tap-hold resolution, and are
//! dispatched to the output queue.  Nothing in here blocks: anything waiting
//! on time (a pending tap-hold key, a partial combo) is kept as state and
//! checked again on each [`Engine::tick`] and each new event.
//!
//! The engine is driven from a single thread.  The host OS can be read, and
//! set, through a shared reference.

use crate::action::LogicalAction;
use crate::combo::{ComboDetector, Forward};
use crate::dispatch::{Context, Dispatcher};
use crate::host::{HostContext, HostOs};
use crate::keymap::{resolve, ConfigError, Keymap};
use crate::keys::{PhysicalKey, NKEYS};
use crate::layers::{Holder, LayerStack, LayerState};
use crate::log::{debug, info, warn};
use crate::settings::Settings;
use crate::tap_hold::{Begin, Outcome, Release, Resolved, TapHoldEngine, TapHoldState};
use crate::{KeyEvent, Millis, Mods, OutputQueue};

#[derive(Clone, Copy)]
enum Edge {
    Press,
    Release,
    Tap,
}

pub struct Engine {
    keymap: Keymap,
    layers: LayerStack,
    combos: ComboDetector,
    tap_hold: TapHoldEngine,
    dispatch: Dispatcher,
    host: HostContext,
    /// The action each plain key went down with, so it comes up the same
    /// regardless of layer changes in between.
    held: [Option<LogicalAction>; NKEYS],
}

impl Engine {
    /// Build an engine for a keymap.  The keymap is checked, and a bad one is
    /// refused.
    pub fn new(keymap: Keymap) -> Result<Engine, ConfigError> {
        keymap.validate()?;
        info!(
            "keymap: {} layers, {} combos",
            keymap.layer_count(),
            keymap.combos().len()
        );
        Ok(Engine {
            layers: LayerStack::new(keymap.default_layer()),
            combos: ComboDetector::new(keymap.combos()),
            tap_hold: TapHoldEngine::new(),
            dispatch: Dispatcher::new(),
            host: HostContext::new(),
            held: [None; NKEYS],
            keymap,
        })
    }

    /// Build an engine with the user's stored settings applied.
    pub fn new_with_settings(mut keymap: Keymap, settings: &Settings) -> Result<Engine, ConfigError> {
        settings.apply(&mut keymap);
        let engine = Engine::new(keymap)?;
        if let Some(os) = settings.host.os_override {
            engine.set_host_os(os);
        }
        Ok(engine)
    }

    /// Report the detected host.  Calling this again with the same host does
    /// nothing.  Actions already sent aren't affected, the next canonical
    /// action uses the new host's table.
    pub fn set_host_os(&self, os: HostOs) {
        self.host.set(os);
    }

    pub fn host(&self) -> HostOs {
        self.host.get()
    }

    pub fn layers(&self) -> LayerState {
        self.layers.state()
    }

    pub fn keymap(&self) -> &Keymap {
        &self.keymap
    }

    /// Is anything waiting on time to pass.  When this is false, ticks can be
    /// skipped until the next event.
    pub fn is_waiting(&self) -> bool {
        self.combos.is_buffering() || self.tap_hold.pending().is_some()
    }

    /// Handle a single event from the scanner.
    pub fn handle_event(&mut self, event: KeyEvent, out: &mut dyn OutputQueue) {
        if !event.key.is_valid() {
            warn!("event for unknown key {}, ignored", event.key.id());
            return;
        }
        // Anything that timed out before this event happens first.
        self.tick(event.time, out);

        if event.pressed {
            // A press interrupts a pending tap-hold key on arrival, even if
            // the combo detector holds the press back.
            if matches!(self.tap_hold.pending(), Some(key) if key != event.key) {
                if let Some(res) = self.tap_hold.interrupt() {
                    self.resolved(res, out);
                }
            }
        } else if self.combos.is_buffering()
            && !self.combos.is_buffered(event.key)
            && self.release_changes_context(event.key)
        {
            // Held back presses happened while this modifier or layer was
            // still down, so they go out before it is released.
            for fwd in self.combos.flush() {
                self.forward(fwd, out);
            }
        }

        let fwds = self.combos.handle_event(self.keymap.combos(), event);
        for fwd in fwds {
            self.forward(fwd, out);
        }
    }

    /// Let time pass, resolving anything that has been waiting too long.
    pub fn tick(&mut self, now: Millis, out: &mut dyn OutputQueue) {
        let timing = self.keymap.timing;
        let fwds = self.combos.expire(now, timing.combo_window_ms as Millis);
        for fwd in fwds {
            self.forward(fwd, out);
        }
        if let Some(res) = self.tap_hold.expire(now, timing.hold_timeout_ms as Millis) {
            self.resolved(res, out);
        }
    }

    fn forward(&mut self, fwd: Forward, out: &mut dyn OutputQueue) {
        match fwd {
            Forward::Key(ev) if ev.pressed => self.press_key(ev.key, ev.time, out),
            Forward::Key(ev) => self.release_key(ev.key, ev.time, out),
            Forward::ComboPress { index, .. } => {
                // A combo going down is a key press as far as a pending
                // tap-hold is concerned.
                if let Some(res) = self.tap_hold.interrupt() {
                    self.resolved(res, out);
                }
                if let Some(combo) = self.keymap.combos().get(index as usize) {
                    let action = combo.output;
                    self.send(action, Holder::Combo(index), Edge::Press, out);
                }
            }
            Forward::ComboRelease { index, .. } => {
                if let Some(combo) = self.keymap.combos().get(index as usize) {
                    let action = combo.output;
                    self.send(action, Holder::Combo(index), Edge::Release, out);
                }
            }
        }
    }

    /// Does releasing this key lift a modifier or a layer.
    fn release_changes_context(&self, key: PhysicalKey) -> bool {
        if self.tap_hold.state(key) == TapHoldState::HoldFired {
            return true;
        }
        match self.held.get(key.index()).copied().flatten() {
            Some(LogicalAction::Modifier(_)) | Some(LogicalAction::LayerMomentary(_)) => true,
            Some(LogicalAction::Basic(code)) => !Mods::from_keycode(code).is_empty(),
            _ => false,
        }
    }

    fn press_key(&mut self, key: PhysicalKey, time: Millis, out: &mut dyn OutputQueue) {
        if self.held[key.index()].is_some() || self.tap_hold.state(key) != TapHoldState::Idle {
            warn!("key {} pressed while already down, ignored", key.id());
            return;
        }

        if let Some(res) = self.tap_hold.interrupt() {
            self.resolved(res, out);
        }

        let action = resolve(&self.keymap, key, &self.layers.state());
        debug!("key {} -> {:?}", key.id(), action);
        match action {
            LogicalAction::TapHold(binding) => {
                let anti_repeat = self.keymap.timing.anti_repeat_ms as Millis;
                if self.tap_hold.begin(key, binding, time, anti_repeat) == Begin::Repeat {
                    self.send(binding.tap, Holder::Key(key), Edge::Press, out);
                }
            }
            action => {
                self.held[key.index()] = Some(action);
                self.send(action, Holder::Key(key), Edge::Press, out);
            }
        }
    }

    fn release_key(&mut self, key: PhysicalKey, time: Millis, out: &mut dyn OutputQueue) {
        let holder = Holder::Key(key);
        match self.tap_hold.release(key, time) {
            Release::Tap(binding) => self.send(binding.tap, holder, Edge::Tap, out),
            Release::Hold(binding) => self.send(binding.hold, holder, Edge::Release, out),
            Release::Repeat(binding) => self.send(binding.tap, holder, Edge::Release, out),
            Release::Done => (),
            Release::Untracked => match self.held[key.index()].take() {
                Some(action) => self.send(action, holder, Edge::Release, out),
                None => warn!("release of key {} with no press state, ignored", key.id()),
            },
        }
    }

    fn resolved(&mut self, res: Resolved, out: &mut dyn OutputQueue) {
        let holder = Holder::Key(res.key);
        match res.outcome {
            Outcome::Tap => self.send(res.binding.tap, holder, Edge::Tap, out),
            Outcome::Hold => self.send(res.binding.hold, holder, Edge::Press, out),
        }
    }

    /// Dispatch, against the remap table of the host as it is right now.
    fn send(&mut self, action: LogicalAction, holder: Holder, edge: Edge, out: &mut dyn OutputQueue) {
        let mut ctx = Context {
            layers: &mut self.layers,
            remap: self.keymap.remap.for_host(self.host.get()),
            out,
        };
        match edge {
            Edge::Press => self.dispatch.press(action, holder, &mut ctx),
            Edge::Release => self.dispatch.release(action, holder, &mut ctx),
            Edge::Tap => self.dispatch.tap(action, holder, &mut ctx),
        }
    }
}
