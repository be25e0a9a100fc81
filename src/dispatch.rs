//! Action dispatch
//!
//! The dispatcher takes a resolved [`LogicalAction`] going down or up and
//! turns it into [`Output`] events.  It keeps a reference count for every
//! keycode, so that several sources holding the same key or modifier (a
//! held modifier plus a chord using it, or two keys with the same binding)
//! only send the down on the first and the up on the last.
//!
//! Canonical actions are looked up in the remap table for the current host
//! at the moment they are dispatched, and typed as a unit: modifiers down,
//! key tapped, modifiers up.

use crate::action::{LogicalAction, MacroStep};
use crate::host::{KeyCombo, RemapTable};
use crate::layers::{Holder, LayerStack};
use crate::log::{debug, warn};
use crate::{Keyboard, Mods, Output, OutputQueue};

/// What the dispatcher needs from the rest of the engine for one action.
pub struct Context<'a> {
    pub layers: &'a mut LayerStack,
    /// The remap table for the host, as of this action.
    pub remap: &'a RemapTable,
    pub out: &'a mut dyn OutputQueue,
}

impl Context<'_> {
    fn layers_changed(&mut self, changed: bool) {
        if changed {
            self.out.push(Output::Layers(self.layers.state()));
        }
    }
}

pub struct Dispatcher {
    /// How many holders each keycode has.
    refs: [u8; 256],
    /// Modifiers lifted by a macro, to be put back.
    cleared: Mods,
}

impl Dispatcher {
    pub fn new() -> Dispatcher {
        Dispatcher {
            refs: [0; 256],
            cleared: Mods::empty(),
        }
    }

    /// The modifiers currently down, as the host sees them.
    pub fn mods(&self) -> Mods {
        let mut mods = Mods::empty();
        for code in Mods::all().keycodes() {
            if self.is_down(code) {
                mods |= Mods::from_keycode(code);
            }
        }
        mods & !self.cleared
    }

    pub fn is_down(&self, code: Keyboard) -> bool {
        self.refs[code as usize] > 0
    }

    /// An action going down, on behalf of `holder`.
    pub fn press(&mut self, action: LogicalAction, holder: Holder, ctx: &mut Context<'_>) {
        match action {
            LogicalAction::Transparent | LogicalAction::NoOp => (),
            LogicalAction::Basic(code) => self.acquire(code, ctx.out),
            LogicalAction::Chord(code, mods) => {
                self.acquire_mods(mods, ctx.out);
                self.acquire(code, ctx.out);
            }
            LogicalAction::Modifier(mods) => self.acquire_mods(mods, ctx.out),
            LogicalAction::LayerMomentary(layer) => {
                let changed = ctx.layers.push_momentary(holder, layer);
                ctx.layers_changed(changed);
            }
            LogicalAction::LayerToggle(layer) => {
                let changed = ctx.layers.toggle(layer);
                ctx.layers_changed(changed);
            }
            LogicalAction::LayerOneShot(layer) => {
                let changed = ctx.layers.one_shot(layer);
                ctx.layers_changed(changed);
            }
            LogicalAction::DefaultLayerSwitch(layer) => {
                let changed = ctx.layers.set_default(layer);
                ctx.layers_changed(changed);
            }
            LogicalAction::TapHold(_) => {
                warn!("tap-hold reached the dispatcher unresolved");
            }
            LogicalAction::Canonical(canon) => match ctx.remap.lookup(canon) {
                Some(combo) => self.type_combo(combo, ctx.out),
                None => warn!("no mapping for {:?}, dropped", canon),
            },
            LogicalAction::Macro(steps) => self.run_macro(steps, ctx),
            LogicalAction::Custom(id) => ctx.out.push(Output::Custom { id, pressed: true }),
        }

        if !action.is_layer() {
            let changed = ctx.layers.consume_one_shot();
            ctx.layers_changed(changed);
        }
    }

    /// An action going up.  This must be the same action that went down for
    /// this holder.
    pub fn release(&mut self, action: LogicalAction, holder: Holder, ctx: &mut Context<'_>) {
        match action {
            LogicalAction::Basic(code) => self.release_code(code, ctx.out),
            LogicalAction::Chord(code, mods) => {
                self.release_code(code, ctx.out);
                self.release_mods(mods, ctx.out);
            }
            LogicalAction::Modifier(mods) => self.release_mods(mods, ctx.out),
            LogicalAction::LayerMomentary(layer) => {
                let changed = ctx.layers.pop_momentary(holder, layer);
                ctx.layers_changed(changed);
            }
            LogicalAction::Custom(id) => ctx.out.push(Output::Custom { id, pressed: false }),
            // Everything else happens entirely on the press.
            _ => (),
        }
    }

    /// Press then release.
    pub fn tap(&mut self, action: LogicalAction, holder: Holder, ctx: &mut Context<'_>) {
        self.press(action, holder, ctx);
        self.release(action, holder, ctx);
    }

    fn acquire(&mut self, code: Keyboard, out: &mut dyn OutputQueue) {
        let count = &mut self.refs[code as usize];
        if *count == u8::MAX {
            warn!("too many holders of {:?}", code);
            return;
        }
        *count += 1;
        if *count == 1 {
            out.push(Output::press(code));
        }
    }

    fn release_code(&mut self, code: Keyboard, out: &mut dyn OutputQueue) {
        let count = &mut self.refs[code as usize];
        match *count {
            0 => warn!("release of {:?}, which isn't down", code),
            1 => {
                *count = 0;
                let mods = Mods::from_keycode(code);
                if self.cleared.intersects(mods) {
                    // Already up on the host, and not to be put back.
                    self.cleared.remove(mods);
                } else {
                    out.push(Output::release(code));
                }
            }
            _ => *count -= 1,
        }
    }

    fn acquire_mods(&mut self, mods: Mods, out: &mut dyn OutputQueue) {
        for code in mods.keycodes() {
            self.acquire(code, out);
        }
    }

    fn release_mods(&mut self, mods: Mods, out: &mut dyn OutputQueue) {
        for code in mods.keycodes().rev() {
            self.release_code(code, out);
        }
    }

    /// Tap a key.  If the key is already down, it is lifted first so the host
    /// still sees a new press.
    fn tap_code(&mut self, code: Keyboard, out: &mut dyn OutputQueue) {
        if self.is_down(code) {
            out.push(Output::release(code));
            out.push(Output::press(code));
        } else {
            out.push(Output::press(code));
            out.push(Output::release(code));
        }
    }

    fn type_combo(&mut self, combo: KeyCombo, out: &mut dyn OutputQueue) {
        self.acquire_mods(combo.mods, out);
        self.tap_code(combo.key, out);
        self.release_mods(combo.mods, out);
    }

    /// Lift whichever of `mods` are down, remembering them.
    fn clear_mods(&mut self, mods: Mods, out: &mut dyn OutputQueue) {
        let lift = self.mods() & mods;
        for code in lift.keycodes().rev() {
            out.push(Output::release(code));
        }
        self.cleared |= lift;
    }

    /// Put back exactly what `clear_mods` lifted.
    fn restore_mods(&mut self, out: &mut dyn OutputQueue) {
        for code in self.cleared.keycodes() {
            out.push(Output::press(code));
        }
        self.cleared = Mods::empty();
    }

    /// Macros run to completion within a single event, so nothing else can
    /// change the modifiers between a clear and its restore.
    fn run_macro(&mut self, steps: &[MacroStep], ctx: &mut Context<'_>) {
        debug!("macro of {} steps", steps.len());
        for step in steps {
            match *step {
                MacroStep::Tap(code) => self.tap_code(code, ctx.out),
                MacroStep::TapChord(code, mods) => {
                    self.type_combo(KeyCombo::new(mods, code), ctx.out)
                }
                MacroStep::Press(code) => self.acquire(code, ctx.out),
                MacroStep::Release(code) => self.release_code(code, ctx.out),
                MacroStep::ClearMods(mods) => self.clear_mods(mods, ctx.out),
                MacroStep::RestoreMods => self.restore_mods(ctx.out),
                MacroStep::Canonical(canon) => match ctx.remap.lookup(canon) {
                    Some(combo) => self.type_combo(combo, ctx.out),
                    None => warn!("no mapping for {:?}, dropped", canon),
                },
            }
        }
        if !self.cleared.is_empty() {
            self.restore_mods(ctx.out);
        }
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Dispatcher::new()
    }
}
