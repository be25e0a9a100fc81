//! Tap-hold resolution
//!
//! A key bound to [`LogicalAction::TapHold`](crate::LogicalAction::TapHold)
//! does one thing when tapped and another when held.  When such a key goes
//! down, nothing is sent yet, the key becomes pending.  It stays pending
//! until one of:
//!
//! - it is released, which is a tap: the tap action is pressed and released.
//! - the hold timeout passes, which is a hold: the hold action is pressed, and
//!   released when the key is.
//! - another key goes down, which resolves according to the binding's
//!   [`Interrupt`] policy.
//!
//! Because any other press resolves the pending key, there is at most one
//! pending key at a time.
//!
//! A key pressed again shortly after being tapped repeats the tap (so that
//! holding it auto-repeats on the host) instead of considering hold again.

use crate::action::{Interrupt, TapHold};
use crate::keys::{PhysicalKey, NKEYS};
use crate::log::{debug, warn};
use crate::{elapsed, Millis};

/// Where a tap-hold key is in its resolution.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TapHoldState {
    Idle,
    /// Down since the given time, undecided.
    Pending(Millis),
    /// Resolved as a tap.  If `held`, the tap action is still down and goes
    /// up with the key.
    TapFired { held: bool },
    /// Resolved as a hold.  The hold action is down.
    HoldFired,
}

/// How a pending key got resolved.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Outcome {
    /// Send the tap action, press then release.
    Tap,
    /// Press the hold action.
    Hold,
}

#[derive(Clone, Copy, Debug)]
pub struct Resolved {
    pub key: PhysicalKey,
    pub binding: &'static TapHold,
    pub outcome: Outcome,
}

/// What happened when a tap-hold key went down.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Begin {
    /// Waiting to see whether this is a tap or a hold.
    Pending,
    /// Re-pressed right after a tap.  Press the tap action now, it is
    /// released with the key.
    Repeat,
}

/// What to do when a key goes up.
#[derive(Clone, Copy, Debug)]
pub enum Release {
    /// Released while pending: press and release the tap action.
    Tap(&'static TapHold),
    /// Release the hold action.
    Hold(&'static TapHold),
    /// Release the tap action that has been held down.
    Repeat(&'static TapHold),
    /// Already resolved, nothing left down.
    Done,
    /// Not a key this engine knows about.
    Untracked,
}

#[derive(Clone, Copy)]
struct Slot {
    state: TapHoldState,
    binding: Option<&'static TapHold>,
}

const IDLE: Slot = Slot {
    state: TapHoldState::Idle,
    binding: None,
};

/// Tap-hold state for every key.
pub struct TapHoldEngine {
    slots: [Slot; NKEYS],
    pending: Option<PhysicalKey>,
    /// The last key resolved as a tap by its release, and when.
    last_tap: Option<(PhysicalKey, Millis)>,
}

impl TapHoldEngine {
    pub fn new() -> TapHoldEngine {
        TapHoldEngine {
            slots: [IDLE; NKEYS],
            pending: None,
            last_tap: None,
        }
    }

    pub fn state(&self, key: PhysicalKey) -> TapHoldState {
        self.slots
            .get(key.index())
            .map(|s| s.state)
            .unwrap_or(TapHoldState::Idle)
    }

    /// The key waiting on a decision, if any.
    pub fn pending(&self) -> Option<PhysicalKey> {
        self.pending
    }

    /// A tap-hold key went down.  Any other pending key must have been
    /// resolved with [`interrupt`](Self::interrupt) first.
    pub fn begin(
        &mut self,
        key: PhysicalKey,
        binding: &'static TapHold,
        now: Millis,
        anti_repeat: Millis,
    ) -> Begin {
        let Some(slot) = self.slots.get_mut(key.index()) else {
            return Begin::Pending;
        };
        if slot.state != TapHoldState::Idle {
            warn!("tap-hold key {} pressed again in {:?}", key.id(), slot.state);
        }
        slot.binding = Some(binding);

        if let Some((last, at)) = self.last_tap {
            if last == key && elapsed(at, now) < anti_repeat {
                debug!("tap-hold {} repeat", key.id());
                slot.state = TapHoldState::TapFired { held: true };
                self.last_tap = None;
                return Begin::Repeat;
            }
        }

        slot.state = TapHoldState::Pending(now);
        self.pending = Some(key);
        Begin::Pending
    }

    /// Another key went down.  Resolve the pending key by its interrupt
    /// policy.
    pub fn interrupt(&mut self) -> Option<Resolved> {
        let key = self.pending.take()?;
        let slot = &mut self.slots[key.index()];
        let binding = slot.binding?;
        let outcome = match binding.interrupt {
            Interrupt::Hold => {
                slot.state = TapHoldState::HoldFired;
                Outcome::Hold
            }
            Interrupt::Tap => {
                slot.state = TapHoldState::TapFired { held: false };
                Outcome::Tap
            }
        };
        debug!("tap-hold {} interrupted: {:?}", key.id(), outcome);
        Some(Resolved {
            key,
            binding,
            outcome,
        })
    }

    /// Time passed.  A pending key that has been down for the hold timeout
    /// becomes a hold.
    pub fn expire(&mut self, now: Millis, hold_timeout: Millis) -> Option<Resolved> {
        let key = self.pending?;
        let slot = &mut self.slots[key.index()];
        let TapHoldState::Pending(start) = slot.state else {
            self.pending = None;
            return None;
        };
        if elapsed(start, now) < hold_timeout {
            return None;
        }
        let binding = slot.binding?;
        slot.state = TapHoldState::HoldFired;
        self.pending = None;
        debug!("tap-hold {} held", key.id());
        Some(Resolved {
            key,
            binding,
            outcome: Outcome::Hold,
        })
    }

    /// A key went up.
    pub fn release(&mut self, key: PhysicalKey, now: Millis) -> Release {
        let Some(slot) = self.slots.get_mut(key.index()) else {
            return Release::Untracked;
        };
        let Some(binding) = slot.binding else {
            return Release::Untracked;
        };
        let state = slot.state;
        *slot = IDLE;

        match state {
            TapHoldState::Idle => Release::Untracked,
            TapHoldState::Pending(_) => {
                self.pending = None;
                self.last_tap = Some((key, now));
                debug!("tap-hold {} tapped", key.id());
                Release::Tap(binding)
            }
            TapHoldState::TapFired { held: true } => Release::Repeat(binding),
            TapHoldState::TapFired { held: false } => Release::Done,
            TapHoldState::HoldFired => Release::Hold(binding),
        }
    }
}

impl Default for TapHoldEngine {
    fn default() -> Self {
        TapHoldEngine::new()
    }
}
