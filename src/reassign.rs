//! Interactive rebind workflow
//!
//! While a capture is active the host routes raw input here instead of
//! through normal dispatch. The first qualifying event becomes a trigger
//! for the slot being rebound; if that gesture is already committed
//! elsewhere in the context, the caller gets a [`CaptureOutcome::Conflict`]
//! to resolve with the user before anything changes.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::debug;

use crate::association::MAX_BINDINGS;
use crate::binding::Trigger;
use crate::context::ControlContext;
use crate::error::ControlError;
use crate::event::{KeyEvent, KeyPhase, MouseEvent, WheelEvent};
use crate::listener::{ListenerId, ListenerKind};
use crate::types::{MouseEventKind, WheelDirection};

/// Observer of override removals, e.g. a settings panel showing the
/// binding that was just taken away from another control
pub trait ReassignListener: Send + Sync {
    fn binding_overridden(&self, notice: &OverrideNotice);
}

/// Details of a binding removed from its previous owner during an override
#[derive(Clone, Debug)]
pub struct OverrideNotice {
    pub listener: ListenerId,
    pub title: String,
    pub slot: usize,
    pub trigger: Trigger,
}

/// Result of a completed capture
#[derive(Debug)]
pub enum CaptureOutcome {
    /// The gesture was free and has been committed
    Assigned { trigger: Trigger },
    /// The gesture is already bound elsewhere; resolve via
    /// [`BindingCapture::confirm`] or [`BindingCapture::decline`]
    Conflict(PendingAssignment),
}

/// A captured gesture waiting on user confirmation of an override
#[derive(Debug)]
pub struct PendingAssignment {
    trigger: Trigger,
    target: (ListenerId, usize),
    conflict: (ListenerId, usize),
    conflict_title: String,
}

impl PendingAssignment {
    pub fn trigger(&self) -> Trigger {
        self.trigger
    }

    /// Title of the control currently owning the gesture
    pub fn conflicting_title(&self) -> &str {
        &self.conflict_title
    }
}

#[derive(Clone, Copy, Debug)]
enum CaptureState {
    Idle,
    Capturing { listener: ListenerId, slot: usize },
}

/// Capture controller for one context
pub struct BindingCapture {
    context: Arc<ControlContext>,
    state: Mutex<CaptureState>,
    observers: Mutex<Vec<Weak<dyn ReassignListener>>>,
}

impl BindingCapture {
    pub fn new(context: Arc<ControlContext>) -> Self {
        Self {
            context,
            state: Mutex::new(CaptureState::Idle),
            observers: Mutex::new(Vec::new()),
        }
    }

    pub fn add_reassign_listener(&self, listener: &Arc<dyn ReassignListener>) {
        self.observers.lock().push(Arc::downgrade(listener));
    }

    /// Start capturing the next gesture for one of the listener's slots
    pub fn begin<L: ?Sized>(&self, listener: &Arc<L>, slot: usize) -> Result<(), ControlError> {
        if slot >= MAX_BINDINGS {
            return Err(ControlError::InvalidSlot { slot });
        }
        let id = ListenerId::of(listener);
        if self.context.listener_kind(id).is_none() {
            return Err(ControlError::UnknownListener);
        }
        if self.context.listener_reassignable(id) != Some(true) {
            return Err(ControlError::NotReassignable);
        }

        let mut state = self.state.lock();
        if matches!(*state, CaptureState::Capturing { .. }) {
            return Err(ControlError::CaptureInProgress);
        }
        *state = CaptureState::Capturing { listener: id, slot };
        debug!(context = %self.context.name(), slot, "binding capture started");
        Ok(())
    }

    pub fn is_capturing(&self) -> bool {
        matches!(*self.state.lock(), CaptureState::Capturing { .. })
    }

    /// Abort the capture, restoring the previously staged (or committed)
    /// value
    pub fn cancel(&self) -> Result<(), ControlError> {
        let mut state = self.state.lock();
        let CaptureState::Capturing { listener, .. } = *state else {
            return Err(ControlError::NoCaptureInProgress);
        };
        *state = CaptureState::Idle;
        drop(state);

        // The listener may have unregistered mid-capture; nothing to restore
        // then.
        let _ = self.context.cancel_binding_changes_id(listener);
        debug!(context = %self.context.name(), "binding capture cancelled");
        Ok(())
    }

    /// Offer a raw key event to the capture.
    ///
    /// Only a key press qualifies, and a press of a pure modifier key is
    /// skipped so the user can build a modifier combo.
    pub fn feed_key(&self, event: &KeyEvent) -> Result<Option<CaptureOutcome>, ControlError> {
        let (listener, slot) = self.capturing()?;
        if event.phase != KeyPhase::Pressed || event.key.is_modifier() {
            return Ok(None);
        }
        let trigger = Trigger::KeyPress {
            key: event.key,
            mods: event.mods,
        };
        self.finish(listener, slot, trigger).map(Some)
    }

    /// Offer a raw mouse event to the capture. Only a button press
    /// qualifies.
    pub fn feed_mouse(&self, event: &MouseEvent) -> Result<Option<CaptureOutcome>, ControlError> {
        let (listener, slot) = self.capturing()?;
        if event.kind != MouseEventKind::Pressed {
            return Ok(None);
        }
        let trigger = Trigger::Mouse {
            kind: MouseEventKind::Pressed,
            button: event.button,
            mods: event.mods,
        };
        self.finish(listener, slot, trigger).map(Some)
    }

    /// Offer a raw wheel event to the capture.
    ///
    /// Compound gestures have no wheel form, so for a compound listener
    /// this produces no trigger and the capture continues.
    pub fn feed_wheel(&self, event: &WheelEvent) -> Result<Option<CaptureOutcome>, ControlError> {
        let (listener, slot) = self.capturing()?;
        if self.context.listener_kind(listener) == Some(ListenerKind::Compound) {
            return Ok(None);
        }
        let Some(direction) = WheelDirection::from_rotation(event.rotation) else {
            return Ok(None);
        };
        let trigger = Trigger::Wheel {
            direction,
            mods: event.mods,
        };
        self.finish(listener, slot, trigger).map(Some)
    }

    /// Apply a conflicted assignment: notify observers, take the gesture
    /// away from its previous owner, then commit it to the target slot.
    pub fn confirm(&self, pending: PendingAssignment) -> Result<(), ControlError> {
        let (conflict_listener, conflict_slot) = pending.conflict;
        let notice = OverrideNotice {
            listener: conflict_listener,
            title: pending.conflict_title.clone(),
            slot: conflict_slot,
            trigger: pending.trigger,
        };
        self.notify_override(&notice);

        self.context
            .stage_binding_id(conflict_listener, conflict_slot, None)?;
        self.context.commit_binding_changes_id(conflict_listener)?;

        let (listener, slot) = pending.target;
        self.context
            .stage_binding_id(listener, slot, Some(pending.trigger))?;
        self.context.commit_binding_changes_id(listener)
    }

    /// Abandon a conflicted assignment; nothing changes
    pub fn decline(&self, pending: PendingAssignment) {
        debug!(
            context = %self.context.name(),
            trigger = %pending.trigger,
            "binding override declined"
        );
    }

    fn capturing(&self) -> Result<(ListenerId, usize), ControlError> {
        match *self.state.lock() {
            CaptureState::Capturing { listener, slot } => Ok((listener, slot)),
            CaptureState::Idle => Err(ControlError::NoCaptureInProgress),
        }
    }

    fn finish(
        &self,
        listener: ListenerId,
        slot: usize,
        trigger: Trigger,
    ) -> Result<CaptureOutcome, ControlError> {
        *self.state.lock() = CaptureState::Idle;

        if let Some((conflict_listener, conflict_slot)) =
            self.context.find_conflict(trigger, (listener, slot))
        {
            let conflict_title = self
                .context
                .listener_title(conflict_listener)
                .unwrap_or_default();
            debug!(
                context = %self.context.name(),
                trigger = %trigger,
                owner = %conflict_title,
                "captured gesture already bound"
            );
            return Ok(CaptureOutcome::Conflict(PendingAssignment {
                trigger,
                target: (listener, slot),
                conflict: (conflict_listener, conflict_slot),
                conflict_title,
            }));
        }

        self.context.stage_binding_id(listener, slot, Some(trigger))?;
        self.context.commit_binding_changes_id(listener)?;
        debug!(context = %self.context.name(), trigger = %trigger, "binding assigned");
        Ok(CaptureOutcome::Assigned { trigger })
    }

    fn notify_override(&self, notice: &OverrideNotice) {
        let observers: Vec<Arc<dyn ReassignListener>> = {
            let mut guard = self.observers.lock();
            guard.retain(|w| w.strong_count() > 0);
            guard.iter().filter_map(Weak::upgrade).collect()
        };
        for observer in observers {
            observer.binding_overridden(notice);
        }
    }
}
