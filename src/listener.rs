//! Listener capability traits and weak handles
//!
//! Features implement one of two gesture capabilities: *discrete* (a single
//! callback per physical event) or *compound* (separate start/end callbacks
//! for drag-style interactions, plus raw mouse continuation callbacks).
//! Contexts hold listeners weakly: registering a feature does not keep it
//! alive, and callers must keep their own `Arc` to keep receiving events.

use std::sync::{Arc, Weak};

use crate::event::{InputEvent, MouseEvent, WheelEvent};

/// Metadata every control listener exposes, consumed by the settings UI and
/// by the dispatch targeting rules.
pub trait ControlListener: Send + Sync {
    /// Grouping label, e.g. "View" or "Selection"
    fn category(&self) -> &str;

    /// Short human-readable name, e.g. "Zoom In"
    fn title(&self) -> &str;

    fn description(&self) -> &str {
        ""
    }

    /// Whether the user may rebind this control
    fn is_reassignable(&self) -> bool {
        true
    }

    /// Whether this listener only receives events while it is targeted
    fn must_be_targeted(&self) -> bool {
        false
    }

    /// Per-event targeting predicate, e.g. "my geometry is under the cursor"
    fn is_targeted(&self) -> bool {
        false
    }

    /// Priority among targeted listeners; higher wins, ties keep
    /// registration order
    fn target_priority(&self) -> i32 {
        0
    }
}

/// A listener for gestures fully described by one physical event
pub trait DiscreteListener: ControlListener {
    fn event_occurred(&self, event: InputEvent<'_>);
}

/// A listener for gestures spanning a start event and a later end event
/// (press-drag-release).
///
/// The raw mouse callbacks default to no-ops; mouse-driven features override
/// the ones they care about.
pub trait CompoundListener: ControlListener {
    fn event_started(&self, event: InputEvent<'_>);

    fn event_ended(&self, event: InputEvent<'_>);

    fn mouse_moved(&self, _event: &MouseEvent) {}

    fn mouse_dragged(&self, _event: &MouseEvent) {}

    fn mouse_clicked(&self, _event: &MouseEvent) {}

    fn mouse_entered(&self, _event: &MouseEvent) {}

    fn mouse_exited(&self, _event: &MouseEvent) {}

    fn mouse_wheel_moved(&self, _event: &WheelEvent) {}
}

/// Notification channel for "what geometry is under the cursor", fired by
/// the rendering layer. Independent of key/mouse dispatch.
pub trait PickListener: Send + Sync {
    fn picked(&self, pick: &PickEvent);
}

/// Payload of a pick notification
#[derive(Clone, Copy, Debug)]
pub struct PickEvent {
    /// Geometry under the cursor, or `None` when the cursor left everything
    pub geometry: Option<crate::types::GeometryId>,
    pub position: crate::types::ScreenPosition,
}

/// Identity of a registered listener, derived from its allocation.
///
/// Stable for the lifetime of the listener's `Arc`; used to key
/// associations and to compare handles without upgrading them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(usize);

impl ListenerId {
    /// Identity of any `Arc`-held listener
    pub fn of<L: ?Sized>(listener: &Arc<L>) -> Self {
        ListenerId(Arc::as_ptr(listener) as *const () as usize)
    }
}

/// Which capability a registered listener has
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ListenerKind {
    Discrete,
    Compound,
}

/// Non-owning handle to a registered listener.
///
/// The two capability traits are distinct objects, so the handle keeps the
/// concrete weak pointer and exposes the shared metadata through per-arm
/// accessors.
#[derive(Clone)]
pub enum ListenerHandle {
    Discrete(Weak<dyn DiscreteListener>),
    Compound(Weak<dyn CompoundListener>),
}

impl ListenerHandle {
    pub fn discrete(listener: &Arc<dyn DiscreteListener>) -> Self {
        ListenerHandle::Discrete(Arc::downgrade(listener))
    }

    pub fn compound(listener: &Arc<dyn CompoundListener>) -> Self {
        ListenerHandle::Compound(Arc::downgrade(listener))
    }

    pub fn id(&self) -> ListenerId {
        match self {
            ListenerHandle::Discrete(w) => ListenerId(w.as_ptr() as *const () as usize),
            ListenerHandle::Compound(w) => ListenerId(w.as_ptr() as *const () as usize),
        }
    }

    pub fn kind(&self) -> ListenerKind {
        match self {
            ListenerHandle::Discrete(_) => ListenerKind::Discrete,
            ListenerHandle::Compound(_) => ListenerKind::Compound,
        }
    }

    pub fn is_compound(&self) -> bool {
        matches!(self, ListenerHandle::Compound(_))
    }

    /// Whether the listener is still alive
    pub fn is_alive(&self) -> bool {
        match self {
            ListenerHandle::Discrete(w) => w.strong_count() > 0,
            ListenerHandle::Compound(w) => w.strong_count() > 0,
        }
    }

    pub fn upgrade_discrete(&self) -> Option<Arc<dyn DiscreteListener>> {
        match self {
            ListenerHandle::Discrete(w) => w.upgrade(),
            ListenerHandle::Compound(_) => None,
        }
    }

    pub fn upgrade_compound(&self) -> Option<Arc<dyn CompoundListener>> {
        match self {
            ListenerHandle::Compound(w) => w.upgrade(),
            ListenerHandle::Discrete(_) => None,
        }
    }

    pub fn category(&self) -> Option<String> {
        match self {
            ListenerHandle::Discrete(w) => w.upgrade().map(|l| l.category().to_owned()),
            ListenerHandle::Compound(w) => w.upgrade().map(|l| l.category().to_owned()),
        }
    }

    pub fn title(&self) -> Option<String> {
        match self {
            ListenerHandle::Discrete(w) => w.upgrade().map(|l| l.title().to_owned()),
            ListenerHandle::Compound(w) => w.upgrade().map(|l| l.title().to_owned()),
        }
    }

    pub fn description(&self) -> Option<String> {
        match self {
            ListenerHandle::Discrete(w) => w.upgrade().map(|l| l.description().to_owned()),
            ListenerHandle::Compound(w) => w.upgrade().map(|l| l.description().to_owned()),
        }
    }

    pub fn is_reassignable(&self) -> Option<bool> {
        match self {
            ListenerHandle::Discrete(w) => w.upgrade().map(|l| l.is_reassignable()),
            ListenerHandle::Compound(w) => w.upgrade().map(|l| l.is_reassignable()),
        }
    }

    pub fn must_be_targeted(&self) -> Option<bool> {
        match self {
            ListenerHandle::Discrete(w) => w.upgrade().map(|l| l.must_be_targeted()),
            ListenerHandle::Compound(w) => w.upgrade().map(|l| l.must_be_targeted()),
        }
    }

    pub fn is_targeted(&self) -> Option<bool> {
        match self {
            ListenerHandle::Discrete(w) => w.upgrade().map(|l| l.is_targeted()),
            ListenerHandle::Compound(w) => w.upgrade().map(|l| l.is_targeted()),
        }
    }

    pub fn target_priority(&self) -> Option<i32> {
        match self {
            ListenerHandle::Discrete(w) => w.upgrade().map(|l| l.target_priority()),
            ListenerHandle::Compound(w) => w.upgrade().map(|l| l.target_priority()),
        }
    }
}

impl std::fmt::Debug for ListenerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ListenerHandle::Discrete(_) => {
                write!(f, "ListenerHandle::Discrete({:?})", self.id())
            }
            ListenerHandle::Compound(_) => {
                write!(f, "ListenerHandle::Compound({:?})", self.id())
            }
        }
    }
}
