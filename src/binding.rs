//! Binding triggers and runtime binding objects
//!
//! A `Trigger` is the structural description of one input gesture, used both
//! as the registration template and for conflict detection ("this gesture is
//! already bound elsewhere"). A `Binding` is the runtime object living in a
//! context's internal sets: a unique id, the trigger, and the owning
//! listener. Set membership compares by id, never structurally.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::listener::ListenerHandle;
use crate::types::{KeyCode, Modifiers, MouseButton, MouseEventKind, WheelDirection};

/// Structural description of one input gesture
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Trigger {
    /// A key press/release pair identified by key code
    KeyPress { key: KeyCode, mods: Modifiers },
    /// A typed character (layout-resolved)
    KeyTyped { ch: char, mods: Modifiers },
    /// A non-wheel mouse event; `button: None` matches any button and is
    /// the form used for pure motion kinds
    Mouse {
        kind: MouseEventKind,
        button: Option<MouseButton>,
        mods: Modifiers,
    },
    /// A wheel rotation in one direction
    Wheel {
        direction: WheelDirection,
        mods: Modifiers,
    },
}

/// Tag selecting the internal context set a binding belongs to
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TriggerKind {
    KeyPress,
    KeyTyped,
    Mouse,
    Wheel,
}

impl fmt::Display for TriggerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TriggerKind::KeyPress => write!(f, "key press"),
            TriggerKind::KeyTyped => write!(f, "key typed"),
            TriggerKind::Mouse => write!(f, "mouse"),
            TriggerKind::Wheel => write!(f, "mouse wheel"),
        }
    }
}

impl Trigger {
    /// Plain key-press trigger with no modifiers
    pub const fn key(key: KeyCode) -> Self {
        Trigger::KeyPress {
            key,
            mods: Modifiers::NONE,
        }
    }

    pub const fn key_with_mods(key: KeyCode, mods: Modifiers) -> Self {
        Trigger::KeyPress { key, mods }
    }

    /// Typed-character trigger; the character is normalized to lowercase
    pub fn typed(ch: char) -> Self {
        Trigger::KeyTyped {
            ch: ch.to_ascii_lowercase(),
            mods: Modifiers::NONE,
        }
    }

    pub fn typed_with_mods(ch: char, mods: Modifiers) -> Self {
        Trigger::KeyTyped {
            ch: ch.to_ascii_lowercase(),
            mods,
        }
    }

    /// Press trigger for a mouse button with no modifiers
    pub const fn mouse_press(button: MouseButton) -> Self {
        Trigger::Mouse {
            kind: MouseEventKind::Pressed,
            button: Some(button),
            mods: Modifiers::NONE,
        }
    }

    pub const fn mouse(kind: MouseEventKind, button: Option<MouseButton>, mods: Modifiers) -> Self {
        Trigger::Mouse { kind, button, mods }
    }

    pub const fn wheel(direction: WheelDirection) -> Self {
        Trigger::Wheel {
            direction,
            mods: Modifiers::NONE,
        }
    }

    pub const fn wheel_with_mods(direction: WheelDirection, mods: Modifiers) -> Self {
        Trigger::Wheel { direction, mods }
    }

    pub const fn kind(&self) -> TriggerKind {
        match self {
            Trigger::KeyPress { .. } => TriggerKind::KeyPress,
            Trigger::KeyTyped { .. } => TriggerKind::KeyTyped,
            Trigger::Mouse { .. } => TriggerKind::Mouse,
            Trigger::Wheel { .. } => TriggerKind::Wheel,
        }
    }

    pub const fn mods(&self) -> Modifiers {
        match self {
            Trigger::KeyPress { mods, .. }
            | Trigger::KeyTyped { mods, .. }
            | Trigger::Mouse { mods, .. }
            | Trigger::Wheel { mods, .. } => *mods,
        }
    }
}

impl fmt::Display for Trigger {
    /// Human-readable rendering, e.g. "Ctrl+Shift+R", "Mouse Wheel Up".
    ///
    /// A lone character with no modifiers renders lowercase ("r"); with
    /// modifiers it renders uppercase ("Ctrl+R").
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mods = self.mods();
        let prefix = if mods.is_empty() {
            String::new()
        } else {
            format!("{}+", mods)
        };

        match self {
            Trigger::KeyPress { key, .. } => match key {
                KeyCode::Char(c) if mods.is_empty() => write!(f, "{}", c.to_lowercase()),
                _ => write!(f, "{}{}", prefix, key),
            },
            Trigger::KeyTyped { ch, .. } => {
                if mods.is_empty() {
                    write!(f, "{}", ch.to_lowercase())
                } else {
                    write!(f, "{}{}", prefix, ch.to_uppercase())
                }
            }
            Trigger::Mouse { kind, button, .. } => {
                let button = match button {
                    Some(b) => format!(" {}", b),
                    None => String::new(),
                };
                let kind = match kind {
                    MouseEventKind::Pressed => "",
                    MouseEventKind::Released => " Release",
                    MouseEventKind::Clicked => " Click",
                    MouseEventKind::Moved => " Move",
                    MouseEventKind::Dragged => " Drag",
                    MouseEventKind::Entered => " Enter",
                    MouseEventKind::Exited => " Exit",
                };
                write!(f, "{}Mouse{}{}", prefix, button, kind)
            }
            Trigger::Wheel { direction, .. } => {
                write!(f, "{}Mouse Wheel {}", prefix, direction)
            }
        }
    }
}

/// Identity of a runtime binding
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BindingId(u64);

impl BindingId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        BindingId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// A runtime binding: one trigger tied to one listener.
///
/// Lives in the owning context's internal set for its trigger kind and in
/// the listener's association slots; both sides share it via `Arc`.
#[derive(Debug)]
pub struct Binding {
    id: BindingId,
    trigger: Trigger,
    listener: ListenerHandle,
}

impl Binding {
    pub fn new(trigger: Trigger, listener: ListenerHandle) -> Arc<Self> {
        Arc::new(Self {
            id: BindingId::next(),
            trigger,
            listener,
        })
    }

    pub fn id(&self) -> BindingId {
        self.id
    }

    pub fn trigger(&self) -> Trigger {
        self.trigger
    }

    pub fn kind(&self) -> TriggerKind {
        self.trigger.kind()
    }

    pub fn listener(&self) -> &ListenerHandle {
        &self.listener
    }
}

impl fmt::Display for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.trigger)
    }
}
