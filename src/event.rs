//! Runtime input events delivered to listeners
//!
//! Events carry a cooperative `consumed` flag: the first listener that
//! consumes an event stops further dispatch. Dispatch happens on the host's
//! event-loop thread, so the flag is a plain `Cell`.

use std::cell::Cell;

use crate::types::{KeyCode, Modifiers, MouseButton, MouseEventKind, ScreenPosition};

/// Phase of a keyboard event
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyPhase {
    Pressed,
    Released,
    Typed,
}

/// A keyboard event
#[derive(Clone, Debug)]
pub struct KeyEvent {
    pub phase: KeyPhase,
    pub key: KeyCode,
    /// Character produced by the keystroke, for `Typed` events
    pub ch: Option<char>,
    pub mods: Modifiers,
    consumed: Cell<bool>,
}

impl KeyEvent {
    pub fn new(phase: KeyPhase, key: KeyCode, mods: Modifiers) -> Self {
        Self {
            phase,
            key,
            ch: None,
            mods,
            consumed: Cell::new(false),
        }
    }

    pub fn typed(ch: char, mods: Modifiers) -> Self {
        Self {
            phase: KeyPhase::Typed,
            key: KeyCode::Char(ch.to_ascii_lowercase()),
            ch: Some(ch),
            mods,
            consumed: Cell::new(false),
        }
    }

    /// Stop further dispatch of this event
    pub fn consume(&self) {
        self.consumed.set(true);
    }

    pub fn is_consumed(&self) -> bool {
        self.consumed.get()
    }
}

/// A mouse event (button, motion, or boundary crossing)
#[derive(Clone, Debug)]
pub struct MouseEvent {
    pub kind: MouseEventKind,
    /// Button for press/release/click/drag; `None` for pure motion events
    pub button: Option<MouseButton>,
    pub position: ScreenPosition,
    /// Consecutive-click count (1 for single, 2 for double, ...)
    pub clicks: u8,
    pub mods: Modifiers,
    consumed: Cell<bool>,
}

impl MouseEvent {
    pub fn new(
        kind: MouseEventKind,
        button: Option<MouseButton>,
        position: ScreenPosition,
        mods: Modifiers,
    ) -> Self {
        Self {
            kind,
            button,
            position,
            clicks: 0,
            mods,
            consumed: Cell::new(false),
        }
    }

    pub fn with_clicks(mut self, clicks: u8) -> Self {
        self.clicks = clicks;
        self
    }

    /// Stop further dispatch of this event
    pub fn consume(&self) {
        self.consumed.set(true);
    }

    pub fn is_consumed(&self) -> bool {
        self.consumed.get()
    }
}

/// A mouse wheel event
#[derive(Clone, Debug)]
pub struct WheelEvent {
    /// Signed scroll steps; positive rotates toward the user (down)
    pub rotation: i32,
    pub position: ScreenPosition,
    pub mods: Modifiers,
    consumed: Cell<bool>,
}

impl WheelEvent {
    pub fn new(rotation: i32, position: ScreenPosition, mods: Modifiers) -> Self {
        Self {
            rotation,
            position,
            mods,
            consumed: Cell::new(false),
        }
    }

    /// Stop further dispatch of this event
    pub fn consume(&self) {
        self.consumed.set(true);
    }

    pub fn is_consumed(&self) -> bool {
        self.consumed.get()
    }
}

/// Borrowed view over any input event, handed to gesture callbacks
#[derive(Clone, Copy, Debug)]
pub enum InputEvent<'a> {
    Key(&'a KeyEvent),
    Mouse(&'a MouseEvent),
    Wheel(&'a WheelEvent),
}

impl InputEvent<'_> {
    /// Stop further dispatch of the underlying event
    pub fn consume(&self) {
        match self {
            InputEvent::Key(e) => e.consume(),
            InputEvent::Mouse(e) => e.consume(),
            InputEvent::Wheel(e) => e.consume(),
        }
    }

    pub fn is_consumed(&self) -> bool {
        match self {
            InputEvent::Key(e) => e.is_consumed(),
            InputEvent::Mouse(e) => e.is_consumed(),
            InputEvent::Wheel(e) => e.is_consumed(),
        }
    }

    pub fn mods(&self) -> Modifiers {
        match self {
            InputEvent::Key(e) => e.mods,
            InputEvent::Mouse(e) => e.mods,
            InputEvent::Wheel(e) => e.mods,
        }
    }
}
