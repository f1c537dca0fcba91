//! Core input vocabulary: Modifiers, KeyCode, mouse buttons and event kinds

use std::fmt;

/// Held modifier keys, packed into a single byte.
///
/// Binding matches compare whole sets at once, so the dispatch hot path
/// stays a plain integer comparison.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Modifiers(u8);

impl Modifiers {
    pub const NONE: Modifiers = Modifiers(0);
    pub const CTRL: Modifiers = Modifiers(1 << 0);
    pub const SHIFT: Modifiers = Modifiers(1 << 1);
    pub const ALT: Modifiers = Modifiers(1 << 2);
    /// Cmd on macOS, the Windows key elsewhere
    pub const META: Modifiers = Modifiers(1 << 3);

    /// Build a modifier set from individual key states
    pub const fn new(ctrl: bool, shift: bool, alt: bool, meta: bool) -> Self {
        let mut mods = Modifiers::NONE;
        if ctrl {
            mods = mods.union(Modifiers::CTRL);
        }
        if shift {
            mods = mods.union(Modifiers::SHIFT);
        }
        if alt {
            mods = mods.union(Modifiers::ALT);
        }
        if meta {
            mods = mods.union(Modifiers::META);
        }
        mods
    }

    #[inline]
    pub const fn ctrl(self) -> bool {
        self.contains(Modifiers::CTRL)
    }

    #[inline]
    pub const fn shift(self) -> bool {
        self.contains(Modifiers::SHIFT)
    }

    #[inline]
    pub const fn alt(self) -> bool {
        self.contains(Modifiers::ALT)
    }

    #[inline]
    pub const fn meta(self) -> bool {
        self.contains(Modifiers::META)
    }

    /// Whether no modifier key is held
    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Bits present in either set
    #[inline]
    pub const fn union(self, other: Modifiers) -> Modifiers {
        Modifiers(self.0 | other.0)
    }

    /// Whether every bit of `other` is also set in `self`
    #[inline]
    pub const fn contains(self, other: Modifiers) -> bool {
        self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for Modifiers {
    type Output = Modifiers;

    fn bitor(self, rhs: Self) -> Self::Output {
        self.union(rhs)
    }
}

impl std::ops::BitAnd for Modifiers {
    type Output = Modifiers;

    fn bitand(self, rhs: Self) -> Self::Output {
        Modifiers(self.0 & rhs.0)
    }
}

impl std::ops::BitXor for Modifiers {
    type Output = Modifiers;

    fn bitxor(self, rhs: Self) -> Self::Output {
        Modifiers(self.0 ^ rhs.0)
    }
}

impl fmt::Display for Modifiers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let macos = cfg!(target_os = "macos");
        let names = [
            (self.ctrl(), "Ctrl"),
            (self.shift(), "Shift"),
            (self.alt(), if macos { "Option" } else { "Alt" }),
            (self.meta(), if macos { "Cmd" } else { "Win" }),
        ];
        let mut first = true;
        for (held, name) in names {
            if !held {
                continue;
            }
            if !first {
                f.write_str("+")?;
            }
            f.write_str(name)?;
            first = false;
        }
        Ok(())
    }
}

/// A key code representing a physical or logical key
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum KeyCode {
    /// A character key (normalized to lowercase)
    Char(char),

    // Named keys
    Enter,
    Escape,
    Tab,
    Backspace,
    Delete,
    Space,

    // Arrow keys
    Up,
    Down,
    Left,
    Right,

    // Navigation
    Home,
    End,
    PageUp,
    PageDown,
    Insert,

    // Function keys
    F(u8), // F1-F24

    // Modifier keys, bindable standalone (e.g. "hold Shift to pan")
    Shift,
    Control,
    Alt,
    Meta,
}

impl KeyCode {
    /// Whether this key is itself a modifier key.
    ///
    /// Bindings triggered by a bare modifier key skip modifier-bit matching,
    /// so "Shift" can be bound standalone without fighting combo bindings.
    pub const fn is_modifier(self) -> bool {
        matches!(
            self,
            KeyCode::Shift | KeyCode::Control | KeyCode::Alt | KeyCode::Meta
        )
    }
}

impl fmt::Display for KeyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyCode::Char(c) => write!(f, "{}", c.to_uppercase()),
            KeyCode::Enter => write!(f, "Enter"),
            KeyCode::Escape => write!(f, "Escape"),
            KeyCode::Tab => write!(f, "Tab"),
            KeyCode::Backspace => write!(f, "Backspace"),
            KeyCode::Delete => write!(f, "Delete"),
            KeyCode::Space => write!(f, "Space"),
            KeyCode::Up => write!(f, "Up"),
            KeyCode::Down => write!(f, "Down"),
            KeyCode::Left => write!(f, "Left"),
            KeyCode::Right => write!(f, "Right"),
            KeyCode::Home => write!(f, "Home"),
            KeyCode::End => write!(f, "End"),
            KeyCode::PageUp => write!(f, "PageUp"),
            KeyCode::PageDown => write!(f, "PageDown"),
            KeyCode::Insert => write!(f, "Insert"),
            KeyCode::F(n) => write!(f, "F{}", n),
            KeyCode::Shift => write!(f, "Shift"),
            KeyCode::Control => write!(f, "Ctrl"),
            KeyCode::Alt => {
                write!(f, "{}", if cfg!(target_os = "macos") { "Option" } else { "Alt" })
            }
            KeyCode::Meta => {
                write!(f, "{}", if cfg!(target_os = "macos") { "Cmd" } else { "Win" })
            }
        }
    }
}

/// A mouse button
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MouseButton {
    Left,
    Middle,
    Right,
    Other(u16),
}

impl fmt::Display for MouseButton {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MouseButton::Left => write!(f, "Left"),
            MouseButton::Middle => write!(f, "Middle"),
            MouseButton::Right => write!(f, "Right"),
            MouseButton::Other(n) => write!(f, "Button{}", n),
        }
    }
}

/// The kind of a (non-wheel) mouse event
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MouseEventKind {
    Pressed,
    Released,
    Clicked,
    Moved,
    Dragged,
    Entered,
    Exited,
}

/// Scroll direction for wheel bindings.
///
/// Matching is by rotation sign, not magnitude: any upward rotation matches
/// an `Up` binding.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WheelDirection {
    Up,
    Down,
}

impl WheelDirection {
    /// Sign of the wheel rotation this direction matches.
    ///
    /// Positive rotation scrolls toward the user (down), negative away (up).
    pub const fn sign(self) -> i32 {
        match self {
            WheelDirection::Up => -1,
            WheelDirection::Down => 1,
        }
    }

    /// Direction matching a raw rotation value, if any.
    pub const fn from_rotation(rotation: i32) -> Option<WheelDirection> {
        match rotation {
            r if r < 0 => Some(WheelDirection::Up),
            r if r > 0 => Some(WheelDirection::Down),
            _ => None,
        }
    }
}

impl fmt::Display for WheelDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WheelDirection::Up => write!(f, "Up"),
            WheelDirection::Down => write!(f, "Down"),
        }
    }
}

/// A position in window coordinates (physical pixels)
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ScreenPosition {
    pub x: f64,
    pub y: f64,
}

impl ScreenPosition {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Opaque handle for a piece of pickable geometry.
///
/// The rendering layer owns the actual geometry; the control core only
/// forwards the identity through the pick side channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GeometryId(pub u64);
