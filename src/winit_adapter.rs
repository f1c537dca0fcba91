//! Adapter wiring a winit window to a control context
//!
//! winit delivers modifiers, cursor position, and button state as separate
//! events, so the sink tracks them and synthesizes the event shapes the
//! dispatch algorithm expects: drags from cursor motion while a button is
//! down, clicks after releases, and typed characters from text-bearing key
//! presses.

use std::sync::Arc;
use std::time::{Duration, Instant};

use winit::event::{ElementState, MouseScrollDelta, WindowEvent};
use winit::keyboard::{Key, NamedKey};

use crate::context::ControlContext;
use crate::event::{KeyEvent, KeyPhase, MouseEvent, WheelEvent};
use crate::reassign::{BindingCapture, CaptureOutcome};
use crate::types::{KeyCode, Modifiers, MouseButton, MouseEventKind, ScreenPosition};

/// Convert a winit logical key to our key code
///
/// Returns None for keys the binding system does not model.
pub fn key_code_from_winit(logical_key: &Key) -> Option<KeyCode> {
    match logical_key {
        Key::Named(named) => match named {
            NamedKey::Enter => Some(KeyCode::Enter),
            NamedKey::Escape => Some(KeyCode::Escape),
            NamedKey::Tab => Some(KeyCode::Tab),
            NamedKey::Backspace => Some(KeyCode::Backspace),
            NamedKey::Delete => Some(KeyCode::Delete),
            NamedKey::Space => Some(KeyCode::Space),

            NamedKey::ArrowUp => Some(KeyCode::Up),
            NamedKey::ArrowDown => Some(KeyCode::Down),
            NamedKey::ArrowLeft => Some(KeyCode::Left),
            NamedKey::ArrowRight => Some(KeyCode::Right),

            NamedKey::Home => Some(KeyCode::Home),
            NamedKey::End => Some(KeyCode::End),
            NamedKey::PageUp => Some(KeyCode::PageUp),
            NamedKey::PageDown => Some(KeyCode::PageDown),
            NamedKey::Insert => Some(KeyCode::Insert),

            NamedKey::F1 => Some(KeyCode::F(1)),
            NamedKey::F2 => Some(KeyCode::F(2)),
            NamedKey::F3 => Some(KeyCode::F(3)),
            NamedKey::F4 => Some(KeyCode::F(4)),
            NamedKey::F5 => Some(KeyCode::F(5)),
            NamedKey::F6 => Some(KeyCode::F(6)),
            NamedKey::F7 => Some(KeyCode::F(7)),
            NamedKey::F8 => Some(KeyCode::F(8)),
            NamedKey::F9 => Some(KeyCode::F(9)),
            NamedKey::F10 => Some(KeyCode::F(10)),
            NamedKey::F11 => Some(KeyCode::F(11)),
            NamedKey::F12 => Some(KeyCode::F(12)),

            // Bare modifier presses are dispatchable gestures here
            NamedKey::Shift => Some(KeyCode::Shift),
            NamedKey::Control => Some(KeyCode::Control),
            NamedKey::Alt => Some(KeyCode::Alt),
            NamedKey::Super | NamedKey::Meta => Some(KeyCode::Meta),

            _ => None,
        },

        // Character keys - normalize to lowercase
        Key::Character(s) => {
            let c = s.chars().next()?;
            Some(KeyCode::Char(c.to_ascii_lowercase()))
        }

        _ => None,
    }
}

fn button_from_winit(button: winit::event::MouseButton) -> MouseButton {
    match button {
        winit::event::MouseButton::Left => MouseButton::Left,
        winit::event::MouseButton::Middle => MouseButton::Middle,
        winit::event::MouseButton::Right => MouseButton::Right,
        winit::event::MouseButton::Back => MouseButton::Other(4),
        winit::event::MouseButton::Forward => MouseButton::Other(5),
        winit::event::MouseButton::Other(n) => MouseButton::Other(n),
    }
}

/// Click tracking state for double/triple click detection
struct ClickTracker {
    last_click_time: Instant,
    last_click_position: Option<ScreenPosition>,
    click_count: u8,
}

impl Default for ClickTracker {
    fn default() -> Self {
        Self {
            last_click_time: Instant::now() - Duration::from_secs(10),
            last_click_position: None,
            click_count: 0,
        }
    }
}

impl ClickTracker {
    const DOUBLE_CLICK_TIME: Duration = Duration::from_millis(300);
    const SLOP_PX: f64 = 4.0;

    /// Update click count based on timing and position.
    ///
    /// Returns the new click count (1, 2, or 3).
    fn track_click(&mut self, position: ScreenPosition) -> u8 {
        let now = Instant::now();
        let is_rapid_click = now.duration_since(self.last_click_time) < Self::DOUBLE_CLICK_TIME;
        let is_near_last = self.last_click_position.is_some_and(|last| {
            (last.x - position.x).abs() <= Self::SLOP_PX
                && (last.y - position.y).abs() <= Self::SLOP_PX
        });

        if is_rapid_click && is_near_last {
            self.click_count += 1;
            if self.click_count > 3 {
                self.click_count = 1;
            }
        } else {
            self.click_count = 1;
        }

        self.last_click_time = now;
        self.last_click_position = Some(position);
        self.click_count
    }
}

/// Event sink translating winit window events for one control context.
///
/// When a binding capture is attached and active, raw events are routed to
/// it instead of normal dispatch, and the capture outcome is handed back to
/// the caller.
pub struct WinitEventSink {
    context: Arc<ControlContext>,
    capture: Option<Arc<BindingCapture>>,
    mods: Modifiers,
    cursor: ScreenPosition,
    pressed_button: Option<MouseButton>,
    clicks: ClickTracker,
}

impl WinitEventSink {
    pub fn new(context: Arc<ControlContext>) -> Self {
        Self {
            context,
            capture: None,
            mods: Modifiers::NONE,
            cursor: ScreenPosition::default(),
            pressed_button: None,
            clicks: ClickTracker::default(),
        }
    }

    /// Attach the capture that should intercept raw events while active
    pub fn set_capture(&mut self, capture: Option<Arc<BindingCapture>>) {
        self.capture = capture;
    }

    pub fn context(&self) -> &Arc<ControlContext> {
        &self.context
    }

    /// Feed one window event.
    ///
    /// Returns a capture outcome when an attached, active capture finished
    /// on this event; `None` for ordinary dispatch.
    pub fn handle_window_event(&mut self, event: &WindowEvent) -> Option<CaptureOutcome> {
        match event {
            WindowEvent::ModifiersChanged(modifiers) => {
                let state = modifiers.state();
                self.mods = Modifiers::new(
                    state.control_key(),
                    state.shift_key(),
                    state.alt_key(),
                    state.super_key(),
                );
                None
            }

            WindowEvent::KeyboardInput { event, .. } => self.handle_key(event),

            WindowEvent::CursorMoved { position, .. } => {
                self.cursor = ScreenPosition::new(position.x, position.y);
                let (kind, button) = match self.pressed_button {
                    Some(button) => (MouseEventKind::Dragged, Some(button)),
                    None => (MouseEventKind::Moved, None),
                };
                let motion = MouseEvent::new(kind, button, self.cursor, self.mods);
                self.dispatch_mouse(&motion)
            }

            WindowEvent::CursorEntered { .. } => {
                let entered =
                    MouseEvent::new(MouseEventKind::Entered, None, self.cursor, self.mods);
                self.dispatch_mouse(&entered)
            }

            WindowEvent::CursorLeft { .. } => {
                let exited = MouseEvent::new(MouseEventKind::Exited, None, self.cursor, self.mods);
                self.dispatch_mouse(&exited)
            }

            WindowEvent::MouseInput { state, button, .. } => {
                let button = button_from_winit(*button);
                match state {
                    ElementState::Pressed => {
                        self.pressed_button = Some(button);
                        let press = MouseEvent::new(
                            MouseEventKind::Pressed,
                            Some(button),
                            self.cursor,
                            self.mods,
                        );
                        self.dispatch_mouse(&press)
                    }
                    ElementState::Released => {
                        if self.pressed_button == Some(button) {
                            self.pressed_button = None;
                        }
                        let release = MouseEvent::new(
                            MouseEventKind::Released,
                            Some(button),
                            self.cursor,
                            self.mods,
                        );
                        let outcome = self.dispatch_mouse(&release);
                        if outcome.is_some() {
                            return outcome;
                        }

                        let clicks = self.clicks.track_click(self.cursor);
                        let click = MouseEvent::new(
                            MouseEventKind::Clicked,
                            Some(button),
                            self.cursor,
                            self.mods,
                        )
                        .with_clicks(clicks);
                        self.dispatch_mouse(&click)
                    }
                }
            }

            WindowEvent::MouseWheel { delta, .. } => {
                let y = match delta {
                    MouseScrollDelta::LineDelta(_, y) => f64::from(*y),
                    MouseScrollDelta::PixelDelta(position) => position.y,
                };
                if y == 0.0 {
                    return None;
                }
                // winit: positive y scrolls away from the user; dispatch
                // rotation is positive toward the user
                let steps = y.abs().ceil() as i32;
                let rotation = if y > 0.0 { -steps } else { steps };
                let wheel = WheelEvent::new(rotation, self.cursor, self.mods);

                if let Some(capture) = self.active_capture() {
                    return capture.feed_wheel(&wheel).ok().flatten();
                }
                self.context.wheel_event(&wheel);
                None
            }

            _ => None,
        }
    }

    fn handle_key(&mut self, event: &winit::event::KeyEvent) -> Option<CaptureOutcome> {
        let key = key_code_from_winit(&event.logical_key)?;
        match event.state {
            ElementState::Pressed => {
                let press = KeyEvent::new(KeyPhase::Pressed, key, self.mods);
                if let Some(capture) = self.active_capture() {
                    return capture.feed_key(&press).ok().flatten();
                }
                self.context.key_pressed(&press);

                if let Some(text) = &event.text {
                    for ch in text.chars().filter(|c| !c.is_control()) {
                        let typed = KeyEvent::typed(ch, self.mods);
                        self.context.key_typed(&typed);
                    }
                }
                None
            }
            ElementState::Released => {
                let release = KeyEvent::new(KeyPhase::Released, key, self.mods);
                if let Some(capture) = self.active_capture() {
                    return capture.feed_key(&release).ok().flatten();
                }
                self.context.key_released(&release);
                None
            }
        }
    }

    fn dispatch_mouse(&self, event: &MouseEvent) -> Option<CaptureOutcome> {
        if let Some(capture) = self.active_capture() {
            return capture.feed_mouse(event).ok().flatten();
        }
        self.context.mouse_event(event);
        None
    }

    fn active_capture(&self) -> Option<&Arc<BindingCapture>> {
        self.capture.as_ref().filter(|c| c.is_capturing())
    }
}
