//! YAML persistence for user-reassigned bindings
//!
//! Defaults come from feature registration; only assignments diverging from
//! them are written out. Files are looked up in layers: a project-local
//! `bindings.yaml`, then the user config at
//! `~/.config/gimbal/bindings.yaml`. Individual bad entries are skipped
//! with a warning so one stale line never blocks the rest.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::binding::Trigger;
use crate::error::ConfigError;
use crate::registry::ControlRegistry;
use crate::types::{KeyCode, Modifiers, MouseButton, MouseEventKind, WheelDirection};

/// Root structure of a bindings YAML file
#[derive(Debug, Serialize, Deserialize)]
pub struct BindingsConfig {
    pub bindings: Vec<BindingEntry>,
}

/// One saved assignment
#[derive(Debug, Serialize, Deserialize)]
pub struct BindingEntry {
    /// Context name, e.g. "globe"
    pub context: String,
    /// Control title, e.g. "Zoom In"
    pub listener: String,
    #[serde(default)]
    pub slot: usize,
    /// Trigger string; absent means the slot was unbound
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger: Option<String>,
}

/// The user's bindings file path (`~/.config/gimbal/bindings.yaml`)
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|config| config.join("gimbal").join("bindings.yaml"))
}

/// Load a bindings file
pub fn load_bindings_file(path: &Path) -> Result<BindingsConfig, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_yaml::from_str(&content)?)
}

/// Write every assignment diverging from its registration default
pub fn save_bindings(path: &Path, registry: &ControlRegistry) -> Result<(), ConfigError> {
    let config = snapshot_bindings(registry);
    let yaml = serde_yaml::to_string(&config)?;
    std::fs::write(path, yaml)?;
    Ok(())
}

/// Collect the non-default assignments across all contexts
pub fn snapshot_bindings(registry: &ControlRegistry) -> BindingsConfig {
    let mut bindings = Vec::new();
    for context in registry.contexts() {
        for (listener, slot, trigger) in context.modified_assignments() {
            bindings.push(BindingEntry {
                context: context.name().to_owned(),
                listener,
                slot,
                trigger: trigger.map(|t| format_trigger(&t)),
            });
        }
    }
    // Stable file order regardless of registry iteration order
    bindings.sort_by(|a, b| {
        (&a.context, &a.listener, a.slot).cmp(&(&b.context, &b.listener, b.slot))
    });
    BindingsConfig { bindings }
}

/// Apply saved assignments through the normal staging path.
///
/// Returns how many entries were applied; bad entries are skipped with a
/// warning.
pub fn apply_bindings(registry: &ControlRegistry, config: &BindingsConfig) -> usize {
    let mut applied = 0;
    for entry in &config.bindings {
        let Some(context) = registry.control_context(&entry.context) else {
            warn!(context = %entry.context, "saved binding for unknown context");
            continue;
        };
        let Some(id) = context.find_listener_by_title(&entry.listener) else {
            warn!(listener = %entry.listener, "saved binding for unregistered control");
            continue;
        };
        let trigger = match &entry.trigger {
            Some(s) => match parse_trigger(s) {
                Ok(t) => Some(t),
                Err(e) => {
                    warn!(listener = %entry.listener, error = %e, "skipping saved binding");
                    continue;
                }
            },
            None => None,
        };
        let staged = context
            .stage_binding_id(id, entry.slot, trigger)
            .and_then(|()| context.commit_binding_changes_id(id));
        match staged {
            Ok(()) => applied += 1,
            Err(e) => warn!(listener = %entry.listener, error = %e, "failed to apply saved binding"),
        }
    }
    applied
}

/// Load and apply saved bindings: project-local `bindings.yaml` first, then
/// the user config file
pub fn load_saved_bindings(registry: &ControlRegistry) {
    if let Ok(config) = load_bindings_file(Path::new("bindings.yaml")) {
        let applied = apply_bindings(registry, &config);
        info!(applied, "applied project bindings.yaml");
    }

    if let Some(user_path) = user_config_path() {
        if user_path.exists() {
            match load_bindings_file(&user_path) {
                Ok(config) => {
                    let applied = apply_bindings(registry, &config);
                    info!(applied, path = %user_path.display(), "applied user bindings");
                }
                Err(e) => {
                    warn!(path = %user_path.display(), error = %e, "failed to load user bindings");
                }
            }
        }
    }
}

/// Parse a trigger string like "ctrl+shift+r", "mouse-left", or "wheel-up".
///
/// Every part before the last must be a modifier; the last part names the
/// key, typed character (`typed:r`), mouse gesture, or wheel direction.
pub fn parse_trigger(s: &str) -> Result<Trigger, ConfigError> {
    let parts: Vec<&str> = s.split('+').map(str::trim).collect();
    if parts.is_empty() || parts.iter().any(|p| p.is_empty()) {
        return Err(ConfigError::InvalidTrigger(s.to_owned()));
    }

    let Some((last, modifier_parts)) = parts.split_last() else {
        return Err(ConfigError::InvalidTrigger(s.to_owned()));
    };
    let mut mods = Modifiers::NONE;
    for part in modifier_parts {
        let modifier = parse_modifier(part)
            .ok_or_else(|| ConfigError::InvalidTrigger(s.to_owned()))?;
        mods = mods | modifier;
    }

    let last = last.to_lowercase();

    if let Some(ch) = last.strip_prefix("typed:") {
        let mut chars = ch.chars();
        let (Some(c), None) = (chars.next(), chars.next()) else {
            return Err(ConfigError::InvalidTrigger(s.to_owned()));
        };
        return Ok(Trigger::typed_with_mods(c, mods));
    }

    match last.as_str() {
        "wheel-up" => return Ok(Trigger::wheel_with_mods(WheelDirection::Up, mods)),
        "wheel-down" => return Ok(Trigger::wheel_with_mods(WheelDirection::Down, mods)),
        _ => {}
    }

    if let Some(rest) = last.strip_prefix("mouse-") {
        let (kind, button) = parse_mouse_token(rest)
            .ok_or_else(|| ConfigError::InvalidTrigger(s.to_owned()))?;
        return Ok(Trigger::mouse(kind, button, mods));
    }

    let key = parse_key_token(&last).ok_or_else(|| ConfigError::InvalidTrigger(s.to_owned()))?;
    Ok(Trigger::key_with_mods(key, mods))
}

/// Render a trigger in the string form [`parse_trigger`] accepts
pub fn format_trigger(trigger: &Trigger) -> String {
    let prefix = modifier_prefix(trigger.mods());
    match trigger {
        Trigger::KeyPress { key, .. } => format!("{}{}", prefix, key_token(*key)),
        Trigger::KeyTyped { ch, .. } => format!("{}typed:{}", prefix, ch),
        Trigger::Mouse { kind, button, .. } => {
            format!("{}mouse-{}", prefix, mouse_token(*kind, *button))
        }
        Trigger::Wheel { direction, .. } => match direction {
            WheelDirection::Up => format!("{}wheel-up", prefix),
            WheelDirection::Down => format!("{}wheel-down", prefix),
        },
    }
}

fn modifier_prefix(mods: Modifiers) -> String {
    let mut prefix = String::new();
    if mods.ctrl() {
        prefix.push_str("ctrl+");
    }
    if mods.shift() {
        prefix.push_str("shift+");
    }
    if mods.alt() {
        prefix.push_str("alt+");
    }
    if mods.meta() {
        prefix.push_str("meta+");
    }
    prefix
}

fn parse_modifier(part: &str) -> Option<Modifiers> {
    match part.to_lowercase().as_str() {
        "ctrl" | "control" => Some(Modifiers::CTRL),
        "shift" => Some(Modifiers::SHIFT),
        "alt" | "option" | "opt" => Some(Modifiers::ALT),
        "meta" | "super" | "win" | "cmd" => Some(Modifiers::META),
        _ => None,
    }
}

fn parse_key_token(key: &str) -> Option<KeyCode> {
    if key.chars().count() == 1 {
        let c = key.chars().next()?;
        return Some(KeyCode::Char(c.to_ascii_lowercase()));
    }

    if let Some(n) = key.strip_prefix('f').and_then(|n| n.parse::<u8>().ok()) {
        if (1..=24).contains(&n) {
            return Some(KeyCode::F(n));
        }
    }

    match key {
        "enter" | "return" => Some(KeyCode::Enter),
        "escape" | "esc" => Some(KeyCode::Escape),
        "tab" => Some(KeyCode::Tab),
        "backspace" | "back" => Some(KeyCode::Backspace),
        "delete" | "del" => Some(KeyCode::Delete),
        "space" => Some(KeyCode::Space),

        "up" | "arrowup" => Some(KeyCode::Up),
        "down" | "arrowdown" => Some(KeyCode::Down),
        "left" | "arrowleft" => Some(KeyCode::Left),
        "right" | "arrowright" => Some(KeyCode::Right),

        "home" => Some(KeyCode::Home),
        "end" => Some(KeyCode::End),
        "pageup" | "pgup" => Some(KeyCode::PageUp),
        "pagedown" | "pgdown" | "pgdn" => Some(KeyCode::PageDown),
        "insert" | "ins" => Some(KeyCode::Insert),

        // Bare modifier keys are bindable standalone
        "shift" => Some(KeyCode::Shift),
        "ctrl" | "control" => Some(KeyCode::Control),
        "alt" | "option" => Some(KeyCode::Alt),
        "meta" | "super" | "win" => Some(KeyCode::Meta),

        _ => None,
    }
}

fn key_token(key: KeyCode) -> String {
    match key {
        KeyCode::Char(c) => c.to_string(),
        KeyCode::Enter => "enter".into(),
        KeyCode::Escape => "escape".into(),
        KeyCode::Tab => "tab".into(),
        KeyCode::Backspace => "backspace".into(),
        KeyCode::Delete => "delete".into(),
        KeyCode::Space => "space".into(),
        KeyCode::Up => "up".into(),
        KeyCode::Down => "down".into(),
        KeyCode::Left => "left".into(),
        KeyCode::Right => "right".into(),
        KeyCode::Home => "home".into(),
        KeyCode::End => "end".into(),
        KeyCode::PageUp => "pageup".into(),
        KeyCode::PageDown => "pagedown".into(),
        KeyCode::Insert => "insert".into(),
        KeyCode::F(n) => format!("f{}", n),
        KeyCode::Shift => "shift".into(),
        KeyCode::Control => "ctrl".into(),
        KeyCode::Alt => "alt".into(),
        KeyCode::Meta => "meta".into(),
    }
}

fn parse_mouse_token(rest: &str) -> Option<(MouseEventKind, Option<MouseButton>)> {
    match rest {
        "move" => return Some((MouseEventKind::Moved, None)),
        "enter" => return Some((MouseEventKind::Entered, None)),
        "exit" => return Some((MouseEventKind::Exited, None)),
        _ => {}
    }

    let (button_token, kind_token) = match rest.split_once('-') {
        Some((button, kind)) => (button, Some(kind)),
        None => (rest, None),
    };
    let button = match button_token {
        "left" => MouseButton::Left,
        "middle" => MouseButton::Middle,
        "right" => MouseButton::Right,
        _ => return None,
    };
    let kind = match kind_token {
        None => MouseEventKind::Pressed,
        Some("click") => MouseEventKind::Clicked,
        Some("drag") => MouseEventKind::Dragged,
        Some("release") => MouseEventKind::Released,
        Some(_) => return None,
    };
    Some((kind, Some(button)))
}

fn mouse_token(kind: MouseEventKind, button: Option<MouseButton>) -> String {
    let button = match button {
        Some(MouseButton::Left) => "left",
        Some(MouseButton::Middle) => "middle",
        Some(MouseButton::Right) => "right",
        Some(MouseButton::Other(_)) | None => "",
    };
    match kind {
        MouseEventKind::Pressed => button.to_string(),
        MouseEventKind::Clicked => format!("{}-click", button),
        MouseEventKind::Dragged => format!("{}-drag", button),
        MouseEventKind::Released => format!("{}-release", button),
        MouseEventKind::Moved => "move".into(),
        MouseEventKind::Entered => "enter".into(),
        MouseEventKind::Exited => "exit".into(),
    }
}
