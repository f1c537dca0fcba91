//! Gimbal - input control and binding dispatch for a desktop globe viewer
//!
//! This crate routes raw key, mouse, and wheel events to the UI features
//! that registered for them. Features declare *discrete* gestures (one
//! callback per physical event) or *compound* gestures (start/end callbacks
//! around a press-drag-release), grouped into named contexts so globe
//! controls and overlay controls never shadow each other. Users can rebind
//! any reassignable control at runtime, and the custom assignments persist
//! to a YAML file.
//!
//! # Architecture
//!
//! ```text
//! winit::WindowEvent → WinitEventSink → ControlContext::{key,mouse,wheel}_*
//!                                          │ match against registered Bindings
//!                                          ▼
//!                          DiscreteListener / CompoundListener callbacks
//! ```
//!
//! # Registering a control
//!
//! ```ignore
//! let registry = ControlRegistry::new();
//! let globe = registry.globe();
//! globe.add_discrete_listener(zoom_in.clone(), vec![Trigger::key(KeyCode::Up)])?;
//! ```

pub mod association;
pub mod binding;
pub mod config;
pub mod context;
pub mod error;
pub mod event;
pub mod listener;
pub mod reassign;
pub mod registry;
pub mod types;
pub mod winit_adapter;

// Re-export commonly used types
pub use association::{BindingsToListener, SetEdit, MAX_BINDINGS};
pub use binding::{Binding, BindingId, Trigger, TriggerKind};
pub use context::{CategoryControls, ControlContext, ControlEntry};
pub use error::{ConfigError, ControlError};
pub use event::{InputEvent, KeyEvent, KeyPhase, MouseEvent, WheelEvent};
pub use listener::{
    CompoundListener, ControlListener, DiscreteListener, ListenerId, ListenerKind, PickEvent,
    PickListener,
};
pub use reassign::{
    BindingCapture, CaptureOutcome, OverrideNotice, PendingAssignment, ReassignListener,
};
pub use registry::{ControlRegistry, GLOBE_CONTEXT, UI_CONTEXT};
pub use types::{
    GeometryId, KeyCode, Modifiers, MouseButton, MouseEventKind, ScreenPosition, WheelDirection,
};
pub use winit_adapter::WinitEventSink;

#[cfg(test)]
mod tests;
