//! Process-wide lookup of the fixed control contexts
//!
//! The context set is created once at startup and never changes: the 3-D
//! globe viewport and the 2-D UI overlay each get an independent bucket of
//! bindings, so overlay controls never shadow globe controls and vice
//! versa.

use std::collections::HashMap;
use std::sync::Arc;

use crate::context::ControlContext;

/// Context for input over the 3-D globe viewport
pub const GLOBE_CONTEXT: &str = "globe";

/// Context for input over the 2-D UI overlay
pub const UI_CONTEXT: &str = "glui";

/// Registry mapping fixed context names to their shared contexts
pub struct ControlRegistry {
    contexts: HashMap<&'static str, Arc<ControlContext>>,
}

impl ControlRegistry {
    /// Build the fixed context set
    pub fn new() -> Self {
        let mut contexts = HashMap::new();
        for name in [GLOBE_CONTEXT, UI_CONTEXT] {
            contexts.insert(name, Arc::new(ControlContext::new(name)));
        }
        Self { contexts }
    }

    /// Look up a context by name
    pub fn control_context(&self, name: &str) -> Option<Arc<ControlContext>> {
        self.contexts.get(name).cloned()
    }

    /// The globe viewport context
    pub fn globe(&self) -> Arc<ControlContext> {
        self.contexts[GLOBE_CONTEXT].clone()
    }

    /// The UI overlay context
    pub fn ui(&self) -> Arc<ControlContext> {
        self.contexts[UI_CONTEXT].clone()
    }

    /// All contexts, for persistence sweeps
    pub fn contexts(&self) -> impl Iterator<Item = &Arc<ControlContext>> {
        self.contexts.values()
    }
}

impl Default for ControlRegistry {
    fn default() -> Self {
        Self::new()
    }
}
