//! Association between one listener and its binding slots
//!
//! Each registered listener owns up to [`MAX_BINDINGS`] concurrently active
//! bindings. Interactive reassignment edits a *staged* copy of the slots;
//! nothing reaches the context's dispatch sets until the edit is committed.
//! The first commit that actually changes a slot snapshots the then-current
//! triggers as the original defaults, so "reset to default" always restores
//! the registration-time gesture regardless of how many edits happened since.

use std::sync::Arc;

use crate::binding::{Binding, Trigger};
use crate::error::ControlError;
use crate::listener::ListenerHandle;

/// How many bindings one listener can hold at once
pub const MAX_BINDINGS: usize = 2;

/// A set mutation the owning context must apply after a commit.
///
/// The association never touches the context's dispatch sets itself; it
/// reports exactly which runtime bindings to remove and add.
#[derive(Debug)]
pub enum SetEdit {
    Remove(Arc<Binding>),
    Add(Arc<Binding>),
}

/// One listener and its committed, staged, and default binding slots
pub struct BindingsToListener {
    listener: ListenerHandle,
    committed: [Option<Arc<Binding>>; MAX_BINDINGS],
    /// Triggers captured at the first real mutation; `None` until then
    defaults: Option<[Option<Trigger>; MAX_BINDINGS]>,
    /// In-progress edit, absent unless a reassignment is underway
    staged: Option<[Option<Arc<Binding>>; MAX_BINDINGS]>,
}

impl BindingsToListener {
    /// Wrap freshly registered bindings. At most [`MAX_BINDINGS`] are kept;
    /// callers validate the count beforehand.
    pub fn new(listener: ListenerHandle, bindings: Vec<Arc<Binding>>) -> Self {
        let mut committed: [Option<Arc<Binding>>; MAX_BINDINGS] = Default::default();
        for (slot, binding) in bindings.into_iter().take(MAX_BINDINGS).enumerate() {
            committed[slot] = Some(binding);
        }
        Self {
            listener,
            committed,
            defaults: None,
            staged: None,
        }
    }

    pub fn listener(&self) -> &ListenerHandle {
        &self.listener
    }

    /// Stage a replacement binding at `slot`
    pub fn stage_binding(
        &mut self,
        slot: usize,
        binding: Option<Arc<Binding>>,
    ) -> Result<(), ControlError> {
        self.staged_slots_mut(slot)?[slot] = binding;
        Ok(())
    }

    /// Stage a replacement trigger at `slot`, building the runtime binding
    /// against this association's listener
    pub fn stage_trigger(
        &mut self,
        slot: usize,
        trigger: Option<Trigger>,
    ) -> Result<(), ControlError> {
        let binding = trigger.map(|t| Binding::new(t, self.listener.clone()));
        self.stage_binding(slot, binding)
    }

    /// Stage an empty slot
    pub fn stage_clear(&mut self, slot: usize) -> Result<(), ControlError> {
        self.stage_binding(slot, None)
    }

    /// Stage the original default for `slot`.
    ///
    /// Falls back to the current committed value when no default was ever
    /// captured (the association has never been modified).
    pub fn stage_reset(&mut self, slot: usize) -> Result<(), ControlError> {
        if slot >= MAX_BINDINGS {
            return Err(ControlError::InvalidSlot { slot });
        }
        match self.defaults {
            Some(defaults) => self.stage_trigger(slot, defaults[slot]),
            None => {
                let current = self.committed[slot].clone();
                self.stage_binding(slot, current)
            }
        }
    }

    /// Discard the staged edit without committing
    pub fn cancel_changes(&mut self) {
        self.staged = None;
    }

    /// Whether a staged edit exists
    pub fn has_pending(&self) -> bool {
        self.staged.is_some()
    }

    /// Commit the staged edit slot-by-slot.
    ///
    /// Returns the set edits the owning context must apply: every replaced
    /// committed binding is removed from its kind-matching set, every newly
    /// staged one added. Defaults are snapshotted before the first mutation.
    pub fn commit_changes(&mut self) -> Vec<SetEdit> {
        let Some(staged) = self.staged.take() else {
            return Vec::new();
        };

        let changed = (0..MAX_BINDINGS).any(|i| !Self::same_slot(&self.committed[i], &staged[i]));
        if changed && self.defaults.is_none() {
            let mut defaults: [Option<Trigger>; MAX_BINDINGS] = Default::default();
            for (slot, binding) in self.committed.iter().enumerate() {
                defaults[slot] = binding.as_ref().map(|b| b.trigger());
            }
            self.defaults = Some(defaults);
        }

        let mut edits = Vec::new();
        for (slot, staged_binding) in staged.into_iter().enumerate() {
            if Self::same_slot(&self.committed[slot], &staged_binding) {
                continue;
            }
            if let Some(old) = self.committed[slot].take() {
                edits.push(SetEdit::Remove(old));
            }
            if let Some(new) = &staged_binding {
                edits.push(SetEdit::Add(new.clone()));
            }
            self.committed[slot] = staged_binding;
        }
        edits
    }

    /// Committed binding at `slot`
    pub fn binding(&self, slot: usize) -> Option<Arc<Binding>> {
        self.committed.get(slot).and_then(|b| b.clone())
    }

    /// Staged binding at `slot` if an edit is underway, else the committed one
    pub fn staged_binding(&self, slot: usize) -> Option<Arc<Binding>> {
        match &self.staged {
            Some(staged) => staged.get(slot).and_then(|b| b.clone()),
            None => self.binding(slot),
        }
    }

    /// Copy of the committed slots
    pub fn bindings(&self) -> [Option<Arc<Binding>>; MAX_BINDINGS] {
        self.committed.clone()
    }

    /// Copy of the staged slots (committed when no edit is underway)
    pub fn staged_bindings(&self) -> [Option<Arc<Binding>>; MAX_BINDINGS] {
        match &self.staged {
            Some(staged) => staged.clone(),
            None => self.committed.clone(),
        }
    }

    /// Original default trigger for `slot`, if the association was ever
    /// modified
    pub fn default_trigger(&self, slot: usize) -> Option<Trigger> {
        self.defaults.as_ref().and_then(|d| d.get(slot).copied().flatten())
    }

    /// Whether any commit has diverged from the registration-time bindings
    pub fn is_modified(&self) -> bool {
        match &self.defaults {
            None => false,
            Some(defaults) => (0..MAX_BINDINGS).any(|slot| {
                self.committed[slot].as_ref().map(|b| b.trigger()) != defaults[slot]
            }),
        }
    }

    fn same_slot(a: &Option<Arc<Binding>>, b: &Option<Arc<Binding>>) -> bool {
        match (a, b) {
            (None, None) => true,
            (Some(a), Some(b)) => a.id() == b.id(),
            _ => false,
        }
    }

    fn staged_slots_mut(
        &mut self,
        slot: usize,
    ) -> Result<&mut [Option<Arc<Binding>>; MAX_BINDINGS], ControlError> {
        if slot >= MAX_BINDINGS {
            return Err(ControlError::InvalidSlot { slot });
        }
        Ok(self.staged.get_or_insert_with(|| self.committed.clone()))
    }
}
