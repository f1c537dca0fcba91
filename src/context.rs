//! Named control contexts and the event dispatch algorithm
//!
//! A `ControlContext` is an independent bucket of bindings and listeners
//! (e.g. the 3-D globe vs the 2-D overlay). It receives raw key, mouse, and
//! wheel events from the host event loop and routes them to the winning
//! listeners using the targeting, priority, and modifier-masking rules
//! described on each dispatch method.
//!
//! Locking discipline: registration and removal may happen on any thread,
//! so all state sits behind one mutex. Dispatch snapshots the relevant
//! binding set inside the lock and invokes listeners outside it, which
//! keeps callbacks free to re-enter the context (e.g. a listener
//! unregistering another listener) without deadlocking.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Weak;

use parking_lot::Mutex;
use tracing::debug;

use crate::association::{BindingsToListener, SetEdit, MAX_BINDINGS};
use crate::binding::{Binding, BindingId, Trigger, TriggerKind};
use crate::error::ControlError;
use crate::event::{InputEvent, KeyEvent, MouseEvent, WheelEvent};
use crate::listener::{
    CompoundListener, DiscreteListener, ListenerHandle, ListenerId, ListenerKind, PickEvent,
    PickListener,
};
use crate::types::{GeometryId, Modifiers, MouseEventKind, ScreenPosition};

/// One row of the settings-UI view over a context's registered controls
#[derive(Clone, Debug)]
pub struct ControlEntry {
    pub listener: ListenerId,
    pub title: String,
    pub description: String,
    pub reassignable: bool,
    /// Display strings of the committed binding slots
    pub bindings: Vec<Option<String>>,
}

/// Controls of one category, in first-insertion order
#[derive(Clone, Debug)]
pub struct CategoryControls {
    pub category: String,
    pub controls: Vec<ControlEntry>,
}

/// How a binding participates in the current dispatch pass
enum Targeting {
    /// must-be-targeted and currently targeted: dispatch immediately
    Targeted,
    /// does not require targeting: dispatch after all targeted candidates
    Untargeted,
    /// must-be-targeted but not currently targeted (or listener gone)
    Skip,
}

/// A named, independent bucket of input bindings and their listeners
pub struct ControlContext {
    name: String,
    state: Mutex<ContextState>,
}

#[derive(Default)]
struct ContextState {
    /// Listener ids in first-insertion order
    order: Vec<ListenerId>,
    associations: HashMap<ListenerId, BindingsToListener>,
    key_press_bindings: Vec<Arc<Binding>>,
    key_typed_bindings: Vec<Arc<Binding>>,
    /// Mouse and wheel bindings share one set
    mouse_bindings: Vec<Arc<Binding>>,
    /// Bindings whose start event fired but whose end event has not.
    /// Their modifier bits are treated as claimed when matching other
    /// bindings.
    activated: Vec<Arc<Binding>>,
    pick_listeners: Vec<Weak<dyn PickListener>>,
}

impl ControlContext {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: Mutex::new(ContextState::default()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    // ------------------------------------------------------------------
    // Registration
    // ------------------------------------------------------------------

    /// Register a discrete listener with its default binding templates.
    ///
    /// Replaces any prior association for the same listener object.
    pub fn add_discrete_listener(
        &self,
        listener: Arc<dyn DiscreteListener>,
        templates: Vec<Trigger>,
    ) -> Result<(), ControlError> {
        self.add_listener(ListenerHandle::discrete(&listener), templates)
    }

    /// Register a compound listener with its default binding templates.
    ///
    /// Compound gestures need a start and an end phase, so only key-press
    /// and mouse templates are accepted.
    pub fn add_compound_listener(
        &self,
        listener: Arc<dyn CompoundListener>,
        templates: Vec<Trigger>,
    ) -> Result<(), ControlError> {
        for template in &templates {
            match template.kind() {
                TriggerKind::KeyPress | TriggerKind::Mouse => {}
                kind => {
                    return Err(ControlError::UnsupportedBinding {
                        listener: ListenerKind::Compound,
                        trigger: kind,
                    })
                }
            }
        }
        self.add_listener(ListenerHandle::compound(&listener), templates)
    }

    fn add_listener(
        &self,
        handle: ListenerHandle,
        templates: Vec<Trigger>,
    ) -> Result<(), ControlError> {
        if templates.len() > MAX_BINDINGS {
            return Err(ControlError::InvalidSlot {
                slot: templates.len() - 1,
            });
        }

        let id = handle.id();
        let bindings: Vec<Arc<Binding>> = templates
            .into_iter()
            .map(|t| Binding::new(t, handle.clone()))
            .collect();

        let mut guard = self.state.lock();
        if guard.associations.contains_key(&id) {
            debug!(context = %self.name, "replacing existing listener association");
            guard.remove_association(id);
        }
        for binding in &bindings {
            guard.insert_binding(binding.clone());
        }
        guard.order.push(id);
        guard
            .associations
            .insert(id, BindingsToListener::new(handle, bindings));
        Ok(())
    }

    /// Unregister a listener and remove all of its bindings
    pub fn remove_listener<L: ?Sized>(&self, listener: &Arc<L>) {
        self.remove_listener_id(ListenerId::of(listener));
    }

    /// Unregister several listeners at once
    pub fn remove_listeners<'a, L, I>(&self, listeners: I)
    where
        L: ?Sized + 'a,
        I: IntoIterator<Item = &'a Arc<L>>,
    {
        for listener in listeners {
            self.remove_listener(listener);
        }
    }

    pub(crate) fn remove_listener_id(&self, id: ListenerId) {
        self.state.lock().remove_association(id);
    }

    // ------------------------------------------------------------------
    // Keyboard dispatch
    // ------------------------------------------------------------------

    /// Route a key-press event.
    ///
    /// Two passes over the key-press set in registration order: targeted
    /// bindings (must-be-targeted and currently targeted) fire first, then
    /// the untargeted remainder, stopping at the first consumer. Modifier
    /// bits already claimed by an activated binding are masked out of the
    /// incoming event before comparison, and a binding triggered by a bare
    /// modifier key skips the comparison entirely.
    pub fn key_pressed(&self, event: &KeyEvent) {
        let (snapshot, used) = {
            let mut guard = self.state.lock();
            guard.prune_dead();
            (guard.key_press_bindings.clone(), guard.used_modifiers())
        };

        let mut untargeted = Vec::new();
        for binding in snapshot {
            if !Self::key_press_matches(&binding, event, used) {
                continue;
            }
            match Self::targeting(&binding) {
                Targeting::Targeted => {
                    self.fire_key_press(&binding, event);
                    if event.is_consumed() {
                        return;
                    }
                }
                Targeting::Untargeted => untargeted.push(binding),
                Targeting::Skip => {}
            }
        }
        for binding in untargeted {
            self.fire_key_press(&binding, event);
            if event.is_consumed() {
                return;
            }
        }
    }

    /// Route a key-release event.
    ///
    /// Same two-pass structure as [`key_pressed`](Self::key_pressed). A
    /// binding that is currently activated matches its release by key code
    /// alone, mirroring the mouse rule that release events fire regardless
    /// of modifier state; everything else uses the standard modifier match.
    pub fn key_released(&self, event: &KeyEvent) {
        let (snapshot, used, activated) = {
            let mut guard = self.state.lock();
            guard.prune_dead();
            (
                guard.key_press_bindings.clone(),
                guard.used_modifiers(),
                guard.activated_ids(),
            )
        };

        let matches = |binding: &Arc<Binding>| {
            let Trigger::KeyPress { key, .. } = binding.trigger() else {
                return false;
            };
            if key != event.key {
                return false;
            }
            activated.contains(&binding.id()) || Self::key_press_matches(binding, event, used)
        };

        let mut untargeted = Vec::new();
        for binding in snapshot {
            if !matches(&binding) {
                continue;
            }
            match Self::targeting(&binding) {
                Targeting::Targeted => {
                    self.fire_key_release(&binding, event);
                    if event.is_consumed() {
                        return;
                    }
                }
                Targeting::Untargeted => untargeted.push(binding),
                Targeting::Skip => {}
            }
        }
        for binding in untargeted {
            self.fire_key_release(&binding, event);
            if event.is_consumed() {
                return;
            }
        }
    }

    /// Route a typed-character event.
    ///
    /// Matches on character plus exact modifier equality; no masking
    /// exception and no activation tracking.
    pub fn key_typed(&self, event: &KeyEvent) {
        let Some(ch) = event.ch.map(|c| c.to_ascii_lowercase()) else {
            return;
        };

        let snapshot = {
            let mut guard = self.state.lock();
            guard.prune_dead();
            guard.key_typed_bindings.clone()
        };

        let mut untargeted = Vec::new();
        for binding in snapshot {
            let Trigger::KeyTyped { ch: bound, mods } = binding.trigger() else {
                continue;
            };
            if bound != ch || mods != event.mods {
                continue;
            }
            match Self::targeting(&binding) {
                Targeting::Targeted => {
                    self.fire_key_typed(&binding, event);
                    if event.is_consumed() {
                        return;
                    }
                }
                Targeting::Untargeted => untargeted.push(binding),
                Targeting::Skip => {}
            }
        }
        for binding in untargeted {
            self.fire_key_typed(&binding, event);
            if event.is_consumed() {
                return;
            }
        }
    }

    fn key_press_matches(binding: &Arc<Binding>, event: &KeyEvent, used: Modifiers) -> bool {
        let Trigger::KeyPress { key, mods } = binding.trigger() else {
            return false;
        };
        if key != event.key {
            return false;
        }
        // A bare modifier key can be bound standalone without fighting
        // modifier-combo bindings.
        if key.is_modifier() {
            return true;
        }
        // Incoming bits not already claimed by an activated binding.
        let applicable = (used & event.mods) ^ event.mods;
        mods == applicable
    }

    fn fire_key_press(&self, binding: &Arc<Binding>, event: &KeyEvent) {
        match binding.listener() {
            ListenerHandle::Discrete(w) => {
                let Some(listener) = w.upgrade() else { return };
                listener.event_occurred(InputEvent::Key(event));
            }
            ListenerHandle::Compound(w) => {
                let Some(listener) = w.upgrade() else { return };
                listener.event_started(InputEvent::Key(event));
            }
        }
        self.state.lock().activate(binding);
    }

    fn fire_key_release(&self, binding: &Arc<Binding>, event: &KeyEvent) {
        if let ListenerHandle::Compound(w) = binding.listener() {
            if let Some(listener) = w.upgrade() {
                listener.event_ended(InputEvent::Key(event));
            }
        }
        self.state.lock().deactivate(binding.id());
    }

    fn fire_key_typed(&self, binding: &Arc<Binding>, event: &KeyEvent) {
        match binding.listener() {
            ListenerHandle::Discrete(w) => {
                let Some(listener) = w.upgrade() else { return };
                listener.event_occurred(InputEvent::Key(event));
            }
            ListenerHandle::Compound(_) => {
                unreachable!("compound listeners cannot hold key-typed bindings")
            }
        }
    }

    // ------------------------------------------------------------------
    // Mouse dispatch
    // ------------------------------------------------------------------

    /// Route a mouse event.
    ///
    /// Targeted bindings are tried first in descending listener priority
    /// (stable tie-break), then the untargeted remainder. A compound
    /// press binding also receives the drag and release continuation
    /// events while activated. Enter, exit, and release events match
    /// regardless of modifier state; everything else needs exact modifier
    /// equality.
    pub fn mouse_event(&self, event: &MouseEvent) {
        let ignore_mods = matches!(
            event.kind,
            MouseEventKind::Entered | MouseEventKind::Exited | MouseEventKind::Released
        );

        let (snapshot, activated) = {
            let mut guard = self.state.lock();
            guard.prune_dead();
            (guard.mouse_bindings.clone(), guard.activated_ids())
        };

        for binding in Self::ordered_candidates(snapshot) {
            if !Self::mouse_matches(&binding, event, ignore_mods, &activated) {
                continue;
            }
            self.fire_mouse(&binding, event);
            if event.is_consumed() {
                return;
            }
        }
    }

    /// Route a wheel event.
    ///
    /// A wheel binding matches when its direction sign matches the
    /// rotation sign, whatever the magnitude, with exact modifier
    /// equality.
    pub fn wheel_event(&self, event: &WheelEvent) {
        let snapshot = {
            let mut guard = self.state.lock();
            guard.prune_dead();
            guard.mouse_bindings.clone()
        };

        for binding in Self::ordered_candidates(snapshot) {
            let Trigger::Wheel { direction, mods } = binding.trigger() else {
                continue;
            };
            if direction.sign() != event.rotation.signum() || mods != event.mods {
                continue;
            }
            match binding.listener() {
                ListenerHandle::Discrete(w) => {
                    let Some(listener) = w.upgrade() else { continue };
                    listener.event_occurred(InputEvent::Wheel(event));
                }
                ListenerHandle::Compound(_) => {
                    unreachable!("compound listeners cannot hold wheel bindings")
                }
            }
            self.state.lock().deactivate(binding.id());
            if event.is_consumed() {
                return;
            }
        }
    }

    /// Partition into targeted-then-untargeted, with the targeted half in
    /// descending listener priority (stable, so ties keep registration
    /// order).
    fn ordered_candidates(snapshot: Vec<Arc<Binding>>) -> impl Iterator<Item = Arc<Binding>> {
        let mut targeted = Vec::new();
        let mut untargeted = Vec::new();
        for binding in snapshot {
            match Self::targeting(&binding) {
                Targeting::Targeted => targeted.push(binding),
                Targeting::Untargeted => untargeted.push(binding),
                Targeting::Skip => {}
            }
        }
        targeted.sort_by_key(|b| std::cmp::Reverse(b.listener().target_priority().unwrap_or(0)));
        targeted.into_iter().chain(untargeted)
    }

    fn mouse_matches(
        binding: &Arc<Binding>,
        event: &MouseEvent,
        ignore_mods: bool,
        activated: &[BindingId],
    ) -> bool {
        let Trigger::Mouse { kind, button, mods } = binding.trigger() else {
            return false;
        };

        // An activated press binding follows its gesture to the release;
        // compound listeners also receive the drags in between.
        let continuation = kind == MouseEventKind::Pressed
            && activated.contains(&binding.id())
            && match event.kind {
                MouseEventKind::Released => true,
                MouseEventKind::Dragged => binding.listener().is_compound(),
                _ => false,
            };
        if kind != event.kind && !continuation {
            return false;
        }

        if let Some(required) = button {
            if event.button != Some(required) {
                return false;
            }
        }

        ignore_mods || mods == event.mods
    }

    fn fire_mouse(&self, binding: &Arc<Binding>, event: &MouseEvent) {
        match binding.listener() {
            ListenerHandle::Discrete(w) => {
                let Some(listener) = w.upgrade() else { return };
                // The release of a press binding only clears its activation
                // so the modifier bits it claimed become free again; the
                // discrete callback already fired on the press.
                let press_release = event.kind == MouseEventKind::Released
                    && matches!(
                        binding.trigger(),
                        Trigger::Mouse {
                            kind: MouseEventKind::Pressed,
                            ..
                        }
                    );
                if press_release {
                    self.state.lock().deactivate(binding.id());
                    return;
                }
                listener.event_occurred(InputEvent::Mouse(event));
                match event.kind {
                    MouseEventKind::Pressed => self.state.lock().activate(binding),
                    MouseEventKind::Released => self.state.lock().deactivate(binding.id()),
                    _ => {}
                }
            }
            ListenerHandle::Compound(w) => {
                let Some(listener) = w.upgrade() else { return };
                match event.kind {
                    MouseEventKind::Pressed => {
                        listener.event_started(InputEvent::Mouse(event));
                        self.state.lock().activate(binding);
                    }
                    MouseEventKind::Released => {
                        listener.event_ended(InputEvent::Mouse(event));
                        self.state.lock().deactivate(binding.id());
                    }
                    MouseEventKind::Dragged => listener.mouse_dragged(event),
                    MouseEventKind::Moved => listener.mouse_moved(event),
                    MouseEventKind::Clicked => listener.mouse_clicked(event),
                    MouseEventKind::Entered => listener.mouse_entered(event),
                    MouseEventKind::Exited => listener.mouse_exited(event),
                }
            }
        }
    }

    fn targeting(binding: &Arc<Binding>) -> Targeting {
        match binding.listener().must_be_targeted() {
            Some(true) => {
                if binding.listener().is_targeted() == Some(true) {
                    Targeting::Targeted
                } else {
                    Targeting::Skip
                }
            }
            Some(false) => Targeting::Untargeted,
            // Listener died between snapshot and dispatch
            None => Targeting::Skip,
        }
    }

    // ------------------------------------------------------------------
    // Pick side channel
    // ------------------------------------------------------------------

    pub fn add_pick_listener(&self, listener: &Arc<dyn PickListener>) {
        self.state.lock().pick_listeners.push(Arc::downgrade(listener));
    }

    pub fn remove_pick_listener(&self, listener: &Arc<dyn PickListener>) {
        let target = Arc::as_ptr(listener) as *const () as usize;
        self.state
            .lock()
            .pick_listeners
            .retain(|w| w.strong_count() > 0 && w.as_ptr() as *const () as usize != target);
    }

    /// Notify pick listeners that the geometry under the cursor changed.
    ///
    /// Fired by the rendering layer; unrelated to key/mouse dispatch.
    pub fn notify_picked(&self, geometry: Option<GeometryId>, position: ScreenPosition) {
        let snapshot: Vec<Arc<dyn PickListener>> = {
            let mut guard = self.state.lock();
            guard.pick_listeners.retain(|w| w.strong_count() > 0);
            guard.pick_listeners.iter().filter_map(Weak::upgrade).collect()
        };
        let pick = PickEvent { geometry, position };
        for listener in snapshot {
            listener.picked(&pick);
        }
    }

    // ------------------------------------------------------------------
    // Reassignment surface
    // ------------------------------------------------------------------

    /// Stage a replacement trigger for one of the listener's binding slots
    pub fn stage_binding<L: ?Sized>(
        &self,
        listener: &Arc<L>,
        slot: usize,
        trigger: Option<Trigger>,
    ) -> Result<(), ControlError> {
        self.stage_binding_id(ListenerId::of(listener), slot, trigger)
    }

    /// Stage an empty slot
    pub fn stage_clear<L: ?Sized>(&self, listener: &Arc<L>, slot: usize) -> Result<(), ControlError> {
        self.stage_binding_id(ListenerId::of(listener), slot, None)
    }

    /// Stage the original default for one of the listener's binding slots
    pub fn stage_reset<L: ?Sized>(&self, listener: &Arc<L>, slot: usize) -> Result<(), ControlError> {
        self.stage_reset_id(ListenerId::of(listener), slot)
    }

    /// Discard the listener's staged edit
    pub fn cancel_binding_changes<L: ?Sized>(&self, listener: &Arc<L>) -> Result<(), ControlError> {
        self.cancel_binding_changes_id(ListenerId::of(listener))
    }

    /// Commit the listener's staged edit into the dispatch sets
    pub fn commit_binding_changes<L: ?Sized>(&self, listener: &Arc<L>) -> Result<(), ControlError> {
        self.commit_binding_changes_id(ListenerId::of(listener))
    }

    /// Committed trigger at `slot`, if any
    pub fn binding<L: ?Sized>(&self, listener: &Arc<L>, slot: usize) -> Option<Trigger> {
        let guard = self.state.lock();
        let assoc = guard.associations.get(&ListenerId::of(listener))?;
        assoc.binding(slot).map(|b| b.trigger())
    }

    /// Staged trigger at `slot` (committed when no edit is underway)
    pub fn staged_binding<L: ?Sized>(&self, listener: &Arc<L>, slot: usize) -> Option<Trigger> {
        let guard = self.state.lock();
        let assoc = guard.associations.get(&ListenerId::of(listener))?;
        assoc.staged_binding(slot).map(|b| b.trigger())
    }

    /// Committed triggers for every slot of the listener
    pub fn bindings<L: ?Sized>(&self, listener: &Arc<L>) -> Option<Vec<Option<Trigger>>> {
        let guard = self.state.lock();
        let assoc = guard.associations.get(&ListenerId::of(listener))?;
        Some(
            assoc
                .bindings()
                .iter()
                .map(|b| b.as_ref().map(|b| b.trigger()))
                .collect(),
        )
    }

    pub(crate) fn stage_binding_id(
        &self,
        id: ListenerId,
        slot: usize,
        trigger: Option<Trigger>,
    ) -> Result<(), ControlError> {
        self.state
            .lock()
            .associations
            .get_mut(&id)
            .ok_or(ControlError::UnknownListener)?
            .stage_trigger(slot, trigger)
    }

    pub(crate) fn stage_reset_id(&self, id: ListenerId, slot: usize) -> Result<(), ControlError> {
        self.state
            .lock()
            .associations
            .get_mut(&id)
            .ok_or(ControlError::UnknownListener)?
            .stage_reset(slot)
    }

    pub(crate) fn cancel_binding_changes_id(&self, id: ListenerId) -> Result<(), ControlError> {
        self.state
            .lock()
            .associations
            .get_mut(&id)
            .ok_or(ControlError::UnknownListener)?
            .cancel_changes();
        Ok(())
    }

    pub(crate) fn commit_binding_changes_id(&self, id: ListenerId) -> Result<(), ControlError> {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        let assoc = state
            .associations
            .get_mut(&id)
            .ok_or(ControlError::UnknownListener)?;
        let edits = assoc.commit_changes();
        for edit in edits {
            state.apply_edit(edit);
        }
        Ok(())
    }

    /// Find another committed binding structurally equal to `trigger`,
    /// excluding one (listener, slot) pair. Scan order is first-insertion
    /// order.
    pub(crate) fn find_conflict(
        &self,
        trigger: Trigger,
        exclude: (ListenerId, usize),
    ) -> Option<(ListenerId, usize)> {
        let guard = self.state.lock();
        for id in &guard.order {
            let assoc = &guard.associations[id];
            for slot in 0..MAX_BINDINGS {
                if (*id, slot) == exclude {
                    continue;
                }
                if assoc.binding(slot).map(|b| b.trigger()) == Some(trigger) {
                    return Some((*id, slot));
                }
            }
        }
        None
    }

    pub(crate) fn listener_kind(&self, id: ListenerId) -> Option<ListenerKind> {
        let guard = self.state.lock();
        Some(guard.associations.get(&id)?.listener().kind())
    }

    pub(crate) fn listener_title(&self, id: ListenerId) -> Option<String> {
        let guard = self.state.lock();
        guard.associations.get(&id)?.listener().title()
    }

    pub(crate) fn listener_reassignable(&self, id: ListenerId) -> Option<bool> {
        let guard = self.state.lock();
        guard.associations.get(&id)?.listener().is_reassignable()
    }

    // ------------------------------------------------------------------
    // Settings-UI surface
    // ------------------------------------------------------------------

    /// All registered controls grouped by category, in first-insertion
    /// order. Consumed by the settings UI that lets users browse and
    /// rebind controls.
    pub fn listeners_by_category(&self) -> Vec<CategoryControls> {
        let mut guard = self.state.lock();
        guard.prune_dead();

        let mut groups: Vec<CategoryControls> = Vec::new();
        for id in &guard.order {
            let assoc = &guard.associations[id];
            let Some(category) = assoc.listener().category() else {
                continue;
            };
            let entry = ControlEntry {
                listener: *id,
                title: assoc.listener().title().unwrap_or_default(),
                description: assoc.listener().description().unwrap_or_default(),
                reassignable: assoc.listener().is_reassignable().unwrap_or(true),
                bindings: assoc
                    .bindings()
                    .iter()
                    .map(|b| b.as_ref().map(|b| b.trigger().to_string()))
                    .collect(),
            };
            match groups.iter_mut().find(|g| g.category == category) {
                Some(group) => group.controls.push(entry),
                None => groups.push(CategoryControls {
                    category,
                    controls: vec![entry],
                }),
            }
        }
        groups
    }

    /// Find a registered control by its title, for applying saved bindings
    pub(crate) fn find_listener_by_title(&self, title: &str) -> Option<ListenerId> {
        let guard = self.state.lock();
        guard.order.iter().copied().find(|id| {
            guard
                .associations
                .get(id)
                .and_then(|assoc| assoc.listener().title())
                .is_some_and(|t| t == title)
        })
    }

    /// (title, slot, trigger) for every slot diverging from its
    /// registration-time default, for persistence
    pub(crate) fn modified_assignments(&self) -> Vec<(String, usize, Option<Trigger>)> {
        let guard = self.state.lock();
        let mut out = Vec::new();
        for id in &guard.order {
            let assoc = &guard.associations[id];
            if !assoc.is_modified() {
                continue;
            }
            let Some(title) = assoc.listener().title() else {
                continue;
            };
            for slot in 0..MAX_BINDINGS {
                let committed = assoc.binding(slot).map(|b| b.trigger());
                if committed != assoc.default_trigger(slot) {
                    out.push((title.clone(), slot, committed));
                }
            }
        }
        out
    }
}

impl std::fmt::Debug for ControlContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControlContext")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl ContextState {
    fn set_for(&mut self, kind: TriggerKind) -> &mut Vec<Arc<Binding>> {
        match kind {
            TriggerKind::KeyPress => &mut self.key_press_bindings,
            TriggerKind::KeyTyped => &mut self.key_typed_bindings,
            TriggerKind::Mouse | TriggerKind::Wheel => &mut self.mouse_bindings,
        }
    }

    fn insert_binding(&mut self, binding: Arc<Binding>) {
        self.set_for(binding.kind()).push(binding);
    }

    /// Remove by membership from every set, activated included
    fn remove_binding(&mut self, id: BindingId) {
        self.key_press_bindings.retain(|b| b.id() != id);
        self.key_typed_bindings.retain(|b| b.id() != id);
        self.mouse_bindings.retain(|b| b.id() != id);
        self.activated.retain(|b| b.id() != id);
    }

    fn apply_edit(&mut self, edit: SetEdit) {
        match edit {
            SetEdit::Remove(binding) => self.remove_binding(binding.id()),
            SetEdit::Add(binding) => self.insert_binding(binding),
        }
    }

    fn remove_association(&mut self, id: ListenerId) {
        self.order.retain(|l| *l != id);
        if let Some(assoc) = self.associations.remove(&id) {
            for binding in assoc.bindings().iter().flatten() {
                self.remove_binding(binding.id());
            }
        }
    }

    fn activate(&mut self, binding: &Arc<Binding>) {
        if self.activated.iter().any(|b| b.id() == binding.id()) {
            return;
        }
        // A callback may have unregistered the listener mid-dispatch; an
        // unregistered binding must not linger in the activated set.
        let registered = match binding.kind() {
            TriggerKind::KeyPress => &self.key_press_bindings,
            TriggerKind::KeyTyped => &self.key_typed_bindings,
            TriggerKind::Mouse | TriggerKind::Wheel => &self.mouse_bindings,
        }
        .iter()
        .any(|b| b.id() == binding.id());
        if registered {
            self.activated.push(binding.clone());
        }
    }

    fn deactivate(&mut self, id: BindingId) {
        self.activated.retain(|b| b.id() != id);
    }

    fn activated_ids(&self) -> Vec<BindingId> {
        self.activated.iter().map(|b| b.id()).collect()
    }

    /// Modifier bits claimed by activated bindings
    fn used_modifiers(&self) -> Modifiers {
        self.activated
            .iter()
            .fold(Modifiers::NONE, |mods, b| mods | b.trigger().mods())
    }

    fn prune_dead(&mut self) {
        let dead: Vec<ListenerId> = self
            .associations
            .iter()
            .filter(|(_, assoc)| !assoc.listener().is_alive())
            .map(|(id, _)| *id)
            .collect();
        for id in dead {
            debug!(listener = ?id, "pruning dropped control listener");
            self.remove_association(id);
        }
    }
}
