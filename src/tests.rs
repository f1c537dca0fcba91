//! Integration tests for the control binding system

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::binding::Trigger;
use crate::config;
use crate::context::ControlContext;
use crate::error::ControlError;
use crate::event::{InputEvent, KeyEvent, KeyPhase, MouseEvent, WheelEvent};
use crate::listener::{CompoundListener, ControlListener, DiscreteListener, PickListener};
use crate::reassign::{BindingCapture, CaptureOutcome, OverrideNotice, ReassignListener};
use crate::registry::ControlRegistry;
use crate::types::{
    GeometryId, KeyCode, Modifiers, MouseButton, MouseEventKind, ScreenPosition, WheelDirection,
};

// ---------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------

/// Discrete listener recording invocations
struct Recorder {
    category: &'static str,
    title: &'static str,
    must_target: bool,
    targeted: AtomicBool,
    priority: i32,
    consume: bool,
    occurred: AtomicUsize,
}

impl Recorder {
    fn new(title: &'static str) -> Arc<Self> {
        Arc::new(Self {
            category: "View",
            title,
            must_target: false,
            targeted: AtomicBool::new(false),
            priority: 0,
            consume: false,
            occurred: AtomicUsize::new(0),
        })
    }

    fn targeted(title: &'static str, priority: i32, consume: bool) -> Arc<Self> {
        Arc::new(Self {
            category: "View",
            title,
            must_target: true,
            targeted: AtomicBool::new(true),
            priority,
            consume,
            occurred: AtomicUsize::new(0),
        })
    }

    fn count(&self) -> usize {
        self.occurred.load(Ordering::SeqCst)
    }
}

impl ControlListener for Recorder {
    fn category(&self) -> &str {
        self.category
    }
    fn title(&self) -> &str {
        self.title
    }
    fn must_be_targeted(&self) -> bool {
        self.must_target
    }
    fn is_targeted(&self) -> bool {
        self.targeted.load(Ordering::SeqCst)
    }
    fn target_priority(&self) -> i32 {
        self.priority
    }
}

impl DiscreteListener for Recorder {
    fn event_occurred(&self, event: InputEvent<'_>) {
        self.occurred.fetch_add(1, Ordering::SeqCst);
        if self.consume {
            event.consume();
        }
    }
}

/// Compound listener recording gesture phases
struct GestureRecorder {
    title: &'static str,
    started: AtomicUsize,
    ended: AtomicUsize,
    dragged: AtomicUsize,
    moved: AtomicUsize,
}

impl GestureRecorder {
    fn new(title: &'static str) -> Arc<Self> {
        Arc::new(Self {
            title,
            started: AtomicUsize::new(0),
            ended: AtomicUsize::new(0),
            dragged: AtomicUsize::new(0),
            moved: AtomicUsize::new(0),
        })
    }
}

impl ControlListener for GestureRecorder {
    fn category(&self) -> &str {
        "Navigation"
    }
    fn title(&self) -> &str {
        self.title
    }
}

impl CompoundListener for GestureRecorder {
    fn event_started(&self, _event: InputEvent<'_>) {
        self.started.fetch_add(1, Ordering::SeqCst);
    }
    fn event_ended(&self, _event: InputEvent<'_>) {
        self.ended.fetch_add(1, Ordering::SeqCst);
    }
    fn mouse_dragged(&self, _event: &MouseEvent) {
        self.dragged.fetch_add(1, Ordering::SeqCst);
    }
    fn mouse_moved(&self, _event: &MouseEvent) {
        self.moved.fetch_add(1, Ordering::SeqCst);
    }
}

fn key_press(key: KeyCode) -> KeyEvent {
    KeyEvent::new(KeyPhase::Pressed, key, Modifiers::NONE)
}

fn key_press_mods(key: KeyCode, mods: Modifiers) -> KeyEvent {
    KeyEvent::new(KeyPhase::Pressed, key, mods)
}

fn mouse(kind: MouseEventKind, button: Option<MouseButton>, mods: Modifiers) -> MouseEvent {
    MouseEvent::new(kind, button, ScreenPosition::default(), mods)
}

fn left(kind: MouseEventKind) -> MouseEvent {
    mouse(kind, Some(MouseButton::Left), Modifiers::NONE)
}

// ---------------------------------------------------------------------
// Staging and commit laws
// ---------------------------------------------------------------------

#[test]
fn test_commit_moves_staged_into_dispatch_sets() {
    let context = ControlContext::new("globe");
    let zoom = Recorder::new("Zoom In");
    context
        .add_discrete_listener(zoom.clone(), vec![Trigger::key(KeyCode::Up)])
        .unwrap();

    context
        .stage_binding(&zoom, 0, Some(Trigger::key(KeyCode::Down)))
        .unwrap();
    context.stage_binding(&zoom, 1, None).unwrap();
    context.commit_binding_changes(&zoom).unwrap();

    assert_eq!(context.binding(&zoom, 0), Some(Trigger::key(KeyCode::Down)));
    assert_eq!(context.binding(&zoom, 1), None);

    // Old binding fully removed, new one present exactly once
    context.key_pressed(&key_press(KeyCode::Up));
    assert_eq!(zoom.count(), 0);
    context.key_pressed(&key_press(KeyCode::Down));
    assert_eq!(zoom.count(), 1);
}

#[test]
fn test_commit_across_kinds_moves_between_sets() {
    let context = ControlContext::new("globe");
    let zoom = Recorder::new("Zoom In");
    context
        .add_discrete_listener(zoom.clone(), vec![Trigger::key(KeyCode::Up)])
        .unwrap();

    context
        .stage_binding(&zoom, 0, Some(Trigger::wheel(WheelDirection::Up)))
        .unwrap();
    context.commit_binding_changes(&zoom).unwrap();

    context.key_pressed(&key_press(KeyCode::Up));
    assert_eq!(zoom.count(), 0);
    context.wheel_event(&WheelEvent::new(-1, ScreenPosition::default(), Modifiers::NONE));
    assert_eq!(zoom.count(), 1);
}

#[test]
fn test_cancel_restores_precapture_values() {
    let context = ControlContext::new("globe");
    let zoom = Recorder::new("Zoom In");
    context
        .add_discrete_listener(
            zoom.clone(),
            vec![Trigger::key(KeyCode::Up), Trigger::key(KeyCode::PageUp)],
        )
        .unwrap();

    context
        .stage_binding(&zoom, 0, Some(Trigger::key(KeyCode::Down)))
        .unwrap();
    context.stage_clear(&zoom, 1).unwrap();
    assert_eq!(
        context.staged_binding(&zoom, 0),
        Some(Trigger::key(KeyCode::Down))
    );

    context.cancel_binding_changes(&zoom).unwrap();
    assert_eq!(context.binding(&zoom, 0), Some(Trigger::key(KeyCode::Up)));
    assert_eq!(context.binding(&zoom, 1), Some(Trigger::key(KeyCode::PageUp)));
    assert_eq!(
        context.staged_binding(&zoom, 0),
        Some(Trigger::key(KeyCode::Up))
    );
}

#[test]
fn test_reset_restores_first_captured_default() {
    let context = ControlContext::new("globe");
    let zoom = Recorder::new("Zoom In");
    context
        .add_discrete_listener(zoom.clone(), vec![Trigger::key(KeyCode::Up)])
        .unwrap();

    for key in [KeyCode::Down, KeyCode::Left, KeyCode::Right] {
        context.stage_binding(&zoom, 0, Some(Trigger::key(key))).unwrap();
        context.commit_binding_changes(&zoom).unwrap();
    }
    assert_eq!(context.binding(&zoom, 0), Some(Trigger::key(KeyCode::Right)));

    // Reset restores the registration-time binding, not an intermediate
    context.stage_reset(&zoom, 0).unwrap();
    context.commit_binding_changes(&zoom).unwrap();
    assert_eq!(context.binding(&zoom, 0), Some(Trigger::key(KeyCode::Up)));

    context.key_pressed(&key_press(KeyCode::Up));
    assert_eq!(zoom.count(), 1);
}

#[test]
fn test_stage_slot_out_of_range() {
    let context = ControlContext::new("globe");
    let zoom = Recorder::new("Zoom In");
    context
        .add_discrete_listener(zoom.clone(), vec![Trigger::key(KeyCode::Up)])
        .unwrap();

    assert_eq!(
        context.stage_binding(&zoom, 2, Some(Trigger::key(KeyCode::Down))),
        Err(ControlError::InvalidSlot { slot: 2 })
    );
}

#[test]
fn test_stage_unknown_listener() {
    let context = ControlContext::new("globe");
    let stranger = Recorder::new("Stranger");
    assert_eq!(
        context.stage_binding(&stranger, 0, Some(Trigger::key(KeyCode::Down))),
        Err(ControlError::UnknownListener)
    );
}

// ---------------------------------------------------------------------
// Registration rules
// ---------------------------------------------------------------------

#[test]
fn test_compound_rejects_wheel_and_typed_templates() {
    let context = ControlContext::new("globe");
    let pan = GestureRecorder::new("Pan");

    let err = context.add_compound_listener(pan.clone(), vec![Trigger::wheel(WheelDirection::Up)]);
    assert!(matches!(
        err,
        Err(ControlError::UnsupportedBinding { .. })
    ));

    let err = context.add_compound_listener(pan.clone(), vec![Trigger::typed('p')]);
    assert!(matches!(
        err,
        Err(ControlError::UnsupportedBinding { .. })
    ));

    // Key-press and mouse templates are fine
    context
        .add_compound_listener(
            pan,
            vec![
                Trigger::key(KeyCode::Space),
                Trigger::mouse_press(MouseButton::Left),
            ],
        )
        .unwrap();
}

#[test]
fn test_reregistration_replaces_association() {
    let context = ControlContext::new("globe");
    let zoom = Recorder::new("Zoom In");
    let defaults = vec![Trigger::key(KeyCode::Up), Trigger::key(KeyCode::PageUp)];

    context
        .add_discrete_listener(zoom.clone(), defaults.clone())
        .unwrap();
    context.remove_listener(&zoom);
    assert_eq!(context.binding(&zoom, 0), None);

    context
        .add_discrete_listener(zoom.clone(), defaults.clone())
        .unwrap();
    assert_eq!(context.binding(&zoom, 0), Some(defaults[0]));
    assert_eq!(context.binding(&zoom, 1), Some(defaults[1]));

    // No stale entries: one press, one invocation
    context.key_pressed(&key_press(KeyCode::Up));
    assert_eq!(zoom.count(), 1);
}

#[test]
fn test_remove_listener_clears_all_sets() {
    let context = ControlContext::new("globe");
    let pan = GestureRecorder::new("Pan");
    context
        .add_compound_listener(pan.clone(), vec![Trigger::mouse_press(MouseButton::Left)])
        .unwrap();

    // Activate, then remove mid-gesture; nothing further is delivered
    context.mouse_event(&left(MouseEventKind::Pressed));
    assert_eq!(pan.started.load(Ordering::SeqCst), 1);
    context.remove_listener(&pan);

    context.mouse_event(&left(MouseEventKind::Dragged));
    context.mouse_event(&left(MouseEventKind::Released));
    assert_eq!(pan.dragged.load(Ordering::SeqCst), 0);
    assert_eq!(pan.ended.load(Ordering::SeqCst), 0);
}

// ---------------------------------------------------------------------
// Dispatch: keyboard
// ---------------------------------------------------------------------

#[test]
fn test_discrete_key_scenario() {
    let context = ControlContext::new("globe");
    let zoom = Recorder::new("Zoom In");
    context
        .add_discrete_listener(zoom.clone(), vec![Trigger::key(KeyCode::Up)])
        .unwrap();

    context.key_pressed(&key_press(KeyCode::Up));
    assert_eq!(zoom.count(), 1);

    context.key_pressed(&key_press(KeyCode::Down));
    assert_eq!(zoom.count(), 1);
}

#[test]
fn test_targeted_key_listeners_fire_before_untargeted() {
    let context = ControlContext::new("globe");
    let fallback = Recorder::new("Fallback");
    let picked = Recorder::targeted("Picked", 0, true);

    // Untargeted registered first; the targeted listener still wins
    context
        .add_discrete_listener(fallback.clone(), vec![Trigger::key(KeyCode::Delete)])
        .unwrap();
    context
        .add_discrete_listener(picked.clone(), vec![Trigger::key(KeyCode::Delete)])
        .unwrap();

    context.key_pressed(&key_press(KeyCode::Delete));
    assert_eq!(picked.count(), 1);
    assert_eq!(fallback.count(), 0);
}

#[test]
fn test_untargeted_listener_receives_when_target_gone() {
    let context = ControlContext::new("globe");
    let fallback = Recorder::new("Fallback");
    let picked = Recorder::targeted("Picked", 0, true);
    context
        .add_discrete_listener(fallback.clone(), vec![Trigger::key(KeyCode::Delete)])
        .unwrap();
    context
        .add_discrete_listener(picked.clone(), vec![Trigger::key(KeyCode::Delete)])
        .unwrap();

    picked.targeted.store(false, Ordering::SeqCst);
    context.key_pressed(&key_press(KeyCode::Delete));
    assert_eq!(picked.count(), 0);
    assert_eq!(fallback.count(), 1);
}

#[test]
fn test_bare_modifier_binding_ignores_modifier_bits() {
    let context = ControlContext::new("globe");
    let snap = Recorder::new("Snap Mode");
    context
        .add_discrete_listener(snap.clone(), vec![Trigger::key(KeyCode::Shift)])
        .unwrap();

    // A Shift press always carries its own modifier bit
    context.key_pressed(&key_press_mods(KeyCode::Shift, Modifiers::SHIFT));
    assert_eq!(snap.count(), 1);

    context.key_pressed(&key_press_mods(
        KeyCode::Shift,
        Modifiers::SHIFT | Modifiers::CTRL,
    ));
    assert_eq!(snap.count(), 2);
}

#[test]
fn test_activated_binding_masks_its_modifiers() {
    let context = ControlContext::new("globe");
    let rotate = GestureRecorder::new("Rotate");
    let center = Recorder::new("Center");
    context
        .add_compound_listener(
            rotate.clone(),
            vec![Trigger::mouse(
                MouseEventKind::Pressed,
                Some(MouseButton::Left),
                Modifiers::CTRL,
            )],
        )
        .unwrap();
    context
        .add_discrete_listener(center.clone(), vec![Trigger::key(KeyCode::Char('a'))])
        .unwrap();

    // Without the drag active, Ctrl+A does not match the plain binding
    context.key_pressed(&key_press_mods(KeyCode::Char('a'), Modifiers::CTRL));
    assert_eq!(center.count(), 0);

    // Start the Ctrl+drag; Ctrl is now claimed and masked out
    context.mouse_event(&mouse(
        MouseEventKind::Pressed,
        Some(MouseButton::Left),
        Modifiers::CTRL,
    ));
    assert_eq!(rotate.started.load(Ordering::SeqCst), 1);

    context.key_pressed(&key_press_mods(KeyCode::Char('a'), Modifiers::CTRL));
    assert_eq!(center.count(), 1);

    // Gesture over, the mask is gone again
    context.mouse_event(&mouse(
        MouseEventKind::Released,
        Some(MouseButton::Left),
        Modifiers::CTRL,
    ));
    context.key_pressed(&key_press_mods(KeyCode::Char('a'), Modifiers::CTRL));
    assert_eq!(center.count(), 1);
}

#[test]
fn test_compound_key_gesture_start_and_end() {
    let context = ControlContext::new("globe");
    let orbit = GestureRecorder::new("Orbit");
    context
        .add_compound_listener(orbit.clone(), vec![Trigger::key(KeyCode::Space)])
        .unwrap();

    context.key_pressed(&key_press(KeyCode::Space));
    assert_eq!(orbit.started.load(Ordering::SeqCst), 1);
    assert_eq!(orbit.ended.load(Ordering::SeqCst), 0);

    context.key_released(&KeyEvent::new(
        KeyPhase::Released,
        KeyCode::Space,
        Modifiers::NONE,
    ));
    assert_eq!(orbit.ended.load(Ordering::SeqCst), 1);
}

#[test]
fn test_key_typed_exact_modifier_match() {
    let context = ControlContext::new("globe");
    let label = Recorder::new("Label");
    context
        .add_discrete_listener(label.clone(), vec![Trigger::typed('l')])
        .unwrap();

    context.key_typed(&KeyEvent::typed('l', Modifiers::NONE));
    assert_eq!(label.count(), 1);

    // Upper-case input still matches the normalized character
    context.key_typed(&KeyEvent::typed('L', Modifiers::NONE));
    assert_eq!(label.count(), 2);

    // Exact modifier equality, no masking exception
    context.key_typed(&KeyEvent::typed('l', Modifiers::CTRL));
    assert_eq!(label.count(), 2);
}

// ---------------------------------------------------------------------
// Dispatch: mouse and wheel
// ---------------------------------------------------------------------

#[test]
fn test_mouse_priority_order_and_consumption() {
    let context = ControlContext::new("globe");
    let low = Recorder::targeted("Low", 5, true);
    let high = Recorder::targeted("High", 10, true);

    // Lower priority registered first; the higher one still goes first
    context
        .add_discrete_listener(low.clone(), vec![Trigger::mouse_press(MouseButton::Left)])
        .unwrap();
    context
        .add_discrete_listener(high.clone(), vec![Trigger::mouse_press(MouseButton::Left)])
        .unwrap();

    context.mouse_event(&left(MouseEventKind::Pressed));
    assert_eq!(high.count(), 1);
    assert_eq!(low.count(), 0);
}

#[test]
fn test_compound_mouse_gesture_lifecycle() {
    let context = ControlContext::new("globe");
    let pan = GestureRecorder::new("Pan");
    context
        .add_compound_listener(pan.clone(), vec![Trigger::mouse_press(MouseButton::Left)])
        .unwrap();

    context.mouse_event(&left(MouseEventKind::Pressed));
    assert_eq!(pan.started.load(Ordering::SeqCst), 1);

    context.mouse_event(&left(MouseEventKind::Dragged));
    context.mouse_event(&left(MouseEventKind::Dragged));
    assert_eq!(pan.dragged.load(Ordering::SeqCst), 2);

    context.mouse_event(&left(MouseEventKind::Released));
    assert_eq!(pan.ended.load(Ordering::SeqCst), 1);

    // Further drags produce no callback once the gesture ended
    context.mouse_event(&left(MouseEventKind::Dragged));
    assert_eq!(pan.dragged.load(Ordering::SeqCst), 2);
    assert_eq!(pan.started.load(Ordering::SeqCst), 1);
}

#[test]
fn test_release_matches_regardless_of_modifiers() {
    let context = ControlContext::new("globe");
    let pan = GestureRecorder::new("Pan");
    context
        .add_compound_listener(
            pan.clone(),
            vec![Trigger::mouse(
                MouseEventKind::Pressed,
                Some(MouseButton::Left),
                Modifiers::CTRL,
            )],
        )
        .unwrap();

    context.mouse_event(&mouse(
        MouseEventKind::Pressed,
        Some(MouseButton::Left),
        Modifiers::CTRL,
    ));
    // Ctrl released before the button: the gesture still ends
    context.mouse_event(&left(MouseEventKind::Released));
    assert_eq!(pan.ended.load(Ordering::SeqCst), 1);
}

#[test]
fn test_discrete_press_binding_frees_modifiers_on_release() {
    let context = ControlContext::new("globe");
    let select = Recorder::new("Select");
    let center = Recorder::new("Center");
    context
        .add_discrete_listener(
            select.clone(),
            vec![Trigger::mouse(
                MouseEventKind::Pressed,
                Some(MouseButton::Left),
                Modifiers::CTRL,
            )],
        )
        .unwrap();
    context
        .add_discrete_listener(
            center.clone(),
            vec![Trigger::key_with_mods(KeyCode::Char('a'), Modifiers::CTRL)],
        )
        .unwrap();

    context.mouse_event(&mouse(
        MouseEventKind::Pressed,
        Some(MouseButton::Left),
        Modifiers::CTRL,
    ));
    assert_eq!(select.count(), 1);

    // While the button is down, Ctrl is claimed and masked out
    context.key_pressed(&key_press_mods(KeyCode::Char('a'), Modifiers::CTRL));
    assert_eq!(center.count(), 0);

    // The release frees the claim without re-firing the discrete callback
    context.mouse_event(&left(MouseEventKind::Released));
    assert_eq!(select.count(), 1);
    context.key_pressed(&key_press_mods(KeyCode::Char('a'), Modifiers::CTRL));
    assert_eq!(center.count(), 1);
}

#[test]
fn test_wheel_matches_rotation_sign() {
    let context = ControlContext::new("globe");
    let zoom_in = Recorder::new("Zoom In");
    context
        .add_discrete_listener(zoom_in.clone(), vec![Trigger::wheel(WheelDirection::Up)])
        .unwrap();

    // Any upward rotation matches, whatever the magnitude
    context.wheel_event(&WheelEvent::new(-3, ScreenPosition::default(), Modifiers::NONE));
    assert_eq!(zoom_in.count(), 1);
    context.wheel_event(&WheelEvent::new(-1, ScreenPosition::default(), Modifiers::NONE));
    assert_eq!(zoom_in.count(), 2);

    context.wheel_event(&WheelEvent::new(2, ScreenPosition::default(), Modifiers::NONE));
    assert_eq!(zoom_in.count(), 2);
}

#[test]
fn test_enter_event_ignores_modifiers() {
    let context = ControlContext::new("globe");
    let hover = Recorder::new("Hover");
    context
        .add_discrete_listener(
            hover.clone(),
            vec![Trigger::mouse(MouseEventKind::Entered, None, Modifiers::NONE)],
        )
        .unwrap();

    context.mouse_event(&mouse(MouseEventKind::Entered, None, Modifiers::CTRL));
    assert_eq!(hover.count(), 1);
}

// ---------------------------------------------------------------------
// Listener lifetime and reentrancy
// ---------------------------------------------------------------------

#[test]
fn test_dropped_listener_is_pruned() {
    let context = ControlContext::new("globe");
    let zoom = Recorder::new("Zoom In");
    context
        .add_discrete_listener(zoom.clone(), vec![Trigger::key(KeyCode::Up)])
        .unwrap();
    assert_eq!(context.listeners_by_category().len(), 1);

    drop(zoom);
    context.key_pressed(&key_press(KeyCode::Up));
    assert!(context.listeners_by_category().is_empty());
}

/// Discrete listener that unregisters another listener from its callback
struct Unregisterer {
    context: Arc<ControlContext>,
    victim: Mutex<Option<Arc<Recorder>>>,
}

impl ControlListener for Unregisterer {
    fn category(&self) -> &str {
        "Test"
    }
    fn title(&self) -> &str {
        "Unregisterer"
    }
}

impl DiscreteListener for Unregisterer {
    fn event_occurred(&self, _event: InputEvent<'_>) {
        if let Some(victim) = self.victim.lock().take() {
            self.context.remove_listener(&victim);
        }
    }
}

#[test]
fn test_listener_can_unregister_another_mid_dispatch() {
    let context = Arc::new(ControlContext::new("globe"));
    let victim = Recorder::new("Victim");
    let remover = Arc::new(Unregisterer {
        context: context.clone(),
        victim: Mutex::new(Some(victim.clone())),
    });

    context
        .add_discrete_listener(remover.clone(), vec![Trigger::key(KeyCode::Escape)])
        .unwrap();
    context
        .add_discrete_listener(victim.clone(), vec![Trigger::key(KeyCode::Escape)])
        .unwrap();

    // No deadlock; the victim may still see this event from the snapshot
    context.key_pressed(&key_press(KeyCode::Escape));
    let after_first = victim.count();
    assert!(after_first <= 1);

    // The removal is observed by the next event
    context.key_pressed(&key_press(KeyCode::Escape));
    assert_eq!(victim.count(), after_first);
}

// ---------------------------------------------------------------------
// Pick side channel
// ---------------------------------------------------------------------

#[derive(Default)]
struct PickProbe {
    picks: Mutex<Vec<Option<GeometryId>>>,
}

impl PickListener for PickProbe {
    fn picked(&self, pick: &crate::listener::PickEvent) {
        self.picks.lock().push(pick.geometry);
    }
}

#[test]
fn test_pick_notifications() {
    let context = ControlContext::new("globe");
    let probe = Arc::new(PickProbe::default());
    let listener: Arc<dyn PickListener> = probe.clone();
    context.add_pick_listener(&listener);

    context.notify_picked(Some(GeometryId(7)), ScreenPosition::new(4.0, 2.0));
    context.notify_picked(None, ScreenPosition::new(4.0, 2.0));
    assert_eq!(*probe.picks.lock(), vec![Some(GeometryId(7)), None]);

    context.remove_pick_listener(&listener);
    context.notify_picked(Some(GeometryId(8)), ScreenPosition::new(0.0, 0.0));
    assert_eq!(probe.picks.lock().len(), 2);
}

// ---------------------------------------------------------------------
// Settings view
// ---------------------------------------------------------------------

#[test]
fn test_listeners_by_category_insertion_order() {
    let context = ControlContext::new("globe");
    let zoom = Recorder::new("Zoom In");
    let pan = GestureRecorder::new("Pan");
    let tilt = Recorder::new("Tilt");

    context
        .add_discrete_listener(zoom.clone(), vec![Trigger::key(KeyCode::Up)])
        .unwrap();
    context
        .add_compound_listener(pan.clone(), vec![Trigger::mouse_press(MouseButton::Left)])
        .unwrap();
    context
        .add_discrete_listener(tilt.clone(), vec![Trigger::key(KeyCode::Char('t'))])
        .unwrap();

    let groups = context.listeners_by_category();
    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0].category, "View");
    assert_eq!(groups[1].category, "Navigation");

    let titles: Vec<&str> = groups[0].controls.iter().map(|c| c.title.as_str()).collect();
    assert_eq!(titles, ["Zoom In", "Tilt"]);
    assert_eq!(groups[0].controls[0].bindings[0].as_deref(), Some("Up"));
}

// ---------------------------------------------------------------------
// Reassignment workflow
// ---------------------------------------------------------------------

#[test]
fn test_capture_assigns_free_gesture() {
    let context = Arc::new(ControlContext::new("globe"));
    let zoom = Recorder::new("Zoom In");
    context
        .add_discrete_listener(zoom.clone(), vec![Trigger::key(KeyCode::Up)])
        .unwrap();

    let capture = BindingCapture::new(context.clone());
    capture.begin(&zoom, 0).unwrap();
    assert!(capture.is_capturing());

    // A pure modifier press is skipped
    let shift = key_press_mods(KeyCode::Shift, Modifiers::SHIFT);
    assert!(capture.feed_key(&shift).unwrap().is_none());
    assert!(capture.is_capturing());

    let outcome = capture
        .feed_key(&key_press_mods(KeyCode::Char('z'), Modifiers::CTRL))
        .unwrap();
    assert!(matches!(
        outcome,
        Some(CaptureOutcome::Assigned { trigger })
            if trigger == Trigger::key_with_mods(KeyCode::Char('z'), Modifiers::CTRL)
    ));
    assert!(!capture.is_capturing());
    assert_eq!(
        context.binding(&zoom, 0),
        Some(Trigger::key_with_mods(KeyCode::Char('z'), Modifiers::CTRL))
    );
}

#[test]
fn test_capture_release_does_not_qualify() {
    let context = Arc::new(ControlContext::new("globe"));
    let zoom = Recorder::new("Zoom In");
    context
        .add_discrete_listener(zoom.clone(), vec![Trigger::key(KeyCode::Up)])
        .unwrap();

    let capture = BindingCapture::new(context);
    capture.begin(&zoom, 0).unwrap();
    let release = KeyEvent::new(KeyPhase::Released, KeyCode::Char('z'), Modifiers::NONE);
    assert!(capture.feed_key(&release).unwrap().is_none());
    assert!(capture.is_capturing());
}

#[test]
fn test_capture_wheel_unconvertible_for_compound() {
    let context = Arc::new(ControlContext::new("globe"));
    let pan = GestureRecorder::new("Pan");
    context
        .add_compound_listener(pan.clone(), vec![Trigger::mouse_press(MouseButton::Left)])
        .unwrap();

    let capture = BindingCapture::new(context.clone());
    capture.begin(&pan, 0).unwrap();

    // No trigger can be built; capture silently continues
    let wheel = WheelEvent::new(-1, ScreenPosition::default(), Modifiers::NONE);
    assert!(capture.feed_wheel(&wheel).unwrap().is_none());
    assert!(capture.is_capturing());

    // A mouse press still works
    let outcome = capture.feed_mouse(&left(MouseEventKind::Pressed)).unwrap();
    assert!(matches!(outcome, Some(CaptureOutcome::Assigned { .. })));
}

#[test]
fn test_capture_cancel_keeps_previous_binding() {
    let context = Arc::new(ControlContext::new("globe"));
    let zoom = Recorder::new("Zoom In");
    context
        .add_discrete_listener(zoom.clone(), vec![Trigger::key(KeyCode::Up)])
        .unwrap();

    let capture = BindingCapture::new(context.clone());
    capture.begin(&zoom, 0).unwrap();
    capture.cancel().unwrap();
    assert!(!capture.is_capturing());
    assert_eq!(context.binding(&zoom, 0), Some(Trigger::key(KeyCode::Up)));
    assert_eq!(capture.cancel(), Err(ControlError::NoCaptureInProgress));
}

#[derive(Default)]
struct OverrideProbe {
    notices: Mutex<Vec<OverrideNotice>>,
}

impl ReassignListener for OverrideProbe {
    fn binding_overridden(&self, notice: &OverrideNotice) {
        self.notices.lock().push(notice.clone());
    }
}

#[test]
fn test_capture_conflict_confirm_moves_binding() {
    let context = Arc::new(ControlContext::new("globe"));
    let zoom = Recorder::new("Zoom In");
    let tilt = Recorder::new("Tilt");
    context
        .add_discrete_listener(zoom.clone(), vec![Trigger::key(KeyCode::Up)])
        .unwrap();
    context
        .add_discrete_listener(tilt.clone(), vec![Trigger::key(KeyCode::Char('t'))])
        .unwrap();

    let capture = BindingCapture::new(context.clone());
    let probe = Arc::new(OverrideProbe::default());
    let observer: Arc<dyn ReassignListener> = probe.clone();
    capture.add_reassign_listener(&observer);

    capture.begin(&tilt, 0).unwrap();
    let outcome = capture.feed_key(&key_press(KeyCode::Up)).unwrap();
    let Some(CaptureOutcome::Conflict(pending)) = outcome else {
        panic!("expected a conflict");
    };
    assert_eq!(pending.conflicting_title(), "Zoom In");

    capture.confirm(pending).unwrap();
    assert_eq!(context.binding(&zoom, 0), None);
    assert_eq!(context.binding(&tilt, 0), Some(Trigger::key(KeyCode::Up)));

    let notices = probe.notices.lock();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].title, "Zoom In");
    assert_eq!(notices[0].trigger, Trigger::key(KeyCode::Up));
}

#[test]
fn test_capture_conflict_decline_changes_nothing() {
    let context = Arc::new(ControlContext::new("globe"));
    let zoom = Recorder::new("Zoom In");
    let tilt = Recorder::new("Tilt");
    context
        .add_discrete_listener(zoom.clone(), vec![Trigger::key(KeyCode::Up)])
        .unwrap();
    context
        .add_discrete_listener(tilt.clone(), vec![Trigger::key(KeyCode::Char('t'))])
        .unwrap();

    let capture = BindingCapture::new(context.clone());
    capture.begin(&tilt, 0).unwrap();
    let Some(CaptureOutcome::Conflict(pending)) =
        capture.feed_key(&key_press(KeyCode::Up)).unwrap()
    else {
        panic!("expected a conflict");
    };

    capture.decline(pending);
    assert_eq!(context.binding(&zoom, 0), Some(Trigger::key(KeyCode::Up)));
    assert_eq!(context.binding(&tilt, 0), Some(Trigger::key(KeyCode::Char('t'))));
}

#[test]
fn test_capture_rejects_double_begin_and_unknown() {
    let context = Arc::new(ControlContext::new("globe"));
    let zoom = Recorder::new("Zoom In");
    let stranger = Recorder::new("Stranger");
    context
        .add_discrete_listener(zoom.clone(), vec![Trigger::key(KeyCode::Up)])
        .unwrap();

    let capture = BindingCapture::new(context);
    assert_eq!(
        capture.begin(&stranger, 0),
        Err(ControlError::UnknownListener)
    );

    capture.begin(&zoom, 0).unwrap();
    assert_eq!(capture.begin(&zoom, 1), Err(ControlError::CaptureInProgress));
}

// ---------------------------------------------------------------------
// Registry and persistence
// ---------------------------------------------------------------------

#[test]
fn test_registry_contexts_are_independent() {
    let registry = ControlRegistry::new();
    let zoom = Recorder::new("Zoom In");
    registry
        .globe()
        .add_discrete_listener(zoom.clone(), vec![Trigger::key(KeyCode::Up)])
        .unwrap();

    // The overlay context knows nothing about globe bindings
    registry.ui().key_pressed(&key_press(KeyCode::Up));
    assert_eq!(zoom.count(), 0);

    registry.globe().key_pressed(&key_press(KeyCode::Up));
    assert_eq!(zoom.count(), 1);
}

#[test]
fn test_saved_bindings_round_trip() {
    let registry = ControlRegistry::new();
    let zoom = Recorder::new("Zoom In");
    let pan = GestureRecorder::new("Pan");
    registry
        .globe()
        .add_discrete_listener(zoom.clone(), vec![Trigger::key(KeyCode::Up)])
        .unwrap();
    registry
        .globe()
        .add_compound_listener(pan.clone(), vec![Trigger::mouse_press(MouseButton::Left)])
        .unwrap();

    let globe = registry.globe();
    globe
        .stage_binding(
            &zoom,
            0,
            Some(Trigger::key_with_mods(KeyCode::Up, Modifiers::CTRL)),
        )
        .unwrap();
    globe.commit_binding_changes(&zoom).unwrap();
    globe
        .stage_binding(&pan, 0, Some(Trigger::mouse_press(MouseButton::Right)))
        .unwrap();
    globe.commit_binding_changes(&pan).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bindings.yaml");
    config::save_bindings(&path, &registry).unwrap();

    // A fresh process registers the same controls with their defaults
    let registry2 = ControlRegistry::new();
    let zoom2 = Recorder::new("Zoom In");
    let pan2 = GestureRecorder::new("Pan");
    registry2
        .globe()
        .add_discrete_listener(zoom2.clone(), vec![Trigger::key(KeyCode::Up)])
        .unwrap();
    registry2
        .globe()
        .add_compound_listener(pan2.clone(), vec![Trigger::mouse_press(MouseButton::Left)])
        .unwrap();

    let saved = config::load_bindings_file(&path).unwrap();
    let applied = config::apply_bindings(&registry2, &saved);
    assert_eq!(applied, 2);
    assert_eq!(
        registry2.globe().binding(&zoom2, 0),
        Some(Trigger::key_with_mods(KeyCode::Up, Modifiers::CTRL))
    );
    assert_eq!(
        registry2.globe().binding(&pan2, 0),
        Some(Trigger::mouse_press(MouseButton::Right))
    );
}

#[test]
fn test_unmodified_bindings_are_not_saved() {
    let registry = ControlRegistry::new();
    let zoom = Recorder::new("Zoom In");
    registry
        .globe()
        .add_discrete_listener(zoom.clone(), vec![Trigger::key(KeyCode::Up)])
        .unwrap();

    let snapshot = config::snapshot_bindings(&registry);
    assert!(snapshot.bindings.is_empty());
}
