//! Normalizing raw pointer, touch and keyboard input.
//!
//! The host forwards its native events as [`RawInput`]; the
//! [`InputController`] turns them into [`InteractionEvent`]s in display
//! space. Move-type events are throttled so hit testing runs at most once per
//! debounce interval no matter how fast the host delivers them.

use std::time::Duration;

use lexi_draw::{Point, Size};
use serde::{Deserialize, Serialize};
use web_time::Instant;

use crate::config::{DEFAULT_TOUCH_TOLERANCE_PX, OverlayConfig};
use crate::keybindings::{KeyAction, KeyBindings};
use crate::mapper::CoordinateMapper;

/// Kind of pointing device that produced an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    #[default]
    Mouse,
    Touch,
    Pen,
}

/// Keys the overlay reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Key {
    Tab,
    Enter,
    Space,
    Escape,
    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,
    Char(char),
}

/// Keyboard modifier keys held during an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

/// The drawing surface's layout box in client coordinates, as reported by
/// `getBoundingClientRect` or the host's equivalent.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SurfaceRect {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

impl SurfaceRect {
    pub fn new(left: f32, top: f32, width: f32, height: f32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }
}

/// A host input event, in client coordinates.
#[derive(Debug, Clone, PartialEq)]
pub enum RawInput {
    PointerMove { device: DeviceKind, client: Point },
    PointerClick { device: DeviceKind, client: Point },
    PointerLeave { device: DeviceKind },
    TouchStart { client: Point },
    TouchMove { client: Point },
    /// `client` is the lifted finger's position when the host knows it.
    TouchEnd { client: Option<Point> },
    TouchCancel,
    Key { key: Key, modifiers: Modifiers },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputAction {
    Move,
    Select,
    FocusNext,
    FocusPrev,
    /// Discover the focused annotation
    Activate,
    ClearFocus,
    /// The pointer left the surface
    Leave,
}

/// Canonical input event in display space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InteractionEvent {
    /// `None` for keyboard and leave events
    pub point: Option<Point>,
    pub device: DeviceKind,
    pub action: InputAction,
}

impl InteractionEvent {
    fn at(point: Point, device: DeviceKind, action: InputAction) -> Self {
        Self {
            point: Some(point),
            device,
            action,
        }
    }

    fn pointless(device: DeviceKind, action: InputAction) -> Self {
        Self {
            point: None,
            device,
            action,
        }
    }
}

/// Hit-test tolerance per device class, resolved once from configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tolerance {
    pub touch: f32,
    pub pointer: f32,
}

impl Default for Tolerance {
    fn default() -> Self {
        Self {
            touch: DEFAULT_TOUCH_TOLERANCE_PX,
            pointer: 0.0,
        }
    }
}

impl Tolerance {
    pub fn from_config(config: &OverlayConfig) -> Self {
        Self {
            touch: config.touch_tolerance_px(),
            pointer: 0.0,
        }
    }

    pub fn for_device(&self, device: DeviceKind) -> f32 {
        match device {
            DeviceKind::Touch => self.touch,
            DeviceKind::Mouse | DeviceKind::Pen => self.pointer,
        }
    }
}

/// Turns raw host input into throttled interaction events.
#[derive(Debug, Clone)]
pub struct InputController {
    debounce: Duration,
    keybindings: KeyBindings,
    /// Latest move not yet forwarded
    pending: Option<InteractionEvent>,
    last_move_emit: Option<Instant>,
    /// Last known finger position, used when `TouchEnd` carries none
    last_touch: Option<Point>,
    last_device: DeviceKind,
}

impl InputController {
    pub fn new(debounce: Duration, keybindings: KeyBindings) -> Self {
        Self {
            debounce,
            keybindings,
            pending: None,
            last_move_emit: None,
            last_touch: None,
            last_device: DeviceKind::default(),
        }
    }

    pub fn last_device(&self) -> DeviceKind {
        self.last_device
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// When a held-back move becomes due.
    pub fn next_deadline(&self) -> Option<Instant> {
        if self.pending.is_none() {
            return None;
        }
        self.last_move_emit.map(|t| t + self.debounce)
    }

    /// Normalize one raw event. Returns the event to act on now, if any.
    pub fn push(
        &mut self,
        raw: RawInput,
        surface: &SurfaceRect,
        display: Size,
        now: Instant,
    ) -> Option<InteractionEvent> {
        let to_display = |client| CoordinateMapper::from_pointer_event(client, surface, display);

        match raw {
            RawInput::PointerMove { device, client } => {
                self.last_device = device;
                self.throttle_move(InteractionEvent::at(to_display(client), device, InputAction::Move), now)
            }
            RawInput::PointerClick { device, client } => {
                self.last_device = device;
                self.pending = None;
                Some(InteractionEvent::at(to_display(client), device, InputAction::Select))
            }
            RawInput::PointerLeave { device } => {
                self.pending = None;
                Some(InteractionEvent::pointless(device, InputAction::Leave))
            }
            RawInput::TouchStart { client } => {
                // Touch has no hover phase, so the first contact is forwarded
                // immediately.
                let point = to_display(client);
                self.last_device = DeviceKind::Touch;
                self.last_touch = Some(point);
                self.pending = None;
                self.last_move_emit = Some(now);
                Some(InteractionEvent::at(point, DeviceKind::Touch, InputAction::Move))
            }
            RawInput::TouchMove { client } => {
                let point = to_display(client);
                self.last_device = DeviceKind::Touch;
                self.last_touch = Some(point);
                self.throttle_move(InteractionEvent::at(point, DeviceKind::Touch, InputAction::Move), now)
            }
            RawInput::TouchEnd { client } => {
                self.last_device = DeviceKind::Touch;
                self.pending = None;
                let point = client.map(to_display).or(self.last_touch.take());
                point.map(|p| InteractionEvent::at(p, DeviceKind::Touch, InputAction::Select))
            }
            RawInput::TouchCancel => {
                self.pending = None;
                self.last_touch = None;
                Some(InteractionEvent::pointless(DeviceKind::Touch, InputAction::Leave))
            }
            RawInput::Key { key, modifiers } => {
                let action = match self.keybindings.action_for(key, modifiers)? {
                    KeyAction::FocusNext => InputAction::FocusNext,
                    KeyAction::FocusPrev => InputAction::FocusPrev,
                    KeyAction::Activate => InputAction::Activate,
                    KeyAction::ClearFocus => InputAction::ClearFocus,
                };
                Some(InteractionEvent::pointless(self.last_device, action))
            }
        }
    }

    /// Forward the held-back move once its interval has passed.
    pub fn flush(&mut self, now: Instant) -> Option<InteractionEvent> {
        let due = match self.last_move_emit {
            Some(last) => now.saturating_duration_since(last) >= self.debounce,
            None => true,
        };
        if !due {
            return None;
        }
        let event = self.pending.take()?;
        self.last_move_emit = Some(now);
        Some(event)
    }

    pub fn reset(&mut self) {
        self.pending = None;
        self.last_move_emit = None;
        self.last_touch = None;
    }

    fn throttle_move(&mut self, event: InteractionEvent, now: Instant) -> Option<InteractionEvent> {
        let ready = self
            .last_move_emit
            .is_none_or(|last| now.saturating_duration_since(last) >= self.debounce);
        if ready {
            self.pending = None;
            self.last_move_emit = Some(now);
            Some(event)
        } else {
            self.pending = Some(event);
            None
        }
    }
}
