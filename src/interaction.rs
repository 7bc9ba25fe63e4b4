//! Hover, focus and discovery state.
//!
//! Owned by the controller and updated synchronously from input. Layers only
//! read it while redrawing.

use std::time::Duration;

use web_time::Instant;

use crate::annotation::AnnotationId;
use crate::input::DeviceKind;
use crate::theme::Emphasis;

#[derive(Debug, Clone, PartialEq, Default)]
pub enum HoverState {
    #[default]
    Idle,
    Hovering {
        id: AnnotationId,
        device: DeviceKind,
        /// Touch hovers clear themselves at this time since no leave event
        /// will ever arrive.
        expires_at: Option<Instant>,
    },
}

#[derive(Debug, Clone)]
pub struct InteractionState {
    hover: HoverState,
    focused: Option<AnnotationId>,
    /// Last annotation the learner selected
    acknowledged: Option<AnnotationId>,
    last_device: DeviceKind,
    touch_timeout: Duration,
}

impl InteractionState {
    pub fn new(touch_timeout: Duration) -> Self {
        Self {
            hover: HoverState::Idle,
            focused: None,
            acknowledged: None,
            last_device: DeviceKind::default(),
            touch_timeout,
        }
    }

    pub fn hover(&self) -> &HoverState {
        &self.hover
    }

    pub fn hovered_id(&self) -> Option<&AnnotationId> {
        match &self.hover {
            HoverState::Idle => None,
            HoverState::Hovering { id, .. } => Some(id),
        }
    }

    pub fn focused_id(&self) -> Option<&AnnotationId> {
        self.focused.as_ref()
    }

    pub fn last_device(&self) -> DeviceKind {
        self.last_device
    }

    pub fn set_last_device(&mut self, device: DeviceKind) {
        self.last_device = device;
    }

    /// Update the hovered annotation. Returns true when the hovered id
    /// changed.
    ///
    /// Hovering the same id again only refreshes a touch expiry.
    pub fn set_hover(&mut self, id: Option<AnnotationId>, device: DeviceKind, now: Instant) -> bool {
        self.last_device = device;
        let expires_at = (device == DeviceKind::Touch).then(|| now + self.touch_timeout);

        let Some(id) = id else {
            let changed = self.hover != HoverState::Idle;
            self.hover = HoverState::Idle;
            return changed;
        };

        if let HoverState::Hovering {
            id: current,
            device: current_device,
            expires_at: current_expiry,
        } = &mut self.hover
        {
            if *current == id {
                *current_device = device;
                *current_expiry = expires_at;
                return false;
            }
        }

        self.hover = HoverState::Hovering {
            id,
            device,
            expires_at,
        };
        true
    }

    /// Record that `id` was deliberately selected.
    ///
    /// Restarts the touch expiry when it is the hovered annotation. Returns
    /// true when the emphasis style changes.
    pub fn mark_discovered(&mut self, id: &AnnotationId, now: Instant) -> bool {
        if let HoverState::Hovering {
            id: hovered,
            device: DeviceKind::Touch,
            expires_at,
        } = &mut self.hover
        {
            if hovered == id {
                *expires_at = Some(now + self.touch_timeout);
            }
        }
        if self.acknowledged.as_ref() == Some(id) {
            return false;
        }
        self.acknowledged = Some(id.clone());
        true
    }

    pub fn is_discovered(&self, id: &AnnotationId) -> bool {
        self.acknowledged.as_ref() == Some(id)
    }

    /// Returns true when the focused id changed.
    pub fn set_focus(&mut self, id: Option<AnnotationId>) -> bool {
        if self.focused == id {
            return false;
        }
        self.focused = id;
        true
    }

    /// Clear a timed-out touch hover. Returns the id that stopped hovering.
    pub fn expire(&mut self, now: Instant) -> Option<AnnotationId> {
        let expired = matches!(
            &self.hover,
            HoverState::Hovering { expires_at: Some(at), .. } if *at <= now
        );
        if !expired {
            return None;
        }
        match std::mem::take(&mut self.hover) {
            HoverState::Hovering { id, .. } => Some(id),
            HoverState::Idle => None,
        }
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        match &self.hover {
            HoverState::Hovering { expires_at, .. } => *expires_at,
            HoverState::Idle => None,
        }
    }

    /// Emphasis to draw for `id`, if any. Hover outranks focus.
    pub fn emphasis_for(&self, id: &AnnotationId) -> Option<Emphasis> {
        let hovered = self.hovered_id() == Some(id);
        let focused = self.focused.as_ref() == Some(id);
        if !hovered && !focused {
            None
        } else if self.is_discovered(id) {
            Some(Emphasis::Discovered)
        } else if hovered {
            Some(Emphasis::Hover)
        } else {
            Some(Emphasis::Focus)
        }
    }

    /// Back to defaults, e.g. when the annotation set or image changes.
    pub fn reset(&mut self) {
        self.hover = HoverState::Idle;
        self.focused = None;
        self.acknowledged = None;
    }
}
