//! Keyboard navigation bindings for annotation focus.

use serde::{Deserialize, Serialize};

use crate::input::{Key, Modifiers};

/// What a key press does to keyboard focus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    FocusNext,
    FocusPrev,
    /// Discover the focused annotation
    Activate,
    ClearFocus,
}

/// A key plus whether Shift must be held.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyChord {
    pub key: Key,
    #[serde(default)]
    pub shift: bool,
}

impl KeyChord {
    pub const fn plain(key: Key) -> Self {
        Self { key, shift: false }
    }

    pub const fn shifted(key: Key) -> Self {
        Self { key, shift: true }
    }

    fn matches(&self, key: Key, modifiers: Modifiers) -> bool {
        self.key == key && self.shift == modifiers.shift
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct KeyBindings {
    pub focus_next: Vec<KeyChord>,
    pub focus_prev: Vec<KeyChord>,
    pub activate: Vec<KeyChord>,
    pub clear_focus: Vec<KeyChord>,
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            focus_next: vec![
                KeyChord::plain(Key::Tab),
                KeyChord::plain(Key::ArrowRight),
                KeyChord::plain(Key::ArrowDown),
            ],
            focus_prev: vec![
                KeyChord::shifted(Key::Tab),
                KeyChord::plain(Key::ArrowLeft),
                KeyChord::plain(Key::ArrowUp),
            ],
            activate: vec![KeyChord::plain(Key::Enter), KeyChord::plain(Key::Space)],
            clear_focus: vec![KeyChord::plain(Key::Escape)],
        }
    }
}

impl KeyBindings {
    /// Create new keybindings with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the action that corresponds to a key press, if any.
    ///
    /// Presses with Ctrl, Alt or Meta held belong to the host and never match.
    pub fn action_for(&self, key: Key, modifiers: Modifiers) -> Option<KeyAction> {
        if modifiers.ctrl || modifiers.alt || modifiers.meta {
            return None;
        }

        let table = [
            (&self.focus_next, KeyAction::FocusNext),
            (&self.focus_prev, KeyAction::FocusPrev),
            (&self.activate, KeyAction::Activate),
            (&self.clear_focus, KeyAction::ClearFocus),
        ];
        table
            .into_iter()
            .find(|(chords, _)| chords.iter().any(|c| c.matches(key, modifiers)))
            .map(|(_, action)| action)
    }

    fn groups(&self) -> [(&'static str, &[KeyChord]); 4] {
        [
            ("Focus next", self.focus_next.as_slice()),
            ("Focus previous", self.focus_prev.as_slice()),
            ("Activate", self.activate.as_slice()),
            ("Clear focus", self.clear_focus.as_slice()),
        ]
    }

    /// Check if a chord is already used by any binding.
    /// Returns a description of what it's used for, if anything.
    pub fn key_conflict(&self, chord: KeyChord) -> Option<&'static str> {
        self.groups()
            .into_iter()
            .find(|(_, chords)| chords.contains(&chord))
            .map(|(name, _)| name)
    }

    /// First chord bound to two different actions, with both action names.
    pub fn find_conflict(&self) -> Option<(KeyChord, &'static str, &'static str)> {
        let groups = self.groups();
        for (i, (name, chords)) in groups.iter().enumerate() {
            for chord in chords.iter() {
                if let Some((other, _)) = groups[i + 1..].iter().find(|(_, c)| c.contains(chord)) {
                    return Some((*chord, *name, *other));
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shift() -> Modifiers {
        Modifiers {
            shift: true,
            ..Modifiers::default()
        }
    }

    #[test]
    fn test_default_bindings() {
        let kb = KeyBindings::new();
        let none = Modifiers::default();
        assert_eq!(kb.action_for(Key::Tab, none), Some(KeyAction::FocusNext));
        assert_eq!(kb.action_for(Key::Tab, shift()), Some(KeyAction::FocusPrev));
        assert_eq!(kb.action_for(Key::ArrowUp, none), Some(KeyAction::FocusPrev));
        assert_eq!(kb.action_for(Key::Space, none), Some(KeyAction::Activate));
        assert_eq!(kb.action_for(Key::Escape, none), Some(KeyAction::ClearFocus));
        assert_eq!(kb.action_for(Key::Char('a'), none), None);
    }

    #[test]
    fn test_host_modifiers_never_match() {
        let kb = KeyBindings::new();
        let ctrl = Modifiers {
            ctrl: true,
            ..Modifiers::default()
        };
        assert_eq!(kb.action_for(Key::Tab, ctrl), None);
    }

    #[test]
    fn test_key_conflict() {
        let kb = KeyBindings::new();
        assert_eq!(kb.key_conflict(KeyChord::plain(Key::Enter)), Some("Activate"));
        assert_eq!(kb.key_conflict(KeyChord::shifted(Key::Enter)), None);
        assert_eq!(kb.find_conflict(), None);
    }

    #[test]
    fn test_chord_bound_twice_is_found() {
        let mut kb = KeyBindings::new();
        kb.clear_focus.push(KeyChord::plain(Key::Space));
        assert_eq!(
            kb.find_conflict(),
            Some((KeyChord::plain(Key::Space), "Activate", "Clear focus"))
        );
    }
}
