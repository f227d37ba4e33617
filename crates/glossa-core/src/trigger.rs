//! Keyboard triggers.
//!
//! A run starts from a modifier+letter chord. Hosts convert their native key
//! events into [`Key`] and [`Modifiers`] and ask the [`Keymap`] which mode,
//! if any, the chord starts.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::error::ChordError;

/// Key values for keyboard input.
///
/// Platform-agnostic key representation. Platform-specific code converts
/// from native key events to this enum.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    /// A character key.
    Character(SmolStr),
    Enter,
    Escape,
    Tab,
    Space,
    Alt,
    Control,
    Meta,
    Shift,
    /// Unknown/unidentified key.
    Unidentified,
}

impl Key {
    /// Create a character key.
    pub fn character(s: impl Into<SmolStr>) -> Self {
        Self::Character(s.into())
    }

    /// Check if this is a modifier key.
    pub fn is_modifier(&self) -> bool {
        matches!(self, Self::Alt | Self::Control | Self::Meta | Self::Shift)
    }

    /// Parse a key name as reported by browsers (`"Escape"`, `"m"`, `"M"`).
    pub fn from_name(name: &str) -> Self {
        match name {
            "Enter" => Self::Enter,
            "Escape" | "Esc" => Self::Escape,
            "Tab" => Self::Tab,
            " " | "Space" => Self::Space,
            "Alt" => Self::Alt,
            "Control" | "Ctrl" => Self::Control,
            "Meta" => Self::Meta,
            "Shift" => Self::Shift,
            other if other.chars().count() == 1 => Self::character(other),
            _ => Self::Unidentified,
        }
    }

    /// Same key, ignoring letter case.
    pub fn matches(&self, other: &Key) -> bool {
        match (self, other) {
            (Self::Character(a), Self::Character(b)) => a.to_lowercase() == b.to_lowercase(),
            (a, b) => a == b,
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Character(c) => write!(f, "{}", c.to_uppercase()),
            Self::Enter => write!(f, "Enter"),
            Self::Escape => write!(f, "Escape"),
            Self::Tab => write!(f, "Tab"),
            Self::Space => write!(f, "Space"),
            Self::Alt => write!(f, "Alt"),
            Self::Control => write!(f, "Ctrl"),
            Self::Meta => write!(f, "Meta"),
            Self::Shift => write!(f, "Shift"),
            Self::Unidentified => write!(f, "Unidentified"),
        }
    }
}

/// Modifier key state for a key combination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Modifiers {
    pub ctrl: bool,
    pub alt: bool,
    pub shift: bool,
    pub meta: bool,
}

impl Modifiers {
    pub const NONE: Self = Self {
        ctrl: false,
        alt: false,
        shift: false,
        meta: false,
    };

    pub const SHIFT: Self = Self {
        ctrl: false,
        alt: false,
        shift: true,
        meta: false,
    };

    pub const CTRL: Self = Self {
        ctrl: true,
        alt: false,
        shift: false,
        meta: false,
    };

    pub const ALT: Self = Self {
        ctrl: false,
        alt: true,
        shift: false,
        meta: false,
    };
}

/// A key combination that starts a run.
///
/// Serialized as a chord string like `"Shift+M"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct KeyCombo {
    pub key: Key,
    pub modifiers: Modifiers,
}

impl KeyCombo {
    pub fn with_modifiers(key: Key, modifiers: Modifiers) -> Self {
        Self { key, modifiers }
    }

    pub fn shift(key: Key) -> Self {
        Self {
            key,
            modifiers: Modifiers::SHIFT,
        }
    }

    /// Check if a keydown matches this chord.
    ///
    /// Modifiers must match exactly; letters compare case-insensitively, since
    /// hosts report `"M"` for Shift+m.
    pub fn matches(&self, key: &Key, modifiers: Modifiers) -> bool {
        self.modifiers == modifiers && self.key.matches(key)
    }
}

impl fmt::Display for KeyCombo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let m = self.modifiers;
        for (held, name) in [
            (m.ctrl, "Ctrl"),
            (m.alt, "Alt"),
            (m.shift, "Shift"),
            (m.meta, "Meta"),
        ] {
            if held {
                write!(f, "{name}+")?;
            }
        }
        write!(f, "{}", self.key)
    }
}

impl FromStr for KeyCombo {
    type Err = ChordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = |reason| ChordError {
            chord: s.to_string(),
            reason,
        };

        let mut parts: Vec<&str> = s.split('+').map(str::trim).collect();
        let key = parts.pop().filter(|k| !k.is_empty()).ok_or_else(|| err("missing key"))?;

        let mut modifiers = Modifiers::NONE;
        for part in parts {
            match part.to_ascii_lowercase().as_str() {
                "ctrl" | "control" => modifiers.ctrl = true,
                "alt" | "option" => modifiers.alt = true,
                "shift" => modifiers.shift = true,
                "meta" | "cmd" | "super" => modifiers.meta = true,
                _ => return Err(err("unknown modifier")),
            }
        }

        match Key::from_name(key) {
            Key::Unidentified => Err(err("unknown key")),
            k if k.is_modifier() => Err(err("chord must end in a non-modifier key")),
            Key::Character(c) => Ok(Self::with_modifiers(
                Key::character(c.to_lowercase()),
                modifiers,
            )),
            k => Ok(Self::with_modifiers(k, modifiers)),
        }
    }
}

impl TryFrom<String> for KeyCombo {
    type Error = ChordError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<KeyCombo> for String {
    fn from(combo: KeyCombo) -> Self {
        combo.to_string()
    }
}

/// What a run does with the selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TriggerMode {
    /// Resolve the selection into technical terms and annotate each one.
    Mark,
    /// Annotate the whole selection for on-demand translation.
    Translate,
}

impl fmt::Display for TriggerMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TriggerMode::Mark => write!(f, "mark"),
            TriggerMode::Translate => write!(f, "translate"),
        }
    }
}

/// The two trigger chords.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Keymap {
    pub mark: KeyCombo,
    pub translate: KeyCombo,
}

impl Default for Keymap {
    fn default() -> Self {
        Self {
            mark: KeyCombo::shift(Key::character("m")),
            translate: KeyCombo::shift(Key::character("t")),
        }
    }
}

impl Keymap {
    /// Mode started by a keydown, if any.
    pub fn mode_for(&self, key: &Key, modifiers: Modifiers) -> Option<TriggerMode> {
        if self.mark.matches(key, modifiers) {
            Some(TriggerMode::Mark)
        } else if self.translate.matches(key, modifiers) {
            Some(TriggerMode::Translate)
        } else {
            None
        }
    }
}

/// Result of handling a keydown event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeydownResult {
    /// Event was handled, prevent default.
    Handled,
    /// Event was not a trigger, let the host handle it.
    NotHandled,
}
