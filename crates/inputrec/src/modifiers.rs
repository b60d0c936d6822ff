//! Live modifier-key state

use rdev::Key;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Logical modifier. Declaration order is lexical so sets iterate
/// deterministically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Modifier {
    Alt,
    Cmd,
    Ctrl,
    Shift,
}

impl Modifier {
    pub const ALL: [Modifier; 4] = [Modifier::Alt, Modifier::Cmd, Modifier::Ctrl, Modifier::Shift];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Alt => "alt",
            Self::Cmd => "cmd",
            Self::Ctrl => "ctrl",
            Self::Shift => "shift",
        }
    }

    /// Which logical modifier a physical key drives, if any
    pub fn for_key(key: Key) -> Option<Self> {
        match key {
            Key::ControlLeft | Key::ControlRight => Some(Self::Ctrl),
            Key::Alt | Key::AltGr => Some(Self::Alt),
            Key::ShiftLeft | Key::ShiftRight => Some(Self::Shift),
            Key::MetaLeft | Key::MetaRight => Some(Self::Cmd),
            _ => None,
        }
    }
}

/// Snapshot of held modifiers attached to each event
pub type ModifierSet = BTreeSet<Modifier>;

#[derive(Debug, Clone, Copy, Default)]
pub struct ModifierTracker {
    ctrl: bool,
    alt: bool,
    shift: bool,
    cmd: bool,
}

impl ModifierTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a key transition. Non-modifier keys are ignored.
    pub fn update(&mut self, key: Key, pressed: bool) {
        match Modifier::for_key(key) {
            Some(Modifier::Ctrl) => self.ctrl = pressed,
            Some(Modifier::Alt) => self.alt = pressed,
            Some(Modifier::Shift) => self.shift = pressed,
            Some(Modifier::Cmd) => self.cmd = pressed,
            None => {}
        }
    }

    pub fn is_held(&self, modifier: Modifier) -> bool {
        match modifier {
            Modifier::Alt => self.alt,
            Modifier::Cmd => self.cmd,
            Modifier::Ctrl => self.ctrl,
            Modifier::Shift => self.shift,
        }
    }

    pub fn snapshot(&self) -> ModifierSet {
        Modifier::ALL.into_iter().filter(|m| self.is_held(*m)).collect()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
