//! Recorded event types
//!
//! [`InputEvent`] is the in-memory log entry. Its JSON shape is defined by the
//! private [`WireEvent`] mirror so the file format stays explicit: one object
//! per event, discriminated by `"type"`, with `"timestamp"` in seconds since
//! recording start.

use crate::keys::{KeyToken, MouseButton};
use crate::modifiers::ModifierSet;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Pressed,
    Released,
}

impl Phase {
    pub fn from_pressed(pressed: bool) -> Self {
        if pressed {
            Self::Pressed
        } else {
            Self::Released
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pressed => "pressed",
            Self::Released => "released",
        }
    }
}

/// One normalized input event. `t` is seconds since recording start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "WireEvent", from = "WireEvent")]
pub enum InputEvent {
    Key {
        phase: Phase,
        key: KeyToken,
        modifiers: ModifierSet,
        t: f64,
    },
    Click {
        phase: Phase,
        button: MouseButton,
        x: i32,
        y: i32,
        modifiers: ModifierSet,
        t: f64,
    },
    DragMove {
        button: MouseButton,
        x: i32,
        y: i32,
        modifiers: ModifierSet,
        t: f64,
    },
    DragEnd {
        button: MouseButton,
        start: (i32, i32),
        end: (i32, i32),
        modifiers: ModifierSet,
        t: f64,
    },
    Scroll {
        x: i32,
        y: i32,
        dx: f64,
        dy: f64,
        modifiers: ModifierSet,
        t: f64,
    },
}

impl InputEvent {
    pub fn t(&self) -> f64 {
        match self {
            Self::Key { t, .. }
            | Self::Click { t, .. }
            | Self::DragMove { t, .. }
            | Self::DragEnd { t, .. }
            | Self::Scroll { t, .. } => *t,
        }
    }

    pub fn modifiers(&self) -> &ModifierSet {
        match self {
            Self::Key { modifiers, .. }
            | Self::Click { modifiers, .. }
            | Self::DragMove { modifiers, .. }
            | Self::DragEnd { modifiers, .. }
            | Self::Scroll { modifiers, .. } => modifiers,
        }
    }

    /// The `"type"` tag used on disk
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Key { .. } => "keyboard",
            Self::Click { .. } => "mouse",
            Self::DragMove { .. } => "mouse_drag",
            Self::DragEnd { .. } => "mouse_drag_end",
            Self::Scroll { .. } => "mouse_scroll",
        }
    }
}

fn mod_prefix(modifiers: &ModifierSet) -> String {
    modifiers
        .iter()
        .map(|m| format!("{}+", m.as_str()))
        .collect()
}

impl fmt::Display for InputEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key { phase, key, modifiers, .. } => {
                write!(f, "Key {} {}", key.display_with(modifiers), phase.as_str())
            }
            Self::Click { phase, button, x, y, modifiers, .. } => write!(
                f,
                "Mouse {}{} {} at ({}, {})",
                mod_prefix(modifiers),
                button,
                phase.as_str(),
                x,
                y
            ),
            Self::DragMove { button, x, y, modifiers, .. } => {
                write!(f, "Mouse {}{} dragged to ({}, {})", mod_prefix(modifiers), button, x, y)
            }
            Self::DragEnd { button, start, end, modifiers, .. } => write!(
                f,
                "Mouse {}{} drag ended from {:?} to {:?}",
                mod_prefix(modifiers),
                button,
                start,
                end
            ),
            Self::Scroll { x, y, dy, modifiers, .. } => {
                let direction = if *dy < 0.0 { "down" } else { "up" };
                write!(f, "Mouse {}scrolled {} at ({}, {})", mod_prefix(modifiers), direction, x, y)
            }
        }
    }
}

/// Persisted form of one session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordingFile {
    /// Unix epoch seconds at capture start
    pub start_time: f64,
    pub events: Vec<InputEvent>,
}

impl RecordingFile {
    pub fn new(start_time: f64, events: Vec<InputEvent>) -> Self {
        Self { start_time, events }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(tag = "type")]
enum WireEvent {
    #[serde(rename = "keyboard")]
    Keyboard {
        event: Phase,
        key: KeyToken,
        #[serde(default, skip_deserializing)]
        key_display: String,
        #[serde(default)]
        modifiers: ModifierSet,
        timestamp: f64,
    },
    #[serde(rename = "mouse")]
    Mouse {
        event: Phase,
        button: MouseButton,
        x: i32,
        y: i32,
        #[serde(default)]
        modifiers: ModifierSet,
        timestamp: f64,
    },
    #[serde(rename = "mouse_drag")]
    MouseDrag {
        x: i32,
        y: i32,
        button: MouseButton,
        #[serde(default)]
        modifiers: ModifierSet,
        timestamp: f64,
    },
    #[serde(rename = "mouse_drag_end")]
    MouseDragEnd {
        start_x: i32,
        start_y: i32,
        end_x: i32,
        end_y: i32,
        button: MouseButton,
        #[serde(default)]
        modifiers: ModifierSet,
        timestamp: f64,
    },
    #[serde(rename = "mouse_scroll")]
    MouseScroll {
        x: i32,
        y: i32,
        dx: f64,
        dy: f64,
        #[serde(default)]
        modifiers: ModifierSet,
        timestamp: f64,
    },
}

impl From<InputEvent> for WireEvent {
    fn from(e: InputEvent) -> Self {
        match e {
            InputEvent::Key { phase, key, modifiers, t } => WireEvent::Keyboard {
                event: phase,
                key_display: key.display_with(&modifiers),
                key,
                modifiers,
                timestamp: t,
            },
            InputEvent::Click { phase, button, x, y, modifiers, t } => WireEvent::Mouse {
                event: phase,
                button,
                x,
                y,
                modifiers,
                timestamp: t,
            },
            InputEvent::DragMove { button, x, y, modifiers, t } => WireEvent::MouseDrag {
                x,
                y,
                button,
                modifiers,
                timestamp: t,
            },
            InputEvent::DragEnd { button, start, end, modifiers, t } => WireEvent::MouseDragEnd {
                start_x: start.0,
                start_y: start.1,
                end_x: end.0,
                end_y: end.1,
                button,
                modifiers,
                timestamp: t,
            },
            InputEvent::Scroll { x, y, dx, dy, modifiers, t } => WireEvent::MouseScroll {
                x,
                y,
                dx,
                dy,
                modifiers,
                timestamp: t,
            },
        }
    }
}

impl From<WireEvent> for InputEvent {
    fn from(w: WireEvent) -> Self {
        match w {
            WireEvent::Keyboard { event, key, modifiers, timestamp, .. } => InputEvent::Key {
                phase: event,
                key,
                modifiers,
                t: timestamp,
            },
            WireEvent::Mouse { event, button, x, y, modifiers, timestamp } => InputEvent::Click {
                phase: event,
                button,
                x,
                y,
                modifiers,
                t: timestamp,
            },
            WireEvent::MouseDrag { x, y, button, modifiers, timestamp } => InputEvent::DragMove {
                button,
                x,
                y,
                modifiers,
                t: timestamp,
            },
            WireEvent::MouseDragEnd { start_x, start_y, end_x, end_y, button, modifiers, timestamp } => {
                InputEvent::DragEnd {
                    button,
                    start: (start_x, start_y),
                    end: (end_x, end_y),
                    modifiers,
                    t: timestamp,
                }
            }
            WireEvent::MouseScroll { x, y, dx, dy, modifiers, timestamp } => InputEvent::Scroll {
                x,
                y,
                dx,
                dy,
                modifiers,
                t: timestamp,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modifiers::Modifier;
    use serde_json::json;

    fn ctrl() -> ModifierSet {
        [Modifier::Ctrl].into_iter().collect()
    }

    #[test]
    fn keyboard_event_matches_file_shape() {
        let e = InputEvent::Key {
            phase: Phase::Pressed,
            key: KeyToken::Char('a'),
            modifiers: ctrl(),
            t: 0.25,
        };
        assert_eq!(
            serde_json::to_value(&e).unwrap(),
            json!({
                "type": "keyboard",
                "event": "pressed",
                "key": "a",
                "key_display": "ctrl+a",
                "modifiers": ["ctrl"],
                "timestamp": 0.25
            })
        );
    }

    #[test]
    fn drag_end_flattens_positions() {
        let e = InputEvent::DragEnd {
            button: MouseButton::Left,
            start: (1, 2),
            end: (3, 4),
            modifiers: ModifierSet::new(),
            t: 1.0,
        };
        let v = serde_json::to_value(&e).unwrap();
        assert_eq!(v["type"], "mouse_drag_end");
        assert_eq!(v["start_x"], 1);
        assert_eq!(v["end_y"], 4);
        assert_eq!(v["button"], "Button.left");
    }

    #[test]
    fn reads_legacy_scroll_without_modifiers() {
        let v = json!({"type": "mouse_scroll", "x": 5, "y": 6, "dx": 0, "dy": -1, "timestamp": 2.5});
        let e: InputEvent = serde_json::from_value(v).unwrap();
        assert_eq!(
            e,
            InputEvent::Scroll { x: 5, y: 6, dx: 0.0, dy: -1.0, modifiers: ModifierSet::new(), t: 2.5 }
        );
    }

    #[test]
    fn rejects_unknown_variant_and_bad_timestamp() {
        let unknown = json!({"type": "gamepad", "timestamp": 0.0});
        assert!(serde_json::from_value::<InputEvent>(unknown).is_err());

        let bad_t = json!({"type": "mouse_drag", "x": 1, "y": 1, "button": "Button.left", "timestamp": "soon"});
        assert!(serde_json::from_value::<InputEvent>(bad_t).is_err());
    }

    #[test]
    fn display_reads_like_a_log_line() {
        let e = InputEvent::Click {
            phase: Phase::Released,
            button: MouseButton::Right,
            x: 10,
            y: 20,
            modifiers: ctrl(),
            t: 0.0,
        };
        assert_eq!(e.to_string(), "Mouse ctrl+Button.right released at (10, 20)");
    }
}
