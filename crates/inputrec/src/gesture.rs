//! Click / drag classification for raw mouse signals
//!
//! Every press and release is logged as a click. While a button is held,
//! moves are throttled into drag-move events measured from the last emitted
//! position, and a release away from that position adds a drag-end event.

use crate::events::{InputEvent, Phase};
use crate::keys::MouseButton;
use crate::modifiers::ModifierSet;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DragState {
    pub active: bool,
    pub start: Option<(i32, i32)>,
    pub button: Option<MouseButton>,
    pub last_move_time: f64,
}

#[derive(Debug, Clone)]
pub struct GestureClassifier {
    threshold: i32,
    interval: f64,
    drag: DragState,
}

impl GestureClassifier {
    /// `threshold` in position units, `interval` in seconds
    pub fn new(threshold: i32, interval: f64) -> Self {
        Self {
            threshold,
            interval,
            drag: DragState::default(),
        }
    }

    pub fn state(&self) -> &DragState {
        &self.drag
    }

    pub fn reset(&mut self) {
        self.drag = DragState::default();
    }

    /// Button transition at `(x, y)`; returns the events to append, in order
    pub fn on_click(
        &mut self,
        x: i32,
        y: i32,
        button: MouseButton,
        pressed: bool,
        modifiers: &ModifierSet,
        now: f64,
    ) -> Vec<InputEvent> {
        let mut out = Vec::with_capacity(2);

        if pressed {
            self.drag = DragState {
                active: true,
                start: Some((x, y)),
                button: Some(button.clone()),
                last_move_time: now,
            };
        } else {
            if let (true, Some(start)) = (self.drag.active, self.drag.start) {
                if start != (x, y) {
                    out.push(InputEvent::DragEnd {
                        button: button.clone(),
                        start,
                        end: (x, y),
                        modifiers: modifiers.clone(),
                        t: now,
                    });
                }
            }
            self.drag.active = false;
            self.drag.start = None;
            self.drag.button = None;
        }

        out.push(InputEvent::Click {
            phase: Phase::from_pressed(pressed),
            button,
            x,
            y,
            modifiers: modifiers.clone(),
            t: now,
        });
        out
    }

    /// Pointer move; emits at most one drag-move
    pub fn on_move(&mut self, x: i32, y: i32, modifiers: &ModifierSet, now: f64) -> Option<InputEvent> {
        if !self.drag.active {
            return None;
        }
        let start = self.drag.start?;
        let dx = (x - start.0).abs();
        let dy = (y - start.1).abs();
        let stale = now - self.drag.last_move_time > self.interval;

        if dx <= self.threshold && dy <= self.threshold && !stale {
            return None;
        }

        self.drag.start = Some((x, y));
        self.drag.last_move_time = now;
        Some(InputEvent::DragMove {
            button: self.drag.button.clone().unwrap_or(MouseButton::Left),
            x,
            y,
            modifiers: modifiers.clone(),
            t: now,
        })
    }
}
