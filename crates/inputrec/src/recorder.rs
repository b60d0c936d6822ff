//! Event recorder
//!
//! Subscribes to the global input stream, normalizes raw signals through the
//! modifier tracker and gesture classifier, and buffers timestamped events
//! until Ctrl+Esc (or an external stop) ends the session and it is persisted.

use crate::error::Result;
use crate::events::{InputEvent, Phase, RecordingFile};
use crate::gesture::GestureClassifier;
use crate::keys::canonicalize;
use crate::modifiers::{Modifier, ModifierTracker};
use crate::platform::{Flow, InputHook, RawInput, RawKey, Subscription};
use crate::storage::RecordingStore;
use chrono::Utc;
use crossbeam_channel::{bounded, select, Receiver, Sender};
use parking_lot::Mutex;
use rdev::Key;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Recorder configuration
#[derive(Debug, Clone)]
pub struct RecorderConfig {
    /// Drag moves within this many units of the last reported point are dropped
    pub drag_threshold: i32,
    /// ...unless this much time has passed since the last reported move
    pub drag_interval: Duration,
    /// How often a blocked `start` checks that its subscription is still alive
    pub liveness_poll: Duration,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            drag_threshold: 5,
            drag_interval: Duration::from_millis(100),
            liveness_poll: Duration::from_millis(50),
        }
    }
}

/// Ends a blocked [`Recorder::start`] from another thread. A stop requested
/// while idle makes the next `start` return without recording.
#[derive(Debug, Clone)]
pub struct StopSignal {
    tx: Sender<()>,
}

impl StopSignal {
    pub fn stop(&self) {
        let _ = self.tx.try_send(());
    }
}

/// Live capture state, shared with the hook callback
pub(crate) struct CaptureState {
    events: Vec<InputEvent>,
    clock: Instant,
    modifiers: ModifierTracker,
    gestures: GestureClassifier,
}

impl CaptureState {
    pub(crate) fn new(config: &RecorderConfig) -> Self {
        Self {
            events: Vec::new(),
            clock: Instant::now(),
            modifiers: ModifierTracker::new(),
            gestures: GestureClassifier::new(config.drag_threshold, config.drag_interval.as_secs_f64()),
        }
    }

    fn handle(&mut self, raw: RawInput) -> Flow {
        let now = self.clock.elapsed().as_secs_f64();
        self.handle_at(raw, now)
    }

    /// Process one raw signal observed `now` seconds into the session
    pub(crate) fn handle_at(&mut self, raw: RawInput, now: f64) -> Flow {
        match raw {
            RawInput::KeyPress(k) => {
                self.modifiers.update(k.key, true);
                if matches!(k.key, Key::Escape) && self.modifiers.is_held(Modifier::Ctrl) {
                    tracing::info!("stop chord pressed");
                    return Flow::Unsubscribe;
                }
                self.push_key(Phase::Pressed, &k, now);
            }
            RawInput::KeyRelease(k) => {
                self.modifiers.update(k.key, false);
                self.push_key(Phase::Released, &k, now);
            }
            RawInput::Move { x, y } => {
                let mods = self.modifiers.snapshot();
                if let Some(e) = self.gestures.on_move(x, y, &mods, now) {
                    self.push(e);
                }
            }
            RawInput::Click { x, y, button, pressed } => {
                let mods = self.modifiers.snapshot();
                for e in self.gestures.on_click(x, y, button, pressed, &mods, now) {
                    self.push(e);
                }
            }
            RawInput::Scroll { x, y, dx, dy } => {
                let modifiers = self.modifiers.snapshot();
                self.push(InputEvent::Scroll { x, y, dx, dy, modifiers, t: now });
            }
        }
        Flow::Continue
    }

    fn push_key(&mut self, phase: Phase, k: &RawKey, now: f64) {
        // Bare modifier transitions only feed the tracker
        if Modifier::for_key(k.key).is_some() {
            return;
        }
        self.push(InputEvent::Key {
            phase,
            key: canonicalize(k.key, k.text.as_deref()),
            modifiers: self.modifiers.snapshot(),
            t: now,
        });
    }

    fn push(&mut self, e: InputEvent) {
        tracing::debug!(t = e.t(), "{}", e);
        self.events.push(e);
    }

    pub(crate) fn events(&self) -> &[InputEvent] {
        &self.events
    }

    fn take_events(&mut self) -> Vec<InputEvent> {
        std::mem::take(&mut self.events)
    }
}

struct ActiveSession {
    start_time: f64,
    state: Arc<Mutex<CaptureState>>,
    subscription: Subscription,
}

/// The recorder
pub struct Recorder<H: InputHook> {
    hook: H,
    store: RecordingStore,
    config: RecorderConfig,
    active: Mutex<Option<ActiveSession>>,
    last_saved: Mutex<Option<PathBuf>>,
    stop_tx: Sender<()>,
    stop_rx: Receiver<()>,
}

impl<H: InputHook> Recorder<H> {
    pub fn new(hook: H, store: RecordingStore) -> Self {
        Self::with_config(hook, store, RecorderConfig::default())
    }

    pub fn with_config(hook: H, store: RecordingStore, config: RecorderConfig) -> Self {
        let (stop_tx, stop_rx) = bounded(1);
        Self {
            hook,
            store,
            config,
            active: Mutex::new(None),
            last_saved: Mutex::new(None),
            stop_tx,
            stop_rx,
        }
    }

    pub fn stopper(&self) -> StopSignal {
        StopSignal {
            tx: self.stop_tx.clone(),
        }
    }

    pub fn is_recording(&self) -> bool {
        self.active.lock().is_some()
    }

    /// Events captured so far in the running session
    pub fn event_count(&self) -> usize {
        self.active
            .lock()
            .as_ref()
            .map_or(0, |s| s.state.lock().events().len())
    }

    pub fn store(&self) -> &RecordingStore {
        &self.store
    }

    /// Record until the stop chord, a [`StopSignal`], or the hook going away.
    ///
    /// Blocks the caller. Returns where the session was saved.
    pub fn start(&self) -> Result<Option<PathBuf>> {
        if self.is_recording() {
            self.stop()?;
        }
        *self.last_saved.lock() = None;
        if self.stop_rx.try_recv().is_ok() {
            tracing::info!("stop requested before recording started");
            return Ok(None);
        }

        let start_time = Utc::now().timestamp_micros() as f64 / 1e6;
        let state = Arc::new(Mutex::new(CaptureState::new(&self.config)));

        // Owned by the handler: disconnects once the hook drops it
        let (chord_tx, chord_rx) = bounded::<()>(1);
        let handler_state = state.clone();
        let subscription = self.hook.subscribe(Box::new(move |raw| {
            let flow = handler_state.lock().handle(raw);
            if flow == Flow::Unsubscribe {
                let _ = chord_tx.try_send(());
            }
            flow
        }))?;

        *self.active.lock() = Some(ActiveSession {
            start_time,
            state,
            subscription,
        });
        tracing::info!("recording started, press Ctrl+Esc to stop");

        loop {
            select! {
                recv(self.stop_rx) -> _ => break,
                recv(chord_rx) -> msg => {
                    if msg.is_err() && self.is_recording() {
                        tracing::warn!("input subscription was torn down");
                    }
                    break;
                }
                default(self.config.liveness_poll) => {
                    // Stopped directly through `stop` from another thread
                    if !self.is_recording() {
                        break;
                    }
                }
            }
        }

        let saved = self.stop()?;
        Ok(saved.or_else(|| self.last_saved.lock().clone()))
    }

    /// Stop and persist the running session. A no-op when nothing is recording.
    pub fn stop(&self) -> Result<Option<PathBuf>> {
        // Held until the file is written so a concurrent stop sees `last_saved`
        let mut active = self.active.lock();
        let Some(session) = active.take() else {
            tracing::debug!("stop requested with no active recording");
            return Ok(None);
        };
        session.subscription.unsubscribe();

        let events = session.state.lock().take_events();
        let count = events.len();
        let path = self.store.save(&RecordingFile::new(session.start_time, events))?;
        tracing::info!(path = %path.display(), events = count, "recording saved");

        *self.last_saved.lock() = Some(path.clone());
        Ok(Some(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::{KeyToken, MouseButton, NamedKey};
    use crate::modifiers::ModifierSet;

    fn press(key: Key, text: Option<&str>) -> RawInput {
        RawInput::KeyPress(RawKey::new(key, text))
    }

    fn release(key: Key, text: Option<&str>) -> RawInput {
        RawInput::KeyRelease(RawKey::new(key, text))
    }

    fn ctrl() -> ModifierSet {
        [Modifier::Ctrl].into_iter().collect()
    }

    #[test]
    fn key_with_ctrl_held_carries_ctrl_and_skips_bare_modifier() {
        let mut s = CaptureState::new(&RecorderConfig::default());
        s.handle_at(press(Key::ControlLeft, None), 0.0);
        s.handle_at(press(Key::KeyA, Some("a")), 0.0);
        s.handle_at(release(Key::KeyA, Some("a")), 0.2);
        assert_eq!(
            s.events(),
            &[
                InputEvent::Key { phase: Phase::Pressed, key: KeyToken::Char('a'), modifiers: ctrl(), t: 0.0 },
                InputEvent::Key { phase: Phase::Released, key: KeyToken::Char('a'), modifiers: ctrl(), t: 0.2 },
            ]
        );
    }

    #[test]
    fn modifier_release_updates_following_snapshots() {
        let mut s = CaptureState::new(&RecorderConfig::default());
        s.handle_at(press(Key::ShiftLeft, None), 0.0);
        s.handle_at(press(Key::KeyB, Some("B")), 0.1);
        s.handle_at(release(Key::ShiftLeft, None), 0.2);
        s.handle_at(release(Key::KeyB, Some("B")), 0.3);
        let mods: Vec<_> = s.events().iter().map(|e| e.modifiers().len()).collect();
        assert_eq!(mods, [1, 0]);
    }

    #[test]
    fn stop_chord_is_not_logged() {
        let mut s = CaptureState::new(&RecorderConfig::default());
        assert_eq!(s.handle_at(press(Key::ControlRight, None), 0.0), Flow::Continue);
        assert_eq!(s.handle_at(press(Key::Escape, Some("\u{1b}")), 0.1), Flow::Unsubscribe);
        assert!(s.events().is_empty());
    }

    #[test]
    fn plain_escape_is_content() {
        let mut s = CaptureState::new(&RecorderConfig::default());
        assert_eq!(s.handle_at(press(Key::Escape, None), 0.0), Flow::Continue);
        assert!(matches!(
            s.events(),
            [InputEvent::Key { key: KeyToken::Named(NamedKey::Esc), .. }]
        ));
    }

    #[test]
    fn mouse_signals_flow_through_gestures() {
        let mut s = CaptureState::new(&RecorderConfig::default());
        s.handle_at(RawInput::Move { x: 1, y: 1 }, 0.0);
        s.handle_at(RawInput::Click { x: 10, y: 10, button: MouseButton::Left, pressed: true }, 0.0);
        s.handle_at(RawInput::Move { x: 20, y: 20 }, 0.05);
        s.handle_at(RawInput::Click { x: 20, y: 20, button: MouseButton::Left, pressed: false }, 0.1);
        s.handle_at(RawInput::Scroll { x: 20, y: 20, dx: 0.0, dy: -2.0 }, 0.2);
        let kinds: Vec<_> = s.events().iter().map(InputEvent::kind).collect();
        assert_eq!(kinds, ["mouse", "mouse_drag", "mouse", "mouse_scroll"]);
    }
}
