//! rdev backend
//!
//! rdev's `listen` blocks its thread forever and cannot be stopped, so one
//! process-wide listener thread is started lazily and events are routed to
//! whichever handlers are currently subscribed.

use super::{Flow, Handler, InputHook, InputInjector, RawInput, RawKey, Subscription};
use crate::error::{Error, Result};
use crate::keys::MouseButton;
use crossbeam_channel::{bounded, Receiver};
use enigo::{Direction, Enigo, Keyboard, Mouse, Settings};
use parking_lot::{const_mutex, Mutex};
use rdev::{Button, Event, EventType, Key};
use std::sync::OnceLock;
use std::thread;
use std::time::Duration;

struct Router {
    next_id: u64,
    handlers: Vec<(u64, Handler)>,
    /// Last known pointer position; rdev only reports it on moves
    pointer: Option<(f64, f64)>,
    /// Text produced by keys still held, replayed onto their release
    held_text: Vec<(Key, Option<String>)>,
}

impl Router {
    const fn new() -> Self {
        Self {
            next_id: 0,
            handlers: Vec::new(),
            pointer: None,
            held_text: Vec::new(),
        }
    }

    /// Pointer position in whole units, asking `locate` when no move has been seen yet
    fn position(&mut self, locate: impl FnOnce() -> Option<(f64, f64)>) -> Option<(i32, i32)> {
        if self.pointer.is_none() {
            self.pointer = locate();
        }
        self.pointer.map(|(x, y)| (x.round() as i32, y.round() as i32))
    }

    /// Convert one rdev event. Buttons and wheel events are dropped while the
    /// pointer position cannot be determined.
    fn translate(&mut self, event: Event, locate: impl FnOnce() -> Option<(f64, f64)>) -> Option<RawInput> {
        let raw = match event.event_type {
            EventType::MouseMove { x, y } => {
                self.pointer = Some((x, y));
                RawInput::Move {
                    x: x.round() as i32,
                    y: y.round() as i32,
                }
            }
            EventType::ButtonPress(b) | EventType::ButtonRelease(b) => {
                let Some((x, y)) = self.position(locate) else {
                    tracing::warn!(button = ?b, "pointer position unknown, dropping button event");
                    return None;
                };
                RawInput::Click {
                    x,
                    y,
                    button: MouseButton::from_rdev(b),
                    pressed: matches!(event.event_type, EventType::ButtonPress(_)),
                }
            }
            EventType::Wheel { delta_x, delta_y } => {
                let Some((x, y)) = self.position(locate) else {
                    tracing::warn!("pointer position unknown, dropping wheel event");
                    return None;
                };
                RawInput::Scroll {
                    x,
                    y,
                    dx: delta_x as f64,
                    dy: delta_y as f64,
                }
            }
            EventType::KeyPress(key) => {
                self.held_text.retain(|(k, _)| *k != key);
                self.held_text.push((key, event.name.clone()));
                RawInput::KeyPress(RawKey { key, text: event.name })
            }
            EventType::KeyRelease(key) => {
                let held = self
                    .held_text
                    .iter()
                    .position(|(k, _)| *k == key)
                    .map(|i| self.held_text.remove(i).1);
                let text = event.name.or(held.flatten());
                RawInput::KeyRelease(RawKey { key, text })
            }
        };
        Some(raw)
    }
}

static ROUTER: Mutex<Router> = const_mutex(Router::new());

/// Current pointer position as reported by the OS
fn os_pointer() -> Option<(f64, f64)> {
    Enigo::new(&Settings::default())
        .ok()
        .and_then(|enigo| enigo.location().ok())
        .map(|(x, y)| (x as f64, y as f64))
}

static LISTENER: OnceLock<Receiver<String>> = OnceLock::new();
static FAILURE: Mutex<Option<String>> = const_mutex(None);

fn spawn_listener() -> Receiver<String> {
    let (tx, rx) = bounded(1);
    let spawn_tx = tx.clone();
    let spawned = thread::Builder::new()
        .name("inputrec-hook".to_string())
        .spawn(move || {
            tracing::debug!("starting global input listener");
            let reason = match rdev::listen(route) {
                Ok(()) => "listener exited".to_string(),
                Err(e) => format!("{:?}", e),
            };
            tracing::error!(%reason, "global input listener stopped");
            let _ = tx.send(reason);
        });
    if let Err(e) = spawned {
        let _ = spawn_tx.send(format!("could not spawn listener thread: {}", e));
    }
    rx
}

/// Whether the shared listener is alive. The first caller waits `grace` for
/// an early failure, later callers only look at what has been reported.
fn listener_status(grace: Duration) -> std::result::Result<(), String> {
    let mut fresh = false;
    let failures = LISTENER.get_or_init(|| {
        fresh = true;
        spawn_listener()
    });

    let mut failed = FAILURE.lock();
    if failed.is_none() {
        *failed = if fresh {
            failures.recv_timeout(grace).ok()
        } else {
            failures.try_recv().ok()
        };
    }
    match failed.as_ref() {
        Some(reason) => Err(reason.clone()),
        None => Ok(()),
    }
}

fn route(event: Event) {
    let mut router = ROUTER.lock();
    let Some(raw) = router.translate(event, os_pointer) else {
        return;
    };
    router.handlers.retain_mut(|(_, handler)| handler(raw.clone()) == Flow::Continue);
}

/// Global hook backed by `rdev::listen`
#[derive(Debug, Clone)]
pub struct RdevHook {
    grace: Duration,
}

impl RdevHook {
    pub fn new() -> Self {
        Self {
            grace: Duration::from_millis(250),
        }
    }

    /// How long the first subscription waits for the listener to fail
    pub fn with_grace(grace: Duration) -> Self {
        Self { grace }
    }
}

impl Default for RdevHook {
    fn default() -> Self {
        Self::new()
    }
}

impl InputHook for RdevHook {
    fn subscribe(&self, handler: Handler) -> Result<Subscription> {
        listener_status(self.grace).map_err(Error::subscription_failure)?;

        let seed = os_pointer();
        let id = {
            let mut router = ROUTER.lock();
            if let Some(p) = seed {
                router.pointer = Some(p);
            }
            let id = router.next_id;
            router.next_id += 1;
            router.handlers.push((id, handler));
            id
        };
        tracing::debug!(id, "input handler subscribed");

        Ok(Subscription::new(move || {
            ROUTER.lock().handlers.retain(|(h, _)| *h != id);
            tracing::debug!(id, "input handler unsubscribed");
        }))
    }
}

/// Synthetic input through `rdev::simulate`, with characters that have no
/// physical key typed through enigo
#[derive(Default)]
pub struct RdevInjector {
    settle: Duration,
    typist: Option<Enigo>,
}

impl RdevInjector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pause after each synthetic event; some platforms drop events sent back to back
    pub fn with_settle(settle: Duration) -> Self {
        Self {
            settle,
            typist: None,
        }
    }

    fn pause(&self) {
        if !self.settle.is_zero() {
            thread::sleep(self.settle);
        }
    }

    fn send(&self, event: EventType, action: &str) -> Result<()> {
        rdev::simulate(&event).map_err(|e| Error::injection_failed(action, format!("{:?}", e)))?;
        self.pause();
        Ok(())
    }

    fn typist(&mut self) -> Result<&mut Enigo> {
        if self.typist.is_none() {
            let enigo = Enigo::new(&Settings::default())
                .map_err(|e| Error::injection_failed("open keyboard", format!("{:?}", e)))?;
            self.typist = Some(enigo);
        }
        self.typist
            .as_mut()
            .ok_or_else(|| Error::injection_failed("open keyboard", "no connection"))
    }

    fn send_char(&mut self, c: char, direction: Direction, action: &str) -> Result<()> {
        self.typist()?
            .key(enigo::Key::Unicode(c), direction)
            .map_err(|e| Error::injection_failed(action, format!("{:?}", e)))?;
        self.pause();
        Ok(())
    }
}

impl std::fmt::Debug for RdevInjector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RdevInjector")
            .field("settle", &self.settle)
            .field("typist", &self.typist.is_some())
            .finish()
    }
}

impl InputInjector for RdevInjector {
    fn move_pointer(&mut self, x: i32, y: i32) -> Result<()> {
        self.send(
            EventType::MouseMove {
                x: x as f64,
                y: y as f64,
            },
            "move pointer",
        )
    }

    fn press_button(&mut self, button: Button) -> Result<()> {
        self.send(EventType::ButtonPress(button), "press button")
    }

    fn release_button(&mut self, button: Button) -> Result<()> {
        self.send(EventType::ButtonRelease(button), "release button")
    }

    fn scroll(&mut self, dx: f64, dy: f64) -> Result<()> {
        self.send(
            EventType::Wheel {
                delta_x: dx.round() as i64,
                delta_y: dy.round() as i64,
            },
            "scroll",
        )
    }

    fn press_key(&mut self, key: Key) -> Result<()> {
        self.send(EventType::KeyPress(key), "press key")
    }

    fn release_key(&mut self, key: Key) -> Result<()> {
        self.send(EventType::KeyRelease(key), "release key")
    }

    fn press_char(&mut self, c: char) -> Result<()> {
        self.send_char(c, Direction::Press, "press character")
    }

    fn release_char(&mut self, c: char) -> Result<()> {
        self.send_char(c, Direction::Release, "release character")
    }
}
