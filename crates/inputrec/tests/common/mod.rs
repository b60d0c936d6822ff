#![allow(dead_code)]

use inputrec::error::{Error, Result};
use inputrec::platform::{Flow, Handler, InputHook, InputInjector, RawInput, RawKey, Subscription};
use parking_lot::Mutex;
use rdev::{Button, Key};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

#[derive(Default)]
struct HookState {
    next_id: u64,
    handlers: Vec<(u64, Handler)>,
    fail: Option<String>,
}

/// In-process stand-in for the OS hook; tests push raw signals with `emit`
#[derive(Clone, Default)]
pub struct FakeHook {
    inner: Arc<Mutex<HookState>>,
}

impl FakeHook {
    pub fn failing(reason: &str) -> Self {
        let hook = Self::default();
        hook.inner.lock().fail = Some(reason.to_string());
        hook
    }

    pub fn emit(&self, raw: RawInput) {
        self.inner
            .lock()
            .handlers
            .retain_mut(|(_, handler)| handler(raw.clone()) == Flow::Continue);
    }

    pub fn press(&self, key: Key, text: Option<&str>) {
        self.emit(RawInput::KeyPress(RawKey::new(key, text)));
    }

    pub fn release(&self, key: Key, text: Option<&str>) {
        self.emit(RawInput::KeyRelease(RawKey::new(key, text)));
    }

    pub fn subscribers(&self) -> usize {
        self.inner.lock().handlers.len()
    }

    pub fn wait_for_subscriber(&self) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while self.subscribers() == 0 {
            assert!(Instant::now() < deadline, "nobody subscribed");
            thread::sleep(Duration::from_millis(2));
        }
    }

    /// Drop every handler without telling anyone, like a dying OS hook
    pub fn tear_down(&self) {
        self.inner.lock().handlers.clear();
    }
}

impl InputHook for FakeHook {
    fn subscribe(&self, handler: Handler) -> Result<Subscription> {
        let mut state = self.inner.lock();
        if let Some(reason) = &state.fail {
            return Err(Error::subscription_failure(reason));
        }
        let id = state.next_id;
        state.next_id += 1;
        state.handlers.push((id, handler));

        let inner = self.inner.clone();
        Ok(Subscription::new(move || {
            inner.lock().handlers.retain(|(h, _)| *h != id);
        }))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Move(i32, i32),
    Press(Button),
    Release(Button),
    Scroll(f64, f64),
    KeyDown(Key),
    KeyUp(Key),
    CharDown(char),
    CharUp(char),
}

/// Injector that timestamps every call and can feed keys back into a hook
#[derive(Default)]
pub struct FakeInjector {
    pub calls: Vec<(Instant, Call)>,
    pub echo: Option<FakeHook>,
}

impl FakeInjector {
    pub fn echoing(hook: FakeHook) -> Self {
        Self {
            calls: Vec::new(),
            echo: Some(hook),
        }
    }

    pub fn plain_calls(&self) -> Vec<Call> {
        self.calls.iter().map(|(_, c)| c.clone()).collect()
    }

    fn record(&mut self, call: Call) -> Result<()> {
        self.calls.push((Instant::now(), call));
        Ok(())
    }
}

impl InputInjector for FakeInjector {
    fn move_pointer(&mut self, x: i32, y: i32) -> Result<()> {
        self.record(Call::Move(x, y))
    }

    fn press_button(&mut self, button: Button) -> Result<()> {
        self.record(Call::Press(button))
    }

    fn release_button(&mut self, button: Button) -> Result<()> {
        self.record(Call::Release(button))
    }

    fn scroll(&mut self, dx: f64, dy: f64) -> Result<()> {
        self.record(Call::Scroll(dx, dy))
    }

    fn press_key(&mut self, key: Key) -> Result<()> {
        if let Some(hook) = &self.echo {
            hook.press(key, None);
        }
        self.record(Call::KeyDown(key))
    }

    fn release_key(&mut self, key: Key) -> Result<()> {
        if let Some(hook) = &self.echo {
            hook.release(key, None);
        }
        self.record(Call::KeyUp(key))
    }

    fn press_char(&mut self, c: char) -> Result<()> {
        self.record(Call::CharDown(c))
    }

    fn release_char(&mut self, c: char) -> Result<()> {
        self.record(Call::CharUp(c))
    }
}
