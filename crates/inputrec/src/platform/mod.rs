//! Platform abstraction layer
//!
//! The recorder and player only talk to the OS through [`InputHook`] (global
//! key/mouse subscription) and [`InputInjector`] (synthetic input). The
//! default backend for both is rdev.

mod rdev_impl;

pub use rdev_impl::{RdevHook, RdevInjector};

use crate::error::Result;
use crate::keys::MouseButton;
use rdev::{Button, Key};

/// Key signal as delivered by the OS
#[derive(Debug, Clone, PartialEq)]
pub struct RawKey {
    pub key: Key,
    /// Character the key produced, if the OS reported one
    pub text: Option<String>,
}

impl RawKey {
    pub fn new(key: Key, text: Option<&str>) -> Self {
        Self {
            key,
            text: text.map(str::to_string),
        }
    }
}

/// Unprocessed input signal, positions in screen coordinates
#[derive(Debug, Clone, PartialEq)]
pub enum RawInput {
    Move { x: i32, y: i32 },
    Click { x: i32, y: i32, button: MouseButton, pressed: bool },
    Scroll { x: i32, y: i32, dx: f64, dy: f64 },
    KeyPress(RawKey),
    KeyRelease(RawKey),
}

/// What a handler wants after seeing an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Unsubscribe,
}

pub type Handler = Box<dyn FnMut(RawInput) -> Flow + Send>;

/// Global input subscription
pub trait InputHook {
    /// Register `handler`. It runs on the hook's delivery thread and must not block.
    fn subscribe(&self, handler: Handler) -> Result<Subscription>;
}

/// Live registration; dropping it unsubscribes
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    pub fn unsubscribe(mut self) {
        self.cancel_now();
    }

    fn cancel_now(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel_now();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}

/// Synthetic input
pub trait InputInjector {
    fn move_pointer(&mut self, x: i32, y: i32) -> Result<()>;
    fn press_button(&mut self, button: Button) -> Result<()>;
    fn release_button(&mut self, button: Button) -> Result<()>;
    fn scroll(&mut self, dx: f64, dy: f64) -> Result<()>;
    fn press_key(&mut self, key: Key) -> Result<()>;
    fn release_key(&mut self, key: Key) -> Result<()>;
    /// Type a character that has no key on the active layout
    fn press_char(&mut self, c: char) -> Result<()>;
    fn release_char(&mut self, c: char) -> Result<()>;
}

impl<T: InputHook + ?Sized> InputHook for &T {
    fn subscribe(&self, handler: Handler) -> Result<Subscription> {
        (**self).subscribe(handler)
    }
}

impl<T: InputHook + ?Sized> InputHook for std::sync::Arc<T> {
    fn subscribe(&self, handler: Handler) -> Result<Subscription> {
        (**self).subscribe(handler)
    }
}

impl<T: InputInjector + ?Sized> InputInjector for &mut T {
    fn move_pointer(&mut self, x: i32, y: i32) -> Result<()> {
        (**self).move_pointer(x, y)
    }
    fn press_button(&mut self, button: Button) -> Result<()> {
        (**self).press_button(button)
    }
    fn release_button(&mut self, button: Button) -> Result<()> {
        (**self).release_button(button)
    }
    fn scroll(&mut self, dx: f64, dy: f64) -> Result<()> {
        (**self).scroll(dx, dy)
    }
    fn press_key(&mut self, key: Key) -> Result<()> {
        (**self).press_key(key)
    }
    fn release_key(&mut self, key: Key) -> Result<()> {
        (**self).release_key(key)
    }
    fn press_char(&mut self, c: char) -> Result<()> {
        (**self).press_char(c)
    }
    fn release_char(&mut self, c: char) -> Result<()> {
        (**self).release_char(c)
    }
}
