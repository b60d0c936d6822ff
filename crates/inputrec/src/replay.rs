//! Timed replay of recorded events through an [`InputInjector`]

use crate::error::{Error, Result};
use crate::events::{InputEvent, Phase};
use crate::keys::{self, modifier_key, Keystroke};
use crate::platform::{Flow, InputHook, InputInjector, RawInput};
use rdev::{Button, Key};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Playback configuration
#[derive(Debug, Clone)]
pub struct PlaybackConfig {
    /// Used when the requested speed is not a positive number
    pub default_speed: f64,
    /// Pressing this key during playback cancels it
    pub cancel_key: Key,
    /// Longest uninterrupted sleep between cancellation checks
    pub poll_interval: Duration,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            default_speed: 1.0,
            cancel_key: Key::Escape,
            poll_interval: Duration::from_millis(10),
        }
    }
}

/// Shared stop flag; once set it stays set until the run ends
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn clear(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackReport {
    /// Events handed to the injector, including ones that failed
    pub dispatched: usize,
    pub failed: usize,
    /// Events never reached because playback was cancelled
    pub skipped: usize,
    /// Speed actually used
    pub speed: f64,
    pub outcome: Outcome,
}

/// Accept only finite, positive speed factors
pub fn validate_speed(speed: f64) -> Result<f64> {
    if speed.is_finite() && speed > 0.0 {
        Ok(speed)
    } else {
        Err(Error::invalid_speed(speed))
    }
}

/// Replays event logs
pub struct Player<I: InputInjector> {
    injector: I,
    config: PlaybackConfig,
    cancel: CancelFlag,
    /// Cancel-key presses we injected ourselves and the listener should ignore
    own_cancel_presses: Arc<AtomicUsize>,
    held_keys: Vec<Keystroke>,
    held_buttons: Vec<Button>,
}

impl<I: InputInjector> Player<I> {
    pub fn new(injector: I) -> Result<Self> {
        Self::with_config(injector, PlaybackConfig::default())
    }

    /// Fails when the key lookup tables are inconsistent
    pub fn with_config(injector: I, config: PlaybackConfig) -> Result<Self> {
        keys::validate_tables()?;
        Ok(Self {
            injector,
            config,
            cancel: CancelFlag::new(),
            own_cancel_presses: Arc::new(AtomicUsize::new(0)),
            held_keys: Vec::new(),
            held_buttons: Vec::new(),
        })
    }

    /// Flag that stops the current or next run when set
    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    pub fn injector(&self) -> &I {
        &self.injector
    }

    pub fn into_inner(self) -> I {
        self.injector
    }

    /// Replay while listening on `hook` for the cancel key
    pub fn play_with_cancel_key<H: InputHook>(
        &mut self,
        hook: &H,
        events: &[InputEvent],
        speed: f64,
    ) -> Result<PlaybackReport> {
        self.own_cancel_presses.store(0, Ordering::SeqCst);
        let flag = self.cancel.clone();
        let own = self.own_cancel_presses.clone();
        let cancel_key = self.config.cancel_key;

        let subscription = hook.subscribe(Box::new(move |raw| match raw {
            RawInput::KeyPress(k) if k.key == cancel_key => {
                let ours = own
                    .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                    .is_ok();
                if ours {
                    return Flow::Continue;
                }
                tracing::info!("cancel key pressed");
                flag.cancel();
                Flow::Unsubscribe
            }
            _ => Flow::Continue,
        }))?;

        let report = self.run(events, speed);
        subscription.unsubscribe();
        // The listener may have fired between the last event and unsubscribing
        self.cancel.clear();
        Ok(report)
    }

    /// Replay `events`, sleeping the recorded gaps divided by `speed`.
    ///
    /// A non-positive speed is rejected and the configured default used
    /// instead. Failures of single events are logged and counted.
    pub fn play(&mut self, events: &[InputEvent], speed: f64) -> PlaybackReport {
        self.own_cancel_presses.store(0, Ordering::SeqCst);
        self.run(events, speed)
    }

    fn run(&mut self, events: &[InputEvent], speed: f64) -> PlaybackReport {
        let speed = validate_speed(speed).unwrap_or_else(|e| {
            tracing::warn!(error = %e, default = self.config.default_speed, "using default speed");
            self.config.default_speed
        });
        tracing::info!(events = events.len(), speed, "playback started");

        let mut report = PlaybackReport {
            dispatched: 0,
            failed: 0,
            skipped: 0,
            speed,
            outcome: Outcome::Completed,
        };

        let mut deadline = Instant::now();
        let mut last_t = 0.0;
        for (i, event) in events.iter().enumerate() {
            let gap = ((event.t() - last_t) / speed).max(0.0);
            last_t = event.t();
            let gap = Duration::try_from_secs_f64(gap).unwrap_or(Duration::ZERO);
            deadline = deadline.checked_add(gap).unwrap_or(deadline);

            if !self.wait_until(deadline) {
                report.skipped = events.len() - i;
                report.outcome = Outcome::Cancelled;
                break;
            }

            report.dispatched += 1;
            match self.dispatch(event) {
                Ok(()) => tracing::debug!(t = event.t(), "{}", event),
                Err(e) => {
                    report.failed += 1;
                    tracing::warn!(error = %e, event = %event, "event skipped");
                }
            }
        }

        if report.outcome == Outcome::Cancelled {
            tracing::info!(skipped = report.skipped, "playback cancelled");
            self.release_held();
        } else {
            tracing::info!(dispatched = report.dispatched, failed = report.failed, "playback finished");
        }
        // A cancel that arrives after the last dispatch must not leak into the next run
        self.cancel.clear();
        report
    }

    /// Sleep until `deadline` in short slices; false once cancelled
    fn wait_until(&self, deadline: Instant) -> bool {
        loop {
            if self.cancel.is_cancelled() {
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            thread::sleep((deadline - now).min(self.config.poll_interval));
        }
    }

    fn dispatch(&mut self, event: &InputEvent) -> Result<()> {
        match event {
            InputEvent::Click { phase, button, x, y, .. } => {
                let b = button.resolve()?;
                self.injector.move_pointer(*x, *y)?;
                match phase {
                    Phase::Pressed => {
                        self.injector.press_button(b)?;
                        self.held_buttons.push(b);
                    }
                    Phase::Released => {
                        self.injector.release_button(b)?;
                        remove_first(&mut self.held_buttons, &b);
                    }
                }
            }
            InputEvent::DragMove { x, y, .. } => self.injector.move_pointer(*x, *y)?,
            InputEvent::DragEnd { end, .. } => self.injector.move_pointer(end.0, end.1)?,
            InputEvent::Scroll { x, y, dx, dy, .. } => {
                self.injector.move_pointer(*x, *y)?;
                self.injector.scroll(*dx, *dy)?;
            }
            InputEvent::Key { phase, key, modifiers, .. } => {
                let stroke = keys::resolve_stroke(key)?;
                match phase {
                    Phase::Pressed => {
                        for m in modifiers {
                            let mk = modifier_key(*m);
                            self.injector.press_key(mk)?;
                            self.held_keys.push(Keystroke::Key(mk));
                        }
                        self.press_main(stroke)?;
                        self.held_keys.push(stroke);
                    }
                    Phase::Released => {
                        self.release_stroke(stroke)?;
                        remove_first(&mut self.held_keys, &stroke);
                        for m in modifiers {
                            let mk = Keystroke::Key(modifier_key(*m));
                            self.release_stroke(mk)?;
                            remove_first(&mut self.held_keys, &mk);
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn press_main(&mut self, stroke: Keystroke) -> Result<()> {
        let k = match stroke {
            Keystroke::Key(k) => k,
            Keystroke::Char(c) => return self.injector.press_char(c),
        };
        let is_cancel = k == self.config.cancel_key;
        if is_cancel {
            self.own_cancel_presses.fetch_add(1, Ordering::SeqCst);
        }
        let pressed = self.injector.press_key(k);
        if is_cancel && pressed.is_err() {
            let _ = self
                .own_cancel_presses
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        }
        pressed
    }

    fn release_stroke(&mut self, stroke: Keystroke) -> Result<()> {
        match stroke {
            Keystroke::Key(k) => self.injector.release_key(k),
            Keystroke::Char(c) => self.injector.release_char(c),
        }
    }

    /// Let go of whatever a cancelled run left pressed
    fn release_held(&mut self) {
        while let Some(stroke) = self.held_keys.pop() {
            if let Err(e) = self.release_stroke(stroke) {
                tracing::warn!(error = %e, key = ?stroke, "could not release key");
            }
        }
        while let Some(b) = self.held_buttons.pop() {
            if let Err(e) = self.injector.release_button(b) {
                tracing::warn!(error = %e, button = ?b, "could not release button");
            }
        }
    }
}

fn remove_first<T: PartialEq>(items: &mut Vec<T>, item: &T) {
    if let Some(i) = items.iter().position(|x| x == item) {
        items.remove(i);
    }
}
