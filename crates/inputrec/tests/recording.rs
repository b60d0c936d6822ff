mod common;

use common::FakeHook;
use inputrec::error::ErrorCode;
use inputrec::events::{InputEvent, Phase};
use inputrec::keys::{KeyToken, MouseButton, NamedKey};
use inputrec::modifiers::Modifier;
use inputrec::platform::RawInput;
use inputrec::recorder::Recorder;
use inputrec::storage::RecordingStore;
use rdev::Key;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tempfile::TempDir;

fn setup() -> (TempDir, RecordingStore, FakeHook, Arc<Recorder<FakeHook>>) {
    let dir = tempfile::tempdir().unwrap();
    let store = RecordingStore::with_dir(dir.path()).unwrap();
    let hook = FakeHook::default();
    let recorder = Arc::new(Recorder::new(hook.clone(), store.clone()));
    (dir, store, hook, recorder)
}

fn spawn_start(recorder: &Arc<Recorder<FakeHook>>) -> JoinHandle<inputrec::Result<Option<PathBuf>>> {
    let r = recorder.clone();
    thread::spawn(move || r.start())
}

fn stop_chord(hook: &FakeHook) {
    hook.press(Key::ControlLeft, None);
    hook.press(Key::Escape, Some("\u{1b}"));
}

#[test]
fn ctrl_a_held_for_a_while_then_stop_chord() {
    let (_dir, store, hook, recorder) = setup();
    let handle = spawn_start(&recorder);
    hook.wait_for_subscriber();

    hook.press(Key::ControlLeft, None);
    hook.press(Key::KeyA, Some("\u{1}"));
    thread::sleep(Duration::from_millis(200));
    hook.release(Key::KeyA, Some("\u{1}"));
    hook.release(Key::ControlLeft, None);
    stop_chord(&hook);

    let path = handle.join().unwrap().unwrap().expect("saved");
    assert!(path.starts_with(store.path()));
    assert!(!recorder.is_recording());
    assert_eq!(hook.subscribers(), 0);

    let events = store.load(path.to_str().unwrap()).unwrap();
    assert_eq!(events.len(), 2, "{:?}", events);
    match (&events[0], &events[1]) {
        (
            InputEvent::Key { phase: Phase::Pressed, key: k1, modifiers: m1, t: t1 },
            InputEvent::Key { phase: Phase::Released, key: k2, modifiers: m2, t: t2 },
        ) => {
            assert_eq!(k1, k2);
            assert_eq!(k1, &KeyToken::Control('\u{1}'));
            assert!(m1.contains(&Modifier::Ctrl));
            assert!(m2.contains(&Modifier::Ctrl));
            let gap = t2 - t1;
            assert!((0.18..0.4).contains(&gap), "gap {}", gap);
        }
        other => panic!("unexpected events {:?}", other),
    }
}

#[test]
fn stop_chord_and_bare_modifiers_never_reach_the_file() {
    let (_dir, store, hook, recorder) = setup();
    let handle = spawn_start(&recorder);
    hook.wait_for_subscriber();

    hook.press(Key::KeyX, Some("x"));
    hook.release(Key::KeyX, Some("x"));
    stop_chord(&hook);

    let path = handle.join().unwrap().unwrap().unwrap();
    let events = store.load(path.to_str().unwrap()).unwrap();
    assert_eq!(events.len(), 2);
    for e in &events {
        match e {
            InputEvent::Key { key, .. } => {
                assert_eq!(key, &KeyToken::Char('x'));
                assert_ne!(key, &KeyToken::Named(NamedKey::Esc));
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}

#[test]
fn timestamps_never_go_backwards() {
    let (_dir, store, hook, recorder) = setup();
    let handle = spawn_start(&recorder);
    hook.wait_for_subscriber();

    for i in 0..50 {
        hook.emit(RawInput::Move { x: i * 10, y: 0 });
        if i % 10 == 0 {
            hook.emit(RawInput::Click { x: i * 10, y: 0, button: MouseButton::Left, pressed: true });
        }
        if i % 10 == 5 {
            hook.emit(RawInput::Click { x: i * 10, y: 0, button: MouseButton::Left, pressed: false });
        }
        hook.emit(RawInput::Scroll { x: i, y: i, dx: 0.0, dy: 1.0 });
    }
    stop_chord(&hook);

    let path = handle.join().unwrap().unwrap().unwrap();
    let events = store.load(path.to_str().unwrap()).unwrap();
    assert!(!events.is_empty());
    assert!(events.windows(2).all(|w| w[0].t() <= w[1].t()));
    assert!(events.iter().all(|e| e.t() >= 0.0));
}

#[test]
fn stop_signal_persists_what_was_captured() {
    let (_dir, store, hook, recorder) = setup();
    let stop = recorder.stopper();
    let handle = spawn_start(&recorder);
    hook.wait_for_subscriber();

    while !recorder.is_recording() {
        thread::sleep(Duration::from_millis(2));
    }
    hook.press(Key::KeyQ, Some("q"));
    assert_eq!(recorder.event_count(), 1);
    stop.stop();

    let path = handle.join().unwrap().unwrap().unwrap();
    assert_eq!(store.load(path.to_str().unwrap()).unwrap().len(), 1);
    assert_eq!(store.list().unwrap().len(), 1);
}

#[test]
fn stopping_while_idle_does_nothing() {
    let (_dir, store, _hook, recorder) = setup();
    assert!(recorder.stop().unwrap().is_none());
    assert!(recorder.stop().unwrap().is_none());
    assert!(store.list().unwrap().is_empty());
}

#[test]
fn subscription_failure_leaves_no_recording() {
    let dir = tempfile::tempdir().unwrap();
    let store = RecordingStore::with_dir(dir.path()).unwrap();
    let recorder = Recorder::new(FakeHook::failing("permission denied"), store.clone());

    let err = recorder.start().unwrap_err();
    assert_eq!(err.code, ErrorCode::SubscriptionFailure);
    assert!(err.message.contains("permission denied"));
    assert!(!recorder.is_recording());
    assert!(store.list().unwrap().is_empty());
}

#[test]
fn hook_teardown_ends_the_session() {
    let (_dir, store, hook, recorder) = setup();
    let handle = spawn_start(&recorder);
    hook.wait_for_subscriber();

    hook.press(Key::KeyZ, Some("z"));
    hook.tear_down();

    let path = handle.join().unwrap().unwrap().unwrap();
    assert_eq!(store.load(path.to_str().unwrap()).unwrap().len(), 1);
}

#[test]
fn sessions_can_follow_each_other() {
    let (_dir, store, hook, recorder) = setup();
    for _ in 0..2 {
        let handle = spawn_start(&recorder);
        hook.wait_for_subscriber();
        hook.press(Key::KeyK, Some("k"));
        stop_chord(&hook);
        handle.join().unwrap().unwrap().unwrap();
    }
    let files = store.list().unwrap();
    assert_eq!(files.len(), 2);
    assert_ne!(files[0], files[1]);
}

#[test]
fn stop_requested_before_start_returns_promptly() {
    let (_dir, store, hook, recorder) = setup();
    recorder.stopper().stop();

    let started = Instant::now();
    let saved = recorder.start().unwrap();
    assert!(saved.is_none());
    assert!(started.elapsed() < Duration::from_secs(1));
    assert!(!recorder.is_recording());
    assert_eq!(hook.subscribers(), 0);
    assert!(store.list().unwrap().is_empty());

    // The request is used up; the next session records normally
    let handle = spawn_start(&recorder);
    hook.wait_for_subscriber();
    hook.press(Key::KeyK, Some("k"));
    stop_chord(&hook);
    assert!(handle.join().unwrap().unwrap().is_some());
}

#[test]
fn stopped_session_does_not_cut_the_next_one_short() {
    let (_dir, store, hook, recorder) = setup();
    let stop = recorder.stopper();

    let first = spawn_start(&recorder);
    hook.wait_for_subscriber();
    while !recorder.is_recording() {
        thread::sleep(Duration::from_millis(2));
    }
    stop.stop();
    first.join().unwrap().unwrap().unwrap();

    let second = spawn_start(&recorder);
    hook.wait_for_subscriber();
    thread::sleep(Duration::from_millis(150));
    assert!(recorder.is_recording());
    hook.press(Key::KeyW, Some("w"));
    stop_chord(&hook);

    let path = second.join().unwrap().unwrap().unwrap();
    assert_eq!(store.load(path.to_str().unwrap()).unwrap().len(), 1);
    assert_eq!(store.list().unwrap().len(), 2);
}

#[test]
fn direct_stop_from_another_thread_unblocks_start() {
    let (_dir, _store, hook, recorder) = setup();
    let handle = spawn_start(&recorder);
    hook.wait_for_subscriber();
    while !recorder.is_recording() {
        thread::sleep(Duration::from_millis(2));
    }

    let saved = recorder.stop().unwrap().expect("saved");
    assert_eq!(handle.join().unwrap().unwrap(), Some(saved));
    assert_eq!(hook.subscribers(), 0);
}
