//! Key-name resolver
//!
//! Maps raw OS key signals to stable [`KeyToken`]s for the log, and tokens back
//! to injectable [`rdev::Key`]s for replay. All lookups go through the fixed
//! tables below; nothing is parsed by ad-hoc string matching.

use crate::error::{Error, ErrorCode, Result};
use crate::modifiers::{Modifier, ModifierSet};
use rdev::{Button, Key};
use serde::{Deserialize, Serialize};
use std::fmt;

const NAMED_PREFIX: &str = "Key.";
const BUTTON_PREFIX: &str = "Button.";

macro_rules! named_keys {
    ($($variant:ident => $name:literal, $key:ident;)*) => {
        /// Non-printable keys that carry a stable name
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum NamedKey {
            $($variant),*
        }

        const NAMED_KEYS: &[(NamedKey, &str, Key)] = &[
            $((NamedKey::$variant, $name, Key::$key)),*
        ];
    };
}

named_keys! {
    Alt => "alt", Alt;
    AltGr => "alt_gr", AltGr;
    Backspace => "backspace", Backspace;
    CapsLock => "caps_lock", CapsLock;
    CtrlLeft => "ctrl_l", ControlLeft;
    CtrlRight => "ctrl_r", ControlRight;
    CmdLeft => "cmd", MetaLeft;
    CmdRight => "cmd_r", MetaRight;
    ShiftLeft => "shift", ShiftLeft;
    ShiftRight => "shift_r", ShiftRight;
    Delete => "delete", Delete;
    Insert => "insert", Insert;
    Home => "home", Home;
    End => "end", End;
    PageUp => "page_up", PageUp;
    PageDown => "page_down", PageDown;
    Up => "up", UpArrow;
    Down => "down", DownArrow;
    Left => "left", LeftArrow;
    Right => "right", RightArrow;
    Enter => "enter", Return;
    KpEnter => "kp_enter", KpReturn;
    Esc => "esc", Escape;
    Space => "space", Space;
    Tab => "tab", Tab;
    PrintScreen => "print_screen", PrintScreen;
    ScrollLock => "scroll_lock", ScrollLock;
    Pause => "pause", Pause;
    NumLock => "num_lock", NumLock;
    Fn => "fn", Function;
    F1 => "f1", F1;
    F2 => "f2", F2;
    F3 => "f3", F3;
    F4 => "f4", F4;
    F5 => "f5", F5;
    F6 => "f6", F6;
    F7 => "f7", F7;
    F8 => "f8", F8;
    F9 => "f9", F9;
    F10 => "f10", F10;
    F11 => "f11", F11;
    F12 => "f12", F12;
}

impl NamedKey {
    pub fn name(self) -> &'static str {
        NAMED_KEYS
            .iter()
            .find(|(k, _, _)| *k == self)
            .map(|(_, name, _)| *name)
            .unwrap_or("unknown")
    }

    pub fn from_name(name: &str) -> Option<Self> {
        NAMED_KEYS.iter().find(|(_, n, _)| *n == name).map(|(k, _, _)| *k)
    }

    pub fn from_rdev(key: Key) -> Option<Self> {
        NAMED_KEYS.iter().find(|(_, _, rk)| *rk == key).map(|(k, _, _)| *k)
    }

    pub fn to_rdev(self) -> Option<Key> {
        NAMED_KEYS.iter().find(|(k, _, _)| *k == self).map(|(_, _, rk)| *rk)
    }
}

/// Canonical names for every ASCII control character, with the physical key
/// that produces it (the modifier part travels in the event's modifier set).
const CONTROL_CHARS: [(char, &str, Key); 33] = [
    ('\u{00}', "Ctrl+@", Key::Num2),
    ('\u{01}', "Ctrl+A", Key::KeyA),
    ('\u{02}', "Ctrl+B", Key::KeyB),
    ('\u{03}', "Ctrl+C", Key::KeyC),
    ('\u{04}', "Ctrl+D", Key::KeyD),
    ('\u{05}', "Ctrl+E", Key::KeyE),
    ('\u{06}', "Ctrl+F", Key::KeyF),
    ('\u{07}', "Ctrl+G", Key::KeyG),
    ('\u{08}', "Backspace", Key::Backspace),
    ('\u{09}', "Tab", Key::Tab),
    ('\u{0a}', "Ctrl+J", Key::KeyJ),
    ('\u{0b}', "Ctrl+K", Key::KeyK),
    ('\u{0c}', "Ctrl+L", Key::KeyL),
    ('\u{0d}', "Enter", Key::Return),
    ('\u{0e}', "Ctrl+N", Key::KeyN),
    ('\u{0f}', "Ctrl+O", Key::KeyO),
    ('\u{10}', "Ctrl+P", Key::KeyP),
    ('\u{11}', "Ctrl+Q", Key::KeyQ),
    ('\u{12}', "Ctrl+R", Key::KeyR),
    ('\u{13}', "Ctrl+S", Key::KeyS),
    ('\u{14}', "Ctrl+T", Key::KeyT),
    ('\u{15}', "Ctrl+U", Key::KeyU),
    ('\u{16}', "Ctrl+V", Key::KeyV),
    ('\u{17}', "Ctrl+W", Key::KeyW),
    ('\u{18}', "Ctrl+X", Key::KeyX),
    ('\u{19}', "Ctrl+Y", Key::KeyY),
    ('\u{1a}', "Ctrl+Z", Key::KeyZ),
    ('\u{1b}', "Esc", Key::Escape),
    ('\u{1c}', "Ctrl+\\", Key::BackSlash),
    ('\u{1d}', "Ctrl+]", Key::RightBracket),
    ('\u{1e}', "Ctrl+6", Key::Num6),
    ('\u{1f}', "Ctrl+/", Key::Slash),
    ('\u{7f}', "Del", Key::Backspace),
];

/// US layout, unshifted
const CHAR_KEYS: &[(char, Key)] = &[
    ('a', Key::KeyA), ('b', Key::KeyB), ('c', Key::KeyC), ('d', Key::KeyD),
    ('e', Key::KeyE), ('f', Key::KeyF), ('g', Key::KeyG), ('h', Key::KeyH),
    ('i', Key::KeyI), ('j', Key::KeyJ), ('k', Key::KeyK), ('l', Key::KeyL),
    ('m', Key::KeyM), ('n', Key::KeyN), ('o', Key::KeyO), ('p', Key::KeyP),
    ('q', Key::KeyQ), ('r', Key::KeyR), ('s', Key::KeyS), ('t', Key::KeyT),
    ('u', Key::KeyU), ('v', Key::KeyV), ('w', Key::KeyW), ('x', Key::KeyX),
    ('y', Key::KeyY), ('z', Key::KeyZ),
    ('0', Key::Num0), ('1', Key::Num1), ('2', Key::Num2), ('3', Key::Num3),
    ('4', Key::Num4), ('5', Key::Num5), ('6', Key::Num6), ('7', Key::Num7),
    ('8', Key::Num8), ('9', Key::Num9),
    ('`', Key::BackQuote), ('-', Key::Minus), ('=', Key::Equal),
    ('[', Key::LeftBracket), (']', Key::RightBracket), ('\\', Key::BackSlash),
    (';', Key::SemiColon), ('\'', Key::Quote), (',', Key::Comma),
    ('.', Key::Dot), ('/', Key::Slash), (' ', Key::Space),
];

/// Shifted symbol -> the unshifted character on the same key
const SHIFTED: &[(char, char)] = &[
    ('~', '`'), ('!', '1'), ('@', '2'), ('#', '3'), ('$', '4'), ('%', '5'),
    ('^', '6'), ('&', '7'), ('*', '8'), ('(', '9'), (')', '0'), ('_', '-'),
    ('+', '='), ('{', '['), ('}', ']'), ('|', '\\'), (':', ';'), ('"', '\''),
    ('<', ','), ('>', '.'), ('?', '/'),
];

pub fn is_control_char(c: char) -> bool {
    c.is_ascii_control()
}

/// Canonical name of a control character, `None` outside 0x00-0x1F and 0x7F
pub fn control_name(c: char) -> Option<&'static str> {
    CONTROL_CHARS.iter().find(|(cc, _, _)| *cc == c).map(|(_, name, _)| *name)
}

/// Inverse of [`control_name`]
pub fn control_from_name(name: &str) -> Option<char> {
    CONTROL_CHARS.iter().find(|(_, n, _)| *n == name).map(|(c, _, _)| *c)
}

/// A recorded key identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum KeyToken {
    /// Printable character
    Char(char),
    /// ASCII control character, see [`control_name`]
    Control(char),
    Named(NamedKey),
    /// Anything the tables do not know, kept verbatim
    Unknown(String),
}

impl KeyToken {
    /// Parse the wire form written by [`KeyToken::wire`]
    pub fn parse(s: &str) -> Option<Self> {
        if let Some(name) = s.strip_prefix(NAMED_PREFIX) {
            return Some(match NamedKey::from_name(name) {
                Some(k) => Self::Named(k),
                None => Self::Unknown(s.to_string()),
            });
        }
        let mut chars = s.chars();
        match (chars.next(), chars.next()) {
            (None, _) => None,
            (Some(c), None) if is_control_char(c) => Some(Self::Control(c)),
            (Some(c), None) => Some(Self::Char(c)),
            _ => Some(Self::Unknown(s.to_string())),
        }
    }

    pub fn wire(&self) -> String {
        match self {
            Self::Char(c) | Self::Control(c) => c.to_string(),
            Self::Named(k) => format!("{}{}", NAMED_PREFIX, k.name()),
            Self::Unknown(s) => s.clone(),
        }
    }

    /// Human-readable name of the key alone
    pub fn display_name(&self) -> String {
        match self {
            Self::Char(c) => c.to_string(),
            Self::Control(c) => control_name(*c).unwrap_or("Ctrl+?").to_string(),
            Self::Named(k) => k.name().to_string(),
            Self::Unknown(s) => s.clone(),
        }
    }

    /// `ctrl+shift+a` style label. Control characters already name their chord.
    pub fn display_with(&self, modifiers: &ModifierSet) -> String {
        if matches!(self, Self::Control(_)) || modifiers.is_empty() {
            return self.display_name();
        }
        let mut parts: Vec<&str> = modifiers.iter().map(|m| m.as_str()).collect();
        let name = self.display_name();
        parts.push(&name);
        parts.join("+")
    }
}

impl fmt::Display for KeyToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_name())
    }
}

impl From<KeyToken> for String {
    fn from(token: KeyToken) -> Self {
        token.wire()
    }
}

impl TryFrom<String> for KeyToken {
    type Error = String;

    fn try_from(s: String) -> std::result::Result<Self, Self::Error> {
        Self::parse(&s).ok_or_else(|| "empty key".to_string())
    }
}

/// Turn a raw key signal into a token.
///
/// `text` is the character the OS produced for the key press, if any.
pub fn canonicalize(key: Key, text: Option<&str>) -> KeyToken {
    if let Some(named) = NamedKey::from_rdev(key) {
        return KeyToken::Named(named);
    }
    if let Some(c) = text.and_then(single_char) {
        return if is_control_char(c) {
            KeyToken::Control(c)
        } else {
            KeyToken::Char(c)
        };
    }
    if let Some(c) = char_for_key(key) {
        return KeyToken::Char(c);
    }
    KeyToken::Unknown(format!("{}{:?}", NAMED_PREFIX, key))
}

fn single_char(s: &str) -> Option<char> {
    let mut chars = s.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Some(c),
        _ => None,
    }
}

fn char_for_key(key: Key) -> Option<char> {
    CHAR_KEYS.iter().find(|(_, k)| *k == key).map(|(c, _)| *c)
}

/// Injectable key for a token
pub fn resolve(token: &KeyToken) -> Result<Key> {
    match token {
        KeyToken::Char(c) => {
            let lower = c.to_ascii_lowercase();
            let base = SHIFTED
                .iter()
                .find(|(s, _)| *s == lower)
                .map(|(_, b)| *b)
                .unwrap_or(lower);
            CHAR_KEYS
                .iter()
                .find(|(ch, _)| *ch == base)
                .map(|(_, k)| *k)
                .ok_or_else(|| Error::unresolvable_key(&token.wire()))
        }
        KeyToken::Control(c) => CONTROL_CHARS
            .iter()
            .find(|(cc, _, _)| cc == c)
            .map(|(_, _, k)| *k)
            .ok_or_else(|| Error::unresolvable_key(&token.wire())),
        KeyToken::Named(k) => k.to_rdev().ok_or_else(|| Error::unresolvable_key(&token.wire())),
        KeyToken::Unknown(s) => Err(Error::unresolvable_key(s)),
    }
}

/// Key used to replay a held modifier
pub fn modifier_key(modifier: Modifier) -> Key {
    match modifier {
        Modifier::Alt => Key::Alt,
        Modifier::Cmd => Key::MetaLeft,
        Modifier::Ctrl => Key::ControlLeft,
        Modifier::Shift => Key::ShiftLeft,
    }
}

/// What replay presses for a token: a physical key, or a character typed
/// directly when the layout table has no key for it
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Keystroke {
    Key(Key),
    Char(char),
}

/// Like [`resolve`], but printable characters outside the layout table fall
/// back to [`Keystroke::Char`]
pub fn resolve_stroke(token: &KeyToken) -> Result<Keystroke> {
    match (resolve(token), token) {
        (Ok(key), _) => Ok(Keystroke::Key(key)),
        (Err(_), KeyToken::Char(c)) if !c.is_control() => Ok(Keystroke::Char(*c)),
        (Err(e), _) => Err(e),
    }
}

/// Check the lookup tables are bijective where they need to be
pub fn validate_tables() -> Result<()> {
    check_named(NAMED_KEYS)?;
    check_controls(&CONTROL_CHARS)
}

fn check_named(table: &[(NamedKey, &str, Key)]) -> Result<()> {
    for (i, (key, name, rk)) in table.iter().enumerate() {
        for (other, other_name, other_rk) in &table[i + 1..] {
            if key == other || name == other_name || rk == other_rk {
                return Err(Error::new(
                    ErrorCode::Unknown,
                    format!("Duplicate named key entry: {}", name),
                ));
            }
        }
    }
    Ok(())
}

fn check_controls(table: &[(char, &str, Key)]) -> Result<()> {
    let expected: Vec<char> = (0u8..=0x1f).chain(std::iter::once(0x7f)).map(char::from).collect();
    if table.len() != expected.len() {
        return Err(Error::new(
            ErrorCode::Unknown,
            format!("Control table has {} entries, expected {}", table.len(), expected.len()),
        ));
    }
    for ((c, name, _), want) in table.iter().zip(expected) {
        let by_name = table.iter().find(|(_, n, _)| n == name).map(|(c, _, _)| *c);
        if *c != want || by_name != Some(*c) {
            return Err(Error::new(
                ErrorCode::Unknown,
                format!("Control table broken at {:?} ({})", want, name),
            ));
        }
    }
    Ok(())
}

/// Mouse button identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum MouseButton {
    Left,
    Right,
    Middle,
    Extra(u8),
    Unknown(String),
}

impl MouseButton {
    pub fn from_rdev(button: Button) -> Self {
        match button {
            Button::Left => Self::Left,
            Button::Right => Self::Right,
            Button::Middle => Self::Middle,
            Button::Unknown(n) => Self::Extra(n),
        }
    }

    pub fn resolve(&self) -> Result<Button> {
        match self {
            Self::Left => Ok(Button::Left),
            Self::Right => Ok(Button::Right),
            Self::Middle => Ok(Button::Middle),
            Self::Extra(n) => Ok(Button::Unknown(*n)),
            Self::Unknown(s) => Err(Error::unresolvable_button(s)),
        }
    }

    pub fn wire(&self) -> String {
        match self {
            Self::Left => format!("{}left", BUTTON_PREFIX),
            Self::Right => format!("{}right", BUTTON_PREFIX),
            Self::Middle => format!("{}middle", BUTTON_PREFIX),
            Self::Extra(n) => format!("{}button{}", BUTTON_PREFIX, n),
            Self::Unknown(s) => s.clone(),
        }
    }

    pub fn parse(s: &str) -> Self {
        let name = s.strip_prefix(BUTTON_PREFIX).unwrap_or(s);
        match name {
            "left" => Self::Left,
            "right" => Self::Right,
            "middle" => Self::Middle,
            _ => name
                .strip_prefix("button")
                .and_then(|n| n.parse().ok())
                .map(Self::Extra)
                .unwrap_or_else(|| Self::Unknown(s.to_string())),
        }
    }
}

impl fmt::Display for MouseButton {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.wire())
    }
}

impl From<MouseButton> for String {
    fn from(b: MouseButton) -> Self {
        b.wire()
    }
}

impl From<String> for MouseButton {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}
