//! inputrec - record and replay global keyboard and mouse input
//!
//! Captures a timestamped log of key, click, drag and scroll events from the
//! OS input stream, stores it as JSON, and replays it through synthetic input
//! with the original timing scaled by a speed factor.
//!
//! ## Platform Support
//!
//! Capture and injection go through rdev:
//!
//! - **macOS**: needs Accessibility and Input Monitoring permission
//! - **Linux**: X11
//! - **Windows**: low-level hooks and `SendInput`

pub mod error;
pub mod events;
pub mod gesture;
pub mod keys;
pub mod modifiers;
pub mod platform;
pub mod recorder;
pub mod replay;
pub mod storage;

pub use error::{Error, ErrorCode, Result};
pub use events::{InputEvent, Phase, RecordingFile};
pub use keys::{KeyToken, MouseButton, NamedKey};
pub use modifiers::{Modifier, ModifierSet, ModifierTracker};
pub use platform::{InputHook, InputInjector, RdevHook, RdevInjector};
pub use recorder::{Recorder, RecorderConfig, StopSignal};
pub use replay::{CancelFlag, Outcome, PlaybackConfig, PlaybackReport, Player};
pub use storage::RecordingStore;

pub mod prelude {
    pub use crate::error::{Error, ErrorCode, Result};
    pub use crate::events::*;
    pub use crate::keys::{KeyToken, MouseButton, NamedKey};
    pub use crate::modifiers::{Modifier, ModifierSet};
    pub use crate::platform::{InputHook, InputInjector, RdevHook, RdevInjector};
    pub use crate::recorder::{Recorder, RecorderConfig, StopSignal};
    pub use crate::replay::{CancelFlag, Outcome, PlaybackConfig, PlaybackReport, Player};
    pub use crate::storage::RecordingStore;
}
