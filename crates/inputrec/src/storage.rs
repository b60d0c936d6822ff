//! Recording storage - one pretty-printed JSON file per session

use crate::error::{Error, Result};
use crate::events::{InputEvent, RecordingFile};
use chrono::{DateTime, Local, Utc};
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

const PREFIX: &str = "recording_";
const EXT: &str = "json";

#[derive(Debug, Clone)]
pub struct RecordingStore {
    dir: PathBuf,
}

impl RecordingStore {
    /// Store under `$HOME/.inputrec`
    pub fn new() -> Result<Self> {
        let home = std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .map_err(|_| Error::from(io::Error::new(ErrorKind::NotFound, "HOME not set")))?;
        Self::with_dir(PathBuf::from(home).join(".inputrec"))
    }

    pub fn with_dir(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// Write a session, named after its capture start: `recording_YYYYMMDD_HHMMSS.json`
    pub fn save(&self, recording: &RecordingFile) -> Result<PathBuf> {
        let stem = format!("{}{}", PREFIX, capture_stamp(recording.start_time));

        // Two sessions inside the same second get a numeric suffix
        let (path, file) = (0u32..)
            .map(|n| match n {
                0 => self.dir.join(format!("{}.{}", stem, EXT)),
                n => self.dir.join(format!("{}_{}.{}", stem, n, EXT)),
            })
            .find_map(|path| {
                match OpenOptions::new().write(true).create_new(true).open(&path) {
                    Ok(file) => Some(Ok((path, file))),
                    Err(e) if e.kind() == ErrorKind::AlreadyExists => None,
                    Err(e) => Some(Err(e)),
                }
            })
            .unwrap_or_else(|| Err(io::Error::new(ErrorKind::Other, "no free file name")))?;

        let mut w = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut w, recording)
            .map_err(|e| Error::from(io::Error::from(e)))?;
        writeln!(w)?;
        w.flush()?;

        tracing::debug!(path = %path.display(), events = recording.events.len(), "recording written");
        Ok(path)
    }

    /// Load a whole recording. Any structural problem rejects the file.
    pub fn load_recording(&self, id: &str) -> Result<RecordingFile> {
        let path = self.resolve(id);
        let file = File::open(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => Error::recording_not_found(&path),
            _ => Error::from(e),
        })?;
        serde_json::from_reader(BufReader::new(file)).map_err(|e| {
            tracing::warn!(path = %path.display(), error = %e, "rejecting recording");
            if e.is_io() {
                Error::from(io::Error::from(e))
            } else {
                Error::corrupt_recording(&path, e)
            }
        })
    }

    /// Events of a recording, in capture order
    pub fn load(&self, id: &str) -> Result<Vec<InputEvent>> {
        Ok(self.load_recording(id)?.events)
    }

    /// File names of all recordings, oldest first
    pub fn list(&self) -> Result<Vec<String>> {
        let mut files = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let name = entry.file_name();
            if let Some(s) = name.to_str() {
                if s.starts_with(PREFIX) && s.ends_with(&format!(".{}", EXT)) {
                    files.push(s.to_string());
                }
            }
        }
        files.sort();
        Ok(files)
    }

    pub fn delete(&self, id: &str) -> Result<()> {
        let path = self.resolve(id);
        fs::remove_file(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => Error::recording_not_found(&path),
            _ => Error::from(e),
        })
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }

    /// Bare file names live in the store; anything with a directory part is used as given
    fn resolve(&self, id: &str) -> PathBuf {
        let p = Path::new(id);
        if p.components().count() > 1 || p.is_absolute() {
            p.to_path_buf()
        } else {
            self.dir.join(p)
        }
    }
}

/// Local `YYYYMMDD_HHMMSS` for a unix timestamp in seconds
pub fn capture_stamp(start_time: f64) -> String {
    let secs = start_time.floor() as i64;
    let nanos = ((start_time - start_time.floor()) * 1e9) as u32;
    DateTime::<Utc>::from_timestamp(secs, nanos)
        .unwrap_or_else(Utc::now)
        .with_timezone(&Local)
        .format("%Y%m%d_%H%M%S")
        .to_string()
}
