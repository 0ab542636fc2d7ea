//! Session persistence.
//!
//! A session is the whole editing state of the tool: the open folder, its
//! clip list, per-folder clip lists for folders visited earlier, crop and
//! trim decisions, and the two export-wide settings. It is written as one
//! JSON document, replaced atomically on every edit.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use crate::clip::ClipEntry;
use crate::geometry::CropRegion;

/// Longest output edge used when the session does not say otherwise.
pub const DEFAULT_LONGEST_EDGE: u32 = 1024;

/// Export window length, in frames, used when the session does not say otherwise.
pub const DEFAULT_TRIM_LENGTH: u32 = 60;

/// Serializable editing state (`session_data.json`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Session {
    /// Schema version.
    pub version: String,

    /// Folder that was open when the session was saved. Empty when none.
    pub folder_path: PathBuf,

    /// Clip list of the open folder.
    #[serde(alias = "video_files")]
    pub clip_entries: Vec<ClipEntry>,

    /// Clip lists of every folder opened so far, keyed by folder path.
    pub folder_sessions: BTreeMap<PathBuf, Vec<ClipEntry>>,

    /// Crop decisions keyed by display name. `null` means no crop.
    pub crop_regions: BTreeMap<String, Option<CropRegion>>,

    /// Trim points (first exported frame) keyed by display name.
    pub trim_points: BTreeMap<String, u64>,

    /// Longest edge of scaled cropped exports, in pixels.
    pub longest_edge: u32,

    /// Export window length in frames, shared by every clip.
    pub trim_length: u32,

    /// When this document was last written (RFC 3339).
    pub saved_at: Option<String>,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            folder_path: PathBuf::new(),
            clip_entries: vec![],
            folder_sessions: BTreeMap::new(),
            crop_regions: BTreeMap::new(),
            trim_points: BTreeMap::new(),
            longest_edge: DEFAULT_LONGEST_EDGE,
            trim_length: DEFAULT_TRIM_LENGTH,
            saved_at: None,
        }
    }
}

impl Session {
    /// The open folder, if any.
    pub fn folder(&self) -> Option<&Path> {
        if self.folder_path.as_os_str().is_empty() {
            None
        } else {
            Some(&self.folder_path)
        }
    }

    /// Replace out-of-range scalars with their defaults.
    pub fn normalized(mut self) -> Self {
        if self.longest_edge < 2 {
            self.longest_edge = DEFAULT_LONGEST_EDGE;
        }
        if self.trim_length == 0 {
            self.trim_length = DEFAULT_TRIM_LENGTH;
        }
        self
    }

    /// Parse a session document.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str::<Session>(json).map(Session::normalized)
    }

    /// Serialize as pretty JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Durable storage for a [`Session`].
pub trait SessionStore: Send {
    /// Read the stored session. `Ok(None)` when nothing was stored yet.
    fn read(&self) -> Result<Option<Session>, SessionError>;

    /// Replace the stored session as a whole.
    fn write(&self, session: &Session) -> Result<(), SessionError>;

    /// Human-readable location, for logs.
    fn location(&self) -> String;
}

/// Read a session, treating absence and corruption alike as "start fresh".
pub fn load_or_default(store: &dyn SessionStore) -> Session {
    match store.read() {
        Ok(Some(session)) => session,
        Ok(None) => {
            tracing::debug!(store = %store.location(), "No stored session, starting fresh");
            Session::default()
        }
        Err(e) => {
            tracing::warn!(store = %store.location(), error = %e, "Discarding unreadable session");
            Session::default()
        }
    }
}

/// Session stored as a JSON file.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionStore for JsonFileStore {
    fn read(&self) -> Result<Option<Session>, SessionError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let json = std::fs::read_to_string(&self.path).map_err(|e| SessionError::Io {
            path: self.path.clone(),
            source: e,
        })?;
        Session::from_json(&json)
            .map(Some)
            .map_err(|e| SessionError::Parse {
                path: self.path.clone(),
                source: e,
            })
    }

    fn write(&self, session: &Session) -> Result<(), SessionError> {
        let parent = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&parent).map_err(|e| SessionError::Io {
            path: parent.clone(),
            source: e,
        })?;

        let json = session.to_json().map_err(|e| SessionError::Parse {
            path: self.path.clone(),
            source: e,
        })?;

        // Written to a sibling temp file, then renamed over the target.
        let io_err = |e| SessionError::Io {
            path: self.path.clone(),
            source: e,
        };
        let mut tmp = tempfile::NamedTempFile::new_in(&parent).map_err(io_err)?;
        tmp.write_all(json.as_bytes()).map_err(io_err)?;
        tmp.as_file().sync_all().map_err(io_err)?;
        tmp.persist(&self.path).map_err(|e| SessionError::Io {
            path: self.path.clone(),
            source: e.error,
        })?;
        Ok(())
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}

/// In-memory store holding the serialized document.
///
/// Clones share the same document.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    document: Arc<Mutex<Option<String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with raw document text (which need not be valid).
    pub fn with_document(text: impl Into<String>) -> Self {
        Self {
            document: Arc::new(Mutex::new(Some(text.into()))),
        }
    }

    /// The raw stored text, if anything was written.
    pub fn document(&self) -> Option<String> {
        self.document
            .lock()
            .map(|doc| doc.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }
}

impl SessionStore for MemoryStore {
    fn read(&self) -> Result<Option<Session>, SessionError> {
        match self.document() {
            None => Ok(None),
            Some(text) => Session::from_json(&text)
                .map(Some)
                .map_err(|e| SessionError::Parse {
                    path: PathBuf::from("<memory>"),
                    source: e,
                }),
        }
    }

    fn write(&self, session: &Session) -> Result<(), SessionError> {
        let json = session.to_json().map_err(|e| SessionError::Parse {
            path: PathBuf::from("<memory>"),
            source: e,
        })?;
        let mut doc = self
            .document
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *doc = Some(json);
        Ok(())
    }

    fn location(&self) -> String {
        "<memory>".to_string()
    }
}

/// Errors raised by session storage.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Parse error in {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Session as written by the first desktop version of the tool.
    const LEGACY_SESSION: &str = r#"{
        "folder_path": "/data/clips",
        "video_files": [
            {"original_path": "/data/clips/a.mp4", "display_name": "a.mp4", "copy_number": 0, "export_enabled": true},
            {"original_path": "/data/clips/a.mp4", "display_name": "a_1.mp4", "copy_number": 1, "export_enabled": false}
        ],
        "folder_sessions": {
            "/data/clips": [
                {"original_path": "/data/clips/a.mp4", "display_name": "a.mp4", "copy_number": 0, "export_enabled": true}
            ]
        },
        "crop_regions": {"a.mp4": [10, 20, 300, 200], "a_1.mp4": null},
        "trim_points": {"a.mp4": 45, "a_1.mp4": 0},
        "longest_edge": 768,
        "trim_length": 90
    }"#;

    #[test]
    fn test_legacy_session_loads() {
        let session = Session::from_json(LEGACY_SESSION).unwrap();
        assert_eq!(session.folder(), Some(Path::new("/data/clips")));
        assert_eq!(session.clip_entries.len(), 2);
        assert_eq!(session.clip_entries[1].copy_number, 1);
        assert_eq!(
            session.crop_regions["a.mp4"],
            Some(CropRegion::new(10, 20, 300, 200))
        );
        assert_eq!(session.crop_regions["a_1.mp4"], None);
        assert_eq!(session.trim_points["a.mp4"], 45);
        assert_eq!(session.longest_edge, 768);
        assert_eq!(session.trim_length, 90);
        assert_eq!(session.version, "1.0");
    }

    #[test]
    fn test_missing_scalars_use_defaults() {
        let session = Session::from_json(r#"{"folder_path": ""}"#).unwrap();
        assert_eq!(session.folder(), None);
        assert_eq!(session.longest_edge, DEFAULT_LONGEST_EDGE);
        assert_eq!(session.trim_length, DEFAULT_TRIM_LENGTH);

        let session = Session::from_json(r#"{"longest_edge": 0, "trim_length": 0}"#).unwrap();
        assert_eq!(session.longest_edge, DEFAULT_LONGEST_EDGE);
        assert_eq!(session.trim_length, DEFAULT_TRIM_LENGTH);
    }

    #[test]
    fn test_file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("state").join("session_data.json"));
        assert!(store.read().unwrap().is_none());

        let mut session = Session::from_json(LEGACY_SESSION).unwrap();
        session.saved_at = Some("2026-01-01T00:00:00Z".to_string());
        store.write(&session).unwrap();

        let loaded = store.read().unwrap().unwrap();
        assert_eq!(loaded, session);

        // Rewrites replace the whole document.
        store.write(&Session::default()).unwrap();
        assert_eq!(store.read().unwrap().unwrap(), Session::default());
    }

    #[test]
    fn test_corrupt_file_falls_back_to_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session_data.json");
        std::fs::write(&path, "{\"trim_length\": \"sixty\"").unwrap();

        let store = JsonFileStore::new(&path);
        assert!(matches!(store.read(), Err(SessionError::Parse { .. })));
        assert_eq!(load_or_default(&store), Session::default());
    }

    #[test]
    fn test_memory_store_shares_document_between_clones() {
        let store = MemoryStore::new();
        let other = store.clone();
        store.write(&Session::default()).unwrap();
        assert!(other.document().is_some());
        assert_eq!(other.read().unwrap(), Some(Session::default()));

        let garbage = MemoryStore::with_document("not json");
        assert_eq!(load_or_default(&garbage), Session::default());
    }
}
