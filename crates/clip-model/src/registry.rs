//! The clip registry: every clip entry of the open folder plus the per-clip
//! crop and trim state, persisted after each edit.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use crate::clip::{copy_display_name, merge_entries, ClipEntry};
use crate::geometry::CropRegion;
use crate::scan::list_media_files;
use crate::session::{load_or_default, Session, SessionError, SessionStore};

/// Extensions picked up by a folder scan when none are configured.
pub const DEFAULT_EXTENSIONS: &[&str] = &["mp4", "avi", "mov"];

/// What happens to an entry's export toggle when the operator edits it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EditPolicy {
    /// Setting a crop or a trim switches export on.
    #[default]
    AutoEnable,
    /// Export toggles change only when set explicitly.
    Manual,
}

/// Registry of clip entries and their editing state.
///
/// Crop and trim state is keyed by display name. Every mutation is applied
/// in memory first and then written through the session store; a failed
/// write is returned as [`RegistryError::Storage`] with the in-memory state
/// already updated.
pub struct ClipRegistry {
    folder: Option<PathBuf>,
    entries: Vec<ClipEntry>,
    folder_sessions: BTreeMap<PathBuf, Vec<ClipEntry>>,
    crops: BTreeMap<String, CropRegion>,
    trims: BTreeMap<String, u64>,
    longest_edge: u32,
    trim_length: u32,
    extensions: Vec<String>,
    policy: EditPolicy,
    store: Box<dyn SessionStore>,
}

impl std::fmt::Debug for ClipRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClipRegistry")
            .field("folder", &self.folder)
            .field("entries", &self.entries.len())
            .field("store", &self.store.location())
            .finish()
    }
}

impl ClipRegistry {
    /// Empty registry writing through `store`. Nothing is read yet; call
    /// [`ClipRegistry::load`] to restore the stored session.
    pub fn new(store: Box<dyn SessionStore>) -> Self {
        let defaults = Session::default();
        Self {
            folder: None,
            entries: vec![],
            folder_sessions: BTreeMap::new(),
            crops: BTreeMap::new(),
            trims: BTreeMap::new(),
            longest_edge: defaults.longest_edge,
            trim_length: defaults.trim_length,
            extensions: DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            policy: EditPolicy::default(),
            store,
        }
    }

    pub fn with_extensions(mut self, extensions: Vec<String>) -> Self {
        self.extensions = extensions;
        self
    }

    pub fn with_policy(mut self, policy: EditPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Restore the stored session.
    ///
    /// A missing or unreadable session leaves the registry empty. When the
    /// stored folder still exists its clip list is restored from the
    /// per-folder cache, or rescanned if the cache has no record of it.
    pub fn load(&mut self) {
        let session = load_or_default(self.store.as_ref());
        self.apply_session(session);

        let Some(folder) = self.folder.clone() else {
            return;
        };
        if !folder.is_dir() {
            tracing::warn!(folder = %folder.display(), "Session folder no longer exists");
            return;
        }
        if let Some(cached) = self.folder_sessions.get(&folder) {
            self.entries = cached.clone();
        } else if let Err(e) = self.scan_folder(&folder) {
            tracing::warn!(folder = %folder.display(), error = %e, "Rescan on load failed");
        }
        tracing::info!(
            folder = %folder.display(),
            clips = self.entries.len(),
            "Session restored"
        );
    }

    fn apply_session(&mut self, session: Session) {
        self.folder = session.folder().map(Path::to_path_buf);
        self.entries = session.clip_entries;
        self.folder_sessions = session.folder_sessions;
        self.crops = session
            .crop_regions
            .into_iter()
            .filter_map(|(name, crop)| crop.map(|c| (name, c)))
            .collect();
        self.trims = session.trim_points;
        self.longest_edge = session.longest_edge;
        self.trim_length = session.trim_length;
    }

    /// Snapshot of the full editing state.
    pub fn to_session(&self) -> Session {
        Session {
            folder_path: self.folder.clone().unwrap_or_default(),
            clip_entries: self.entries.clone(),
            folder_sessions: self.folder_sessions.clone(),
            crop_regions: self
                .crops
                .iter()
                .map(|(name, crop)| (name.clone(), Some(*crop)))
                .collect(),
            trim_points: self.trims.clone(),
            longest_edge: self.longest_edge,
            trim_length: self.trim_length,
            saved_at: Some(chrono::Utc::now().to_rfc3339()),
            ..Session::default()
        }
    }

    /// Write the full editing state through the session store.
    pub fn save(&self) -> Result<(), SessionError> {
        self.store.write(&self.to_session())
    }

    fn persist(&mut self) -> Result<(), RegistryError> {
        if let Some(folder) = &self.folder {
            self.folder_sessions
                .insert(folder.clone(), self.entries.clone());
        }
        self.save().map_err(|e| {
            tracing::error!(store = %self.store.location(), error = %e, "Session write failed");
            RegistryError::Storage(e)
        })
    }

    // --- Folders ---

    /// Switch to `folder`, restoring its cached clip list or scanning it.
    pub fn open_folder(&mut self, folder: impl AsRef<Path>) -> Result<&[ClipEntry], RegistryError> {
        let folder = normalize_folder(folder.as_ref());
        match self.folder_sessions.get(&folder) {
            Some(cached) if folder.is_dir() => {
                self.entries = cached.clone();
                self.folder = Some(folder);
                self.persist()?;
                Ok(&self.entries)
            }
            _ => self.scan_folder(&folder),
        }
    }

    /// Scan `folder` and merge the result with what was known about it.
    ///
    /// Known entries keep their state, new files get fresh entries and
    /// duplicates survive even though they have no file of their own.
    pub fn scan_folder(&mut self, folder: impl AsRef<Path>) -> Result<&[ClipEntry], RegistryError> {
        let folder = normalize_folder(folder.as_ref());
        let files = list_media_files(&folder, &self.extensions).map_err(|e| RegistryError::Scan {
            path: folder.clone(),
            source: e,
        })?;
        let mut scanned = Vec::with_capacity(files.len());
        for file in &files {
            match ClipEntry::scanned(file) {
                Some(entry) => scanned.push(entry),
                None => tracing::warn!(
                    path = %file.display(),
                    "Skipping clip whose file name is not valid UTF-8"
                ),
            }
        }

        let previous = match self.folder_sessions.get(&folder) {
            Some(cached) => cached.clone(),
            None if self.folder.as_ref() == Some(&folder) => self.entries.clone(),
            None => vec![],
        };
        let merged = merge_entries(&previous, scanned);
        tracing::info!(
            folder = %folder.display(),
            files = files.len(),
            clips = merged.len(),
            "Folder scanned"
        );

        self.entries = merged;
        self.folder = Some(folder);
        self.persist()?;
        Ok(&self.entries)
    }

    /// Rescan the open folder.
    pub fn rescan(&mut self) -> Result<&[ClipEntry], RegistryError> {
        let folder = self.folder.clone().ok_or(RegistryError::NoFolder)?;
        self.scan_folder(folder)
    }

    // --- Queries ---

    pub fn folder(&self) -> Option<&Path> {
        self.folder.as_deref()
    }

    pub fn entries(&self) -> &[ClipEntry] {
        &self.entries
    }

    pub fn entry(&self, display_name: &str) -> Option<&ClipEntry> {
        self.entries.iter().find(|e| e.display_name == display_name)
    }

    /// Entries whose export toggle is on, in list order.
    pub fn enabled_entries(&self) -> impl Iterator<Item = &ClipEntry> {
        self.entries.iter().filter(|e| e.export_enabled)
    }

    pub fn crop(&self, display_name: &str) -> Option<CropRegion> {
        self.crops.get(display_name).copied()
    }

    /// Stored trim point, frame 0 included.
    pub fn trim(&self, display_name: &str) -> Option<u64> {
        self.trims.get(display_name).copied()
    }

    /// Stored trim point, or the middle frame of a clip with `frame_count` frames.
    pub fn trim_or_default(&self, display_name: &str, frame_count: u64) -> u64 {
        self.trim(display_name).unwrap_or(frame_count / 2)
    }

    pub fn longest_edge(&self) -> u32 {
        self.longest_edge
    }

    pub fn trim_length(&self) -> u32 {
        self.trim_length
    }

    pub fn policy(&self) -> EditPolicy {
        self.policy
    }

    // --- Edits ---

    /// Append a copy of `display_name` under a fresh name.
    ///
    /// The copy shares the source file and takes over the original's crop,
    /// trim and export toggle. Its name is `<stem>_<N><ext>` for the first
    /// free N above the original's copy number.
    pub fn duplicate(&mut self, display_name: &str) -> Result<ClipEntry, RegistryError> {
        let original = self
            .entry(display_name)
            .cloned()
            .ok_or_else(|| RegistryError::unknown_clip(display_name))?;

        let taken = self.taken_names();
        let attempts = taken.len() + 1;
        let mut copy_number = original.copy_number + 1;
        let mut free_name = None;
        for _ in 0..attempts {
            let candidate = copy_display_name(&original.display_name, copy_number);
            if !taken.contains(candidate.as_str()) {
                free_name = Some(candidate);
                break;
            }
            copy_number += 1;
        }
        let new_name = free_name.ok_or_else(|| RegistryError::NameSpaceExhausted {
            display_name: display_name.to_string(),
            attempts,
        })?;

        let copy = ClipEntry {
            source_path: original.source_path.clone(),
            display_name: new_name.clone(),
            copy_number,
            export_enabled: original.export_enabled,
        };
        if let Some(crop) = self.crop(display_name) {
            self.crops.insert(new_name.clone(), crop);
        }
        if let Some(trim) = self.trims.get(display_name).copied() {
            self.trims.insert(new_name.clone(), trim);
        }
        self.entries.push(copy.clone());
        tracing::info!(original = display_name, copy = %new_name, "Clip duplicated");

        self.persist()?;
        Ok(copy)
    }

    /// Every name in use anywhere in the session, so that keys of the global
    /// crop and trim maps never collide across folders.
    fn taken_names(&self) -> HashSet<String> {
        self.entries
            .iter()
            .chain(self.folder_sessions.values().flatten())
            .map(|e| e.display_name.clone())
            .chain(self.crops.keys().cloned())
            .chain(self.trims.keys().cloned())
            .collect()
    }

    /// Set (`Some`) or remove (`None`) the crop of an entry.
    ///
    /// The region is stored as given; it is checked against the source
    /// frame only at export time.
    pub fn set_crop(&mut self, display_name: &str, crop: Option<CropRegion>) -> Result<(), RegistryError> {
        self.require(display_name)?;
        match crop {
            Some(region) => {
                self.crops.insert(display_name.to_string(), region);
                self.auto_enable(display_name);
                tracing::debug!(clip = display_name, crop = %region, "Crop set");
            }
            None => {
                self.crops.remove(display_name);
                tracing::debug!(clip = display_name, "Crop cleared");
            }
        }
        self.persist()
    }

    pub fn clear_crop(&mut self, display_name: &str) -> Result<(), RegistryError> {
        self.set_crop(display_name, None)
    }

    /// Store the trim point (first exported frame) of an entry.
    pub fn set_trim(&mut self, display_name: &str, frame: u64) -> Result<(), RegistryError> {
        self.require(display_name)?;
        self.trims.insert(display_name.to_string(), frame);
        self.auto_enable(display_name);
        tracing::debug!(clip = display_name, frame, "Trim set");
        self.persist()
    }

    /// Make sure the entry has a trim point, defaulting to the middle frame.
    /// A stored trim, even frame 0, is kept as it is.
    ///
    /// Does not count as an operator edit, so the export toggle is left alone.
    pub fn ensure_trim_default(&mut self, display_name: &str, frame_count: u64) -> Result<u64, RegistryError> {
        self.require(display_name)?;
        if let Some(trim) = self.trim(display_name) {
            return Ok(trim);
        }
        let trim = frame_count / 2;
        self.trims.insert(display_name.to_string(), trim);
        self.persist()?;
        Ok(trim)
    }

    pub fn set_export_enabled(&mut self, display_name: &str, enabled: bool) -> Result<(), RegistryError> {
        let entry = self.entry_mut(display_name)?;
        entry.export_enabled = enabled;
        self.persist()
    }

    pub fn set_longest_edge(&mut self, longest_edge: u32) -> Result<(), RegistryError> {
        if longest_edge < 2 {
            return Err(RegistryError::InvalidSetting {
                name: "longest_edge",
                value: longest_edge,
                reason: "must be at least 2 pixels",
            });
        }
        self.longest_edge = longest_edge;
        self.persist()
    }

    pub fn set_trim_length(&mut self, trim_length: u32) -> Result<(), RegistryError> {
        if trim_length == 0 {
            return Err(RegistryError::InvalidSetting {
                name: "trim_length",
                value: trim_length,
                reason: "must be at least 1 frame",
            });
        }
        self.trim_length = trim_length;
        self.persist()
    }

    fn require(&self, display_name: &str) -> Result<(), RegistryError> {
        match self.entry(display_name) {
            Some(_) => Ok(()),
            None => Err(RegistryError::unknown_clip(display_name)),
        }
    }

    fn entry_mut(&mut self, display_name: &str) -> Result<&mut ClipEntry, RegistryError> {
        self.entries
            .iter_mut()
            .find(|e| e.display_name == display_name)
            .ok_or_else(|| RegistryError::unknown_clip(display_name))
    }

    fn auto_enable(&mut self, display_name: &str) {
        if self.policy != EditPolicy::AutoEnable {
            return;
        }
        if let Ok(entry) = self.entry_mut(display_name) {
            entry.export_enabled = true;
        }
    }
}

fn normalize_folder(folder: &Path) -> PathBuf {
    std::fs::canonicalize(folder).unwrap_or_else(|_| folder.to_path_buf())
}

/// Errors raised by registry operations.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("No clip named {display_name:?}")]
    UnknownClip { display_name: String },

    #[error("No folder is open")]
    NoFolder,

    #[error("Cannot scan {path}: {source}")]
    Scan {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid {name} {value}: {reason}")]
    InvalidSetting {
        name: &'static str,
        value: u32,
        reason: &'static str,
    },

    #[error("No free copy name for {display_name:?} after {attempts} attempts")]
    NameSpaceExhausted { display_name: String, attempts: usize },

    #[error("Session not saved: {0}")]
    Storage(#[from] SessionError),
}

impl RegistryError {
    pub fn unknown_clip(display_name: impl Into<String>) -> Self {
        Self::UnknownClip {
            display_name: display_name.into(),
        }
    }
}
