//! Clip entries and the rescan merge step.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// One row of the clip list.
///
/// Several entries may share a `source_path` (duplicates); the
/// `display_name` is what makes an entry unique within a folder and is the
/// key for its crop and trim state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClipEntry {
    /// Media file backing this entry.
    #[serde(alias = "original_path")]
    pub source_path: PathBuf,

    /// Registry-unique name shown to the operator.
    pub display_name: String,

    /// 0 for scanned originals, N for the Nth duplicate lineage.
    #[serde(default)]
    pub copy_number: u32,

    /// Whether the next export includes this entry.
    #[serde(default)]
    pub export_enabled: bool,
}

impl ClipEntry {
    /// Entry for a freshly scanned media file. `None` if the path has no
    /// UTF-8 file name.
    pub fn scanned(path: impl AsRef<Path>) -> Option<Self> {
        let path = path.as_ref();
        let display_name = path.file_name()?.to_str()?.to_string();
        Some(Self {
            source_path: path.to_path_buf(),
            display_name,
            copy_number: 0,
            export_enabled: false,
        })
    }

    pub fn is_duplicate(&self) -> bool {
        self.copy_number > 0
    }

    /// Display name without its extension.
    pub fn stem(&self) -> &str {
        split_display_name(&self.display_name).0
    }

    /// Extension of the display name including the dot, or `""`.
    pub fn extension(&self) -> &str {
        split_display_name(&self.display_name).1
    }
}

/// Split `clip.mp4` into `("clip", ".mp4")`.
///
/// Leading dots belong to the stem, so `.hidden` has no extension.
pub fn split_display_name(name: &str) -> (&str, &str) {
    let lead = name.len() - name.trim_start_matches('.').len();
    match name[lead..].rfind('.') {
        Some(idx) => name.split_at(lead + idx),
        None => (name, ""),
    }
}

/// Display name for copy number `copy` of `name`: `clip.mp4` -> `clip_2.mp4`.
pub fn copy_display_name(name: &str, copy: u32) -> String {
    let (stem, ext) = split_display_name(name);
    format!("{stem}_{copy}{ext}")
}

/// Reconcile a fresh folder scan with the entries known before it.
///
/// - Scanned files keep their previous entry (and so their export toggle
///   and copy number) when the display name matches.
/// - Files seen for the first time get a fresh entry.
/// - Previous duplicates are appended in their previous order; they exist
///   only in the session and must survive any rescan.
/// - Previous originals whose file disappeared are dropped.
pub fn merge_entries(previous: &[ClipEntry], scanned: Vec<ClipEntry>) -> Vec<ClipEntry> {
    let by_name: HashMap<&str, &ClipEntry> = previous
        .iter()
        .map(|entry| (entry.display_name.as_str(), entry))
        .collect();

    let mut merged: Vec<ClipEntry> = scanned
        .into_iter()
        .map(|fresh| match by_name.get(fresh.display_name.as_str()) {
            Some(known) => (*known).clone(),
            None => fresh,
        })
        .collect();

    let present: HashSet<String> = merged.iter().map(|e| e.display_name.clone()).collect();
    merged.extend(
        previous
            .iter()
            .filter(|entry| entry.is_duplicate() && !present.contains(&entry.display_name))
            .cloned(),
    );
    merged
}
