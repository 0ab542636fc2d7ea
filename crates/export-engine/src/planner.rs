//! Turns registry state into a deterministic list of export jobs.
//!
//! Jobs are emitted entry by entry, in registry order, and within an entry
//! in a fixed order: cropped still, uncropped still, cropped video,
//! uncropped video. With a prefix every emitted job takes the next value of
//! one batch-wide counter, so output names sort in emission order.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use hunyclip_clip_model::{even_floor, ClipEntry, ClipRegistry, CropRegion, FrameSize};

use crate::backend::TranscodeRequest;
use crate::error::ExportError;
use crate::frame_source::{FrameSource, VideoInfo};

/// Sub-folder of the clip folder receiving cropped outputs.
pub const CROPPED_DIR: &str = "cropped";

/// Sub-folder of the clip folder receiving uncropped outputs.
pub const UNCROPPED_DIR: &str = "uncropped";

/// Which outputs to produce.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportToggles {
    pub cropped: bool,
    pub uncropped: bool,
    pub image: bool,

    /// Batch naming prefix. Empty or `None` keeps clip names.
    pub prefix: Option<String>,

    /// Text written next to every output. Empty or `None` writes nothing.
    pub caption: Option<String>,

    /// Still-image extension, without the dot.
    pub still_extension: String,
}

impl ExportToggles {
    pub fn new(cropped: bool, uncropped: bool, image: bool) -> Self {
        Self {
            cropped,
            uncropped,
            image,
            prefix: None,
            caption: None,
            still_extension: "png".to_string(),
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    pub fn with_caption(mut self, caption: impl Into<String>) -> Self {
        self.caption = Some(caption.into());
        self
    }

    fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref().map(str::trim).filter(|p| !p.is_empty())
    }

    fn caption(&self) -> Option<&str> {
        self.caption.as_deref().filter(|c| !c.trim().is_empty())
    }

    /// Neither video toggle is set: stills fall back to both variants.
    fn no_video(&self) -> bool {
        !self.cropped && !self.uncropped
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobKind {
    CroppedVideo,
    UncroppedVideo,
    StillImage,
}

impl std::fmt::Display for JobKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(match self {
            Self::CroppedVideo => "cropped_video",
            Self::UncroppedVideo => "uncropped_video",
            Self::StillImage => "still_image",
        })
    }
}

/// One planned output.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportJob {
    pub display_name: String,
    pub kind: JobKind,
    pub source_path: PathBuf,
    pub output_path: PathBuf,

    /// Region to cut out. For cropped videos both dimensions are even.
    pub crop: Option<CropRegion>,

    pub trim_start: u64,
    pub trim_length: u32,
    pub source_fps: f64,
    pub target_fps: u32,

    /// Even longest edge the output was fitted to (cropped videos only).
    pub longest_edge: Option<u32>,

    /// Final video size, even in both dimensions. `None` for stills.
    pub output_size: Option<FrameSize>,

    pub caption: Option<String>,
}

impl ExportJob {
    pub fn is_video(&self) -> bool {
        self.kind != JobKind::StillImage
    }

    /// Where the caption for this output goes.
    pub fn sidecar_path(&self) -> PathBuf {
        self.output_path.with_extension("txt")
    }

    /// Backend request for a video job. `None` for stills.
    pub fn to_request(&self) -> Option<TranscodeRequest> {
        if !self.is_video() {
            return None;
        }
        let scale = match (self.crop, self.output_size) {
            (Some(crop), Some(size)) if crop.size() == size => None,
            (_, size) => size,
        };
        Some(TranscodeRequest {
            input: self.source_path.clone(),
            output: self.output_path.clone(),
            trim_start: self.trim_start,
            trim_length: self.trim_length,
            source_fps: self.source_fps,
            crop: self.crop,
            scale,
            target_fps: self.target_fps,
        })
    }
}

/// The planner's result: jobs to run and entries that produced no jobs (or
/// fewer than requested), with the reason.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExportPlan {
    pub jobs: Vec<ExportJob>,
    pub skipped: Vec<ExportError>,
}

impl ExportPlan {
    /// Output folders the jobs write into, in first-use order.
    pub fn output_dirs(&self) -> Vec<PathBuf> {
        let mut dirs: Vec<PathBuf> = Vec::new();
        for job in &self.jobs {
            if let Some(parent) = job.output_path.parent() {
                if !dirs.iter().any(|d| d == parent) {
                    dirs.push(parent.to_path_buf());
                }
            }
        }
        dirs
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty() && self.skipped.is_empty()
    }
}

/// Build the export jobs for every enabled entry of `registry`.
///
/// `source` is opened once per entry to read frame count, frame rate and
/// size; the handle is closed again before the next entry. Problems with
/// one entry are recorded in [`ExportPlan::skipped`] and never stop the
/// others.
pub fn plan(registry: &ClipRegistry, toggles: &ExportToggles, source: &dyn FrameSource) -> ExportPlan {
    let mut result = ExportPlan::default();
    let Some(folder) = registry.folder() else {
        return result;
    };
    let mut planner = EntryPlanner {
        folder,
        toggles,
        trim_length: registry.trim_length(),
        longest_edge: even_floor(registry.longest_edge()).max(2),
        counter: 0,
        claimed: HashSet::new(),
    };

    for entry in registry.enabled_entries() {
        let info = match source.open(&entry.source_path) {
            Ok(handle) => handle.info(),
            Err(e) => {
                let err = ExportError::SourceUnavailable {
                    display_name: entry.display_name.clone(),
                    path: entry.source_path.clone(),
                    detail: e.to_string(),
                };
                tracing::warn!(display_name = %entry.display_name, error = %err, "Entry skipped");
                result.skipped.push(err);
                continue;
            }
        };

        let trim_start = registry.trim_or_default(&entry.display_name, info.frame_count);
        let crop = registry.crop(&entry.display_name);
        planner.plan_entry(entry, &info, trim_start, crop, &mut result);
    }

    tracing::info!(
        jobs = result.jobs.len(),
        skipped = result.skipped.len(),
        prefix = toggles.prefix().unwrap_or(""),
        "Export planned"
    );
    result
}

struct EntryPlanner<'a> {
    folder: &'a Path,
    toggles: &'a ExportToggles,
    trim_length: u32,
    longest_edge: u32,
    counter: u32,
    claimed: HashSet<PathBuf>,
}

impl EntryPlanner<'_> {
    fn plan_entry(
        &mut self,
        entry: &ClipEntry,
        info: &VideoInfo,
        trim_start: u64,
        crop: Option<CropRegion>,
        result: &mut ExportPlan,
    ) {
        let name = &entry.display_name;
        if trim_start >= info.frame_count {
            let err = ExportError::TrimOutOfRange {
                display_name: name.clone(),
                trim_start,
                frame_count: info.frame_count,
            };
            tracing::warn!(display_name = %name, error = %err, "Entry skipped");
            result.skipped.push(err);
            return;
        }

        let wants_cropped = self.toggles.cropped || self.toggles.image;
        let valid_crop = match crop {
            Some(region) => match validate_crop(name, region, info.size()) {
                Ok(region) => Some(region),
                Err(err) => {
                    if wants_cropped {
                        tracing::warn!(display_name = %name, error = %err, "Cropped outputs skipped");
                        result.skipped.push(err);
                    }
                    None
                }
            },
            None => None,
        };

        let base = Job {
            entry,
            info,
            trim_start,
            trim_length: self.trim_length,
            caption: self.toggles.caption().map(str::to_string),
        };

        let toggles = self.toggles;
        if toggles.image {
            let still_ext = Some(toggles.still_extension.as_str());
            if let Some(region) = valid_crop {
                let output = self.output_path(entry, CROPPED_DIR, true, still_ext);
                self.emit(base.still(output, Some(region)), result);
            }
            if crop.is_none() || toggles.uncropped || toggles.no_video() {
                let output = self.output_path(entry, UNCROPPED_DIR, false, still_ext);
                self.emit(base.still(output, None), result);
            }
        }

        if toggles.cropped {
            if let Some(region) = valid_crop {
                let even = region.to_even();
                let size = even.size().scaled_to_longest_edge(self.longest_edge);
                let output = self.output_path(entry, CROPPED_DIR, true, None);
                let job = base.video(
                    JobKind::CroppedVideo,
                    output,
                    Some(even),
                    Some(self.longest_edge),
                    size,
                );
                self.emit(job, result);
            }
        }

        if toggles.uncropped {
            let output = self.output_path(entry, UNCROPPED_DIR, false, None);
            let job = base.video(
                JobKind::UncroppedVideo,
                output,
                None,
                None,
                info.size().to_even(),
            );
            self.emit(job, result);
        }
    }

    /// Add `job` unless an earlier job of this plan writes the same file.
    fn emit(&mut self, job: ExportJob, result: &mut ExportPlan) {
        if self.claimed.insert(job.output_path.clone()) {
            result.jobs.push(job);
            return;
        }
        let err = ExportError::OutputCollision {
            display_name: job.display_name,
            path: job.output_path,
        };
        tracing::warn!(error = %err, "Job skipped");
        result.skipped.push(err);
    }

    /// `<dir>/<base>[_cropped]<ext>`; the base is `<prefix>_<counter>` in a
    /// prefixed batch, otherwise the display name without its extension.
    fn output_path(
        &mut self,
        entry: &ClipEntry,
        dir: &str,
        cropped: bool,
        still_extension: Option<&str>,
    ) -> PathBuf {
        let base = match self.toggles.prefix() {
            Some(prefix) => {
                self.counter += 1;
                format!("{prefix}_{:05}", self.counter)
            }
            None => entry.stem().to_string(),
        };
        let ext = match still_extension {
            Some(ext) => format!(".{ext}"),
            None if entry.extension().is_empty() => ".mp4".to_string(),
            None => entry.extension().to_string(),
        };
        let suffix = if cropped { "_cropped" } else { "" };
        self.folder.join(dir).join(format!("{base}{suffix}{ext}"))
    }
}

/// Check a stored crop against the source and make sure it survives the
/// even-dimension rounding applied to cropped videos.
fn validate_crop(display_name: &str, region: CropRegion, source: FrameSize) -> Result<CropRegion, ExportError> {
    let invalid = |violation| ExportError::InvalidRegion {
        display_name: display_name.to_string(),
        crop: region,
        source_size: source,
        violation,
    };
    region.check_bounds(source).map_err(invalid)?;
    region
        .to_even()
        .check_bounds(source)
        .map_err(invalid)?;
    Ok(region)
}

/// Fields shared by every job of one entry.
struct Job<'a> {
    entry: &'a ClipEntry,
    info: &'a VideoInfo,
    trim_start: u64,
    trim_length: u32,
    caption: Option<String>,
}

impl Job<'_> {
    fn still(&self, output_path: PathBuf, crop: Option<CropRegion>) -> ExportJob {
        ExportJob {
            display_name: self.entry.display_name.clone(),
            kind: JobKind::StillImage,
            source_path: self.entry.source_path.clone(),
            output_path,
            crop,
            trim_start: self.trim_start,
            trim_length: 1,
            source_fps: self.info.fps,
            target_fps: self.info.target_fps(),
            longest_edge: None,
            output_size: None,
            caption: self.caption.clone(),
        }
    }

    fn video(
        &self,
        kind: JobKind,
        output_path: PathBuf,
        crop: Option<CropRegion>,
        longest_edge: Option<u32>,
        output_size: FrameSize,
    ) -> ExportJob {
        ExportJob {
            display_name: self.entry.display_name.clone(),
            kind,
            source_path: self.entry.source_path.clone(),
            output_path,
            crop,
            trim_start: self.trim_start,
            trim_length: self.trim_length,
            source_fps: self.info.fps,
            target_fps: self.info.target_fps(),
            longest_edge,
            output_size: Some(output_size),
            caption: self.caption.clone(),
        }
    }
}
