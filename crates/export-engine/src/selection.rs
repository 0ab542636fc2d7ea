//! The active clip: the one entry whose video is open for previewing,
//! scrubbing and drawing a crop.

use hunyclip_clip_model::{
    ClipRegistry, CoordinateMapper, CropRegion, Drag, MappingRejected, PreviewRect, PreviewSize,
    RegistryError,
};
use hunyclip_common::HunyclipError;

use crate::frame_source::{Frame, FrameHandle, FrameSource, VideoInfo};

struct ActiveClip {
    display_name: String,
    handle: Box<dyn FrameHandle>,
    info: VideoInfo,
    position: u64,
}

/// Holds at most one open frame-source handle. Selecting another clip
/// closes the previous handle before the next one is opened.
pub struct ClipSelection {
    source: Box<dyn FrameSource>,
    active: Option<ActiveClip>,
}

impl ClipSelection {
    pub fn new(source: Box<dyn FrameSource>) -> Self {
        Self {
            source,
            active: None,
        }
    }

    /// Display name of the active clip.
    pub fn active(&self) -> Option<&str> {
        self.active.as_ref().map(|a| a.display_name.as_str())
    }

    pub fn info(&self) -> Option<VideoInfo> {
        self.active.as_ref().map(|a| a.info)
    }

    /// Current trim position of the active clip.
    pub fn position(&self) -> Option<u64> {
        self.active.as_ref().map(|a| a.position)
    }

    /// Open `display_name` and make it the active clip.
    ///
    /// A clip without a trim point gets the middle frame as its trim.
    pub fn select(&mut self, registry: &mut ClipRegistry, display_name: &str) -> Result<VideoInfo, SelectionError> {
        self.release();

        let path = registry
            .entry(display_name)
            .map(|e| e.source_path.clone())
            .ok_or_else(|| RegistryError::unknown_clip(display_name))?;
        let mut handle = self.source.open(&path)?;
        let info = handle.info();
        if info.frame_count == 0 {
            return Err(SelectionError::EmptyClip {
                display_name: display_name.to_string(),
            });
        }

        let trim = match registry.ensure_trim_default(display_name, info.frame_count) {
            Ok(trim) => trim,
            Err(RegistryError::Storage(e)) => {
                tracing::warn!(display_name, error = %e, "Trim default not persisted");
                registry.trim_or_default(display_name, info.frame_count)
            }
            Err(e) => return Err(e.into()),
        };
        let position = trim.min(info.frame_count - 1);
        handle.seek(position)?;

        tracing::info!(
            display_name,
            frames = info.frame_count,
            fps = info.fps,
            size = %info.size(),
            trim = position,
            "Clip selected"
        );
        self.active = Some(ActiveClip {
            display_name: display_name.to_string(),
            handle,
            info,
            position,
        });
        Ok(info)
    }

    /// Move the trim point of the active clip to `frame`, clamped to the clip.
    pub fn scrub(&mut self, registry: &mut ClipRegistry, frame: u64) -> Result<u64, SelectionError> {
        let active = self.active.as_mut().ok_or(SelectionError::NoActiveClip)?;
        let frame = frame.min(active.info.frame_count.saturating_sub(1));
        active.handle.seek(frame)?;
        active.position = frame;
        registry.set_trim(&active.display_name, frame)?;
        Ok(frame)
    }

    /// Move the trim point by `delta` frames, clamped to the clip.
    pub fn step(&mut self, registry: &mut ClipRegistry, delta: i64) -> Result<u64, SelectionError> {
        let current = self.position().ok_or(SelectionError::NoActiveClip)?;
        let target = if delta < 0 {
            current.saturating_sub(delta.unsigned_abs())
        } else {
            current.saturating_add(delta as u64)
        };
        self.scrub(registry, target)
    }

    /// Turn a pointer drag on a preview of `preview` size into the active
    /// clip's crop. A drag below the minimum size is rejected and the
    /// previous crop stays.
    pub fn apply_drag(
        &mut self,
        registry: &mut ClipRegistry,
        drag: Drag,
        preview: PreviewSize,
        aspect_ratio: Option<f64>,
    ) -> Result<CropRegion, SelectionError> {
        let active = self.active.as_ref().ok_or(SelectionError::NoActiveClip)?;
        let mapper = CoordinateMapper::new(preview, active.info.size()).ok_or(SelectionError::NoPreview)?;
        let region = mapper
            .map_preview_rect_to_source(drag.rect(aspect_ratio))
            .map_err(|rejected| {
                tracing::debug!(display_name = %active.display_name, %rejected, "Drag ignored");
                rejected
            })?;
        registry.set_crop(&active.display_name, Some(region))?;
        Ok(region)
    }

    /// The active clip's crop, mapped onto a preview of `preview` size.
    pub fn preview_crop(&self, registry: &ClipRegistry, preview: PreviewSize) -> Option<PreviewRect> {
        let active = self.active.as_ref()?;
        let crop = registry.crop(&active.display_name)?;
        let mapper = CoordinateMapper::new(preview, active.info.size())?;
        Some(mapper.map_source_rect_to_preview(&crop))
    }

    /// Decode the frame at the trim point.
    pub fn current_frame(&mut self) -> Result<Frame, SelectionError> {
        let active = self.active.as_mut().ok_or(SelectionError::NoActiveClip)?;
        active.handle.seek(active.position)?;
        active
            .handle
            .read_frame()?
            .ok_or_else(|| SelectionError::FrameUnavailable {
                display_name: active.display_name.clone(),
                frame: active.position,
            })
    }

    /// Close the active clip's handle.
    pub fn release(&mut self) {
        if let Some(active) = self.active.take() {
            tracing::debug!(display_name = %active.display_name, "Clip released");
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SelectionError {
    #[error("No clip is selected")]
    NoActiveClip,

    #[error("{display_name} has no frames")]
    EmptyClip { display_name: String },

    #[error("Preview surface has no area")]
    NoPreview,

    #[error("{display_name}: no frame at index {frame}")]
    FrameUnavailable { display_name: String, frame: u64 },

    #[error(transparent)]
    Rejected(#[from] MappingRejected),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Source(#[from] HunyclipError),
}
