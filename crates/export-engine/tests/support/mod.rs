//! In-memory collaborators for driving the planner, engine and selection
//! without ffmpeg.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use hunyclip_clip_model::{ClipRegistry, MemoryStore};
use hunyclip_common::error::{HunyclipError, HunyclipResult};
use hunyclip_export_engine::{
    Frame, FrameHandle, FrameSource, ProgressCallback, TranscodeBackend, TranscodeRequest, VideoInfo,
};

pub fn info(frame_count: u64, fps: f64, width: u32, height: u32) -> VideoInfo {
    VideoInfo {
        frame_count,
        fps,
        width,
        height,
    }
}

/// Frame source serving synthetic clips keyed by file name.
///
/// Pixel `(x, y)` of frame `n` is `[n, x, y]` (each truncated to a byte).
#[derive(Clone, Default)]
pub struct FakeSource {
    clips: Arc<Mutex<HashMap<String, VideoInfo>>>,
    unreadable: Arc<Mutex<HashSet<String>>>,
    open: Arc<AtomicUsize>,
    max_open: Arc<AtomicUsize>,
    opened: Arc<AtomicUsize>,
}

impl FakeSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_clip(self, file_name: &str, info: VideoInfo) -> Self {
        self.clips.lock().unwrap().insert(file_name.to_string(), info);
        self
    }

    /// Opens fine but never yields a frame.
    pub fn unreadable(self, file_name: &str) -> Self {
        self.unreadable.lock().unwrap().insert(file_name.to_string());
        self
    }

    /// Handles open right now.
    pub fn open_handles(&self) -> usize {
        self.open.load(Ordering::SeqCst)
    }

    /// Most handles ever open at once.
    pub fn max_open_handles(&self) -> usize {
        self.max_open.load(Ordering::SeqCst)
    }

    pub fn total_opens(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

impl FrameSource for FakeSource {
    fn open(&self, path: &Path) -> HunyclipResult<Box<dyn FrameHandle>> {
        let name = file_name(path);
        let info = self
            .clips
            .lock()
            .unwrap()
            .get(&name)
            .copied()
            .ok_or_else(|| HunyclipError::FileNotFound {
                path: path.to_path_buf(),
            })?;
        let now_open = self.open.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_open.fetch_max(now_open, Ordering::SeqCst);
        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeHandle {
            info,
            position: 0,
            readable: !self.unreadable.lock().unwrap().contains(&name),
            open: Arc::clone(&self.open),
        }))
    }
}

struct FakeHandle {
    info: VideoInfo,
    position: u64,
    readable: bool,
    open: Arc<AtomicUsize>,
}

impl Drop for FakeHandle {
    fn drop(&mut self) {
        self.open.fetch_sub(1, Ordering::SeqCst);
    }
}

impl FrameHandle for FakeHandle {
    fn info(&self) -> VideoInfo {
        self.info
    }

    fn seek(&mut self, frame: u64) -> HunyclipResult<()> {
        if frame >= self.info.frame_count {
            return Err(HunyclipError::frame_source(format!("seek past end: {frame}")));
        }
        self.position = frame;
        Ok(())
    }

    fn read_frame(&mut self) -> HunyclipResult<Option<Frame>> {
        if !self.readable || self.position >= self.info.frame_count {
            return Ok(None);
        }
        let mut pixels = Vec::with_capacity((self.info.width * self.info.height * 3) as usize);
        for y in 0..self.info.height {
            for x in 0..self.info.width {
                pixels.extend_from_slice(&[self.position as u8, x as u8, y as u8]);
            }
        }
        self.position += 1;
        Ok(Frame::new(self.info.width, self.info.height, pixels))
    }
}

/// Backend recording every request and writing a placeholder output.
#[derive(Clone, Default)]
pub struct FakeBackend {
    requests: Arc<Mutex<Vec<TranscodeRequest>>>,
    failing_inputs: Arc<Mutex<HashSet<String>>>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every request reading this file fails.
    pub fn failing_for(self, file_name: &str) -> Self {
        self.failing_inputs.lock().unwrap().insert(file_name.to_string());
        self
    }

    pub fn requests(&self) -> Vec<TranscodeRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl TranscodeBackend for FakeBackend {
    fn transcode(
        &mut self,
        request: &TranscodeRequest,
        progress: Option<&ProgressCallback>,
    ) -> HunyclipResult<()> {
        self.requests.lock().unwrap().push(request.clone());
        if self
            .failing_inputs
            .lock()
            .unwrap()
            .contains(&file_name(&request.input))
        {
            return Err(HunyclipError::transcode("Invalid data found when processing input"));
        }
        std::fs::write(&request.output, request.filter_chain())?;
        if let Some(cb) = progress {
            cb(hunyclip_export_engine::TranscodeProgress {
                progress: 1.0,
                frames_written: u64::from(request.trim_length),
                total_frames: u64::from(request.trim_length),
            });
        }
        Ok(())
    }

    fn probe_frame_count(&self, path: &Path) -> HunyclipResult<u64> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.output == path)
            .map(|r| u64::from(r.trim_length))
            .ok_or_else(|| HunyclipError::transcode("unknown output"))
    }

    fn is_available(&self) -> bool {
        true
    }

    fn name(&self) -> &str {
        "fake"
    }
}

/// A registry over a scratch folder holding empty files with these names.
pub fn registry_with(names: &[&str]) -> (tempfile::TempDir, ClipRegistry) {
    let dir = tempfile::tempdir().unwrap();
    for name in names {
        std::fs::write(dir.path().join(name), b"").unwrap();
    }
    let mut registry = ClipRegistry::new(Box::new(MemoryStore::new()));
    registry.open_folder(dir.path()).unwrap();
    (dir, registry)
}

/// Folder the registry resolved the scratch directory to.
pub fn folder_of(registry: &ClipRegistry) -> PathBuf {
    registry.folder().unwrap().to_path_buf()
}
