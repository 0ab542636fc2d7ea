//! Transcode backends.

use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use hunyclip_clip_model::{CropRegion, FrameSize};
use hunyclip_common::error::{HunyclipError, HunyclipResult};

use crate::frame_source::probe_video;

/// A declarative video export: which frames of `input` to take, how to
/// reshape them and where to write the result.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscodeRequest {
    pub input: PathBuf,
    pub output: PathBuf,

    /// First source frame of the window.
    pub trim_start: u64,

    /// Window length in frames.
    pub trim_length: u32,

    /// Source frame rate, used to turn frame indices into timestamps.
    pub source_fps: f64,

    /// Region to cut out before scaling, with even width and height.
    pub crop: Option<CropRegion>,

    /// Final output size, with even width and height. `None` keeps the
    /// (cropped) size.
    pub scale: Option<FrameSize>,

    /// Constant output frame rate.
    pub target_fps: u32,
}

impl TranscodeRequest {
    pub fn start_secs(&self) -> f64 {
        self.trim_start as f64 / self.source_fps
    }

    pub fn duration_secs(&self) -> f64 {
        self.trim_length as f64 / self.source_fps
    }

    /// Video filter chain: crop, then scale, then constant frame rate.
    pub fn filter_chain(&self) -> String {
        let mut filters = Vec::new();
        if let Some(c) = &self.crop {
            filters.push(format!("crop={}:{}:{}:{}", c.w, c.h, c.x, c.y));
        }
        if let Some(size) = &self.scale {
            filters.push(format!("scale={}:{}", size.width, size.height));
        }
        filters.push(format!("fps={}", self.target_fps));
        filters.join(",")
    }
}

/// Progress callback for a running transcode.
pub type ProgressCallback = Box<dyn Fn(TranscodeProgress) + Send>;

/// Transcode progress report.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscodeProgress {
    /// Current progress [0.0, 1.0].
    pub progress: f64,

    /// Frames written so far.
    pub frames_written: u64,

    /// Frames expected in the output.
    pub total_frames: u64,
}

/// Trait for transcode backends.
pub trait TranscodeBackend: Send {
    /// Execute the request. On failure the error carries the backend's
    /// diagnostic output.
    fn transcode(
        &mut self,
        request: &TranscodeRequest,
        progress: Option<&ProgressCallback>,
    ) -> HunyclipResult<()>;

    /// Frame count of a written output.
    fn probe_frame_count(&self, path: &Path) -> HunyclipResult<u64>;

    /// Check if this backend is available on the system.
    fn is_available(&self) -> bool;

    /// Backend name.
    fn name(&self) -> &str;
}

/// Encoder settings for [`FfmpegBackend`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncoderSettings {
    pub ffmpeg: String,
    pub ffprobe: String,
    pub video_codec: String,
    pub crf: u8,
}

impl Default for EncoderSettings {
    fn default() -> Self {
        Self {
            ffmpeg: "ffmpeg".to_string(),
            ffprobe: "ffprobe".to_string(),
            video_codec: "libx264".to_string(),
            crf: 18,
        }
    }
}

/// Backend driving the `ffmpeg` command-line tool.
#[derive(Debug, Clone, Default)]
pub struct FfmpegBackend {
    settings: EncoderSettings,
}

impl FfmpegBackend {
    pub fn new(settings: EncoderSettings) -> Self {
        Self { settings }
    }

    /// Full argument list for `request`.
    pub fn build_args(&self, request: &TranscodeRequest) -> Vec<String> {
        let fps = request.target_fps.to_string();
        let mut args: Vec<String> = vec![
            "-hide_banner".into(),
            "-nostdin".into(),
            "-y".into(),
            "-loglevel".into(),
            "error".into(),
            "-progress".into(),
            "pipe:1".into(),
            "-ss".into(),
            format!("{:.6}", request.start_secs()),
            "-i".into(),
            request.input.display().to_string(),
            "-t".into(),
            format!("{:.6}", request.duration_secs()),
            "-vf".into(),
            request.filter_chain(),
            "-r".into(),
            fps,
            "-map_metadata".into(),
            "-1".into(),
            "-map_chapters".into(),
            "-1".into(),
            "-c:v".into(),
            self.settings.video_codec.clone(),
        ];
        if self.settings.video_codec.starts_with("libx26") {
            args.extend(["-crf".into(), self.settings.crf.to_string()]);
        }
        args.extend([
            "-pix_fmt".into(),
            "yuv420p".into(),
            "-c:a".into(),
            "aac".into(),
            "-movflags".into(),
            "+faststart".into(),
            request.output.display().to_string(),
        ]);
        args
    }

    fn run_ffmpeg(
        &self,
        request: &TranscodeRequest,
        progress: Option<&ProgressCallback>,
    ) -> HunyclipResult<()> {
        let args = self.build_args(request);
        tracing::debug!(args = ?args, "Running ffmpeg");
        let mut cmd = Command::new(&self.settings.ffmpeg);
        cmd.args(&args).stdout(Stdio::piped()).stderr(Stdio::piped());

        let mut child = cmd
            .spawn()
            .map_err(|e| HunyclipError::transcode(format!("Failed to start ffmpeg: {e}")))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| HunyclipError::transcode("Failed to capture ffmpeg stdout"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| HunyclipError::transcode("Failed to capture ffmpeg stderr"))?;

        // Drain stderr concurrently to avoid ffmpeg blocking on a full stderr pipe.
        let stderr_task = std::thread::spawn(move || -> String {
            let mut reader = BufReader::new(stderr);
            let mut output = String::new();
            match reader.read_to_string(&mut output) {
                Ok(_) => output,
                Err(err) => format!("<failed to read ffmpeg stderr: {err}>"),
            }
        });

        let total_frames = u64::from(request.trim_length);
        let mut reader = BufReader::new(stdout);
        let mut line = String::new();
        let mut state = ProgressState::default();
        loop {
            line.clear();
            let bytes = reader
                .read_line(&mut line)
                .map_err(|e| HunyclipError::transcode(format!("Failed reading ffmpeg progress: {e}")))?;
            if bytes == 0 {
                break;
            }
            let Some((key, value)) = line.trim().split_once('=') else {
                continue;
            };
            state.update(key, value);
            if key == "progress" {
                if let Some(cb) = progress {
                    cb(state.report(total_frames));
                }
            }
        }

        let status = child
            .wait()
            .map_err(|e| HunyclipError::transcode(format!("Failed to wait on ffmpeg: {e}")))?;
        let stderr_output = stderr_task
            .join()
            .unwrap_or_else(|_| "<failed to join stderr reader>".to_string());

        if !status.success() {
            return Err(HunyclipError::transcode(format!(
                "ffmpeg exited with {status}: {}",
                stderr_output.trim()
            )));
        }
        Ok(())
    }
}

impl TranscodeBackend for FfmpegBackend {
    fn transcode(
        &mut self,
        request: &TranscodeRequest,
        progress: Option<&ProgressCallback>,
    ) -> HunyclipResult<()> {
        let started = std::time::Instant::now();
        self.run_ffmpeg(request, progress)?;
        tracing::debug!(
            output = %request.output.display(),
            elapsed_secs = started.elapsed().as_secs_f64(),
            "ffmpeg finished"
        );
        Ok(())
    }

    fn probe_frame_count(&self, path: &Path) -> HunyclipResult<u64> {
        probe_video(&self.settings.ffprobe, path).map(|info| info.frame_count)
    }

    fn is_available(&self) -> bool {
        command_exists(&self.settings.ffmpeg) && command_exists(&self.settings.ffprobe)
    }

    fn name(&self) -> &str {
        "ffmpeg"
    }
}

/// Whether `binary` resolves on `PATH` (or is an existing path).
pub fn command_exists(binary: &str) -> bool {
    if binary.contains('/') {
        return Path::new(binary).is_file();
    }
    Command::new("sh")
        .args(["-c", r#"command -v "$1""#, "sh", binary])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

#[derive(Debug, Default)]
struct ProgressState {
    frame: u64,
    complete: bool,
}

impl ProgressState {
    fn update(&mut self, key: &str, value: &str) {
        match key {
            "frame" => {
                if let Ok(frame) = value.trim().parse::<u64>() {
                    self.frame = frame;
                }
            }
            "progress" => {
                self.complete = value.trim() == "end";
            }
            _ => {}
        }
    }

    fn report(&self, total_frames: u64) -> TranscodeProgress {
        let progress = if self.complete {
            1.0
        } else if total_frames == 0 {
            0.0
        } else {
            (self.frame as f64 / total_frames as f64).clamp(0.0, 1.0)
        };
        TranscodeProgress {
            progress,
            frames_written: self.frame,
            total_frames,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> TranscodeRequest {
        TranscodeRequest {
            input: PathBuf::from("/clips/clip.mp4"),
            output: PathBuf::from("/clips/cropped/clip_cropped.mp4"),
            trim_start: 90,
            trim_length: 60,
            source_fps: 30.0,
            crop: Some(CropRegion::new(10, 20, 100, 50)),
            scale: Some(FrameSize::new(1024, 512)),
            target_fps: 30,
        }
    }

    #[test]
    fn test_window_in_seconds() {
        let req = request();
        assert!((req.start_secs() - 3.0).abs() < 1e-9);
        assert!((req.duration_secs() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_filter_chain_order() {
        let mut req = request();
        assert_eq!(req.filter_chain(), "crop=100:50:10:20,scale=1024:512,fps=30");

        req.crop = None;
        req.scale = None;
        req.target_fps = 24;
        assert_eq!(req.filter_chain(), "fps=24");
    }

    #[test]
    fn test_args_seek_before_input_and_strip_metadata() {
        let backend = FfmpegBackend::default();
        let args = backend.build_args(&request());

        let pos = |flag: &str| args.iter().position(|a| a == flag).unwrap();
        assert!(pos("-ss") < pos("-i"));
        assert_eq!(args[pos("-ss") + 1], "3.000000");
        assert_eq!(args[pos("-t") + 1], "2.000000");
        assert_eq!(args[pos("-r") + 1], "30");
        assert_eq!(args[pos("-map_metadata") + 1], "-1");
        assert_eq!(args[pos("-crf") + 1], "18");
        assert_eq!(args.last().unwrap(), "/clips/cropped/clip_cropped.mp4");
    }

    #[test]
    fn test_args_skip_crf_for_other_codecs() {
        let backend = FfmpegBackend::new(EncoderSettings {
            video_codec: "mpeg4".to_string(),
            ..EncoderSettings::default()
        });
        let args = backend.build_args(&request());
        assert!(!args.iter().any(|a| a == "-crf"));
    }

    #[test]
    fn test_progress_state() {
        let mut state = ProgressState::default();
        state.update("frame", "30");
        state.update("progress", "continue");
        assert_eq!(state.report(60).progress, 0.5);

        state.update("progress", "end");
        let report = state.report(60);
        assert_eq!(report.progress, 1.0);
        assert_eq!(report.frames_written, 30);
    }

    #[test]
    fn test_command_exists_treats_the_name_as_one_word() {
        assert!(command_exists("sh"));
        assert!(!command_exists("hunyclip-missing-binary"));
        assert!(!command_exists("hunyclip-missing-binary || true"));
        assert!(!command_exists("hunyclip-missing-binary; exit 0"));
    }
}
