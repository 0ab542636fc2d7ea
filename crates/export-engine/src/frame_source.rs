//! Frame-source collaborator: opens a video, reports its stream properties
//! and decodes single frames.

use std::path::{Path, PathBuf};
use std::process::Command;

use serde::Deserialize;

use hunyclip_clip_model::{CropRegion, FrameSize};
use hunyclip_common::error::{HunyclipError, HunyclipResult};

/// Stream properties of an opened video.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VideoInfo {
    pub frame_count: u64,
    pub fps: f64,
    pub width: u32,
    pub height: u32,
}

impl VideoInfo {
    pub fn size(&self) -> FrameSize {
        FrameSize::new(self.width, self.height)
    }

    /// Output frame rate: the source rate rounded, never below 1.
    pub fn target_fps(&self) -> u32 {
        if self.fps.is_finite() && self.fps > 0.0 {
            (self.fps.round() as u32).max(1)
        } else {
            1
        }
    }
}

/// A decoded frame, tightly packed RGB24.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl Frame {
    /// `None` if `pixels` does not hold exactly `width * height` RGB pixels.
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Option<Self> {
        if pixels.len() != width as usize * height as usize * 3 {
            return None;
        }
        Some(Self {
            width,
            height,
            pixels,
        })
    }

    pub fn size(&self) -> FrameSize {
        FrameSize::new(self.width, self.height)
    }

    /// Copy out the pixels under `region`. `None` if the region does not fit.
    pub fn crop(&self, region: &CropRegion) -> Option<Frame> {
        region.check_bounds(self.size()).ok()?;
        let (x, y) = (region.x as usize, region.y as usize);
        let (w, h) = (region.w as usize, region.h as usize);
        let stride = self.width as usize * 3;

        let mut pixels = Vec::with_capacity(w * h * 3);
        for row in y..y + h {
            let start = row * stride + x * 3;
            pixels.extend_from_slice(&self.pixels[start..start + w * 3]);
        }
        Frame::new(region.w as u32, region.h as u32, pixels)
    }
}

/// Opens videos. One handle is live per active clip; dropping the handle
/// closes the underlying decoder.
pub trait FrameSource: Send {
    fn open(&self, path: &Path) -> HunyclipResult<Box<dyn FrameHandle>>;
}

/// An open video.
pub trait FrameHandle: Send {
    fn info(&self) -> VideoInfo;

    /// Position the next [`FrameHandle::read_frame`] at `frame`.
    fn seek(&mut self, frame: u64) -> HunyclipResult<()>;

    /// Decode the frame at the current position and advance by one.
    /// `Ok(None)` past the end of the stream.
    fn read_frame(&mut self) -> HunyclipResult<Option<Frame>>;
}

/// Frame source backed by the `ffprobe` and `ffmpeg` command-line tools.
#[derive(Debug, Clone)]
pub struct FfmpegFrameSource {
    ffmpeg: String,
    ffprobe: String,
}

impl Default for FfmpegFrameSource {
    fn default() -> Self {
        Self::new("ffmpeg", "ffprobe")
    }
}

impl FfmpegFrameSource {
    pub fn new(ffmpeg: impl Into<String>, ffprobe: impl Into<String>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            ffprobe: ffprobe.into(),
        }
    }
}

impl FrameSource for FfmpegFrameSource {
    fn open(&self, path: &Path) -> HunyclipResult<Box<dyn FrameHandle>> {
        if !path.exists() {
            return Err(HunyclipError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        let info = probe_video(&self.ffprobe, path)?;
        tracing::debug!(
            path = %path.display(),
            frames = info.frame_count,
            fps = info.fps,
            size = %info.size(),
            "Video opened"
        );
        Ok(Box::new(FfmpegHandle {
            ffmpeg: self.ffmpeg.clone(),
            path: path.to_path_buf(),
            info,
            position: 0,
        }))
    }
}

struct FfmpegHandle {
    ffmpeg: String,
    path: PathBuf,
    info: VideoInfo,
    position: u64,
}

impl FrameHandle for FfmpegHandle {
    fn info(&self) -> VideoInfo {
        self.info
    }

    fn seek(&mut self, frame: u64) -> HunyclipResult<()> {
        if frame >= self.info.frame_count {
            return Err(HunyclipError::frame_source(format!(
                "frame {frame} is past the end of {} ({} frames)",
                self.path.display(),
                self.info.frame_count
            )));
        }
        self.position = frame;
        Ok(())
    }

    fn read_frame(&mut self) -> HunyclipResult<Option<Frame>> {
        if self.position >= self.info.frame_count {
            return Ok(None);
        }
        let seconds = self.position as f64 / self.info.fps;
        let output = Command::new(&self.ffmpeg)
            .args(["-v", "error", "-nostdin", "-ss"])
            .arg(format!("{seconds:.6}"))
            .arg("-i")
            .arg(&self.path)
            .args(["-frames:v", "1", "-f", "rawvideo", "-pix_fmt", "rgb24", "pipe:1"])
            .output()
            .map_err(|e| HunyclipError::frame_source(format!("Failed to start ffmpeg: {e}")))?;

        if !output.status.success() {
            return Err(HunyclipError::frame_source(format!(
                "ffmpeg frame decode failed (status {}): {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        if output.stdout.is_empty() {
            return Ok(None);
        }

        let frame = Frame::new(self.info.width, self.info.height, output.stdout).ok_or_else(|| {
            HunyclipError::frame_source(format!(
                "decoded frame of {} does not match {}",
                self.path.display(),
                self.info.size()
            ))
        })?;
        self.position += 1;
        Ok(Some(frame))
    }
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    avg_frame_rate: Option<String>,
    nb_frames: Option<String>,
    nb_read_packets: Option<String>,
}

/// Probe the first video stream of `path` with `ffprobe`.
pub fn probe_video(ffprobe: &str, path: &Path) -> HunyclipResult<VideoInfo> {
    let output = Command::new(ffprobe)
        .args([
            "-v",
            "error",
            "-select_streams",
            "v:0",
            "-count_packets",
            "-show_entries",
            "stream=width,height,r_frame_rate,avg_frame_rate,nb_frames,nb_read_packets",
            "-of",
            "json",
        ])
        .arg(path)
        .output()
        .map_err(|e| HunyclipError::frame_source(format!("Failed to start {ffprobe}: {e}")))?;

    if !output.status.success() {
        return Err(HunyclipError::frame_source(format!(
            "{ffprobe} failed on {} (status {}): {}",
            path.display(),
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }
    parse_probe_output(&String::from_utf8_lossy(&output.stdout))
}

/// Turn `ffprobe -of json` output into [`VideoInfo`].
pub fn parse_probe_output(json: &str) -> HunyclipResult<VideoInfo> {
    let probe: ProbeOutput = serde_json::from_str(json)?;
    let stream = probe
        .streams
        .into_iter()
        .next()
        .ok_or_else(|| HunyclipError::frame_source("no video stream"))?;

    let (width, height) = match (stream.width, stream.height) {
        (Some(w), Some(h)) if w > 0 && h > 0 => (w, h),
        _ => return Err(HunyclipError::frame_source("video stream has no dimensions")),
    };

    let fps = [&stream.avg_frame_rate, &stream.r_frame_rate]
        .into_iter()
        .filter_map(|rate| rate.as_deref().and_then(parse_frame_rate))
        .next()
        .ok_or_else(|| HunyclipError::frame_source("video stream has no frame rate"))?;

    let frame_count = [&stream.nb_frames, &stream.nb_read_packets]
        .into_iter()
        .filter_map(|count| count.as_deref().and_then(|c| c.trim().parse::<u64>().ok()))
        .find(|&count| count > 0)
        .unwrap_or(0);

    Ok(VideoInfo {
        frame_count,
        fps,
        width,
        height,
    })
}

/// Parse an ffprobe rate such as `30000/1001` or `25`. `None` for `0/0`.
pub fn parse_frame_rate(value: &str) -> Option<f64> {
    let rate = match value.trim().split_once('/') {
        Some((num, den)) => {
            let num = num.parse::<f64>().ok()?;
            let den = den.parse::<f64>().ok()?;
            if den == 0.0 {
                return None;
            }
            num / den
        }
        None => value.trim().parse::<f64>().ok()?,
    };
    (rate.is_finite() && rate > 0.0).then_some(rate)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(width: u32, height: u32) -> Frame {
        let mut pixels = Vec::new();
        for y in 0..height {
            for x in 0..width {
                pixels.extend_from_slice(&[x as u8, y as u8, 0]);
            }
        }
        Frame::new(width, height, pixels).unwrap()
    }

    #[test]
    fn test_parse_frame_rate() {
        assert_eq!(parse_frame_rate("25"), Some(25.0));
        assert_eq!(parse_frame_rate("30/1"), Some(30.0));
        let ntsc = parse_frame_rate("30000/1001").unwrap();
        assert!((ntsc - 29.97).abs() < 0.01);
        assert_eq!(parse_frame_rate("0/0"), None);
        assert_eq!(parse_frame_rate("n/a"), None);
    }

    #[test]
    fn test_parse_probe_output() {
        let json = r#"{
            "streams": [{
                "width": 1920, "height": 1080,
                "r_frame_rate": "30000/1001", "avg_frame_rate": "0/0",
                "nb_read_packets": "300"
            }]
        }"#;
        let info = parse_probe_output(json).unwrap();
        assert_eq!(info.size(), FrameSize::new(1920, 1080));
        assert_eq!(info.frame_count, 300);
        assert_eq!(info.target_fps(), 30);
    }

    #[test]
    fn test_parse_probe_output_without_video() {
        assert!(parse_probe_output(r#"{"streams": []}"#).is_err());
        assert!(parse_probe_output(r#"{}"#).is_err());
    }

    #[test]
    fn test_target_fps_never_below_one() {
        let mut info = VideoInfo {
            frame_count: 10,
            fps: 0.4,
            width: 2,
            height: 2,
        };
        assert_eq!(info.target_fps(), 1);
        info.fps = 23.976;
        assert_eq!(info.target_fps(), 24);
        info.fps = f64::NAN;
        assert_eq!(info.target_fps(), 1);
    }

    #[test]
    fn test_frame_crop_slices_rows() {
        let frame = gradient(8, 6);
        let cropped = frame.crop(&CropRegion::new(2, 1, 3, 2)).unwrap();
        assert_eq!(cropped.size(), FrameSize::new(3, 2));
        assert_eq!(&cropped.pixels[..3], &[2, 1, 0]);
        assert_eq!(&cropped.pixels[cropped.pixels.len() - 3..], &[4, 2, 0]);

        assert!(frame.crop(&CropRegion::new(6, 0, 4, 2)).is_none());
    }

    #[test]
    fn test_frame_rejects_wrong_buffer_length() {
        assert!(Frame::new(2, 2, vec![0; 11]).is_none());
        assert!(Frame::new(2, 2, vec![0; 12]).is_some());
    }
}
