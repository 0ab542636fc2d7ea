//! Subcommand implementations and the pieces they share.

pub mod check;
pub mod crop;
pub mod duplicate;
pub mod export;
pub mod list;
pub mod open;
pub mod settings;
pub mod toggle;
pub mod trim;

use anyhow::Context;
use hunyclip_clip_model::{ClipRegistry, EditPolicy, JsonFileStore};
use hunyclip_common::config::AppConfig;
use hunyclip_export_engine::{EncoderSettings, FfmpegBackend, FfmpegFrameSource};

/// Registry backed by the configured session file, with its state restored.
pub fn load_registry(config: &AppConfig) -> ClipRegistry {
    let policy = if config.editing.auto_enable_on_edit {
        EditPolicy::AutoEnable
    } else {
        EditPolicy::Manual
    };
    let mut registry = ClipRegistry::new(Box::new(JsonFileStore::new(&config.session_file)))
        .with_extensions(config.scan.extensions.clone())
        .with_policy(policy);
    registry.load();
    registry
}

/// Like [`load_registry`], but a folder must already be open.
pub fn load_open_registry(config: &AppConfig) -> anyhow::Result<ClipRegistry> {
    let registry = load_registry(config);
    if registry.folder().is_none() {
        anyhow::bail!("No folder is open. Run `hunyclip open <FOLDER>` first.");
    }
    Ok(registry)
}

pub fn frame_source(config: &AppConfig) -> FfmpegFrameSource {
    FfmpegFrameSource::new(&config.export.ffmpeg, &config.export.ffprobe)
}

/// Transcode backend using the configured binaries and encoder.
pub fn ffmpeg_backend(config: &AppConfig) -> FfmpegBackend {
    FfmpegBackend::new(EncoderSettings {
        ffmpeg: config.export.ffmpeg.clone(),
        ffprobe: config.export.ffprobe.clone(),
        video_codec: config.export.video_codec.clone(),
        crf: config.export.crf,
    })
}

/// Parse `a,b,c,d` into four numbers.
pub fn parse_quad<T>(value: &str) -> anyhow::Result<[T; 4]>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let parts: Vec<&str> = value.split(',').map(str::trim).collect();
    if parts.len() != 4 {
        anyhow::bail!("Expected four comma-separated values (x,y,w,h), got '{value}'");
    }
    let mut out = Vec::with_capacity(4);
    for part in parts {
        out.push(
            part.parse::<T>()
                .with_context(|| format!("Invalid number '{part}' in '{value}'"))?,
        );
    }
    out.try_into()
        .map_err(|_| anyhow::anyhow!("Expected four values in '{value}'"))
}

/// Parse `WxH`.
pub fn parse_size(value: &str) -> anyhow::Result<(f64, f64)> {
    let (w, h) = value
        .split_once(['x', 'X'])
        .with_context(|| format!("Expected a size like 640x360, got '{value}'"))?;
    let w: f64 = w.trim().parse().with_context(|| format!("Invalid width in '{value}'"))?;
    let h: f64 = h.trim().parse().with_context(|| format!("Invalid height in '{value}'"))?;
    Ok((w, h))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_quad() {
        assert_eq!(parse_quad::<i64>("10, 20,30,40").unwrap(), [10, 20, 30, 40]);
        assert_eq!(parse_quad::<f64>("0.5,1,2,3").unwrap(), [0.5, 1.0, 2.0, 3.0]);
        assert!(parse_quad::<i64>("1,2,3").is_err());
        assert!(parse_quad::<i64>("1,2,x,4").is_err());
    }

    #[test]
    fn test_parse_size() {
        assert_eq!(parse_size("640x360").unwrap(), (640.0, 360.0));
        assert_eq!(parse_size("100X50").unwrap(), (100.0, 50.0));
        assert!(parse_size("640").is_err());
    }

    #[test]
    fn test_backend_follows_configured_binaries() {
        use hunyclip_export_engine::TranscodeBackend;

        let mut config = AppConfig::default();
        config.export.ffmpeg = "hunyclip-missing-ffmpeg".to_string();
        let backend = ffmpeg_backend(&config);
        assert_eq!(backend.name(), "ffmpeg");
        assert!(!backend.is_available());
    }

    #[test]
    fn test_registry_uses_session_file() {
        let dir = tempfile::tempdir().unwrap();
        let clips = dir.path().join("clips");
        std::fs::create_dir(&clips).unwrap();
        std::fs::write(clips.join("a.mp4"), b"").unwrap();

        let config = AppConfig {
            session_file: dir.path().join("session_data.json"),
            ..AppConfig::default()
        };
        assert!(load_open_registry(&config).is_err());

        let mut registry = load_registry(&config);
        registry.open_folder(&clips).unwrap();
        assert!(config.session_file.exists());

        let restored = load_open_registry(&config).unwrap();
        assert_eq!(restored.entries().len(), 1);
        assert_eq!(restored.entries()[0].display_name, "a.mp4");
    }
}
