//! Check that ffmpeg is usable and show where state is kept.

use hunyclip_common::config::{config_file_path, AppConfig};
use hunyclip_export_engine::{command_exists, TranscodeBackend};

/// `write` is the config as loaded from disk, before command-line overrides.
pub fn run(config: &AppConfig, write: Option<&AppConfig>) -> anyhow::Result<()> {
    println!("HunyClip System Check");
    println!("{}", "=".repeat(50));

    for binary in [&config.export.ffmpeg, &config.export.ffprobe] {
        if command_exists(binary) {
            println!("[OK] {binary} found");
        } else {
            println!("[MISSING] {binary} not found on PATH");
        }
    }
    let backend = super::ffmpeg_backend(config);

    println!();
    let config_path = config_file_path();
    if let Some(stored) = write {
        stored
            .save()
            .map_err(|e| anyhow::anyhow!("Failed to write {}: {e}", config_path.display()))?;
        println!("[OK] Wrote {}", config_path.display());
    }
    println!(
        "Config:  {} {}",
        config_path.display(),
        if config_path.exists() { "" } else { "(defaults)" }
    );
    println!(
        "Session: {} {}",
        config.session_file.display(),
        if config.session_file.exists() {
            ""
        } else {
            "(not created yet)"
        }
    );
    println!("Encoder: {} (crf {})", config.export.video_codec, config.export.crf);
    println!("Clip extensions: {}", config.scan.extensions.join(", "));

    println!();
    if backend.is_available() {
        println!("ffmpeg and ffprobe are available. HunyClip is ready.");
    } else {
        println!("Install ffmpeg or point export.ffmpeg / export.ffprobe at it in the config.");
    }
    Ok(())
}
