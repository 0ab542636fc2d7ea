//! Move a clip's trim point.

use hunyclip_common::config::AppConfig;
use hunyclip_export_engine::ClipSelection;

pub fn run(config: &AppConfig, name: &str, frame: Option<u64>, step: Option<i64>) -> anyhow::Result<()> {
    let mut registry = super::load_open_registry(config)?;
    let mut selection = ClipSelection::new(Box::new(super::frame_source(config)));
    let info = selection
        .select(&mut registry, name)
        .map_err(|e| anyhow::anyhow!("Failed to open {name}: {e}"))?;

    let trim = match (frame, step) {
        (Some(frame), _) => selection.scrub(&mut registry, frame),
        (None, Some(delta)) => selection.step(&mut registry, delta),
        (None, None) => anyhow::bail!("Give a frame number or --step N"),
    }
    .map_err(|e| anyhow::anyhow!("Failed to move trim point: {e}"))?;
    selection.release();

    let end = trim.saturating_add(u64::from(registry.trim_length()));
    println!(
        "Trim for {name}: frame {trim} of {} ({:.2}s at {:.2} fps)",
        info.frame_count,
        trim as f64 / info.fps.max(f64::MIN_POSITIVE),
        info.fps
    );
    if end > info.frame_count {
        println!(
            "  Note: the {}-frame segment runs past the end of the clip",
            registry.trim_length()
        );
    }
    Ok(())
}
