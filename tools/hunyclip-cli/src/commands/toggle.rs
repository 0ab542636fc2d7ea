//! Enable or disable a clip for export.

use hunyclip_common::config::AppConfig;

pub fn run(config: &AppConfig, name: &str, enabled: bool) -> anyhow::Result<()> {
    let mut registry = super::load_open_registry(config)?;
    registry
        .set_export_enabled(name, enabled)
        .map_err(|e| anyhow::anyhow!("Failed to update {name}: {e}"))?;
    println!(
        "{name} {}",
        if enabled {
            "will be exported"
        } else {
            "will be skipped"
        }
    );
    Ok(())
}
