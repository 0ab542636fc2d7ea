//! Duplicate a clip entry.

use hunyclip_common::config::AppConfig;

pub fn run(config: &AppConfig, name: &str) -> anyhow::Result<()> {
    let mut registry = super::load_open_registry(config)?;
    let copy = registry
        .duplicate(name)
        .map_err(|e| anyhow::anyhow!("Failed to duplicate {name}: {e}"))?;
    println!("Added {} (copy of {name})", copy.display_name);
    Ok(())
}
