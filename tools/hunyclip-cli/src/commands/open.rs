//! Open or rescan a folder of clips.

use std::path::PathBuf;

use hunyclip_clip_model::ClipEntry;
use hunyclip_common::config::AppConfig;

pub fn run(config: &AppConfig, folder: PathBuf) -> anyhow::Result<()> {
    let mut registry = super::load_registry(config);
    let entries = registry
        .open_folder(&folder)
        .map_err(|e| anyhow::anyhow!("Failed to open {}: {e}", folder.display()))?;
    print_entries(entries);
    if let Some(folder) = registry.folder() {
        println!("\nOpened {}", folder.display());
    }
    Ok(())
}

pub fn rescan(config: &AppConfig) -> anyhow::Result<()> {
    let mut registry = super::load_open_registry(config)?;
    let before = registry.entries().len();
    let entries = registry
        .rescan()
        .map_err(|e| anyhow::anyhow!("Rescan failed: {e}"))?;
    print_entries(entries);
    println!("\n{} clip(s), previously {before}", entries.len());
    Ok(())
}

fn print_entries(entries: &[ClipEntry]) {
    if entries.is_empty() {
        println!("No clips found.");
    }
    for entry in entries {
        println!("  {}", entry.display_name);
    }
}
