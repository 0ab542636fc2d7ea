//! Show the open folder's clips and their edits.

use hunyclip_common::config::AppConfig;

pub fn run(config: &AppConfig) -> anyhow::Result<()> {
    let registry = super::load_open_registry(config)?;

    if let Some(folder) = registry.folder() {
        println!("Folder: {}", folder.display());
    }
    println!(
        "Longest edge: {}px   Trim length: {} frames",
        registry.longest_edge(),
        registry.trim_length()
    );
    println!();

    for entry in registry.entries() {
        let crop = registry
            .crop(&entry.display_name)
            .map(|c| c.to_string())
            .unwrap_or_else(|| "-".to_string());
        let trim = registry
            .trim(&entry.display_name)
            .map(|t| t.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "[{}] {:<32} crop: {:<22} trim: {}",
            if entry.export_enabled { "x" } else { " " },
            entry.display_name,
            crop,
            trim
        );
    }

    let enabled = registry.enabled_entries().count();
    println!("\n{enabled} of {} clip(s) enabled for export", registry.entries().len());
    Ok(())
}
