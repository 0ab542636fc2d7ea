//! Batch settings shared by every clip.

use hunyclip_common::config::AppConfig;

pub fn run(
    config: &AppConfig,
    longest_edge: Option<u32>,
    trim_length: Option<u32>,
) -> anyhow::Result<()> {
    let mut registry = super::load_registry(config);

    if let Some(edge) = longest_edge {
        registry
            .set_longest_edge(edge)
            .map_err(|e| anyhow::anyhow!("{e}"))?;
    }
    if let Some(length) = trim_length {
        registry
            .set_trim_length(length)
            .map_err(|e| anyhow::anyhow!("{e}"))?;
    }

    println!("Longest edge: {}px", registry.longest_edge());
    println!("Trim length: {} frames", registry.trim_length());
    Ok(())
}
