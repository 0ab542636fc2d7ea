//! Set or clear a clip's crop region.

use hunyclip_clip_model::{parse_aspect_ratio, CropRegion, Drag, PreviewSize};
use hunyclip_common::config::AppConfig;
use hunyclip_export_engine::ClipSelection;

/// What `hunyclip crop` was asked to do.
#[derive(Debug, Clone, PartialEq)]
pub enum CropAction {
    /// Store a region given in source pixels.
    Source(CropRegion),

    /// Map a rectangle drawn on a scaled preview into source pixels.
    Preview {
        rect: [f64; 4],
        size: PreviewSize,
        aspect_ratio: Option<f64>,
    },

    Clear,
}

impl CropAction {
    pub fn from_args(
        rect: Option<String>,
        preview: Option<String>,
        preview_size: Option<String>,
        aspect: Option<String>,
        clear: bool,
    ) -> anyhow::Result<Self> {
        if clear {
            return Ok(Self::Clear);
        }
        if let Some(rect) = rect {
            let [x, y, w, h] = super::parse_quad::<i64>(&rect)?;
            if w <= 0 || h <= 0 {
                anyhow::bail!("Crop width and height must be positive, got {w}x{h}");
            }
            return Ok(Self::Source(CropRegion::new(x, y, w, h)));
        }
        if let Some(preview) = preview {
            let size = preview_size
                .ok_or_else(|| anyhow::anyhow!("--preview needs --preview-size WxH"))?;
            let (width, height) = super::parse_size(&size)?;
            let aspect_ratio = match aspect {
                Some(value) => parse_aspect_ratio(&value).map_err(|e| anyhow::anyhow!(e))?,
                None => None,
            };
            return Ok(Self::Preview {
                rect: super::parse_quad::<f64>(&preview)?,
                size: PreviewSize::new(width, height),
                aspect_ratio,
            });
        }
        anyhow::bail!("Give one of --rect, --preview or --clear")
    }
}

pub fn run(config: &AppConfig, name: &str, action: CropAction) -> anyhow::Result<()> {
    let mut registry = super::load_open_registry(config)?;

    let region = match action {
        CropAction::Clear => {
            registry
                .clear_crop(name)
                .map_err(|e| anyhow::anyhow!("Failed to clear crop: {e}"))?;
            println!("Cleared crop for {name}");
            return Ok(());
        }
        CropAction::Source(region) => {
            registry
                .set_crop(name, Some(region))
                .map_err(|e| anyhow::anyhow!("Failed to set crop: {e}"))?;
            region
        }
        CropAction::Preview {
            rect: [x, y, w, h],
            size,
            aspect_ratio,
        } => {
            let mut selection = ClipSelection::new(Box::new(super::frame_source(config)));
            let info = selection
                .select(&mut registry, name)
                .map_err(|e| anyhow::anyhow!("Failed to open {name}: {e}"))?;
            tracing::debug!(display_name = name, size = %info.size(), "Mapping preview crop");
            let region = selection
                .apply_drag(
                    &mut registry,
                    Drag::new((x, y), (x + w, y + h)),
                    size,
                    aspect_ratio,
                )
                .map_err(|e| anyhow::anyhow!("Crop not applied: {e}"))?;
            selection.release();
            region
        }
    };

    println!("Crop for {name}: {region}");
    if registry.entry(name).is_some_and(|e| e.export_enabled) {
        println!("{name} will be exported");
    }
    Ok(())
}
