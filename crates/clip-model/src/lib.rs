//! HunyClip Clip Model
//!
//! Data contracts and editing state for a folder of video clips:
//! - **Geometry:** Frame sizes, crop regions and the preview-to-source
//!   coordinate mapping used when a crop is drawn on a scaled preview
//! - **Clips:** Clip entries, duplicate naming and the rescan merge
//! - **Registry:** The clip list plus per-clip crop and trim decisions
//! - **Session:** The persisted form of the registry (`session_data.json`)
//!
//! Crop regions are always stored in source-pixel space; preview
//! coordinates exist only while a drag is in progress.

pub mod clip;
pub mod geometry;
pub mod registry;
pub mod scan;
pub mod session;

pub use clip::*;
pub use geometry::*;
pub use registry::*;
pub use scan::*;
pub use session::*;
