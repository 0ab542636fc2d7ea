//! HunyClip Export Engine
//!
//! Batch export pipeline that turns per-clip editing decisions
//! (crop region, trim point, export toggle) into cropped and uncropped
//! video clips and still frames.
//!
//! # Pipeline Architecture
//!
//! ```text
//! ClipRegistry ──┐
//!                ├── plan()  ── ExportPlan { jobs, skipped }
//! FrameSource ───┘                  │
//!                                   ▼
//!                           TranscodeEngine::run
//!                                   │
//!              ┌────────────────────┼─────────────────────┐
//!              ▼                    ▼                     ▼
//!        still_image         cropped_video         uncropped_video
//!   seek + read + slice    crop ─ scale ─ fps          fps only
//!              │                    │                     │
//!              ▼                    ▼                     ▼
//!          <base>.png      cropped/<base>_cropped   uncropped/<base>
//!                                   │
//!                                   ▼
//!                   <base>.txt caption sidecar (optional)
//! ```

pub mod backend;
pub mod engine;
pub mod error;
pub mod frame_source;
pub mod planner;
pub mod selection;
pub mod still;

pub use backend::*;
pub use engine::*;
pub use error::*;
pub use frame_source::*;
pub use planner::*;
pub use selection::*;
pub use still::*;
