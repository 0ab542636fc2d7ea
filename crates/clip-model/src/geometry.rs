//! Crop regions and the mapping between preview space and source pixels.
//!
//! Crop regions are always stored in source-pixel coordinates. The preview
//! surface shows a scaled copy of the frame, so every pointer drag is mapped
//! back through the preview scale before it is persisted, and every stored
//! region is mapped forward again when a clip is redrawn.

use serde::{Deserialize, Serialize};

/// Smallest drag accepted as a crop, in preview pixels, on either axis.
pub const MIN_PREVIEW_EDGE: f64 = 10.0;

/// Pixel dimensions of a video frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FrameSize {
    pub width: u32,
    pub height: u32,
}

impl FrameSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Round both dimensions down to the nearest even number.
    pub fn to_even(self) -> Self {
        Self {
            width: even_floor(self.width),
            height: even_floor(self.height),
        }
    }

    /// Fit this size inside a square of `longest_edge`, keeping the aspect
    /// ratio. The shorter side is rounded to the nearest even pixel count.
    pub fn scaled_to_longest_edge(self, longest_edge: u32) -> Self {
        if self.is_empty() || longest_edge == 0 {
            return self;
        }
        let (w, h) = (self.width as f64, self.height as f64);
        if self.width >= self.height {
            let short = (h * longest_edge as f64 / w / 2.0).round() as u32 * 2;
            Self::new(longest_edge, short.max(2))
        } else {
            let short = (w * longest_edge as f64 / h / 2.0).round() as u32 * 2;
            Self::new(short.max(2), longest_edge)
        }
    }
}

impl std::fmt::Display for FrameSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Largest even number not above `value`.
pub fn even_floor(value: u32) -> u32 {
    value - value % 2
}

/// A crop rectangle in source-pixel coordinates.
///
/// Persisted as a `[x, y, w, h]` array. Fields are signed so that a
/// hand-edited or stale session can still be loaded and then rejected
/// by [`CropRegion::check_bounds`] instead of failing to parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "[i64; 4]", into = "[i64; 4]")]
pub struct CropRegion {
    pub x: i64,
    pub y: i64,
    pub w: i64,
    pub h: i64,
}

/// Why a crop region does not fit a source frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundsViolation {
    NegativeOrigin,
    EmptySize,
    ExceedsWidth,
    ExceedsHeight,
}

impl std::fmt::Display for BoundsViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            Self::NegativeOrigin => "origin is negative",
            Self::EmptySize => "width or height is not positive",
            Self::ExceedsWidth => "x + w exceeds the source width",
            Self::ExceedsHeight => "y + h exceeds the source height",
        };
        f.write_str(text)
    }
}

impl CropRegion {
    pub fn new(x: i64, y: i64, w: i64, h: i64) -> Self {
        Self { x, y, w, h }
    }

    /// Right edge (exclusive).
    pub fn right(&self) -> i64 {
        self.x + self.w
    }

    /// Bottom edge (exclusive).
    pub fn bottom(&self) -> i64 {
        self.y + self.h
    }

    /// Check the region against a source frame.
    pub fn check_bounds(&self, source: FrameSize) -> Result<(), BoundsViolation> {
        if self.x < 0 || self.y < 0 {
            return Err(BoundsViolation::NegativeOrigin);
        }
        if self.w <= 0 || self.h <= 0 {
            return Err(BoundsViolation::EmptySize);
        }
        if self.right() > source.width as i64 {
            return Err(BoundsViolation::ExceedsWidth);
        }
        if self.bottom() > source.height as i64 {
            return Err(BoundsViolation::ExceedsHeight);
        }
        Ok(())
    }

    /// Shrink odd width/height by one pixel. Encoders using 4:2:0 chroma
    /// subsampling reject odd frame dimensions.
    pub fn to_even(self) -> Self {
        Self {
            w: self.w - self.w.rem_euclid(2),
            h: self.h - self.h.rem_euclid(2),
            ..self
        }
    }

    /// Size of the region. Only meaningful for regions that pass
    /// [`CropRegion::check_bounds`].
    pub fn size(&self) -> FrameSize {
        FrameSize::new(self.w.max(0) as u32, self.h.max(0) as u32)
    }
}

impl From<[i64; 4]> for CropRegion {
    fn from([x, y, w, h]: [i64; 4]) -> Self {
        Self { x, y, w, h }
    }
}

impl From<CropRegion> for [i64; 4] {
    fn from(region: CropRegion) -> Self {
        [region.x, region.y, region.w, region.h]
    }
}

impl std::fmt::Display for CropRegion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {}, {}x{})", self.x, self.y, self.w, self.h)
    }
}

/// Size of the scaled preview surface, in preview pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PreviewSize {
    pub width: f64,
    pub height: f64,
}

impl PreviewSize {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    fn is_usable(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }
}

/// Which corner of a rectangle stays put while the opposite one is dragged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Corner {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

/// A rectangle in preview coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PreviewRect {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl PreviewRect {
    pub fn new(x: f64, y: f64, w: f64, h: f64) -> Self {
        Self { x, y, w, h }
    }

    /// Rectangle spanned by two points, in any order.
    pub fn from_points(a: (f64, f64), b: (f64, f64)) -> Self {
        let x = a.0.min(b.0);
        let y = a.1.min(b.1);
        Self {
            x,
            y,
            w: (a.0 - b.0).abs(),
            h: (a.1 - b.1).abs(),
        }
    }

    pub fn right(&self) -> f64 {
        self.x + self.w
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.h
    }

    /// Intersect with the preview surface.
    pub fn clamp_to(&self, preview: PreviewSize) -> Self {
        let x1 = self.x.max(0.0);
        let y1 = self.y.max(0.0);
        let x2 = self.right().min(preview.width);
        let y2 = self.bottom().min(preview.height);
        Self {
            x: x1,
            y: y1,
            w: (x2 - x1).max(0.0),
            h: (y2 - y1).max(0.0),
        }
    }

    /// Shrink one dimension so that `w / h == ratio`, keeping `anchor`
    /// fixed. `None` leaves the rectangle free-form.
    pub fn constrain_to_aspect_ratio(self, ratio: Option<f64>, anchor: Corner) -> Self {
        let Some(ratio) = ratio.filter(|r| r.is_finite() && *r > 0.0) else {
            return self;
        };
        if self.w <= 0.0 && self.h <= 0.0 {
            return self;
        }

        let (w, h) = if self.h <= 0.0 || self.w / self.h > ratio {
            (self.h * ratio, self.h)
        } else {
            (self.w, self.w / ratio)
        };

        let x = match anchor {
            Corner::TopLeft | Corner::BottomLeft => self.x,
            Corner::TopRight | Corner::BottomRight => self.right() - w,
        };
        let y = match anchor {
            Corner::TopLeft | Corner::TopRight => self.y,
            Corner::BottomLeft | Corner::BottomRight => self.bottom() - h,
        };
        Self { x, y, w, h }
    }
}

/// A pointer drag on the preview surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Drag {
    /// Where the button went down.
    pub anchor: (f64, f64),
    /// Where the pointer is now (or where it was released).
    pub current: (f64, f64),
}

impl Drag {
    pub fn new(anchor: (f64, f64), current: (f64, f64)) -> Self {
        Self { anchor, current }
    }

    /// The corner of the dragged rectangle that sits under the anchor.
    pub fn anchor_corner(&self) -> Corner {
        let left = self.current.0 >= self.anchor.0;
        let top = self.current.1 >= self.anchor.1;
        match (left, top) {
            (true, true) => Corner::TopLeft,
            (false, true) => Corner::TopRight,
            (true, false) => Corner::BottomLeft,
            (false, false) => Corner::BottomRight,
        }
    }

    /// The dragged rectangle, optionally locked to an aspect ratio.
    pub fn rect(&self, ratio: Option<f64>) -> PreviewRect {
        PreviewRect::from_points(self.anchor, self.current)
            .constrain_to_aspect_ratio(ratio, self.anchor_corner())
    }
}

/// A drag that could not become a crop region.
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum MappingRejected {
    #[error("crop of {width:.0}x{height:.0} preview px is below the 10 px minimum")]
    TooSmall { width: f64, height: f64 },
}

/// Maps rectangles between a scaled preview and the source frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoordinateMapper {
    preview: PreviewSize,
    source: FrameSize,
}

impl CoordinateMapper {
    /// `None` when either surface has no area.
    pub fn new(preview: PreviewSize, source: FrameSize) -> Option<Self> {
        if !preview.is_usable() || source.is_empty() {
            return None;
        }
        Some(Self { preview, source })
    }

    pub fn preview(&self) -> PreviewSize {
        self.preview
    }

    pub fn source(&self) -> FrameSize {
        self.source
    }

    /// Source pixels per preview pixel, horizontally.
    pub fn scale_x(&self) -> f64 {
        self.source.width as f64 / self.preview.width
    }

    /// Source pixels per preview pixel, vertically.
    pub fn scale_y(&self) -> f64 {
        self.source.height as f64 / self.preview.height
    }

    /// Map a preview rectangle into source pixels.
    ///
    /// The rectangle is clipped to the preview first; anything narrower or
    /// shorter than [`MIN_PREVIEW_EDGE`] is rejected so that a click without
    /// a drag never replaces an existing crop.
    pub fn map_preview_rect_to_source(
        &self,
        rect: PreviewRect,
    ) -> Result<CropRegion, MappingRejected> {
        let clipped = rect.clamp_to(self.preview);
        let too_small = MappingRejected::TooSmall {
            width: clipped.w,
            height: clipped.h,
        };
        if clipped.w < MIN_PREVIEW_EDGE || clipped.h < MIN_PREVIEW_EDGE {
            return Err(too_small);
        }

        let (sw, sh) = (self.source.width as i64, self.source.height as i64);
        let x = ((clipped.x * self.scale_x()).round() as i64).clamp(0, sw);
        let y = ((clipped.y * self.scale_y()).round() as i64).clamp(0, sh);
        let w = ((clipped.w * self.scale_x()).round() as i64).min(sw - x);
        let h = ((clipped.h * self.scale_y()).round() as i64).min(sh - y);
        if w <= 0 || h <= 0 {
            return Err(too_small);
        }
        Ok(CropRegion::new(x, y, w, h))
    }

    /// Map a stored source region onto the preview, for redrawing.
    pub fn map_source_rect_to_preview(&self, region: &CropRegion) -> PreviewRect {
        PreviewRect {
            x: region.x as f64 / self.scale_x(),
            y: region.y as f64 / self.scale_y(),
            w: region.w as f64 / self.scale_x(),
            h: region.h as f64 / self.scale_y(),
        }
    }
}

/// Parse an aspect-ratio lock such as `16:9`, `1.5` or `free`.
///
/// `Ok(None)` means free-form.
pub fn parse_aspect_ratio(value: &str) -> Result<Option<f64>, String> {
    let normalized = value.trim().replace(' ', "");
    if normalized.is_empty() || normalized.eq_ignore_ascii_case("free") {
        return Ok(None);
    }
    let ratio = match normalized.split_once(':') {
        Some((left, right)) => {
            let w = left.parse::<f64>().map_err(|e| format!("{value}: {e}"))?;
            let h = right.parse::<f64>().map_err(|e| format!("{value}: {e}"))?;
            if h <= 0.0 {
                return Err(format!("{value}: height must be positive"));
            }
            w / h
        }
        None => normalized
            .parse::<f64>()
            .map_err(|e| format!("{value}: {e}"))?,
    };
    if !ratio.is_finite() || ratio <= 0.0 {
        return Err(format!("{value}: ratio must be positive"));
    }
    Ok(Some(ratio))
}
