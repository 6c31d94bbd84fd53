//! Grid model: axes, normalized rectangles, presets and divider storage.
//!
//! The authoritative description of a grid overlay is [`GridConfig`]. The
//! sanitizer that turns user-dragged dividers into something that can be
//! sliced lives in [`dividers`].

pub mod config;
pub mod dividers;

pub use config::GridConfig;
pub use dividers::{min_gap_for_span, sanitize_dividers, sanitize_sorted_dividers};

use smallvec::SmallVec;

/// Largest number of rows or columns a grid may have.
pub const MAX_GRID_LINES: u32 = 10;
/// Smallest number of rows or columns a grid may have.
pub const MIN_GRID_LINES: u32 = 1;
/// Lowest position a dragged divider may take, relative to the crop span.
pub const DIVIDER_DRAG_MIN: f32 = 0.05;
/// Highest position a dragged divider may take, relative to the crop span.
pub const DIVIDER_DRAG_MAX: f32 = 0.95;

/// A type alias for SmallVec sized so a full grid never spills to the heap.
pub type Dividers = SmallVec<[f32; (MAX_GRID_LINES - 1) as usize]>;

/// Orientation of a divider.
///
/// Row dividers are horizontal lines and split the crop height; column
/// dividers are vertical lines and split the crop width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Axis {
    Row,
    Column,
}

/// Fixed row×column presets offered by the grid picker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum GridPreset {
    Grid3x3,
    Grid4x4,
    #[default]
    Grid4x5,
    Grid4x6,
    Grid5x5,
    Custom,
}

impl GridPreset {
    /// Every concrete preset, in picker order.
    pub const CONCRETE: [GridPreset; 5] = [
        GridPreset::Grid3x3,
        GridPreset::Grid4x4,
        GridPreset::Grid4x5,
        GridPreset::Grid4x6,
        GridPreset::Grid5x5,
    ];

    /// Returns `(rows, columns)` for concrete presets, `None` for [`GridPreset::Custom`].
    pub fn dimensions(self) -> Option<(u32, u32)> {
        match self {
            GridPreset::Grid3x3 => Some((3, 3)),
            GridPreset::Grid4x4 => Some((4, 4)),
            GridPreset::Grid4x5 => Some((4, 5)),
            GridPreset::Grid4x6 => Some((4, 6)),
            GridPreset::Grid5x5 => Some((5, 5)),
            GridPreset::Custom => None,
        }
    }

    /// Finds the preset matching a row/column count, or [`GridPreset::Custom`].
    ///
    /// # Example
    /// ```
    /// use gridsplit::GridPreset;
    ///
    /// assert_eq!(GridPreset::from_rows_and_columns(4, 6), GridPreset::Grid4x6);
    /// assert_eq!(GridPreset::from_rows_and_columns(2, 7), GridPreset::Custom);
    /// ```
    pub fn from_rows_and_columns(rows: u32, columns: u32) -> Self {
        Self::CONCRETE
            .into_iter()
            .find(|preset| preset.dimensions() == Some((rows, columns)))
            .unwrap_or(GridPreset::Custom)
    }
}

/// A rectangle in normalized image space, `[0,1]×[0,1]`.
///
/// Invariant: `0 <= left < right <= 1` and `0 <= top < bottom <= 1`. The only
/// ways to build one are [`NormalizedRect::new`], which rejects values that
/// break the invariant, and [`NormalizedRect::clamped`], which repairs them.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(from = "RawRect"))]
pub struct NormalizedRect {
    left: f32,
    top: f32,
    right: f32,
    bottom: f32,
}

/// Narrowest span [`NormalizedRect::clamped`] will produce.
const MIN_RECT_SPAN: f32 = 0.01;

impl NormalizedRect {
    /// The whole image.
    pub const FULL: NormalizedRect = NormalizedRect {
        left: 0.0,
        top: 0.0,
        right: 1.0,
        bottom: 1.0,
    };

    /// Creates a rectangle, returning `None` if the edges are out of order,
    /// outside `[0,1]` or not finite.
    ///
    /// # Example
    /// ```
    /// use gridsplit::NormalizedRect;
    ///
    /// assert!(NormalizedRect::new(0.1, 0.1, 0.9, 0.9).is_some());
    /// assert!(NormalizedRect::new(0.5, 0.0, 0.5, 1.0).is_none());
    /// ```
    pub fn new(left: f32, top: f32, right: f32, bottom: f32) -> Option<Self> {
        let in_range = |v: f32| v.is_finite() && (0.0..=1.0).contains(&v);
        if [left, top, right, bottom].into_iter().all(in_range) && left < right && top < bottom {
            Some(Self {
                left,
                top,
                right,
                bottom,
            })
        } else {
            None
        }
    }

    /// Builds a valid rectangle out of arbitrary edges.
    ///
    /// Edges are clamped into `[0,1]` and swapped if reversed; a collapsed
    /// span is widened to a small minimum so the result is never degenerate.
    /// Non-finite edges fall back to the full extent on that side.
    pub fn clamped(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        let (left, right) = clamp_span(left, right);
        let (top, bottom) = clamp_span(top, bottom);
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    pub fn left(&self) -> f32 {
        self.left
    }

    pub fn top(&self) -> f32 {
        self.top
    }

    pub fn right(&self) -> f32 {
        self.right
    }

    pub fn bottom(&self) -> f32 {
        self.bottom
    }

    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    pub fn height(&self) -> f32 {
        self.bottom - self.top
    }

    /// True when the rectangle covers the whole image.
    pub fn is_full(&self) -> bool {
        *self == Self::FULL
    }
}

impl Default for NormalizedRect {
    fn default() -> Self {
        Self::FULL
    }
}

#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
struct RawRect {
    left: f32,
    top: f32,
    right: f32,
    bottom: f32,
}

#[cfg(feature = "serde")]
impl From<RawRect> for NormalizedRect {
    fn from(raw: RawRect) -> Self {
        NormalizedRect::clamped(raw.left, raw.top, raw.right, raw.bottom)
    }
}

fn clamp_span(start: f32, end: f32) -> (f32, f32) {
    let start = if start.is_finite() { start.clamp(0.0, 1.0) } else { 0.0 };
    let end = if end.is_finite() { end.clamp(0.0, 1.0) } else { 1.0 };
    let (lo, hi) = if start <= end { (start, end) } else { (end, start) };
    if hi - lo >= MIN_RECT_SPAN {
        (lo, hi)
    } else if lo + MIN_RECT_SPAN <= 1.0 {
        (lo, lo + MIN_RECT_SPAN)
    } else {
        (1.0 - MIN_RECT_SPAN, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(3, 3 => GridPreset::Grid3x3)]
    #[test_case(4, 4 => GridPreset::Grid4x4)]
    #[test_case(4, 5 => GridPreset::Grid4x5)]
    #[test_case(4, 6 => GridPreset::Grid4x6)]
    #[test_case(5, 5 => GridPreset::Grid5x5)]
    #[test_case(5, 4 => GridPreset::Custom ; "transposed preset is custom")]
    #[test_case(1, 1 => GridPreset::Custom)]
    fn test_preset_lookup(rows: u32, columns: u32) -> GridPreset {
        GridPreset::from_rows_and_columns(rows, columns)
    }

    #[test]
    fn test_custom_has_no_dimensions() {
        assert_eq!(GridPreset::Custom.dimensions(), None);
    }

    #[test]
    fn test_rect_new_rejects_invalid() {
        assert!(NormalizedRect::new(-0.1, 0.0, 1.0, 1.0).is_none());
        assert!(NormalizedRect::new(0.0, 0.0, 1.1, 1.0).is_none());
        assert!(NormalizedRect::new(0.6, 0.0, 0.4, 1.0).is_none());
        assert!(NormalizedRect::new(0.0, f32::NAN, 1.0, 1.0).is_none());
        assert_eq!(
            NormalizedRect::new(0.0, 0.0, 1.0, 1.0),
            Some(NormalizedRect::FULL)
        );
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_rect_deserialize_repairs_edges() {
        let rect: NormalizedRect =
            serde_json::from_str(r#"{"left": 0.7, "top": 0.5, "right": 0.3, "bottom": 0.5}"#)
                .unwrap();
        assert_eq!((rect.left(), rect.right()), (0.3, 0.7));
        assert!(rect.top() < rect.bottom());
        assert_eq!(NormalizedRect::new(rect.left(), rect.top(), rect.right(), rect.bottom()), Some(rect));
    }

    #[test]
    fn test_rect_clamped_repairs_edges() {
        let rect = NormalizedRect::clamped(0.8, -2.0, 0.2, 3.0);
        assert_eq!(rect.left(), 0.2);
        assert_eq!(rect.right(), 0.8);
        assert_eq!(rect.top(), 0.0);
        assert_eq!(rect.bottom(), 1.0);

        let collapsed = NormalizedRect::clamped(1.0, 0.5, 1.0, 0.5);
        assert!(collapsed.left() < collapsed.right());
        assert!(collapsed.top() < collapsed.bottom());
        assert!(collapsed.right() <= 1.0);

        let nan = NormalizedRect::clamped(f32::NAN, 0.0, f32::NAN, 1.0);
        assert!(nan.is_full());
    }
}
