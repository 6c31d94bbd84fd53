//! Split tiles and the per-tile crop/rotate/flip pipeline.
//!
//! A [`SplitTile`] keeps the buffer it was cut with for its whole life.
//! Every edit is re-derived from that original, so edits never stack
//! resampling loss and can always be undone by applying identity params.

use image::{DynamicImage, GenericImageView};
use thiserror::Error;
use tracing::*;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EditError {
    #[error("Rotation must be a multiple of 90 degrees, got {0}")]
    InvalidRotation(i32),
}

/// Clockwise rotation in quarter turns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Rotation {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    /// Parses a rotation in degrees. Any multiple of 90 is accepted and
    /// normalized, negative values included.
    ///
    /// # Example
    /// ```
    /// use gridsplit::Rotation;
    ///
    /// assert_eq!(Rotation::from_degrees(450), Ok(Rotation::Deg90));
    /// assert_eq!(Rotation::from_degrees(-90), Ok(Rotation::Deg270));
    /// assert!(Rotation::from_degrees(45).is_err());
    /// ```
    pub fn from_degrees(degrees: i32) -> Result<Self, EditError> {
        if degrees % 90 != 0 {
            return Err(EditError::InvalidRotation(degrees));
        }
        Ok(match degrees.rem_euclid(360) {
            0 => Rotation::Deg0,
            90 => Rotation::Deg90,
            180 => Rotation::Deg180,
            _ => Rotation::Deg270,
        })
    }

    pub fn degrees(self) -> i32 {
        match self {
            Rotation::Deg0 => 0,
            Rotation::Deg90 => 90,
            Rotation::Deg180 => 180,
            Rotation::Deg270 => 270,
        }
    }

    /// The next quarter turn clockwise.
    pub fn rotated_cw(self) -> Self {
        match self {
            Rotation::Deg0 => Rotation::Deg90,
            Rotation::Deg90 => Rotation::Deg180,
            Rotation::Deg180 => Rotation::Deg270,
            Rotation::Deg270 => Rotation::Deg0,
        }
    }

    /// True when the rotation swaps width and height.
    pub fn swaps_axes(self) -> bool {
        matches!(self, Rotation::Deg90 | Rotation::Deg270)
    }
}

/// Crop, rotation and flip applied to a tile's original buffer.
///
/// Crop edges are normalized against the rotated buffer, default `0,0,1,1`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TileEditParams {
    pub crop_left: f32,
    pub crop_top: f32,
    pub crop_right: f32,
    pub crop_bottom: f32,
    pub rotation: Rotation,
    pub flip_horizontal: bool,
    pub flip_vertical: bool,
}

impl Default for TileEditParams {
    fn default() -> Self {
        Self {
            crop_left: 0.0,
            crop_top: 0.0,
            crop_right: 1.0,
            crop_bottom: 1.0,
            rotation: Rotation::Deg0,
            flip_horizontal: false,
            flip_vertical: false,
        }
    }
}

impl TileEditParams {
    /// True for full-extent crop, no rotation and no flips.
    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }

    /// Turns a quarter clockwise. The crop refers to the old orientation, so
    /// it is reset to the full extent.
    pub fn rotate_clockwise(self) -> Self {
        Self {
            rotation: self.rotation.rotated_cw(),
            crop_left: 0.0,
            crop_top: 0.0,
            crop_right: 1.0,
            crop_bottom: 1.0,
            ..self
        }
    }

    pub fn with_crop(self, left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Self {
            crop_left: left,
            crop_top: top,
            crop_right: right,
            crop_bottom: bottom,
            ..self
        }
    }

    pub fn with_flips(self, flip_horizontal: bool, flip_vertical: bool) -> Self {
        Self {
            flip_horizontal,
            flip_vertical,
            ..self
        }
    }
}

/// Produces an edited buffer from `original`.
///
/// Order is fixed: rotate about the center, then flip (horizontal, then
/// vertical), then crop. The crop rectangle is scaled to the rotated
/// buffer, so a 90° or 270° turn swaps the dimensions it is measured in.
/// The cropped size is at least 1px and never exceeds the rotated buffer.
///
/// # Example
/// ```
/// use gridsplit::{apply_edit, Rotation, TileEditParams};
/// use image::{DynamicImage, RgbaImage};
///
/// let original = DynamicImage::ImageRgba8(RgbaImage::new(40, 20));
/// let params = TileEditParams {
///     rotation: Rotation::Deg90,
///     ..TileEditParams::default()
/// }
/// .with_crop(0.0, 0.0, 1.0, 0.5);
///
/// let edited = apply_edit(&original, &params);
/// assert_eq!((edited.width(), edited.height()), (20, 20));
/// ```
pub fn apply_edit(original: &DynamicImage, params: &TileEditParams) -> DynamicImage {
    if params.is_default() {
        return original.clone();
    }
    trace!("Applying tile edit: {:?}", params);

    let mut edited = match params.rotation {
        Rotation::Deg0 => original.clone(),
        Rotation::Deg90 => original.rotate90(),
        Rotation::Deg180 => original.rotate180(),
        Rotation::Deg270 => original.rotate270(),
    };
    if params.flip_horizontal {
        edited = edited.fliph();
    }
    if params.flip_vertical {
        edited = edited.flipv();
    }

    let (width, height) = edited.dimensions();
    let (x, y, crop_w, crop_h) = crop_pixels(params, width, height);
    if (x, y, crop_w, crop_h) == (0, 0, width, height) {
        return edited;
    }
    edited.crop_imm(x, y, crop_w, crop_h)
}

/// Maps the normalized crop onto a `width`×`height` buffer.
fn crop_pixels(params: &TileEditParams, width: u32, height: u32) -> (u32, u32, u32, u32) {
    let axis = |start: f32, end: f32, span: u32| {
        let span_f = span as f32;
        let start = if start.is_finite() { start } else { 0.0 };
        let end = if end.is_finite() { end } else { 1.0 };
        let offset = ((start * span_f) as u32).min(span.saturating_sub(1));
        let length = (((end - start) * span_f) as u32)
            .max(1)
            .min(span - offset);
        (offset, length)
    };
    let (x, crop_w) = axis(params.crop_left, params.crop_right, width);
    let (y, crop_h) = axis(params.crop_top, params.crop_bottom, height);
    (x, y, crop_w, crop_h)
}

/// One tile produced by a split.
///
/// `index`, `row` and `column` never change once the tile exists. Only the
/// displayed buffer, edit params, placement hints and file name are updated.
#[derive(Debug, Clone, PartialEq)]
pub struct SplitTile {
    pub index: usize,
    pub row: u32,
    pub column: u32,
    /// The buffer currently shown and exported.
    pub bitmap: DynamicImage,
    /// The buffer captured at split time.
    pub original_bitmap: DynamicImage,
    pub edit_params: TileEditParams,
    pub offset_x: f32,
    pub offset_y: f32,
    pub scale: f32,
    pub file_name: String,
}

impl SplitTile {
    /// Creates a tile with identity edits and the default `Tile_NN` name.
    pub fn new(index: usize, row: u32, column: u32, bitmap: DynamicImage) -> Self {
        Self {
            index,
            row,
            column,
            original_bitmap: bitmap.clone(),
            bitmap,
            edit_params: TileEditParams::default(),
            offset_x: 0.0,
            offset_y: 0.0,
            scale: 1.0,
            file_name: default_tile_name(index),
        }
    }

    /// Re-derives the displayed buffer from the original with `params`.
    ///
    /// Placement hints are reset to identity.
    pub fn apply_edit(&mut self, params: TileEditParams) {
        debug!("Editing tile {} with {:?}", self.index, params);
        self.bitmap = apply_edit(&self.original_bitmap, &params);
        self.edit_params = params;
        self.reset_placement();
    }

    pub fn set_offset(&mut self, offset_x: f32, offset_y: f32) {
        if offset_x.is_finite() && offset_y.is_finite() {
            self.offset_x = offset_x;
            self.offset_y = offset_y;
        }
    }

    /// Sets the placement scale. Non-positive or non-finite values are ignored.
    pub fn set_scale(&mut self, scale: f32) {
        if scale.is_finite() && scale > 0.0 {
            self.scale = scale;
        }
    }

    /// Drops every edit and placement hint. The file name is kept.
    pub fn reset(&mut self) {
        self.bitmap = self.original_bitmap.clone();
        self.edit_params = TileEditParams::default();
        self.reset_placement();
    }

    pub fn is_edited(&self) -> bool {
        !self.edit_params.is_default()
    }

    fn reset_placement(&mut self) {
        self.offset_x = 0.0;
        self.offset_y = 0.0;
        self.scale = 1.0;
    }
}

/// `Tile_01`, `Tile_02`, ... for zero-based `index`.
pub fn default_tile_name(index: usize) -> String {
    format!("Tile_{:02}", index + 1)
}
