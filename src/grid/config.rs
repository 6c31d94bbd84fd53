use super::*;
use tracing::trace;

const DEFAULT_ROWS: u32 = 4;
const DEFAULT_COLUMNS: u32 = 5;

/// The authoritative description of a grid overlay.
///
/// `GridConfig` is an immutable value: every operation returns a new config.
/// Row dividers are positions relative to the crop height, column dividers
/// relative to the crop width. Dividers are indexed by identity, not sorted
/// by value; a drag may leave them crossed until the grid is split.
///
/// # Example
/// ```
/// use gridsplit::{Axis, GridConfig, GridPreset};
///
/// let config = GridConfig::default();
/// assert_eq!((config.rows(), config.columns()), (4, 5));
/// assert_eq!(config.preset(), GridPreset::Grid4x5);
///
/// let config = config.with_rows(3).with_columns(3);
/// assert_eq!(config.preset(), GridPreset::Grid3x3);
/// assert_eq!(config.dividers(Axis::Row).len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(from = "RawGridConfig"))]
pub struct GridConfig {
    rows: u32,
    columns: u32,
    preset: GridPreset,
    crop_bounds: NormalizedRect,
    row_dividers: Dividers,
    col_dividers: Dividers,
}

impl GridConfig {
    /// Creates a `GridConfig` with evenly spaced dividers over the full image.
    ///
    /// Out-of-range counts are clamped to `1..=10`.
    ///
    /// # Example
    /// ```
    /// use gridsplit::GridConfig;
    ///
    /// let config = GridConfig::new(0, 42);
    /// assert_eq!(config.rows(), 1);
    /// assert_eq!(config.columns(), 10);
    /// ```
    pub fn new(rows: u32, columns: u32) -> Self {
        let rows = clamp_lines(rows);
        let columns = clamp_lines(columns);
        Self {
            rows,
            columns,
            preset: GridPreset::from_rows_and_columns(rows, columns),
            crop_bounds: NormalizedRect::FULL,
            row_dividers: Dividers::new(),
            col_dividers: Dividers::new(),
        }
        .with_even_dividers()
    }

    pub fn rows(&self) -> u32 {
        self.rows
    }

    pub fn columns(&self) -> u32 {
        self.columns
    }

    pub fn preset(&self) -> GridPreset {
        self.preset
    }

    pub fn crop_bounds(&self) -> NormalizedRect {
        self.crop_bounds
    }

    /// Number of cells along an axis (rows for [`Axis::Row`]).
    pub fn line_count(&self, axis: Axis) -> u32 {
        match axis {
            Axis::Row => self.rows,
            Axis::Column => self.columns,
        }
    }

    /// Divider positions along an axis, in index order.
    pub fn dividers(&self, axis: Axis) -> &[f32] {
        match axis {
            Axis::Row => &self.row_dividers,
            Axis::Column => &self.col_dividers,
        }
    }

    /// Number of tiles a complete split produces.
    pub fn tile_count(&self) -> usize {
        self.rows as usize * self.columns as usize
    }

    /// Regenerates evenly spaced dividers on both axes.
    ///
    /// # Example
    /// ```
    /// use gridsplit::{Axis, GridConfig};
    ///
    /// let config = GridConfig::new(4, 1);
    /// assert_eq!(config.dividers(Axis::Row), &[0.25, 0.5, 0.75]);
    /// assert!(config.dividers(Axis::Column).is_empty());
    /// ```
    pub fn with_even_dividers(self) -> Self {
        Self {
            row_dividers: even_dividers(self.rows),
            col_dividers: even_dividers(self.columns),
            ..self
        }
    }

    /// Sets the row count, discarding manual divider adjustments.
    pub fn with_rows(self, rows: u32) -> Self {
        let rows = clamp_lines(rows);
        Self {
            rows,
            preset: GridPreset::from_rows_and_columns(rows, self.columns),
            ..self
        }
        .with_even_dividers()
    }

    /// Sets the column count, discarding manual divider adjustments.
    pub fn with_columns(self, columns: u32) -> Self {
        let columns = clamp_lines(columns);
        Self {
            columns,
            preset: GridPreset::from_rows_and_columns(self.rows, columns),
            ..self
        }
        .with_even_dividers()
    }

    /// Applies a preset.
    ///
    /// [`GridPreset::Custom`] only retags the config; a concrete preset
    /// overwrites rows and columns and re-evens the dividers.
    pub fn with_preset(self, preset: GridPreset) -> Self {
        match preset.dimensions() {
            Some((rows, columns)) => Self {
                rows,
                columns,
                preset,
                ..self
            }
            .with_even_dividers(),
            None => Self { preset, ..self },
        }
    }

    /// Replaces the crop bounds. Dividers are relative to the crop box and
    /// are kept as they are.
    pub fn with_crop_bounds(self, crop_bounds: NormalizedRect) -> Self {
        Self {
            crop_bounds,
            ..self
        }
    }

    /// Moves one divider to `position`, clamped to `[0.05, 0.95]`.
    ///
    /// No other divider moves and nothing is re-sorted, so a divider may
    /// cross its neighbours. An index past the end leaves the config unchanged.
    ///
    /// # Example
    /// ```
    /// use gridsplit::{Axis, GridConfig};
    ///
    /// let config = GridConfig::new(3, 1).with_divider(Axis::Row, 0, 0.9);
    /// assert_eq!(config.dividers(Axis::Row), &[0.9, 2.0 / 3.0]);
    ///
    /// let config = config.with_divider(Axis::Row, 1, 0.0);
    /// assert_eq!(config.dividers(Axis::Row), &[0.9, 0.05]);
    /// ```
    pub fn with_divider(mut self, axis: Axis, index: usize, position: f32) -> Self {
        if !position.is_finite() {
            return self;
        }
        let dividers = match axis {
            Axis::Row => &mut self.row_dividers,
            Axis::Column => &mut self.col_dividers,
        };
        if let Some(slot) = dividers.get_mut(index) {
            *slot = position.clamp(DIVIDER_DRAG_MIN, DIVIDER_DRAG_MAX);
            trace!("Divider {:?}[{}] moved to {}", axis, index, *slot);
        }
        self
    }

    /// Moves one divider by a normalized `delta` (a fraction of the crop span).
    pub fn drag_divider(self, axis: Axis, index: usize, delta: f32) -> Self {
        match self.dividers(axis).get(index) {
            Some(&current) => self.with_divider(axis, index, current + delta),
            None => self,
        }
    }
}

impl Default for GridConfig {
    fn default() -> Self {
        GridConfig::new(DEFAULT_ROWS, DEFAULT_COLUMNS)
    }
}

/// Deserialized shape of a [`GridConfig`], normalized on conversion.
///
/// Counts are clamped, divider lists of the wrong length are replaced by even
/// spacing and each divider goes through [`GridConfig::with_divider`].
#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
struct RawGridConfig {
    rows: u32,
    columns: u32,
    #[serde(default)]
    preset: Option<GridPreset>,
    #[serde(default)]
    crop_bounds: NormalizedRect,
    #[serde(default)]
    row_dividers: Vec<f32>,
    #[serde(default)]
    col_dividers: Vec<f32>,
}

#[cfg(feature = "serde")]
impl From<RawGridConfig> for GridConfig {
    fn from(raw: RawGridConfig) -> Self {
        let mut config = GridConfig::new(raw.rows, raw.columns).with_crop_bounds(raw.crop_bounds);
        if raw.preset == Some(GridPreset::Custom) {
            config = config.with_preset(GridPreset::Custom);
        }
        for (axis, positions) in [(Axis::Row, raw.row_dividers), (Axis::Column, raw.col_dividers)] {
            if positions.len() != config.dividers(axis).len() {
                trace!(
                    "Ignoring {} {:?} dividers for a {}x{} grid",
                    positions.len(),
                    axis,
                    config.rows,
                    config.columns
                );
                continue;
            }
            for (index, position) in positions.into_iter().enumerate() {
                config = config.with_divider(axis, index, position);
            }
        }
        config
    }
}

fn clamp_lines(count: u32) -> u32 {
    count.clamp(MIN_GRID_LINES, MAX_GRID_LINES)
}

fn even_dividers(count: u32) -> Dividers {
    (1..count).map(|i| i as f32 / count as f32).collect()
}
