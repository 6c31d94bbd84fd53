//! Slicing a source image into tiles along a [`GridConfig`].

use crate::grid::{min_gap_for_span, sanitize_dividers, Axis, GridConfig};
use crate::tile::SplitTile;
use crate::SplitError;
use image::{DynamicImage, GenericImageView};
use imageproc::rect::Rect;
use rayon::prelude::*;
use thiserror::Error;
use tracing::*;

/// Configuration for the splitter.
///
/// # Example
/// ```
/// use gridsplit::SplitterConfig;
///
/// let config = SplitterConfig::default();
/// assert_eq!(config.enable_parallel, false);
/// ```
#[derive(Debug, Clone, Default)]
pub struct SplitterConfig {
    /// Extract tile pixels on the rayon pool (default: false). The output is
    /// identical to the sequential path.
    pub enable_parallel: bool,
}

impl SplitterConfig {
    pub fn new(enable_parallel: bool) -> Self {
        Self { enable_parallel }
    }
}

/// Pixel rectangle of one tile inside the source image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct TileRect {
    pub index: usize,
    pub row: u32,
    pub column: u32,
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl From<&TileRect> for Rect {
    fn from(tile: &TileRect) -> Self {
        Rect::at(tile.x as i32, tile.y as i32).of_size(tile.width, tile.height)
    }
}

/// Why a tile was left out of a split.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TileSkipReason {
    #[error("no boundary left for this tile after divider sanitization")]
    MissingBoundary,

    #[error("rectangle x={x}, y={y}, width={width}, height={height} is outside the source image")]
    OutOfBounds {
        x: u32,
        y: u32,
        width: u32,
        height: u32,
    },
}

/// A tile position that produced no output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedTile {
    pub index: usize,
    pub row: u32,
    pub column: u32,
    pub reason: TileSkipReason,
}

/// Result of a split: the tiles that were produced and the ones that were not.
#[derive(Debug, Clone)]
pub struct SplitOutcome {
    /// Produced tiles in row-major order.
    pub tiles: Vec<SplitTile>,
    /// Positions that were skipped, in row-major order.
    pub skipped: Vec<SkippedTile>,
    /// `rows * columns` of the grid that was split.
    pub expected: usize,
}

impl SplitOutcome {
    /// True when every grid cell produced a tile.
    pub fn is_complete(&self) -> bool {
        self.tiles.len() == self.expected
    }
}

/// Computes the crop region in source pixels as `(x, y, width, height)`.
pub fn crop_region(width: u32, height: u32, config: &GridConfig) -> (u32, u32, u32, u32) {
    let bounds = config.crop_bounds();
    let (w, h) = (width as f32, height as f32);
    (
        (bounds.left() * w) as u32,
        (bounds.top() * h) as u32,
        (bounds.width() * w) as u32,
        (bounds.height() * h) as u32,
    )
}

/// Builds `[0] + sanitized dividers + [1]` for one axis.
fn axis_boundaries(config: &GridConfig, axis: Axis, span: u32) -> Vec<f32> {
    let sanitized = sanitize_dividers(config.dividers(axis), min_gap_for_span(span));
    let mut boundaries = Vec::with_capacity(sanitized.len() + 2);
    boundaries.push(0.0);
    boundaries.extend_from_slice(&sanitized);
    boundaries.push(1.0);
    boundaries
}

/// Computes the pixel rectangle of every tile without touching pixels.
///
/// Entries are in row-major order, one per grid cell. A cell whose rectangle
/// cannot be placed is returned as a [`SkippedTile`].
///
/// # Example
/// ```
/// use gridsplit::{tile_layout, GridConfig};
///
/// let layout = tile_layout(1200, 900, &GridConfig::new(3, 3));
/// assert_eq!(layout.len(), 9);
/// let first = layout[0].as_ref().unwrap();
/// assert_eq!((first.width, first.height), (400, 300));
/// ```
pub fn tile_layout(
    width: u32,
    height: u32,
    config: &GridConfig,
) -> Vec<Result<TileRect, SkippedTile>> {
    let (crop_x, crop_y, crop_w, crop_h) = crop_region(width, height, config);
    trace!(
        "Crop region x={}, y={}, width={}, height={}",
        crop_x,
        crop_y,
        crop_w,
        crop_h
    );
    let row_bounds = axis_boundaries(config, Axis::Row, crop_h);
    let col_bounds = axis_boundaries(config, Axis::Column, crop_w);
    let to_px = |position: f32, span: u32| (position * span as f32) as u32;

    let mut layout = Vec::with_capacity(config.tile_count());
    for row in 0..config.rows() {
        for column in 0..config.columns() {
            let index = (row * config.columns() + column) as usize;
            let skip = |reason| SkippedTile {
                index,
                row,
                column,
                reason,
            };

            let (r, c) = (row as usize, column as usize);
            let (Some(row_span), Some(col_span)) =
                (row_bounds.get(r..r + 2), col_bounds.get(c..c + 2))
            else {
                layout.push(Err(skip(TileSkipReason::MissingBoundary)));
                continue;
            };

            let left = to_px(col_span[0], crop_w);
            let right = to_px(col_span[1], crop_w);
            let top = to_px(row_span[0], crop_h);
            let bottom = to_px(row_span[1], crop_h);
            let tile_w = right.saturating_sub(left).max(1);
            let tile_h = bottom.saturating_sub(top).max(1);

            let x = crop_x.saturating_add(left);
            let y = crop_y.saturating_add(top);
            if x >= width || y >= height {
                layout.push(Err(skip(TileSkipReason::OutOfBounds {
                    x,
                    y,
                    width: tile_w,
                    height: tile_h,
                })));
                continue;
            }

            layout.push(Ok(TileRect {
                index,
                row,
                column,
                x,
                y,
                width: tile_w.min(width - x),
                height: tile_h.min(height - y),
            }));
        }
    }
    layout
}

/// Copies one rectangle out of the source into its own buffer.
pub fn extract_tile(source: &DynamicImage, rect: &TileRect) -> Result<DynamicImage, TileSkipReason> {
    let (width, height) = source.dimensions();
    let fits = rect.width > 0
        && rect.height > 0
        && rect
            .x
            .checked_add(rect.width)
            .is_some_and(|right| right <= width)
        && rect
            .y
            .checked_add(rect.height)
            .is_some_and(|bottom| bottom <= height);
    if !fits {
        return Err(TileSkipReason::OutOfBounds {
            x: rect.x,
            y: rect.y,
            width: rect.width,
            height: rect.height,
        });
    }
    Ok(source.crop_imm(rect.x, rect.y, rect.width, rect.height))
}

/// Splits `source` along `config` with the default [`SplitterConfig`].
pub fn split_image(source: &DynamicImage, config: &GridConfig) -> Result<SplitOutcome, SplitError> {
    split_image_with_config(source, config, &SplitterConfig::default())
}

/// Splits `source` into `rows * columns` tiles.
///
/// Dividers are sanitized here and only here. A tile whose rectangle cannot
/// be extracted is skipped and reported in [`SplitOutcome::skipped`]; the
/// rest of the split carries on.
///
/// # Example
/// ```
/// use gridsplit::{split_image, GridConfig};
/// use image::{DynamicImage, RgbaImage};
///
/// let img = DynamicImage::ImageRgba8(RgbaImage::new(1200, 900));
/// let outcome = split_image(&img, &GridConfig::new(3, 3)).unwrap();
/// assert!(outcome.is_complete());
/// assert_eq!(outcome.tiles[8].file_name, "Tile_09");
/// ```
pub fn split_image_with_config(
    source: &DynamicImage,
    config: &GridConfig,
    splitter: &SplitterConfig,
) -> Result<SplitOutcome, SplitError> {
    trace!("Splitting image with grid: {:?}", config);
    let (width, height) = source.dimensions();
    if width == 0 || height == 0 {
        error!(
            "Invalid image dimensions: width={}, height={}",
            width, height
        );
        return Err(SplitError::InvalidDimensions { width, height });
    }

    let layout = tile_layout(width, height, config);
    let extract = |entry: Result<TileRect, SkippedTile>| -> Result<SplitTile, SkippedTile> {
        let rect = entry?;
        extract_tile(source, &rect)
            .map(|bitmap| SplitTile::new(rect.index, rect.row, rect.column, bitmap))
            .map_err(|reason| SkippedTile {
                index: rect.index,
                row: rect.row,
                column: rect.column,
                reason,
            })
    };

    let results: Vec<Result<SplitTile, SkippedTile>> = if splitter.enable_parallel {
        layout.into_par_iter().map(extract).collect()
    } else {
        layout.into_iter().map(extract).collect()
    };

    let mut outcome = SplitOutcome {
        tiles: Vec::with_capacity(results.len()),
        skipped: Vec::new(),
        expected: config.tile_count(),
    };
    for result in results {
        match result {
            Ok(tile) => outcome.tiles.push(tile),
            Err(skipped) => {
                warn!(
                    "Skipping tile {} (row {}, column {}): {}",
                    skipped.index, skipped.row, skipped.column, skipped.reason
                );
                outcome.skipped.push(skipped);
            }
        }
    }
    debug!(
        "Split produced {} of {} tiles",
        outcome.tiles.len(),
        outcome.expected
    );
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::NormalizedRect;
    use image::{Rgba, RgbaImage};
    use insta::assert_yaml_snapshot;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn gradient(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_fn(width, height, |x, y| {
            Rgba([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8, 255])
        }))
    }

    fn ok_rects(layout: Vec<Result<TileRect, SkippedTile>>) -> Vec<TileRect> {
        layout.into_iter().filter_map(Result::ok).collect()
    }

    #[test]
    fn test_three_by_three_scenario() {
        let img = gradient(1200, 900);
        let outcome = split_image(&img, &GridConfig::new(3, 3)).unwrap();

        assert!(outcome.is_complete());
        assert!(outcome.skipped.is_empty());
        for (i, tile) in outcome.tiles.iter().enumerate() {
            assert_eq!(tile.index, i);
            assert_eq!(tile.row, (i / 3) as u32);
            assert_eq!(tile.column, (i % 3) as u32);
            assert_eq!(tile.file_name, format!("Tile_{:02}", i + 1));
            assert!(tile.bitmap.width().abs_diff(400) <= 1);
            assert!(tile.bitmap.height().abs_diff(300) <= 1);
        }
    }

    #[test]
    fn test_layout_inline_snapshot() {
        let config = GridConfig::new(2, 2).with_divider(Axis::Column, 0, 0.25);
        let rects = ok_rects(tile_layout(100, 50, &config));
        assert_yaml_snapshot!(rects, @r###"
        - index: 0
          row: 0
          column: 0
          x: 0
          y: 0
          width: 25
          height: 25
        - index: 1
          row: 0
          column: 1
          x: 25
          y: 0
          width: 75
          height: 25
        - index: 2
          row: 1
          column: 0
          x: 0
          y: 25
          width: 25
          height: 25
        - index: 3
          row: 1
          column: 1
          x: 25
          y: 25
          width: 75
          height: 25
        "###);
    }

    #[test]
    fn test_drag_scenario_ratio() {
        let config = GridConfig::new(2, 1).drag_divider(Axis::Row, 0, 0.4);
        let rects = ok_rects(tile_layout(100, 1000, &config));
        assert_eq!(rects.len(), 2);
        let ratio = rects[0].height as f32 / rects[1].height as f32;
        assert!((ratio - 9.0).abs() < 0.2, "ratio was {ratio}");
        assert_eq!(rects[0].height + rects[1].height, 1000);
    }

    #[test]
    fn test_crossed_dividers_are_sorted_at_split() {
        let config = GridConfig::new(3, 1)
            .with_divider(Axis::Row, 0, 0.8)
            .with_divider(Axis::Row, 1, 0.2);
        let rects = ok_rects(tile_layout(10, 100, &config));
        let heights: Vec<u32> = rects.iter().map(|r| r.height).collect();
        assert_eq!(heights, vec![20, 60, 20]);
    }

    #[test]
    fn test_crop_bounds_offset_tiles() {
        let crop = NormalizedRect::new(0.5, 0.5, 1.0, 1.0).unwrap();
        let config = GridConfig::new(1, 2).with_crop_bounds(crop);
        let rects = ok_rects(tile_layout(200, 100, &config));
        assert_eq!(
            rects
                .iter()
                .map(|r| (r.x, r.y, r.width, r.height))
                .collect::<Vec<_>>(),
            vec![(100, 50, 50, 50), (150, 50, 50, 50)]
        );
    }

    #[test]
    fn test_tiles_copy_source_pixels() {
        let img = gradient(40, 20);
        let outcome = split_image(&img, &GridConfig::new(2, 2)).unwrap();
        let last = &outcome.tiles[3];
        assert_eq!(last.bitmap.get_pixel(0, 0), img.get_pixel(20, 10));
        assert_eq!(last.bitmap, last.original_bitmap);
    }

    #[test]
    fn test_dividers_at_the_edge_report_missing_boundaries() {
        // With a 40px span the gap is 0.05, so dividers at 0.95 are dropped.
        let config = GridConfig::new(1, 3)
            .with_divider(Axis::Column, 0, 1.0)
            .with_divider(Axis::Column, 1, 1.0);
        let outcome = split_image(&gradient(40, 40), &config).unwrap();
        assert!(!outcome.is_complete());
        assert_eq!(outcome.tiles.len(), 1);
        assert_eq!(outcome.tiles[0].bitmap.width(), 40);
        assert_eq!(
            outcome
                .skipped
                .iter()
                .map(|s| (s.index, s.reason.clone()))
                .collect::<Vec<_>>(),
            vec![
                (1, TileSkipReason::MissingBoundary),
                (2, TileSkipReason::MissingBoundary),
            ]
        );
    }

    #[test]
    fn test_tiny_crop_produces_one_pixel_tiles() {
        let crop = NormalizedRect::new(0.0, 0.0, 0.001, 0.001).unwrap();
        let config = GridConfig::new(2, 2).with_crop_bounds(crop);
        let outcome = split_image(&gradient(100, 100), &config).unwrap();
        for tile in &outcome.tiles {
            assert!(tile.bitmap.width() >= 1);
            assert!(tile.bitmap.height() >= 1);
        }
    }

    #[test]
    fn test_empty_source_is_rejected() {
        let img = DynamicImage::ImageRgba8(RgbaImage::new(0, 10));
        let err = split_image(&img, &GridConfig::default()).unwrap_err();
        assert!(matches!(
            err,
            SplitError::InvalidDimensions {
                width: 0,
                height: 10
            }
        ));
    }

    #[test]
    fn test_extract_rejects_out_of_bounds() {
        let img = gradient(10, 10);
        let rect = TileRect {
            index: 0,
            row: 0,
            column: 0,
            x: 8,
            y: 0,
            width: 5,
            height: 5,
        };
        assert!(matches!(
            extract_tile(&img, &rect),
            Err(TileSkipReason::OutOfBounds { x: 8, .. })
        ));
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let img = gradient(97, 61);
        let config = GridConfig::new(4, 5).with_divider(Axis::Row, 1, 0.3);
        let sequential = split_image_with_config(&img, &config, &SplitterConfig::new(false)).unwrap();
        let parallel = split_image_with_config(&img, &config, &SplitterConfig::new(true)).unwrap();
        assert_eq!(sequential.tiles, parallel.tiles);
    }

    #[test]
    fn test_rect_conversion() {
        let tile = TileRect {
            index: 0,
            row: 0,
            column: 0,
            x: 3,
            y: 4,
            width: 5,
            height: 6,
        };
        let rect = Rect::from(&tile);
        assert_eq!((rect.left(), rect.top()), (3, 4));
        assert_eq!((rect.width(), rect.height()), (5, 6));
    }

    proptest! {
        #[test]
        fn test_layout_covers_crop_region(
            width in 40..400u32,
            height in 40..400u32,
            rows in 1..=10u32,
            columns in 1..=10u32,
            drags in prop::collection::vec((0..9usize, 0.0f32..1.0), 0..6),
        ) {
            let mut config = GridConfig::new(rows, columns);
            for (i, (index, position)) in drags.into_iter().enumerate() {
                let axis = if i % 2 == 0 { Axis::Row } else { Axis::Column };
                config = config.with_divider(axis, index, position);
            }
            let layout = tile_layout(width, height, &config);
            prop_assert_eq!(layout.len(), config.tile_count());
            let (crop_x, crop_y, crop_w, crop_h) = crop_region(width, height, &config);

            if layout.iter().all(Result::is_ok) {
                let rects = ok_rects(layout);
                for (i, rect) in rects.iter().enumerate() {
                    prop_assert_eq!(rect.index, i);
                    prop_assert!(rect.width >= 1 && rect.height >= 1);
                    prop_assert!(rect.x + rect.width <= width);
                    prop_assert!(rect.y + rect.height <= height);
                }
                // Each row of tiles spans the crop width, each column the crop height.
                for row in 0..rows {
                    let row_rects: Vec<_> = rects.iter().filter(|r| r.row == row).collect();
                    prop_assert_eq!(row_rects[0].x, crop_x);
                    for pair in row_rects.windows(2) {
                        prop_assert_eq!(pair[0].x + pair[0].width, pair[1].x);
                    }
                    let total: u32 = row_rects.iter().map(|r| r.width).sum();
                    prop_assert_eq!(total, crop_w);
                }
                for column in 0..columns {
                    let col_rects: Vec<_> = rects.iter().filter(|r| r.column == column).collect();
                    prop_assert_eq!(col_rects[0].y, crop_y);
                    for pair in col_rects.windows(2) {
                        prop_assert_eq!(pair[0].y + pair[0].height, pair[1].y);
                    }
                    let total: u32 = col_rects.iter().map(|r| r.height).sum();
                    prop_assert_eq!(total, crop_h);
                }
            }
        }
    }
}
