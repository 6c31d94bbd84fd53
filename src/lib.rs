//! Splits an image into an adjustable grid of tiles, lets each tile be
//! cropped, rotated and flipped, and exports the tiles as named PNG or JPEG
//! files or as one zip archive.
//!
//! It uses the `image` crate for decoding, cropping and encoding, `rayon` for
//! optional parallel slicing and encoding, and `zip` for archives.
//!
//! # Example
//! ```
//! use gridsplit::{split_image, GridConfig};
//! use image::{DynamicImage, RgbaImage};
//!
//! let img = DynamicImage::ImageRgba8(RgbaImage::new(1200, 900));
//! let outcome = split_image(&img, &GridConfig::new(3, 3)).unwrap();
//!
//! assert_eq!(outcome.tiles.len(), 9);
//! assert_eq!(outcome.tiles[4].file_name, "Tile_05");
//! assert_eq!(outcome.tiles[4].bitmap.width(), 400);
//! ```

/// Grid geometry: rows, columns, crop bounds and divider positions.
pub mod grid;

/// Undo/redo stacks.
pub mod history;

/// Slicing a source image into tiles.
pub mod splitter;

/// Tiles and the crop/rotate/flip pipeline applied to them.
pub mod tile;

/// Naming, encoding and packaging of tiles.
pub mod export;

/// The interactive editing session.
pub mod session;

use thiserror::Error;

pub use export::naming::{compose_name, file_name_component, NameField, NameParts, NamingScope};
pub use export::store::{FileNameStore, MemoryNameStore, NameHistory, NameStore};
pub use export::{
    build_archive, build_artifacts, encode_tile, encode_tiles, export_to_dir, ExportArtifact,
    ExportConfig, ExportError, ExportFormat, ExportManager, ExportReport,
};
pub use grid::{
    min_gap_for_span, sanitize_dividers, sanitize_sorted_dividers, Axis, Dividers, GridConfig,
    GridPreset, NormalizedRect, MAX_GRID_LINES,
};
pub use history::EditHistory;
pub use session::{SessionError, SessionEvent, SplitSession};
pub use splitter::{
    crop_region, extract_tile, split_image, split_image_with_config, tile_layout, SkippedTile,
    SplitOutcome, SplitterConfig, TileRect, TileSkipReason,
};
pub use tile::{apply_edit, default_tile_name, EditError, Rotation, SplitTile, TileEditParams};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SplitError {
    #[error("Invalid image dimensions: width={width}, height={height}")]
    InvalidDimensions { width: u32, height: u32 },
}
