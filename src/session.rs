//! The editing session: one source image, its grid, the tiles cut from it and
//! the export settings, driven by [`SessionEvent`]s.

use crate::export::naming::{NameField, NamingScope};
use crate::export::store::{MemoryNameStore, NameStore};
use crate::export::{ExportArtifact, ExportConfig, ExportError, ExportFormat, ExportManager, ExportReport};
use crate::grid::{Axis, GridConfig, GridPreset, NormalizedRect};
use crate::history::EditHistory;
use crate::splitter::{split_image_with_config, SkippedTile, SplitterConfig};
use crate::tile::{SplitTile, TileEditParams};
use crate::SplitError;
use image::DynamicImage;
use std::path::Path;
use thiserror::Error;
use tracing::*;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("No source image is loaded")]
    NoSourceImage,

    #[error("There are no tiles, split the image first")]
    NoTiles,

    #[error("Tile position {position} is out of range ({count} tiles)")]
    TileOutOfRange { position: usize, count: usize },

    #[error("Failed to decode source image: {0}")]
    Decode(#[source] image::ImageError),

    #[error(transparent)]
    Split(#[from] SplitError),

    #[error(transparent)]
    Export(#[from] ExportError),
}

/// Everything a host can ask a session to do, short of writing files.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// Replaces the source with an already decoded image.
    LoadSource(DynamicImage),
    /// Decodes and replaces the source. A decode failure changes nothing.
    LoadSourceBytes(Vec<u8>),
    SelectPreset(GridPreset),
    SetRows(u32),
    SetColumns(u32),
    SetCropBounds(NormalizedRect),
    /// Moves one divider to an absolute position as a single undoable step.
    SetDivider { axis: Axis, index: usize, position: f32 },
    /// Starts a drag gesture on one divider. Records one undo checkpoint.
    BeginDrag { axis: Axis, index: usize },
    /// Moves the dragged divider by a normalized delta.
    Drag { delta: f32 },
    EndDrag,
    Undo,
    Redo,
    /// Even dividers and full crop, keeping rows and columns.
    ResetGrid,
    Split,
    SelectTile(usize),
    SetTileOffset { x: f32, y: f32 },
    SetTileScale(f32),
    EditTile(TileEditParams),
    /// Quarter turn clockwise on the selected tile's current params.
    RotateTile,
    ResetTile,
    ResetAllTiles,
    SetExportFormat(ExportFormat),
    SetCompressAsZip(bool),
    SetPrefix(String),
    SetSuffix(String),
    Rename {
        scope: NamingScope,
        field: NameField,
        value: String,
    },
    RenameBoth {
        scope: NamingScope,
        prefix: String,
        suffix: String,
    },
    SavePrefix(String),
    SaveSuffix(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct DragState {
    axis: Axis,
    index: usize,
}

/// Session state.
///
/// # Example
/// ```
/// use gridsplit::{GridPreset, SessionEvent, SplitSession};
/// use image::{DynamicImage, RgbaImage};
///
/// let mut session = SplitSession::new();
/// session.handle(SessionEvent::LoadSource(DynamicImage::ImageRgba8(RgbaImage::new(300, 300)))).unwrap();
/// session.handle(SessionEvent::SelectPreset(GridPreset::Grid3x3)).unwrap();
/// session.handle(SessionEvent::Split).unwrap();
/// assert_eq!(session.tiles().len(), 9);
/// ```
#[derive(Debug)]
pub struct SplitSession<S = MemoryNameStore> {
    source: Option<DynamicImage>,
    config: GridConfig,
    history: EditHistory<GridConfig>,
    drag: Option<DragState>,
    splitter: SplitterConfig,
    tiles: Vec<SplitTile>,
    skipped: Vec<SkippedTile>,
    selected: Option<usize>,
    export: ExportManager<S>,
}

impl SplitSession<MemoryNameStore> {
    pub fn new() -> Self {
        Self::with_store(MemoryNameStore::new())
    }
}

impl Default for SplitSession<MemoryNameStore> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: NameStore> SplitSession<S> {
    pub fn with_store(store: S) -> Self {
        Self {
            source: None,
            config: GridConfig::default(),
            history: EditHistory::new(),
            drag: None,
            splitter: SplitterConfig::default(),
            tiles: Vec::new(),
            skipped: Vec::new(),
            selected: None,
            export: ExportManager::new(store),
        }
    }

    pub fn with_splitter_config(self, splitter: SplitterConfig) -> Self {
        Self { splitter, ..self }
    }

    pub fn with_export_config(mut self, config: ExportConfig) -> Self {
        *self.export.config_mut() = config;
        self
    }

    pub fn source(&self) -> Option<&DynamicImage> {
        self.source.as_ref()
    }

    pub fn config(&self) -> &GridConfig {
        &self.config
    }

    pub fn history(&self) -> &EditHistory<GridConfig> {
        &self.history
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    pub fn tiles(&self) -> &[SplitTile] {
        &self.tiles
    }

    /// Grid cells the last split could not produce.
    pub fn skipped(&self) -> &[SkippedTile] {
        &self.skipped
    }

    pub fn selected_position(&self) -> Option<usize> {
        self.selected
    }

    pub fn selected_tile(&self) -> Option<&SplitTile> {
        self.selected.and_then(|i| self.tiles.get(i))
    }

    pub fn export(&self) -> &ExportManager<S> {
        &self.export
    }

    /// Applies one event.
    pub fn handle(&mut self, event: SessionEvent) -> Result<(), SessionError> {
        trace!("Session event: {:?}", event);
        match event {
            SessionEvent::LoadSource(image) => self.load_source(image),
            SessionEvent::LoadSourceBytes(bytes) => return self.load_source_bytes(&bytes),
            SessionEvent::SelectPreset(preset) => {
                self.update_config(|c| c.with_preset(preset));
            }
            SessionEvent::SetRows(rows) => self.update_config(|c| c.with_rows(rows)),
            SessionEvent::SetColumns(columns) => self.update_config(|c| c.with_columns(columns)),
            SessionEvent::SetCropBounds(bounds) => {
                self.update_config(|c| c.with_crop_bounds(bounds));
            }
            SessionEvent::SetDivider {
                axis,
                index,
                position,
            } => self.set_divider(axis, index, position),
            SessionEvent::BeginDrag { axis, index } => self.begin_drag(axis, index),
            SessionEvent::Drag { delta } => self.drag(delta),
            SessionEvent::EndDrag => self.end_drag(),
            SessionEvent::Undo => self.undo(),
            SessionEvent::Redo => self.redo(),
            SessionEvent::ResetGrid => self.update_config(GridConfig::with_even_dividers),
            SessionEvent::Split => {
                self.split()?;
            }
            SessionEvent::SelectTile(position) => return self.select_tile(position),
            SessionEvent::SetTileOffset { x, y } => {
                self.selected_tile_mut()?.set_offset(x, y);
            }
            SessionEvent::SetTileScale(scale) => self.selected_tile_mut()?.set_scale(scale),
            SessionEvent::EditTile(params) => self.selected_tile_mut()?.apply_edit(params),
            SessionEvent::RotateTile => {
                let tile = self.selected_tile_mut()?;
                let params = tile.edit_params.rotate_clockwise();
                tile.apply_edit(params);
            }
            SessionEvent::ResetTile => self.selected_tile_mut()?.reset(),
            SessionEvent::ResetAllTiles => {
                self.tiles.iter_mut().for_each(SplitTile::reset);
            }
            SessionEvent::SetExportFormat(format) => self.export.set_format(format),
            SessionEvent::SetCompressAsZip(zip) => self.export.set_compress_as_zip(zip),
            SessionEvent::SetPrefix(prefix) => self.export.set_prefix(&prefix),
            SessionEvent::SetSuffix(suffix) => self.export.set_suffix(&suffix),
            SessionEvent::Rename {
                scope,
                field,
                value,
            } => {
                self.export.rename(&mut self.tiles, scope, field, &value);
            }
            SessionEvent::RenameBoth {
                scope,
                prefix,
                suffix,
            } => {
                self.export.rename_both(&mut self.tiles, scope, &prefix, &suffix);
            }
            SessionEvent::SavePrefix(prefix) => {
                self.export.save_prefix(&prefix)?;
            }
            SessionEvent::SaveSuffix(suffix) => {
                self.export.save_suffix(&suffix)?;
            }
        }
        Ok(())
    }

    /// Replaces the source image. History, tiles and any drag are dropped;
    /// the grid is kept.
    pub fn load_source(&mut self, image: DynamicImage) {
        info!("Loaded source image {}x{}", image.width(), image.height());
        self.source = Some(image);
        self.history.clear();
        self.drag = None;
        self.clear_tiles();
    }

    pub fn load_source_bytes(&mut self, bytes: &[u8]) -> Result<(), SessionError> {
        let image = image::load_from_memory(bytes).map_err(|e| {
            warn!("Could not decode source image: {}", e);
            SessionError::Decode(e)
        })?;
        self.load_source(image);
        Ok(())
    }

    /// Replaces the grid with `f(grid)` as one undoable step. A change that
    /// leaves the grid as it was records nothing.
    fn update_config(&mut self, f: impl FnOnce(GridConfig) -> GridConfig) {
        let next = f(self.config.clone());
        if next == self.config {
            return;
        }
        self.history.record_checkpoint(self.config.clone());
        self.config = next;
    }

    pub fn set_divider(&mut self, axis: Axis, index: usize, position: f32) {
        self.update_config(|c| c.with_divider(axis, index, position));
    }

    /// Starts dragging a divider. An index with no divider is ignored.
    pub fn begin_drag(&mut self, axis: Axis, index: usize) {
        if index >= self.config.dividers(axis).len() {
            debug!("No {:?} divider {} to drag", axis, index);
            return;
        }
        // A repeated begin retargets the gesture already recorded.
        if self.drag.is_none() {
            self.history.record_checkpoint(self.config.clone());
        }
        self.drag = Some(DragState { axis, index });
    }

    /// Moves the dragged divider. Without an active drag this does nothing.
    pub fn drag(&mut self, delta: f32) {
        let Some(DragState { axis, index }) = self.drag else {
            trace!("Drag delta {} without an active drag", delta);
            return;
        };
        self.config = self.config.clone().drag_divider(axis, index, delta);
    }

    pub fn end_drag(&mut self) {
        self.drag = None;
    }

    pub fn undo(&mut self) {
        self.drag = None;
        self.config = self.history.undo(self.config.clone());
    }

    pub fn redo(&mut self) {
        self.drag = None;
        self.config = self.history.redo(self.config.clone());
    }

    /// Splits the source along the current grid, replacing any previous
    /// tiles. Returns the number of tiles produced.
    pub fn split(&mut self) -> Result<usize, SessionError> {
        let source = self.source.as_ref().ok_or(SessionError::NoSourceImage)?;
        let outcome = split_image_with_config(source, &self.config, &self.splitter)?;
        if !outcome.is_complete() {
            warn!(
                "Split produced {} of {} tiles",
                outcome.tiles.len(),
                outcome.expected
            );
        }
        self.tiles = outcome.tiles;
        self.skipped = outcome.skipped;
        self.selected = if self.tiles.is_empty() { None } else { Some(0) };
        Ok(self.tiles.len())
    }

    pub fn select_tile(&mut self, position: usize) -> Result<(), SessionError> {
        if self.tiles.is_empty() {
            return Err(SessionError::NoTiles);
        }
        if position >= self.tiles.len() {
            return Err(SessionError::TileOutOfRange {
                position,
                count: self.tiles.len(),
            });
        }
        self.selected = Some(position);
        Ok(())
    }

    fn selected_tile_mut(&mut self) -> Result<&mut SplitTile, SessionError> {
        if self.tiles.is_empty() {
            return Err(SessionError::NoTiles);
        }
        let count = self.tiles.len();
        let position = self.selected.unwrap_or(0);
        self.tiles
            .get_mut(position)
            .ok_or(SessionError::TileOutOfRange { position, count })
    }

    fn clear_tiles(&mut self) {
        self.tiles.clear();
        self.skipped.clear();
        self.selected = None;
    }

    /// Encodes the tiles into in-memory artifacts.
    pub fn build_artifacts(&self) -> Result<Vec<ExportArtifact>, SessionError> {
        if self.tiles.is_empty() {
            return Err(SessionError::NoTiles);
        }
        Ok(self.export.build_artifacts(&self.tiles)?)
    }

    /// Encodes the tiles and writes them into `dir`.
    pub fn export_to_dir(&self, dir: impl AsRef<Path>) -> Result<ExportReport, SessionError> {
        if self.tiles.is_empty() {
            return Err(SessionError::NoTiles);
        }
        Ok(self.export.export_to_dir(&self.tiles, dir)?)
    }
}
