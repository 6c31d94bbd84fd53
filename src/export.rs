//! Encoding, naming and packaging of split tiles.
//!
//! Tiles are encoded once by [`encode_tile`]. Individual files and zip
//! entries carry the same bytes, only the packaging differs.

pub mod naming;
pub mod store;

use crate::tile::SplitTile;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{DynamicImage, ExtendedColorType, ImageEncoder};
use naming::{
    file_name_component, rename_prefix, rename_suffix, scoped_tiles, NameField, NamingScope,
};
use rayon::prelude::*;
use std::fs;
use std::io::{self, Cursor, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use store::{NameHistory, NameStore};
use thiserror::Error;
use tracing::*;
use zip::write::FileOptions;
use zip::CompressionMethod;

pub const DEFAULT_PREFIX: &str = "sticker";
pub const DEFAULT_SUFFIX: &str = "happy";
pub const DEFAULT_JPEG_QUALITY: u8 = 90;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Failed to encode tile {name}: {source}")]
    Encode {
        name: String,
        #[source]
        source: image::ImageError,
    },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to build archive: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("Failed to save name history: {0}")]
    Store(#[source] io::Error),

    #[error("There are no tiles to export")]
    NoTiles,
}

/// Output image format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ExportFormat {
    #[default]
    Png,
    Jpg,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Png => "png",
            ExportFormat::Jpg => "jpg",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            ExportFormat::Png => "image/png",
            ExportFormat::Jpg => "image/jpeg",
        }
    }

    pub fn is_lossless(self) -> bool {
        matches!(self, ExportFormat::Png)
    }
}

/// Export settings.
///
/// # Example
/// ```
/// use gridsplit::{ExportConfig, ExportFormat};
///
/// let config = ExportConfig::default();
/// assert_eq!(config.format, ExportFormat::Png);
/// assert_eq!((config.prefix.as_str(), config.suffix.as_str()), ("sticker", "happy"));
/// assert!(!config.compress_as_zip);
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ExportConfig {
    pub format: ExportFormat,
    /// Session-wide prefix, used when a tile name carries none.
    pub prefix: String,
    /// Session-wide suffix, used when a tile name carries none.
    pub suffix: String,
    pub compress_as_zip: bool,
    /// JPEG quality, 1 to 100 (default: 90). Ignored for PNG.
    pub jpeg_quality: u8,
    /// Encode tiles on the rayon pool (default: false).
    pub enable_parallel: bool,
    /// Archive file name. `None` means `Tiles_{unix millis}.zip`.
    pub archive_name: Option<String>,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            format: ExportFormat::default(),
            prefix: DEFAULT_PREFIX.to_string(),
            suffix: DEFAULT_SUFFIX.to_string(),
            compress_as_zip: false,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            enable_parallel: false,
            archive_name: None,
        }
    }
}

impl ExportConfig {
    pub fn new(format: ExportFormat, compress_as_zip: bool) -> Self {
        Self {
            format,
            compress_as_zip,
            ..Self::default()
        }
    }

    pub fn with_jpeg_quality(self, quality: u8) -> Self {
        Self {
            jpeg_quality: quality.clamp(1, 100),
            ..self
        }
    }

    /// `{file_name}.{ext}` for a tile, with path separators replaced.
    pub fn file_name_for(&self, tile: &SplitTile) -> String {
        format!(
            "{}.{}",
            file_name_component(&tile.file_name),
            self.format.extension()
        )
    }
}

/// One output file held in memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportArtifact {
    /// File name including extension.
    pub name: String,
    pub bytes: Vec<u8>,
}

/// What was written by [`export_to_dir`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportReport {
    pub files: Vec<PathBuf>,
    pub tile_count: usize,
    pub total_bytes: u64,
}

/// Encodes one tile's displayed buffer.
///
/// PNG keeps the buffer's color type and bit depth; floating point buffers
/// are stored at 16 bits per channel. JPEG has no alpha, so non-grayscale
/// buffers are converted to 8-bit RGB first.
pub fn encode_tile(
    image: &DynamicImage,
    format: ExportFormat,
    jpeg_quality: u8,
) -> Result<Vec<u8>, image::ImageError> {
    let mut buf = Vec::new();
    match format {
        ExportFormat::Png => match image {
            DynamicImage::ImageRgb32F(_) => DynamicImage::ImageRgb16(image.to_rgb16())
                .write_with_encoder(PngEncoder::new(&mut buf))?,
            DynamicImage::ImageRgba32F(_) => DynamicImage::ImageRgba16(image.to_rgba16())
                .write_with_encoder(PngEncoder::new(&mut buf))?,
            other => other.write_with_encoder(PngEncoder::new(&mut buf))?,
        },
        ExportFormat::Jpg => {
            let encoder = JpegEncoder::new_with_quality(&mut buf, jpeg_quality.clamp(1, 100));
            match image {
                DynamicImage::ImageLuma8(luma) => encoder.write_image(
                    luma.as_raw(),
                    luma.width(),
                    luma.height(),
                    ExtendedColorType::L8,
                )?,
                other => {
                    let rgb = other.to_rgb8();
                    encoder.write_image(
                        rgb.as_raw(),
                        rgb.width(),
                        rgb.height(),
                        ExtendedColorType::Rgb8,
                    )?
                }
            }
        }
    }
    Ok(buf)
}

/// Encodes every tile as its own artifact, in tile order.
pub fn encode_tiles(
    tiles: &[SplitTile],
    config: &ExportConfig,
) -> Result<Vec<ExportArtifact>, ExportError> {
    let encode = |tile: &SplitTile| -> Result<ExportArtifact, ExportError> {
        let name = config.file_name_for(tile);
        let bytes = encode_tile(&tile.bitmap, config.format, config.jpeg_quality).map_err(
            |source| ExportError::Encode {
                name: name.clone(),
                source,
            },
        )?;
        trace!("Encoded {} ({} bytes)", name, bytes.len());
        Ok(ExportArtifact { name, bytes })
    };

    if config.enable_parallel {
        tiles.par_iter().map(encode).collect()
    } else {
        tiles.iter().map(encode).collect()
    }
}

/// Packs artifacts into one zip archive. Entries keep their order and are
/// deflate compressed.
pub fn build_archive(
    artifacts: &[ExportArtifact],
    archive_name: &str,
) -> Result<ExportArtifact, ExportError> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .unix_permissions(0o644);

    for artifact in artifacts {
        writer.start_file(artifact.name.as_str(), options)?;
        writer.write_all(&artifact.bytes)?;
    }
    let bytes = writer.finish()?.into_inner();
    debug!(
        "Built archive {} with {} entries ({} bytes)",
        archive_name,
        artifacts.len(),
        bytes.len()
    );
    Ok(ExportArtifact {
        name: archive_name.to_string(),
        bytes,
    })
}

/// `Tiles_{unix millis}.zip`.
pub fn default_archive_name() -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    format!("Tiles_{millis}.zip")
}

/// Builds the in-memory output: one artifact per tile, or a single archive
/// when `compress_as_zip` is set.
pub fn build_artifacts(
    tiles: &[SplitTile],
    config: &ExportConfig,
) -> Result<Vec<ExportArtifact>, ExportError> {
    if tiles.is_empty() {
        return Err(ExportError::NoTiles);
    }
    let artifacts = encode_tiles(tiles, config)?;
    if !config.compress_as_zip {
        return Ok(artifacts);
    }
    let archive_name = config
        .archive_name
        .as_deref()
        .map(file_name_component)
        .unwrap_or_else(default_archive_name);
    Ok(vec![build_archive(&artifacts, &archive_name)?])
}

/// Encodes the tiles and writes the result into `dir`, creating it if
/// needed.
///
/// The batch fails as a whole on the first error. Files already written are
/// left in place.
pub fn export_to_dir(
    tiles: &[SplitTile],
    config: &ExportConfig,
    dir: impl AsRef<Path>,
) -> Result<ExportReport, ExportError> {
    let dir = dir.as_ref();
    let artifacts = build_artifacts(tiles, config).inspect_err(|e| {
        error!("Export of {} tiles failed: {}", tiles.len(), e);
    })?;
    fs::create_dir_all(dir)?;

    let mut report = ExportReport {
        files: Vec::with_capacity(artifacts.len()),
        tile_count: tiles.len(),
        total_bytes: 0,
    };
    for artifact in &artifacts {
        let path = dir.join(&artifact.name);
        if let Err(e) = fs::write(&path, &artifact.bytes) {
            error!("Failed to write {}: {}", path.display(), e);
            return Err(e.into());
        }
        report.total_bytes += artifact.bytes.len() as u64;
        report.files.push(path);
    }
    info!(
        "Exported {} tiles as {} file(s) to {}",
        report.tile_count,
        report.files.len(),
        dir.display()
    );
    Ok(report)
}

/// Export settings plus the remembered prefix/suffix lists, with the naming
/// operations a host exposes.
///
/// # Example
/// ```
/// use gridsplit::{ExportManager, MemoryNameStore, SplitTile};
/// use image::{DynamicImage, RgbaImage};
///
/// let mut tiles: Vec<SplitTile> = (0..3)
///     .map(|i| SplitTile::new(i, 0, i as u32, DynamicImage::ImageRgba8(RgbaImage::new(2, 2))))
///     .collect();
///
/// let mut manager = ExportManager::new(MemoryNameStore::new());
/// manager.apply_naming_to_all(&mut tiles, "cat", "sad");
/// assert_eq!(tiles[2].file_name, "cat_sad_03");
/// ```
#[derive(Debug, Clone)]
pub struct ExportManager<S> {
    config: ExportConfig,
    names: NameHistory<S>,
}

impl<S: NameStore> ExportManager<S> {
    pub fn new(store: S) -> Self {
        Self::with_config(ExportConfig::default(), store)
    }

    pub fn with_config(config: ExportConfig, store: S) -> Self {
        Self {
            config,
            names: NameHistory::load(store),
        }
    }

    pub fn config(&self) -> &ExportConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut ExportConfig {
        &mut self.config
    }

    pub fn names(&self) -> &NameHistory<S> {
        &self.names
    }

    pub fn set_format(&mut self, format: ExportFormat) {
        self.config.format = format;
    }

    pub fn set_compress_as_zip(&mut self, compress_as_zip: bool) {
        self.config.compress_as_zip = compress_as_zip;
    }

    pub fn set_prefix(&mut self, prefix: &str) {
        self.config.prefix = prefix.to_string();
    }

    pub fn set_suffix(&mut self, suffix: &str) {
        self.config.suffix = suffix.to_string();
    }

    /// Remembers a prefix for later sessions.
    pub fn save_prefix(&mut self, prefix: &str) -> Result<bool, ExportError> {
        self.names.remember_prefix(prefix).map_err(ExportError::Store)
    }

    /// Remembers a suffix for later sessions.
    pub fn save_suffix(&mut self, suffix: &str) -> Result<bool, ExportError> {
        self.names.remember_suffix(suffix).map_err(ExportError::Store)
    }

    /// Rewrites one half of the name of every tile in `scope`, keeping the
    /// other half from each tile's current name. Returns how many tiles were
    /// renamed.
    pub fn rename(
        &self,
        tiles: &mut [SplitTile],
        scope: NamingScope,
        field: NameField,
        value: &str,
    ) -> usize {
        let selected = scoped_tiles(tiles, scope);
        for tile in selected.iter_mut() {
            match field {
                NameField::Prefix => rename_prefix(tile, value, &self.config.suffix),
                NameField::Suffix => rename_suffix(tile, value, &self.config.prefix),
            }
        }
        debug!("Renamed {:?} of {} tile(s) to {:?}", field, selected.len(), value);
        selected.len()
    }

    /// Rewrites the whole name of every tile in `scope`.
    pub fn rename_both(
        &self,
        tiles: &mut [SplitTile],
        scope: NamingScope,
        prefix: &str,
        suffix: &str,
    ) -> usize {
        let selected = scoped_tiles(tiles, scope);
        for tile in selected.iter_mut() {
            tile.file_name = naming::compose_name(prefix, suffix, tile.index);
        }
        selected.len()
    }

    pub fn update_prefix_for_tile(&self, tiles: &mut [SplitTile], position: usize, prefix: &str) {
        self.rename(tiles, NamingScope::Current(position), NameField::Prefix, prefix);
    }

    pub fn update_suffix_for_tile(&self, tiles: &mut [SplitTile], position: usize, suffix: &str) {
        self.rename(tiles, NamingScope::Current(position), NameField::Suffix, suffix);
    }

    pub fn apply_prefix_to_all(&self, tiles: &mut [SplitTile], prefix: &str) {
        self.rename(tiles, NamingScope::All, NameField::Prefix, prefix);
    }

    pub fn apply_suffix_to_all(&self, tiles: &mut [SplitTile], suffix: &str) {
        self.rename(tiles, NamingScope::All, NameField::Suffix, suffix);
    }

    pub fn apply_naming_to_all(&self, tiles: &mut [SplitTile], prefix: &str, suffix: &str) {
        self.rename_both(tiles, NamingScope::All, prefix, suffix);
    }

    pub fn apply_naming_to_current(
        &self,
        tiles: &mut [SplitTile],
        position: usize,
        prefix: &str,
        suffix: &str,
    ) {
        self.rename_both(tiles, NamingScope::Current(position), prefix, suffix);
    }

    pub fn build_artifacts(&self, tiles: &[SplitTile]) -> Result<Vec<ExportArtifact>, ExportError> {
        build_artifacts(tiles, &self.config)
    }

    pub fn export_to_dir(
        &self,
        tiles: &[SplitTile],
        dir: impl AsRef<Path>,
    ) -> Result<ExportReport, ExportError> {
        export_to_dir(tiles, &self.config, dir)
    }
}
