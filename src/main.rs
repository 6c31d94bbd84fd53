use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use gridsplit::{
    Axis, ExportConfig, ExportFormat, FileNameStore, MemoryNameStore, NameField, NameStore,
    NamingScope, NormalizedRect, Rotation, SessionEvent, SplitSession, SplitterConfig,
    TileEditParams,
};
use std::fs;
use std::path::PathBuf;
use tracing::*;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "gridsplit", version, about = "Split an image into a grid of tiles")]
struct Cli {
    /// Source image.
    image: PathBuf,

    #[arg(short, long, default_value_t = 4)]
    rows: u32,

    #[arg(short, long, default_value_t = 5)]
    columns: u32,

    /// Crop box as left,top,right,bottom in 0..1.
    #[arg(long, value_delimiter = ',')]
    crop: Option<Vec<f32>>,

    /// Row divider positions in 0..1, top to bottom.
    #[arg(long, value_delimiter = ',')]
    row_dividers: Vec<f32>,

    /// Column divider positions in 0..1, left to right.
    #[arg(long, value_delimiter = ',')]
    col_dividers: Vec<f32>,

    /// Clockwise rotation applied to every tile, a multiple of 90.
    #[arg(long, allow_negative_numbers = true)]
    rotate: Option<i32>,

    #[arg(long)]
    flip_horizontal: bool,

    #[arg(long)]
    flip_vertical: bool,

    #[arg(short, long, value_enum, default_value_t = FormatArg::Png)]
    format: FormatArg,

    #[arg(long, default_value_t = 90)]
    jpeg_quality: u8,

    /// Write one zip archive instead of individual files.
    #[arg(long)]
    zip: bool,

    /// Archive file name, defaults to Tiles_<millis>.zip.
    #[arg(long)]
    archive_name: Option<String>,

    /// File name prefix for every tile.
    #[arg(long)]
    prefix: Option<String>,

    /// File name suffix for every tile.
    #[arg(long)]
    suffix: Option<String>,

    /// Remember the prefix and suffix in this file.
    #[arg(long)]
    names_file: Option<PathBuf>,

    #[arg(short, long, default_value = "tiles")]
    output: PathBuf,

    /// Slice and encode tiles in parallel.
    #[arg(long)]
    parallel: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum FormatArg {
    Png,
    Jpg,
}

impl From<FormatArg> for ExportFormat {
    fn from(format: FormatArg) -> Self {
        match format {
            FormatArg::Png => ExportFormat::Png,
            FormatArg::Jpg => ExportFormat::Jpg,
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    match cli.names_file.clone() {
        Some(path) => run(cli, FileNameStore::new(path)),
        None => run(cli, MemoryNameStore::new()),
    }
}

fn run<S: NameStore>(cli: Cli, store: S) -> Result<()> {
    let export_config = ExportConfig {
        format: cli.format.into(),
        compress_as_zip: cli.zip,
        enable_parallel: cli.parallel,
        archive_name: cli.archive_name.clone(),
        ..ExportConfig::default()
    }
    .with_jpeg_quality(cli.jpeg_quality);

    let mut session = SplitSession::with_store(store)
        .with_splitter_config(SplitterConfig::new(cli.parallel))
        .with_export_config(export_config);

    let bytes = fs::read(&cli.image)
        .with_context(|| format!("Failed to read {}", cli.image.display()))?;
    session
        .handle(SessionEvent::LoadSourceBytes(bytes))
        .with_context(|| format!("Failed to open {}", cli.image.display()))?;

    configure_grid(&mut session, &cli)?;

    let count = session.split().context("Failed to split image")?;
    for skipped in session.skipped() {
        warn!(
            "Tile {} (row {}, column {}) skipped: {}",
            skipped.index + 1,
            skipped.row,
            skipped.column,
            skipped.reason
        );
    }
    info!("Split into {} tiles", count);

    edit_tiles(&mut session, &cli)?;
    name_tiles(&mut session, &cli)?;

    let report = session
        .export_to_dir(&cli.output)
        .context("Failed to export tiles")?;
    for file in &report.files {
        println!("{}", file.display());
    }
    Ok(())
}

fn configure_grid<S: NameStore>(session: &mut SplitSession<S>, cli: &Cli) -> Result<()> {
    session.handle(SessionEvent::SetRows(cli.rows))?;
    session.handle(SessionEvent::SetColumns(cli.columns))?;

    if let Some(crop) = &cli.crop {
        let [left, top, right, bottom] = crop.as_slice() else {
            bail!("--crop takes four values, got {}", crop.len());
        };
        let bounds = NormalizedRect::new(*left, *top, *right, *bottom)
            .context("--crop must satisfy 0 <= left < right <= 1 and 0 <= top < bottom <= 1")?;
        session.handle(SessionEvent::SetCropBounds(bounds))?;
    }

    for (axis, positions) in [(Axis::Row, &cli.row_dividers), (Axis::Column, &cli.col_dividers)] {
        let expected = session.config().dividers(axis).len();
        if !positions.is_empty() && positions.len() != expected {
            bail!(
                "Expected {} {:?} dividers, got {}",
                expected,
                axis,
                positions.len()
            );
        }
        for (index, &position) in positions.iter().enumerate() {
            session.handle(SessionEvent::SetDivider {
                axis,
                index,
                position,
            })?;
        }
    }
    debug!("Grid: {:?}", session.config());
    Ok(())
}

fn edit_tiles<S: NameStore>(session: &mut SplitSession<S>, cli: &Cli) -> Result<()> {
    let rotation = match cli.rotate {
        Some(degrees) => Rotation::from_degrees(degrees)?,
        None => Rotation::Deg0,
    };
    let params = TileEditParams {
        rotation,
        ..TileEditParams::default()
    }
    .with_flips(cli.flip_horizontal, cli.flip_vertical);
    if params.is_default() {
        return Ok(());
    }
    for position in 0..session.tiles().len() {
        session.handle(SessionEvent::SelectTile(position))?;
        session.handle(SessionEvent::EditTile(params))?;
    }
    Ok(())
}

fn name_tiles<S: NameStore>(session: &mut SplitSession<S>, cli: &Cli) -> Result<()> {
    match (&cli.prefix, &cli.suffix) {
        (Some(prefix), Some(suffix)) => {
            session.handle(SessionEvent::SetPrefix(prefix.clone()))?;
            session.handle(SessionEvent::SetSuffix(suffix.clone()))?;
            session.handle(SessionEvent::RenameBoth {
                scope: NamingScope::All,
                prefix: prefix.clone(),
                suffix: suffix.clone(),
            })?;
        }
        (Some(prefix), None) => {
            session.handle(SessionEvent::SetPrefix(prefix.clone()))?;
            session.handle(SessionEvent::Rename {
                scope: NamingScope::All,
                field: NameField::Prefix,
                value: prefix.clone(),
            })?;
        }
        (None, Some(suffix)) => {
            session.handle(SessionEvent::SetSuffix(suffix.clone()))?;
            session.handle(SessionEvent::Rename {
                scope: NamingScope::All,
                field: NameField::Suffix,
                value: suffix.clone(),
            })?;
        }
        (None, None) => return Ok(()),
    }
    if cli.names_file.is_some() {
        if let Some(prefix) = &cli.prefix {
            session.handle(SessionEvent::SavePrefix(prefix.clone()))?;
        }
        if let Some(suffix) = &cli.suffix {
            session.handle(SessionEvent::SaveSuffix(suffix.clone()))?;
        }
    }
    Ok(())
}
