use gridsplit::*;
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use insta::assert_yaml_snapshot;
use pretty_assertions::assert_eq;
use std::fs;
use std::io::{Cursor, Read};
use tempfile::tempdir;

fn photo(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgba8(RgbaImage::from_fn(width, height, |x, y| {
        Rgba([(x % 251) as u8, (y % 241) as u8, ((x + y) % 239) as u8, 255])
    }))
}

fn png_bytes(image: &DynamicImage) -> Vec<u8> {
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    bytes
}

#[test]
fn split_3x3_on_1200x900() {
    let config = GridConfig::default().with_preset(GridPreset::Grid3x3);
    let outcome = split_image(&photo(1200, 900), &config).unwrap();
    assert!(outcome.is_complete());
    assert!(outcome.skipped.is_empty());
    for tile in &outcome.tiles {
        assert_eq!((tile.bitmap.width(), tile.bitmap.height()), (400, 300));
        assert_eq!(tile.index, (tile.row * 3 + tile.column) as usize);
    }
    let names: Vec<_> = outcome.tiles.iter().map(|t| t.file_name.as_str()).collect();
    assert_yaml_snapshot!(names, @r###"
    - Tile_01
    - Tile_02
    - Tile_03
    - Tile_04
    - Tile_05
    - Tile_06
    - Tile_07
    - Tile_08
    - Tile_09
    "###);
}

#[test]
fn dragged_divider_changes_tile_ratio() {
    let mut session = SplitSession::new();
    session.load_source(photo(100, 200));
    session.handle(SessionEvent::SetRows(2)).unwrap();
    session.handle(SessionEvent::SetColumns(1)).unwrap();
    session
        .handle(SessionEvent::SetDivider {
            axis: Axis::Row,
            index: 0,
            position: 0.9,
        })
        .unwrap();
    session.handle(SessionEvent::Split).unwrap();

    let heights: Vec<u32> = session.tiles().iter().map(|t| t.bitmap.height()).collect();
    assert_eq!(heights.len(), 2);
    assert_eq!(heights[0] + heights[1], 200);
    assert!((179..=180).contains(&heights[0]), "top tile {}", heights[0]);
}

#[test]
fn crossed_dividers_still_cover_the_crop() {
    let config = GridConfig::new(4, 1)
        .with_divider(Axis::Row, 0, 0.8)
        .with_divider(Axis::Row, 2, 0.2);
    let outcome = split_image(&photo(50, 400), &config).unwrap();
    assert!(outcome.is_complete());
    let total: u32 = outcome.tiles.iter().map(|t| t.bitmap.height()).sum();
    assert_eq!(total, 400);
    assert!(outcome.tiles.iter().all(|t| t.bitmap.height() >= 1));
}

#[test]
fn zip_and_individual_exports_carry_identical_payloads() {
    let mut session = SplitSession::new();
    session
        .handle(SessionEvent::LoadSourceBytes(png_bytes(&photo(240, 160))))
        .unwrap();
    session
        .handle(SessionEvent::SelectPreset(GridPreset::Grid4x4))
        .unwrap();
    session.handle(SessionEvent::Split).unwrap();
    session
        .handle(SessionEvent::RenameBoth {
            scope: NamingScope::All,
            prefix: "cat".to_string(),
            suffix: "happy".to_string(),
        })
        .unwrap();
    session
        .handle(SessionEvent::SetExportFormat(ExportFormat::Jpg))
        .unwrap();

    let files_dir = tempdir().unwrap();
    let report = session.export_to_dir(files_dir.path()).unwrap();
    assert_eq!(report.files.len(), 16);

    session.handle(SessionEvent::SetCompressAsZip(true)).unwrap();
    let zip_dir = tempdir().unwrap();
    let zip_report = session.export_to_dir(zip_dir.path()).unwrap();
    assert_eq!(zip_report.files.len(), 1);

    let archive_bytes = fs::read(&zip_report.files[0]).unwrap();
    let mut archive = zip::ZipArchive::new(Cursor::new(archive_bytes)).unwrap();
    assert_eq!(archive.len(), 16);
    for (i, path) in report.files.iter().enumerate() {
        let mut entry = archive.by_index(i).unwrap();
        let expected_name = path.file_name().unwrap().to_string_lossy();
        assert_eq!(entry.name(), expected_name);
        let mut bytes = Vec::new();
        entry.read_to_end(&mut bytes).unwrap();
        assert_eq!(bytes, fs::read(path).unwrap());
    }
    assert_eq!(
        report.files[0].file_name().unwrap().to_string_lossy(),
        "cat_happy_01.jpg"
    );
}

#[test]
fn edited_tile_is_exported_as_edited() {
    let mut session = SplitSession::new();
    session.load_source(photo(200, 100));
    session.handle(SessionEvent::SetRows(1)).unwrap();
    session.handle(SessionEvent::SetColumns(2)).unwrap();
    session.handle(SessionEvent::Split).unwrap();
    session.handle(SessionEvent::SelectTile(1)).unwrap();
    session
        .handle(SessionEvent::EditTile(
            TileEditParams {
                rotation: Rotation::Deg90,
                ..TileEditParams::default()
            }
            .with_crop(0.0, 0.0, 1.0, 0.5),
        ))
        .unwrap();

    let dir = tempdir().unwrap();
    let report = session.export_to_dir(dir.path()).unwrap();
    let first = image::open(&report.files[0]).unwrap();
    let second = image::open(&report.files[1]).unwrap();
    assert_eq!((first.width(), first.height()), (100, 100));
    assert_eq!((second.width(), second.height()), (100, 50));
}

#[test]
fn remembered_names_survive_sessions() {
    let dir = tempdir().unwrap();
    let names_path = dir.path().join("names.txt");

    let mut session = SplitSession::with_store(FileNameStore::new(&names_path));
    session
        .handle(SessionEvent::SavePrefix("robot".to_string()))
        .unwrap();
    session
        .handle(SessionEvent::SaveSuffix("beep".to_string()))
        .unwrap();

    let reopened = SplitSession::with_store(FileNameStore::new(&names_path));
    let names = reopened.export().names();
    assert!(names.prefixes().iter().any(|p| p == "robot"));
    assert!(names.suffixes().iter().any(|s| s == "beep"));
    assert!(names.prefixes().iter().any(|p| p == "sticker"));
}

#[test]
fn undo_then_new_edit_drops_redo() {
    let mut session = SplitSession::new();
    session.load_source(photo(10, 10));
    session.handle(SessionEvent::SetRows(2)).unwrap();
    session.handle(SessionEvent::SetRows(3)).unwrap();
    session.handle(SessionEvent::Undo).unwrap();
    assert_eq!(session.config().rows(), 2);
    assert!(session.history().can_redo());

    session.handle(SessionEvent::SetColumns(2)).unwrap();
    assert!(!session.history().can_redo());
    session.handle(SessionEvent::Redo).unwrap();
    assert_eq!(session.config().columns(), 2);
}
