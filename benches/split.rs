use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use gridsplit::{
    build_artifacts, sanitize_dividers, split_image, split_image_with_config, ExportConfig,
    ExportFormat, GridConfig, GridPreset, SplitterConfig,
};
use image::{DynamicImage, Rgb, RgbImage};
use std::hint::black_box;

// Noisy photo-like source so encoders do real work
fn create_test_image(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
        let noise = rand::random::<u8>() / 8;
        Rgb([
            ((x * 255 / width.max(1)) as u8).saturating_add(noise),
            ((y * 255 / height.max(1)) as u8).saturating_add(noise),
            noise,
        ])
    }))
}

fn bench_image_sizes(c: &mut Criterion) {
    let mut group = c.benchmark_group("split_sizes");
    let sizes = [(400, 300), (1200, 900), (4000, 3000)];

    for &(width, height) in sizes.iter() {
        let img = create_test_image(width, height);
        let config = GridConfig::default();

        group.bench_with_input(
            BenchmarkId::new("size", format!("{}x{}", width, height)),
            &img,
            |b, img| {
                b.iter(|| black_box(split_image(img, &config).unwrap()));
            },
        );
    }
    group.finish();
}

fn bench_presets(c: &mut Criterion) {
    let mut group = c.benchmark_group("split_presets");
    let img = create_test_image(2000, 2000);

    for preset in GridPreset::CONCRETE {
        let config = GridConfig::default().with_preset(preset);
        group.bench_with_input(
            BenchmarkId::new("preset", format!("{:?}", preset)),
            &img,
            |b, img| {
                b.iter(|| black_box(split_image(img, &config).unwrap()));
            },
        );
    }
    group.finish();
}

fn bench_parallel_split(c: &mut Criterion) {
    let mut group = c.benchmark_group("split_parallel_vs_sequential");
    let img = create_test_image(4000, 3000);
    let config = GridConfig::new(10, 10);

    for (name, enable_parallel) in [("sequential", false), ("parallel", true)] {
        let splitter = SplitterConfig::new(enable_parallel);
        group.bench_with_input(BenchmarkId::new(name, "10x10"), &img, |b, img| {
            b.iter(|| black_box(split_image_with_config(img, &config, &splitter).unwrap()));
        });
    }
    group.finish();
}

fn bench_sanitize(c: &mut Criterion) {
    let crossed = [0.9, 0.1, 0.5, 0.5, 0.95, 0.05, 0.3, 0.3, 0.7];
    c.bench_function("sanitize_crossed_dividers", |b| {
        b.iter(|| black_box(sanitize_dividers(black_box(&crossed), 0.002)));
    });
}

fn bench_export(c: &mut Criterion) {
    let mut group = c.benchmark_group("export");
    let img = create_test_image(1200, 900);
    let tiles = split_image(&img, &GridConfig::new(3, 3)).unwrap().tiles;

    let configs = [
        ("png", ExportConfig::new(ExportFormat::Png, false)),
        ("jpg", ExportConfig::new(ExportFormat::Jpg, false)),
        ("png_zip", ExportConfig::new(ExportFormat::Png, true)),
        (
            "png_parallel",
            ExportConfig {
                enable_parallel: true,
                ..ExportConfig::new(ExportFormat::Png, false)
            },
        ),
    ];
    for (name, config) in configs {
        let config = ExportConfig {
            archive_name: Some("bench.zip".to_string()),
            ..config
        };
        group.bench_with_input(BenchmarkId::new("format", name), &tiles, |b, tiles| {
            b.iter(|| black_box(build_artifacts(tiles, &config).unwrap()));
        });
    }
    group.finish();
}

criterion_group! {
    name = benches;
    config = Criterion::default().sample_size(20);
    targets = bench_image_sizes, bench_presets, bench_parallel_split, bench_sanitize, bench_export
}
criterion_main!(benches);
