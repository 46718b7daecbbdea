//! Criterion benchmarks for scalerim critical paths
//!
//! Benchmarks the in-process image stages around the external scaler:
//! - Padding: centering a sprite on a doubled transparent canvas
//! - Cropping: planning and cutting the padding back off a scaled image
//! - Nearest-neighbor scaling (the pxscale stand-in)

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use image::{Rgba, RgbaImage};
use scalerim::geometry::{plan_crop, CropTopAxis};
use scalerim::output::scale_image;
use scalerim::pipeline::{crop_scaled, pad_image};

/// Generate a sprite with a checkerboard of opaque and clear pixels
fn make_sprite(width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_fn(width, height, |x, y| {
        if (x + y) % 2 == 0 {
            Rgba([(x % 256) as u8, (y % 256) as u8, 128, 255])
        } else {
            Rgba([0, 0, 0, 0])
        }
    })
}

fn bench_pad(c: &mut Criterion) {
    let mut group = c.benchmark_group("pad");

    for size in [16u32, 32, 64, 256].iter() {
        let sprite = make_sprite(*size, *size);
        group.throughput(Throughput::Elements((*size * *size) as u64));
        group.bench_with_input(
            BenchmarkId::new("pad_image", format!("{}x{}", size, size)),
            &sprite,
            |b, sprite| b.iter(|| pad_image(black_box(sprite))),
        );
    }

    group.finish();
}

fn bench_crop(c: &mut Criterion) {
    let mut group = c.benchmark_group("crop");

    for (size, factor) in [(16u32, 4u32), (64, 4), (64, 8)].iter() {
        let padded = pad_image(&make_sprite(*size, *size)).expect("sprite is non-empty");
        let scaled = scale_image(padded, *factor);
        let dims = scaled.dimensions();

        group.throughput(Throughput::Elements((dims.0 * dims.1) as u64));
        group.bench_with_input(
            BenchmarkId::new("plan_and_crop", format!("{}x{}@{}x", size, size, factor)),
            &scaled,
            |b, scaled| {
                b.iter(|| {
                    let plan = plan_crop((*size, *size), dims, black_box(2), CropTopAxis::Width)
                        .expect("valid crop");
                    crop_scaled(black_box(scaled), plan.rect)
                })
            },
        );
    }

    group.finish();
}

fn bench_scale(c: &mut Criterion) {
    let mut group = c.benchmark_group("scale");

    for factor in [2u32, 4].iter() {
        let sprite = make_sprite(64, 64);
        group.bench_with_input(BenchmarkId::new("nearest", factor), &sprite, |b, sprite| {
            b.iter(|| scale_image(black_box(sprite.clone()), *factor))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_pad, bench_crop, bench_scale);
criterion_main!(benches);
