//! Benchmarks for the darkroom stage kernels.
//!
//! Run with: cargo bench -p darkroom-core

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use darkroom_core::{
    Config, EnhanceParams, ImageCodec, ImageKind, Raster, Region, StageSpec, WatermarkParams,
    WatermarkRegion,
};
use image::{DynamicImage, Rgb, RgbImage};

fn raster_from(image: DynamicImage) -> Raster {
    Raster {
        image,
        source_format: ImageKind::Png,
        output_format: ImageKind::Png,
        jpeg_quality: None,
    }
}

fn benchmark_enhance(c: &mut Criterion) {
    let img = RgbImage::from_fn(1920, 1080, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
    });
    let raster = raster_from(DynamicImage::ImageRgb8(img));
    let stage = StageSpec::Enhance(EnhanceParams {
        brightness: 12,
        contrast: 1.3,
        sharpen: 1.5,
    });

    c.bench_function("enhance_1080p", |b| {
        b.iter(|| {
            let _ = stage.apply(black_box(raster.clone()));
        })
    });
}

fn benchmark_watermark_fill(c: &mut Criterion) {
    let mut img = RgbImage::from_pixel(512, 512, Rgb([90, 120, 150]));
    for y in 400..460 {
        for x in 400..500 {
            img.put_pixel(x, y, Rgb([250, 250, 250]));
        }
    }
    let raster = raster_from(DynamicImage::ImageRgb8(img));
    let stage = StageSpec::RemoveWatermark(WatermarkParams {
        region: WatermarkRegion::Rect(Region {
            x: 400,
            y: 400,
            width: 100,
            height: 60,
        }),
        inpaint_radius: 3,
    });

    c.bench_function("watermark_fill_100x60", |b| {
        b.iter(|| {
            let _ = stage.apply(black_box(raster.clone()));
        })
    });
}

fn benchmark_watermark_auto(c: &mut Criterion) {
    let mut img = RgbImage::from_pixel(512, 512, Rgb([128, 128, 128]));
    for y in 420..470 {
        for x in 420..470 {
            let value = if (x + y) % 2 == 0 { 255 } else { 0 };
            img.put_pixel(x, y, Rgb([value, value, value]));
        }
    }
    let raster = raster_from(DynamicImage::ImageRgb8(img));
    let stage = StageSpec::RemoveWatermark(WatermarkParams::default());

    c.bench_function("watermark_detect_and_fill", |b| {
        b.iter(|| {
            let _ = stage.apply(black_box(raster.clone()));
        })
    });
}

fn benchmark_decode(c: &mut Criterion) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bench.png");
    let img = RgbImage::from_fn(1024, 768, |x, y| Rgb([(x % 256) as u8, (y % 256) as u8, 64]));
    img.save(&path).unwrap();

    let codec = ImageCodec::new(&Config::default());
    let rt = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("decode_1024x768_png", |b| {
        b.iter(|| {
            let _ = rt.block_on(codec.decode(black_box(&path)));
        })
    });
}

criterion_group!(
    benches,
    benchmark_enhance,
    benchmark_watermark_fill,
    benchmark_watermark_auto,
    benchmark_decode,
);
criterion_main!(benches);
