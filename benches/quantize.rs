use std::time::Duration;

use criterion::{
    criterion_group, criterion_main, measurement::WallTime, Bencher, BenchmarkId, Criterion,
    SamplingMode,
};
use palette::Srgb;
use pixelette::{remap, remap_par, FloydSteinberg, Palette, PixelGrid};
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoroshiro128PlusPlus;

fn random_colors(seed: u64, len: usize) -> Vec<Srgb<u8>> {
    let mut rng = Xoroshiro128PlusPlus::seed_from_u64(seed);
    (0..len)
        .map(|_| Srgb::new(rng.gen(), rng.gen(), rng.gen()))
        .collect()
}

fn benchmark_grids() -> Vec<(String, PixelGrid<Srgb<u8>>)> {
    [(256, 144), (640, 360), (1920, 1080)]
        .into_iter()
        .map(|(width, height)| {
            let pixels = (0..height)
                .flat_map(|y| {
                    (0..width).map(move |x| {
                        Srgb::new((x * 255 / width) as u8, (y * 255 / height) as u8, 128)
                    })
                })
                .collect();

            (
                format!("{width}x{height}"),
                PixelGrid::new(pixels, width, height).unwrap(),
            )
        })
        .collect()
}

fn bench(
    c: &mut Criterion,
    group: &str,
    mut f: impl FnMut(&mut Bencher<WallTime>, &(&Palette, &PixelGrid<Srgb<u8>>)),
) {
    let mut group = c.benchmark_group(group);
    group
        .sample_size(30)
        .noise_threshold(0.05)
        .sampling_mode(SamplingMode::Flat)
        .warm_up_time(Duration::from_secs(2));

    let grids = benchmark_grids();
    for k in [256, 64, 16] {
        let palette = Palette::new(random_colors(0, k)).unwrap();
        for (name, grid) in &grids {
            group.bench_with_input(
                BenchmarkId::new(k.to_string(), name),
                &(&palette, grid),
                &mut f,
            );
        }
    }
}

fn remap_single(c: &mut Criterion) {
    bench(c, "remap_single", |b, &(palette, grid)| b.iter(|| remap(grid, palette)));
}

fn remap_multi(c: &mut Criterion) {
    bench(c, "remap_par", |b, &(palette, grid)| b.iter(|| remap_par(grid, palette)));
}

fn dither_single(c: &mut Criterion) {
    bench(c, "dither_single", |b, &(palette, grid)| {
        b.iter(|| FloydSteinberg::new().dither(grid, palette))
    });
}

criterion_group!(benches, remap_single, remap_multi, dither_single);
criterion_main!(benches);
