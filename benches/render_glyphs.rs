//! Glyph rendering benchmarks: one terminal-sized frame, monochrome vs color.
//! Run: cargo bench

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use glyphreel::frame::RgbFrame;
use glyphreel::geometry::{fit_glyph_grid, TerminalSize};
use glyphreel::glyph::render_frame;

fn gradient_frame(width: u32, height: u32) -> RgbFrame {
    let mut pixels = Vec::with_capacity((width * height * 3) as usize);
    for y in 0..height {
        for x in 0..width {
            pixels.push((x * 255 / width.max(1)) as u8);
            pixels.push((y * 255 / height.max(1)) as u8);
            pixels.push(((x + y) % 256) as u8);
        }
    }
    RgbFrame::new(width, height, pixels).expect("gradient frame")
}

fn bench_render_glyphs(c: &mut Criterion) {
    let terminal = TerminalSize {
        columns: 200,
        rows: 60,
    };
    let grid = fit_glyph_grid(1920, 1080, terminal).expect("grid");
    let frame = gradient_frame(grid.width, grid.height);

    let mut group = c.benchmark_group("render_glyphs");
    group.sample_size(50);

    group.bench_function("monochrome_1080p_on_200x60", |b| {
        b.iter(|| black_box(render_frame(black_box(&frame), false, 0)));
    });
    group.bench_function("color_1080p_on_200x60", |b| {
        b.iter(|| black_box(render_frame(black_box(&frame), true, 0)));
    });
    group.bench_function("rescale_1080p_to_grid", |b| {
        let source = gradient_frame(1920, 1080);
        b.iter(|| black_box(source.clone().rescale(grid).expect("rescale")));
    });

    group.finish();
}

criterion_group!(benches, bench_render_glyphs);
criterion_main!(benches);
