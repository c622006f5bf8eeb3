use criterion::{black_box, criterion_group, criterion_main, Criterion};

use chalkmotion::i18n::Language;
use chalkmotion::renderer::RenderEngine;
use chalkmotion::storyboard::{self, Resolution, StoryboardKind};

fn bench_render_frame(c: &mut Criterion) {
    let board = storyboard::build(
        StoryboardKind::Pipeline,
        Language::En,
        42,
        Resolution::Named("1920x1080".into()),
        30,
    );
    let mut engine = RenderEngine::new(board, false);

    c.bench_function("render_frame_1080p", |b| {
        b.iter(|| {
            engine.render_frame(black_box(0)).unwrap();
        })
    });

    let board = storyboard::build(
        StoryboardKind::Clock,
        Language::En,
        42,
        Resolution::Named("1280x720".into()),
        30,
    );
    let mut engine = RenderEngine::new(board, false);

    c.bench_function("render_frame_clock_720p", |b| {
        b.iter(|| {
            // A frame inside the waveform sweep exercises the polyline path
            engine.render_frame(black_box(300)).unwrap();
        })
    });
}

criterion_group!(benches, bench_render_frame);
criterion_main!(benches);
