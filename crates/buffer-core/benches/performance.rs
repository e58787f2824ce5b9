use buffer_core::{ClipDirection, DisplayLayerParams, MarkerOptions, Point, TextBuffer, Unbounded};
use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};

fn large_text(line_count: usize) -> String {
    let mut out = String::with_capacity(line_count * 64);
    for i in 0..line_count {
        out.push_str(&format!(
            "{i:06}\tthe quick brown fox jumps over the lazy dog (buffer-core benchmark line)\n"
        ));
    }
    out.pop();
    out
}

fn bench_full_index(c: &mut Criterion) {
    let text = large_text(20_000);
    c.bench_function("full_index/20k_lines_wrapped", |b| {
        b.iter_batched(
            || {
                let mut buffer = TextBuffer::new(&text);
                let id = buffer.add_display_layer(DisplayLayerParams::new().with_soft_wrap_column(40));
                (buffer, id)
            },
            |(mut buffer, id)| {
                let (layer, text) = buffer.display_layer_mut(id).unwrap();
                black_box(layer.screen_line_count(text));
            },
            BatchSize::LargeInput,
        )
    });
}

fn bench_viewport_render(c: &mut Criterion) {
    let text = large_text(20_000);
    let mut buffer = TextBuffer::new(&text);
    let id = buffer.add_display_layer(DisplayLayerParams::new().with_soft_wrap_column(60));
    while buffer.do_background_work(&Unbounded) {}

    c.bench_function("viewport_render/60_lines", |b| {
        b.iter(|| {
            let (layer, text) = buffer.display_layer_mut(id).unwrap();
            // Reset drops the line cache so every iteration builds.
            layer.reset(layer.params().clone());
            black_box(layer.screen_lines(text, 10_000, 10_060));
        })
    });
}

fn bench_typing_with_markers(c: &mut Criterion) {
    let text = large_text(5_000);
    c.bench_function("typing_middle/100_inserts_1k_markers", |b| {
        b.iter_batched(
            || {
                let mut buffer = TextBuffer::new(&text);
                let id = buffer.add_display_layer(DisplayLayerParams::new());
                let layer = buffer.default_marker_layer();
                for row in (0..5_000).step_by(5) {
                    layer
                        .mark_range(((row, 2), (row, 10)), MarkerOptions::new())
                        .unwrap();
                }
                while buffer.do_background_work(&Unbounded) {}
                (buffer, id)
            },
            |(mut buffer, _id)| {
                let mut column = 10;
                for _ in 0..100 {
                    buffer.insert((2_500, column), "x").unwrap();
                    column += 1;
                }
                black_box(buffer.line_count());
            },
            BatchSize::LargeInput,
        )
    });
}

fn bench_translation(c: &mut Criterion) {
    let text = large_text(20_000);
    let mut buffer = TextBuffer::new(&text);
    let id = buffer.add_display_layer(DisplayLayerParams::new().with_soft_wrap_column(50));
    while buffer.do_background_work(&Unbounded) {}

    c.bench_function("translate/1000_round_trips", |b| {
        b.iter(|| {
            let (layer, text) = buffer.display_layer_mut(id).unwrap();
            for row in (0..20_000).step_by(20) {
                let screen = layer.translate_buffer_position(text, Point::new(row, 30), ClipDirection::Closest);
                black_box(layer.translate_screen_position(text, screen, ClipDirection::Closest));
            }
        })
    });
}

criterion_group!(
    benches,
    bench_full_index,
    bench_viewport_render,
    bench_typing_with_markers,
    bench_translation
);
criterion_main!(benches);
