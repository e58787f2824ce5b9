use buffer_core::{
    ClipDirection, DisplayLayer, DisplayLayerId, DisplayLayerParams, Point, ScreenLine, TagCode,
    Text, TextStorage,
};
use pretty_assertions::assert_eq;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const ALPHABET: &[char] = &['a', 'b', 'c', 'x', 'y', 'z', ' ', ' ', '\t'];

fn random_text(rng: &mut StdRng) -> String {
    let line_count = rng.gen_range(1..12);
    let mut lines = Vec::with_capacity(line_count);
    for _ in 0..line_count {
        let length = rng.gen_range(0..30);
        let line: String = (0..length)
            .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())])
            .collect();
        lines.push(line);
    }
    lines.join("\n")
}

fn random_params(rng: &mut StdRng) -> DisplayLayerParams {
    let mut params = DisplayLayerParams::new()
        .with_tab_length(rng.gen_range(1..6))
        .with_atomic_soft_tabs(false);
    if rng.gen_bool(0.6) {
        params = params.with_soft_wrap_column(rng.gen_range(4..16));
    }
    params
}

fn all_screen_text(layer: &mut DisplayLayer, text: &Text) -> Vec<String> {
    let count = layer.screen_line_count(text);
    layer
        .screen_lines(text, 0, count)
        .into_iter()
        .map(|line| line.line_text)
        .collect()
}

fn assert_properly_nested(line: &ScreenLine) {
    let mut open = Vec::new();
    let mut covered = 0;
    for tag in &line.tags {
        match *tag {
            TagCode::Open(id) => open.push(id),
            TagCode::Close(id) => assert_eq!(open.pop(), Some(id), "misnested close in {line:?}"),
            TagCode::Text(length) => covered += length,
        }
    }
    assert!(open.is_empty(), "unclosed tags in {line:?}");
    assert_eq!(covered, line.line_text.chars().count());
}

#[test]
fn test_buffer_screen_round_trip() {
    let mut rng = StdRng::seed_from_u64(0x5eed);
    for iteration in 0..60 {
        let text = Text::from_text(&random_text(&mut rng));
        let params = random_params(&mut rng);
        let mut layer = DisplayLayer::new(DisplayLayerId(iteration), params);

        for row in 0..text.line_count() {
            let mut previous: Option<Point> = None;
            for column in 0..=text.line_length_for_row(row) {
                let buffer_position = Point::new(row, column);
                let screen_position =
                    layer.translate_buffer_position(&text, buffer_position, ClipDirection::Closest);
                let back = layer.translate_screen_position(&text, screen_position, ClipDirection::Closest);
                assert_eq!(
                    back,
                    buffer_position,
                    "iteration {iteration}: {buffer_position} -> {screen_position} -> {back}"
                );
                if let Some(previous) = previous {
                    assert!(
                        previous < screen_position,
                        "iteration {iteration}: screen positions not increasing at {buffer_position}"
                    );
                }
                previous = Some(screen_position);
            }
        }
    }
}

#[test]
fn test_screen_lines_are_properly_nested() {
    let mut rng = StdRng::seed_from_u64(42);
    for iteration in 0..40 {
        let text = Text::from_text(&random_text(&mut rng));
        let params = random_params(&mut rng)
            .with_indent_guides(rng.gen_bool(0.5))
            .with_invisibles(buffer_core::Invisibles::standard());
        let mut layer = DisplayLayer::new(DisplayLayerId(iteration), params);
        let count = layer.screen_line_count(&text);
        for line in layer.screen_lines(&text, 0, count) {
            assert_properly_nested(&line);
        }
    }
}

#[test]
fn test_fold_then_destroy_restores_screen_text() {
    let mut rng = StdRng::seed_from_u64(7);
    for iteration in 0..40 {
        let text = Text::from_text(&random_text(&mut rng));
        let params = DisplayLayerParams::new().with_tab_length(rng.gen_range(1..6));
        let mut layer = DisplayLayer::new(DisplayLayerId(iteration), params);
        let before = all_screen_text(&mut layer, &text);

        let start_row = rng.gen_range(0..text.line_count());
        let end_row = rng.gen_range(start_row..text.line_count());
        let start = Point::new(start_row, rng.gen_range(0..=text.line_length_for_row(start_row)));
        let end = Point::new(end_row, rng.gen_range(0..=text.line_length_for_row(end_row)));
        let fold = layer.fold_buffer_range(&text, (start.min(end), start.max(end))).unwrap();
        let folded = all_screen_text(&mut layer, &text);
        if start != end {
            assert_ne!(folded, before, "iteration {iteration}: fold changed nothing");
        }

        layer.destroy_fold(&text, fold);
        assert_eq!(all_screen_text(&mut layer, &text), before, "iteration {iteration}");
    }
}

#[test]
fn test_clip_directions_bracket_closest() {
    let text = Text::from_text("\tab\u{301}c\n    d");
    let mut layer = DisplayLayer::new(
        DisplayLayerId(0),
        DisplayLayerParams::new().with_tab_length(4),
    );
    for row in 0..text.line_count() {
        for column in 0..=8 {
            let position = Point::new(row, column);
            let backward = layer.translate_screen_position(&text, position, ClipDirection::Backward);
            let closest = layer.translate_screen_position(&text, position, ClipDirection::Closest);
            let forward = layer.translate_screen_position(&text, position, ClipDirection::Forward);
            assert!(backward <= closest && closest <= forward, "at {position}");
        }
    }
}
