use buffer_core::{
    BuiltInFlags, ClipDirection, DisplayLayerEvent, DisplayLayerParams, InvalidationStrategy,
    MarkerLayerEvent, MarkerLayerOptions, MarkerOptions, Point, Range, TagId, TextBuffer,
};
use pretty_assertions::assert_eq;
use std::sync::{Arc, Mutex};

fn screen_texts(buffer: &mut TextBuffer, params: DisplayLayerParams) -> Vec<String> {
    let id = buffer.add_display_layer(params);
    let (layer, text) = buffer.display_layer_mut(id).unwrap();
    let count = layer.screen_line_count(text);
    layer
        .screen_lines(text, 0, count)
        .into_iter()
        .map(|line| line.line_text)
        .collect()
}

#[test]
fn test_hard_tab_expands_to_next_tab_stop() {
    let mut buffer = TextBuffer::new("abc\tdef");
    let id = buffer.add_display_layer(DisplayLayerParams::new().with_tab_length(4));
    let (layer, text) = buffer.display_layer_mut(id).unwrap();
    let line = layer.screen_line(text, 0).unwrap();
    assert_eq!(line.line_text, "abc def");

    let tab_tokens: Vec<_> = line
        .tokens()
        .into_iter()
        .filter(|(_, tags)| tags.contains(&TagId::BuiltIn(BuiltInFlags::HARD_TAB)))
        .collect();
    assert_eq!(tab_tokens.len(), 1);
    assert_eq!(tab_tokens[0].0.chars().count(), 1);
}

#[test]
fn test_soft_wrap_scenarios() {
    let mut buffer = TextBuffer::new("abc def ghi");
    assert_eq!(
        screen_texts(&mut buffer, DisplayLayerParams::new().with_soft_wrap_column(8)),
        vec!["abc def ", "ghi"]
    );

    let mut buffer = TextBuffer::new("xyz");
    for column in [0, -1] {
        assert_eq!(
            screen_texts(&mut buffer, DisplayLayerParams::new().with_soft_wrap_column(column)),
            vec!["x", "y", "z"]
        );
    }
}

#[test]
fn test_fold_and_unfold_through_buffer() {
    let mut buffer = TextBuffer::new("abc\ndef");
    let id = buffer.add_display_layer(DisplayLayerParams::new());
    let (layer, text) = buffer.display_layer_mut(id).unwrap();

    let fold = layer.fold_buffer_range(text, ((0, 1), (1, 2))).unwrap();
    assert_eq!(layer.screen_line(text, 0).unwrap().line_text, "a\u{22ef}f");
    assert_eq!(layer.screen_line_count(text), 1);

    layer.destroy_fold(text, fold);
    let count = layer.screen_line_count(text);
    let lines: Vec<String> = layer
        .screen_lines(text, 0, count)
        .into_iter()
        .map(|line| line.line_text)
        .collect();
    assert_eq!(lines, vec!["abc", "def"]);
}

#[test]
fn test_overlap_marker_is_invalidated_by_inner_replacement() {
    let mut buffer = TextBuffer::new("0123456789");
    let marker = buffer
        .default_marker_layer()
        .mark_range(((0, 3), (0, 6)), MarkerOptions::new().invalidate(InvalidationStrategy::Overlap))
        .unwrap();
    buffer.set_text_in_range(((0, 4), (0, 5)), "XYZ").unwrap();
    assert!(!buffer.default_marker_layer().get_marker(marker).unwrap().is_valid());
}

#[test]
fn test_folds_follow_edits_made_through_the_buffer() {
    let mut buffer = TextBuffer::new("one\ntwo\nthree");
    let id = buffer.add_display_layer(DisplayLayerParams::new());
    {
        let (layer, text) = buffer.display_layer_mut(id).unwrap();
        layer.fold_buffer_range(text, ((1, 1), (2, 2))).unwrap();
        assert_eq!(layer.screen_line_count(text), 2);
    }

    buffer.insert((0, 0), "zero\n").unwrap();
    let (layer, text) = buffer.display_layer_mut(id).unwrap();
    assert_eq!(layer.fold_ranges(), vec![Range::from_coords(2, 1, 3, 2)]);
    assert_eq!(layer.screen_line(text, 2).unwrap().line_text, "t\u{22ef}ree");
    assert_eq!(
        layer.translate_buffer_position(text, (3, 3), ClipDirection::Closest),
        Point::new(2, 3)
    );
}

#[test]
fn test_notifications_follow_global_order() {
    let mut buffer = TextBuffer::new("abc\ndef");
    buffer
        .default_marker_layer()
        .mark_range(((0, 1), (0, 2)), MarkerOptions::new())
        .unwrap();
    let display = buffer.add_display_layer(DisplayLayerParams::new());
    {
        let (layer, text) = buffer.display_layer_mut(display).unwrap();
        layer.screen_lines(text, 0, 2);
    }

    let log = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&log);
    buffer.on_did_change_text(move |_| sink.lock().unwrap().push("text"));
    let sink = Arc::clone(&log);
    buffer.default_marker_layer().subscribe(move |event| match event {
        MarkerLayerEvent::MarkerChanged(_) => sink.lock().unwrap().push("marker"),
        MarkerLayerEvent::Updated => sink.lock().unwrap().push("update"),
        _ => {}
    });
    let sink = Arc::clone(&log);
    buffer
        .display_layer_mut(display)
        .unwrap()
        .0
        .subscribe(move |event| {
            if let DisplayLayerEvent::Changed(_) = event {
                sink.lock().unwrap().push("display");
            }
        });

    buffer.insert((0, 0), "x").unwrap();
    assert_eq!(*log.lock().unwrap(), vec!["text", "marker", "update", "display"]);
}

#[test]
fn test_transaction_coalesces_notifications() {
    let mut buffer = TextBuffer::new("abc\ndef\nghi");
    let display = buffer.add_display_layer(DisplayLayerParams::new());
    let display_events = Arc::new(Mutex::new(0));
    let text_events = Arc::new(Mutex::new(Vec::new()));
    {
        let (layer, text) = buffer.display_layer_mut(display).unwrap();
        layer.screen_lines(text, 0, 3);
        let sink = Arc::clone(&display_events);
        layer.subscribe(move |event| {
            if let DisplayLayerEvent::Changed(_) = event {
                *sink.lock().unwrap() += 1;
            }
        });
    }
    let sink = Arc::clone(&text_events);
    buffer.on_did_change_text(move |event| sink.lock().unwrap().push(event.changes.len()));

    buffer.transact(|buffer| {
        buffer.insert((0, 0), "1").unwrap();
        buffer.transact(|buffer| {
            buffer.insert((2, 0), "3").unwrap();
        });
        assert!(buffer.is_in_transaction());
    });

    assert!(!buffer.is_in_transaction());
    assert_eq!(*text_events.lock().unwrap(), vec![2]);
    assert_eq!(*display_events.lock().unwrap(), 1);
    assert_eq!(buffer.text(), "1abc\ndef\n3ghi");
}

#[test]
fn test_marker_snapshot_restores_destroyed_markers() {
    let mut buffer = TextBuffer::new("hello world");
    let history = buffer.add_marker_layer(MarkerLayerOptions {
        maintain_history: true,
        ..MarkerLayerOptions::default()
    });
    let scratch = buffer.add_marker_layer(MarkerLayerOptions::default());
    let kept = buffer
        .marker_layer_mut(history)
        .unwrap()
        .mark_range(((0, 0), (0, 5)), MarkerOptions::new().property("name", "greeting"))
        .unwrap();
    buffer
        .marker_layer_mut(scratch)
        .unwrap()
        .mark_position((0, 3), MarkerOptions::new())
        .unwrap();

    let snapshot = buffer.create_marker_snapshot();
    assert_eq!(snapshot.len(), 1);
    assert!(snapshot.contains_key(&history));

    let layer = buffer.marker_layer_mut(history).unwrap();
    layer.destroy_marker(kept);
    let added = layer.mark_range(((0, 6), (0, 11)), MarkerOptions::new()).unwrap();

    buffer.restore_marker_snapshot(&snapshot);
    let layer = buffer.marker_layer(history).unwrap();
    assert!(layer.get_marker(added).is_none());
    let restored = layer.get_marker(kept).unwrap();
    assert_eq!(restored.range(), Range::from_coords(0, 0, 0, 5));
    assert_eq!(
        restored.properties().get("name"),
        Some(&serde_json::Value::from("greeting"))
    );
    assert_eq!(buffer.marker_layer(scratch).unwrap().marker_count(), 1);
}

#[test]
fn test_background_work_indexes_every_display_layer() {
    let text: String = (0..200).map(|row| format!("line {row}\n")).collect();
    let mut buffer = TextBuffer::new(&text);
    let first = buffer.add_display_layer(DisplayLayerParams::new());
    let second = buffer.add_display_layer(DisplayLayerParams::new().with_soft_wrap_column(4));

    while buffer.do_background_work(&buffer_core::Unbounded) {}
    for id in [first, second] {
        assert!(buffer.display_layer(id).unwrap().frontier().is_full());
    }
}
