use buffer_core::{
    ClipDirection, DisplayLayerParams, Error, MarkerLayerOptions, MarkerOptions, Point, Range,
    TextBuffer,
};
use pretty_assertions::assert_eq;

fn buffer_with_projection(text: &str, params: DisplayLayerParams) -> (TextBuffer, buffer_core::DisplayMarkerLayerId) {
    let mut buffer = TextBuffer::new(text);
    let display = buffer.add_display_layer(params);
    let markers = buffer.add_marker_layer(MarkerLayerOptions::default());
    let projected = buffer.add_display_marker_layer(display, markers).unwrap();
    (buffer, projected)
}

#[test]
fn test_screen_ranges_round_trip_through_hard_tabs() {
    let (mut buffer, projected) =
        buffer_with_projection("abc\tdef\nghi", DisplayLayerParams::new().with_tab_length(8));
    let mut layer = buffer.display_marker_layer_mut(projected).unwrap();

    let marker = layer
        .mark_screen_range(((0, 8), (0, 11)), MarkerOptions::new(), ClipDirection::Closest)
        .unwrap();
    assert_eq!(
        layer.marker_layer().get_marker(marker).unwrap().range(),
        Range::from_coords(0, 4, 0, 7)
    );
    assert_eq!(layer.marker_screen_range(marker).unwrap(), Range::from_coords(0, 8, 0, 11));
    assert_eq!(layer.marker_head_screen_position(marker).unwrap(), Point::new(0, 11));
    assert_eq!(layer.marker_tail_screen_position(marker).unwrap(), Point::new(0, 8));

    // Screen column 5 lies inside the tab and is closer to its start.
    layer
        .set_marker_screen_range(marker, ((0, 5), (0, 9)), None, ClipDirection::Closest)
        .unwrap();
    assert_eq!(
        layer.marker_layer().get_marker(marker).unwrap().range(),
        Range::from_coords(0, 3, 0, 5)
    );
    assert_eq!(layer.marker_screen_range(marker).unwrap(), Range::from_coords(0, 3, 0, 9));
}

#[test]
fn test_screen_positions_inside_a_fold() {
    let (mut buffer, projected) = buffer_with_projection("abc\tdef\nghi", DisplayLayerParams::new());
    let display = buffer.display_marker_layer_binding(projected).unwrap().display_layer;
    {
        let (layer, text) = buffer.display_layer_mut(display).unwrap();
        layer.fold_buffer_range(text, ((0, 1), (1, 1))).unwrap();
        assert_eq!(layer.screen_line(text, 0).unwrap().line_text, "a\u{22ef}hi");
    }

    let mut layer = buffer.display_marker_layer_mut(projected).unwrap();
    let hidden = layer.mark_buffer_range(((0, 2), (0, 3)), MarkerOptions::new()).unwrap();
    let visible = layer.mark_buffer_range(((1, 2), (1, 3)), MarkerOptions::new()).unwrap();

    assert_eq!(layer.marker_screen_range(visible).unwrap(), Range::from_coords(0, 3, 0, 4));
    assert_eq!(layer.find_markers_in_screen_range(((0, 1), (0, 2))).unwrap(), vec![hidden]);
    assert_eq!(
        layer.find_markers_in_screen_range(((0, 3), (0, 4))).unwrap(),
        vec![visible]
    );

    let position = layer
        .mark_screen_position((0, 3), MarkerOptions::new(), ClipDirection::Closest)
        .unwrap();
    let marker = layer.marker_layer().get_marker(position).unwrap();
    assert!(!marker.has_tail());
    assert_eq!(marker.head(), Point::new(1, 2));
}

#[test]
fn test_unknown_marker_is_an_error() {
    let (mut buffer, projected) = buffer_with_projection("abc", DisplayLayerParams::new());
    let mut layer = buffer.display_marker_layer_mut(projected).unwrap();
    assert!(matches!(
        layer.marker_screen_range(buffer_core::MarkerId(99)),
        Err(Error::UnknownMarker(99))
    ));
    assert!(matches!(
        layer.set_marker_screen_range(buffer_core::MarkerId(99), ((0, 0), (0, 1)), None, ClipDirection::Closest),
        Err(Error::UnknownMarker(99))
    ));
}

#[test]
fn test_destroying_the_display_layer_destroys_the_projection() {
    let (mut buffer, projected) = buffer_with_projection("abc", DisplayLayerParams::new());
    let binding = buffer.display_marker_layer_binding(projected).unwrap();
    buffer.destroy_display_layer(binding.display_layer).unwrap();

    assert!(matches!(
        buffer.display_marker_layer_mut(projected),
        Err(Error::UnknownDisplayMarkerLayer(_))
    ));
    assert!(buffer.marker_layer(binding.marker_layer).is_ok());
}
