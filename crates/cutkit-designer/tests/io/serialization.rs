use std::io::Cursor;

use cutkit_core::FormatError;
use cutkit_designer::{
    read_document, write_document, CamShape, DesignArc, DesignCylinderPocket, DesignDrill,
    DesignGroup, DesignMixedPath, DesignPolyline, DesignSpherePocket, DesignSpline,
    DesignTextPath, Document, EngravingProperties, Glyph, GlyphOutliner, Point, Shape,
    ShapeRegistry,
};

struct Bars;

impl GlyphOutliner for Bars {
    fn outline(&self, _ch: char, size: f64) -> Option<Glyph> {
        Some(Glyph {
            advance: size,
            contours: vec![vec![Point::new(0.0, 0.0), Point::new(0.0, size)]],
        })
    }
}

fn sample_document() -> DesignGroup {
    let mut root = DesignGroup::new("root");
    root.header_mut().set_properties(EngravingProperties::unset().with_feed(1200.0).with_power(80.0));

    let mut outline = DesignPolyline::from_points(
        "outline (main)",
        &[
            Point::new(0.0, 0.0),
            Point::new(10.25, 0.0),
            Point::new(10.25, 7.125),
            Point::new(0.0, 0.0),
        ],
    );
    outline.add_comment("EndGroup");
    outline.header_mut().set_properties(EngravingProperties::unset().with_depth(0.0, -3.0, 1.0));
    root.add(outline);

    let mut inner = DesignGroup::new("inner 100%");
    inner.header_mut().set_properties(EngravingProperties::unset().with_all_at_once(true).with_passes(2));
    inner.add(DesignArc::new(
        "arc",
        Point::new(1.0, 0.0),
        Point::new(0.0, 1.0),
        Point::origin(),
        false,
    ));
    inner.add(DesignSpline::cubic(
        "spline",
        Point::new(0.0, 0.0),
        Point::new(1.0, 2.0),
        Point::new(3.0, 2.0),
        Point::new(4.0, 0.0),
    ));
    inner.add(DesignSpline::quadratic(
        "quad",
        Point::new(0.0, 0.0),
        Point::new(1.0, 1.0),
        Point::new(2.0, 0.0),
    ));
    root.add(inner);

    let mut mixed = DesignMixedPath::new("mixed");
    mixed.push_point(Point::new(-1.0, 0.0));
    mixed.push_point(Point::new(1.0, 0.0));
    mixed.push_arc(DesignArc::new(
        "a",
        Point::new(1.0, 0.0),
        Point::new(0.0, 1.0),
        Point::origin(),
        false,
    ));
    root.add(mixed);

    root.add(DesignDrill::new("hole", Point::new(5.0, 5.0), -4.0, 1.0, 1.5));
    root.add(DesignDrill::new("spot", Point::new(6.0, 5.0), -1.0, 1.0, 0.0));
    root.add(DesignCylinderPocket::new("trough", Point::new(20.0, 0.0), 3.0, 12.0, 2.0, 30.0));
    root.add(DesignSpherePocket::new("dimple", Point::new(30.0, 0.0), 4.0, 2.5));

    let mut text = DesignTextPath::new(
        "label",
        "Hi (there)",
        5.0,
        vec![Point::new(0.0, -10.0), Point::new(80.0, -10.0)],
    );
    text.layout(&Bars);
    root.add(text);
    root
}

fn assert_same_tree(a: &DesignGroup, b: &DesignGroup) {
    let left = a.depth_first();
    let right = b.depth_first();
    assert_eq!(left.len(), right.len());
    for (x, y) in left.iter().zip(right.iter()) {
        assert_eq!(x.kind_name(), y.kind_name());
        assert_eq!(x.name(), y.name());
        assert_eq!(x.properties(), y.properties());
        if !matches!(x, Shape::Group(_)) {
            assert_eq!(x.motions(), y.motions(), "motions of {}", x.name());
        }
    }
}

#[test]
fn test_document_round_trip_in_memory() {
    let root = sample_document();
    let text = write_document(&root);
    let back = read_document(&text, &ShapeRegistry::default()).unwrap();
    assert_eq!(back.header().name(), "root");
    assert_eq!(back.header().properties(), root.header().properties());
    assert_same_tree(&root, &back);
    assert!(!back.has_changes());
}

#[test]
fn test_document_round_trip_through_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("design.cut");

    let mut doc = Document::from_root(sample_document());
    doc.save(&path).unwrap();
    let loaded = Document::load(&path).unwrap();
    assert_eq!(loaded.path(), Some(path.as_path()));
    assert_same_tree(doc.root(), loaded.root());
}

#[test]
fn test_parametric_shapes_survive() {
    let text = write_document(&sample_document());
    let back = read_document(&text, &ShapeRegistry::default()).unwrap();
    let pocket = back
        .depth_first()
        .into_iter()
        .find_map(|s| match s {
            Shape::CylinderPocket(c) => Some(c.clone()),
            _ => None,
        })
        .unwrap();
    assert_eq!(pocket.rotation(), 30.0);
    assert_eq!(pocket.inlay_depth(), 2.0);

    let label = back
        .depth_first()
        .into_iter()
        .find_map(|s| match s {
            Shape::TextPath(t) => Some(t.clone()),
            _ => None,
        })
        .unwrap();
    assert_eq!(label.text(), "Hi (there)");
    assert_eq!(label.contours().len(), 10);
}

#[test]
fn test_loose_shapes_are_wrapped_in_a_root() {
    let text = "(Polyline-name: a)\n(Prop: true,,,,,,,false)\nG0 X0 Y0\nG1 X1 Y0\n(Arc-name: b)\n(Prop: false,,,,,,,false)\nG0 X1 Y0\nG3 X0 Y1 I-1 J0\n";
    let root = read_document(text, &ShapeRegistry::default()).unwrap();
    assert_eq!(root.len(), 2);
    assert!(!root.children()[1].is_enabled());
}

#[test]
fn test_structural_errors_carry_line_numbers() {
    let registry = ShapeRegistry::default();
    let text = "(Group-name: g)\n(Prop: true,,,,,,,false)\n(EndGroup)\n(EndGroup)\n";
    assert_eq!(
        read_document(text, &registry).unwrap_err(),
        FormatError::UnmatchedGroupEnd { line_number: 4 }
    );

    let text = "(Polyline-name: a)\n(Prop: true,abc,,,,,,false)\n";
    assert!(matches!(
        read_document(text, &registry).unwrap_err(),
        FormatError::InvalidProperties { line_number: 2, .. }
    ));

    assert_eq!(read_document("\n\n", &registry).unwrap_err(), FormatError::EmptyDocument);
}

#[test]
fn test_reader_errors_surface_as_load_errors() {
    let input = Cursor::new("(Group-name: open)\n(Prop: true,,,,,,,false)\n");
    let err = Document::from_reader(input).unwrap_err();
    assert!(err.is_format_error());
}

#[test]
fn test_registry_lists_kinds() {
    let registry = ShapeRegistry::default();
    assert!(registry.contains("Group"));
    assert!(registry.contains("TextPath"));
    assert!(!registry.contains("Blob"));
    assert_eq!(registry.kinds().len(), 8);
}
