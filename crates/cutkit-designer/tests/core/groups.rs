use cutkit_designer::{
    CamShape, DesignGroup, DesignPolyline, EngravingProperties, Point, Shape,
};

fn line(name: &str, x: f64) -> Shape {
    DesignPolyline::from_points(name, &[Point::new(x, 0.0), Point::new(x + 1.0, 1.0)]).into()
}

fn nested() -> (DesignGroup, cutkit_core::ShapeId, cutkit_core::ShapeId) {
    let mut inner = DesignGroup::new("inner");
    let leaf = line("leaf", 10.0);
    let leaf_id = leaf.id();
    inner.add(leaf);
    let inner_id = inner.id();
    let mut root = DesignGroup::new("root");
    root.add(line("first", 0.0));
    root.add(inner);
    root.clear_flags();
    (root, inner_id, leaf_id)
}

#[test]
fn test_find_and_parent_lookup() {
    let (root, inner_id, leaf_id) = nested();
    assert_eq!(root.find(leaf_id).unwrap().name(), "leaf");
    assert_eq!(root.parent_of(leaf_id), Some((inner_id, 0)));
    assert_eq!(root.parent_of(inner_id), Some((root.id(), 1)));
    assert_eq!(root.shape_count(), 3);
    assert_eq!(root.depth_first().len(), 3);
}

#[test]
fn test_find_mut_marks_ancestors() {
    let (mut root, inner_id, leaf_id) = nested();
    root.find_mut(leaf_id).unwrap().translate(1.0, 0.0);
    assert!(root.header().is_child_modified());
    assert!(!root.header().is_modified());
    let inner = root.find(inner_id).unwrap().as_group().unwrap();
    assert!(inner.header().is_child_modified());
    assert!(root.find(leaf_id).unwrap().is_modified());
}

#[test]
fn test_bounds_follow_child_edits() {
    let (mut root, _, leaf_id) = nested();
    assert!((root.bounds().width() - 11.0).abs() < 1e-9);
    root.find_mut(leaf_id).unwrap().translate(10.0, 0.0);
    assert!((root.bounds().width() - 21.0).abs() < 1e-9);
}

#[test]
fn test_enabled_bounds_skip_disabled_children() {
    let (mut root, inner_id, _) = nested();
    root.find_mut(inner_id)
        .unwrap()
        .set_properties(EngravingProperties::unset().with_enabled(false));
    let b = root.enabled_bounds();
    assert!((b.width() - 1.0).abs() < 1e-9);
    assert!((root.bounds().width() - 11.0).abs() < 1e-9);
}

#[test]
fn test_remove_nested_marks_owner() {
    let (mut root, inner_id, leaf_id) = nested();
    let removed = root.remove(leaf_id).unwrap();
    assert_eq!(removed.name(), "leaf");
    assert!(root.find(leaf_id).is_none());
    let inner = root.find(inner_id).unwrap().as_group().unwrap();
    assert!(inner.is_empty());
    assert!(inner.header().is_modified());
    assert!(!root.header().is_modified());
}

#[test]
fn test_replace_and_insert_into() {
    let (mut root, inner_id, leaf_id) = nested();
    let replacement = line("new", 50.0);
    let new_id = replacement.id();
    let old = root.replace(leaf_id, replacement).unwrap();
    assert_eq!(old.id(), leaf_id);
    assert_eq!(root.parent_of(new_id), Some((inner_id, 0)));

    assert!(root.insert_into(inner_id, 0, old).is_ok());
    assert_eq!(root.parent_of(leaf_id), Some((inner_id, 0)));
    assert!(root.insert_into(leaf_id, 0, line("x", 0.0)).is_err());
}

#[test]
fn test_ungroup_empties_group() {
    let (mut root, inner_id, _) = nested();
    let Some(Shape::Group(inner)) = root.find_mut(inner_id) else {
        panic!("expected group");
    };
    let children = inner.ungroup();
    assert_eq!(children.len(), 1);
    assert!(inner.is_empty());
}

#[test]
fn test_clone_with_new_id_is_deep() {
    let (root, inner_id, leaf_id) = nested();
    let copy = root.find(inner_id).unwrap().clone_with_new_id();
    assert_ne!(copy.id(), inner_id);
    assert!(copy.find(leaf_id).is_none());
    assert_eq!(copy.as_group().unwrap().len(), 1);
}
