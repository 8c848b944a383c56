use cutkit_designer::{CamShape, DesignGroup, DesignPolyline, Document, History, Point, Shape};

fn line(name: &str, x: f64) -> Shape {
    DesignPolyline::from_points(name, &[Point::new(x, 0.0), Point::new(x + 1.0, 0.0)]).into()
}

fn root_with(n: usize) -> DesignGroup {
    let mut root = DesignGroup::new("root");
    for i in 0..n {
        root.add(line(&format!("l{}", i), i as f64 * 2.0));
    }
    root
}

fn ids(root: &DesignGroup) -> Vec<cutkit_core::ShapeId> {
    root.children().iter().map(|c| c.id()).collect()
}

#[test]
fn test_clearing_root_is_a_full_dump() {
    let mut root = root_with(3);
    let before = ids(&root);
    let mut history = History::new(&mut root, 10);

    root.clear();
    let root_id = root.id();
    assert!(history.save_point(&mut root, Some(root_id)));
    assert!(root.is_empty());

    let outcome = history.undo(&mut root).unwrap();
    assert!(outcome.full);
    assert_eq!(outcome.restored, vec![root.id()]);
    assert_eq!(outcome.edited, Some(root.id()));
    assert_eq!(ids(&root), before);
}

#[test]
fn test_partial_record_restores_previous_version() {
    let mut root = root_with(2);
    let target = root.children()[1].id();
    let mut history = History::new(&mut root, 10);

    root.find_mut(target).unwrap().translate(0.0, 5.0);
    assert!(history.save_point(&mut root, Some(target)));
    root.find_mut(target).unwrap().translate(0.0, 5.0);
    assert!(history.save_point(&mut root, Some(target)));
    assert_eq!(root.find(target).unwrap().start_point().unwrap().y, 10.0);

    let outcome = history.undo(&mut root).unwrap();
    assert!(!outcome.full);
    assert_eq!(outcome.restored, vec![target]);
    assert_eq!(root.find(target).unwrap().start_point().unwrap().y, 5.0);

    history.undo(&mut root).unwrap();
    assert_eq!(root.find(target).unwrap().start_point().unwrap().y, 0.0);
    assert!(!history.can_undo());

    history.redo(&mut root).unwrap();
    history.redo(&mut root).unwrap();
    assert_eq!(root.find(target).unwrap().start_point().unwrap().y, 10.0);
    assert!(!history.can_redo());
}

#[test]
fn test_nested_group_is_captured_once() {
    let mut root = DesignGroup::new("root");
    let mut inner = DesignGroup::new("inner");
    inner.add(line("a", 0.0));
    let inner_id = root.add(inner);
    let mut history = History::new(&mut root, 10);

    let Some(Shape::Group(g)) = root.find_mut(inner_id) else {
        panic!("expected group");
    };
    let added = g.add(line("b", 5.0));
    assert!(history.save_point(&mut root, Some(inner_id)));
    assert!(root.find(added).is_some());

    let outcome = history.undo(&mut root).unwrap();
    assert_eq!(outcome.restored, vec![inner_id]);
    assert!(root.find(added).is_none());
    assert_eq!(root.find(inner_id).unwrap().as_group().unwrap().len(), 1);

    history.redo(&mut root).unwrap();
    assert!(root.find(added).is_some());
}

#[test]
fn test_shape_without_earlier_version_is_removed() {
    let mut root = root_with(1);
    let mut history = History::new(&mut root, 10);

    // slip a shape in without flagging the root, then edit it
    let fresh = line("fresh", 10.0);
    let fresh_id = fresh.id();
    root.add(fresh);
    root.clear_flags();
    root.find_mut(fresh_id).unwrap().translate(1.0, 0.0);
    assert!(history.save_point(&mut root, Some(fresh_id)));

    let outcome = history.undo(&mut root).unwrap();
    assert_eq!(outcome.removed, vec![fresh_id]);
    assert!(root.find(fresh_id).is_none());
}

#[test]
fn test_undo_clears_change_flags() {
    let mut root = root_with(2);
    let target = root.children()[0].id();
    let mut history = History::new(&mut root, 10);
    root.find_mut(target).unwrap().translate(1.0, 1.0);
    history.save_point(&mut root, None);
    history.undo(&mut root);
    assert!(!root.has_changes());
    assert!(!history.save_point(&mut root, None));
}

#[test]
fn test_edit_that_changes_nothing_adds_no_undo_step() {
    let mut doc = Document::new();
    let id = doc.add_shape(None, line("a", 0.0)).unwrap();
    assert!(doc.save_point(Some(id)));
    let depth = doc.history().undo_depth();

    assert_eq!(doc.edit(id, |s| s.name().len()), Some(1));
    assert!(!doc.save_point(Some(id)));
    assert_eq!(doc.history().undo_depth(), depth);

    doc.edit(id, |s| s.translate(1.0, 0.0));
    assert!(doc.save_point(Some(id)));
    assert_eq!(doc.history().undo_depth(), depth + 1);
}
