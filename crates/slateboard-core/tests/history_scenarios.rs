use kurbo::{Point, Rect};
use slateboard_core::shapes::ListFormat;
use slateboard_core::{Element, Engine, InputEvent, Key, Snapshot, ToolKind, ToolStyle};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn press(engine: &mut Engine, x: f64, y: f64) {
    engine.apply_event(&InputEvent::down(Point::new(x, y)));
}

fn drag(engine: &mut Engine, from: (f64, f64), to: (f64, f64)) {
    engine.apply_event(&InputEvent::down(Point::new(from.0, from.1)));
    engine.apply_event(&InputEvent::moved(Point::new((from.0 + to.0) / 2.0, (from.1 + to.1) / 2.0)));
    engine.apply_event(&InputEvent::moved(Point::new(to.0, to.1)));
    engine.apply_event(&InputEvent::up(Point::new(to.0, to.1)));
}

#[test]
fn n_commits_then_n_undos_is_empty() {
    init_logging();
    let mut engine = Engine::default();
    engine.set_tool(ToolKind::Rectangle);
    let n = 12;
    for i in 0..n {
        let x = i as f64 * 30.0;
        drag(&mut engine, (x, 0.0), (x + 20.0, 20.0));
    }
    assert_eq!(engine.snapshot().len(), n);
    for _ in 0..n {
        assert!(engine.undo());
    }
    assert_eq!(engine.snapshot(), Snapshot::empty());
    assert!(!engine.undo());
}

#[test]
fn rectangle_then_stroke_undo_redo() {
    init_logging();
    let mut engine = Engine::default();
    engine.set_tool(ToolKind::Rectangle);
    drag(&mut engine, (10.0, 10.0), (60.0, 40.0));
    engine.set_tool(ToolKind::Pen);
    drag(&mut engine, (100.0, 100.0), (150.0, 120.0));
    let both = engine.snapshot();
    assert_eq!(both.len(), 2);

    engine.undo();
    let after_undo = engine.snapshot();
    assert_eq!(after_undo.len(), 1);
    let rect = after_undo.iter().next().unwrap();
    assert_eq!(rect.kind_name(), "shape");
    assert_eq!(rect.bounds(), Rect::new(10.0, 10.0, 60.0, 40.0));

    engine.redo();
    assert_eq!(engine.snapshot(), both);
}

#[test]
fn undo_redo_roundtrip_and_branch_truncation() {
    init_logging();
    let mut engine = Engine::default();
    engine.set_tool(ToolKind::Rectangle);
    drag(&mut engine, (0.0, 0.0), (20.0, 20.0));
    drag(&mut engine, (30.0, 0.0), (50.0, 20.0));
    let before = engine.snapshot();

    engine.undo();
    engine.redo();
    assert_eq!(engine.snapshot(), before);

    engine.undo();
    drag(&mut engine, (60.0, 0.0), (80.0, 20.0));
    let branched = engine.snapshot();
    assert!(!engine.can_redo());
    assert!(!engine.redo());
    assert_eq!(engine.snapshot(), branched);
}

#[test]
fn empty_text_edit_deletes_element() {
    init_logging();
    let style = ToolStyle {
        list_format: ListFormat::Bullet,
        ..ToolStyle::default()
    };
    let mut engine = Engine::new(Default::default(), style);
    engine.set_tool(ToolKind::Text);
    press(&mut engine, 40.0, 40.0);
    assert!(engine.editing().is_some());
    // Only the bullet marker was ever typed.
    engine.apply_event(&InputEvent::key(Key::Char(' ')));
    engine.commit();
    assert!(engine.snapshot().is_empty());
    assert!(!engine.can_undo());
}

#[test]
fn existing_text_cleared_is_removed_and_undoable() {
    init_logging();
    let mut engine = Engine::default();
    engine.set_tool(ToolKind::Text);
    press(&mut engine, 40.0, 40.0);
    for c in "ok".chars() {
        engine.apply_event(&InputEvent::key(Key::Char(c)));
    }
    engine.commit();
    let id = engine.snapshot().ids()[0];

    press(&mut engine, 42.0, 42.0);
    assert_eq!(engine.editing(), Some(id));
    engine.apply_event(&InputEvent::key(Key::Backspace));
    engine.apply_event(&InputEvent::key(Key::Backspace));
    engine.commit();
    assert!(engine.snapshot().is_empty());

    engine.undo();
    let restored = engine.snapshot();
    assert_eq!(restored.get(id).and_then(Element::text_content), Some("ok"));
}

#[test]
fn snapshot_is_point_in_time() {
    let mut engine = Engine::default();
    engine.set_tool(ToolKind::Rectangle);
    drag(&mut engine, (0.0, 0.0), (20.0, 20.0));
    let exported = engine.snapshot();
    drag(&mut engine, (30.0, 0.0), (50.0, 20.0));
    assert_eq!(exported.len(), 1);
    assert_eq!(engine.snapshot().len(), 2);
    let json = exported.to_json().unwrap();
    assert_eq!(Snapshot::from_json(&json).unwrap(), exported);
}

#[test]
fn move_result_ignores_pointer_sample_count() {
    init_logging();
    let moved_with = |samples: usize| {
        let mut engine = Engine::default();
        engine.set_tool(ToolKind::Rectangle);
        drag(&mut engine, (0.0, 0.0), (20.0, 20.0));
        let id = engine.snapshot().ids()[0];
        engine.set_tool(ToolKind::Select);
        engine.apply_event(&InputEvent::down(Point::new(10.0, 10.0)));
        for i in 1..=samples {
            let t = i as f64 / samples as f64;
            engine.apply_event(&InputEvent::moved(Point::new(10.0 + 50.0 * t, 10.0 + 30.0 * t)));
        }
        engine.apply_event(&InputEvent::up(Point::new(60.0, 40.0)));
        engine.snapshot().get(id).map(Element::bounds)
    };
    assert_eq!(moved_with(1), Some(Rect::new(50.0, 30.0, 70.0, 50.0)));
    assert_eq!(moved_with(1), moved_with(25));
}
