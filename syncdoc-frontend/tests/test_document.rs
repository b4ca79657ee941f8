use maplit::hashmap;
use pretty_assertions::assert_eq;
use syncdoc_frontend::{
    Document, FrontendError, LocalChange, ObjectId, Operation, Path, RequestType, ScalarValue,
    Value,
};

#[test]
fn test_change_emits_a_well_formed_request() {
    let mut doc = Document::with_backend("actor1".into());
    let request = doc
        .change(Some("set a bird".to_string()), |doc| {
            doc.add_change(LocalChange::set(Path::root().key("bird"), "magpie"))
        })
        .unwrap()
        .unwrap();

    assert_eq!(request.actor, "actor1".into());
    assert_eq!(request.seq, 1);
    assert_eq!(request.request_type, RequestType::Change);
    assert_eq!(request.message, Some("set a bird".to_string()));
    assert!(request.deps.is_empty());
    assert_eq!(
        request.ops,
        Some(vec![Operation::set(
            ObjectId::Root,
            "bird".into(),
            "magpie".into()
        )])
    );

    assert_eq!(
        doc.value(),
        Value::map(hashmap! {
            "bird".to_string() => "magpie".into()
        })
    );
}

#[test]
fn test_empty_session_produces_no_request() {
    let mut doc = Document::with_backend("actor1".into());
    let request = doc.change(None, |_| Ok(())).unwrap();
    assert_eq!(request, None);
    assert_eq!(doc.seq(), 0);
}

#[test]
fn test_only_the_last_assignment_per_field_is_emitted() {
    let mut doc = Document::with_backend("actor1".into());
    let request = doc
        .change(None, |doc| {
            doc.add_change(LocalChange::set(Path::root().key("x"), 1))?;
            doc.add_change(LocalChange::set(Path::root().key("x"), 2))
        })
        .unwrap()
        .unwrap();
    assert_eq!(
        request.ops,
        Some(vec![Operation::set(ObjectId::Root, "x".into(), 2.into())])
    );
}

#[test]
fn test_setting_a_list_creates_and_links_it() {
    let mut doc = Document::with_backend("actor1".into());
    let request = doc
        .change(None, |doc| {
            doc.add_change(LocalChange::set(
                Path::root().key("birds"),
                Value::list(vec!["magpie".into(), "crow".into()]),
            ))
        })
        .unwrap()
        .unwrap();

    let ops = request.ops.unwrap();
    assert!(matches!(ops[0], Operation::MakeList { .. }));
    let inserts = ops.iter().filter(|op| op.is_insert()).count();
    assert_eq!(inserts, 2);
    assert!(matches!(ops.last().unwrap(), Operation::Link { .. }));

    assert_eq!(
        doc.value(),
        Value::map(hashmap! {
            "birds".to_string() => Value::list(vec!["magpie".into(), "crow".into()])
        })
    );
    assert!(doc.get_object_id(&Path::root().key("birds")).is_some());
}

#[test]
fn test_list_edits_in_later_sessions() {
    let mut doc = Document::with_backend("actor1".into());
    doc.change(None, |doc| {
        doc.add_change(LocalChange::set(
            Path::root().key("birds"),
            Value::list(vec!["magpie".into(), "crow".into()]),
        ))
    })
    .unwrap();

    doc.change(None, |doc| {
        doc.add_change(LocalChange::insert(Path::root().key("birds").index(1), "robin"))?;
        doc.add_change(LocalChange::set(Path::root().key("birds").index(0), "jay"))?;
        doc.add_change(LocalChange::delete(Path::root().key("birds").index(2)))
    })
    .unwrap();

    assert_eq!(
        doc.value(),
        Value::map(hashmap! {
            "birds".to_string() => Value::list(vec!["jay".into(), "robin".into()])
        })
    );
}

#[test]
fn test_text_edits_are_single_graphemes() {
    let mut doc = Document::with_backend("actor1".into());
    doc.change(None, |doc| {
        doc.add_change(LocalChange::set(Path::root().key("title"), Value::text("hi")))
    })
    .unwrap();

    doc.change(None, |doc| {
        doc.add_change(LocalChange::insert(
            Path::root().key("title").index(2),
            "!",
        ))
    })
    .unwrap();

    assert_eq!(
        doc.value_at(&Path::root().key("title")).unwrap().to_json(),
        serde_json::Value::String("hi!".to_string())
    );

    // a multi-grapheme string cannot be a single text element
    let result = doc.change(None, |doc| {
        doc.add_change(LocalChange::insert(
            Path::root().key("title").index(0),
            "no",
        ))
    });
    assert!(matches!(result, Err(FrontendError::InvalidChangeRequest(_))));
}

#[test]
fn test_nested_maps_materialize() {
    let mut doc = Document::with_backend("actor1".into());
    doc.change(None, |doc| {
        doc.add_change(LocalChange::set(
            Path::root().key("nest"),
            Value::map(hashmap! {
                "eggs".to_string() => 3.into(),
                "species".to_string() => "magpie".into()
            }),
        ))
    })
    .unwrap();

    assert_eq!(
        doc.value_at(&Path::root().key("nest").key("eggs")),
        Some(Value::Primitive(ScalarValue::Number(3.0), None))
    );

    doc.change(None, |doc| {
        doc.add_change(LocalChange::set(Path::root().key("nest").key("eggs"), 4))
    })
    .unwrap();
    assert_eq!(
        doc.value_at(&Path::root().key("nest").key("eggs")),
        Some(Value::Primitive(ScalarValue::Number(4.0), None))
    );
}

#[test]
fn test_deleting_a_missing_key_fails() {
    let mut doc = Document::with_backend("actor1".into());
    let result = doc.change(None, |doc| {
        doc.add_change(LocalChange::delete(Path::root().key("ghost")))
    });
    assert!(matches!(result, Err(FrontendError::NoSuchPath(_))));
    // the failed session left no trace
    assert_eq!(doc.seq(), 0);
    assert_eq!(doc.value(), Value::map(hashmap! {}));
}

#[test]
fn test_undo_and_redo_through_a_wired_backend() {
    let mut doc = Document::with_backend("actor1".into());
    doc.change(None, |doc| {
        doc.add_change(LocalChange::set(Path::root().key("x"), 1))
    })
    .unwrap();
    assert!(doc.can_undo());

    doc.undo(None).unwrap();
    assert_eq!(doc.value(), Value::map(hashmap! {}));
    assert!(doc.can_redo());

    doc.redo(None).unwrap();
    assert_eq!(
        doc.value(),
        Value::map(hashmap! { "x".to_string() => 1.into() })
    );

    // nothing left to redo
    assert_eq!(doc.redo(None), Err(FrontendError::NothingToRedo));
}
