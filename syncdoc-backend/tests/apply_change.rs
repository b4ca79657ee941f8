use pretty_assertions::assert_eq;
use syncdoc_backend::{
    Backend, BackendError, Change, Clock, Conflict, Diff, DiffAction, ElementValue, ObjType,
    ObjectId, Operation, Patch,
};

fn change(actor: &str, seq: u32, deps: Clock, operations: Vec<Operation>) -> Change {
    Change {
        actor_id: actor.into(),
        seq,
        deps,
        message: None,
        operations,
    }
}

#[test]
fn test_incremental_diffs_in_a_map() {
    let change1 = change(
        "7b7723afd9e6480397a4d467b7693156",
        1,
        Clock::empty(),
        vec![Operation::set(ObjectId::Root, "bird".into(), "magpie".into())],
    );
    let backend = Backend::init();
    let (_, patch) = backend.apply_changes(vec![change1]).unwrap();
    let actor = "7b7723afd9e6480397a4d467b7693156".into();
    let expected_patch = Patch {
        actor: None,
        seq: None,
        clock: Clock::empty().with(&actor, 1),
        deps: Clock::empty().with(&actor, 1),
        can_undo: false,
        can_redo: false,
        diffs: vec![Diff::new(DiffAction::Set, ObjType::Map, ObjectId::Root)
            .with_key("bird".into())
            .with_value(ElementValue::Primitive("magpie".into()))],
    };
    assert_eq!(patch, expected_patch);
}

#[test]
fn test_concurrent_map_set_ties_on_actor() {
    // scenario: actors A and B set the same root key from empty deps
    let change_a = change(
        "A",
        1,
        Clock::empty(),
        vec![Operation::set(ObjectId::Root, "x".into(), 1.into())],
    );
    let change_b = change(
        "B",
        1,
        Clock::empty(),
        vec![Operation::set(ObjectId::Root, "x".into(), 2.into())],
    );

    let backend = Backend::init();
    let (backend, _) = backend.apply_changes(vec![change_a]).unwrap();
    let (_, patch) = backend.apply_changes(vec![change_b]).unwrap();

    let expected_diff = Diff::new(DiffAction::Set, ObjType::Map, ObjectId::Root)
        .with_key("x".into())
        .with_value(ElementValue::Primitive(2.into()))
        .with_conflicts(vec![Conflict {
            actor: "A".into(),
            value: Some(ElementValue::Primitive(1.into())),
            datatype: None,
        }]);
    assert_eq!(patch.diffs, vec![expected_diff]);
    assert_eq!(patch.clock, Clock::empty().with(&"A".into(), 1).with(&"B".into(), 1));
}

fn make_list_change(actor: &str) -> Change {
    change(
        actor,
        1,
        Clock::empty(),
        vec![
            Operation::MakeList {
                obj: "list-id".into(),
            },
            Operation::link(ObjectId::Root, "items".into(), "list-id".into()),
        ],
    )
}

#[test]
fn test_concurrent_insert_at_head() {
    // A creates the list; then A and B independently insert at the head
    // with the same elem counter. The actor tie-break puts B first.
    let setup = make_list_change("A");
    let insert_a = change(
        "A",
        2,
        Clock::empty(),
        vec![
            Operation::insert("list-id".into(), "_head".parse().unwrap(), 1),
            Operation::set("list-id".into(), "A:1".into(), "hello".into()),
        ],
    );
    let insert_b = change(
        "B",
        1,
        Clock::empty().with(&"A".into(), 1),
        vec![
            Operation::insert("list-id".into(), "_head".parse().unwrap(), 1),
            Operation::set("list-id".into(), "B:1".into(), "world".into()),
        ],
    );

    let backend = Backend::init();
    let (backend, _) = backend
        .apply_changes(vec![setup.clone(), insert_a.clone()])
        .unwrap();
    let (backend, patch) = backend.apply_changes(vec![insert_b.clone()]).unwrap();

    // B's element lands at index 0, in front of A's
    assert_eq!(
        patch.diffs,
        vec![Diff::new(DiffAction::Insert, ObjType::List, "list-id".into())
            .with_index(0)
            .with_elem_id("B:1".parse().unwrap())
            .with_value(ElementValue::Primitive("world".into()))]
    );

    // a replica that saw the changes in another order converges
    let other = Backend::init();
    let (other, _) = other
        .apply_changes(vec![insert_b, setup, insert_a])
        .unwrap();
    assert_eq!(other.get_patch(), backend.get_patch());

    let values: Vec<Option<ElementValue>> = backend
        .get_patch()
        .diffs
        .iter()
        .filter(|diff| diff.action == DiffAction::Insert)
        .map(|diff| diff.value.clone())
        .collect();
    assert_eq!(
        values,
        vec![
            Some(ElementValue::Primitive("world".into())),
            Some(ElementValue::Primitive("hello".into()))
        ]
    );
}

#[test]
fn test_sequential_insert_then_set() {
    let setup = make_list_change("A");
    let insert = change(
        "A",
        2,
        Clock::empty(),
        vec![
            Operation::insert("list-id".into(), "_head".parse().unwrap(), 1),
            Operation::set("list-id".into(), "A:1".into(), "a".into()),
        ],
    );
    let overwrite = change(
        "A",
        3,
        Clock::empty(),
        vec![Operation::set("list-id".into(), "A:1".into(), "b".into())],
    );

    let backend = Backend::init();
    let (backend, _) = backend.apply_changes(vec![setup, insert]).unwrap();
    let (backend, patch) = backend.apply_changes(vec![overwrite]).unwrap();

    assert_eq!(
        patch.diffs,
        vec![Diff::new(DiffAction::Set, ObjType::List, "list-id".into())
            .with_index(0)
            .with_elem_id("A:1".parse().unwrap())
            .with_value(ElementValue::Primitive("b".into()))]
    );

    let inserts: Vec<Diff> = backend
        .get_patch()
        .diffs
        .into_iter()
        .filter(|diff| diff.action == DiffAction::Insert)
        .collect();
    assert_eq!(inserts.len(), 1);
    assert_eq!(
        inserts[0].value,
        Some(ElementValue::Primitive("b".into()))
    );
    assert!(inserts[0].conflicts.is_empty());
}

#[test]
fn test_remote_delete_concurrent_with_local_edit() {
    // A inserts "x"; B, unaware of "x", inserts "y" and then deletes its
    // own element. After sync only "x" survives on every replica.
    let setup = make_list_change("A");
    let insert_x = change(
        "A",
        2,
        Clock::empty(),
        vec![
            Operation::insert("list-id".into(), "_head".parse().unwrap(), 1),
            Operation::set("list-id".into(), "A:1".into(), "x".into()),
        ],
    );
    let insert_y = change(
        "B",
        1,
        Clock::empty().with(&"A".into(), 1),
        vec![
            Operation::insert("list-id".into(), "_head".parse().unwrap(), 1),
            Operation::set("list-id".into(), "B:1".into(), "y".into()),
        ],
    );
    let delete_y = change(
        "B",
        2,
        Clock::empty().with(&"A".into(), 1),
        vec![Operation::delete("list-id".into(), "B:1".into())],
    );

    let backend1 = Backend::init();
    let (backend1, _) = backend1
        .apply_changes(vec![
            setup.clone(),
            insert_x.clone(),
            insert_y.clone(),
            delete_y.clone(),
        ])
        .unwrap();

    let backend2 = Backend::init();
    let (backend2, _) = backend2
        .apply_changes(vec![setup, insert_y, delete_y, insert_x])
        .unwrap();

    assert_eq!(backend1.get_patch(), backend2.get_patch());
    let inserts: Vec<Diff> = backend1
        .get_patch()
        .diffs
        .into_iter()
        .filter(|diff| diff.action == DiffAction::Insert)
        .collect();
    assert_eq!(inserts.len(), 1);
    assert_eq!(inserts[0].value, Some(ElementValue::Primitive("x".into())));
}

#[test]
fn test_causal_queueing_holds_changes_back() {
    let change1 = change(
        "A",
        1,
        Clock::empty(),
        vec![Operation::set(ObjectId::Root, "x".into(), 1.into())],
    );
    let change2 = change(
        "B",
        1,
        Clock::empty().with(&"A".into(), 1),
        vec![Operation::set(ObjectId::Root, "y".into(), 2.into())],
    );

    let backend = Backend::init();
    // deliver the dependent change first: nothing becomes visible
    let (backend, patch) = backend.apply_changes(vec![change2]).unwrap();
    assert_eq!(patch.diffs, vec![]);
    assert_eq!(patch.clock, Clock::empty());
    assert_eq!(backend.get_missing_deps(), Clock::empty().with(&"A".into(), 1));

    // once the dependency arrives both changes apply, in causal order
    let (backend, patch) = backend.apply_changes(vec![change1]).unwrap();
    assert_eq!(backend.get_missing_deps(), Clock::empty());
    let keys: Vec<String> = patch
        .diffs
        .iter()
        .map(|diff| diff.key.clone().unwrap().0)
        .collect();
    assert_eq!(keys, vec!["x".to_string(), "y".to_string()]);
    assert_eq!(
        patch.clock,
        Clock::empty().with(&"A".into(), 1).with(&"B".into(), 1)
    );
}

#[test]
fn test_duplicate_application_is_idempotent() {
    let change1 = change(
        "A",
        1,
        Clock::empty(),
        vec![Operation::set(ObjectId::Root, "x".into(), 1.into())],
    );

    let backend = Backend::init();
    let (backend1, _) = backend.apply_changes(vec![change1.clone()]).unwrap();
    let (backend2, patch) = backend1.apply_changes(vec![change1]).unwrap();

    assert_eq!(patch.diffs, vec![]);
    assert_eq!(backend1, backend2);
}

#[test]
fn test_reused_seq_with_different_content_fails() {
    let change1 = change(
        "A",
        1,
        Clock::empty(),
        vec![Operation::set(ObjectId::Root, "x".into(), 1.into())],
    );
    let mut change2 = change1.clone();
    change2.operations = vec![Operation::set(ObjectId::Root, "x".into(), 99.into())];

    let backend = Backend::init();
    let (backend, _) = backend.apply_changes(vec![change1]).unwrap();
    let result = backend.apply_changes(vec![change2]);
    assert_eq!(
        result.unwrap_err(),
        BackendError::InconsistentReuse {
            actor: "A".into(),
            seq: 1
        }
    );
}

#[test]
fn test_ill_typed_change_fails() {
    let zero_seq = change(
        "A",
        0,
        Clock::empty(),
        vec![Operation::set(ObjectId::Root, "x".into(), 1.into())],
    );
    let backend = Backend::init();
    assert!(matches!(
        backend.apply_changes(vec![zero_seq]),
        Err(BackendError::InvalidRequest(_))
    ));

    let empty_actor = change(
        "",
        1,
        Clock::empty(),
        vec![Operation::set(ObjectId::Root, "x".into(), 1.into())],
    );
    assert!(matches!(
        backend.apply_changes(vec![empty_actor]),
        Err(BackendError::InvalidRequest(_))
    ));
}

#[test]
fn test_duplicate_create_fails() {
    let change1 = make_list_change("A");
    let change2 = change(
        "B",
        1,
        Clock::empty().with(&"A".into(), 1),
        vec![Operation::MakeMap {
            obj: "list-id".into(),
        }],
    );
    let backend = Backend::init();
    let (backend, _) = backend.apply_changes(vec![change1]).unwrap();
    assert_eq!(
        backend.apply_changes(vec![change2]).unwrap_err(),
        BackendError::DuplicateCreate("list-id".into())
    );
}

#[test]
fn test_unknown_object_fails() {
    let change1 = change(
        "A",
        1,
        Clock::empty(),
        vec![Operation::set("no-such-object".into(), "x".into(), 1.into())],
    );
    let backend = Backend::init();
    assert_eq!(
        backend.apply_changes(vec![change1]).unwrap_err(),
        BackendError::UnknownObject("no-such-object".into())
    );
}

#[test]
fn test_duplicate_elem_and_unknown_pred_fail() {
    let setup = make_list_change("A");
    let insert = change(
        "A",
        2,
        Clock::empty(),
        vec![Operation::insert(
            "list-id".into(),
            "_head".parse().unwrap(),
            1,
        )],
    );
    let backend = Backend::init();
    let (backend, _) = backend.apply_changes(vec![setup, insert]).unwrap();

    let duplicate = change(
        "A",
        3,
        Clock::empty(),
        vec![Operation::insert(
            "list-id".into(),
            "_head".parse().unwrap(),
            1,
        )],
    );
    assert_eq!(
        backend.apply_changes(vec![duplicate]).unwrap_err(),
        BackendError::DuplicateElem("A:1".parse().unwrap())
    );

    let unknown_pred = change(
        "A",
        3,
        Clock::empty(),
        vec![Operation::insert(
            "list-id".into(),
            "Z:9".parse().unwrap(),
            2,
        )],
    );
    assert_eq!(
        backend.apply_changes(vec![unknown_pred]).unwrap_err(),
        BackendError::UnknownPred("Z:9".parse().unwrap())
    );
}

#[test]
fn test_insert_alone_emits_no_diff() {
    let setup = make_list_change("A");
    let insert_only = change(
        "A",
        2,
        Clock::empty(),
        vec![Operation::insert(
            "list-id".into(),
            "_head".parse().unwrap(),
            1,
        )],
    );
    let backend = Backend::init();
    let (backend, _) = backend.apply_changes(vec![setup]).unwrap();
    let (backend, patch) = backend.apply_changes(vec![insert_only]).unwrap();
    assert_eq!(patch.diffs, vec![]);

    // the element becomes visible once a value is assigned to it
    let assign = change(
        "A",
        3,
        Clock::empty(),
        vec![Operation::set("list-id".into(), "A:1".into(), "now".into())],
    );
    let (_, patch) = backend.apply_changes(vec![assign]).unwrap();
    assert_eq!(patch.diffs.len(), 1);
    assert_eq!(patch.diffs[0].action, DiffAction::Insert);
    assert_eq!(patch.diffs[0].index, Some(0));
}
