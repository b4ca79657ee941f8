use serde_json::json;
use syncdoc_protocol::{
    Change, ChangeRequest, Clock, Conflict, Diff, DiffAction, ElementValue, ObjType, ObjectId,
    Operation, Patch, RequestType, ScalarValue,
};

#[test]
fn change_round_trips_through_wire_json() {
    let json = json!({
        "actor": "actor1",
        "seq": 2,
        "deps": { "actor2": 1 },
        "message": "set a bird",
        "ops": [
            { "action": "makeList", "obj": "list-id" },
            { "action": "ins", "obj": "list-id", "key": "_head", "elem": 1 },
            { "action": "set", "obj": "list-id", "key": "actor1:1", "value": "magpie" },
            { "action": "link", "obj": ObjectId::Root.to_string(), "key": "birds", "value": "list-id" }
        ]
    });
    let change: Change = serde_json::from_value(json.clone()).unwrap();
    assert_eq!(change.actor_id, "actor1".into());
    assert_eq!(change.seq, 2);
    assert_eq!(change.deps.get(&"actor2".into()), 1);
    assert_eq!(change.operations.len(), 4);
    assert_eq!(
        change.operations[1],
        Operation::insert("list-id".into(), "_head".parse().unwrap(), 1)
    );
    assert_eq!(serde_json::to_value(&change).unwrap(), json);
}

#[test]
fn unknown_action_fails() {
    let json = json!({
        "actor": "actor1",
        "seq": 1,
        "deps": {},
        "ops": [ { "action": "frobnicate", "obj": "x" } ]
    });
    assert!(serde_json::from_value::<Change>(json).is_err());
}

#[test]
fn unknown_datatype_fails() {
    let json = json!({
        "actor": "actor1",
        "seq": 1,
        "deps": {},
        "ops": [
            { "action": "set", "obj": "x", "key": "k", "value": 1.0, "datatype": "hyperloglog" }
        ]
    });
    assert!(serde_json::from_value::<Change>(json).is_err());
}

#[test]
fn timestamp_datatype_is_understood() {
    let json = json!({
        "action": "set",
        "obj": ObjectId::Root.to_string(),
        "key": "now",
        "value": 1_640_995_200_000_f64,
        "datatype": "timestamp"
    });
    let op: Operation = serde_json::from_value(json.clone()).unwrap();
    assert!(matches!(op, Operation::Set { datatype: Some(_), .. }));
    assert_eq!(serde_json::to_value(&op).unwrap(), json);
}

#[test]
fn link_diffs_flatten_value_and_link_flag() {
    let diff = Diff::new(DiffAction::Set, ObjType::Map, ObjectId::Root)
        .with_key("child".into())
        .with_value(ElementValue::Link("child-id".into()));
    let json = serde_json::to_value(&diff).unwrap();
    assert_eq!(
        json,
        json!({
            "action": "set",
            "type": "map",
            "obj": ObjectId::Root.to_string(),
            "key": "child",
            "value": "child-id",
            "link": true
        })
    );
    let back: Diff = serde_json::from_value(json).unwrap();
    assert_eq!(back, diff);
}

#[test]
fn patch_serializes_camel_case() {
    let patch = Patch {
        actor: Some("actor1".into()),
        seq: Some(1),
        clock: Clock::empty().with(&"actor1".into(), 1),
        deps: Clock::empty().with(&"actor1".into(), 1),
        can_undo: true,
        can_redo: false,
        diffs: vec![Diff::new(DiffAction::Set, ObjType::Map, ObjectId::Root)
            .with_key("bird".into())
            .with_value(ElementValue::Primitive("magpie".into()))
            .with_conflicts(vec![Conflict {
                actor: "actor0".into(),
                value: Some(ElementValue::Primitive(ScalarValue::Number(3.0))),
                datatype: None,
            }])],
    };
    let json = serde_json::to_value(&patch).unwrap();
    assert_eq!(
        json,
        json!({
            "actor": "actor1",
            "seq": 1,
            "clock": { "actor1": 1 },
            "deps": { "actor1": 1 },
            "canUndo": true,
            "canRedo": false,
            "diffs": [{
                "action": "set",
                "type": "map",
                "obj": ObjectId::Root.to_string(),
                "key": "bird",
                "value": "magpie",
                "conflicts": [{ "actor": "actor0", "value": 3.0 }]
            }]
        })
    );
    let back: Patch = serde_json::from_value(json).unwrap();
    assert_eq!(back, patch);
}

#[test]
fn change_request_defaults_undoable() {
    let json = json!({
        "actor": "actor1",
        "seq": 1,
        "deps": {},
        "requestType": "undo"
    });
    let request: ChangeRequest = serde_json::from_value(json).unwrap();
    assert!(request.undoable);
    assert_eq!(request.request_type, RequestType::Undo);
    assert_eq!(request.ops, None);
    assert_eq!(serde_json::to_value(&request.deps).unwrap(), json!({}));
}
