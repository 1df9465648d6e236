use super::{Harness, harness};
use crate::{
    FrameId,
    native::{DebugValue, EnvironmentInfo, EnvironmentKind, FunctionInfo, FunctionKind, ObjectInfo, ObjectKind},
};
use serde_json::{Value, json};

/// Builds a paused-ready frame:
///
/// ```text
/// global { level: "mainland" }
///   closure { count: 3, player: { x: 1, name: "p" }, empty: {}, move: (a) => .. }
/// ```
fn fixture() -> (Harness, FrameId) {
    let h = harness();
    let global = h.host.add_global();
    let script = h.host.add_script(global, "main.js", "var count = 3;\n");
    h.attach();

    let global_env = h.host.global_env(global).unwrap();
    h.host.bind(global_env, "level", DebugValue::String("mainland".into()));

    let frame = h.host.enter_frame(&h.debugger, script, 1, None, None);
    let env = h.host.env_of(frame).unwrap();
    let player = h.host.add_plain_object(&[
        ("x", DebugValue::Number(1.0)),
        ("name", DebugValue::String("p".into())),
    ]);
    let empty = h.host.add_plain_object(&[]);
    let function = FunctionInfo {
        kind: FunctionKind::Arrow,
        name: Some("move".into()),
        parameters: vec!["a".into()],
    };
    let callable = h.host.add_object(
        ObjectInfo {
            class: "Function".into(),
            display_name: None,
            kind: ObjectKind::Function(function),
        },
        vec![("length".into(), DebugValue::Number(1.0))],
    );
    h.host.bind(env, "count", DebugValue::Number(3.0));
    h.host.bind(env, "player", DebugValue::Object(player));
    h.host.bind(env, "empty", DebugValue::Object(empty));
    h.host.bind(env, "move", DebugValue::Object(callable));
    (h, frame)
}

fn pause(h: &Harness, frame: FrameId, requests: &[(&str, Value)]) {
    for (command, arguments) in requests {
        h.wait.push(command, arguments.clone());
    }
    h.wait.push("continue", Value::Null);
    h.host.debugger_statement(&h.debugger, frame);
}

#[test]
fn scopes_list_the_environment_chain() {
    let (h, frame) = fixture();
    pause(&h, frame, &[("scopes", json!({ "frameId": 1 }))]);

    assert_eq!(
        h.response_body("scopes", 0),
        json!({
            "scopes": [
                { "name": "Closure", "variablesReference": 1, "expensive": false },
                { "name": "Global", "variablesReference": 2, "expensive": false }
            ]
        })
    );
}

#[test]
fn scope_labels_describe_the_environment() {
    let h = harness();
    let global = h.host.add_global();
    let script = h.host.add_script(global, "main.js", "f();\n");
    h.attach();

    let global_env = h.host.global_env(global);
    let with = h.host.add_env(
        EnvironmentInfo {
            kind: EnvironmentKind::With,
            scope_kind: None,
            optimized_out: false,
            callee_name: None,
            parent: global_env,
        },
        Some(h.host.add_plain_object(&[])),
    );
    let block = h.host.add_env(
        EnvironmentInfo {
            kind: EnvironmentKind::Declarative,
            scope_kind: Some("block".into()),
            optimized_out: true,
            callee_name: None,
            parent: Some(with),
        },
        None,
    );
    let function = h.host.add_function_env(Some(block), Some("tick"));
    let frame = h.host.enter_frame(&h.debugger, script, 1, None, Some(function));

    pause(&h, frame, &[("scopes", json!({ "frameId": 1 }))]);
    let names: Vec<_> = h.response_body("scopes", 0)["scopes"]
        .as_array()
        .unwrap()
        .iter()
        .map(|scope| scope["name"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(
        names,
        vec![
            "Closure",
            "Closure (Script: tick)",
            "(Optimized Out) Block",
            "With Scope",
            "Global",
        ]
    );
}

#[test]
fn variables_describe_values() {
    let (h, frame) = fixture();
    pause(
        &h,
        frame,
        &[
            ("scopes", json!({ "frameId": 1 })),
            ("variables", json!({ "variablesReference": 1 })),
            ("variables", json!({ "variablesReference": 3 })),
            ("variables", json!({ "variablesReference": 2 })),
        ],
    );

    assert_eq!(
        h.response_body("variables", 0),
        json!({
            "variables": [
                { "name": "count", "value": "3", "variablesReference": 0 },
                { "name": "player", "value": "[Object (Prototype: Object)]", "variablesReference": 3 },
                { "name": "empty", "value": "[Object (Prototype: Object)]", "variablesReference": 0 },
                {
                    "name": "move",
                    "value": "[Arrow Function] move(a)",
                    "type": "Arrow Function",
                    "presentationHint": { "kind": "method" },
                    "variablesReference": 0
                }
            ]
        })
    );
    assert_eq!(
        h.response_body("variables", 1),
        json!({
            "variables": [
                { "name": "x", "value": "1", "variablesReference": 0 },
                { "name": "name", "value": "\"p\"", "variablesReference": 0 }
            ]
        })
    );
    assert_eq!(
        h.response_body("variables", 2)["variables"],
        json!([{ "name": "level", "value": "\"mainland\"", "variablesReference": 0 }])
    );
}

#[test]
fn this_is_listed_first_in_the_innermost_scope() {
    let (h, frame) = fixture();
    let receiver = h.host.add_plain_object(&[("hp", DebugValue::Number(100.0))]);
    h.host.set_this(frame, Some(receiver));

    pause(
        &h,
        frame,
        &[
            ("scopes", json!({ "frameId": 1 })),
            ("variables", json!({ "variablesReference": 1 })),
        ],
    );

    let variables = h.response_body("variables", 0);
    assert_eq!(variables["variables"][0]["name"], "this");
    assert_eq!(variables["variables"][0]["variablesReference"], 3);
    assert_eq!(variables["variables"][1]["name"], "count");
}

#[test]
fn unknown_references_expand_to_nothing() {
    let (h, frame) = fixture();
    pause(
        &h,
        frame,
        &[
            ("scopes", json!({ "frameId": 1 })),
            ("variables", json!({ "variablesReference": 0 })),
            ("variables", json!({ "variablesReference": 99 })),
            ("variables", json!({ "variablesReference": -4 })),
        ],
    );

    for index in 0..3 {
        assert_eq!(h.response_body("variables", index), json!({ "variables": [] }));
    }
}

#[test]
fn continue_invalidates_references() {
    let (h, frame) = fixture();
    pause(&h, frame, &[("scopes", json!({ "frameId": 1 }))]);
    pause(&h, frame, &[("variables", json!({ "variablesReference": 1 }))]);

    assert_eq!(h.response_body("variables", 0), json!({ "variables": [] }));
}

#[test]
fn expanding_the_same_path_reuses_the_reference() {
    let (h, frame) = fixture();
    pause(
        &h,
        frame,
        &[
            ("scopes", json!({ "frameId": 1 })),
            ("scopes", json!({ "frameId": 1 })),
        ],
    );
    assert_eq!(h.response_body("scopes", 0), h.response_body("scopes", 1));
}

#[test]
fn evaluate_renders_results() {
    let (h, frame) = fixture();
    pause(
        &h,
        frame,
        &[
            ("evaluate", json!({ "expression": "1+1", "frameId": 1 })),
            ("evaluate", json!({ "expression": "count + 1" })),
            ("evaluate", json!({ "expression": "player.name + '!'" })),
            ("evaluate", json!({ "expression": "level" })),
            ("evaluate", json!({ "expression": "undefined" })),
            ("evaluate", json!({ "expression": "player" })),
            ("evaluate", json!({ "expression": "move" })),
        ],
    );

    let results: Vec<Value> = (0..7)
        .map(|i| h.response_body("evaluate", i))
        .collect();
    assert_eq!(results[0], json!({ "result": "2", "variablesReference": 0 }));
    assert_eq!(results[1]["result"], "4");
    assert_eq!(results[2]["result"], "\"p!\"");
    assert_eq!(results[3]["result"], "\"mainland\"");
    assert_eq!(results[4]["result"], "undefined");
    assert_eq!(
        results[5],
        json!({ "result": "[Object (Prototype: Object)]", "variablesReference": 1 })
    );
    assert_eq!(results[6]["type"], "Arrow Function");
    assert_eq!(results[6]["presentationHint"], json!({ "kind": "method" }));
}

#[test]
fn evaluate_reports_failures() {
    let (h, frame) = fixture();
    pause(
        &h,
        frame,
        &[
            ("evaluate", json!({ "expression": "missing" })),
            ("evaluate", json!({ "expression": "" })),
            ("evaluate", json!({ "expression": "1", "frameId": 5 })),
        ],
    );

    let errors: Vec<Value> = h
        .wait
        .responses_to("evaluate")
        .iter()
        .map(|response| {
            assert_eq!(response["success"], false);
            response["body"]["error"].clone()
        })
        .collect();
    assert_eq!(
        errors,
        vec![
            json!("Error evaluating expression: ReferenceError: missing is not defined"),
            json!("No expression provided for evaluation"),
            json!("Invalid frameId"),
        ]
    );
}

#[test]
fn evaluation_in_a_terminated_frame_fails() {
    let (h, frame) = fixture();
    h.host.terminate_frame(frame);
    pause(&h, frame, &[("evaluate", json!({ "expression": "count" }))]);

    let response = &h.wait.responses_to("evaluate")[0];
    assert_eq!(response["body"]["error"], "Current frame is not on stack or is terminated");
}

#[test]
fn stepping_invalidates_references() {
    let (h, frame) = fixture();
    h.wait.push("scopes", json!({ "frameId": 1 }));
    h.wait.push("next", Value::Null);
    h.host.debugger_statement(&h.debugger, frame);
    assert_eq!(h.debugger.plugins().inspector().reference_count(), 0);

    h.wait.push("variables", json!({ "variablesReference": 1 }));
    h.wait.push("continue", Value::Null);
    h.host.step_to(&h.debugger, frame, 2);

    assert_eq!(h.wait.pauses(), 2);
    assert_eq!(h.response_body("variables", 0), json!({ "variables": [] }));
}
