use super::harness;
use crate::{EngineHooks, native::DebugValue};
use serde_json::{Value, json};

const MAIN: &str = "var a = 1;\nvar b = 2;\n";

#[test]
fn initialize_reports_capabilities() {
    let h = harness();
    let response = h.request("initialize", json!({ "clientID": "vscode" }));
    assert_eq!(response["success"], true);
    assert_eq!(response["body"]["supportsConfigurationDoneRequest"], true);
    assert_eq!(response["body"]["supportsLoadedSourcesRequest"], true);
    assert_eq!(response["body"].as_object().unwrap().len(), 2);
}

#[test]
fn attach_instruments_existing_globals() {
    let h = harness();
    let global = h.host.add_global();
    assert!(!h.host.is_debuggee(global));

    let response = h.request("attach", Value::Null);
    assert_eq!(response["success"], true);
    assert!(h.debugger.is_attached());
    assert!(h.host.is_debuggee(global));

    let events = h.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0]["event"], "initialized");
}

#[test]
fn new_globals_follow_attach_state() {
    let h = harness();
    let before = h.host.new_global(&h.debugger);
    assert!(!h.host.is_debuggee(before));

    h.attach();
    let after = h.host.new_global(&h.debugger);
    assert!(h.host.is_debuggee(after));
}

#[test]
fn threads_reports_the_single_thread() {
    let h = harness();
    let response = h.request("threads", Value::Null);
    assert_eq!(response["body"], json!({ "threads": [{ "id": 1, "name": "Main Thread" }] }));
}

#[test]
fn loaded_sources_requires_attach() {
    let h = harness();
    let response = h.request("loadedSources", Value::Null);
    assert_eq!(response["success"], false);
    assert_eq!(response["body"]["error"], "Debugger not attached");

    let response = h.request("source", json!({ "sourceReference": 1 }));
    assert_eq!(response["body"]["error"], "Debugger not attached");
}

#[test]
fn attach_registers_sources_already_loaded() {
    let h = harness();
    let global = h.host.add_global();
    h.host.add_script(global, "maps\\main.js", MAIN);
    h.attach();

    let response = h.request("loadedSources", Value::Null);
    assert_eq!(
        response["body"]["sources"],
        json!([{
            "path": "maps\\main.js",
            "sourceReference": 1,
            "origin": "dapbridge"
        }])
    );

    let response = h.request("source", json!({ "sourceReference": 1 }));
    assert_eq!(response["body"]["content"], MAIN);
    let response = h.request("source", json!({ "source": { "sourceReference": 1 } }));
    assert_eq!(response["body"]["content"], MAIN);

    let response = h.request("source", json!({ "sourceReference": 2 }));
    assert_eq!(response["success"], false);
    assert_eq!(response["body"]["error"], "Invalid source reference");
}

#[test]
fn scripts_compiled_while_attached_are_announced() {
    let h = harness();
    let global = h.host.add_global();
    h.attach();

    h.host.load_script(&h.debugger, global, "a.js", MAIN);
    h.host.load_script(&h.debugger, global, "b.js", MAIN);
    // Recompiling a known url keeps its reference.
    h.host.load_script(&h.debugger, global, "a.js", MAIN);

    let loaded = h.events_named("loadedSource");
    let references: Vec<_> = loaded
        .iter()
        .map(|body| (body["reason"].clone(), body["source"]["sourceReference"].clone()))
        .collect();
    assert_eq!(
        references,
        vec![(json!("new"), json!(1)), (json!("new"), json!(2)), (json!("new"), json!(1))]
    );
}

#[test]
fn scripts_compiled_while_detached_are_ignored() {
    let h = harness();
    let global = h.host.add_global();
    h.host.load_script(&h.debugger, global, "a.js", MAIN);
    assert!(h.events().is_empty());
    assert!(h.debugger.session().sources().is_empty());
}

#[test]
fn detach_resets_every_table() {
    let h = harness();
    let global = h.host.add_global();
    h.host.add_script(global, "a.js", MAIN);
    h.attach();

    let response = h.request(
        "setBreakpoints",
        json!({ "source": { "path": "a.js" }, "breakpoints": [{ "line": 2 }] }),
    );
    assert_eq!(response["body"]["breakpoints"][0]["verified"], true);
    assert_eq!(h.host.breakpoints().len(), 1);

    let response = h.request("disconnect", json!({ "terminateDebuggee": false }));
    assert_eq!(response["success"], true);
    assert!(!h.debugger.is_attached());
    assert!(h.host.breakpoints().is_empty());
    assert!(!h.host.is_debuggee(global));
    assert!(h.debugger.session().sources().is_empty());
    assert_eq!(h.request("loadedSources", Value::Null)["success"], false);

    // A second session starts from scratch.
    h.attach();
    assert_eq!(h.debugger.session().sources().len(), 1);
    let response = h.request(
        "setBreakpoints",
        json!({ "source": { "path": "other.js" }, "breakpoints": [{ "line": 1 }] }),
    );
    assert_eq!(response["body"]["breakpoints"][0]["id"], 1000);
}

#[test]
fn disconnect_releases_a_pause() {
    let h = harness();
    let global = h.host.add_global();
    let script = h.host.add_script(global, "a.js", MAIN);
    h.attach();

    let frame = h.host.enter_frame(&h.debugger, script, 1, None, None);
    h.wait.push("disconnect", Value::Null);
    h.wait.push("threads", Value::Null);
    h.host.debugger_statement(&h.debugger, frame);

    assert_eq!(h.wait.pauses(), 1);
    assert_eq!(h.wait.pending(), 1);
    assert!(!h.debugger.is_attached());
    assert_eq!(h.debugger.session().current_frame(), None);
}

#[test]
fn detach_during_a_step_pause_drops_references_and_decorations() {
    let h = harness();
    let global = h.host.add_global();
    let script = h.host.add_script(global, "a.js", MAIN);
    h.attach();

    let frame = h.host.enter_frame(&h.debugger, script, 1, None, None);
    h.host.bind(h.host.env_of(frame).unwrap(), "a", DebugValue::Number(1.0));
    h.wait.push("next", Value::Null);
    h.host.debugger_statement(&h.debugger, frame);

    h.wait.push("scopes", json!({ "frameId": 1 }));
    h.wait.push("variables", json!({ "variablesReference": 1 }));
    h.wait.push("disconnect", Value::Null);
    h.host.step_to(&h.debugger, frame, 2);

    assert_eq!(h.wait.pauses(), 2);
    assert_eq!(h.response_body("variables", 0)["variables"][0]["name"], "a");
    assert!(!h.debugger.is_attached());
    assert_eq!(h.debugger.session().current_frame(), None);
    assert_eq!(h.debugger.plugins().inspector().reference_count(), 0);
    assert_eq!(h.debugger.plugins().frames().decorated_frames(), 0);
    assert!(!h.host.step_hook_enabled(frame));
    assert!(!h.host.pop_hook_enabled(frame));
}

#[test]
fn detach_with_a_pending_step_unhooks_the_frame() {
    let h = harness();
    let global = h.host.add_global();
    let script = h.host.add_script(global, "a.js", MAIN);
    h.attach();

    let frame = h.host.enter_frame(&h.debugger, script, 1, None, None);
    h.wait.push("next", Value::Null);
    h.host.debugger_statement(&h.debugger, frame);
    assert!(h.host.step_hook_enabled(frame));
    assert!(h.debugger.plugins().frames().is_hooked(frame));

    assert_eq!(h.request("disconnect", Value::Null)["success"], true);
    assert!(!h.host.step_hook_enabled(frame));
    assert!(!h.host.pop_hook_enabled(frame));
    assert_eq!(h.debugger.plugins().frames().decorated_frames(), 0);

    h.host.step_to(&h.debugger, frame, 2);
    assert_eq!(h.wait.pauses(), 1);
}

#[test]
fn pauses_are_ignored_while_detached() {
    let h = harness();
    let global = h.host.add_global();
    let script = h.host.add_script(global, "a.js", "debugger;\n");

    h.host.run_script(&h.debugger, script, None);
    assert_eq!(h.wait.pauses(), 0);
    assert!(h.events().is_empty());
}

#[test]
fn uncaught_exceptions_do_not_break_the_session() {
    let h = harness();
    h.attach();
    h.debugger.on_uncaught_exception("TypeError: x is undefined");
    assert!(h.debugger.is_attached());
    assert_eq!(h.request("threads", Value::Null)["success"], true);
}

#[test]
fn commands_needing_a_pause_fail_without_one() {
    let h = harness();
    h.attach();

    for (command, arguments, error) in [
        ("stackTrace", json!({ "threadId": 1 }), "No current frame available"),
        ("scopes", json!({ "frameId": 1 }), "No current frame available"),
        ("evaluate", json!({ "expression": "1" }), "No current frame available"),
        ("next", json!({ "threadId": 1 }), "No current frame available"),
        ("stepIn", json!({ "threadId": 1 }), "No current frame available"),
        ("stepOut", json!({ "threadId": 1 }), "No current frame available"),
    ] {
        let response = h.request(command, arguments);
        assert_eq!(response["success"], false, "{command}");
        assert_eq!(response["body"]["error"], error, "{command}");
    }

    // `continue` outside a pause is harmless.
    let response = h.request("continue", json!({ "threadId": 1 }));
    assert_eq!(response["body"]["allThreadsContinued"], true);
}
