use super::harness;
use indoc::indoc;
use serde_json::{Value, json};

const MAIN: &str = indoc! {"
    var a = 1;
    var b = 2;
    var c = a + b;
"};

fn stop_reasons(events: &[Value]) -> Vec<String> {
    events
        .iter()
        .filter(|event| event["event"] == "stopped")
        .map(|event| event["body"]["reason"].as_str().unwrap().to_string())
        .collect()
}

fn stop_texts(events: &[Value]) -> Vec<&str> {
    events
        .iter()
        .filter(|event| event["event"] == "stopped")
        .filter_map(|event| event["body"]["text"].as_str())
        .collect()
}

fn top_line(stack_trace: &Value) -> i64 {
    stack_trace["stackFrames"][0]["line"].as_i64().unwrap()
}

#[test]
fn next_pauses_on_every_new_line() {
    let h = harness();
    let global = h.host.add_global();
    let script = h.host.add_script(global, "main.js", MAIN);
    h.attach();
    h.request(
        "setBreakpoints",
        json!({ "source": { "path": "main.js" }, "breakpoints": [{ "line": 1 }] }),
    );

    for command in ["next", "next", "continue"] {
        h.wait.push("stackTrace", json!({ "threadId": 1 }));
        h.wait.push(command, json!({ "threadId": 1 }));
    }
    h.host.run_script(&h.debugger, script, None);

    assert_eq!(h.wait.pauses(), 3);
    assert_eq!(stop_reasons(&h.events()), vec!["breakpoint", "step", "step"]);
    let lines: Vec<i64> = (0..3).map(|i| top_line(&h.response_body("stackTrace", i))).collect();
    assert_eq!(lines, vec![1, 2, 3]);
}

#[test]
fn next_steps_over_calls() {
    let h = harness();
    let global = h.host.add_global();
    let script = h.host.add_script_with_lines(global, "main.js", MAIN, &[1, 2, 3]);
    let helper = h.host.add_function(script, Some("helper"), &[5, 6]);
    h.attach();

    let outer = h.host.enter_frame(&h.debugger, script, 1, None, None);
    h.wait.push("next", Value::Null);
    h.host.debugger_statement(&h.debugger, outer);

    let inner = h.host.enter_frame(&h.debugger, helper, 5, Some(outer), None);
    h.host.step_to(&h.debugger, inner, 6);
    h.host.pop_frame(&h.debugger, inner);
    assert_eq!(h.wait.pauses(), 1);

    h.wait.push("stackTrace", Value::Null);
    h.wait.push("continue", Value::Null);
    h.host.step_to(&h.debugger, outer, 2);

    assert_eq!(h.wait.pauses(), 2);
    assert_eq!(stop_reasons(&h.events()), vec!["debugger", "step"]);
    assert_eq!(top_line(&h.response_body("stackTrace", 0)), 2);
}

#[test]
fn step_in_pauses_in_the_callee() {
    let h = harness();
    let global = h.host.add_global();
    let script = h.host.add_script_with_lines(global, "main.js", MAIN, &[1, 2, 3]);
    let helper = h.host.add_function(script, Some("helper"), &[5, 6]);
    h.attach();

    let outer = h.host.enter_frame(&h.debugger, script, 1, None, None);
    h.wait.push("stepIn", Value::Null);
    h.host.debugger_statement(&h.debugger, outer);

    let inner = h.host.enter_frame(&h.debugger, helper, 5, Some(outer), None);
    assert!(h.host.step_hook_enabled(inner));

    h.wait.push("stackTrace", Value::Null);
    h.wait.push("continue", Value::Null);
    h.host.step_to(&h.debugger, inner, 6);

    let events = h.events();
    assert_eq!(stop_reasons(&events), vec!["debugger", "step"]);
    assert_eq!(stop_texts(&events)[1], "Paused on stepIn");
    let stack = h.response_body("stackTrace", 0);
    assert_eq!(stack["totalFrames"], 2);
    assert_eq!(stack["stackFrames"][0]["name"], "helper");
    assert_eq!(stack["stackFrames"][0]["line"], 6);
    assert_eq!(stack["stackFrames"][1]["name"], "main.js");
    assert_eq!(stack["stackFrames"][1]["id"], 2);

    // `continue` removed the step decoration from the whole chain.
    assert!(!h.host.step_hook_enabled(inner));
    assert!(!h.host.step_hook_enabled(outer));
}

#[test]
fn step_out_pauses_in_the_caller() {
    let h = harness();
    let global = h.host.add_global();
    let script = h.host.add_script_with_lines(global, "main.js", MAIN, &[1, 2, 3]);
    let helper = h.host.add_function(script, Some("helper"), &[5, 6, 7]);
    h.attach();

    let outer = h.host.enter_frame(&h.debugger, script, 1, None, None);
    let inner = h.host.enter_frame(&h.debugger, helper, 5, Some(outer), None);
    h.wait.push("stepOut", Value::Null);
    h.host.debugger_statement(&h.debugger, inner);

    // The rest of the callee runs without pausing.
    h.host.step_to(&h.debugger, inner, 6);
    h.host.step_to(&h.debugger, inner, 7);
    assert_eq!(h.wait.pauses(), 1);
    h.host.pop_frame(&h.debugger, inner);
    assert!(h.host.step_hook_enabled(outer));

    h.wait.push("stackTrace", Value::Null);
    h.wait.push("continue", Value::Null);
    h.host.step_to(&h.debugger, outer, 2);

    let events = h.events();
    assert_eq!(stop_reasons(&events), vec!["debugger", "step"]);
    assert_eq!(stop_texts(&events)[1], "Paused on stepOut");
    let stack = h.response_body("stackTrace", 0);
    assert_eq!(stack["totalFrames"], 1);
    assert_eq!(stack["stackFrames"][0]["line"], 2);
}

#[test]
fn step_out_of_the_outermost_frame_finishes_quietly() {
    let h = harness();
    let global = h.host.add_global();
    let script = h.host.add_script(global, "main.js", MAIN);
    h.attach();
    h.request(
        "setBreakpoints",
        json!({ "source": { "path": "main.js" }, "breakpoints": [{ "line": 1 }] }),
    );

    h.wait.push("stepOut", Value::Null);
    h.host.run_script(&h.debugger, script, None);

    assert_eq!(h.wait.pauses(), 1);
    assert_eq!(h.debugger.session().current_frame(), None);
    let frame = crate::FrameId(0);
    assert!(!h.host.step_hook_enabled(frame));
    assert!(!h.host.pop_hook_enabled(frame));
    assert!(h.debugger.is_attached());
}

#[test]
fn stack_trace_stops_at_frames_no_longer_live() {
    let h = harness();
    let global = h.host.add_global();
    let script = h.host.add_script_with_lines(global, "main.js", MAIN, &[1, 2, 3]);
    let helper = h.host.add_function(script, None, &[5]);
    let nested = h.host.add_function(helper, Some("nested"), &[6]);
    h.attach();

    let outer = h.host.enter_frame(&h.debugger, script, 1, None, None);
    let middle = h.host.enter_frame(&h.debugger, helper, 5, Some(outer), None);
    let inner = h.host.enter_frame(&h.debugger, nested, 6, Some(middle), None);
    h.host.terminate_frame(middle);

    h.wait.push("stackTrace", Value::Null);
    h.wait.push("scopes", json!({ "frameId": 2 }));
    h.wait.push("continue", Value::Null);
    h.host.debugger_statement(&h.debugger, inner);

    let stack = h.response_body("stackTrace", 0);
    assert_eq!(stack["totalFrames"], 1);
    assert_eq!(stack["stackFrames"][0]["name"], "nested");

    let scopes = &h.wait.responses_to("scopes")[0];
    assert_eq!(scopes["success"], false);
    assert_eq!(scopes["body"]["error"], "Invalid frameId");
}

#[test]
fn nested_pauses_restore_the_outer_frame() {
    let h = harness();
    let global = h.host.add_global();
    let script = h.host.add_script_with_lines(global, "main.js", MAIN, &[1, 2, 3]);
    h.attach();

    let outer = h.host.enter_frame(&h.debugger, script, 1, None, None);
    let inner = h.host.enter_frame(&h.debugger, script, 2, Some(outer), None);

    let observed = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
    let sink = std::rc::Rc::clone(&observed);
    let host = std::rc::Rc::clone(&h.host);
    let debugger = h.debugger.clone();
    h.debugger.session().hub().register_hook_name("onNested", "test");
    h.debugger.on("onNested", "test", move |session, _| {
        host.debugger_statement(&debugger, inner);
        sink.borrow_mut().push(session.current_frame());
        Ok(())
    });
    h.debugger.session().protocol().register_command("nest", |session, _| {
        session.trigger("onNested", &crate::HookData::None);
        Ok(None)
    });

    h.wait.push("nest", Value::Null);
    h.wait.push("continue", Value::Null);
    h.wait.push("continue", Value::Null);
    h.host.debugger_statement(&h.debugger, outer);

    assert_eq!(h.wait.pauses(), 2);
    assert_eq!(*observed.borrow(), vec![Some(outer)]);
    assert_eq!(h.debugger.session().current_frame(), None);
}

#[test]
fn decorations_are_dropped_once_frames_pop() {
    let h = harness();
    let global = h.host.add_global();
    let script = h.host.add_script_with_lines(global, "main.js", MAIN, &[1, 2, 3]);
    h.attach();

    let mut stack = vec![h.host.enter_frame(&h.debugger, script, 1, None, None)];
    for _ in 0..4 {
        let older = stack.last().copied();
        stack.push(h.host.enter_frame(&h.debugger, script, 2, older, None));
    }
    let frames = h.debugger.plugins().frames();

    let innermost = *stack.last().unwrap();
    h.wait.push("stackTrace", Value::Null);
    h.wait.push("continue", Value::Null);
    h.host.debugger_statement(&h.debugger, innermost);
    assert_eq!(h.response_body("stackTrace", 0)["totalFrames"], 5);
    assert_eq!(frames.decorated_frames(), 0);

    for frame in stack.into_iter().rev() {
        h.host.pop_frame(&h.debugger, frame);
    }
    assert_eq!(frames.decorated_frames(), 0);
}

#[test]
fn a_pending_step_decorates_until_the_frame_pops() {
    let h = harness();
    let global = h.host.add_global();
    let script = h.host.add_script_with_lines(global, "main.js", MAIN, &[1, 2, 3]);
    h.attach();
    let frames = h.debugger.plugins().frames();

    let frame = h.host.enter_frame(&h.debugger, script, 1, None, None);
    h.wait.push("next", Value::Null);
    h.host.debugger_statement(&h.debugger, frame);
    assert!(frames.is_hooked(frame));
    assert!(frames.has_step_intent(frame));
    assert!(h.host.pop_hook_enabled(frame));

    h.host.pop_frame(&h.debugger, frame);
    assert!(!frames.is_hooked(frame));
    assert_eq!(frames.decorated_frames(), 0);
    assert_eq!(h.wait.pauses(), 1);
}

#[test]
fn stack_trace_pages_through_the_chain() {
    let h = harness();
    let global = h.host.add_global();
    let script = h.host.add_script_with_lines(global, "main.js", MAIN, &[1, 2, 3]);
    h.attach();

    let outer = h.host.enter_frame(&h.debugger, script, 1, None, None);
    let middle = h.host.enter_frame(&h.debugger, script, 2, Some(outer), None);
    let inner = h.host.enter_frame(&h.debugger, script, 3, Some(middle), None);

    h.wait.push("stackTrace", json!({ "threadId": 1, "startFrame": 1, "levels": 1 }));
    h.wait.push("stackTrace", json!({ "threadId": 1, "startFrame": 1, "levels": 0 }));
    h.wait.push("continue", Value::Null);
    h.host.debugger_statement(&h.debugger, inner);

    let page = h.response_body("stackTrace", 0);
    assert_eq!(page["totalFrames"], 3);
    assert_eq!(page["stackFrames"].as_array().unwrap().len(), 1);
    assert_eq!(page["stackFrames"][0]["id"], 2);
    assert_eq!(page["stackFrames"][0]["line"], 2);

    let rest = h.response_body("stackTrace", 1);
    let ids: Vec<i64> = rest["stackFrames"]
        .as_array()
        .unwrap()
        .iter()
        .map(|frame| frame["id"].as_i64().unwrap())
        .collect();
    assert_eq!(ids, [2, 3]);
}
