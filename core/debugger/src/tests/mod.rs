//! End-to-end scenarios driving the bridge through the simulated engine.

mod inspector;
mod lifecycle;
mod stepping;

use crate::{
    Debugger,
    sim::{ScriptedWait, SimHost},
};
use serde_json::{Value, json};
use std::cell::Cell;
use std::rc::Rc;

/// A debugger wired to a simulated engine and a scripted client.
pub(crate) struct Harness {
    pub(crate) debugger: Debugger,
    pub(crate) host: Rc<SimHost>,
    pub(crate) wait: Rc<ScriptedWait>,
    seq: Cell<i64>,
}

pub(crate) fn harness() -> Harness {
    let host = Rc::new(SimHost::new());
    let wait = Rc::new(ScriptedWait::new());
    let debugger = Debugger::new(host.clone(), wait.clone());
    Harness {
        debugger,
        host,
        wait,
        seq: Cell::new(1000),
    }
}

impl Harness {
    /// Sends one request outside of any pause and returns the response.
    pub(crate) fn request(&self, command: &str, arguments: Value) -> Value {
        let seq = self.seq.get() + 1;
        self.seq.set(seq);
        self.debugger.handle_message(json!({
            "seq": seq,
            "type": "request",
            "command": command,
            "arguments": arguments,
        }))
    }

    /// Runs the client handshake and drops the events it produced.
    pub(crate) fn attach(&self) {
        assert_eq!(self.request("initialize", json!({ "adapterID": "test" }))["success"], true);
        assert_eq!(self.request("attach", Value::Null)["success"], true);
        assert_eq!(self.request("configurationDone", Value::Null)["success"], true);
        self.events();
    }

    /// Drains the outbound event queue.
    pub(crate) fn events(&self) -> Vec<Value> {
        std::iter::from_fn(|| self.debugger.next_event()).collect()
    }

    /// Drains the outbound event queue, keeping the bodies of `name` events.
    pub(crate) fn events_named(&self, name: &str) -> Vec<Value> {
        self.events()
            .into_iter()
            .filter(|event| event["event"] == name)
            .map(|event| event["body"].clone())
            .collect()
    }

    /// The body of the `index`th scripted response to `command`.
    pub(crate) fn response_body(&self, command: &str, index: usize) -> Value {
        let response = self.wait.responses_to(command)[index].clone();
        assert_eq!(response["success"], true, "{command} failed: {response}");
        response["body"].clone()
    }
}
