//! A [`MessageWait`] answering pauses from a scripted request queue.

use crate::dap::pump::{MessageDispatch, MessageWait};
use serde_json::{Value, json};
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;

const LOG_TARGET: &str = "dapbridge::sim";

/// Feeds queued requests to the debugger while it is paused.
///
/// Each pause dispatches requests from the front of the queue until one of
/// them releases the pause. A pause finding the queue empty returns at once,
/// as if the client had resumed.
#[derive(Debug, Default)]
pub struct ScriptedWait {
    queue: RefCell<VecDeque<Value>>,
    responses: RefCell<Vec<Value>>,
    waits: RefCell<Vec<bool>>,
    pauses: Cell<usize>,
    seq: Cell<i64>,
}

impl ScriptedWait {
    /// Creates an empty script.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a request for the next pause.
    pub fn push(&self, command: &str, arguments: Value) {
        let seq = self.seq.get() + 1;
        self.seq.set(seq);
        self.queue.borrow_mut().push_back(json!({
            "seq": seq,
            "type": "request",
            "command": command,
            "arguments": arguments,
        }));
    }

    /// The number of requests not yet dispatched.
    pub fn pending(&self) -> usize {
        self.queue.borrow().len()
    }

    /// Every response produced during pauses, in order.
    pub fn responses(&self) -> Vec<Value> {
        self.responses.borrow().clone()
    }

    /// The responses to `command`, in order.
    pub fn responses_to(&self, command: &str) -> Vec<Value> {
        self.responses
            .borrow()
            .iter()
            .filter(|response| response["command"] == command)
            .cloned()
            .collect()
    }

    /// The number of pauses entered so far.
    pub fn pauses(&self) -> usize {
        self.pauses.get()
    }

    /// The current nesting depth of pauses.
    pub fn depth(&self) -> usize {
        self.waits.borrow().len()
    }

    fn released(&self) -> bool {
        self.waits.borrow().last().copied().unwrap_or(true)
    }
}

impl MessageWait for ScriptedWait {
    fn wait_for_message(&self, dispatch: &dyn MessageDispatch) {
        self.pauses.set(self.pauses.get() + 1);
        self.waits.borrow_mut().push(false);
        log::debug!(target: LOG_TARGET, "Entering pause {}", self.pauses.get());

        loop {
            let Some(request) = self.queue.borrow_mut().pop_front() else {
                log::warn!(target: LOG_TARGET, "No scripted request left, resuming");
                break;
            };
            let response = dispatch.handle_message(request);
            self.responses.borrow_mut().push(response);
            if self.released() {
                break;
            }
        }

        self.waits.borrow_mut().pop();
    }

    fn end_waiting_for_message(&self) {
        let mut waits = self.waits.borrow_mut();
        match waits.last_mut() {
            Some(released) if !*released => *released = true,
            _ => log::debug!(target: LOG_TARGET, "No pending wait to end"),
        }
    }
}
