//! The message pump.
//!
//! The pump is the rendezvous between a transport thread, which owns the
//! client connection, and the engine thread, which owns every piece of
//! debugger state. The transport deposits one raw request at a time through
//! a [`PumpClient`] and blocks until the engine thread has answered it.
//!
//! The engine thread services requests in one of two ways:
//!
//! - from its main loop, with [`MessagePump::try_handle_message`] or
//!   [`MessagePump::poll`], while the debuggee runs;
//! - from inside a pause, with [`MessageWait::wait_for_message`], which
//!   keeps answering requests until a resume-class command calls
//!   [`MessageWait::end_waiting_for_message`].
//!
//! Queued outbound events are flushed to the event sink after every request.

use super::Response;
use crate::error::DapError;
use serde_json::Value;
use std::cell::RefCell;
use std::fmt;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

const LOG_TARGET: &str = "dapbridge::pump";

/// The transport entry points of the bridge.
pub trait MessageDispatch {
    /// Handles one inbound message and returns the response envelope.
    fn handle_message(&self, message: Value) -> Value;

    /// Takes the next queued outbound event.
    fn next_event(&self) -> Option<Value>;
}

/// The blocking "wait for next message" primitive used by pauses.
pub trait MessageWait {
    /// Blocks, answering inbound messages through `dispatch`, until
    /// [`Self::end_waiting_for_message`] releases the wait.
    fn wait_for_message(&self, dispatch: &dyn MessageDispatch);

    /// Releases the innermost pending wait.
    ///
    /// A no-op when no wait is pending or the innermost wait was already
    /// released.
    fn end_waiting_for_message(&self);
}

#[derive(Debug, Default)]
struct State {
    request: Option<String>,
    response: Option<String>,
    closed: bool,
}

#[derive(Debug, Default)]
struct Shared {
    state: Mutex<State>,
    changed: Condvar,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn wait_while<'a>(
        &self,
        guard: MutexGuard<'a, State>,
        condition: impl FnMut(&mut State) -> bool,
    ) -> MutexGuard<'a, State> {
        self.changed
            .wait_while(guard, condition)
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// The transport side of a [`MessagePump`].
#[derive(Debug, Clone)]
pub struct PumpClient {
    shared: Arc<Shared>,
}

impl PumpClient {
    /// Deposits a raw request and blocks until the engine thread answers.
    ///
    /// Returns `None` once the pump is closed.
    pub fn send_request(&self, request: String) -> Option<String> {
        let mut state = self.shared.lock();
        state = self
            .shared
            .wait_while(state, |s| s.request.is_some() && !s.closed);
        if state.closed {
            return None;
        }

        state.request = Some(request);
        self.shared.changed.notify_all();

        state = self
            .shared
            .wait_while(state, |s| s.response.is_none() && !s.closed);
        state.response.take()
    }

    /// Closes the pump, releasing every pending wait.
    pub fn close(&self) {
        let mut state = self.shared.lock();
        state.closed = true;
        state.request = None;
        self.shared.changed.notify_all();
        log::debug!(target: LOG_TARGET, "Pump closed");
    }

    /// Returns `true` once the pump is closed.
    pub fn is_closed(&self) -> bool {
        self.shared.lock().closed
    }
}

/// The engine side of the rendezvous.
pub struct MessagePump {
    shared: Arc<Shared>,
    event_sink: Box<dyn Fn(&str)>,
    // One entry per nested wait, innermost last: `true` once released.
    waits: RefCell<Vec<bool>>,
}

impl fmt::Debug for MessagePump {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessagePump")
            .field("waits", &self.waits.borrow())
            .finish_non_exhaustive()
    }
}

impl MessagePump {
    /// Creates a pump delivering serialized events to `event_sink`.
    pub fn new(event_sink: impl Fn(&str) + 'static) -> Self {
        Self {
            shared: Arc::new(Shared::default()),
            event_sink: Box::new(event_sink),
            waits: RefCell::new(Vec::new()),
        }
    }

    /// A transport handle to this pump.
    pub fn client(&self) -> PumpClient {
        PumpClient {
            shared: Arc::clone(&self.shared),
        }
    }

    /// The number of pauses currently blocked in this pump.
    pub fn wait_depth(&self) -> usize {
        self.waits.borrow().len()
    }

    /// Returns `true` once the transport closed the pump.
    pub fn is_closed(&self) -> bool {
        self.shared.lock().closed
    }

    /// Answers the pending request, if any, without blocking, then flushes events.
    pub fn try_handle_message(&self, dispatch: &dyn MessageDispatch) {
        let request = self.shared.lock().request.take();
        if let Some(request) = request {
            self.answer(dispatch, &request);
        }
        self.flush_events(dispatch);
    }

    /// Waits up to `timeout` for a request and answers it, then flushes events.
    ///
    /// Returns `false` once the pump is closed.
    pub fn poll(&self, dispatch: &dyn MessageDispatch, timeout: Duration) -> bool {
        let request = {
            let state = self.shared.lock();
            let (mut state, _) = self
                .shared
                .changed
                .wait_timeout_while(state, timeout, |s| s.request.is_none() && !s.closed)
                .unwrap_or_else(PoisonError::into_inner);
            if state.closed {
                drop(state);
                self.flush_events(dispatch);
                return false;
            }
            state.request.take()
        };

        if let Some(request) = request {
            self.answer(dispatch, &request);
        }
        self.flush_events(dispatch);
        true
    }

    fn next_request(&self) -> Option<String> {
        let state = self.shared.lock();
        let mut state = self
            .shared
            .wait_while(state, |s| s.request.is_none() && !s.closed);
        if state.closed {
            return None;
        }
        state.request.take()
    }

    fn answer(&self, dispatch: &dyn MessageDispatch, raw: &str) {
        log::trace!(target: LOG_TARGET, "Received message: {raw}");
        let response = match serde_json::from_str::<Value>(raw) {
            Ok(message) => dispatch.handle_message(message),
            Err(err) => {
                log::error!(target: LOG_TARGET, "Failed to parse JSON message: {err}");
                parse_error_response()
            }
        };

        let response = serde_json::to_string(&response).unwrap_or_else(|err| {
            log::error!(target: LOG_TARGET, "Failed to serialize response: {err}");
            String::new()
        });

        let mut state = self.shared.lock();
        state.response = Some(response);
        self.shared.changed.notify_all();
    }

    fn flush_events(&self, dispatch: &dyn MessageDispatch) {
        while let Some(event) = dispatch.next_event() {
            match serde_json::to_string(&event) {
                Ok(event) => {
                    log::trace!(target: LOG_TARGET, "Sending event to client: {event}");
                    (self.event_sink)(&event);
                }
                Err(err) => log::error!(target: LOG_TARGET, "Failed to serialize event: {err}"),
            }
        }
    }

    fn released(&self) -> bool {
        self.waits.borrow().last().copied().unwrap_or(true)
    }
}

impl MessageWait for MessagePump {
    fn wait_for_message(&self, dispatch: &dyn MessageDispatch) {
        self.waits.borrow_mut().push(false);
        log::debug!(target: LOG_TARGET, "Waiting for message (depth {})", self.wait_depth());

        loop {
            self.flush_events(dispatch);
            let Some(request) = self.next_request() else {
                log::warn!(target: LOG_TARGET, "Client closed while paused, resuming");
                break;
            };
            self.answer(dispatch, &request);
            if self.released() {
                break;
            }
        }

        self.waits.borrow_mut().pop();
        self.flush_events(dispatch);
        log::debug!(target: LOG_TARGET, "Wait ended (depth {})", self.wait_depth());
    }

    fn end_waiting_for_message(&self) {
        let mut waits = self.waits.borrow_mut();
        match waits.last_mut() {
            Some(released) if !*released => *released = true,
            Some(_) => log::debug!(target: LOG_TARGET, "Wait already released"),
            None => log::debug!(target: LOG_TARGET, "End wait requested while not waiting"),
        }
    }
}

fn parse_error_response() -> Value {
    let err = DapError::InvalidRequest.to_string();
    Response {
        seq: 0,
        request_seq: 0,
        success: false,
        command: String::new(),
        message: Some(err.clone()),
        body: Some(serde_json::json!({ "error": err })),
    }
    .into_value()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::cell::{Cell, RefCell};
    use std::collections::VecDeque;
    use std::rc::Rc;
    use std::thread;

    /// Answers `{"command": c}` with `{"answered": c}` and releases the
    /// innermost wait on `continue`.
    struct Echo {
        pump: Rc<MessagePump>,
        events: RefCell<VecDeque<Value>>,
        handled: Cell<usize>,
    }

    impl MessageDispatch for Echo {
        fn handle_message(&self, message: Value) -> Value {
            self.handled.set(self.handled.get() + 1);
            let command = message["command"].as_str().unwrap_or_default().to_string();
            if command == "continue" {
                self.pump.end_waiting_for_message();
                self.pump.end_waiting_for_message();
            }
            self.events
                .borrow_mut()
                .push_back(json!({ "event": format!("after-{command}") }));
            json!({ "answered": command })
        }

        fn next_event(&self) -> Option<Value> {
            self.events.borrow_mut().pop_front()
        }
    }

    fn echo(sink: Rc<RefCell<Vec<String>>>) -> (Rc<MessagePump>, Echo) {
        let pump = Rc::new(MessagePump::new(move |event| {
            sink.borrow_mut().push(event.to_string());
        }));
        let dispatch = Echo {
            pump: Rc::clone(&pump),
            events: RefCell::new(VecDeque::new()),
            handled: Cell::new(0),
        };
        (pump, dispatch)
    }

    #[test]
    fn wait_answers_until_released() {
        let sink = Rc::new(RefCell::new(Vec::new()));
        let (pump, dispatch) = echo(Rc::clone(&sink));
        let client = pump.client();

        let transport = thread::spawn(move || {
            let first = client.send_request(r#"{"command":"stackTrace"}"#.into());
            let second = client.send_request(r#"{"command":"continue"}"#.into());
            (first, second)
        });

        pump.wait_for_message(&dispatch);
        let (first, second) = transport.join().unwrap();

        assert_eq!(first.as_deref(), Some(r#"{"answered":"stackTrace"}"#));
        assert_eq!(second.as_deref(), Some(r#"{"answered":"continue"}"#));
        assert_eq!(dispatch.handled.get(), 2);
        assert_eq!(pump.wait_depth(), 0);
        assert_eq!(
            *sink.borrow(),
            vec![
                r#"{"event":"after-stackTrace"}"#.to_string(),
                r#"{"event":"after-continue"}"#.to_string()
            ]
        );
    }

    #[test]
    fn end_wait_without_pending_wait_is_a_no_op() {
        let (pump, _dispatch) = echo(Rc::new(RefCell::new(Vec::new())));
        pump.end_waiting_for_message();
        assert_eq!(pump.wait_depth(), 0);
    }

    #[test]
    fn closing_releases_a_pending_wait() {
        let (pump, dispatch) = echo(Rc::new(RefCell::new(Vec::new())));
        let client = pump.client();
        let transport = thread::spawn(move || client.close());

        pump.wait_for_message(&dispatch);
        transport.join().unwrap();
        assert!(pump.is_closed());
        assert_eq!(dispatch.handled.get(), 0);
        assert!(!pump.poll(&dispatch, Duration::from_millis(1)));
    }

    #[test]
    fn invalid_json_gets_an_error_envelope() {
        let (pump, dispatch) = echo(Rc::new(RefCell::new(Vec::new())));
        let client = pump.client();
        let transport = thread::spawn(move || client.send_request("{not json".into()));

        while !transport.is_finished() {
            pump.poll(&dispatch, Duration::from_millis(10));
        }
        let response: Value = serde_json::from_str(&transport.join().unwrap().unwrap()).unwrap();
        assert_eq!(response["success"], false);
        assert_eq!(response["body"]["error"], "Invalid request format");
        assert_eq!(dispatch.handled.get(), 0);
    }
}
