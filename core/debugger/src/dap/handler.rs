//! The protocol handler.
//!
//! Validates inbound request envelopes, dispatches them to the command
//! handlers registered by the plugins and builds the response envelopes.
//! Dispatch never fails: every fault becomes an error response.

use super::{ErrorResponseBody, ProtocolMessage, Request, Response};
use crate::{
    error::{DapError, DapResult, panic_message},
    session::DebugSession,
};
use rustc_hash::FxHashMap;
use serde_json::Value;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::rc::Rc;

const LOG_TARGET: &str = "dapbridge::protocol";

/// A command handler. Returns the body of the success response.
pub type CommandHandler = Rc<dyn Fn(&DebugSession, &Request) -> DapResult<Option<Value>>>;

/// Dispatches requests to command handlers.
pub struct ProtocolHandler {
    commands: RefCell<FxHashMap<String, CommandHandler>>,
    seq: Cell<i64>,
}

impl fmt::Debug for ProtocolHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut commands: Vec<String> = self.commands.borrow().keys().cloned().collect();
        commands.sort();
        f.debug_struct("ProtocolHandler")
            .field("commands", &commands)
            .field("seq", &self.seq.get())
            .finish()
    }
}

impl Default for ProtocolHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl ProtocolHandler {
    /// Creates a handler with no commands.
    pub fn new() -> Self {
        Self {
            commands: RefCell::new(FxHashMap::default()),
            seq: Cell::new(1),
        }
    }

    /// Gets the next sequence number, shared by responses and events.
    pub fn next_seq(&self) -> i64 {
        let seq = self.seq.get();
        self.seq.set(seq + 1);
        seq
    }

    /// Registers a command. A later registration for the same name wins.
    pub fn register_command<F>(&self, command: &str, handler: F)
    where
        F: Fn(&DebugSession, &Request) -> DapResult<Option<Value>> + 'static,
    {
        let previous = self
            .commands
            .borrow_mut()
            .insert(command.to_string(), Rc::new(handler));
        if previous.is_some() {
            log::warn!(target: LOG_TARGET, "Command {command} registered twice, replacing");
        } else {
            log::info!(target: LOG_TARGET, "Registered command: {command}");
        }
    }

    /// Handles one raw request and returns the response envelope.
    pub fn handle_request(&self, session: &DebugSession, message: Value) -> Value {
        let seq = message.get("seq").and_then(Value::as_i64).unwrap_or(0);
        let command = message
            .get("command")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        let request = match serde_json::from_value::<ProtocolMessage>(message) {
            Ok(ProtocolMessage::Request(request)) if !request.command.is_empty() => request,
            _ => {
                log::error!(target: LOG_TARGET, "Invalid request format");
                return self.error_response(seq, &command, &DapError::InvalidRequest);
            }
        };

        log::info!(target: LOG_TARGET, "Handling command: {}", request.command);

        let handler = self.commands.borrow().get(&request.command).cloned();
        let Some(handler) = handler else {
            let err = DapError::UnknownCommand(request.command.clone());
            log::error!(target: LOG_TARGET, "{err}");
            return self.error_response(request.seq, &request.command, &err);
        };

        let result = catch_unwind(AssertUnwindSafe(|| handler(session, &request)))
            .unwrap_or_else(|payload| Err(DapError::Internal(panic_message(payload.as_ref()))));

        match result {
            Ok(body) => self.success_response(&request, body),
            Err(err) => {
                log::error!(target: LOG_TARGET, "Error handling command {}: {err}", request.command);
                log::error!(target: LOG_TARGET, "{err:?}");
                self.error_response(request.seq, &request.command, &err)
            }
        }
    }

    /// Builds a success response for `request`.
    pub fn success_response(&self, request: &Request, body: Option<Value>) -> Value {
        Response {
            seq: self.next_seq(),
            request_seq: request.seq,
            success: true,
            command: request.command.clone(),
            message: None,
            body,
        }
        .into_value()
    }

    /// Builds an error response carrying `err` as `body.error`.
    pub fn error_response(&self, request_seq: i64, command: &str, err: &DapError) -> Value {
        let message = err.to_string();
        let body = serde_json::to_value(ErrorResponseBody {
            error: message.clone(),
        })
        .ok();
        Response {
            seq: self.next_seq(),
            request_seq,
            success: false,
            command: command.to_string(),
            message: Some(message),
            body,
        }
        .into_value()
    }
}
