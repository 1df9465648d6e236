//! Debug session state
//!
//! The session is the state shared by every plugin: the attach flag, the
//! current paused frame, the source table, the hub and the protocol
//! handler. It also implements the pause itself.

use crate::{
    config::DebuggerConfig,
    dap::{
        Event, Request, StoppedEventBody, handler::ProtocolHandler, pump::MessageDispatch,
        pump::MessageWait, to_body,
    },
    error::{DapError, DapResult},
    hub::{EventHub, HookData, names},
    native::{DebugHost, FrameId},
};
use serde_json::Value;
use std::cell::{Cell, Ref, RefCell};
use std::fmt;
use std::rc::Rc;

const LOG_TARGET: &str = "dapbridge::session";

/// The id of the only thread reported to the client.
pub const THREAD_ID: i64 = 1;

/// One entry of the source table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceEntry {
    /// The url of the source.
    pub path: String,
    /// The full source text.
    pub text: String,
}

/// The state shared by the plugins of one debugger.
pub struct DebugSession {
    host: Rc<dyn DebugHost>,
    waiter: Rc<dyn MessageWait>,
    config: DebuggerConfig,
    hub: EventHub,
    protocol: ProtocolHandler,
    attached: Cell<bool>,
    current_frame: Cell<Option<FrameId>>,
    sources: RefCell<Vec<SourceEntry>>,
}

impl fmt::Debug for DebugSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DebugSession")
            .field("config", &self.config)
            .field("hub", &self.hub)
            .field("protocol", &self.protocol)
            .field("attached", &self.attached.get())
            .field("current_frame", &self.current_frame.get())
            .field("sources", &self.sources.borrow().len())
            .finish_non_exhaustive()
    }
}

impl DebugSession {
    /// Creates a detached session.
    pub fn new(
        host: Rc<dyn DebugHost>,
        waiter: Rc<dyn MessageWait>,
        config: DebuggerConfig,
    ) -> Self {
        Self {
            host,
            waiter,
            config,
            hub: EventHub::new(),
            protocol: ProtocolHandler::new(),
            attached: Cell::new(false),
            current_frame: Cell::new(None),
            sources: RefCell::new(Vec::new()),
        }
    }

    /// The native debugging primitives.
    pub fn host(&self) -> &dyn DebugHost {
        self.host.as_ref()
    }

    /// The session configuration.
    pub fn config(&self) -> &DebuggerConfig {
        &self.config
    }

    /// The event hub.
    pub fn hub(&self) -> &EventHub {
        &self.hub
    }

    /// The protocol handler.
    pub fn protocol(&self) -> &ProtocolHandler {
        &self.protocol
    }

    /// Returns `true` while a client is attached.
    pub fn is_attached(&self) -> bool {
        self.attached.get()
    }

    /// Switches between attached and detached, then notifies the plugins.
    pub fn set_attached(&self, attached: bool) {
        log::info!(
            target: LOG_TARGET,
            "Debugger {}",
            if attached { "attached" } else { "detached" }
        );
        self.attached.set(attached);
        if attached {
            self.trigger(names::ON_DEBUGGER_ATTACHED, &HookData::None);
        } else {
            self.trigger(names::ON_DEBUGGER_DETACHED, &HookData::None);
            self.current_frame.set(None);
        }
    }

    /// Fails with [`DapError::NotAttached`] unless attached.
    pub fn require_attached(&self) -> DapResult<()> {
        if self.is_attached() {
            Ok(())
        } else {
            Err(DapError::NotAttached)
        }
    }

    /// The innermost paused frame.
    pub fn current_frame(&self) -> Option<FrameId> {
        self.current_frame.get()
    }

    /// Replaces the current frame.
    pub fn set_current_frame(&self, frame: Option<FrameId>) {
        self.current_frame.set(frame);
    }

    /// The current frame, or [`DapError::NoCurrentFrame`].
    pub fn require_current_frame(&self) -> DapResult<FrameId> {
        self.current_frame().ok_or(DapError::NoCurrentFrame)
    }

    /// The live frames from `frame` outwards, stopping at the first frame
    /// that is off the stack or terminated.
    pub fn live_chain(&self, frame: FrameId) -> Vec<FrameId> {
        let mut chain = Vec::new();
        let mut next = Some(frame);
        while let Some(frame) = next {
            if !self.host.frame_is_live(frame) {
                break;
            }
            chain.push(frame);
            next = self.host.frame_older(frame);
        }
        chain
    }

    /// The live frames of the paused stack, innermost first.
    pub fn frames(&self) -> Vec<FrameId> {
        self.current_frame()
            .map(|frame| self.live_chain(frame))
            .unwrap_or_default()
    }

    /// Resolves a 1-based protocol frame id against the paused stack.
    pub fn frame_by_id(&self, frame_id: i64) -> DapResult<FrameId> {
        let current = self.require_current_frame()?;
        if !self.host.frame_is_live(current) {
            return Err(DapError::FrameNotLive);
        }
        let index = usize::try_from(frame_id - 1).map_err(|_| DapError::InvalidFrameId(frame_id))?;
        self.live_chain(current)
            .get(index)
            .copied()
            .ok_or(DapError::InvalidFrameId(frame_id))
    }

    /// Runs every subscriber of a hook.
    pub fn trigger(&self, event: &str, data: &HookData) {
        self.hub.trigger(self, event, data);
    }

    /// Queues an outbound event.
    pub fn push_event(&self, event: &str, body: Option<Value>) {
        let seq = self.protocol.next_seq();
        self.hub.enqueue(Event::new(seq, event, body));
    }

    /// Takes the next queued outbound event as an envelope.
    pub fn next_event(&self) -> Option<Value> {
        self.hub.take_event().map(Event::into_value)
    }

    /// Handles one inbound message and returns the response envelope.
    pub fn handle_message(&self, message: Value) -> Value {
        self.protocol.handle_request(self, message)
    }

    /// Registers a command on the protocol handler.
    pub fn register_command<F>(&self, command: &str, handler: F)
    where
        F: Fn(&DebugSession, &Request) -> DapResult<Option<Value>> + 'static,
    {
        self.protocol.register_command(command, handler);
    }

    /// Releases the pending pause, if any.
    pub fn end_waiting(&self) {
        self.waiter.end_waiting_for_message();
    }

    /// Pauses in `frame` until a resume-class command arrives.
    ///
    /// Emits `stopped`, then blocks in the wait primitive answering requests.
    /// The previous current frame is restored afterwards so nested pauses
    /// unwind correctly.
    pub fn stop_in_frame(&self, frame: FrameId, reason: &str, text: &str) {
        if !self.is_attached() {
            log::debug!(target: LOG_TARGET, "Not attached, ignoring stop for {reason}");
            return;
        }

        log::info!(target: LOG_TARGET, "Stopping in {frame}: {text}");
        let previous = self.current_frame.replace(Some(frame));

        let body = StoppedEventBody {
            reason: reason.to_string(),
            thread_id: Some(THREAD_ID),
            text: Some(text.to_string()),
        };
        match to_body(&body) {
            Ok(body) => self.push_event("stopped", Some(body)),
            Err(err) => log::error!(target: LOG_TARGET, "Failed to build stopped event: {err}"),
        }

        self.trigger(names::ON_STOP_IN_FRAME, &HookData::Frame(frame));
        self.waiter.wait_for_message(self);
        self.trigger(names::ON_RESUME_IN_FRAME, &HookData::Frame(frame));

        self.current_frame
            .set(if self.is_attached() { previous } else { None });
        log::debug!(target: LOG_TARGET, "Resumed from {frame}");
    }

    /// The 1-based source reference of `url`, or 0 if it has none.
    pub fn source_reference(&self, url: &str) -> i64 {
        self.sources
            .borrow()
            .iter()
            .position(|entry| entry.path == url)
            .map_or(0, |index| index as i64 + 1)
    }

    /// Appends a source entry and returns its reference. Known urls keep
    /// their original entry.
    pub fn register_source(&self, path: &str, text: &str) -> i64 {
        let existing = self.source_reference(path);
        if existing != 0 {
            return existing;
        }
        let mut sources = self.sources.borrow_mut();
        sources.push(SourceEntry {
            path: path.to_string(),
            text: text.to_string(),
        });
        sources.len() as i64
    }

    /// Empties the source table.
    pub fn reset_sources(&self) {
        self.sources.borrow_mut().clear();
    }

    /// The source table.
    pub fn sources(&self) -> Ref<'_, Vec<SourceEntry>> {
        self.sources.borrow()
    }
}

impl MessageDispatch for DebugSession {
    fn handle_message(&self, message: Value) -> Value {
        Self::handle_message(self, message)
    }

    fn next_event(&self) -> Option<Value> {
        Self::next_event(self)
    }
}
