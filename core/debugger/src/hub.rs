//! The event hub.
//!
//! Raw engine callbacks are turned into named hooks and fanned out to every
//! subscriber in registration order. A failing subscriber is logged and
//! skipped; it never prevents later subscribers from running.
//!
//! The hub also owns the queue of outbound protocol events, which the
//! transport drains one event at a time.

use crate::{
    dap::Event,
    error::{DapResult, panic_message},
    native::{FrameId, GlobalId, ScriptId},
    session::DebugSession,
};
use indexmap::IndexMap;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::rc::Rc;

const LOG_TARGET: &str = "dapbridge::hub";

/// Names of the hooks known to the hub.
pub mod names {
    /// A client attached.
    pub const ON_DEBUGGER_ATTACHED: &str = "onDebuggerAttached";
    /// The client detached.
    pub const ON_DEBUGGER_DETACHED: &str = "onDebuggerDetached";
    /// The engine created a global.
    pub const ON_NEW_GLOBAL_OBJECT: &str = "onNewGlobalObject";
    /// A `debugger` statement was reached.
    pub const ON_DEBUGGER_STATEMENT: &str = "onDebuggerStatement";
    /// The engine compiled a script.
    pub const ON_NEW_SCRIPT: &str = "onNewScript";
    /// A frame was pushed.
    pub const ON_ENTER_FRAME: &str = "onEnterFrame";
    /// An exception escaped the bridge's own callbacks.
    pub const ON_UNCAUGHT_EXCEPTION: &str = "onUncaughtException";
    /// Execution is about to block in a pause.
    pub const ON_STOP_IN_FRAME: &str = "onStopInFrame";
    /// A pause was released.
    pub const ON_RESUME_IN_FRAME: &str = "onResumeInFrame";

    /// The hooks every hub is created with.
    pub const WELL_KNOWN: [&str; 9] = [
        ON_DEBUGGER_ATTACHED,
        ON_DEBUGGER_DETACHED,
        ON_NEW_GLOBAL_OBJECT,
        ON_DEBUGGER_STATEMENT,
        ON_NEW_SCRIPT,
        ON_ENTER_FRAME,
        ON_UNCAUGHT_EXCEPTION,
        ON_STOP_IN_FRAME,
        ON_RESUME_IN_FRAME,
    ];

    // Registered by the plugins that own them.

    /// `threads` was requested, the client finished its handshake.
    pub const ON_INITIALIZE: &str = "onInitialize";
    /// `configurationDone` was requested.
    pub const ON_CONFIGURATION_DONE: &str = "onConfigurationDone";
    /// An installed breakpoint was hit.
    pub const ON_BREAKPOINT: &str = "onBreakpoint";
    /// A frame with an enabled step hook reached an instruction boundary.
    pub const ON_FRAME_STEP: &str = "onFrameStep";
    /// A frame with an enabled pop hook is being popped.
    pub const ON_FRAME_POP: &str = "onFramePop";
    /// Execution was resumed with `continue`.
    pub const ON_CONTINUE: &str = "onContinue";
    /// A `next` step began.
    pub const ON_NEXT: &str = "onNext";
    /// A `stepIn` step began.
    pub const ON_STEP_IN: &str = "onStepIn";
    /// A `stepOut` step began.
    pub const ON_STEP_OUT: &str = "onStepOut";
}

/// The payload passed to hook callbacks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookData {
    /// No payload.
    None,
    /// A global execution context.
    Global(GlobalId),
    /// A frame.
    Frame(FrameId),
    /// A freshly compiled script and the global it belongs to.
    Script {
        /// The new script.
        script: ScriptId,
        /// Its global.
        global: GlobalId,
    },
    /// A description of an uncaught exception.
    Exception(String),
}

impl HookData {
    /// The frame carried by the payload, if any.
    pub const fn frame(&self) -> Option<FrameId> {
        match self {
            Self::Frame(frame) => Some(*frame),
            _ => None,
        }
    }
}

/// A hook callback.
pub type HookCallback = Rc<dyn Fn(&DebugSession, &HookData) -> DapResult<()>>;

struct Subscriber {
    source: String,
    callback: HookCallback,
}

/// Registry of named hooks plus the outbound event queue.
pub struct EventHub {
    hooks: RefCell<IndexMap<String, Vec<Subscriber>>>,
    events: RefCell<VecDeque<Event>>,
}

impl fmt::Debug for EventHub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hooks = self.hooks.borrow();
        f.debug_struct("EventHub")
            .field("hooks", &hooks.keys().collect::<Vec<_>>())
            .field("pending_events", &self.events.borrow().len())
            .finish()
    }
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new()
    }
}

impl EventHub {
    /// Creates a hub knowing the well-known hook names.
    pub fn new() -> Self {
        let hooks = names::WELL_KNOWN
            .iter()
            .map(|name| ((*name).to_string(), Vec::new()))
            .collect();
        Self {
            hooks: RefCell::new(hooks),
            events: RefCell::new(VecDeque::new()),
        }
    }

    /// Registers a new hook name.
    ///
    /// Returns `false`, after logging, if the name already exists or an
    /// argument is empty.
    pub fn register_hook_name(&self, event: &str, source: &str) -> bool {
        if event.is_empty() {
            log::warn!(target: LOG_TARGET, "Invalid event name");
            return false;
        }
        if source.is_empty() {
            log::warn!(target: LOG_TARGET, "Invalid source name for {event}");
            return false;
        }

        let mut hooks = self.hooks.borrow_mut();
        if hooks.contains_key(event) {
            log::warn!(target: LOG_TARGET, "Hooks already registered for event: {event}");
            return false;
        }

        hooks.insert(event.to_string(), Vec::new());
        log::debug!(target: LOG_TARGET, "Hook registered for event: {event} from source: {source}");
        true
    }

    /// Returns `true` if `event` is a known hook name.
    pub fn has_hook(&self, event: &str) -> bool {
        self.hooks.borrow().contains_key(event)
    }

    /// Appends a subscriber to a hook.
    ///
    /// Returns `false`, after logging, if the hook is unknown or an argument is empty.
    pub fn on<F>(&self, event: &str, source: &str, callback: F) -> bool
    where
        F: Fn(&DebugSession, &HookData) -> DapResult<()> + 'static,
    {
        if event.is_empty() {
            log::warn!(target: LOG_TARGET, "Invalid event name");
            return false;
        }
        if source.is_empty() {
            log::warn!(target: LOG_TARGET, "Invalid source name for event {event}");
            return false;
        }

        let mut hooks = self.hooks.borrow_mut();
        let Some(subscribers) = hooks.get_mut(event) else {
            log::warn!(target: LOG_TARGET, "No hooks registered for event: {event}");
            return false;
        };

        subscribers.push(Subscriber {
            source: source.to_string(),
            callback: Rc::new(callback),
        });
        log::debug!(target: LOG_TARGET, "Hook added for event: {event} from source: {source}");
        true
    }

    /// The number of subscribers of a hook.
    pub fn subscriber_count(&self, event: &str) -> usize {
        self.hooks.borrow().get(event).map_or(0, Vec::len)
    }

    /// Runs every subscriber of `event` in registration order.
    ///
    /// The registry is not borrowed while callbacks run, so a callback may
    /// block in a pause and re-enter the hub.
    pub(crate) fn trigger(&self, session: &DebugSession, event: &str, data: &HookData) {
        log::trace!(target: LOG_TARGET, "Running hook for {event}");

        let subscribers: Vec<(String, HookCallback)> = {
            let hooks = self.hooks.borrow();
            let Some(subscribers) = hooks.get(event) else {
                log::warn!(target: LOG_TARGET, "No hooks registered for event: {event}");
                return;
            };
            subscribers
                .iter()
                .map(|s| (s.source.clone(), Rc::clone(&s.callback)))
                .collect()
        };

        for (source, callback) in subscribers {
            log::trace!(target: LOG_TARGET, "Running hook for {source}-{event}");
            match catch_unwind(AssertUnwindSafe(|| callback(session, data))) {
                Ok(Ok(())) => {}
                Ok(Err(err)) => {
                    log::error!(target: LOG_TARGET, "Error in hook for {source}-{event}: {err}");
                    log::error!(target: LOG_TARGET, "{err:?}");
                }
                Err(payload) => {
                    log::error!(
                        target: LOG_TARGET,
                        "Hook for {source}-{event} panicked: {}",
                        panic_message(payload.as_ref())
                    );
                }
            }
        }
    }

    /// Queues an outbound event.
    pub(crate) fn enqueue(&self, event: Event) {
        log::debug!(target: LOG_TARGET, "Pushing event: {}", event.event);
        self.events.borrow_mut().push_back(event);
    }

    /// Takes the oldest queued outbound event.
    pub fn take_event(&self) -> Option<Event> {
        self.events.borrow_mut().pop_front()
    }

    /// The number of queued outbound events.
    pub fn pending_events(&self) -> usize {
        self.events.borrow().len()
    }
}
