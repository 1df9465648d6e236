//! A Debug Adapter Protocol bridge for script engines.
//!
//! This crate exposes a running script engine's native debugging
//! instrumentation (breakpoints, stack frames, lexical scopes and step
//! control) to a DAP client such as VS Code.
//!
//! # Overview
//!
//! The bridge consists of several key components:
//!
//! - [`EventHub`]: receives raw engine callbacks and fans them out to named hooks
//! - [`ProtocolHandler`]: validates inbound requests and dispatches them to commands
//! - [`plugins`]: feature modules (attach lifecycle, sources, breakpoints,
//!   frames/stepping, variable inspection and the common commands), each of
//!   which registers hooks on the hub and commands on the handler
//! - [`Debugger`]: the bootstrap, loading the plugins in dependency order and
//!   exposing the two entry points used by the transport layer
//!
//! The engine itself is an external collaborator, reached through the
//! [`DebugHost`] trait. The engine reports its own events back through the
//! [`EngineHooks`] trait, which [`Debugger`] implements.
//!
//! # Example
//!
//! ```rust,ignore
//! use dapbridge::{Debugger, EngineHooks};
//! use std::rc::Rc;
//!
//! let debugger = Debugger::new(host.clone(), pump.clone());
//!
//! // Engine side.
//! debugger.on_new_script(script, global);
//!
//! // Transport side.
//! let response = debugger.handle_message(request);
//! while let Some(event) = debugger.next_event() {
//!     send(event);
//! }
//! ```

pub mod config;
pub mod dap;
pub mod error;
pub mod host_hooks;
pub mod hub;
pub mod logging;
pub mod native;
pub mod plugins;
pub mod session;

#[cfg(any(test, feature = "sim"))]
pub mod sim;

#[cfg(test)]
mod tests;

pub use config::DebuggerConfig;
pub use dap::handler::ProtocolHandler;
pub use dap::pump::{MessageDispatch, MessagePump, MessageWait, PumpClient};
pub use error::{DapError, DapResult, HostError};
pub use host_hooks::EngineHooks;
pub use hub::{EventHub, HookData};
pub use logging::LogLevel;
pub use native::{DebugHost, EnvId, FrameId, GlobalId, ObjectId, ScriptId};
pub use plugins::PluginSet;
pub use session::DebugSession;

use serde_json::Value;
use std::rc::Rc;

/// The bootstrap of the bridge.
///
/// Constructs the [`EventHub`] and the [`ProtocolHandler`], loads every
/// plugin in dependency order and exposes the transport entry points.
/// Cloning a `Debugger` is cheap; all clones share the same session.
#[derive(Clone)]
pub struct Debugger {
    session: Rc<DebugSession>,
    plugins: PluginSet,
}

impl std::fmt::Debug for Debugger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Debugger")
            .field("attached", &self.session.is_attached())
            .field("current_frame", &self.session.current_frame())
            .finish_non_exhaustive()
    }
}

impl Debugger {
    /// Creates a new debugger with the default configuration.
    pub fn new(host: Rc<dyn DebugHost>, waiter: Rc<dyn MessageWait>) -> Self {
        Self::with_config(host, waiter, DebuggerConfig::default())
    }

    /// Creates a new debugger with the given configuration.
    pub fn with_config(
        host: Rc<dyn DebugHost>,
        waiter: Rc<dyn MessageWait>,
        config: DebuggerConfig,
    ) -> Self {
        log::debug!(target: "dapbridge", "Bootstrapping debugger");
        let session = Rc::new(DebugSession::new(host, waiter, config));

        log::debug!(target: "dapbridge", "Loading plugins");
        let plugins = PluginSet::default();
        plugins.install(&session);

        Self { session, plugins }
    }

    /// Handles one inbound protocol message and returns the response envelope.
    pub fn handle_message(&self, message: Value) -> Value {
        self.session.handle_message(message)
    }

    /// Takes the next queued outbound event, if any.
    pub fn next_event(&self) -> Option<Value> {
        self.session.next_event()
    }

    /// Subscribes an external callback to a hook.
    ///
    /// Returns `false` if the hook name is unknown or the arguments are invalid.
    pub fn on<F>(&self, event: &str, source: &str, callback: F) -> bool
    where
        F: Fn(&DebugSession, &HookData) -> DapResult<()> + 'static,
    {
        self.session.hub().on(event, source, callback)
    }

    /// Returns `true` while a client is attached.
    pub fn is_attached(&self) -> bool {
        self.session.is_attached()
    }

    /// The shared session state.
    pub fn session(&self) -> &DebugSession {
        &self.session
    }

    /// The installed plugins.
    pub fn plugins(&self) -> &PluginSet {
        &self.plugins
    }
}

impl MessageDispatch for Debugger {
    fn handle_message(&self, message: Value) -> Value {
        self.session.handle_message(message)
    }

    fn next_event(&self) -> Option<Value> {
        self.session.next_event()
    }
}
