//! Engine callbacks.
//!
//! The engine reports its debugging events through [`EngineHooks`], which
//! [`Debugger`] implements by triggering the matching hook on the event hub.
//! Every callback returns only after all subscribers, including any pause
//! they enter, have completed.
//!
//! # Example
//!
//! ```rust,ignore
//! use dapbridge::{Debugger, EngineHooks};
//!
//! let debugger = Debugger::new(host, pump);
//!
//! // From the engine's instrumentation:
//! debugger.on_new_script(script, global);
//! debugger.on_breakpoint(frame);
//! ```

use crate::{
    Debugger,
    hub::{HookData, names},
    native::{FrameId, GlobalId, ScriptId},
};

/// The callbacks an engine delivers to the bridge.
pub trait EngineHooks {
    /// A new global execution context was created.
    fn on_new_global_object(&self, global: GlobalId);

    /// A `debugger` statement was reached in `frame`.
    fn on_debugger_statement(&self, frame: FrameId);

    /// A script was compiled in `global`.
    fn on_new_script(&self, script: ScriptId, global: GlobalId);

    /// `frame` was pushed.
    fn on_enter_frame(&self, frame: FrameId);

    /// An exception escaped into the debugger.
    fn on_uncaught_exception(&self, description: &str);

    /// An installed breakpoint was hit in `frame`.
    fn on_breakpoint(&self, frame: FrameId);

    /// `frame`, whose step hook is enabled, reached an instruction boundary.
    fn on_step(&self, frame: FrameId);

    /// `frame`, whose pop hook is enabled, is being popped.
    fn on_pop(&self, frame: FrameId);
}

impl EngineHooks for Debugger {
    fn on_new_global_object(&self, global: GlobalId) {
        self.session()
            .trigger(names::ON_NEW_GLOBAL_OBJECT, &HookData::Global(global));
    }

    fn on_debugger_statement(&self, frame: FrameId) {
        self.session()
            .trigger(names::ON_DEBUGGER_STATEMENT, &HookData::Frame(frame));
    }

    fn on_new_script(&self, script: ScriptId, global: GlobalId) {
        self.session()
            .trigger(names::ON_NEW_SCRIPT, &HookData::Script { script, global });
    }

    fn on_enter_frame(&self, frame: FrameId) {
        self.session()
            .trigger(names::ON_ENTER_FRAME, &HookData::Frame(frame));
    }

    fn on_uncaught_exception(&self, description: &str) {
        self.session().trigger(
            names::ON_UNCAUGHT_EXCEPTION,
            &HookData::Exception(description.to_string()),
        );
    }

    fn on_breakpoint(&self, frame: FrameId) {
        self.session()
            .trigger(names::ON_BREAKPOINT, &HookData::Frame(frame));
    }

    fn on_step(&self, frame: FrameId) {
        self.session()
            .trigger(names::ON_FRAME_STEP, &HookData::Frame(frame));
    }

    fn on_pop(&self, frame: FrameId) {
        self.session()
            .trigger(names::ON_FRAME_POP, &HookData::Frame(frame));
    }
}
