//! Stack frames and stepping.
//!
//! Step state is kept in a side table keyed by frame handle. A step command
//! decorates the current frame with intent flags and enables the engine's
//! per-frame step and pop hooks:
//!
//! - the step hook pauses once the frame reaches a different source line,
//!   unless the frame is being stepped out of;
//! - the pop hook hands the step over to the calling frame when the frame
//!   returns with step intent, then removes the frame's decoration.
//!
//! Every pause clears the decorations of the paused chain, so a step only
//! lasts until the next pause.

use super::Plugin;
use crate::{
    dap::{
        ContinueArguments, ContinueResponseBody, Request, Source, StackFrame, StackTraceArguments,
        StackTraceResponseBody, StepArguments, to_body,
    },
    error::{DapError, DapResult},
    hub::{HookData, names},
    native::{FrameId, Location},
    session::{DebugSession, THREAD_ID},
};
use rustc_hash::FxHashMap;
use serde_json::Value;
use std::cell::RefCell;
use std::rc::Rc;

const LOG_TARGET: &str = "dapbridge::frames";

const NO_NAME: &str = "[No Name]";

/// Why a step pauses, as reported in the `stopped` event.
#[derive(Debug, Clone, PartialEq, Eq)]
struct StopReason {
    reason: &'static str,
    text: &'static str,
}

const NEXT: StopReason = StopReason {
    reason: "step",
    text: "Paused on next",
};
const STEP_IN: StopReason = StopReason {
    reason: "step",
    text: "Paused on stepIn",
};
const STEP_OUT: StopReason = StopReason {
    reason: "step",
    text: "Paused on stepOut",
};

/// The decoration of one frame.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct FrameState {
    step_in: bool,
    step_out: bool,
    step_over: bool,
    step: Option<StopReason>,
    pop: Option<StopReason>,
    location: Option<Location>,
}

/// Owns the frame decorations and the stack and step commands.
#[derive(Debug, Default)]
pub struct FrameManager {
    states: RefCell<FxHashMap<FrameId, FrameState>>,
}

impl FrameManager {
    /// Returns `true` if `frame` carries a step or pop decoration.
    pub fn is_hooked(&self, frame: FrameId) -> bool {
        self.states
            .borrow()
            .get(&frame)
            .is_some_and(|state| state.step.is_some() || state.pop.is_some())
    }

    /// Returns `true` if `frame` carries any step intent.
    pub fn has_step_intent(&self, frame: FrameId) -> bool {
        self.states
            .borrow()
            .get(&frame)
            .is_some_and(|state| state.step_in || state.step_out || state.step_over)
    }

    /// The number of decorated frames.
    pub fn decorated_frames(&self) -> usize {
        self.states.borrow().len()
    }

    fn hook(&self, session: &DebugSession, frame: FrameId, reason: &StopReason) {
        let (enable_step, enable_pop) = {
            let mut states = self.states.borrow_mut();
            let state = states.entry(frame).or_default();
            let enable_step = state.step.is_none();
            if enable_step {
                state.step = Some(reason.clone());
            }
            let enable_pop = state.pop.is_none();
            if enable_pop {
                state.pop = Some(reason.clone());
            }
            (enable_step, enable_pop)
        };

        let host = session.host();
        if enable_step {
            host.set_frame_step_hook(frame, true);
        }
        if enable_pop {
            host.set_frame_pop_hook(frame, true);
        }
    }

    fn set_intent(&self, frame: FrameId, step_in: bool, step_out: bool, step_over: bool) {
        let mut states = self.states.borrow_mut();
        let state = states.entry(frame).or_default();
        state.step_in = step_in;
        state.step_out = step_out;
        state.step_over = step_over;
    }

    /// Removes the decoration of `frame` and disables its hooks.
    fn clean(&self, session: &DebugSession, frame: FrameId) {
        let Some(state) = self.states.borrow_mut().remove(&frame) else {
            return;
        };

        if state.step.is_some() || state.pop.is_some() {
            let host = session.host();
            host.set_frame_step_hook(frame, false);
            host.set_frame_pop_hook(frame, false);
            log::debug!(target: LOG_TARGET, "Cleaned frame: {}", host.script_url(host.frame_script(frame)));
        }
    }

    fn clean_chain(&self, session: &DebugSession, frame: FrameId) {
        for frame in session.live_chain(frame) {
            self.clean(session, frame);
        }
    }

    fn on_stop(&self, session: &DebugSession, frame: FrameId) {
        self.clean_chain(session, frame);
        let host = session.host();
        let location = host.offset_location(host.frame_script(frame), host.frame_offset(frame));
        log::debug!(
            target: LOG_TARGET,
            "Stop at {}:{}:{}",
            host.script_url(host.frame_script(frame)),
            location.line,
            location.column
        );
        self.states.borrow_mut().entry(frame).or_default().location = Some(location);
    }

    fn on_step(&self, session: &DebugSession, frame: FrameId) {
        let (reason, cached) = {
            let states = self.states.borrow();
            let Some(state) = states.get(&frame) else {
                return;
            };
            let Some(reason) = state.step.clone() else {
                return;
            };
            if state.step_out && !state.step_over {
                return;
            }
            (reason, state.location)
        };

        let host = session.host();
        let location = host.offset_location(host.frame_script(frame), host.frame_offset(frame));
        if cached.is_some_and(|cached| cached.line == location.line) {
            return;
        }

        session.stop_in_frame(frame, reason.reason, reason.text);
        log::debug!(target: LOG_TARGET, "Client continue from step");
    }

    fn on_pop(&self, session: &DebugSession, frame: FrameId) {
        let Some(state) = self.states.borrow_mut().remove(&frame) else {
            return;
        };

        let host = session.host();
        host.set_frame_step_hook(frame, false);
        host.set_frame_pop_hook(frame, false);

        if state.step_in || state.step_out {
            let older = host.frame_older(frame);
            match (older, state.pop) {
                (Some(older), Some(reason)) => {
                    log::debug!(target: LOG_TARGET, "Handing {} over to the caller", reason.reason);
                    self.hook(session, older, &reason);
                }
                _ => log::debug!(target: LOG_TARGET, "Stepped out of the outermost frame"),
            }
        }
    }

    fn on_enter(&self, session: &DebugSession, frame: FrameId) {
        let Some(older) = session.host().frame_older(frame) else {
            return;
        };
        let step_into = {
            let states = self.states.borrow();
            let older_steps_in = states.get(&older).is_some_and(|state| state.step_in);
            let already_hooked = states.get(&frame).is_some_and(|state| state.step.is_some());
            older_steps_in && !already_hooked
        };
        if step_into {
            log::debug!(target: LOG_TARGET, "Stepping in frame {frame}");
            self.hook(session, frame, &STEP_IN);
        }
    }

    fn on_detach(&self, session: &DebugSession) {
        let frames: Vec<FrameId> = self.states.borrow().keys().copied().collect();
        let host = session.host();
        for frame in frames {
            if host.frame_is_live(frame) {
                self.clean(session, frame);
            }
        }
        self.states.borrow_mut().clear();
        session.set_current_frame(None);
    }

    fn step(
        &self,
        session: &DebugSession,
        request: &Request,
        reason: &StopReason,
        hook: &str,
        (step_in, step_out, step_over): (bool, bool, bool),
    ) -> DapResult<Option<Value>> {
        let args: StepArguments = request.parse_arguments()?;
        if args.thread_id != THREAD_ID {
            log::debug!(target: LOG_TARGET, "Step on unknown thread {}, using the main thread", args.thread_id);
        }
        let frame = match session.require_current_frame() {
            Ok(frame) => frame,
            Err(err) => {
                log::error!(target: LOG_TARGET, "No current frame available");
                return Err(err);
            }
        };

        self.hook(session, frame, reason);
        self.set_intent(frame, step_in, step_out, step_over);
        session.trigger(hook, &HookData::Frame(frame));
        session.end_waiting();
        Ok(None)
    }

    fn stack_frame(session: &DebugSession, id: i64, frame: FrameId) -> StackFrame {
        let host = session.host();
        let script = host.frame_script(frame);
        let url = host.script_url(script);
        let location = host.offset_location(script, host.frame_offset(frame));
        let start_line = host.script_source(script).start_line;

        StackFrame {
            id,
            name: host
                .script_display_name(script)
                .filter(|name| !name.is_empty())
                .unwrap_or_else(|| extract_script_name(&url).to_string()),
            source: Some(Source::reference(url.clone(), session.source_reference(&url))),
            line: i64::from(location.line) + 1 - i64::from(start_line),
            column: i64::from(location.column),
        }
    }
}

/// The last `\`-separated segment of `url`, or `[No Name]`.
fn extract_script_name(url: &str) -> &str {
    url.rsplit('\\')
        .next()
        .filter(|name| !name.is_empty())
        .unwrap_or(NO_NAME)
}

impl Plugin for FrameManager {
    fn name(&self) -> &'static str {
        "FrameManager"
    }

    fn install(self: Rc<Self>, session: &DebugSession) {
        log::debug!(target: LOG_TARGET, "Setting up FrameManager");
        let hub = session.hub();
        for hook in [
            names::ON_CONTINUE,
            names::ON_NEXT,
            names::ON_STEP_IN,
            names::ON_STEP_OUT,
            names::ON_FRAME_STEP,
            names::ON_FRAME_POP,
        ] {
            hub.register_hook_name(hook, self.name());
        }

        let manager = Rc::clone(&self);
        hub.on(names::ON_DEBUGGER_DETACHED, self.name(), move |session, _| {
            log::debug!(target: LOG_TARGET, "Debugger detached");
            manager.on_detach(session);
            Ok(())
        });

        hub.on(names::ON_DEBUGGER_STATEMENT, self.name(), |session, data| {
            if let Some(frame) = data.frame() {
                log::debug!(target: LOG_TARGET, "Paused on debugger statement in {frame}");
                session.stop_in_frame(frame, "debugger", "Paused on debugger statement");
            }
            Ok(())
        });

        let manager = Rc::clone(&self);
        hub.on(names::ON_STOP_IN_FRAME, self.name(), move |session, data| {
            if let Some(frame) = data.frame() {
                manager.on_stop(session, frame);
            }
            Ok(())
        });

        let manager = Rc::clone(&self);
        hub.on(names::ON_ENTER_FRAME, self.name(), move |session, data| {
            if let Some(frame) = data.frame() {
                manager.on_enter(session, frame);
            }
            Ok(())
        });

        let manager = Rc::clone(&self);
        hub.on(names::ON_FRAME_STEP, self.name(), move |session, data| {
            if let Some(frame) = data.frame() {
                manager.on_step(session, frame);
            }
            Ok(())
        });

        let manager = Rc::clone(&self);
        hub.on(names::ON_FRAME_POP, self.name(), move |session, data| {
            if let Some(frame) = data.frame() {
                manager.on_pop(session, frame);
            }
            Ok(())
        });

        session.register_command("stackTrace", |session, request| {
            log::debug!(target: LOG_TARGET, "Handling stackTrace command");
            let args: StackTraceArguments = request.parse_arguments()?;
            let Some(current) = session.current_frame() else {
                log::error!(target: LOG_TARGET, "No current frame available");
                return Err(DapError::NoCurrentFrame);
            };

            let chain = session.live_chain(current);
            let total_frames = Some(chain.len() as i64);
            let start = args.start_frame.map_or(0, |start| usize::try_from(start).unwrap_or(0));
            let levels = args
                .levels
                .and_then(|levels| usize::try_from(levels).ok())
                .filter(|&levels| levels > 0)
                .unwrap_or(usize::MAX);
            let stack_frames: Vec<StackFrame> = chain
                .into_iter()
                .enumerate()
                .skip(start)
                .take(levels)
                .map(|(index, frame)| Self::stack_frame(session, index as i64 + 1, frame))
                .collect();
            Ok(Some(to_body(&StackTraceResponseBody {
                stack_frames,
                total_frames,
            })?))
        });

        let manager = Rc::clone(&self);
        session.register_command("continue", move |session, request| {
            let args: ContinueArguments = request.parse_arguments()?;
            log::debug!(target: LOG_TARGET, "Handling continue command for thread {}", args.thread_id);
            let current = session.current_frame();
            if let Some(frame) = current {
                manager.clean_chain(session, frame);
            }
            session.trigger(names::ON_CONTINUE, &current.map_or(HookData::None, HookData::Frame));
            session.end_waiting();
            Ok(Some(to_body(&ContinueResponseBody {
                all_threads_continued: true,
            })?))
        });

        let manager = Rc::clone(&self);
        session.register_command("next", move |session, request| {
            log::debug!(target: LOG_TARGET, "Handling next command");
            manager.step(session, request, &NEXT, names::ON_NEXT, (false, true, true))
        });

        let manager = Rc::clone(&self);
        session.register_command("stepIn", move |session, request| {
            log::debug!(target: LOG_TARGET, "Handling stepIn command");
            manager.step(session, request, &STEP_IN, names::ON_STEP_IN, (true, false, false))
        });

        let manager = Rc::clone(&self);
        session.register_command("stepOut", move |session, request| {
            log::debug!(target: LOG_TARGET, "Handling stepOut command");
            manager.step(session, request, &STEP_OUT, names::ON_STEP_OUT, (false, true, false))
        });
    }
}
