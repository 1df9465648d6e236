//! An in-memory engine implementing [`DebugHost`].

use crate::{
    error::HostError,
    host_hooks::EngineHooks,
    native::{
        Completion, DebugHost, DebugValue, EnvId, EnvironmentInfo, EnvironmentKind, FrameId,
        GlobalId, Location, ObjectId, ObjectInfo, ObjectKind, ScriptId, SourceText,
    },
};
use regex::Regex;
use std::cell::RefCell;
use std::collections::BTreeSet;
use std::sync::LazyLock;

const LOG_TARGET: &str = "dapbridge::sim";

/// Offsets per source line. An offset encodes `line * OFFSETS_PER_LINE + column`.
pub const OFFSETS_PER_LINE: u32 = 1000;

static BINDING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:var|let|const)\s+([A-Za-z_$][\w$]*)\s*=\s*(.+?)\s*;?\s*$")
        .unwrap_or_else(|err| unreachable!("invalid binding pattern: {err}"))
});

static NUMBER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^-?(?:\d+\.?\d*|\.\d+)(?:[eE][+-]?\d+)?$")
        .unwrap_or_else(|err| unreachable!("invalid number pattern: {err}"))
});

#[derive(Debug)]
struct SimGlobal {
    debuggee: bool,
    env: EnvId,
}

#[derive(Debug)]
struct SimScript {
    url: String,
    text: String,
    start_line: u32,
    display_name: Option<String>,
    global: GlobalId,
    parent: Option<ScriptId>,
    children: Vec<ScriptId>,
    lines: BTreeSet<u32>,
}

#[derive(Debug)]
struct SimFrame {
    script: ScriptId,
    offset: u32,
    older: Option<FrameId>,
    live: bool,
    this: Option<ObjectId>,
    env: Option<EnvId>,
    step_hook: bool,
    pop_hook: bool,
}

#[derive(Debug)]
struct SimEnv {
    info: EnvironmentInfo,
    bindings: Vec<(String, DebugValue)>,
    object: Option<ObjectId>,
}

#[derive(Debug)]
struct SimObject {
    info: ObjectInfo,
    properties: Vec<(String, DebugValue)>,
}

#[derive(Debug, Default)]
struct SimState {
    globals: Vec<SimGlobal>,
    scripts: Vec<SimScript>,
    frames: Vec<SimFrame>,
    envs: Vec<SimEnv>,
    objects: Vec<SimObject>,
    breakpoints: Vec<(ScriptId, u32)>,
}

impl SimState {
    fn script(&self, script: ScriptId) -> Option<&SimScript> {
        self.scripts.get(script.0)
    }

    fn frame(&self, frame: FrameId) -> Option<&SimFrame> {
        self.frames.get(frame.0)
    }

    fn frame_mut(&mut self, frame: FrameId) -> Option<&mut SimFrame> {
        self.frames.get_mut(frame.0)
    }

    fn env(&self, env: EnvId) -> Option<&SimEnv> {
        self.envs.get(env.0)
    }

    fn object(&self, object: ObjectId) -> Option<&SimObject> {
        self.objects.get(object.0)
    }

    fn is_debuggee(&self, script: &SimScript) -> bool {
        self.globals.get(script.global.0).is_some_and(|g| g.debuggee)
    }

    fn names(&self, env: EnvId) -> Vec<String> {
        let Some(sim) = self.env(env) else {
            return Vec::new();
        };
        match (sim.info.kind, sim.object) {
            (EnvironmentKind::Object | EnvironmentKind::With, Some(object)) => self
                .object(object)
                .map(|o| o.properties.iter().map(|(name, _)| name.clone()).collect())
                .unwrap_or_default(),
            _ => sim.bindings.iter().map(|(name, _)| name.clone()).collect(),
        }
    }

    fn find(&self, env: EnvId, name: &str) -> Option<EnvId> {
        let mut next = Some(env);
        while let Some(env) = next {
            if self.names(env).iter().any(|n| n == name) {
                return Some(env);
            }
            next = self.env(env)?.info.parent;
        }
        None
    }

    fn read(&self, env: EnvId, name: &str) -> DebugValue {
        let Some(sim) = self.env(env) else {
            return DebugValue::Undefined;
        };
        let slots = match sim.object {
            Some(object) if sim.info.kind != EnvironmentKind::Declarative => {
                self.object(object).map(|o| &o.properties)
            }
            _ => Some(&sim.bindings),
        };
        slots
            .and_then(|slots| slots.iter().find(|(n, _)| n == name))
            .map_or(DebugValue::Undefined, |(_, value)| value.clone())
    }

    fn location(offset: u32) -> Location {
        Location {
            line: offset / OFFSETS_PER_LINE,
            column: offset % OFFSETS_PER_LINE,
        }
    }

    fn eval_term(&self, frame: &SimFrame, term: &str) -> Result<DebugValue, DebugValue> {
        let term = term.trim();
        if term.is_empty() {
            return Err(DebugValue::String("SyntaxError: expected expression".into()));
        }
        if NUMBER.is_match(term) {
            return term
                .parse::<f64>()
                .map(DebugValue::Number)
                .map_err(|err| DebugValue::String(format!("SyntaxError: {err}")));
        }
        if term.len() >= 2
            && ((term.starts_with('"') && term.ends_with('"'))
                || (term.starts_with('\'') && term.ends_with('\'')))
        {
            return Ok(DebugValue::String(term[1..term.len() - 1].to_string()));
        }
        match term {
            "true" => return Ok(DebugValue::Bool(true)),
            "false" => return Ok(DebugValue::Bool(false)),
            "null" => return Ok(DebugValue::Null),
            "undefined" => return Ok(DebugValue::Undefined),
            "this" => {
                return Ok(frame.this.map_or(DebugValue::Undefined, DebugValue::Object));
            }
            _ => {}
        }

        let (head, path) = term.split_once('.').map_or((term, None), |(h, p)| (h, Some(p)));
        let mut value = frame
            .env
            .and_then(|env| self.find(env, head))
            .map(|env| self.read(env, head))
            .ok_or_else(|| DebugValue::String(format!("ReferenceError: {head} is not defined")))?;

        for property in path.into_iter().flat_map(|p| p.split('.')) {
            let DebugValue::Object(object) = value else {
                return Err(DebugValue::String(format!(
                    "TypeError: cannot read property {property}"
                )));
            };
            value = self
                .object(object)
                .and_then(|o| o.properties.iter().find(|(n, _)| n == property))
                .map_or(DebugValue::Undefined, |(_, v)| v.clone());
        }
        Ok(value)
    }

    fn eval(&self, frame: FrameId, expression: &str) -> Completion {
        let Some(sim) = self.frame(frame) else {
            return Completion::Terminated;
        };

        let mut result: Option<DebugValue> = None;
        for term in expression.split('+') {
            let value = match self.eval_term(sim, term) {
                Ok(value) => value,
                Err(thrown) => return Completion::Throw(thrown),
            };
            result = Some(match (result, value) {
                (None, value) => value,
                (Some(DebugValue::Number(a)), DebugValue::Number(b)) => DebugValue::Number(a + b),
                (Some(DebugValue::String(a)), b) => DebugValue::String(a + &text(&b)),
                (Some(a), DebugValue::String(b)) => DebugValue::String(text(&a) + &b),
                (Some(_), _) => DebugValue::Number(f64::NAN),
            });
        }
        Completion::Return(result.unwrap_or(DebugValue::Undefined))
    }
}

fn text(value: &DebugValue) -> String {
    match value {
        DebugValue::Undefined => "undefined".into(),
        DebugValue::Null => "null".into(),
        DebugValue::Bool(b) => b.to_string(),
        DebugValue::Number(n) => crate::plugins::inspector::describe::format_number(*n),
        DebugValue::String(s) => s.clone(),
        DebugValue::Object(_) => "[object Object]".into(),
    }
}

/// Returns the 1-based lines of `text` that hold code.
fn code_lines(text: &str) -> Vec<u32> {
    text.lines()
        .enumerate()
        .filter(|(_, line)| {
            let line = line.trim();
            !line.is_empty() && !line.starts_with("//") && line != "{" && line != "}"
        })
        .map(|(index, _)| index as u32 + 1)
        .collect()
}

/// A simulated script engine.
///
/// Entities are created through the builder methods; execution is driven
/// explicitly through the methods taking an [`EngineHooks`], which report
/// engine events the same way a real engine's instrumentation would. No
/// internal borrow is held while a hook runs, so the debugger may call back
/// into the host from inside a pause.
#[derive(Debug, Default)]
pub struct SimHost {
    state: RefCell<SimState>,
}

impl SimHost {
    /// Creates an empty engine.
    pub fn new() -> Self {
        Self::default()
    }

    // Builders.

    /// Creates a global object with its object environment.
    pub fn add_global(&self) -> GlobalId {
        let object = self.add_object(
            ObjectInfo {
                class: "global".to_string(),
                display_name: None,
                kind: ObjectKind::Ordinary { prototype: None },
            },
            Vec::new(),
        );
        let env = self.add_env(
            EnvironmentInfo {
                kind: EnvironmentKind::Object,
                scope_kind: None,
                optimized_out: false,
                callee_name: None,
                parent: None,
            },
            Some(object),
        );
        let mut state = self.state.borrow_mut();
        state.globals.push(SimGlobal {
            debuggee: false,
            env,
        });
        GlobalId(state.globals.len() - 1)
    }

    /// Creates a global and reports it.
    pub fn new_global(&self, hooks: &dyn EngineHooks) -> GlobalId {
        let global = self.add_global();
        hooks.on_new_global_object(global);
        global
    }

    /// The object environment of a global.
    pub fn global_env(&self, global: GlobalId) -> Option<EnvId> {
        self.state.borrow().globals.get(global.0).map(|g| g.env)
    }

    /// Returns `true` if the global is instrumented.
    pub fn is_debuggee(&self, global: GlobalId) -> bool {
        self.state.borrow().globals.get(global.0).is_some_and(|g| g.debuggee)
    }

    /// Creates a top-level script whose code lines accept breakpoints.
    pub fn add_script(&self, global: GlobalId, url: &str, text: &str) -> ScriptId {
        self.add_script_with_lines(global, url, text, &code_lines(text))
    }

    /// Creates a top-level script accepting breakpoints on `lines` only.
    pub fn add_script_with_lines(&self, global: GlobalId, url: &str, text: &str, lines: &[u32]) -> ScriptId {
        let mut state = self.state.borrow_mut();
        state.scripts.push(SimScript {
            url: url.to_string(),
            text: text.to_string(),
            start_line: 1,
            display_name: None,
            global,
            parent: None,
            children: Vec::new(),
            lines: lines.iter().copied().collect(),
        });
        ScriptId(state.scripts.len() - 1)
    }

    /// Creates a nested function script inside `parent`, owning `lines`.
    pub fn add_function(&self, parent: ScriptId, name: Option<&str>, lines: &[u32]) -> ScriptId {
        let mut state = self.state.borrow_mut();
        let Some(outer) = state.script(parent) else {
            log::warn!(target: LOG_TARGET, "Unknown parent script {parent}");
            return ScriptId(usize::MAX);
        };
        let (url, text, global) = (outer.url.clone(), outer.text.clone(), outer.global);

        state.scripts.push(SimScript {
            url,
            text,
            start_line: 1,
            display_name: name.map(str::to_string),
            global,
            parent: Some(parent),
            children: Vec::new(),
            lines: lines.iter().copied().collect(),
        });
        let script = ScriptId(state.scripts.len() - 1);
        if let Some(outer) = state.scripts.get_mut(parent.0) {
            outer.children.push(script);
            for line in lines {
                outer.lines.remove(line);
            }
        }
        script
    }

    /// Compiles a script and reports it.
    pub fn load_script(&self, hooks: &dyn EngineHooks, global: GlobalId, url: &str, text: &str) -> ScriptId {
        let script = self.add_script(global, url, text);
        hooks.on_new_script(script, global);
        script
    }

    /// Compiles a script accepting breakpoints on `lines` only, and reports it.
    pub fn load_script_with_lines(
        &self,
        hooks: &dyn EngineHooks,
        global: GlobalId,
        url: &str,
        text: &str,
        lines: &[u32],
    ) -> ScriptId {
        let script = self.add_script_with_lines(global, url, text, lines);
        hooks.on_new_script(script, global);
        script
    }

    /// Creates an environment.
    pub fn add_env(&self, info: EnvironmentInfo, object: Option<ObjectId>) -> EnvId {
        let mut state = self.state.borrow_mut();
        state.envs.push(SimEnv {
            info,
            bindings: Vec::new(),
            object,
        });
        EnvId(state.envs.len() - 1)
    }

    /// Creates a function scope environment.
    pub fn add_function_env(&self, parent: Option<EnvId>, callee: Option<&str>) -> EnvId {
        self.add_env(
            EnvironmentInfo {
                kind: EnvironmentKind::Declarative,
                scope_kind: Some("function".to_string()),
                optimized_out: false,
                callee_name: callee.map(str::to_string),
                parent,
            },
            None,
        )
    }

    /// Binds `name` in `env`, replacing an existing binding.
    pub fn bind(&self, env: EnvId, name: &str, value: DebugValue) {
        let mut state = self.state.borrow_mut();
        let target = match state.env(env) {
            Some(sim) if sim.info.kind != EnvironmentKind::Declarative => sim.object,
            Some(_) => None,
            None => return,
        };
        let slots = match target {
            Some(object) => match state.objects.get_mut(object.0) {
                Some(object) => &mut object.properties,
                None => return,
            },
            None => match state.envs.get_mut(env.0) {
                Some(env) => &mut env.bindings,
                None => return,
            },
        };
        match slots.iter_mut().find(|(n, _)| n == name) {
            Some((_, slot)) => *slot = value,
            None => slots.push((name.to_string(), value)),
        }
    }

    /// Creates an object.
    pub fn add_object(&self, info: ObjectInfo, properties: Vec<(String, DebugValue)>) -> ObjectId {
        let mut state = self.state.borrow_mut();
        state.objects.push(SimObject { info, properties });
        ObjectId(state.objects.len() - 1)
    }

    /// Creates a plain object with the given properties.
    pub fn add_plain_object(&self, properties: &[(&str, DebugValue)]) -> ObjectId {
        self.add_object(
            ObjectInfo {
                class: "Object".to_string(),
                display_name: None,
                kind: ObjectKind::Ordinary {
                    prototype: Some("Object".to_string()),
                },
            },
            properties
                .iter()
                .map(|(name, value)| ((*name).to_string(), value.clone()))
                .collect(),
        )
    }

    /// Marks a frame as terminated without popping it.
    pub fn terminate_frame(&self, frame: FrameId) {
        if let Some(sim) = self.state.borrow_mut().frame_mut(frame) {
            sim.live = false;
        }
    }

    /// The installed breakpoints.
    pub fn breakpoints(&self) -> Vec<(ScriptId, u32)> {
        self.state.borrow().breakpoints.clone()
    }

    /// Returns `true` if the step hook of `frame` is enabled.
    pub fn step_hook_enabled(&self, frame: FrameId) -> bool {
        self.state.borrow().frame(frame).is_some_and(|f| f.step_hook)
    }

    /// Returns `true` if the pop hook of `frame` is enabled.
    pub fn pop_hook_enabled(&self, frame: FrameId) -> bool {
        self.state.borrow().frame(frame).is_some_and(|f| f.pop_hook)
    }

    // Execution.

    /// Pushes a frame executing `script` at `line` and reports it.
    ///
    /// The frame gets a fresh function environment whose parent is `env`,
    /// or the global environment of the script when `env` is `None`.
    pub fn enter_frame(
        &self,
        hooks: &dyn EngineHooks,
        script: ScriptId,
        line: u32,
        older: Option<FrameId>,
        env: Option<EnvId>,
    ) -> FrameId {
        let (parent, callee) = {
            let state = self.state.borrow();
            let sim = state.script(script);
            let parent = env.or_else(|| {
                sim.and_then(|s| state.globals.get(s.global.0))
                    .map(|g| g.env)
            });
            (parent, sim.and_then(|s| s.display_name.clone()))
        };
        let frame_env = self.add_function_env(parent, callee.as_deref());

        let frame = {
            let mut state = self.state.borrow_mut();
            state.frames.push(SimFrame {
                script,
                offset: line * OFFSETS_PER_LINE,
                older,
                live: true,
                this: None,
                env: Some(frame_env),
                step_hook: false,
                pop_hook: false,
            });
            FrameId(state.frames.len() - 1)
        };
        hooks.on_enter_frame(frame);
        frame
    }

    /// Sets the `this` receiver of a frame.
    pub fn set_this(&self, frame: FrameId, this: Option<ObjectId>) {
        if let Some(sim) = self.state.borrow_mut().frame_mut(frame) {
            sim.this = this;
        }
    }

    /// The innermost environment of a frame.
    pub fn env_of(&self, frame: FrameId) -> Option<EnvId> {
        self.state.borrow().frame(frame).and_then(|f| f.env)
    }

    /// Moves `frame` to `line`, reporting a breakpoint hit, then a step.
    pub fn step_to(&self, hooks: &dyn EngineHooks, frame: FrameId, line: u32) {
        let (hit, step) = {
            let mut state = self.state.borrow_mut();
            let Some(sim) = state.frame_mut(frame) else {
                return;
            };
            sim.offset = line * OFFSETS_PER_LINE;
            let (script, offset, step) = (sim.script, sim.offset, sim.step_hook);
            (state.breakpoints.contains(&(script, offset)), step)
        };

        if hit {
            hooks.on_breakpoint(frame);
        }
        let step = step && self.step_hook_enabled(frame);
        if step {
            hooks.on_step(frame);
        }
    }

    /// Reports a `debugger` statement in `frame`.
    pub fn debugger_statement(&self, hooks: &dyn EngineHooks, frame: FrameId) {
        hooks.on_debugger_statement(frame);
    }

    /// Pops `frame`, reporting it first if its pop hook is enabled.
    pub fn pop_frame(&self, hooks: &dyn EngineHooks, frame: FrameId) {
        if self.pop_hook_enabled(frame) {
            hooks.on_pop(frame);
        }
        if let Some(sim) = self.state.borrow_mut().frame_mut(frame) {
            sim.live = false;
            sim.step_hook = false;
            sim.pop_hook = false;
        }
    }

    /// Executes the code lines of `script` in a new frame.
    ///
    /// Each line is a step; a line starting with `debugger` reports a
    /// `debugger` statement, and `var|let|const name = expr` binds `name` in
    /// the frame's environment.
    pub fn run_script(&self, hooks: &dyn EngineHooks, script: ScriptId, older: Option<FrameId>) {
        let lines: Vec<(u32, String)> = {
            let state = self.state.borrow();
            let Some(sim) = state.script(script) else {
                log::warn!(target: LOG_TARGET, "Unknown script {script}");
                return;
            };
            let text: Vec<&str> = sim.text.lines().collect();
            code_lines(&sim.text)
                .into_iter()
                .filter_map(|line| {
                    text.get(line as usize - 1)
                        .map(|code| (line, code.trim().to_string()))
                })
                .collect()
        };
        let Some(&(first, _)) = lines.first() else {
            return;
        };

        let frame = self.enter_frame(hooks, script, first, older, None);
        for (line, code) in lines {
            self.step_to(hooks, frame, line);
            if code.starts_with("debugger") {
                self.debugger_statement(hooks, frame);
            } else if let Some(captures) = BINDING.captures(&code) {
                let completion = self.state.borrow().eval(frame, &captures[2]);
                match completion {
                    Completion::Return(value) => {
                        if let Some(env) = self.env_of(frame) {
                            self.bind(env, &captures[1], value);
                        }
                    }
                    other => {
                        log::warn!(target: LOG_TARGET, "Line {line} threw: {other:?}");
                        hooks.on_uncaught_exception(&format!("{other:?}"));
                    }
                }
            }
        }
        self.pop_frame(hooks, frame);
    }
}

impl DebugHost for SimHost {
    fn add_all_globals_as_debuggees(&self) {
        for global in &mut self.state.borrow_mut().globals {
            global.debuggee = true;
        }
    }

    fn add_debuggee(&self, global: GlobalId) {
        if let Some(global) = self.state.borrow_mut().globals.get_mut(global.0) {
            global.debuggee = true;
        }
    }

    fn remove_all_debuggees(&self) {
        for global in &mut self.state.borrow_mut().globals {
            global.debuggee = false;
        }
    }

    fn find_scripts(&self, url: &str) -> Vec<ScriptId> {
        let state = self.state.borrow();
        state
            .scripts
            .iter()
            .enumerate()
            .filter(|(_, s)| s.parent.is_none() && s.url == url && state.is_debuggee(s))
            .map(|(index, _)| ScriptId(index))
            .collect()
    }

    fn find_sources(&self) -> Vec<SourceText> {
        let state = self.state.borrow();
        state
            .scripts
            .iter()
            .filter(|s| s.parent.is_none() && state.is_debuggee(s))
            .map(|s| SourceText {
                url: s.url.clone(),
                text: s.text.clone(),
                start_line: s.start_line,
            })
            .collect()
    }

    fn script_url(&self, script: ScriptId) -> String {
        self.state
            .borrow()
            .script(script)
            .map(|s| s.url.clone())
            .unwrap_or_default()
    }

    fn script_display_name(&self, script: ScriptId) -> Option<String> {
        self.state
            .borrow()
            .script(script)
            .and_then(|s| s.display_name.clone())
    }

    fn script_source(&self, script: ScriptId) -> SourceText {
        self.state.borrow().script(script).map_or_else(
            || SourceText {
                url: String::new(),
                text: String::new(),
                start_line: 1,
            },
            |s| SourceText {
                url: s.url.clone(),
                text: s.text.clone(),
                start_line: s.start_line,
            },
        )
    }

    fn child_scripts(&self, script: ScriptId) -> Vec<ScriptId> {
        self.state
            .borrow()
            .script(script)
            .map(|s| s.children.clone())
            .unwrap_or_default()
    }

    fn possible_breakpoint_offsets(&self, script: ScriptId, line: u32) -> Vec<u32> {
        let state = self.state.borrow();
        match state.script(script) {
            Some(sim) if sim.lines.contains(&line) => vec![line * OFFSETS_PER_LINE],
            _ => Vec::new(),
        }
    }

    fn offset_location(&self, _script: ScriptId, offset: u32) -> Location {
        SimState::location(offset)
    }

    fn set_breakpoint(&self, script: ScriptId, offset: u32) -> Result<(), HostError> {
        let mut state = self.state.borrow_mut();
        if state.script(script).is_none() {
            return Err(HostError::new(format!("Unknown script {script}")));
        }
        if !state.breakpoints.contains(&(script, offset)) {
            state.breakpoints.push((script, offset));
        }
        Ok(())
    }

    fn clear_breakpoints(&self, script: ScriptId) {
        self.state
            .borrow_mut()
            .breakpoints
            .retain(|(s, _)| *s != script);
    }

    fn clear_all_breakpoints(&self) {
        self.state.borrow_mut().breakpoints.clear();
    }

    fn frame_script(&self, frame: FrameId) -> ScriptId {
        self.state
            .borrow()
            .frame(frame)
            .map_or(ScriptId(usize::MAX), |f| f.script)
    }

    fn frame_offset(&self, frame: FrameId) -> u32 {
        self.state.borrow().frame(frame).map_or(0, |f| f.offset)
    }

    fn frame_older(&self, frame: FrameId) -> Option<FrameId> {
        self.state.borrow().frame(frame).and_then(|f| f.older)
    }

    fn frame_is_live(&self, frame: FrameId) -> bool {
        self.state.borrow().frame(frame).is_some_and(|f| f.live)
    }

    fn frame_this(&self, frame: FrameId) -> Option<ObjectId> {
        self.state.borrow().frame(frame).and_then(|f| f.this)
    }

    fn frame_environment(&self, frame: FrameId) -> Option<EnvId> {
        self.env_of(frame)
    }

    fn frame_eval(&self, frame: FrameId, expression: &str) -> Result<Completion, HostError> {
        let state = self.state.borrow();
        match state.frame(frame) {
            Some(sim) if sim.live => Ok(state.eval(frame, expression)),
            Some(_) => Ok(Completion::Terminated),
            None => Err(HostError::new(format!("Unknown frame {frame}"))),
        }
    }

    fn set_frame_step_hook(&self, frame: FrameId, enabled: bool) {
        if let Some(sim) = self.state.borrow_mut().frame_mut(frame) {
            sim.step_hook = enabled;
        }
    }

    fn set_frame_pop_hook(&self, frame: FrameId, enabled: bool) {
        if let Some(sim) = self.state.borrow_mut().frame_mut(frame) {
            sim.pop_hook = enabled;
        }
    }

    fn environment_info(&self, env: EnvId) -> EnvironmentInfo {
        self.state.borrow().env(env).map_or_else(
            || EnvironmentInfo {
                kind: EnvironmentKind::Declarative,
                scope_kind: None,
                optimized_out: true,
                callee_name: None,
                parent: None,
            },
            |e| e.info.clone(),
        )
    }

    fn environment_names(&self, env: EnvId) -> Vec<String> {
        self.state.borrow().names(env)
    }

    fn environment_find(&self, env: EnvId, name: &str) -> Option<EnvId> {
        self.state.borrow().find(env, name)
    }

    fn environment_variable(&self, env: EnvId, name: &str) -> DebugValue {
        self.state.borrow().read(env, name)
    }

    fn environment_object(&self, env: EnvId) -> Option<ObjectId> {
        self.state.borrow().env(env).and_then(|e| e.object)
    }

    fn object_info(&self, object: ObjectId) -> ObjectInfo {
        self.state.borrow().object(object).map_or_else(
            || ObjectInfo {
                class: "Object".to_string(),
                display_name: None,
                kind: ObjectKind::Opaque,
            },
            |o| o.info.clone(),
        )
    }

    fn object_own_property_names(&self, object: ObjectId) -> Vec<String> {
        self.state
            .borrow()
            .object(object)
            .map(|o| o.properties.iter().map(|(name, _)| name.clone()).collect())
            .unwrap_or_default()
    }

    fn object_own_property(&self, object: ObjectId, name: &str) -> Option<DebugValue> {
        self.state
            .borrow()
            .object(object)
            .and_then(|o| o.properties.iter().find(|(n, _)| n == name))
            .map(|(_, value)| value.clone())
    }
}
