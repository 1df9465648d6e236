//! The native debugging primitives consumed by the bridge.
//!
//! The engine is reached only through [`DebugHost`]. Engine-owned entities
//! (globals, scripts, frames, environments and objects) are referred to by
//! opaque copyable handles. A handle stays meaningful for as long as the
//! engine keeps the entity alive; the bridge never dereferences a frame
//! handle once [`DebugHost::frame_is_live`] reports it gone.

use crate::error::HostError;
use std::fmt;

macro_rules! handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(pub usize);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}#{}", stringify!($name), self.0)
            }
        }
    };
}

handle!(
    /// Unique identifier for a global execution context.
    GlobalId
);
handle!(
    /// Unique identifier for a script or nested function script.
    ScriptId
);
handle!(
    /// Unique identifier for a call frame.
    FrameId
);
handle!(
    /// Unique identifier for a lexical environment.
    EnvId
);
handle!(
    /// Unique identifier for an object in the debuggee.
    ObjectId
);

/// A position inside a script.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Location {
    /// Line number as reported by the engine.
    pub line: u32,
    /// Column number as reported by the engine.
    pub column: u32,
}

/// The text of a loaded source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceText {
    /// The url the source was loaded from.
    pub url: String,
    /// The full source text.
    pub text: String,
    /// The line the source starts at in its url.
    pub start_line: u32,
}

/// The kind of a lexical environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvironmentKind {
    /// Bindings are properties of an object (the global object).
    Object,
    /// A `with` statement environment.
    With,
    /// Function, block and module scopes.
    Declarative,
}

/// Description of a lexical environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentInfo {
    /// The kind of the environment.
    pub kind: EnvironmentKind,
    /// The refined scope kind of a declarative environment
    /// (`"function"`, `"function lexical"`, `"block"`, ...).
    pub scope_kind: Option<String>,
    /// The engine elided this environment.
    pub optimized_out: bool,
    /// Name of the function owning this environment, if any.
    pub callee_name: Option<String>,
    /// The enclosing environment.
    pub parent: Option<EnvId>,
}

/// A value living in the debuggee.
#[derive(Debug, Clone, PartialEq)]
pub enum DebugValue {
    /// `undefined`
    Undefined,
    /// `null`
    Null,
    /// A boolean.
    Bool(bool),
    /// A number.
    Number(f64),
    /// A string.
    String(String),
    /// An object, inspected lazily.
    Object(ObjectId),
}

impl DebugValue {
    /// Returns the object handle if the value is an object.
    pub const fn as_object(&self) -> Option<ObjectId> {
        match self {
            Self::Object(object) => Some(*object),
            _ => None,
        }
    }
}

/// The completion of an evaluation in a frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Completion {
    /// The expression produced a value.
    Return(DebugValue),
    /// The expression threw.
    Throw(DebugValue),
    /// The evaluation was terminated by the engine.
    Terminated,
}

/// The category of a callable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionKind {
    /// `() => {}`
    Arrow,
    /// `class A {}`
    ClassConstructor,
    /// `function* () {}`
    Generator,
    /// `async function () {}`
    Async,
    /// The result of `Function.prototype.bind`.
    Bound,
    /// Any other function.
    Plain,
}

/// Description of a callable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionInfo {
    /// The function category.
    pub kind: FunctionKind,
    /// The function name, if it has one.
    pub name: Option<String>,
    /// The declared parameter names.
    pub parameters: Vec<String>,
}

/// The primitive wrapped by a `String`, `Number` or `Boolean` object.
#[derive(Debug, Clone, PartialEq)]
pub enum BoxedPrimitive {
    /// `new String(..)`
    String(String),
    /// `new Number(..)`
    Number(f64),
    /// `new Boolean(..)`
    Boolean(bool),
}

/// The intrinsic kind of an object.
#[derive(Debug, Clone, PartialEq)]
pub enum ObjectKind {
    /// An array with its `length`.
    Array {
        /// The array length.
        length: u64,
    },
    /// A date with its string form.
    Date(String),
    /// A regular expression with its string form.
    RegExp(String),
    /// A map with its entry count.
    Map {
        /// The number of entries.
        size: u64,
    },
    /// A set with its entry count.
    Set {
        /// The number of entries.
        size: u64,
    },
    /// A boxed primitive.
    Boxed(BoxedPrimitive),
    /// A callable.
    Function(FunctionInfo),
    /// A proxy.
    Proxy,
    /// A promise.
    Promise,
    /// An object the engine refuses to let us look into.
    Opaque,
    /// Any other object.
    Ordinary {
        /// Display name of the prototype, if the object has one.
        prototype: Option<String>,
    },
}

/// Description of an object.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectInfo {
    /// The object's class name (`"Object"`, `"Array"`, ...).
    pub class: String,
    /// The engine's display name for the object, if any.
    pub display_name: Option<String>,
    /// The intrinsic kind.
    pub kind: ObjectKind,
}

/// The native debugging primitives of the engine.
///
/// Every method is called from the engine's own thread. Methods may be called
/// while the engine is blocked inside a pause, so an implementation must not
/// hold internal borrows across calls into [`crate::EngineHooks`].
pub trait DebugHost {
    // Debuggee set.

    /// Instruments every existing global.
    fn add_all_globals_as_debuggees(&self);

    /// Instruments one global.
    fn add_debuggee(&self, global: GlobalId);

    /// Removes every global from instrumentation.
    fn remove_all_debuggees(&self);

    // Scripts and sources.

    /// All top-level scripts loaded from `url`.
    fn find_scripts(&self, url: &str) -> Vec<ScriptId>;

    /// Every source loaded in a debuggee.
    fn find_sources(&self) -> Vec<SourceText>;

    /// The url of a script.
    fn script_url(&self, script: ScriptId) -> String;

    /// The display name of a script, if it is a named function.
    fn script_display_name(&self, script: ScriptId) -> Option<String>;

    /// The source a script was compiled from.
    fn script_source(&self, script: ScriptId) -> SourceText;

    /// The nested function scripts directly contained in a script.
    fn child_scripts(&self, script: ScriptId) -> Vec<ScriptId>;

    /// The instruction offsets of a script at which a breakpoint on `line` could be set.
    fn possible_breakpoint_offsets(&self, script: ScriptId, line: u32) -> Vec<u32>;

    /// The source location of an offset.
    fn offset_location(&self, script: ScriptId, offset: u32) -> Location;

    /// Installs a breakpoint. The engine reports hits through
    /// [`crate::EngineHooks::on_breakpoint`].
    fn set_breakpoint(&self, script: ScriptId, offset: u32) -> Result<(), HostError>;

    /// Removes every breakpoint of one script.
    fn clear_breakpoints(&self, script: ScriptId);

    /// Removes every breakpoint of every debuggee.
    fn clear_all_breakpoints(&self);

    // Frames.

    /// The script a frame is executing.
    fn frame_script(&self, frame: FrameId) -> ScriptId;

    /// The current instruction offset of a frame.
    fn frame_offset(&self, frame: FrameId) -> u32;

    /// The caller of a frame.
    fn frame_older(&self, frame: FrameId) -> Option<FrameId>;

    /// `true` while the frame is on the call stack and not terminated.
    fn frame_is_live(&self, frame: FrameId) -> bool;

    /// The `this` receiver of a frame, if it is an object.
    fn frame_this(&self, frame: FrameId) -> Option<ObjectId>;

    /// The innermost environment of a frame.
    fn frame_environment(&self, frame: FrameId) -> Option<EnvId>;

    /// Evaluates an expression in the context of a frame.
    fn frame_eval(&self, frame: FrameId, expression: &str) -> Result<Completion, HostError>;

    /// Enables or disables [`crate::EngineHooks::on_step`] for a frame.
    fn set_frame_step_hook(&self, frame: FrameId, enabled: bool);

    /// Enables or disables [`crate::EngineHooks::on_pop`] for a frame.
    fn set_frame_pop_hook(&self, frame: FrameId, enabled: bool);

    // Environments.

    /// Describes an environment.
    fn environment_info(&self, env: EnvId) -> EnvironmentInfo;

    /// The names bound directly in an environment.
    fn environment_names(&self, env: EnvId) -> Vec<String>;

    /// The nearest environment, starting at `env` and walking outwards, binding `name`.
    fn environment_find(&self, env: EnvId, name: &str) -> Option<EnvId>;

    /// The value bound to `name` directly in a declarative environment.
    fn environment_variable(&self, env: EnvId, name: &str) -> DebugValue;

    /// The binding object of an object or `with` environment.
    fn environment_object(&self, env: EnvId) -> Option<ObjectId>;

    // Objects.

    /// Describes an object.
    fn object_info(&self, object: ObjectId) -> ObjectInfo;

    /// The own property names of an object, in definition order.
    fn object_own_property_names(&self, object: ObjectId) -> Vec<String>;

    /// The value of an own data property.
    fn object_own_property(&self, object: ObjectId, name: &str) -> Option<DebugValue>;
}
