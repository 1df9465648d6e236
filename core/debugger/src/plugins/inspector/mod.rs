//! Variable inspection: `scopes`, `variables` and `evaluate`.
//!
//! Scopes and objects are handed to the client as variable references
//! (see [`references`]). The table only lives for one pause: it is dropped
//! on every resume (`continue`, `next`, `stepIn`, `stepOut`) and on detach,
//! since the frame and object handles it holds may no longer be valid once
//! execution moves on.

pub mod describe;
pub mod references;

use super::Plugin;
use crate::{
    dap::{
        EvaluateArguments, EvaluateResponseBody, Scope, ScopesArguments, ScopesResponseBody,
        Variable, VariablePresentationHint, VariablesArguments, VariablesResponseBody, to_body,
    },
    error::{DapError, DapResult},
    hub::names,
    native::{Completion, DebugValue, EnvId, EnvironmentKind, FrameId, ObjectId, ObjectKind},
    session::DebugSession,
};
use references::{RefTarget, VariableReference, VariableReferences};
use std::cell::RefCell;
use std::rc::Rc;

const LOG_TARGET: &str = "dapbridge::inspector";

/// Owns the variable-reference table.
#[derive(Debug, Default)]
pub struct InspectorManager {
    references: RefCell<VariableReferences>,
}

impl InspectorManager {
    /// The number of live variable references.
    pub fn reference_count(&self) -> usize {
        self.references.borrow().len()
    }

    fn allocate(&self, path: String, reference: VariableReference) -> i64 {
        self.references.borrow_mut().create_or_update(path, reference)
    }

    fn reset(&self) {
        self.references.borrow_mut().clear();
    }

    fn scopes(&self, session: &DebugSession, frame_id: i64) -> DapResult<Vec<Scope>> {
        let frame = session.frame_by_id(frame_id)?;
        let host = session.host();

        let mut scopes = Vec::new();
        let mut environment = host.frame_environment(frame);
        let mut depth = 0;
        while let Some(env) = environment {
            let info = host.environment_info(env);
            log::debug!(
                target: LOG_TARGET,
                "Creating scope for environment {env}: {:?}, depth: {depth}, frameId: {frame_id}",
                info.kind
            );

            let mut label = Vec::new();
            if info.optimized_out {
                label.push("(Optimized Out)".to_string());
            }
            label.push(match info.kind {
                EnvironmentKind::Object => "Global".to_string(),
                EnvironmentKind::With => "With Scope".to_string(),
                EnvironmentKind::Declarative => match info.scope_kind.as_deref() {
                    Some("function") => "Closure".to_string(),
                    Some("function lexical") => "Function Block".to_string(),
                    Some(kind) if !kind.is_empty() => capitalize(kind),
                    _ => "Declarative".to_string(),
                },
            });
            if let Some(callee) = &info.callee_name {
                label.push(format!("(Script: {callee})"));
            }

            let mut values = host.environment_names(env);
            if depth == 0 && host.frame_this(frame).is_some() {
                values.insert(0, "this".to_string());
            }

            let variables_reference = self.allocate(
                format!("{frame_id}.scope.{depth}"),
                VariableReference {
                    values,
                    target: RefTarget::Scope { depth },
                    frame_id,
                },
            );
            scopes.push(Scope {
                name: label.join(" "),
                presentation_hint: None,
                variables_reference,
                expensive: false,
            });

            environment = info.parent;
            depth += 1;
        }

        Ok(scopes)
    }

    fn variables(&self, session: &DebugSession, reference: i64) -> DapResult<Vec<Variable>> {
        let entry = self
            .references
            .borrow()
            .get(reference)
            .map(|(path, entry)| (path.to_string(), entry.clone()));
        let Some((path, entry)) = entry else {
            log::warn!(target: LOG_TARGET, "Invalid variable reference index: {reference}");
            return Ok(Vec::new());
        };
        log::debug!(target: LOG_TARGET, "Expanding variable reference {reference}: {path}");

        let frame = session.frame_by_id(entry.frame_id)?;
        let host = session.host();

        let mut variables = Vec::with_capacity(entry.values.len());
        for name in &entry.values {
            let value = match entry.target {
                RefTarget::Object(object) => host
                    .object_own_property(object, name)
                    .unwrap_or(DebugValue::Undefined),
                RefTarget::Scope { depth } => {
                    match lookup_in_scope(session, frame, depth, name) {
                        Some(value) => value,
                        None => {
                            log::warn!(target: LOG_TARGET, "Could not find variable {name}");
                            continue;
                        }
                    }
                }
            };
            variables.push(self.describe_value(
                session,
                &value,
                format!("{path}.{name}"),
                entry.frame_id,
                name,
            ));
        }
        Ok(variables)
    }

    fn describe_value(
        &self,
        session: &DebugSession,
        value: &DebugValue,
        path: String,
        frame_id: i64,
        name: &str,
    ) -> Variable {
        match value {
            DebugValue::Object(object) => self.describe_object(session, *object, path, frame_id, name),
            primitive => Variable {
                name: name.to_string(),
                value: describe::render_primitive(primitive),
                type_: None,
                presentation_hint: None,
                variables_reference: 0,
            },
        }
    }

    fn describe_object(
        &self,
        session: &DebugSession,
        object: ObjectId,
        path: String,
        frame_id: i64,
        name: &str,
    ) -> Variable {
        let host = session.host();
        let info = host.object_info(object);

        if let ObjectKind::Function(function) = &info.kind {
            return Variable {
                name: name.to_string(),
                value: describe::describe_function(&info, function),
                type_: Some(describe::function_type(function.kind).to_string()),
                presentation_hint: Some(VariablePresentationHint {
                    kind: Some("method".to_string()),
                }),
                variables_reference: 0,
            };
        }

        let properties = host.object_own_property_names(object);
        let variables_reference = if properties.is_empty() {
            0
        } else {
            self.allocate(
                path,
                VariableReference {
                    values: properties,
                    target: RefTarget::Object(object),
                    frame_id,
                },
            )
        };

        Variable {
            name: name.to_string(),
            value: describe::describe_object(&info),
            type_: None,
            presentation_hint: None,
            variables_reference,
        }
    }

    fn evaluate(&self, session: &DebugSession, args: &EvaluateArguments) -> DapResult<EvaluateResponseBody> {
        if args.expression.is_empty() {
            log::error!(target: LOG_TARGET, "No expression provided for evaluation");
            return Err(DapError::MissingExpression);
        }

        let frame_id = args.frame_id.unwrap_or(1);
        let frame = session.frame_by_id(frame_id)?;

        let completion = session.host().frame_eval(frame, &args.expression)?;
        match completion {
            Completion::Return(DebugValue::Object(object)) => {
                let variable = self.describe_object(
                    session,
                    object,
                    format!("eval.{}", args.expression),
                    frame_id,
                    &args.expression,
                );
                Ok(EvaluateResponseBody {
                    result: variable.value,
                    type_: variable.type_,
                    presentation_hint: variable.presentation_hint,
                    variables_reference: variable.variables_reference,
                })
            }
            Completion::Return(DebugValue::Undefined) => Ok(EvaluateResponseBody {
                result: "undefined".to_string(),
                type_: None,
                presentation_hint: None,
                variables_reference: 0,
            }),
            Completion::Return(value) => Ok(EvaluateResponseBody {
                result: describe::render_primitive(&value),
                type_: None,
                presentation_hint: None,
                variables_reference: 0,
            }),
            Completion::Throw(value) => {
                let message = match &value {
                    DebugValue::String(message) => message.clone(),
                    DebugValue::Object(object) => {
                        describe::describe_object(&session.host().object_info(*object))
                    }
                    other => describe::render_primitive(other),
                };
                log::error!(target: LOG_TARGET, "Error evaluating expression: {message}");
                Err(DapError::Evaluation(message))
            }
            Completion::Terminated => {
                log::error!(target: LOG_TARGET, "Evaluation of {} was terminated", args.expression);
                Err(DapError::Evaluation("evaluation terminated".to_string()))
            }
        }
    }
}

/// Resolves `name` in the scope `depth` environments out from `frame`'s innermost.
fn lookup_in_scope(session: &DebugSession, frame: FrameId, depth: usize, name: &str) -> Option<DebugValue> {
    let host = session.host();
    if name == "this" {
        if let Some(this) = host.frame_this(frame) {
            return Some(DebugValue::Object(this));
        }
    }

    let mut env: EnvId = host.frame_environment(frame)?;
    for _ in 0..depth {
        env = host.environment_info(env).parent?;
    }

    let found = host.environment_find(env, name)?;
    match host.environment_info(found).kind {
        EnvironmentKind::Object | EnvironmentKind::With => {
            let object = host.environment_object(found)?;
            Some(
                host.object_own_property(object, name)
                    .unwrap_or(DebugValue::Undefined),
            )
        }
        EnvironmentKind::Declarative => Some(host.environment_variable(found, name)),
    }
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}

impl Plugin for InspectorManager {
    fn name(&self) -> &'static str {
        "InspectorManager"
    }

    fn install(self: Rc<Self>, session: &DebugSession) {
        log::debug!(target: LOG_TARGET, "Setting up InspectorManager");
        let hub = session.hub();

        let inspector = Rc::clone(&self);
        hub.on(names::ON_DEBUGGER_DETACHED, self.name(), move |_, _| {
            log::debug!(target: LOG_TARGET, "Debugger detached");
            inspector.reset();
            Ok(())
        });

        for hook in [
            names::ON_CONTINUE,
            names::ON_NEXT,
            names::ON_STEP_IN,
            names::ON_STEP_OUT,
        ] {
            let inspector = Rc::clone(&self);
            hub.on(hook, self.name(), move |_, _| {
                log::debug!(target: LOG_TARGET, "Resuming execution ({hook})");
                inspector.reset();
                Ok(())
            });
        }

        let inspector = Rc::clone(&self);
        session.register_command("scopes", move |session, request| {
            log::debug!(target: LOG_TARGET, "Handling scopes command");
            let args: ScopesArguments = request.parse_arguments()?;
            let scopes = inspector.scopes(session, args.frame_id).inspect_err(|err| {
                log::error!(target: LOG_TARGET, "{err}");
            })?;
            Ok(Some(to_body(&ScopesResponseBody { scopes })?))
        });

        let inspector = Rc::clone(&self);
        session.register_command("variables", move |session, request| {
            log::debug!(target: LOG_TARGET, "Handling variables command");
            let args: VariablesArguments = request.parse_arguments()?;
            let variables = inspector
                .variables(session, args.variables_reference)
                .inspect_err(|err| log::error!(target: LOG_TARGET, "{err}"))?;
            Ok(Some(to_body(&VariablesResponseBody { variables })?))
        });

        let inspector = Rc::clone(&self);
        session.register_command("evaluate", move |session, request| {
            log::debug!(target: LOG_TARGET, "Handling evaluate command");
            let args: EvaluateArguments = request.parse_arguments()?;
            session.require_current_frame().inspect_err(|err| {
                log::error!(target: LOG_TARGET, "{err}");
            })?;
            let body = inspector.evaluate(session, &args)?;
            Ok(Some(to_body(&body)?))
        });
    }
}
