//! Short human labels for debuggee values.

use crate::native::{BoxedPrimitive, DebugValue, FunctionInfo, FunctionKind, ObjectInfo, ObjectKind};

/// Formats a number the way the debuggee would print it.
pub(crate) fn format_number(value: f64) -> String {
    let mut buffer = ryu_js::Buffer::new();
    buffer.format(value).to_string()
}

/// Renders a primitive as JSON text, mapping values JSON cannot express to `null`.
pub(crate) fn render_primitive(value: &DebugValue) -> String {
    match value {
        DebugValue::Undefined | DebugValue::Null | DebugValue::Object(_) => "null".to_string(),
        DebugValue::Bool(value) => value.to_string(),
        DebugValue::Number(value) if value.is_finite() => format_number(*value),
        DebugValue::Number(_) => "null".to_string(),
        DebugValue::String(value) => {
            serde_json::to_string(value).unwrap_or_else(|_| "null".to_string())
        }
    }
}

/// The category tag shown for a callable.
pub(crate) fn function_type(kind: FunctionKind) -> &'static str {
    match kind {
        FunctionKind::Arrow => "Arrow Function",
        FunctionKind::ClassConstructor => "Class Constructor",
        FunctionKind::Generator => "Generator Function",
        FunctionKind::Async => "Async Function",
        FunctionKind::Bound => "Bound Function",
        FunctionKind::Plain => "Function",
    }
}

/// `[Arrow Function] name(a, b)`
pub(crate) fn describe_function(info: &ObjectInfo, function: &FunctionInfo) -> String {
    let name = info
        .display_name
        .as_deref()
        .or(function.name.as_deref())
        .filter(|name| !name.is_empty())
        .unwrap_or("anonymous");
    format!(
        "[{}] {name}({})",
        function_type(function.kind),
        function.parameters.join(", ")
    )
}

/// The label of a non-callable object.
pub(crate) fn describe_object(info: &ObjectInfo) -> String {
    match &info.kind {
        ObjectKind::Array { length } => format!("[Array] ({length})"),
        ObjectKind::Date(text) => format!("[Date] {text}"),
        ObjectKind::RegExp(text) => format!("[RegExp] {text}"),
        ObjectKind::Map { size } => format!("[Map] ({size})"),
        ObjectKind::Set { size } => format!("[Set] ({size})"),
        ObjectKind::Boxed(BoxedPrimitive::String(value)) => format!("[String] {value}"),
        ObjectKind::Boxed(BoxedPrimitive::Number(value)) => {
            format!("[Number] {}", format_number(*value))
        }
        ObjectKind::Boxed(BoxedPrimitive::Boolean(value)) => format!("[Boolean] {value}"),
        // Callables are described by `describe_function`.
        ObjectKind::Function(function) => describe_function(info, function),
        ObjectKind::Proxy => format!("[Proxy {}]", label(info)),
        ObjectKind::Promise => format!("[Promise {}]", label(info)),
        ObjectKind::Opaque => format!("[Opaque {}]", label(info)),
        ObjectKind::Ordinary {
            prototype: Some(prototype),
        } => format!("[{} (Prototype: {prototype})]", label(info)),
        ObjectKind::Ordinary { prototype: None } => format!("[{}]", label(info)),
    }
}

fn label(info: &ObjectInfo) -> &str {
    info.display_name
        .as_deref()
        .filter(|name| !name.is_empty())
        .unwrap_or(&info.class)
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn object(class: &str, display_name: Option<&str>, kind: ObjectKind) -> ObjectInfo {
        ObjectInfo {
            class: class.to_string(),
            display_name: display_name.map(str::to_string),
            kind,
        }
    }

    #[test_case(DebugValue::Number(2.0) => "2"; "integral number")]
    #[test_case(DebugValue::Number(0.5) => "0.5"; "fraction")]
    #[test_case(DebugValue::Number(f64::NAN) => "null"; "nan")]
    #[test_case(DebugValue::Number(f64::INFINITY) => "null"; "infinity")]
    #[test_case(DebugValue::String("a\"b".into()) => "\"a\\\"b\""; "quoted string")]
    #[test_case(DebugValue::Bool(true) => "true"; "boolean")]
    #[test_case(DebugValue::Null => "null"; "null")]
    #[test_case(DebugValue::Undefined => "null"; "undefined")]
    fn primitives(value: DebugValue) -> String {
        render_primitive(&value)
    }

    #[test_case(ObjectKind::Array { length: 3 } => "[Array] (3)"; "array")]
    #[test_case(ObjectKind::Date("Thu Jan 01 1970".into()) => "[Date] Thu Jan 01 1970"; "date")]
    #[test_case(ObjectKind::RegExp("/a+/g".into()) => "[RegExp] /a+/g"; "regexp")]
    #[test_case(ObjectKind::Map { size: 2 } => "[Map] (2)"; "map")]
    #[test_case(ObjectKind::Set { size: 0 } => "[Set] (0)"; "set")]
    #[test_case(ObjectKind::Boxed(BoxedPrimitive::Number(4.0)) => "[Number] 4"; "boxed number")]
    #[test_case(ObjectKind::Boxed(BoxedPrimitive::String("hi".into())) => "[String] hi"; "boxed string")]
    #[test_case(ObjectKind::Proxy => "[Proxy Object]"; "proxy")]
    #[test_case(ObjectKind::Promise => "[Promise Object]"; "promise")]
    #[test_case(ObjectKind::Opaque => "[Opaque Object]"; "opaque")]
    #[test_case(ObjectKind::Ordinary { prototype: None } => "[Object]"; "no prototype")]
    #[test_case(ObjectKind::Ordinary { prototype: Some("Entity".into()) } => "[Object (Prototype: Entity)]"; "with prototype")]
    fn object_labels(kind: ObjectKind) -> String {
        describe_object(&object("Object", None, kind))
    }

    #[test]
    fn display_name_wins_over_class() {
        let info = object("Object", Some("CmpPosition"), ObjectKind::Ordinary { prototype: None });
        assert_eq!(describe_object(&info), "[CmpPosition]");
    }

    #[test_case(FunctionKind::Arrow, Some("f") => "[Arrow Function] f(a, b)"; "arrow")]
    #[test_case(FunctionKind::ClassConstructor, Some("Unit") => "[Class Constructor] Unit(a, b)"; "class")]
    #[test_case(FunctionKind::Generator, Some("g") => "[Generator Function] g(a, b)"; "generator")]
    #[test_case(FunctionKind::Async, Some("h") => "[Async Function] h(a, b)"; "async")]
    #[test_case(FunctionKind::Bound, Some("bound f") => "[Bound Function] bound f(a, b)"; "bound")]
    #[test_case(FunctionKind::Plain, None => "[Function] anonymous(a, b)"; "anonymous")]
    fn functions(kind: FunctionKind, name: Option<&str>) -> String {
        let function = FunctionInfo {
            kind,
            name: name.map(str::to_string),
            parameters: vec!["a".into(), "b".into()],
        };
        let info = object("Function", None, ObjectKind::Function(function.clone()));
        describe_function(&info, &function)
    }
}
