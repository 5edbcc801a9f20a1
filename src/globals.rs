use std::{
    rc::Rc,
    time::{SystemTime, UNIX_EPOCH},
};

use crate::{
    class::Class,
    error::{EvaluationResult, InterpreterErrorKind},
    value::{Function, NativeFunction, Value},
};

/// Seconds since the Unix epoch.
fn clock(_args: &[Value]) -> EvaluationResult {
    let seconds = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs_f64())
        .unwrap_or_default();
    Ok(Value::Number(seconds))
}

/// The display text of any value, as a string.
fn to_string(args: &[Value]) -> EvaluationResult {
    match args {
        [value] => Ok(Value::String(value.to_string())),
        _ => Err(InterpreterErrorKind::ArityMismatch {
            expected: 1,
            actual: args.len(),
        }
        .into()),
    }
}

fn native_functions() -> [NativeFunction; 2] {
    [
        NativeFunction::new("clock", 0, clock),
        NativeFunction::new("toString", 1, to_string),
    ]
}

/// Everything bound in a fresh global scope: the native functions and the
/// root class.
pub fn global_bindings(root: &Rc<Class>) -> impl Iterator<Item = (String, Value)> {
    native_functions()
        .into_iter()
        .map(|native| {
            (
                native.name.to_string(),
                Value::Function(Function::Native(Rc::new(native))),
            )
        })
        .chain([(root.name.clone(), Value::Class(Rc::clone(root)))])
}
