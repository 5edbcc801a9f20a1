use std::{cell::RefCell, collections::HashMap, fmt, rc::Rc};

use crate::{
    ast::FunDecl,
    class::{BoundMethod, Class, Instance},
    environment::WrappedEnvironment,
    error::EvaluationResult,
};

#[derive(Clone, Debug)]
pub enum Value {
    Nil,
    Boolean(bool),
    Number(f64),
    String(String),
    Function(Function),
    Class(Rc<Class>),
    Instance(Rc<RefCell<Instance>>),
}

/// Everything a call expression can invoke apart from a class.
#[derive(Clone, Debug)]
pub enum Function {
    User(Rc<UserFunction>),
    Native(Rc<NativeFunction>),
    Bound(Rc<BoundMethod>),
}

/// Properties set on a function or class value. Instances keep theirs
/// inside the instance itself; primitives have none.
#[derive(Default)]
pub struct Fields(RefCell<HashMap<String, Value>>);

impl Fields {
    pub fn get(&self, name: &str) -> Option<Value> {
        self.0.borrow().get(name).cloned()
    }

    pub fn set(&self, name: &str, value: Value) {
        self.0.borrow_mut().insert(name.to_string(), value);
    }
}

// Values may point back at their owner, so only names are shown.
impl fmt::Debug for Fields {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields = self.0.borrow();
        let mut names: Vec<&String> = fields.keys().collect();
        names.sort();
        f.debug_set().entries(names).finish()
    }
}

pub struct UserFunction {
    pub decl: Rc<FunDecl>,
    pub closure: WrappedEnvironment,
    pub fields: Fields,
}

impl UserFunction {
    pub fn new(decl: Rc<FunDecl>, closure: WrappedEnvironment) -> Self {
        Self {
            decl,
            closure,
            fields: Fields::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.decl.name.lexem
    }

    pub fn arity(&self) -> usize {
        self.decl.params.len()
    }
}

impl fmt::Debug for UserFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserFunction")
            .field("name", &self.name())
            .field("arity", &self.arity())
            .finish_non_exhaustive()
    }
}

pub type NativeFn = fn(&[Value]) -> EvaluationResult;

pub struct NativeFunction {
    pub name: &'static str,
    pub arity: usize,
    pub native_fn: NativeFn,
    pub fields: Fields,
}

impl NativeFunction {
    pub fn new(name: &'static str, arity: usize, native_fn: NativeFn) -> Self {
        NativeFunction {
            name,
            arity,
            native_fn,
            fields: Fields::default(),
        }
    }
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeFunction")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .finish_non_exhaustive()
    }
}

impl Function {
    pub fn name(&self) -> &str {
        match self {
            Function::User(function) => function.name(),
            Function::Native(function) => function.name,
            Function::Bound(bound) => bound.method.name(),
        }
    }

    pub fn arity(&self) -> usize {
        match self {
            Function::User(function) => function.arity(),
            Function::Native(function) => function.arity,
            Function::Bound(bound) => bound.method.arity(),
        }
    }

    pub fn fields(&self) -> &Fields {
        match self {
            Function::User(function) => &function.fields,
            Function::Native(function) => &function.fields,
            Function::Bound(bound) => &bound.fields,
        }
    }

    fn same(&self, other: &Function) -> bool {
        match (self, other) {
            (Function::User(a), Function::User(b)) => Rc::ptr_eq(a, b),
            (Function::Native(a), Function::Native(b)) => Rc::ptr_eq(a, b),
            (Function::Bound(a), Function::Bound(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl Value {
    /// Only `nil` and `false` are falsy.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Nil | Value::Boolean(false))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "Nil",
            Value::Boolean(_) => "Boolean",
            Value::Number(_) => "Number",
            Value::String(_) => "String",
            Value::Function(_) => "Function",
            Value::Class(_) => "Class",
            Value::Instance(_) => "Instance",
        }
    }

    /// Display text, except that strings are quoted. Used where a string must
    /// be told apart from bare text, such as the REPL echo.
    pub fn repr(&self) -> String {
        match self {
            Value::String(s) => format!("\"{s}\""),
            other => other.to_string(),
        }
    }
}

impl PartialEq for Value {
    /// Different kinds are never equal; functions, classes and instances
    /// compare by identity.
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Function(a), Value::Function(b)) => a.same(b),
            (Value::Class(a), Value::Class(b)) => Rc::ptr_eq(a, b),
            (Value::Instance(a), Value::Instance(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Boolean(b) => write!(f, "{b}"),
            Value::Number(n) => write!(f, "{n}"),
            Value::String(s) => write!(f, "{s}"),
            Value::Function(function) => write!(f, "{function}"),
            Value::Class(class) => write!(f, "<class {}>", class.name),
            Value::Instance(instance) => write!(f, "<instance {}>", instance.borrow().class.name),
        }
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Function::User(function) => write!(f, "<fn {}>", function.name()),
            Function::Native(function) => write!(f, "<native fn {}>", function.name),
            Function::Bound(bound) => write!(f, "<bound fn {}>", bound.method.name()),
        }
    }
}
