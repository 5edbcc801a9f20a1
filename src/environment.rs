use std::{cell::RefCell, collections::HashMap, fmt, rc::Rc};

use crate::{
    class::Class,
    error::{EvaluationResult, InterpreterErrorKind},
    globals,
    value::Value,
};

/// Scopes are shared: a closure keeps its defining scope alive after the
/// block that created it has exited.
pub type WrappedEnvironment = Rc<RefCell<Environment>>;

#[derive(Default)]
pub struct Environment {
    variables: HashMap<String, Value>,
    enclosing: Option<WrappedEnvironment>,
}

impl Environment {
    /// The outermost scope, pre-populated with the native functions and the
    /// root class.
    pub fn global(root: &Rc<Class>) -> WrappedEnvironment {
        Rc::new(RefCell::new(Environment {
            variables: globals::global_bindings(root).collect(),
            enclosing: None,
        }))
    }

    pub fn new(enclosing: Option<WrappedEnvironment>) -> WrappedEnvironment {
        Rc::new(RefCell::new(Environment {
            variables: HashMap::new(),
            enclosing,
        }))
    }

    /// A fresh scope nested inside `parent`.
    pub fn child(parent: &WrappedEnvironment) -> WrappedEnvironment {
        Self::new(Some(Rc::clone(parent)))
    }

    /// Binds `name` in this scope. Declaring the same name twice in one scope
    /// is an error; shadowing an outer scope's name is not.
    pub fn define(&mut self, name: &str, value: Value) -> EvaluationResult<()> {
        if self.variables.contains_key(name) {
            return Err(InterpreterErrorKind::RedeclaredVariable(name.to_string()).into());
        }
        self.variables.insert(name.to_string(), value);
        Ok(())
    }

    pub fn get(&self, name: &str) -> EvaluationResult {
        if let Some(value) = self.variables.get(name) {
            return Ok(value.clone());
        }

        match &self.enclosing {
            Some(enclosing) => enclosing.borrow().get(name),
            None => Err(InterpreterErrorKind::UndefinedVariable(name.to_string()).into()),
        }
    }

    /// Overwrites the nearest existing binding of `name`; never creates one.
    pub fn assign(&mut self, name: &str, value: Value) -> EvaluationResult<()> {
        if let Some(slot) = self.variables.get_mut(name) {
            *slot = value;
            Ok(())
        } else if let Some(enclosing) = self.enclosing.as_ref() {
            enclosing.borrow_mut().assign(name, value)
        } else {
            Err(InterpreterErrorKind::UndefinedVariable(name.to_string()).into())
        }
    }

    pub fn is_global(&self) -> bool {
        self.enclosing.is_none()
    }
}

// Values may hold closures over this very scope, so only names are shown.
impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.variables.keys().collect();
        names.sort();
        f.debug_struct("Environment")
            .field("names", &names)
            .field("global", &self.is_global())
            .finish()
    }
}
