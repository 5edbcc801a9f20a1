//! Classes, instances and method resolution along the single-inheritance
//! chain.

use std::{cell::RefCell, collections::HashMap, fmt, rc::Rc};

use crate::value::{Fields, Function, UserFunction, Value};

pub const CONSTRUCTOR: &str = "constructor";

/// Name of the class every declared class ultimately inherits from.
pub const ROOT_CLASS: &str = "Object";

pub struct Class {
    pub name: String,
    pub superclass: Option<Rc<Class>>,
    pub fields: Fields,
    methods: HashMap<String, Rc<UserFunction>>,
}

/// A resolved method together with the class that declares it.
pub struct MethodResolution {
    pub method: Rc<UserFunction>,
    pub declaring_class: Rc<Class>,
}

impl Class {
    pub fn new(
        name: String,
        superclass: Option<Rc<Class>>,
        methods: impl IntoIterator<Item = Rc<UserFunction>>,
    ) -> Self {
        let methods = methods
            .into_iter()
            .map(|method| (method.name().to_string(), method))
            .collect();
        Class {
            name,
            superclass,
            fields: Fields::default(),
            methods,
        }
    }

    /// The root of every inheritance chain. Declares no methods.
    pub fn root() -> Self {
        Class::new(ROOT_CLASS.to_string(), None, std::iter::empty())
    }

    /// Property access on the class value itself: fields set on the class
    /// first, then a resolved method as an unbound function.
    pub fn get(self: &Rc<Self>, name: &str) -> Value {
        if let Some(value) = self.fields.get(name) {
            return value;
        }
        self.lookup_method(name).map_or(Value::Nil, |resolution| {
            Value::Function(Function::User(resolution.method))
        })
    }

    /// Only methods declared directly on this class.
    pub fn lookup_own_method(&self, name: &str) -> Option<Rc<UserFunction>> {
        self.methods.get(name).cloned()
    }

    /// Walks from this class up through its superclasses.
    pub fn lookup_method(self: &Rc<Self>, name: &str) -> Option<MethodResolution> {
        self.lookup_method_from(name, self)
    }

    /// Like [`Class::lookup_method`], but resolution begins at `start`, which
    /// must be this class or one of its ancestors. `super` uses this to start
    /// at the parent of the lexically enclosing class.
    pub fn lookup_method_from(
        self: &Rc<Self>,
        name: &str,
        start: &Rc<Class>,
    ) -> Option<MethodResolution> {
        debug_assert!(self.is_subclass_of(start));

        let mut current = Some(Rc::clone(start));
        while let Some(class) = current {
            if let Some(method) = class.lookup_own_method(name) {
                return Some(MethodResolution {
                    method,
                    declaring_class: class,
                });
            }
            current = class.superclass.clone();
        }
        None
    }

    /// True when `other` is this class or one of its ancestors.
    pub fn is_subclass_of(self: &Rc<Self>, other: &Rc<Class>) -> bool {
        let mut current = Some(Rc::clone(self));
        while let Some(class) = current {
            if Rc::ptr_eq(&class, other) {
                return true;
            }
            current = class.superclass.clone();
        }
        false
    }
}

impl fmt::Debug for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut methods: Vec<&String> = self.methods.keys().collect();
        methods.sort();
        f.debug_struct("Class")
            .field("name", &self.name)
            .field("superclass", &self.superclass.as_ref().map(|s| &s.name))
            .field("methods", &methods)
            .field("fields", &self.fields)
            .finish()
    }
}

pub struct Instance {
    pub class: Rc<Class>,
    fields: HashMap<String, Value>,
}

impl Instance {
    pub fn new(class: Rc<Class>) -> Self {
        Instance {
            class,
            fields: HashMap::new(),
        }
    }

    /// Property access: own fields first, then methods bound to `this`.
    /// A name that is neither yields `nil`.
    pub fn get(this: &Rc<RefCell<Instance>>, name: &str) -> Value {
        let class = {
            let instance = this.borrow();
            if let Some(value) = instance.fields.get(name) {
                return value.clone();
            }
            Rc::clone(&instance.class)
        };

        match class.lookup_method(name) {
            Some(resolution) => BoundMethod::bind(resolution, Rc::clone(this)),
            None => Value::Nil,
        }
    }

    pub fn set(&mut self, name: &str, value: Value) {
        self.fields.insert(name.to_string(), value);
    }
}

// Fields can refer back to the instance itself.
impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut fields: Vec<&String> = self.fields.keys().collect();
        fields.sort();
        f.debug_struct("Instance")
            .field("class", &self.class.name)
            .field("fields", &fields)
            .finish()
    }
}

/// A method paired with its receiver and the class that declares it. Built
/// fresh on every property access, so two extractions are never identical.
#[derive(Debug)]
pub struct BoundMethod {
    pub method: Rc<UserFunction>,
    pub receiver: Rc<RefCell<Instance>>,
    pub declaring_class: Rc<Class>,
    pub fields: Fields,
}

impl BoundMethod {
    pub fn new(resolution: MethodResolution, receiver: Rc<RefCell<Instance>>) -> Self {
        BoundMethod {
            method: resolution.method,
            receiver,
            declaring_class: resolution.declaring_class,
            fields: Fields::default(),
        }
    }

    pub fn bind(resolution: MethodResolution, receiver: Rc<RefCell<Instance>>) -> Value {
        Value::Function(Function::Bound(Rc::new(Self::new(resolution, receiver))))
    }
}
