use std::{
    cell::RefCell,
    io::{self, Write},
    rc::Rc,
};

use tracing::{debug, trace};

use crate::{
    ast::{BinaryExpr, Expr, Stmt, UnaryExpr},
    class::{BoundMethod, Class, Instance, CONSTRUCTOR},
    environment::{Environment, WrappedEnvironment},
    error::{EvaluationResult, InterpreterError, InterpreterErrorKind},
    scanner::{Literal, Token, TokenKind},
    value::{Function, UserFunction, Value},
};

/// Names under which a bound method's receiver and its declaring class's
/// superclass are stored. Both are keywords, so user code can never declare
/// or assign them.
const THIS: &str = "this";
const SUPER: &str = "super";

/// How a statement finished. `Return` unwinds to the nearest function call
/// and never escapes it.
#[derive(Debug, Clone, PartialEq)]
pub enum Completion {
    Normal(Value),
    Return(Value),
}

pub struct Interpreter<W: Write> {
    globals: WrappedEnvironment,
    /// Implicit superclass of every class declared without one.
    root: Rc<Class>,
    out: W,
}

impl Interpreter<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> Interpreter<W> {
    /// `print` statements write to `out`.
    pub fn new(out: W) -> Self {
        let root = Rc::new(Class::root());
        Interpreter {
            globals: Environment::global(&root),
            root,
            out,
        }
    }

    /// The global scope, pre-populated with the native functions and the
    /// root class.
    pub fn globals(&self) -> WrappedEnvironment {
        Rc::clone(&self.globals)
    }

    pub fn into_output(self) -> W {
        self.out
    }

    /// Runs a whole program, stopping at the first runtime error. Yields the
    /// value of the last statement.
    pub fn evaluate(&mut self, statements: &[Stmt], env: &WrappedEnvironment) -> EvaluationResult {
        let mut last = Value::Nil;
        for statement in statements {
            last = self.evaluate_statement(statement, env)?;
        }
        Ok(last)
    }

    /// Runs every top-level statement in turn. A failing statement is handed
    /// to `report` and the ones after it still run.
    pub fn evaluate_each(
        &mut self,
        statements: &[Stmt],
        env: &WrappedEnvironment,
        mut report: impl FnMut(InterpreterError),
    ) {
        for statement in statements {
            if let Err(error) = self.evaluate_statement(statement, env) {
                report(error);
            }
        }
    }

    /// Runs one top-level statement, such as a REPL entry.
    pub fn evaluate_statement(
        &mut self,
        stmt: &Stmt,
        env: &WrappedEnvironment,
    ) -> EvaluationResult {
        trace!(?stmt, "evaluating top-level statement");
        match stmt.evaluate(self, env)? {
            Completion::Normal(value) => Ok(value),
            Completion::Return(_) => Err(InterpreterErrorKind::IllegalReturn.into()),
        }
    }

    /// Calls a function or constructs an instance of a class.
    pub fn call(&mut self, callee: Value, arguments: Vec<Value>) -> EvaluationResult {
        match callee {
            Value::Function(function) => {
                check_arity(function.arity(), arguments.len())?;
                trace!(name = function.name(), arity = function.arity(), "call");
                match function {
                    Function::Native(native) => (native.native_fn)(&arguments),
                    Function::User(function) => self.call_user(&function, arguments, None),
                    Function::Bound(bound) => {
                        self.call_user(&bound.method, arguments, Some(bound.as_ref()))
                    }
                }
            }
            Value::Class(class) => self.instantiate(class, arguments),
            other => Err(InterpreterErrorKind::NotCallable(other.type_name()).into()),
        }
    }

    /// Arity must already be checked. Parameters live in a scope nested in the
    /// closure, and the body in a scope nested in that one.
    fn call_user(
        &mut self,
        function: &UserFunction,
        arguments: Vec<Value>,
        bound: Option<&BoundMethod>,
    ) -> EvaluationResult {
        let params_env = Environment::child(&function.closure);
        {
            let mut scope = params_env.borrow_mut();
            if let Some(bound) = bound {
                scope.define(THIS, Value::Instance(Rc::clone(&bound.receiver)))?;
                let superclass = bound
                    .declaring_class
                    .superclass
                    .clone()
                    .map_or(Value::Nil, Value::Class);
                scope.define(SUPER, superclass)?;
            }
            for (param, argument) in function.decl.params.iter().zip(arguments) {
                scope.define(&param.lexem, argument)?;
            }
        }

        let body_env = Environment::child(&params_env);
        match self.execute_block(&function.decl.body, &body_env)? {
            Completion::Return(value) => Ok(value),
            Completion::Normal(_) => Ok(Value::Nil),
        }
    }

    fn instantiate(&mut self, class: Rc<Class>, arguments: Vec<Value>) -> EvaluationResult {
        debug!(class = %class.name, "instantiating");
        let instance = Rc::new(RefCell::new(Instance::new(Rc::clone(&class))));

        match class.lookup_method(CONSTRUCTOR) {
            Some(resolution) => {
                let constructor = BoundMethod::new(resolution, Rc::clone(&instance));
                check_arity(constructor.method.arity(), arguments.len())?;
                // whatever the constructor returns, the call yields the instance
                self.call_user(&constructor.method, arguments, Some(&constructor))?;
            }
            None => check_arity(0, arguments.len())?,
        }

        Ok(Value::Instance(instance))
    }

    fn execute_block(
        &mut self,
        statements: &[Stmt],
        env: &WrappedEnvironment,
    ) -> EvaluationResult<Completion> {
        let mut last = Value::Nil;
        for statement in statements {
            match statement.evaluate(self, env)? {
                Completion::Normal(value) => last = value,
                completion @ Completion::Return(_) => return Ok(completion),
            }
        }
        Ok(Completion::Normal(last))
    }
}

fn check_arity(expected: usize, actual: usize) -> EvaluationResult<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(InterpreterErrorKind::ArityMismatch { expected, actual }.into())
    }
}

/// The instance a method body runs against. `keyword` names what was being
/// resolved, for the error message.
fn bound_receiver(
    env: &WrappedEnvironment,
    keyword: &'static str,
) -> EvaluationResult<Rc<RefCell<Instance>>> {
    match env.borrow().get(THIS) {
        Ok(Value::Instance(instance)) => Ok(instance),
        _ => Err(InterpreterErrorKind::UnboundThis(keyword).into()),
    }
}

fn bound_superclass(env: &WrappedEnvironment) -> EvaluationResult<Option<Rc<Class>>> {
    match env.borrow().get(SUPER) {
        Ok(Value::Class(class)) => Ok(Some(class)),
        Ok(_) => Ok(None),
        Err(_) => Err(InterpreterErrorKind::UnboundThis(SUPER).into()),
    }
}

pub trait Evaluate<T = Value> {
    fn evaluate<W: Write>(
        &self,
        interpreter: &mut Interpreter<W>,
        env: &WrappedEnvironment,
    ) -> EvaluationResult<T>;
}

impl Evaluate<Completion> for Stmt {
    fn evaluate<W: Write>(
        &self,
        interpreter: &mut Interpreter<W>,
        env: &WrappedEnvironment,
    ) -> EvaluationResult<Completion> {
        match self {
            Stmt::ExprStmt(expr) => expr.evaluate(interpreter, env).map(Completion::Normal),
            Stmt::Print(expr) => {
                let value = expr.evaluate(interpreter, env)?;
                writeln!(interpreter.out, "{value}")?;
                Ok(Completion::Normal(Value::Nil))
            }
            Stmt::VarDecl { name, init } => {
                let init = match init {
                    Some(expr) => expr.evaluate(interpreter, env)?,
                    None => Value::Nil,
                };
                env.borrow_mut().define(&name.lexem, init)?;
                Ok(Completion::Normal(Value::Nil))
            }
            Stmt::Block(statements) => {
                interpreter.execute_block(statements, &Environment::child(env))
            }
            Stmt::IfElse {
                pred,
                if_branch,
                else_branch,
            } => {
                if pred.evaluate(interpreter, env)?.is_truthy() {
                    if_branch.evaluate(interpreter, &Environment::child(env))
                } else if let Some(else_branch) = else_branch {
                    else_branch.evaluate(interpreter, &Environment::child(env))
                } else {
                    Ok(Completion::Normal(Value::Nil))
                }
            }
            Stmt::WhileLoop { pred, body } => {
                while pred.evaluate(interpreter, env)?.is_truthy() {
                    if let completion @ Completion::Return(_) =
                        body.evaluate(interpreter, &Environment::child(env))?
                    {
                        return Ok(completion);
                    }
                }
                Ok(Completion::Normal(Value::Nil))
            }
            Stmt::ForLoop {
                init,
                pred,
                post,
                body,
            } => {
                let loop_env = Environment::child(env);
                if let Some(init) = init {
                    init.evaluate(interpreter, &loop_env)?;
                }
                loop {
                    if let Some(pred) = pred {
                        if !pred.evaluate(interpreter, &loop_env)?.is_truthy() {
                            break;
                        }
                    }
                    if let completion @ Completion::Return(_) =
                        body.evaluate(interpreter, &Environment::child(&loop_env))?
                    {
                        return Ok(completion);
                    }
                    if let Some(post) = post {
                        post.evaluate(interpreter, &loop_env)?;
                    }
                }
                Ok(Completion::Normal(Value::Nil))
            }
            Stmt::FunDecl(decl) => {
                let function = UserFunction::new(Rc::clone(decl), Rc::clone(env));
                env.borrow_mut().define(
                    &decl.name.lexem,
                    Value::Function(Function::User(Rc::new(function))),
                )?;
                Ok(Completion::Normal(Value::Nil))
            }
            Stmt::Return { value, .. } => {
                let value = match value {
                    Some(expr) => expr.evaluate(interpreter, env)?,
                    None => Value::Nil,
                };
                Ok(Completion::Return(value))
            }
            Stmt::ClassDecl {
                name,
                superclass,
                methods,
            } => {
                let superclass = match superclass {
                    Some(token) => {
                        let value = env.borrow().get(&token.lexem)?;
                        match value {
                            Value::Class(class) => Some(class),
                            _ => {
                                return Err(
                                    InterpreterErrorKind::NotAClass(token.lexem.clone()).into()
                                )
                            }
                        }
                    }
                    None => Some(Rc::clone(&interpreter.root)),
                };
                debug!(
                    class = %name.lexem,
                    superclass = superclass.as_ref().map(|s| s.name.as_str()),
                    methods = methods.len(),
                    "declaring class"
                );

                let methods = methods
                    .iter()
                    .map(|decl| Rc::new(UserFunction::new(Rc::clone(decl), Rc::clone(env))));
                let class = Class::new(name.lexem.clone(), superclass, methods);
                env.borrow_mut()
                    .define(&name.lexem, Value::Class(Rc::new(class)))?;
                Ok(Completion::Normal(Value::Nil))
            }
        }
    }
}

impl Evaluate for Expr {
    fn evaluate<W: Write>(
        &self,
        interpreter: &mut Interpreter<W>,
        env: &WrappedEnvironment,
    ) -> EvaluationResult {
        match self {
            Expr::Literal(token) => Ok(literal_value(token)),
            Expr::Variable(name) => env.borrow().get(&name.lexem),
            Expr::Grouping(inner) => inner.evaluate(interpreter, env),
            Expr::Unary(unary) => unary.evaluate(interpreter, env),
            Expr::Binary(binary) => binary.evaluate(interpreter, env),
            Expr::Call {
                callee, arguments, ..
            } => {
                let callee = callee.evaluate(interpreter, env)?;
                let arguments = evaluate_arguments(arguments, interpreter, env)?;
                interpreter.call(callee, arguments)
            }
            Expr::Get { object, name } => Ok(match object.evaluate(interpreter, env)? {
                Value::Instance(instance) => Instance::get(&instance, &name.lexem),
                Value::Class(class) => class.get(&name.lexem),
                Value::Function(function) => {
                    function.fields().get(&name.lexem).unwrap_or(Value::Nil)
                }
                Value::Nil | Value::Boolean(_) | Value::Number(_) | Value::String(_) => {
                    Value::Nil
                }
            }),
            Expr::Set {
                object,
                name,
                value,
            } => {
                let target = object.evaluate(interpreter, env)?;
                let value = value.evaluate(interpreter, env)?;
                match target {
                    Value::Instance(instance) => {
                        instance.borrow_mut().set(&name.lexem, value.clone());
                    }
                    Value::Class(class) => class.fields.set(&name.lexem, value.clone()),
                    Value::Function(function) => function.fields().set(&name.lexem, value.clone()),
                    primitive @ (Value::Nil
                    | Value::Boolean(_)
                    | Value::Number(_)
                    | Value::String(_)) => {
                        return Err(
                            InterpreterErrorKind::ImmutableTarget(primitive.type_name()).into()
                        )
                    }
                }
                Ok(value)
            }
            Expr::This(_) => bound_receiver(env, THIS).map(Value::Instance),
            Expr::SuperGet { method, .. } => {
                let receiver = bound_receiver(env, SUPER)?;
                let Some(superclass) = bound_superclass(env)? else {
                    return Ok(Value::Nil);
                };
                let class = Rc::clone(&receiver.borrow().class);
                Ok(class
                    .lookup_method_from(&method.lexem, &superclass)
                    .map_or(Value::Nil, |resolution| {
                        BoundMethod::bind(resolution, receiver)
                    }))
            }
            Expr::SuperCall { arguments, .. } => {
                let receiver = bound_receiver(env, SUPER)?;
                let superclass = bound_superclass(env)?;
                let arguments = evaluate_arguments(arguments, interpreter, env)?;

                let class = Rc::clone(&receiver.borrow().class);
                let constructor = superclass.and_then(|superclass| {
                    class.lookup_method_from(CONSTRUCTOR, &superclass)
                });
                match constructor {
                    Some(resolution) => {
                        let constructor = BoundMethod::new(resolution, receiver);
                        check_arity(constructor.method.arity(), arguments.len())?;
                        interpreter.call_user(&constructor.method, arguments, Some(&constructor))?;
                    }
                    None => check_arity(0, arguments.len())?,
                }
                Ok(Value::Nil)
            }
        }
    }
}

/// Left to right; the first failure wins.
fn evaluate_arguments<W: Write>(
    arguments: &[Expr],
    interpreter: &mut Interpreter<W>,
    env: &WrappedEnvironment,
) -> EvaluationResult<Vec<Value>> {
    let mut evaluated_arguments = Vec::with_capacity(arguments.len());
    for argument in arguments {
        evaluated_arguments.push(argument.evaluate(interpreter, env)?)
    }
    Ok(evaluated_arguments)
}

fn literal_value(token: &Token) -> Value {
    match &token.literal {
        Some(Literal::Number(n)) => Value::Number(*n),
        Some(Literal::String(s)) => Value::String(s.clone()),
        Some(Literal::Boolean(b)) => Value::Boolean(*b),
        None => Value::Nil,
    }
}

impl Evaluate for UnaryExpr {
    fn evaluate<W: Write>(
        &self,
        interpreter: &mut Interpreter<W>,
        env: &WrappedEnvironment,
    ) -> EvaluationResult {
        let right = self.right.evaluate(interpreter, env)?;
        match self.operator.kind {
            TokenKind::Minus => match right {
                Value::Number(n) => Ok(Value::Number(-n)),
                other => Err(InterpreterErrorKind::TypeMismatch {
                    operator: self.operator.lexem.clone(),
                    operands: other.type_name().to_string(),
                }
                .into()),
            },
            TokenKind::Bang => Ok(Value::Boolean(!right.is_truthy())),
            _ => unreachable!("unary operator {:?}", self.operator.kind),
        }
    }
}

impl BinaryExpr {
    fn numbers(&self, left: &Value, right: &Value) -> EvaluationResult<(f64, f64)> {
        match (left, right) {
            (Value::Number(l), Value::Number(r)) => Ok((*l, *r)),
            _ => Err(InterpreterErrorKind::TypeMismatch {
                operator: self.operator.lexem.clone(),
                operands: format!("{} and {}", left.type_name(), right.type_name()),
            }
            .into()),
        }
    }
}

impl Evaluate for BinaryExpr {
    fn evaluate<W: Write>(
        &self,
        interpreter: &mut Interpreter<W>,
        env: &WrappedEnvironment,
    ) -> EvaluationResult {
        match self.operator.kind {
            TokenKind::Equal => {
                let Expr::Variable(name) = &self.left else {
                    unreachable!("the parser only builds assignments to variables")
                };
                let value = self.right.evaluate(interpreter, env)?;
                env.borrow_mut().assign(&name.lexem, value.clone())?;
                return Ok(value);
            }
            TokenKind::Or => {
                let left = self.left.evaluate(interpreter, env)?;
                return if left.is_truthy() {
                    Ok(left)
                } else {
                    self.right.evaluate(interpreter, env)
                };
            }
            TokenKind::And => {
                let left = self.left.evaluate(interpreter, env)?;
                return if left.is_truthy() {
                    self.right.evaluate(interpreter, env)
                } else {
                    Ok(left)
                };
            }
            _ => {}
        }

        let left = self.left.evaluate(interpreter, env)?;
        let right = self.right.evaluate(interpreter, env)?;

        match self.operator.kind {
            TokenKind::EqualEqual => Ok(Value::Boolean(left == right)),
            TokenKind::BangEqual => Ok(Value::Boolean(left != right)),
            TokenKind::Plus => {
                let (l, r) = self.numbers(&left, &right)?;
                Ok(Value::Number(l + r))
            }
            TokenKind::Minus => {
                let (l, r) = self.numbers(&left, &right)?;
                Ok(Value::Number(l - r))
            }
            TokenKind::Star => {
                let (l, r) = self.numbers(&left, &right)?;
                Ok(Value::Number(l * r))
            }
            TokenKind::Slash => {
                let (l, r) = self.numbers(&left, &right)?;
                Ok(Value::Number(l / r))
            }
            TokenKind::Greater => {
                let (l, r) = self.numbers(&left, &right)?;
                Ok(Value::Boolean(l > r))
            }
            TokenKind::GreaterEqual => {
                let (l, r) = self.numbers(&left, &right)?;
                Ok(Value::Boolean(l >= r))
            }
            TokenKind::Less => {
                let (l, r) = self.numbers(&left, &right)?;
                Ok(Value::Boolean(l < r))
            }
            TokenKind::LessEqual => {
                let (l, r) = self.numbers(&left, &right)?;
                Ok(Value::Boolean(l <= r))
            }
            _ => unreachable!("binary operator {:?}", self.operator.kind),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::InterpreterError, parse_source_code};
    use pretty_assertions::assert_eq;

    fn run(source: &str) -> (String, EvaluationResult) {
        let statements = parse_source_code(source).expect("source should parse");
        let mut interpreter = Interpreter::new(Vec::new());
        let globals = interpreter.globals();
        let result = interpreter.evaluate(&statements, &globals);
        let output = String::from_utf8(interpreter.into_output()).unwrap();
        (output, result)
    }

    fn output_of(source: &str) -> String {
        let (output, result) = run(source);
        if let Err(error) = result {
            panic!("unexpected error: {error}\noutput so far:\n{output}");
        }
        output
    }

    fn error_of(source: &str) -> InterpreterErrorKind {
        match run(source) {
            (_, Err(InterpreterError { kind })) => kind,
            (output, Ok(value)) => panic!("expected an error, got {value:?}\noutput:\n{output}"),
        }
    }

    fn value_of(source: &str) -> Value {
        run(source).1.unwrap()
    }

    #[test]
    fn arithmetic_and_display() {
        assert_eq!(
            output_of("print 1 + 2 * 3; print 10 / 4; print -(1 - 3); print 1 / 0;"),
            "7\n2.5\n2\ninf\n"
        );
    }

    #[test]
    fn comparisons_and_equality() {
        assert_eq!(
            output_of(
                "print 1 < 2; print 2 <= 1; print 3 >= 3; print \"a\" == \"a\";
                 print nil == false; print 0 == false; print nil == nil; print 1 != 2;"
            ),
            "true\nfalse\ntrue\ntrue\nfalse\nfalse\ntrue\ntrue\n"
        );
    }

    #[test]
    fn only_nil_and_false_are_falsy() {
        assert_eq!(
            output_of(
                "if (0) print \"zero\"; if (\"\") print \"empty\";
                 if (nil) print \"nil\"; else print \"else\"; print !nil; print !clock;"
            ),
            "zero\nempty\nelse\ntrue\nfalse\n"
        );
    }

    #[test]
    fn logical_operators_short_circuit_and_yield_operands() {
        assert_eq!(
            output_of(
                "print nil or \"x\"; print false and undefinedThing;
                 print 1 and 2; print 1 or undefinedThing;"
            ),
            "x\nfalse\n2\n1\n"
        );
    }

    #[test]
    fn arithmetic_requires_numbers() {
        assert_eq!(
            error_of("1 + \"a\";"),
            InterpreterErrorKind::TypeMismatch {
                operator: "+".into(),
                operands: "Number and String".into(),
            }
        );
        assert_eq!(
            error_of("-\"a\";"),
            InterpreterErrorKind::TypeMismatch {
                operator: "-".into(),
                operands: "String".into(),
            }
        );
        assert_eq!(
            error_of("nil < 1;").to_string(),
            "Unsupported operator '<' on Nil and Number"
        );
    }

    #[test]
    fn blocks_shadow_without_leaking() {
        assert_eq!(
            output_of("var a = 1; { var a = 2; print a; } print a;"),
            "2\n1\n"
        );
        assert_eq!(
            output_of("var a = 1; { a = 2; } print a;"),
            "2\n"
        );
    }

    #[test]
    fn variable_errors() {
        assert_eq!(
            error_of("var a = 1; var a = 2;"),
            InterpreterErrorKind::RedeclaredVariable("a".into())
        );
        assert_eq!(
            error_of("print b;"),
            InterpreterErrorKind::UndefinedVariable("b".into())
        );
        assert_eq!(
            error_of("b = 1;"),
            InterpreterErrorKind::UndefinedVariable("b".into())
        );
    }

    #[test]
    fn uninitialized_variables_are_nil() {
        assert_eq!(output_of("var a; print a;"), "nil\n");
    }

    #[test]
    fn loops() {
        assert_eq!(
            output_of("var i = 0; while (i < 3) { print i; i = i + 1; }"),
            "0\n1\n2\n"
        );
        assert_eq!(
            output_of("for (var i = 0; i < 2; i = i + 1) print i;"),
            "0\n1\n"
        );
        assert_eq!(
            error_of("for (var i = 0; i < 2; i = i + 1) {} print i;"),
            InterpreterErrorKind::UndefinedVariable("i".into())
        );
    }

    #[test]
    fn loop_body_gets_a_fresh_scope_each_iteration() {
        assert_eq!(
            output_of("for (var i = 0; i < 2; i = i + 1) { var x = i; print x; }"),
            "0\n1\n"
        );
    }

    #[test]
    fn closure_outlives_its_block() {
        assert_eq!(
            output_of(
                "var outer; { var a = 3; fun inner() { return a; } outer = inner; } print outer();"
            ),
            "3\n"
        );
    }

    #[test]
    fn closures_share_and_mutate_captured_scope() {
        let source = "
            fun makeCounter() {
                var i = 0;
                fun count() { i = i + 1; return i; }
                return count;
            }
            var a = makeCounter();
            var b = makeCounter();
            print a(); print a(); print b();
        ";
        assert_eq!(output_of(source), "1\n2\n1\n");
    }

    #[test]
    fn recursion() {
        let source = "
            fun fib(n) { if (n < 2) return n; return fib(n - 1) + fib(n - 2); }
            print fib(10);
        ";
        assert_eq!(output_of(source), "55\n");
    }

    #[test]
    fn return_unwinds_nested_loops_and_blocks() {
        let source = "
            fun f() {
                for (var i = 0; i < 10; i = i + 1) {
                    while (true) {
                        { if (i == 3) return i; }
                        i = i + 1;
                    }
                }
                print \"unreachable\";
            }
            print f();
        ";
        assert_eq!(output_of(source), "3\n");
    }

    #[test]
    fn missing_return_yields_nil() {
        assert_eq!(output_of("fun f() {} fun g() { return; } print f(); print g();"), "nil\nnil\n");
    }

    #[test]
    fn return_outside_function_is_an_error() {
        assert_eq!(error_of("return 1;"), InterpreterErrorKind::IllegalReturn);
        assert_eq!(error_of("{ if (true) return; }"), InterpreterErrorKind::IllegalReturn);
    }

    #[test]
    fn calling_non_callables_fails() {
        assert_eq!(
            error_of("\"a\"();"),
            InterpreterErrorKind::NotCallable("String")
        );
        assert_eq!(error_of("nil();").to_string(), "Value of type Nil is not callable");
    }

    #[test]
    fn arity_is_checked_before_the_body_runs() {
        let statements =
            parse_source_code("var x = 0; fun f(a) { x = 1; } f(1, 2);").unwrap();
        let mut interpreter = Interpreter::new(Vec::new());
        let globals = interpreter.globals();

        let error = interpreter.evaluate(&statements, &globals).unwrap_err();

        assert_eq!(
            error.kind,
            InterpreterErrorKind::ArityMismatch {
                expected: 1,
                actual: 2
            }
        );
        assert_eq!(globals.borrow().get("x").unwrap(), Value::Number(0.0));
    }

    #[test]
    fn native_functions() {
        assert_eq!(
            output_of("print toString(1.5) == \"1.5\"; print clock() > 0; print clock;"),
            "true\ntrue\n<native fn clock>\n"
        );
        assert_eq!(
            error_of("toString();"),
            InterpreterErrorKind::ArityMismatch {
                expected: 1,
                actual: 0
            }
        );
    }

    #[test]
    fn functions_display_and_compare_by_identity() {
        assert_eq!(
            output_of("fun f() {} var g = f; print f; print f == g; print f == clock;"),
            "<fn f>\ntrue\nfalse\n"
        );
    }

    #[test]
    fn statements_yield_values() {
        assert_eq!(value_of("1 + 1;"), Value::Number(2.0));
        assert_eq!(value_of("{ 1; 2; }"), Value::Number(2.0));
        assert_eq!(value_of("if (true) 3; else 4;"), Value::Number(3.0));
        assert_eq!(value_of("if (false) 3; else 4;"), Value::Number(4.0));
        assert_eq!(value_of("var x = 1;"), Value::Nil);
        assert_eq!(value_of("print 1;"), Value::Nil);
        assert_eq!(value_of("\"s\";"), Value::String("s".into()));
    }

    #[test]
    fn evaluation_stops_at_first_error() {
        let (output, result) = run("print 1; nope; print 2;");
        assert_eq!(output, "1\n");
        assert_eq!(
            result.unwrap_err().kind,
            InterpreterErrorKind::UndefinedVariable("nope".into())
        );
    }

    #[test]
    fn each_statement_runs_after_a_failure() {
        let statements = parse_source_code("print 1; nope; print 2; 1 + nil;").unwrap();
        let mut interpreter = Interpreter::new(Vec::new());
        let globals = interpreter.globals();
        let mut errors = vec![];

        interpreter.evaluate_each(&statements, &globals, |error| errors.push(error.kind));

        assert_eq!(interpreter.into_output(), b"1\n2\n");
        assert_eq!(
            errors,
            vec![
                InterpreterErrorKind::UndefinedVariable("nope".into()),
                InterpreterErrorKind::TypeMismatch {
                    operator: "+".into(),
                    operands: "Number and Nil".into(),
                },
            ]
        );
    }

    #[test]
    fn declarations_persist_across_top_level_statements() {
        let mut interpreter = Interpreter::new(Vec::new());
        let globals = interpreter.globals();

        for line in ["var a = 1;", "fun f() { return a + 1; }", "a = f();", "print a;"] {
            for statement in parse_source_code(line).unwrap() {
                interpreter.evaluate_statement(&statement, &globals).unwrap();
            }
        }

        assert_eq!(interpreter.into_output(), b"2\n");
    }

    #[test]
    fn classes_fields_and_methods() {
        let source = "
            class Point {
                fun constructor(x, y) { this.x = x; this.y = y; }
                fun sum() { return this.x + this.y; }
            }
            var p = Point(1, 2);
            print p.sum();
            p.x = 10;
            print p.sum();
            print p;
            print Point;
        ";
        assert_eq!(output_of(source), "3\n12\n<instance Point>\n<class Point>\n");
    }

    #[test]
    fn constructor_always_yields_the_instance() {
        assert_eq!(
            output_of("class A { fun constructor() { return 1; } } print A();"),
            "<instance A>\n"
        );
    }

    #[test]
    fn class_arity_follows_its_constructor() {
        assert_eq!(
            error_of("class A {} A(1);"),
            InterpreterErrorKind::ArityMismatch {
                expected: 0,
                actual: 1
            }
        );
        assert_eq!(
            error_of("class A { fun constructor(a, b) {} } A(1);"),
            InterpreterErrorKind::ArityMismatch {
                expected: 2,
                actual: 1
            }
        );
    }

    #[test]
    fn inherited_constructor_is_used() {
        let source = "
            class A { fun constructor(v) { this.v = v; } }
            class B < A {}
            print B(4).v;
        ";
        assert_eq!(output_of(source), "4\n");
    }

    #[test]
    fn fields_shadow_methods() {
        assert_eq!(
            output_of(
                "class A { fun m() { return 1; } }
                 var a = A(); print a.m(); a.m = 2; print a.m;"
            ),
            "1\n2\n"
        );
    }

    #[test]
    fn missing_properties_are_nil() {
        assert_eq!(
            output_of("class A {} print A().missing; print \"s\".length; print A.missing;"),
            "nil\nnil\nnil\n"
        );
    }

    #[test]
    fn primitives_are_immutable() {
        assert_eq!(
            error_of("var n = 1; n.x = 2;"),
            InterpreterErrorKind::ImmutableTarget("Number")
        );
        assert_eq!(error_of("nil.x = 2;").to_string(), "Nil is immutable");
        assert_eq!(
            error_of("true.x = 2;"),
            InterpreterErrorKind::ImmutableTarget("Boolean")
        );
        assert_eq!(
            error_of("\"s\".x = 2;"),
            InterpreterErrorKind::ImmutableTarget("String")
        );
    }

    #[test]
    fn functions_carry_fields() {
        let source = "
            fun f() {}
            f.x = 1;
            print f.x;
            print f.y;
            var g = f;
            g.x = 3;
            print f.x;
            print (f.z = 4);
            clock.calls = 0;
            print clock.calls;
        ";
        assert_eq!(output_of(source), "1\nnil\n3\n4\n0\n");
    }

    #[test]
    fn class_fields_shadow_methods_on_the_class_only() {
        let source = "
            class A { fun m() { return 1; } }
            A.count = 0;
            A.count = A.count + 1;
            print A.count;
            A.m = 2;
            print A.m;
            print A().m();
            print A().count;
        ";
        assert_eq!(output_of(source), "1\n2\n1\nnil\n");
    }

    #[test]
    fn property_mutation_is_visible_through_aliases() {
        assert_eq!(
            output_of("class A {} var a = A(); var b = a; b.x = 1; print a.x; print a == b;"),
            "1\ntrue\n"
        );
    }

    #[test]
    fn to_string_renders_every_kind() {
        let source = "
            fun f() {}
            class A { fun get() {} }
            var a = A();
            print toString(f);
            print toString(clock);
            print toString(a.get);
            print toString(A);
            print toString(a);
            print toString(\"s\") == \"s\";
        ";
        assert_eq!(
            output_of(source),
            "<fn f>\n<native fn clock>\n<bound fn get>\n<class A>\n<instance A>\ntrue\n"
        );
    }

    #[test]
    fn object_is_the_root_class() {
        assert_eq!(
            output_of(
                "class A < Object {} class B {} print A(); print Object; print Object();
                 class C { fun constructor() { super(); } } print C();"
            ),
            "<instance A>\n<class Object>\n<instance Object>\n<instance C>\n"
        );
        assert_eq!(
            error_of("class Object {}"),
            InterpreterErrorKind::RedeclaredVariable("Object".into())
        );
    }

    #[test]
    fn bound_methods_remember_their_receiver() {
        let source = "
            class A {
                fun constructor(v) { this.v = v; }
                fun get() { return this.v; }
            }
            var a = A(7);
            var f = a.get;
            print f();
            print f;
            print a.get == a.get;
        ";
        assert_eq!(output_of(source), "7\n<bound fn get>\nfalse\n");
    }

    #[test]
    fn this_inside_a_closure_within_a_method() {
        let source = "
            class A {
                fun constructor() { this.v = 1; }
                fun f() { fun inner() { return this.v; } return inner; }
            }
            print A().f()();
        ";
        assert_eq!(output_of(source), "1\n");
    }

    #[test]
    fn this_outside_a_bound_method_fails() {
        assert_eq!(
            error_of("fun g() { return this; } g();"),
            InterpreterErrorKind::UnboundThis("this")
        );
        assert_eq!(
            error_of("class A { fun m() { return this; } } A.m();"),
            InterpreterErrorKind::UnboundThis("this")
        );
        assert_eq!(
            error_of("fun g() { return super.m; } g();"),
            InterpreterErrorKind::UnboundThis("super")
        );
    }

    #[test]
    fn method_dispatch_is_dynamic() {
        let source = "
            class A { fun name() { return \"A\"; } fun describe() { print this.name(); } }
            class B < A { fun name() { return \"B\"; } }
            B().describe();
        ";
        assert_eq!(output_of(source), "B\n");
    }

    #[test]
    fn super_resolves_from_the_declaring_class() {
        let source = "
            class A { fun speak() { print \"A\"; } }
            class B < A { fun speak() { super.speak(); print \"B\"; } }
            class C < B {}
            C().speak();
        ";
        assert_eq!(output_of(source), "A\nB\n");
    }

    #[test]
    fn super_method_skips_overrides_in_subclasses() {
        let source = "
            class A { fun m() { return \"A.m\"; } }
            class B < A { fun m() { return \"B.m\"; } fun test() { return super.m(); } }
            class C < B { fun m() { return \"C.m\"; } }
            print C().test();
        ";
        assert_eq!(output_of(source), "A.m\n");
    }

    #[test]
    fn super_constructor_chain() {
        let source = "
            class A { fun constructor(x) { this.x = x; } }
            class B < A { fun constructor(x, y) { super(x); this.y = y; } }
            var b = B(1, 2);
            print b.x + b.y;
        ";
        assert_eq!(output_of(source), "3\n");
    }

    #[test]
    fn super_call_without_a_constructor_is_a_no_op() {
        assert_eq!(
            output_of(
                "class A {}
                 class B < A { fun constructor() { super(); this.ok = true; } }
                 print B().ok;"
            ),
            "true\n"
        );
        assert_eq!(
            error_of("class A {} class B < A { fun constructor() { super(1); } } B();"),
            InterpreterErrorKind::ArityMismatch {
                expected: 0,
                actual: 1
            }
        );
    }

    #[test]
    fn super_in_a_root_class_is_nil() {
        assert_eq!(
            output_of("class R { fun m() { return super.p; } } print R().m();"),
            "nil\n"
        );
        assert_eq!(
            error_of("class R { fun m() { return super.p(); } } R().m();"),
            InterpreterErrorKind::NotCallable("Nil")
        );
    }

    #[test]
    fn superclass_must_be_a_class() {
        assert_eq!(
            error_of("var X = 1; class B < X {}"),
            InterpreterErrorKind::NotAClass("X".into())
        );
        assert_eq!(
            error_of("class B < Missing {}"),
            InterpreterErrorKind::UndefinedVariable("Missing".into())
        );
    }

    #[test]
    fn methods_close_over_the_declaring_scope() {
        let source = "
            var make;
            {
                var greeting = \"hi\";
                class A { fun greet() { return greeting; } }
                make = A;
            }
            print make().greet();
        ";
        assert_eq!(output_of(source), "hi\n");
    }
}
