use crate::{
    ast::{Expr, FunDecl, Stmt},
    scanner::Span,
};

pub const MAX_ARITY: usize = 255;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
#[error("Semantic Error: {kind}")]
pub struct SemanticError {
    pub kind: SemanticErrorKind,
    pub span: Span,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum SemanticErrorKind {
    #[error("Too many arguments. Max arguments size is 255, got: {0}")]
    TooManyArguments(usize),
    #[error("Too many parameters. Max parameters size is 255, got: {0}")]
    TooManyParameters(usize),
}

trait Analyze {
    fn analyze(&self, errors: &mut Vec<SemanticError>);
}

impl Analyze for Stmt {
    fn analyze(&self, errors: &mut Vec<SemanticError>) {
        match self {
            Stmt::ExprStmt(expr) | Stmt::Print(expr) => expr.analyze(errors),
            Stmt::VarDecl { init, .. } => {
                if let Some(init) = init {
                    init.analyze(errors);
                }
            }
            Stmt::Block(stmts) => stmts.iter().for_each(|s| s.analyze(errors)),
            Stmt::IfElse {
                pred,
                if_branch,
                else_branch,
            } => {
                pred.analyze(errors);
                if_branch.analyze(errors);
                if let Some(else_branch) = else_branch {
                    else_branch.analyze(errors);
                }
            }
            Stmt::WhileLoop { pred, body } => {
                pred.analyze(errors);
                body.analyze(errors);
            }
            Stmt::ForLoop {
                init,
                pred,
                post,
                body,
            } => {
                if let Some(init) = init {
                    init.analyze(errors);
                }
                pred.iter().chain(post).for_each(|e| e.analyze(errors));
                body.analyze(errors);
            }
            Stmt::FunDecl(decl) => decl.analyze(errors),
            Stmt::Return { value, .. } => {
                if let Some(value) = value {
                    value.analyze(errors);
                }
            }
            Stmt::ClassDecl { methods, .. } => methods.iter().for_each(|m| m.analyze(errors)),
        }
    }
}

impl Analyze for FunDecl {
    fn analyze(&self, errors: &mut Vec<SemanticError>) {
        if self.params.len() > MAX_ARITY {
            errors.push(SemanticError {
                kind: SemanticErrorKind::TooManyParameters(self.params.len()),
                span: self.name.span,
            });
        }
        self.body.iter().for_each(|s| s.analyze(errors));
    }
}

impl Analyze for Expr {
    fn analyze(&self, errors: &mut Vec<SemanticError>) {
        match self {
            Expr::Literal(_) | Expr::Variable(_) | Expr::This(_) | Expr::SuperGet { .. } => {}
            Expr::Grouping(inner) => inner.analyze(errors),
            Expr::Unary(unary) => unary.right.analyze(errors),
            Expr::Binary(binary) => {
                binary.left.analyze(errors);
                binary.right.analyze(errors);
            }
            Expr::Call {
                callee,
                paren,
                arguments,
            } => {
                callee.analyze(errors);
                check_arguments(arguments, paren.span, errors);
            }
            Expr::SuperCall { keyword, arguments } => {
                check_arguments(arguments, keyword.span, errors);
            }
            Expr::Get { object, .. } => object.analyze(errors),
            Expr::Set { object, value, .. } => {
                object.analyze(errors);
                value.analyze(errors);
            }
        }
    }
}

fn check_arguments(arguments: &[Expr], span: Span, errors: &mut Vec<SemanticError>) {
    if arguments.len() > MAX_ARITY {
        errors.push(SemanticError {
            kind: SemanticErrorKind::TooManyArguments(arguments.len()),
            span,
        });
    }
    arguments.iter().for_each(|a| a.analyze(errors));
}

pub fn analyze_statements(statements: &[Stmt]) -> Option<Vec<SemanticError>> {
    let mut errors = vec![];
    statements.iter().for_each(|stmt| stmt.analyze(&mut errors));

    if errors.is_empty() {
        None
    } else {
        Some(errors)
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        analysis::{analyze_statements, SemanticErrorKind},
        parser::Parser,
        scanner::Scanner,
    };

    fn repeated_a(count: usize) -> String {
        std::iter::repeat(String::from("a"))
            .take(count)
            .collect::<Vec<String>>()
            .join(",")
    }

    fn analyze(source: &str) -> Option<Vec<super::SemanticError>> {
        let (tokens, _) = Scanner::new(source).scan_tokens();
        let statements = Parser::new(tokens.into_iter()).parse().unwrap();
        analyze_statements(&statements)
    }

    #[test]
    fn does_not_error_on_max_parameters() {
        let call = format!("fun b({}) {{}}", repeated_a(255));

        assert!(analyze(&call).is_none())
    }

    #[test]
    fn does_not_error_on_max_arguments() {
        let call = format!("b({});", repeated_a(255));

        assert!(analyze(&call).is_none())
    }

    #[test]
    fn errors_on_more_than_max_parameters() {
        let call = format!("fun b({}) {{}}", repeated_a(256));

        let errors = analyze(&call).unwrap();
        assert_eq!(errors[0].kind, SemanticErrorKind::TooManyParameters(256));
    }

    #[test]
    fn errors_on_more_than_max_arguments() {
        let call = format!("b({});", repeated_a(256));

        let errors = analyze(&call).unwrap();
        assert_eq!(errors[0].kind, SemanticErrorKind::TooManyArguments(256));
    }

    #[test]
    fn finds_violations_nested_in_methods() {
        let source = format!(
            "class C {{ fun m() {{ if (true) {{ print f({}); }} }} }}",
            repeated_a(300)
        );

        let errors = analyze(&source).unwrap();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, SemanticErrorKind::TooManyArguments(300));
    }
}
