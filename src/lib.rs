//! A tree-walking interpreter for Rox, a small dynamically typed language
//! with closures and single-inheritance classes.
//!
//! Source text goes through [`scanner`], [`parser`] and [`analysis`] (bundled
//! as [`parse_source_code`]) and the resulting statements are run by an
//! [`interpreter::Interpreter`].

pub mod analysis;
pub mod ast;
pub mod class;
pub mod diagnostics;
pub mod environment;
pub mod error;
pub mod globals;
pub mod interpreter;
pub mod parser;
pub mod pretty;
pub mod scanner;
pub mod value;

use thiserror::Error;

use crate::{
    analysis::SemanticError,
    ast::Stmt,
    parser::{ParseError, Parser},
    scanner::{ScanError, Scanner, Span},
};

/// Anything that stops a program before it runs.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FrontendError {
    #[error(transparent)]
    Scan(#[from] ScanError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Semantic(#[from] SemanticError),
}

impl FrontendError {
    pub fn span(&self) -> Span {
        match self {
            FrontendError::Scan(error) => error.span(),
            FrontendError::Parse(error) => error.span,
            FrontendError::Semantic(error) => error.span,
        }
    }
}

/// Scans, parses and checks `source`. Scan and parse errors are reported
/// together; the semantic checks only run on a program that parsed.
pub fn parse_source_code(source: &str) -> Result<Vec<Stmt>, Vec<FrontendError>> {
    let (tokens, scan_errors) = Scanner::new(source).scan_tokens();
    let mut errors: Vec<FrontendError> = scan_errors.into_iter().map(Into::into).collect();

    let statements = match Parser::new(tokens.into_iter()).parse() {
        Ok(statements) => statements,
        Err(parse_errors) => {
            errors.extend(parse_errors.into_iter().map(FrontendError::from));
            return Err(errors);
        }
    };
    if !errors.is_empty() {
        return Err(errors);
    }

    match analysis::analyze_statements(&statements) {
        Some(semantic_errors) => Err(semantic_errors.into_iter().map(Into::into).collect()),
        None => Ok(statements),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_source_parses() {
        let statements = parse_source_code("var a = 1; print a;").unwrap();
        assert_eq!(statements.len(), 2);
    }

    #[test]
    fn scan_and_parse_errors_are_reported_together() {
        let errors = parse_source_code("var a = @;\nprint ;").unwrap_err();

        assert!(matches!(errors[0], FrontendError::Scan(_)));
        assert!(errors[1..]
            .iter()
            .all(|error| matches!(error, FrontendError::Parse(_))));
        assert!(errors.len() >= 2);
    }

    #[test]
    fn semantic_errors_carry_a_span() {
        let params = (0..256)
            .map(|i| format!("p{i}"))
            .collect::<Vec<_>>()
            .join(", ");
        let source = format!("fun f({params}) {{}}");

        let errors = parse_source_code(&source).unwrap_err();
        assert_eq!(errors.len(), 1);
        let FrontendError::Semantic(error) = &errors[0] else {
            panic!("expected a semantic error, got {:?}", errors[0]);
        };
        assert_eq!(
            error.kind,
            analysis::SemanticErrorKind::TooManyParameters(256)
        );
        assert_eq!(errors[0].span(), error.span);
    }
}
