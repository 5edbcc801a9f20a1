//! Parenthesised prefix rendering of syntax trees, for `--dump-ast` and tests.

use crate::ast::{Expr, FunDecl, Stmt};

pub fn print_expr(expr: &Expr) -> String {
    match expr {
        Expr::Literal(token) => token.lexem.clone(),
        Expr::Variable(name) => name.lexem.clone(),
        Expr::Grouping(inner) => format!("(group {})", print_expr(inner)),
        Expr::Unary(unary) => format!("({} {})", unary.operator.lexem, print_expr(&unary.right)),
        Expr::Binary(binary) => format!(
            "({} {} {})",
            binary.operator.lexem,
            print_expr(&binary.left),
            print_expr(&binary.right)
        ),
        Expr::Call {
            callee, arguments, ..
        } => parenthesize(
            "call",
            std::iter::once(print_expr(callee)).chain(arguments.iter().map(print_expr)),
        ),
        Expr::Get { object, name } => format!("(. {} {})", print_expr(object), name.lexem),
        Expr::Set {
            object,
            name,
            value,
        } => format!(
            "(= (. {} {}) {})",
            print_expr(object),
            name.lexem,
            print_expr(value)
        ),
        Expr::This(_) => "this".to_string(),
        Expr::SuperGet { method, .. } => format!("(super {})", method.lexem),
        Expr::SuperCall { arguments, .. } => {
            parenthesize("super-call", arguments.iter().map(print_expr))
        }
    }
}

pub fn print_stmt(stmt: &Stmt) -> String {
    match stmt {
        Stmt::ExprStmt(expr) => format!("(expr {})", print_expr(expr)),
        Stmt::Print(expr) => format!("(print {})", print_expr(expr)),
        Stmt::VarDecl { name, init: None } => format!("(var {})", name.lexem),
        Stmt::VarDecl {
            name,
            init: Some(init),
        } => format!("(var {} {})", name.lexem, print_expr(init)),
        Stmt::Block(statements) => parenthesize("block", statements.iter().map(print_stmt)),
        Stmt::IfElse {
            pred,
            if_branch,
            else_branch,
        } => match else_branch {
            Some(else_branch) => format!(
                "(if {} {} {})",
                print_expr(pred),
                print_stmt(if_branch),
                print_stmt(else_branch)
            ),
            None => format!("(if {} {})", print_expr(pred), print_stmt(if_branch)),
        },
        Stmt::WhileLoop { pred, body } => {
            format!("(while {} {})", print_expr(pred), print_stmt(body))
        }
        Stmt::ForLoop {
            init,
            pred,
            post,
            body,
        } => format!(
            "(for {} {} {} {})",
            init.as_deref().map_or_else(|| "nil".to_string(), print_stmt),
            pred.as_ref().map_or_else(|| "nil".to_string(), print_expr),
            post.as_ref().map_or_else(|| "nil".to_string(), print_expr),
            print_stmt(body)
        ),
        Stmt::FunDecl(decl) => print_fun(decl),
        Stmt::Return { value: None, .. } => "(return)".to_string(),
        Stmt::Return {
            value: Some(value), ..
        } => format!("(return {})", print_expr(value)),
        Stmt::ClassDecl {
            name,
            superclass,
            methods,
        } => {
            let head = match superclass {
                Some(superclass) => format!("class {} < {}", name.lexem, superclass.lexem),
                None => format!("class {}", name.lexem),
            };
            parenthesize(&head, methods.iter().map(|m| print_fun(m)))
        }
    }
}

fn print_fun(decl: &FunDecl) -> String {
    let params: Vec<&str> = decl.params.iter().map(|p| p.lexem.as_str()).collect();
    let head = format!("fun {} ({})", decl.name.lexem, params.join(" "));
    parenthesize(&head, decl.body.iter().map(print_stmt))
}

fn parenthesize(head: &str, parts: impl Iterator<Item = String>) -> String {
    let mut out = format!("({head}");
    for part in parts {
        out.push(' ');
        out.push_str(&part);
    }
    out.push(')');
    out
}
