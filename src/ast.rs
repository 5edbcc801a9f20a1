use std::rc::Rc;

use crate::scanner::Token;

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    ExprStmt(Expr),
    Print(Expr),
    VarDecl {
        name: Token,
        init: Option<Expr>,
    },
    Block(Vec<Stmt>),
    IfElse {
        pred: Expr,
        if_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },
    WhileLoop {
        pred: Expr,
        body: Box<Stmt>,
    },
    ForLoop {
        init: Option<Box<Stmt>>,
        pred: Option<Expr>,
        post: Option<Expr>,
        body: Box<Stmt>,
    },
    /// Shared with the function values created from it; never mutated.
    FunDecl(Rc<FunDecl>),
    Return {
        keyword: Token,
        value: Option<Expr>,
    },
    ClassDecl {
        name: Token,
        superclass: Option<Token>,
        methods: Vec<Rc<FunDecl>>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunDecl {
    pub name: Token,
    pub params: Vec<Token>,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Number, string, `true`, `false` or `nil` token.
    Literal(Token),
    Variable(Token),
    Grouping(Box<Expr>),
    Unary(Box<UnaryExpr>),
    /// Arithmetic, comparison, equality, plus `=`, `and` and `or`.
    Binary(Box<BinaryExpr>),
    Call {
        callee: Box<Expr>,
        paren: Token,
        arguments: Vec<Expr>,
    },
    Get {
        object: Box<Expr>,
        name: Token,
    },
    Set {
        object: Box<Expr>,
        name: Token,
        value: Box<Expr>,
    },
    This(Token),
    SuperGet {
        keyword: Token,
        method: Token,
    },
    SuperCall {
        keyword: Token,
        arguments: Vec<Expr>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnaryExpr {
    pub operator: Token,
    pub right: Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BinaryExpr {
    pub left: Expr,
    pub operator: Token,
    pub right: Expr,
}
