use std::fmt::{Display, Formatter};

/// Defines AST datatypes

#[derive(Debug, Eq, PartialEq)]
pub struct Program {
    pub items: Vec<Stmt>,
}

#[derive(Debug, Eq, PartialEq, Clone)]
pub struct FuncDecl {
    pub name: String,
    pub params: Vec<String>,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Eq, PartialEq, Clone)]
pub enum Stmt {
    /// `Idea x` — reserves a frame slot, generates no code by itself
    VarDecl {
        name: String,
    },
    /// `Let x <expr>`
    Assign {
        name: String,
        value: Expr,
    },
    /// `Criterion <cond> <block> <block>` — else block may be empty
    If {
        condition: Expr,
        then: Vec<Stmt>,
        otherwise: Vec<Stmt>,
    },
    /// `Catharsis <expr>`
    Return {
        expr: Expr,
    },
    /// `Write <expr>`
    Write {
        expr: Expr,
    },
    /// `Read x`
    Read {
        name: String,
    },
    /// `root <expr>` — parsed but has no backend support
    Sqrt {
        expr: Expr,
    },
    /// `Thanks`
    Exit,
    /// statement-level `Ritual f (args)`
    Call {
        func: String,
        args: Vec<Expr>,
    },
    /// `Theurgy f (params) <block>` — legal at the top level only
    Func(FuncDecl),
}

#[derive(Debug, Eq, PartialEq, Clone)]
pub enum Expr {
    Number(i64),
    Var(String),
    Binary {
        op: BinOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Call {
        func: String,
        args: Vec<Expr>,
    },
}

#[derive(Debug, Eq, PartialEq, Copy, Clone)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,

    // Relational
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
}

impl BinOp {
    /// Relational operators are only legal at the head of a `Criterion`
    /// condition; arithmetic ones only in value position.
    pub fn is_relational(self) -> bool {
        matches!(
            self,
            BinOp::Equal
                | BinOp::NotEqual
                | BinOp::Less
                | BinOp::LessEqual
                | BinOp::Greater
                | BinOp::GreaterEqual
        )
    }
}

impl Display for BinOp {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            BinOp::Add => "with",
            BinOp::Sub => "without",
            BinOp::Mul => "times",
            BinOp::Div => "split",
            BinOp::Equal => "eq",
            BinOp::NotEqual => "neql",
            BinOp::Less => "less",
            BinOp::LessEqual => "leseq",
            BinOp::Greater => "more",
            BinOp::GreaterEqual => "moreq",
        };

        write!(f, "{}", s)
    }
}
