use crate::token::Position;
use crate::types::{Type, TypeName};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Program {
    pub entry: Function,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Function {
    pub name: String,
    pub body: Block,
    pub pos: Position,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub stmts: Vec<Stmt>,
    pub pos: Position,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stmt {
    VarDecl { name: String, ty: TypeName, init: Option<Expr>, pos: Position },
    Assign { name: String, value: Expr, pos: Position },
    If { cond: Expr, then_body: Block, else_body: Option<Block>, pos: Position },
    For { cond: Expr, body: Block, pos: Position },
    Block(Block),
    Expr(Expr),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    Literal(Literal, Position),
    Ident(String, Position),
    Binary { op: BinOp, left: Box<Expr>, right: Box<Expr>, pos: Position },
    Unary { op: UnOp, expr: Box<Expr>, pos: Position },
    Call { builtin: Builtin, args: Vec<Expr>, pos: Position },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Literal {
    Int(i32),
    Bool(bool),
    Str(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp { Add, Sub, Mul, Div, Rem, Eq, Ne, Lt, Le, Gt, Ge, And, Or }

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnOp { Neg, Not }

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin { Print, Println }

/// Operator families sharing one typing rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpClass { Arithmetic, Relational, Equality, Logical }

impl Stmt {
    pub fn pos(&self) -> Position {
        match self {
            Stmt::VarDecl { pos, .. }
            | Stmt::Assign { pos, .. }
            | Stmt::If { pos, .. }
            | Stmt::For { pos, .. } => *pos,
            Stmt::Block(b) => b.pos,
            Stmt::Expr(e) => e.pos(),
        }
    }
}

impl Expr {
    pub fn pos(&self) -> Position {
        match self {
            Expr::Literal(_, p) | Expr::Ident(_, p) => *p,
            Expr::Binary { pos, .. } | Expr::Unary { pos, .. } | Expr::Call { pos, .. } => *pos,
        }
    }

    pub fn binary(op: BinOp, left: Expr, right: Expr, pos: Position) -> Self {
        Expr::Binary { op, left: Box::new(left), right: Box::new(right), pos }
    }

    pub fn unary(op: UnOp, expr: Expr, pos: Position) -> Self {
        Expr::Unary { op, expr: Box::new(expr), pos }
    }
}

impl Literal {
    pub fn type_tag(&self) -> Type {
        match self {
            Literal::Int(_) => Type::Int,
            Literal::Bool(_) => Type::Bool,
            Literal::Str(_) => Type::Str,
        }
    }
}

impl BinOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Rem => "%",
            BinOp::Eq => "==",
            BinOp::Ne => "!=",
            BinOp::Lt => "<",
            BinOp::Le => "<=",
            BinOp::Gt => ">",
            BinOp::Ge => ">=",
            BinOp::And => "&&",
            BinOp::Or => "||",
        }
    }

    pub fn class(self) -> OpClass {
        match self {
            BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Div | BinOp::Rem => OpClass::Arithmetic,
            BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => OpClass::Relational,
            BinOp::Eq | BinOp::Ne => OpClass::Equality,
            BinOp::And | BinOp::Or => OpClass::Logical,
        }
    }
}

impl UnOp {
    pub fn symbol(self) -> &'static str {
        match self {
            UnOp::Neg => "-",
            UnOp::Not => "!",
        }
    }
}

impl Builtin {
    pub fn name(self) -> &'static str {
        match self {
            Builtin::Print => "print",
            Builtin::Println => "println",
        }
    }
}
