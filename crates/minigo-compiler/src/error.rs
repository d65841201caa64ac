use crate::token::Position;
use crate::typeck::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LexErrorKind {
    #[error("illegal character '{ch}'")]
    InvalidChar { ch: char },
    #[error("unterminated string literal")]
    UnterminatedString,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("lex error at line {}: {kind}", pos.line)]
pub struct LexError {
    pub kind: LexErrorKind,
    pub pos: Position,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseErrorKind {
    #[error("unexpected token '{text}' ({found}), expected {expected}")]
    UnexpectedToken { expected: &'static str, found: &'static str, text: String },
    #[error("unexpected end of input, expected {expected}")]
    UnexpectedEof { expected: &'static str },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("syntax error at line {}: {kind}", pos.line)]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub pos: Position,
}

/// Structural violations found by `IrFunction::verify`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VerifyError {
    #[error("block '{block}' has no terminator")]
    Unterminated { block: String },
    #[error("block '{block}' branches to unknown block '{target}'")]
    UnknownTarget { block: String, target: String },
    #[error("conditional branch in '{block}' has identical successors '{target}'")]
    SameSuccessors { block: String, target: String },
    #[error("entry block '{block}' has predecessors")]
    EntryHasPredecessors { block: String },
    #[error("phi in '{block}' is not at the head of its block")]
    MisplacedPhi { block: String },
    #[error("phi in '{block}' does not match its predecessors")]
    PhiPredecessors { block: String },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodegenError {
    #[error("unknown variable '{name}' at generation time")]
    UnknownVariable { name: String },
    #[error("variable '{name}' declared twice in one scope")]
    Redeclared { name: String },
    #[error("unsupported function '{name}'")]
    UnsupportedFunction { name: String },
    #[error("unsupported type '{name}'")]
    UnsupportedType { name: String },
    #[error("unsupported argument to {builtin}: {reason}")]
    UnsupportedPrint { builtin: &'static str, reason: String },
    #[error("{builtin}(...) does not produce a value")]
    VoidValue { builtin: &'static str },
    #[error("operator '{op}' applied to {found}")]
    OperandType { op: &'static str, found: String },
    #[error("value of type {found} stored into a {expected} slot for '{name}'")]
    StoreType { name: String, expected: String, found: String },
    #[error("block '{block}' is already terminated")]
    AlreadyTerminated { block: String },
    #[error("malformed IR: {0}")]
    Verify(#[from] VerifyError),
}

/// Failure of the whole pipeline, tagged with the stage that stopped it.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CompileError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("{} semantic error(s)", .0.len())]
    Semantic(Vec<Diagnostic>),
    #[error("code generation failed: {0}")]
    Codegen(#[from] CodegenError),
}

pub type LexResult<T> = Result<T, LexError>;
pub type ParseResult<T> = Result<T, ParseError>;
pub type CodegenResult<T> = Result<T, CodegenError>;
