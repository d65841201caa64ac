pub mod token;
pub mod error;
pub mod lexer;
pub mod types;
pub mod ast;
pub mod symbols;
pub mod parser;
pub mod typeck;
pub mod ir;
pub mod codegen;

pub use token::{Token, TokenKind, Position};
pub use error::{CodegenError, CodegenResult, CompileError, LexError, ParseError, ParseResult, VerifyError};
pub use lexer::Lexer;
pub use parser::{parse, Parser};
pub use types::Type;
pub use typeck::{typecheck, Analyzer, Diagnostic};
pub use ir::{IrBlock, IrFunction, IrInstr, IrModule, IrValue, IrValueKind};
pub use codegen::{generate, Codegen};

/// Source text to IR module: parse, analyze, then generate, stopping at the
/// first stage that fails.
pub fn compile(source: &str) -> Result<IrModule, CompileError> {
    let program = parse(source)?;
    typecheck(&program).map_err(CompileError::Semantic)?;
    Ok(generate(&program)?)
}
