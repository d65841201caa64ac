use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Position {
    pub index: usize,
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub fn new(index: usize, line: usize, column: usize) -> Self { Self { index, line, column } }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    Ident(String),
    Int(i32),
    Str(String),

    // Keywords
    Var,
    Func,
    Main,
    IntKw,
    BoolKw,
    True,
    False,
    If,
    Else,
    For,
    Print,
    Println,

    // Symbols / Operators
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Assign,
    EqEq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
    AmpAmp,
    PipePipe,
    Not,
    LParen,
    RParen,
    LBrace,
    RBrace,
    Semicolon,
    Comma,
    Eof,
}

impl TokenKind {
    /// Exact-match keyword table; anything else scanned as a word is an identifier.
    pub fn keyword(word: &str) -> Option<TokenKind> {
        let kind = match word {
            "var" => TokenKind::Var,
            "func" => TokenKind::Func,
            "main" => TokenKind::Main,
            "int" => TokenKind::IntKw,
            "bool" => TokenKind::BoolKw,
            "true" => TokenKind::True,
            "false" => TokenKind::False,
            "if" => TokenKind::If,
            "else" => TokenKind::Else,
            "for" => TokenKind::For,
            "print" => TokenKind::Print,
            "println" => TokenKind::Println,
            _ => return None,
        };
        Some(kind)
    }

    pub fn name(&self) -> &'static str {
        use TokenKind::*;
        match self {
            Ident(_) => "identifier",
            Int(_) => "integer",
            Str(_) => "string",
            Var => "var",
            Func => "func",
            Main => "main",
            IntKw => "int",
            BoolKw => "bool",
            True => "true",
            False => "false",
            If => "if",
            Else => "else",
            For => "for",
            Print => "print",
            Println => "println",
            Plus => "+",
            Minus => "-",
            Star => "*",
            Slash => "/",
            Percent => "%",
            Assign => "=",
            EqEq => "==",
            NotEq => "!=",
            Lt => "<",
            Le => "<=",
            Gt => ">",
            Ge => ">=",
            AmpAmp => "&&",
            PipePipe => "||",
            Not => "!",
            LParen => "(",
            RParen => ")",
            LBrace => "{",
            RBrace => "}",
            Semicolon => ";",
            Comma => ",",
            Eof => "end of input",
        }
    }

    /// Source-like rendering of the token, payload included.
    pub fn text(&self) -> String {
        match self {
            TokenKind::Ident(s) => s.clone(),
            TokenKind::Int(v) => v.to_string(),
            TokenKind::Str(s) => format!("{s:?}"),
            other => other.name().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub pos: Position,
}

impl Token {
    pub fn new(kind: TokenKind, pos: Position) -> Self { Self { kind, pos } }

    pub fn line(&self) -> usize { self.pos.line }
}
