use tracing::warn;

use crate::error::{LexError, LexErrorKind, LexResult};
use crate::token::{Position, Token, TokenKind};

/// Best-effort scanner. Tokens are produced on demand; illegal input is
/// logged, recorded and skipped, so scanning always reaches `Eof`.
#[derive(Debug, Clone)]
pub struct Lexer {
    input: Vec<char>,
    len: usize,
    idx: usize,
    line: usize,
    col: usize,
    errors: Vec<LexError>,
    finished: bool,
}

impl Lexer {
    pub fn new(source: &str) -> Self {
        let input: Vec<char> = source.chars().collect();
        let len = input.len();
        Self { input, len, idx: 0, line: 1, col: 1, errors: Vec::new(), finished: false }
    }

    /// Rewind to the start of the source and forget previous errors.
    pub fn restart(&mut self) {
        self.idx = 0;
        self.line = 1;
        self.col = 1;
        self.errors.clear();
        self.finished = false;
    }

    pub fn errors(&self) -> &[LexError] { &self.errors }

    fn pos(&self) -> Position { Position { index: self.idx, line: self.line, column: self.col } }

    fn peek(&self) -> Option<char> { self.input.get(self.idx).copied() }

    fn peek_at(&self, offset: usize) -> Option<char> { self.input.get(self.idx + offset).copied() }

    fn bump(&mut self) -> Option<char> {
        if self.idx >= self.len { return None; }
        let ch = self.input[self.idx];
        self.idx += 1;
        if ch == '\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some(ch)
    }

    fn match_next(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.bump();
            true
        } else { false }
    }

    fn skip_ws_and_comments(&mut self) {
        loop {
            match self.peek() {
                Some(' ' | '\t' | '\r' | '\n') => { self.bump(); }
                Some('/') if self.peek_at(1) == Some('/') => {
                    while let Some(c) = self.peek() { if c == '\n' { break; } self.bump(); }
                }
                _ => break,
            }
        }
    }

    fn read_ident_or_kw(&mut self) -> Token {
        let pos = self.pos();
        let mut s = String::new();
        while let Some(ch) = self.peek() {
            if ch.is_ascii_alphanumeric() || ch == '_' { s.push(ch); self.bump(); } else { break; }
        }
        let kind = TokenKind::keyword(&s).unwrap_or(TokenKind::Ident(s));
        Token { kind, pos }
    }

    fn read_number(&mut self) -> Token {
        let pos = self.pos();
        // 32-bit two's-complement wraparound, like the target's native int
        let mut value: i32 = 0;
        while let Some(ch) = self.peek() {
            let Some(d) = ch.to_digit(10) else { break };
            value = value.wrapping_mul(10).wrapping_add(d as i32);
            self.bump();
        }
        Token { kind: TokenKind::Int(value), pos }
    }

    /// Scans a string body. On failure nothing is consumed so the caller can
    /// skip just the opening quote.
    fn read_string(&mut self) -> LexResult<Token> {
        let start = self.pos();
        let mut end = self.idx + 1;
        let mut s = String::new();
        loop {
            match self.input.get(end).copied() {
                Some('"') => break,
                Some('\\') => {
                    match self.input.get(end + 1).copied() {
                        Some('n') => s.push('\n'),
                        Some('t') => s.push('\t'),
                        Some('"') => s.push('"'),
                        Some('\\') => s.push('\\'),
                        Some('\n') | None => {
                            return Err(LexError { kind: LexErrorKind::UnterminatedString, pos: start })
                        }
                        Some(other) => { s.push('\\'); s.push(other); }
                    }
                    end += 2;
                }
                Some('\n') | None => {
                    return Err(LexError { kind: LexErrorKind::UnterminatedString, pos: start })
                }
                Some(ch) => { s.push(ch); end += 1; }
            }
        }
        while self.idx <= end { self.bump(); }
        Ok(Token { kind: TokenKind::Str(s), pos: start })
    }

    fn single(&mut self, kind: TokenKind, pos: Position) -> Token {
        self.bump();
        Token { kind, pos }
    }

    fn pair(&mut self, second: char, both: TokenKind, alone: TokenKind, pos: Position) -> Token {
        self.bump();
        if self.match_next(second) { Token { kind: both, pos } } else { Token { kind: alone, pos } }
    }

    fn report(&mut self, kind: LexErrorKind, pos: Position) {
        let err = LexError { kind, pos };
        warn!(line = pos.line, column = pos.column, "{err}");
        self.errors.push(err);
    }

    /// Next token, recovering from any number of illegal characters first.
    pub fn next_token(&mut self) -> Token {
        loop {
            self.skip_ws_and_comments();
            let pos = self.pos();
            let Some(ch) = self.peek() else { return Token { kind: TokenKind::Eof, pos } };
            let tok = match ch {
                'a'..='z' | 'A'..='Z' | '_' => self.read_ident_or_kw(),
                '0'..='9' => self.read_number(),
                '"' => match self.read_string() {
                    Ok(tok) => tok,
                    Err(e) => {
                        self.report(e.kind, e.pos);
                        self.bump();
                        continue;
                    }
                },
                '(' => self.single(TokenKind::LParen, pos),
                ')' => self.single(TokenKind::RParen, pos),
                '{' => self.single(TokenKind::LBrace, pos),
                '}' => self.single(TokenKind::RBrace, pos),
                ';' => self.single(TokenKind::Semicolon, pos),
                ',' => self.single(TokenKind::Comma, pos),
                '+' => self.single(TokenKind::Plus, pos),
                '-' => self.single(TokenKind::Minus, pos),
                '*' => self.single(TokenKind::Star, pos),
                '/' => self.single(TokenKind::Slash, pos),
                '%' => self.single(TokenKind::Percent, pos),
                '=' => self.pair('=', TokenKind::EqEq, TokenKind::Assign, pos),
                '!' => self.pair('=', TokenKind::NotEq, TokenKind::Not, pos),
                '<' => self.pair('=', TokenKind::Le, TokenKind::Lt, pos),
                '>' => self.pair('=', TokenKind::Ge, TokenKind::Gt, pos),
                '&' if self.peek_at(1) == Some('&') => { self.bump(); self.single(TokenKind::AmpAmp, pos) }
                '|' if self.peek_at(1) == Some('|') => { self.bump(); self.single(TokenKind::PipePipe, pos) }
                _ => {
                    self.report(LexErrorKind::InvalidChar { ch }, pos);
                    self.bump();
                    continue;
                }
            };
            return tok;
        }
    }
}

impl Iterator for Lexer {
    type Item = Token;

    /// Yields every token before `Eof`, then `None` until restarted.
    fn next(&mut self) -> Option<Token> {
        if self.finished { return None; }
        let tok = self.next_token();
        if tok.kind == TokenKind::Eof {
            self.finished = true;
            return None;
        }
        Some(tok)
    }
}

impl std::iter::FusedIterator for Lexer {}
