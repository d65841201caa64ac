use crate::ast::*;
use crate::error::{LexError, ParseError, ParseErrorKind, ParseResult};
use crate::lexer::Lexer;
use crate::token::{Position, Token, TokenKind};
use crate::types::TypeName;

/// Binding power of every binary operator token, loosest first.
fn binary_op(kind: &TokenKind) -> Option<(BinOp, u8)> {
    let entry = match kind {
        TokenKind::PipePipe => (BinOp::Or, 1),
        TokenKind::AmpAmp => (BinOp::And, 2),
        TokenKind::EqEq => (BinOp::Eq, 3),
        TokenKind::NotEq => (BinOp::Ne, 3),
        TokenKind::Lt => (BinOp::Lt, 4),
        TokenKind::Le => (BinOp::Le, 4),
        TokenKind::Gt => (BinOp::Gt, 4),
        TokenKind::Ge => (BinOp::Ge, 4),
        TokenKind::Plus => (BinOp::Add, 5),
        TokenKind::Minus => (BinOp::Sub, 5),
        TokenKind::Star => (BinOp::Mul, 6),
        TokenKind::Slash => (BinOp::Div, 6),
        TokenKind::Percent => (BinOp::Rem, 6),
        _ => return None,
    };
    Some(entry)
}

pub struct Parser {
    tokens: Vec<Token>,
    idx: usize,
    lex_errors: Vec<LexError>,
}

impl Parser {
    /// Lexes the whole source up front. Lexical errors never stop parsing;
    /// they are logged by the lexer and kept for inspection.
    pub fn from_source(src: &str) -> Self {
        let mut lex = Lexer::new(src);
        let mut tokens = Vec::new();
        loop {
            let tok = lex.next_token();
            let done = tok.kind == TokenKind::Eof;
            tokens.push(tok);
            if done { break; }
        }
        let lex_errors = lex.errors().to_vec();
        Self { tokens, idx: 0, lex_errors }
    }

    pub fn new(tokens: impl IntoIterator<Item = Token>) -> Self {
        let mut tokens: Vec<Token> = tokens.into_iter().collect();
        if tokens.last().map_or(true, |t| t.kind != TokenKind::Eof) {
            let pos = tokens.last().map(|t| t.pos).unwrap_or_default();
            tokens.push(Token::new(TokenKind::Eof, pos));
        }
        Self { tokens, idx: 0, lex_errors: Vec::new() }
    }

    pub fn lex_errors(&self) -> &[LexError] { &self.lex_errors }

    pub fn parse_program(&mut self) -> ParseResult<Program> {
        let pos = self.expect(TokenKind::Func)?.pos;
        self.expect(TokenKind::Main)?;
        self.expect(TokenKind::LParen)?;
        self.expect(TokenKind::RParen)?;
        let body = self.parse_block()?;
        self.expect(TokenKind::Eof)?;
        Ok(Program { entry: Function { name: "main".to_string(), body, pos } })
    }

    fn cur(&self) -> &Token { &self.tokens[self.idx] }
    fn is(&self, kind: TokenKind) -> bool { self.cur().kind == kind }

    fn peek_kind(&self, offset: usize) -> Option<&TokenKind> { self.tokens.get(self.idx + offset).map(|t| &t.kind) }

    fn bump(&mut self) { if self.idx < self.tokens.len() - 1 { self.idx += 1; } }

    fn skip_separators(&mut self) { while self.is(TokenKind::Semicolon) { self.bump(); } }

    fn unexpected(&self, expected: &'static str) -> ParseError {
        let tok = self.cur();
        let kind = match &tok.kind {
            TokenKind::Eof => ParseErrorKind::UnexpectedEof { expected },
            other => ParseErrorKind::UnexpectedToken { expected, found: other.name(), text: other.text() },
        };
        ParseError { kind, pos: tok.pos }
    }

    fn expect(&mut self, expected: TokenKind) -> ParseResult<Token> {
        if self.cur().kind == expected { let t = self.cur().clone(); self.bump(); Ok(t) } else {
            Err(self.unexpected(expected.name()))
        }
    }

    fn expect_ident(&mut self) -> ParseResult<(String, Position)> {
        match &self.cur().kind {
            TokenKind::Ident(name) => {
                let found = (name.clone(), self.cur().pos);
                self.bump();
                Ok(found)
            }
            _ => Err(self.unexpected("identifier")),
        }
    }

    fn parse_block(&mut self) -> ParseResult<Block> {
        let pos = self.expect(TokenKind::LBrace)?.pos;
        let mut stmts = Vec::new();
        loop {
            self.skip_separators();
            match self.cur().kind {
                TokenKind::RBrace => { self.bump(); break; }
                TokenKind::Eof => return Err(self.unexpected("}")),
                _ => stmts.push(self.parse_stmt()?),
            }
        }
        Ok(Block { stmts, pos })
    }

    fn parse_stmt(&mut self) -> ParseResult<Stmt> {
        match &self.cur().kind {
            TokenKind::Var => self.parse_var_decl(),
            TokenKind::If => self.parse_if_stmt(),
            TokenKind::For => self.parse_for_stmt(),
            TokenKind::LBrace => Ok(Stmt::Block(self.parse_block()?)),
            TokenKind::Ident(_) if self.peek_kind(1) == Some(&TokenKind::Assign) => self.parse_assign(),
            _ => Ok(Stmt::Expr(self.parse_expr()?)),
        }
    }

    fn parse_var_decl(&mut self) -> ParseResult<Stmt> {
        let pos = self.cur().pos; self.bump();
        let (name, _) = self.expect_ident()?;
        let ty = self.parse_type()?;
        let init = if self.is(TokenKind::Assign) { self.bump(); Some(self.parse_expr()?) } else { None };
        Ok(Stmt::VarDecl { name, ty, init, pos })
    }

    fn parse_type(&mut self) -> ParseResult<TypeName> {
        let ty = match &self.cur().kind {
            TokenKind::IntKw => TypeName::Int,
            TokenKind::BoolKw => TypeName::Bool,
            TokenKind::Ident(name) => TypeName::Named(name.clone()),
            _ => return Err(self.unexpected("type")),
        };
        self.bump();
        Ok(ty)
    }

    fn parse_assign(&mut self) -> ParseResult<Stmt> {
        let (name, pos) = self.expect_ident()?;
        self.expect(TokenKind::Assign)?;
        let value = self.parse_expr()?;
        Ok(Stmt::Assign { name, value, pos })
    }

    fn parse_if_stmt(&mut self) -> ParseResult<Stmt> {
        let pos = self.cur().pos; self.bump();
        let cond = self.parse_expr()?;
        let then_body = self.parse_block()?;
        // `else if` is not chained; a nested `if` must sit inside an else block
        let else_body = if self.is(TokenKind::Else) { self.bump(); Some(self.parse_block()?) } else { None };
        Ok(Stmt::If { cond, then_body, else_body, pos })
    }

    fn parse_for_stmt(&mut self) -> ParseResult<Stmt> {
        let pos = self.cur().pos; self.bump();
        let cond = self.parse_expr()?;
        let body = self.parse_block()?;
        Ok(Stmt::For { cond, body, pos })
    }

    pub fn parse_expr(&mut self) -> ParseResult<Expr> { self.parse_binary(1) }

    /// Precedence climbing; `prec + 1` on the right makes every level left-associative.
    fn parse_binary(&mut self, min_prec: u8) -> ParseResult<Expr> {
        let mut left = self.parse_unary()?;
        while let Some((op, prec)) = binary_op(&self.cur().kind) {
            if prec < min_prec { break; }
            let pos = self.cur().pos;
            self.bump();
            let right = self.parse_binary(prec + 1)?;
            left = Expr::binary(op, left, right, pos);
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> ParseResult<Expr> {
        let op = match self.cur().kind {
            TokenKind::Not => UnOp::Not,
            TokenKind::Minus => UnOp::Neg,
            _ => return self.parse_primary(),
        };
        let pos = self.cur().pos;
        self.bump();
        let operand = self.parse_unary()?;
        Ok(Expr::unary(op, operand, pos))
    }

    fn parse_primary(&mut self) -> ParseResult<Expr> {
        let pos = self.cur().pos;
        let expr = match &self.cur().kind {
            TokenKind::Int(v) => Expr::Literal(Literal::Int(*v), pos),
            TokenKind::Str(s) => Expr::Literal(Literal::Str(s.clone()), pos),
            TokenKind::True => Expr::Literal(Literal::Bool(true), pos),
            TokenKind::False => Expr::Literal(Literal::Bool(false), pos),
            TokenKind::Ident(name) => Expr::Ident(name.clone(), pos),
            TokenKind::LParen => {
                self.bump();
                let inner = self.parse_expr()?;
                self.expect(TokenKind::RParen)?;
                return Ok(inner);
            }
            TokenKind::Print => return self.parse_call(Builtin::Print),
            TokenKind::Println => return self.parse_call(Builtin::Println),
            _ => return Err(self.unexpected("expression")),
        };
        self.bump();
        Ok(expr)
    }

    fn parse_call(&mut self, builtin: Builtin) -> ParseResult<Expr> {
        let pos = self.cur().pos; self.bump();
        self.expect(TokenKind::LParen)?;
        let mut args = Vec::new();
        if !self.is(TokenKind::RParen) {
            loop {
                args.push(self.parse_expr()?);
                if !self.is(TokenKind::Comma) { break; }
                self.bump();
            }
        }
        self.expect(TokenKind::RParen)?;
        Ok(Expr::Call { builtin, args, pos })
    }
}

/// Lex and parse `src` in one go.
pub fn parse(src: &str) -> ParseResult<Program> {
    Parser::from_source(src).parse_program()
}
