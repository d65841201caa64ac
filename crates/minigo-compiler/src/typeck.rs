use std::fmt;

use tracing::debug;

use crate::ast::*;
use crate::symbols::ScopeStack;
use crate::token::Position;
use crate::types::Type;

/// A semantic error. Analysis records these and keeps going.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub message: String,
    pub line: Option<usize>,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "line {line}: {}", self.message),
            None => f.write_str(&self.message),
        }
    }
}

/// Scope-aware type checker. One instance per source unit.
#[derive(Default)]
pub struct Analyzer {
    scopes: ScopeStack<Type>,
    diagnostics: Vec<Diagnostic>,
}

impl Analyzer {
    pub fn new() -> Self { Self::default() }

    /// Returns `true` when no diagnostic was recorded.
    pub fn analyze(&mut self, program: &Program) -> bool {
        self.check_function(&program.entry);
        debug!(diagnostics = self.diagnostics.len(), "semantic analysis finished");
        self.diagnostics.is_empty()
    }

    pub fn diagnostics(&self) -> &[Diagnostic] { &self.diagnostics }

    pub fn into_diagnostics(self) -> Vec<Diagnostic> { self.diagnostics }

    fn error(&mut self, message: impl Into<String>, pos: Position) {
        self.diagnostics.push(Diagnostic { message: message.into(), line: Some(pos.line) });
    }

    fn check_function(&mut self, f: &Function) {
        if f.name != "main" {
            self.error(format!("unsupported function '{}'", f.name), f.pos);
        }
        // the body's statements live directly in the bottom scope
        for s in &f.body.stmts { self.check_stmt(s); }
    }

    fn check_block(&mut self, b: &Block) {
        self.scopes.enter();
        for s in &b.stmts { self.check_stmt(s); }
        self.scopes.exit();
    }

    fn check_stmt(&mut self, s: &Stmt) {
        match s {
            Stmt::VarDecl { name, ty, init, pos } => {
                let init_ty = init.as_ref().map(|e| self.check_expr(e));
                let declared = match ty.resolve() {
                    Some(t) => t,
                    None => {
                        self.error(format!("unknown type '{ty}' for variable '{name}'"), *pos);
                        Type::Unknown
                    }
                };
                if self.scopes.declare(name, declared).is_err() {
                    self.error(format!("variable '{name}' is already declared in this scope"), *pos);
                    return;
                }
                if let Some(found) = init_ty {
                    if !declared.accepts(found) {
                        self.error(
                            format!("cannot initialize '{name}' of type {declared} with a {found} value"),
                            *pos,
                        );
                    }
                }
            }
            Stmt::Assign { name, value, pos } => {
                let found = self.check_expr(value);
                match self.scopes.lookup(name).copied() {
                    None => self.error(format!("undeclared variable '{name}'"), *pos),
                    Some(declared) if !declared.accepts(found) => self.error(
                        format!("cannot assign a {found} value to '{name}' of type {declared}"),
                        *pos,
                    ),
                    Some(_) => {}
                }
            }
            Stmt::If { cond, then_body, else_body, pos } => {
                self.check_condition("if", cond, *pos);
                self.check_block(then_body);
                if let Some(b) = else_body { self.check_block(b); }
            }
            Stmt::For { cond, body, pos } => {
                self.check_condition("for", cond, *pos);
                self.check_block(body);
            }
            Stmt::Block(b) => self.check_block(b),
            Stmt::Expr(e) => {
                self.check_expr(e);
                if !matches!(e, Expr::Call { .. }) {
                    self.error("expression statement has no effect; only print/println calls may stand alone", e.pos());
                }
            }
        }
    }

    fn check_condition(&mut self, construct: &str, cond: &Expr, pos: Position) {
        let t = self.check_expr(cond);
        if !Type::Bool.accepts(t) {
            self.error(format!("'{construct}' condition must be bool, found {t}"), pos);
        }
    }

    /// Reports every violation below `e` and returns its type.
    fn check_expr(&mut self, e: &Expr) -> Type {
        match e {
            Expr::Literal(lit, _) => lit.type_tag(),
            Expr::Ident(name, pos) => match self.scopes.lookup(name) {
                Some(t) => *t,
                None => {
                    self.error(format!("undeclared variable '{name}'"), *pos);
                    Type::Unknown
                }
            },
            Expr::Binary { op, left, right, pos } => {
                let lt = self.check_expr(left);
                let rt = self.check_expr(right);
                if let Err(msg) = op.check_operands(lt, rt) { self.error(msg, *pos); }
                op.result_type()
            }
            Expr::Unary { op, expr, pos } => {
                let t = self.check_expr(expr);
                if let Err(msg) = op.check_operand(t) { self.error(msg, *pos); }
                op.result_type()
            }
            Expr::Call { builtin, args, pos } => {
                for a in args {
                    if self.check_expr(a) == Type::Void {
                        self.error(format!("{} argument produces no value", builtin.name()), a.pos());
                    }
                }
                if args.len() != 1 {
                    self.error(
                        format!("{} expects exactly one argument, found {}", builtin.name(), args.len()),
                        *pos,
                    );
                }
                Type::Void
            }
        }
    }

    /// Type of `e` in the current scopes, without reporting anything.
    pub fn infer_type(&self, e: &Expr) -> Type {
        match e {
            Expr::Literal(lit, _) => lit.type_tag(),
            Expr::Ident(name, _) => self.scopes.lookup(name).copied().unwrap_or(Type::Unknown),
            Expr::Binary { op, .. } => op.result_type(),
            Expr::Unary { op, .. } => op.result_type(),
            Expr::Call { .. } => Type::Void,
        }
    }
}

pub fn typecheck(program: &Program) -> Result<(), Vec<Diagnostic>> {
    let mut analyzer = Analyzer::new();
    if analyzer.analyze(program) { Ok(()) } else { Err(analyzer.into_diagnostics()) }
}
