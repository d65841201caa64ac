use tracing::debug;

use crate::ast::*;
use crate::error::{CodegenError, CodegenResult};
use crate::ir::*;
use crate::symbols::ScopeStack;
use crate::types::Type;

const MODULE_NAME: &str = "minigo";

pub struct Codegen {
    module: IrModule,
    fun: IrFunction,
    cur: BlockId,
    slots: ScopeStack<IrValue>,
    printf: FnDecl,
    fmt_count: usize,
    str_count: usize,
}

impl Default for Codegen {
    fn default() -> Self { Self::new() }
}

impl Codegen {
    pub fn new() -> Self {
        let fun = IrFunction::new("main", IrType::I32);
        let cur = fun.entry();
        Self {
            module: IrModule::new(MODULE_NAME),
            fun,
            cur,
            slots: ScopeStack::new(),
            printf: FnDecl::printf(),
            fmt_count: 0,
            str_count: 0,
        }
    }

    pub fn with_target_triple(mut self, triple: impl Into<String>) -> Self {
        self.module.target_triple = Some(triple.into());
        self
    }

    pub fn generate(mut self, program: &Program) -> CodegenResult<IrModule> {
        let entry = &program.entry;
        if entry.name != "main" {
            return Err(CodegenError::UnsupportedFunction { name: entry.name.clone() });
        }
        self.module.declare(self.printf.clone());

        for s in &entry.body.stmts { self.gen_stmt(s)?; }
        if !self.fun.block(self.cur).is_terminated() {
            self.terminate(Terminator::Ret(Some(IrValue::const_i32(0))))?;
        }

        self.fun.verify()?;
        debug!(
            blocks = self.fun.blocks.len(),
            globals = self.module.globals.len(),
            "code generation finished"
        );
        self.module.functions.push(self.fun);
        Ok(self.module)
    }

    // ---- builder cursor ----

    fn push(&mut self, instr: IrInstr) { self.fun.block_mut(self.cur).instrs.push(instr); }

    fn terminate(&mut self, term: Terminator) -> CodegenResult<()> {
        let block = self.fun.block_mut(self.cur);
        if block.is_terminated() {
            return Err(CodegenError::AlreadyTerminated { block: block.label.clone() });
        }
        block.terminator = Some(term);
        Ok(())
    }

    fn label(&self, id: BlockId) -> String { self.fun.block(id).label.clone() }

    fn branch(&mut self, target: BlockId) -> CodegenResult<()> {
        let target = self.label(target);
        self.terminate(Terminator::Br { target })
    }

    fn cond_branch(&mut self, cond: IrValue, then_bb: BlockId, else_bb: BlockId) -> CodegenResult<()> {
        let (then_label, else_label) = (self.label(then_bb), self.label(else_bb));
        self.terminate(Terminator::CondBr { cond, then_label, else_label })
    }

    fn arith(&mut self, op: ArithOp, lhs: IrValue, rhs: IrValue) -> IrValue {
        let dst = self.fun.fresh_name(op.mnemonic());
        let value = IrValue::reg(&dst, lhs.ty.clone());
        self.push(IrInstr::Arith { dst, op, lhs, rhs });
        value
    }

    fn icmp(&mut self, pred: IcmpPred, lhs: IrValue, rhs: IrValue) -> IrValue {
        let dst = self.fun.fresh_name("cmp");
        self.push(IrInstr::Icmp { dst: dst.clone(), pred, lhs, rhs });
        IrValue::reg(dst, IrType::I1)
    }

    fn load(&mut self, name: &str, slot: IrValue) -> IrValue {
        let ty = slot.ty.pointee().cloned().unwrap_or(IrType::I32);
        let dst = self.fun.fresh_name(name);
        self.push(IrInstr::Load { dst: dst.clone(), ty: ty.clone(), ptr: slot });
        IrValue::reg(dst, ty)
    }

    /// Adds a NUL-terminated global and returns an `i8*` to its first byte.
    fn c_string(&mut self, kind: &str, text: &str) -> IrValue {
        let counter = if kind == "fmt" { &mut self.fmt_count } else { &mut self.str_count };
        let name = format!(".{kind}.{counter}");
        *counter += 1;
        let global = IrGlobal::c_string(&name, text);
        let array = global.ty();
        self.module.add_global(global);

        let dst = self.fun.fresh_name(kind);
        self.push(IrInstr::Decay { dst: dst.clone(), array, global: name });
        IrValue::reg(dst, IrType::i8_ptr())
    }

    // ---- statements ----

    fn gen_block(&mut self, b: &Block) -> CodegenResult<()> {
        self.slots.enter();
        let res = b.stmts.iter().try_for_each(|s| self.gen_stmt(s));
        self.slots.exit();
        res
    }

    fn gen_stmt(&mut self, s: &Stmt) -> CodegenResult<()> {
        match s {
            Stmt::VarDecl { name, ty, init, .. } => {
                let slot_ty = match ty.resolve() {
                    Some(Type::Int) => IrType::I32,
                    Some(Type::Bool) => IrType::I1,
                    _ => return Err(CodegenError::UnsupportedType { name: ty.to_string() }),
                };
                // the initializer cannot see the variable it initializes
                let value = match init {
                    Some(e) => self.gen_expr(e)?,
                    None if slot_ty == IrType::I1 => IrValue::const_bool(false),
                    None => IrValue::const_i32(0),
                };
                let slot = self.fun.push_alloca(&format!("{name}.addr"), slot_ty);
                self.store(name, value, slot.clone())?;
                self.slots.declare(name, slot).map_err(|_| CodegenError::Redeclared { name: name.clone() })
            }
            Stmt::Assign { name, value, .. } => {
                let slot = self.slots.lookup(name).cloned()
                    .ok_or_else(|| CodegenError::UnknownVariable { name: name.clone() })?;
                let value = self.gen_expr(value)?;
                self.store(name, value, slot)
            }
            Stmt::If { cond, then_body, else_body, .. } => self.gen_if(cond, then_body, else_body.as_ref()),
            Stmt::For { cond, body, .. } => self.gen_for(cond, body),
            Stmt::Block(b) => self.gen_block(b),
            Stmt::Expr(Expr::Call { builtin, args, .. }) => self.gen_print(*builtin, args),
            Stmt::Expr(e) => self.gen_expr(e).map(|_| ()),
        }
    }

    fn store(&mut self, name: &str, value: IrValue, slot: IrValue) -> CodegenResult<()> {
        let expected = slot.ty.pointee().cloned().unwrap_or(IrType::Void);
        if value.ty != expected {
            return Err(CodegenError::StoreType {
                name: name.to_string(),
                expected: expected.to_string(),
                found: value.ty.to_string(),
            });
        }
        self.push(IrInstr::Store { value, ptr: slot });
        Ok(())
    }

    fn gen_if(&mut self, cond: &Expr, then_body: &Block, else_body: Option<&Block>) -> CodegenResult<()> {
        let c = self.gen_expr(cond)?;
        let c = self.to_bool(c, "if")?;
        let then_bb = self.fun.append_block("if.then");
        let else_bb = else_body.map(|_| self.fun.append_block("if.else"));
        let end_bb = self.fun.append_block("if.end");
        self.cond_branch(c, then_bb, else_bb.unwrap_or(end_bb))?;

        self.cur = then_bb;
        self.gen_block(then_body)?;
        if !self.fun.block(self.cur).is_terminated() { self.branch(end_bb)?; }

        if let (Some(bb), Some(body)) = (else_bb, else_body) {
            self.cur = bb;
            self.gen_block(body)?;
            if !self.fun.block(self.cur).is_terminated() { self.branch(end_bb)?; }
        }
        self.cur = end_bb;
        Ok(())
    }

    fn gen_for(&mut self, cond: &Expr, body: &Block) -> CodegenResult<()> {
        let cond_bb = self.fun.append_block("for.cond");
        let body_bb = self.fun.append_block("for.body");
        let end_bb = self.fun.append_block("for.end");
        self.branch(cond_bb)?;

        self.cur = cond_bb;
        let c = self.gen_expr(cond)?;
        let c = self.to_bool(c, "for")?;
        self.cond_branch(c, body_bb, end_bb)?;

        self.cur = body_bb;
        self.gen_block(body)?;
        if !self.fun.block(self.cur).is_terminated() { self.branch(cond_bb)?; }
        self.cur = end_bb;
        Ok(())
    }

    fn gen_print(&mut self, builtin: Builtin, args: &[Expr]) -> CodegenResult<()> {
        let newline = if builtin == Builtin::Println { "\n" } else { "" };
        let arg = match args {
            [arg] => arg,
            _ => {
                return Err(CodegenError::UnsupportedPrint {
                    builtin: builtin.name(),
                    reason: format!("expected one argument, found {}", args.len()),
                })
            }
        };

        let call_args = match arg {
            Expr::Literal(Literal::Str(s), _) => vec![self.c_string("fmt", &format!("{s}{newline}"))],
            other => {
                let value = self.gen_expr(other)?;
                let op = match value.ty {
                    IrType::I32 => CastOp::SExt,
                    IrType::I1 => CastOp::ZExt,
                    ref ty => {
                        return Err(CodegenError::UnsupportedPrint {
                            builtin: builtin.name(),
                            reason: format!("values of type {ty} cannot be printed"),
                        })
                    }
                };
                let dst = self.fun.fresh_name("wide");
                self.push(IrInstr::Cast { dst: dst.clone(), op, value, to: IrType::I64 });
                let fmt = self.c_string("fmt", &format!("%d{newline}"));
                vec![fmt, IrValue::reg(dst, IrType::I64)]
            }
        };
        self.push(IrInstr::Call { dst: None, callee: self.printf.clone(), args: call_args });
        Ok(())
    }

    // ---- expressions ----

    fn gen_expr(&mut self, e: &Expr) -> CodegenResult<IrValue> {
        match e {
            Expr::Literal(Literal::Int(v), _) => Ok(IrValue::const_i32(*v)),
            Expr::Literal(Literal::Bool(b), _) => Ok(IrValue::const_bool(*b)),
            Expr::Literal(Literal::Str(s), _) => Ok(self.c_string("str", s)),
            Expr::Ident(name, _) => {
                let slot = self.slots.lookup(name).cloned()
                    .ok_or_else(|| CodegenError::UnknownVariable { name: name.clone() })?;
                Ok(self.load(name, slot))
            }
            Expr::Unary { op, expr, .. } => {
                let v = self.gen_expr(expr)?;
                match op {
                    UnOp::Neg => {
                        expect_int(op.symbol(), &v)?;
                        Ok(self.arith(ArithOp::Sub, IrValue::const_i32(0), v))
                    }
                    UnOp::Not => {
                        let v = self.to_bool(v, op.symbol())?;
                        Ok(self.icmp(IcmpPred::Eq, v, IrValue::const_bool(false)))
                    }
                }
            }
            Expr::Binary { op, left, right, .. } => self.gen_binary(*op, left, right),
            Expr::Call { builtin, .. } => Err(CodegenError::VoidValue { builtin: builtin.name() }),
        }
    }

    fn gen_binary(&mut self, op: BinOp, left: &Expr, right: &Expr) -> CodegenResult<IrValue> {
        // string operands can only be literals, so their equality is known now
        if let (Expr::Literal(Literal::Str(a), _), Expr::Literal(Literal::Str(b), _)) = (left, right) {
            if op.class() == OpClass::Equality {
                return Ok(IrValue::const_bool((a == b) == (op == BinOp::Eq)));
            }
        }

        let pred = match op {
            BinOp::Eq => IcmpPred::Eq,
            BinOp::Ne => IcmpPred::Ne,
            BinOp::Lt => IcmpPred::Slt,
            BinOp::Le => IcmpPred::Sle,
            BinOp::Gt => IcmpPred::Sgt,
            BinOp::Ge => IcmpPred::Sge,
            BinOp::Add => return self.gen_arith(op, ArithOp::Add, left, right),
            BinOp::Sub => return self.gen_arith(op, ArithOp::Sub, left, right),
            BinOp::Mul => return self.gen_arith(op, ArithOp::Mul, left, right),
            BinOp::Div => return self.gen_arith(op, ArithOp::SDiv, left, right),
            BinOp::Rem => return self.gen_arith(op, ArithOp::SRem, left, right),
            BinOp::And | BinOp::Or => return self.gen_short_circuit(op, left, right),
        };
        let lhs = self.gen_expr(left)?;
        let rhs = self.gen_expr(right)?;
        if op.class() == OpClass::Relational {
            expect_int(op.symbol(), &lhs)?;
            expect_int(op.symbol(), &rhs)?;
        } else if lhs.ty != rhs.ty || !matches!(lhs.ty, IrType::I32 | IrType::I1) {
            return Err(CodegenError::OperandType {
                op: op.symbol(),
                found: format!("{} and {}", lhs.ty, rhs.ty),
            });
        }
        Ok(self.icmp(pred, lhs, rhs))
    }

    fn gen_arith(&mut self, op: BinOp, arith: ArithOp, left: &Expr, right: &Expr) -> CodegenResult<IrValue> {
        let lhs = self.gen_expr(left)?;
        let rhs = self.gen_expr(right)?;
        expect_int(op.symbol(), &lhs)?;
        expect_int(op.symbol(), &rhs)?;
        Ok(self.arith(arith, lhs, rhs))
    }

    /// `a && b` evaluates `b` only when `a` holds; `a || b` only when it does not.
    fn gen_short_circuit(&mut self, op: BinOp, left: &Expr, right: &Expr) -> CodegenResult<IrValue> {
        let (prefix, skip_value) = if op == BinOp::And { ("and", false) } else { ("or", true) };

        let lhs = self.gen_expr(left)?;
        let lhs = self.to_bool(lhs, op.symbol())?;
        let lhs_end = self.label(self.cur);
        let rhs_bb = self.fun.append_block(&format!("{prefix}.rhs"));
        let merge_bb = self.fun.append_block(&format!("{prefix}.merge"));
        if op == BinOp::And {
            self.cond_branch(lhs, rhs_bb, merge_bb)?;
        } else {
            self.cond_branch(lhs, merge_bb, rhs_bb)?;
        }

        self.cur = rhs_bb;
        let rhs = self.gen_expr(right)?;
        let rhs = self.to_bool(rhs, op.symbol())?;
        // nested short-circuits may have moved the cursor past rhs_bb
        let rhs_end = self.label(self.cur);
        self.branch(merge_bb)?;

        self.cur = merge_bb;
        let dst = self.fun.fresh_name(prefix);
        self.push(IrInstr::Phi {
            dst: dst.clone(),
            ty: IrType::I1,
            incoming: vec![(IrValue::const_bool(skip_value), lhs_end), (rhs, rhs_end)],
        });
        Ok(IrValue::reg(dst, IrType::I1))
    }

    fn to_bool(&mut self, v: IrValue, op: &'static str) -> CodegenResult<IrValue> {
        match v.ty.clone() {
            IrType::I1 => Ok(v),
            IrType::I32 => {
                let dst = self.fun.fresh_name("tobool");
                self.push(IrInstr::Icmp { dst: dst.clone(), pred: IcmpPred::Ne, lhs: v, rhs: IrValue::const_i32(0) });
                Ok(IrValue::reg(dst, IrType::I1))
            }
            other => Err(CodegenError::OperandType { op, found: other.to_string() }),
        }
    }
}

fn expect_int(op: &'static str, v: &IrValue) -> CodegenResult<()> {
    if v.ty == IrType::I32 { Ok(()) } else { Err(CodegenError::OperandType { op, found: v.ty.to_string() }) }
}

/// Lowers `program` with a default, target-independent module.
pub fn generate(program: &Program) -> CodegenResult<IrModule> {
    Codegen::new().generate(program)
}
