//! A small interpreter for generated modules, so tests can observe what a
//! program prints without going through LLVM.
#![allow(dead_code)]

use std::collections::HashMap;

use minigo_compiler::ir::*;
use minigo_compiler::{compile, IrModule};

const STEP_LIMIT: usize = 1_000_000;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Val {
    Int(i64),
    Slot(usize),
    /// Global index and byte offset.
    Bytes(usize, usize),
}

struct Machine<'m> {
    module: &'m IrModule,
    regs: HashMap<String, Val>,
    memory: Vec<i64>,
    out: String,
}

impl<'m> Machine<'m> {
    fn eval(&self, v: &IrValue) -> Result<Val, String> {
        match &v.kind {
            IrValueKind::Const(c) => Ok(Val::Int(*c)),
            IrValueKind::Reg(name) => self.regs.get(name).copied().ok_or_else(|| format!("use of undefined %{name}")),
            IrValueKind::Global(name) => self
                .module
                .globals
                .iter()
                .position(|g| &g.name == name)
                .map(|i| Val::Bytes(i, 0))
                .ok_or_else(|| format!("unknown global @{name}")),
        }
    }

    fn int(&self, v: &IrValue) -> Result<i64, String> {
        match self.eval(v)? {
            Val::Int(i) => Ok(i),
            other => Err(format!("expected an integer, found {other:?}")),
        }
    }

    fn exec(&mut self, instr: &IrInstr) -> Result<(), String> {
        match instr {
            IrInstr::Alloca { dst, .. } => {
                self.memory.push(0);
                self.regs.insert(dst.clone(), Val::Slot(self.memory.len() - 1));
            }
            IrInstr::Load { dst, ptr, .. } => {
                let Val::Slot(s) = self.eval(ptr)? else { return Err("load from non-slot".into()) };
                self.regs.insert(dst.clone(), Val::Int(self.memory[s]));
            }
            IrInstr::Store { value, ptr } => {
                let Val::Slot(s) = self.eval(ptr)? else { return Err("store to non-slot".into()) };
                self.memory[s] = self.int(value)?;
            }
            IrInstr::Arith { dst, op, lhs, rhs } => {
                let (a, b) = (self.int(lhs)? as i32, self.int(rhs)? as i32);
                let r = match op {
                    ArithOp::Add => a.wrapping_add(b),
                    ArithOp::Sub => a.wrapping_sub(b),
                    ArithOp::Mul => a.wrapping_mul(b),
                    ArithOp::SDiv | ArithOp::SRem if b == 0 => return Err("division by zero".into()),
                    ArithOp::SDiv => a.wrapping_div(b),
                    ArithOp::SRem => a.wrapping_rem(b),
                };
                self.regs.insert(dst.clone(), Val::Int(r as i64));
            }
            IrInstr::Icmp { dst, pred, lhs, rhs } => {
                let (a, b) = (self.int(lhs)?, self.int(rhs)?);
                let r = match pred {
                    IcmpPred::Eq => a == b,
                    IcmpPred::Ne => a != b,
                    IcmpPred::Slt => a < b,
                    IcmpPred::Sle => a <= b,
                    IcmpPred::Sgt => a > b,
                    IcmpPred::Sge => a >= b,
                };
                self.regs.insert(dst.clone(), Val::Int(r as i64));
            }
            // i32 values are kept sign-extended and i1 values as 0/1, so
            // both widenings are the identity here
            IrInstr::Cast { dst, value, .. } => {
                let v = self.int(value)?;
                self.regs.insert(dst.clone(), Val::Int(v));
            }
            IrInstr::Decay { dst, global, .. } => {
                let v = self.eval(&IrValue::global(global, IrType::i8_ptr()))?;
                self.regs.insert(dst.clone(), v);
            }
            IrInstr::Call { callee, args, dst } => {
                if callee.name != "printf" { return Err(format!("call to unknown @{}", callee.name)); }
                let Some((fmt, rest)) = args.split_first() else { return Err("printf without format".into()) };
                let Val::Bytes(g, off) = self.eval(fmt)? else { return Err("format is not a string".into()) };
                let text = self.module.globals[g].text();
                let values = rest.iter().map(|a| self.int(a)).collect::<Result<Vec<_>, _>>()?;
                let printed = printf(&text[off..], &values)?;
                self.out.push_str(&printed);
                if let Some(d) = dst { self.regs.insert(d.clone(), Val::Int(printed.len() as i64)); }
            }
            IrInstr::Phi { .. } => return Err("phi outside block head".into()),
        }
        Ok(())
    }
}

fn printf(fmt: &str, values: &[i64]) -> Result<String, String> {
    let mut out = String::new();
    let mut args = values.iter();
    let mut chars = fmt.chars();
    while let Some(c) = chars.next() {
        if c != '%' { out.push(c); continue; }
        match chars.next() {
            Some('d') => {
                let v = args.next().ok_or("missing printf argument")?;
                out.push_str(&(*v as i32).to_string());
            }
            Some('%') => out.push('%'),
            other => return Err(format!("unsupported conversion {other:?}")),
        }
    }
    Ok(out)
}

/// Runs `@main` and returns everything it printed, or why it stopped.
pub fn run(module: &IrModule) -> Result<String, String> {
    let main = module.function("main").ok_or("no @main")?;
    let mut m = Machine { module, regs: HashMap::new(), memory: vec![], out: String::new() };
    let mut block = main.blocks.first().ok_or("empty function")?;
    let mut prev: Option<&str> = None;

    for _ in 0..STEP_LIMIT {
        let mut incoming = vec![];
        for instr in block.instrs.iter().take_while(|i| i.is_phi()) {
            let IrInstr::Phi { dst, incoming: arms, .. } = instr else { unreachable!() };
            let from = prev.ok_or("phi in a block entered without predecessor")?;
            let (v, _) = arms.iter().find(|(_, l)| l == from).ok_or(format!("phi %{dst} has no arm for %{from}"))?;
            incoming.push((dst.clone(), m.eval(v)?));
        }
        m.regs.extend(incoming);
        for instr in block.instrs.iter().skip_while(|i| i.is_phi()) { m.exec(instr)?; }

        let next = match block.terminator.as_ref().ok_or(format!("block {} is open", block.label))? {
            Terminator::Ret(_) => return Ok(m.out),
            Terminator::Br { target } => target,
            Terminator::CondBr { cond, then_label, else_label } => {
                if m.int(cond)? != 0 { then_label } else { else_label }
            }
        };
        prev = Some(block.label.as_str());
        block = main.block_by_label(next).ok_or(format!("no block {next}"))?;
    }
    Err("step limit exceeded".into())
}

pub fn compile_ok(src: &str) -> IrModule {
    match compile(src) {
        Ok(m) => m,
        Err(e) => panic!("compile failed: {e}\n{e:?}"),
    }
}

/// Compile and run `src`, returning its output.
pub fn output_of(src: &str) -> String {
    let module = compile_ok(src);
    run(&module).unwrap_or_else(|e| panic!("run failed: {e}\n{module}"))
}

/// Wraps statements in `func main() { ... }`.
pub fn program(body: &str) -> String { format!("func main() {{\n{body}\n}}\n") }
