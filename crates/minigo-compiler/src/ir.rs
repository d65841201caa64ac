//! Basic-block IR, printed as LLVM assembly.

use std::collections::{HashMap, HashSet};
use std::fmt::{self, Formatter};

use crate::error::VerifyError;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IrType {
    Void,
    I1,
    I8,
    I32,
    I64,
    Ptr(Box<IrType>),
    Array(Box<IrType>, usize),
}

impl IrType {
    pub fn ptr_to(self) -> IrType { IrType::Ptr(Box::new(self)) }

    pub fn i8_ptr() -> IrType { IrType::I8.ptr_to() }

    pub fn pointee(&self) -> Option<&IrType> {
        match self {
            IrType::Ptr(inner) => Some(inner),
            _ => None,
        }
    }
}

impl fmt::Display for IrType {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            IrType::Void => write!(f, "void"),
            IrType::I1 => write!(f, "i1"),
            IrType::I8 => write!(f, "i8"),
            IrType::I32 => write!(f, "i32"),
            IrType::I64 => write!(f, "i64"),
            IrType::Ptr(inner) => write!(f, "{inner}*"),
            IrType::Array(elem, len) => write!(f, "[{len} x {elem}]"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IrValueKind {
    Const(i64),
    Reg(String),
    Global(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IrValue {
    pub ty: IrType,
    pub kind: IrValueKind,
}

impl IrValue {
    pub fn const_i32(v: i32) -> Self { Self { ty: IrType::I32, kind: IrValueKind::Const(v as i64) } }

    pub fn const_bool(b: bool) -> Self { Self { ty: IrType::I1, kind: IrValueKind::Const(b as i64) } }

    pub fn reg(name: impl Into<String>, ty: IrType) -> Self { Self { ty, kind: IrValueKind::Reg(name.into()) } }

    pub fn global(name: impl Into<String>, ty: IrType) -> Self { Self { ty, kind: IrValueKind::Global(name.into()) } }

    /// The value without its type, as it appears in operand position.
    pub fn operand(&self) -> String {
        match (&self.kind, &self.ty) {
            (IrValueKind::Const(v), IrType::I1) => if *v != 0 { "true".into() } else { "false".into() },
            (IrValueKind::Const(v), _) => v.to_string(),
            (IrValueKind::Reg(name), _) => format!("%{name}"),
            (IrValueKind::Global(name), _) => format!("@{name}"),
        }
    }
}

impl fmt::Display for IrValue {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{} {}", self.ty, self.operand())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp { Add, Sub, Mul, SDiv, SRem }

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IcmpPred { Eq, Ne, Slt, Sle, Sgt, Sge }

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CastOp { ZExt, SExt }

impl ArithOp {
    pub fn mnemonic(self) -> &'static str {
        match self {
            ArithOp::Add => "add",
            ArithOp::Sub => "sub",
            ArithOp::Mul => "mul",
            ArithOp::SDiv => "sdiv",
            ArithOp::SRem => "srem",
        }
    }
}

impl IcmpPred {
    pub fn mnemonic(self) -> &'static str {
        match self {
            IcmpPred::Eq => "eq",
            IcmpPred::Ne => "ne",
            IcmpPred::Slt => "slt",
            IcmpPred::Sle => "sle",
            IcmpPred::Sgt => "sgt",
            IcmpPred::Sge => "sge",
        }
    }
}

impl CastOp {
    pub fn mnemonic(self) -> &'static str {
        match self {
            CastOp::ZExt => "zext",
            CastOp::SExt => "sext",
        }
    }
}

/// An external function, e.g. `declare i32 @printf(i8*, ...)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FnDecl {
    pub name: String,
    pub ret: IrType,
    pub params: Vec<IrType>,
    pub variadic: bool,
}

impl FnDecl {
    pub fn printf() -> Self {
        Self { name: "printf".into(), ret: IrType::I32, params: vec![IrType::i8_ptr()], variadic: true }
    }

    fn param_list(&self) -> String {
        let mut parts: Vec<String> = self.params.iter().map(|p| p.to_string()).collect();
        if self.variadic { parts.push("...".into()); }
        parts.join(", ")
    }
}

impl fmt::Display for FnDecl {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "declare {} @{}({})", self.ret, self.name, self.param_list())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IrInstr {
    Alloca { dst: String, ty: IrType },
    Load { dst: String, ty: IrType, ptr: IrValue },
    Store { value: IrValue, ptr: IrValue },
    Arith { dst: String, op: ArithOp, lhs: IrValue, rhs: IrValue },
    Icmp { dst: String, pred: IcmpPred, lhs: IrValue, rhs: IrValue },
    Cast { dst: String, op: CastOp, value: IrValue, to: IrType },
    Phi { dst: String, ty: IrType, incoming: Vec<(IrValue, String)> },
    /// Pointer to the first byte of a global byte array.
    Decay { dst: String, array: IrType, global: String },
    Call { dst: Option<String>, callee: FnDecl, args: Vec<IrValue> },
}

impl IrInstr {
    /// The SSA value defined by this instruction, if any.
    pub fn result(&self) -> Option<IrValue> {
        match self {
            IrInstr::Alloca { dst, ty } => Some(IrValue::reg(dst, ty.clone().ptr_to())),
            IrInstr::Load { dst, ty, .. } | IrInstr::Phi { dst, ty, .. } => Some(IrValue::reg(dst, ty.clone())),
            IrInstr::Arith { dst, lhs, .. } => Some(IrValue::reg(dst, lhs.ty.clone())),
            IrInstr::Icmp { dst, .. } => Some(IrValue::reg(dst, IrType::I1)),
            IrInstr::Cast { dst, to, .. } => Some(IrValue::reg(dst, to.clone())),
            IrInstr::Decay { dst, .. } => Some(IrValue::reg(dst, IrType::i8_ptr())),
            IrInstr::Call { dst, callee, .. } => dst.as_ref().map(|d| IrValue::reg(d, callee.ret.clone())),
            IrInstr::Store { .. } => None,
        }
    }

    pub fn is_phi(&self) -> bool { matches!(self, IrInstr::Phi { .. }) }
}

impl fmt::Display for IrInstr {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            IrInstr::Alloca { dst, ty } => write!(f, "%{dst} = alloca {ty}"),
            IrInstr::Load { dst, ty, ptr } => write!(f, "%{dst} = load {ty}, {ptr}"),
            IrInstr::Store { value, ptr } => write!(f, "store {value}, {ptr}"),
            IrInstr::Arith { dst, op, lhs, rhs } => {
                write!(f, "%{dst} = {} {lhs}, {}", op.mnemonic(), rhs.operand())
            }
            IrInstr::Icmp { dst, pred, lhs, rhs } => {
                write!(f, "%{dst} = icmp {} {lhs}, {}", pred.mnemonic(), rhs.operand())
            }
            IrInstr::Cast { dst, op, value, to } => write!(f, "%{dst} = {} {value} to {to}", op.mnemonic()),
            IrInstr::Phi { dst, ty, incoming } => {
                let arms: Vec<String> =
                    incoming.iter().map(|(v, label)| format!("[ {}, %{label} ]", v.operand())).collect();
                write!(f, "%{dst} = phi {ty} {}", arms.join(", "))
            }
            IrInstr::Decay { dst, array, global } => {
                write!(f, "%{dst} = getelementptr inbounds {array}, {array}* @{global}, i64 0, i64 0")
            }
            IrInstr::Call { dst, callee, args } => {
                if let Some(dst) = dst { write!(f, "%{dst} = ")?; }
                write!(f, "call {} ", callee.ret)?;
                if callee.variadic { write!(f, "({}) ", callee.param_list())?; }
                let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
                write!(f, "@{}({})", callee.name, args.join(", "))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Terminator {
    Br { target: String },
    CondBr { cond: IrValue, then_label: String, else_label: String },
    Ret(Option<IrValue>),
}

impl Terminator {
    pub fn successors(&self) -> Vec<&str> {
        match self {
            Terminator::Br { target } => vec![target],
            Terminator::CondBr { then_label, else_label, .. } => vec![then_label, else_label],
            Terminator::Ret(_) => vec![],
        }
    }
}

impl fmt::Display for Terminator {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Terminator::Br { target } => write!(f, "br label %{target}"),
            Terminator::CondBr { cond, then_label, else_label } => {
                write!(f, "br {cond}, label %{then_label}, label %{else_label}")
            }
            Terminator::Ret(Some(v)) => write!(f, "ret {v}"),
            Terminator::Ret(None) => write!(f, "ret void"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockId(pub usize);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IrBlock {
    pub label: String,
    pub instrs: Vec<IrInstr>,
    pub terminator: Option<Terminator>,
}

impl IrBlock {
    fn new(label: String) -> Self { Self { label, instrs: vec![], terminator: None } }

    pub fn is_terminated(&self) -> bool { self.terminator.is_some() }
}

impl fmt::Display for IrBlock {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        writeln!(f, "{}:", self.label)?;
        self.instrs.iter().try_for_each(|i| writeln!(f, "  {i}"))?;
        if let Some(term) = &self.terminator { writeln!(f, "  {term}")?; }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IrFunction {
    pub name: String,
    pub ret: IrType,
    pub blocks: Vec<IrBlock>,
    allocas: usize,
    used_names: HashMap<String, usize>,
}

impl IrFunction {
    pub fn new(name: impl Into<String>, ret: IrType) -> Self {
        let mut fun = Self { name: name.into(), ret, blocks: vec![], allocas: 0, used_names: HashMap::new() };
        fun.append_block("entry");
        fun
    }

    pub fn entry(&self) -> BlockId { BlockId(0) }

    /// A local name (value or label) not used before in this function.
    pub fn fresh_name(&mut self, base: &str) -> String {
        let count = self.used_names.entry(base.to_string()).or_insert(0);
        let name = if *count == 0 { base.to_string() } else { format!("{base}.{count}") };
        *count += 1;
        name
    }

    pub fn append_block(&mut self, base: &str) -> BlockId {
        let label = self.fresh_name(base);
        self.blocks.push(IrBlock::new(label));
        BlockId(self.blocks.len() - 1)
    }

    pub fn block(&self, id: BlockId) -> &IrBlock { &self.blocks[id.0] }

    pub fn block_mut(&mut self, id: BlockId) -> &mut IrBlock { &mut self.blocks[id.0] }

    pub fn block_by_label(&self, label: &str) -> Option<&IrBlock> { self.blocks.iter().find(|b| b.label == label) }

    /// Stack slots all live at the head of the entry block, whatever block
    /// declared them.
    pub fn push_alloca(&mut self, name_base: &str, ty: IrType) -> IrValue {
        let dst = self.fresh_name(name_base);
        let slot = IrValue::reg(&dst, ty.clone().ptr_to());
        self.blocks[0].instrs.insert(self.allocas, IrInstr::Alloca { dst, ty });
        self.allocas += 1;
        slot
    }

    pub fn predecessors(&self) -> HashMap<&str, Vec<&str>> {
        let mut preds: HashMap<&str, Vec<&str>> = self.blocks.iter().map(|b| (b.label.as_str(), vec![])).collect();
        for b in &self.blocks {
            for succ in b.terminator.iter().flat_map(|t| t.successors()) {
                preds.entry(succ).or_default().push(&b.label);
            }
        }
        preds
    }

    pub fn verify(&self) -> Result<(), VerifyError> {
        let labels: HashSet<&str> = self.blocks.iter().map(|b| b.label.as_str()).collect();
        for b in &self.blocks {
            let term = b.terminator.as_ref().ok_or_else(|| VerifyError::Unterminated { block: b.label.clone() })?;
            for target in term.successors() {
                if !labels.contains(target) {
                    return Err(VerifyError::UnknownTarget { block: b.label.clone(), target: target.into() });
                }
            }
            if let Terminator::CondBr { then_label, else_label, .. } = term {
                if then_label == else_label {
                    return Err(VerifyError::SameSuccessors { block: b.label.clone(), target: then_label.clone() });
                }
            }
        }

        let preds = self.predecessors();
        if let Some(entry) = self.blocks.first() {
            if preds.get(entry.label.as_str()).is_some_and(|p| !p.is_empty()) {
                return Err(VerifyError::EntryHasPredecessors { block: entry.label.clone() });
            }
        }
        for b in &self.blocks {
            let head = b.instrs.iter().take_while(|i| i.is_phi()).count();
            if b.instrs[head..].iter().any(IrInstr::is_phi) {
                return Err(VerifyError::MisplacedPhi { block: b.label.clone() });
            }
            let mut expected: Vec<&str> = preds.get(b.label.as_str()).cloned().unwrap_or_default();
            expected.sort_unstable();
            for phi in &b.instrs[..head] {
                let IrInstr::Phi { incoming, .. } = phi else { continue };
                let mut got: Vec<&str> = incoming.iter().map(|(_, l)| l.as_str()).collect();
                got.sort_unstable();
                if got != expected {
                    return Err(VerifyError::PhiPredecessors { block: b.label.clone() });
                }
            }
        }
        Ok(())
    }
}

impl fmt::Display for IrFunction {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        writeln!(f, "define {} @{}() {{", self.ret, self.name)?;
        for (i, b) in self.blocks.iter().enumerate() {
            if i > 0 { writeln!(f)?; }
            write!(f, "{b}")?;
        }
        write!(f, "}}")
    }
}

/// A private, read-only, NUL-terminated byte string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IrGlobal {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl IrGlobal {
    pub fn c_string(name: impl Into<String>, text: &str) -> Self {
        let mut bytes = text.as_bytes().to_vec();
        bytes.push(0);
        Self { name: name.into(), bytes }
    }

    pub fn ty(&self) -> IrType { IrType::Array(Box::new(IrType::I8), self.bytes.len()) }

    /// Contents without the trailing NUL.
    pub fn text(&self) -> String {
        let end = self.bytes.len().saturating_sub(1);
        String::from_utf8_lossy(&self.bytes[..end]).into_owned()
    }
}

impl fmt::Display for IrGlobal {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "@{} = private unnamed_addr constant {} c\"{}\"", self.name, self.ty(), escape_bytes(&self.bytes))
    }
}

fn escape_bytes(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|&b| match b {
            b'"' | b'\\' => format!("\\{b:02X}"),
            b' '..=b'~' => (b as char).to_string(),
            _ => format!("\\{b:02X}"),
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IrModule {
    pub name: String,
    pub target_triple: Option<String>,
    pub globals: Vec<IrGlobal>,
    pub decls: Vec<FnDecl>,
    pub functions: Vec<IrFunction>,
}

impl IrModule {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), target_triple: None, globals: vec![], decls: vec![], functions: vec![] }
    }

    pub fn add_global(&mut self, global: IrGlobal) { self.globals.push(global); }

    pub fn global(&self, name: &str) -> Option<&IrGlobal> { self.globals.iter().find(|g| g.name == name) }

    pub fn declare(&mut self, decl: FnDecl) {
        if !self.decls.iter().any(|d| d.name == decl.name) { self.decls.push(decl); }
    }

    pub fn function(&self, name: &str) -> Option<&IrFunction> { self.functions.iter().find(|f| f.name == name) }

    pub fn verify(&self) -> Result<(), VerifyError> { self.functions.iter().try_for_each(IrFunction::verify) }
}

impl fmt::Display for IrModule {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        writeln!(f, "; ModuleID = '{}'", self.name)?;
        writeln!(f, "source_filename = \"{}\"", self.name)?;
        if let Some(triple) = &self.target_triple { writeln!(f, "target triple = \"{triple}\"")?; }
        if !self.globals.is_empty() {
            writeln!(f)?;
            self.globals.iter().try_for_each(|g| writeln!(f, "{g}"))?;
        }
        if !self.decls.is_empty() {
            writeln!(f)?;
            self.decls.iter().try_for_each(|d| writeln!(f, "{d}"))?;
        }
        for fun in &self.functions {
            writeln!(f)?;
            writeln!(f, "{fun}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn c_strings_escape_quotes_and_control_bytes() {
        let g = IrGlobal::c_string(".fmt.0", "say \"hi\"\n");
        assert_eq!(g.to_string(), r#"@.fmt.0 = private unnamed_addr constant [11 x i8] c"say \22hi\22\0A\00""#);
        assert_eq!(g.text(), "say \"hi\"\n");
    }

    #[test]
    fn allocas_stay_ahead_of_other_entry_instructions() {
        let mut f = IrFunction::new("main", IrType::I32);
        let a = f.push_alloca("a.addr", IrType::I32);
        f.block_mut(BlockId(0)).instrs.push(IrInstr::Store { value: IrValue::const_i32(1), ptr: a });
        f.push_alloca("b.addr", IrType::I1);
        assert!(matches!(f.blocks[0].instrs[1], IrInstr::Alloca { .. }));
        assert!(matches!(f.blocks[0].instrs[2], IrInstr::Store { .. }));
    }

    #[test]
    fn verifier_rejects_open_blocks_and_degenerate_branches() {
        let mut f = IrFunction::new("main", IrType::I32);
        assert_eq!(f.verify(), Err(VerifyError::Unterminated { block: "entry".into() }));

        let next = f.append_block("next");
        f.block_mut(BlockId(0)).terminator = Some(Terminator::CondBr {
            cond: IrValue::const_bool(true),
            then_label: "next".into(),
            else_label: "next".into(),
        });
        f.block_mut(next).terminator = Some(Terminator::Ret(Some(IrValue::const_i32(0))));
        assert!(matches!(f.verify(), Err(VerifyError::SameSuccessors { .. })));
    }

    #[test]
    fn fresh_names_never_repeat() {
        let mut f = IrFunction::new("main", IrType::I32);
        assert_eq!(f.fresh_name("t"), "t");
        assert_eq!(f.fresh_name("t"), "t.1");
        assert_eq!(f.fresh_name("entry"), "entry.1");
    }
}
