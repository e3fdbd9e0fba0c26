//! Instructions and their operands.
//!
//! Grounded on `cranelift-codegen::ir::instructions::InstructionData`'s
//! shape: one enum, one variant per instruction *format*, each variant
//! holding its operands as typed fields rather than an untyped operand
//! list. We drop `cranelift-codegen`'s `ValueListPool` indirection (it
//! exists to keep `InstructionData` a fixed, small size across variants
//! with variable-length operand lists shared across a whole function;
//! our functions are small instrumentation snippets, not compiled
//! output, so a plain `Vec` per variant is the right scale — noted in
//! `DESIGN.md`).

use crate::entities::{Block, Const, Value};
use crate::types::Type;
use smallvec::SmallVec;

/// An operand: either a previously-computed SSA value or a module
/// constant. Every field of this type that appears in an
/// [`InstructionData`] variant is a "use" — an addressable slot that
/// [`InstructionData::operands_mut`] can retarget.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Operand {
    /// A value defined earlier in the function (by another instruction,
    /// or a block/function parameter).
    Value(Value),
    /// A reference into the module's constant pool.
    Const(Const),
}

impl From<Value> for Operand {
    fn from(v: Value) -> Self {
        Operand::Value(v)
    }
}

impl From<Const> for Operand {
    fn from(c: Const) -> Self {
        Operand::Const(c)
    }
}

/// The float/int conversion opcodes extracted into synthesized
/// converter calls during code randomization.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ConvertOp {
    /// `float` -> signed integer.
    FpToSi,
    /// `float` -> unsigned integer.
    FpToUi,
    /// signed integer -> `float`.
    SiToFp,
    /// unsigned integer -> `float`.
    UiToFp,
    /// `double` -> `float` (extracted only on PowerPC).
    FpTrunc,
}

impl ConvertOp {
    /// Short opcode name used to build a converter function's name
    /// (`"sitofp.i32.double"`-style), matching LLVM's own intrinsic
    /// mnemonics.
    pub fn mnemonic(self) -> &'static str {
        match self {
            ConvertOp::FpToSi => "fptosi",
            ConvertOp::FpToUi => "fptoui",
            ConvertOp::SiToFp => "sitofp",
            ConvertOp::UiToFp => "uitofp",
            ConvertOp::FpTrunc => "fptrunc",
        }
    }
}

/// Binary arithmetic ops needed by the stack-pad address computation:
/// `pad * 16` and `saved_sp - pad_bytes`.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum BinOpKind {
    /// Integer addition.
    Add,
    /// Integer subtraction.
    Sub,
    /// Integer multiplication.
    Mul,
}

/// One instruction. Every variant that can reference a global (directly,
/// or through a `Operand::Const` whose constant-pool entry recursively
/// contains one) is a candidate for the relocation-table rewrite that
/// code randomization applies.
#[derive(Clone, PartialEq, Debug)]
pub enum InstructionData {
    /// Return, optionally with a value.
    Ret(Option<Operand>),
    /// Unconditional jump.
    Br(Block),
    /// Conditional branch.
    CondBr {
        /// The condition, an `i1`.
        cond: Operand,
        /// Target when `cond` is true.
        then_blk: Block,
        /// Target when `cond` is false.
        else_blk: Block,
    },
    /// Marks unreachable code (the sentinel body never needs one, but a
    /// malformed or partially-specialized block might).
    Unreachable,
    /// A PHI node. `incoming[i]` is the value arriving along the edge
    /// from `incoming[i].1`. PHI needs special handling during the
    /// relocation-table rewrite: a rewrite of `incoming[i].0` must be
    /// inserted at the terminator of block `incoming[i].1`, never
    /// directly before the PHI itself.
    Phi(Vec<(Operand, Block)>),
    /// A direct or indirect call. `callee` is `Operand::Const` holding a
    /// `ConstData::FuncAddr` for a direct call, or `Operand::Value` for
    /// an indirect one. `args` is a `SmallVec`, matching
    /// `cranelift-codegen`'s own preference for inline storage on
    /// variable-length operand lists most calls keep short.
    Call {
        callee: Operand,
        args: SmallVec<[Operand; 4]>,
    },
    /// Load the value at `ptr`.
    Load(Operand),
    /// Store `value` at `ptr`.
    Store { value: Operand, ptr: Operand },
    /// `getelementptr base, indices` — used to address one slot of a
    /// relocation table or a stack-pad byte.
    Gep { base: Operand, indices: Vec<i64> },
    /// Pointer/integer bit-preserving cast.
    BitCast(Operand),
    /// Zero-extend an integer to a wider integer type.
    ZExt(Operand),
    /// A binary integer op.
    BinOp {
        op: BinOpKind,
        lhs: Operand,
        rhs: Operand,
    },
    /// `llvm.stacksave`-equivalent: snapshot the current stack pointer.
    StackSave,
    /// `llvm.stackrestore`-equivalent: reinstall a previously saved (or
    /// computed) stack pointer.
    StackRestore(Operand),
    /// One of the four conversion opcodes (plus PowerPC's `fptrunc`)
    /// extracted into a synthesized converter call.
    Convert { op: ConvertOp, operand: Operand },
}

impl InstructionData {
    /// Visit every operand slot immutably. Order matches
    /// [`operands_mut`](Self::operands_mut).
    pub fn operands(&self) -> Vec<&Operand> {
        match self {
            InstructionData::Ret(Some(v)) => vec![v],
            InstructionData::Ret(None) => vec![],
            InstructionData::Br(_) => vec![],
            InstructionData::CondBr { cond, .. } => vec![cond],
            InstructionData::Unreachable => vec![],
            InstructionData::Phi(incoming) => incoming.iter().map(|(v, _)| v).collect(),
            InstructionData::Call { callee, args } => {
                let mut v = vec![callee];
                v.extend(args.iter());
                v
            }
            InstructionData::Load(p) => vec![p],
            InstructionData::Store { value, ptr } => vec![value, ptr],
            InstructionData::Gep { base, .. } => vec![base],
            InstructionData::BitCast(v) => vec![v],
            InstructionData::ZExt(v) => vec![v],
            InstructionData::BinOp { lhs, rhs, .. } => vec![lhs, rhs],
            InstructionData::StackSave => vec![],
            InstructionData::StackRestore(v) => vec![v],
            InstructionData::Convert { operand, .. } => vec![operand],
        }
    }

    /// Visit every operand slot mutably, so a rewrite pass can retarget
    /// uses in place. Order matches [`operands`](Self::operands); for
    /// `Phi`, the block each slot's edge comes from can be read via
    /// [`phi_incoming_blocks`](Self::phi_incoming_blocks) at the same
    /// index.
    pub fn operands_mut(&mut self) -> Vec<&mut Operand> {
        match self {
            InstructionData::Ret(Some(v)) => vec![v],
            InstructionData::Ret(None) => vec![],
            InstructionData::Br(_) => vec![],
            InstructionData::CondBr { cond, .. } => vec![cond],
            InstructionData::Unreachable => vec![],
            InstructionData::Phi(incoming) => incoming.iter_mut().map(|(v, _)| v).collect(),
            InstructionData::Call { callee, args } => {
                let mut v = vec![callee];
                v.extend(args.iter_mut());
                v
            }
            InstructionData::Load(p) => vec![p],
            InstructionData::Store { value, ptr } => vec![value, ptr],
            InstructionData::Gep { base, .. } => vec![base],
            InstructionData::BitCast(v) => vec![v],
            InstructionData::ZExt(v) => vec![v],
            InstructionData::BinOp { lhs, rhs, .. } => vec![lhs, rhs],
            InstructionData::StackSave => vec![],
            InstructionData::StackRestore(v) => vec![v],
            InstructionData::Convert { operand, .. } => vec![operand],
        }
    }

    /// For a `Phi`, the predecessor block each operand slot's edge comes
    /// from, in the same order as `operands`/`operands_mut`. Empty for
    /// every other instruction.
    pub fn phi_incoming_blocks(&self) -> Vec<Block> {
        match self {
            InstructionData::Phi(incoming) => incoming.iter().map(|(_, b)| *b).collect(),
            _ => vec![],
        }
    }

    /// Is this a `Phi`?
    pub fn is_phi(&self) -> bool {
        matches!(self, InstructionData::Phi(_))
    }

    /// Is this a block terminator (ends a basic block)?
    pub fn is_terminator(&self) -> bool {
        matches!(
            self,
            InstructionData::Ret(_)
                | InstructionData::Br(_)
                | InstructionData::CondBr { .. }
                | InstructionData::Unreachable
        )
    }

    /// Is this a direct or indirect call instruction (a call-site for
    /// stack-pad insertion purposes)?
    pub fn is_call(&self) -> bool {
        matches!(self, InstructionData::Call { .. })
    }
}

/// One instruction together with its result type (`Type::Void` if it has
/// no result, e.g. `Store`/`Ret`/`StackRestore`).
#[derive(Clone, PartialEq, Debug)]
pub struct Instruction {
    /// The operation and its operands.
    pub data: InstructionData,
    /// The type of the value this instruction defines, or `Type::Void`.
    pub ty: Type,
}

impl Instruction {
    /// Build an instruction with no result (`ty = Void`).
    pub fn no_result(data: InstructionData) -> Self {
        Self {
            data,
            ty: Type::Void,
        }
    }

    /// Build an instruction that defines a value of type `ty`.
    pub fn with_result(data: InstructionData, ty: Type) -> Self {
        Self { data, ty }
    }
}
