//! Typed SSA intermediate representation consumed by the Stabilizer
//! transform.
//!
//! This crate plays the role `cranelift-codegen::ir` plays for Cranelift:
//! it defines the `Module`/`Function`/`Instruction`/`Const` data model
//! that `stabilizer-pass`'s passes mutate in place. It does not lower,
//! verify against an ISA, or emit machine code — that stays out of
//! scope for the core data model.

pub mod constant;
pub mod cursor;
pub mod dfg;
pub mod entities;
pub mod function;
pub mod globals;
pub mod instruction;
pub mod layout;
pub mod module;
pub mod target;
pub mod types;

pub use crate::constant::{ConstData, ConstantPool};
pub use crate::cursor::{CursorPosition, FuncCursor};
pub use crate::dfg::{DataFlowGraph, ValueDef};
pub use crate::entities::{AnyEntity, Block, Const, Func, GlobalValue, Inst, Value};
pub use crate::function::Function;
pub use crate::globals::{GlobalVarData, Linkage};
pub use crate::instruction::{BinOpKind, ConvertOp, Instruction, InstructionData, Operand};
pub use crate::layout::Layout;
pub use crate::module::{CtorEntry, Module};
pub use crate::target::{Architecture, DataLayout};
pub use crate::types::{Signature, Type};
