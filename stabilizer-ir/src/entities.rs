//! Entity references used throughout a `Module`.
//!
//! Instructions need to reference other parts of the program: other
//! instructions' results, other basic blocks, globals, or constants. None
//! of these are implemented as Rust references, both because the
//! resulting aliasing would make in-place rewriting (which is most of
//! what this crate's passes do) miserable to borrow-check, and because we
//! want a compact, `Copy` representation that a `Vec<Operand>` can hold by
//! value. Instead, each is a newtype around a `u32` index into the arena
//! that owns it: `Module::functions` for `Func`/`GlobalValue`/`Const`,
//! `Function::dfg` for `Value`/`Inst`, `Function::layout` for `Block`.

use core::fmt;
use stabilizer_entity::entity_impl;

/// A reference to a function in a `Module`.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Func(u32);
entity_impl!(Func, "fn");

/// A reference to a basic block in a `Function`.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Block(u32);
entity_impl!(Block, "block");

/// A reference to an instruction in a `Function`.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Inst(u32);
entity_impl!(Inst, "inst");

/// A reference to an SSA value defined by an instruction or a function
/// parameter.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Value(u32);
entity_impl!(Value, "v");

/// A reference to a global variable declared in a `Module`.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GlobalValue(u32);
entity_impl!(GlobalValue, "gv");

/// A reference to an entry in a `Module`'s constant pool.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Const(u32);
entity_impl!(Const, "const");

/// A reference to any of the entities defined in this module, for use in
/// diagnostics that need to name "the thing that went wrong" generically.
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub enum AnyEntity {
    /// The whole module.
    Module,
    /// A function.
    Func(Func),
    /// A basic block.
    Block(Block),
    /// An instruction.
    Inst(Inst),
    /// An SSA value.
    Value(Value),
    /// A global variable.
    GlobalValue(GlobalValue),
    /// A constant-pool entry.
    Const(Const),
}

impl fmt::Display for AnyEntity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            AnyEntity::Module => write!(f, "module"),
            AnyEntity::Func(r) => r.fmt(f),
            AnyEntity::Block(r) => r.fmt(f),
            AnyEntity::Inst(r) => r.fmt(f),
            AnyEntity::Value(r) => r.fmt(f),
            AnyEntity::GlobalValue(r) => r.fmt(f),
            AnyEntity::Const(r) => r.fmt(f),
        }
    }
}

impl fmt::Debug for AnyEntity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        (self as &dyn fmt::Display).fmt(f)
    }
}

impl From<Func> for AnyEntity {
    fn from(r: Func) -> Self {
        AnyEntity::Func(r)
    }
}

impl From<Block> for AnyEntity {
    fn from(r: Block) -> Self {
        AnyEntity::Block(r)
    }
}

impl From<Inst> for AnyEntity {
    fn from(r: Inst) -> Self {
        AnyEntity::Inst(r)
    }
}

impl From<Value> for AnyEntity {
    fn from(r: Value) -> Self {
        AnyEntity::Value(r)
    }
}

impl From<GlobalValue> for AnyEntity {
    fn from(r: GlobalValue) -> Self {
        AnyEntity::GlobalValue(r)
    }
}

impl From<Const> for AnyEntity {
    fn from(r: Const) -> Self {
        AnyEntity::Const(r)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stabilizer_entity::EntityRef;

    #[test]
    fn display() {
        assert_eq!(Value::new(0).to_string(), "v0");
        assert_eq!(Block::new(3).to_string(), "block3");
        assert_eq!(Func::new(7).to_string(), "fn7");
    }

    #[test]
    fn any_entity_from() {
        let v = Value::new(1);
        let any: AnyEntity = v.into();
        assert_eq!(any.to_string(), "v1");
    }
}
