//! The constant pool.
//!
//! Grounded on `cranelift-codegen::ir::constant::ConstantPool`: constants
//! are inserted once, interned by structural equality, and referenced
//! everywhere else by a small `Const` handle instead of being duplicated
//! inline at every use. Unlike `cranelift-codegen`'s pool (which only
//! ever holds flat byte blobs for vector/float immediates), this one is
//! recursive: a constant expression can itself reference other constants
//! — struct/array aggregates, bitcasts, GEPs, and the global/function
//! address constants that code randomization exists to chase down.

use crate::entities::{Const, Func, GlobalValue};
use crate::types::Type;
use stabilizer_entity::PrimaryMap;
use std::collections::HashMap;

/// The data held by one constant-pool entry.
#[derive(Clone, PartialEq, Debug)]
pub enum ConstData {
    /// An integer literal of the given (integer) type.
    Int(Type, i128),
    /// A floating-point literal, stored as its bit pattern so that the
    /// type determines how it reads back (`F32` reads the low 32 bits).
    Float(Type, u64),
    /// A null pointer or zero aggregate of the given type.
    Null(Type),
    /// The address of a global variable. This is the constant kind
    /// code randomization exists to find and redirect through the
    /// relocation table.
    GlobalAddr(GlobalValue),
    /// The address of a function. Also redirected through the
    /// relocation table when it appears inside a randomized function's
    /// body (as opposed to appearing only in the constructor argument
    /// tuple, which is emitted by, not inside, the randomized function).
    FuncAddr(Func),
    /// A pointer cast of another constant to a new type. Used to express
    /// a reachable table address as the sentinel's address cast to the
    /// table's struct-pointer type.
    BitCast(Type, Const),
    /// A `getelementptr`-style constant offset into another constant.
    GetElementPtr(Type, Const, Vec<i64>),
    /// An anonymous structure built from field constants, e.g. a
    /// relocation table entry or a constructor-table entry.
    Struct(Type, Vec<Const>),
    /// A fixed-length array built from element constants.
    Array(Type, Vec<Const>),
}

impl ConstData {
    /// The type this constant evaluates to.
    pub fn ty(&self) -> &Type {
        match self {
            ConstData::Int(t, _)
            | ConstData::Float(t, _)
            | ConstData::Null(t)
            | ConstData::BitCast(t, _)
            | ConstData::GetElementPtr(t, _, _)
            | ConstData::Struct(t, _)
            | ConstData::Array(t, _) => t,
            ConstData::GlobalAddr(_) | ConstData::FuncAddr(_) => &Type::Ptr,
        }
    }

    /// The immediate child constants this one recursively contains, if
    /// any. Used by [`ConstantPool::references_any_global`]'s structural
    /// walk.
    fn children(&self) -> &[Const] {
        match self {
            ConstData::BitCast(_, c) => std::slice::from_ref(c),
            ConstData::GetElementPtr(_, c, _) => std::slice::from_ref(c),
            ConstData::Struct(_, cs) | ConstData::Array(_, cs) => cs,
            ConstData::Int(..)
            | ConstData::Float(..)
            | ConstData::Null(_)
            | ConstData::GlobalAddr(_)
            | ConstData::FuncAddr(_) => &[],
        }
    }
}

/// Owns every constant-pool entry for one `Module`, interning by
/// structural equality so that inserting the same data twice returns the
/// same handle.
#[derive(Clone, Default)]
pub struct ConstantPool {
    entries: PrimaryMap<Const, ConstData>,
    interned: HashMap<ConstKey, Const>,
}

/// A hashable projection of `ConstData` used purely for interning lookups
/// (floats compare by bit pattern, which is exactly what we want here —
/// two constants with the same bits are the same constant).
#[derive(Clone, PartialEq, Eq, Hash)]
enum ConstKey {
    Int(Type, i128),
    Float(Type, u64),
    Null(Type),
    GlobalAddr(GlobalValue),
    FuncAddr(Func),
    BitCast(Type, Const),
    GetElementPtr(Type, Const, Vec<i64>),
    Struct(Type, Vec<Const>),
    Array(Type, Vec<Const>),
}

impl From<&ConstData> for ConstKey {
    fn from(d: &ConstData) -> Self {
        match d.clone() {
            ConstData::Int(t, v) => ConstKey::Int(t, v),
            ConstData::Float(t, v) => ConstKey::Float(t, v),
            ConstData::Null(t) => ConstKey::Null(t),
            ConstData::GlobalAddr(g) => ConstKey::GlobalAddr(g),
            ConstData::FuncAddr(f) => ConstKey::FuncAddr(f),
            ConstData::BitCast(t, c) => ConstKey::BitCast(t, c),
            ConstData::GetElementPtr(t, c, idx) => ConstKey::GetElementPtr(t, c, idx),
            ConstData::Struct(t, cs) => ConstKey::Struct(t, cs),
            ConstData::Array(t, cs) => ConstKey::Array(t, cs),
        }
    }
}

impl ConstantPool {
    /// Create an empty constant pool.
    pub fn new() -> Self {
        Self {
            entries: PrimaryMap::new(),
            interned: HashMap::new(),
        }
    }

    /// Insert a constant, returning its (possibly pre-existing) handle.
    pub fn insert(&mut self, data: ConstData) -> Const {
        let key = ConstKey::from(&data);
        if let Some(&existing) = self.interned.get(&key) {
            return existing;
        }
        let handle = self.entries.push(data);
        self.interned.insert(key, handle);
        handle
    }

    /// Look up a constant's data by handle.
    pub fn get(&self, handle: Const) -> &ConstData {
        &self.entries[handle]
    }

    /// Does the constant (recursively) reference any global or function
    /// address?
    pub fn references_any_global(&self, handle: Const) -> bool {
        match self.get(handle) {
            ConstData::GlobalAddr(_) | ConstData::FuncAddr(_) => true,
            data => data
                .children()
                .iter()
                .any(|&c| self.references_any_global(c)),
        }
    }

    /// Collect every `GlobalValue`/`Func` address constant reachable from
    /// `handle` for which `accept` returns `true`. Compiler intrinsics and
    /// the exception personality routine are excluded by `accept` itself,
    /// which the caller builds from the module's intrinsic/personality
    /// functions. A leaf that fails `accept` is simply omitted; it does
    /// not block the walk from continuing over its siblings.
    pub fn referenced_globals(
        &self,
        handle: Const,
        out: &mut Vec<Const>,
        accept: &dyn Fn(&ConstData) -> bool,
    ) {
        let data = self.get(handle);
        match data {
            ConstData::GlobalAddr(_) | ConstData::FuncAddr(_) => {
                if accept(data) {
                    out.push(handle);
                }
            }
            _ => {
                for &child in data.children() {
                    self.referenced_globals(child, out, accept);
                }
            }
        }
    }

    /// Number of distinct constants interned so far.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Is the pool empty?
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stabilizer_entity::EntityRef;

    #[test]
    fn interns_duplicates() {
        let mut pool = ConstantPool::new();
        let a = pool.insert(ConstData::Int(Type::I32, 7));
        let b = pool.insert(ConstData::Int(Type::I32, 7));
        assert_eq!(a, b);
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn distinguishes_different_values() {
        let mut pool = ConstantPool::new();
        let a = pool.insert(ConstData::Int(Type::I32, 7));
        let b = pool.insert(ConstData::Int(Type::I32, 8));
        assert_ne!(a, b);
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn recursive_global_reference() {
        let mut pool = ConstantPool::new();
        let g = GlobalValue::new(0);
        let addr = pool.insert(ConstData::GlobalAddr(g));
        let cast = pool.insert(ConstData::BitCast(Type::Ptr, addr));
        assert!(pool.references_any_global(cast));

        let plain = pool.insert(ConstData::Int(Type::I32, 42));
        assert!(!pool.references_any_global(plain));
    }

    #[test]
    fn struct_of_globals_collects_all_children() {
        let mut pool = ConstantPool::new();
        let g0 = pool.insert(ConstData::GlobalAddr(GlobalValue::new(0)));
        let g1 = pool.insert(ConstData::GlobalAddr(GlobalValue::new(1)));
        let int = pool.insert(ConstData::Int(Type::I32, 1));
        let st = pool.insert(ConstData::Struct(
            Type::Struct(vec![Type::Ptr, Type::I32, Type::Ptr]),
            vec![g0, int, g1],
        ));
        let mut out = Vec::new();
        pool.referenced_globals(st, &mut out, &|_| true);
        assert_eq!(out, vec![g0, g1]);
    }
}
