//! Value types.
//!
//! A deliberately small type system: just enough to describe the operands
//! Stabilizer needs to reason about (integers of the widths the float
//! conversion opcodes use, the two float widths, an opaque pointer, and
//! the aggregate shapes a relocation table or a struct constant needs).

use core::fmt;

/// A Stabilizer IR type.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
#[allow(clippy::derive_hash_xor_eq)]
pub enum Type {
    /// Boolean / 1-bit integer, e.g. branch conditions.
    I1,
    /// 8-bit integer.
    I8,
    /// 16-bit integer.
    I16,
    /// 32-bit integer.
    I32,
    /// 64-bit integer.
    I64,
    /// 32-bit IEEE-754 float.
    F32,
    /// 64-bit IEEE-754 float.
    F64,
    /// An opaque pointer (Stabilizer never needs to distinguish pointee
    /// types beyond this; `i8*`-style byte pointers are what the runtime
    /// registration ABI traffics in).
    Ptr,
    /// The absence of a value, e.g. the result type of a `store` or `ret void`.
    Void,
    /// An anonymous structure, e.g. a relocation table or a constructor
    /// table entry.
    Struct(Vec<Type>),
    /// A fixed-length array.
    Array(Box<Type>, u32),
}

impl Type {
    /// Is this an integer or floating-point type that participates in the
    /// four int/float conversion opcodes?
    pub fn is_int(&self) -> bool {
        matches!(self, Type::I8 | Type::I16 | Type::I32 | Type::I64)
    }

    /// Is this one of the floating-point types?
    pub fn is_float(&self) -> bool {
        matches!(self, Type::F32 | Type::F64)
    }

    /// Size in bytes under a given pointer width, used when computing
    /// relocation-table byte sizes for runtime registration.
    pub fn size_of(&self, pointer_bytes: u32) -> u32 {
        match self {
            Type::I1 | Type::I8 => 1,
            Type::I16 => 2,
            Type::I32 | Type::F32 => 4,
            Type::I64 | Type::F64 => 8,
            Type::Ptr => pointer_bytes,
            Type::Void => 0,
            Type::Struct(fields) => fields.iter().map(|f| f.size_of(pointer_bytes)).sum(),
            Type::Array(elem, n) => elem.size_of(pointer_bytes) * n,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Type::I1 => write!(f, "i1"),
            Type::I8 => write!(f, "i8"),
            Type::I16 => write!(f, "i16"),
            Type::I32 => write!(f, "i32"),
            Type::I64 => write!(f, "i64"),
            Type::F32 => write!(f, "f32"),
            Type::F64 => write!(f, "f64"),
            Type::Ptr => write!(f, "ptr"),
            Type::Void => write!(f, "void"),
            Type::Struct(fields) => {
                write!(f, "{{")?;
                for (i, field) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", field)?;
                }
                write!(f, "}}")
            }
            Type::Array(elem, n) => write!(f, "[{} x {}]", n, elem),
        }
    }
}

/// A function signature: ordered parameter types plus a return type.
#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct Signature {
    /// Parameter types, in order.
    pub params: Vec<Type>,
    /// Return type (`Type::Void` for no return value).
    pub ret: Type,
}

impl Default for Type {
    fn default() -> Self {
        Type::Void
    }
}

impl Signature {
    /// Create a new signature.
    pub fn new(params: Vec<Type>, ret: Type) -> Self {
        Self { params, ret }
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "(")?;
        for (i, p) in self.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", p)?;
        }
        write!(f, ") -> {}", self.ret)
    }
}
