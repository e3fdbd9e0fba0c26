//! Runtime ABI declarations.
//!
//! The three functions the runtime provides and that the constructor
//! synthesized by `ctor::synthesize` calls into. Declared lazily, on
//! first need, so a module that enables none of Stabilizer's facets never
//! grows these declarations.

use stabilizer_ir::{Func, Linkage, Module, Signature, Type};

/// `void(i8*, i8*, i8*, i32, i1, i8*)` — code base, code limit, table base,
/// table byte-size, adjacent-flag, stack-pad pointer.
pub const REGISTER_FUNCTION: &str = "stabilizer_register_function";
/// `void(i8*)` — registers a pre-existing module constructor.
pub const REGISTER_CONSTRUCTOR: &str = "stabilizer_register_constructor";
/// `void(i8*)` — registers a function's stack-pad global.
pub const REGISTER_STACK_PAD: &str = "stabilizer_register_stack_pad";

/// Declare one runtime function if it is not already present, returning
/// its handle either way. Declarations are external linkage and marked
/// non-lazy-bind; there is no ABI attribute to model that distinction in
/// this IR beyond the declaration itself, so it is implicit in every
/// declaration this module makes.
fn declare_or_find(module: &mut Module, name: &str, signature: Signature) -> Func {
    if let Some(f) = module.find_function(name) {
        return f;
    }
    let data = stabilizer_ir::Function::declare(name, signature, Linkage::External);
    module.declare_function(data)
}

/// `stabilizer_register_function(code, limit, table, size, adjacent, pad)`.
pub fn register_function(module: &mut Module) -> Func {
    declare_or_find(
        module,
        REGISTER_FUNCTION,
        Signature::new(
            vec![
                Type::Ptr,
                Type::Ptr,
                Type::Ptr,
                Type::I32,
                Type::I1,
                Type::Ptr,
            ],
            Type::Void,
        ),
    )
}

/// `stabilizer_register_constructor(ctor)`.
pub fn register_constructor(module: &mut Module) -> Func {
    declare_or_find(
        module,
        REGISTER_CONSTRUCTOR,
        Signature::new(vec![Type::Ptr], Type::Void),
    )
}

/// `stabilizer_register_stack_pad(pad)`.
pub fn register_stack_pad(module: &mut Module) -> Func {
    declare_or_find(
        module,
        REGISTER_STACK_PAD,
        Signature::new(vec![Type::Ptr], Type::Void),
    )
}

/// A `stabilizer_`-prefixed replacement declaration for one of the four
/// heap allocator names, sharing the original's signature.
pub fn declare_stabilizer_alias(module: &mut Module, original: Func) -> Func {
    let orig = module.function(original);
    let name = format!("stabilizer_{}", orig.name);
    let signature = orig.signature.clone();
    declare_or_find(module, &name, signature)
}
