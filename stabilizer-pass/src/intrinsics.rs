//! Intrinsic Lowering.
//!
//! Grounded on `cranelift-codegen`'s `legalizer`/`simple_preopt` passes:
//! a single scan over the module's functions, driven by a static lookup
//! table, rewriting uses in place. The intrinsic→libcall table is a
//! `once_cell::sync::Lazy<HashMap<..>>`, the direct modern descendant of
//! the process-wide immutable static tables `cranelift-codegen` builds by
//! hand (e.g. `constant_hash.rs`) — populated once, read-only thereafter.

use crate::rewrite::redirect_func_addr_uses;
use once_cell::sync::Lazy;
use stabilizer_ir::{Func, Linkage, Module};
use std::collections::HashMap;

/// Maps a compiler intrinsic's name to the libcall that implements
/// equivalent semantics. Representative rather than exhaustive — the
/// table a real front end ships is larger, but every entry follows the
/// same "intrinsic name -> external function name" shape.
static INTRINSIC_TABLE: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    let mut m = HashMap::new();
    m.insert("llvm.memcpy", "memcpy");
    m.insert("llvm.memmove", "memmove");
    m.insert("llvm.memset", "memset");
    m.insert("llvm.sqrt.f64", "sqrt");
    m.insert("llvm.sqrt.f32", "sqrtf");
    m.insert("llvm.fabs.f64", "fabs");
    m.insert("llvm.fabs.f32", "fabsf");
    m
});

/// Run Intrinsic Lowering over every function in `module`.
///
/// Visits every function marked `is_intrinsic` and not `always_inline`. A
/// mapped intrinsic gets (or reuses) an external declaration under the
/// libcall name, every direct use of its address is retargeted to that
/// declaration, and the intrinsic is dropped from the module's emission
/// order once the whole scan completes — never mid-scan, since deleting
/// earlier would invalidate the uses a later iteration still needs to
/// see. An unmapped intrinsic is left untouched and warned about.
pub fn lower_intrinsics(module: &mut Module) {
    let candidates: Vec<Func> = module
        .functions_in_order()
        .filter(|&f| {
            let data = module.function(f);
            data.is_intrinsic && !data.always_inline
        })
        .collect();

    let mut to_delete = Vec::new();

    for intrinsic in candidates {
        let name = module.function(intrinsic).name.clone();
        let libcall = match INTRINSIC_TABLE.get(name.as_str()) {
            Some(&libcall) => libcall,
            None => {
                crate::diagnostics::unmapped_intrinsic(&name);
                continue;
            }
        };

        let target = match module.find_function(libcall) {
            Some(f) => f,
            None => {
                let signature = module.function(intrinsic).signature.clone();
                let decl = stabilizer_ir::Function::declare(libcall, signature, Linkage::External);
                module.declare_function(decl)
            }
        };

        redirect_func_addr_uses(module, intrinsic, target);
        to_delete.push(intrinsic);
    }

    for f in to_delete {
        module.remove_from_order(f);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rewrite::is_func_addr;
    use stabilizer_ir::{
        ConstData, DataLayout, Function, Instruction, InstructionData, Linkage, Operand,
        Signature, Type,
    };

    fn caller_calling(module: &mut Module, callee: Func) -> Func {
        let mut f = Function::define("caller", Signature::new(vec![], Type::Void), Linkage::External);
        let callee_addr = module.constants.insert(ConstData::FuncAddr(callee));
        let block = f.create_block();
        let (call_inst, _) = f.dfg.make_inst(Instruction::no_result(InstructionData::Call {
            callee: Operand::Const(callee_addr),
            args: Default::default(),
        }));
        f.layout.append_inst(block, call_inst);
        let (ret, _) = f.dfg.make_inst(Instruction::no_result(InstructionData::Ret(None)));
        f.layout.append_inst(block, ret);
        module.declare_function(f)
    }

    #[test]
    fn unmapped_intrinsic_is_left_in_place() {
        let mut module = Module::new("x86_64-unknown-linux-gnu", DataLayout::new_64bit());
        let mut intrinsic = Function::declare(
            "llvm.not.a.real.intrinsic",
            Signature::new(vec![], Type::Void),
            Linkage::External,
        );
        intrinsic.is_intrinsic = true;
        let f = module.declare_function(intrinsic);
        lower_intrinsics(&mut module);
        assert!(module.functions_in_order().any(|g| g == f));
    }

    #[test]
    fn mapped_intrinsic_is_lowered_and_uses_redirected() {
        let mut module = Module::new("x86_64-unknown-linux-gnu", DataLayout::new_64bit());
        let mut intrinsic = Function::declare(
            "llvm.sqrt.f64",
            Signature::new(vec![Type::F64], Type::F64),
            Linkage::External,
        );
        intrinsic.is_intrinsic = true;
        let intrinsic_fn = module.declare_function(intrinsic);
        let caller = caller_calling(&mut module, intrinsic_fn);

        lower_intrinsics(&mut module);

        assert!(!module.functions_in_order().any(|g| g == intrinsic_fn));
        let sqrt_decl = module.find_function("sqrt").expect("libcall declared");

        let f = module.function(caller);
        let call_inst = f.dfg.all_insts().next().expect("call present");
        let callee = &f.dfg.inst(call_inst).data.operands()[0];
        assert!(is_func_addr(&module, callee, sqrt_decl));
    }
}
