//! Heap Randomization.
//!
//! For each of the four allocator names, if the module declares a
//! function of that name, synthesize a `stabilizer_`-prefixed external
//! declaration sharing its signature and retarget every use of the
//! original to it. The original declaration is left in the module
//! (unused, not deleted) — only the *uses* move, not the declaration
//! itself.

use crate::rewrite::redirect_func_addr_uses;
use crate::runtime_decls::declare_stabilizer_alias;
use stabilizer_ir::Module;

/// The allocator names heap randomization looks for.
const ALLOCATOR_NAMES: [&str; 4] = ["malloc", "calloc", "realloc", "free"];

/// Run Heap Randomization over `module`.
pub fn randomize_heap(module: &mut Module) {
    for &name in ALLOCATOR_NAMES.iter() {
        let Some(original) = module.find_function(name) else {
            continue;
        };
        let alias = declare_stabilizer_alias(module, original);
        redirect_func_addr_uses(module, original, alias);
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

    #[test]
    fn malloc_calls_are_retargeted() {
        let mut module = Module::new("x86_64-unknown-linux-gnu", DataLayout::new_64bit());
        let malloc = Function::declare(
            "malloc",
            Signature::new(vec![Type::I64], Type::Ptr),
            Linkage::External,
        );
        let malloc_fn = module.declare_function(malloc);

        let mut caller =
            Function::define("caller", Signature::new(vec![], Type::Void), Linkage::External);
        let addr = module.constants.insert(ConstData::FuncAddr(malloc_fn));
        let block = caller.create_block();
        let (call, _) = caller.dfg.make_inst(Instruction::with_result(
            InstructionData::Call {
                callee: Operand::Const(addr),
                args: Default::default(),
            },
            Type::Ptr,
        ));
        caller.layout.append_inst(block, call);
        let (ret, _) = caller
            .dfg
            .make_inst(Instruction::no_result(InstructionData::Ret(None)));
        caller.layout.append_inst(block, ret);
        let caller_fn = module.declare_function(caller);

        randomize_heap(&mut module);

        let alias = module
            .find_function("stabilizer_malloc")
            .expect("alias declared");
        let f = module.function(caller_fn);
        let call_inst = f.dfg.all_insts().next().unwrap();
        let callee = &f.dfg.inst(call_inst).data.operands()[0];
        assert!(is_func_addr(&module, callee, alias));
        assert!(module.find_function("malloc").is_some());
    }

    #[test]
    fn absent_allocator_is_a_no_op() {
        let mut module = Module::new("x86_64-unknown-linux-gnu", DataLayout::new_64bit());
        randomize_heap(&mut module);
        assert!(module.find_function("stabilizer_malloc").is_none());
    }
}
