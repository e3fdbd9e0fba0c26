//! Sentinel creation and function normalization.

use stabilizer_ir::{Function, Instruction, InstructionData, Linkage, Module, Signature, Func, Type};

/// 64 bytes, the alignment required for a sentinel function so its
/// address reliably delimits `F`'s emitted code extent.
pub const SENTINEL_ALIGNMENT: u32 = 64;

/// Create `stabilizer.dummy.F`: an internal-linkage, 64-byte-aligned,
/// `void()` function with one empty block ending in a bare return,
/// inserted immediately after `func` in the module's function list.
pub fn create(module: &mut Module, func: Func) -> Func {
    let name = format!("stabilizer.dummy.{}", module.function(func).name);
    let mut dummy = Function::define(name, Signature::new(vec![], Type::Void), Linkage::Internal);
    dummy.align = SENTINEL_ALIGNMENT;
    let block = dummy.create_block();
    let (ret, _) = dummy
        .dfg
        .make_inst(Instruction::no_result(InstructionData::Ret(None)));
    dummy.layout.append_inst(block, ret);
    module.insert_function_after(func, dummy)
}

/// Normalize `func` before randomization: strip stack protection (it
/// would introduce an implicit global reference during code generation
/// that the relocation rewrite can't see ahead of time), and demote
/// `LinkOnceOdr` linkage to `External` so a randomized copy is never
/// silently deduplicated against an un-randomized one.
pub fn normalize(module: &mut Module, func: Func) {
    let f = module.function_mut(func);
    f.has_stack_protect = false;
    if f.linkage == Linkage::LinkOnceOdr {
        f.linkage = Linkage::External;
    }
}
