//! Shared operand-rewrite helpers used by more than one pass.
//!
//! Both Intrinsic Lowering and Heap Randomization need the same
//! primitive: "every direct use of this function's address now means
//! that function instead". Factored out once rather than duplicated,
//! since the two passes are otherwise unrelated.

use stabilizer_ir::{ConstData, Func, Module, Operand};

/// Retarget every direct `Operand::Const(FuncAddr(from))` use, in every
/// locally-defined function's instructions, to `FuncAddr(to)` instead.
/// Preserves the total use count across the rename.
pub fn redirect_func_addr_uses(module: &mut Module, from: Func, to: Func) {
    let to_addr = module.constants.insert(ConstData::FuncAddr(to));

    let victims: Vec<Func> = module.functions_in_order().collect();
    for victim in victims {
        let insts: Vec<_> = {
            let f = module.function(victim);
            if f.is_declaration {
                continue;
            }
            f.dfg.all_insts().collect()
        };

        for inst in insts {
            let matches: Vec<usize> = {
                let f = module.function(victim);
                f.dfg
                    .inst(inst)
                    .data
                    .operands()
                    .iter()
                    .enumerate()
                    .filter(|(_, op)| is_func_addr(module, op, from))
                    .map(|(i, _)| i)
                    .collect()
            };
            if matches.is_empty() {
                continue;
            }
            let f = module.function_mut(victim);
            let instruction = f.dfg.inst_mut(inst);
            let mut operands = instruction.data.operands_mut();
            for idx in matches {
                *operands[idx] = Operand::Const(to_addr);
            }
        }
    }
}

/// Is `operand` a direct constant reference to `target`'s address?
pub fn is_func_addr(module: &Module, operand: &Operand, target: Func) -> bool {
    matches!(
        operand,
        Operand::Const(c) if matches!(module.constants.get(*c), ConstData::FuncAddr(f) if *f == target)
    )
}
