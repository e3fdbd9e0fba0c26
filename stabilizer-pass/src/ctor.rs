//! Module Constructor Synthesis.
//!
//! Builds `stabilizer.module_ctor`, the single function that takes over
//! as the module's constructor table entry and, at program startup,
//! tells the runtime about every function/pad Stabilizer touched plus
//! every constructor the input module already had (so those still run,
//! but now under the randomized layout the runtime has already applied).

use crate::code::Registration;
use crate::options::StabilizeOptions;
use crate::runtime_decls;
use crate::stack::StackPads;
use stabilizer_ir::{
    Block, ConstData, CtorEntry, Func, Function, GlobalValue, Instruction, InstructionData,
    Linkage, Module, Operand, Signature, Type,
};

/// Build and install the synthesized constructor.
pub fn synthesize(
    module: &mut Module,
    options: StabilizeOptions,
    registrations: &[Registration],
    pads: &StackPads,
) {
    let prior_ctors: Vec<Func> = module.global_ctors.iter().filter_map(|e| e.func).collect();

    let mut ctor = Function::define(
        "stabilizer.module_ctor",
        Signature::new(vec![], Type::Void),
        Linkage::Internal,
    );
    let block = ctor.create_block();

    if options.stabilize_code {
        for reg in registrations {
            let pad = pads.get(&reg.func).copied();
            emit_register_function(module, &mut ctor, block, reg, pad);
        }
    }

    for prior in prior_ctors {
        emit_register_constructor(module, &mut ctor, block, prior);
    }

    if !options.stabilize_code && options.stabilize_stack {
        // Code randomization did not run, so pads were never folded into
        // a function-registration call; register them individually, and
        // only after pre-existing constructors so they land last.
        for &pad in pads.values() {
            emit_register_stack_pad(module, &mut ctor, block, pad);
        }
    }

    let (ret, _) = ctor
        .dfg
        .make_inst(Instruction::no_result(InstructionData::Ret(None)));
    ctor.layout.append_inst(block, ret);

    let ctor_handle = module.declare_function(ctor);

    // Replace the constructor table with a single priority-65535 entry
    // pointing at the new constructor, keeping the former table's name.
    // Any prior entries are not deleted — their functions are
    // re-registered above, not dropped.
    module.global_ctors = vec![CtorEntry {
        priority: 65535,
        func: Some(ctor_handle),
        data: None,
    }];

    // The runtime supplies its own `main`.
    if let Some(main_fn) = module.find_function("main") {
        module.function_mut(main_fn).name = "stabilizer_main".to_string();
    }
}

fn emit_register_function(
    module: &mut Module,
    ctor: &mut Function,
    block: Block,
    reg: &Registration,
    pad: Option<GlobalValue>,
) {
    let register_fn = runtime_decls::register_function(module);
    let callee_addr = module.constants.insert(ConstData::FuncAddr(register_fn));

    let code_base = module.constants.insert(ConstData::FuncAddr(reg.func));
    let code_limit = module.constants.insert(ConstData::FuncAddr(reg.sentinel));
    let table_base = match reg.table {
        Some(g) => module.constants.insert(ConstData::GlobalAddr(g)),
        None => module.constants.insert(ConstData::Null(Type::Ptr)),
    };
    let size = module
        .constants
        .insert(ConstData::Int(Type::I32, reg.table_size_bytes as i128));
    let adjacent = module
        .constants
        .insert(ConstData::Int(Type::I1, reg.adjacent as i128));
    let pad_ptr = match pad {
        Some(g) => module.constants.insert(ConstData::GlobalAddr(g)),
        None => module.constants.insert(ConstData::Null(Type::Ptr)),
    };

    let args = smallvec::smallvec![
        Operand::Const(code_base),
        Operand::Const(code_limit),
        Operand::Const(table_base),
        Operand::Const(size),
        Operand::Const(adjacent),
        Operand::Const(pad_ptr),
    ];
    let (inst, _) = ctor.dfg.make_inst(Instruction::no_result(InstructionData::Call {
        callee: Operand::Const(callee_addr),
        args,
    }));
    ctor.layout.append_inst(block, inst);
}

fn emit_register_constructor(module: &mut Module, ctor: &mut Function, block: Block, prior: Func) {
    let register_fn = runtime_decls::register_constructor(module);
    let callee_addr = module.constants.insert(ConstData::FuncAddr(register_fn));
    let arg = module.constants.insert(ConstData::FuncAddr(prior));

    let (inst, _) = ctor.dfg.make_inst(Instruction::no_result(InstructionData::Call {
        callee: Operand::Const(callee_addr),
        args: smallvec::smallvec![Operand::Const(arg)],
    }));
    ctor.layout.append_inst(block, inst);
}

fn emit_register_stack_pad(module: &mut Module, ctor: &mut Function, block: Block, pad: GlobalValue) {
    let register_fn = runtime_decls::register_stack_pad(module);
    let callee_addr = module.constants.insert(ConstData::FuncAddr(register_fn));
    let arg = module.constants.insert(ConstData::GlobalAddr(pad));

    let (inst, _) = ctor.dfg.make_inst(Instruction::no_result(InstructionData::Call {
        callee: Operand::Const(callee_addr),
        args: smallvec::smallvec![Operand::Const(arg)],
    }));
    ctor.layout.append_inst(block, inst);
}

#[cfg(test)]
mod tests {
    use super::*;
    use stabilizer_ir::DataLayout;

    #[test]
    fn empty_module_gets_a_returning_constructor() {
        let mut module = Module::new("x86_64-unknown-linux-gnu", DataLayout::new_64bit());
        synthesize(&mut module, StabilizeOptions::default(), &[], &StackPads::new());

        assert_eq!(module.global_ctors.len(), 1);
        assert_eq!(module.global_ctors[0].priority, 65535);
        let ctor_fn = module.global_ctors[0].func.expect("ctor function set");
        let ctor = module.function(ctor_fn);
        assert_eq!(ctor.name, "stabilizer.module_ctor");
        let block = ctor.layout.entry_block().unwrap();
        let insts: Vec<_> = ctor.layout.block_insts(block).collect();
        assert_eq!(insts.len(), 1);
        assert!(matches!(ctor.dfg.inst(insts[0]).data, InstructionData::Ret(None)));
    }

    #[test]
    fn renames_main_to_stabilizer_main() {
        let mut module = Module::new("x86_64-unknown-linux-gnu", DataLayout::new_64bit());
        module.declare_function(Function::define(
            "main",
            Signature::new(vec![], Type::I32),
            Linkage::External,
        ));
        synthesize(&mut module, StabilizeOptions::default(), &[], &StackPads::new());
        assert!(module.find_function("main").is_none());
        assert!(module.find_function("stabilizer_main").is_some());
    }

    #[test]
    fn prior_constructors_are_reregistered_not_deleted() {
        let mut module = Module::new("x86_64-unknown-linux-gnu", DataLayout::new_64bit());
        let old_ctor = module.declare_function(Function::define(
            "old_ctor",
            Signature::new(vec![], Type::Void),
            Linkage::Internal,
        ));
        module.global_ctors.push(CtorEntry {
            priority: 0,
            func: Some(old_ctor),
            data: None,
        });

        synthesize(&mut module, StabilizeOptions::default(), &[], &StackPads::new());

        assert_eq!(module.global_ctors.len(), 1);
        assert!(module.functions_in_order().any(|f| f == old_ctor));
        let new_ctor_fn = module.global_ctors[0].func.unwrap();
        let calls_old_ctor = module
            .function(new_ctor_fn)
            .dfg
            .all_insts()
            .any(|i| match &module.function(new_ctor_fn).dfg.inst(i).data {
                InstructionData::Call { args, .. } => args.iter().any(|op| {
                    matches!(op, Operand::Const(c) if matches!(module.constants.get(*c), ConstData::FuncAddr(f) if *f == old_ctor))
                }),
                _ => false,
            });
        assert!(calls_old_ctor);
    }
}
