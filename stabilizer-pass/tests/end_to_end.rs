//! End-to-end scenarios exercising `lower_intrinsics`/`stabilize` as a
//! caller (a compiler driver) would: build a small module by hand, run
//! the public entry points, inspect the result.

use stabilizer_ir::{
    ConstData, DataLayout, Function, GlobalVarData, Instruction, InstructionData, Linkage,
    Module, Operand, Signature, Type,
};
use stabilizer_pass::{stabilize, StabilizeOptions};

fn module_64() -> Module {
    Module::new("x86_64-unknown-linux-gnu", DataLayout::new_64bit())
}

#[test]
fn empty_module_all_options_off() {
    let mut module = module_64();
    stabilize(&mut module, StabilizeOptions::default()).unwrap();

    assert_eq!(module.function_count(), 1);
    assert_eq!(module.global_ctors.len(), 1);
    let ctor_fn = module.global_ctors[0].func.unwrap();
    let ctor = module.function(ctor_fn);
    let block = ctor.layout.entry_block().unwrap();
    let insts: Vec<_> = ctor.layout.block_insts(block).collect();
    assert_eq!(insts.len(), 1);
    assert!(matches!(ctor.dfg.inst(insts[0]).data, InstructionData::Ret(None)));
}

#[test]
fn simple_function_code_randomization_on() {
    let mut module = module_64();
    let mut f = Function::define("f", Signature::new(vec![], Type::I32), Linkage::External);
    let block = f.create_block();
    let forty_two = module.constants.insert(ConstData::Int(Type::I32, 42));
    let (ret, _) = f.dfg.make_inst(Instruction::no_result(InstructionData::Ret(Some(
        Operand::Const(forty_two),
    ))));
    f.layout.append_inst(block, ret);
    let f_fn = module.declare_function(f);

    let options = StabilizeOptions {
        stabilize_code: true,
        ..StabilizeOptions::default()
    };
    stabilize(&mut module, options).unwrap();

    let order: Vec<_> = module.functions_in_order().collect();
    let f_pos = order.iter().position(|&g| g == f_fn).unwrap();
    let sentinel = order[f_pos + 1];
    assert_eq!(module.function(sentinel).name, "stabilizer.dummy.f");
    assert_eq!(module.function(sentinel).align, 64);

    // f's body is untouched: still a bare return of the literal.
    let body_insts: Vec<_> = module
        .function(f_fn)
        .layout
        .block_insts(module.function(f_fn).layout.entry_block().unwrap())
        .collect();
    assert_eq!(body_insts.len(), 1);
    assert!(matches!(
        module.function(f_fn).dfg.inst(body_insts[0]).data,
        InstructionData::Ret(Some(Operand::Const(_)))
    ));

    let ctor_fn = module.global_ctors[0].func.unwrap();
    let ctor = module.function(ctor_fn);
    let calls_register_function = ctor.dfg.all_insts().any(|i| {
        matches!(&ctor.dfg.inst(i).data, InstructionData::Call { args, .. } if args.len() == 6)
    });
    assert!(calls_register_function);
}

#[test]
fn function_referencing_a_global_integer() {
    let mut module = module_64();
    let seven = module.constants.insert(ConstData::Int(Type::I32, 7));
    let g = module.declare_global(GlobalVarData::define(
        "g",
        Type::I32,
        Linkage::External,
        false,
        seven,
    ));
    let addr = module.constants.insert(ConstData::GlobalAddr(g));

    let mut h = Function::define("h", Signature::new(vec![], Type::I32), Linkage::External);
    let block = h.create_block();
    let (load, load_val) = h
        .dfg
        .make_inst(Instruction::with_result(InstructionData::Load(Operand::Const(addr)), Type::I32));
    h.layout.append_inst(block, load);
    let (ret, _) = h.dfg.make_inst(Instruction::no_result(InstructionData::Ret(Some(
        Operand::Value(load_val.unwrap()),
    ))));
    h.layout.append_inst(block, ret);
    let h_fn = module.declare_function(h);

    let options = StabilizeOptions {
        stabilize_code: true,
        ..StabilizeOptions::default()
    };
    stabilize(&mut module, options).unwrap();

    let table = module
        .globals
        .values()
        .find(|g| g.name == "h.relocation_table")
        .expect("relocation table created");
    assert_eq!(table.ty, Type::Struct(vec![Type::I32]));

    let f = module.function(h_fn);
    let load_inst = f
        .dfg
        .all_insts()
        .find(|&i| matches!(f.dfg.inst(i).data, InstructionData::Load(_)))
        .unwrap();
    match &f.dfg.inst(load_inst).data {
        InstructionData::Load(Operand::Const(c)) => {
            assert!(matches!(module.constants.get(*c), ConstData::GetElementPtr(..)));
        }
        other => panic!("expected load from GEP, got {other:?}"),
    }
}

#[test]
fn function_with_a_floating_point_return() {
    let mut module = module_64();
    let pi = module.constants.insert(ConstData::Float(Type::F64, 3.14f64.to_bits()));

    let mut f = Function::define("f", Signature::new(vec![], Type::F64), Linkage::External);
    let block = f.create_block();
    let (ret, _) = f.dfg.make_inst(Instruction::no_result(InstructionData::Ret(Some(
        Operand::Const(pi),
    ))));
    f.layout.append_inst(block, ret);
    let f_fn = module.declare_function(f);

    let options = StabilizeOptions {
        stabilize_code: true,
        ..StabilizeOptions::default()
    };
    stabilize(&mut module, options).unwrap();

    // the literal became a load from a freshly created global.
    let ffn = module.function(f_fn);
    let ret_inst = ffn
        .dfg
        .all_insts()
        .find(|&i| matches!(ffn.dfg.inst(i).data, InstructionData::Ret(Some(Operand::Value(_)))))
        .expect("ret now returns a loaded value");
    let InstructionData::Ret(Some(Operand::Value(loaded))) = ffn.dfg.inst(ret_inst).data else {
        unreachable!()
    };
    let def = ffn.dfg.value(loaded);
    assert_eq!(def.ty, Type::F64);

    let float_global = module
        .globals
        .values()
        .find(|g| g.name.starts_with("stabilizer.float_const."))
        .expect("float literal extracted to a global");
    assert_eq!(float_global.ty, Type::F64);

    // the global itself ends up referenced through f's relocation table.
    let table = module
        .globals
        .values()
        .find(|g| g.name == "f.relocation_table")
        .expect("relocation table created for the new global load");
    assert_eq!(table.ty, Type::Struct(vec![Type::F64]));
}

#[test]
fn int_to_float_conversion_is_extracted() {
    let mut module = module_64();
    let mut f = Function::define(
        "f",
        Signature::new(vec![Type::I32], Type::F64),
        Linkage::External,
    );
    let x = f.param(0);
    let block = f.create_block();
    let (conv, conv_val) = f.dfg.make_inst(Instruction::with_result(
        InstructionData::Convert {
            op: stabilizer_ir::ConvertOp::SiToFp,
            operand: Operand::Value(x),
        },
        Type::F64,
    ));
    f.layout.append_inst(block, conv);
    let (ret, _) = f.dfg.make_inst(Instruction::no_result(InstructionData::Ret(Some(
        Operand::Value(conv_val.unwrap()),
    ))));
    f.layout.append_inst(block, ret);
    let f_fn = module.declare_function(f);

    let options = StabilizeOptions {
        stabilize_code: true,
        ..StabilizeOptions::default()
    };
    stabilize(&mut module, options).unwrap();

    let converter = module
        .find_function("stabilizer.convert.sitofp.i32.f64")
        .expect("converter synthesized");
    let conv_fn = module.function(converter);
    let body_block = conv_fn.layout.entry_block().unwrap();
    let insts: Vec<_> = conv_fn.layout.block_insts(body_block).collect();
    assert_eq!(insts.len(), 2);
    assert!(matches!(
        conv_fn.dfg.inst(insts[0]).data,
        InstructionData::Convert { .. }
    ));

    let ffn = module.function(f_fn);
    assert!(!ffn.dfg.all_insts().any(|i| matches!(
        ffn.dfg.inst(i).data,
        InstructionData::Convert { .. }
    )));
    assert!(ffn.dfg.all_insts().any(|i| matches!(
        &ffn.dfg.inst(i).data,
        InstructionData::Call { .. }
    )));
}

#[test]
fn heap_stack_and_code_combined() {
    let mut module = module_64();
    let malloc = module.declare_function(Function::declare(
        "malloc",
        Signature::new(vec![Type::I64], Type::Ptr),
        Linkage::External,
    ));

    let mut caller = Function::define("caller", Signature::new(vec![], Type::Void), Linkage::External);
    let addr = module.constants.insert(ConstData::FuncAddr(malloc));
    let size = module.constants.insert(ConstData::Int(Type::I64, 8));
    let block = caller.create_block();
    let (call, _) = caller.dfg.make_inst(Instruction::with_result(
        InstructionData::Call {
            callee: Operand::Const(addr),
            args: smallvec::smallvec![Operand::Const(size)],
        },
        Type::Ptr,
    ));
    caller.layout.append_inst(block, call);
    let (ret, _) = caller.dfg.make_inst(Instruction::no_result(InstructionData::Ret(None)));
    caller.layout.append_inst(block, ret);
    let caller_fn = module.declare_function(caller);

    stabilize(&mut module, StabilizeOptions::all()).unwrap();

    let stabilizer_malloc = module
        .find_function("stabilizer_malloc")
        .expect("malloc aliased");

    // Code randomization relocates the call's callee operand through
    // caller's relocation table (it is a qualifying global reference like
    // any other), so the retargeted address is found there rather than
    // directly on the call instruction.
    let table = module
        .globals
        .values()
        .find(|g| g.name == "caller.relocation_table")
        .expect("relocation table created for caller");
    let ConstData::Struct(_, slots) = module.constants.get(table.initializer.unwrap()) else {
        panic!("relocation table initializer must be a struct");
    };
    assert!(slots.iter().any(|&c| matches!(
        module.constants.get(c),
        ConstData::FuncAddr(m) if *m == stabilizer_malloc
    )));

    let f = module.function(caller_fn);

    let saves = f
        .dfg
        .all_insts()
        .filter(|&i| matches!(f.dfg.inst(i).data, InstructionData::StackSave))
        .count();
    assert_eq!(saves, 1);

    let pad = module
        .globals
        .values()
        .find(|g| g.name == "caller.stack_pad")
        .expect("stack pad created");
    assert_eq!(pad.ty, Type::I8);

    let ctor_fn = module.global_ctors[0].func.unwrap();
    let ctor = module.function(ctor_fn);
    let registers_six_args = ctor.dfg.all_insts().any(|i| {
        matches!(&ctor.dfg.inst(i).data, InstructionData::Call { args, .. } if args.len() == 6)
    });
    assert!(registers_six_args);
}
