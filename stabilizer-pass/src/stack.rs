//! Stack Randomization.
//!
//! Per locally-defined, randomizable function: one dedicated single-byte
//! pad global, and every call-site bracketed with a pad-scaled stack
//! adjustment around the call using the stack-save/stack-restore
//! intrinsics the front end lowers to the platform's equivalent.

use stabilizer_ir::{
    BinOpKind, Const, ConstData, Func, FuncCursor, GlobalValue, GlobalVarData, Inst, Instruction,
    InstructionData, Linkage, Module, Operand, Type,
};
use std::collections::HashMap;

/// The pad global created for each stack-randomized function, keyed by
/// the function it guards. Consumed by `ctor::synthesize` to decide
/// whether a pad needs registering on its own (stack-only) or as part of
/// a function-registration tuple (stack + code).
pub type StackPads = HashMap<Func, GlobalValue>;

/// Run Stack Randomization over every randomizable function in `module`,
/// returning the pad global created for each.
pub fn randomize_stack(module: &mut Module) -> StackPads {
    let ptr_int_ty = module.data_layout.pointer_int_type();
    let candidates: Vec<Func> = module
        .snapshot_functions()
        .into_iter()
        .filter(|&f| module.function(f).is_randomizable())
        .collect();

    let mut pads = StackPads::new();

    for func in candidates {
        let pad_global = declare_pad(module, func);
        let pad_addr = module.constants.insert(ConstData::GlobalAddr(pad_global));
        let sixteen = module
            .constants
            .insert(ConstData::Int(ptr_int_ty.clone(), 16));

        let call_insts: Vec<Inst> = {
            let f = module.function(func);
            f.dfg
                .all_insts()
                .filter(|&i| f.dfg.inst(i).data.is_call())
                .collect()
        };

        for call in call_insts {
            bracket_call(module, func, call, pad_addr, sixteen, &ptr_int_ty);
        }

        pads.insert(func, pad_global);
    }

    pads
}

/// Declare `F.stack_pad`: a mutable, internal-linkage, zero-initialized
/// single byte.
fn declare_pad(module: &mut Module, func: Func) -> GlobalValue {
    let name = format!("{}.stack_pad", module.function(func).name);
    let zero = module.constants.insert(ConstData::Int(Type::I8, 0));
    module.declare_global(GlobalVarData::define(
        name,
        Type::I8,
        Linkage::Internal,
        false,
        zero,
    ))
}

/// Insert the pre-call pad sequence immediately before `call`, and the
/// post-call restore immediately after it.
fn bracket_call(
    module: &mut Module,
    func: Func,
    call: Inst,
    pad_addr: Const,
    sixteen: Const,
    ptr_int_ty: &Type,
) {
    let f = module.function_mut(func);
    let mut cursor = FuncCursor::new(f).at_inst(call);

    let (_, load_val) = cursor.insert(Instruction::with_result(
        InstructionData::Load(Operand::Const(pad_addr)),
        Type::I8,
    ));
    let (_, zext_val) = cursor.insert(Instruction::with_result(
        InstructionData::ZExt(Operand::Value(load_val.unwrap())),
        ptr_int_ty.clone(),
    ));
    let (_, mul_val) = cursor.insert(Instruction::with_result(
        InstructionData::BinOp {
            op: BinOpKind::Mul,
            lhs: Operand::Value(zext_val.unwrap()),
            rhs: Operand::Const(sixteen),
        },
        ptr_int_ty.clone(),
    ));
    let (_, saved_val) = cursor.insert(Instruction::with_result(InstructionData::StackSave, Type::Ptr));
    // `saved_val` is a pointer and `mul_val` an integer; this IR does not
    // model a separate ptrtoint step, so the subtraction operates on the
    // pointer value directly at pointer width.
    let (_, sub_val) = cursor.insert(Instruction::with_result(
        InstructionData::BinOp {
            op: BinOpKind::Sub,
            lhs: Operand::Value(saved_val.unwrap()),
            rhs: Operand::Value(mul_val.unwrap()),
        },
        Type::Ptr,
    ));
    cursor.insert(Instruction::no_result(InstructionData::StackRestore(
        Operand::Value(sub_val.unwrap()),
    )));

    let mut cursor = cursor.after_inst(call);
    cursor.insert(Instruction::no_result(InstructionData::StackRestore(
        Operand::Value(saved_val.unwrap()),
    )));
}
