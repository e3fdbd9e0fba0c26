//! Floating-point extraction.
//!
//! Two independent concerns live here, both motivated by the same
//! rationale: the back end can lower a float/int conversion or a raw
//! float literal into a PC-relative reference to a constant pool the
//! randomizer cannot see.
//!
//! 1. Every conversion instruction (the four int↔float opcodes, plus
//!    `fptrunc` on targets that need it) is replaced by a call to a
//!    synthesized, memoized converter function.
//! 2. Every operand that is a constant recursively containing a float
//!    literal is replaced by a load from a freshly created read-only
//!    global, with a PHI-safe insertion point.

use crate::error::StabilizerError;
use stabilizer_ir::{
    Architecture, Block, Const, ConstData, ConstantPool, ConvertOp, Func, FuncCursor, Function,
    GlobalVarData, Inst, Instruction, InstructionData, Linkage, Module, Operand, Signature, Type,
};
use std::collections::HashMap;

/// Converter functions synthesized so far, memoized by `(op, input type,
/// output type)` so the same conversion is never built twice per module.
pub type Converters = HashMap<(ConvertOp, Type, Type), Func>;

/// Run both Step C concerns over `func`.
pub fn extract(
    module: &mut Module,
    func: Func,
    architecture: Architecture,
    converters: &mut Converters,
) -> Result<(), StabilizerError> {
    extract_conversions(module, func, architecture, converters)?;
    extract_float_literals(module, func);
    Ok(())
}

fn validate_operand_type(op: ConvertOp, input: &Type, inst: Inst) -> Result<(), StabilizerError> {
    let ok = match op {
        ConvertOp::FpToSi | ConvertOp::FpToUi | ConvertOp::FpTrunc => input.is_float(),
        ConvertOp::SiToFp | ConvertOp::UiToFp => input.is_int(),
    };
    if ok {
        Ok(())
    } else {
        Err(StabilizerError::UnrecognizedConversion { inst })
    }
}

fn extract_conversions(
    module: &mut Module,
    func: Func,
    architecture: Architecture,
    converters: &mut Converters,
) -> Result<(), StabilizerError> {
    let candidates: Vec<(Inst, ConvertOp, Operand, Type, Type)> = {
        let f = module.function(func);
        f.dfg
            .all_insts()
            .filter_map(|inst| {
                let instruction = f.dfg.inst(inst);
                match &instruction.data {
                    InstructionData::Convert { op, operand } => {
                        if *op == ConvertOp::FpTrunc && !architecture.extracts_float_truncate() {
                            return None;
                        }
                        let input_ty = operand_type(&f.dfg, &module.constants, operand);
                        Some((inst, *op, *operand, input_ty, instruction.ty.clone()))
                    }
                    _ => None,
                }
            })
            .collect()
    };

    for (inst, op, operand, input_ty, output_ty) in candidates {
        validate_operand_type(op, &input_ty, inst)?;
        let converter = get_or_create_converter(module, converters, op, input_ty, output_ty.clone());
        let addr = module.constants.insert(ConstData::FuncAddr(converter));
        let f = module.function_mut(func);
        let instruction = f.dfg.inst_mut(inst);
        instruction.data = InstructionData::Call {
            callee: Operand::Const(addr),
            args: smallvec::smallvec![operand],
        };
    }
    Ok(())
}

fn get_or_create_converter(
    module: &mut Module,
    converters: &mut Converters,
    op: ConvertOp,
    input_ty: Type,
    output_ty: Type,
) -> Func {
    let key = (op, input_ty.clone(), output_ty.clone());
    if let Some(&f) = converters.get(&key) {
        return f;
    }
    let name = format!("stabilizer.convert.{}.{}.{}", op.mnemonic(), input_ty, output_ty);
    let mut converter = Function::define(
        name,
        Signature::new(vec![input_ty], output_ty.clone()),
        Linkage::Internal,
    );
    let param = converter.param(0);
    let block = converter.create_block();
    let (conv_inst, conv_val) = converter.dfg.make_inst(Instruction::with_result(
        InstructionData::Convert {
            op,
            operand: Operand::Value(param),
        },
        output_ty,
    ));
    converter.layout.append_inst(block, conv_inst);
    let (ret, _) = converter.dfg.make_inst(Instruction::no_result(
        InstructionData::Ret(Some(Operand::Value(conv_val.unwrap()))),
    ));
    converter.layout.append_inst(block, ret);

    let handle = module.declare_function(converter);
    converters.insert(key, handle);
    handle
}

/// The type of an operand: a value's recorded type, or a constant's.
fn operand_type(
    dfg: &stabilizer_ir::DataFlowGraph,
    constants: &ConstantPool,
    operand: &Operand,
) -> Type {
    match operand {
        Operand::Value(v) => dfg.value(*v).ty.clone(),
        Operand::Const(c) => constants.get(*c).ty().clone(),
    }
}

fn contains_float_literal(pool: &ConstantPool, c: Const) -> bool {
    match pool.get(c) {
        ConstData::Float(..) => true,
        ConstData::Int(..) | ConstData::Null(_) | ConstData::GlobalAddr(_) | ConstData::FuncAddr(_) => {
            false
        }
        ConstData::BitCast(_, inner) | ConstData::GetElementPtr(_, inner, _) => {
            contains_float_literal(pool, *inner)
        }
        ConstData::Struct(_, cs) | ConstData::Array(_, cs) => {
            cs.iter().any(|&c| contains_float_literal(pool, c))
        }
    }
}

fn declare_float_global(module: &mut Module, value: Const, ty: Type) -> stabilizer_ir::GlobalValue {
    let idx = module.globals.len();
    let name = format!("stabilizer.float_const.{idx}");
    module.declare_global(GlobalVarData::define(
        name, ty, Linkage::Internal, true, value,
    ))
}

fn extract_float_literals(module: &mut Module, func: Func) {
    let insts: Vec<Inst> = module.function(func).dfg.all_insts().collect();
    for inst in insts {
        let is_phi = module.function(func).dfg.inst(inst).data.is_phi();
        if is_phi {
            extract_phi_operands(module, func, inst);
        } else {
            extract_plain_operands(module, func, inst);
        }
    }
}

fn extract_plain_operands(module: &mut Module, func: Func, inst: Inst) {
    let targets: Vec<(usize, Const, Type)> = {
        let f = module.function(func);
        f.dfg
            .inst(inst)
            .data
            .operands()
            .iter()
            .enumerate()
            .filter_map(|(i, op)| match op {
                Operand::Const(c) if contains_float_literal(&module.constants, *c) => {
                    Some((i, *c, module.constants.get(*c).ty().clone()))
                }
                _ => None,
            })
            .collect()
    };
    for (idx, c, ty) in targets {
        let global = declare_float_global(module, c, ty.clone());
        let addr = module.constants.insert(ConstData::GlobalAddr(global));
        let loaded_val = {
            let f = module.function_mut(func);
            let mut cursor = FuncCursor::new(f).at_inst(inst);
            let (_, loaded) =
                cursor.insert(Instruction::with_result(InstructionData::Load(Operand::Const(addr)), ty));
            loaded.unwrap()
        };
        let f = module.function_mut(func);
        let instruction = f.dfg.inst_mut(inst);
        let mut operands = instruction.data.operands_mut();
        *operands[idx] = Operand::Value(loaded_val);
    }
}

fn extract_phi_operands(module: &mut Module, func: Func, inst: Inst) {
    let targets: Vec<(usize, Const, Type, Block)> = {
        let f = module.function(func);
        let data = &f.dfg.inst(inst).data;
        let blocks = data.phi_incoming_blocks();
        data.operands()
            .iter()
            .enumerate()
            .filter_map(|(i, op)| match op {
                Operand::Const(c) if contains_float_literal(&module.constants, *c) => {
                    Some((i, *c, module.constants.get(*c).ty().clone(), blocks[i]))
                }
                _ => None,
            })
            .collect()
    };
    for (idx, c, ty, pred_block) in targets {
        let global = declare_float_global(module, c, ty.clone());
        let addr = module.constants.insert(ConstData::GlobalAddr(global));
        let terminator = module
            .function(func)
            .layout
            .last_inst(pred_block)
            .expect("every block reachable as a PHI predecessor must already have a terminator");
        let loaded_val = {
            let f = module.function_mut(func);
            let mut cursor = FuncCursor::new(f).at_inst(terminator);
            let (_, loaded) =
                cursor.insert(Instruction::with_result(InstructionData::Load(Operand::Const(addr)), ty));
            loaded.unwrap()
        };
        let f = module.function_mut(func);
        let instruction = f.dfg.inst_mut(inst);
        let mut operands = instruction.data.operands_mut();
        *operands[idx] = Operand::Value(loaded_val);
    }
}
