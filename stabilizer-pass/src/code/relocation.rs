//! Relocation-table collection and rewrite.

use stabilizer_ir::{
    Architecture, Block, Const, ConstData, Func, FuncCursor, GlobalValue, GlobalVarData, Inst,
    Instruction, InstructionData, Linkage, Module, Operand, Type,
};

/// One recorded PC-relative use: a constant operand, at a given slot of
/// a given instruction, that (recursively) references a global value.
/// `phi_block` is the incoming edge's predecessor when the owning
/// instruction is a PHI, and `None` otherwise — it decides where the
/// replacement load gets inserted.
struct CollectedUse {
    inst: Inst,
    operand_index: usize,
    constant: Const,
    phi_block: Option<Block>,
}

/// The tuple handed to Module Constructor Synthesis.
#[derive(Clone, Debug)]
pub struct Registration {
    /// The randomized function itself.
    pub func: Func,
    /// Its adjacent sentinel.
    pub sentinel: Func,
    /// The per-function relocation table, if any use qualified.
    pub table: Option<GlobalValue>,
    /// Table size in bytes (0 if `table` is `None`).
    pub table_size_bytes: u32,
    /// True iff the target uses PC-relative data addressing and `table`
    /// is non-empty.
    pub adjacent: bool,
}

/// Collect qualifying global references in `func`, build its relocation
/// table, and rewrite each use to load from it, given its already-created
/// sentinel.
pub fn collect_and_rewrite(
    module: &mut Module,
    func: Func,
    sentinel: Func,
    architecture: Architecture,
) -> Registration {
    let uses = collect_uses(module, func);

    if uses.is_empty() {
        return Registration {
            func,
            sentinel,
            table: None,
            table_size_bytes: 0,
            adjacent: false,
        };
    }

    let mut distinct: Vec<Const> = Vec::new();
    for u in &uses {
        if !distinct.contains(&u.constant) {
            distinct.push(u.constant);
        }
    }

    let table = build_table(module, func, &distinct);
    let addressed = addressed_table_const(module, architecture, sentinel, table);

    for u in &uses {
        let index = distinct.iter().position(|&c| c == u.constant).unwrap();
        rewrite_use(module, func, u, addressed, index);
    }

    let pointer_bytes = module.data_layout.pointer_bytes();
    let table_size_bytes = distinct
        .iter()
        .map(|&c| module.constants.get(c).ty().size_of(pointer_bytes))
        .sum();
    let adjacent = architecture.uses_pc_relative_data();

    Registration {
        func,
        sentinel,
        table: Some(table),
        table_size_bytes,
        adjacent,
    }
}

/// Does `c` (recursively) reference a global that is not an intrinsic and
/// not the exception personality routine?
fn is_qualifying_global_ref(module: &Module, c: Const) -> bool {
    let mut refs = Vec::new();
    let accept = |data: &ConstData| -> bool {
        match data {
            ConstData::FuncAddr(f) => {
                let target = module.function(*f);
                !target.is_intrinsic && !target.is_personality_fn
            }
            ConstData::GlobalAddr(_) => true,
            _ => false,
        }
    };
    module.constants.referenced_globals(c, &mut refs, &accept);
    !refs.is_empty()
}

fn collect_uses(module: &Module, func: Func) -> Vec<CollectedUse> {
    let f = module.function(func);
    let mut uses = Vec::new();
    for inst in f.dfg.all_insts() {
        let data = &f.dfg.inst(inst).data;
        let phi_blocks = data.phi_incoming_blocks();
        for (i, op) in data.operands().iter().enumerate() {
            if let Operand::Const(c) = op {
                if is_qualifying_global_ref(module, *c) {
                    uses.push(CollectedUse {
                        inst,
                        operand_index: i,
                        constant: *c,
                        phi_block: phi_blocks.get(i).copied(),
                    });
                }
            }
        }
    }
    uses
}

/// A global struct holding `distinct`, named `F.relocation_table`.
/// Returned as a bare `GlobalValue`; wrapped in a real `Option` by the
/// caller once it knows the handle is genuinely in use.
fn build_table(module: &mut Module, func: Func, distinct: &[Const]) -> GlobalValue {
    let field_types: Vec<Type> = distinct
        .iter()
        .map(|&c| module.constants.get(c).ty().clone())
        .collect();
    let struct_ty = Type::Struct(field_types);
    let table_const = module
        .constants
        .insert(ConstData::Struct(struct_ty.clone(), distinct.to_vec()));
    let name = format!("{}.relocation_table", module.function(func).name);
    module.declare_global(GlobalVarData::define(
        name,
        struct_ty,
        Linkage::Internal,
        false,
        table_const,
    ))
}

/// Choose the table address rewritten code actually GEPs against: the
/// sentinel's address, cast to the table's type, on a PC-relative-data
/// target (the runtime places a copy of the table there adjacent to the
/// sentinel); the table global's own address otherwise.
fn addressed_table_const(
    module: &mut Module,
    architecture: Architecture,
    sentinel: Func,
    table: GlobalValue,
) -> Const {
    if architecture.uses_pc_relative_data() {
        let sentinel_addr = module.constants.insert(ConstData::FuncAddr(sentinel));
        module
            .constants
            .insert(ConstData::BitCast(Type::Ptr, sentinel_addr))
    } else {
        module.constants.insert(ConstData::GlobalAddr(table))
    }
}

/// Rewrite one recorded use: GEP `(0, index)` against `addressed`, load
/// the slot, retarget the use to the loaded value. A PHI's
/// incoming-value use gets its load inserted at the predecessor block's
/// terminator, never directly before the PHI itself.
fn rewrite_use(module: &mut Module, func: Func, u: &CollectedUse, addressed: Const, index: usize) {
    let elem_ty = module.constants.get(u.constant).ty().clone();
    let gep = module
        .constants
        .insert(ConstData::GetElementPtr(Type::Ptr, addressed, vec![0, index as i64]));

    let insertion_point = match u.phi_block {
        Some(pred) => module
            .function(func)
            .layout
            .last_inst(pred)
            .expect("PHI predecessor must already have a terminator"),
        None => u.inst,
    };

    let loaded_val = {
        let f = module.function_mut(func);
        let mut cursor = FuncCursor::new(f).at_inst(insertion_point);
        let (_, loaded) = cursor.insert(Instruction::with_result(
            InstructionData::Load(Operand::Const(gep)),
            elem_ty,
        ));
        loaded.unwrap()
    };

    let f = module.function_mut(func);
    let instruction = f.dfg.inst_mut(u.inst);
    let mut operands = instruction.data.operands_mut();
    *operands[u.operand_index] = Operand::Value(loaded_val);
}

#[cfg(test)]
mod tests {
    use super::*;
    use stabilizer_ir::{DataLayout, Function, GlobalVarData as Gvd, Linkage as Lnk, Signature};

    #[test]
    fn no_qualifying_uses_yields_empty_registration() {
        let mut module = Module::new("x86_64-unknown-linux-gnu", DataLayout::new_64bit());
        let f = module.declare_function(Function::define(
            "f",
            Signature::new(vec![], Type::I32),
            Lnk::External,
        ));
        let sentinel = crate::code::sentinel::create(&mut module, f);
        let reg = collect_and_rewrite(&mut module, f, sentinel, Architecture::X86_64);
        assert!(reg.table.is_none());
        assert_eq!(reg.table_size_bytes, 0);
        assert!(!reg.adjacent);
    }

    #[test]
    fn global_reference_builds_relocation_table() {
        let mut module = Module::new("x86_64-unknown-linux-gnu", DataLayout::new_64bit());
        let zero = module.constants.insert(ConstData::Int(Type::I32, 0));
        let g = module.declare_global(Gvd::define("g", Type::I32, Lnk::External, false, zero));
        let addr = module.constants.insert(ConstData::GlobalAddr(g));

        let mut h = Function::define("h", Signature::new(vec![], Type::I32), Lnk::External);
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

        let sentinel = crate::code::sentinel::create(&mut module, h_fn);
        let reg = collect_and_rewrite(&mut module, h_fn, sentinel, Architecture::X86_64);

        let table = reg.table.expect("relocation table created");
        assert_eq!(module.globals[table].name, "h.relocation_table");
        assert!(reg.adjacent);
        assert_eq!(reg.table_size_bytes, 4);

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
}
