//! The data-flow graph: owns every instruction and SSA value in a
//! function, independent of their layout (block membership and order),
//! exactly as `cranelift-codegen::ir::function::Function` splits `dfg`
//! from `layout`.

use crate::entities::{Inst, Value};
use crate::instruction::{Instruction, InstructionData};
use crate::types::Type;
use stabilizer_entity::{PrimaryMap, SecondaryMap};

/// Where an SSA value comes from.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ValueDef {
    /// The result of an instruction.
    Inst(Inst),
    /// The `n`th function parameter.
    Param(usize),
}

/// The type and origin of one SSA value.
#[derive(Clone, PartialEq, Debug)]
pub struct ValueData {
    /// The value's type.
    pub ty: Type,
    /// Where it's defined.
    pub def: ValueDef,
}

/// Owns all instructions and values for one function.
#[derive(Clone, Default)]
pub struct DataFlowGraph {
    insts: PrimaryMap<Inst, Instruction>,
    values: PrimaryMap<Value, ValueData>,
    /// The value an instruction defines, if any. `None` for void
    /// instructions (`Store`, `Ret`, branches, `StackRestore`, ...).
    inst_results: SecondaryMap<Inst, Option<Value>>,
}

impl DataFlowGraph {
    /// Create an empty data-flow graph.
    pub fn new() -> Self {
        Self {
            insts: PrimaryMap::new(),
            values: PrimaryMap::new(),
            inst_results: SecondaryMap::new(),
        }
    }

    /// Declare the `index`th function parameter, of type `ty`.
    pub fn make_param(&mut self, index: usize, ty: Type) -> Value {
        self.values.push(ValueData {
            ty,
            def: ValueDef::Param(index),
        })
    }

    /// Insert an instruction into the arena (not yet placed in any
    /// block's layout — see `Function::layout`), returning its handle
    /// and, if it defines a value, that value too.
    pub fn make_inst(&mut self, instruction: Instruction) -> (Inst, Option<Value>) {
        let ty = instruction.ty.clone();
        let inst = self.insts.push(instruction);
        let result = if ty == Type::Void {
            None
        } else {
            let v = self.values.push(ValueData {
                ty,
                def: ValueDef::Inst(inst),
            });
            Some(v)
        };
        self.inst_results[inst] = result;
        (inst, result)
    }

    /// Borrow an instruction's data.
    pub fn inst(&self, inst: Inst) -> &Instruction {
        &self.insts[inst]
    }

    /// Mutably borrow an instruction's data, e.g. to retarget an operand
    /// in place during code randomization.
    pub fn inst_mut(&mut self, inst: Inst) -> &mut Instruction {
        &mut self.insts[inst]
    }

    /// The value an instruction defines, if any.
    pub fn inst_result(&self, inst: Inst) -> Option<Value> {
        self.inst_results[inst]
    }

    /// A value's type and definition site.
    pub fn value(&self, value: Value) -> &ValueData {
        &self.values[value]
    }

    /// Iterate over every instruction in the arena, in creation order
    /// (not necessarily layout order — use `Function::layout` for that).
    pub fn all_insts(&self) -> impl Iterator<Item = Inst> + '_ {
        self.insts.keys()
    }
}
