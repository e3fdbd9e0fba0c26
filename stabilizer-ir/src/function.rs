//! Intermediate representation of a function.
//!
//! Grounded on `cranelift-codegen::ir::function::Function`: the struct
//! owns a `dfg` (instruction/value data) and a `layout` (block/
//! instruction order) as two separate fields, the same split
//! `cranelift-codegen` uses, so a pass can mutate data through `dfg`
//! while walking order through `layout` without the two fighting over
//! borrow scopes.

use crate::dfg::DataFlowGraph;
use crate::entities::{Block, Value};
use crate::globals::Linkage;
use crate::layout::Layout;
use crate::types::Signature;
use stabilizer_entity::EntityRef;

/// A function.
#[derive(Clone)]
pub struct Function {
    /// The function's name, as it would appear in the textual IR and in
    /// the runtime registration calls the synthesized constructor makes.
    pub name: String,

    /// The function's signature.
    pub signature: Signature,

    /// Linkage class.
    pub linkage: Linkage,

    /// `true` if this function has no body (an external declaration,
    /// e.g. an allocator import or a runtime ABI function). Declarations
    /// are never transformed.
    pub is_declaration: bool,

    /// `true` if the front end marked this a compiler intrinsic whose
    /// body the code generator supplies. Intrinsic Lowering and the
    /// relocation-table scan both exclude intrinsics (except via the
    /// always-inline carve-out, see `always_inline`).
    pub is_intrinsic: bool,

    /// `true` if this intrinsic is always inlined by the code generator
    /// before a call to it would ever reach this transform. Intrinsic
    /// Lowering skips these: lowering them to a libcall would be
    /// pointless, since no indirect use ever reaches them.
    pub always_inline: bool,

    /// `true` if this is the exception-unwinding personality routine.
    /// It's excluded from randomization and from the relocation-table
    /// global-reference scan.
    pub is_personality_fn: bool,

    /// `true` if stack-protection attributes are present. These are
    /// stripped from a randomized function, since they would introduce
    /// an implicit global reference (the stack canary) during code
    /// generation that the relocation-table rewrite can't see ahead of
    /// time.
    pub has_stack_protect: bool,

    /// Required alignment in bytes. Sentinel functions need 64-byte
    /// alignment; this field lets any function request a specific
    /// alignment.
    pub align: u32,

    /// Data-flow graph: owns instruction and value data.
    pub dfg: DataFlowGraph,

    /// Layout: owns block existence and the order of blocks/instructions.
    pub layout: Layout,
}

impl Function {
    /// Declare an external function (no body) with the given name,
    /// signature, and linkage.
    pub fn declare(name: impl Into<String>, signature: Signature, linkage: Linkage) -> Self {
        Self {
            name: name.into(),
            signature,
            linkage,
            is_declaration: true,
            is_intrinsic: false,
            always_inline: false,
            is_personality_fn: false,
            has_stack_protect: false,
            align: 1,
            dfg: DataFlowGraph::new(),
            layout: Layout::new(),
        }
    }

    /// Define a new, empty function (no blocks yet) with the given name
    /// and signature. One function parameter value is created per entry
    /// in `signature.params`.
    pub fn define(name: impl Into<String>, signature: Signature, linkage: Linkage) -> Self {
        let mut dfg = DataFlowGraph::new();
        for (i, ty) in signature.params.iter().enumerate() {
            dfg.make_param(i, ty.clone());
        }
        Self {
            name: name.into(),
            signature,
            linkage,
            is_declaration: false,
            is_intrinsic: false,
            always_inline: false,
            is_personality_fn: false,
            has_stack_protect: false,
            align: 1,
            dfg,
            layout: Layout::new(),
        }
    }

    /// The `index`th parameter value. Valid because `define` creates
    /// parameter values first, in order, before any instruction results
    /// exist — so they occupy value indices `0..params.len()`.
    pub fn param(&self, index: usize) -> Value {
        Value::new(index)
    }

    /// Append a new, empty block.
    pub fn create_block(&mut self) -> Block {
        self.layout.append_block()
    }

    /// Is this function eligible for randomization at all? Declarations,
    /// intrinsics, and the personality routine are always skipped.
    pub fn is_randomizable(&self) -> bool {
        !self.is_declaration && !self.is_intrinsic && !self.is_personality_fn
    }
}
