//! Cursor library.
//!
//! Grounded on `cranelift-codegen::cursor`: a small builder-style wrapper
//! around a function's layout that tracks "the next instruction goes
//! here" so a pass can walk a function while inserting around what it
//! finds, without juggling raw block/instruction indices at every call
//! site. Trimmed to the handful of positions this crate's passes actually
//! need (`cranelift-codegen`'s own cursor additionally supports EBB
//! insertion, removal, and a read-only cursor variant, none of which are
//! needed here).

use crate::entities::{Block, Inst};
use crate::function::Function;
use crate::instruction::Instruction;

/// Where a [`FuncCursor`] is positioned.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum CursorPosition {
    /// Not pointing anywhere; no instructions can be inserted.
    Nowhere,
    /// Pointing at an existing instruction. New instructions are
    /// inserted *before* it.
    At(Inst),
    /// Pointing after the end of a block. New instructions are appended.
    After(Block),
}

/// A cursor into one function's layout, used to insert instructions at a
/// tracked position.
pub struct FuncCursor<'f> {
    func: &'f mut Function,
    pos: CursorPosition,
}

impl<'f> FuncCursor<'f> {
    /// Create a cursor into `func`, initially pointing nowhere.
    pub fn new(func: &'f mut Function) -> Self {
        Self {
            func,
            pos: CursorPosition::Nowhere,
        }
    }

    /// Current position.
    pub fn position(&self) -> CursorPosition {
        self.pos
    }

    /// Reposition at `inst`; subsequent inserts land immediately before it.
    pub fn at_inst(mut self, inst: Inst) -> Self {
        self.pos = CursorPosition::At(inst);
        self
    }

    /// Reposition immediately after `inst`; subsequent inserts land
    /// immediately after it (before what *was* the following instruction,
    /// if any — each successive insert still lands right after `inst`,
    /// i.e. inserts accumulate in call order, not reversed).
    pub fn after_inst(mut self, inst: Inst) -> Self {
        let block = self
            .func
            .layout
            .block_of(inst)
            .expect("instruction must be placed in a block");
        self.step_to_just_after(block, inst);
        self
    }

    /// Reposition at the end of `block`; subsequent inserts are appended.
    pub fn at_bottom(mut self, block: Block) -> Self {
        self.pos = CursorPosition::After(block);
        self
    }

    // `after_inst` wants "insert right after this instruction" but our
    // position model only has "before an instruction" or "end of block".
    // Resolve that by finding what (if anything) follows `inst` today.
    fn step_to_just_after(&mut self, block: Block, inst: Inst) {
        let insts: Vec<Inst> = self.func.layout.block_insts(block).collect();
        let idx = insts.iter().position(|&i| i == inst).unwrap();
        self.pos = match insts.get(idx + 1) {
            Some(&next) => CursorPosition::At(next),
            None => CursorPosition::After(block),
        };
    }

    /// Insert `instruction` at the current position, returning its
    /// handle and result value (if any). The cursor's position tracks
    /// "before the instruction that used to be here" when at `At`, so a
    /// sequence of inserts at the same `At(inst)` position come out in
    /// call order, immediately preceding `inst`.
    pub fn insert(&mut self, instruction: Instruction) -> (Inst, Option<crate::entities::Value>) {
        match self.pos {
            CursorPosition::Nowhere => panic!("cursor is not positioned"),
            CursorPosition::At(before) => {
                let block = self
                    .func
                    .layout
                    .block_of(before)
                    .expect("instruction must be placed in a block");
                let (inst, result) = self.func.dfg.make_inst(instruction);
                self.func.layout.insert_inst_before(block, before, inst);
                (inst, result)
            }
            CursorPosition::After(block) => {
                let (inst, result) = self.func.dfg.make_inst(instruction);
                self.func.layout.append_inst(block, inst);
                self.pos = CursorPosition::After(block);
                (inst, result)
            }
        }
    }
}
