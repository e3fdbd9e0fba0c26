//! Block and instruction layout.
//!
//! Grounded on `cranelift-codegen::ir::Layout` (referenced throughout
//! `cursor.rs`/`function.rs`): the layout is the *sole* owner of block
//! existence and of the order blocks and instructions appear in, kept
//! separate from the `DataFlowGraph`, which owns instruction and value
//! *data*. `cranelift-codegen` backs its layout with an intrusive
//! doubly linked list so arbitrary-position insertion is O(1) without
//! invalidating other handles; our functions are short instrumentation
//! snippets rather than compiled machine functions, so a plain
//! `Vec<Inst>` per block (and a plain `Vec<Block>` for block order)
//! gives the same semantics at a simpler implementation cost — noted in
//! `DESIGN.md`. Entity handles (`Block`, `Inst`) stay stable across
//! reordering either way, since they index into the `DataFlowGraph`'s
//! arenas, not into these order vectors.

use crate::entities::{Block, Inst};
use stabilizer_entity::PrimaryMap;

/// The blocks that exist in a function, in emission order, and the
/// instruction order within each.
#[derive(Clone, Default)]
pub struct Layout {
    blocks: PrimaryMap<Block, Vec<Inst>>,
    order: Vec<Block>,
}

impl Layout {
    /// Create an empty layout.
    pub fn new() -> Self {
        Self {
            blocks: PrimaryMap::new(),
            order: Vec::new(),
        }
    }

    /// Append a new, empty block to the end of the function.
    pub fn append_block(&mut self) -> Block {
        let b = self.blocks.push(Vec::new());
        self.order.push(b);
        b
    }

    /// Blocks in layout order.
    pub fn blocks(&self) -> impl Iterator<Item = Block> + '_ {
        self.order.iter().copied()
    }

    /// The entry block, if the function has any blocks.
    pub fn entry_block(&self) -> Option<Block> {
        self.order.first().copied()
    }

    /// Instructions in a block, in layout order.
    pub fn block_insts(&self, block: Block) -> impl Iterator<Item = Inst> + '_ {
        self.blocks[block].iter().copied()
    }

    /// Append an instruction to the end of a block.
    pub fn append_inst(&mut self, block: Block, inst: Inst) {
        self.blocks[block].push(inst);
    }

    /// Insert `inst` immediately before `before`, which must already be
    /// placed in `block`.
    pub fn insert_inst_before(&mut self, block: Block, before: Inst, inst: Inst) {
        let insts = &mut self.blocks[block];
        let pos = insts
            .iter()
            .position(|&i| i == before)
            .expect("`before` must already be placed in `block`");
        insts.insert(pos, inst);
    }

    /// Insert `inst` immediately after `after`, which must already be
    /// placed in `block`.
    pub fn insert_inst_after(&mut self, block: Block, after: Inst, inst: Inst) {
        let insts = &mut self.blocks[block];
        let pos = insts
            .iter()
            .position(|&i| i == after)
            .expect("`after` must already be placed in `block`");
        insts.insert(pos + 1, inst);
    }

    /// The last instruction in a block (its terminator, once the
    /// function is well-formed).
    pub fn last_inst(&self, block: Block) -> Option<Inst> {
        self.blocks[block].last().copied()
    }

    /// Find the block a given instruction is placed in.
    pub fn block_of(&self, inst: Inst) -> Option<Block> {
        self.blocks
            .iter()
            .find(|(_, insts)| insts.contains(&inst))
            .map(|(b, _)| b)
    }
}
