//! Fatal error conditions.
//!
//! Everything the pass can recover from (an unmapped intrinsic, a
//! constant that doesn't reference a global) is handled in place and
//! never reaches this type. `StabilizerError` covers only invariant
//! violations severe enough to be fatal: malformed input the passes
//! cannot meaningfully repair. Grounded on the migration this whole
//! corpus has already made from `failure`/`failure_derive` (what
//! `cranelift-codegen` uses) to `thiserror` (what this pack's newer
//! crates use for the same "enum of causes with a derived `Display`"
//! shape) — see `DESIGN.md`.

use stabilizer_ir::{AnyEntity, Inst};
use thiserror::Error;

/// A fatal, unrecoverable condition encountered while transforming a
/// module. Every pass entry point (`lower_intrinsics`, `stabilize`)
/// returns `Result<(), StabilizerError>`; library-internal helper
/// functions propagate these with `?` and never panic directly, so the
/// single place that turns this into a process abort (print a
/// diagnostic then terminate) is the outermost call in a driver, not
/// buried in pass internals.
#[derive(Error, Debug)]
pub enum StabilizerError {
    /// A recorded global-reference use's owning instruction was not an
    /// ordinary instruction operand slot — cannot happen in well-formed
    /// IR. Surfaced as an error rather than a panic so a malformed
    /// module fails predictably instead of corrupting output.
    #[error("use of {entity} in {inst} is not a valid rewrite target")]
    InvalidRewriteTarget { entity: AnyEntity, inst: Inst },

    /// The float-conversion-extraction helper was asked to synthesize a
    /// converter for an opcode it does not recognize.
    #[error("unrecognized float conversion opcode on {inst}")]
    UnrecognizedConversion { inst: Inst },

    /// A relocation-table rewrite tried to insert a load for a PHI
    /// incoming value whose predecessor block has no terminator yet — a
    /// load must never precede a PHI within the same block, so this
    /// indicates the function was not well-formed when code
    /// randomization ran.
    #[error("block {0} has no terminator to insert a PHI-edge load before")]
    MissingTerminator(stabilizer_ir::Block),
}
