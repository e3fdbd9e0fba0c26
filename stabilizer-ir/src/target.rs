//! Target classification.
//!
//! Grounded on `cranelift-codegen::isa`'s pattern of classifying a target
//! triple into a small closed set of architecture families, and reusing
//! `target-lexicon` (a direct `cranelift-codegen` dependency) to do the
//! actual triple parsing rather than hand-rolling a string match.

use target_lexicon::{Architecture as LexiconArch, Triple};

/// The architecture families this transform distinguishes. Everything
/// that isn't one of the two named ISAs is treated as "other", which is
/// classified the same as x86-64 for addressing-mode purposes (see
/// [`Architecture::uses_pc_relative_data`]).
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Architecture {
    /// 64-bit x86.
    X86_64,
    /// 32-bit x86.
    X86_32,
    /// PowerPC, any width.
    PowerPc,
    /// Any other target. Treated as x86-64-like for data addressing.
    Other,
}

impl Architecture {
    /// Classify a target triple string (e.g. `"x86_64-unknown-linux-gnu"`).
    /// An unparseable triple is classified as [`Architecture::Other`]
    /// rather than rejected.
    pub fn classify(triple: &str) -> Self {
        match triple.parse::<Triple>() {
            Ok(t) => Self::from_lexicon(t.architecture),
            Err(_) => Architecture::Other,
        }
    }

    fn from_lexicon(arch: LexiconArch) -> Self {
        match arch {
            LexiconArch::X86_64 => Architecture::X86_64,
            LexiconArch::X86_32(_) => Architecture::X86_32,
            LexiconArch::Powerpc | LexiconArch::Powerpc64 | LexiconArch::Powerpc64le => {
                Architecture::PowerPc
            }
            _ => Architecture::Other,
        }
    }

    /// Does this target reach module-level data through PC-relative
    /// addressing? True on x86-64 and on unknown targets (a deliberately
    /// preserved fallback assumption — see `DESIGN.md`); false on
    /// x86-32 and PowerPC.
    pub fn uses_pc_relative_data(self) -> bool {
        !matches!(self, Architecture::X86_32 | Architecture::PowerPc)
    }

    /// Does this target additionally need the float-truncate instruction
    /// extracted into a converter call? Only PowerPC's ABI makes an
    /// in-place `fptrunc` risk emitting a hidden constant-pool reference.
    pub fn extracts_float_truncate(self) -> bool {
        matches!(self, Architecture::PowerPc)
    }
}

/// Pointer-width data layout, taken from the module's target descriptor.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct DataLayout {
    /// Pointer width in bits: 32 or 64.
    pub pointer_bits: u32,
}

impl DataLayout {
    /// Data layout for a 64-bit pointer width.
    pub fn new_64bit() -> Self {
        Self { pointer_bits: 64 }
    }

    /// Data layout for a 32-bit pointer width.
    pub fn new_32bit() -> Self {
        Self { pointer_bits: 32 }
    }

    /// Pointer width in bytes (4 or 8).
    pub fn pointer_bytes(&self) -> u32 {
        self.pointer_bits / 8
    }

    /// The pointer-sized integer type, used to build the stack-pad
    /// address arithmetic.
    pub fn pointer_int_type(&self) -> crate::types::Type {
        if self.pointer_bits == 32 {
            crate::types::Type::I32
        } else {
            crate::types::Type::I64
        }
    }
}
