//! Runtime re-randomization IR transform.
//!
//! Two independent entry points, each a pure function over a `Module`:
//!
//! - [`lower_intrinsics`] — Intrinsic Lowering, typically run once, early,
//!   ahead of any other pass in the pipeline.
//! - [`stabilize`] — the Stabilizer transform itself: heap, stack, and
//!   code randomization, gated independently by [`StabilizeOptions`],
//!   followed unconditionally by module constructor synthesis and the
//!   `main` rename.

pub mod code;
pub mod ctor;
pub mod diagnostics;
pub mod error;
pub mod heap;
pub mod intrinsics;
pub mod options;
pub mod registry;
pub mod rewrite;
pub mod runtime_decls;
pub mod stack;

pub use crate::error::StabilizerError;
pub use crate::options::StabilizeOptions;
pub use code::Registration;

use stabilizer_ir::Module;

/// Run Intrinsic Lowering over `module`. Safe to run independently of
/// [`stabilize`], and typically run before it so that no
/// compiler-intrinsic call sites remain for the relocation-table scan
/// in code randomization to trip over.
pub fn lower_intrinsics(module: &mut Module) {
    intrinsics::lower_intrinsics(module);
}

/// Run the Stabilizer transform over `module`: heap, then stack, then
/// code randomization — each reading its own up-front snapshot of
/// locally-defined functions so synthesized functions never become
/// targets of a later sub-pass — followed unconditionally by
/// constructor synthesis and the `main` rename, regardless of which
/// facets were enabled.
pub fn stabilize(module: &mut Module, options: StabilizeOptions) -> Result<(), StabilizerError> {
    if options.stabilize_heap {
        heap::randomize_heap(module);
    }

    let pads = if options.stabilize_stack {
        stack::randomize_stack(module)
    } else {
        stack::StackPads::new()
    };

    let registrations = if options.stabilize_code {
        code::randomize_code(module)?
    } else {
        Vec::new()
    };

    ctor::synthesize(module, options, &registrations, &pads);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use stabilizer_ir::{DataLayout, Function, Linkage, Signature, Type};

    #[test]
    fn all_disabled_still_synthesizes_constructor_and_renames_main() {
        let mut module = Module::new("x86_64-unknown-linux-gnu", DataLayout::new_64bit());
        module.declare_function(Function::define(
            "main",
            Signature::new(vec![], Type::I32),
            Linkage::External,
        ));

        stabilize(&mut module, StabilizeOptions::default()).expect("stabilize succeeds");

        assert!(module.find_function("stabilizer_main").is_some());
        assert_eq!(module.global_ctors.len(), 1);
        assert_eq!(module.global_ctors[0].priority, 65535);
    }

    #[test]
    fn all_enabled_on_empty_module_succeeds() {
        let mut module = Module::new("x86_64-unknown-linux-gnu", DataLayout::new_64bit());
        let result = stabilize(&mut module, StabilizeOptions::all());
        assert!(result.is_ok());
        assert_eq!(module.global_ctors.len(), 1);
    }
}
