//! Pass registration surface.
//!
//! The actual plugin-loading mechanism a host compiler uses to discover a
//! pass by name is a driver concern this crate doesn't own; what it does
//! own is the two pipeline names themselves and a small trait a
//! pass-manager host can dispatch through, grounded on how
//! `cranelift-codegen` exposes `legalize_function`/`verify_function` as
//! plain free functions re-exported from its crate root for exactly this
//! kind of external caller, rather than by inventing a `dyn`-based plugin
//! ABI this crate has no driver to exercise.

use crate::error::StabilizerError;
use crate::options::StabilizeOptions;
use stabilizer_ir::Module;

/// Pipeline name for Intrinsic Lowering.
pub const LOWER_INTRINSICS: &str = "lower-intrinsics";
/// Pipeline name for the Stabilizer Transform.
pub const STABILIZE: &str = "stabilize";

/// A module-level pass a host can look up by name and run.
///
/// Mirrors the two free functions re-exported from this crate's root
/// (`lower_intrinsics`, `stabilize`); implemented here as a trait only so
/// a pass-manager host can hold a `Vec<Box<dyn ModulePass>>` keyed by
/// [`ModulePass::name`] instead of matching on pipeline name strings at
/// every call site.
pub trait ModulePass {
    /// This pass's pipeline name, one of [`LOWER_INTRINSICS`]/[`STABILIZE`].
    fn name(&self) -> &'static str;

    /// Run the pass over `module` in place.
    fn run(&self, module: &mut Module) -> Result<(), StabilizerError>;
}

/// The `lower-intrinsics` pipeline entry.
#[derive(Debug, Clone, Copy, Default)]
pub struct LowerIntrinsicsPass;

impl ModulePass for LowerIntrinsicsPass {
    fn name(&self) -> &'static str {
        LOWER_INTRINSICS
    }

    fn run(&self, module: &mut Module) -> Result<(), StabilizerError> {
        crate::lower_intrinsics(module);
        Ok(())
    }
}

/// The `stabilize` pipeline entry, parameterized by the three boolean
/// options of [`StabilizeOptions`].
#[derive(Debug, Clone, Copy, Default)]
pub struct StabilizePass {
    /// Which of heap/stack/code randomization to run.
    pub options: StabilizeOptions,
}

impl ModulePass for StabilizePass {
    fn name(&self) -> &'static str {
        STABILIZE
    }

    fn run(&self, module: &mut Module) -> Result<(), StabilizerError> {
        crate::stabilize(module, self.options)
    }
}

/// The two passes this crate registers, in pipeline-name order, for a
/// host that wants to enumerate rather than name a specific one.
pub fn all_passes(options: StabilizeOptions) -> Vec<Box<dyn ModulePass>> {
    vec![
        Box::new(LowerIntrinsicsPass),
        Box::new(StabilizePass { options }),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use stabilizer_ir::DataLayout;

    #[test]
    fn pass_names_match_pipeline_constants() {
        assert_eq!(LowerIntrinsicsPass.name(), "lower-intrinsics");
        assert_eq!(StabilizePass::default().name(), "stabilize");
    }

    #[test]
    fn all_passes_run_in_order() {
        let mut module = Module::new("x86_64-unknown-linux-gnu", DataLayout::new_64bit());
        for pass in all_passes(StabilizeOptions::all()) {
            pass.run(&mut module).expect("pass succeeds");
        }
        assert_eq!(module.global_ctors.len(), 1);
    }
}
