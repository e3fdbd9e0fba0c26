//! Code Randomization, the largest of the four sub-passes. Composed of
//! several sub-steps applied in order, one function's worth at a time:
//!
//! - [`sentinel`] — sentinel placement and normalization.
//! - [`floatconv`] — conversion/float-literal extraction.
//! - [`relocation`] — collection, table build, rewrite, and
//!   registration-tuple emission.

pub mod floatconv;
pub mod relocation;
pub mod sentinel;

use crate::error::StabilizerError;
pub use relocation::Registration;
use stabilizer_ir::{Architecture, Func, Module};

/// Run Code Randomization over every randomizable function present when
/// this pass begins. The snapshot is taken once, up front, so
/// sentinels/converters synthesized along the way are never themselves
/// treated as randomization targets.
pub fn randomize_code(module: &mut Module) -> Result<Vec<Registration>, StabilizerError> {
    let architecture = module.architecture();
    let candidates: Vec<Func> = module
        .snapshot_functions()
        .into_iter()
        .filter(|&f| module.function(f).is_randomizable())
        .collect();

    let mut converters = floatconv::Converters::new();
    let mut registrations = Vec::with_capacity(candidates.len());

    for func in candidates {
        let sentinel_fn = sentinel::create(module, func);
        sentinel::normalize(module, func);
        floatconv::extract(module, func, architecture, &mut converters)?;
        let registration = relocation::collect_and_rewrite(module, func, sentinel_fn, architecture);
        registrations.push(registration);
    }

    Ok(registrations)
}
