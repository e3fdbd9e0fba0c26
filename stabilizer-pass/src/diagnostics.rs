//! Diagnostic output for non-fatal conditions: warned, transformation
//! continues.
//!
//! A thin wrapper over `log::warn!` rather than bare `eprintln!`, matching
//! how `cranelift-codegen`/`cranelift-frontend` report non-fatal
//! conditions. Kept as named functions (not macro call sites scattered
//! through the passes) so the wording for each diagnosed condition lives
//! in one place.

/// An intrinsic had no entry in the intrinsic→libcall table. The
/// intrinsic is left in place; this is the only warning path in
/// Intrinsic Lowering.
pub fn unmapped_intrinsic(name: &str) {
    log::warn!("no libcall mapping for intrinsic `{name}`; leaving it in place");
}
