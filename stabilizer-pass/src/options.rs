//! Configuration surface.
//!
//! The entire config surface for the Stabilizer Transform: three booleans,
//! each defaulting to `false`. Any subset is legal; all-false still runs
//! constructor synthesis and renames `main`, but performs no
//! randomization. Shaped like `cranelift-codegen`'s small option structs
//! (`Flags`-adjacent types): a plain `Debug, Clone, Copy, Default` struct
//! with public fields, no builder, no validation beyond the type system.

/// Which of the three independent randomization facets to run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StabilizeOptions {
    /// Enable heap randomization: retarget the four allocator names to
    /// their `stabilizer_`-prefixed replacements.
    pub stabilize_heap: bool,
    /// Enable stack randomization: bracket every call-site with a
    /// pad-scaled stack adjustment.
    pub stabilize_stack: bool,
    /// Enable code randomization: sentinel placement, float-conversion
    /// extraction, and relocation-table rewriting.
    pub stabilize_code: bool,
}

impl StabilizeOptions {
    /// All three facets enabled.
    pub fn all() -> Self {
        Self {
            stabilize_heap: true,
            stabilize_stack: true,
            stabilize_code: true,
        }
    }

    /// Does this configuration require anything beyond the constructor
    /// rename of `main`? Used to decide whether stack-only pad
    /// registration is reachable.
    pub fn any(&self) -> bool {
        self.stabilize_heap || self.stabilize_stack || self.stabilize_code
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_all_false() {
        let opts = StabilizeOptions::default();
        assert!(!opts.stabilize_heap);
        assert!(!opts.stabilize_stack);
        assert!(!opts.stabilize_code);
        assert!(!opts.any());
    }

    #[test]
    fn all_enables_everything() {
        assert!(StabilizeOptions::all().any());
    }
}
