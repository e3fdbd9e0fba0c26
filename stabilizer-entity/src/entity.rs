//! Densely numbered entity references.
//!
//! This module defines the `EntityRef` trait, and the `entity_impl!` macro
//! that implements it (plus the usual small-value traits) for a newtype
//! wrapping a `u32`.

use core::u32;

/// A type wrapping a small integer index should implement `EntityRef` so it
/// can be used as the key of a [`PrimaryMap`](crate::PrimaryMap) or
/// [`SecondaryMap`](crate::SecondaryMap).
///
/// The "reference" semantics is important: these indices are meant to be
/// cheap, `Copy`, comparable stand-ins for the objects they index, not
/// owning handles. A `Module` or `Function` arena holds the actual data;
/// everything else refers to it by one of these.
pub trait EntityRef: Copy + Eq {
    /// Create a new entity reference from a small integer.
    ///
    /// This should crash if the requested index is not representable.
    fn new(index: usize) -> Self;

    /// Get the index that was used to create this entity reference.
    fn index(self) -> usize;
}

/// Macro that generates an `EntityRef` implementation for a type, plus the
/// usual derives expected of an entity reference, and a `Display` impl that
/// matches the short, lower-case, numbered style used throughout this
/// crate's textual forms (`v12`, `blk3`, `fn7`, ...).
#[macro_export]
macro_rules! entity_impl {
    // `$entity` gets a `new`/`index` impl, plus a `Display`/`Debug` that
    // renders as `$display_prefixNN`.
    ($entity:ident, $display_prefix:expr) => {
        impl $crate::EntityRef for $entity {
            #[inline]
            fn new(index: usize) -> Self {
                debug_assert!(index < (::core::u32::MAX as usize));
                $entity(index as u32)
            }

            #[inline]
            fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl $entity {
            /// Create a new instance from a `u32`.
            #[allow(dead_code)]
            pub fn from_u32(x: u32) -> Self {
                $entity(x)
            }

            /// Return the underlying index value as a `u32`.
            #[allow(dead_code)]
            pub fn as_u32(self) -> u32 {
                self.0
            }
        }

        impl ::core::fmt::Display for $entity {
            fn fmt(&self, f: &mut ::core::fmt::Formatter) -> ::core::fmt::Result {
                write!(f, "{}{}", $display_prefix, self.0)
            }
        }

        impl ::core::fmt::Debug for $entity {
            fn fmt(&self, f: &mut ::core::fmt::Formatter) -> ::core::fmt::Result {
                (self as &dyn ::core::fmt::Display).fmt(f)
            }
        }
    };
}
