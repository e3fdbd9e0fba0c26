//! A packed representation of `Option<T>` for types with a reserved niche.
//!
//! `Option<Value>` is twice as large as `Value` because the discriminant
//! needs its own byte. `PackedOption` instead reserves `T`'s largest
//! representable index as the "none" sentinel, so it stays the same size
//! as `T` itself. Use this in compact, frequently-allocated data
//! structures (instruction operands, relocation-table slots); prefer the
//! plain `Option<T>` everywhere else, since `PackedOption` cannot
//! represent a reference to the entity at the reserved sentinel index.

use crate::EntityRef;
use core::fmt;
use core::u32;

/// Optional `T` reference represented as packed `T` with a reserved value
/// for `None`.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PackedOption<T: EntityRef>(T);

impl<T: EntityRef> Default for PackedOption<T> {
    fn default() -> Self {
        Self(T::new(u32::MAX as usize))
    }
}

impl<T: EntityRef> PackedOption<T> {
    /// Returns `true` if this packed option is a `None` value.
    pub fn is_none(self) -> bool {
        self.0.index() == u32::MAX as usize
    }

    /// Returns `true` if this packed option is a `Some` value.
    pub fn is_some(self) -> bool {
        !self.is_none()
    }

    /// Expand the packed option into a normal `Option`.
    pub fn expand(self) -> Option<T> {
        if self.is_none() {
            None
        } else {
            Some(self.0)
        }
    }

    /// Unwrap a packed `Some` value, or panic.
    pub fn unwrap(self) -> T {
        self.expand().expect("`PackedOption` is `None`")
    }
}

impl<T: EntityRef> From<T> for PackedOption<T> {
    fn from(t: T) -> Self {
        Self(t)
    }
}

impl<T: EntityRef> From<Option<T>> for PackedOption<T> {
    fn from(opt: Option<T>) -> Self {
        match opt {
            Some(t) => Self(t),
            None => Self::default(),
        }
    }
}

impl<T: EntityRef + fmt::Debug> fmt::Debug for PackedOption<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.expand() {
            None => write!(f, "None"),
            Some(t) => t.fmt(f),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity_impl;

    #[derive(Clone, Copy, PartialEq, Eq, Hash)]
    struct E(u32);
    entity_impl!(E, "e");

    #[test]
    fn roundtrip() {
        let packed: PackedOption<E> = Some(E::new(3)).into();
        assert!(packed.is_some());
        assert_eq!(packed.expand(), Some(E::new(3)));

        let none: PackedOption<E> = None.into();
        assert!(none.is_none());
        assert_eq!(none.expand(), None);
    }

    #[test]
    fn same_size_as_entity() {
        assert_eq!(
            core::mem::size_of::<E>(),
            core::mem::size_of::<PackedOption<E>>()
        );
    }
}
