//! Densely numbered entity references.
//!
//! This crate provides the small building blocks shared by the rest of the
//! workspace: a way to name things in a `Module` or `Function` (functions,
//! blocks, instructions, values, globals, constants) with cheap `Copy`
//! handles backed by a `u32` index, instead of Rust references or owning
//! pointers. See [`EntityRef`] for the trait these handles implement and
//! [`entity_impl!`] for the macro that generates one.

#![deny(missing_docs)]

mod entity;
mod iter;
mod keys;
mod map;
pub mod packed_option;

pub use crate::entity::EntityRef;
pub use crate::iter::{Iter, IterMut};
pub use crate::keys::Keys;
pub use crate::map::{PrimaryMap, SecondaryMap};
pub use crate::packed_option::PackedOption;
