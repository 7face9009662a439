// src/product/mod.rs

//! Immutable value objects describing buildable units.
//!
//! - [`name`]: [`BoundName`], a product identifier plus sorted parameter
//!   bindings with a canonical string form (`foo["x":"bar"]`).
//! - [`relation`]: [`GlobRelation`], the input/output glob pair plus declared
//!   parameters, and the substitution that turns an abstract relation into a
//!   concrete [`Solution`].
//! - [`model`]: [`Product`] and [`Action`] as declared by plan files.

pub mod model;
pub mod name;
pub mod relation;

pub use model::{Action, Product, SourceLocation};
pub use name::BoundName;
pub use relation::{GlobRelation, Param, Solution};
