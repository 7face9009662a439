// src/glob/mod.rs

//! Glob patterns over normalized (`/`-separated, relative) paths.
//!
//! - [`pattern`] parses a single [`Glob`], matches paths against it (capturing
//!   named holes such as `out/*(arch)/lib.a`) and substitutes parameter values.
//! - [`overlap`] decides whether two globs can match a common path; this is
//!   the primitive the plan graph infers edges from.
//! - [`set`] holds [`GlobSet`], the sorted union of globs a product consumes
//!   or produces.

pub mod overlap;
pub mod pattern;
pub mod set;

pub use pattern::Glob;
pub use set::GlobSet;
