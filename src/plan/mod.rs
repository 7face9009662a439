// src/plan/mod.rs

//! Product dependency graph, recipe compilation and cooking.
//!
//! - [`graph`] holds the immutable [`PlanGraph`] snapshot and its builder.
//! - [`grapher`] maintains the live graph as product declarations change.
//! - [`recipe`] compiles targets into a cycle-checked [`Recipe`].
//! - [`cook`] drives a recipe to completion against a [`Chef`].

pub mod cook;
pub mod graph;
pub mod grapher;
pub mod recipe;

pub use cook::{Chef, WhenDone};
pub use graph::{PlanGraph, PlanGraphBuilder};
pub use grapher::{PlanGrapher, SourceUpdate};
pub use recipe::{Ingredient, Recipe};
