// src/exec/mod.rs

//! Process execution layer.
//!
//! This module runs the tool commands behind each product's actions, using
//! `tokio::process::Command`, and reports back to the cooking engine.
//!
//! - [`settings`] holds [`ChefSettings`] merged from plan files.
//! - [`action_runner`] runs one product's actions as shell processes.
//! - [`chef`] provides [`ProcessChef`], the production [`Chef`](crate::plan::Chef).
//! - [`bake`](mod@bake) cooks a whole recipe and collects a [`BakeReport`].

pub mod action_runner;
pub mod bake;
pub mod chef;
pub mod settings;

pub use bake::{BakeReport, bake};
pub use chef::ProcessChef;
pub use settings::ChefSettings;
