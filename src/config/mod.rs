// src/config/mod.rs

//! Plan files: the TOML surface through which products are declared.
//!
//! - `model.rs` is the serde data model plus the validated [`PlanFile`].
//! - `loader.rs` reads plan files from disk.
//! - `validate.rs` turns raw sections into [`Product`](crate::product::Product)s.

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_plan_path, load_and_validate, load_from_path};
pub use model::{
    ActionConfig, ConfigSection, ParamConfig, PlanFile, PlanSettings, ProductConfig, RawPlanFile,
    ToolConfig,
};
pub use validate::parse_duration;
