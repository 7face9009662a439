// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::model::{PlanFile, RawPlanFile};
use crate::errors::Result;

/// Read and deserialize a plan file without semantic validation.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawPlanFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let plan: RawPlanFile = toml::from_str(&contents)?;

    Ok(plan)
}

/// Read a plan file and validate it into products.
///
/// Every product's source location points back at `path`.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<PlanFile> {
    let path = path.as_ref();
    let raw = load_from_path(path)?;
    let plan = PlanFile::try_from((raw, path))?;
    debug!(
        file = %path.display(),
        products = plan.products.len(),
        tools = plan.tools.len(),
        "plan file loaded"
    );
    Ok(plan)
}

/// `Bakefile.toml` in the current working directory.
pub fn default_plan_path() -> PathBuf {
    PathBuf::from("Bakefile.toml")
}
