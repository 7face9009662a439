// src/config/model.rs

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::product::Product;

/// A plan file exactly as read from TOML.
///
/// ```toml
/// [config]
/// jobs = 4
/// action_timeout = "30s"
///
/// [tool.cc]
/// cmd = "cc -c $BAKE_INPUTS"
///
/// [product.lib]
/// intermediate = true
///
/// [[product.lib.action]]
/// tool = "cc"
/// inputs = ["src/**.c"]
/// outputs = ["out/**.o"]
/// ```
///
/// Every section is optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawPlanFile {
    #[serde(default)]
    pub config: ConfigSection,

    /// `[tool.<name>]` sections.
    #[serde(default)]
    pub tool: BTreeMap<String, ToolConfig>,

    /// `[product.<name>]` sections, keyed by product name.
    #[serde(default)]
    pub product: BTreeMap<String, ProductConfig>,
}

/// `[config]` section. Unset fields fall back to other plan files or to
/// built-in defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigSection {
    /// Maximum number of products built at once.
    #[serde(default)]
    pub jobs: Option<usize>,

    /// Per-action timeout such as `"500ms"`, `"30s"`, `"5m"` or `"1h"`.
    #[serde(default)]
    pub action_timeout: Option<String>,

    /// Shell used to run tool commands.
    #[serde(default)]
    pub shell: Option<String>,
}

/// `[tool.<name>]` section.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct ToolConfig {
    /// Command line run for every action using this tool. Defaults to the
    /// tool name.
    #[serde(default)]
    pub cmd: Option<String>,

    #[serde(default)]
    pub help: Option<String>,
}

/// `[product.<name>]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductConfig {
    #[serde(default)]
    pub help: Option<String>,

    /// Product inputs; the union of action inputs when omitted.
    #[serde(default)]
    pub inputs: Option<Vec<String>>,

    /// Product outputs; the union of action outputs when omitted.
    #[serde(default)]
    pub outputs: Option<Vec<String>>,

    #[serde(default)]
    pub intermediate: bool,

    /// `[[product.<name>.action]]` entries, run in order.
    #[serde(default, rename = "action")]
    pub actions: Vec<ActionConfig>,

    /// `[[product.<name>.param]]` entries.
    #[serde(default, rename = "param")]
    pub params: Vec<ParamConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ActionConfig {
    pub tool: String,

    #[serde(default)]
    pub inputs: Vec<String>,

    #[serde(default)]
    pub outputs: Vec<String>,

    #[serde(default)]
    pub options: BTreeMap<String, toml::Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ParamConfig {
    pub name: String,

    /// Allowed values; any value is accepted when omitted.
    #[serde(default)]
    pub values: Option<Vec<String>>,

    #[serde(default)]
    pub default: Option<String>,
}

/// `[config]` after validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlanSettings {
    pub jobs: Option<usize>,
    pub action_timeout: Option<Duration>,
    pub shell: Option<String>,
}

/// A validated plan file.
#[derive(Debug, Clone)]
pub struct PlanFile {
    pub path: PathBuf,
    pub settings: PlanSettings,
    pub tools: BTreeMap<String, ToolConfig>,
    pub products: Vec<Product>,
}
