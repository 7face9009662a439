// src/config/validate.rs

use std::collections::BTreeSet;
use std::fmt::Display;
use std::path::Path;
use std::time::Duration;

use crate::config::model::{
    ActionConfig, ConfigSection, ParamConfig, PlanFile, PlanSettings, ProductConfig, RawPlanFile,
};
use crate::errors::{BakeError, Result};
use crate::glob::GlobSet;
use crate::glob::pattern::is_identifier;
use crate::product::{Action, BoundName, GlobRelation, Param, Product, SourceLocation};

impl TryFrom<(RawPlanFile, &Path)> for PlanFile {
    type Error = BakeError;

    fn try_from((raw, path): (RawPlanFile, &Path)) -> std::result::Result<Self, Self::Error> {
        let settings = validate_settings(&raw.config)?;
        validate_tools(&raw)?;

        let products = raw
            .product
            .iter()
            .map(|(key, cfg)| build_product(path, key, cfg))
            .collect::<Result<Vec<_>>>()?;

        Ok(PlanFile {
            path: path.to_path_buf(),
            settings,
            tools: raw.tool,
            products,
        })
    }
}

fn config_error(product: &str, err: impl Display) -> BakeError {
    BakeError::ConfigError(format!("product '{product}': {err}"))
}

fn validate_settings(cfg: &ConfigSection) -> Result<PlanSettings> {
    if cfg.jobs == Some(0) {
        return Err(BakeError::ConfigError(
            "[config].jobs must be >= 1 (got 0)".to_string(),
        ));
    }

    if let Some(shell) = &cfg.shell {
        if shell.trim().is_empty() {
            return Err(BakeError::ConfigError(
                "[config].shell must not be empty".to_string(),
            ));
        }
    }

    let action_timeout = cfg
        .action_timeout
        .as_deref()
        .map(|s| {
            parse_duration(s)
                .map_err(|e| BakeError::ConfigError(format!("[config].action_timeout: {e}")))
        })
        .transpose()?;

    Ok(PlanSettings {
        jobs: cfg.jobs,
        action_timeout,
        shell: cfg.shell.clone(),
    })
}

fn validate_tools(raw: &RawPlanFile) -> Result<()> {
    for (name, tool) in raw.tool.iter() {
        if name.trim().is_empty() {
            return Err(BakeError::ConfigError("tool names must not be empty".to_string()));
        }
        if tool.cmd.as_deref().is_some_and(|c| c.trim().is_empty()) {
            return Err(BakeError::ConfigError(format!(
                "tool '{name}' has an empty `cmd`"
            )));
        }
    }
    Ok(())
}

fn build_product(path: &Path, key: &str, cfg: &ProductConfig) -> Result<Product> {
    let name = BoundName::parse(key).map_err(|e| config_error(key, e))?;

    let actions = cfg
        .actions
        .iter()
        .enumerate()
        .map(|(i, a)| build_action(a).map_err(|e| config_error(key, format!("action #{}: {e}", i + 1))))
        .collect::<Result<Vec<_>>>()?;

    let inputs = match &cfg.inputs {
        Some(globs) => GlobSet::parse(globs).map_err(|e| config_error(key, e))?,
        None => actions.iter().fold(GlobSet::default(), |acc, a| acc.union(&a.inputs)),
    };
    let outputs = match &cfg.outputs {
        Some(globs) => GlobSet::parse(globs).map_err(|e| config_error(key, e))?,
        None => actions.iter().fold(GlobSet::default(), |acc, a| acc.union(&a.outputs)),
    };

    let params = cfg
        .params
        .iter()
        .map(build_param)
        .collect::<Result<Vec<_>>>()
        .map_err(|e| config_error(key, e))?;

    let relation = GlobRelation::new(inputs, outputs, params).map_err(|e| config_error(key, e))?;

    Ok(Product {
        name,
        help: cfg.help.clone(),
        relation,
        actions,
        intermediate: cfg.intermediate,
        source: SourceLocation::new(path, key),
    })
}

fn build_action(cfg: &ActionConfig) -> Result<Action> {
    if cfg.tool.trim().is_empty() {
        return Err(BakeError::ConfigError("`tool` must not be empty".to_string()));
    }
    Ok(Action {
        tool: cfg.tool.clone(),
        inputs: GlobSet::parse(&cfg.inputs)?,
        outputs: GlobSet::parse(&cfg.outputs)?,
        options: cfg.options.clone(),
    })
}

fn build_param(cfg: &ParamConfig) -> Result<Param> {
    if !is_identifier(&cfg.name) {
        return Err(BakeError::InvalidParameters(format!(
            "'{}' is not a valid parameter name",
            cfg.name
        )));
    }
    Ok(Param {
        name: cfg.name.clone(),
        allowed_values: cfg
            .values
            .as_ref()
            .map(|values| values.iter().cloned().collect::<BTreeSet<_>>()),
        default: cfg.default.clone(),
    })
}

/// Parse a duration such as `"250ms"`, `"3s"`, `"1m"` or `"2h"`.
pub fn parse_duration(s: &str) -> std::result::Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty duration string".to_string());
    }

    let idx = s
        .chars()
        .position(|c| !c.is_ascii_digit())
        .ok_or_else(|| "duration missing unit suffix".to_string())?;

    let (num_part, unit_part) = s.split_at(idx);
    let value: u64 = num_part
        .parse()
        .map_err(|e| format!("invalid duration number '{num_part}': {e}"))?;
    let unit = unit_part.trim().to_lowercase();

    match unit.as_str() {
        "ms" => Ok(Duration::from_millis(value)),
        "s" => Ok(Duration::from_secs(value)),
        "m" => Ok(Duration::from_secs(value * 60)),
        "h" => Ok(Duration::from_secs(value * 60 * 60)),
        _ => Err(format!(
            "unsupported duration unit '{unit}'; expected ms, s, m, or h"
        )),
    }
}
