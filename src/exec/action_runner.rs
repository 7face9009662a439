// src/exec/action_runner.rs

//! Running one product's actions as shell processes.

use std::path::Path;
use std::process::Stdio;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tracing::{debug, error, info, warn};

use crate::exec::ChefSettings;
use crate::glob::GlobSet;
use crate::product::{Action, Product};

/// Run every action of `product` in order, stopping at the first failure.
///
/// Spawn errors are logged and count as failures.
pub async fn cook_product(product: &Product, settings: &ChefSettings) -> bool {
    for (index, action) in product.actions.iter().enumerate() {
        match run_action(product, action, settings).await {
            Ok(true) => {}
            Ok(false) => return false,
            Err(err) => {
                error!(
                    product = %product.name,
                    tool = %action.tool,
                    action = index + 1,
                    error = %err,
                    "action execution error"
                );
                return false;
            }
        }
    }
    true
}

/// Run a single action and report whether it exited successfully.
pub async fn run_action(product: &Product, action: &Action, settings: &ChefSettings) -> Result<bool> {
    let command_line = settings.command_for(&action.tool);
    info!(
        product = %product.name,
        tool = %action.tool,
        cmd = %command_line,
        "starting action"
    );

    let mut cmd = Command::new(&settings.shell);
    cmd.arg(settings.shell_flag())
        .arg(&command_line)
        .env("BAKE_PRODUCT", product.name.as_str())
        .env("BAKE_TOOL", &action.tool)
        .env("BAKE_INPUTS", join_globs(&action.inputs))
        .env("BAKE_OUTPUTS", join_globs(&action.outputs))
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    for (key, value) in &action.options {
        cmd.env(option_env_name(key), option_env_value(value));
    }
    if let Some(dir) = working_dir(&product.source.file) {
        cmd.current_dir(dir);
    }

    let mut child = cmd
        .spawn()
        .with_context(|| format!("spawning tool '{}' for product '{}'", action.tool, product.name))?;

    if let Some(stdout) = child.stdout.take() {
        forward_lines(stdout, product.name.to_string(), "stdout");
    }
    if let Some(stderr) = child.stderr.take() {
        forward_lines(stderr, product.name.to_string(), "stderr");
    }

    let status = match settings.action_timeout {
        None => child.wait().await,
        Some(limit) => match tokio::time::timeout(limit, child.wait()).await {
            Ok(status) => status,
            Err(_) => {
                warn!(
                    product = %product.name,
                    tool = %action.tool,
                    timeout_ms = limit.as_millis() as u64,
                    "action timed out; killing process"
                );
                if let Err(e) = child.kill().await {
                    warn!(product = %product.name, error = %e, "failed to kill timed out process");
                }
                return Ok(false);
            }
        },
    }
    .with_context(|| format!("waiting for tool '{}' of product '{}'", action.tool, product.name))?;

    let code = status.code().unwrap_or(-1);
    info!(
        product = %product.name,
        tool = %action.tool,
        exit_code = code,
        success = status.success(),
        "action exited"
    );
    Ok(status.success())
}

/// Consume a child stream so its buffer never fills, logging each line.
fn forward_lines<R>(stream: R, product: String, which: &'static str)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(stream).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            debug!(product = %product, "{which}: {line}");
        }
    });
}

fn join_globs(globs: &GlobSet) -> String {
    globs.iter().map(|g| g.as_str()).collect::<Vec<_>>().join(" ")
}

/// `BAKE_OPT_` plus the key upper-cased, with anything but ASCII
/// alphanumerics replaced by `_`.
pub fn option_env_name(key: &str) -> String {
    let mangled: String = key
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_uppercase() } else { '_' })
        .collect();
    format!("BAKE_OPT_{mangled}")
}

/// Strings are passed raw; other values as TOML text.
pub fn option_env_value(value: &toml::Value) -> String {
    match value {
        toml::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn working_dir(plan_file: &Path) -> Option<&Path> {
    plan_file.parent().filter(|p| !p.as_os_str().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn option_names_are_mangled() {
        assert_eq!(option_env_name("flags"), "BAKE_OPT_FLAGS");
        assert_eq!(option_env_name("opt-level.x"), "BAKE_OPT_OPT_LEVEL_X");
    }

    #[test]
    fn option_values_keep_strings_raw() {
        assert_eq!(option_env_value(&toml::Value::String("-O2".into())), "-O2");
        assert_eq!(option_env_value(&toml::Value::Integer(3)), "3");
        assert_eq!(option_env_value(&toml::Value::Boolean(true)), "true");
    }

    #[test]
    fn working_dir_is_plan_file_parent() {
        assert_eq!(working_dir(Path::new("Bakefile.toml")), None);
        assert_eq!(working_dir(Path::new("sub/Bakefile.toml")), Some(Path::new("sub")));
    }
}
