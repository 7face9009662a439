// src/exec/settings.rs

use std::collections::BTreeMap;
use std::time::Duration;

use crate::config::{PlanFile, ToolConfig};

/// Everything the process chef needs besides the recipe itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChefSettings {
    /// Maximum number of products built at once.
    pub jobs: usize,
    pub action_timeout: Option<Duration>,
    pub shell: String,
    pub tools: BTreeMap<String, ToolConfig>,
}

impl Default for ChefSettings {
    fn default() -> Self {
        Self {
            jobs: std::thread::available_parallelism().map_or(1, |n| n.get()),
            action_timeout: None,
            shell: default_shell().to_string(),
            tools: BTreeMap::new(),
        }
    }
}

impl ChefSettings {
    /// Merge `[config]` and `[tool.*]` from several plan files; later files
    /// win where they set a value.
    pub fn from_plans<'a>(plans: impl IntoIterator<Item = &'a PlanFile>) -> Self {
        let mut settings = Self::default();
        for plan in plans {
            if let Some(jobs) = plan.settings.jobs {
                settings.jobs = jobs;
            }
            if let Some(timeout) = plan.settings.action_timeout {
                settings.action_timeout = Some(timeout);
            }
            if let Some(shell) = &plan.settings.shell {
                settings.shell = shell.clone();
            }
            settings
                .tools
                .extend(plan.tools.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
        settings
    }

    /// The command line for `tool`; undeclared tools run their own name.
    pub fn command_for(&self, tool: &str) -> String {
        self.tools
            .get(tool)
            .and_then(|t| t.cmd.clone())
            .unwrap_or_else(|| tool.to_string())
    }

    /// Flag that makes the shell run a command string.
    pub fn shell_flag(&self) -> &'static str {
        let name = self.shell.trim_end_matches(".exe").to_ascii_lowercase();
        if name.ends_with("cmd") { "/C" } else { "-c" }
    }
}

fn default_shell() -> &'static str {
    if cfg!(windows) { "cmd" } else { "sh" }
}
