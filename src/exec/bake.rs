// src/exec/bake.rs

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::oneshot;
use tracing::info;

use crate::exec::{ChefSettings, ProcessChef};
use crate::plan::Recipe;
use crate::product::BoundName;

/// Result of cooking a recipe with the [`ProcessChef`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BakeReport {
    pub all_succeeded: bool,
    /// In completion order.
    pub succeeded: Vec<BoundName>,
    pub failed: Vec<BoundName>,
    /// Never dispatched because a prerequisite failed, in recipe order.
    pub skipped: Vec<BoundName>,
}

/// Cook `recipe` on the current tokio runtime and wait for it to finish.
pub async fn bake(recipe: Recipe, settings: ChefSettings) -> Result<BakeReport> {
    let names: Vec<BoundName> = recipe.ingredients().iter().map(|i| i.product.clone()).collect();
    info!(ingredients = names.len(), jobs = settings.jobs, "baking");

    let (tx, rx) = oneshot::channel();
    let chef = Arc::new(ProcessChef::new(settings, tx));
    recipe.cook(chef.clone());

    let all_succeeded = rx
        .await
        .context("recipe ended without reporting completion")?;

    let (succeeded, failed) = chef.outcomes();
    let skipped = names
        .into_iter()
        .filter(|n| !succeeded.contains(n) && !failed.contains(n))
        .collect();

    Ok(BakeReport {
        all_succeeded,
        succeeded,
        failed,
        skipped,
    })
}
