// src/bakery.rs

//! Service facade tying plan files, the live graph and the chefs together.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{info, warn};

use crate::config::{PlanFile, load_and_validate};
use crate::errors::Result;
use crate::exec::{BakeReport, ChefSettings, bake};
use crate::plan::{Chef, Ingredient, PlanGraph, PlanGrapher, SourceUpdate, WhenDone};
use crate::product::BoundName;

/// Findings of [`Bakery::check`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckReport {
    /// Every dependency cycle, each sorted.
    pub cycles: Vec<Vec<BoundName>>,
    /// Abstract products and the parameters they need.
    pub templates: Vec<(BoundName, Vec<String>)>,
}

impl CheckReport {
    pub fn is_acyclic(&self) -> bool {
        self.cycles.is_empty()
    }
}

pub struct Bakery {
    plan_paths: Vec<PathBuf>,
    grapher: PlanGrapher,
    settings: ChefSettings,
}

impl Bakery {
    pub fn new(plan_paths: Vec<PathBuf>) -> Self {
        Self {
            plan_paths,
            grapher: PlanGrapher::new(),
            settings: ChefSettings::default(),
        }
    }

    /// Re-read every plan file, replacing whatever each one declared before.
    pub fn load_plans(&mut self) -> Result<Vec<SourceUpdate>> {
        let plans = self
            .plan_paths
            .iter()
            .map(load_and_validate)
            .collect::<Result<Vec<PlanFile>>>()?;

        self.settings = ChefSettings::from_plans(&plans);

        let updates: Vec<SourceUpdate> = plans
            .into_iter()
            .map(|plan| self.grapher.replace_source(&plan.path, plan.products))
            .collect();

        let snapshot = self.grapher.snapshot();
        info!(
            files = self.plan_paths.len(),
            products = snapshot.len(),
            templates = snapshot.templates().count(),
            "plans loaded"
        );
        Ok(updates)
    }

    pub fn grapher(&self) -> &PlanGrapher {
        &self.grapher
    }

    pub fn snapshot(&self) -> Arc<PlanGraph> {
        self.grapher.snapshot()
    }

    pub fn settings(&self) -> &ChefSettings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut ChefSettings {
        &mut self.settings
    }

    /// Sorted nodes and edges, or DOT when `dot` is set. A non-empty
    /// `targets` restricts DOT output to their closure.
    pub fn graph_text(&self, targets: &[BoundName], dot: bool) -> String {
        let graph = self.snapshot();
        if dot {
            return graph.to_dot(targets);
        }

        let mut out = format!(
            "nodes: {}\nedges: {}\n",
            graph.describe_nodes(),
            graph.describe_edges()
        );
        let templates: Vec<&str> = graph.templates().map(|t| t.name.as_str()).collect();
        if !templates.is_empty() {
            out.push_str(&format!("templates: [{}]\n", templates.join(", ")));
        }
        out
    }

    /// The order in which a chef that finishes everything immediately would
    /// see the recipe's ingredients.
    pub fn plan(&self, targets: &[BoundName]) -> Result<Vec<BoundName>> {
        let recipe = self.snapshot().make_recipe(targets)?;
        let chef = Arc::new(DryRunChef::default());
        recipe.cook(chef.clone());
        Ok(chef.take())
    }

    pub async fn build(&self, targets: &[BoundName]) -> Result<BakeReport> {
        let recipe = self.snapshot().make_recipe(targets)?;
        let report = bake(recipe, self.settings.clone()).await?;
        if report.all_succeeded {
            info!(built = report.succeeded.len(), "build succeeded");
        } else {
            warn!(
                failed = report.failed.len(),
                skipped = report.skipped.len(),
                "build failed"
            );
        }
        Ok(report)
    }

    pub fn check(&self) -> CheckReport {
        let graph = self.snapshot();
        let templates = graph
            .templates()
            .map(|t| {
                let params = t
                    .relation
                    .parameters()
                    .iter()
                    .map(|p| p.name.clone())
                    .collect();
                (t.name.clone(), params)
            })
            .collect();

        CheckReport {
            cycles: graph.cycles(),
            templates,
        }
    }
}

/// Records dispatch order and reports success at once.
#[derive(Default)]
struct DryRunChef {
    order: Mutex<Vec<BoundName>>,
}

impl DryRunChef {
    fn take(&self) -> Vec<BoundName> {
        std::mem::take(&mut *self.order.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

impl Chef for DryRunChef {
    fn cook(&self, ingredient: Ingredient, when_done: WhenDone) {
        self.order
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(ingredient.product);
        when_done.call(true);
    }

    fn done(&self, _all_succeeded: bool) {}
}
