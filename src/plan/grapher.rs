// src/plan/grapher.rs

//! The live product graph.
//!
//! Writers serialise on one mutex; every write goes through
//! [`Arc::make_mut`], so a snapshot handed out earlier is never touched and
//! readers of old snapshots never wait on writers.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, info, warn};

use crate::plan::PlanGraph;
use crate::product::{BoundName, Product};

/// What a [`PlanGrapher::replace_source`] call changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceUpdate {
    pub declared: usize,
    pub retired: Vec<BoundName>,
}

#[derive(Debug, Default)]
pub struct PlanGrapher {
    live: Mutex<Arc<PlanGraph>>,
}

impl PlanGrapher {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Arc<PlanGraph>> {
        self.live.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert or replace the node for `product.name`.
    pub fn update(&self, product: Product) {
        let mut live = self.lock();
        let name = product.name.clone();
        let relinked = Arc::make_mut(&mut live).upsert(Arc::new(product));
        debug!(product = %name, relinked, "plan graph updated");
    }

    /// Retire a product that is no longer declared.
    pub fn remove(&self, name: &BoundName) -> bool {
        let mut live = self.lock();
        if !live.contains(name) && live.template(name.raw_ident()).is_none() {
            return false;
        }
        let removed = Arc::make_mut(&mut live).remove(name);
        debug!(product = %name, removed, "plan graph removal");
        removed
    }

    /// Atomically replace everything declared by one plan file.
    ///
    /// Products previously declared by `file` but absent from `products` are
    /// retired; the rest are inserted or replaced.
    pub fn replace_source(&self, file: &Path, products: Vec<Product>) -> SourceUpdate {
        let mut live = self.lock();
        let graph = Arc::make_mut(&mut live);

        let declared: BTreeSet<BoundName> = products.iter().map(|p| p.name.clone()).collect();
        let stale: Vec<BoundName> = graph
            .nodes()
            .filter_map(|name| graph.product(name))
            .chain(graph.templates())
            .filter(|p| p.source.file == file && !declared.contains(&p.name))
            .map(|p| p.name.clone())
            .collect();

        for name in &stale {
            graph.remove(name);
        }
        let count = products.len();
        for product in products {
            if let Some(previous) = declared_elsewhere(graph, &product, file) {
                warn!(
                    product = %product.name,
                    "Duplicate product {} in {} and {}",
                    product.name,
                    file.display(),
                    previous.display()
                );
            }
            graph.upsert(Arc::new(product));
        }

        info!(
            file = %file.display(),
            declared = count,
            retired = stale.len(),
            "plan file applied to graph"
        );

        SourceUpdate {
            declared: count,
            retired: stale,
        }
    }

    /// An immutable view of the graph as of now.
    pub fn snapshot(&self) -> Arc<PlanGraph> {
        Arc::clone(&self.lock())
    }
}

/// The plan file that already declares `product`, if it is not `file`.
fn declared_elsewhere(graph: &PlanGraph, product: &Product, file: &Path) -> Option<PathBuf> {
    graph
        .product(&product.name)
        .or_else(|| {
            graph
                .template(product.name.raw_ident())
                .filter(|t| t.name == product.name)
        })
        .filter(|previous| previous.source.file != file)
        .map(|previous| previous.source.file.clone())
}
