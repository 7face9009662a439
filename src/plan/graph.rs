// src/plan/graph.rs

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use petgraph::algo::tarjan_scc;
use petgraph::dot::{Config, Dot};
use petgraph::graphmap::DiGraphMap;

use crate::glob::GlobSet;
use crate::product::{BoundName, Product};

/// Immutable point-in-time view of the product dependency graph.
///
/// `edges` maps each product to the sorted set of products it depends on;
/// products without prerequisites have no entry. Abstract products are kept
/// apart as templates and take no part in edges until a recipe concretises
/// them.
#[derive(Debug, Clone, Default)]
pub struct PlanGraph {
    /// Nodes built explicitly through [`PlanGraphBuilder::node`] carry no
    /// definition.
    nodes: BTreeMap<BoundName, Option<Arc<Product>>>,
    /// Abstract products keyed by raw identifier.
    templates: BTreeMap<String, Arc<Product>>,
    edges: BTreeMap<BoundName, BTreeSet<BoundName>>,
}

impl PlanGraph {
    pub fn builder() -> PlanGraphBuilder {
        PlanGraphBuilder::default()
    }

    /// Sorted product names.
    pub fn nodes(&self) -> impl Iterator<Item = &BoundName> {
        self.nodes.keys()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, name: &BoundName) -> bool {
        self.nodes.contains_key(name)
    }

    /// The definition of a concrete product, if it has one.
    pub fn product(&self, name: &BoundName) -> Option<&Arc<Product>> {
        self.nodes.get(name).and_then(Option::as_ref)
    }

    pub fn templates(&self) -> impl Iterator<Item = &Arc<Product>> {
        self.templates.values()
    }

    pub fn template(&self, raw_ident: &str) -> Option<&Arc<Product>> {
        self.templates.get(raw_ident)
    }

    /// Direct prerequisites of `name`, sorted.
    pub fn prerequisites_of(&self, name: &BoundName) -> impl Iterator<Item = &BoundName> {
        self.edges.get(name).into_iter().flatten()
    }

    /// Products that directly depend on `name`, sorted.
    pub fn dependents_of(&self, name: &BoundName) -> Vec<&BoundName> {
        self.edges
            .iter()
            .filter(|(_, pre)| pre.contains(name))
            .map(|(post, _)| post)
            .collect()
    }

    /// `(product, prerequisites)` pairs for every product that has any.
    pub fn edges(&self) -> impl Iterator<Item = (&BoundName, &BTreeSet<BoundName>)> {
        self.edges.iter()
    }

    /// Concrete products whose outputs overlap `inputs`, excluding `except`.
    pub(crate) fn producers_of(&self, inputs: &GlobSet, except: &BoundName) -> BTreeSet<BoundName> {
        self.nodes
            .iter()
            .filter(|(name, _)| *name != except)
            .filter_map(|(name, def)| {
                def.as_ref()
                    .filter(|def| def.outputs().overlaps(inputs))
                    .map(|_| name.clone())
            })
            .collect()
    }

    /// Insert or replace a product, re-deriving every edge that touches it.
    ///
    /// Returns `false` when the product replaced one with identical globs, in
    /// which case the edges are left as they were.
    pub(crate) fn upsert(&mut self, product: Arc<Product>) -> bool {
        let name = product.name.clone();

        if !product.is_concrete() {
            self.remove_node(&name);
            self.templates.insert(name.raw_ident().to_string(), product);
            return true;
        }

        if name.bindings().is_empty() {
            self.templates.remove(name.raw_ident());
        }

        if let Some(Some(old)) = self.nodes.get(&name) {
            if old.same_globs(&product) {
                self.nodes.insert(name, Some(product));
                return false;
            }
        }

        self.unlink(&name);

        let prerequisites = self.producers_of(product.inputs(), &name);
        let dependents: Vec<BoundName> = self
            .nodes
            .iter()
            .filter(|(other, _)| **other != name)
            .filter_map(|(other, def)| {
                def.as_ref()
                    .filter(|def| product.outputs().overlaps(def.inputs()))
                    .map(|_| other.clone())
            })
            .collect();

        for dependent in dependents {
            self.edges.entry(dependent).or_default().insert(name.clone());
        }
        if !prerequisites.is_empty() {
            self.edges.insert(name.clone(), prerequisites);
        }
        self.nodes.insert(name, Some(product));
        true
    }

    /// Drop a product (concrete or template) and every edge mentioning it.
    pub(crate) fn remove(&mut self, name: &BoundName) -> bool {
        let node = self.remove_node(name);
        let template = name.bindings().is_empty() && self.templates.remove(name.raw_ident()).is_some();
        node || template
    }

    fn remove_node(&mut self, name: &BoundName) -> bool {
        if self.nodes.remove(name).is_none() {
            return false;
        }
        self.unlink(name);
        true
    }

    fn unlink(&mut self, name: &BoundName) {
        self.edges.remove(name);
        self.edges.retain(|_, pre| {
            pre.remove(name);
            !pre.is_empty()
        });
    }

    /// Every product reachable from `targets` by following prerequisites,
    /// targets included. Unknown targets are ignored.
    pub fn closure<'a, I>(&self, targets: I) -> BTreeSet<BoundName>
    where
        I: IntoIterator<Item = &'a BoundName>,
    {
        let mut seen = BTreeSet::new();
        let mut stack: Vec<&BoundName> = targets.into_iter().filter(|t| self.contains(t)).collect();

        while let Some(name) = stack.pop() {
            if seen.insert(name.clone()) {
                stack.extend(self.prerequisites_of(name));
            }
        }

        seen
    }

    /// Sorted node names, e.g. `[bar, foo]`.
    pub fn describe_nodes(&self) -> String {
        let names: Vec<&str> = self.nodes.keys().map(BoundName::as_str).collect();
        format!("[{}]", names.join(", "))
    }

    /// Sorted prerequisite lists, e.g. `{bar=[foo], far=[baz, foo]}`.
    pub fn describe_edges(&self) -> String {
        let entries: Vec<String> = self
            .edges
            .iter()
            .map(|(name, pre)| {
                let pre: Vec<&str> = pre.iter().map(BoundName::as_str).collect();
                format!("{name}=[{}]", pre.join(", "))
            })
            .collect();
        format!("{{{}}}", entries.join(", "))
    }

    /// Edges point from prerequisite to dependent.
    fn as_graphmap<'a, E: Copy>(&'a self, keep: &BTreeSet<&'a BoundName>, weight: E) -> DiGraphMap<&'a BoundName, E> {
        let mut g = DiGraphMap::new();
        for name in keep {
            g.add_node(*name);
        }
        for (post, pre) in &self.edges {
            if !keep.contains(post) {
                continue;
            }
            for p in pre {
                if keep.contains(p) {
                    g.add_edge(p, post, weight);
                }
            }
        }
        g
    }

    /// Render the graph (or the closure of `targets` when non-empty) as a
    /// Graphviz digraph.
    pub fn to_dot(&self, targets: &[BoundName]) -> String {
        let closure;
        let keep: BTreeSet<&BoundName> = if targets.is_empty() {
            self.nodes.keys().collect()
        } else {
            closure = self.closure(targets);
            closure.iter().collect()
        };

        let g = self.as_graphmap(&keep, "");
        format!("{}", Dot::with_config(&g, &[Config::EdgeNoLabel]))
    }

    /// Every dependency cycle in the whole graph, as sorted strongly
    /// connected components of more than one product.
    pub fn cycles(&self) -> Vec<Vec<BoundName>> {
        let keep: BTreeSet<&BoundName> = self.nodes.keys().collect();
        let g = self.as_graphmap(&keep, ());

        let mut cycles: Vec<Vec<BoundName>> = tarjan_scc(&g)
            .into_iter()
            .filter(|scc| scc.len() > 1)
            .map(|scc| {
                let mut names: Vec<BoundName> = scc.into_iter().cloned().collect();
                names.sort();
                names
            })
            .collect();
        cycles.sort();
        cycles
    }
}

/// Builds a [`PlanGraph`] with explicit edges rather than glob overlap.
#[derive(Debug, Default)]
pub struct PlanGraphBuilder {
    graph: PlanGraph,
}

impl PlanGraphBuilder {
    pub fn node(mut self, name: BoundName) -> Self {
        self.graph.nodes.entry(name).or_insert(None);
        self
    }

    /// Add a product definition. Abstract products become templates.
    pub fn product(mut self, product: Product) -> Self {
        let product = Arc::new(product);
        if product.is_concrete() {
            self.graph.nodes.insert(product.name.clone(), Some(product));
        } else {
            self.graph
                .templates
                .insert(product.name.raw_ident().to_string(), product);
        }
        self
    }

    /// `dependent` depends on `prerequisite`.
    pub fn edge(mut self, prerequisite: BoundName, dependent: BoundName) -> Self {
        if prerequisite == dependent {
            return self.node(dependent);
        }
        self.graph.nodes.entry(prerequisite.clone()).or_insert(None);
        self.graph.nodes.entry(dependent.clone()).or_insert(None);
        self.graph
            .edges
            .entry(dependent)
            .or_default()
            .insert(prerequisite);
        self
    }

    pub fn build(self) -> PlanGraph {
        self.graph
    }
}
