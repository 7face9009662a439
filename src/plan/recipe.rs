// src/plan/recipe.rs

//! Compiling a set of targets into a [`Recipe`].
//!
//! The compiler walks prerequisites depth-first from each target in request
//! order, keeping the current path so a back-edge can be reported as the
//! cycle it closes. Abstract products are concretised on the way: a target
//! such as `lib["arch":"arm"]` binds the `lib` template directly, and a
//! template whose outputs overlap a product's inputs is bound by matching its
//! output globs against those inputs.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use tracing::debug;

use crate::errors::{BakeError, Result};
use crate::plan::PlanGraph;
use crate::product::{BoundName, Product};

/// One node of a recipe as handed to a chef.
#[derive(Debug, Clone)]
pub struct Ingredient {
    pub product: BoundName,
    pub prerequisites: BTreeSet<BoundName>,
    /// Direct dependents within the recipe, in recipe order.
    pub postrequisites: Vec<BoundName>,
    /// `None` for nodes of a graph built without product definitions.
    pub definition: Option<Arc<Product>>,
}

/// A cycle-checked execution plan for a set of targets.
///
/// Ingredients are kept in the post-order of the prerequisite walk, which is
/// also the order in which simultaneously ready ingredients are dispatched.
#[derive(Debug, Clone)]
pub struct Recipe {
    targets: Vec<BoundName>,
    pub(crate) ingredients: Vec<Ingredient>,
    pub(crate) waiting_on: Vec<usize>,
    pub(crate) dependents: Vec<Vec<usize>>,
}

impl Recipe {
    /// The concrete targets the recipe was compiled for.
    pub fn targets(&self) -> &[BoundName] {
        &self.targets
    }

    pub fn ingredients(&self) -> &[Ingredient] {
        &self.ingredients
    }

    pub fn ingredient(&self, name: &BoundName) -> Option<&Ingredient> {
        self.ingredients.iter().find(|i| &i.product == name)
    }

    pub fn len(&self) -> usize {
        self.ingredients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ingredients.is_empty()
    }

    /// Ingredients with no prerequisites.
    pub fn starting_points(&self) -> impl Iterator<Item = &Ingredient> {
        self.ingredients
            .iter()
            .filter(|i| i.prerequisites.is_empty())
    }
}

impl PlanGraph {
    /// Compile the closure of `targets` into a recipe.
    ///
    /// Fails with [`BakeError::MissingProducts`] when a target is unknown or
    /// an abstract product cannot be bound, and with
    /// [`BakeError::DependencyCycle`] when the closure is not a DAG. The
    /// graph itself is never modified.
    pub fn make_recipe(&self, targets: &[BoundName]) -> Result<Recipe> {
        RecipeMaker::new(self).make(targets)
    }
}

struct RecipeMaker<'g> {
    graph: &'g PlanGraph,
    /// Concrete products created for this recipe only.
    local: BTreeMap<BoundName, Arc<Product>>,
    /// Current walk path, for cycle reports.
    processing: Vec<BoundName>,
    on_path: BTreeSet<BoundName>,
    processed: BTreeMap<BoundName, BTreeSet<BoundName>>,
    order: Vec<BoundName>,
}

/// A product on the walk path and the prerequisites still to visit, last
/// one first.
struct Frame {
    name: BoundName,
    prerequisites: BTreeSet<BoundName>,
    pending: Vec<BoundName>,
}

impl<'g> RecipeMaker<'g> {
    fn new(graph: &'g PlanGraph) -> Self {
        Self {
            graph,
            local: BTreeMap::new(),
            processing: Vec::new(),
            on_path: BTreeSet::new(),
            processed: BTreeMap::new(),
            order: Vec::new(),
        }
    }

    fn make(mut self, requested: &[BoundName]) -> Result<Recipe> {
        let targets = self.resolve_targets(requested)?;
        for target in &targets {
            self.process(target)?;
        }
        debug!(
            targets = targets.len(),
            ingredients = self.order.len(),
            derived = self.local.len(),
            "recipe compiled"
        );
        Ok(self.into_recipe(targets))
    }

    fn resolve_targets(&mut self, requested: &[BoundName]) -> Result<Vec<BoundName>> {
        let mut targets: Vec<BoundName> = Vec::new();
        let mut undefined = Vec::new();

        for name in requested {
            if self.graph.contains(name) {
                push_unique(&mut targets, name.clone());
                continue;
            }

            let Some(template) = self.graph.template(name.raw_ident()).cloned() else {
                undefined.push(name.as_str());
                continue;
            };

            if !name.bindings().is_empty() {
                let concrete = template.with_parameter_values(name.bindings())?;
                push_unique(&mut targets, self.adopt(concrete));
                continue;
            }

            match template.relation.all_possible_solutions() {
                Some(solutions) => {
                    for solution in solutions? {
                        let concrete = template.with_solution(solution)?;
                        push_unique(&mut targets, self.adopt(concrete));
                    }
                }
                None => {
                    let open: Vec<&str> = template
                        .relation
                        .parameters()
                        .iter()
                        .filter(|p| p.allowed_values.is_none())
                        .map(|p| p.name.as_str())
                        .collect();
                    return Err(BakeError::MissingProducts(format!(
                        "Product {name} is abstract; request it with values for [{}]",
                        open.join(", ")
                    )));
                }
            }
        }

        if !undefined.is_empty() {
            return Err(BakeError::MissingProducts(format!(
                "Undefined products {}",
                undefined.join(", ")
            )));
        }
        Ok(targets)
    }

    /// Register a concretised product. An existing concrete node with the
    /// same name (a hand-written specialisation) takes precedence.
    fn adopt(&mut self, product: Product) -> BoundName {
        let name = product.name.clone();
        if !self.graph.contains(&name) {
            self.local.entry(name.clone()).or_insert_with(|| Arc::new(product));
        }
        name
    }

    fn definition(&self, name: &BoundName) -> Option<Arc<Product>> {
        self.local
            .get(name)
            .or_else(|| self.graph.product(name))
            .cloned()
    }

    /// Post-order walk of the prerequisites of `target`, with an explicit
    /// stack so long chains do not grow the call stack.
    fn process(&mut self, target: &BoundName) -> Result<()> {
        if self.processed.contains_key(target) {
            return Ok(());
        }

        let mut stack = vec![self.enter(target.clone())?];
        while let Some(frame) = stack.last_mut() {
            match frame.pending.pop() {
                Some(pre) => {
                    if self.processed.contains_key(&pre) {
                        continue;
                    }
                    if self.on_path.contains(&pre) {
                        return Err(self.cycle_through(pre));
                    }
                    let next = self.enter(pre)?;
                    stack.push(next);
                }
                None => {
                    if let Some(frame) = stack.pop() {
                        self.leave(frame);
                    }
                }
            }
        }
        Ok(())
    }

    fn enter(&mut self, name: BoundName) -> Result<Frame> {
        self.processing.push(name.clone());
        self.on_path.insert(name.clone());
        let prerequisites = self.prerequisites(&name)?;
        let pending = prerequisites.iter().rev().cloned().collect();
        Ok(Frame {
            name,
            prerequisites,
            pending,
        })
    }

    fn leave(&mut self, frame: Frame) {
        self.processing.pop();
        self.on_path.remove(&frame.name);
        self.order.push(frame.name.clone());
        self.processed.insert(frame.name, frame.prerequisites);
    }

    /// The path from the earlier visit of `repeated` back to itself.
    fn cycle_through(&self, repeated: BoundName) -> BakeError {
        let start = self
            .processing
            .iter()
            .position(|p| *p == repeated)
            .unwrap_or(0);
        let mut cycle = self.processing[start..].to_vec();
        cycle.push(repeated);
        BakeError::DependencyCycle { cycle }
    }

    fn prerequisites(&mut self, name: &BoundName) -> Result<BTreeSet<BoundName>> {
        let mut pre: BTreeSet<BoundName> = self.graph.prerequisites_of(name).cloned().collect();

        let Some(product) = self.definition(name) else {
            return Ok(pre);
        };
        if !self.graph.contains(name) {
            pre.extend(self.graph.producers_of(product.inputs(), name));
        }

        let templates: Vec<Arc<Product>> = self
            .graph
            .templates()
            .filter(|t| t.name.raw_ident() != name.raw_ident())
            .filter(|t| t.outputs().overlaps(product.inputs()))
            .cloned()
            .collect();
        for template in templates {
            let derived = derive_prerequisite(&product, &template)?;
            debug!(product = %name, derived = %derived.name, "bound abstract prerequisite");
            pre.insert(self.adopt(derived));
        }

        Ok(pre)
    }

    fn into_recipe(mut self, targets: Vec<BoundName>) -> Recipe {
        let mut processed = std::mem::take(&mut self.processed);
        let index: BTreeMap<&BoundName, usize> = self
            .order
            .iter()
            .enumerate()
            .map(|(i, name)| (name, i))
            .collect();

        let n = self.order.len();
        let mut waiting_on = vec![0; n];
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); n];
        for (i, name) in self.order.iter().enumerate() {
            for pre in &processed[name] {
                dependents[index[pre]].push(i);
                waiting_on[i] += 1;
            }
        }

        let ingredients = self
            .order
            .iter()
            .zip(&dependents)
            .map(|(name, post)| Ingredient {
                product: name.clone(),
                prerequisites: processed.remove(name).unwrap_or_default(),
                postrequisites: post.iter().map(|&d| self.order[d].clone()).collect(),
                definition: self.definition(name),
            })
            .collect();

        Recipe {
            targets,
            ingredients,
            waiting_on,
            dependents,
        }
    }
}

/// Bind an abstract prerequisite so that it produces what `post` consumes.
///
/// Each of `post`'s input globs that overlaps an output glob of the template
/// is matched against it textually, so `obj/*(arch)/**.o` against
/// `obj/x86/**.o` binds `arch = x86`. The input text itself is the pattern
/// being matched: a hole only binds when the input spells out a value at
/// its position. A wildcard there (`obj/**.o`, `obj/*/lib.o`) or an input
/// whose text the output cannot match (`obj/x86/*.o` against
/// `obj/*(arch)/lib.o`) binds nothing, and the parameter must then come
/// from its default. Parameters left unbound fall back to their defaults.
fn derive_prerequisite(post: &Product, template: &Product) -> Result<Product> {
    let mut bindings = template.name.bindings().clone();

    for input in post.inputs() {
        for output in template.outputs() {
            if !output.overlaps(input) {
                continue;
            }
            let mut trial = bindings.clone();
            if output.match_with_bindings(input.as_str(), &mut trial) {
                for (key, value) in trial {
                    if !value.contains('*') {
                        bindings.entry(key).or_insert(value);
                    }
                }
            } else if output.matches(input.as_str()) {
                return Err(BakeError::MissingProducts(format!(
                    "Can't derive concrete version of {} to satisfy {} since {input} matching {input} and {output} clashes with bindings {}",
                    template.name,
                    post.name,
                    describe_bindings(&bindings)
                )));
            }
        }
    }

    let mut missing = Vec::new();
    for param in template.relation.parameters() {
        if bindings.contains_key(&param.name) {
            continue;
        }
        match &param.default {
            Some(default) => {
                bindings.insert(param.name.clone(), default.clone());
            }
            None => missing.push(param.name.as_str()),
        }
    }
    if !missing.is_empty() {
        return Err(BakeError::MissingProducts(format!(
            "Can't derive parameter{} [{}] for concrete version of {} to satisfy {}.  Got {}.",
            if missing.len() == 1 { "" } else { "s" },
            missing.join(", "),
            template.name,
            post.name,
            describe_bindings(&bindings)
        )));
    }

    template.with_parameter_values(&bindings)
}

fn push_unique(targets: &mut Vec<BoundName>, name: BoundName) {
    if !targets.contains(&name) {
        targets.push(name);
    }
}

fn describe_bindings(bindings: &BTreeMap<String, String>) -> String {
    let pairs: Vec<String> = bindings.iter().map(|(k, v)| format!("{k}={v}")).collect();
    format!("{{{}}}", pairs.join(", "))
}
