// src/product/model.rs

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use crate::errors::Result;
use crate::glob::GlobSet;
use crate::product::{BoundName, GlobRelation, Solution};

/// Where a product was declared: a plan file plus the key inside it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceLocation {
    pub file: PathBuf,
    pub key: String,
}

impl SourceLocation {
    pub fn new(file: impl Into<PathBuf>, key: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            key: key.into(),
        }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.file.display(), self.key)
    }
}

/// One step in a product's build: a tool invoked over some globs.
#[derive(Debug, Clone, PartialEq)]
pub struct Action {
    pub tool: String,
    pub inputs: GlobSet,
    pub outputs: GlobSet,
    pub options: BTreeMap<String, toml::Value>,
}

impl Action {
    pub fn subst(&self, bindings: &BTreeMap<String, String>) -> Result<Self> {
        Ok(Self {
            tool: self.tool.clone(),
            inputs: self.inputs.subst(bindings)?,
            outputs: self.outputs.subst(bindings)?,
            options: self.options.clone(),
        })
    }
}

/// A named, declared unit of buildable work.
#[derive(Debug, Clone, PartialEq)]
pub struct Product {
    pub name: BoundName,
    pub help: Option<String>,
    pub relation: GlobRelation,
    pub actions: Vec<Action>,
    /// Intermediate products exist only to feed other products.
    pub intermediate: bool,
    pub source: SourceLocation,
}

impl Product {
    pub fn inputs(&self) -> &GlobSet {
        self.relation.inputs()
    }

    pub fn outputs(&self) -> &GlobSet {
        self.relation.outputs()
    }

    pub fn is_concrete(&self) -> bool {
        self.relation.is_concrete()
    }

    /// Whether two products would produce the same graph edges.
    pub fn same_globs(&self, other: &Product) -> bool {
        self.inputs() == other.inputs() && self.outputs() == other.outputs()
    }

    /// The concrete product for the given parameter values.
    pub fn with_parameter_values(&self, values: &BTreeMap<String, String>) -> Result<Product> {
        let solution = self.relation.with_parameter_values(values)?;
        self.with_solution(solution)
    }

    /// The concrete product described by a solution of this product's relation.
    pub fn with_solution(&self, solution: Solution) -> Result<Product> {
        let actions = self
            .actions
            .iter()
            .map(|a| a.subst(&solution.bindings))
            .collect::<Result<Vec<_>>>()?;

        Ok(Product {
            name: self.name.with_bindings(solution.bindings),
            help: self.help.clone(),
            relation: GlobRelation::concrete(solution.inputs, solution.outputs),
            actions,
            intermediate: self.intermediate,
            source: self.source.clone(),
        })
    }
}
