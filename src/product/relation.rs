// src/product/relation.rs

use std::collections::{BTreeMap, BTreeSet};

use crate::errors::{BakeError, Result};
use crate::glob::GlobSet;

/// A declared product parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub name: String,
    /// `None` means any value is accepted.
    pub allowed_values: Option<BTreeSet<String>>,
    pub default: Option<String>,
}

impl Param {
    /// A parameter accepting any value, with no default.
    pub fn free(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            allowed_values: None,
            default: None,
        }
    }

    fn allows(&self, value: &str) -> bool {
        self.allowed_values
            .as_ref()
            .is_none_or(|allowed| allowed.contains(value))
    }
}

/// Concrete inputs and outputs for one assignment of parameter values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Solution {
    pub inputs: GlobSet,
    pub outputs: GlobSet,
    pub bindings: BTreeMap<String, String>,
}

/// Relates the globs a product consumes to the globs it produces.
///
/// A relation with no parameters is concrete. Parameters come from explicit
/// declarations and from hole names used in either glob set; undeclared
/// hole names are added as unconstrained parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobRelation {
    inputs: GlobSet,
    outputs: GlobSet,
    parameters: Vec<Param>,
}

impl GlobRelation {
    pub fn new(inputs: GlobSet, outputs: GlobSet, declared: Vec<Param>) -> Result<Self> {
        let mut parameters: Vec<Param> = Vec::with_capacity(declared.len());
        for param in declared {
            if parameters.iter().any(|p| p.name == param.name) {
                return Err(BakeError::InvalidParameters(format!(
                    "parameter '{}' declared twice",
                    param.name
                )));
            }
            if let Some(default) = &param.default {
                if !param.allows(default) {
                    return Err(BakeError::InvalidParameters(format!(
                        "default {default:?} of parameter '{}' is not an allowed value",
                        param.name
                    )));
                }
            }
            parameters.push(param);
        }

        let holes = inputs.hole_names().into_iter().chain(outputs.hole_names());
        for hole in holes {
            if !parameters.iter().any(|p| p.name == hole) {
                parameters.push(Param::free(hole));
            }
        }

        Ok(Self {
            inputs,
            outputs,
            parameters,
        })
    }

    /// A relation without parameters.
    pub fn concrete(inputs: GlobSet, outputs: GlobSet) -> Self {
        Self {
            inputs,
            outputs,
            parameters: Vec::new(),
        }
    }

    pub fn inputs(&self) -> &GlobSet {
        &self.inputs
    }

    pub fn outputs(&self) -> &GlobSet {
        &self.outputs
    }

    pub fn parameters(&self) -> &[Param] {
        &self.parameters
    }

    pub fn is_concrete(&self) -> bool {
        self.parameters.is_empty()
    }

    /// Bind every parameter and substitute the values into both glob sets.
    ///
    /// Missing values fall back to the declared default. Unknown names,
    /// values outside the allowed set, and parameters left without a value
    /// are errors.
    pub fn with_parameter_values(&self, values: &BTreeMap<String, String>) -> Result<Solution> {
        let unknown: Vec<&str> = values
            .keys()
            .filter(|k| !self.parameters.iter().any(|p| &p.name == *k))
            .map(String::as_str)
            .collect();
        if !unknown.is_empty() {
            return Err(BakeError::InvalidParameters(format!(
                "unknown parameters {}",
                unknown.join(", ")
            )));
        }

        let mut bindings = BTreeMap::new();
        let mut missing = Vec::new();
        for param in &self.parameters {
            let Some(value) = values.get(&param.name).or(param.default.as_ref()) else {
                missing.push(param.name.as_str());
                continue;
            };
            if !param.allows(value) {
                return Err(BakeError::InvalidParameters(format!(
                    "{value:?} is not an allowed value for parameter '{}'",
                    param.name
                )));
            }
            bindings.insert(param.name.clone(), value.clone());
        }
        if !missing.is_empty() {
            return Err(BakeError::InvalidParameters(format!(
                "missing values for parameters {}",
                missing.join(", ")
            )));
        }

        Ok(Solution {
            inputs: self.inputs.subst(&bindings)?,
            outputs: self.outputs.subst(&bindings)?,
            bindings,
        })
    }

    /// One solution per combination of allowed values, or `None` when some
    /// parameter accepts arbitrary values.
    pub fn all_possible_solutions(&self) -> Option<Result<Vec<Solution>>> {
        let mut combos: Vec<BTreeMap<String, String>> = vec![BTreeMap::new()];
        for param in &self.parameters {
            let allowed = param.allowed_values.as_ref()?;
            combos = combos
                .iter()
                .flat_map(|combo| {
                    allowed.iter().map(move |value| {
                        let mut next = combo.clone();
                        next.insert(param.name.clone(), value.clone());
                        next
                    })
                })
                .collect();
        }

        Some(
            combos
                .iter()
                .map(|combo| self.with_parameter_values(combo))
                .collect(),
        )
    }
}
