#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::PathBuf;

use bakeplan::config::{
    ActionConfig, ConfigSection, ParamConfig, PlanFile, ProductConfig, RawPlanFile, ToolConfig,
};
use bakeplan::glob::GlobSet;
use bakeplan::product::{Action, BoundName, GlobRelation, Param, Product, SourceLocation};

/// A concrete or abstract product whose single `touch` action spans its own
/// globs.
pub fn product(name: &str, inputs: &[&str], outputs: &[&str]) -> Product {
    ProductBuilder::new(name).inputs(inputs).outputs(outputs).build()
}

/// Builder for `Product` to simplify test setup.
pub struct ProductBuilder {
    name: String,
    help: Option<String>,
    inputs: Vec<String>,
    outputs: Vec<String>,
    params: Vec<Param>,
    tools: Vec<String>,
    intermediate: bool,
    source: SourceLocation,
}

impl ProductBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            help: None,
            inputs: vec![],
            outputs: vec![],
            params: vec![],
            tools: vec![],
            intermediate: false,
            source: SourceLocation::new("Bakefile.toml", name),
        }
    }

    pub fn inputs(mut self, globs: &[&str]) -> Self {
        self.inputs.extend(globs.iter().map(|s| s.to_string()));
        self
    }

    pub fn outputs(mut self, globs: &[&str]) -> Self {
        self.outputs.extend(globs.iter().map(|s| s.to_string()));
        self
    }

    /// A parameter restricted to `values` (any value when empty).
    pub fn param(mut self, name: &str, values: &[&str], default: Option<&str>) -> Self {
        self.params.push(Param {
            name: name.to_string(),
            allowed_values: if values.is_empty() {
                None
            } else {
                Some(values.iter().map(|s| s.to_string()).collect())
            },
            default: default.map(str::to_string),
        });
        self
    }

    /// Append an action using `tool` over the product's globs.
    pub fn tool(mut self, tool: &str) -> Self {
        self.tools.push(tool.to_string());
        self
    }

    pub fn help(mut self, help: &str) -> Self {
        self.help = Some(help.to_string());
        self
    }

    pub fn intermediate(mut self, val: bool) -> Self {
        self.intermediate = val;
        self
    }

    pub fn source(mut self, file: &str) -> Self {
        self.source = SourceLocation::new(file, self.name.clone());
        self
    }

    pub fn build(self) -> Product {
        let inputs = GlobSet::parse(&self.inputs).expect("bad input glob in builder");
        let outputs = GlobSet::parse(&self.outputs).expect("bad output glob in builder");
        let tools = if self.tools.is_empty() {
            vec!["touch".to_string()]
        } else {
            self.tools
        };
        let actions = tools
            .into_iter()
            .map(|tool| Action {
                tool,
                inputs: inputs.clone(),
                outputs: outputs.clone(),
                options: BTreeMap::new(),
            })
            .collect();

        Product {
            name: BoundName::parse(&self.name).expect("bad product name in builder"),
            help: self.help,
            relation: GlobRelation::new(inputs, outputs, self.params)
                .expect("invalid parameters in builder"),
            actions,
            intermediate: self.intermediate,
            source: self.source,
        }
    }
}

/// Builder for `PlanFile`, going through the same validation as loading.
pub struct PlanFileBuilder {
    path: PathBuf,
    raw: RawPlanFile,
}

impl PlanFileBuilder {
    pub fn new(path: &str) -> Self {
        Self {
            path: PathBuf::from(path),
            raw: RawPlanFile::default(),
        }
    }

    pub fn config(mut self, config: ConfigSection) -> Self {
        self.raw.config = config;
        self
    }

    pub fn tool(mut self, name: &str, cmd: &str) -> Self {
        self.raw.tool.insert(
            name.to_string(),
            ToolConfig {
                cmd: Some(cmd.to_string()),
                help: None,
            },
        );
        self
    }

    /// A product with one action of `tool` from `inputs` to `outputs`.
    pub fn product(mut self, name: &str, tool: &str, inputs: &[&str], outputs: &[&str]) -> Self {
        let action = ActionConfig {
            tool: tool.to_string(),
            inputs: inputs.iter().map(|s| s.to_string()).collect(),
            outputs: outputs.iter().map(|s| s.to_string()).collect(),
            options: BTreeMap::new(),
        };
        self.raw.product.insert(
            name.to_string(),
            ProductConfig {
                actions: vec![action],
                ..ProductConfig::default()
            },
        );
        self
    }

    /// Add a parameter to a product added earlier.
    pub fn param(mut self, product: &str, name: &str, values: &[&str], default: Option<&str>) -> Self {
        let entry = self
            .raw
            .product
            .get_mut(product)
            .expect("param added before its product");
        entry.params.push(ParamConfig {
            name: name.to_string(),
            values: if values.is_empty() {
                None
            } else {
                Some(values.iter().map(|s| s.to_string()).collect())
            },
            default: default.map(str::to_string),
        });
        self
    }

    pub fn raw(self) -> RawPlanFile {
        self.raw
    }

    pub fn build(self) -> PlanFile {
        PlanFile::try_from((self.raw, self.path.as_path()))
            .expect("Failed to build valid plan from builder")
    }
}
