// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Linear operator chains loaded from TOML
//!
//! ```toml
//! [source]
//! type = "box"
//! size = [2.0, 2.0, 2.0]
//!
//! [[step]]
//! op = "bevel"
//! params = { width = 0.1, segments = 3 }
//!
//! [[step]]
//! op = "subdivide"
//! params = { levels = 2 }
//! ```
//!
//! A step may add geometry on its ports 1 and up with `[[step.input]]`
//! tables, each a generated source such as the template of
//! `copy_to_points`.
//!
//! Each step feeds the next through a shared [`GeometryHandle`]. Steps
//! keep their cached output until a parameter or their input changes, so
//! re-cooking after an edit only runs the edited step and those after it.

use crate::config::KernelConfig;
use crate::geometry::{GeometryHandle, SourceShape};
use crate::sop::{create_operator, ParameterValue, SopNode, VARIADIC};
use anyhow::{anyhow, bail, Context, Result};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// One `[[step]]` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepSpec {
    pub op: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub params: BTreeMap<String, ParameterValue>,
    /// Geometry for ports 1 and up.
    #[serde(default, rename = "input")]
    pub inputs: Vec<SourceShape>,
}

/// Deserialized pipeline document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineSpec {
    pub source: SourceShape,
    #[serde(default, rename = "step")]
    pub steps: Vec<StepSpec>,
}

/// Source geometry followed by a chain of operator nodes.
#[derive(Debug)]
pub struct Pipeline {
    source: SourceShape,
    source_output: Option<GeometryHandle>,
    nodes: Vec<SopNode>,
    /// Handle each node was last fed, to skip re-feeding unchanged input.
    fed: Vec<Option<GeometryHandle>>,
}

impl Pipeline {
    /// Builds nodes for every step. Unset `seed` parameters take the
    /// configured default seed and Subdivide levels are clamped to the
    /// configured maximum.
    pub fn from_spec(spec: PipelineSpec, config: &KernelConfig) -> Result<Self> {
        let mut nodes = Vec::with_capacity(spec.steps.len());
        for (index, step) in spec.steps.into_iter().enumerate() {
            let operator = create_operator(&step.op)
                .ok_or_else(|| anyhow!("step {}: unknown operator kind '{}'", index + 1, step.op))?;
            let declared: Vec<&'static str> = operator.parameters().iter().map(|d| d.name).collect();
            let ports = operator.input_count();
            if ports != VARIADIC && step.inputs.len() + 1 > ports {
                bail!(
                    "step {}: operator '{}' takes {} input(s), got {}",
                    index + 1,
                    step.op,
                    ports,
                    step.inputs.len() + 1
                );
            }
            let name = step
                .name
                .clone()
                .unwrap_or_else(|| format!("{}{}", step.op, index + 1));
            let mut node = SopNode::new(name, operator);
            let explicit_seed = step.params.contains_key("seed");
            for (port, shape) in step.inputs.iter().enumerate() {
                node.set_input(port + 1, shape.build());
            }

            for (key, value) in step.params {
                if !declared.contains(&key.as_str()) {
                    warn!("{}: ignoring unknown parameter '{key}'", node.name());
                    continue;
                }
                node.set_parameter(&key, value);
            }
            if declared.contains(&"seed") && !explicit_seed {
                let seed = i32::try_from(config.default_seed).unwrap_or(i32::MAX);
                node.set_parameter("seed", seed);
            }
            if step.op == "subdivide" {
                let levels = match node.parameter("levels") {
                    Some(ParameterValue::Int(l)) => (*l).max(1) as usize,
                    _ => 1,
                };
                let clamped = config.clamp_subdivision(levels);
                if clamped != levels {
                    debug!("{}: levels {levels} clamped to {clamped}", node.name());
                }
                node.set_parameter("levels", clamped as i32);
            }
            nodes.push(node);
        }
        let fed = vec![None; nodes.len()];
        Ok(Self {
            source: spec.source,
            source_output: None,
            nodes,
            fed,
        })
    }

    pub fn from_toml(text: &str, config: &KernelConfig) -> Result<Self> {
        let spec: PipelineSpec = toml::from_str(text).context("Failed to parse pipeline")?;
        Self::from_spec(spec, config)
    }

    pub fn from_file(path: impl AsRef<Path>, config: &KernelConfig) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read pipeline file: {:?}", path.as_ref()))?;
        Self::from_toml(&text, config)
            .with_context(|| format!("Invalid pipeline file: {:?}", path.as_ref()))
    }

    pub fn source(&self) -> &SourceShape {
        &self.source
    }

    pub fn nodes(&self) -> &[SopNode] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn set_source(&mut self, source: SourceShape) {
        self.source = source;
        self.source_output = None;
    }

    /// Changes one step's parameter; that step and the ones after it
    /// re-cook on the next [`cook`](Self::cook).
    pub fn set_parameter(&mut self, step: usize, name: &str, value: impl Into<ParameterValue>) -> Result<()> {
        let len = self.nodes.len();
        let node = self
            .nodes
            .get_mut(step)
            .ok_or_else(|| anyhow!("no step {step} in a pipeline of {len}"))?;
        node.set_parameter(name, value);
        Ok(())
    }

    pub fn cook(&mut self) -> Result<GeometryHandle> {
        self.cook_with(|_, _| {})
    }

    /// Cooks every step in order, calling `on_step` after each one.
    pub fn cook_with(&mut self, mut on_step: impl FnMut(usize, &SopNode)) -> Result<GeometryHandle> {
        let mut current = match &self.source_output {
            Some(handle) => handle.clone(),
            None => {
                let handle = GeometryHandle::new(self.source.build());
                self.source_output = Some(handle.clone());
                handle
            }
        };
        for (index, (node, fed)) in self.nodes.iter_mut().zip(&mut self.fed).enumerate() {
            if !fed.as_ref().map_or(false, |h| h.ptr_eq(&current)) {
                node.set_input(0, current.clone());
                *fed = Some(current.clone());
            }
            current = match node.cook() {
                Some(output) => output,
                None => bail!(
                    "step {} ({}) failed: {}",
                    index + 1,
                    node.name(),
                    node.error().unwrap_or("unknown error")
                ),
            };
            on_step(index, node);
        }
        Ok(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sop::ExecutionState;

    const BEVELED_BOX: &str = r#"
[source]
type = "box"

[[step]]
op = "bevel"
params = { width = 0.1, segments = 3, bevel_type = 1 }

[[step]]
op = "normal"
"#;

    #[test]
    fn test_parse_and_cook() {
        let mut pipeline = Pipeline::from_toml(BEVELED_BOX, &KernelConfig::default()).unwrap();
        assert_eq!(pipeline.len(), 2);
        assert_eq!(pipeline.nodes()[0].name(), "bevel1");
        let out = pipeline.cook().unwrap();
        assert_eq!(out.point_count(), 72);
        assert_eq!(out.primitive_count(), 42);
    }

    #[test]
    fn test_unchanged_steps_stay_cached() {
        let mut pipeline = Pipeline::from_toml(BEVELED_BOX, &KernelConfig::default()).unwrap();
        let first = pipeline.cook().unwrap();
        let again = pipeline.cook().unwrap();
        assert!(first.ptr_eq(&again));

        pipeline.set_parameter(1, "reverse", true).unwrap();
        assert_eq!(pipeline.nodes()[0].state(), ExecutionState::Clean);
        assert_eq!(pipeline.nodes()[1].state(), ExecutionState::Dirty);
        let edited = pipeline.cook().unwrap();
        assert!(!first.ptr_eq(&edited));
        assert!(pipeline.set_parameter(5, "reverse", true).is_err());
    }

    #[test]
    fn test_default_seed_injected() {
        let config = KernelConfig {
            default_seed: 7,
            ..KernelConfig::default()
        };
        let text = "[source]\ntype = \"grid\"\n\n[[step]]\nop = \"scatter\"\n\n[[step]]\nop = \"scatter\"\nparams = { seed = 3 }\n";
        let pipeline = Pipeline::from_toml(text, &config).unwrap();
        assert_eq!(pipeline.nodes()[0].parameter("seed"), Some(&ParameterValue::Int(7)));
        assert_eq!(pipeline.nodes()[1].parameter("seed"), Some(&ParameterValue::Int(3)));
    }

    #[test]
    fn test_subdivide_levels_clamped() {
        let config = KernelConfig {
            max_subdivision_levels: 2,
            ..KernelConfig::default()
        };
        let text = "[source]\ntype = \"box\"\n\n[[step]]\nop = \"subdivide\"\nparams = { levels = 6 }\n";
        let pipeline = Pipeline::from_toml(text, &config).unwrap();
        assert_eq!(pipeline.nodes()[0].parameter("levels"), Some(&ParameterValue::Int(2)));
    }

    #[test]
    fn test_step_inputs_feed_extra_ports() {
        let text = r#"
[source]
type = "line"
points = 3

[[step]]
op = "copy_to_points"

[[step.input]]
type = "box"
size = [0.5, 0.5, 0.5]
"#;
        let mut pipeline = Pipeline::from_toml(text, &KernelConfig::default()).unwrap();
        let out = pipeline.cook().unwrap();
        assert_eq!(out.point_count(), 24);
        assert_eq!(out.primitive_count(), 18);
    }

    #[test]
    fn test_too_many_step_inputs_rejected() {
        let text = "[source]\ntype = \"box\"\n\n[[step]]\nop = \"transform\"\n\n[[step.input]]\ntype = \"grid\"\n";
        let err = Pipeline::from_toml(text, &KernelConfig::default()).unwrap_err();
        assert!(err.to_string().contains("takes 1 input(s), got 2"), "{err}");
    }

    #[test]
    fn test_unknown_operator_rejected() {
        let text = "[source]\ntype = \"box\"\n\n[[step]]\nop = \"boolean\"\n";
        let err = Pipeline::from_toml(text, &KernelConfig::default()).unwrap_err();
        assert!(err.to_string().contains("unknown operator kind 'boolean'"));
    }

    #[test]
    fn test_failing_step_reports_name() {
        let text = "[source]\ntype = \"box\"\n\n[[step]]\nop = \"delete\"\nname = \"cull\"\nparams = { group = \"missing\" }\n";
        let mut pipeline = Pipeline::from_toml(text, &KernelConfig::default()).unwrap();
        let err = pipeline.cook().unwrap_err().to_string();
        assert!(err.contains("step 1 (cull) failed"), "{err}");
        assert!(err.contains("missing"), "{err}");
    }
}
