// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Operator contract: parameters, cook context and the cached node wrapper

use crate::attributes::{ElementClass, Vec3f};
use crate::error::{GeometryError, OperatorError};
use crate::geometry::{groups, GeometryContainer, GeometryHandle};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::time::{Duration, Instant};

/// Input count reported by operators that take any number of inputs.
pub const VARIADIC: usize = usize::MAX;

/// Parameter name every group-aware operator reads.
pub const INPUT_GROUP: &str = "input_group";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParameterValue {
    Bool(bool),
    Int(i32),
    Float(f32),
    String(String),
    Vector3(Vec3f),
}

impl fmt::Display for ParameterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterValue::Bool(v) => write!(f, "{v}"),
            ParameterValue::Int(v) => write!(f, "{v}"),
            ParameterValue::Float(v) => write!(f, "{v}"),
            ParameterValue::String(v) => write!(f, "\"{v}\""),
            ParameterValue::Vector3(v) => write!(f, "[{}, {}, {}]", v.x, v.y, v.z),
        }
    }
}

impl From<i32> for ParameterValue {
    fn from(v: i32) -> Self {
        Self::Int(v)
    }
}

impl From<f32> for ParameterValue {
    fn from(v: f32) -> Self {
        Self::Float(v)
    }
}

impl From<bool> for ParameterValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<&str> for ParameterValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for ParameterValue {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<Vec3f> for ParameterValue {
    fn from(v: Vec3f) -> Self {
        Self::Vector3(v)
    }
}

/// Typed read of a parameter value, with int/float/bool coercion.
pub trait FromParameter: Sized {
    fn from_parameter(value: &ParameterValue) -> Option<Self>;
}

impl FromParameter for i32 {
    fn from_parameter(value: &ParameterValue) -> Option<Self> {
        match value {
            ParameterValue::Int(v) => Some(*v),
            ParameterValue::Float(v) => Some(v.round() as i32),
            ParameterValue::Bool(v) => Some(i32::from(*v)),
            _ => None,
        }
    }
}

impl FromParameter for usize {
    fn from_parameter(value: &ParameterValue) -> Option<Self> {
        i32::from_parameter(value).map(|v| v.max(0) as usize)
    }
}

impl FromParameter for u64 {
    fn from_parameter(value: &ParameterValue) -> Option<Self> {
        i32::from_parameter(value).map(|v| v.max(0) as u64)
    }
}

impl FromParameter for f32 {
    fn from_parameter(value: &ParameterValue) -> Option<Self> {
        match value {
            ParameterValue::Float(v) => Some(*v),
            ParameterValue::Int(v) => Some(*v as f32),
            _ => None,
        }
    }
}

impl FromParameter for bool {
    fn from_parameter(value: &ParameterValue) -> Option<Self> {
        match value {
            ParameterValue::Bool(v) => Some(*v),
            ParameterValue::Int(v) => Some(*v != 0),
            _ => None,
        }
    }
}

impl FromParameter for String {
    fn from_parameter(value: &ParameterValue) -> Option<Self> {
        match value {
            ParameterValue::String(v) => Some(v.clone()),
            _ => None,
        }
    }
}

impl FromParameter for Vec3f {
    fn from_parameter(value: &ParameterValue) -> Option<Self> {
        match value {
            ParameterValue::Vector3(v) => Some(*v),
            ParameterValue::Float(v) => Some(Vec3f::repeat(*v)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ParameterKind {
    Int,
    Float,
    Bool,
    String,
    Vector3,
    /// Multi-line source text (wrangle programs).
    Code,
}

/// Declared parameter: name, kind, default and optional menu entries.
/// For menus the stored value is the entry index.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParameterDefinition {
    pub name: &'static str,
    pub kind: ParameterKind,
    pub default: ParameterValue,
    pub options: Vec<&'static str>,
}

impl ParameterDefinition {
    fn new(name: &'static str, kind: ParameterKind, default: ParameterValue) -> Self {
        Self {
            name,
            kind,
            default,
            options: Vec::new(),
        }
    }

    pub fn int(name: &'static str, default: i32) -> Self {
        Self::new(name, ParameterKind::Int, default.into())
    }

    pub fn float(name: &'static str, default: f32) -> Self {
        Self::new(name, ParameterKind::Float, default.into())
    }

    pub fn bool(name: &'static str, default: bool) -> Self {
        Self::new(name, ParameterKind::Bool, default.into())
    }

    pub fn string(name: &'static str, default: &str) -> Self {
        Self::new(name, ParameterKind::String, default.into())
    }

    pub fn vector3(name: &'static str, default: Vec3f) -> Self {
        Self::new(name, ParameterKind::Vector3, default.into())
    }

    pub fn code(name: &'static str, default: &str) -> Self {
        Self::new(name, ParameterKind::Code, default.into())
    }

    /// Integer menu; `default` indexes `options`.
    pub fn menu(name: &'static str, default: i32, options: &[&'static str]) -> Self {
        Self {
            options: options.to_vec(),
            ..Self::int(name, default)
        }
    }

    /// The shared `input_group` string parameter.
    pub fn input_group() -> Self {
        Self::string(INPUT_GROUP, "")
    }
}

/// A geometry operator. Implementations are stateless; everything they
/// read comes through the [`CookContext`].
pub trait Operator: Send + Sync + fmt::Debug {
    fn kind(&self) -> &'static str;

    /// Number of input ports, or [`VARIADIC`].
    fn input_count(&self) -> usize {
        1
    }

    fn parameters(&self) -> Vec<ParameterDefinition>;

    fn execute(&self, ctx: &CookContext) -> Result<GeometryContainer, OperatorError>;
}

/// Parameters and inputs visible to one `execute` call.
pub struct CookContext<'a> {
    parameters: &'a BTreeMap<String, ParameterValue>,
    inputs: &'a [Option<GeometryHandle>],
}

impl<'a> CookContext<'a> {
    pub fn new(
        parameters: &'a BTreeMap<String, ParameterValue>,
        inputs: &'a [Option<GeometryHandle>],
    ) -> Self {
        Self { parameters, inputs }
    }

    /// Typed parameter read; `default` when unset or not coercible.
    pub fn get<T: FromParameter>(&self, name: &str, default: T) -> T {
        self.parameters
            .get(name)
            .and_then(T::from_parameter)
            .unwrap_or(default)
    }

    pub fn has(&self, name: &str) -> bool {
        self.parameters.contains_key(name)
    }

    pub fn parameters(&self) -> impl Iterator<Item = (&str, &ParameterValue)> {
        self.parameters.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn input(&self, port: usize) -> Option<&GeometryContainer> {
        self.inputs.get(port)?.as_ref().map(GeometryHandle::read)
    }

    pub fn require_input(&self, port: usize) -> Result<&GeometryContainer, OperatorError> {
        self.input(port).ok_or(OperatorError::MissingInput(port))
    }

    /// Every connected input, in port order.
    pub fn connected_inputs(&self) -> impl Iterator<Item = &GeometryContainer> {
        self.inputs.iter().flatten().map(GeometryHandle::read)
    }

    /// The `input_group` parameter; `None` when empty.
    pub fn input_group(&self) -> Option<String> {
        Some(self.get(INPUT_GROUP, String::new())).filter(|g| !g.is_empty())
    }

    /// Membership under `input_group`; everything is selected when it is empty.
    pub fn is_in_group(&self, geo: &GeometryContainer, class: ElementClass, index: usize) -> bool {
        match self.input_group() {
            Some(group) => groups::is_in_group(geo, &group, class, index),
            None => index < geo.element_count(class),
        }
    }

    /// Per-element selection mask under `input_group`. A named group that
    /// does not exist is an error.
    pub fn selection(
        &self,
        geo: &GeometryContainer,
        class: ElementClass,
    ) -> Result<Vec<bool>, OperatorError> {
        let count = geo.element_count(class);
        let Some(group) = self.input_group() else {
            return Ok(vec![true; count]);
        };
        if !groups::has_group(geo, &group, class) {
            return Err(GeometryError::MissingGroup(group).into());
        }
        Ok((0..count)
            .map(|i| groups::is_in_group(geo, &group, class, i))
            .collect())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionState {
    Clean,
    Dirty,
    Computing,
    Error,
}

/// An operator with its parameter values, inputs and cached output.
#[derive(Debug)]
pub struct SopNode {
    name: String,
    operator: Box<dyn Operator>,
    parameters: BTreeMap<String, ParameterValue>,
    inputs: Vec<Option<GeometryHandle>>,
    state: ExecutionState,
    output: Option<GeometryHandle>,
    error: Option<String>,
    last_cook_time: Option<Duration>,
}

impl SopNode {
    /// Wraps `operator`, seeding every declared parameter with its default.
    pub fn new(name: impl Into<String>, operator: Box<dyn Operator>) -> Self {
        let parameters = operator
            .parameters()
            .into_iter()
            .map(|def| (def.name.to_string(), def.default))
            .collect();
        Self {
            name: name.into(),
            operator,
            parameters,
            inputs: Vec::new(),
            state: ExecutionState::Dirty,
            output: None,
            error: None,
            last_cook_time: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn operator(&self) -> &dyn Operator {
        self.operator.as_ref()
    }

    pub fn state(&self) -> ExecutionState {
        self.state
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn last_cook_time(&self) -> Option<Duration> {
        self.last_cook_time
    }

    pub fn parameter(&self, name: &str) -> Option<&ParameterValue> {
        self.parameters.get(name)
    }

    pub fn set_parameter(&mut self, name: &str, value: impl Into<ParameterValue>) {
        self.parameters.insert(name.to_string(), value.into());
        self.mark_dirty();
    }

    pub fn set_input(&mut self, port: usize, geometry: impl Into<GeometryHandle>) {
        if self.inputs.len() <= port {
            self.inputs.resize(port + 1, None);
        }
        self.inputs[port] = Some(geometry.into());
        self.mark_dirty();
    }

    pub fn clear_input(&mut self, port: usize) {
        if let Some(slot) = self.inputs.get_mut(port) {
            *slot = None;
            self.mark_dirty();
        }
    }

    pub fn mark_dirty(&mut self) {
        self.state = ExecutionState::Dirty;
    }

    pub fn set_error(&mut self, message: impl Into<String>) {
        self.error = Some(message.into());
        self.state = ExecutionState::Error;
        self.output = None;
    }

    /// Runs the operator unless the cached output is still clean. Failures
    /// are recorded through [`set_error`](Self::set_error) and yield `None`.
    pub fn cook(&mut self) -> Option<GeometryHandle> {
        match self.state {
            ExecutionState::Clean => {
                if let Some(output) = &self.output {
                    return Some(output.clone());
                }
            }
            ExecutionState::Computing => {
                let err = OperatorError::CircularDependency(self.name.clone());
                self.set_error(err.to_string());
                return None;
            }
            ExecutionState::Dirty | ExecutionState::Error => {}
        }

        self.state = ExecutionState::Computing;
        self.error = None;
        let started = Instant::now();
        let result = {
            let ctx = CookContext::new(&self.parameters, &self.inputs);
            self.operator.execute(&ctx)
        };
        let elapsed = started.elapsed();
        self.last_cook_time = Some(elapsed);

        match result {
            Ok(geometry) => {
                debug!(
                    "{} ({}) cooked in {:.2?}: {} points, {} primitives",
                    self.name,
                    self.operator.kind(),
                    elapsed,
                    geometry.point_count(),
                    geometry.primitive_count()
                );
                let handle = GeometryHandle::new(geometry);
                self.output = Some(handle.clone());
                self.state = ExecutionState::Clean;
                Some(handle)
            }
            Err(err) => {
                debug!("{} ({}) failed: {err}", self.name, self.operator.kind());
                self.set_error(err.to_string());
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::primitives::box_geometry;

    #[derive(Debug)]
    struct Passthrough;

    impl Operator for Passthrough {
        fn kind(&self) -> &'static str {
            "passthrough"
        }

        fn parameters(&self) -> Vec<ParameterDefinition> {
            vec![ParameterDefinition::float("scale", 1.0), ParameterDefinition::input_group()]
        }

        fn execute(&self, ctx: &CookContext) -> Result<GeometryContainer, OperatorError> {
            Ok(ctx.require_input(0)?.clone())
        }
    }

    #[test]
    fn test_parameter_coercion() {
        assert_eq!(f32::from_parameter(&ParameterValue::Int(3)), Some(3.0));
        assert_eq!(i32::from_parameter(&ParameterValue::Float(2.6)), Some(3));
        assert_eq!(bool::from_parameter(&ParameterValue::Int(2)), Some(true));
        assert_eq!(usize::from_parameter(&ParameterValue::Int(-4)), Some(0));
        assert_eq!(String::from_parameter(&ParameterValue::Int(1)), None);
    }

    #[test]
    fn test_untagged_values_from_toml() {
        #[derive(Deserialize)]
        struct Params {
            params: BTreeMap<String, ParameterValue>,
        }
        let parsed: Params =
            toml::from_str("[params]\nwidth = 0.2\nsegments = 3\nclamp = true\nname = \"a\"\noffset = [1.0, 0.0, 2.0]")
                .unwrap();
        assert_eq!(parsed.params["width"], ParameterValue::Float(0.2));
        assert_eq!(parsed.params["segments"], ParameterValue::Int(3));
        assert_eq!(parsed.params["clamp"], ParameterValue::Bool(true));
        assert_eq!(parsed.params["name"], ParameterValue::String("a".into()));
        assert_eq!(
            parsed.params["offset"],
            ParameterValue::Vector3(Vec3f::new(1.0, 0.0, 2.0))
        );
    }

    #[test]
    fn test_cook_caches_until_dirty() {
        let mut node = SopNode::new("pass1", Box::new(Passthrough));
        assert_eq!(node.parameter("scale"), Some(&ParameterValue::Float(1.0)));
        node.set_input(0, box_geometry(Vec3f::repeat(1.0), true));
        let first = node.cook().unwrap();
        assert_eq!(node.state(), ExecutionState::Clean);
        let second = node.cook().unwrap();
        assert!(first.ptr_eq(&second));

        node.set_parameter("scale", 2.0f32);
        assert_eq!(node.state(), ExecutionState::Dirty);
        let third = node.cook().unwrap();
        assert!(!first.ptr_eq(&third));
        assert!(node.last_cook_time().is_some());
    }

    #[test]
    fn test_missing_input_is_recorded() {
        let mut node = SopNode::new("pass1", Box::new(Passthrough));
        assert!(node.cook().is_none());
        assert_eq!(node.state(), ExecutionState::Error);
        assert_eq!(node.error(), Some("no input geometry connected on port 0"));
    }

    #[test]
    fn test_reentrant_cook_is_circular() {
        let mut node = SopNode::new("loop1", Box::new(Passthrough));
        node.state = ExecutionState::Computing;
        assert!(node.cook().is_none());
        assert_eq!(node.error(), Some("Circular dependency detected in node: loop1"));
    }

    #[test]
    fn test_missing_input_group_fails_selection() {
        let params = BTreeMap::from([(INPUT_GROUP.to_string(), ParameterValue::from("top"))]);
        let ctx = CookContext::new(&params, &[]);
        let geo = box_geometry(Vec3f::repeat(1.0), true);
        assert!(matches!(
            ctx.selection(&geo, ElementClass::Primitive),
            Err(OperatorError::Geometry(GeometryError::MissingGroup(_)))
        ));
        assert!(!ctx.is_in_group(&geo, ElementClass::Primitive, 0));
    }
}
