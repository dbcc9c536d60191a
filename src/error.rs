// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Error types for the attribute system, topology and operators

use crate::attributes::{AttributeType, ElementClass};
use thiserror::Error;

/// Contract violations inside attribute storage and attribute sets.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AttributeError {
    /// Source and destination storages hold different value types.
    #[error("type mismatch in {operation}: expected {expected}, found {found}")]
    TypeMismatch {
        operation: &'static str,
        expected: AttributeType,
        found: AttributeType,
    },

    /// Element index beyond the storage length.
    #[error("index out of range in {operation}: {index} >= {len}")]
    IndexOutOfRange {
        operation: &'static str,
        index: usize,
        len: usize,
    },

    /// Attribute set merge or insert across element classes.
    #[error("element class mismatch: expected {expected}, found {found}")]
    ClassMismatch {
        expected: ElementClass,
        found: ElementClass,
    },

    #[error("attribute '{0}' already exists")]
    Duplicate(String),

    #[error("attribute '{0}' not found")]
    NotFound(String),
}

/// Index violations in the vertex/point/primitive tables.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TopologyError {
    #[error("vertex index {index} out of range (vertex count {count})")]
    VertexOutOfRange { index: usize, count: usize },

    #[error("point index {index} out of range (point count {count})")]
    PointOutOfRange { index: usize, count: usize },

    #[error("primitive index {index} out of range (primitive count {count})")]
    PrimitiveOutOfRange { index: usize, count: usize },
}

/// Failures of container-level operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeometryError {
    #[error("Group '{0}' does not exist on geometry")]
    MissingGroup(String),

    #[error("operation not supported for element class {0}")]
    UnsupportedClass(ElementClass),

    #[error(transparent)]
    Topology(#[from] TopologyError),

    #[error(transparent)]
    Attribute(#[from] AttributeError),
}

/// Wrangle programs that fail to compile.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExpressionError {
    #[error("syntax error: {0}")]
    Syntax(String),

    #[error("unknown function '{0}'")]
    UnknownFunction(String),

    #[error("function '{name}' takes {expected} argument(s), got {found}")]
    Arity {
        name: String,
        expected: usize,
        found: usize,
    },

    #[error("unsupported attribute reference '@{0}'")]
    UnsupportedAttribute(String),
}

/// Recoverable operator failures, surfaced through `SopNode::error`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum OperatorError {
    #[error("no input geometry connected on port {0}")]
    MissingInput(usize),

    #[error("input geometry has no {class} attribute '{name}'")]
    MissingAttribute { name: String, class: ElementClass },

    #[error("attribute '{name}' has type {found}, expected {expected}")]
    WrongAttributeType {
        name: String,
        expected: AttributeType,
        found: AttributeType,
    },

    #[error("invalid parameter '{name}': {reason}")]
    InvalidParameter { name: String, reason: String },

    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),

    #[error("external mesh conversion failed: {0}")]
    External(String),

    #[error("Circular dependency detected in node: {0}")]
    CircularDependency(String),

    #[error(transparent)]
    Geometry(#[from] GeometryError),
}

impl OperatorError {
    pub fn missing_attribute(name: &str, class: ElementClass) -> Self {
        Self::MissingAttribute {
            name: name.to_string(),
            class,
        }
    }

    pub fn invalid_parameter(name: &str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<TopologyError> for OperatorError {
    fn from(err: TopologyError) -> Self {
        Self::Geometry(GeometryError::Topology(err))
    }
}

impl From<AttributeError> for OperatorError {
    fn from(err: AttributeError) -> Self {
        Self::Geometry(GeometryError::Attribute(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_group_message() {
        let err = GeometryError::MissingGroup("top".to_string());
        assert_eq!(err.to_string(), "Group 'top' does not exist on geometry");
    }

    #[test]
    fn test_topology_error_lifts_into_operator_error() {
        let err: OperatorError = TopologyError::PointOutOfRange { index: 9, count: 8 }.into();
        assert!(matches!(
            err,
            OperatorError::Geometry(GeometryError::Topology(_))
        ));
        assert!(err.to_string().contains("point index 9"));
    }
}
