// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Procedural geometry kernel
//!
//! Polygon geometry with typed attributes on points, vertices, primitives
//! and detail, a node graph of surface operators (bevel, subdivide,
//! wrangle, ...) with dirty tracking and cached outputs, and TOML-driven
//! operator pipelines.

pub mod attributes;
pub mod cli;
pub mod config;
pub mod error;
pub mod geometry;
pub mod pipeline;
pub mod processing;
pub mod sop;

pub use attributes::{AttributeType, ElementClass, InterpolationMode, Vec3f};
pub use config::KernelConfig;
pub use error::{GeometryError, OperatorError};
pub use geometry::{GeometryContainer, GeometryHandle, SourceShape};
pub use pipeline::{Pipeline, PipelineSpec, StepSpec};
pub use sop::{create_operator, Operator, ParameterValue, SopNode};

use anyhow::Result;

/// Cooks a TOML pipeline document with the default configuration.
pub fn cook_pipeline(source: &str) -> Result<GeometryHandle> {
    let mut pipeline = Pipeline::from_toml(source, &KernelConfig::default())?;
    pipeline.cook()
}
