// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Concatenate every connected input

use super::node::{CookContext, Operator, ParameterDefinition, VARIADIC};
use crate::error::OperatorError;
use crate::geometry::GeometryContainer;
use log::debug;

#[derive(Debug, Default)]
pub struct MergeOp;

impl Operator for MergeOp {
    fn kind(&self) -> &'static str {
        "merge"
    }

    fn input_count(&self) -> usize {
        VARIADIC
    }

    fn parameters(&self) -> Vec<ParameterDefinition> {
        Vec::new()
    }

    fn execute(&self, ctx: &CookContext) -> Result<GeometryContainer, OperatorError> {
        let mut inputs = ctx.connected_inputs();
        let mut result = inputs.next().ok_or(OperatorError::MissingInput(0))?.clone();
        let mut merged = 1;
        for geo in inputs {
            result.merge(geo)?;
            merged += 1;
        }
        debug!(
            "merge: {} inputs, {} points, {} primitives",
            merged,
            result.point_count(),
            result.primitive_count()
        );
        Ok(result)
    }
}
