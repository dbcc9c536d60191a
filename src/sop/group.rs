// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Build point or primitive groups from ranges, patterns, random picks or a box

use super::class_from_menu;
use super::node::{CookContext, Operator, ParameterDefinition};
use crate::attributes::{ElementClass, Vec3f};
use crate::error::OperatorError;
use crate::geometry::mesh_utils::primitive_centroids;
use crate::geometry::{groups, BoundingBox, GeometryContainer};
use log::debug;

const TEMP_RANDOM: &str = "__temp_random__";

#[derive(Debug, Default)]
pub struct GroupOp;

impl GroupOp {
    fn select(
        ctx: &CookContext,
        geo: &mut GeometryContainer,
        class: ElementClass,
    ) -> Result<Vec<usize>, OperatorError> {
        let count = geo.element_count(class);
        let selection = match ctx.get("selection_mode", 0) {
            // [start, end)
            0 => {
                let start: usize = ctx.get("range_start", 0);
                let end = ctx.get::<usize>("range_end", 10).min(count);
                (start.min(end)..end).collect()
            }
            1 => {
                let step: i32 = ctx.get("pattern_step", 2);
                let offset: i32 = ctx.get("pattern_offset", 0);
                if step < 1 || offset < 0 {
                    return Err(OperatorError::invalid_parameter(
                        "pattern_step",
                        "step must be at least 1 and offset non-negative",
                    ));
                }
                (offset as usize..count).step_by(step as usize).collect()
            }
            2 => {
                let picked = ctx.get::<usize>("random_count", 10);
                let seed = ctx.get::<u64>("random_seed", 0);
                groups::select_random(geo, TEMP_RANDOM, class, picked, seed);
                let members = groups::group_elements(geo, TEMP_RANDOM, class);
                groups::delete_group(geo, TEMP_RANDOM, class);
                members
            }
            3 => (0..count).collect(),
            4 => {
                let bbox = BoundingBox::new(
                    ctx.get("bbox_min", Vec3f::repeat(-1.0)),
                    ctx.get("bbox_max", Vec3f::repeat(1.0)),
                );
                let samples: Vec<Vec3f> = match class {
                    ElementClass::Point => geo
                        .positions()
                        .ok_or_else(|| OperatorError::missing_attribute("P", ElementClass::Point))?
                        .to_vec(),
                    _ => primitive_centroids(geo),
                };
                samples
                    .iter()
                    .enumerate()
                    .filter(|(_, p)| bbox.contains(p))
                    .map(|(i, _)| i)
                    .collect()
            }
            other => {
                return Err(OperatorError::invalid_parameter(
                    "selection_mode",
                    format!("unknown mode {other}"),
                ))
            }
        };
        Ok(selection)
    }
}

impl Operator for GroupOp {
    fn kind(&self) -> &'static str {
        "group"
    }

    fn parameters(&self) -> Vec<ParameterDefinition> {
        vec![
            ParameterDefinition::string("group_name", "group1"),
            ParameterDefinition::menu("element_class", 0, &["Points", "Primitives"]),
            ParameterDefinition::menu(
                "operation",
                0,
                &["Create/Replace", "Add to Existing", "Remove from Existing"],
            ),
            ParameterDefinition::menu(
                "selection_mode",
                0,
                &["Range", "Every Nth", "Random", "All", "Bounding Box"],
            ),
            ParameterDefinition::int("range_start", 0),
            ParameterDefinition::int("range_end", 10),
            ParameterDefinition::int("pattern_step", 2),
            ParameterDefinition::int("pattern_offset", 0),
            ParameterDefinition::int("random_count", 10),
            ParameterDefinition::int("random_seed", 0),
            ParameterDefinition::vector3("bbox_min", Vec3f::repeat(-1.0)),
            ParameterDefinition::vector3("bbox_max", Vec3f::repeat(1.0)),
        ]
    }

    fn execute(&self, ctx: &CookContext) -> Result<GeometryContainer, OperatorError> {
        let mut geo = ctx.require_input(0)?.clone();
        let name: String = ctx.get("group_name", "group1".to_string());
        if name.is_empty() {
            return Err(OperatorError::invalid_parameter("group_name", "group name is empty"));
        }
        let class = class_from_menu(ctx.get("element_class", 0));
        let operation: i32 = ctx.get("operation", 0);

        let selection = Self::select(ctx, &mut geo, class)?;
        match operation {
            1 => {
                if !groups::has_group(&geo, &name, class) {
                    groups::create_group(&mut geo, &name, class);
                }
                groups::add_elements(&mut geo, &name, class, &selection);
            }
            2 => {
                groups::remove_elements(&mut geo, &name, class, &selection);
            }
            _ => {
                if groups::has_group(&geo, &name, class) {
                    groups::clear_group(&mut geo, &name, class);
                } else {
                    groups::create_group(&mut geo, &name, class);
                }
                groups::add_elements(&mut geo, &name, class, &selection);
            }
        }
        debug!(
            "group '{}': {} {} element(s)",
            name,
            groups::group_size(&geo, &name, class),
            class
        );
        Ok(geo)
    }
}
