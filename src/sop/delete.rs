// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Delete points or primitives by group, pattern or wholesale

use super::node::{CookContext, Operator, ParameterDefinition};
use super::class_from_menu;
use crate::attributes::ElementClass;
use crate::error::{GeometryError, OperatorError};
use crate::geometry::{groups, GeometryContainer};
use log::debug;

const TEMP_GROUP: &str = "__delete_temp__";
const DEFAULT_RANGE_END: i32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DeleteMode {
    Selected,
    NonSelected,
    Pattern,
    All,
}

impl DeleteMode {
    fn from_index(index: i32) -> Self {
        match index {
            1 => Self::NonSelected,
            2 => Self::Pattern,
            3 => Self::All,
            _ => Self::Selected,
        }
    }
}

#[derive(Debug, Default)]
pub struct DeleteOp;

impl DeleteOp {
    /// Inclusive range, both ends clamped into the element range.
    fn range(count: usize, start: i32, end: i32) -> Vec<usize> {
        if count == 0 {
            return Vec::new();
        }
        let last = count as i32 - 1;
        let start = start.clamp(0, last);
        let end = end.clamp(0, last);
        (start..=end).map(|i| i as usize).collect()
    }

    fn every_nth(count: usize, step: i32, offset: i32) -> Vec<usize> {
        if step <= 0 {
            return Vec::new();
        }
        (offset.max(0) as usize..count).step_by(step as usize).collect()
    }

    fn resolve(
        ctx: &CookContext,
        input: &GeometryContainer,
        class: ElementClass,
        mode: DeleteMode,
    ) -> Result<Vec<usize>, OperatorError> {
        let count = input.element_count(class);
        match mode {
            DeleteMode::All => Ok((0..count).collect()),
            DeleteMode::Pattern => {
                let selection = if ctx.get("pattern_type", 0) == 1 {
                    Self::every_nth(count, ctx.get("nth_step", 2), ctx.get("nth_offset", 0))
                } else {
                    Self::range(
                        count,
                        ctx.get("range_start", 0),
                        ctx.get("range_end", DEFAULT_RANGE_END),
                    )
                };
                Ok(selection)
            }
            DeleteMode::Selected | DeleteMode::NonSelected => {
                let group: String = ctx.get("group", String::new());
                if group.is_empty() {
                    // nothing selected: its complement is everything
                    return Ok(match mode {
                        DeleteMode::NonSelected => (0..count).collect(),
                        _ => Vec::new(),
                    });
                }
                if !groups::has_group(input, &group, class) {
                    return Err(GeometryError::MissingGroup(group).into());
                }
                let members = groups::group_elements(input, &group, class);
                if mode == DeleteMode::Selected {
                    Ok(members)
                } else {
                    Ok((0..count)
                        .filter(|&i| !groups::is_in_group(input, &group, class, i))
                        .collect())
                }
            }
        }
    }
}

impl Operator for DeleteOp {
    fn kind(&self) -> &'static str {
        "delete"
    }

    fn parameters(&self) -> Vec<ParameterDefinition> {
        vec![
            ParameterDefinition::menu("class", 0, &["Point", "Primitive"]),
            ParameterDefinition::menu("mode", 0, &["Selected", "Non-Selected", "Pattern", "All"]),
            ParameterDefinition::string("group", ""),
            ParameterDefinition::menu("pattern_type", 0, &["Range", "Every Nth"]),
            ParameterDefinition::int("range_start", 0),
            ParameterDefinition::int("range_end", DEFAULT_RANGE_END),
            ParameterDefinition::int("nth_step", 2),
            ParameterDefinition::int("nth_offset", 0),
            ParameterDefinition::bool("cleanup", true),
        ]
    }

    fn execute(&self, ctx: &CookContext) -> Result<GeometryContainer, OperatorError> {
        let input = ctx.require_input(0)?;
        let class = class_from_menu(ctx.get("class", 0));
        let mode = DeleteMode::from_index(ctx.get("mode", 0));
        let cleanup = ctx.get("cleanup", true);

        let selection = Self::resolve(ctx, input, class, mode)?;
        debug!("delete: {} {} element(s) selected", selection.len(), class);
        if selection.is_empty() {
            return Ok(input.clone());
        }
        if class == ElementClass::Point && selection.len() == input.point_count() {
            return Ok(GeometryContainer::new());
        }

        let mut staged = input.clone();
        groups::create_group(&mut staged, TEMP_GROUP, class);
        groups::add_elements(&mut staged, TEMP_GROUP, class, &selection);
        let mut result = staged.delete_elements(TEMP_GROUP, class, cleanup)?;
        groups::delete_group(&mut result, TEMP_GROUP, class);
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes::Vec3f;
    use crate::geometry::primitives::{box_geometry, grid};
    use crate::sop::node::SopNode;

    fn node(geo: GeometryContainer) -> SopNode {
        let mut node = SopNode::new("delete1", Box::new(DeleteOp));
        node.set_input(0, geo);
        node
    }

    #[test]
    fn test_range_is_inclusive_and_clamped() {
        assert_eq!(DeleteOp::range(5, 3, 99), vec![3, 4]);
        assert_eq!(DeleteOp::range(5, -2, 1), vec![0, 1]);
        assert!(DeleteOp::range(0, 0, 3).is_empty());
        assert_eq!(DeleteOp::every_nth(7, 3, 1), vec![1, 4]);
        assert!(DeleteOp::every_nth(7, 0, 1).is_empty());
    }

    #[test]
    fn test_delete_primitive_pattern() {
        let mut node = node(box_geometry(Vec3f::repeat(2.0), true));
        node.set_parameter("class", 1);
        node.set_parameter("mode", 2);
        node.set_parameter("range_start", 0);
        node.set_parameter("range_end", 0);
        let out = node.cook().unwrap();
        assert_eq!(out.primitive_count(), 5);
        assert_eq!(out.point_count(), 8);
        assert!(!groups::has_group(&out, TEMP_GROUP, ElementClass::Primitive));
    }

    #[test]
    fn test_delete_non_selected() {
        let mut geo = grid(2.0, 2.0, 3, 3);
        groups::create_group(&mut geo, "keep", ElementClass::Primitive);
        groups::add_to_group(&mut geo, "keep", ElementClass::Primitive, 3);
        let mut node = node(geo);
        node.set_parameter("class", 1);
        node.set_parameter("mode", 1);
        node.set_parameter("group", "keep");
        let out = node.cook().unwrap();
        assert_eq!(out.primitive_count(), 1);
        assert_eq!(out.point_count(), 4);
        assert!(groups::is_in_group(&out, "keep", ElementClass::Primitive, 0));
    }

    #[test]
    fn test_non_selected_without_group_deletes_everything() {
        let mut complement = node(box_geometry(Vec3f::repeat(2.0), true));
        complement.set_parameter("class", 1);
        complement.set_parameter("mode", 1);
        let out = complement.cook().unwrap();
        assert_eq!(out.primitive_count(), 0);
        assert_eq!(out.point_count(), 0);

        let mut selected = node(box_geometry(Vec3f::repeat(2.0), true));
        selected.set_parameter("class", 1);
        let kept = selected.cook().unwrap();
        assert_eq!(kept.primitive_count(), 6);
    }

    #[test]
    fn test_missing_group_errors() {
        let mut node = node(box_geometry(Vec3f::repeat(2.0), true));
        node.set_parameter("group", "ghost");
        assert!(node.cook().is_none());
        assert_eq!(node.error(), Some("Group 'ghost' does not exist on geometry"));
    }

    #[test]
    fn test_empty_selection_is_identity() {
        let mut geo = box_geometry(Vec3f::repeat(2.0), true);
        groups::create_group(&mut geo, "none", ElementClass::Point);
        let mut node = node(geo);
        node.set_parameter("group", "none");
        let out = node.cook().unwrap();
        assert_eq!(out.point_count(), 8);
        assert_eq!(out.primitive_count(), 6);
    }

    #[test]
    fn test_delete_all_points_empties() {
        let mut node = node(box_geometry(Vec3f::repeat(2.0), true));
        node.set_parameter("mode", 3);
        let out = node.cook().unwrap();
        assert_eq!(out.point_count(), 0);
        assert_eq!(out.primitive_count(), 0);
    }
}
