// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Named element groups
//!
//! A group is an Int attribute on the point or primitive set holding 0 or 1
//! per element. The attribute name carries the `group_` prefix; every
//! function here accepts the bare name or the prefixed one.

use super::container::GeometryContainer;
use crate::attributes::{AttributeType, AttributeValue, ElementClass, InterpolationMode};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

pub const GROUP_PREFIX: &str = "group_";

/// Attribute name backing the group `name`.
pub fn attribute_name(name: &str) -> String {
    if name.starts_with(GROUP_PREFIX) {
        name.to_string()
    } else {
        format!("{GROUP_PREFIX}{name}")
    }
}

fn supports(class: ElementClass) -> bool {
    matches!(class, ElementClass::Point | ElementClass::Primitive)
}

fn members<'a>(geo: &'a GeometryContainer, name: &str, class: ElementClass) -> Option<&'a [i32]> {
    if !supports(class) {
        return None;
    }
    geo.values::<i32>(class, &attribute_name(name))
}

fn members_mut<'a>(
    geo: &'a mut GeometryContainer,
    name: &str,
    class: ElementClass,
) -> Option<&'a mut [i32]> {
    if !supports(class) {
        return None;
    }
    geo.values_mut::<i32>(class, &attribute_name(name))
}

/// Creates an empty group. False when it already exists.
pub fn create_group(geo: &mut GeometryContainer, name: &str, class: ElementClass) -> bool {
    if !supports(class) || name.is_empty() {
        return false;
    }
    geo.add_attribute(
        class,
        &attribute_name(name),
        AttributeType::Int,
        InterpolationMode::Discrete,
    )
}

fn ensure_group(geo: &mut GeometryContainer, name: &str, class: ElementClass) -> bool {
    has_group(geo, name, class) || create_group(geo, name, class)
}

pub fn delete_group(geo: &mut GeometryContainer, name: &str, class: ElementClass) -> bool {
    supports(class) && geo.remove_attribute(class, &attribute_name(name))
}

pub fn has_group(geo: &GeometryContainer, name: &str, class: ElementClass) -> bool {
    members(geo, name, class).is_some()
}

pub fn add_to_group(geo: &mut GeometryContainer, name: &str, class: ElementClass, index: usize) -> bool {
    add_elements(geo, name, class, &[index])
}

/// Marks every listed index. Out-of-range indices are skipped.
pub fn add_elements(geo: &mut GeometryContainer, name: &str, class: ElementClass, indices: &[usize]) -> bool {
    set_membership(geo, name, class, indices, 1)
}

pub fn remove_from_group(
    geo: &mut GeometryContainer,
    name: &str,
    class: ElementClass,
    index: usize,
) -> bool {
    remove_elements(geo, name, class, &[index])
}

pub fn remove_elements(
    geo: &mut GeometryContainer,
    name: &str,
    class: ElementClass,
    indices: &[usize],
) -> bool {
    set_membership(geo, name, class, indices, 0)
}

fn set_membership(
    geo: &mut GeometryContainer,
    name: &str,
    class: ElementClass,
    indices: &[usize],
    flag: i32,
) -> bool {
    let Some(values) = members_mut(geo, name, class) else {
        return false;
    };
    for &i in indices {
        if let Some(slot) = values.get_mut(i) {
            *slot = flag;
        }
    }
    true
}

pub fn is_in_group(geo: &GeometryContainer, name: &str, class: ElementClass, index: usize) -> bool {
    members(geo, name, class)
        .and_then(|values| values.get(index))
        .is_some_and(|&v| v != 0)
}

/// Member indices in ascending order.
pub fn group_elements(geo: &GeometryContainer, name: &str, class: ElementClass) -> Vec<usize> {
    members(geo, name, class)
        .map(|values| {
            values
                .iter()
                .enumerate()
                .filter(|(_, &v)| v != 0)
                .map(|(i, _)| i)
                .collect()
        })
        .unwrap_or_default()
}

pub fn group_size(geo: &GeometryContainer, name: &str, class: ElementClass) -> usize {
    members(geo, name, class).map_or(0, |values| values.iter().filter(|&&v| v != 0).count())
}

/// Empties the group but keeps it.
pub fn clear_group(geo: &mut GeometryContainer, name: &str, class: ElementClass) -> bool {
    let Some(values) = members_mut(geo, name, class) else {
        return false;
    };
    values.fill(0);
    true
}

/// Group names on `class`, without the prefix, sorted.
pub fn group_names(geo: &GeometryContainer, class: ElementClass) -> Vec<String> {
    geo.attributes(class)
        .iter()
        .filter(|(name, storage)| {
            name.starts_with(GROUP_PREFIX) && storage.attr_type() == AttributeType::Int
        })
        .map(|(name, _)| name[GROUP_PREFIX.len()..].to_string())
        .collect()
}

fn combine(
    geo: &mut GeometryContainer,
    a: &str,
    b: &str,
    result: &str,
    class: ElementClass,
    op: impl Fn(bool, bool) -> bool,
) -> bool {
    let (Some(lhs), Some(rhs)) = (members(geo, a, class), members(geo, b, class)) else {
        return false;
    };
    let combined: Vec<i32> = lhs
        .iter()
        .zip(rhs)
        .map(|(&x, &y)| i32::from(op(x != 0, y != 0)))
        .collect();
    if !ensure_group(geo, result, class) {
        return false;
    }
    match members_mut(geo, result, class) {
        Some(values) => {
            values.copy_from_slice(&combined);
            true
        }
        None => false,
    }
}

pub fn union(geo: &mut GeometryContainer, a: &str, b: &str, result: &str, class: ElementClass) -> bool {
    combine(geo, a, b, result, class, |x, y| x || y)
}

pub fn intersection(
    geo: &mut GeometryContainer,
    a: &str,
    b: &str,
    result: &str,
    class: ElementClass,
) -> bool {
    combine(geo, a, b, result, class, |x, y| x && y)
}

pub fn difference(
    geo: &mut GeometryContainer,
    a: &str,
    b: &str,
    result: &str,
    class: ElementClass,
) -> bool {
    combine(geo, a, b, result, class, |x, y| x && !y)
}

/// Writes the complement of `name` into `result` (which may be `name`).
pub fn invert(geo: &mut GeometryContainer, name: &str, result: &str, class: ElementClass) -> bool {
    combine(geo, name, name, result, class, |x, _| !x)
}

/// Adds every `step`-th element starting at `offset`. Fails on a zero step.
pub fn select_pattern(
    geo: &mut GeometryContainer,
    name: &str,
    class: ElementClass,
    step: usize,
    offset: usize,
) -> bool {
    if step == 0 || !ensure_group(geo, name, class) {
        return false;
    }
    let count = geo.element_count(class);
    let picked: Vec<usize> = (offset..count).step_by(step).collect();
    add_elements(geo, name, class, &picked)
}

/// Adds elements in `[start, end)`, with `end` clamped to the element count.
pub fn select_range(
    geo: &mut GeometryContainer,
    name: &str,
    class: ElementClass,
    start: usize,
    end: usize,
) -> bool {
    if !ensure_group(geo, name, class) {
        return false;
    }
    let end = end.min(geo.element_count(class));
    let picked: Vec<usize> = (start.min(end)..end).collect();
    add_elements(geo, name, class, &picked)
}

/// Adds `count` distinct elements drawn with a seeded shuffle.
pub fn select_random(
    geo: &mut GeometryContainer,
    name: &str,
    class: ElementClass,
    count: usize,
    seed: u64,
) -> bool {
    if !ensure_group(geo, name, class) {
        return false;
    }
    let mut rng = StdRng::seed_from_u64(seed);
    let mut all: Vec<usize> = (0..geo.element_count(class)).collect();
    all.shuffle(&mut rng);
    all.truncate(count);
    add_elements(geo, name, class, &all)
}

/// Adds every element whose `attribute` value satisfies `predicate`.
pub fn select_by_attribute<T: AttributeValue>(
    geo: &mut GeometryContainer,
    name: &str,
    class: ElementClass,
    attribute: &str,
    predicate: impl Fn(&T) -> bool,
) -> bool {
    let Some(values) = geo.values::<T>(class, attribute) else {
        return false;
    };
    let picked: Vec<usize> = values
        .iter()
        .enumerate()
        .filter(|(_, v)| predicate(v))
        .map(|(i, _)| i)
        .collect();
    ensure_group(geo, name, class) && add_elements(geo, name, class, &picked)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes::Vec3f;

    fn points(n: usize) -> GeometryContainer {
        let mut geo = GeometryContainer::new();
        for i in 0..n {
            geo.add_point(Vec3f::new(i as f32, 0.0, 0.0));
        }
        geo
    }

    #[test]
    fn test_create_is_not_idempotent() {
        let mut geo = points(4);
        assert!(create_group(&mut geo, "sel", ElementClass::Point));
        assert!(!create_group(&mut geo, "sel", ElementClass::Point));
        assert!(has_group(&geo, "group_sel", ElementClass::Point));
        assert!(!has_group(&geo, "sel", ElementClass::Primitive));
        assert!(!create_group(&mut geo, "v", ElementClass::Vertex));
        assert_eq!(group_names(&geo, ElementClass::Point), vec!["sel".to_string()]);
    }

    #[test]
    fn test_membership() {
        let mut geo = points(5);
        create_group(&mut geo, "sel", ElementClass::Point);
        add_elements(&mut geo, "sel", ElementClass::Point, &[0, 2, 4, 99]);
        remove_from_group(&mut geo, "sel", ElementClass::Point, 2);
        assert_eq!(group_elements(&geo, "sel", ElementClass::Point), vec![0, 4]);
        assert!(is_in_group(&geo, "sel", ElementClass::Point, 4));
        assert!(!is_in_group(&geo, "sel", ElementClass::Point, 99));
        assert!(clear_group(&mut geo, "sel", ElementClass::Point));
        assert_eq!(group_size(&geo, "sel", ElementClass::Point), 0);
        assert!(has_group(&geo, "sel", ElementClass::Point));
    }

    #[test]
    fn test_complement_partitions() {
        let mut geo = points(10);
        select_pattern(&mut geo, "even", ElementClass::Point, 2, 0);
        invert(&mut geo, "even", "odd", ElementClass::Point);
        let even = group_size(&geo, "even", ElementClass::Point);
        let odd = group_size(&geo, "odd", ElementClass::Point);
        assert_eq!(even + odd, 10);
        for i in 0..10 {
            assert_ne!(
                is_in_group(&geo, "even", ElementClass::Point, i),
                is_in_group(&geo, "odd", ElementClass::Point, i)
            );
        }
    }

    #[test]
    fn test_set_operations() {
        let mut geo = points(6);
        select_range(&mut geo, "a", ElementClass::Point, 0, 4);
        select_range(&mut geo, "b", ElementClass::Point, 2, 100);
        intersection(&mut geo, "a", "b", "ab", ElementClass::Point);
        difference(&mut geo, "a", "b", "a_b", ElementClass::Point);
        union(&mut geo, "a", "b", "all", ElementClass::Point);
        assert_eq!(group_elements(&geo, "ab", ElementClass::Point), vec![2, 3]);
        assert_eq!(group_elements(&geo, "a_b", ElementClass::Point), vec![0, 1]);
        assert_eq!(group_size(&geo, "all", ElementClass::Point), 6);
    }

    #[test]
    fn test_random_is_seeded() {
        let mut a = points(50);
        let mut b = points(50);
        select_random(&mut a, "r", ElementClass::Point, 10, 7);
        select_random(&mut b, "r", ElementClass::Point, 10, 7);
        assert_eq!(group_size(&a, "r", ElementClass::Point), 10);
        assert_eq!(
            group_elements(&a, "r", ElementClass::Point),
            group_elements(&b, "r", ElementClass::Point)
        );
        assert!(!select_pattern(&mut a, "z", ElementClass::Point, 0, 0));
    }

    #[test]
    fn test_select_by_attribute() {
        let mut geo = points(4);
        select_by_attribute::<Vec3f>(&mut geo, "far", ElementClass::Point, "P", |p| p.x > 1.5);
        assert_eq!(group_elements(&geo, "far", ElementClass::Point), vec![2, 3]);
    }
}
