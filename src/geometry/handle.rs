// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Copy-on-write sharing of geometry between pipeline stages

use super::container::GeometryContainer;
use std::ops::Deref;
use std::sync::Arc;

/// Shared geometry. Clones are cheap; `write` deep-copies only while the
/// container is shared with another handle.
#[derive(Debug, Clone, Default)]
pub struct GeometryHandle(Arc<GeometryContainer>);

impl GeometryHandle {
    pub fn new(geometry: GeometryContainer) -> Self {
        Self(Arc::new(geometry))
    }

    pub fn read(&self) -> &GeometryContainer {
        &self.0
    }

    pub fn write(&mut self) -> &mut GeometryContainer {
        Arc::make_mut(&mut self.0)
    }

    pub fn is_unique(&self) -> bool {
        Arc::strong_count(&self.0) == 1
    }

    pub fn ptr_eq(&self, other: &GeometryHandle) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Takes the container out, cloning only when shared.
    pub fn into_inner(self) -> GeometryContainer {
        Arc::try_unwrap(self.0).unwrap_or_else(|shared| (*shared).clone())
    }
}

impl Deref for GeometryHandle {
    type Target = GeometryContainer;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<GeometryContainer> for GeometryHandle {
    fn from(geometry: GeometryContainer) -> Self {
        Self::new(geometry)
    }
}
