// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Well-known attribute names

pub const POSITION: &str = "P";
pub const NORMAL: &str = "N";
pub const COLOR: &str = "Cd";
pub const UV: &str = "uv";
pub const ID: &str = "id";
pub const PSCALE: &str = "pscale";
pub const INSTANCE_ID: &str = "instance_id";
pub const SOURCE_FACE: &str = "source_face";
pub const AREA: &str = "area";
pub const REST_POSITION: &str = "rest_P";
