// SPDX-FileCopyrightText: 2026 Leadhub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed query operations, one module per table.

pub mod bindings;
pub mod leads;
pub mod messages;
pub mod users;
