// SPDX-FileCopyrightText: 2026 Leadhub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Base lifecycle trait for platform capabilities.

use async_trait::async_trait;

use crate::error::LeadhubError;

/// Lifecycle and identity shared by every platform capability.
///
/// A capability owns one connection to its platform for the lifetime of the
/// process. Callers hold it behind an `Arc` and pass it into the engine at
/// construction time.
#[async_trait]
pub trait Capability: Send + Sync + 'static {
    /// Human-readable name of this capability instance.
    fn name(&self) -> &str;

    /// Semantic version of the capability implementation.
    fn version(&self) -> semver::Version;

    /// Establish the platform connection.
    async fn start(&self) -> Result<(), LeadhubError>;

    /// Release the platform connection.
    async fn stop(&self) -> Result<(), LeadhubError>;

    /// Whether the capability currently holds a usable connection.
    fn is_active(&self) -> bool;
}
