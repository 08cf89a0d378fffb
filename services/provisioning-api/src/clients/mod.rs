//! Clients for the upstream services this API depends on.
//!
//! Each client is consumed through a trait so request handlers and the
//! orchestrator can be exercised against in-memory fakes.

pub mod image_builder;
pub mod sources;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use image_builder::{ImageBuilderClient, ImageBuilderError};
pub use sources::{SourcesClient, SourcesError};

/// A cloud account identity registered in the sources inventory.
///
/// Projection of the upstream source record; fields the provisioning
/// flow does not consume are dropped at deserialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub id: String,
    pub name: String,
    pub source_type_id: String,
    pub uid: String,
}

/// Sources inventory operations consumed by provisioning.
#[async_trait]
pub trait Sources: Send + Sync {
    /// Probe the upstream service for readiness.
    async fn ready(&self) -> Result<(), SourcesError>;

    /// List all sources associated with the provisioning application type.
    async fn list_provisioning_sources(&self) -> Result<Vec<Source>, SourcesError>;

    /// Resolve the launch credential (ARN) linked to a source.
    async fn get_arn(&self, source_id: &str) -> Result<String, SourcesError>;
}

/// Image catalog operations consumed by provisioning.
#[async_trait]
pub trait ImageBuilder: Send + Sync {
    /// Resolve the AWS machine image (AMI) behind an image id.
    async fn get_aws_ami(&self, image_id: &str) -> Result<String, ImageBuilderError>;
}
