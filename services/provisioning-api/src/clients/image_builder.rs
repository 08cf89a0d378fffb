//! Client for the image builder compose API.
//!
//! Provisioning only needs one lookup: the AMI an image compose was
//! uploaded as.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;
use tracing::trace;

use crate::clients::ImageBuilder;
use crate::config::ImageBuilderConfig;

const IDENTITY_HEADER: &str = "x-rh-identity";

/// Errors returned by the image builder client.
#[derive(Debug, Error)]
pub enum ImageBuilderError {
    #[error("image compose not found")]
    ComposeNotFound,

    #[error("compose {image_id} has no AWS machine image")]
    MissingAmi { image_id: String },

    #[error("{operation}: unexpected status {status}")]
    UnexpectedStatus { operation: &'static str, status: u16 },

    #[error("{operation}: {source}")]
    Transport {
        operation: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("image builder client initialization: {0}")]
    Initialization(String),
}

#[derive(Debug, Deserialize)]
struct ComposeStatus {
    image_status: ImageStatus,
}

#[derive(Debug, Deserialize)]
struct ImageStatus {
    #[serde(default)]
    upload_status: Option<UploadStatus>,
}

#[derive(Debug, Deserialize)]
struct UploadStatus {
    #[serde(rename = "type")]
    upload_type: String,
    options: UploadOptions,
}

#[derive(Debug, Deserialize)]
struct UploadOptions {
    #[serde(default)]
    ami: Option<String>,
}

/// Client for the image builder API.
pub struct ImageBuilderClient {
    client: reqwest::Client,
    base_url: String,
}

impl ImageBuilderClient {
    /// Create a client from a validated configuration.
    pub fn new(config: &ImageBuilderConfig) -> Result<Self, ImageBuilderError> {
        let mut headers = HeaderMap::new();
        if let Some(identity) = &config.identity_header {
            let value = HeaderValue::from_str(identity)
                .map_err(|e| ImageBuilderError::Initialization(format!("identity header: {e}")))?;
            headers.insert(IDENTITY_HEADER, value);
        }

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| ImageBuilderError::Initialization(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait]
impl ImageBuilder for ImageBuilderClient {
    async fn get_aws_ami(&self, image_id: &str) -> Result<String, ImageBuilderError> {
        trace!(image_id = %image_id, "Fetching AMI of image compose");

        let operation = "get compose status";
        let response = self
            .client
            .get(self.url(&format!("/composes/{image_id}")))
            .send()
            .await
            .map_err(|e| ImageBuilderError::Transport {
                operation,
                source: e,
            })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(ImageBuilderError::ComposeNotFound);
        }
        if !status.is_success() {
            return Err(ImageBuilderError::UnexpectedStatus {
                operation,
                status: status.as_u16(),
            });
        }

        let compose: ComposeStatus =
            response
                .json()
                .await
                .map_err(|e| ImageBuilderError::Transport {
                    operation,
                    source: e,
                })?;

        compose
            .image_status
            .upload_status
            .filter(|upload| upload.upload_type == "aws")
            .and_then(|upload| upload.options.ami)
            .ok_or_else(|| ImageBuilderError::MissingAmi {
                image_id: image_id.to_string(),
            })
    }
}
