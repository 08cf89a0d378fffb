//! Client for the sources inventory service.
//!
//! Provisioning consumes four endpoints of the upstream API: listing
//! application types, listing the sources bound to an application
//! type, listing the authentications of a source, and fetching a
//! single application. The launch credential (ARN) of a source is
//! resolved through a chained lookup across those resources.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, trace, warn};

use crate::cache::AppTypeCache;
use crate::clients::{Source, Sources};
use crate::config::{Environment, SourcesConfig};

/// Application type name provisioning registers under in the sources inventory.
const PROVISIONING_TYPE_NAME: &str = "/insights/platform/provisioning";

/// Identity header forwarded to the upstream service.
const IDENTITY_HEADER: &str = "x-rh-identity";

/// Errors returned by the sources client.
#[derive(Debug, Error)]
pub enum SourcesError {
    #[error("provisioning application type not found")]
    ApplicationTypeNotFound,

    #[error("source not found")]
    SourceNotFound,

    #[error("authentication for source not found")]
    AuthenticationNotFound,

    #[error("application not found")]
    ApplicationNotFound,

    #[error("more than one application authentication linked to source {source_id}")]
    MoreThanOneAuthentication { source_id: String },

    #[error("no application authentication linked to source {source_id}")]
    MissingAuthentication { source_id: String },

    #[error("authentication of source {source_id} lacks a resource id or username")]
    MalformedAuthentication { source_id: String },

    #[error("source {source_id} is not associated with the provisioning application")]
    AuthenticationSourceAssociation { source_id: String },

    #[error("{operation}: unexpected status {status}")]
    UnexpectedStatus { operation: &'static str, status: u16 },

    #[error("{operation}: {source}")]
    Transport {
        operation: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("sources client initialization: {0}")]
    Initialization(String),
}

// Wire types. Unknown upstream fields are dropped on deserialization.

#[derive(Debug, Deserialize)]
struct DataEnvelope<T> {
    data: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct ApplicationTypeRecord {
    id: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct SourceRecord {
    id: String,
    name: String,
    source_type_id: String,
    uid: String,
}

impl From<SourceRecord> for Source {
    fn from(record: SourceRecord) -> Self {
        Source {
            id: record.id,
            name: record.name,
            source_type_id: record.source_type_id,
            uid: record.uid,
        }
    }
}

#[derive(Debug, Deserialize)]
struct AuthenticationRecord {
    #[serde(default)]
    resource_type: Option<String>,
    #[serde(default)]
    resource_id: Option<String>,
    #[serde(default)]
    username: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApplicationRecord {
    application_type_id: String,
}

/// Client for the sources inventory API.
#[derive(Debug)]
pub struct SourcesClient {
    client: reqwest::Client,
    base_url: String,
    app_type_cache: Arc<AppTypeCache>,
}

impl SourcesClient {
    /// Create a client from a validated configuration.
    ///
    /// Fails fast on invalid combinations: an outbound proxy is only
    /// honored in the development environment.
    pub fn new(
        config: &SourcesConfig,
        app_type_cache: Arc<AppTypeCache>,
    ) -> Result<Self, SourcesError> {
        let mut headers = HeaderMap::new();
        if let Some(identity) = &config.identity_header {
            let value = HeaderValue::from_str(identity)
                .map_err(|e| SourcesError::Initialization(format!("identity header: {e}")))?;
            headers.insert(IDENTITY_HEADER, value);
        }

        let mut builder = reqwest::Client::builder()
            .timeout(config.timeout)
            .default_headers(headers);

        if let Some(proxy_url) = &config.proxy_url {
            if config.environment != Environment::Development {
                return Err(SourcesError::Initialization(
                    "proxy is only allowed in the development environment".to_string(),
                ));
            }
            let proxy = reqwest::Proxy::all(proxy_url)
                .map_err(|e| SourcesError::Initialization(format!("proxy: {e}")))?;
            builder = builder.proxy(proxy);
        }

        let client = builder
            .build()
            .map_err(|e| SourcesError::Initialization(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            app_type_cache,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Return the provisioning application type id, resolving and
    /// caching it on first use. Repeated calls never hit the network
    /// again for the lifetime of the process.
    pub async fn get_provisioning_type_id(&self) -> Result<String, SourcesError> {
        if let Some(id) = self.app_type_cache.get() {
            return Ok(id.to_string());
        }
        let id = self.load_app_id().await?;
        self.app_type_cache.set(id.clone());
        Ok(id)
    }

    /// Fetch the application type listing and scan for the provisioning entry.
    async fn load_app_id(&self) -> Result<String, SourcesError> {
        trace!("Fetching the provisioning application type id");

        let operation = "list application types";
        let response = self
            .client
            .get(self.url("/application_types"))
            .send()
            .await
            .map_err(|e| SourcesError::Transport {
                operation,
                source: e,
            })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(SourcesError::ApplicationTypeNotFound);
        }
        if !status.is_success() {
            return Err(SourcesError::UnexpectedStatus {
                operation,
                status: status.as_u16(),
            });
        }

        let listing: DataEnvelope<ApplicationTypeRecord> =
            response.json().await.map_err(|e| SourcesError::Transport {
                operation,
                source: e,
            })?;

        for app_type in listing.data {
            if app_type.name == PROVISIONING_TYPE_NAME {
                debug!(id = %app_type.id, "Resolved provisioning application type id");
                return Ok(app_type.id);
            }
        }
        Err(SourcesError::ApplicationTypeNotFound)
    }
}

#[async_trait]
impl Sources for SourcesClient {
    async fn ready(&self) -> Result<(), SourcesError> {
        let operation = "ready";
        let response = self
            .client
            .get(self.url("/application_types"))
            .send()
            .await
            .map_err(|e| SourcesError::Transport {
                operation,
                source: e,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourcesError::UnexpectedStatus {
                operation,
                status: status.as_u16(),
            });
        }
        Ok(())
    }

    async fn list_provisioning_sources(&self) -> Result<Vec<Source>, SourcesError> {
        trace!("Listing provisioning sources");

        let app_type_id = self.get_provisioning_type_id().await?;

        let operation = "list application type sources";
        let response = self
            .client
            .get(self.url(&format!("/application_types/{app_type_id}/sources")))
            .send()
            .await
            .map_err(|e| SourcesError::Transport {
                operation,
                source: e,
            })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(SourcesError::SourceNotFound);
        }
        if !status.is_success() {
            return Err(SourcesError::UnexpectedStatus {
                operation,
                status: status.as_u16(),
            });
        }

        let listing: DataEnvelope<SourceRecord> =
            response.json().await.map_err(|e| SourcesError::Transport {
                operation,
                source: e,
            })?;

        Ok(listing.data.into_iter().map(Source::from).collect())
    }

    async fn get_arn(&self, source_id: &str) -> Result<String, SourcesError> {
        trace!(source_id = %source_id, "Resolving ARN of source");

        // All authentications linked to the source. The upstream API
        // has no server-side filter for the resource type.
        let operation = "list source authentications";
        let response = self
            .client
            .get(self.url(&format!("/sources/{source_id}/authentications")))
            .send()
            .await
            .map_err(|e| SourcesError::Transport {
                operation,
                source: e,
            })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(SourcesError::AuthenticationNotFound);
        }
        if !status.is_success() {
            return Err(SourcesError::UnexpectedStatus {
                operation,
                status: status.as_u16(),
            });
        }

        let listing: DataEnvelope<AuthenticationRecord> =
            response.json().await.map_err(|e| SourcesError::Transport {
                operation,
                source: e,
            })?;

        let auth = filter_application_authentications(listing.data, source_id).map_err(|e| {
            warn!(source_id = %source_id, error = %e, "Authentication filter rejected source");
            e
        })?;
        let (resource_id, username) = match (auth.resource_id, auth.username) {
            (Some(resource_id), Some(username)) => (resource_id, username),
            _ => {
                return Err(SourcesError::MalformedAuthentication {
                    source_id: source_id.to_string(),
                })
            }
        };

        // The resource id of an application-typed authentication is an
        // application id; its type must match the provisioning type.
        let operation = "show application";
        let response = self
            .client
            .get(self.url(&format!("/applications/{resource_id}")))
            .send()
            .await
            .map_err(|e| SourcesError::Transport {
                operation,
                source: e,
            })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(SourcesError::ApplicationNotFound);
        }
        if !status.is_success() {
            return Err(SourcesError::UnexpectedStatus {
                operation,
                status: status.as_u16(),
            });
        }

        let application: ApplicationRecord =
            response.json().await.map_err(|e| SourcesError::Transport {
                operation,
                source: e,
            })?;

        let app_type_id = self.get_provisioning_type_id().await?;
        if application.application_type_id != app_type_id {
            return Err(SourcesError::AuthenticationSourceAssociation {
                source_id: source_id.to_string(),
            });
        }

        // The username field is overloaded upstream to carry the ARN.
        Ok(username)
    }
}

/// Pick the single authentication with `resource_type == "Application"`.
///
/// Each source is expected to carry exactly one; zero or several is an
/// inventory inconsistency surfaced as a distinct error.
fn filter_application_authentications(
    authentications: Vec<AuthenticationRecord>,
    source_id: &str,
) -> Result<AuthenticationRecord, SourcesError> {
    let mut filtered: Vec<AuthenticationRecord> = authentications
        .into_iter()
        .filter(|auth| auth.resource_type.as_deref() == Some("Application"))
        .collect();

    match filtered.len() {
        1 => Ok(filtered.remove(0)),
        0 => Err(SourcesError::MissingAuthentication {
            source_id: source_id.to_string(),
        }),
        _ => Err(SourcesError::MoreThanOneAuthentication {
            source_id: source_id.to_string(),
        }),
    }
}
