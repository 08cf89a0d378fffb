//! Sources client integration tests.
//!
//! Runs the client against a mock upstream and exercises the chained
//! ARN resolution, the application type cache, and the status mapping.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use provisioning_api::cache::AppTypeCache;
use provisioning_api::clients::{Source, Sources, SourcesClient, SourcesError};
use provisioning_api::config::{Environment, SourcesConfig};

const PROVISIONING_TYPE: &str = "/insights/platform/provisioning";

fn client(server: &MockServer) -> SourcesClient {
    client_with_cache(server, Arc::new(AppTypeCache::new()))
}

fn client_with_cache(server: &MockServer, cache: Arc<AppTypeCache>) -> SourcesClient {
    let config = SourcesConfig {
        url: server.uri(),
        proxy_url: None,
        identity_header: None,
        timeout: Duration::from_secs(5),
        environment: Environment::Development,
    };
    SourcesClient::new(&config, cache).unwrap()
}

fn app_types_listing() -> serde_json::Value {
    json!({
        "data": [
            {"id": "3", "name": "/insights/platform/other", "display_name": "Other"},
            {"id": "5", "name": PROVISIONING_TYPE, "display_name": "Provisioning"}
        ]
    })
}

async fn mount_app_types(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/application_types"))
        .respond_with(ResponseTemplate::new(200).set_body_json(app_types_listing()))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_ready_succeeds_against_healthy_upstream() {
    let server = MockServer::start().await;
    mount_app_types(&server).await;

    client(&server).ready().await.unwrap();
}

#[tokio::test]
async fn test_ready_maps_upstream_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/application_types"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = client(&server).ready().await.unwrap_err();
    assert!(matches!(
        err,
        SourcesError::UnexpectedStatus { status: 503, .. }
    ));
}

#[tokio::test]
async fn test_provisioning_type_id_is_resolved_once() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/application_types"))
        .respond_with(ResponseTemplate::new(200).set_body_json(app_types_listing()))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server);
    assert_eq!(client.get_provisioning_type_id().await.unwrap(), "5");
    // Served from the cache; the expect(1) above verifies no second request.
    assert_eq!(client.get_provisioning_type_id().await.unwrap(), "5");
}

#[tokio::test]
async fn test_missing_provisioning_type_in_listing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/application_types"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{"id": "3", "name": "/insights/platform/other"}]
        })))
        .mount(&server)
        .await;

    let err = client(&server).get_provisioning_type_id().await.unwrap_err();
    assert!(matches!(err, SourcesError::ApplicationTypeNotFound));
}

#[tokio::test]
async fn test_identity_header_is_forwarded() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/application_types"))
        .and(header("x-rh-identity", "aWRlbnRpdHk="))
        .respond_with(ResponseTemplate::new(200).set_body_json(app_types_listing()))
        .expect(1)
        .mount(&server)
        .await;

    let config = SourcesConfig {
        url: server.uri(),
        proxy_url: None,
        identity_header: Some("aWRlbnRpdHk=".to_string()),
        timeout: Duration::from_secs(5),
        environment: Environment::Development,
    };
    let client = SourcesClient::new(&config, Arc::new(AppTypeCache::new())).unwrap();
    client.ready().await.unwrap();
}

#[tokio::test]
async fn test_list_provisioning_sources_projects_consumed_fields() {
    let server = MockServer::start().await;
    mount_app_types(&server).await;
    Mock::given(method("GET"))
        .and(path("/application_types/5/sources"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                {
                    "id": "42",
                    "name": "aws-prod",
                    "source_type_id": "2",
                    "uid": "a1b2c3",
                    "availability_status": "available",
                    "created_at": "2024-05-01T10:00:00Z"
                },
                {
                    "id": "43",
                    "name": "aws-stage",
                    "source_type_id": "2",
                    "uid": "d4e5f6"
                }
            ]
        })))
        .mount(&server)
        .await;

    let sources = client(&server).list_provisioning_sources().await.unwrap();
    assert_eq!(
        sources,
        vec![
            Source {
                id: "42".to_string(),
                name: "aws-prod".to_string(),
                source_type_id: "2".to_string(),
                uid: "a1b2c3".to_string(),
            },
            Source {
                id: "43".to_string(),
                name: "aws-stage".to_string(),
                source_type_id: "2".to_string(),
                uid: "d4e5f6".to_string(),
            },
        ]
    );
}

#[tokio::test]
async fn test_list_provisioning_sources_maps_not_found() {
    let server = MockServer::start().await;
    mount_app_types(&server).await;
    Mock::given(method("GET"))
        .and(path("/application_types/5/sources"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = client(&server).list_provisioning_sources().await.unwrap_err();
    assert!(matches!(err, SourcesError::SourceNotFound));
}

fn application_auth(resource_id: &str) -> serde_json::Value {
    json!({
        "resource_type": "Application",
        "resource_id": resource_id,
        "username": "arn:aws:iam::123456789:role/launch"
    })
}

async fn mount_authentications(server: &MockServer, auths: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/sources/42/authentications"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": auths})))
        .mount(server)
        .await;
}

async fn mount_application(server: &MockServer, app_type_id: &str) {
    Mock::given(method("GET"))
        .and(path("/applications/10"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"id": "10", "application_type_id": app_type_id})),
        )
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_get_arn_resolves_through_the_chain() {
    let server = MockServer::start().await;
    mount_app_types(&server).await;
    mount_authentications(
        &server,
        json!([
            {"resource_type": "Source", "resource_id": "42", "username": "other"},
            application_auth("10")
        ]),
    )
    .await;
    mount_application(&server, "5").await;

    let arn = client(&server).get_arn("42").await.unwrap();
    assert_eq!(arn, "arn:aws:iam::123456789:role/launch");
}

#[tokio::test]
async fn test_get_arn_rejects_two_application_authentications() {
    let server = MockServer::start().await;
    mount_app_types(&server).await;
    mount_authentications(
        &server,
        json!([application_auth("10"), application_auth("11")]),
    )
    .await;

    let err = client(&server).get_arn("42").await.unwrap_err();
    assert!(matches!(
        err,
        SourcesError::MoreThanOneAuthentication { source_id } if source_id == "42"
    ));
}

#[tokio::test]
async fn test_get_arn_rejects_missing_application_authentication() {
    let server = MockServer::start().await;
    mount_app_types(&server).await;
    mount_authentications(
        &server,
        json!([{"resource_type": "Source", "resource_id": "42", "username": "other"}]),
    )
    .await;

    let err = client(&server).get_arn("42").await.unwrap_err();
    assert!(matches!(
        err,
        SourcesError::MissingAuthentication { source_id } if source_id == "42"
    ));
}

#[tokio::test]
async fn test_get_arn_rejects_foreign_application_type() {
    let server = MockServer::start().await;
    mount_app_types(&server).await;
    mount_authentications(&server, json!([application_auth("10")])).await;
    // Application belongs to a different application type than provisioning.
    mount_application(&server, "9").await;

    let err = client(&server).get_arn("42").await.unwrap_err();
    assert!(matches!(
        err,
        SourcesError::AuthenticationSourceAssociation { source_id } if source_id == "42"
    ));
}

#[tokio::test]
async fn test_get_arn_maps_missing_application() {
    let server = MockServer::start().await;
    mount_app_types(&server).await;
    mount_authentications(&server, json!([application_auth("10")])).await;
    Mock::given(method("GET"))
        .and(path("/applications/10"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = client(&server).get_arn("42").await.unwrap_err();
    assert!(matches!(err, SourcesError::ApplicationNotFound));
}

#[tokio::test]
async fn test_get_arn_maps_missing_authentication_listing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/sources/42/authentications"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = client(&server).get_arn("42").await.unwrap_err();
    assert!(matches!(err, SourcesError::AuthenticationNotFound));
}

#[tokio::test]
async fn test_get_arn_carries_upstream_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/sources/42/authentications"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let err = client(&server).get_arn("42").await.unwrap_err();
    assert!(matches!(
        err,
        SourcesError::UnexpectedStatus {
            operation: "list source authentications",
            status: 500
        }
    ));
}

#[tokio::test]
async fn test_cached_type_id_survives_upstream_changes() {
    let server = MockServer::start().await;
    mount_app_types(&server).await;

    let cache = Arc::new(AppTypeCache::new());
    let client = client_with_cache(&server, Arc::clone(&cache));
    assert_eq!(client.get_provisioning_type_id().await.unwrap(), "5");

    // The upstream listing changes; the cached id must not.
    server.reset().await;
    Mock::given(method("GET"))
        .and(path("/application_types"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{"id": "77", "name": PROVISIONING_TYPE}]
        })))
        .expect(0)
        .mount(&server)
        .await;

    assert_eq!(client.get_provisioning_type_id().await.unwrap(), "5");
    assert_eq!(cache.get(), Some("5"));
}
