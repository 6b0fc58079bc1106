//! Integration tests for the backend client against a mock trace store.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracefed_config::BackendConfig;
use tracefed_fetch::{fan_out, BackendClient, TENANT_HEADER};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer, config_overrides: BackendConfig) -> Arc<BackendClient> {
    let config = BackendConfig {
        endpoint: server.uri(),
        ..config_overrides
    };
    Arc::new(
        BackendClient::new(reqwest::Client::new(), &config, Duration::from_secs(30)).unwrap(),
    )
}

fn deadline_in(duration: Duration) -> Instant {
    Instant::now() + duration
}

#[tokio::test]
async fn trace_by_id_sends_json_accept_and_tenant() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/traces/2f3e0cee77ae5dc9c17ade3689eb2e54"))
        .and(header("Accept", "application/json"))
        .and(header(TENANT_HEADER, "team-a"))
        .and(header("X-Environment", "prod"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"batches": []}"#))
        .mount(&server)
        .await;

    let mut headers = std::collections::BTreeMap::new();
    headers.insert("X-Environment".to_string(), "prod".to_string());
    let client = client_for(
        &server,
        BackendConfig {
            name: Some("prod-us".into()),
            tenant_id: Some("team-a".into()),
            headers: Some(headers),
            ..Default::default()
        },
    );

    let response = client
        .trace_by_id(
            deadline_in(Duration::from_secs(5)),
            "2f3e0cee77ae5dc9c17ade3689eb2e54",
            "",
        )
        .await;

    assert_eq!(response.backend, "prod-us");
    assert_eq!(response.status.map(|s| s.as_u16()), Some(200));
    assert!(response.error.is_none());
    assert_eq!(response.body.as_ref(), br#"{"batches": []}"#);
}

#[tokio::test]
async fn search_forwards_query_string_verbatim() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/search"))
        .and(query_param("q", "{ span.http.status_code = 500 }"))
        .and(query_param("limit", "20"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"traces": []}"#))
        .mount(&server)
        .await;

    let client = client_for(&server, BackendConfig::default());
    let response = client
        .search(
            deadline_in(Duration::from_secs(5)),
            "q=%7B%20span.http.status_code%20%3D%20500%20%7D&limit=20",
        )
        .await;

    assert_eq!(response.status.map(|s| s.as_u16()), Some(200));
}

#[tokio::test]
async fn not_found_is_a_completed_exchange() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/traces/deadbeef"))
        .respond_with(ResponseTemplate::new(404).set_body_string("trace not found"))
        .mount(&server)
        .await;

    let client = client_for(&server, BackendConfig::default());
    let response = client
        .trace_by_id(deadline_in(Duration::from_secs(5)), "deadbeef", "")
        .await;

    // 404 populates status + body; classification is the merger's job.
    assert_eq!(response.status.map(|s| s.as_u16()), Some(404));
    assert!(response.error.is_none());
    assert!(!response.is_transport_error());
}

#[tokio::test]
async fn per_instance_timeout_produces_deadline_envelope() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/search/tags"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_secs(10))
                .set_body_string("{}"),
        )
        .mount(&server)
        .await;

    let client = client_for(
        &server,
        BackendConfig {
            timeout: Some(Duration::from_millis(100)),
            ..Default::default()
        },
    );
    let response = client
        .search_tags(deadline_in(Duration::from_secs(30)), "")
        .await;

    assert!(response.status.is_none());
    assert_eq!(response.error.as_deref(), Some("deadline exceeded"));
}

#[tokio::test]
async fn connection_refused_is_a_transport_error() {
    // Bind then drop the server so the port is closed.
    let server = MockServer::start().await;
    let uri = server.uri();
    drop(server);

    let config = BackendConfig {
        name: Some("gone".into()),
        endpoint: uri,
        ..Default::default()
    };
    let client = Arc::new(
        BackendClient::new(reqwest::Client::new(), &config, Duration::from_secs(2)).unwrap(),
    );

    let response = client
        .trace_by_id(deadline_in(Duration::from_secs(2)), "abc", "")
        .await;

    assert!(response.status.is_none());
    assert!(response.error.is_some());
}

#[tokio::test]
async fn fan_out_over_mixed_backends_reports_each_outcome() {
    let healthy = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/search"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"traces": []}"#))
        .mount(&healthy)
        .await;

    let missing = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/search"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&missing)
        .await;

    let clients = vec![
        client_for(
            &healthy,
            BackendConfig {
                name: Some("healthy".into()),
                ..Default::default()
            },
        ),
        client_for(
            &missing,
            BackendConfig {
                name: Some("missing".into()),
                ..Default::default()
            },
        ),
    ];

    let responses = fan_out(
        &clients,
        20,
        deadline_in(Duration::from_secs(5)),
        |client, deadline| async move { client.search(deadline, "q=test").await },
    )
    .await;

    assert_eq!(responses.len(), 2);
    assert_eq!(responses[0].backend, "healthy");
    assert_eq!(responses[0].status.map(|s| s.as_u16()), Some(200));
    assert_eq!(responses[1].backend, "missing");
    assert_eq!(responses[1].status.map(|s| s.as_u16()), Some(404));
}
