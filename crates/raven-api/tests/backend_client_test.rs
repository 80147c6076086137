#![allow(clippy::unwrap_used)]
// Integration tests for `BackendClient` using wiremock.

use std::time::Duration;

use serde_json::json;
use url::Url;
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use raven_api::{BackendClient, Error, LaunchResponse, TransportConfig};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, BackendClient) {
    let server = MockServer::start().await;
    let base_url = Url::parse(&server.uri()).unwrap();
    let client = BackendClient::with_client(reqwest::Client::new(), base_url);
    (server, client)
}

fn sample_topology() -> serde_json::Value {
    json!({
        "name": "2net",
        "nodes": [{ "name": "n0", "image": "debian-stretch", "os": "linux", "level": 3 }],
        "switches": [{ "name": "nimbus", "image": "cumulus-latest", "os": "linux", "level": 2 }],
        "links": [{
            "name": "n0_eth0-nimbus_swp1",
            "endpoints": [{ "name": "n0", "port": "eth0" }, { "name": "nimbus", "port": "swp1" }],
            "props": {}
        }]
    })
}

// ── Document endpoints ──────────────────────────────────────────────

#[tokio::test]
async fn test_push_posts_topology_json() {
    let (server, client) = setup().await;
    let topo = sample_topology();

    Mock::given(method("POST"))
        .and(path("/rvn-push"))
        .and(body_json(&topo))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .expect(1)
        .mount(&server)
        .await;

    let body = client.push(&topo).await.unwrap();
    assert_eq!(body, "ok");
}

#[tokio::test]
async fn test_push_rejected() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/rvn-push"))
        .respond_with(ResponseTemplate::new(400).set_body_string("bad argument"))
        .mount(&server)
        .await;

    let result = client.push(&json!({})).await;
    match result {
        Err(Error::Backend { status, message }) => {
            assert_eq!(status, 400);
            assert_eq!(message, "bad argument");
        }
        other => panic!("expected Backend error, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_mount_posts_topology_json() {
    let (server, client) = setup().await;
    let topo = sample_topology();

    Mock::given(method("POST"))
        .and(path("/rvn-mount"))
        .and(body_json(&topo))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .expect(1)
        .mount(&server)
        .await;

    client.mount(&topo).await.unwrap();
}

// ── Topology-scoped endpoints ───────────────────────────────────────

#[tokio::test]
async fn test_launch_ok() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/rvn-launch"))
        .and(query_param("topo", "2net"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .mount(&server)
        .await;

    assert_eq!(client.launch("2net").await.unwrap(), LaunchResponse::Ok);
}

#[tokio::test]
async fn test_launch_reports_errors() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/rvn-launch"))
        .and(query_param("topo", "2net"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!(["walrus: image missing"])),
        )
        .mount(&server)
        .await;

    assert_eq!(
        client.launch("2net").await.unwrap(),
        LaunchResponse::Errors(vec!["walrus: image missing".into()])
    );
}

#[tokio::test]
async fn test_configure_and_destroy() {
    let (server, client) = setup().await;

    for endpoint in ["/rvn-configure", "/rvn-destroy"] {
        Mock::given(method("GET"))
            .and(path(endpoint))
            .and(query_param("topo", "3bed"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .expect(1)
            .mount(&server)
            .await;
    }

    assert_eq!(client.configure("3bed").await.unwrap(), "ok");
    assert_eq!(client.destroy("3bed").await.unwrap(), "ok");
}

#[tokio::test]
async fn test_status_structured() {
    let (server, client) = setup().await;

    let payload = json!({
        "nodes": { "n0": { "Name": "n0", "State": "running", "IP": "172.22.0.10" } },
        "switches": { "nimbus": { "Name": "nimbus", "State": "running" } },
        "links": {}
    });

    Mock::given(method("GET"))
        .and(path("/rvn-status"))
        .and(query_param("topo", "2net"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&payload))
        .mount(&server)
        .await;

    let status: serde_json::Value = client.status("2net").await.unwrap();
    assert_eq!(status, payload);
}

#[tokio::test]
async fn test_status_bad_json() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/rvn-status"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let result: Result<serde_json::Value, _> = client.status("2net").await;
    assert!(
        matches!(result, Err(Error::Deserialization { ref body, .. }) if body.contains("oops")),
        "expected Deserialization error, got: {result:?}"
    );
}

#[tokio::test]
async fn test_status_fragment() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/rvn-status"))
        .and(query_param("topo", "2net"))
        .and(query_param("fragment", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<table>n0 running</table>"))
        .mount(&server)
        .await;

    let fragment = client.status_fragment("2net").await.unwrap();
    assert_eq!(fragment, "<table>n0 running</table>");
}

// ── Transport failures ──────────────────────────────────────────────

#[tokio::test]
async fn test_unreachable_backend() {
    // Bind and immediately release a port so nothing is listening on it.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let base_url = Url::parse(&format!("http://{addr}")).unwrap();
    let client = BackendClient::with_client(reqwest::Client::new(), base_url);

    let err = client.configure("2net").await.unwrap_err();
    assert!(err.is_unreachable(), "expected unreachable, got: {err:?}");
}

#[tokio::test]
async fn test_slow_backend_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rvn-status"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
        .mount(&server)
        .await;

    let transport = TransportConfig::default().with_timeout(Duration::from_secs(1));
    let client = BackendClient::new(Url::parse(&server.uri()).unwrap(), &transport).unwrap();

    let err = client.status_fragment("2net").await.unwrap_err();
    assert!(
        matches!(err, Error::Timeout { timeout_secs: 1 }),
        "expected a timeout, got: {err:?}"
    );
    assert!(err.is_unreachable());
}
