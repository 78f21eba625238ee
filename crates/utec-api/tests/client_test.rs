// Integration tests for `UhomeClient` using wiremock.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Value, json};
use wiremock::matchers::{body_partial_json, body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use utec_api::{Credentials, Endpoints, Error, TransportConfig, UhomeClient};

// ── Helpers ─────────────────────────────────────────────────────────

fn secret(s: &str) -> SecretString {
    SecretString::from(s.to_owned())
}

fn credentials(access: Option<&str>, refresh: Option<&str>) -> Arc<Credentials> {
    Arc::new(
        Credentials::new("cid", secret("csecret"))
            .with_tokens(access.map(secret), refresh.map(secret)),
    )
}

async fn setup(creds: Arc<Credentials>) -> (MockServer, UhomeClient) {
    let server = MockServer::start().await;
    let transport = TransportConfig {
        endpoints: Endpoints::from_bases(&server.uri(), &server.uri()).unwrap(),
        timeout: Duration::from_secs(5),
    };
    let client = UhomeClient::new(creds, &transport).unwrap();
    (server, client)
}

fn action(namespace: &str, name: &str) -> wiremock::matchers::BodyPartialJsonMatcher {
    body_partial_json(json!({ "header": { "namespace": namespace, "name": name } }))
}

fn ok_payload(payload: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "header": { "namespace": "Uhome.Device", "name": "Response" },
        "payload": payload,
    }))
}

fn token_reply(access: &str, refresh: Option<&str>) -> ResponseTemplate {
    let mut body = json!({ "access_token": access, "token_type": "Bearer", "expires_in": 3600 });
    if let Some(r) = refresh {
        body["refresh_token"] = json!(r);
    }
    ResponseTemplate::new(200).set_body_json(body)
}

fn exposed(token: Option<SecretString>) -> Option<String> {
    token.map(|t| t.expose_secret().to_owned())
}

async fn message_ids(server: &MockServer) -> Vec<String> {
    server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|r| r.url.path() == "/action")
        .map(|r| {
            let body: Value = serde_json::from_slice(&r.body).unwrap();
            body["header"]["messageId"].as_str().unwrap().to_owned()
        })
        .collect()
}

// ── Authentication ──────────────────────────────────────────────────

#[tokio::test]
async fn test_authenticate_with_refresh_token_only_skips_probe() {
    let (server, client) = setup(credentials(None, Some("r1"))).await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=r1"))
        .respond_with(token_reply("a2", Some("r2")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/action"))
        .respond_with(ok_payload(json!({})))
        .expect(0)
        .mount(&server)
        .await;

    client.authenticate().await.unwrap();

    let tokens = client.credentials().tokens();
    assert_eq!(exposed(tokens.access_token), Some("a2".to_owned()));
    assert_eq!(exposed(tokens.refresh_token), Some("r2".to_owned()));
    assert!(tokens.expires_at.is_some());
    assert_eq!(client.credentials().generation(), 1);
}

#[tokio::test]
async fn test_authenticate_without_tokens_fails() {
    let (_server, client) = setup(credentials(None, None)).await;
    assert!(matches!(client.authenticate().await, Err(Error::NoCredentials)));
}

#[tokio::test]
async fn test_probe_401_triggers_exactly_one_refresh() {
    let (server, client) = setup(credentials(Some("stale"), Some("r1"))).await;

    Mock::given(method("POST"))
        .and(path("/action"))
        .and(action("Uhome.System", "Check"))
        .and(header("authorization", "Bearer stale"))
        .respond_with(ResponseTemplate::new(401).set_body_string("token expired"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(token_reply("fresh", Some("r2")))
        .expect(1)
        .mount(&server)
        .await;

    client.authenticate().await.unwrap();
    assert_eq!(
        exposed(client.credentials().tokens().access_token),
        Some("fresh".to_owned())
    );
}

#[tokio::test]
async fn test_failed_refresh_leaves_tokens_untouched() {
    let (server, client) = setup(credentials(Some("stale"), Some("r1"))).await;

    Mock::given(method("POST"))
        .and(path("/action"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({ "error": "invalid_grant" })))
        .expect(1)
        .mount(&server)
        .await;

    let err = client.authenticate().await.unwrap_err();
    assert!(matches!(err, Error::RefreshFailed { .. }), "got {err:?}");

    let tokens = client.credentials().tokens();
    assert_eq!(exposed(tokens.access_token), Some("stale".to_owned()));
    assert_eq!(exposed(tokens.refresh_token), Some("r1".to_owned()));
    assert_eq!(client.credentials().generation(), 0);
}

#[tokio::test]
async fn test_refresh_without_access_token_in_reply_fails() {
    let (server, client) = setup(credentials(None, Some("r1"))).await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "token_type": "Bearer" })))
        .mount(&server)
        .await;

    let err = client.refresh_access_token().await.unwrap_err();
    assert!(matches!(err, Error::RefreshFailed { .. }));
    assert!(!client.credentials().has_access_token());
}

#[tokio::test]
async fn test_probe_accepts_empty_200_body() {
    let (server, client) = setup(credentials(Some("a1"), Some("r1"))).await;

    Mock::given(method("POST"))
        .and(path("/action"))
        .and(action("Uhome.System", "Check"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(token_reply("unused", None))
        .expect(0)
        .mount(&server)
        .await;

    client.authenticate().await.unwrap();
    assert_eq!(client.credentials().generation(), 0);
}

#[tokio::test]
async fn test_probe_server_error_is_auth_failure() {
    let (server, client) = setup(credentials(Some("a1"), Some("r1"))).await;

    Mock::given(method("POST"))
        .and(path("/action"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&server)
        .await;

    match client.authenticate().await {
        Err(Error::AuthFailed { status, body }) => {
            assert_eq!(status, 503);
            assert_eq!(body, "maintenance");
        }
        other => panic!("expected AuthFailed, got {other:?}"),
    }
}

#[tokio::test]
async fn test_refresh_keeps_refresh_token_when_omitted() {
    let (server, client) = setup(credentials(None, Some("r1"))).await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(token_reply("a2", None))
        .mount(&server)
        .await;

    client.refresh_access_token().await.unwrap();
    assert_eq!(
        exposed(client.credentials().tokens().refresh_token),
        Some("r1".to_owned())
    );
}

#[tokio::test]
async fn test_concurrent_refreshes_share_one_grant() {
    let (server, client) = setup(credentials(None, Some("r1"))).await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(token_reply("a2", Some("r2")).set_delay(Duration::from_millis(100)))
        .expect(1)
        .mount(&server)
        .await;

    let (a, b) = tokio::join!(client.refresh_access_token(), client.refresh_access_token());
    a.unwrap();
    b.unwrap();
    assert_eq!(client.credentials().generation(), 1);
}

#[tokio::test]
async fn test_exchange_code_and_client_credentials_grants() {
    let (server, client) = setup(credentials(None, None)).await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=authorization_code"))
        .and(body_string_contains("code=abc"))
        .respond_with(token_reply("from-code", Some("r-code")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=client_credentials"))
        .and(body_string_contains("scope=openapi"))
        .respond_with(token_reply("from-cc", None))
        .expect(1)
        .mount(&server)
        .await;

    client
        .exchange_code("abc", "http://localhost:9501")
        .await
        .unwrap();
    assert_eq!(
        exposed(client.credentials().tokens().access_token),
        Some("from-code".to_owned())
    );

    client.client_credentials().await.unwrap();
    let tokens = client.credentials().tokens();
    assert_eq!(exposed(tokens.access_token), Some("from-cc".to_owned()));
    assert_eq!(exposed(tokens.refresh_token), Some("r-code".to_owned()));
    assert_eq!(client.credentials().generation(), 2);
}

#[tokio::test]
async fn test_action_login_reads_payload_token() {
    let (server, client) = setup(credentials(None, None)).await;

    Mock::given(method("POST"))
        .and(path("/action"))
        .and(action("Uhome.Auth", "Request"))
        .and(body_partial_json(json!({
            "payload": { "client_id": "cid", "client_secret": "csecret", "scope": "openapi" }
        })))
        .respond_with(ok_payload(json!({ "access_token": "legacy" })))
        .expect(1)
        .mount(&server)
        .await;

    client.action_login().await.unwrap();
    assert_eq!(
        exposed(client.credentials().tokens().access_token),
        Some("legacy".to_owned())
    );
}

#[tokio::test]
async fn test_authorize_url_carries_flow_parameters() {
    let (server, client) = setup(credentials(None, None)).await;

    let url = client.authorize_url("http://localhost:9501", "xyz");
    let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();

    assert_eq!(url.path(), "/authorize");
    assert!(url.as_str().starts_with(&server.uri()));
    assert_eq!(
        pairs,
        vec![
            ("response_type".to_owned(), "code".to_owned()),
            ("client_id".to_owned(), "cid".to_owned()),
            ("scope".to_owned(), "openapi".to_owned()),
            ("redirect_uri".to_owned(), "http://localhost:9501".to_owned()),
            ("state".to_owned(), "xyz".to_owned()),
        ]
    );
}

// ── Transport ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_request_retries_once_after_refresh() {
    let (server, client) = setup(credentials(Some("old"), Some("r1"))).await;

    Mock::given(method("POST"))
        .and(path("/action"))
        .and(header("authorization", "Bearer old"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/action"))
        .and(header("authorization", "Bearer new"))
        .respond_with(ok_payload(json!({ "devices": [] })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(token_reply("new", Some("r2")))
        .expect(1)
        .mount(&server)
        .await;

    let payload = client
        .request(utec_api::Action::DEVICE_LIST, json!({}))
        .await
        .unwrap();
    assert_eq!(payload, json!({ "devices": [] }));

    let ids = message_ids(&server).await;
    assert_eq!(ids.len(), 2);
    assert_ne!(ids[0], ids[1]);
}

#[tokio::test]
async fn test_message_ids_are_unique_across_calls() {
    let (server, client) = setup(credentials(Some("a1"), None)).await;

    Mock::given(method("POST"))
        .and(path("/action"))
        .respond_with(ok_payload(json!({})))
        .mount(&server)
        .await;

    for _ in 0..5 {
        client
            .request(utec_api::Action::SYSTEM_CHECK, json!({}))
            .await
            .unwrap();
    }

    let ids = message_ids(&server).await;
    let unique: HashSet<_> = ids.iter().collect();
    assert_eq!(ids.len(), 5);
    assert_eq!(unique.len(), 5);
}

#[tokio::test]
async fn test_null_payload_becomes_empty_object() {
    let (server, client) = setup(credentials(Some("a1"), None)).await;

    Mock::given(method("POST"))
        .and(path("/action"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "header": {}, "payload": null })))
        .mount(&server)
        .await;

    let payload = client
        .request(utec_api::Action::SYSTEM_CHECK, json!({}))
        .await
        .unwrap();
    assert_eq!(payload, json!({}));
}

#[tokio::test]
async fn test_non_json_body_is_deserialization_error() {
    let (server, client) = setup(credentials(Some("a1"), None)).await;

    Mock::given(method("POST"))
        .and(path("/action"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>gateway</html>"))
        .mount(&server)
        .await;

    match client.request(utec_api::Action::DEVICE_LIST, json!({})).await {
        Err(Error::Deserialization { body, .. }) => assert_eq!(body, "<html>gateway</html>"),
        other => panic!("expected Deserialization, got {other:?}"),
    }
}

#[tokio::test]
async fn test_slow_response_maps_to_timeout() {
    let server = MockServer::start().await;
    let transport = TransportConfig {
        endpoints: Endpoints::from_bases(&server.uri(), &server.uri()).unwrap(),
        timeout: Duration::from_millis(100),
    };
    let client = UhomeClient::new(credentials(Some("a1"), None), &transport).unwrap();

    Mock::given(method("POST"))
        .and(path("/action"))
        .respond_with(ok_payload(json!({})).set_delay(Duration::from_secs(2)))
        .mount(&server)
        .await;

    let err = client
        .request(utec_api::Action::DEVICE_LIST, json!({}))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Timeout { .. }), "got {err:?}");
    assert!(err.is_transient());
}

// ── Devices ─────────────────────────────────────────────────────────

async fn mount_device_list(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/action"))
        .and(action("Uhome.Device", "List"))
        .respond_with(ok_payload(json!({
            "devices": [
                { "id": "d1", "name": "Front", "type": "lock" },
                { "name": "no id" },
                { "id": "d2", "name": "Back", "type": "lock" },
                { "id": "d3", "name": "Garage", "type": "lock" },
            ]
        })))
        .mount(server)
        .await;
}

fn status_for(device_id: &str) -> wiremock::matchers::BodyPartialJsonMatcher {
    body_partial_json(json!({
        "header": { "namespace": "Uhome.Device", "name": "Status" },
        "payload": { "device_id": device_id },
    }))
}

#[tokio::test]
async fn test_devices_with_status_degrades_per_device() {
    let (server, client) = setup(credentials(Some("a1"), None)).await;
    mount_device_list(&server).await;

    Mock::given(method("POST"))
        .and(status_for("d1"))
        .respond_with(ok_payload(json!({ "lock_state": "locked", "battery": 80 })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(status_for("d2"))
        .respond_with(ResponseTemplate::new(500).set_body_string("device offline"))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(status_for("d3"))
        .respond_with(ok_payload(json!({ "lock_state": "unlocked", "battery": 55 })))
        .mount(&server)
        .await;

    let merged = client.get_devices_with_status().await.unwrap();

    let ids: Vec<&str> = merged.keys().map(String::as_str).collect();
    assert_eq!(ids, vec!["d1", "d2", "d3"]);
    assert_eq!(merged["d1"].status["lock_state"], "locked");
    assert!(merged["d2"].status.is_empty());
    assert_eq!(merged["d3"].status["battery"], 55);
}

#[tokio::test]
async fn test_list_failure_propagates_but_list_devices_degrades() {
    let (server, client) = setup(credentials(Some("a1"), None)).await;

    Mock::given(method("POST"))
        .and(path("/action"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    assert!(client.list_devices().await.is_empty());
    let err = client.get_devices_with_status().await.unwrap_err();
    assert_eq!(err.status(), Some(502));
}

#[tokio::test]
async fn test_query_devices_reads_capability_states() {
    let (server, client) = setup(credentials(Some("a1"), None)).await;

    Mock::given(method("POST"))
        .and(path("/action"))
        .and(action("Uhome.Device", "Query"))
        .and(body_partial_json(json!({ "payload": { "devices": [{ "id": "d1" }] } })))
        .respond_with(ok_payload(json!({
            "devices": [{
                "id": "d1",
                "states": [
                    { "capability": "st.Lock", "name": "lockState", "value": "locked" },
                    { "capability": "st.BatteryLevel", "name": "level", "value": 3 },
                ]
            }]
        })))
        .mount(&server)
        .await;

    let devices = client.query_devices(&["d1"]).await.unwrap();
    assert_eq!(devices.len(), 1);
    assert_eq!(devices[0].states[0].capability, "st.Lock");
    assert_eq!(devices[0].states[1].value, json!(3));
}

// ── Commands ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_lock_and_unlock_report_http_outcome() {
    let (server, client) = setup(credentials(Some("a1"), None)).await;

    Mock::given(method("POST"))
        .and(action("Uhome.Lock.Control", "Lock"))
        .and(body_partial_json(json!({ "payload": { "device_id": "d1" } })))
        .respond_with(ok_payload(json!({})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(action("Uhome.Lock.Control", "Unlock"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    assert!(client.lock("d1").await);
    assert!(!client.unlock("d1").await);
}

#[tokio::test]
async fn test_lock_commands_ignore_reply_body() {
    let (server, client) = setup(credentials(Some("a1"), None)).await;

    Mock::given(method("POST"))
        .and(action("Uhome.Lock.Control", "Lock"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(action("Uhome.Lock.Control", "Unlock"))
        .respond_with(ResponseTemplate::new(200).set_body_string("OK"))
        .expect(1)
        .mount(&server)
        .await;

    assert!(client.lock("d1").await);
    assert!(client.unlock("d1").await);
}

#[tokio::test]
async fn test_lock_command_retries_after_refresh_with_empty_body() {
    let (server, client) = setup(credentials(Some("stale"), Some("r1"))).await;

    Mock::given(method("POST"))
        .and(action("Uhome.Lock.Control", "Lock"))
        .and(header("authorization", "Bearer stale"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(token_reply("fresh", Some("r2")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(action("Uhome.Lock.Control", "Lock"))
        .and(header("authorization", "Bearer fresh"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    assert!(client.lock("d1").await);
}

#[tokio::test]
async fn test_device_command_payload_shape() {
    let (server, client) = setup(credentials(Some("a1"), None)).await;

    Mock::given(method("POST"))
        .and(path("/action"))
        .and(action("Uhome.Device", "Command"))
        .and(body_partial_json(json!({
            "payload": { "devices": [{
                "id": "d1",
                "command": {
                    "capability": "st.Lock",
                    "name": "lock",
                    "arguments": { "mode": "auto" },
                },
            }] }
        })))
        .respond_with(ok_payload(json!({ "devices": [{ "id": "d1", "status": "accepted" }] })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/action"))
        .and(action("Uhome.Device", "Command"))
        .and(body_partial_json(json!({
            "payload": { "devices": [{ "id": "d2", "command": { "capability": "st.Lock", "name": "unlock" } }] }
        })))
        .respond_with(ok_payload(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let reply = client
        .device_command("d1", "st.Lock", "lock", Some(json!({ "mode": "auto" })))
        .await
        .unwrap();
    assert_eq!(reply["devices"][0]["status"], "accepted");

    client.device_command("d2", "st.Lock", "unlock", None).await.unwrap();

    let requests = server.received_requests().await.unwrap();
    let body: Value = serde_json::from_slice(&requests[1].body).unwrap();
    let command = &body["payload"]["devices"][0]["command"];
    assert!(command.get("arguments").is_none(), "got {command}");
}
