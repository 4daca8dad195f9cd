//! Blocking connection against a mock HTTP server
//!
//! The blocking client must not run inside an async context, so these tests
//! drive the mock server through a runtime owned by the test thread and call
//! the connection outside of it.


use ipsdk_core::{BackendKind, Connection, Credentials};
use serde_json::json;
use test_support::{config_for, gateway_credentials};
use tokio::runtime::Runtime;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[test]
fn test_gateway_session_cookie_is_reused() {
    let rt = Runtime::new().unwrap();
    let server = rt.block_on(MockServer::start());

    rt.block_on(
        Mock::given(method("POST"))
            .and(path("/api/v2.0/login"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("set-cookie", "AutomationGatewayToken=session123; Path=/")
                    .set_body_json(json!({"status": "ok"})),
            )
            .expect(1)
            .mount(&server),
    );

    rt.block_on(
        Mock::given(method("GET"))
            .and(path("/api/v2.0/devices"))
            .and(header("cookie", "AutomationGatewayToken=session123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
            .expect(1)
            .mount(&server),
    );

    let config = config_for(&server, gateway_credentials());
    let mut conn = Connection::new(BackendKind::Gateway, config).unwrap();
    let response = conn.get("/devices", &[]).unwrap();

    assert_eq!(response.status_code, 200);
    assert!(conn.is_authenticated());
    assert_eq!(conn.token(), None);

    rt.block_on(server.verify());
}

#[test]
fn test_cloud_token_then_delete() {
    let rt = Runtime::new().unwrap();
    let server = rt.block_on(MockServer::start());

    rt.block_on(
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_json(json!({
                "grant_type": "client_credentials",
                "client_id": "id",
                "client_secret": "secret",
            })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"access_token": "abc123"})),
            )
            .expect(1)
            .mount(&server),
    );

    rt.block_on(
        Mock::given(method("DELETE"))
            .and(path("/automations/42"))
            .and(header("authorization", "Bearer abc123"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server),
    );

    let credentials = Credentials::client_credentials("id", "secret");
    let mut conn = Connection::new(BackendKind::Cloud, config_for(&server, credentials)).unwrap();

    let response = conn.delete("/automations/42", &[]).unwrap();
    assert_eq!(response.status_code, 204);
    assert_eq!(conn.token(), Some("abc123"));

    rt.block_on(server.verify());
}

#[test]
fn test_user_agent_header() {
    let rt = Runtime::new().unwrap();
    let server = rt.block_on(MockServer::start());

    let user_agent = format!("ipsdk/{}", ipsdk_core::VERSION);
    rt.block_on(
        Mock::given(method("GET"))
            .and(path("/health/server"))
            .and(header("user-agent", user_agent.as_str()))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server),
    );

    let mut conn = Connection::new(
        BackendKind::Platform,
        config_for(&server, Credentials::user_password("admin", "admin")),
    )
    .unwrap();
    conn.get("/health/server", &[]).unwrap();

    rt.block_on(server.verify());
}
