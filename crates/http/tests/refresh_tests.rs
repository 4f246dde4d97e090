//! Integration tests for the refresh-retry protocol

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use massmail_http::client::ClientBuilder;
use massmail_http::types::{LogQuery, SendMassRequest, TemplateDraft};
use massmail_http::ClientError;
use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn empty_logs_page() -> serde_json::Value {
    json!({ "logs": [], "total": 0, "totalPages": 0 })
}

#[tokio::test]
async fn concurrent_auth_failures_share_one_refresh() {
    let server = MockServer::start().await;

    // Both first attempts fail; the delay keeps them overlapping so the
    // second failure lands while the refresh is still in flight.
    Mock::given(method("GET"))
        .and(path("/api/mail/logs"))
        .respond_with(
            ResponseTemplate::new(403)
                .set_body_json(json!({ "message": "token expired" }))
                .set_delay(Duration::from_millis(50)),
        )
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/auth/refresh-token"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "accessToken": "fresh" }))
                .set_delay(Duration::from_millis(50)),
        )
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/mail/logs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(empty_logs_page()))
        .expect(2)
        .mount(&server)
        .await;

    let client = ClientBuilder::new()
        .base_url(server.uri())
        .access_token("stale")
        .build_authenticated()
        .unwrap();

    let query = LogQuery::default();
    let (first, second) = tokio::join!(client.logs(&query), client.logs(&query));

    assert!(first.is_ok());
    assert!(second.is_ok());
    assert_eq!(client.access_token().as_deref(), Some("fresh"));
}

#[tokio::test]
async fn replay_is_attempted_exactly_once() {
    let server = MockServer::start().await;

    // The endpoint keeps returning 401 even after a successful refresh;
    // the replayed request must propagate that error without starting a
    // second refresh.
    Mock::given(method("POST"))
        .and(path("/api/template/addtemplate"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({ "message": "still unauthorized" })),
        )
        .expect(2)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/auth/refresh-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "accessToken": "fresh" })))
        .expect(1)
        .mount(&server)
        .await;

    let client = ClientBuilder::new()
        .base_url(server.uri())
        .access_token("stale")
        .build_authenticated()
        .unwrap();

    let draft = TemplateDraft {
        name: "welcome".into(),
        subject: "hi".into(),
        body: "hello {{name}}".into(),
    };

    let result = client.add_template(&draft).await;
    assert!(matches!(result, Err(ClientError::AuthenticationFailed(_))));
}

#[tokio::test]
async fn refresh_failure_rejects_all_waiters_and_fires_hook_once() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/mail/logs"))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_json(json!({ "message": "token expired" }))
                .set_delay(Duration::from_millis(50)),
        )
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/auth/refresh-token"))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_json(json!({ "message": "refresh token expired" }))
                .set_delay(Duration::from_millis(50)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let expirations = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&expirations);

    let client = ClientBuilder::new()
        .base_url(server.uri())
        .access_token("stale")
        .on_session_expired(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .build_authenticated()
        .unwrap();

    let query = LogQuery::default();
    let (first, second) = tokio::join!(client.logs(&query), client.logs(&query));

    assert!(matches!(first, Err(ClientError::RefreshFailed(_))));
    assert!(matches!(second, Err(ClientError::RefreshFailed(_))));
    assert_eq!(expirations.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn public_endpoints_never_trigger_refresh() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({ "message": "Invalid credentials" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/auth/refresh-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "accessToken": "x" })))
        .expect(0)
        .mount(&server)
        .await;

    let public = ClientBuilder::new()
        .base_url(server.uri())
        .build_public()
        .unwrap();

    let result = public
        .login(&massmail_http::types::LoginRequest {
            email: "ada@example.com".into(),
            password: "hunter2".into(),
        })
        .await;

    assert!(matches!(result, Err(ClientError::AuthenticationFailed(_))));
}

#[tokio::test]
async fn session_fetch_is_outside_the_protected_list() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/user/getcurrentuser"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({ "message": "no session" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/auth/refresh-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "accessToken": "x" })))
        .expect(0)
        .mount(&server)
        .await;

    let client = ClientBuilder::new()
        .base_url(server.uri())
        .build_authenticated()
        .unwrap();

    let result = client.current_user().await;
    assert!(matches!(result, Err(ClientError::AuthenticationFailed(_))));
}

#[tokio::test]
async fn replay_carries_the_refreshed_token() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/email/send-mass"))
        .and(header("authorization", "Bearer stale"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({ "message": "token expired" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/auth/refresh-token"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "accessToken": "fresh-token" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/email/send-mass"))
        .and(header("authorization", "Bearer fresh-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "results": { "successful": 2, "total": 2 }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = ClientBuilder::new()
        .base_url(server.uri())
        .access_token("stale")
        .build_authenticated()
        .unwrap();

    let response = client
        .send_mass(&SendMassRequest {
            csv_file_id: "f1".into(),
            subject: "Hello {{name}}".into(),
            body: "Hi {{name}}".into(),
        })
        .await
        .unwrap();

    assert!(response.success);
    let results = response.results.unwrap();
    assert_eq!(results.successful, 2);
    assert_eq!(results.total, 2);
}
