//! Integration tests for the massmail HTTP client

use massmail_http::client::ClientBuilder;
use massmail_http::types::{LoginRequest, LogQuery, LogStatus, SignupRequest};
use massmail_http::{ClientError, PublicClient};
use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn builder_requires_base_url() {
    let result = ClientBuilder::new().build_public();
    assert!(matches!(result, Err(ClientError::Configuration(_))));
}

#[tokio::test]
async fn builder_strips_trailing_slash() {
    let client = PublicClient::new("http://localhost:8000/").unwrap();
    assert_eq!(client.base_url(), "http://localhost:8000");
}

#[tokio::test]
async fn login_decodes_auth_response() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .and(header("content-type", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "message": "Login successful",
            "accessToken": "tok-1",
            "user": {
                "name": "Ada",
                "email": "ada@example.com",
                "isVerified": true,
                "templates": [
                    { "_id": "t1", "name": "welcome", "subject": "hi", "body": "hello" }
                ],
                "files": [
                    { "fileId": "f1", "fileName": "list.csv", "fileUrl": "https://files/f1" }
                ]
            }
        })))
        .mount(&server)
        .await;

    let public = PublicClient::new(server.uri()).unwrap();
    let response = public
        .login(&LoginRequest {
            email: "ada@example.com".into(),
            password: "hunter2".into(),
        })
        .await
        .unwrap();

    assert_eq!(response.access_token.as_deref(), Some("tok-1"));
    let user = response.user.unwrap();
    assert_eq!(user.templates.len(), 1);
    assert_eq!(user.templates[0].id, "t1");
    assert_eq!(user.files[0].file_id, "f1");
}

#[tokio::test]
async fn server_message_bodies_become_error_messages() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/auth/signup"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({ "message": "Email already in use" })),
        )
        .mount(&server)
        .await;

    let public = PublicClient::new(server.uri()).unwrap();
    let result = public
        .signup(&SignupRequest {
            name: "Ada".into(),
            email: "ada@example.com".into(),
            password: "hunter2".into(),
        })
        .await;

    match result {
        Err(ClientError::BadRequest(message)) => assert_eq!(message, "Email already in use"),
        other => panic!("expected BadRequest, got {other:?}"),
    }
}

#[tokio::test]
async fn unverified_account_errors_are_recognizable() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(
            ResponseTemplate::new(403)
                .set_body_json(json!({ "message": "Please verify your email first" })),
        )
        .mount(&server)
        .await;

    let public = PublicClient::new(server.uri()).unwrap();
    let error = public
        .login(&LoginRequest {
            email: "ada@example.com".into(),
            password: "hunter2".into(),
        })
        .await
        .unwrap_err();

    assert!(error.is_unverified_account());
}

#[tokio::test]
async fn authenticated_requests_carry_the_bearer_token() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/user/getcurrentuser"))
        .and(header("authorization", "Bearer tok-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "Ada",
            "email": "ada@example.com"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = ClientBuilder::new()
        .base_url(server.uri())
        .access_token("tok-1")
        .build_authenticated()
        .unwrap();

    let user = client.current_user().await.unwrap();
    assert_eq!(user.email, "ada@example.com");
}

#[tokio::test]
async fn log_query_serializes_filters() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/mail/logs"))
        .and(query_param("page", "2"))
        .and(query_param("limit", "25"))
        .and(query_param("status", "failed"))
        .and(query_param("from", "2026-08-01"))
        .and(query_param("to", "2026-08-23"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "logs": [{
                "_id": "l1",
                "recipient": "bob@example.com",
                "subject": "hello",
                "status": "failed",
                "error": "mailbox full"
            }],
            "total": 1,
            "totalPages": 1
        })))
        .mount(&server)
        .await;

    let client = ClientBuilder::new()
        .base_url(server.uri())
        .access_token("tok-1")
        .build_authenticated()
        .unwrap();

    let page = client
        .logs(&LogQuery {
            page: 2,
            limit: 25,
            status: Some(LogStatus::Failed),
            from: Some("2026-08-01".into()),
            to: Some("2026-08-23".into()),
        })
        .await
        .unwrap();

    assert_eq!(page.total, 1);
    assert_eq!(page.logs[0].status, LogStatus::Failed);
    assert_eq!(page.logs[0].error.as_deref(), Some("mailbox full"));
}

#[tokio::test]
async fn csv_upload_returns_the_stored_file_reference() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/upload/csv"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "fileId": "f9",
            "fileName": "recipients.csv",
            "fileUrl": "https://files.example.com/f9.csv"
        })))
        .mount(&server)
        .await;

    let client = ClientBuilder::new()
        .base_url(server.uri())
        .access_token("tok-1")
        .build_authenticated()
        .unwrap();

    let file = client
        .upload_csv("recipients.csv", b"email,name\na@example.com,Alice\n".to_vec())
        .await
        .unwrap();

    assert_eq!(file.file_id, "f9");
    assert_eq!(file.file_name, "recipients.csv");
}

#[tokio::test]
async fn verify_email_passes_the_token_as_query() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/auth/verify-email"))
        .and(query_param("token", "abc123"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "message": "Email verified" })),
        )
        .mount(&server)
        .await;

    let public = PublicClient::new(server.uri()).unwrap();
    let response = public.verify_email("abc123").await.unwrap();
    assert_eq!(response.message.as_deref(), Some("Email verified"));
}

#[tokio::test]
async fn fetch_text_returns_stored_csv_bodies() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/files/f1.csv"))
        .respond_with(ResponseTemplate::new(200).set_body_string("email,name\na@example.com,A\n"))
        .mount(&server)
        .await;

    let public = PublicClient::new(server.uri()).unwrap();
    let text = public
        .fetch_text(&format!("{}/files/f1.csv", server.uri()))
        .await
        .unwrap();
    assert!(text.starts_with("email,name"));
}
