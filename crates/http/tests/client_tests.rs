//! Integration tests for the hrdesk HTTP client

use futures::future::join_all;
use hrdesk_core::{CredentialPair, Role};
use hrdesk_http::types::{LoginRequest, RegistrationRequest};
use hrdesk_http::{ApiClient, ClientError, MemoryTokenStore, SessionObserver, TokenStore};
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

const REFRESH_PATH: &str = "/api/auth/token/refresh/";

#[derive(Default)]
struct CountingObserver {
    started: AtomicUsize,
    succeeded: AtomicUsize,
    expired: AtomicUsize,
}

impl SessionObserver for CountingObserver {
    fn renewal_started(&self) {
        self.started.fetch_add(1, Ordering::SeqCst);
    }

    fn renewal_succeeded(&self) {
        self.succeeded.fetch_add(1, Ordering::SeqCst);
    }

    fn session_expired(&self) {
        self.expired.fetch_add(1, Ordering::SeqCst);
    }
}

fn client_with(
    server: &MockServer,
    pair: Option<CredentialPair>,
) -> (ApiClient, Arc<MemoryTokenStore>, Arc<CountingObserver>) {
    let store = Arc::new(pair.map_or_else(MemoryTokenStore::new, MemoryTokenStore::with_pair));
    let client = ApiClient::builder()
        .base_url(server.uri())
        .token_store(store.clone())
        .build()
        .unwrap();
    let observer = Arc::new(CountingObserver::default());
    client.set_observer(observer.clone());
    (client, store, observer)
}

fn no_authorization(request: &Request) -> bool {
    !request.headers.contains_key("authorization")
}

#[tokio::test]
async fn test_client_builder_requires_base_url() {
    let result = ApiClient::builder().build();
    assert!(matches!(result, Err(ClientError::Configuration(_))));

    let result = ApiClient::new("not a url");
    assert!(matches!(result, Err(ClientError::Configuration(_))));

    let client = ApiClient::new("http://localhost:8000/").unwrap();
    assert_eq!(client.base_url(), "http://localhost:8000");
}

#[tokio::test]
async fn test_attaches_stored_access_credential() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/employees/"))
        .and(header("authorization", "Bearer a1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": 1}])))
        .expect(1)
        .mount(&server)
        .await;

    let (client, _, _) = client_with(&server, Some(CredentialPair::new("a1", "r1")));
    let employees: Value = client.get("/api/employees/").await.unwrap();
    assert_eq!(employees[0]["id"], 1);
}

#[tokio::test]
async fn test_sends_unauthenticated_without_credential() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/public/"))
        .and(no_authorization)
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&server)
        .await;

    let (client, _, _) = client_with(&server, None);
    let body: Value = client.get("/api/public/").await.unwrap();
    assert_eq!(body["ok"], true);
}

#[tokio::test]
async fn test_concurrent_expiry_renews_once() {
    let server = MockServer::start().await;
    let callers = 5;

    Mock::given(method("GET"))
        .and(path("/api/attendance/"))
        .and(header("authorization", "Bearer old"))
        .respond_with(ResponseTemplate::new(401))
        .expect(callers)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/attendance/"))
        .and(header("authorization", "Bearer new"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"records": []})))
        .expect(callers)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path(REFRESH_PATH))
        .and(body_json(json!({"refresh": "r1"})))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"access": "new"}))
                .set_delay(Duration::from_millis(200)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let (client, store, observer) = client_with(&server, Some(CredentialPair::new("old", "r1")));

    let results = join_all((0..callers).map(|_| client.get::<Value>("/api/attendance/"))).await;
    for result in results {
        assert_eq!(result.unwrap()["records"], json!([]));
    }

    assert_eq!(store.get(), Some(CredentialPair::new("new", "r1")));
    assert_eq!(observer.started.load(Ordering::SeqCst), 1);
    assert_eq!(observer.succeeded.load(Ordering::SeqCst), 1);
    assert_eq!(observer.expired.load(Ordering::SeqCst), 0);
    assert!(!client.is_renewing());
}

#[tokio::test]
async fn test_replay_is_not_retried_twice() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/leave-requests/"))
        .and(header("authorization", "Bearer old"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/leave-requests/"))
        .and(header("authorization", "Bearer new"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"detail": "Token is invalid"})))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path(REFRESH_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access": "new"})))
        .expect(1)
        .mount(&server)
        .await;

    let (client, store, observer) = client_with(&server, Some(CredentialPair::new("old", "r1")));

    let result = client.get::<Value>("/api/leave-requests/").await;
    assert!(
        matches!(&result, Err(ClientError::AuthenticationFailed(m)) if m == "Token is invalid"),
        "unexpected result: {result:?}"
    );

    // the session itself is still considered renewed
    assert_eq!(store.access_token().as_deref(), Some("new"));
    assert_eq!(observer.expired.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_missing_refresh_credential_signs_out_without_renewal_call() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/auth/user/"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path(REFRESH_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access": "new"})))
        .expect(0)
        .mount(&server)
        .await;

    let (client, store, observer) = client_with(&server, None);

    let result = client.current_user().await;
    assert!(matches!(result, Err(ClientError::SessionExpired)));
    assert!(store.get().is_none());
    assert_eq!(observer.expired.load(Ordering::SeqCst), 1);
    assert_eq!(observer.started.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_rejected_renewal_fails_every_waiter() {
    let server = MockServer::start().await;
    let callers = 3;

    Mock::given(method("GET"))
        .and(path("/api/employees/"))
        .respond_with(ResponseTemplate::new(401))
        .expect(callers)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path(REFRESH_PATH))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_json(json!({"detail": "Token is blacklisted"}))
                .set_delay(Duration::from_millis(100)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let (client, store, observer) = client_with(&server, Some(CredentialPair::new("old", "r1")));

    let results = join_all((0..callers).map(|_| client.get::<Value>("/api/employees/"))).await;
    for result in results {
        assert!(matches!(result, Err(ClientError::SessionExpired)));
    }

    assert!(store.get().is_none());
    assert_eq!(observer.expired.load(Ordering::SeqCst), 1);
    assert!(!client.is_renewing());
}

#[tokio::test]
async fn test_rotated_refresh_credential_is_stored() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/timesheet/"))
        .and(header("authorization", "Bearer a1"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/timesheet/"))
        .and(header("authorization", "Bearer a2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"hours": 8})))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path(REFRESH_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access": "a2", "refresh": "r2"})))
        .expect(1)
        .mount(&server)
        .await;

    let (client, store, _) = client_with(&server, Some(CredentialPair::new("a1", "r1")));

    let body: Value = client.get("/api/timesheet/").await.unwrap();
    assert_eq!(body["hours"], 8);
    assert_eq!(store.get(), Some(CredentialPair::new("a2", "r2")));
}

#[tokio::test]
async fn test_other_errors_do_not_trigger_renewal() {
    let server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/api/employees/3/"))
        .respond_with(ResponseTemplate::new(403).set_body_string("not an admin"))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path(REFRESH_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access": "new"})))
        .expect(0)
        .mount(&server)
        .await;

    let (client, store, observer) = client_with(&server, Some(CredentialPair::new("a1", "r1")));

    let result = client.delete("/api/employees/3/").await;
    assert!(matches!(result, Err(ClientError::Forbidden(m)) if m == "not an admin"));
    assert_eq!(store.access_token().as_deref(), Some("a1"));
    assert_eq!(observer.started.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_network_errors_propagate_without_renewal() {
    let store = Arc::new(MemoryTokenStore::with_pair(CredentialPair::new("a1", "r1")));
    let client = ApiClient::builder()
        .base_url("http://127.0.0.1:1")
        .timeout(Duration::from_secs(2))
        .token_store(store.clone())
        .build()
        .unwrap();
    let observer = Arc::new(CountingObserver::default());
    client.set_observer(observer.clone());

    let result = client.get::<Value>("/api/employees/").await;
    assert!(result.as_ref().is_err_and(ClientError::is_network));
    assert_eq!(observer.started.load(Ordering::SeqCst), 0);
    assert!(store.get().is_some());
}

#[tokio::test]
async fn test_post_body_is_replayed() {
    let server = MockServer::start().await;
    let leave = json!({"start_date": "2026-11-02", "end_date": "2026-11-04", "reason": "family"});

    Mock::given(method("POST"))
        .and(path("/api/leave-requests/"))
        .and(header("authorization", "Bearer old"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/leave-requests/"))
        .and(header("authorization", "Bearer new"))
        .and(body_json(&leave))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 12, "status": "pending"})))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path(REFRESH_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access": "new"})))
        .mount(&server)
        .await;

    let (client, _, _) = client_with(&server, Some(CredentialPair::new("old", "r1")));

    let created: Value = client.post("/api/leave-requests/", &leave).await.unwrap();
    assert_eq!(created["status"], "pending");
}

#[tokio::test]
async fn test_login_sends_employee_id() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/auth/token/"))
        .and(no_authorization)
        .and(body_json(json!({
            "employee_id": "EMP-001",
            "password": "pw",
            "user_type": "employee"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access": "a1",
            "refresh": "r1"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (client, store, _) = client_with(&server, None);

    let response = client
        .login(&LoginRequest::new("EMP-001", "pw", Role::Employee))
        .await
        .unwrap();
    assert_eq!(response.credentials(), CredentialPair::new("a1", "r1"));
    assert!(response.user.is_none());
    // storing is the session's job
    assert!(store.get().is_none());
}

#[tokio::test]
async fn test_bad_login_is_not_renewed() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/auth/token/"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "detail": "No active account found with the given credentials"
        })))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path(REFRESH_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access": "new"})))
        .expect(0)
        .mount(&server)
        .await;

    let (client, _, observer) = client_with(&server, Some(CredentialPair::new("a1", "r1")));

    let result = client
        .login(&LoginRequest::new("admin@x.com", "wrong", Role::Admin))
        .await;
    assert!(matches!(result, Err(ClientError::AuthenticationFailed(_))));
    assert_eq!(observer.started.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_registration_validation_errors() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/auth/registration/"))
        .and(body_json(json!({
            "email": "new@x.com",
            "password1": "short",
            "password2": "short",
            "first_name": "New",
            "last_name": "Hire",
            "user_type": "guest"
        })))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "password1": ["This password is too short."]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (client, _, _) = client_with(&server, None);

    let result = client
        .register(&RegistrationRequest::new("new@x.com", "short", "New", "Hire"))
        .await;
    let Err(ClientError::Validation { message, fields }) = result else {
        panic!("expected validation error");
    };
    assert_eq!(message, "password1: This password is too short.");
    assert!(fields.contains_key("password1"));
}

#[tokio::test]
async fn test_malformed_body_is_a_serialization_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/auth/user/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let (client, _, _) = client_with(&server, Some(CredentialPair::new("a1", "r1")));

    let result = client.current_user().await;
    assert!(matches!(result, Err(ClientError::Serialization(_))));
}

#[tokio::test]
async fn test_logout_during_renewal_wins() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/employees/"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path(REFRESH_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"access": "new"}))
                .set_delay(Duration::from_millis(300)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let (client, store, observer) = client_with(&server, Some(CredentialPair::new("old", "r1")));

    let logout = async {
        tokio::time::sleep(Duration::from_millis(100)).await;
        store.clear();
    };
    let (result, ()) = tokio::join!(client.get::<Value>("/api/employees/"), logout);

    assert!(matches!(result, Err(ClientError::SessionExpired)));
    assert!(store.get().is_none());
    // the sign-out was explicit, not an expiry
    assert_eq!(observer.expired.load(Ordering::SeqCst), 0);
}
