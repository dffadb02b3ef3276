//! Test harness: the full router over an in-memory SQLite database with the
//! real password hasher and token service.

use std::sync::Arc;
use std::time::Duration;

use api_adapters::{router, AppState};
use auth_adapters::{Argon2PasswordHasher, JwtTokenService};
use axum::body::{to_bytes, Body};
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use secrecy::SecretString;
use serde_json::{json, Value};
use services::{Ports, Services};
use storage_adapters::{InMemoryLoginThrottle, SqliteStore};
use tower::ServiceExt;
use uuid::Uuid;

/// Satisfies every password rule.
pub const PASSWORD: &str = "Passw0rd!";

pub const MAX_LOGIN_ATTEMPTS: usize = 3;

pub struct TestApp {
    router: Router,
}

/// A registered, logged-in account.
pub struct Account {
    pub id: Uuid,
    pub username: String,
    pub token: String,
}

impl TestApp {
    pub async fn spawn() -> Self {
        let store = Arc::new(
            SqliteStore::connect("sqlite::memory:", 1)
                .await
                .expect("in-memory database"),
        );
        let ports = Ports {
            users: store.clone(),
            questions: store.clone(),
            answers: store.clone(),
            reviews: store.clone(),
            votes: store.clone(),
            trust: store.clone(),
            chats: store,
            hasher: Arc::new(Argon2PasswordHasher::new()),
            tokens: Arc::new(JwtTokenService::new(
                &SecretString::from("integration-test-secret"),
                chrono::Duration::hours(1),
            )),
            throttle: Arc::new(InMemoryLoginThrottle::new(
                MAX_LOGIN_ATTEMPTS,
                Duration::from_secs(60),
            )),
        };

        let state = AppState::new(Services::new(ports));
        Self { router: router(state, &[]) }
    }

    /// Sends one request and returns the status with the decoded JSON body
    /// (`Null` when empty, a string when not JSON).
    pub async fn call(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("valid request");

        let response = self.router.clone().oneshot(request).await.expect("infallible router");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        (status, value)
    }

    pub async fn get(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.call(Method::GET, uri, Some(token), None).await
    }

    pub async fn post(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.call(Method::POST, uri, Some(token), Some(body)).await
    }

    pub async fn put(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.call(Method::PUT, uri, Some(token), Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.call(Method::DELETE, uri, Some(token), None).await
    }

    pub async fn login(&self, username: &str, password: &str) -> (StatusCode, Value) {
        self.call(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "username": username, "password": password })),
        )
        .await
    }

    /// Registers and logs in. The first account of an app is the admin.
    pub async fn account(&self, username: &str) -> Account {
        let (status, profile) = self
            .call(
                Method::POST,
                "/api/auth/register",
                None,
                Some(json!({ "username": username, "password": PASSWORD })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "register {username}: {profile}");

        let (status, session) = self.login(username, PASSWORD).await;
        assert_eq!(status, StatusCode::OK, "login {username}: {session}");

        Account {
            id: parse_id(&profile["id"]),
            username: username.to_string(),
            token: session["session"]["token"]
                .as_str()
                .expect("token in login response")
                .to_string(),
        }
    }

    /// Has `admin` grant `role` to `account`.
    pub async fn grant(&self, admin: &Account, account: &Account, role: &str) {
        let (status, body) = self
            .post(
                &format!("/api/users/{}/roles", account.id),
                &admin.token,
                json!({ "role": role }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "grant {role}: {body}");
    }

    pub async fn ask(&self, account: &Account, title: &str) -> Uuid {
        let (status, body) = self
            .post(
                "/api/questions",
                &account.token,
                json!({ "title": title, "body": "Details about the question." }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "ask: {body}");
        parse_id(&body["id"])
    }

    pub async fn answer(&self, account: &Account, question: Uuid, body: &str) -> Uuid {
        let (status, answer) = self
            .post(
                &format!("/api/questions/{question}/answers"),
                &account.token,
                json!({ "body": body }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "answer: {answer}");
        parse_id(&answer["id"])
    }
}

pub fn parse_id(value: &Value) -> Uuid {
    value
        .as_str()
        .and_then(|s| Uuid::parse_str(s).ok())
        .unwrap_or_else(|| panic!("expected a uuid, got {value}"))
}
