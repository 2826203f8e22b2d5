//! Command flows against a stub storefront API and a real state file.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::{
    Json, Router,
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
    routing::{get, post},
};
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{Duration, Utc};
use serde_json::{Value, json};

use storegate_auth::Role;
use storegate_cli::App;
use storegate_core::{RoutePath, UserId};
use storegate_gate::{ClientDecision, DenyReason, EdgeVerdict, GateConfig};
use storegate_session::{
    Credentials, FileTokenStore, HttpAuthClient, SessionError, TOKEN_KEY, TokenStore,
};

// The signature segment carries the account kind so `/auth/me` can answer.
fn token_for(kind: &str) -> String {
    let exp = (Utc::now() + Duration::hours(1)).timestamp();
    let body = URL_SAFE_NO_PAD.encode(json!({ "sub": kind, "exp": exp }).to_string());
    format!("eyJhbGciOiJIUzI1NiJ9.{body}.{kind}")
}

fn identity_json(kind: &str) -> Value {
    json!({
        "id": UserId::new(),
        "email": format!("{kind}@example.com"),
        "name": kind,
        "roles": [kind],
    })
}

struct TestServer {
    base_url: String,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        let me = |headers: HeaderMap| async move {
            let kind = headers
                .get(AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.strip_prefix("Bearer "))
                .and_then(|t| t.rsplit('.').next())
                .unwrap_or_default()
                .to_string();
            match kind.as_str() {
                "customer" | "admin" => Ok(Json(identity_json(&kind))),
                _ => Err(StatusCode::UNAUTHORIZED),
            }
        };

        let login = |Json(body): Json<Value>| async move {
            if body["password"] != "secret" {
                return Err(StatusCode::UNAUTHORIZED);
            }
            let email = body["email"].as_str().unwrap_or_default();
            let kind = email.split('@').next().unwrap_or_default();
            let mut user = identity_json(kind);
            if kind == "revoked" {
                user["roles"] = json!(["customer"]);
            }
            Ok(Json(json!({ "token": token_for(kind), "user": user })))
        };

        let app = Router::new()
            .route("/auth/me", get(me))
            .route("/auth/login", post(login))
            .route("/auth/logout", post(|| async { StatusCode::NO_CONTENT }));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { base_url, handle }
    }

    /// A fresh application load sharing `state_file`.
    fn app(&self, state_file: &Path) -> App {
        App::new(
            &GateConfig::default(),
            Arc::new(FileTokenStore::new(state_file)),
            Arc::new(HttpAuthClient::new(self.base_url.clone())),
        )
        .unwrap()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn state_file() -> PathBuf {
    std::env::temp_dir()
        .join(format!("storegate-cli-{}", UserId::new()))
        .join("session.json")
}

fn credentials(kind: &str, password: &str) -> Credentials {
    Credentials {
        email: format!("{kind}@example.com"),
        password: password.into(),
    }
}

#[tokio::test]
async fn anonymous_check_is_stopped_at_the_edge() {
    let server = TestServer::spawn().await;
    let file = state_file();

    let report = server.app(&file).check("/dashboard").await;
    assert_eq!(
        report.edge,
        EdgeVerdict::Deny {
            redirect_to: RoutePath::root()
        }
    );
    assert_eq!(report.client, None);
    assert!(report.redirects.is_empty());

    let report = server.app(&file).check("/register").await;
    assert!(report.edge.is_allowed());
    assert_eq!(report.client, Some(ClientDecision::Proceed));
}

#[tokio::test]
async fn customer_session_survives_between_runs() {
    let server = TestServer::spawn().await;
    let file = state_file();

    let state = server.app(&file).login(&credentials("customer", "secret")).await.unwrap();
    assert!(state.is_authenticated());

    let report = server.app(&file).check("/orders/42").await;
    assert!(report.edge.is_allowed());
    assert_eq!(report.client, Some(ClientDecision::Proceed));
    assert!(report.session.is_authenticated());

    let report = server.app(&file).check("/reports").await;
    assert_eq!(
        report.client,
        Some(ClientDecision::Redirect {
            to: RoutePath::normalize("/unauthorized"),
            reason: DenyReason::MissingRole {
                required: vec![Role::Admin]
            },
        })
    );
    assert_eq!(report.redirects, vec![RoutePath::normalize("/unauthorized")]);
}

#[tokio::test]
async fn logout_clears_the_state_file() {
    let server = TestServer::spawn().await;
    let file = state_file();

    server.app(&file).login(&credentials("admin", "secret")).await.unwrap();
    let state = server.app(&file).logout().await;
    assert!(!state.is_authenticated());
    assert_eq!(FileTokenStore::new(&file).get(TOKEN_KEY), None);

    let report = server.app(&file).check("/reports").await;
    assert!(!report.edge.is_allowed());
}

#[tokio::test]
async fn revoked_token_sends_the_user_to_login() {
    let server = TestServer::spawn().await;
    let file = state_file();

    server.app(&file).login(&credentials("revoked", "secret")).await.unwrap();

    let report = server.app(&file).check("/dashboard").await;
    assert!(report.edge.is_allowed());
    assert_eq!(
        report.client,
        Some(ClientDecision::Redirect {
            to: RoutePath::normalize("/login"),
            reason: DenyReason::InvalidToken,
        })
    );
    assert_eq!(
        report.session.error(),
        Some("identity fetch failed: credentials rejected (401)")
    );
    assert_eq!(FileTokenStore::new(&file).get(TOKEN_KEY), None);
}

#[tokio::test]
async fn wrong_password_is_reported() {
    let server = TestServer::spawn().await;
    let file = state_file();

    let err = server
        .app(&file)
        .login(&credentials("customer", "nope"))
        .await
        .unwrap_err();
    assert!(matches!(err, SessionError::LoginFailed(_)));
    assert_eq!(FileTokenStore::new(&file).get(TOKEN_KEY), None);
}

#[test]
fn out_of_range_leeway_is_a_config_error() {
    let config = GateConfig {
        expiry_leeway_secs: i64::MAX,
        ..GateConfig::default()
    };
    let app = App::new(
        &config,
        Arc::new(FileTokenStore::new(state_file())),
        Arc::new(HttpAuthClient::new("http://127.0.0.1:9")),
    );
    assert!(app.is_err());
}
