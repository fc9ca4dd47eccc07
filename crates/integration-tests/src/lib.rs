//! End-to-end tests for the Cartwheel storefront.
//!
//! Each test starts its own server on an ephemeral port, backed by a private
//! in-memory store, and talks to it over real HTTP with `reqwest`.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p cartwheel-integration-tests
//! ```

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use reqwest::{Client, Response, StatusCode};
use secrecy::SecretString;
use serde_json::{Value, json};

use cartwheel_storefront::config::{AuthConfig, NotificationConfig, StorefrontConfig};
use cartwheel_storefront::db;
use cartwheel_storefront::state::AppState;

/// Signing secret used by every test server.
const TEST_JWT_SECRET: &str = "k3L9vQ2xR7mT1pZ8wB4nY6cF0hJ5sD2gA9eU7iO3";

/// Password used for accounts created through [`TestApp::register`].
pub const TEST_PASSWORD: &str = "correct-horse-battery";

/// A running storefront with a client pointed at it.
pub struct TestApp {
    pub addr: SocketAddr,
    pub client: Client,
    pub state: AppState,
}

impl TestApp {
    /// Start a server with the default notification interval.
    pub async fn spawn() -> Self {
        Self::spawn_with(NotificationConfig::default()).await
    }

    /// Start a server with custom notification settings.
    pub async fn spawn_with(notifications: NotificationConfig) -> Self {
        let config = StorefrontConfig {
            database_url: SecretString::from("sqlite::memory:"),
            database_max_connections: 1,
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 0,
            auth: AuthConfig {
                jwt_secret: SecretString::from(TEST_JWT_SECRET),
                token_lifetime: Duration::from_secs(600),
            },
            notifications,
            sentry_dsn: None,
            sentry_environment: None,
        };

        let pool = db::create_pool(&config.database_url, config.database_max_connections)
            .await
            .expect("Failed to create test pool");
        db::init_schema(&pool)
            .await
            .expect("Failed to initialize test schema");

        let listener = tokio::net::TcpListener::bind(config.socket_addr())
            .await
            .expect("Failed to bind test listener");
        let addr = listener.local_addr().expect("Listener has no address");

        let state = AppState::new(&config, pool);
        let app = cartwheel_storefront::app(state.clone());
        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                panic!("test server failed: {e}");
            }
        });

        Self {
            addr,
            client: Client::new(),
            state,
        }
    }

    /// Absolute URL for `path`.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    /// Register an account and return its JSON view.
    pub async fn register(&self, email: &str) -> Value {
        let resp = self
            .client
            .post(self.url("/auth/register"))
            .json(&json!({ "email": email, "password": TEST_PASSWORD }))
            .send()
            .await
            .expect("register request failed");
        assert_eq!(resp.status(), StatusCode::CREATED);
        resp.json().await.expect("register body")
    }

    /// Log in with a password form and return the raw response.
    pub async fn login(&self, email: &str, password: &str) -> Response {
        self.client
            .post(self.url("/auth/jwt/login"))
            .form(&[("username", email), ("password", password)])
            .send()
            .await
            .expect("login request failed")
    }

    /// Log in and return the bearer token.
    pub async fn token(&self, email: &str) -> String {
        let resp = self.login(email, TEST_PASSWORD).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = resp.json().await.expect("login body");
        assert_eq!(body["token_type"], "bearer");
        body["access_token"]
            .as_str()
            .expect("access_token is a string")
            .to_string()
    }

    /// Create a catalog record and return its JSON.
    pub async fn create(&self, collection: &str, body: &Value) -> Value {
        let resp = self
            .client
            .post(self.url(&format!("/{collection}")))
            .json(body)
            .send()
            .await
            .expect("create request failed");
        assert_eq!(resp.status(), StatusCode::CREATED);
        resp.json().await.expect("create body")
    }
}
