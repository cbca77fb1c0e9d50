//! Shared test helpers for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use tempfile::TempDir;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tower::ServiceExt;

use stealth_api::AppState;
use stealth_auth::{JwtDecoder, JwtEncoder};
use stealth_core::config::AppConfig;
use stealth_core::traits::{IdentityIssuer, IdentityVerifier};
use stealth_core::types::UserId;
use stealth_database::MemoryStore;
use stealth_database::store::UserDirectory;
use stealth_entity::user::NewUser;
use stealth_media::{LocalMediaStore, MediaStore};
use stealth_realtime::RealtimeEngine;

/// A client socket.
pub type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Test application context backed by the in-memory store.
pub struct TestApp {
    /// Shared state, as handed to the router
    pub state: AppState,
    /// Direct access to the store
    pub store: MemoryStore,
    /// Token issuer
    pub encoder: JwtEncoder,
    /// Media root, removed on drop
    _media_dir: TempDir,
}

impl TestApp {
    /// Create a new test application
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    /// Create a test application, adjusting the config first
    pub async fn with_config(adjust: impl FnOnce(&mut AppConfig)) -> Self {
        let media_dir = tempfile::tempdir().expect("Failed to create media dir");

        let mut config = AppConfig::for_memory_store();
        config.auth.jwt_secret = "integration-test-secret".to_string();
        config.media.root = media_dir.path().to_string_lossy().into_owned();
        config.realtime.ping_interval_seconds = 60;
        config.auth.allow_registration = true;
        adjust(&mut config);

        let store = MemoryStore::new();
        let verifier: Arc<dyn IdentityVerifier> = Arc::new(JwtDecoder::new(&config.auth));
        let media: Arc<dyn MediaStore> = Arc::new(
            LocalMediaStore::new(&config.media)
                .await
                .expect("Failed to init media store"),
        );
        let engine = Arc::new(RealtimeEngine::new(
            config.realtime.clone(),
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            verifier.clone(),
            config.auth.require_auth,
        ));
        let encoder = JwtEncoder::new(&config.auth);
        let issuer: Arc<dyn IdentityIssuer> = Arc::new(encoder.clone());

        Self {
            state: AppState::new(config, engine, verifier, issuer, media),
            store,
            encoder,
            _media_dir: media_dir,
        }
    }

    /// The router for oneshot requests
    pub fn router(&self) -> Router {
        stealth_api::build_app(self.state.clone())
    }

    /// Create a user and a bearer token for it
    pub async fn user(&self, name: &str) -> (UserId, String) {
        let user = self
            .store
            .create_user(NewUser::named(name))
            .await
            .expect("Failed to create user");
        let token = self.encoder.issue(user.id).expect("Failed to issue token");
        (user.id, token)
    }

    /// Make a JSON request
    pub async fn request(
        &self,
        method: &str,
        path: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> TestResponse {
        let body_str = body
            .map(|b| serde_json::to_string(&b).expect("Failed to serialize body"))
            .unwrap_or_default();

        let mut req = Request::builder()
            .method(method)
            .uri(path)
            .header("Content-Type", "application/json");
        if let Some(token) = token {
            req = req.header("Authorization", format!("Bearer {token}"));
        }
        let req = req
            .body(Body::from(body_str))
            .expect("Failed to build request");

        self.send(req).await
    }

    /// Send a prebuilt request
    pub async fn send(&self, req: Request<Body>) -> TestResponse {
        let response = self
            .router()
            .oneshot(req)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .expect("Failed to read body");
        let body: Value = serde_json::from_slice(&body_bytes).unwrap_or(Value::Null);

        TestResponse { status, body }
    }

    /// Serve on an ephemeral port. Dropping the returned guard stops it.
    pub async fn spawn(&self) -> RunningServer {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind");
        let addr = listener.local_addr().expect("No local addr");
        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let state = self.state.clone();
        tokio::spawn(async move {
            let _ = stealth_api::app::serve(listener, state, async {
                let _ = stop_rx.await;
            })
            .await;
        });
        RunningServer {
            addr,
            _stop: stop_tx,
        }
    }
}

/// Handle to a live server.
pub struct RunningServer {
    /// Bound address
    pub addr: SocketAddr,
    _stop: oneshot::Sender<()>,
}

impl RunningServer {
    /// Open a gateway connection with a token
    pub async fn connect(&self, token: &str) -> Socket {
        let url = format!("ws://{}/ws?token={token}", self.addr);
        let (socket, _) = tokio_tungstenite::connect_async(url)
            .await
            .expect("Failed to connect");
        socket
    }

    /// Open a gateway connection and announce the identity. Returns once
    /// the server has processed the join.
    pub async fn join(&self, user: UserId, token: &str) -> Socket {
        let mut socket = self.connect(token).await;
        emit(&mut socket, "join-room", Value::String(user.to_string())).await;
        emit(&mut socket, "get-online-users", Value::Null).await;
        expect_event(&mut socket, "online-users").await;
        socket
    }
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    /// HTTP status code
    pub status: StatusCode,
    /// Parsed JSON body
    pub body: Value,
}

/// Send one event frame
pub async fn emit(socket: &mut Socket, event: &str, data: Value) {
    let frame = if data.is_null() {
        serde_json::json!({ "event": event })
    } else {
        serde_json::json!({ "event": event, "data": data })
    };
    socket
        .send(Message::text(frame.to_string()))
        .await
        .expect("Failed to send frame");
}

/// Wait for the next event named `event`, skipping others
pub async fn expect_event(socket: &mut Socket, event: &str) -> Value {
    let wait = async {
        loop {
            let msg = socket
                .next()
                .await
                .expect("Socket closed")
                .expect("Socket error");
            if let Message::Text(text) = msg {
                let value: Value = serde_json::from_str(text.as_str()).expect("Bad frame");
                if value["event"] == event {
                    return value["data"].clone();
                }
            }
        }
    };
    tokio::time::timeout(Duration::from_secs(5), wait)
        .await
        .unwrap_or_else(|_| panic!("Timed out waiting for {event}"))
}

/// Assert no event named `event` arrives within a short window
pub async fn expect_silence(socket: &mut Socket, event: &str) {
    let wait = async {
        while let Some(Ok(msg)) = socket.next().await {
            if let Message::Text(text) = msg {
                let value: Value = serde_json::from_str(text.as_str()).expect("Bad frame");
                if value["event"] == event {
                    return Some(value);
                }
            }
        }
        None
    };
    if let Ok(Some(value)) = tokio::time::timeout(Duration::from_millis(300), wait).await {
        panic!("Unexpected {event}: {value}");
    }
}
