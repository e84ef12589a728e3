//! Shared test helpers for integration tests.
//!
//! Every app runs on in-memory backends. Several apps built from the same
//! [`TestBackends`] behave like separate processes sharing one directory,
//! one bus, and one database.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use futures::{SinkExt, StreamExt};
use http::{Request, StatusCode};
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tower::ServiceExt;
use uuid::Uuid;

use parley_api::AppState;
use parley_auth::JwtEncoder;
use parley_core::config::AppConfig;
use parley_realtime::RealtimeEngine;
use parley_realtime::message::types::OutboundEvent;
use parley_realtime::testing::{TestBackends, test_config};

/// Client side of a test WebSocket.
pub type WsClient = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// How long a test waits for an event that should arrive.
pub const EVENT_WAIT: Duration = Duration::from_secs(2);

/// How long a test waits before concluding nothing arrives.
pub const QUIET_WAIT: Duration = Duration::from_millis(200);

/// Test application context
pub struct TestApp {
    /// Shared in-memory backends
    pub backends: TestBackends,
    /// The real-time engine of this app
    pub engine: RealtimeEngine,
    /// The Axum router for making test requests
    pub router: Router,
    /// Application config
    pub config: AppConfig,
    subscriber: JoinHandle<()>,
}

/// Parsed HTTP response
pub struct TestResponse {
    /// Status code
    pub status: StatusCode,
    /// JSON body, or `Null` when the body is not JSON
    pub body: Value,
}

impl TestApp {
    /// Create a single app on fresh backends
    pub async fn new() -> Self {
        Self::on(&TestBackends::new(), "node-a").await
    }

    /// Create an app for `instance_id` on shared backends
    pub async fn on(backends: &TestBackends, instance_id: &str) -> Self {
        let config = test_config(instance_id);
        let engine = backends.engine(instance_id);
        let subscriber = engine.start().await.expect("Failed to start engine");

        let state = AppState {
            config: Arc::new(config.clone()),
            realtime: engine.clone(),
            users: backends.users.clone(),
            messages: backends.messages.clone(),
            database: backends.messages.clone(),
        };

        Self {
            backends: backends.clone(),
            router: parley_api::build_router(state),
            engine,
            config,
            subscriber,
        }
    }

    /// Identity cookie for `user_id`
    pub fn cookie_for(&self, user_id: Uuid) -> String {
        let (token, _) = JwtEncoder::new(&self.config.auth)
            .generate_access_token(user_id)
            .expect("Failed to sign token");
        format!("{}={}", self.config.auth.cookie_name, token)
    }

    /// Make a GET request against the router
    pub async fn get(&self, uri: &str, cookie: Option<&str>) -> TestResponse {
        let mut builder = Request::builder().method("GET").uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(http::header::COOKIE, cookie);
        }
        let request = builder.body(Body::empty()).expect("Failed to build request");

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to execute request");

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Failed to read body");
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

        TestResponse { status, body }
    }

    /// Serve the router on an ephemeral local port
    pub async fn serve(&self) -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test listener");
        let addr = listener.local_addr().expect("No local address");
        let router = self.router.clone();
        tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });
        addr
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self.engine.shutdown();
        self.subscriber.abort();
    }
}

/// Open a WebSocket to `addr`, optionally carrying a cookie
pub async fn connect_ws(
    addr: SocketAddr,
    cookie: Option<&str>,
) -> Result<WsClient, tokio_tungstenite::tungstenite::Error> {
    let mut request = format!("ws://{addr}/ws")
        .into_client_request()
        .expect("Invalid WebSocket URL");
    if let Some(cookie) = cookie {
        request.headers_mut().insert(
            http::header::COOKIE,
            cookie.parse().expect("Invalid cookie header"),
        );
    }
    tokio_tungstenite::connect_async(request)
        .await
        .map(|(ws, _)| ws)
}

/// Next JSON text frame, skipping control frames
pub async fn next_frame(ws: &mut WsClient) -> Value {
    tokio::time::timeout(EVENT_WAIT, async {
        loop {
            match ws.next().await {
                Some(Ok(Message::Text(text))) => {
                    return serde_json::from_str::<Value>(text.as_str())
                        .expect("Server sent invalid JSON");
                }
                Some(Ok(_)) => continue,
                other => panic!("WebSocket ended: {other:?}"),
            }
        }
    })
    .await
    .expect("Timed out waiting for a frame")
}

/// Next frame with the given event name, skipping others
pub async fn next_event_named(ws: &mut WsClient, name: &str) -> Value {
    loop {
        let frame = next_frame(ws).await;
        if frame["event"] == name {
            return frame;
        }
    }
}

/// Whether any text frame arrives within [`QUIET_WAIT`]
pub async fn stays_quiet(ws: &mut WsClient) -> bool {
    let outcome = tokio::time::timeout(QUIET_WAIT, async {
        loop {
            match ws.next().await {
                Some(Ok(Message::Text(_))) => return,
                Some(Ok(_)) => continue,
                _ => std::future::pending::<()>().await,
            }
        }
    })
    .await;
    outcome.is_err()
}

/// Send a JSON frame
pub async fn send_frame(ws: &mut WsClient, frame: Value) {
    ws.send(Message::Text(frame.to_string().into()))
        .await
        .expect("Failed to send frame");
}

/// Next event queued on an admitted connection
pub async fn recv_event(rx: &mut mpsc::Receiver<OutboundEvent>) -> OutboundEvent {
    tokio::time::timeout(EVENT_WAIT, rx.recv())
        .await
        .expect("Timed out waiting for an event")
        .expect("Connection queue closed")
}

/// Whether nothing arrives on the queue within [`QUIET_WAIT`]
pub async fn queue_stays_quiet(rx: &mut mpsc::Receiver<OutboundEvent>) -> bool {
    tokio::time::timeout(QUIET_WAIT, rx.recv()).await.is_err()
}
