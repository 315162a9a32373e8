//! Relay server listener
//!
//! Binds the HTTP listener, wires the WebSocket and control routes to a
//! shared [`RelayHub`], and serves until shutdown.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::services::{ServeDir, ServeFile};

use crate::error::Result;
use crate::relay::RelayHub;
use crate::server::config::ServerConfig;
use crate::server::{api, net, ws};

/// State shared by every route
#[derive(Clone)]
pub(crate) struct AppState {
    pub hub: Arc<RelayHub>,
    pub config: Arc<ServerConfig>,
    /// Port the listener actually bound (differs from config for port 0)
    pub port: u16,
}

impl AppState {
    /// URL a broadcaster should open
    pub fn broadcast_url(&self) -> String {
        format!(
            "{}://{}:{}/broadcast",
            self.config.public_scheme,
            net::advertised_host(self.config.public_host.as_deref()),
            self.port
        )
    }
}

/// Relay server
pub struct RelayServer {
    config: ServerConfig,
    hub: Arc<RelayHub>,
}

impl RelayServer {
    /// Create a new server with a fresh hub
    pub fn new(config: ServerConfig) -> Self {
        let hub = RelayHub::new().peer_queue_capacity(config.peer_queue_capacity);
        Self::with_hub(config, Arc::new(hub))
    }

    /// Create a server around an existing hub
    pub fn with_hub(config: ServerConfig, hub: Arc<RelayHub>) -> Self {
        Self { config, hub }
    }

    /// Get a reference to the relay hub
    pub fn hub(&self) -> &Arc<RelayHub> {
        &self.hub
    }

    /// Get the server configuration
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Get the bind address
    pub fn bind_addr(&self) -> SocketAddr {
        self.config.bind_addr
    }

    /// Build the route table, advertising `port` in generated URLs
    pub fn router(&self, port: u16) -> Router {
        let state = AppState {
            hub: Arc::clone(&self.hub),
            config: Arc::new(self.config.clone()),
            port,
        };

        let mut router = Router::new()
            .route("/ws/signal", get(ws::signal_upgrade))
            .route("/ws/tcp", get(ws::data_upgrade))
            .route("/ws/data", get(ws::data_upgrade))
            .route(
                "/api/simulate",
                get(api::get_simulation).post(api::set_simulation),
            )
            .route("/api/stats", get(api::get_stats))
            .route("/broadcast-url", get(api::broadcast_url));

        if let Some(ref dir) = self.config.static_dir {
            tracing::info!(dir = %dir.display(), "Serving static files");
            router = router
                .route_service("/", ServeFile::new(dir.join("index.html")))
                .route_service("/broadcast", ServeFile::new(dir.join("broadcast.html")))
                .nest_service("/static", ServeDir::new(dir));
        }

        router.with_state(state)
    }

    /// Run the server
    ///
    /// This method blocks until the server fails.
    pub async fn run(&self) -> Result<()> {
        self.run_until(std::future::pending()).await
    }

    /// Run the server with graceful shutdown
    pub async fn run_until<F>(&self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.config.validate()?;
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        self.serve(listener, shutdown).await
    }

    /// Serve on an already bound listener
    pub async fn serve<F>(&self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        let app = self.router(addr.port());

        tracing::info!(addr = %addr, "Relay server listening");

        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(async move {
            shutdown.await;
            tracing::info!("Shutdown signal received");
        })
        .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::Value;
    use tower::ServiceExt;

    use super::*;
    use crate::impairment::ImpairmentConfig;
    use crate::registry::{ChannelKind, Frame, Role};

    async fn call(router: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), 64 * 1024).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    fn post(body: &'static str) -> Request<Body> {
        Request::post("/api/simulate")
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn test_get_simulation() {
        let hub = Arc::new(RelayHub::with_impairment(ImpairmentConfig::new(3, 40)));
        let server = RelayServer::with_hub(ServerConfig::default(), hub);

        let request = Request::get("/api/simulate").body(Body::empty()).unwrap();
        let (status, body) = call(server.router(8443), request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, serde_json::json!({ "loss_percent": 3, "latency_ms": 40 }));
    }

    #[tokio::test]
    async fn test_post_simulation_partial_update() {
        let hub = Arc::new(RelayHub::with_impairment(ImpairmentConfig::new(0, 120)));
        let server = RelayServer::with_hub(ServerConfig::default(), Arc::clone(&hub));
        let (_, viewer, mut rx) = hub.open_session(ChannelKind::Data, Role::Viewer);
        hub.registry().set(ChannelKind::Data, Role::Viewer).join(viewer).await;

        let (status, body) = call(server.router(8443), post(r#"{"loss_percent": 50}"#)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, serde_json::json!({ "loss_percent": 50, "latency_ms": 120 }));

        let Some(Frame::Text(text)) = rx.recv().await else {
            panic!("viewer should be told about the change");
        };
        let event: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(event["type"], "sim_config");
        assert_eq!(event["loss_percent"], 50);
        assert_eq!(event["latency_ms"], 120);
    }

    #[tokio::test]
    async fn test_post_simulation_never_rejects() {
        let server = RelayServer::new(ServerConfig::default());

        let (status, body) = call(server.router(8443), post("definitely not json")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, serde_json::json!({ "loss_percent": 0, "latency_ms": 0 }));

        let (status, body) =
            call(server.router(8443), post(r#"{"loss_percent": -4, "latency_ms": "75"}"#)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, serde_json::json!({ "loss_percent": 0, "latency_ms": 75 }));
    }

    #[tokio::test]
    async fn test_broadcast_url() {
        let config = ServerConfig::default().public_host("10.0.0.5");
        let server = RelayServer::new(config);

        let request = Request::get("/broadcast-url").body(Body::empty()).unwrap();
        let (status, body) = call(server.router(9443), request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["url"], "https://10.0.0.5:9443/broadcast");
    }

    #[tokio::test]
    async fn test_stats_endpoint() {
        let server = RelayServer::new(ServerConfig::default());
        let _session = server.hub().open_session(ChannelKind::Signal, Role::Viewer);

        let request = Request::get("/api/stats").body(Body::empty()).unwrap();
        let (status, body) = call(server.router(8443), request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["connections_accepted"], 1);
        assert_eq!(body["binary_frames_dropped"], 0);
    }
}
