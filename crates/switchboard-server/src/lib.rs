#![allow(clippy::missing_errors_doc, clippy::must_use_candidate)]

mod admin;
mod auth;
mod cors;
mod health;
mod quota;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context as _;
use axum::Router;
use jiff::tz::TimeZone;
use switchboard_auth::{IdentityResolver, ProviderResolver};
use switchboard_config::Config;
use switchboard_data::{InMemoryData, ModelCatalog, PostgrestClient, UsageRepository, UserDirectory};
use switchboard_hub::Hub;
use switchboard_llm::{KeyRotationService, LlmProxyService, UpstreamClient};
use switchboard_quota::QuotaService;
use switchboard_store::CounterStore;
use switchboard_usage::{UsageRecorder, UsageService};
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;

/// External collaborators the server is built on
///
/// [`Server::new`] derives these from configuration; tests supply their own.
pub struct Dependencies {
    pub users: Arc<dyn UserDirectory>,
    pub models: Arc<dyn ModelCatalog>,
    pub usage: Arc<dyn UsageRepository>,
    pub store: Arc<dyn CounterStore>,
    pub identity: Arc<dyn IdentityResolver>,
}

/// Assembled server with all routes and middleware
pub struct Server {
    router: Router,
    listen_address: SocketAddr,
    hub: Hub,
    hub_shutdown: CancellationToken,
}

impl Server {
    /// Build the server and its collaborators from configuration
    ///
    /// Without a `[data]` section, users, models and usage live in process
    /// memory, which is only suitable for local development.
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let store = switchboard_store::create_store(&config.store)
            .await
            .context("failed to initialize counter store")?;

        let (users, models, usage): (Arc<dyn UserDirectory>, Arc<dyn ModelCatalog>, Arc<dyn UsageRepository>) =
            match &config.data {
                Some(data) => {
                    let client = Arc::new(PostgrestClient::new(
                        data.url.clone(),
                        data.service_key.clone(),
                        data.timeout,
                    )?);
                    (client.clone(), client.clone(), client)
                }
                None => {
                    tracing::warn!("no [data] section configured, using in-memory collaborators");
                    let memory = Arc::new(InMemoryData::new());
                    (memory.clone(), memory.clone(), memory)
                }
            };

        let auth = config
            .auth
            .as_ref()
            .context("the [auth] section is required to validate bearer tokens")?;
        let identity = Arc::new(ProviderResolver::new(auth, users.clone())?);

        Self::with_dependencies(
            config,
            Dependencies {
                users,
                models,
                usage,
                store,
                identity,
            },
        )
    }

    /// Build the server on caller-supplied collaborators
    ///
    /// Spawns the hub coordinator and usage recorder, so it must be called
    /// from within a Tokio runtime.
    pub fn with_dependencies(config: Config, deps: Dependencies) -> anyhow::Result<Self> {
        let listen_address = config.server.listen_address();
        let time_zone = resolve_time_zone(config.quota.time_zone.as_deref())?;

        let usage = UsageService::new(deps.usage, time_zone);
        let quota = QuotaService::new(deps.users, usage.clone());
        let rotation = KeyRotationService::new(deps.store, config.llm.failure_alert_threshold);
        let recorder = UsageRecorder::spawn(usage.clone(), config.llm.usage_buffer);
        let upstream = UpstreamClient::new(config.llm.upstream_timeout)?;
        let proxy = LlmProxyService::new(deps.models.clone(), quota.clone(), rotation.clone(), recorder, upstream);

        let hub_shutdown = CancellationToken::new();
        let hub = Hub::spawn(config.hub.clone(), hub_shutdown.clone());

        // Routes behind bearer-token authentication
        let identity = deps.identity;
        let protected = Router::new()
            .nest("/api/v1/llm", switchboard_llm::llm_router(proxy))
            .merge(quota::quota_router(quota))
            .merge(switchboard_hub::hub_router(hub.clone()))
            .route_layer(axum::middleware::from_fn(move |req: axum::extract::Request, next: axum::middleware::Next| {
                let identity = Arc::clone(&identity);
                async move { auth::auth_middleware(identity, req, next).await }
            }));

        let mut app = Router::new();

        if config.server.health.enabled {
            app = app.route(&config.server.health.path, axum::routing::get(health::health_handler));
        }

        app = app.merge(protected);

        if let Some(secret) = config.server.admin_secret.clone() {
            let state = admin::AdminState {
                rotation,
                catalog: deps.models,
                usage,
                hub: hub.clone(),
            };
            app = app.merge(admin::admin_router(state, secret));
        } else {
            tracing::debug!("admin endpoints disabled, no server.admin_secret configured");
        }

        app = app.layer(TraceLayer::new_for_http());

        if let Some(ref cors_config) = config.server.cors {
            app = app.layer(cors::cors_layer(cors_config));
        }

        Ok(Self {
            router: app,
            listen_address,
            hub,
            hub_shutdown,
        })
    }

    /// Get the configured listen address
    pub const fn listen_address(&self) -> SocketAddr {
        self.listen_address
    }

    /// Handle for pushing events to connected clients
    pub fn hub(&self) -> &Hub {
        &self.hub
    }

    /// Consume the server and return the inner router
    ///
    /// Useful for testing when the caller manages the listener
    pub fn into_router(self) -> Router {
        self.router
    }

    /// Start serving requests
    ///
    /// Blocks until the cancellation token is triggered. Live WebSocket
    /// sessions are closed when shutdown begins.
    pub async fn serve(self, shutdown: CancellationToken) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.listen_address).await?;
        let local_addr = listener.local_addr()?;
        tracing::info!(%local_addr, "server listening");

        let hub_shutdown = self.hub_shutdown;
        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                shutdown.cancelled().await;
                tracing::info!("graceful shutdown initiated");
                hub_shutdown.cancel();
            })
            .await?;

        Ok(())
    }
}

impl std::fmt::Debug for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server")
            .field("listen_address", &self.listen_address)
            .finish_non_exhaustive()
    }
}

fn resolve_time_zone(name: Option<&str>) -> anyhow::Result<TimeZone> {
    match name {
        Some(name) => TimeZone::get(name).with_context(|| format!("unknown quota.time_zone `{name}`")),
        None => Ok(TimeZone::system()),
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use axum::body::Body;
    use http::{Request, StatusCode};
    use serde_json::Value;
    use switchboard_auth::AuthError;
    use switchboard_core::{AuthenticatedUser, MembershipTier};
    use switchboard_store::MemoryStore;
    use tower::ServiceExt;

    use super::*;

    struct SingleUser;

    #[async_trait]
    impl IdentityResolver for SingleUser {
        async fn resolve(&self, token: &str) -> Result<AuthenticatedUser, AuthError> {
            if token == "good" {
                Ok(AuthenticatedUser {
                    user_id: "u1".to_owned(),
                    email: None,
                    tier: MembershipTier::Free,
                })
            } else {
                Err(AuthError::InvalidToken)
            }
        }
    }

    fn router(config: Config) -> Router {
        let data = Arc::new(InMemoryData::new());
        let deps = Dependencies {
            users: data.clone(),
            models: data.clone(),
            usage: data,
            store: Arc::new(MemoryStore::new()),
            identity: Arc::new(SingleUser),
        };
        Server::with_dependencies(config, deps).unwrap().into_router()
    }

    async fn get(router: Router, uri: &str, headers: &[(&str, &str)]) -> (StatusCode, Value) {
        let mut request = Request::get(uri);
        for (name, value) in headers {
            request = request.header(*name, *value);
        }
        let response = router.oneshot(request.body(Body::empty()).unwrap()).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn config_with_admin() -> Config {
        Config::from_toml(
            r#"
            [server]
            admin_secret = "s3cret"

            [quota]
            time_zone = "UTC"
            "#,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn health_needs_no_token() {
        let (status, body) = get(router(Config::default()), "/health", &[]).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert!(body["time"].is_string());
    }

    #[tokio::test]
    async fn protected_routes_require_a_token() {
        let (status, body) = get(router(Config::default()), "/api/v1/quota/levels", &[]).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["code"], 40101);

        let (status, body) = get(
            router(Config::default()),
            "/api/v1/quota/levels",
            &[("authorization", "Bearer bad")],
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["code"], 40103);
    }

    #[tokio::test]
    async fn quota_levels_list_every_tier() {
        let (status, body) = get(
            router(Config::default()),
            "/api/v1/quota/levels",
            &[("authorization", "Bearer good")],
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["code"], 0);
        assert_eq!(body["data"].as_array().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn unknown_user_quota_is_not_found() {
        let (status, body) = get(
            router(config_with_admin()),
            "/api/v1/quota",
            &[("authorization", "Bearer good")],
        )
        .await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], 40402);
    }

    #[tokio::test]
    async fn admin_routes_check_the_secret() {
        let (status, body) = get(router(config_with_admin()), "/api/v1/admin/hub", &[]).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["code"], 40301);

        let (status, body) = get(
            router(config_with_admin()),
            "/api/v1/admin/hub",
            &[("x-admin-secret", "s3cret")],
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["total_connections"], 0);
    }

    #[tokio::test]
    async fn admin_routes_are_absent_without_a_secret() {
        let response = router(Config::default())
            .oneshot(
                Request::get("/api/v1/admin/hub")
                    .header("x-admin-secret", "anything")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn unknown_time_zone_is_rejected() {
        assert!(resolve_time_zone(Some("Mars/Olympus_Mons")).is_err());
        assert!(resolve_time_zone(Some("UTC")).is_ok());
    }
}
