//! Application state, router assembly and server lifecycle.

use crate::config::ParticipationConfig;
use crate::handlers;
use crate::middleware::route_guard_middleware;
use crate::models::CookieSettings;
use crate::services::{
    location::resolver_from_config, CaptchaVerifier, GatingService, GroupPolicy, RecaptchaVerifier,
};
use axum::{
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Router,
};
use service_core::error::AppError;
use service_core::middleware::{
    metrics::metrics_middleware,
    rate_limit::{create_ip_rate_limiter, ip_rate_limit_middleware, IpRateLimiter},
    security_headers::security_headers_middleware,
    tracing::request_id_middleware,
};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub config: ParticipationConfig,
    pub policy: Arc<GroupPolicy>,
    pub gating: Arc<GatingService>,
    pub verify_rate_limiter: IpRateLimiter,
}

impl AppState {
    /// Wire the production collaborators selected by `config`.
    pub fn from_config(config: ParticipationConfig) -> Self {
        let policy = Arc::new(GroupPolicy::default());
        let resolver = resolver_from_config(&config.location);

        let verifier: Option<Arc<dyn CaptchaVerifier>> = if config.captcha.enabled {
            tracing::info!(verify_url = %config.captcha.verify_url, "reCAPTCHA verifier initialized");
            Some(Arc::new(RecaptchaVerifier::new(config.captcha.clone())))
        } else {
            tracing::warn!("CAPTCHA disabled, verification step will be skipped");
            None
        };

        let cookie_settings = config.cookies.enabled.then(|| CookieSettings {
            secure: config.is_prod(),
            max_age_hours: config.cookies.max_age_hours,
        });

        let gating = Arc::new(GatingService::new(
            policy.clone(),
            resolver,
            verifier,
            cookie_settings,
        ));

        let verify_rate_limiter = create_ip_rate_limiter(
            config.rate_limit.verify_attempts,
            config.rate_limit.verify_window_seconds,
            config.rate_limit.trust_forwarded_headers,
        );

        Self {
            config,
            policy,
            gating,
            verify_rate_limiter,
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    // Verification is the only endpoint that calls out, so it alone is rate limited
    let verify_routes = Router::new()
        .route("/verify-location", post(handlers::verify_location))
        .route("/geolocate", post(handlers::verify_location))
        .layer(from_fn_with_state(
            state.verify_rate_limiter.clone(),
            ip_rate_limit_middleware,
        ));

    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/metrics", get(handlers::metrics))
        .route("/participation", get(handlers::participation))
        .route("/group/:code", get(handlers::group_landing))
        .merge(verify_routes)
        .with_state(state)
        .layer(from_fn(route_guard_middleware))
        .layer(from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http().make_span_with(
            |request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                )
            },
        ))
        .layer(from_fn(request_id_middleware))
        .layer(from_fn(security_headers_middleware))
}

pub struct Application {
    port: u16,
    listener: TcpListener,
    router: Router,
}

impl Application {
    pub async fn build(config: ParticipationConfig) -> Result<Self, AppError> {
        let addr = config.common.socket_addr()?;
        let state = AppState::from_config(config);
        let router = build_router(state);

        // Port 0 binds a random port for testing
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind TCP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!(port = port, "Listening");

        Ok(Self {
            port,
            listener,
            router,
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Serve until `shutdown` resolves, then drain in-flight requests.
    pub async fn run_until_stopped<F>(self, shutdown: F) -> std::io::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        axum::serve(
            self.listener,
            self.router
                .into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown)
        .await
    }
}
