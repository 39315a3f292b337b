//! Test helpers for participation-service integration tests.
//!
//! Builds the full router around mock collaborators and drives it in-process
//! with `tower::ServiceExt::oneshot`.

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Request, Response, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use participation_service::{
    build_router,
    config::{
        CaptchaConfig, CookieConfig, Environment, LocationBackend, LocationConfig,
        ParticipationConfig, RateLimitConfig, DEFAULT_RECAPTCHA_VERIFY_URL,
    },
    models::CookieSettings,
    services::{
        CaptchaVerifier, DatabaseResolver, GatingService, GroupPolicy, LocationResolver,
        MockCaptchaVerifier, StaticCountryDb, TrustedHeaderResolver,
    },
    AppState,
};
use secrecy::Secret;
use std::net::IpAddr;
use std::sync::Arc;
use tower::ServiceExt;

pub const COUNTRY_HEADER: &str = "x-vercel-ip-country";
pub const CITY_HEADER: &str = "x-vercel-ip-city";

pub fn test_config() -> ParticipationConfig {
    ParticipationConfig {
        common: service_core::config::Config::default(),
        environment: Environment::Dev,
        service_name: "participation-service-test".to_string(),
        service_version: env!("CARGO_PKG_VERSION").to_string(),
        log_level: "error".to_string(),
        otlp_endpoint: None,
        captcha: CaptchaConfig {
            enabled: true,
            secret_key: Secret::new("test-secret".to_string()),
            site_key: "test-site-key".to_string(),
            verify_url: DEFAULT_RECAPTCHA_VERIFY_URL.to_string(),
            timeout_seconds: 5,
        },
        location: LocationConfig {
            backend: LocationBackend::Header,
            country_header: COUNTRY_HEADER.to_string(),
            city_header: CITY_HEADER.to_string(),
            database_path: "GeoLite2-Country.mmdb".to_string(),
            allow_test_ip_fallback: false,
            test_ip: IpAddr::from([8, 8, 8, 8]),
        },
        cookies: CookieConfig {
            enabled: true,
            max_age_hours: 24,
        },
        rate_limit: RateLimitConfig {
            verify_attempts: 100,
            verify_window_seconds: 60,
            trust_forwarded_headers: false,
        },
    }
}

pub struct TestApp {
    pub router: Router,
    pub verifier: Arc<MockCaptchaVerifier>,
}

impl TestApp {
    /// Header-trust locator with a passing CAPTCHA.
    pub fn spawn() -> Self {
        Self::with_verifier(MockCaptchaVerifier::passing())
    }

    pub fn with_verifier(verifier: MockCaptchaVerifier) -> Self {
        let config = test_config();
        let resolver = Arc::new(TrustedHeaderResolver::new(COUNTRY_HEADER, CITY_HEADER));
        Self::build(config, resolver, verifier)
    }

    /// Database locator backed by a fixed IP table.
    pub fn with_database(db: StaticCountryDb, allow_test_ip_fallback: bool) -> Self {
        let mut config = test_config();
        config.location.backend = LocationBackend::Database;
        config.location.allow_test_ip_fallback = allow_test_ip_fallback;
        let resolver = Arc::new(DatabaseResolver::new(
            Arc::new(db),
            allow_test_ip_fallback,
            config.location.test_ip,
        ));
        Self::build(config, resolver, MockCaptchaVerifier::passing())
    }

    pub fn with_config(config: ParticipationConfig) -> Self {
        let resolver = Arc::new(TrustedHeaderResolver::new(
            &config.location.country_header,
            &config.location.city_header,
        ));
        Self::build(config, resolver, MockCaptchaVerifier::passing())
    }

    fn build(
        config: ParticipationConfig,
        resolver: Arc<dyn LocationResolver>,
        verifier: MockCaptchaVerifier,
    ) -> Self {
        let verifier = Arc::new(verifier);
        let policy = Arc::new(GroupPolicy::default());

        let captcha: Option<Arc<dyn CaptchaVerifier>> = if config.captcha.enabled {
            Some(verifier.clone())
        } else {
            None
        };
        let cookie_settings = config.cookies.enabled.then(|| CookieSettings {
            secure: config.is_prod(),
            max_age_hours: config.cookies.max_age_hours,
        });

        let gating = Arc::new(GatingService::new(
            policy.clone(),
            resolver,
            captcha,
            cookie_settings,
        ));
        let verify_rate_limiter = service_core::middleware::rate_limit::create_ip_rate_limiter(
            config.rate_limit.verify_attempts,
            config.rate_limit.verify_window_seconds,
            config.rate_limit.trust_forwarded_headers,
        );

        let state = AppState {
            config,
            policy,
            gating,
            verify_rate_limiter,
        };

        Self {
            router: build_router(state),
            verifier,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to execute request")
    }

    pub async fn verify(&self, body: serde_json::Value, headers: &[(&str, &str)]) -> Response<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/verify-location")
            .header(header::CONTENT_TYPE, "application/json");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        self.send(builder.body(Body::from(body.to_string())).unwrap())
            .await
    }

    pub async fn get(&self, uri: &str, cookie: Option<&str>) -> Response<Body> {
        let mut builder = Request::builder().uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }
}

pub async fn json_body(response: Response<Body>) -> serde_json::Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("Failed to read body")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("Body is not JSON")
}

pub fn set_cookies(response: &Response<Body>) -> Vec<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect()
}

pub fn assert_redirects_to_participation(response: &Response<Body>) {
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(
        response.headers().get(header::LOCATION).unwrap(),
        "/participation"
    );
}
