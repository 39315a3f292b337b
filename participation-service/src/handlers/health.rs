use crate::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let environment = if state.config.is_prod() { "prod" } else { "dev" };

    Json(json!({
        "status": "ok",
        "service": state.config.service_name,
        "version": state.config.service_version,
        "environment": environment,
        "locationBackend": state.gating.resolver().backend().as_str(),
        "captchaEnabled": state.gating.captcha_required(),
    }))
}

pub async fn metrics() -> impl IntoResponse {
    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        crate::services::metrics::get_metrics(),
    )
}
