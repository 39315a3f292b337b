use crate::models::{GatingDecision, VerifyLocationRequest};
use crate::services::ClientRequest;
use crate::AppState;
use axum::{
    extract::{rejection::JsonRejection, ConnectInfo, State},
    http::HeaderMap,
    Json,
};
use axum_extra::extract::cookie::CookieJar;
use service_core::error::AppError;
use std::net::SocketAddr;
use validator::Validate;

/// Run the gating pipeline for one participation attempt.
///
/// Every logical denial is a 200 with `allowed: false`; only malformed
/// requests are rejected.
pub async fn verify_location(
    State(state): State<AppState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    jar: CookieJar,
    payload: Result<Json<VerifyLocationRequest>, JsonRejection>,
) -> Result<(CookieJar, Json<GatingDecision>), AppError> {
    let Json(request) = payload?;

    request
        .validate()
        .map_err(|e| AppError::BadRequest(anyhow::anyhow!(e)))?;

    let selected_group = request.selected_group.trim();
    if selected_group.is_empty() {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "selectedGroup is required"
        )));
    }

    let captcha_token = request.captcha_token();
    if state.gating.captcha_required() && captcha_token.is_none() {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "captchaToken is required"
        )));
    }

    let client = ClientRequest {
        headers: &headers,
        peer: connect_info.map(|ConnectInfo(addr)| addr.ip()),
    };

    let outcome = state
        .gating
        .decide(selected_group, captcha_token, &client)
        .await;

    let jar = match outcome.cookies {
        Some(cookies) => cookies.into_jar(jar),
        None => jar,
    };

    Ok((jar, Json(outcome.decision)))
}
