use crate::models::GroupCode;
use crate::AppState;
use axum::{extract::State, Json};
use serde::Serialize;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupOption {
    pub code: GroupCode,
    pub label: &'static str,
    pub description: &'static str,
    pub allowed_countries: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipationInfo {
    pub groups: Vec<GroupOption>,
    pub captcha_required: bool,
    pub captcha_site_key: String,
}

/// Data for the group picker; the page every denied visitor lands on.
pub async fn participation(State(state): State<AppState>) -> Json<ParticipationInfo> {
    let groups = GroupCode::ALL
        .into_iter()
        .map(|group| GroupOption {
            code: group,
            label: group.label(),
            description: group.description(),
            allowed_countries: state.policy.allowed_countries(group.as_str()).to_vec(),
        })
        .collect();

    Json(ParticipationInfo {
        groups,
        captcha_required: state.gating.captcha_required(),
        captcha_site_key: state.config.captcha.site_key.clone(),
    })
}
