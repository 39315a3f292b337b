use crate::models::{GroupCode, USER_COUNTRY_COOKIE};
use axum::{extract::Path, Json};
use axum_extra::extract::cookie::CookieJar;
use serde::Serialize;
use service_core::error::AppError;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupLanding {
    pub group: GroupCode,
    pub label: &'static str,
    pub description: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_country: Option<String>,
    pub message: String,
}

/// Landing data for a group page. Access has already been checked by the
/// route guard by the time this runs.
pub async fn group_landing(
    Path(code): Path<String>,
    jar: CookieJar,
) -> Result<Json<GroupLanding>, AppError> {
    let group = GroupCode::from_path_segment(&code)
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Unknown group '{}'", code)))?;

    Ok(Json(GroupLanding {
        group,
        label: group.label(),
        description: group.description(),
        user_country: jar.get(USER_COUNTRY_COOKIE).map(|c| c.value().to_string()),
        message: format!("Welcome to the {} participant group", group.label()),
    }))
}
