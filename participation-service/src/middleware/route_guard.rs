use crate::models::{GroupCode, ALLOWED_GROUP_COOKIE, GROUP_VERIFIED_COOKIE};
use crate::services::metrics;
use axum::{
    extract::Request,
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;

pub const PARTICIPATION_PATH: &str = "/participation";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    /// Not a group page.
    Unguarded,
    Allow(GroupCode),
    Redirect(RedirectReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectReason {
    NotVerified,
    MissingGroup,
    GroupMismatch,
}

impl RedirectReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RedirectReason::NotVerified => "not_verified",
            RedirectReason::MissingGroup => "missing_group",
            RedirectReason::GroupMismatch => "group_mismatch",
        }
    }
}

/// The group a path guards: exactly `/group/<code>`, any case.
///
/// The segment is percent-decoded first, the same way the `Path` extractor
/// decodes it for the group handler.
pub fn guarded_group(path: &str) -> Option<GroupCode> {
    let segment = path.strip_prefix("/group/")?;
    let segment = urlencoding::decode(segment).ok()?;
    GroupCode::from_path_segment(&segment)
}

pub fn evaluate_access(
    path: &str,
    group_verified: Option<&str>,
    allowed_group: Option<&str>,
) -> GuardDecision {
    let Some(group) = guarded_group(path) else {
        return GuardDecision::Unguarded;
    };

    if group_verified != Some("true") {
        return GuardDecision::Redirect(RedirectReason::NotVerified);
    }

    let Some(allowed_group) = allowed_group else {
        return GuardDecision::Redirect(RedirectReason::MissingGroup);
    };

    if allowed_group.to_uppercase() != group.as_str() {
        return GuardDecision::Redirect(RedirectReason::GroupMismatch);
    }

    GuardDecision::Allow(group)
}

/// Re-validates group pages against the access cookies.
pub async fn route_guard_middleware(jar: CookieJar, request: Request, next: Next) -> Response {
    let path = request.uri().path().to_owned();
    let decision = evaluate_access(
        &path,
        jar.get(GROUP_VERIFIED_COOKIE).map(|c| c.value()),
        jar.get(ALLOWED_GROUP_COOKIE).map(|c| c.value()),
    );

    match decision {
        GuardDecision::Unguarded => next.run(request).await,
        GuardDecision::Allow(group) => {
            tracing::debug!(path = %path, group = %group, "Group access granted");
            next.run(request).await
        }
        GuardDecision::Redirect(reason) => {
            tracing::info!(path = %path, reason = reason.as_str(), "Group access denied, redirecting");
            metrics::record_guard_redirect(reason.as_str());
            (StatusCode::FOUND, [(header::LOCATION, PARTICIPATION_PATH)]).into_response()
        }
    }
}
