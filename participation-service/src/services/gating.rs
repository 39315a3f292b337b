use super::captcha::CaptchaVerifier;
use super::location::{ClientRequest, LocationResolver, ResolvedLocation};
use super::metrics;
use super::policy::GroupPolicy;
use crate::models::{AccessCookies, CookieSettings, GatingDecision, GroupCode, UNKNOWN_COUNTRY};
use std::sync::Arc;

pub const ACCESS_GRANTED: &str = "Access granted";
pub const CAPTCHA_FAILED: &str = "CAPTCHA verification failed. Please try again.";
pub const CAPTCHA_UNAVAILABLE: &str =
    "CAPTCHA verification is temporarily unavailable. Please try again.";
pub const LOCATION_UNKNOWN: &str = "Could not determine your location. Participation not allowed.";

/// A decision plus the cookies to set with it. `cookies` is only ever
/// `Some` for an allowed decision.
#[derive(Debug, Clone)]
pub struct GatingOutcome {
    pub decision: GatingDecision,
    pub cookies: Option<AccessCookies>,
}

impl GatingOutcome {
    fn denied(decision: GatingDecision) -> Self {
        Self {
            decision,
            cookies: None,
        }
    }
}

/// CAPTCHA, then location, then policy. No retries.
pub struct GatingService {
    policy: Arc<GroupPolicy>,
    resolver: Arc<dyn LocationResolver>,
    verifier: Option<Arc<dyn CaptchaVerifier>>,
    /// `None` disables cookie issuance.
    cookie_settings: Option<CookieSettings>,
}

impl GatingService {
    pub fn new(
        policy: Arc<GroupPolicy>,
        resolver: Arc<dyn LocationResolver>,
        verifier: Option<Arc<dyn CaptchaVerifier>>,
        cookie_settings: Option<CookieSettings>,
    ) -> Self {
        Self {
            policy,
            resolver,
            verifier,
            cookie_settings,
        }
    }

    pub fn captcha_required(&self) -> bool {
        self.verifier.is_some()
    }

    pub fn resolver(&self) -> &dyn LocationResolver {
        self.resolver.as_ref()
    }

    pub async fn decide(
        &self,
        selected_group: &str,
        captcha_token: Option<&str>,
        client: &ClientRequest<'_>,
    ) -> GatingOutcome {
        let group_label = GroupCode::from_code(selected_group)
            .map(|g| g.as_str())
            .unwrap_or("other");

        if let Some(denied) = self.check_captcha(selected_group, captcha_token).await {
            metrics::record_decision(group_label, "captcha_failed");
            return denied;
        }

        let location = match self.resolver.resolve(client) {
            Ok(Some(location)) => location,
            Ok(None) => {
                tracing::info!(selected_group = %selected_group, "Location indeterminate");
                metrics::record_decision(group_label, "location_unknown");
                return GatingOutcome::denied(GatingDecision::denied(
                    selected_group,
                    UNKNOWN_COUNTRY,
                    None,
                    LOCATION_UNKNOWN.to_string(),
                ));
            }
            Err(e) => {
                tracing::error!(error = %e, selected_group = %selected_group, "Location lookup failed");
                metrics::record_decision(group_label, "location_unknown");
                return GatingOutcome::denied(GatingDecision::denied(
                    selected_group,
                    UNKNOWN_COUNTRY,
                    None,
                    LOCATION_UNKNOWN.to_string(),
                ));
            }
        };

        if !self.policy.is_allowed(&location.country, selected_group) {
            tracing::info!(
                selected_group = %selected_group,
                country = %location.country,
                "Participation denied for location"
            );
            metrics::record_decision(group_label, "denied");
            let message = self.denial_message(selected_group, &location);
            return GatingOutcome::denied(GatingDecision::denied(
                selected_group,
                &location.country,
                location.city,
                message,
            ));
        }

        tracing::info!(
            selected_group = %selected_group,
            country = %location.country,
            "Participation granted"
        );
        metrics::record_decision(group_label, "granted");

        let cookies = self
            .cookie_settings
            .as_ref()
            .map(|settings| AccessCookies::new(selected_group, &location.country, settings));

        GatingOutcome {
            decision: GatingDecision {
                allowed: true,
                user_country: location.country,
                user_city: location.city,
                selected_group: selected_group.to_string(),
                message: ACCESS_GRANTED.to_string(),
            },
            cookies,
        }
    }

    /// `Some` with the denial when the CAPTCHA step did not pass.
    async fn check_captcha(
        &self,
        selected_group: &str,
        captcha_token: Option<&str>,
    ) -> Option<GatingOutcome> {
        let verifier = self.verifier.as_ref()?;

        let message = match verifier.verify(captcha_token.unwrap_or_default()).await {
            Ok(verdict) if verdict.success => {
                metrics::record_captcha("passed");
                return None;
            }
            Ok(verdict) => {
                tracing::info!(error_codes = ?verdict.error_codes, "CAPTCHA rejected");
                metrics::record_captcha("rejected");
                CAPTCHA_FAILED
            }
            Err(e) => {
                tracing::error!(error = %e, "CAPTCHA verification error");
                metrics::record_captcha("error");
                CAPTCHA_UNAVAILABLE
            }
        };

        Some(GatingOutcome::denied(GatingDecision::denied(
            selected_group,
            UNKNOWN_COUNTRY,
            None,
            message.to_string(),
        )))
    }

    fn denial_message(&self, selected_group: &str, location: &ResolvedLocation) -> String {
        let detected = match &location.city {
            Some(city) => format!("{}, {}", city, location.country),
            None => location.country.clone(),
        };

        match GroupCode::from_code(selected_group) {
            Some(group) => format!(
                "The {} group ({}) is only open to participants located in {}. Your detected location is {}.",
                group.label(),
                group,
                self.policy.allowed_countries(selected_group).join(", "),
                detected
            ),
            None => format!(
                "Unknown participation group '{}'. Your detected location is {}.",
                selected_group, detected
            ),
        }
    }
}
