use serde::{Deserialize, Serialize};
use validator::Validate;

/// Country sentinel reported when no location could be resolved.
pub const UNKNOWN_COUNTRY: &str = "unknown";

/// Body of `POST /verify-location`.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct VerifyLocationRequest {
    #[serde(default)]
    #[validate(length(max = 16, message = "Selected group is too long"))]
    pub selected_group: String,

    #[serde(default)]
    #[validate(length(max = 4096, message = "CAPTCHA token is too long"))]
    pub captcha_token: Option<String>,
}

impl VerifyLocationRequest {
    /// The token, if present and not blank.
    pub fn captcha_token(&self) -> Option<&str> {
        self.captcha_token
            .as_deref()
            .map(str::trim)
            .filter(|token| !token.is_empty())
    }
}

/// Outcome of one pass through the gating pipeline. Built fresh per request
/// and returned to the client as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatingDecision {
    pub allowed: bool,
    pub user_country: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_city: Option<String>,
    pub selected_group: String,
    pub message: String,
}

impl GatingDecision {
    pub fn denied(selected_group: &str, user_country: &str, user_city: Option<String>, message: String) -> Self {
        Self {
            allowed: false,
            user_country: user_country.to_string(),
            user_city,
            selected_group: selected_group.to_string(),
            message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_uses_camel_case_fields() {
        let request: VerifyLocationRequest =
            serde_json::from_str(r#"{"selectedGroup":"US","captchaToken":"tok"}"#).unwrap();
        assert_eq!(request.selected_group, "US");
        assert_eq!(request.captcha_token(), Some("tok"));
    }

    #[test]
    fn blank_token_is_treated_as_missing() {
        let request: VerifyLocationRequest =
            serde_json::from_str(r#"{"selectedGroup":"US","captchaToken":"   "}"#).unwrap();
        assert_eq!(request.captcha_token(), None);
    }

    #[test]
    fn missing_fields_default_to_empty() {
        let request: VerifyLocationRequest = serde_json::from_str("{}").unwrap();
        assert!(request.selected_group.is_empty());
        assert!(request.captcha_token.is_none());
    }

    #[test]
    fn city_is_omitted_when_unknown() {
        let decision = GatingDecision::denied("NL", "US", None, "no".to_string());
        let json = serde_json::to_value(&decision).unwrap();
        assert_eq!(json["userCountry"], "US");
        assert_eq!(json["selectedGroup"], "NL");
        assert!(json.get("userCity").is_none());
    }
}
