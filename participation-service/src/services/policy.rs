use crate::models::{GroupCode, UNKNOWN_COUNTRY};
use std::collections::HashMap;

/// Which countries may select which participation group.
///
/// The locator and the CAPTCHA verifier know nothing about countries; this
/// table is the only place the mapping lives.
#[derive(Debug, Clone)]
pub struct GroupPolicy {
    allowed: HashMap<GroupCode, Vec<String>>,
}

impl Default for GroupPolicy {
    /// Each group admits only its own country.
    fn default() -> Self {
        let allowed = GroupCode::ALL
            .into_iter()
            .map(|group| (group, vec![group.as_str().to_string()]))
            .collect();
        Self { allowed }
    }
}

impl GroupPolicy {
    /// `group` is matched exactly against the canonical codes; anything else
    /// has an empty allowed set.
    pub fn is_allowed(&self, country: &str, group: &str) -> bool {
        if country == UNKNOWN_COUNTRY {
            return false;
        }
        self.allowed_countries(group)
            .iter()
            .any(|allowed| allowed == country)
    }

    pub fn allowed_countries(&self, group: &str) -> &[String] {
        GroupCode::from_code(group)
            .and_then(|code| self.allowed.get(&code))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}
