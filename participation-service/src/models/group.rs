use serde::Serialize;
use std::fmt;

/// Participation groups offered by the study.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum GroupCode {
    #[serde(rename = "US")]
    Us,
    #[serde(rename = "IN")]
    In,
    #[serde(rename = "ID")]
    Id,
    #[serde(rename = "NL")]
    Nl,
}

impl GroupCode {
    pub const ALL: [GroupCode; 4] = [GroupCode::Us, GroupCode::In, GroupCode::Id, GroupCode::Nl];

    pub fn as_str(&self) -> &'static str {
        match self {
            GroupCode::Us => "US",
            GroupCode::In => "IN",
            GroupCode::Id => "ID",
            GroupCode::Nl => "NL",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            GroupCode::Us => "American",
            GroupCode::In => "Indian",
            GroupCode::Id => "Indonesia",
            GroupCode::Nl => "Dutch",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            GroupCode::Us => "Participants from the United States",
            GroupCode::In => "Participants from India",
            GroupCode::Id => "Participants from Indonesia",
            GroupCode::Nl => "Participants from the Netherlands",
        }
    }

    /// Exact match on the canonical upper-case code, as submitted by the
    /// group picker. `"us"` is not a group.
    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|group| group.as_str() == code)
    }

    /// Case-insensitive match, used for `/group/<code>` URL segments.
    pub fn from_path_segment(segment: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|group| group.as_str().eq_ignore_ascii_case(segment))
    }
}

impl fmt::Display for GroupCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_code_is_exact() {
        assert_eq!(GroupCode::from_code("NL"), Some(GroupCode::Nl));
        assert_eq!(GroupCode::from_code("nl"), None);
        assert_eq!(GroupCode::from_code("DE"), None);
        assert_eq!(GroupCode::from_code(""), None);
    }

    #[test]
    fn path_segment_ignores_case() {
        assert_eq!(GroupCode::from_path_segment("us"), Some(GroupCode::Us));
        assert_eq!(GroupCode::from_path_segment("Id"), Some(GroupCode::Id));
        assert_eq!(GroupCode::from_path_segment("usa"), None);
    }

    #[test]
    fn serializes_as_code() {
        assert_eq!(serde_json::to_string(&GroupCode::In).unwrap(), "\"IN\"");
    }
}
