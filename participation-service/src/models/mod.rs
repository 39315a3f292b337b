pub mod access;
pub mod decision;
pub mod group;

pub use access::{
    AccessCookies, CookieSettings, ALLOWED_GROUP_COOKIE, GROUP_VERIFIED_COOKIE,
    USER_COUNTRY_COOKIE,
};
pub use decision::{GatingDecision, VerifyLocationRequest, UNKNOWN_COUNTRY};
pub use group::GroupCode;
