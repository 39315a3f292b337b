use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

pub const GROUP_VERIFIED_COOKIE: &str = "group-verified";
pub const ALLOWED_GROUP_COOKIE: &str = "allowed-group";
pub const USER_COUNTRY_COOKIE: &str = "user-country";

/// Attributes shared by the three access cookies.
#[derive(Debug, Clone)]
pub struct CookieSettings {
    /// `Secure` attribute; on in production.
    pub secure: bool,
    pub max_age_hours: i64,
}

impl Default for CookieSettings {
    fn default() -> Self {
        Self {
            secure: false,
            max_age_hours: 24,
        }
    }
}

/// The cookies recording a granted decision. Constructed as a unit so a
/// response carries all three or none.
#[derive(Debug, Clone)]
pub struct AccessCookies {
    verified: Cookie<'static>,
    group: Cookie<'static>,
    country: Cookie<'static>,
}

impl AccessCookies {
    pub fn new(group: &str, country: &str, settings: &CookieSettings) -> Self {
        Self {
            verified: build_cookie(GROUP_VERIFIED_COOKIE, "true".to_string(), settings),
            group: build_cookie(ALLOWED_GROUP_COOKIE, group.to_string(), settings),
            country: build_cookie(USER_COUNTRY_COOKIE, country.to_string(), settings),
        }
    }

    pub fn cookies(&self) -> [&Cookie<'static>; 3] {
        [&self.verified, &self.group, &self.country]
    }

    /// Add all three cookies to the response jar.
    pub fn into_jar(self, jar: CookieJar) -> CookieJar {
        jar.add(self.verified).add(self.group).add(self.country)
    }
}

fn build_cookie(name: &'static str, value: String, settings: &CookieSettings) -> Cookie<'static> {
    Cookie::build((name, value))
        .path("/")
        .http_only(true)
        .secure(settings.secure)
        .same_site(SameSite::Strict)
        .max_age(time::Duration::hours(settings.max_age_hours))
        .build()
}
