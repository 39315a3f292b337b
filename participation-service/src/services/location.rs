//! Client geolocation.
//!
//! Two backends sit behind [`LocationResolver`]: one trusts a country header
//! set by the hosting edge, the other looks the client IP up in a local
//! MaxMind GeoLite2-Country database. `Ok(None)` always means "could not
//! tell", which callers must treat as a denial.

use crate::config::{LocationBackend, LocationConfig};
use axum::http::HeaderMap;
use maxminddb::{geoip2, MaxMindDBError, Reader};
use std::collections::HashMap;
use std::net::IpAddr;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LocationError {
    #[error("Database error: {0}")]
    Database(String),
}

/// What the resolver gets to see of an incoming request.
#[derive(Debug, Clone, Copy)]
pub struct ClientRequest<'a> {
    pub headers: &'a HeaderMap,
    pub peer: Option<IpAddr>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedLocation {
    /// ISO 3166-1 alpha-2, upper-case.
    pub country: String,
    pub city: Option<String>,
}

pub trait LocationResolver: Send + Sync {
    fn resolve(&self, client: &ClientRequest<'_>) -> Result<Option<ResolvedLocation>, LocationError>;

    fn backend(&self) -> LocationBackend;
}

/// Build the resolver selected by configuration.
pub fn resolver_from_config(config: &LocationConfig) -> Arc<dyn LocationResolver> {
    match config.backend {
        LocationBackend::Header => Arc::new(TrustedHeaderResolver::new(
            &config.country_header,
            &config.city_header,
        )),
        LocationBackend::Database => Arc::new(DatabaseResolver::open(config)),
    }
}

pub struct TrustedHeaderResolver {
    country_header: String,
    city_header: String,
}

impl TrustedHeaderResolver {
    pub fn new(country_header: &str, city_header: &str) -> Self {
        Self {
            country_header: country_header.to_lowercase(),
            city_header: city_header.to_lowercase(),
        }
    }
}

impl LocationResolver for TrustedHeaderResolver {
    fn resolve(&self, client: &ClientRequest<'_>) -> Result<Option<ResolvedLocation>, LocationError> {
        let Some(country) = header_value(client.headers, &self.country_header) else {
            tracing::debug!(header = %self.country_header, "Trusted country header missing");
            return Ok(None);
        };

        Ok(Some(ResolvedLocation {
            country: country.to_uppercase(),
            city: header_value(client.headers, &self.city_header),
        }))
    }

    fn backend(&self) -> LocationBackend {
        LocationBackend::Header
    }
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Candidate client IP: first `X-Forwarded-For` entry, then `X-Real-IP`,
/// then the socket peer. IPv4-mapped IPv6 addresses come back as IPv4.
pub fn client_ip(client: &ClientRequest<'_>) -> Option<IpAddr> {
    client
        .headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.split(',').next())
        .and_then(|s| s.trim().parse::<IpAddr>().ok())
        .or_else(|| {
            client
                .headers
                .get("x-real-ip")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.trim().parse::<IpAddr>().ok())
        })
        .or(client.peer)
        .map(normalize_ip)
}

pub fn normalize_ip(ip: IpAddr) -> IpAddr {
    match ip {
        IpAddr::V6(v6) => v6.to_ipv4_mapped().map(IpAddr::V4).unwrap_or(ip),
        v4 => v4,
    }
}

/// Loopback and RFC 1918 ranges; these never appear in a GeoIP database.
pub fn is_private_or_loopback(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => v4.is_private() || v4.is_loopback(),
        IpAddr::V6(v6) => v6.is_loopback(),
    }
}

/// Country lookup by IP address.
pub trait CountryDatabase: Send + Sync {
    /// `Ok(None)` when the address is not in the database.
    fn country(&self, ip: IpAddr) -> Result<Option<String>, LocationError>;
}

/// GeoLite2-Country `.mmdb`, loaded into memory once.
pub struct MaxMindCountryDb {
    reader: Reader<Vec<u8>>,
}

impl MaxMindCountryDb {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, LocationError> {
        let reader = Reader::open_readfile(path.as_ref()).map_err(|e| {
            LocationError::Database(format!(
                "Failed to open {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        Ok(Self { reader })
    }
}

impl CountryDatabase for MaxMindCountryDb {
    fn country(&self, ip: IpAddr) -> Result<Option<String>, LocationError> {
        match self.reader.lookup::<geoip2::Country>(ip) {
            Ok(record) => Ok(record
                .country
                .and_then(|c| c.iso_code)
                .map(str::to_uppercase)),
            Err(MaxMindDBError::AddressNotFoundError(_)) => Ok(None),
            Err(e) => Err(LocationError::Database(e.to_string())),
        }
    }
}

/// Fixed IP-to-country table for tests and local runs.
#[derive(Debug, Default, Clone)]
pub struct StaticCountryDb {
    entries: HashMap<IpAddr, String>,
}

impl StaticCountryDb {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(mut self, ip: IpAddr, country: &str) -> Self {
        self.entries.insert(ip, country.to_string());
        self
    }
}

impl CountryDatabase for StaticCountryDb {
    fn country(&self, ip: IpAddr) -> Result<Option<String>, LocationError> {
        Ok(self.entries.get(&ip).cloned())
    }
}

pub struct DatabaseResolver {
    database: Option<Arc<dyn CountryDatabase>>,
    allow_test_ip_fallback: bool,
    test_ip: IpAddr,
}

impl DatabaseResolver {
    pub fn new(
        database: Arc<dyn CountryDatabase>,
        allow_test_ip_fallback: bool,
        test_ip: IpAddr,
    ) -> Self {
        Self {
            database: Some(database),
            allow_test_ip_fallback,
            test_ip,
        }
    }

    /// Open the configured `.mmdb`. A missing or unreadable file leaves the
    /// resolver running with every lookup indeterminate.
    pub fn open(config: &LocationConfig) -> Self {
        let database = match MaxMindCountryDb::open(&config.database_path) {
            Ok(db) => {
                tracing::info!(path = %config.database_path, "GeoIP database loaded");
                Some(Arc::new(db) as Arc<dyn CountryDatabase>)
            }
            Err(e) => {
                tracing::warn!(
                    path = %config.database_path,
                    error = %e,
                    "GeoIP database unavailable, all locations will be indeterminate"
                );
                None
            }
        };

        Self {
            database,
            allow_test_ip_fallback: config.allow_test_ip_fallback,
            test_ip: config.test_ip,
        }
    }

    /// The address actually looked up, after the private-range check.
    fn lookup_ip(&self, client: &ClientRequest<'_>) -> Option<IpAddr> {
        let ip = client_ip(client)?;
        if !is_private_or_loopback(ip) {
            return Some(ip);
        }

        if self.allow_test_ip_fallback {
            tracing::debug!(client_ip = %ip, test_ip = %self.test_ip, "Substituting test IP for private address");
            Some(self.test_ip)
        } else {
            tracing::debug!(client_ip = %ip, "Private address cannot be geolocated");
            None
        }
    }
}

impl LocationResolver for DatabaseResolver {
    fn resolve(&self, client: &ClientRequest<'_>) -> Result<Option<ResolvedLocation>, LocationError> {
        let Some(database) = &self.database else {
            return Ok(None);
        };
        let Some(ip) = self.lookup_ip(client) else {
            return Ok(None);
        };

        Ok(database.country(ip)?.map(|country| ResolvedLocation {
            country,
            city: None,
        }))
    }

    fn backend(&self) -> LocationBackend {
        LocationBackend::Database
    }
}
