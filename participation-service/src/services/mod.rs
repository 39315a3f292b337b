pub mod captcha;
pub mod gating;
pub mod location;
pub mod metrics;
pub mod policy;

pub use captcha::{CaptchaError, CaptchaVerdict, CaptchaVerifier, MockCaptchaVerifier, RecaptchaVerifier};
pub use gating::{GatingOutcome, GatingService};
pub use location::{
    ClientRequest, CountryDatabase, DatabaseResolver, LocationError, LocationResolver,
    MaxMindCountryDb, ResolvedLocation, StaticCountryDb, TrustedHeaderResolver,
};
pub use policy::GroupPolicy;
