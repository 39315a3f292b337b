pub mod route_guard;

pub use route_guard::{evaluate_access, route_guard_middleware, GuardDecision, RedirectReason};
