pub mod group;
pub mod health;
pub mod participation;
pub mod verify_location;

pub use group::group_landing;
pub use health::{health_check, metrics};
pub use participation::participation;
pub use verify_location::verify_location;
