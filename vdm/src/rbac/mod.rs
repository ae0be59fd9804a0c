//! Role-based access control: role names and the role mutation manager.

pub mod errors;
pub mod manager;
pub mod models;

pub use errors::{RoleError, RoleResult};
pub use manager::{DEFAULT_MIN_TAG_LENGTH, RbacConfig, RoleManager};
pub use models::{RoleName, UnknownRole};
