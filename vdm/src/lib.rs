//! # VDM
//!
//! Authentication and authorization core: credential verification, access and
//! refresh token lifecycle, single-use password-reset tokens and role-based
//! access control over a PostgreSQL store.
//!
//! ## Core Modules
//!
//! - [`auth`]: Sign-in, refresh rotation, sign-out and password reset
//! - [`rbac`]: Role names and role grant/revoke
//! - [`db`]: Connection pool, migrations and the [`db::AuthRepository`] abstraction
//! - [`mail`]: Outbound reset-link delivery
//! - [`error`]: Caller-facing error taxonomy shared by every module
//!
//! ## Example
//!
//! ```
//! use vdm::rbac::RoleName;
//!
//! let role: RoleName = "MODERATOR".parse().unwrap();
//! assert!(!role.is_admin());
//! ```

pub mod auth;
pub mod db;
pub mod error;
pub mod mail;
pub mod rbac;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use error::ErrorKind;
