//! Role data models.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Closed set of permission classes a user can hold.
///
/// The wire and database form is the uppercase name (`ADMIN`, `MODERATOR`,
/// `REDACTOR`). [`RoleName::Admin`] is the administrator role: membership in
/// it cannot change through the role mutation operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RoleName {
    Admin,
    Moderator,
    Redactor,
}

impl RoleName {
    /// Every role, in display order
    pub const ALL: [RoleName; 3] = [RoleName::Admin, RoleName::Moderator, RoleName::Redactor];

    /// Database / wire representation
    pub fn as_str(self) -> &'static str {
        match self {
            RoleName::Admin => "ADMIN",
            RoleName::Moderator => "MODERATOR",
            RoleName::Redactor => "REDACTOR",
        }
    }

    /// Whether this is the protected administrator role
    pub fn is_admin(self) -> bool {
        self == RoleName::Admin
    }
}

impl fmt::Display for RoleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string is not one of the known role names
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown role name: {0}")]
pub struct UnknownRole(pub String);

impl FromStr for RoleName {
    type Err = UnknownRole;

    /// Strict parse: the name must match exactly, case included.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RoleName::ALL
            .into_iter()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| UnknownRole(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parse_known_roles() {
        assert_eq!("ADMIN".parse::<RoleName>(), Ok(RoleName::Admin));
        assert_eq!("MODERATOR".parse::<RoleName>(), Ok(RoleName::Moderator));
        assert_eq!("REDACTOR".parse::<RoleName>(), Ok(RoleName::Redactor));
    }

    #[test]
    fn test_parse_is_case_sensitive() {
        assert!("admin".parse::<RoleName>().is_err());
        assert!("Moderator".parse::<RoleName>().is_err());
        assert!("".parse::<RoleName>().is_err());
    }

    #[test]
    fn test_serde_uses_uppercase_names() {
        let json = serde_json::to_string(&vec![RoleName::Moderator, RoleName::Admin]).unwrap();
        assert_eq!(json, r#"["MODERATOR","ADMIN"]"#);

        let parsed: RoleName = serde_json::from_str(r#""REDACTOR""#).unwrap();
        assert_eq!(parsed, RoleName::Redactor);
    }

    #[test]
    fn test_only_admin_is_admin() {
        assert!(RoleName::Admin.is_admin());
        assert!(!RoleName::Moderator.is_admin());
        assert!(!RoleName::Redactor.is_admin());
    }

    proptest! {
        #[test]
        fn prop_display_round_trips(index in 0usize..3) {
            let role = RoleName::ALL[index];
            prop_assert_eq!(role.to_string().parse::<RoleName>(), Ok(role));
        }

        #[test]
        fn prop_lowercase_input_never_parses(s in "[a-z_]{0,12}") {
            prop_assert!(s.parse::<RoleName>().is_err());
        }
    }
}
