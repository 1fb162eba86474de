//! User roles.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

/// The role a user account holds.
///
/// A user has exactly one role. Staff-level access to a particular cafe is
/// granted separately through staff assignments, not through this enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "user_role", rename_all = "SCREAMING_SNAKE_CASE")
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    #[default]
    User,
    Owner,
    Staff,
    Admin,
    Driver,
}

/// Returned when a role string matches none of the known roles.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown role: {0}")]
pub struct RoleParseError(pub String);

impl Role {
    /// Uppercase wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "USER",
            Self::Owner => "OWNER",
            Self::Staff => "STAFF",
            Self::Admin => "ADMIN",
            Self::Driver => "DRIVER",
        }
    }

    /// Whether this role may create cafes.
    #[must_use]
    pub const fn can_create_cafes(self) -> bool {
        matches!(self, Self::Owner | Self::Admin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = RoleParseError;

    /// Case-insensitive lookup in the fixed role table.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        const TABLE: [(&str, Role); 5] = [
            ("user", Role::User),
            ("owner", Role::Owner),
            ("staff", Role::Staff),
            ("admin", Role::Admin),
            ("driver", Role::Driver),
        ];

        let needle = s.trim();
        TABLE
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(needle))
            .map(|(_, role)| *role)
            .ok_or_else(|| RoleParseError(s.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_case_insensitively() {
        assert_eq!("driver".parse(), Ok(Role::Driver));
        assert_eq!("OWNER".parse(), Ok(Role::Owner));
        assert_eq!(" Staff ".parse(), Ok(Role::Staff));
    }

    #[test]
    fn rejects_unknown_roles() {
        assert_eq!(
            "superuser".parse::<Role>(),
            Err(RoleParseError("superuser".to_owned()))
        );
    }

    #[test]
    fn display_round_trips() {
        for role in [Role::User, Role::Owner, Role::Staff, Role::Admin, Role::Driver] {
            assert_eq!(role.to_string().parse(), Ok(role));
        }
    }

    #[test]
    fn only_owners_and_admins_create_cafes() {
        assert!(Role::Owner.can_create_cafes());
        assert!(Role::Admin.can_create_cafes());
        assert!(!Role::Staff.can_create_cafes());
        assert!(!Role::User.can_create_cafes());
    }
}
