//! User identity and roles.

use std::{fmt, str::FromStr};

use crate::error::UnknownRole;

/// Role of a user, either globally or within one channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Role {
    /// Connected without a user token
    Anonymous,
    /// Temporary guest user
    Guest,
    /// Regular authenticated user
    User,
    /// Channel member without elevated rights
    Member,
    /// Channel moderator
    Moderator,
    /// Channel or application admin
    Admin,
    /// Channel owner
    Owner,
}

impl Role {
    /// True for [`Role::Anonymous`].
    pub fn is_anonymous(self) -> bool {
        matches!(self, Self::Anonymous)
    }

    /// Whether a member with this role may edit the channel.
    pub fn can_edit(self) -> bool {
        matches!(self, Self::Admin | Self::Owner)
    }

    /// Wire name of the role.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Anonymous => "anonymous",
            Self::Guest => "guest",
            Self::User => "user",
            Self::Member => "member",
            Self::Moderator => "moderator",
            Self::Admin => "admin",
            Self::Owner => "owner",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "anonymous" => Ok(Self::Anonymous),
            "guest" => Ok(Self::Guest),
            "user" => Ok(Self::User),
            "member" => Ok(Self::Member),
            "moderator" => Ok(Self::Moderator),
            "admin" => Ok(Self::Admin),
            "owner" => Ok(Self::Owner),
            _ => Err(UnknownRole(s.to_string())),
        }
    }
}

/// The currently authenticated user as seen by the transport.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identity {
    /// Stable user ID
    pub id: String,
    /// Global role
    pub role: Role,
}

impl Identity {
    /// Create an identity.
    pub fn new(id: impl Into<String>, role: Role) -> Self {
        Self { id: id.into(), role }
    }

    /// True if this identity has the anonymous role.
    pub fn is_anonymous(&self) -> bool {
        self.role.is_anonymous()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [Role; 7] = [
        Role::Anonymous,
        Role::Guest,
        Role::User,
        Role::Member,
        Role::Moderator,
        Role::Admin,
        Role::Owner,
    ];

    #[test]
    fn only_admin_and_owner_can_edit() {
        let editors: Vec<Role> = ALL.into_iter().filter(|r| r.can_edit()).collect();
        assert_eq!(editors, vec![Role::Admin, Role::Owner]);
    }

    #[test]
    fn role_names_round_trip() {
        for role in ALL {
            assert_eq!(role.as_str().parse::<Role>(), Ok(role));
        }
        assert_eq!("ADMIN".parse::<Role>(), Ok(Role::Admin));
    }

    #[test]
    fn unknown_role_keeps_the_input() {
        let error = "SuperUser".parse::<Role>();
        assert_eq!(error, Err(UnknownRole("SuperUser".to_string())));
        assert_eq!(error.map_err(|e| e.to_string()), Err("unknown role: SuperUser".to_string()));
    }

    #[test]
    fn anonymous_identity() {
        assert!(Identity::new("anon-1", Role::Anonymous).is_anonymous());
        assert!(!Identity::new("u1", Role::Member).is_anonymous());
    }
}
