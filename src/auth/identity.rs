//! Roles and resolved identities.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The three marketplace roles. Each owns one protected path tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Athlete,
    Brand,
    Director,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Athlete, Role::Brand, Role::Director];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Athlete => "athlete",
            Role::Brand => "brand",
            Role::Director => "director",
        }
    }

    /// Root of the role's protected tree, e.g. `/brand`.
    pub fn tree_prefix(&self) -> &'static str {
        match self {
            Role::Athlete => "/athlete",
            Role::Brand => "/brand",
            Role::Director => "/director",
        }
    }

    /// Dashboard the role lands on.
    pub fn home_path(&self) -> &'static str {
        match self {
            Role::Athlete => "/athlete/dashboard",
            Role::Brand => "/brand/dashboard",
            Role::Director => "/director/dashboard",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A role name outside the known set.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown role '{0}'")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "athlete" => Ok(Role::Athlete),
            "brand" => Ok(Role::Brand),
            "director" => Ok(Role::Director),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

/// A verified user. Lives for one request only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: String,
    pub role: Role,
}
