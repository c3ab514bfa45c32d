use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Closed set of roles an identity can hold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoleType {
    Admin,
    Employee,
    Manager,
}

impl RoleType {
    pub const ALL: [RoleType; 3] = [RoleType::Admin, RoleType::Employee, RoleType::Manager];

    pub fn as_str(&self) -> &'static str {
        match self {
            RoleType::Admin => "ADMIN",
            RoleType::Employee => "EMPLOYEE",
            RoleType::Manager => "MANAGER",
        }
    }

    /// Display name used when seeding the role table.
    pub fn display_name(&self) -> &'static str {
        match self {
            RoleType::Admin => "Administrator",
            RoleType::Employee => "Employee",
            RoleType::Manager => "Manager",
        }
    }

    pub fn default_permissions(&self) -> Vec<String> {
        let perms: &[&str] = match self {
            RoleType::Admin => &["users:write", "users:read", "audits:read", "logs:read", "files:write", "templates:write"],
            RoleType::Manager => &["users:read", "files:write"],
            RoleType::Employee => &["files:write"],
        };
        perms.iter().map(|p| p.to_string()).collect()
    }
}

impl fmt::Display for RoleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown role type '{0}'")]
pub struct UnknownRoleType(pub String);

impl FromStr for RoleType {
    type Err = UnknownRoleType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ADMIN" => Ok(RoleType::Admin),
            "EMPLOYEE" => Ok(RoleType::Employee),
            "MANAGER" => Ok(RoleType::Manager),
            _ => Err(UnknownRoleType(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    pub uuid: Uuid,
    pub name: String,
    #[serde(rename = "type")]
    pub role_type: RoleType,
    pub permissions: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewRole {
    pub name: String,
    pub role_type: RoleType,
    pub permissions: Vec<String>,
}

impl NewRole {
    pub fn seed(role_type: RoleType) -> Self {
        Self {
            name: role_type.display_name().to_string(),
            role_type,
            permissions: role_type.default_permissions(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_case_insensitively() {
        assert_eq!("admin".parse::<RoleType>().unwrap(), RoleType::Admin);
        assert_eq!(" Manager ".parse::<RoleType>().unwrap(), RoleType::Manager);
        assert!("ROOT".parse::<RoleType>().is_err());
    }

    #[test]
    fn serializes_as_screaming_tag() {
        assert_eq!(serde_json::to_value(RoleType::Employee).unwrap(), "EMPLOYEE");
        let role: RoleType = serde_json::from_value(serde_json::json!("MANAGER")).unwrap();
        assert_eq!(role, RoleType::Manager);
    }
}
