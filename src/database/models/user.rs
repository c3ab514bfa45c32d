use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use super::role::RoleType;

/// Persisted user joined with its role. The hash is never serialized.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub uuid: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role_uuid: Option<Uuid>,
    pub role: Option<RoleType>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role_uuid: Uuid,
}

/// Column-level changes; `None` leaves the column untouched.
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub role_uuid: Option<Uuid>,
}

impl UserChanges {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.email.is_none()
            && self.password_hash.is_none()
            && self.role_uuid.is_none()
    }
}

/// At least 8 characters with one lowercase, one uppercase, one digit and one symbol.
pub fn validate_strong_password(password: &str) -> Result<(), ValidationError> {
    let strong = password.chars().count() >= 8
        && password.chars().any(|c| c.is_ascii_lowercase())
        && password.chars().any(|c| c.is_ascii_uppercase())
        && password.chars().any(|c| c.is_ascii_digit())
        && password.chars().any(|c| !c.is_ascii_alphanumeric());

    if strong {
        Ok(())
    } else {
        let mut err = ValidationError::new("strong_password");
        err.message = Some(
            "password must have at least 8 characters, including upper and lower case letters, a number and a symbol"
                .into(),
        );
        Err(err)
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserDto {
    #[validate(length(min = 3, message = "name must have at least 3 characters"))]
    pub name: String,
    #[validate(email(message = "email must be a valid address"))]
    pub email: String,
    #[validate(custom(function = "validate_strong_password"))]
    pub password: String,
    pub role: RoleType,
}

/// Partial counterpart of `CreateUserDto` for PUT/PATCH.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserDto {
    #[validate(length(min = 3, message = "name must have at least 3 characters"))]
    pub name: Option<String>,
    #[validate(email(message = "email must be a valid address"))]
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<RoleType>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strong_password_rules() {
        assert!(validate_strong_password("Teste@123").is_ok());
        assert!(validate_strong_password("short1!A").is_ok());
        assert!(validate_strong_password("Sh0rt!").is_err());
        assert!(validate_strong_password("alllowercase1!").is_err());
        assert!(validate_strong_password("NoDigitsHere!").is_err());
        assert!(validate_strong_password("NoSymbols123").is_err());
    }

    #[test]
    fn create_dto_validation() {
        let dto = CreateUserDto {
            name: "Jo".into(),
            email: "not-an-email".into(),
            password: "Teste@123".into(),
            role: RoleType::Employee,
        };
        let errors = dto.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("name"));
        assert!(fields.contains_key("email"));
        assert!(!fields.contains_key("password"));
    }

    #[test]
    fn password_hash_is_not_serialized() {
        let now = Utc::now();
        let user = User {
            uuid: Uuid::new_v4(),
            name: "Jane".into(),
            email: "jane@example.com".into(),
            password_hash: "$argon2id$secret".into(),
            role_uuid: None,
            role: Some(RoleType::Admin),
            deleted_at: None,
            created_at: now,
            updated_at: now,
        };
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("passwordHash").is_none());
        assert_eq!(json["role"], "ADMIN");
        assert_eq!(json["email"], "jane@example.com");
    }
}
