use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

use super::validate_dto;
use crate::config::AdminSeedConfig;
use crate::database::models::user::validate_strong_password;
use crate::database::models::{CreateUserDto, NewUser, RoleType, UpdateUserDto, User, UserChanges};
use crate::database::repository::{RoleRepository, UserRepository};
use crate::database::RepositoryError;
use crate::error::ApiError;
use crate::pagination::{PageRequest, Paginated};
use crate::security;

const DUPLICATE_EMAIL: &str = "User already exists with this email.";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteUserResponse {
    pub success: bool,
    pub status_code: u16,
    pub message: String,
}

#[derive(Clone)]
pub struct UserService {
    users: Arc<dyn UserRepository>,
    roles: Arc<dyn RoleRepository>,
}

impl UserService {
    pub fn new(users: Arc<dyn UserRepository>, roles: Arc<dyn RoleRepository>) -> Self {
        Self { users, roles }
    }

    /// Create a user. The email pre-check only shortcuts the common case;
    /// the unique index decides races.
    pub async fn create(&self, dto: CreateUserDto) -> Result<User, ApiError> {
        validate_dto(&dto)?;
        let email = normalize_email(&dto.email);

        if self.users.find_by_email(&email).await?.is_some() {
            return Err(ApiError::conflict(DUPLICATE_EMAIL));
        }

        let role_uuid = self.role_uuid(dto.role).await?;
        let password_hash = security::hash_password(&dto.password)?;

        let user = self
            .users
            .create(NewUser {
                name: dto.name.trim().to_string(),
                email,
                password_hash,
                role_uuid,
            })
            .await
            .map_err(duplicate_email)?;

        tracing::info!("Created user {} with role {}", user.uuid, dto.role);
        Ok(user)
    }

    pub async fn find_by_uuid(&self, uuid: Uuid) -> Result<User, ApiError> {
        self.users
            .find_by_uuid(uuid)
            .await?
            .ok_or_else(|| ApiError::not_found("User not found"))
    }

    /// Applies only the fields present in `dto`.
    pub async fn update(&self, uuid: Uuid, dto: UpdateUserDto) -> Result<User, ApiError> {
        validate_dto(&dto)?;

        let mut changes = UserChanges {
            name: dto.name.map(|n| n.trim().to_string()),
            email: dto.email.as_deref().map(normalize_email),
            ..Default::default()
        };

        if let Some(password) = dto.password.as_deref() {
            validate_strong_password(password).map_err(|e| {
                ApiError::bad_request(format!(
                    "Validation failed: password: {}",
                    e.message.unwrap_or_default()
                ))
            })?;
            changes.password_hash = Some(security::hash_password(password)?);
        }

        if let Some(role) = dto.role {
            changes.role_uuid = Some(self.role_uuid(role).await?);
        }

        if changes.is_empty() {
            return self.find_by_uuid(uuid).await;
        }

        match self.users.update(uuid, changes).await {
            Ok(user) => Ok(user),
            Err(RepositoryError::NotFound) => Err(ApiError::not_found("User not found")),
            Err(e) => Err(duplicate_email(e)),
        }
    }

    /// Soft delete: the row stays with `deleted_at` set.
    pub async fn delete(&self, uuid: Uuid) -> Result<DeleteUserResponse, ApiError> {
        match self.users.soft_delete(uuid).await {
            Ok(_) => Ok(DeleteUserResponse {
                success: true,
                status_code: 200,
                message: "User deleted successfully!".to_string(),
            }),
            Err(RepositoryError::NotFound) => Err(ApiError::not_found("User not found")),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn hard_delete(&self, uuid: Uuid) -> Result<DeleteUserResponse, ApiError> {
        match self.users.hard_delete(uuid).await {
            Ok(()) => Ok(DeleteUserResponse {
                success: true,
                status_code: 200,
                message: "User permanently deleted!".to_string(),
            }),
            Err(RepositoryError::NotFound) => Err(ApiError::not_found("User not found")),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn list(&self, page: &PageRequest) -> Result<Paginated<User>, ApiError> {
        let (users, total) = self.users.list(page).await.map_err(|e| {
            tracing::error!("Failed to list users: {}", e);
            ApiError::bad_request("Failed to retrieve users list.")
        })?;
        Ok(Paginated::new(users, total, page))
    }

    /// Current representation for audit "old data"
    pub async fn snapshot(&self, uuid: Uuid) -> Result<Option<Value>, ApiError> {
        let user = self.users.find_by_uuid(uuid).await?;
        Ok(user.and_then(|u| serde_json::to_value(u).ok()))
    }

    /// Creates the configured administrator when no ADMIN user exists yet.
    pub async fn ensure_admin(&self, seed: &AdminSeedConfig) -> Result<Option<User>, ApiError> {
        let (Some(email), Some(password)) = (seed.email.as_deref(), seed.password.as_deref()) else {
            tracing::info!("ADMIN_EMAIL/ADMIN_PASSWORD not set, skipping admin seed");
            return Ok(None);
        };

        if self.users.exists_with_role(RoleType::Admin).await? {
            return Ok(None);
        }

        let admin = self
            .create(CreateUserDto {
                name: seed.name.clone(),
                email: email.to_string(),
                password: password.to_string(),
                role: RoleType::Admin,
            })
            .await?;

        tracing::info!("Seeded administrator {}", admin.email);
        Ok(Some(admin))
    }

    async fn role_uuid(&self, role: RoleType) -> Result<Uuid, ApiError> {
        self.roles
            .find_by_type(role)
            .await?
            .map(|r| r.uuid)
            .ok_or_else(|| ApiError::not_found("Role not found"))
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn duplicate_email(err: RepositoryError) -> ApiError {
    match err {
        RepositoryError::UniqueViolation { .. } => ApiError::conflict(DUPLICATE_EMAIL),
        other => other.into(),
    }
}
