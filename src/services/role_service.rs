use std::sync::Arc;

use crate::database::models::{NewRole, Role, RoleType};
use crate::database::repository::RoleRepository;
use crate::database::RepositoryError;
use crate::error::ApiError;

#[derive(Clone)]
pub struct RoleService {
    roles: Arc<dyn RoleRepository>,
}

impl RoleService {
    pub fn new(roles: Arc<dyn RoleRepository>) -> Self {
        Self { roles }
    }

    /// Ensures one role row per `RoleType`. Returns the roles created by this call.
    pub async fn ensure_roles(&self) -> Result<Vec<Role>, ApiError> {
        let mut created = Vec::new();
        for role_type in RoleType::ALL {
            if self.roles.find_by_type(role_type).await?.is_some() {
                continue;
            }
            match self.roles.create(NewRole::seed(role_type)).await {
                Ok(role) => {
                    tracing::info!("Role created: {}", role.role_type);
                    created.push(role);
                }
                // Another instance seeded it first
                Err(RepositoryError::UniqueViolation { .. }) => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(created)
    }
}
