use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use validator::Validate;

use super::{validate_dto, EmailService, UserService};
use crate::auth::TokenService;
use crate::config::AppConfig;
use crate::database::models::user::validate_strong_password;
use crate::database::models::{CreateUserDto, NewPasswordReset, User, UserChanges};
use crate::database::repository::{PasswordResetRepository, UserRepository};
use crate::error::ApiError;
use crate::security::{self, CodeHasher, DEFAULT_CODE_LENGTH};

const INVALID_CREDENTIALS: &str = "Invalid email or password.";
const INVALID_RESET_CODE: &str = "Invalid or expired reset code.";
pub const FORGOT_PASSWORD_TEMPLATE: &str = "ForgotPassword";

#[derive(Debug, Deserialize, Validate)]
pub struct LoginDto {
    #[validate(email(message = "email must be a valid address"))]
    pub email: String,
    #[validate(length(min = 1, message = "password is required"))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ForgotPasswordDto {
    #[validate(email(message = "email must be a valid address"))]
    pub email: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordDto {
    #[validate(email(message = "email must be a valid address"))]
    pub email: String,
    #[validate(length(min = 1, max = 12, message = "code is required"))]
    pub code: String,
    #[validate(custom(function = "validate_strong_password"))]
    pub new_password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub access_token: String,
    pub user: User,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

/// Login, registration and the password recovery flow
#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserRepository>,
    resets: Arc<dyn PasswordResetRepository>,
    user_service: UserService,
    email: EmailService,
    tokens: TokenService,
    codes: CodeHasher,
    frontend_url: String,
    reset_ttl: Duration,
    reset_max_attempts: i32,
}

impl AuthService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: &AppConfig,
        users: Arc<dyn UserRepository>,
        resets: Arc<dyn PasswordResetRepository>,
        user_service: UserService,
        email: EmailService,
        tokens: TokenService,
    ) -> Self {
        Self {
            users,
            resets,
            user_service,
            email,
            tokens,
            codes: CodeHasher::new(&config.security.code_secret),
            frontend_url: config.server.frontend_url.clone(),
            reset_ttl: Duration::minutes(config.security.reset_code_ttl_minutes),
            reset_max_attempts: config.security.reset_max_attempts,
        }
    }

    /// Every credential mismatch collapses into the same 401.
    pub async fn login(&self, mut dto: LoginDto) -> Result<LoginResponse, ApiError> {
        dto.email = dto.email.trim().to_lowercase();
        if dto.validate().is_err() {
            return Err(ApiError::unauthorized(INVALID_CREDENTIALS));
        }

        let user = self
            .users
            .find_by_email(&dto.email)
            .await?
            .ok_or_else(|| ApiError::unauthorized(INVALID_CREDENTIALS))?;

        let matches = security::verify_password(&dto.password, &user.password_hash).unwrap_or_else(|e| {
            tracing::error!("Stored password hash for {} is unusable: {}", user.uuid, e);
            false
        });
        if !matches {
            return Err(ApiError::unauthorized(INVALID_CREDENTIALS));
        }

        let access_token = self.tokens.generate(&user)?;
        tracing::info!("User {} logged in", user.uuid);
        Ok(LoginResponse { access_token, user })
    }

    pub async fn register(&self, dto: CreateUserDto) -> Result<LoginResponse, ApiError> {
        let user = self.user_service.create(dto).await?;
        let access_token = self.tokens.generate(&user)?;
        Ok(LoginResponse { access_token, user })
    }

    /// Issues a reset code. The answer is identical whether or not the
    /// email belongs to a user.
    pub async fn forgot_password(&self, dto: ForgotPasswordDto) -> Result<MessageResponse, ApiError> {
        validate_dto(&dto)?;
        let response = MessageResponse::new("Password recovery email sent successfully.");

        let Some(user) = self.users.find_by_email(&dto.email.trim().to_lowercase()).await? else {
            tracing::info!("Password recovery requested for unknown email");
            return Ok(response);
        };

        let code = security::generate_numeric_code(DEFAULT_CODE_LENGTH);
        let code_hash = self.codes.hash_code(&code)?;
        self.resets
            .create(NewPasswordReset {
                user_uuid: user.uuid,
                code_hash,
                expires_at: Utc::now() + self.reset_ttl,
            })
            .await?;

        let vars = HashMap::from([
            ("name".to_string(), user.name.clone()),
            ("code".to_string(), code.clone()),
            (
                "resetLink".to_string(),
                format!("{}/reset-password?code={}", self.frontend_url, code),
            ),
        ]);

        if let Err(e) = self.email.send_template(&user.email, FORGOT_PASSWORD_TEMPLATE, &vars).await {
            tracing::error!("Password recovery email for {} not delivered: {}", user.uuid, e);
        }
        Ok(response)
    }

    pub async fn reset_password(&self, dto: ResetPasswordDto) -> Result<MessageResponse, ApiError> {
        validate_dto(&dto)?;

        let user = self
            .users
            .find_by_email(&dto.email.trim().to_lowercase())
            .await?
            .ok_or_else(|| ApiError::not_found(INVALID_RESET_CODE))?;

        let request = self
            .resets
            .find_active(user.uuid, Utc::now())
            .await?
            .ok_or_else(|| ApiError::not_found(INVALID_RESET_CODE))?;

        if !self.codes.verify_code(dto.code.trim(), &request.code_hash) {
            let updated = self
                .resets
                .record_failed_attempt(request.uuid, self.reset_max_attempts)
                .await?;
            if updated.used_at.is_some() {
                tracing::warn!("Reset request {} locked after {} attempts", updated.uuid, updated.attempts);
            }
            return Err(ApiError::not_found(INVALID_RESET_CODE));
        }

        let password_hash = security::hash_password(&dto.new_password)?;
        self.users
            .update(
                user.uuid,
                UserChanges {
                    password_hash: Some(password_hash),
                    ..Default::default()
                },
            )
            .await?;
        self.resets.mark_used(request.uuid).await?;

        tracing::info!("Password reset for user {}", user.uuid);
        Ok(MessageResponse::new("Password reset successfully."))
    }
}
