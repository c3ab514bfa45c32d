// handlers/auth.rs - /auth resource group

use axum::{
    extract::{Extension, State},
    response::Json,
};

use crate::database::models::{CreateUserDto, User};
use crate::middleware::{ApiResponse, ApiResult, Identity};
use crate::routing::{Access, AuditTarget, Endpoint, ResourceGroup, ADMIN};
use crate::services::auth_service::{
    ForgotPasswordDto, LoginDto, LoginResponse, MessageResponse, ResetPasswordDto,
};
use crate::state::AppState;

pub fn routes() -> ResourceGroup {
    ResourceGroup::new("auth")
        .audited(AuditTarget::new("auth").redacting(&["accessToken"]))
        .endpoint(Endpoint::post("/login", Access::Public, login))
        .endpoint(Endpoint::post("/register", Access::Roles(ADMIN), register))
        .endpoint(Endpoint::post("/forgot-password", Access::Public, forgot_password))
        .endpoint(Endpoint::post("/reset-password", Access::Public, reset_password))
        .endpoint(Endpoint::get("/verify-token", Access::AUTHENTICATED, verify_token))
}

/// POST /auth/login - exchange email and password for an access token
pub async fn login(State(state): State<AppState>, Json(dto): Json<LoginDto>) -> ApiResult<LoginResponse> {
    let session = state.auth.login(dto).await?;
    Ok(ApiResponse::created(session))
}

/// POST /auth/register - create a user and hand back its token
pub async fn register(
    State(state): State<AppState>,
    Json(dto): Json<CreateUserDto>,
) -> ApiResult<LoginResponse> {
    let session = state.auth.register(dto).await?;
    Ok(ApiResponse::created(session))
}

/// POST /auth/forgot-password
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(dto): Json<ForgotPasswordDto>,
) -> ApiResult<MessageResponse> {
    Ok(ApiResponse::created(state.auth.forgot_password(dto).await?))
}

/// POST /auth/reset-password
pub async fn reset_password(
    State(state): State<AppState>,
    Json(dto): Json<ResetPasswordDto>,
) -> ApiResult<MessageResponse> {
    Ok(ApiResponse::created(state.auth.reset_password(dto).await?))
}

/// GET /auth/verify-token - the user behind the presented token
pub async fn verify_token(Extension(identity): Extension<Identity>) -> ApiResult<User> {
    Ok(ApiResponse::success(identity.user))
}
