use chrono::{DateTime, Utc};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct PasswordResetRequest {
    pub uuid: Uuid,
    pub user_uuid: Uuid,
    pub code_hash: String,
    pub expires_at: DateTime<Utc>,
    pub used_at: Option<DateTime<Utc>>,
    pub attempts: i32,
    pub created_at: DateTime<Utc>,
}

impl PasswordResetRequest {
    pub fn is_usable(&self, now: DateTime<Utc>) -> bool {
        self.used_at.is_none() && self.expires_at > now
    }
}

#[derive(Debug, Clone)]
pub struct NewPasswordReset {
    pub user_uuid: Uuid,
    pub code_hash: String,
    pub expires_at: DateTime<Utc>,
}
