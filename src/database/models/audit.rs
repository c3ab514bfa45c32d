use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

/// Immutable record of one mutating request
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditRecord {
    pub uuid: Uuid,
    pub entity: String,
    pub method: String,
    pub user_uuid: Option<Uuid>,
    pub old_data: Option<Value>,
    pub new_data: Option<Value>,
    pub url: String,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewAuditRecord {
    pub entity: String,
    pub method: String,
    pub user_uuid: Option<Uuid>,
    pub old_data: Option<Value>,
    pub new_data: Option<Value>,
    pub url: String,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
}
