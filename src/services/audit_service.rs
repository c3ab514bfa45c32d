use std::sync::Arc;

use crate::database::models::{AuditRecord, NewAuditRecord};
use crate::database::repository::AuditRepository;
use crate::error::ApiError;
use crate::pagination::{PageRequest, Paginated};

#[derive(Clone)]
pub struct AuditService {
    audits: Arc<dyn AuditRepository>,
}

impl AuditService {
    pub fn new(audits: Arc<dyn AuditRepository>) -> Self {
        Self { audits }
    }

    /// Best-effort write. Failures are logged and swallowed so the request
    /// that triggered the audit is never affected.
    pub async fn record(&self, record: NewAuditRecord) {
        let entity = record.entity.clone();
        let method = record.method.clone();
        match self.audits.create(record).await {
            Ok(saved) => tracing::debug!("Audit {} recorded for {} {}", saved.uuid, method, entity),
            Err(e) => tracing::error!("Failed to persist audit record for {} {}: {}", method, entity, e),
        }
    }

    pub async fn list(&self, page: &PageRequest) -> Result<Paginated<AuditRecord>, ApiError> {
        let (records, total) = self.audits.list(page).await.map_err(|e| {
            tracing::error!("Failed to list audits: {}", e);
            ApiError::bad_request("Failed to retrieve audits list.")
        })?;
        Ok(Paginated::new(records, total, page))
    }
}
