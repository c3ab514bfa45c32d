use std::sync::Arc;

use crate::database::models::{ErrorLogRecord, NewErrorLog};
use crate::database::repository::ErrorLogRepository;
use crate::error::ApiError;
use crate::pagination::{PageRequest, Paginated};

#[derive(Clone)]
pub struct ErrorLogService {
    logs: Arc<dyn ErrorLogRepository>,
}

impl ErrorLogService {
    pub fn new(logs: Arc<dyn ErrorLogRepository>) -> Self {
        Self { logs }
    }

    /// Persist one error log entry; a failing store is only reported locally.
    pub async fn record(&self, record: NewErrorLog) {
        if let Err(e) = self.logs.create(record).await {
            tracing::error!("Failed to persist error log: {}", e);
        }
    }

    pub async fn list(&self, page: &PageRequest) -> Result<Paginated<ErrorLogRecord>, ApiError> {
        let (records, total) = self.logs.list(page).await.map_err(|e| {
            tracing::error!("Failed to list error logs: {}", e);
            ApiError::bad_request("Failed to retrieve logs list.")
        })?;
        Ok(Paginated::new(records, total, page))
    }
}
