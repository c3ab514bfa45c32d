pub mod audits;
pub mod auth;
pub mod email_templates;
pub mod files;
pub mod logs;
pub mod system;
pub mod users;

use serde::Deserialize;
use uuid::Uuid;

use crate::error::ApiError;
use crate::routing::ResourceGroup;

/// `?uuid=` as used by find, update and delete routes
#[derive(Debug, Deserialize)]
pub struct UuidQuery {
    pub uuid: Option<String>,
}

impl UuidQuery {
    pub fn parse(&self) -> Result<Uuid, ApiError> {
        let raw = self
            .uuid
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ApiError::bad_request("Query parameter 'uuid' is required"))?;
        Uuid::parse_str(raw).map_err(|_| ApiError::bad_request(format!("Invalid uuid: {}", raw)))
    }
}

/// Every versioned resource group
pub fn resource_groups(max_upload_bytes: usize) -> Vec<ResourceGroup> {
    vec![
        auth::routes(),
        users::routes(),
        audits::routes(),
        logs::routes(),
        files::routes(max_upload_bytes),
        email_templates::routes(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uuid_query_requires_a_valid_value() {
        let id = Uuid::new_v4();
        let ok = UuidQuery { uuid: Some(id.to_string()) };
        assert_eq!(ok.parse().unwrap(), id);

        let missing = UuidQuery { uuid: None };
        assert_eq!(missing.parse().unwrap_err().status_code(), 400);

        let bad = UuidQuery { uuid: Some("123".into()) };
        assert_eq!(bad.parse().unwrap_err().message(), "Invalid uuid: 123");
    }
}
