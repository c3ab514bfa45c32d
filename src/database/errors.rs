use sqlx::postgres::PgDatabaseError;
use thiserror::Error;

/// Data-layer failure, classified from PostgreSQL SQLSTATE codes
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("record not found")]
    NotFound,

    #[error("unique constraint violated on {field}")]
    UniqueViolation { field: String },

    #[error("foreign key violated on {field}")]
    ForeignKeyViolation { field: String },

    #[error("value too long for {column}")]
    ValueTooLong { column: String },

    #[error("null value in required column {column}")]
    NotNullViolation { column: String },

    #[error("numeric value out of range")]
    OutOfRange,

    #[error("storage unavailable: {0}")]
    Unavailable(String),

    #[error(transparent)]
    Sqlx(sqlx::Error),
}

impl From<sqlx::Error> for RepositoryError {
    fn from(err: sqlx::Error) -> Self {
        classify(&err).unwrap_or(RepositoryError::Sqlx(err))
    }
}

fn classify(err: &sqlx::Error) -> Option<RepositoryError> {
    match err {
        sqlx::Error::RowNotFound => Some(RepositoryError::NotFound),
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
            Some(RepositoryError::Unavailable(err.to_string()))
        }
        sqlx::Error::Database(db) => {
            let pg = db.try_downcast_ref::<PgDatabaseError>();
            let detail = pg.and_then(|e| e.detail());
            let column = pg.and_then(|e| e.column());
            let field = || {
                detail
                    .and_then(key_from_detail)
                    .or_else(|| column.map(str::to_string))
                    .or_else(|| db.constraint().map(str::to_string))
                    .unwrap_or_else(|| "value".to_string())
            };

            match db.code().as_deref() {
                Some("23505") => Some(RepositoryError::UniqueViolation { field: field() }),
                Some("23503") => Some(RepositoryError::ForeignKeyViolation { field: field() }),
                Some("22001") => Some(RepositoryError::ValueTooLong { column: field() }),
                Some("23502") => Some(RepositoryError::NotNullViolation { column: field() }),
                Some("22003") => Some(RepositoryError::OutOfRange),
                _ => None,
            }
        }
        _ => None,
    }
}

/// Pulls the column list out of a PostgreSQL detail line such as
/// `Key (email)=(a@b.c) already exists.`
fn key_from_detail(detail: &str) -> Option<String> {
    let start = detail.find("Key (")? + "Key (".len();
    let end = detail[start..].find(")=(")? + start;
    let mut key = detail[start..end].trim();
    // Expression indexes report e.g. `lower(email::text)`
    if let (Some(open), true) = (key.find('('), key.ends_with(')')) {
        key = key[open + 1..key.len() - 1].trim();
    }
    let key = key.split("::").next().unwrap_or(key).trim();
    if key.is_empty() {
        None
    } else {
        Some(key.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_key_from_detail() {
        assert_eq!(
            key_from_detail("Key (email)=(jane@example.com) already exists.").as_deref(),
            Some("email")
        );
        assert_eq!(
            key_from_detail("Key (role_uuid)=(8d5e...) is not present in table \"roles\".").as_deref(),
            Some("role_uuid")
        );
        assert_eq!(
            key_from_detail("Key (lower(email::text))=(jane@example.com) already exists.").as_deref(),
            Some("email")
        );
        assert_eq!(key_from_detail("Failing row contains (null)."), None);
    }

    #[test]
    fn row_not_found_is_not_found() {
        assert!(matches!(
            RepositoryError::from(sqlx::Error::RowNotFound),
            RepositoryError::NotFound
        ));
        assert!(matches!(
            RepositoryError::from(sqlx::Error::PoolClosed),
            RepositoryError::Unavailable(_)
        ));
    }
}
