use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE: i64 = 1;
pub const DEFAULT_PER_PAGE: i64 = 10;
pub const MAX_PER_PAGE: i64 = 100;

/// Raw list query string. Values stay textual so malformed input falls back
/// to defaults instead of rejecting the request.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub page: Option<String>,
    pub data_per_page: Option<String>,
    pub search: Option<String>,
}

/// Clamped pagination window plus the optional search term
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub per_page: i64,
    pub search: Option<String>,
}

impl PageRequest {
    pub fn from_raw(page: Option<&str>, per_page: Option<&str>, search: Option<&str>) -> Self {
        let page = parse_positive(page).unwrap_or(DEFAULT_PAGE);
        let per_page = parse_positive(per_page)
            .map(|v| v.min(MAX_PER_PAGE))
            .unwrap_or(DEFAULT_PER_PAGE);
        let search = search
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        Self { page, per_page, search }
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.per_page)
    }

    pub fn limit(&self) -> i64 {
        self.per_page
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::from_raw(None, None, None)
    }
}

impl From<&ListQuery> for PageRequest {
    fn from(query: &ListQuery) -> Self {
        Self::from_raw(
            query.page.as_deref(),
            query.data_per_page.as_deref(),
            query.search.as_deref(),
        )
    }
}

fn parse_positive(raw: Option<&str>) -> Option<i64> {
    raw.and_then(|s| s.trim().parse::<i64>().ok()).filter(|v| *v >= 1)
}

/// `ceil(total / per_page)`, floored at 1 even for an empty result.
pub fn total_pages(total: i64, per_page: i64) -> i64 {
    if per_page <= 0 {
        return 1;
    }
    let total = total.max(0);
    ((total + per_page - 1) / per_page).max(1)
}

/// List envelope: `{ data, total, actualPage, totalPages }`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Paginated<T: Serialize> {
    pub data: Vec<T>,
    pub total: i64,
    pub actual_page: i64,
    pub total_pages: i64,
}

impl<T: Serialize> Paginated<T> {
    pub fn new(data: Vec<T>, total: i64, request: &PageRequest) -> Self {
        Self {
            data,
            total,
            actual_page: request.page,
            total_pages: total_pages(total, request.per_page),
        }
    }
}
