//! Query parameter extractors for list and import endpoints.

use serde::Deserialize;

use outreach_core::repository::SortOrder;

/// Query parameters for the campaign list endpoint.
#[derive(Debug, Deserialize, Default)]
pub struct CampaignListQuery {
    /// Filter by status (draft, active, paused, completed, error).
    pub status: Option<String>,
    /// Sort order by creation time (asc, desc).
    pub order: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Query parameters for the lead list endpoint.
#[derive(Debug, Deserialize, Default)]
pub struct LeadListQuery {
    pub industry: Option<String>,
    pub region: Option<String>,
    pub tag: Option<String>,
    /// Substring match on email, name or company.
    pub q: Option<String>,
    pub order: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Query parameters for `POST /leads/import`.
#[derive(Debug, Deserialize)]
pub struct ImportQuery {
    /// Comma-separated `field=column` assignments.
    pub map: Option<String>,
    /// Guess the mapping from headers before applying `map`.
    #[serde(default = "default_detect")]
    pub detect: bool,
    /// `csv` or `xlsx`; otherwise taken from the Content-Type header.
    pub format: Option<String>,
    /// Campaign to attach the imported leads to.
    pub campaign_id: Option<String>,
}

fn default_detect() -> bool {
    true
}

impl ImportQuery {
    pub fn assignments(&self) -> Vec<String> {
        self.map
            .as_deref()
            .unwrap_or("")
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// `asc` sorts ascending; anything else (or nothing) keeps the default.
pub fn parse_order(order: Option<&str>) -> Option<SortOrder> {
    match order.map(str::to_lowercase).as_deref() {
        Some("asc") => Some(SortOrder::Asc),
        Some("desc") => Some(SortOrder::Desc),
        _ => None,
    }
}
