use serde::{Deserialize, Serialize};
use time::Date;

use super::spending::SpendingSummary;

#[derive(Debug, Deserialize)]
pub struct PurchaseRange {
    #[serde(default, with = "crate::dates::iso_date::option")]
    pub start: Option<Date>,
    #[serde(default, with = "crate::dates::iso_date::option")]
    pub end: Option<Date>,
}

#[derive(Debug, Deserialize)]
pub struct PurchasedRequest {
    pub is_purchased: bool,
}

#[derive(Debug, Serialize)]
pub struct ClearedResponse {
    pub removed: u64,
}

#[derive(Debug, Serialize)]
pub struct SpendingResponse {
    #[serde(with = "crate::dates::iso_date::option")]
    pub start: Option<Date>,
    #[serde(with = "crate::dates::iso_date::option")]
    pub end: Option<Date>,
    #[serde(flatten)]
    pub summary: SpendingSummary,
}
