use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::links::types::LinkType;
use crate::stats::StatsRecord;

#[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinksResponse {
    pub links: Vec<String>,
}

/// Choices for a client building a link request.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionsResponse {
    pub campaigns: Vec<String>,
    pub oses: Vec<String>,
    pub link_types: Vec<LinkType>,
    pub publishers: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct StatsQueryParams {
    pub date: Option<NaiveDate>,
}

#[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsResponse {
    pub records: Vec<StatsRecord>,
}
