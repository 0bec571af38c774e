use crate::links::query::TrackingUrl;
use crate::links::types::CreativeTable;

const CREATIVE_PARAM: &str = "af_ad";

/// The `af_ad` override for one request. Looked up once, since it only depends on
/// the campaign and the selected creative column.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreativeOverlay {
    value: Option<String>,
}

impl CreativeOverlay {
    pub fn lookup(table: &CreativeTable, campaign: &str, column: Option<&str>) -> Self {
        let value = column
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .and_then(|c| table.get(campaign.trim(), c))
            .map(str::trim)
            .filter(|v| !v.is_empty() && *v != "0")
            .map(str::to_string);

        if let Some(value) = &value {
            tracing::debug!(campaign, creative = %value, "applying creative overlay");
        }
        CreativeOverlay { value }
    }

    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    pub fn apply(&self, url: &mut TrackingUrl) {
        if let Some(value) = &self.value {
            url.set(CREATIVE_PARAM, value);
        }
    }
}
