use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// The five tracking link categories. Wire names match the campaign sheet columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LinkType {
    #[serde(rename = "CTA")]
    Cta,
    #[serde(rename = "VTA")]
    Vta,
    #[serde(rename = "CTV")]
    Ctv,
    #[serde(rename = "Onelink CTA")]
    OnelinkCta,
    #[serde(rename = "Onelink vta", alias = "Onelink VTA")]
    OnelinkVta,
}

impl LinkType {
    pub const ALL: [LinkType; 5] = [
        LinkType::Cta,
        LinkType::Vta,
        LinkType::Ctv,
        LinkType::OnelinkCta,
        LinkType::OnelinkVta,
    ];

    /// Special types are resolved once per campaign, independently of the OS.
    /// Order matters: it is the order special links are emitted in.
    pub const SPECIAL: [LinkType; 3] = [LinkType::OnelinkCta, LinkType::OnelinkVta, LinkType::Ctv];

    pub fn column_name(&self) -> &'static str {
        match self {
            LinkType::Cta => "CTA",
            LinkType::Vta => "VTA",
            LinkType::Ctv => "CTV",
            LinkType::OnelinkCta => "Onelink CTA",
            LinkType::OnelinkVta => "Onelink vta",
        }
    }

    pub fn is_special(&self) -> bool {
        LinkType::SPECIAL.contains(self)
    }
}

impl fmt::Display for LinkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column_name())
    }
}

/// One row of the campaign sheet. A campaign usually has one row per OS.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CampaignRow {
    pub campaign: String,
    pub os: String,
    pub templates: HashMap<LinkType, String>,
    /// Comma separated list of query parameters that receive the publisher id.
    pub publisher_macros: String,
}

impl CampaignRow {
    pub fn new(campaign: impl Into<String>, os: impl Into<String>) -> Self {
        CampaignRow {
            campaign: campaign.into(),
            os: os.into(),
            ..Default::default()
        }
    }

    pub fn with_template(mut self, link_type: LinkType, template: impl Into<String>) -> Self {
        self.templates.insert(link_type, template.into());
        self
    }

    pub fn with_publisher_macros(mut self, macros: impl Into<String>) -> Self {
        self.publisher_macros = macros.into();
        self
    }

    /// Returns the trimmed template for `link_type`, or `None` when the cell is empty.
    pub fn template(&self, link_type: LinkType) -> Option<&str> {
        self.templates
            .get(&link_type)
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
    }
}

/// Publisher display name to publisher identifier, in sheet order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublisherDirectory {
    entries: Vec<(String, String)>,
}

impl PublisherDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Later duplicates of a name replace the earlier identifier but keep its position.
    pub fn insert(&mut self, name: impl Into<String>, publisher_id: impl Into<String>) {
        let name = name.into();
        let publisher_id = publisher_id.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = publisher_id,
            None => self.entries.push((name, publisher_id)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, id)| id.as_str())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<N: Into<String>, I: Into<String>> FromIterator<(N, I)> for PublisherDirectory {
    fn from_iter<T: IntoIterator<Item = (N, I)>>(iter: T) -> Self {
        let mut directory = PublisherDirectory::new();
        for (name, id) in iter {
            directory.insert(name, id);
        }
        directory
    }
}

/// Lower-cased campaign name to creative column to value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreativeTable {
    campaigns: HashMap<String, HashMap<String, String>>,
}

impl CreativeTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(
        &mut self,
        campaign: &str,
        column: impl Into<String>,
        value: impl Into<String>,
    ) {
        self.campaigns
            .entry(campaign.to_lowercase())
            .or_default()
            .insert(column.into(), value.into());
    }

    pub fn get(&self, campaign: &str, column: &str) -> Option<&str> {
        self.campaigns
            .get(&campaign.to_lowercase())
            .and_then(|columns| columns.get(column))
            .map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.campaigns.is_empty()
    }
}

/// Point-in-time copy of every table the generator reads.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DataSnapshot {
    pub rows: Vec<CampaignRow>,
    pub publishers: PublisherDirectory,
    pub creatives: CreativeTable,
}

impl DataSnapshot {
    /// Unique campaign names in table order.
    pub fn campaigns(&self) -> Vec<String> {
        unique_in_order(self.rows.iter().map(|r| r.campaign.as_str()))
    }

    /// Unique OS values in table order.
    pub fn oses(&self) -> Vec<String> {
        unique_in_order(self.rows.iter().map(|r| r.os.as_str()))
    }
}

fn unique_in_order<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    for value in values {
        if !value.is_empty() && !seen.iter().any(|s| s == value) {
            seen.push(value.to_string());
        }
    }
    seen
}
