use std::io::Read;
use std::path::PathBuf;

use async_trait::async_trait;
use tracing::instrument;

use crate::links::types::{CampaignRow, CreativeTable, DataSnapshot, LinkType, PublisherDirectory};
use crate::source::{SourceError, TabularSource};

const CAMPAIGN_COLUMN: &str = "Campaign";
const OS_COLUMN: &str = "os";
const PUBLISHER_MACROS_COLUMN: &str = "Publisher name";
const PUBLISHER_NAME_COLUMN: &str = "Pub name";
const PUBLISHER_ID_COLUMN: &str = "Publisher_ID";

/// A CSV export, either served over http(s) (e.g. a spreadsheet export link) or on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CsvLocation {
    Url(String),
    Path(PathBuf),
}

impl CsvLocation {
    /// Returns `None` for an empty setting.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            None
        } else if raw.starts_with("http://") || raw.starts_with("https://") {
            Some(CsvLocation::Url(raw.to_string()))
        } else {
            Some(CsvLocation::Path(PathBuf::from(raw)))
        }
    }

    async fn read(&self, client: &reqwest::Client) -> Result<String, SourceError> {
        match self {
            CsvLocation::Url(url) => {
                let fetch_error = |error| SourceError::FetchError {
                    location: url.clone(),
                    error,
                };
                client
                    .get(url)
                    .send()
                    .await
                    .and_then(|r| r.error_for_status())
                    .map_err(fetch_error)?
                    .text()
                    .await
                    .map_err(fetch_error)
            }
            CsvLocation::Path(path) => {
                tokio::fs::read_to_string(path)
                    .await
                    .map_err(|error| SourceError::IoError {
                        location: path.display().to_string(),
                        error,
                    })
            }
        }
    }
}

/// Loads the three sheets on every call, so edits show up on the next request.
pub struct CsvSource {
    client: reqwest::Client,
    campaigns: CsvLocation,
    publishers: CsvLocation,
    creatives: Option<CsvLocation>,
}

impl CsvSource {
    pub fn new(
        campaigns: CsvLocation,
        publishers: CsvLocation,
        creatives: Option<CsvLocation>,
    ) -> Self {
        CsvSource {
            client: reqwest::Client::new(),
            campaigns,
            publishers,
            creatives,
        }
    }
}

#[async_trait]
impl TabularSource for CsvSource {
    #[instrument(skip_all)]
    async fn load(&self) -> Result<DataSnapshot, SourceError> {
        let campaigns = self.campaigns.read(&self.client).await?;
        let publishers = self.publishers.read(&self.client).await?;
        let creatives = match &self.creatives {
            Some(location) => parse_creatives(location.read(&self.client).await?.as_bytes())?,
            None => CreativeTable::new(),
        };

        let snapshot = DataSnapshot {
            rows: parse_campaign_rows(campaigns.as_bytes())?,
            publishers: parse_publishers(publishers.as_bytes())?,
            creatives,
        };
        tracing::debug!(
            rows = snapshot.rows.len(),
            publishers = snapshot.publishers.len(),
            "loaded sheets"
        );
        Ok(snapshot)
    }
}

fn reader<R: Read>(input: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(input)
}

fn column(headers: &csv::StringRecord, name: &str) -> Option<usize> {
    headers.iter().position(|h| h == name)
}

fn required_column(headers: &csv::StringRecord, name: &str) -> Result<usize, SourceError> {
    column(headers, name).ok_or_else(|| SourceError::MissingColumn(name.to_string()))
}

fn cell(record: &csv::StringRecord, index: Option<usize>) -> &str {
    index.and_then(|i| record.get(i)).unwrap_or_default()
}

pub fn parse_campaign_rows<R: Read>(input: R) -> Result<Vec<CampaignRow>, SourceError> {
    let mut rdr = reader(input);
    let headers = rdr.headers()?.clone();
    let campaign_idx = required_column(&headers, CAMPAIGN_COLUMN)?;
    let os_idx = required_column(&headers, OS_COLUMN)?;
    let macros_idx = column(&headers, PUBLISHER_MACROS_COLUMN);
    let template_idx: Vec<(LinkType, usize)> = LinkType::ALL
        .into_iter()
        .filter_map(|lt| column(&headers, lt.column_name()).map(|i| (lt, i)))
        .collect();

    let mut rows = Vec::new();
    for record in rdr.records() {
        let record = record?;
        let mut row = CampaignRow::new(
            cell(&record, Some(campaign_idx)),
            cell(&record, Some(os_idx)),
        )
        .with_publisher_macros(cell(&record, macros_idx));
        for (link_type, index) in &template_idx {
            let template = cell(&record, Some(*index));
            if !template.is_empty() {
                row = row.with_template(*link_type, template);
            }
        }
        rows.push(row);
    }
    Ok(rows)
}

pub fn parse_publishers<R: Read>(input: R) -> Result<PublisherDirectory, SourceError> {
    let mut rdr = reader(input);
    let headers = rdr.headers()?.clone();
    let name_idx = required_column(&headers, PUBLISHER_NAME_COLUMN)?;
    let id_idx = required_column(&headers, PUBLISHER_ID_COLUMN)?;

    let mut directory = PublisherDirectory::new();
    for record in rdr.records() {
        let record = record?;
        let name = cell(&record, Some(name_idx));
        if !name.is_empty() {
            directory.insert(name, cell(&record, Some(id_idx)));
        }
    }
    Ok(directory)
}

/// Every column other than `Campaign` is a creative column.
pub fn parse_creatives<R: Read>(input: R) -> Result<CreativeTable, SourceError> {
    let mut rdr = reader(input);
    let headers = rdr.headers()?.clone();
    let campaign_idx = required_column(&headers, CAMPAIGN_COLUMN)?;

    let mut table = CreativeTable::new();
    for record in rdr.records() {
        let record = record?;
        let campaign = cell(&record, Some(campaign_idx));
        if campaign.is_empty() {
            continue;
        }
        for (index, header) in headers.iter().enumerate() {
            if index != campaign_idx && !header.is_empty() {
                table.insert(campaign, header, cell(&record, Some(index)));
            }
        }
    }
    Ok(table)
}
