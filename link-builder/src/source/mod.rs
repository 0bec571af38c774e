use async_trait::async_trait;
use thiserror::Error;

use crate::links::types::DataSnapshot;

pub mod sheet;

pub use sheet::{CsvLocation, CsvSource};

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("failed to fetch {location}: {error}")]
    FetchError {
        location: String,
        error: reqwest::Error,
    },
    #[error("failed to read {location}: {error}")]
    IoError {
        location: String,
        error: std::io::Error,
    },
    #[error("failed to parse csv: {0}")]
    CsvError(#[from] csv::Error),
    #[error("column {0} missing from sheet")]
    MissingColumn(String),
}

/// Where the campaign, publisher and creative tables come from. Every call returns a
/// fresh snapshot; caching is up to the implementation.
#[async_trait]
pub trait TabularSource {
    async fn load(&self) -> Result<DataSnapshot, SourceError>;
}

/// Always returns the same snapshot.
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    snapshot: DataSnapshot,
}

impl StaticSource {
    pub fn new(snapshot: DataSnapshot) -> Self {
        StaticSource { snapshot }
    }
}

#[async_trait]
impl TabularSource for StaticSource {
    async fn load(&self) -> Result<DataSnapshot, SourceError> {
        Ok(self.snapshot.clone())
    }
}
