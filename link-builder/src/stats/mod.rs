use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Local, NaiveDate};
use metrics::counter;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;

pub mod file_store;

pub use file_store::CsvCounterStore;

const STATS_UPDATE_FAILURES: &str = "stats_update_failures_total";

#[derive(Error, Debug)]
pub enum StatsError {
    #[error("failed to access stats file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("failed to parse stats file: {0}")]
    CsvError(#[from] csv::Error),
    #[error("stats task failed: {0}")]
    TaskError(#[from] tokio::task::JoinError),
}

/// One daily counter. `pid_count` is the size of the requested PID list, so repeat
/// calls with different list sizes on the same day keep separate records.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StatsKey {
    pub date: NaiveDate,
    pub campaign: String,
    pub link_type: String,
    pub pid_count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsRecord {
    pub date: NaiveDate,
    pub campaign: String,
    pub link_type: String,
    pub pid_count: u64,
    pub links_generated: u64,
}

impl StatsRecord {
    pub fn key(&self) -> StatsKey {
        StatsKey {
            date: self.date,
            campaign: self.campaign.clone(),
            link_type: self.link_type.clone(),
            pid_count: self.pid_count,
        }
    }

    fn from_entry(key: &StatsKey, links_generated: u64) -> Self {
        StatsRecord {
            date: key.date,
            campaign: key.campaign.clone(),
            link_type: key.link_type.clone(),
            pid_count: key.pid_count,
            links_generated,
        }
    }
}

/// Durable daily counters. `upsert` must be an atomic read-modify-write: concurrent
/// requests for the same key must not lose updates.
#[async_trait]
pub trait CounterStore {
    async fn get(&self, key: &StatsKey) -> Result<Option<u64>, StatsError>;

    /// Adds `delta` to the record for `key`, creating it if needed. Returns the new total.
    async fn upsert(&self, key: &StatsKey, delta: u64) -> Result<u64, StatsError>;

    /// Records of one day, or all of them.
    async fn records(&self, date: Option<NaiveDate>) -> Result<Vec<StatsRecord>, StatsError>;
}

#[derive(Debug, Default)]
pub struct MemoryCounterStore {
    counters: Mutex<BTreeMap<StatsKey, u64>>,
}

impl MemoryCounterStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CounterStore for MemoryCounterStore {
    async fn get(&self, key: &StatsKey) -> Result<Option<u64>, StatsError> {
        Ok(self.counters.lock().await.get(key).copied())
    }

    async fn upsert(&self, key: &StatsKey, delta: u64) -> Result<u64, StatsError> {
        let mut counters = self.counters.lock().await;
        let total = counters.entry(key.clone()).or_insert(0);
        *total += delta;
        Ok(*total)
    }

    async fn records(&self, date: Option<NaiveDate>) -> Result<Vec<StatsRecord>, StatsError> {
        let counters = self.counters.lock().await;
        Ok(counters
            .iter()
            .filter(|(key, _)| date.map_or(true, |d| key.date == d))
            .map(|(key, count)| StatsRecord::from_entry(key, *count))
            .collect())
    }
}

/// Adds generated-link counts to today's records.
#[derive(Clone)]
pub struct StatsAggregator {
    store: Arc<dyn CounterStore + Send + Sync>,
}

impl StatsAggregator {
    pub fn new(store: Arc<dyn CounterStore + Send + Sync>) -> Self {
        StatsAggregator { store }
    }

    pub fn store(&self) -> &Arc<dyn CounterStore + Send + Sync> {
        &self.store
    }

    pub async fn record_generation(
        &self,
        campaign: &str,
        link_type: &str,
        pid_count: u64,
        links_generated: u64,
    ) -> Result<u64, StatsError> {
        self.record_generation_on(
            Local::now().date_naive(),
            campaign,
            link_type,
            pid_count,
            links_generated,
        )
        .await
    }

    pub async fn record_generation_on(
        &self,
        date: NaiveDate,
        campaign: &str,
        link_type: &str,
        pid_count: u64,
        links_generated: u64,
    ) -> Result<u64, StatsError> {
        let key = StatsKey {
            date,
            campaign: campaign.to_string(),
            link_type: link_type.to_string(),
            pid_count,
        };
        self.store.upsert(&key, links_generated).await
    }

    /// Same as `record_generation`, but a failing store only gets logged: losing a
    /// counter update must never fail link generation.
    pub async fn record_or_log(
        &self,
        campaign: &str,
        link_type: &str,
        pid_count: u64,
        links_generated: u64,
    ) {
        if let Err(e) = self
            .record_generation(campaign, link_type, pid_count, links_generated)
            .await
        {
            counter!(STATS_UPDATE_FAILURES).increment(1);
            tracing::error!(
                error = %e,
                campaign,
                link_type,
                pid_count,
                links_generated,
                "failed to record link stats"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 17).unwrap()
    }

    #[tokio::test]
    async fn test_record_accumulates_same_key() {
        let store = Arc::new(MemoryCounterStore::new());
        let stats = StatsAggregator::new(store.clone());

        assert_eq!(stats.record_generation_on(day(), "Banki", "CTA", 2, 2).await.unwrap(), 2);
        assert_eq!(stats.record_generation_on(day(), "Banki", "CTA", 2, 2).await.unwrap(), 4);

        let key = StatsKey {
            date: day(),
            campaign: "Banki".to_string(),
            link_type: "CTA".to_string(),
            pid_count: 2,
        };
        assert_eq!(store.get(&key).await.unwrap(), Some(4));
    }

    #[tokio::test]
    async fn test_distinct_pid_counts_are_separate_records() {
        let store = Arc::new(MemoryCounterStore::new());
        let stats = StatsAggregator::new(store.clone());

        stats.record_generation_on(day(), "Banki", "CTA", 2, 2).await.unwrap();
        stats.record_generation_on(day(), "Banki", "CTA", 3, 3).await.unwrap();
        stats
            .record_generation_on(day().succ_opt().unwrap(), "Banki", "CTA", 2, 1)
            .await
            .unwrap();

        assert_eq!(store.records(Some(day())).await.unwrap().len(), 2);
        assert_eq!(store.records(None).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_concurrent_upserts_are_not_lost() {
        let store = Arc::new(MemoryCounterStore::new());
        let stats = StatsAggregator::new(store.clone());

        let mut handles = Vec::new();
        for _ in 0..50 {
            let stats = stats.clone();
            handles.push(tokio::spawn(async move {
                stats.record_generation_on(day(), "Kraken", "CTV", 1, 1).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let records = store.records(Some(day())).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].links_generated, 50);
    }
}
