use anyhow::Result;
use std::sync::Arc;

use crate::config::Config;
use crate::source::{CsvLocation, CsvSource, TabularSource};
use crate::stats::{CounterStore, CsvCounterStore, MemoryCounterStore, StatsAggregator};

#[derive(Clone)]
pub struct State {
    pub source: Arc<dyn TabularSource + Send + Sync>,
    pub stats: StatsAggregator,
    pub max_pids_per_request: usize,
    pub enable_metrics: bool,
}

impl State {
    pub fn new(
        source: Arc<dyn TabularSource + Send + Sync>,
        store: Arc<dyn CounterStore + Send + Sync>,
        max_pids_per_request: usize,
    ) -> Self {
        State {
            source,
            stats: StatsAggregator::new(store),
            max_pids_per_request,
            enable_metrics: false,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let campaigns = CsvLocation::parse(&config.campaign_sheet_csv)
            .ok_or_else(|| anyhow::anyhow!("CAMPAIGN_SHEET_CSV must be set"))?;
        let publishers = CsvLocation::parse(&config.publisher_sheet_csv)
            .ok_or_else(|| anyhow::anyhow!("PUBLISHER_SHEET_CSV must be set"))?;
        let creatives = CsvLocation::parse(&config.creative_sheet_csv);
        let source = Arc::new(CsvSource::new(campaigns, publishers, creatives));

        let store: Arc<dyn CounterStore + Send + Sync> = if config.stats_file.trim().is_empty() {
            tracing::info!("no stats file configured, keeping stats in memory");
            Arc::new(MemoryCounterStore::new())
        } else {
            match CsvCounterStore::open(config.stats_file.trim()) {
                Ok(store) => Arc::new(store),
                Err(e) => {
                    tracing::error!(
                        error = %e,
                        path = %config.stats_file,
                        "Failed to open stats file"
                    );
                    return Err(anyhow::anyhow!("Failed to open stats file: {}", e));
                }
            }
        };

        Ok(State {
            enable_metrics: config.enable_metrics,
            ..State::new(source, store, config.max_pids_per_request)
        })
    }
}
