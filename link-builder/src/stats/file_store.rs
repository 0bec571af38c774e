use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use tempfile::NamedTempFile;
use tokio::sync::Mutex;

use crate::stats::{CounterStore, StatsError, StatsKey, StatsRecord};

const HEADER: [&str; 5] = ["date", "campaign", "link_type", "pid_count", "links_generated"];

/// Daily counters kept in a single CSV file, one line per key.
///
/// Every update rewrites the whole file through a temporary file and a rename. The lock
/// is held by the blocking job itself, so a cancelled caller cannot release it while
/// its read-modify-write is still running.
pub struct CsvCounterStore {
    path: PathBuf,
    lock: Arc<Mutex<()>>,
}

impl CsvCounterStore {
    /// Opens the store, creating the file with its header if it does not exist.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StatsError> {
        let path = path.into();
        if !path.exists() {
            write_records(&path, &[])?;
            tracing::info!(path = %path.display(), "created stats file");
        }
        Ok(CsvCounterStore {
            path,
            lock: Arc::new(Mutex::new(())),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn blocking<T, F>(&self, op: F) -> Result<T, StatsError>
    where
        T: Send + 'static,
        F: FnOnce(&Path) -> Result<T, StatsError> + Send + 'static,
    {
        let guard = self.lock.clone().lock_owned().await;
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || {
            let result = op(&path);
            drop(guard);
            result
        })
        .await?
    }
}

#[async_trait]
impl CounterStore for CsvCounterStore {
    async fn get(&self, key: &StatsKey) -> Result<Option<u64>, StatsError> {
        let key = key.clone();
        self.blocking(move |path| {
            Ok(read_records(path)?
                .into_iter()
                .find(|r| r.key() == key)
                .map(|r| r.links_generated))
        })
        .await
    }

    async fn upsert(&self, key: &StatsKey, delta: u64) -> Result<u64, StatsError> {
        let key = key.clone();
        self.blocking(move |path| {
            let mut records = read_records(path)?;
            let total = match records.iter_mut().find(|r| r.key() == key) {
                Some(record) => {
                    record.links_generated += delta;
                    record.links_generated
                }
                None => {
                    records.push(StatsRecord {
                        date: key.date,
                        campaign: key.campaign.clone(),
                        link_type: key.link_type.clone(),
                        pid_count: key.pid_count,
                        links_generated: delta,
                    });
                    delta
                }
            };
            write_records(path, &records)?;
            Ok(total)
        })
        .await
    }

    async fn records(&self, date: Option<NaiveDate>) -> Result<Vec<StatsRecord>, StatsError> {
        self.blocking(move |path| {
            Ok(read_records(path)?
                .into_iter()
                .filter(|r| date.map_or(true, |d| r.date == d))
                .collect())
        })
        .await
    }
}

fn read_records(path: &Path) -> Result<Vec<StatsRecord>, StatsError> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)?;
    let mut records = Vec::new();
    for record in rdr.deserialize() {
        records.push(record?);
    }
    Ok(records)
}

fn write_records(path: &Path, records: &[StatsRecord]) -> Result<(), StatsError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir)?;
    {
        let mut wtr = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(tmp.as_file_mut());
        wtr.write_record(HEADER)?;
        for record in records {
            wtr.serialize(record)?;
        }
        wtr.flush()?;
    }
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::time::Duration;

    use super::*;
    use crate::stats::StatsAggregator;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 17).unwrap()
    }

    #[tokio::test]
    async fn test_open_creates_file_with_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("link_stats.csv");
        let store = CsvCounterStore::open(&path).unwrap();

        assert_eq!(
            fs::read_to_string(store.path()).unwrap(),
            "date,campaign,link_type,pid_count,links_generated\n"
        );
        assert!(store.records(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_upsert_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("link_stats.csv");

        let stats = StatsAggregator::new(Arc::new(CsvCounterStore::open(&path).unwrap()));
        stats
            .record_generation_on(day(), "Banki", "Onelink CTA", 2, 2)
            .await
            .unwrap();
        stats
            .record_generation_on(day(), "Banki", "CTA", 2, 1)
            .await
            .unwrap();

        let reopened = CsvCounterStore::open(&path).unwrap();
        let total = reopened
            .upsert(
                &StatsKey {
                    date: day(),
                    campaign: "Banki".to_string(),
                    link_type: "Onelink CTA".to_string(),
                    pid_count: 2,
                },
                2,
            )
            .await
            .unwrap();
        assert_eq!(total, 4);

        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "date,campaign,link_type,pid_count,links_generated\n\
             2024-05-17,Banki,Onelink CTA,2,4\n\
             2024-05-17,Banki,CTA,2,1\n"
        );
    }

    #[tokio::test]
    async fn test_reads_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("link_stats.csv");
        fs::write(
            &path,
            "date,campaign,link_type,pid_count,links_generated\n2024-05-16,Kraken,CTV,1,3\n2024-05-17,Kraken,CTV,1,5\n",
        )
        .unwrap();

        let store = CsvCounterStore::open(&path).unwrap();
        let records = store.records(Some(day())).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].links_generated, 5);
        assert_eq!(
            store
                .get(&StatsKey {
                    date: day(),
                    campaign: "Kraken".to_string(),
                    link_type: "CTV".to_string(),
                    pid_count: 1,
                })
                .await
                .unwrap(),
            Some(5)
        );
    }

    #[tokio::test]
    async fn test_concurrent_upserts_are_serialized() {
        let dir = tempfile::tempdir().unwrap();
        let stats = StatsAggregator::new(Arc::new(
            CsvCounterStore::open(dir.path().join("link_stats.csv")).unwrap(),
        ));

        let mut handles = Vec::new();
        for _ in 0..20 {
            let stats = stats.clone();
            handles.push(tokio::spawn(async move {
                stats.record_generation_on(day(), "Banki", "VTA", 3, 3).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let records = stats.store().records(None).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].links_generated, 60);
    }

    #[tokio::test]
    async fn test_cancelled_upsert_does_not_lose_updates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("link_stats.csv");
        let mut contents = String::from("date,campaign,link_type,pid_count,links_generated\n");
        for i in 0..100_000 {
            contents.push_str(&format!("2024-05-16,campaign-{i},CTA,1,1\n"));
        }
        fs::write(&path, contents).unwrap();

        let store = Arc::new(CsvCounterStore::open(&path).unwrap());
        let key = |campaign: &str| StatsKey {
            date: day(),
            campaign: campaign.to_string(),
            link_type: "CTA".to_string(),
            pid_count: 1,
        };

        let cancelled = {
            let store = store.clone();
            tokio::spawn(async move { store.upsert(&key("first"), 1).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        cancelled.abort();

        assert_eq!(store.upsert(&key("second"), 2).await.unwrap(), 2);

        // The first update either never started or finished before the second one.
        let first = store.get(&key("first")).await.unwrap();
        assert!(first.is_none() || first == Some(1));
        assert_eq!(store.get(&key("second")).await.unwrap(), Some(2));
        assert_eq!(
            store.records(None).await.unwrap().len(),
            100_001 + usize::from(first.is_some())
        );
        let leftovers = fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(leftovers, 1);
    }
}
