use crate::config::StorageConfig;
use crate::error::{Result as RewardsResult, RewardsError};
use crate::types::{ContributionRecord, ParticipantId};
use anyhow::{bail, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

type ContributionMap = HashMap<ParticipantId, ContributionRecord>;

/// Record store for carry-forward contributions. `upsert_contributions` must
/// apply the whole batch or none of it; rows are keyed by `participant_id`
/// and a later write replaces an earlier one.
#[async_trait]
pub trait ContributionStorage: Send + Sync {
    async fn upsert_contributions(&self, records: &[ContributionRecord]) -> Result<()>;
    async fn get_contribution(
        &self,
        participant_id: &ParticipantId,
    ) -> Result<Option<ContributionRecord>>;
    async fn get_all_contributions(&self) -> Result<Vec<ContributionRecord>>;
}

fn validate_record(record: &ContributionRecord) -> Result<()> {
    if record.participant_id.is_empty() {
        bail!("Contribution record has an empty participant id");
    }
    if !record.contribution_amount.is_finite() || record.contribution_amount < 0.0 {
        bail!(
            "Contribution for {} is not a valid amount: {}",
            record.participant_id,
            record.contribution_amount
        );
    }
    Ok(())
}

pub struct MemoryStorage {
    contributions: Arc<RwLock<ContributionMap>>,
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self {
            contributions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn len(&self) -> usize {
        self.contributions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.contributions.read().await.is_empty()
    }
}

#[async_trait]
impl ContributionStorage for MemoryStorage {
    async fn upsert_contributions(&self, records: &[ContributionRecord]) -> Result<()> {
        // Reject before touching the map so a bad row commits nothing
        for record in records {
            validate_record(record)?;
        }

        let mut contributions = self.contributions.write().await;
        let rows_before = contributions.len();
        let mut updated = 0usize;

        for record in records {
            if contributions
                .insert(record.participant_id.clone(), record.clone())
                .is_some()
            {
                updated += 1;
            }
        }

        info!(
            batch_size = records.len(),
            updated = updated,
            inserted = records.len() - updated,
            rows_before = rows_before,
            rows_after = contributions.len(),
            storage_type = "memory",
            "💾 Contributions upserted"
        );
        Ok(())
    }

    async fn get_contribution(
        &self,
        participant_id: &ParticipantId,
    ) -> Result<Option<ContributionRecord>> {
        let contributions = self.contributions.read().await;
        Ok(contributions.get(participant_id).cloned())
    }

    async fn get_all_contributions(&self) -> Result<Vec<ContributionRecord>> {
        let contributions = self.contributions.read().await;
        let mut records: Vec<ContributionRecord> = contributions.values().cloned().collect();
        records.sort_by(|a, b| a.participant_id.cmp(&b.participant_id));
        Ok(records)
    }
}

#[cfg(feature = "rocksdb")]
pub struct RocksDbStorage {
    db: Arc<rocksdb::DB>,
    cf_contributions: String,
}

#[cfg(feature = "rocksdb")]
impl RocksDbStorage {
    pub fn new(path: &str) -> Result<Self> {
        use rocksdb::{Options, DB};

        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);

        let db = DB::open_cf(&opts, path, ["contributions"])?;

        Ok(Self {
            db: Arc::new(db),
            cf_contributions: "contributions".to_string(),
        })
    }
}

#[cfg(feature = "rocksdb")]
#[async_trait]
impl ContributionStorage for RocksDbStorage {
    async fn upsert_contributions(&self, records: &[ContributionRecord]) -> Result<()> {
        use rocksdb::WriteBatch;

        let cf = self
            .db
            .cf_handle(&self.cf_contributions)
            .ok_or_else(|| anyhow::anyhow!("Column family not found"))?;

        let mut batch = WriteBatch::default();
        for record in records {
            validate_record(record)?;
            let value = serde_json::to_vec(record)?;
            batch.put_cf(cf, record.participant_id.as_str().as_bytes(), value);
        }

        // Single write so the batch lands atomically
        self.db.write(batch)?;

        info!(
            batch_size = records.len(),
            storage_type = "rocksdb",
            "💾 Contributions upserted"
        );
        Ok(())
    }

    async fn get_contribution(
        &self,
        participant_id: &ParticipantId,
    ) -> Result<Option<ContributionRecord>> {
        let cf = self
            .db
            .cf_handle(&self.cf_contributions)
            .ok_or_else(|| anyhow::anyhow!("Column family not found"))?;

        match self.db.get_cf(cf, participant_id.as_str().as_bytes())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn get_all_contributions(&self) -> Result<Vec<ContributionRecord>> {
        use rocksdb::IteratorMode;

        let cf = self
            .db
            .cf_handle(&self.cf_contributions)
            .ok_or_else(|| anyhow::anyhow!("Column family not found"))?;

        let mut records = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (_, value) = item?;
            records.push(serde_json::from_slice::<ContributionRecord>(&value)?);
        }

        Ok(records)
    }
}

/// Build the backend named in configuration.
pub fn open_storage(config: &StorageConfig) -> RewardsResult<Arc<dyn ContributionStorage>> {
    match config.backend.as_str() {
        "memory" => Ok(Arc::new(MemoryStorage::new())),
        #[cfg(feature = "rocksdb")]
        "rocksdb" => {
            info!(path = %config.path, "🗄️ Opening rocksdb contribution store");
            Ok(Arc::new(RocksDbStorage::new(&config.path)?))
        }
        #[cfg(not(feature = "rocksdb"))]
        "rocksdb" => Err(RewardsError::InvalidConfiguration(
            "rocksdb backend requested but the `rocksdb` feature is not enabled".to_string(),
        )),
        other => Err(RewardsError::InvalidConfiguration(format!(
            "unknown storage backend '{}'",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn record(id: &str, amount: f64) -> ContributionRecord {
        ContributionRecord {
            participant_id: ParticipantId::new(id),
            contribution_amount: amount,
            computed_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_memory_upsert_overwrites_by_key() {
        let storage = MemoryStorage::new();

        storage
            .upsert_contributions(&[record("alice", 10.0), record("bob", 5.0)])
            .await
            .unwrap();
        storage
            .upsert_contributions(&[record("alice", 12.5)])
            .await
            .unwrap();

        assert_eq!(storage.len().await, 2);
        let alice = storage
            .get_contribution(&ParticipantId::new("alice"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(alice.contribution_amount, 12.5);
    }

    #[tokio::test]
    async fn test_memory_rejected_row_commits_nothing() {
        let storage = MemoryStorage::new();

        let result = storage
            .upsert_contributions(&[record("good", 1.0), record("bad", f64::NAN)])
            .await;
        assert!(result.is_err());
        assert!(storage.is_empty().await);

        let result = storage.upsert_contributions(&[record("", 1.0)]).await;
        assert!(result.is_err());
        assert!(storage.is_empty().await);
    }

    #[tokio::test]
    async fn test_memory_listing_sorted() {
        let storage = MemoryStorage::new();
        storage
            .upsert_contributions(&[record("carol", 3.0), record("alice", 1.0), record("bob", 2.0)])
            .await
            .unwrap();

        let all = storage.get_all_contributions().await.unwrap();
        let ids: Vec<&str> = all.iter().map(|r| r.participant_id.as_str()).collect();
        assert_eq!(ids, vec!["alice", "bob", "carol"]);
    }

    #[test]
    fn test_open_storage_backends() {
        assert!(open_storage(&StorageConfig::default()).is_ok());

        let unknown = StorageConfig {
            backend: "redis".to_string(),
            path: String::new(),
        };
        assert!(open_storage(&unknown).is_err());
    }

    #[cfg(feature = "rocksdb")]
    #[tokio::test]
    async fn test_rocksdb_upsert_roundtrip() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let storage = RocksDbStorage::new(temp_dir.path().to_str().unwrap()).unwrap();

        storage
            .upsert_contributions(&[record("alice", 10.0), record("bob", 5.0)])
            .await
            .unwrap();
        storage
            .upsert_contributions(&[record("alice", 7.0)])
            .await
            .unwrap();

        let all = storage.get_all_contributions().await.unwrap();
        assert_eq!(all.len(), 2);
        let alice = storage
            .get_contribution(&ParticipantId::new("alice"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(alice.contribution_amount, 7.0);
        assert!(storage
            .get_contribution(&ParticipantId::new("nobody"))
            .await
            .unwrap()
            .is_none());
    }

    #[cfg(feature = "rocksdb")]
    #[tokio::test]
    async fn test_rocksdb_rejected_row_commits_nothing() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let storage = RocksDbStorage::new(temp_dir.path().to_str().unwrap()).unwrap();

        let result = storage
            .upsert_contributions(&[record("good", 1.0), record("bad", -1.0)])
            .await;
        assert!(result.is_err());
        assert!(storage.get_all_contributions().await.unwrap().is_empty());
    }
}
