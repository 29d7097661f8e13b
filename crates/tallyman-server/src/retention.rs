//! Background pruning of old prediction records

use std::sync::Arc;
use tallyman_store::{FilePredictionStore, StoreError};
use tokio::sync::watch;
use tokio::time::{interval, Duration, MissedTickBehavior};

/// How often records are pruned
pub const PRUNE_INTERVAL: Duration = Duration::from_secs(3600);

/// Deletes prediction records older than a fixed age on a schedule
///
/// The first sweep runs immediately, so startup always prunes once.
pub struct RetentionWorker {
    store: Arc<FilePredictionStore>,
    max_age: Duration,
    interval: Duration,
}

impl RetentionWorker {
    /// Create a worker pruning records older than `max_age` every hour
    pub fn new(store: Arc<FilePredictionStore>, max_age: Duration) -> Self {
        Self {
            store,
            max_age,
            interval: PRUNE_INTERVAL,
        }
    }

    /// Override the sweep interval
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Run one sweep, returning the number of records removed
    pub async fn sweep(&self) -> Result<usize, StoreError> {
        let store = Arc::clone(&self.store);
        let max_age = self.max_age;

        match tokio::task::spawn_blocking(move || store.prune_older_than(max_age)).await {
            Ok(result) => result,
            Err(e) => Err(StoreError::Io {
                path: self.store.dir().to_path_buf(),
                source: std::io::Error::other(e.to_string()),
            }),
        }
    }

    /// Sweep on every tick until `shutdown` flips to true or its sender drops
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(
            max_age_secs = self.max_age.as_secs(),
            interval_secs = self.interval.as_secs(),
            "Retention worker started"
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match self.sweep().await {
                        Ok(removed) => tracing::debug!(removed, "Retention sweep completed"),
                        Err(e) => tracing::error!(error = %e, "Retention sweep failed"),
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        tracing::info!("Retention worker stopping");
                        break;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tallyman_domain::traits::PredictionStore;
    use tallyman_domain::{DocumentId, Prediction, PredictionRecord};
    use tempfile::TempDir;

    fn aged_record(doc_id: u64, days_old: i64) -> PredictionRecord {
        PredictionRecord::new(
            DocumentId::new(doc_id),
            &Prediction::empty(),
            None,
            None,
            Utc::now() - chrono::Duration::days(days_old),
        )
    }

    #[tokio::test]
    async fn test_sweep_removes_old_records() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(FilePredictionStore::new(dir.path()));
        store.store(&aged_record(1, 10)).unwrap();
        store.store(&aged_record(2, 0)).unwrap();

        let worker = RetentionWorker::new(Arc::clone(&store), Duration::from_secs(86400));
        assert_eq!(worker.sweep().await.unwrap(), 1);
        assert!(store.load(DocumentId::new(1)).unwrap().is_none());
        assert!(store.load(DocumentId::new(2)).unwrap().is_some());
    }

    #[tokio::test]
    async fn test_run_prunes_immediately_and_stops() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(FilePredictionStore::new(dir.path()));
        store.store(&aged_record(1, 10)).unwrap();

        let (tx, rx) = watch::channel(false);
        let worker = RetentionWorker::new(Arc::clone(&store), Duration::from_secs(86400))
            .with_interval(Duration::from_millis(20));
        let task = tokio::spawn(worker.run(rx));

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(store.load(DocumentId::new(1)).unwrap().is_none());

        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .unwrap()
            .unwrap();
    }
}
