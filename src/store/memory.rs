//! In-process backend. Records vanish with the process.

use crate::error::ReviewError;
use crate::model::JobId;
use crate::store::{Record, RecordStore};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Debug)]
pub struct MemoryStore<R> {
    records: RwLock<HashMap<JobId, R>>,
}

impl<R> Default for MemoryStore<R> {
    fn default() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
        }
    }
}

impl<R> MemoryStore<R> {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl<R: Record> RecordStore<R> for MemoryStore<R> {
    async fn get(&self, job_id: &JobId) -> Result<Option<R>, ReviewError> {
        Ok(self.records.read().await.get(job_id).cloned())
    }

    async fn put(&self, job_id: &JobId, record: &R) -> Result<(), ReviewError> {
        self.records
            .write()
            .await
            .insert(job_id.clone(), record.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SavedMarkdown;
    use chrono::Utc;

    #[test]
    fn put_replaces_and_get_reads_back() {
        let store = MemoryStore::<SavedMarkdown>::new();
        let job = JobId::parse("job-1").unwrap();
        tokio_test::block_on(async {
            assert_eq!(store.get(&job).await.unwrap(), None);
            for text in ["first", "second"] {
                let record = SavedMarkdown {
                    job_id: job.clone(),
                    markdown: text.into(),
                    saved_at: Utc::now(),
                };
                store.put(&job, &record).await.unwrap();
            }
            let got = store.get(&job).await.unwrap().unwrap();
            assert_eq!(got.markdown, "second");
            assert_eq!(store.len().await, 1);
        });
    }
}
