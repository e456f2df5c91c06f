use std::{
    path::PathBuf,
    sync::{Arc, Mutex},
};

use views_store::{PersistReceipt, ResultRecord, ResultStore, RunContext};

#[derive(Clone, Default)]
pub struct MockResultStore {
    pub persisted: Arc<Mutex<Vec<ResultRecord>>>,
    pub summaries: Arc<Mutex<Vec<Option<String>>>>,
    pub fail_with: Option<String>,
}

impl MockResultStore {
    pub fn failing(msg: &str) -> Self {
        Self {
            fail_with: Some(msg.to_string()),
            ..Default::default()
        }
    }
}

impl ResultStore for MockResultStore {
    async fn persist(
        &self,
        records: &[ResultRecord],
        context: &RunContext,
    ) -> anyhow::Result<PersistReceipt> {
        if let Some(ref msg) = self.fail_with {
            return Err(anyhow::anyhow!("{}", msg));
        }

        self.persisted.lock().unwrap().extend_from_slice(records);
        self.summaries
            .lock()
            .unwrap()
            .push(context.overall_summary.clone());

        Ok(PersistReceipt {
            location: PathBuf::from("/tmp/core-views-test/results.json"),
            records_written: records.len(),
        })
    }
}
