use std::{future::Future, path::PathBuf};

use crate::domain::{ResultRecord, RunContext};

pub mod file;

pub trait ResultStore {
    /// Flushes a run's buffered records, returning where they ended up.
    fn persist(
        &self,
        records: &[ResultRecord],
        context: &RunContext,
    ) -> impl Future<Output = anyhow::Result<PersistReceipt>> + Send;
}

impl<T: ResultStore + Send + Sync> ResultStore for &T {
    async fn persist(
        &self,
        records: &[ResultRecord],
        context: &RunContext,
    ) -> anyhow::Result<PersistReceipt> {
        (**self).persist(records, context).await
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistReceipt {
    pub location: PathBuf,
    pub records_written: usize,
}
