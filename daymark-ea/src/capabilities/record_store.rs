//! In-memory record store

use super::RecordStore;
use crate::error::CapabilityError;
use crate::waterfall::types::DayAnalysis;
use chrono::NaiveDate;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Finished analyses keyed by (date, provider), kept for the process lifetime
#[derive(Default)]
pub struct InMemoryRecordStore {
    records: RwLock<HashMap<(NaiveDate, String), DayAnalysis>>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn get(
        &self,
        date: NaiveDate,
        provider: &str,
    ) -> Result<Option<DayAnalysis>, CapabilityError> {
        Ok(self
            .records
            .read()
            .await
            .get(&(date, provider.to_string()))
            .cloned())
    }

    async fn put(&self, analysis: &DayAnalysis) -> Result<(), CapabilityError> {
        self.records
            .write()
            .await
            .insert((analysis.date, analysis.provider.clone()), analysis.clone());
        Ok(())
    }
}
