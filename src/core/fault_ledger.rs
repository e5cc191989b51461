//! Reports faulted streams once per fault episode.
//!
//! The ledger lives in memory for the lifetime of the process, so a restart
//! reports every still-faulted stream once more.

use std::collections::{BTreeMap, BTreeSet};

use tracing::warn;

use crate::domain::{StreamRecord, StreamStatus};

#[derive(Debug, Default, Clone)]
pub struct FaultLedger {
    reported: BTreeSet<String>,
}

impl FaultLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget recovered streams, then warn about faults not yet reported.
    ///
    /// Returns the ids reported during this call.
    pub fn reconcile(&mut self, streams: &BTreeMap<String, StreamRecord>) -> Vec<String> {
        self.reported.retain(|id| {
            streams
                .get(id)
                .map(|record| record.status == StreamStatus::Fault)
                .unwrap_or(false)
        });

        let mut newly_reported = Vec::new();
        for record in streams.values() {
            if record.status != StreamStatus::Fault || self.reported.contains(&record.id) {
                continue;
            }

            warn!(
                stream_id = %record.id,
                attributes = ?record.attributes,
                url = %record.url,
                "Stream was ignored due to invalid data"
            );
            self.reported.insert(record.id.clone());
            newly_reported.push(record.id.clone());
        }

        newly_reported
    }

    pub fn contains(&self, id: &str) -> bool {
        self.reported.contains(id)
    }

    pub fn len(&self) -> usize {
        self.reported.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reported.is_empty()
    }
}
