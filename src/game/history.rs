use std::collections::VecDeque;

use crate::models::RoundRecord;

/// Resolved rounds, most recent first.
#[derive(Debug, Clone, Default)]
pub struct HistoryLog {
    records: VecDeque<RoundRecord>,
}

impl HistoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: RoundRecord) {
        self.records.push_front(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RoundRecord> {
        self.records.iter()
    }

    pub fn to_vec(&self) -> Vec<RoundRecord> {
        self.records.iter().cloned().collect()
    }

    /// Only a game reset clears the log.
    pub(crate) fn clear(&mut self) {
        self.records.clear();
    }
}
