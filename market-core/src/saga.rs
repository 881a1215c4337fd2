use std::sync::Arc;

use alloy_primitives::U256;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

/// Phase of an approve-then-list saga for one token. The two writes are not
/// atomic on chain, so the journal records where a saga stands; a crash or
/// revert between phases leaves a detectable `Approved` entry instead of a
/// silent restart from scratch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ListPhase {
    /// Approval submitted, confirmation outstanding.
    ApprovalSubmitted,
    /// Approval confirmed, listing not. On chain the token is
    /// approved-but-unlisted; a retry may skip straight to the listing
    /// phase.
    Approved,
    /// Listing transaction submitted, confirmation outstanding.
    ListSubmitted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListSagaEntry {
    pub phase: ListPhase,
    pub price_wei: U256,
}

/// In-memory journal of in-flight approve-then-list sagas, keyed by token
/// id. Completed sagas are removed; failed ones are parked at `Approved` or
/// dropped depending on how far they got.
#[derive(Clone, Default)]
pub struct SagaJournal {
    entries: Arc<DashMap<U256, ListSagaEntry>>,
}

impl SagaJournal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&self, token_id: U256, price_wei: U256) {
        self.entries.insert(
            token_id,
            ListSagaEntry {
                phase: ListPhase::ApprovalSubmitted,
                price_wei,
            },
        );
    }

    /// Records that approval holds on chain while the listing does not.
    pub fn park(&self, token_id: U256, price_wei: U256) {
        self.entries.insert(
            token_id,
            ListSagaEntry {
                phase: ListPhase::Approved,
                price_wei,
            },
        );
    }

    pub fn advance_to_list(&self, token_id: U256) {
        if let Some(mut entry) = self.entries.get_mut(&token_id) {
            entry.phase = ListPhase::ListSubmitted;
        }
    }

    /// Saga finished; the listing is live (or cancelled) on chain.
    pub fn complete(&self, token_id: U256) -> Option<ListSagaEntry> {
        self.entries.remove(&token_id).map(|(_, entry)| entry)
    }

    /// Saga failed before approval confirmed; nothing on chain to recover.
    pub fn abort(&self, token_id: U256) {
        self.entries.remove(&token_id);
    }

    pub fn entry(&self, token_id: U256) -> Option<ListSagaEntry> {
        self.entries.get(&token_id).map(|e| *e.value())
    }

    /// Tokens parked approved-but-unlisted, the state a caller must be able
    /// to detect and re-drive.
    pub fn recoverable(&self) -> Vec<(U256, ListSagaEntry)> {
        self.entries
            .iter()
            .filter(|e| e.value().phase == ListPhase::Approved)
            .map(|e| (*e.key(), *e.value()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_listing_parks_at_approved() {
        let journal = SagaJournal::new();
        let token = U256::from(7u64);
        let price = U256::from(1_000u64);

        journal.begin(token, price);
        assert_eq!(
            journal.entry(token).unwrap().phase,
            ListPhase::ApprovalSubmitted
        );

        journal.park(token, price);
        journal.advance_to_list(token);
        assert_eq!(journal.entry(token).unwrap().phase, ListPhase::ListSubmitted);

        // listing reverted: back to Approved, price preserved
        journal.park(token, price);
        let recoverable = journal.recoverable();
        assert_eq!(recoverable, vec![(token, journal.entry(token).unwrap())]);
        assert_eq!(recoverable[0].1.price_wei, price);
    }

    #[test]
    fn completion_clears_the_entry() {
        let journal = SagaJournal::new();
        let token = U256::from(42u64);
        journal.begin(token, U256::from(5u64));
        journal.park(token, U256::from(5u64));
        journal.advance_to_list(token);
        assert!(journal.complete(token).is_some());
        assert!(journal.entry(token).is_none());
        assert!(journal.recoverable().is_empty());
    }

    #[test]
    fn abort_before_approval_leaves_nothing() {
        let journal = SagaJournal::new();
        let token = U256::from(9u64);
        journal.begin(token, U256::from(5u64));
        journal.abort(token);
        assert!(journal.entry(token).is_none());
    }
}
