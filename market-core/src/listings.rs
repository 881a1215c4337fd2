use std::collections::HashSet;

use crate::model::{ListedEvent, ListingKey, ListingState};

/// Stage 1 of the listing pipeline: candidate keys from the historical
/// `ItemListed` log. The log is append-only, so a re-listed token appears
/// more than once; keys are deduplicated keeping the first occurrence so
/// stage 2's keyed lookup runs once per (contract, token) pair and the
/// output stays in ledger order.
pub fn candidate_keys(events: &[ListedEvent]) -> Vec<ListingKey> {
    let mut seen = HashSet::new();
    let mut keys = Vec::new();
    for ev in events {
        let key = ListingKey {
            nft_contract: ev.nft_contract,
            token_id: ev.token_id,
        };
        if seen.insert(key) {
            keys.push(key);
        }
    }
    keys
}

/// Stage 2 admission check against the authoritative record. A historical
/// event never qualifies a listing on its own; a later cancel or sale flips
/// the flag without erasing the event, so only the current flag decides.
pub fn is_surfaced(state: &ListingState) -> bool {
    state.is_active
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{Address, U256};

    fn ev(nft: u8, token: u64) -> ListedEvent {
        ListedEvent {
            nft_contract: Address::repeat_byte(nft),
            token_id: U256::from(token),
            seller: Address::repeat_byte(0xaa),
            price_wei: U256::from(1u64),
        }
    }

    #[test]
    fn keys_preserve_ledger_order() {
        let keys = candidate_keys(&[ev(1, 7), ev(1, 42), ev(2, 7)]);
        assert_eq!(
            keys.iter().map(|k| k.token_id).collect::<Vec<_>>(),
            vec![U256::from(7u64), U256::from(42u64), U256::from(7u64)]
        );
    }

    #[test]
    fn relisted_token_yields_one_key() {
        let keys = candidate_keys(&[ev(1, 7), ev(1, 42), ev(1, 7)]);
        assert_eq!(keys.len(), 2);
        assert_eq!(keys[0].token_id, U256::from(7u64));
    }

    #[test]
    fn same_token_on_distinct_contracts_is_distinct() {
        let keys = candidate_keys(&[ev(1, 7), ev(2, 7)]);
        assert_eq!(keys.len(), 2);
    }

    #[test]
    fn inactive_record_is_not_surfaced() {
        let state = ListingState {
            price_wei: U256::from(10u64),
            seller: Address::repeat_byte(0xaa),
            is_active: false,
        };
        assert!(!is_surfaced(&state));
    }
}
