use alloy_primitives::{Address, B256, U256};
use serde::{Deserialize, Serialize};

/// An established wallet session plus the two contract handles bound at
/// connect time. Passed explicitly into every operation; never ambient, so
/// independent sessions can coexist in tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    pub account: Address,
    pub marketplace: Address,
    pub nft: Address,
}

/// Point-in-time snapshot of one token held by the connected account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnedToken {
    pub token_id: U256,
    pub metadata_uri: String,
    pub owner: Address,
}

/// The marketplace's authoritative per-token record, active or not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingState {
    pub price_wei: U256,
    pub seller: Address,
    pub is_active: bool,
}

/// An active listing as surfaced to the UI. Inactive records never become
/// one of these, so no flag is carried.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Listing {
    pub token_id: U256,
    pub seller: Address,
    pub price_wei: U256,
    pub metadata_uri: String,
}

/// One historical `ItemListed` log entry, in ledger order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListedEvent {
    pub nft_contract: Address,
    pub token_id: U256,
    pub seller: Address,
    pub price_wei: U256,
}

/// Candidate key yielded by stage 1 of the listing pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ListingKey {
    pub nft_contract: Address,
    pub token_id: U256,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ActionKind {
    List,
    Buy,
    Cancel,
}

/// Ephemeral tag for an in-flight write, keyed by token id. Advisory UI
/// state only: created on submission, removed on confirmation or failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingAction {
    pub kind: ActionKind,
    pub token_id: U256,
}

/// Durable acceptance of a submitted transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxReceipt {
    pub tx_hash: B256,
    pub block_number: u64,
}

/// Both enumerations refreshed together after a purchase changed the
/// buyer's holdings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub listings: Vec<Listing>,
    pub owned: Vec<OwnedToken>,
}
