use alloy_primitives::{Address, U256};
use async_trait::async_trait;

use crate::error::Result;
use crate::model::{ListedEvent, ListingState, TxReceipt};

/// A write against one of the bound contracts, expressed as typed intent so
/// ledger backends own the encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractCall {
    pub contract: Address,
    pub method: MethodCall,
    /// Payment attached to the call, exact smallest-unit integer.
    pub value: Option<U256>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MethodCall {
    Approve {
        spender: Address,
        token_id: U256,
    },
    ListItem {
        nft_contract: Address,
        token_id: U256,
        price_wei: U256,
    },
    BuyItem {
        nft_contract: Address,
        token_id: U256,
    },
    CancelListing {
        nft_contract: Address,
        token_id: U256,
    },
}

impl MethodCall {
    pub fn token_id(&self) -> U256 {
        match self {
            MethodCall::Approve { token_id, .. }
            | MethodCall::ListItem { token_id, .. }
            | MethodCall::BuyItem { token_id, .. }
            | MethodCall::CancelListing { token_id, .. } => *token_id,
        }
    }
}

/// A submitted, not-yet-confirmed transaction. Once submitted it cannot be
/// withdrawn; the only resolution is confirmation or terminal failure.
#[async_trait]
pub trait TxHandle: Send {
    /// Suspends until the ledger durably accepts or terminally drops the
    /// transaction. No timeout is imposed here; that is the ledger client's
    /// concern.
    async fn confirmed(self: Box<Self>) -> Result<TxReceipt>;
}

/// The external wallet/provider bridge every operation runs through.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    async fn request_account_access(&self) -> Result<Address>;

    async fn read_balance(&self, contract: Address, owner: Address) -> Result<U256>;

    async fn read_token_at_index(
        &self,
        contract: Address,
        owner: Address,
        index: U256,
    ) -> Result<U256>;

    async fn read_metadata_uri(&self, contract: Address, token_id: U256) -> Result<String>;

    async fn read_listing(
        &self,
        marketplace: Address,
        nft_contract: Address,
        token_id: U256,
    ) -> Result<ListingState>;

    /// Current approved spender for a token (zero address when none).
    async fn read_approved(&self, contract: Address, token_id: U256) -> Result<Address>;

    /// Full historical `ItemListed` log for the marketplace, ledger order.
    /// Unbounded backward scan; cost grows with contract history.
    async fn listed_events(&self, marketplace: Address) -> Result<Vec<ListedEvent>>;

    async fn submit(&self, from: Address, call: ContractCall) -> Result<Box<dyn TxHandle>>;
}
