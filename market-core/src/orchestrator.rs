use std::sync::Arc;

use alloy_primitives::U256;
use dashmap::DashMap;
use prometheus::Registry;
use rust_decimal::Decimal;
use tracing::{info, warn};

use crate::{
    config::MarketConfig,
    error::Result,
    listings,
    metrics::Metrics,
    model::{
        ActionKind, Connection, Listing, MarketSnapshot, OwnedToken, PendingAction, TxReceipt,
    },
    ports::{ContractCall, LedgerClient, MethodCall},
    saga::{ListPhase, SagaJournal},
    units,
};

/// Sequential orchestration of marketplace reads and writes over an
/// injected [`LedgerClient`]. Holds no ledger state of its own beyond the
/// saga journal and the advisory pending-action table; every enumeration is
/// re-derived from chain on every call.
pub struct Orchestrator<C: LedgerClient + 'static> {
    client: Arc<C>,
    config: MarketConfig,
    sagas: SagaJournal,
    pending: Arc<DashMap<U256, PendingAction>>,
    metrics: Arc<Metrics>,
}

impl<C: LedgerClient + 'static> Clone for Orchestrator<C> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            config: self.config,
            sagas: self.sagas.clone(),
            pending: self.pending.clone(),
            metrics: self.metrics.clone(),
        }
    }
}

impl<C: LedgerClient + 'static> Orchestrator<C> {
    pub fn new(client: Arc<C>, config: MarketConfig, registry: &Registry) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            client,
            config,
            sagas: SagaJournal::new(),
            pending: Arc::new(DashMap::new()),
            metrics: Metrics::new(registry),
        })
    }

    /// Requests account authorization from the provider and binds the
    /// configured contract handles. Everything else requires the returned
    /// [`Connection`].
    pub async fn connect(&self) -> Result<Connection> {
        let account = self.client.request_account_access().await?;
        info!(target: "orchestrator", account = %account, "wallet session established");
        Ok(Connection {
            account,
            marketplace: self.config.marketplace_address,
            nft: self.config.nft_address,
        })
    }

    /// Enumerates tokens held by the connected account, in ledger index
    /// order. All-or-nothing: any read failure discards partial results.
    /// The result is a point-in-time snapshot; transfers landing
    /// mid-enumeration can shift indices.
    pub async fn owned_tokens(&self, conn: &Connection) -> Result<Vec<OwnedToken>> {
        match self.enumerate_owned(conn).await {
            Ok(tokens) => {
                self.metrics.enumerations.inc();
                Ok(tokens)
            }
            Err(err) => {
                self.metrics.enumeration_failures.inc();
                Err(err)
            }
        }
    }

    async fn enumerate_owned(&self, conn: &Connection) -> Result<Vec<OwnedToken>> {
        let balance = self.client.read_balance(conn.nft, conn.account).await?;
        let mut tokens = Vec::new();
        let mut index = U256::ZERO;
        while index < balance {
            let token_id = self
                .client
                .read_token_at_index(conn.nft, conn.account, index)
                .await?;
            let metadata_uri = self.client.read_metadata_uri(conn.nft, token_id).await?;
            tokens.push(OwnedToken {
                token_id,
                metadata_uri,
                owner: conn.account,
            });
            index += U256::from(1u8);
        }
        Ok(tokens)
    }

    /// Replays the historical `ItemListed` log, then admits only entries
    /// whose authoritative on-chain record is still active. Events are
    /// append-only history; a cancel or sale flips the flag without erasing
    /// the event, so the re-check is mandatory.
    pub async fn active_listings(&self, conn: &Connection) -> Result<Vec<Listing>> {
        match self.enumerate_listings(conn).await {
            Ok(out) => {
                self.metrics.enumerations.inc();
                Ok(out)
            }
            Err(err) => {
                self.metrics.enumeration_failures.inc();
                Err(err)
            }
        }
    }

    async fn enumerate_listings(&self, conn: &Connection) -> Result<Vec<Listing>> {
        let events = self.client.listed_events(conn.marketplace).await?;
        let keys = listings::candidate_keys(&events);
        let mut out = Vec::new();
        for key in keys {
            let state = self
                .client
                .read_listing(conn.marketplace, key.nft_contract, key.token_id)
                .await?;
            if !listings::is_surfaced(&state) {
                continue;
            }
            let metadata_uri = self
                .client
                .read_metadata_uri(key.nft_contract, key.token_id)
                .await?;
            out.push(Listing {
                token_id: key.token_id,
                seller: state.seller,
                price_wei: state.price_wei,
                metadata_uri,
            });
        }
        Ok(out)
    }

    /// Two-phase list-for-sale: approve the marketplace, await
    /// confirmation, then submit the listing at an exactly converted price.
    /// A failure after the approval confirms parks the saga at `Approved`;
    /// a retry skips re-approval. On success the active listings are
    /// refreshed and returned.
    pub async fn list_for_sale(
        &self,
        conn: &Connection,
        token_id: U256,
        price_major: Decimal,
    ) -> Result<Vec<Listing>> {
        // validated before any ledger traffic; an invalid price never
        // costs a write
        let price_wei = units::major_to_wei(price_major)?;
        self.track(token_id, ActionKind::List);
        let outcome = self.run_list_saga(conn, token_id, price_wei).await;
        self.untrack(token_id);
        outcome?;
        self.active_listings(conn).await
    }

    async fn run_list_saga(&self, conn: &Connection, token_id: U256, price_wei: U256) -> Result<()> {
        let parked = self
            .sagas
            .entry(token_id)
            .is_some_and(|e| e.phase == ListPhase::Approved);
        let approved = parked
            || self.client.read_approved(conn.nft, token_id).await? == conn.marketplace;

        if approved {
            if parked {
                info!(
                    target: "orchestrator",
                    token_id = %token_id,
                    "resuming approved-but-unlisted saga"
                );
            }
            self.sagas.park(token_id, price_wei);
        } else {
            self.sagas.begin(token_id, price_wei);
            let approve = ContractCall {
                contract: conn.nft,
                method: MethodCall::Approve {
                    spender: conn.marketplace,
                    token_id,
                },
                value: None,
            };
            match self.write(conn, approve).await {
                Ok(receipt) => {
                    info!(
                        target: "orchestrator",
                        token_id = %token_id,
                        tx = %receipt.tx_hash,
                        "marketplace approval confirmed"
                    );
                    self.sagas.park(token_id, price_wei);
                }
                Err(err) => {
                    // nothing landed on chain; no intermediate state to keep
                    self.sagas.abort(token_id);
                    return Err(err);
                }
            }
        }

        self.sagas.advance_to_list(token_id);
        let list = ContractCall {
            contract: conn.marketplace,
            method: MethodCall::ListItem {
                nft_contract: conn.nft,
                token_id,
                price_wei,
            },
            value: None,
        };
        match self.write(conn, list).await {
            Ok(receipt) => {
                self.sagas.complete(token_id);
                info!(
                    target: "orchestrator",
                    token_id = %token_id,
                    price_wei = %price_wei,
                    tx = %receipt.tx_hash,
                    "listing confirmed"
                );
                Ok(())
            }
            Err(err) => {
                // approval holds on chain; park so a retry skips phase one
                self.sagas.park(token_id, price_wei);
                warn!(
                    target: "orchestrator",
                    token_id = %token_id,
                    error = %err,
                    "listing failed after approval; token left approved but unlisted"
                );
                Err(err)
            }
        }
    }

    /// Submits a purchase with exactly `price_wei` attached. Price and
    /// active-flag validation belong to the contract; a mismatch surfaces
    /// as `TransactionReverted`, never a silent adjustment. On success both
    /// enumerations are refreshed: the buyer's holdings changed.
    pub async fn buy(
        &self,
        conn: &Connection,
        token_id: U256,
        price_wei: U256,
    ) -> Result<MarketSnapshot> {
        self.track(token_id, ActionKind::Buy);
        let call = ContractCall {
            contract: conn.marketplace,
            method: MethodCall::BuyItem {
                nft_contract: conn.nft,
                token_id,
            },
            value: Some(price_wei),
        };
        let outcome = self.write(conn, call).await;
        self.untrack(token_id);
        let receipt = outcome?;
        info!(
            target: "orchestrator",
            token_id = %token_id,
            price_wei = %price_wei,
            tx = %receipt.tx_hash,
            "purchase confirmed"
        );
        Ok(MarketSnapshot {
            listings: self.active_listings(conn).await?,
            owned: self.owned_tokens(conn).await?,
        })
    }

    /// Withdraws an active listing. Also the seller-side recovery for a
    /// token parked approved-but-unlisted that should not be re-listed.
    pub async fn cancel_listing(&self, conn: &Connection, token_id: U256) -> Result<Vec<Listing>> {
        self.track(token_id, ActionKind::Cancel);
        let call = ContractCall {
            contract: conn.marketplace,
            method: MethodCall::CancelListing {
                nft_contract: conn.nft,
                token_id,
            },
            value: None,
        };
        let outcome = self.write(conn, call).await;
        self.untrack(token_id);
        let receipt = outcome?;
        self.sagas.complete(token_id);
        info!(
            target: "orchestrator",
            token_id = %token_id,
            tx = %receipt.tx_hash,
            "listing cancelled"
        );
        self.active_listings(conn).await
    }

    async fn write(&self, conn: &Connection, call: ContractCall) -> Result<TxReceipt> {
        self.metrics.txs_submitted.inc();
        let handle = match self.client.submit(conn.account, call).await {
            Ok(handle) => handle,
            Err(err) => {
                self.metrics.txs_failed.inc();
                return Err(err);
            }
        };
        match handle.confirmed().await {
            Ok(receipt) => {
                self.metrics.txs_confirmed.inc();
                Ok(receipt)
            }
            Err(err) => {
                self.metrics.txs_failed.inc();
                Err(err)
            }
        }
    }

    fn track(&self, token_id: U256, kind: ActionKind) {
        self.pending.insert(token_id, PendingAction { kind, token_id });
        self.metrics.pending_actions.set(self.pending.len() as i64);
    }

    fn untrack(&self, token_id: U256) {
        self.pending.remove(&token_id);
        self.metrics.pending_actions.set(self.pending.len() as i64);
    }

    /// Advisory in-flight action for a token, for UI display. Not enforced
    /// against concurrent callers.
    pub fn pending_action(&self, token_id: U256) -> Option<PendingAction> {
        self.pending.get(&token_id).map(|e| *e.value())
    }

    /// Sagas parked approved-but-unlisted, for the UI to offer retry or
    /// cancellation.
    pub fn recoverable_sagas(&self) -> Vec<(U256, crate::saga::ListSagaEntry)> {
        self.sagas.recoverable()
    }
}
