use std::sync::Arc;
use std::time::Duration;

use alloy_primitives::{hex, Address, B256, U256};
use async_trait::async_trait;
use prometheus::Registry;
use serde_json::{json, Value};
use tracing::{info, warn};

use market_core::error::{MarketError, Result};
use market_core::model::{ListedEvent, ListingState, TxReceipt};
use market_core::ports::{ContractCall, LedgerClient, TxHandle};

use crate::abi;
use crate::rpc::{EthConfig, RpcFailure, RpcPool};

// EIP-1193 provider error for a user-rejected request
const USER_REJECTED: i64 = 4001;
const METHOD_NOT_FOUND: i64 = -32601;

/// [`LedgerClient`] over a wallet-style JSON-RPC provider. Reads go out as
/// `eth_call`, the event log via `eth_getLogs`, and writes as
/// `eth_sendTransaction` — the provider holds the key and signs, exactly
/// like a browser wallet; this client never sees a private key.
pub struct EthLedgerClient {
    pool: Arc<RpcPool>,
    cfg: EthConfig,
}

impl EthLedgerClient {
    pub fn new(cfg: EthConfig, registry: &Registry) -> anyhow::Result<Self> {
        let pool = Arc::new(RpcPool::new(&cfg, registry)?);
        Ok(Self { pool, cfg })
    }

    async fn eth_call(&self, to: Address, data: Vec<u8>) -> Result<Vec<u8>> {
        let params = json!([
            { "to": format!("{to:#x}"), "data": hex::encode_prefixed(&data) },
            "latest",
        ]);
        let result = self
            .pool
            .call("eth_call", params)
            .await
            .map_err(read_error)?;
        let raw = result
            .as_str()
            .ok_or_else(|| MarketError::LedgerRead("eth_call result is not a string".into()))?;
        hex::decode(raw).map_err(|err| MarketError::LedgerRead(format!("decode eth_call result: {err}")))
    }
}

#[async_trait]
impl LedgerClient for EthLedgerClient {
    async fn request_account_access(&self) -> Result<Address> {
        let chain = self
            .pool
            .call("eth_chainId", json!([]))
            .await
            .map_err(|err| match err {
                RpcFailure::Transport(_) => MarketError::ProviderUnavailable,
                RpcFailure::Rpc(obj) => MarketError::LedgerRead(obj.to_string()),
            })?;
        let chain_id = parse_quantity(&chain)
            .ok_or_else(|| MarketError::LedgerRead("malformed eth_chainId result".into()))?;
        if chain_id != self.cfg.chain_id {
            return Err(MarketError::Configuration(format!(
                "provider is on chain {chain_id}, configured for {}",
                self.cfg.chain_id
            )));
        }

        let accounts = match self.pool.call("eth_requestAccounts", json!([])).await {
            Ok(v) => v,
            // node providers without the wallet surface expose eth_accounts
            Err(RpcFailure::Rpc(obj)) if obj.code == METHOD_NOT_FOUND => self
                .pool
                .call("eth_accounts", json!([]))
                .await
                .map_err(access_error)?,
            Err(err) => return Err(access_error(err)),
        };
        let first = accounts
            .as_array()
            .and_then(|a| a.first())
            .and_then(|v| v.as_str())
            .ok_or(MarketError::AuthorizationDenied)?;
        let account = first.parse::<Address>().map_err(|err| {
            MarketError::LedgerRead(format!("provider returned invalid account: {err}"))
        })?;
        info!(target: "eth", account = %account, chain_id = chain_id, "account access granted");
        Ok(account)
    }

    async fn read_balance(&self, contract: Address, owner: Address) -> Result<U256> {
        let data = self.eth_call(contract, abi::encode_balance_of(owner)).await?;
        abi::decode_uint(&data).map_err(|err| MarketError::LedgerRead(err.to_string()))
    }

    async fn read_token_at_index(
        &self,
        contract: Address,
        owner: Address,
        index: U256,
    ) -> Result<U256> {
        let data = self
            .eth_call(contract, abi::encode_token_of_owner_by_index(owner, index))
            .await?;
        abi::decode_uint(&data).map_err(|err| MarketError::LedgerRead(err.to_string()))
    }

    async fn read_metadata_uri(&self, contract: Address, token_id: U256) -> Result<String> {
        let data = self.eth_call(contract, abi::encode_token_uri(token_id)).await?;
        abi::decode_string(&data).map_err(|err| MarketError::LedgerRead(err.to_string()))
    }

    async fn read_listing(
        &self,
        marketplace: Address,
        nft_contract: Address,
        token_id: U256,
    ) -> Result<ListingState> {
        let data = self
            .eth_call(marketplace, abi::encode_listings(nft_contract, token_id))
            .await?;
        let raw = abi::decode_listing(&data).map_err(|err| MarketError::LedgerRead(err.to_string()))?;
        if let Some(flag) = raw.malformed_flag {
            warn!(
                target: "eth",
                token_id = %token_id,
                flag = %flag,
                "non-boolean active flag; treating listing as inactive"
            );
        }
        Ok(raw.state)
    }

    async fn read_approved(&self, contract: Address, token_id: U256) -> Result<Address> {
        let data = self
            .eth_call(contract, abi::encode_get_approved(token_id))
            .await?;
        abi::decode_address(&data).map_err(|err| MarketError::LedgerRead(err.to_string()))
    }

    async fn listed_events(&self, marketplace: Address) -> Result<Vec<ListedEvent>> {
        let params = json!([{
            "address": format!("{marketplace:#x}"),
            "fromBlock": "0x0",
            "toBlock": "latest",
            "topics": [format!("{:#x}", abi::listed_event_topic())],
        }]);
        let result = self
            .pool
            .call("eth_getLogs", params)
            .await
            .map_err(read_error)?;
        let logs = result
            .as_array()
            .ok_or_else(|| MarketError::LedgerRead("eth_getLogs result is not an array".into()))?;

        let mut events = Vec::with_capacity(logs.len());
        for log in logs {
            let topics = log
                .get("topics")
                .and_then(|v| v.as_array())
                .ok_or_else(|| MarketError::LedgerRead("log without topics".into()))?
                .iter()
                .map(|t| {
                    t.as_str()
                        .and_then(|s| s.parse::<B256>().ok())
                        .ok_or_else(|| MarketError::LedgerRead("malformed log topic".into()))
                })
                .collect::<Result<Vec<B256>>>()?;
            let data = log
                .get("data")
                .and_then(|v| v.as_str())
                .map(hex::decode)
                .transpose()
                .map_err(|err| MarketError::LedgerRead(format!("malformed log data: {err}")))?
                .unwrap_or_default();
            let event = abi::decode_listed_log(&topics, &data)
                .map_err(|err| MarketError::LedgerRead(err.to_string()))?;
            events.push(event);
        }
        Ok(events)
    }

    async fn submit(&self, from: Address, call: ContractCall) -> Result<Box<dyn TxHandle>> {
        let mut tx = json!({
            "from": format!("{from:#x}"),
            "to": format!("{:#x}", call.contract),
            "data": hex::encode_prefixed(abi::encode_method(&call.method)),
        });
        if let Some(value) = call.value {
            tx["value"] = Value::String(format!("{value:#x}"));
        }
        let result = self
            .pool
            .call("eth_sendTransaction", json!([tx]))
            .await
            .map_err(write_error)?;
        let tx_hash = result
            .as_str()
            .and_then(|s| s.parse::<B256>().ok())
            .ok_or_else(|| MarketError::LedgerWrite("provider returned no transaction hash".into()))?;
        info!(target: "eth", tx = %tx_hash, to = %call.contract, "transaction submitted");
        Ok(Box::new(EthTxHandle {
            pool: self.pool.clone(),
            tx_hash,
            poll: Duration::from_millis(self.cfg.receipt_poll_ms.max(1)),
        }))
    }
}

/// Receipt-polling confirmation handle. Polls until the ledger resolves
/// the transaction one way or the other; imposes no deadline of its own.
pub struct EthTxHandle {
    pool: Arc<RpcPool>,
    tx_hash: B256,
    poll: Duration,
}

#[async_trait]
impl TxHandle for EthTxHandle {
    async fn confirmed(self: Box<Self>) -> Result<TxReceipt> {
        loop {
            let result = self
                .pool
                .call(
                    "eth_getTransactionReceipt",
                    json!([format!("{:#x}", self.tx_hash)]),
                )
                .await
                .map_err(|err| MarketError::LedgerWrite(err.to_string()))?;
            if result.is_null() {
                tokio::time::sleep(self.poll).await;
                continue;
            }
            let block_number = result
                .get("blockNumber")
                .and_then(parse_quantity)
                .unwrap_or(0);
            let status = result.get("status").and_then(|v| v.as_str());
            return if status == Some("0x1") {
                Ok(TxReceipt {
                    tx_hash: self.tx_hash,
                    block_number,
                })
            } else {
                Err(MarketError::TransactionReverted(format!(
                    "transaction {:#x} reverted in block {block_number}",
                    self.tx_hash
                )))
            };
        }
    }
}

fn read_error(err: RpcFailure) -> MarketError {
    MarketError::LedgerRead(err.to_string())
}

fn write_error(err: RpcFailure) -> MarketError {
    match err {
        RpcFailure::Rpc(obj) if obj.code == USER_REJECTED => {
            MarketError::TransactionRejected(obj.message)
        }
        RpcFailure::Rpc(obj) if is_revert(&obj) => MarketError::TransactionReverted(obj.message),
        other => MarketError::LedgerWrite(other.to_string()),
    }
}

fn is_revert(obj: &crate::rpc::RpcErrorObject) -> bool {
    // geth surfaces reverts as code 3; others only in the message
    obj.code == 3 || obj.message.to_ascii_lowercase().contains("revert")
}

fn access_error(err: RpcFailure) -> MarketError {
    match err {
        RpcFailure::Rpc(obj) if obj.code == USER_REJECTED => MarketError::AuthorizationDenied,
        RpcFailure::Transport(_) => MarketError::ProviderUnavailable,
        RpcFailure::Rpc(obj) => MarketError::LedgerRead(obj.to_string()),
    }
}

fn parse_quantity(value: &Value) -> Option<u64> {
    let s = value.as_str()?;
    u64::from_str_radix(s.trim_start_matches("0x"), 16).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpc::RpcErrorObject;

    fn rpc(code: i64, message: &str) -> RpcFailure {
        RpcFailure::Rpc(RpcErrorObject {
            code,
            message: message.to_string(),
        })
    }

    #[test]
    fn user_rejection_is_not_a_revert() {
        let err = write_error(rpc(USER_REJECTED, "User denied transaction signature"));
        assert!(matches!(err, MarketError::TransactionRejected(_)));
    }

    #[test]
    fn contract_rejection_is_a_revert() {
        for failure in [
            rpc(3, "execution reverted: NotOwner"),
            rpc(-32000, "execution reverted"),
        ] {
            assert!(matches!(
                write_error(failure),
                MarketError::TransactionReverted(_)
            ));
        }
    }

    #[test]
    fn network_failure_is_a_write_error() {
        let err = write_error(RpcFailure::Transport(anyhow::anyhow!("connection refused")));
        assert!(matches!(err, MarketError::LedgerWrite(_)));
    }

    #[test]
    fn denied_access_maps_per_failure_kind() {
        assert!(matches!(
            access_error(rpc(USER_REJECTED, "User rejected the request")),
            MarketError::AuthorizationDenied
        ));
        assert!(matches!(
            access_error(RpcFailure::Transport(anyhow::anyhow!("no route to host"))),
            MarketError::ProviderUnavailable
        ));
    }

    #[test]
    fn quantities_parse_from_hex() {
        assert_eq!(parse_quantity(&json!("0x89")), Some(137));
        assert_eq!(parse_quantity(&json!("0x0")), Some(0));
        assert_eq!(parse_quantity(&json!(137)), None);
    }

    #[tokio::test]
    #[ignore = "requires a wallet-enabled JSON-RPC node on localhost:8545"]
    async fn connects_to_local_node() {
        let client = EthLedgerClient::new(EthConfig::default(), &Registry::new()).expect("client");
        let account = client.request_account_access().await.expect("access");
        println!("connected as {account:#x}");
    }
}
