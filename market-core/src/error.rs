use thiserror::Error;

/// Every failure class the UI must be able to tell apart. "You rejected
/// this", "the contract rejected this" and "the network failed" are
/// distinct variants on purpose; nothing collapses them.
#[derive(Debug, Error)]
pub enum MarketError {
    #[error("no wallet provider reachable")]
    ProviderUnavailable,

    #[error("account authorization denied")]
    AuthorizationDenied,

    #[error("ledger read failed: {0}")]
    LedgerRead(String),

    #[error("ledger write failed: {0}")]
    LedgerWrite(String),

    #[error("transaction rejected by the signer: {0}")]
    TransactionRejected(String),

    #[error("transaction reverted: {0}")]
    TransactionReverted(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("invalid price: {0}")]
    InvalidPrice(String),
}

pub type Result<T> = std::result::Result<T, MarketError>;
