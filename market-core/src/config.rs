use std::path::Path;

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::error::{MarketError, Result};

/// Fixed-at-startup contract bindings. Both addresses are required,
/// chain-specific, and fatal to get wrong; there is no recovery path for a
/// missing or malformed address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketConfig {
    pub marketplace_address: Address,
    pub nft_address: Address,
}

impl MarketConfig {
    pub fn new(marketplace: &str, nft: &str) -> Result<Self> {
        let marketplace_address = parse_address("marketplace_address", marketplace)?;
        let nft_address = parse_address("nft_address", nft)?;
        let cfg = Self {
            marketplace_address,
            nft_address,
        };
        cfg.validate()?;
        Ok(cfg)
    }

    pub async fn load(path: &Path) -> Result<Self> {
        let raw = fs::read(path).await.map_err(|err| {
            MarketError::Configuration(format!("read config file {}: {}", path.display(), err))
        })?;
        let cfg: Self = serde_json::from_slice(&raw)
            .map_err(|err| MarketError::Configuration(format!("parse config json: {}", err)))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.marketplace_address == Address::ZERO {
            return Err(MarketError::Configuration(
                "marketplace_address must not be the zero address".into(),
            ));
        }
        if self.nft_address == Address::ZERO {
            return Err(MarketError::Configuration(
                "nft_address must not be the zero address".into(),
            ));
        }
        Ok(())
    }
}

fn parse_address(field: &str, value: &str) -> Result<Address> {
    if value.trim().is_empty() {
        return Err(MarketError::Configuration(format!("{field} is empty")));
    }
    value
        .parse::<Address>()
        .map_err(|err| MarketError::Configuration(format!("{field} '{value}': {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    const MARKET: &str = "0x5FbDB2315678afecb367f032d93F642f64180aa3";
    const NFT: &str = "0xe7f1725E7734CE288F8367e1Bb143E90bb3F0512";

    #[test]
    fn parses_valid_addresses() {
        let cfg = MarketConfig::new(MARKET, NFT).expect("config");
        assert_ne!(cfg.marketplace_address, cfg.nft_address);
    }

    #[test]
    fn empty_address_is_fatal() {
        let err = MarketConfig::new("", NFT).unwrap_err();
        assert!(matches!(err, MarketError::Configuration(_)));
    }

    #[test]
    fn zero_address_is_fatal() {
        let zero = format!("{:#x}", Address::ZERO);
        let err = MarketConfig::new(MARKET, &zero).unwrap_err();
        assert!(matches!(err, MarketError::Configuration(_)));
    }

    #[test]
    fn malformed_address_is_fatal() {
        let err = MarketConfig::new("0x1234", NFT).unwrap_err();
        assert!(matches!(err, MarketError::Configuration(_)));
    }
}
