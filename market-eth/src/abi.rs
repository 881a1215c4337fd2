use alloy_primitives::{Address, B256, U256};
use alloy_sol_types::{sol, SolCall, SolEvent};
use anyhow::{bail, Context, Result};
use market_core::model::{ListedEvent, ListingState};
use market_core::ports::MethodCall;

sol! {
    function approve(address to, uint256 tokenId);
    function balanceOf(address owner) returns (uint256);
    function tokenOfOwnerByIndex(address owner, uint256 index) returns (uint256);
    function tokenURI(uint256 tokenId) returns (string);
    function getApproved(uint256 tokenId) returns (address);
}

sol! {
    function listItem(address nftContract, uint256 tokenId, uint256 price);
    function buyItem(address nftContract, uint256 tokenId);
    function cancelListing(address nftContract, uint256 tokenId);
    function listings(address nftContract, uint256 tokenId) returns (uint256 price, address seller, bool isActive);

    event ItemListed(address indexed nftContract, uint256 indexed tokenId, address indexed seller, uint256 price);
    event ItemSold(address indexed nftContract, uint256 indexed tokenId, address indexed buyer, address seller, uint256 price);
}

pub fn encode_method(method: &MethodCall) -> Vec<u8> {
    match *method {
        MethodCall::Approve { spender, token_id } => approveCall {
            to: spender,
            tokenId: token_id,
        }
        .abi_encode(),
        MethodCall::ListItem {
            nft_contract,
            token_id,
            price_wei,
        } => listItemCall {
            nftContract: nft_contract,
            tokenId: token_id,
            price: price_wei,
        }
        .abi_encode(),
        MethodCall::BuyItem {
            nft_contract,
            token_id,
        } => buyItemCall {
            nftContract: nft_contract,
            tokenId: token_id,
        }
        .abi_encode(),
        MethodCall::CancelListing {
            nft_contract,
            token_id,
        } => cancelListingCall {
            nftContract: nft_contract,
            tokenId: token_id,
        }
        .abi_encode(),
    }
}

pub fn encode_balance_of(owner: Address) -> Vec<u8> {
    balanceOfCall { owner }.abi_encode()
}

pub fn encode_token_of_owner_by_index(owner: Address, index: U256) -> Vec<u8> {
    tokenOfOwnerByIndexCall { owner, index }.abi_encode()
}

pub fn encode_token_uri(token_id: U256) -> Vec<u8> {
    tokenURICall { tokenId: token_id }.abi_encode()
}

pub fn encode_get_approved(token_id: U256) -> Vec<u8> {
    getApprovedCall { tokenId: token_id }.abi_encode()
}

pub fn encode_listings(nft_contract: Address, token_id: U256) -> Vec<u8> {
    listingsCall {
        nftContract: nft_contract,
        tokenId: token_id,
    }
    .abi_encode()
}

pub fn decode_uint(data: &[u8]) -> Result<U256> {
    Ok(balanceOfCall::abi_decode_returns(data, true)
        .context("decode uint256 return")?
        ._0)
}

pub fn decode_string(data: &[u8]) -> Result<String> {
    Ok(tokenURICall::abi_decode_returns(data, true)
        .context("decode string return")?
        ._0)
}

pub fn decode_address(data: &[u8]) -> Result<Address> {
    Ok(getApprovedCall::abi_decode_returns(data, true)
        .context("decode address return")?
        ._0)
}

/// The `listings` record decoded word by word so the active flag keeps its
/// strict semantics: only a word equal to exactly 1 counts as active. Any
/// other non-zero sentinel is reported via `malformed_flag` so the caller
/// can log it; the record itself is treated as inactive either way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawListing {
    pub state: ListingState,
    pub malformed_flag: Option<U256>,
}

pub fn decode_listing(data: &[u8]) -> Result<RawListing> {
    if data.len() < 96 {
        bail!("listings return too short: {} bytes", data.len());
    }
    let price_wei = U256::from_be_slice(&data[0..32]);
    let seller = Address::from_slice(&data[44..64]);
    let flag = U256::from_be_slice(&data[64..96]);
    let is_active = flag == U256::from(1u8);
    let malformed_flag = (!is_active && flag != U256::ZERO).then_some(flag);
    Ok(RawListing {
        state: ListingState {
            price_wei,
            seller,
            is_active,
        },
        malformed_flag,
    })
}

pub fn listed_event_topic() -> B256 {
    ItemListed::SIGNATURE_HASH
}

pub fn decode_listed_log(topics: &[B256], data: &[u8]) -> Result<ListedEvent> {
    let ev = ItemListed::decode_raw_log(topics.iter().copied(), data, true)
        .context("decode ItemListed log")?;
    Ok(ListedEvent {
        nft_contract: ev.nftContract,
        token_id: ev.tokenId,
        seller: ev.seller,
        price_wei: ev.price,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_sol_types::SolValue;

    #[test]
    fn selectors_match_the_deployed_abi() {
        // well-known ERC-721 selectors
        assert_eq!(approveCall::SELECTOR, [0x09, 0x5e, 0xa7, 0xb3]);
        assert_eq!(balanceOfCall::SELECTOR, [0x70, 0xa0, 0x82, 0x31]);
        assert_eq!(tokenOfOwnerByIndexCall::SELECTOR, [0x2f, 0x74, 0x5c, 0x59]);
        assert_eq!(tokenURICall::SELECTOR, [0xc8, 0x7b, 0x56, 0xdd]);
    }

    #[test]
    fn approve_calldata_layout() {
        let spender = Address::repeat_byte(0x11);
        let data = encode_method(&MethodCall::Approve {
            spender,
            token_id: U256::from(7u64),
        });
        assert_eq!(data.len(), 4 + 32 + 32);
        assert_eq!(&data[0..4], approveCall::SELECTOR.as_slice());
        assert_eq!(U256::from_be_slice(&data[36..68]), U256::from(7u64));
    }

    #[test]
    fn buy_item_carries_no_price_argument() {
        // payment rides on the transaction value, not the calldata
        let data = encode_method(&MethodCall::BuyItem {
            nft_contract: Address::repeat_byte(0x22),
            token_id: U256::from(7u64),
        });
        assert_eq!(data.len(), 4 + 32 + 32);
    }

    #[test]
    fn listing_record_decodes_strictly() {
        let seller = Address::repeat_byte(0xbb);
        let mut data = Vec::new();
        data.extend_from_slice(&U256::from(1_500u64).to_be_bytes::<32>());
        data.extend_from_slice(seller.into_word().as_slice());
        data.extend_from_slice(&U256::from(1u8).to_be_bytes::<32>());

        let raw = decode_listing(&data).expect("decode");
        assert!(raw.state.is_active);
        assert!(raw.malformed_flag.is_none());
        assert_eq!(raw.state.price_wei, U256::from(1_500u64));
        assert_eq!(raw.state.seller, seller);
    }

    #[test]
    fn nonzero_sentinel_flag_is_inactive_and_reported() {
        let mut data = Vec::new();
        data.extend_from_slice(&U256::from(10u64).to_be_bytes::<32>());
        data.extend_from_slice(Address::repeat_byte(0xbb).into_word().as_slice());
        data.extend_from_slice(&U256::from(2u8).to_be_bytes::<32>());

        let raw = decode_listing(&data).expect("decode");
        assert!(!raw.state.is_active);
        assert_eq!(raw.malformed_flag, Some(U256::from(2u8)));
    }

    #[test]
    fn short_listing_record_is_an_error() {
        assert!(decode_listing(&[0u8; 64]).is_err());
    }

    #[test]
    fn listed_log_round_trips() {
        let nft = Address::repeat_byte(0x22);
        let seller = Address::repeat_byte(0xbb);
        let token = U256::from(42u64);
        let price = U256::from(1_000u64);

        let topics = [
            listed_event_topic(),
            nft.into_word(),
            B256::from(token),
            seller.into_word(),
        ];
        let data = price.abi_encode();

        let ev = decode_listed_log(&topics, &data).expect("decode log");
        assert_eq!(ev.nft_contract, nft);
        assert_eq!(ev.token_id, token);
        assert_eq!(ev.seller, seller);
        assert_eq!(ev.price_wei, price);
    }
}
