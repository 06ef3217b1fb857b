//! Collateral asset registry.
//!
//! The registry is fixed at engine construction. Registration order is
//! preserved and is the order collateral values are summed in.

use alloy::primitives::Address;
use std::collections::HashMap;
use std::sync::Arc;
use synth_chain::CollateralToken;

use crate::error::{EngineError, Result};

/// A registered collateral asset.
#[derive(Debug, Clone)]
pub struct Asset {
    /// Token contract address (the asset identifier)
    pub address: Address,
    /// Oracle reference pricing this asset in USD
    pub price_feed: Address,
    /// Transfer capability
    pub token: Arc<dyn CollateralToken>,
}

/// Ordered registry of collateral assets with lookup by address.
#[derive(Debug, Clone, Default)]
pub struct AssetRegistry {
    assets: Vec<Asset>,
    by_address: HashMap<Address, usize>,
}

impl AssetRegistry {
    /// Build the registry from parallel token and price-feed lists.
    pub fn new(tokens: Vec<Arc<dyn CollateralToken>>, price_feeds: Vec<Address>) -> Result<Self> {
        if tokens.len() != price_feeds.len() {
            return Err(EngineError::LengthMismatch {
                tokens: tokens.len(),
                feeds: price_feeds.len(),
            });
        }

        let mut assets = Vec::with_capacity(tokens.len());
        let mut by_address = HashMap::with_capacity(tokens.len());

        for (token, price_feed) in tokens.into_iter().zip(price_feeds) {
            let address = token.address();
            if by_address.insert(address, assets.len()).is_some() {
                return Err(EngineError::DuplicateAsset(address));
            }
            assets.push(Asset {
                address,
                price_feed,
                token,
            });
        }

        Ok(Self { assets, by_address })
    }

    /// Get asset by token address.
    pub fn get(&self, asset: &Address) -> Option<&Asset> {
        self.by_address.get(asset).map(|&i| &self.assets[i])
    }

    /// Get asset by token address, failing for unregistered assets.
    pub fn require(&self, asset: &Address) -> Result<&Asset> {
        self.get(asset).ok_or(EngineError::TokenNotAllowed(*asset))
    }

    /// Oracle reference for an asset, or the zero address if unregistered.
    pub fn price_feed(&self, asset: &Address) -> Address {
        self.get(asset).map(|a| a.price_feed).unwrap_or(Address::ZERO)
    }

    /// Asset addresses in registration order.
    pub fn addresses(&self) -> Vec<Address> {
        self.assets.iter().map(|a| a.address).collect()
    }

    /// Iterate assets in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Asset> {
        self.assets.iter()
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use synth_chain::MemoryCollateralToken;

    fn token(byte: u8) -> Arc<dyn CollateralToken> {
        Arc::new(MemoryCollateralToken::new(
            format!("T{byte}"),
            Address::repeat_byte(byte),
            Address::ZERO,
        ))
    }

    #[test]
    fn test_registry_lookup() {
        let registry = AssetRegistry::new(
            vec![token(1), token(2)],
            vec![Address::repeat_byte(0xf1), Address::repeat_byte(0xf2)],
        )
        .unwrap();

        assert_eq!(registry.len(), 2);
        assert_eq!(
            registry.addresses(),
            vec![Address::repeat_byte(1), Address::repeat_byte(2)]
        );
        assert_eq!(
            registry.price_feed(&Address::repeat_byte(2)),
            Address::repeat_byte(0xf2)
        );
        assert!(registry.require(&Address::repeat_byte(1)).is_ok());
    }

    #[test]
    fn test_unregistered_asset() {
        let registry = AssetRegistry::new(vec![token(1)], vec![Address::repeat_byte(0xf1)]).unwrap();
        let unknown = Address::repeat_byte(9);

        assert_eq!(registry.price_feed(&unknown), Address::ZERO);
        assert_eq!(
            registry.require(&unknown).unwrap_err(),
            EngineError::TokenNotAllowed(unknown)
        );
    }

    #[test]
    fn test_length_mismatch() {
        let err = AssetRegistry::new(vec![token(1), token(2)], vec![Address::ZERO]).unwrap_err();
        assert_eq!(err, EngineError::LengthMismatch { tokens: 2, feeds: 1 });
    }

    #[test]
    fn test_duplicate_asset() {
        let err = AssetRegistry::new(vec![token(1), token(1)], vec![Address::ZERO, Address::ZERO])
            .unwrap_err();
        assert_eq!(err, EngineError::DuplicateAsset(Address::repeat_byte(1)));
    }
}
