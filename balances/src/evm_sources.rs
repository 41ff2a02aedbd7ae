//! Contributors backed by an EVM chain: native balance and ERC-20 tokens.

use std::sync::Arc;

use async_trait::async_trait;
use ballast_evm::{decode_uint128, encode_balance_of, ChainReader};
use ballast_types::{WalletAddress, Weight, WEIGHT_DECIMALS};

use crate::{BalanceError, WeightContributor};

/// Native-asset balance on one chain.
pub struct NativeBalance {
    reader: Arc<dyn ChainReader>,
    name: String,
}

impl NativeBalance {
    pub fn new(reader: Arc<dyn ChainReader>) -> Self {
        let name = format!("native:{}", reader.chain_name());
        Self { reader, name }
    }
}

#[async_trait]
impl WeightContributor for NativeBalance {
    fn name(&self) -> &str {
        &self.name
    }

    async fn contribute(&self, wallet: &WalletAddress) -> Result<Weight, BalanceError> {
        let raw = self
            .reader
            .native_balance(wallet)
            .await
            .map_err(|e| BalanceError::from_evm(&self.name, e))?;
        Ok(Weight::from_wei(raw))
    }
}

/// ERC-20 `balanceOf` on one chain, rescaled from the token's decimals.
pub struct TokenBalance {
    reader: Arc<dyn ChainReader>,
    token: WalletAddress,
    decimals: u32,
    name: String,
}

impl TokenBalance {
    pub fn new(
        reader: Arc<dyn ChainReader>,
        symbol: &str,
        token: WalletAddress,
        decimals: u32,
    ) -> Self {
        let name = format!("{symbol}:{}", reader.chain_name());
        Self {
            reader,
            token,
            decimals,
            name,
        }
    }

    pub fn token(&self) -> &WalletAddress {
        &self.token
    }
}

#[async_trait]
impl WeightContributor for TokenBalance {
    fn name(&self) -> &str {
        &self.name
    }

    async fn contribute(&self, wallet: &WalletAddress) -> Result<Weight, BalanceError> {
        let output = self
            .reader
            .call(&self.token, &encode_balance_of(wallet))
            .await
            .map_err(|e| BalanceError::from_evm(&self.name, e))?;
        let raw = decode_uint128(&output).map_err(|e| BalanceError::from_evm(&self.name, e))?;
        normalize(raw, self.decimals)
    }
}

/// Rescale a raw token amount with `decimals` to the 18-decimal weight unit.
pub fn normalize(raw: u128, decimals: u32) -> Result<Weight, BalanceError> {
    if decimals <= WEIGHT_DECIMALS {
        let factor = 10u128.pow(WEIGHT_DECIMALS - decimals);
        Weight::from_wei(raw)
            .checked_mul(factor)
            .ok_or(BalanceError::Overflow)
    } else {
        let divisor = 10u128
            .checked_pow(decimals - WEIGHT_DECIMALS)
            .ok_or(BalanceError::Overflow)?;
        Ok(Weight::from_wei(raw / divisor))
    }
}
