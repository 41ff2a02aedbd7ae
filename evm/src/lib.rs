//! Minimal EVM JSON-RPC access for ballast.
//!
//! Only the handful of calls the ledger needs are implemented:
//! `eth_getBalance`, and `eth_call` for ERC-20 `balanceOf` and
//! ERC-1271 `isValidSignature`.

pub mod abi;
pub mod client;
pub mod error;
pub mod hex_quantity;

pub use abi::{
    decode_uint128, encode_balance_of, encode_is_valid_signature, is_magic_value, BALANCE_OF_SELECTOR,
    ERC1271_MAGIC_VALUE,
};
pub use client::{ChainReader, ContractCaller, EvmRpcClient};
pub use error::EvmError;
