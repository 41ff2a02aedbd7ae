//! Nullable contract caller for contract-wallet signature checks.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use ballast_evm::{ContractCaller, EvmError, ERC1271_MAGIC_VALUE};
use ballast_types::WalletAddress;

use crate::lock;

/// Answers `isValidSignature` calls for registered contract wallets.
///
/// A registered wallet returns the magic value for each accepted digest and
/// zero otherwise; unregistered addresses behave like accounts without code.
#[derive(Default)]
pub struct NullContractCaller {
    accepted: Mutex<HashMap<WalletAddress, HashSet<[u8; 32]>>>,
    unreachable: AtomicBool,
    calls: AtomicU32,
}

impl NullContractCaller {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `wallet` a contract wallet that accepts signatures over `digest`.
    pub fn accept(&self, wallet: WalletAddress, digest: [u8; 32]) {
        lock(&self.accepted).entry(wallet).or_default().insert(digest);
    }

    /// Fail every call with a timeout.
    pub fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.store(unreachable, Ordering::SeqCst);
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContractCaller for NullContractCaller {
    async fn call(&self, to: &WalletAddress, data: &[u8]) -> Result<Vec<u8>, EvmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(EvmError::Timeout);
        }
        let accepted = lock(&self.accepted);
        let Some(digests) = accepted.get(to) else {
            return Ok(Vec::new());
        };
        let mut out = vec![0u8; 32];
        if data.len() >= 36 && data[..4] == ERC1271_MAGIC_VALUE {
            let mut digest = [0u8; 32];
            digest.copy_from_slice(&data[4..36]);
            if digests.contains(&digest) {
                out[..4].copy_from_slice(&ERC1271_MAGIC_VALUE);
            }
        }
        Ok(out)
    }
}
