use std::sync::Arc;

use ballast_crypto::{personal_message_hash, recover_signer};
use ballast_evm::{encode_is_valid_signature, is_magic_value, ContractCaller};
use ballast_types::WalletAddress;
use tracing::{debug, warn};

use crate::AuthError;

/// Which proof scheme accepted a signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthScheme {
    DirectKey,
    ContractWallet,
}

/// Checks vote signatures. Schemes are tried in order; the first success wins.
pub struct SignatureVerifier {
    caller: Arc<dyn ContractCaller>,
}

impl SignatureVerifier {
    pub fn new(caller: Arc<dyn ContractCaller>) -> Self {
        Self { caller }
    }

    /// `true` when `signature` authorizes `message` for `wallet`.
    pub async fn verify(&self, message: &str, signature: &[u8], wallet: &WalletAddress) -> bool {
        self.authorize(message, signature, wallet).await.is_ok()
    }

    /// Like [`verify`](Self::verify) but reports the accepting scheme, or
    /// why both schemes rejected the signature. A transient failure of the
    /// contract call is [`AuthError::Unavailable`], not a rejection.
    pub async fn authorize(
        &self,
        message: &str,
        signature: &[u8],
        wallet: &WalletAddress,
    ) -> Result<AuthScheme, AuthError> {
        if signature.is_empty() {
            return Err(AuthError::EmptySignature);
        }

        let direct = match recover_signer(message.as_bytes(), signature) {
            Ok(signer) if signer == *wallet => return Ok(AuthScheme::DirectKey),
            Ok(signer) => format!("recovered {signer}"),
            Err(e) => e.to_string(),
        };

        let digest = personal_message_hash(message.as_bytes());
        let call_data = encode_is_valid_signature(&digest, signature);
        let contract = match self.caller.call(wallet, &call_data).await {
            Ok(output) if is_magic_value(&output) => {
                debug!(wallet = %wallet, "accepted contract-wallet signature");
                return Ok(AuthScheme::ContractWallet);
            }
            Ok(output) if output.is_empty() => "no contract code".to_string(),
            Ok(_) => "magic value not returned".to_string(),
            Err(e) if e.is_transient() => {
                warn!(wallet = %wallet, error = %e, "isValidSignature call unavailable");
                return Err(AuthError::Unavailable(e));
            }
            Err(e) => {
                debug!(wallet = %wallet, error = %e, "isValidSignature call failed");
                e.to_string()
            }
        };

        Err(AuthError::Unauthorized { direct, contract })
    }
}
