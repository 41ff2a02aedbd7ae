//! Shared harness: a vote ledger wired to nullable collaborators.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use ballast_balances::{RetryPolicy, WeightAggregator, WeightContributor};
use ballast_crypto::{address_from_secret, personal_message_hash, sign_personal_message};
use ballast_ledger::{LedgerConfig, VoteLedger, VoteSubmission};
use ballast_nullables::{NullClock, NullContractCaller, NullContributor};
use ballast_store::{LedgerStore, TallyStore, VoteStore};
use ballast_types::{Proposal, WalletAddress, Weight};
use ballast_verification::{canonical_message, SignatureVerifier};

pub struct Harness<S> {
    pub ledger: Arc<VoteLedger<S>>,
    pub store: Arc<S>,
    pub native: Arc<NullContributor>,
    pub token: Arc<NullContributor>,
    pub validators: Arc<NullContributor>,
    pub contracts: Arc<NullContractCaller>,
    pub clock: Arc<NullClock>,
}

pub fn w(s: &str) -> Weight {
    Weight::parse_decimal(s).unwrap()
}

/// 2.0 native + 1.5 token + one 32-unit validator = 35.5 for every wallet.
pub fn harness<S: LedgerStore + 'static>(store: Arc<S>) -> Harness<S> {
    harness_with(store, LedgerConfig::default())
}

pub fn harness_with<S: LedgerStore + 'static>(store: Arc<S>, config: LedgerConfig) -> Harness<S> {
    let native = Arc::new(NullContributor::new("native:ethereum", w("2.0")));
    let token = Arc::new(NullContributor::new("steth:ethereum", w("1.5")));
    let validators = Arc::new(NullContributor::new("beacon-validators", w("32")));
    let contributors: Vec<Arc<dyn WeightContributor>> =
        vec![native.clone(), token.clone(), validators.clone()];
    let weigher = Arc::new(WeightAggregator::new(
        contributors,
        RetryPolicy {
            max_attempts: 2,
            attempt_timeout: Duration::from_millis(500),
            backoff: Duration::from_millis(1),
        },
        1,
    ));
    let contracts = Arc::new(NullContractCaller::new());
    let verifier = Arc::new(SignatureVerifier::new(contracts.clone()));
    let clock = Arc::new(NullClock::new(1_700_000_000_000));
    let ledger = Arc::new(VoteLedger::new(
        store.clone(),
        weigher,
        verifier,
        clock.clone(),
        config,
    ));
    Harness {
        ledger,
        store,
        native,
        token,
        validators,
        contracts,
        clock,
    }
}

impl<S> Harness<S> {
    /// Give `wallet` exactly `weight` (all from the native source).
    pub fn set_weight(&self, wallet: WalletAddress, weight: Weight) {
        self.native.set_wallet_weight(wallet, weight);
        self.token.set_wallet_weight(wallet, Weight::ZERO);
        self.validators.set_wallet_weight(wallet, Weight::ZERO);
    }

    pub fn lookups(&self) -> u32 {
        self.native.calls() + self.token.calls() + self.validators.calls()
    }
}

/// A deterministic key-pair wallet.
pub struct KeyWallet {
    secret: [u8; 32],
    pub address: WalletAddress,
}

impl KeyWallet {
    pub fn new(seed: u16) -> Self {
        let mut secret = [0x11u8; 32];
        secret[0] = 0x01;
        secret[30..].copy_from_slice(&seed.to_be_bytes());
        let address = address_from_secret(&secret).unwrap();
        Self { secret, address }
    }

    pub fn sign(&self, proposal: &Proposal, option: &str) -> Vec<u8> {
        let message = canonical_message(&proposal.description, option);
        sign_personal_message(&self.secret, message.as_bytes())
            .unwrap()
            .to_vec()
    }

    pub fn vote(&self, proposal: &Proposal, option: &str) -> VoteSubmission {
        VoteSubmission {
            proposal_id: proposal.id,
            wallet: self.address,
            option: option.to_string(),
            signature: self.sign(proposal, option),
        }
    }
}

/// Register `wallet` as a contract wallet accepting votes for `option`.
pub fn deploy_contract_wallet(
    contracts: &NullContractCaller,
    wallet: WalletAddress,
    proposal: &Proposal,
    option: &str,
) {
    let message = canonical_message(&proposal.description, option);
    contracts.accept(wallet, personal_message_hash(message.as_bytes()));
}

pub async fn binary_proposal<S: LedgerStore + 'static>(h: &Harness<S>) -> Proposal {
    h.ledger
        .create_proposal("P1", &["YES".to_string(), "NO".to_string()])
        .await
        .unwrap()
}

/// Tally totals and voter counts must equal the sums over stored votes.
pub fn assert_tally_consistent<S: LedgerStore>(store: &S, proposal: &Proposal) {
    let votes = store.proposal_votes(proposal.id).unwrap();
    let tally = store.get_tally(proposal.id).unwrap();
    let Some(tally) = tally else {
        assert!(votes.is_empty(), "votes without a tally");
        return;
    };
    for option in &proposal.options {
        let expected: Weight = votes
            .iter()
            .filter(|v| &v.option == option)
            .map(|v| v.weight)
            .sum();
        let count = votes.iter().filter(|v| &v.option == option).count() as u64;
        assert_eq!(tally.total_for(option), expected, "total for {option}");
        assert_eq!(
            tally.voters.get(option).copied().unwrap_or(0),
            count,
            "voters for {option}"
        );
    }
    assert_eq!(tally.voter_counts().total, votes.len() as u64);
}
