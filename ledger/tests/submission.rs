//! Vote submission: happy path, every rejection kind, and the guarantee
//! that a rejected submission leaves no trace.

mod common;

use std::sync::Arc;
use std::time::Duration;

use ballast_ledger::{LedgerConfig, VoteError, VoteErrorKind, VoteSubmission};
use ballast_nullables::NullStore;
use ballast_store::{ReweighOutcome, StoreError, TallyStore, VoteStore};
use ballast_types::{ChainId, ProposalId, WalletAddress, Weight};
use ballast_utils::Clock;

use common::*;

#[tokio::test]
async fn cast_records_full_cross_source_weight() {
    let h = harness(Arc::new(NullStore::new()));
    let p = binary_proposal(&h).await;
    let alice = KeyWallet::new(1);

    let vote = h.ledger.submit_vote(alice.vote(&p, "YES")).await.unwrap();
    assert_eq!(vote.weight, w("35.5"));
    assert_eq!(vote.option, "YES");
    assert_eq!(vote.chain_id, ChainId::ETHEREUM);
    assert_eq!(vote.created_at, h.clock.now());

    let tally = h.store.get_tally(p.id).unwrap().unwrap();
    assert_eq!(tally.total_for("YES"), w("35.5"));
    assert_eq!(tally.total_for("NO"), Weight::ZERO);
    assert_tally_consistent(h.store.as_ref(), &p);
}

#[tokio::test]
async fn signature_for_other_option_is_rejected_without_side_effects() {
    let h = harness(Arc::new(NullStore::new()));
    let p = binary_proposal(&h).await;
    let alice = KeyWallet::new(1);

    let mut submission = alice.vote(&p, "YES");
    submission.signature = alice.sign(&p, "NO");
    let err = h.ledger.submit_vote(submission).await.unwrap_err();
    assert_eq!(err.kind(), VoteErrorKind::InvalidSignature);
    assert!(!err.is_retryable());

    assert_eq!(h.store.vote_count(), 0);
    assert!(h.store.get_tally(p.id).unwrap().is_none());
    assert_eq!(h.lookups(), 0, "no balance lookups for an unauthorized vote");
}

#[tokio::test]
async fn signature_from_another_key_is_rejected() {
    let h = harness(Arc::new(NullStore::new()));
    let p = binary_proposal(&h).await;
    let alice = KeyWallet::new(1);
    let mallory = KeyWallet::new(2);

    let submission = VoteSubmission {
        signature: mallory.sign(&p, "YES"),
        ..alice.vote(&p, "YES")
    };
    let err = h.ledger.submit_vote(submission).await.unwrap_err();
    assert_eq!(err.kind(), VoteErrorKind::InvalidSignature);
    assert!(h.store.find_vote(p.id, &alice.address).unwrap().is_none());
}

#[tokio::test]
async fn contract_wallet_votes_through_second_scheme() {
    let h = harness(Arc::new(NullStore::new()));
    let p = binary_proposal(&h).await;
    let safe = WalletAddress::new([0x5a; 20]);
    deploy_contract_wallet(&h.contracts, safe, &p, "NO");
    let owner = KeyWallet::new(9);

    let vote = h
        .ledger
        .submit_vote(VoteSubmission {
            proposal_id: p.id,
            wallet: safe,
            option: "NO".into(),
            signature: owner.sign(&p, "NO"),
        })
        .await
        .unwrap();
    assert_eq!(vote.wallet, safe);
    assert_eq!(h.contracts.calls(), 1);
    assert_eq!(h.store.get_tally(p.id).unwrap().unwrap().total_for("NO"), w("35.5"));
}

#[tokio::test]
async fn contract_wallet_during_chain_outage_is_told_to_retry() {
    let h = harness(Arc::new(NullStore::new()));
    let p = binary_proposal(&h).await;
    let safe = WalletAddress::new([0x5a; 20]);
    deploy_contract_wallet(&h.contracts, safe, &p, "NO");
    let owner = KeyWallet::new(9);
    let submission = VoteSubmission {
        proposal_id: p.id,
        wallet: safe,
        option: "NO".into(),
        signature: owner.sign(&p, "NO"),
    };

    h.contracts.set_unreachable(true);
    let err = h.ledger.submit_vote(submission.clone()).await.unwrap_err();
    assert_ne!(err.kind(), VoteErrorKind::InvalidSignature);
    assert_eq!(err.kind(), VoteErrorKind::WeightUnavailable);
    assert!(err.is_retryable());
    assert_eq!(h.store.vote_count(), 0);
    assert_eq!(h.lookups(), 0);

    h.contracts.set_unreachable(false);
    let vote = h.ledger.submit_vote(submission).await.unwrap();
    assert_eq!(vote.wallet, safe);
    assert_tally_consistent(h.store.as_ref(), &p);
}

#[tokio::test]
async fn unavailable_source_blocks_first_cast() {
    let h = harness(Arc::new(NullStore::new()));
    let p = binary_proposal(&h).await;
    h.validators.go_down();

    let err = h
        .ledger
        .submit_vote(KeyWallet::new(1).vote(&p, "YES"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), VoteErrorKind::WeightUnavailable);
    assert!(err.is_retryable());
    assert_eq!(h.store.vote_count(), 0);
    assert!(h.store.get_tally(p.id).unwrap().is_none());

    h.validators.recover();
    h.ledger
        .submit_vote(KeyWallet::new(1).vote(&p, "YES"))
        .await
        .unwrap();
}

#[tokio::test]
async fn transient_source_failure_is_retried_during_cast() {
    let h = harness(Arc::new(NullStore::new()));
    let p = binary_proposal(&h).await;
    h.token.fail_next(1);
    let vote = h
        .ledger
        .submit_vote(KeyWallet::new(1).vote(&p, "YES"))
        .await
        .unwrap();
    assert_eq!(vote.weight, w("35.5"));
}

#[tokio::test]
async fn retried_submission_after_success_is_already_voted() {
    let h = harness(Arc::new(NullStore::new()));
    let p = binary_proposal(&h).await;
    let alice = KeyWallet::new(1);

    h.ledger.submit_vote(alice.vote(&p, "YES")).await.unwrap();
    let err = h.ledger.submit_vote(alice.vote(&p, "YES")).await.unwrap_err();
    assert!(matches!(err, VoteError::AlreadyVoted { .. }));
    let err = h.ledger.submit_vote(alice.vote(&p, "NO")).await.unwrap_err();
    assert_eq!(err.kind(), VoteErrorKind::AlreadyVoted);

    let tally = h.store.get_tally(p.id).unwrap().unwrap();
    assert_eq!(tally.total_for("YES"), w("35.5"));
    assert_eq!(tally.total_for("NO"), Weight::ZERO);
}

#[tokio::test]
async fn unknown_proposal_and_option_are_rejected() {
    let h = harness(Arc::new(NullStore::new()));
    let p = binary_proposal(&h).await;
    let alice = KeyWallet::new(1);

    let mut missing = alice.vote(&p, "YES");
    missing.proposal_id = ProposalId::new(404);
    assert_eq!(
        h.ledger.submit_vote(missing).await.unwrap_err().kind(),
        VoteErrorKind::NotFound
    );

    let err = h.ledger.submit_vote(alice.vote(&p, "yes")).await.unwrap_err();
    assert_eq!(err.kind(), VoteErrorKind::InvalidOption);

    let mut unsigned = alice.vote(&p, "YES");
    unsigned.signature.clear();
    assert_eq!(
        h.ledger.submit_vote(unsigned).await.unwrap_err().kind(),
        VoteErrorKind::InvalidRequest
    );
}

#[tokio::test]
async fn proposal_validation() {
    let h = harness(Arc::new(NullStore::new()));
    for (description, options) in [
        ("", vec!["YES".to_string()]),
        ("P", vec![]),
        ("P", vec!["YES".to_string(), "YES".to_string()]),
        ("P", vec![" YES".to_string()]),
    ] {
        let err = h.ledger.create_proposal(description, &options).await.unwrap_err();
        assert_eq!(err.kind(), VoteErrorKind::InvalidRequest);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_identical_submissions_yield_one_vote() {
    let h = harness(Arc::new(NullStore::new()));
    let p = binary_proposal(&h).await;
    let alice = KeyWallet::new(1);
    let submission = alice.vote(&p, "YES");

    let mut tasks = Vec::new();
    for _ in 0..20 {
        let ledger = h.ledger.clone();
        let submission = submission.clone();
        tasks.push(tokio::spawn(async move { ledger.submit_vote(submission).await }));
    }
    let mut ok = 0;
    let mut already = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(_) => ok += 1,
            Err(e) if e.kind() == VoteErrorKind::AlreadyVoted => already += 1,
            Err(e) => panic!("unexpected error {e}"),
        }
    }
    assert_eq!(ok, 1);
    assert_eq!(already, 19);
    assert_eq!(h.store.vote_count(), 1);
    assert_eq!(h.store.get_tally(p.id).unwrap().unwrap().total_for("YES"), w("35.5"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_votes_for_different_options_sum_exactly() {
    let h = harness(Arc::new(NullStore::new()));
    let p = binary_proposal(&h).await;
    let x = KeyWallet::new(10);
    let y = KeyWallet::new(11);
    h.set_weight(x.address, w("10"));
    h.set_weight(y.address, w("5"));

    let (a, b) = tokio::join!(
        h.ledger.submit_vote(x.vote(&p, "YES")),
        h.ledger.submit_vote(y.vote(&p, "NO")),
    );
    a.unwrap();
    b.unwrap();

    let tally = h.store.get_tally(p.id).unwrap().unwrap();
    assert_eq!(tally.total_for("YES"), w("10"));
    assert_eq!(tally.total_for("NO"), w("5"));
    assert_tally_consistent(h.store.as_ref(), &p);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn busy_tally_fails_with_retryable_lock_timeout() {
    let store = Arc::new(NullStore::new());
    let h = harness_with(
        store.clone(),
        LedgerConfig {
            lock_timeout: Duration::from_millis(50),
            ..LedgerConfig::default()
        },
    );
    let p = binary_proposal(&h).await;

    let (locked_tx, locked_rx) = std::sync::mpsc::channel();
    let holder = {
        let store = store.clone();
        let id = p.id;
        std::thread::spawn(move || {
            store.with_tally_locked(id, || {
                locked_tx.send(()).unwrap();
                std::thread::sleep(Duration::from_millis(400));
            })
        })
    };
    locked_rx.recv().unwrap();

    let alice = KeyWallet::new(1);
    let err = h.ledger.submit_vote(alice.vote(&p, "YES")).await.unwrap_err();
    assert_eq!(err.kind(), VoteErrorKind::LockTimeout);
    assert!(err.is_retryable());
    holder.join().unwrap();

    assert_eq!(store.vote_count(), 0);
    h.ledger.submit_vote(alice.vote(&p, "YES")).await.unwrap();
}

#[tokio::test]
async fn store_failure_is_internal_and_atomic() {
    let store = Arc::new(NullStore::new());
    let h = harness(store.clone());
    let p = binary_proposal(&h).await;
    store.fail_next_write(StoreError::Backend("disk full".into()));

    let err = h
        .ledger
        .submit_vote(KeyWallet::new(1).vote(&p, "YES"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), VoteErrorKind::Internal);
    assert_eq!(store.vote_count(), 0);
    assert!(store.get_tally(p.id).unwrap().is_none());
}

#[tokio::test]
async fn reweigh_applies_above_threshold_only() {
    let h = harness(Arc::new(NullStore::new()));
    let p = binary_proposal(&h).await;
    let alice = KeyWallet::new(1);
    h.set_weight(alice.address, w("10"));
    let vote = h.ledger.submit_vote(alice.vote(&p, "YES")).await.unwrap();
    let threshold = w("0.0001");

    h.clock.advance(1_000);
    let outcome = h
        .ledger
        .reweigh_vote(vote.id, w("10.0004"), threshold)
        .await
        .unwrap();
    assert_eq!(
        outcome,
        ReweighOutcome::Applied {
            old: w("10"),
            new: w("10.0004")
        }
    );
    assert_eq!(h.store.get_tally(p.id).unwrap().unwrap().total_for("YES"), w("10.0004"));
    let reweighed = h.store.get_vote(vote.id).unwrap();
    assert_eq!(reweighed.updated_at, h.clock.now());

    h.clock.advance(1_000);
    let outcome = h
        .ledger
        .reweigh_vote(vote.id, w("10.00041"), threshold)
        .await
        .unwrap();
    assert_eq!(outcome, ReweighOutcome::Skipped { stored: w("10.0004") });
    assert_eq!(h.store.get_tally(p.id).unwrap().unwrap().total_for("YES"), w("10.0004"));
    assert_eq!(
        h.store.get_vote(vote.id).unwrap().updated_at,
        reweighed.updated_at,
        "skips do not touch the row"
    );
    assert_tally_consistent(h.store.as_ref(), &p);
}
