use std::sync::Arc;
use std::time::Duration;

use ballast_nullables::NullStore;
use ballast_query::{FixedPriceOracle, PriceSource, QueryError, QueryService};
use ballast_store::{ProposalStore, VoteStore};
use ballast_types::{ChainId, NewVote, Proposal, Timestamp, WalletAddress, Weight};

fn w(s: &str) -> Weight {
    Weight::parse_decimal(s).unwrap()
}

fn setup(price: f64) -> (Arc<NullStore>, Arc<FixedPriceOracle>, QueryService<NullStore>, Proposal) {
    let store = Arc::new(NullStore::new());
    let oracle = Arc::new(FixedPriceOracle::new(price));
    let service = QueryService::new(store.clone(), oracle.clone(), 1000.0);
    let proposal = store
        .create_proposal("P1", &["YES".into(), "NO".into()], Timestamp::from_millis(5))
        .unwrap();
    (store, oracle, service, proposal)
}

fn cast(store: &NullStore, proposal: &Proposal, wallet: u8, option: &str, weight: &str) {
    store
        .record_vote(
            NewVote {
                proposal_id: proposal.id,
                wallet: WalletAddress::new([wallet; 20]),
                option: option.to_string(),
                signature: vec![0; 65],
                weight: w(weight),
                chain_id: ChainId::ETHEREUM,
                cast_at: Timestamp::from_millis(100 + u64::from(wallet)),
            },
            Duration::from_secs(1),
        )
        .unwrap();
}

#[tokio::test]
async fn tally_is_valued_at_live_price() {
    let (store, _oracle, service, p) = setup(2000.0);
    cast(&store, &p, 1, "YES", "10");
    cast(&store, &p, 2, "NO", "5");

    let view = service.tally(p.id).await.unwrap();
    assert_eq!(view.total_weight, w("15"));
    assert_eq!(view.tally.total_for("YES"), w("10"));
    assert_eq!(view.price.source, PriceSource::Live);
    assert_eq!(view.display_value, 30_000.0);
}

#[tokio::test]
async fn oracle_failure_uses_last_known_then_fallback() {
    let (store, oracle, service, p) = setup(2000.0);
    cast(&store, &p, 1, "YES", "1");

    oracle.set(None);
    let first = service.tally(p.id).await.unwrap();
    assert_eq!(first.price.source, PriceSource::Fallback);
    assert_eq!(first.display_value, 1000.0);

    oracle.set(Some(2500.0));
    assert_eq!(service.tally(p.id).await.unwrap().price.source, PriceSource::Live);

    oracle.set(None);
    let stale = service.tally(p.id).await.unwrap();
    assert_eq!(stale.price.source, PriceSource::LastKnown);
    assert_eq!(stale.display_value, 2500.0);
}

#[tokio::test]
async fn proposal_without_votes_has_zero_tally() {
    let (_store, _oracle, service, p) = setup(2000.0);
    let view = service.tally(p.id).await.unwrap();
    assert_eq!(view.total_weight, Weight::ZERO);
    assert_eq!(view.tally.totals.len(), 2);
    assert_eq!(view.tally.voter_counts().total, 0);
}

#[tokio::test]
async fn unknown_proposal_is_not_found() {
    let (_store, _oracle, service, p) = setup(2000.0);
    let missing = ballast_types::ProposalId::new(p.id.get() + 1);
    assert!(matches!(service.tally(missing).await, Err(QueryError::NotFound(_))));
    assert!(matches!(service.recent_votes(missing, 0, None), Err(QueryError::NotFound(_))));
}

#[test]
fn wallet_vote_reports_own_vote_or_none() {
    let (store, _oracle, service, p) = setup(2000.0);
    cast(&store, &p, 1, "NO", "3.25");

    let mine = service.wallet_vote(p.id, &WalletAddress::new([1; 20])).unwrap();
    let vote = mine.vote.unwrap();
    assert_eq!(vote.option, "NO");
    assert_eq!(vote.weight, w("3.25"));

    let other = service.wallet_vote(p.id, &WalletAddress::new([2; 20])).unwrap();
    assert!(other.vote.is_none());
}

#[test]
fn recent_votes_are_newest_first_with_counts() {
    let (store, _oracle, service, p) = setup(2000.0);
    for i in 1..=12u8 {
        cast(&store, &p, i, if i % 3 == 0 { "NO" } else { "YES" }, "1");
    }

    let page = service.recent_votes(p.id, 0, None).unwrap();
    assert_eq!(page.votes.len(), 10);
    assert_eq!(page.votes[0].wallet, WalletAddress::new([12; 20]));
    assert_eq!(page.counts.total, 12);
    assert_eq!(page.counts.per_option["NO"], 4);
    assert_eq!(page.counts.per_option["YES"], 8);
    assert_eq!(page.next_offset, Some(10));

    let rest = service.recent_votes(p.id, 10, None).unwrap();
    assert_eq!(rest.votes.len(), 2);
    assert_eq!(rest.votes[1].wallet, WalletAddress::new([1; 20]));
    assert_eq!(rest.next_offset, None);

    assert_eq!(store.recent_votes(p.id, 0, 500).unwrap().len(), 12);
    assert_eq!(service.recent_votes(p.id, 0, Some(0)).unwrap().votes.len(), 1);
}
