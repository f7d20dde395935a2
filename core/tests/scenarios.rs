//! End-to-end voting flows against the in-memory ledger

use std::sync::Arc;
use std::time::Duration;

use alloy_primitives::Address;
use shadowvote_core::ballot::{OptionIndex, SignalLayout, WitnessBuilder};
use shadowvote_core::ledger::mock::{MockLedger, MockWallet, WalletBehavior};
use shadowvote_core::pipeline::SUCCESS_MESSAGE;
use shadowvote_core::prover::MockProver;
use shadowvote_core::{
    ConnectionError, OptionCatalog, ProofOrchestrator, RejectionKind, SessionBinder,
    SubmissionPipeline, SubmissionState, VoteError, VotingClient,
};

type MockClient = VotingClient<MockProver, MockWallet, MockLedger>;

fn labels() -> Vec<String> {
    vec!["Ankara".into(), "İstanbul".into(), "İzmir".into()]
}

/// A session for `behavior` voting against `ledger`
fn session(ledger: &Arc<MockLedger>, behavior: WalletBehavior, prover: MockProver) -> MockClient {
    let wallet = Arc::new(MockWallet::new(behavior, Arc::clone(ledger)));
    let catalog = Arc::new(OptionCatalog::new(Arc::clone(ledger), labels()));
    let pipeline = SubmissionPipeline::new(
        WitnessBuilder::new(catalog.option_count()).unwrap(),
        ProofOrchestrator::new(prover, SignalLayout::default()).unwrap(),
        Arc::clone(&wallet),
    );
    VotingClient::new(SessionBinder::new(wallet), catalog, pipeline)
}

fn voter(seed: u8) -> WalletBehavior {
    WalletBehavior::Connected(vec![Address::from([seed; 20])])
}

fn prover() -> MockProver {
    MockProver::new(SignalLayout::default())
}

async fn votes(client: &MockClient) -> Vec<u64> {
    client
        .tallies()
        .await
        .unwrap()
        .into_iter()
        .map(|t| t.votes)
        .collect()
}

#[tokio::test]
async fn vote_is_counted_and_confirmed() {
    let ledger = Arc::new(MockLedger::new(vec![5, 3, 2]));
    let client = session(&ledger, voter(1), prover());

    client.connect().await.unwrap();
    let confirmation = client.vote(OptionIndex(1)).await.unwrap();

    assert_eq!(votes(&client).await, vec![5, 4, 2]);
    assert_eq!(
        client.state(),
        SubmissionState::Confirmed {
            tx_hash: confirmation.tx_hash
        }
    );
    assert_eq!(client.status().message.as_deref(), Some(SUCCESS_MESSAGE));
    assert!(ledger.has_nullifier(&confirmation.nullifier).await);
}

#[tokio::test]
async fn same_identity_cannot_vote_twice() {
    let ledger = Arc::new(MockLedger::new(vec![5, 3, 2]));

    let first = session(&ledger, voter(7), prover());
    first.vote(OptionIndex(0)).await.unwrap();
    assert_eq!(ledger.snapshot().await, vec![6, 3, 2]);

    // Fresh application load, same wallet account
    let second = session(&ledger, voter(7), prover());
    let err = second.vote(OptionIndex(2)).await.unwrap_err();

    match &err {
        VoteError::SubmissionRejected(rejection) => {
            assert_eq!(rejection.kind, RejectionKind::NullifierReused)
        }
        other => panic!("expected a nullifier rejection, got {other:?}"),
    }
    assert_eq!(second.state(), SubmissionState::Idle);
    assert_eq!(second.status().message, Some(err.to_string()));
    assert_eq!(ledger.snapshot().await, vec![6, 3, 2]);
}

#[tokio::test]
async fn different_identities_both_count() {
    let ledger = Arc::new(MockLedger::new(vec![0, 0, 0]));

    session(&ledger, voter(1), prover())
        .vote(OptionIndex(2))
        .await
        .unwrap();
    session(&ledger, voter(2), prover())
        .vote(OptionIndex(2))
        .await
        .unwrap();

    assert_eq!(ledger.snapshot().await, vec![0, 0, 2]);
}

#[tokio::test]
async fn out_of_range_option_touches_nothing() {
    let ledger = Arc::new(MockLedger::new(vec![5, 3, 2]));
    let wallet = Arc::new(MockWallet::new(voter(1), Arc::clone(&ledger)));
    let catalog = Arc::new(OptionCatalog::new(Arc::clone(&ledger), labels()));
    let pipeline = SubmissionPipeline::new(
        WitnessBuilder::new(3).unwrap(),
        ProofOrchestrator::new(prover(), SignalLayout::default()).unwrap(),
        Arc::clone(&wallet),
    );
    let client = VotingClient::new(SessionBinder::new(Arc::clone(&wallet)), catalog, pipeline);

    let err = client.vote(OptionIndex(3)).await.unwrap_err();

    assert_eq!(err, VoteError::InvalidOption { index: 3, count: 3 });
    assert_eq!(wallet.account_requests(), 0);
    assert_eq!(client.pipeline().orchestrator().backend().calls(), 0);
    assert_eq!(ledger.submissions(), 0);
    assert_eq!(client.state(), SubmissionState::Idle);
    assert_eq!(client.status().message, Some(err.to_string()));
}

#[tokio::test]
async fn declined_wallet_still_shows_tallies() {
    let ledger = Arc::new(MockLedger::new(vec![5, 3, 2]));
    let client = session(&ledger, WalletBehavior::Declined, prover());

    let declined = client.connect().await.unwrap_err();
    assert!(matches!(declined, ConnectionError::ConnectionRejected(_)));
    assert_eq!(client.status().message, Some(declined.to_string()));
    assert_eq!(votes(&client).await, vec![5, 3, 2]);

    let err = client.vote(OptionIndex(0)).await.unwrap_err();
    assert!(matches!(
        err,
        VoteError::Connection(ConnectionError::ConnectionRejected(_))
    ));
    assert_eq!(client.state(), SubmissionState::Idle);
    assert_eq!(client.status().message, Some(err.to_string()));
    assert_eq!(client.pipeline().orchestrator().backend().calls(), 0);
    assert_eq!(ledger.submissions(), 0);
}

#[tokio::test]
async fn missing_wallet_is_reported() {
    let ledger = Arc::new(MockLedger::new(vec![0, 0, 0]));
    let client = session(&ledger, WalletBehavior::Missing, prover());

    let err = client.vote(OptionIndex(0)).await.unwrap_err();
    assert!(matches!(
        err,
        VoteError::Connection(ConnectionError::NoWalletDetected(_))
    ));
    assert_eq!(client.status().message, Some(err.to_string()));
}

#[tokio::test]
async fn second_submit_while_proving_is_rejected() {
    let ledger = Arc::new(MockLedger::new(vec![0, 0, 0]));
    let slow = prover().with_delay(Duration::from_millis(200));
    let client = session(&ledger, voter(3), slow);
    client.connect().await.unwrap();

    let mut status = client.subscribe();
    let (first, second) = tokio::join!(client.vote(OptionIndex(0)), async {
        status
            .wait_for(|s| s.state == SubmissionState::Proving)
            .await
            .unwrap();
        client.vote(OptionIndex(1)).await
    });

    assert!(first.is_ok());
    assert_eq!(second.unwrap_err(), VoteError::AlreadyInProgress);
    assert_eq!(client.pipeline().orchestrator().backend().calls(), 1);
    assert_eq!(ledger.snapshot().await, vec![1, 0, 0]);
}

#[tokio::test]
async fn second_submit_while_submitting_is_rejected() {
    let ledger =
        Arc::new(MockLedger::new(vec![0, 0, 0]).with_confirmation_delay(Duration::from_millis(200)));
    let client = session(&ledger, voter(4), prover());
    client.connect().await.unwrap();

    let mut status = client.subscribe();
    let (first, second) = tokio::join!(client.vote(OptionIndex(2)), async {
        status
            .wait_for(|s| s.state == SubmissionState::Submitting)
            .await
            .unwrap();
        client.vote(OptionIndex(2)).await
    });

    assert!(first.is_ok());
    assert_eq!(second.unwrap_err(), VoteError::AlreadyInProgress);
    assert_eq!(ledger.submissions(), 1);
}

#[tokio::test]
async fn tallies_are_readable_during_a_vote() {
    let ledger = Arc::new(MockLedger::new(vec![5, 3, 2]));
    let slow = prover().with_delay(Duration::from_millis(200));
    let client = session(&ledger, voter(5), slow);

    let mut status = client.subscribe();
    let (vote, during) = tokio::join!(client.vote(OptionIndex(2)), async {
        status
            .wait_for(|s| s.state == SubmissionState::Proving)
            .await
            .unwrap();
        votes(&client).await
    });

    assert_eq!(during, vec![5, 3, 2]);
    vote.unwrap();
    assert_eq!(votes(&client).await, vec![5, 3, 3]);
}

#[tokio::test]
async fn submission_completes_after_caller_gives_up() {
    let ledger =
        Arc::new(MockLedger::new(vec![0, 0, 0]).with_confirmation_delay(Duration::from_millis(100)));
    let client = session(&ledger, voter(6), prover());
    client.connect().await.unwrap();

    // Stop waiting as soon as the transaction is out
    let mut watcher = client.subscribe();
    tokio::select! {
        _ = client.vote(OptionIndex(1)) => panic!("vote resolved before submission started"),
        _ = watcher.wait_for(|s| s.state == SubmissionState::Submitting) => {}
    }

    let mut status = client.subscribe();
    status
        .wait_for(|s| matches!(s.state, SubmissionState::Confirmed { .. }))
        .await
        .unwrap();
    assert_eq!(ledger.snapshot().await, vec![0, 1, 0]);
}
