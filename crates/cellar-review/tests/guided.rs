//! Step-by-step application

use cellar_review::{
    ApplyOutcome, InventoryService, ReviewConfig, ReviewError, ReviewSession, ReviewState,
};
use cellar_test_utils::{mixed_layouts, MemoryInventory};
use pretty_assertions::assert_eq;
use std::sync::Arc;

async fn open(config: ReviewConfig) -> (ReviewSession, Arc<MemoryInventory>) {
    let (current, target) = mixed_layouts();
    let inventory = Arc::new(MemoryInventory::new(current, target));
    let service: Arc<dyn InventoryService> = inventory.clone();
    let session = ReviewSession::open_review(
        service,
        config,
        Arc::new(cellar_review::NoopObserver),
    )
    .await
    .unwrap();
    (session, inventory)
}

fn step_sources(session: &ReviewSession) -> Vec<String> {
    session
        .plan()
        .steps
        .iter()
        .map(|s| s.moves()[0].from.to_string())
        .collect()
}

#[tokio::test]
async fn plan_order_for_mixed_layout() {
    let (session, _) = open(ReviewConfig::default()).await;
    // swap, two free moves, one chained move
    assert_eq!(step_sources(&session), ["F1", "R1C2", "R3C1", "R1C1"]);
    assert_eq!(session.next_step().map(|s| s.number), Some(1));
}

#[tokio::test]
async fn swap_step_submits_both_halves() {
    let (mut session, inventory) = open(ReviewConfig::default()).await;

    let outcome = session.apply_step(1).await.unwrap();
    assert_eq!(
        outcome,
        ApplyOutcome::Applied {
            moved: 2,
            remaining_steps: 3
        }
    );
    let batches = inventory.executed();
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].len(), 2);

    assert_eq!(session.state(), ReviewState::Proposed);
    assert!(session.progress().is_completed(1));
    assert_eq!(session.snapshot(), inventory.live().content_hash());
    assert!(matches!(
        session.apply_step(1).await,
        Err(ReviewError::StepAlreadyDone(1))
    ));
}

#[tokio::test]
async fn dependent_step_needs_its_blocker_first() {
    let (mut session, inventory) = open(ReviewConfig::default()).await;

    assert!(matches!(
        session.apply_step(4).await,
        Err(ReviewError::StepRequiresBatch { step: 4 })
    ));
    assert_eq!(inventory.calls().executions, 0);
    assert_eq!(session.state(), ReviewState::Proposed);

    session.apply_step(2).await.unwrap();
    session.apply_step(4).await.unwrap();
    assert_eq!(session.progress().remaining(session.plan()), 2);
}

#[tokio::test]
async fn dependent_step_as_chain_batch() {
    let config = ReviewConfig::default().with_dependent_steps(true);
    let (mut session, inventory) = open(config).await;

    let outcome = session.apply_step(4).await.unwrap();
    assert_eq!(
        outcome,
        ApplyOutcome::Applied {
            moved: 2,
            remaining_steps: 2
        }
    );
    assert_eq!(inventory.executed()[0].len(), 2);
    assert!(session.progress().is_completed(2));
    assert!(session.progress().is_completed(4));
}

#[tokio::test]
async fn skip_then_finish_with_batch() {
    let (mut session, inventory) = open(ReviewConfig::default()).await;

    session.apply_step(1).await.unwrap();
    session.skip_step(2).unwrap();
    assert_eq!(session.next_step().map(|s| s.number), Some(3));
    assert_eq!(inventory.calls().executions, 1);

    // Remaining moves, skipped step included, go as one batch
    let outcome = session.apply_all().await.unwrap();
    assert_eq!(
        outcome,
        ApplyOutcome::Applied {
            moved: 3,
            remaining_steps: 0
        }
    );
    assert_eq!(session.state(), ReviewState::Idle);
    let (_, target) = mixed_layouts();
    assert_eq!(inventory.live(), target);
}

#[tokio::test]
async fn last_step_closes_review() {
    let (mut session, _) = open(ReviewConfig::default()).await;
    for n in [1, 2, 3] {
        session.apply_step(n).await.unwrap();
    }
    let outcome = session.apply_step(4).await.unwrap();
    assert_eq!(
        outcome,
        ApplyOutcome::Applied {
            moved: 1,
            remaining_steps: 0
        }
    );
    assert_eq!(session.state(), ReviewState::Idle);
}

#[tokio::test]
async fn unknown_steps_are_rejected() {
    let (mut session, _) = open(ReviewConfig::default()).await;
    assert!(matches!(session.apply_step(0).await, Err(ReviewError::UnknownStep(0))));
    assert!(matches!(session.skip_step(9), Err(ReviewError::UnknownStep(9))));
}
