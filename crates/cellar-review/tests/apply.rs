//! Whole-plan apply against the in-memory inventory

use async_trait::async_trait;
use cellar_layout::{Assignment, Move, WineId};
use cellar_review::{
    check_moves, ApplyOutcome, ExecuteResponse, InventoryError, InventoryService, ProposedLayout,
    ReviewConfig, ReviewError, ReviewSession, ReviewState, ValidationErrorKind, ValidationReport,
};
use cellar_test_utils::{
    layout, single_move_layouts, slot, swap_layouts, MemoryInventory, Observed, RecordingObserver,
};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;

async fn open_with(
    inventory: &Arc<MemoryInventory>,
    config: ReviewConfig,
) -> (ReviewSession, Arc<RecordingObserver>) {
    let observer = Arc::new(RecordingObserver::default());
    let service: Arc<dyn InventoryService> = inventory.clone();
    let session = ReviewSession::open_review(service, config, observer.clone())
        .await
        .unwrap();
    (session, observer)
}

#[tokio::test]
async fn swap_runs_as_one_batch() {
    let (current, target) = swap_layouts();
    let inventory = Arc::new(MemoryInventory::new(current, target.clone()));
    let (mut session, observer) = open_with(&inventory, ReviewConfig::default()).await;

    assert_eq!(session.diff().stats.swap_pairs, 1);
    assert_eq!(session.plan().steps.len(), 1);

    let outcome = session.apply_all().await.unwrap();
    assert_eq!(
        outcome,
        ApplyOutcome::Applied {
            moved: 2,
            remaining_steps: 0
        }
    );

    let batches = inventory.executed();
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].len(), 2);
    assert_eq!(inventory.live(), target);

    assert_eq!(session.state(), ReviewState::Idle);
    assert!(session.plan().is_empty());
    assert_eq!(
        observer.transitions(),
        [
            (ReviewState::Idle, ReviewState::Proposed),
            (ReviewState::Proposed, ReviewState::Validating),
            (ReviewState::Validating, ReviewState::Executing),
            (ReviewState::Executing, ReviewState::Idle),
        ]
    );
}

#[tokio::test]
async fn single_move_to_empty_slot() {
    let (current, target) = single_move_layouts();
    let inventory = Arc::new(MemoryInventory::new(current, target));
    let (mut session, _) = open_with(&inventory, ReviewConfig::default()).await;

    let step = &session.plan().steps[0];
    assert_eq!(step.to_string(), "Step 1: move 1: A → B");

    session.apply_all().await.unwrap();
    assert_eq!(inventory.live().get(&slot("B")), Some(WineId(1)));
    assert_eq!(inventory.live().get(&slot("A")), None);

    let calls = inventory.calls();
    assert_eq!(calls.fetches, 1);
    assert_eq!(calls.validations, 1);
    assert_eq!(calls.executions, 1);
}

#[tokio::test]
async fn source_mismatch_blocks_and_keeps_plan() {
    let (current, target) = single_move_layouts();
    let inventory = Arc::new(MemoryInventory::new(current, target));
    let config = ReviewConfig::default().with_staleness_check(false);
    let (mut session, _) = open_with(&inventory, config).await;
    let plan_before = session.plan().clone();

    // Bottle taken out by hand after the proposal
    inventory.set_live("A", None);

    let outcome = session.apply_all().await.unwrap();
    let ApplyOutcome::Blocked(report) = &outcome else {
        panic!("expected blocked, got {outcome:?}");
    };
    assert!(report.has(ValidationErrorKind::SourceMismatch));
    assert!(outcome.message().contains("No changes were applied"));

    assert_eq!(inventory.calls().executions, 0);
    assert_eq!(session.state(), ReviewState::Proposed);
    assert_eq!(session.plan(), &plan_before);
}

#[tokio::test]
async fn execution_failure_keeps_plan_for_retry() {
    let (current, target) = swap_layouts();
    let inventory = Arc::new(MemoryInventory::new(current.clone(), target.clone()));
    let (mut session, _) = open_with(&inventory, ReviewConfig::default()).await;

    inventory.script_next_execute(Err(InventoryError::Backend {
        status: 503,
        message: "Inventory is locked by another session".to_string(),
    }));
    let err = session.apply_all().await.unwrap_err();
    match &err {
        ReviewError::Execution { message, .. } => {
            assert_eq!(message, "Inventory is locked by another session");
        }
        other => panic!("expected execution failure, got {other:?}"),
    }
    assert!(err.is_retryable());
    assert_eq!(session.state(), ReviewState::Proposed);
    assert_eq!(session.plan().moves.len(), 2);
    assert_eq!(session.current(), &current);

    // Retry goes through
    assert!(session.apply_all().await.unwrap().is_applied());
    assert_eq!(inventory.live(), target);
}

#[tokio::test]
async fn failure_without_payload_reports_backend_message() {
    let (current, target) = single_move_layouts();
    let inventory = Arc::new(MemoryInventory::new(current, target));
    let (mut session, _) = open_with(&inventory, ReviewConfig::default()).await;

    inventory.script_next_execute(Ok(ExecuteResponse::failed("Database write failed")));
    let err = session.apply_all().await.unwrap_err();
    assert_eq!(err.to_string(), "execution failed: Database write failed");
    assert_eq!(session.state(), ReviewState::Proposed);
}

#[tokio::test]
async fn backend_rejection_reuses_blocked_path() {
    let (current, target) = single_move_layouts();
    let inventory = Arc::new(MemoryInventory::new(current, target));
    let (mut session, _) = open_with(&inventory, ReviewConfig::default()).await;

    let report = ValidationReport::from_errors(vec![cellar_review::ValidationError::new(
        ValidationErrorKind::TargetOccupied,
        "B is occupied by wine 7",
    )]);
    inventory.script_next_execute(Ok(ExecuteResponse::rejected(report.clone())));

    let outcome = session.apply_all().await.unwrap();
    assert_eq!(outcome, ApplyOutcome::Blocked(report));
    assert_eq!(session.state(), ReviewState::Proposed);
    assert!(!session.plan().is_empty());
}

#[tokio::test]
async fn nothing_to_apply() {
    let same = layout(&[("A", Some(1)), ("B", None)]);
    let inventory = Arc::new(MemoryInventory::new(same.clone(), same));
    let (mut session, _) = open_with(&inventory, ReviewConfig::default()).await;

    assert!(session.plan().is_empty());
    assert!(matches!(
        session.apply_all().await,
        Err(ReviewError::NothingToApply)
    ));
    assert_eq!(session.state(), ReviewState::Proposed);
    assert_eq!(inventory.calls().executions, 0);
}

#[tokio::test]
async fn overrides_rebuild_plan_and_undo() {
    let current = layout(&[("A", Some(1)), ("B", None), ("C", None)]);
    let target = layout(&[("A", None), ("B", Some(1)), ("C", None)]);
    let inventory = Arc::new(MemoryInventory::new(current, target.clone()));
    let (mut session, observer) = open_with(&inventory, ReviewConfig::default()).await;

    let plan = session.apply_override(&slot("B"), &slot("C")).unwrap();
    assert_eq!(plan.moves[0].to, slot("C"));
    assert_eq!(session.overrides().len(), 1);
    assert_eq!(session.state(), ReviewState::Proposed);
    assert!(observer
        .events()
        .iter()
        .any(|e| matches!(e, Observed::Target(t) if t.get(&slot("C")) == Some(WineId(1)))));

    let rejected = session.apply_override(&slot("B"), &slot("Z9")).unwrap_err();
    assert!(matches!(rejected, ReviewError::Override(_)));
    assert_eq!(session.state(), ReviewState::Proposed);
    assert_eq!(session.plan().moves[0].to, slot("C"));

    let undone = session.undo_override().unwrap().unwrap();
    assert_eq!(undone.to, slot("C"));
    assert_eq!(session.plan().moves[0].to, slot("B"));

    session.apply_override(&slot("B"), &slot("A")).unwrap();
    assert!(session.plan().is_empty());
    session.reset_overrides().unwrap();
    assert_eq!(session.target(), &target);
    assert!(session.overrides().is_empty());

    // Override lands in the executed batch
    session.apply_override(&slot("B"), &slot("C")).unwrap();
    session.apply_all().await.unwrap();
    assert_eq!(inventory.live().get(&slot("C")), Some(WineId(1)));
}

#[tokio::test]
async fn close_discards_without_backend_calls() {
    let (current, target) = swap_layouts();
    let inventory = Arc::new(MemoryInventory::new(current.clone(), target));
    let (mut session, _) = open_with(&inventory, ReviewConfig::default()).await;

    session.apply_override(&slot("R1C1"), &slot("R1C2")).unwrap();
    session.close_review().unwrap();
    session.close_review().unwrap();

    assert_eq!(session.state(), ReviewState::Idle);
    assert!(session.plan().is_empty());
    assert!(session.overrides().is_empty());
    assert_eq!(inventory.live(), current);
    assert_eq!(inventory.calls().executions, 0);

    assert!(matches!(
        session.apply_all().await,
        Err(ReviewError::IllegalTransition {
            from: ReviewState::Idle,
            ..
        })
    ));
}

#[tokio::test]
async fn stranded_bottle_leaves_the_rest_of_the_plan_applicable() {
    // B's bottle has no destination; only C→D can run
    let current = layout(&[("A", Some(1)), ("B", Some(2)), ("C", Some(5)), ("D", None)]);
    let target = layout(&[("A", None), ("B", Some(1)), ("C", None), ("D", Some(5))]);
    let inventory = Arc::new(MemoryInventory::new(current.clone(), target));
    let (mut session, _) = open_with(&inventory, ReviewConfig::default()).await;

    let stranded: Vec<&str> = session
        .plan()
        .unplaceable
        .iter()
        .map(|d| d.slot.as_str())
        .collect();
    assert_eq!(stranded, ["A", "B"]);
    assert!(check_moves(&session.plan().moves, &current).valid);

    let outcome = session.apply_all().await.unwrap();
    assert_eq!(
        outcome,
        ApplyOutcome::Applied {
            moved: 1,
            remaining_steps: 0
        }
    );
    let live = inventory.live();
    assert_eq!(live.get(&slot("D")), Some(WineId(5)));
    assert_eq!(live.get(&slot("A")), Some(WineId(1)));
    assert_eq!(live.get(&slot("B")), Some(WineId(2)));
}

/// Delegates to a memory inventory but never answers an execute call
struct StalledExecution(Arc<MemoryInventory>);

#[async_trait]
impl InventoryService for StalledExecution {
    async fn get_proposed_layout(&self) -> Result<ProposedLayout, InventoryError> {
        self.0.get_proposed_layout().await
    }

    async fn fetch_current_layout(&self) -> Result<Assignment, InventoryError> {
        self.0.fetch_current_layout().await
    }

    async fn validate_moves(&self, moves: &[Move]) -> Result<ValidationReport, InventoryError> {
        self.0.validate_moves(moves).await
    }

    async fn execute_moves(&self, _moves: &[Move]) -> Result<ExecuteResponse, InventoryError> {
        std::future::pending().await
    }
}

#[tokio::test]
async fn executing_batch_cannot_be_closed() {
    let (current, target) = swap_layouts();
    let inventory = Arc::new(MemoryInventory::new(current, target));
    let service: Arc<dyn InventoryService> = Arc::new(StalledExecution(inventory.clone()));
    let mut session = ReviewSession::open(service).await.unwrap();

    let pending = tokio::time::timeout(Duration::from_millis(50), session.apply_all()).await;
    assert!(pending.is_err());
    assert_eq!(session.state(), ReviewState::Executing);

    assert!(matches!(
        session.close_review(),
        Err(ReviewError::IllegalTransition {
            from: ReviewState::Executing,
            to: ReviewState::Idle,
        })
    ));
    assert!(matches!(
        session.skip_step(1),
        Err(ReviewError::IllegalTransition {
            from: ReviewState::Executing,
            ..
        })
    ));
    assert_eq!(session.state(), ReviewState::Executing);
    assert_eq!(session.plan().moves.len(), 2);
}
