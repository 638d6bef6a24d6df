//! Backend seam
//!
//! [`InventoryService`] is the only way a session reaches the outside
//! world. The REST client in `cellar-client` implements it over HTTP; tests
//! use an in-memory fake or a mock.

use crate::error::InventoryError;
use crate::validation::ValidationReport;
use async_trait::async_trait;
use cellar_layout::{Assignment, Move};
use cellar_plan::DiffStats;
use serde::{Deserialize, Serialize};

/// Solver output for the cellar under review
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposedLayout {
    /// Live inventory at proposal time
    pub current_layout: Assignment,
    /// Solver's intended layout
    pub target_layout: Assignment,
    /// Solver's own move list; informational
    #[serde(default)]
    pub sort_plan: Vec<Move>,
    /// Solver's own classification counts; informational
    #[serde(default)]
    pub stats: DiffStats,
}

/// Request body for validate and execute calls
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveBatch {
    /// Moves to check or run as one unit
    pub moves: Vec<Move>,
}

impl MoveBatch {
    /// Wrap a slice of moves
    #[must_use]
    pub fn new(moves: &[Move]) -> Self {
        Self {
            moves: moves.to_vec(),
        }
    }
}

/// Backend answer to a batch execution
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteResponse {
    /// Whether every move was applied
    pub success: bool,
    /// Number of bottles moved
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub moved: Option<usize>,
    /// Validation failure that stopped the batch
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<ValidationReport>,
    /// Failure message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExecuteResponse {
    /// Successful execution of `moved` bottles
    #[must_use]
    pub fn applied(moved: usize) -> Self {
        Self {
            success: true,
            moved: Some(moved),
            ..Self::default()
        }
    }

    /// Batch refused by the backend's own validation
    #[must_use]
    pub fn rejected(report: ValidationReport) -> Self {
        Self {
            success: false,
            validation: Some(report),
            ..Self::default()
        }
    }

    /// Batch failed for a reason other than validation
    #[must_use]
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(message.into()),
            ..Self::default()
        }
    }
}

/// Live inventory backend
///
/// Implementations must treat `execute_moves` as all-or-nothing: either
/// every move of the batch is applied or none is.
#[async_trait]
pub trait InventoryService: Send + Sync {
    /// Current layout, solver target and the solver's move list
    async fn get_proposed_layout(&self) -> Result<ProposedLayout, InventoryError>;

    /// Live current layout only
    async fn fetch_current_layout(&self) -> Result<Assignment, InventoryError>;

    /// Check `moves` against live state without applying them
    async fn validate_moves(&self, moves: &[Move]) -> Result<ValidationReport, InventoryError>;

    /// Apply `moves` as one atomic batch
    async fn execute_moves(&self, moves: &[Move]) -> Result<ExecuteResponse, InventoryError>;
}
