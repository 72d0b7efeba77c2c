//! Translate timeline edits into repository updates
//!
//! The reconciler never patches the in-memory tree. A confirmed write is
//! announced on the event bus and the caller re-fetches and rebuilds.
//!
//! ```text
//! Idle ──command──▶ Pending ──ok──▶ Committed (emit PlanUpdated)
//!                       └────err──▶ Failed    (no local change)
//! ```

use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::models::{Plan, PlanId};
use crate::events::{EventEmitter, TimelineEvent};
use crate::repository::{PlanPatch, PlanRepository, UpdateError};

/// `{id, startDate?, endDate?}` sent to the repository
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateCommand {
    pub id: PlanId,
    #[serde(flatten)]
    pub patch: PlanPatch,
}

/// Lifecycle of one edit
#[derive(Debug, Clone, PartialEq)]
pub enum EditState {
    /// No command was produced (e.g. the row is a group)
    Idle,
    Pending(UpdateCommand),
    Committed {
        command: UpdateCommand,
        plan: Plan,
    },
    Failed {
        command: UpdateCommand,
        error: UpdateError,
    },
}

impl EditState {
    pub fn begin(command: UpdateCommand) -> Self {
        EditState::Pending(command)
    }

    /// Settle a pending edit. Any other state is returned unchanged.
    pub fn resolve(self, result: Result<Plan, UpdateError>) -> Self {
        match self {
            EditState::Pending(command) => match result {
                Ok(plan) => EditState::Committed { command, plan },
                Err(error) => EditState::Failed { command, error },
            },
            other => other,
        }
    }

    pub fn is_committed(&self) -> bool {
        matches!(self, EditState::Committed { .. })
    }

    pub fn error(&self) -> Option<&UpdateError> {
        match self {
            EditState::Failed { error, .. } => Some(error),
            _ => None,
        }
    }
}

/// Plan rows carry the decimal plan id; group ids never parse
fn plan_id_of(row_id: &str) -> Option<PlanId> {
    row_id.parse::<PlanId>().ok()
}

#[derive(Clone)]
pub struct EditReconciler {
    repository: Arc<dyn PlanRepository>,
    emitter: Arc<dyn EventEmitter>,
}

impl EditReconciler {
    pub fn new(repository: Arc<dyn PlanRepository>, emitter: Arc<dyn EventEmitter>) -> Self {
        Self {
            repository,
            emitter,
        }
    }

    // ========================================================================
    // Command factory
    // ========================================================================

    /// Both ends of a bar moved. `None` for group rows.
    pub fn range_drag_command(
        row_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Option<UpdateCommand> {
        let id = plan_id_of(row_id)?;
        Some(UpdateCommand {
            id,
            patch: PlanPatch {
                start_date: Some(start),
                end_date: Some(end),
            },
        })
    }

    /// Inline end-date edit. `None` for group rows.
    pub fn end_date_command(row_id: &str, end: DateTime<Utc>) -> Option<UpdateCommand> {
        let id = plan_id_of(row_id)?;
        Some(UpdateCommand {
            id,
            patch: PlanPatch {
                start_date: None,
                end_date: Some(end),
            },
        })
    }

    // ========================================================================
    // Submission
    // ========================================================================

    /// Send one command and settle it
    pub async fn submit(&self, command: UpdateCommand) -> EditState {
        let pending = EditState::begin(command);
        debug!(plan_id = command.id, "Edit pending");

        let result = self.repository.update(command.id, command.patch).await;
        let settled = pending.resolve(result);

        match &settled {
            EditState::Committed { .. } => {
                info!(plan_id = command.id, "Edit committed");
                self.emitter.emit(TimelineEvent::plan_updated(command.id));
            }
            EditState::Failed { error, .. } => {
                warn!(plan_id = command.id, error = %error, "Edit failed");
            }
            _ => {}
        }
        settled
    }

    /// Submit on a spawned task so the write completes even if the caller
    /// goes away before it resolves.
    pub fn spawn_submit(&self, command: UpdateCommand) -> JoinHandle<EditState> {
        let this = self.clone();
        tokio::spawn(async move { this.submit(command).await })
    }

    /// Submit independent commands concurrently. Results follow input order;
    /// completion order is unspecified.
    pub async fn submit_all(&self, commands: Vec<UpdateCommand>) -> Vec<EditState> {
        join_all(commands.into_iter().map(|c| self.submit(c))).await
    }

    /// Range drag on a row. Group rows stay `Idle` and nothing is sent.
    pub async fn drag(&self, row_id: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> EditState {
        match Self::range_drag_command(row_id, start, end) {
            Some(command) => self.submit(command).await,
            None => {
                debug!(row_id, "Ignoring drag on non-plan row");
                EditState::Idle
            }
        }
    }

    /// End-date edit on a row. Group rows stay `Idle` and nothing is sent.
    pub async fn edit_end_date(&self, row_id: &str, end: DateTime<Utc>) -> EditState {
        match Self::end_date_command(row_id, end) {
            Some(command) => self.submit(command).await,
            None => {
                debug!(row_id, "Ignoring end-date edit on non-plan row");
                EditState::Idle
            }
        }
    }
}
