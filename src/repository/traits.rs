//! PlanRepository trait definition
//!
//! The timeline core consumes this interface; storage, auth and transport
//! live behind it.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::{FetchError, UpdateError};
use crate::timeline::{Plan, PlanId};

/// Partial date update for one plan. Absent fields are left untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<DateTime<Utc>>,
}

impl PlanPatch {
    pub fn is_empty(&self) -> bool {
        self.start_date.is_none() && self.end_date.is_none()
    }
}

/// Source of truth for plan records.
///
/// Calls for different ids are independent; calls for the same id are
/// last-write-wins in completion order.
#[async_trait]
pub trait PlanRepository: Send + Sync {
    /// Fetch the full flat list of plans
    async fn list(&self) -> Result<Vec<Plan>, FetchError>;

    /// Apply `patch` to plan `id` and return the stored record
    async fn update(&self, id: PlanId, patch: PlanPatch) -> Result<Plan, UpdateError>;
}
