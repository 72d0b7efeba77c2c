//! In-memory PlanRepository
//!
//! Backs the CLI and the test suite. Plans are kept in insertion order
//! behind a `tokio::sync::RwLock`.

use async_trait::async_trait;
use chrono::SecondsFormat;
use tokio::sync::RwLock;
use tracing::debug;

use super::error::{FetchError, UpdateError};
use super::traits::{PlanPatch, PlanRepository};
use crate::timeline::{Plan, PlanId};

#[derive(Debug, Default)]
pub struct InMemoryPlanRepository {
    plans: RwLock<Vec<Plan>>,
}

impl InMemoryPlanRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_plans(plans: Vec<Plan>) -> Self {
        Self {
            plans: RwLock::new(plans),
        }
    }

    /// Parse a JSON array of plan records
    pub fn from_json(json: &str) -> Result<Self, FetchError> {
        let plans: Vec<Plan> =
            serde_json::from_str(json).map_err(|e| FetchError::Parse(e.to_string()))?;
        Ok(Self::with_plans(plans))
    }

    /// Current record for `id`, if present
    pub async fn get(&self, id: PlanId) -> Option<Plan> {
        self.plans.read().await.iter().find(|p| p.id == id).cloned()
    }
}

fn validate(patch: &PlanPatch) -> Result<(), UpdateError> {
    if patch.is_empty() {
        return Err(UpdateError::Validation(
            "patch must set startDate or endDate".to_string(),
        ));
    }
    if let (Some(start), Some(end)) = (patch.start_date, patch.end_date) {
        if start >= end {
            return Err(UpdateError::Validation(format!(
                "startDate {} must be before endDate {}",
                start, end
            )));
        }
    }
    Ok(())
}

#[async_trait]
impl PlanRepository for InMemoryPlanRepository {
    async fn list(&self) -> Result<Vec<Plan>, FetchError> {
        Ok(self.plans.read().await.clone())
    }

    async fn update(&self, id: PlanId, patch: PlanPatch) -> Result<Plan, UpdateError> {
        validate(&patch)?;

        let mut plans = self.plans.write().await;
        let plan = plans
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(UpdateError::NotFound(id))?;

        if let Some(start) = patch.start_date {
            plan.start_date = Some(start.to_rfc3339_opts(SecondsFormat::Secs, true));
        }
        if let Some(end) = patch.end_date {
            plan.end_date = Some(end.to_rfc3339_opts(SecondsFormat::Secs, true));
        }
        debug!(plan_id = id, "Stored plan patch");

        Ok(plan.clone())
    }
}
