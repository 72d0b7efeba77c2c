//! Test helper factories and repository doubles
//!
//! Provides convenience functions for creating plans with sensible defaults
//! and a repository wrapper that can be switched into a failing mode.
#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};

use crate::repository::{
    FetchError, InMemoryPlanRepository, PlanPatch, PlanRepository, UpdateError,
};
use crate::timeline::dates::parse_timestamp;
use crate::timeline::manager::Clock;
use crate::timeline::{Plan, PlanId};

// ============================================================================
// Time
// ============================================================================

/// Fixed "now" used across unit tests
pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 15, 12, 0, 0).unwrap()
}

pub fn fixed_clock() -> Clock {
    Arc::new(fixed_now)
}

/// Parse a timestamp literal, panicking on bad input
pub fn ts(raw: &str) -> DateTime<Utc> {
    parse_timestamp(raw).unwrap_or_else(|| panic!("bad test timestamp: {raw}"))
}

// ============================================================================
// Test data factories
// ============================================================================

/// Create a plan with a start date and nothing else
pub fn plan_starting(id: PlanId, start: &str) -> Plan {
    let mut plan = Plan::new(id, format!("Plan {}", id));
    plan.start_date = Some(start.to_string());
    plan
}

/// Create a plan in a division/PIC with a date range
pub fn plan_in(id: PlanId, division: &str, pic: &str, start: &str, end: &str) -> Plan {
    Plan {
        id,
        division_name: Some(division.to_string()),
        pic_name: Some(pic.to_string()),
        label: format!("Plan {}", id),
        start_date: Some(start.to_string()),
        end_date: Some(end.to_string()),
        created_at: None,
        status: None,
        target_activity: 0.0,
        real_activity: 0.0,
    }
}

// ============================================================================
// Repository doubles
// ============================================================================

/// In-memory repository whose calls can be made to fail on demand
pub struct FailingRepository {
    inner: InMemoryPlanRepository,
    fail_lists: AtomicBool,
    fail_updates: AtomicBool,
}

impl FailingRepository {
    pub fn new(plans: Vec<Plan>) -> Self {
        Self {
            inner: InMemoryPlanRepository::with_plans(plans),
            fail_lists: AtomicBool::new(false),
            fail_updates: AtomicBool::new(false),
        }
    }

    pub fn fail_lists(&self, fail: bool) {
        self.fail_lists.store(fail, Ordering::SeqCst);
    }

    pub fn fail_updates(&self, fail: bool) {
        self.fail_updates.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl PlanRepository for FailingRepository {
    async fn list(&self) -> Result<Vec<Plan>, FetchError> {
        if self.fail_lists.load(Ordering::SeqCst) {
            return Err(FetchError::Transport("connection refused".to_string()));
        }
        self.inner.list().await
    }

    async fn update(&self, id: PlanId, patch: PlanPatch) -> Result<Plan, UpdateError> {
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(UpdateError::Transport("connection reset".to_string()));
        }
        self.inner.update(id, patch).await
    }
}
