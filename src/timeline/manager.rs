//! Timeline state holder for a view
//!
//! Keeps the last fetched list, the filter form, the collapse state and the
//! last successfully rebuilt rows. Every change re-runs the pure pipeline
//! from the source list.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::broadcast::{self, error::TryRecvError};
use tracing::{debug, info, warn};

use super::filter::{FilterForm, PeriodFilter};
use super::flatten::CollapseState;
use super::models::{Plan, TimelineRow, TimelineTree};
use super::pipeline::{rebuild, TimelineView};
use crate::events::{EventBus, TimelineEvent};
use crate::repository::{FetchError, PlanRepository};

/// Clock used for the date fallbacks; injectable for tests
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

pub struct TimelineManager {
    repository: Arc<dyn PlanRepository>,
    events: broadcast::Receiver<TimelineEvent>,
    clock: Clock,
    filter: FilterForm,
    collapse: CollapseState,
    plans: Vec<Plan>,
    view: TimelineView,
    /// Set by an invalidation, cleared only by a successful fetch
    stale: bool,
}

impl TimelineManager {
    /// Create a manager listening for invalidations on `bus`
    pub fn new(repository: Arc<dyn PlanRepository>, bus: &EventBus, filter: PeriodFilter) -> Self {
        Self::with_clock(repository, bus, filter, Arc::new(Utc::now))
    }

    pub fn with_clock(
        repository: Arc<dyn PlanRepository>,
        bus: &EventBus,
        filter: PeriodFilter,
        clock: Clock,
    ) -> Self {
        Self {
            repository,
            events: bus.subscribe(),
            clock,
            filter: FilterForm::new(filter),
            collapse: CollapseState::new(),
            plans: Vec::new(),
            view: TimelineView::default(),
            stale: false,
        }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn rows(&self) -> &[TimelineRow] {
        &self.view.rows
    }

    pub fn tree(&self) -> &TimelineTree {
        &self.view.tree
    }

    /// Last successfully fetched source list
    pub fn plans(&self) -> &[Plan] {
        &self.plans
    }

    pub fn filter_form(&self) -> &FilterForm {
        &self.filter
    }

    /// Edit pending filter values; nothing is rebuilt until `apply_filter`
    pub fn filter_form_mut(&mut self) -> &mut FilterForm {
        &mut self.filter
    }

    pub fn collapse_state(&self) -> &CollapseState {
        &self.collapse
    }

    /// Whether a confirmed write has not yet been picked up by a fetch
    pub fn is_stale(&self) -> bool {
        self.stale
    }

    // ========================================================================
    // Operations
    // ========================================================================

    fn rebuild(&mut self) {
        let now = (self.clock)();
        self.view = rebuild(&self.plans, self.filter.applied(), &self.collapse, now);
        debug!(rows = self.view.rows.len(), "Timeline rebuilt");
    }

    /// Re-fetch the source list and rebuild.
    ///
    /// On failure the previous rows stay in place and the error is returned.
    pub async fn refresh(&mut self) -> Result<&[TimelineRow], FetchError> {
        match self.repository.list().await {
            Ok(plans) => {
                info!(plans = plans.len(), "Fetched plans");
                self.plans = plans;
                self.stale = false;
                self.rebuild();
                Ok(self.rows())
            }
            Err(e) => {
                warn!(error = %e, "Plan fetch failed; keeping last timeline");
                Err(e)
            }
        }
    }

    /// Promote pending filter values and rebuild if they changed
    pub fn apply_filter(&mut self) -> bool {
        let changed = self.filter.apply();
        if changed {
            self.rebuild();
        }
        changed
    }

    /// Flip one group's expand flag and rebuild. Returns the new flag.
    pub fn toggle(&mut self, node_id: &str) -> bool {
        let expanded = self.collapse.toggle(node_id);
        self.rebuild();
        expanded
    }

    pub fn expand_all(&mut self) {
        self.collapse.expand_all(&self.view.tree);
        self.rebuild();
    }

    pub fn collapse_all(&mut self) {
        self.collapse.collapse_all();
        self.rebuild();
    }

    /// Drain queued invalidations and refresh once if any arrived or an
    /// earlier refresh for them failed. Returns whether a refresh ran.
    pub async fn sync_invalidations(&mut self) -> Result<bool, FetchError> {
        loop {
            match self.events.try_recv() {
                Ok(event) => {
                    debug!(plan_id = event.plan_id(), "Invalidation received");
                    self.stale = true;
                }
                Err(TryRecvError::Lagged(skipped)) => {
                    debug!(skipped, "Invalidation receiver lagged");
                    self.stale = true;
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            }
        }

        if !self.stale {
            return Ok(false);
        }
        self.refresh().await?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::{InMemoryPlanRepository, UpdateError};
    use crate::test_helpers::{fixed_clock, plan_in, ts, FailingRepository};
    use crate::timeline::builder::division_node_id;
    use crate::timeline::filter::MonthFilter;
    use crate::timeline::reconcile::EditReconciler;

    fn plans() -> Vec<Plan> {
        vec![
            plan_in(1, "Sales", "Ana", "2025-01-01", "2025-01-05"),
            plan_in(2, "Sales", "Ana", "2025-03-01", "2025-03-05"),
            plan_in(3, "Ops", "Bea", "2024-02-01", "2024-02-05"),
        ]
    }

    fn manager(repo: Arc<dyn PlanRepository>, bus: &EventBus) -> TimelineManager {
        TimelineManager::with_clock(repo, bus, PeriodFilter::year(2025), fixed_clock())
    }

    #[tokio::test]
    async fn test_refresh_builds_rows() {
        let bus = EventBus::default();
        let mut m = manager(Arc::new(InMemoryPlanRepository::with_plans(plans())), &bus);
        let rows = m.refresh().await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].label, "Sales");
        assert_eq!(m.plans().len(), 3);
    }

    #[tokio::test]
    async fn test_toggle_and_expand_all() {
        let bus = EventBus::default();
        let mut m = manager(Arc::new(InMemoryPlanRepository::with_plans(plans())), &bus);
        m.refresh().await.unwrap();

        assert!(m.toggle(&division_node_id("Sales")));
        assert_eq!(m.rows().len(), 2);

        m.expand_all();
        assert_eq!(m.rows().len(), 4);

        m.collapse_all();
        assert_eq!(m.rows().len(), 1);
    }

    #[tokio::test]
    async fn test_filter_applies_only_on_demand() {
        let bus = EventBus::default();
        let mut m = manager(Arc::new(InMemoryPlanRepository::with_plans(plans())), &bus);
        m.refresh().await.unwrap();
        m.expand_all();
        assert_eq!(m.tree().plan_count(), 2);

        m.filter_form_mut().set_month(MonthFilter::month(3).unwrap());
        assert_eq!(m.tree().plan_count(), 2);

        assert!(m.apply_filter());
        assert_eq!(m.tree().plan_count(), 1);
        assert!(!m.apply_filter());
    }

    #[tokio::test]
    async fn test_collapse_state_survives_refresh() {
        let bus = EventBus::default();
        let mut m = manager(Arc::new(InMemoryPlanRepository::with_plans(plans())), &bus);
        m.refresh().await.unwrap();
        m.expand_all();
        let before = m.rows().to_vec();

        m.refresh().await.unwrap();
        assert_eq!(m.rows(), before.as_slice());
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_previous_rows() {
        let bus = EventBus::default();
        let repo = Arc::new(FailingRepository::new(plans()));
        let mut m = manager(repo.clone(), &bus);
        m.refresh().await.unwrap();
        let before = m.rows().to_vec();

        repo.fail_lists(true);
        let err = m.refresh().await.unwrap_err();
        assert!(matches!(err, FetchError::Transport(_)));
        assert_eq!(m.rows(), before.as_slice());
        assert!(!m.rows().is_empty());
    }

    #[tokio::test]
    async fn test_committed_edit_refreshes_on_sync() {
        let bus = EventBus::default();
        let repo = Arc::new(InMemoryPlanRepository::with_plans(plans()));
        let reconciler = EditReconciler::new(repo.clone(), Arc::new(bus.clone()));
        let mut m = manager(repo.clone(), &bus);
        m.refresh().await.unwrap();
        m.expand_all();
        let plan_row = m.rows().iter().find(|r| r.id == "1").cloned().unwrap();

        let state = reconciler
            .drag("1", ts("2025-06-01T00:00:00Z"), ts("2025-06-10T00:00:00Z"))
            .await;
        assert!(state.is_committed());
        // No optimistic patch: rows still show the pre-edit span
        let unchanged = m.rows().iter().find(|r| r.id == "1").unwrap();
        assert_eq!(unchanged.span, plan_row.span);

        assert!(m.sync_invalidations().await.unwrap());
        let moved = m.rows().iter().find(|r| r.id == "1").unwrap();
        assert_eq!(moved.span.start, ts("2025-06-01T00:00:00Z"));
        assert_eq!(moved.span.end, ts("2025-06-10T00:00:00Z"));

        assert!(!m.sync_invalidations().await.unwrap());
    }

    #[tokio::test]
    async fn test_invalidation_survives_failed_refresh() {
        let bus = EventBus::default();
        let repo = Arc::new(FailingRepository::new(plans()));
        let reconciler = EditReconciler::new(repo.clone(), Arc::new(bus.clone()));
        let mut m = manager(repo.clone(), &bus);
        m.refresh().await.unwrap();
        m.expand_all();

        let state = reconciler
            .drag("1", ts("2025-03-01T00:00:00Z"), ts("2025-03-04T00:00:00Z"))
            .await;
        assert!(state.is_committed());

        repo.fail_lists(true);
        assert!(matches!(
            m.sync_invalidations().await,
            Err(FetchError::Transport(_))
        ));
        assert!(m.is_stale());
        let row = m.rows().iter().find(|r| r.id == "1").unwrap();
        assert_eq!(row.span.start, ts("2025-01-01T00:00:00Z"));

        repo.fail_lists(false);
        assert!(m.sync_invalidations().await.unwrap());
        assert!(!m.is_stale());
        let row = m.rows().iter().find(|r| r.id == "1").unwrap();
        assert_eq!(row.span.start, ts("2025-03-01T00:00:00Z"));

        assert!(!m.sync_invalidations().await.unwrap());
    }

    #[tokio::test]
    async fn test_failed_edit_leaves_rows_untouched() {
        let bus = EventBus::default();
        let repo = Arc::new(FailingRepository::new(plans()));
        let reconciler = EditReconciler::new(repo.clone(), Arc::new(bus.clone()));
        let mut m = manager(repo.clone(), &bus);
        m.refresh().await.unwrap();
        m.expand_all();
        let before = m.rows().to_vec();

        repo.fail_updates(true);
        let state = reconciler
            .edit_end_date("2", ts("2025-04-01T00:00:00Z"))
            .await;
        assert!(matches!(state.error(), Some(UpdateError::Transport(_))));

        assert!(!m.sync_invalidations().await.unwrap());
        assert_eq!(m.rows(), before.as_slice());
        assert_eq!(
            m.plans().iter().find(|p| p.id == 2).unwrap().end_date.as_deref(),
            Some("2025-03-05")
        );
    }
}
