//! filter → build → flatten as one pure call

use chrono::{DateTime, Utc};

use super::builder::build_tree;
use super::filter::{filter_plans, PeriodFilter};
use super::flatten::{flatten, CollapseState};
use super::models::{Plan, TimelineRow, TimelineTree};

/// Output of a full rebuild. Nothing here is cached across rebuilds.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimelineView {
    pub tree: TimelineTree,
    pub rows: Vec<TimelineRow>,
}

/// Build the filtered tree only (no flattening)
pub fn build_filtered(plans: &[Plan], filter: &PeriodFilter, now: DateTime<Utc>) -> TimelineTree {
    build_tree(&filter_plans(plans, filter), now)
}

/// Run the whole pipeline from the source list. Total over any input.
pub fn rebuild(
    plans: &[Plan],
    filter: &PeriodFilter,
    collapse: &CollapseState,
    now: DateTime<Utc>,
) -> TimelineView {
    let tree = build_filtered(plans, filter, now);
    let rows = flatten(&tree, collapse);
    TimelineView { tree, rows }
}
