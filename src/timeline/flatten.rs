//! Collapse-aware linearization of the timeline tree

use std::collections::HashMap;

use super::models::{GroupSummary, PlanLeaf, RowLevel, TimelineRow, TimelineTree};
use super::progress::ProgressColor;

/// Per-node expand flags keyed by group id.
///
/// Lives outside the tree so it survives rebuilds. Unknown ids are collapsed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollapseState {
    expanded: HashMap<String, bool>,
}

impl CollapseState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_expanded(&self, id: &str) -> bool {
        self.expanded.get(id).copied().unwrap_or(false)
    }

    pub fn set_expanded(&mut self, id: impl Into<String>, expanded: bool) {
        self.expanded.insert(id.into(), expanded);
    }

    /// Flip one node's flag and return the new value
    pub fn toggle(&mut self, id: &str) -> bool {
        let next = !self.is_expanded(id);
        self.expanded.insert(id.to_string(), next);
        next
    }

    /// Open every group currently in `tree`
    pub fn expand_all(&mut self, tree: &TimelineTree) {
        for id in tree.group_ids() {
            self.expanded.insert(id.to_string(), true);
        }
    }

    pub fn collapse_all(&mut self) {
        self.expanded.clear();
    }
}

struct RowWriter {
    rows: Vec<TimelineRow>,
}

impl RowWriter {
    fn next_order(&self) -> u32 {
        u32::try_from(self.rows.len() + 1).unwrap_or(u32::MAX)
    }

    fn group(
        &mut self,
        level: RowLevel,
        summary: &GroupSummary,
        parent_id: Option<&str>,
        expanded: bool,
        child_count: usize,
    ) {
        let row = TimelineRow {
            display_order: self.next_order(),
            level,
            id: summary.id.clone(),
            parent_id: parent_id.map(str::to_string),
            label: summary.name.clone(),
            span: summary.span,
            progress: summary.progress,
            color: ProgressColor::for_percent(summary.progress),
            expanded: Some(expanded),
            child_count,
        };
        self.rows.push(row);
    }

    fn plan(&mut self, leaf: &PlanLeaf, parent_id: &str) {
        let row = TimelineRow {
            display_order: self.next_order(),
            level: RowLevel::Plan,
            id: leaf.id.to_string(),
            parent_id: Some(parent_id.to_string()),
            label: leaf.label.clone(),
            span: leaf.span,
            progress: leaf.progress,
            color: ProgressColor::for_percent(leaf.progress),
            expanded: None,
            child_count: 0,
        };
        self.rows.push(row);
    }
}

/// Pre-order walk emitting the visible rows with `display_order` 1..=N.
///
/// Divisions are always emitted. A division's PICs appear only when the
/// division is expanded; a PIC's plans only when that PIC is expanded.
/// Flags are never inherited, so a collapsed division hides its PICs
/// without touching their stored flags.
pub fn flatten(tree: &TimelineTree, collapse: &CollapseState) -> Vec<TimelineRow> {
    let mut out = RowWriter { rows: Vec::new() };

    for division in &tree.divisions {
        let division_open = collapse.is_expanded(&division.summary.id);
        out.group(
            RowLevel::Division,
            &division.summary,
            None,
            division_open,
            division.pics.len(),
        );
        if !division_open {
            continue;
        }

        for pic in &division.pics {
            let pic_open = collapse.is_expanded(&pic.summary.id);
            out.group(
                RowLevel::Pic,
                &pic.summary,
                Some(&division.summary.id),
                pic_open,
                pic.plans.len(),
            );
            if !pic_open {
                continue;
            }

            for leaf in &pic.plans {
                out.plan(leaf, &pic.summary.id);
            }
        }
    }

    out.rows
}
