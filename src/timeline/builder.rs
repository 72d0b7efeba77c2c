//! Division → PIC → Plan hierarchy with bottom-up aggregates
//!
//! Aggregation is strictly two-level: PIC nodes aggregate their leaves,
//! division nodes aggregate their PIC nodes (never the leaves directly).

use std::cmp::Ordering;
use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use tracing::debug;

use super::dates::effective_span;
use super::models::{
    DateSpan, DivisionNode, GroupSummary, NodeKind, PicNode, Plan, PlanLeaf, TimelineTree,
};
use super::progress::evaluate;

/// Id of a division node. Pure function of the grouping key.
pub fn division_node_id(division: &str) -> String {
    format!("division:{}", urlencoding::encode(division))
}

/// Id of a PIC node. Includes the division so the same person under two
/// divisions yields two distinct nodes.
pub fn pic_node_id(division: &str, pic: &str) -> String {
    format!(
        "pic:{}/{}",
        urlencoding::encode(division),
        urlencoding::encode(pic)
    )
}

/// Display order of grouping keys: case-insensitive first, then the raw
/// string, so keys differing only in case stay distinct and adjacent.
pub fn collate(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

fn collated<'m, 'k, V>(buckets: &'m BTreeMap<&'k str, V>) -> Vec<(&'k str, &'m V)> {
    let mut entries: Vec<(&'k str, &'m V)> = buckets.iter().map(|(k, v)| (*k, v)).collect();
    entries.sort_by(|(a, _), (b, _)| collate(a, b));
    entries
}

/// Rounded unweighted mean; 0 for no values
fn mean_progress(values: impl IntoIterator<Item = u8>) -> u8 {
    let (sum, count) = values
        .into_iter()
        .fold((0u32, 0u32), |(sum, count), v| (sum + u32::from(v), count + 1));
    if count == 0 {
        return 0;
    }
    (f64::from(sum) / f64::from(count)).round().min(100.0) as u8
}

fn summarize<'a>(
    id: String,
    kind: NodeKind,
    name: &str,
    children: impl IntoIterator<Item = (&'a DateSpan, u8)> + Clone,
    now: DateTime<Utc>,
) -> GroupSummary {
    let span = DateSpan::union(children.clone().into_iter().map(|(span, _)| span))
        .unwrap_or_else(|| DateSpan::at(now));
    let progress = mean_progress(children.into_iter().map(|(_, p)| p));
    GroupSummary {
        id,
        kind,
        name: name.to_string(),
        span,
        progress,
    }
}

fn leaf(plan: &Plan, now: DateTime<Utc>) -> PlanLeaf {
    let progress = evaluate(plan);
    PlanLeaf {
        id: plan.id,
        label: plan.label.clone(),
        status: plan.status.clone(),
        span: effective_span(plan, now),
        progress: progress.percent,
        is_complete: progress.is_complete,
    }
}

fn build_pic(division: &str, pic: &str, plans: &[&Plan], now: DateTime<Utc>) -> PicNode {
    let leaves: Vec<PlanLeaf> = plans.iter().map(|plan| leaf(plan, now)).collect();
    let summary = summarize(
        pic_node_id(division, pic),
        NodeKind::Pic,
        pic,
        leaves.iter().map(|l| (&l.span, l.progress)),
        now,
    );
    PicNode {
        summary,
        plans: leaves,
    }
}

fn build_division(
    division: &str,
    buckets: &BTreeMap<&str, Vec<&Plan>>,
    now: DateTime<Utc>,
) -> DivisionNode {
    let pics: Vec<PicNode> = collated(buckets)
        .into_iter()
        .map(|(pic, plans)| build_pic(division, pic, plans, now))
        .collect();
    let summary = summarize(
        division_node_id(division),
        NodeKind::Division,
        division,
        pics.iter().map(|p| (&p.summary.span, p.summary.progress)),
        now,
    );
    DivisionNode { summary, pics }
}

/// Build the hierarchy from an already-filtered plan list.
///
/// Divisions and PICs are ordered by [`collate`] on their grouping key; leaves keep the
/// relative order they had in `plans`. `now` feeds the date fallbacks and
/// the span of empty groups.
pub fn build_tree(plans: &[Plan], now: DateTime<Utc>) -> TimelineTree {
    let mut buckets: BTreeMap<&str, BTreeMap<&str, Vec<&Plan>>> = BTreeMap::new();
    for plan in plans {
        buckets
            .entry(plan.division_key())
            .or_default()
            .entry(plan.pic_key())
            .or_default()
            .push(plan);
    }

    let divisions: Vec<DivisionNode> = collated(&buckets)
        .into_iter()
        .map(|(division, pics)| build_division(division, pics, now))
        .collect();

    debug!(
        plans = plans.len(),
        divisions = divisions.len(),
        "Built timeline tree"
    );

    TimelineTree { divisions }
}
