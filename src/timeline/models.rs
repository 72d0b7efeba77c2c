//! Timeline models: the raw plan record and the derived tree/row values

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use super::progress::ProgressColor;

/// Numeric identifier of a plan record
pub type PlanId = i64;

/// Grouping key used when a plan has no division
pub const UNASSIGNED_DIVISION: &str = "Unassigned Division";

/// Grouping key used when a plan has no PIC
pub const UNASSIGNED_PIC: &str = "Unassigned PIC";

// ============================================================================
// Plan (source record)
// ============================================================================

/// An action-plan record as supplied by the repository.
///
/// Dates are kept as the raw strings the backend sent; they are parsed
/// on demand by [`super::dates`], and anything unparsable behaves as absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    pub id: PlanId,
    #[serde(default)]
    pub division_name: Option<String>,
    #[serde(default)]
    pub pic_name: Option<String>,
    /// Display text (the backend calls this field `lead`)
    #[serde(default, alias = "lead")]
    pub label: String,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "lenient_quantity")]
    pub target_activity: f64,
    #[serde(default, deserialize_with = "lenient_quantity")]
    pub real_activity: f64,
}

impl Plan {
    /// Create a plan with only an id and label; everything else absent
    pub fn new(id: PlanId, label: impl Into<String>) -> Self {
        Self {
            id,
            division_name: None,
            pic_name: None,
            label: label.into(),
            start_date: None,
            end_date: None,
            created_at: None,
            status: None,
            target_activity: 0.0,
            real_activity: 0.0,
        }
    }

    /// Division grouping key, with the unassigned default for absent/empty names
    pub fn division_key(&self) -> &str {
        match self.division_name.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ => UNASSIGNED_DIVISION,
        }
    }

    /// PIC grouping key, with the unassigned default for absent/empty names
    pub fn pic_key(&self) -> &str {
        match self.pic_name.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ => UNASSIGNED_PIC,
        }
    }
}

/// Accepts a number, a numeric string, or null. Anything else, and any
/// negative or non-finite value, becomes 0.
fn lenient_quantity<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    let parsed = match value {
        Some(serde_json::Value::Number(n)) => n.as_f64(),
        Some(serde_json::Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    Ok(sanitize_quantity(parsed.unwrap_or(0.0)))
}

pub(crate) fn sanitize_quantity(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}

// ============================================================================
// Derived tree
// ============================================================================

/// Closed date interval covered by a leaf or a group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateSpan {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DateSpan {
    /// Degenerate span used for groups with nothing beneath them
    pub fn at(instant: DateTime<Utc>) -> Self {
        Self {
            start: instant,
            end: instant,
        }
    }

    /// Whether `other` lies entirely within this span
    pub fn contains(&self, other: &DateSpan) -> bool {
        self.start <= other.start && self.end >= other.end
    }

    /// Smallest span covering every span in `spans`; `None` when empty
    pub fn union<'a>(spans: impl IntoIterator<Item = &'a DateSpan>) -> Option<DateSpan> {
        spans.into_iter().fold(None, |acc: Option<DateSpan>, span| {
            Some(match acc {
                None => *span,
                Some(acc) => DateSpan {
                    start: acc.start.min(span.start),
                    end: acc.end.max(span.end),
                },
            })
        })
    }
}

/// Level of a node in the Division → PIC → Plan hierarchy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Division,
    Pic,
}

/// Aggregates shared by division and PIC nodes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupSummary {
    pub id: String,
    pub kind: NodeKind,
    /// Grouping key as it appeared in the source (after the unassigned default)
    pub name: String,
    pub span: DateSpan,
    /// Rounded mean of the immediate children's progress, 0..=100
    pub progress: u8,
}

/// A plan as it sits in the tree, with its effective dates and progress
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanLeaf {
    pub id: PlanId,
    pub label: String,
    pub status: Option<String>,
    pub span: DateSpan,
    pub progress: u8,
    pub is_complete: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PicNode {
    pub summary: GroupSummary,
    /// Leaves in the relative order of the filtered input
    pub plans: Vec<PlanLeaf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DivisionNode {
    pub summary: GroupSummary,
    /// PICs sorted ascending by grouping key
    pub pics: Vec<PicNode>,
}

/// The whole hierarchy, divisions sorted ascending by grouping key
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimelineTree {
    pub divisions: Vec<DivisionNode>,
}

impl TimelineTree {
    pub fn is_empty(&self) -> bool {
        self.divisions.is_empty()
    }

    /// Number of plan leaves across all groups
    pub fn plan_count(&self) -> usize {
        self.divisions
            .iter()
            .flat_map(|d| d.pics.iter())
            .map(|p| p.plans.len())
            .sum()
    }

    /// Every group id in pre-order (division, then its PICs)
    pub fn group_ids(&self) -> impl Iterator<Item = &str> + '_ {
        self.divisions.iter().flat_map(|d| {
            std::iter::once(d.summary.id.as_str())
                .chain(d.pics.iter().map(|p| p.summary.id.as_str()))
        })
    }
}

// ============================================================================
// Flattened rows
// ============================================================================

/// Level tag of a visible row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RowLevel {
    Division,
    Pic,
    Plan,
}

/// One visible line of the timeline, ready for rendering
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineRow {
    /// 1-based position in the visible sequence
    pub display_order: u32,
    pub level: RowLevel,
    /// Group id, or the decimal plan id for plan rows
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    pub label: String,
    pub span: DateSpan,
    pub progress: u8,
    pub color: ProgressColor,
    /// Expand flag for group rows; `None` for plans
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expanded: Option<bool>,
    pub child_count: usize,
}
