//! Completion percentage of a single plan
//!
//! Rules are evaluated in order and the first match wins:
//!
//! 1. status contains "done", or target > 0 and real ≥ target → 100
//! 2. status contains "on progres" → ratio if target > 0, else 50
//! 3. status contains "progres" → ratio if target > 0, else 25
//! 4. target > 0 and real > 0 → ratio
//! 5. otherwise → 0
//!
//! "ratio" is `round(real / target * 100)` capped at 100. Status matching is
//! on the lowercased string.

use serde::{Deserialize, Serialize};

use super::models::Plan;

/// Percentage without a target for "on progres" statuses
const ON_PROGRESS_DEFAULT: u8 = 50;
/// Percentage without a target for other "progres" statuses
const PROGRESS_DEFAULT: u8 = 25;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    pub percent: u8,
    pub is_complete: bool,
}

impl Progress {
    const COMPLETE: Progress = Progress {
        percent: 100,
        is_complete: true,
    };

    fn partial(percent: u8) -> Self {
        Self {
            percent,
            is_complete: false,
        }
    }

    pub fn color(&self) -> ProgressColor {
        ProgressColor::for_percent(self.percent)
    }
}

/// Display color class of a bar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressColor {
    Success,
    InProgress,
}

impl ProgressColor {
    pub fn for_percent(percent: u8) -> Self {
        if percent == 100 {
            ProgressColor::Success
        } else {
            ProgressColor::InProgress
        }
    }

    pub fn hex(&self) -> &'static str {
        match self {
            ProgressColor::Success => "#52c41a",
            ProgressColor::InProgress => "#1890ff",
        }
    }
}

fn ratio(real: f64, target: f64) -> u8 {
    let pct = (real / target * 100.0).round();
    // NaN never reaches here: both inputs are finite and target > 0
    pct.clamp(0.0, 100.0) as u8
}

/// Evaluate one plan. Pure; call it once per leaf on every rebuild.
pub fn evaluate(plan: &Plan) -> Progress {
    let status = plan.status.as_deref().unwrap_or_default().to_lowercase();
    let target = plan.target_activity;
    let real = plan.real_activity;
    let has_target = target > 0.0;

    if status.contains("done") || (has_target && real >= target) {
        return Progress::COMPLETE;
    }

    if status.contains("on progres") {
        return Progress::partial(if has_target {
            ratio(real, target)
        } else {
            ON_PROGRESS_DEFAULT
        });
    }

    if status.contains("progres") {
        return Progress::partial(if has_target {
            ratio(real, target)
        } else {
            PROGRESS_DEFAULT
        });
    }

    if has_target && real > 0.0 {
        return Progress::partial(ratio(real, target));
    }

    Progress::partial(0)
}
