//! Timeline/Gantt hierarchy engine
//!
//! `Plan[]` → filter → Division/PIC/Plan tree → collapse-aware rows.
//! Edits go back through [`reconcile::EditReconciler`] and the tree is
//! rebuilt from the source list once the repository confirms them.

pub mod builder;
pub mod dates;
pub mod filter;
pub mod flatten;
pub mod manager;
pub mod models;
pub mod pipeline;
pub mod progress;
pub mod reconcile;

pub use builder::{build_tree, division_node_id, pic_node_id};
pub use filter::{filter_plans, CalendarMonth, FilterForm, MonthFilter, PeriodFilter};
pub use flatten::{flatten, CollapseState};
pub use manager::TimelineManager;
pub use models::*;
pub use pipeline::{rebuild, TimelineView};
pub use progress::{evaluate, Progress, ProgressColor};
pub use reconcile::{EditReconciler, EditState, UpdateCommand};
