//! Sustainability action log, badge progress and bill comparison.

mod actions;
mod badges;
mod bills;

pub use actions::{ActionEntry, ActionLog, MAX_UPLOAD_BYTES};
pub use badges::{BadgeFilter, BadgeSummary};
pub use bills::{BillAmounts, BillComparison};
