//! Month-over-month utility bill comparison.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ServiceError, ServiceResult};

use super::actions::ActionLog;
use super::badges::track_badge_progress;

const MAX_BILL_AMOUNT: f64 = 10_000.0;

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillAmounts {
    #[serde(default)]
    pub prev_electric: f64,
    #[serde(default)]
    pub curr_electric: f64,
    #[serde(default)]
    pub prev_water: f64,
    #[serde(default)]
    pub curr_water: f64,
}

/// Savings are positive when the current bill is lower
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BillComparison {
    pub electric_saving: f64,
    pub water_saving: f64,
    pub total_saving: f64,
}

fn valid_amount(amount: f64) -> bool {
    amount.is_finite() && (0.0..=MAX_BILL_AMOUNT).contains(&amount)
}

impl ActionLog {
    /// Compare two months of bills and credit badges for any reduction
    pub fn compare_bills(&self, bills: BillAmounts) -> ServiceResult<BillComparison> {
        let amounts = [
            bills.prev_electric,
            bills.curr_electric,
            bills.prev_water,
            bills.curr_water,
        ];
        if !amounts.into_iter().all(valid_amount) {
            return Err(ServiceError::InvalidRequest {
                message: "Please enter valid bill amounts".to_string(),
            });
        }

        let electric_saving = bills.prev_electric - bills.curr_electric;
        let water_saving = bills.prev_water - bills.curr_water;
        let comparison = BillComparison {
            electric_saving,
            water_saving,
            total_saving: electric_saving + water_saving,
        };

        let _guard = self.lock();
        if electric_saving > 0.0 {
            track_badge_progress(self.store.as_ref(), "saved electricity")?;
        }
        if water_saving > 0.0 {
            track_badge_progress(self.store.as_ref(), "saved water")?;
        }

        debug!(total_saving = comparison.total_saving, "Bills compared");
        Ok(comparison)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activity::BadgeFilter;
    use crate::clock::ManualClock;
    use crate::db::Database;
    use std::sync::Arc;

    fn log() -> ActionLog {
        let db = Arc::new(Database::open_in_memory().unwrap());
        ActionLog::new(db, Arc::new(ManualClock::new(0)))
    }

    fn progress_of(log: &ActionLog, id: &str) -> u32 {
        log.badge_summary(BadgeFilter::All)
            .unwrap()
            .badges
            .iter()
            .find(|b| AsRef::<str>::as_ref(&b.badge.id) == id)
            .map_or(0, |b| b.progress)
    }

    #[test]
    fn test_savings_credit_badges() {
        let log = log();

        let result = log
            .compare_bills(BillAmounts {
                prev_electric: 120.0,
                curr_electric: 100.0,
                prev_water: 40.0,
                curr_water: 45.5,
            })
            .unwrap();
        assert_eq!(result.electric_saving, 20.0);
        assert_eq!(result.water_saving, -5.5);
        assert_eq!(result.total_saving, 14.5);

        assert_eq!(progress_of(&log, "energy"), 1);
        assert_eq!(progress_of(&log, "water"), 0);
        assert_eq!(progress_of(&log, "starter"), 1);
    }

    #[test]
    fn test_out_of_range_amount_rejected() {
        let log = log();

        for bad in [-1.0, 10_000.01, f64::NAN] {
            let err = log
                .compare_bills(BillAmounts {
                    prev_electric: bad,
                    curr_electric: 0.0,
                    prev_water: 0.0,
                    curr_water: 0.0,
                })
                .unwrap_err();
            assert_eq!(err.error_code(), "invalid_request");
        }
        assert_eq!(progress_of(&log, "starter"), 0);
    }
}
