//! Stage I: primary distribution of indirect costs over the four centers.

use cost_core::{AllocationRow, Center, CenterAmounts};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// The primary table with its column totals.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PrimarySchedule {
    pub rows: Vec<AllocationRow>,
    /// Column sums, one per center.
    pub totals: CenterAmounts,
}

impl PrimarySchedule {
    pub fn total_of(&self, center: Center) -> Decimal {
        self.totals.get(center)
    }

    /// Sum of every row (the bottom-right cell).
    pub fn grand_total(&self) -> Decimal {
        self.totals.total()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Aggregate the primary rows into per-center totals.
pub fn compute_primary(rows: &[AllocationRow]) -> PrimarySchedule {
    let totals: CenterAmounts = rows.iter().map(|r| r.amounts).sum();
    debug!(rows = rows.len(), grand_total = %totals.total(), "primary totals computed");
    PrimarySchedule {
        rows: rows.to_vec(),
        totals,
    }
}
