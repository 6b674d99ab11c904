//! Stage III: absorption of production-center cost into final orders.

use crate::factor::{resolve_factor, FactorMode, ResolvedFactor};
use crate::ratio::RatioError;
use cost_core::{CenterAmounts, FinalOrder};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Label of the summed row at the bottom of the final schedule.
pub const TOTALS_LABEL: &str = "Total";

/// Factor modes for the two production centers.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AbsorptionConfig {
    pub p1: FactorMode,
    pub p2: FactorMode,
}

/// Cost absorbed by one order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderCost {
    pub label: String,
    pub base_p1: Decimal,
    pub base_p2: Decimal,
    pub units: Decimal,
    pub cost_p1: Decimal,
    pub cost_p2: Decimal,
    pub total: Decimal,
    /// Total over units, zero when the order has no units.
    pub unit_cost: Decimal,
}

impl OrderCost {
    fn priced(order: &FinalOrder, factor_p1: Decimal, factor_p2: Decimal) -> Option<Self> {
        let cost_p1 = order.base_p1.checked_mul(factor_p1)?;
        let cost_p2 = order.base_p2.checked_mul(factor_p2)?;
        let total = cost_p1.checked_add(cost_p2)?;
        let unit_cost = if order.units > Decimal::ZERO {
            total.checked_div(order.units)?
        } else {
            Decimal::ZERO
        };
        Some(Self {
            label: order.label.clone(),
            base_p1: order.base_p1,
            base_p2: order.base_p2,
            units: order.units,
            cost_p1,
            cost_p2,
            total,
            unit_cost,
        })
    }

    fn accumulate(&mut self, row: &OrderCost) -> Option<()> {
        self.base_p1 = self.base_p1.checked_add(row.base_p1)?;
        self.base_p2 = self.base_p2.checked_add(row.base_p2)?;
        self.units = self.units.checked_add(row.units)?;
        self.cost_p1 = self.cost_p1.checked_add(row.cost_p1)?;
        self.cost_p2 = self.cost_p2.checked_add(row.cost_p2)?;
        self.total = self.total.checked_add(row.total)?;
        self.unit_cost = self.unit_cost.checked_add(row.unit_cost)?;
        Some(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalSchedule {
    pub factor_p1: ResolvedFactor,
    pub factor_p2: ResolvedFactor,
    pub rows: Vec<OrderCost>,
    /// Column sums over every order, unit cost included.
    pub totals: OrderCost,
    /// Production cost not assigned to any order (negative when over-absorbed).
    pub unabsorbed_p1: Decimal,
    pub unabsorbed_p2: Decimal,
}

/// Assign the accumulated production cost in `production` to `orders`.
///
/// A factor whose order costs would leave the Decimal range is replaced by
/// zero with a [`RatioError::Overflow`] advisory.
pub fn compute_final(
    production: &CenterAmounts,
    orders: &[FinalOrder],
    config: &AbsorptionConfig,
) -> FinalSchedule {
    let base_p1 = orders.iter().try_fold(Decimal::ZERO, |acc, o| acc.checked_add(o.base_p1));
    let base_p2 = orders.iter().try_fold(Decimal::ZERO, |acc, o| acc.checked_add(o.base_p2));
    let mut factor_p1 = resolve_factor(&config.p1, production.p1, base_p1.unwrap_or_default());
    let mut factor_p2 = resolve_factor(&config.p2, production.p2, base_p2.unwrap_or_default());
    if base_p1.is_none() {
        factor_p1.fall_back(RatioError::Overflow);
    }
    if base_p2.is_none() {
        factor_p2.fall_back(RatioError::Overflow);
    }

    let mut priced = absorb(orders, factor_p1.factor, factor_p2.factor);
    if priced.is_none() {
        if absorb(orders, factor_p1.factor, Decimal::ZERO).is_none() {
            factor_p1.fall_back(RatioError::Overflow);
        } else {
            factor_p2.fall_back(RatioError::Overflow);
        }
        priced = absorb(orders, factor_p1.factor, factor_p2.factor);
    }
    if priced.is_none() && !factor_p2.factor.is_zero() {
        factor_p2.fall_back(RatioError::Overflow);
        priced = absorb(orders, factor_p1.factor, factor_p2.factor);
    }
    let (rows, totals) = priced.unwrap_or_else(|| {
        warn!(orders = orders.len(), "order bases or units out of range; no order priced");
        (Vec::new(), totals_row())
    });
    debug!(orders = rows.len(), absorbed = %totals.total, "final absorption computed");

    FinalSchedule {
        unabsorbed_p1: production.p1 - totals.cost_p1,
        unabsorbed_p2: production.p2 - totals.cost_p2,
        factor_p1,
        factor_p2,
        rows,
        totals,
    }
}

fn totals_row() -> OrderCost {
    OrderCost {
        label: TOTALS_LABEL.to_string(),
        ..OrderCost::default()
    }
}

/// Order rows and their totals row, or `None` if any figure overflows.
fn absorb(
    orders: &[FinalOrder],
    factor_p1: Decimal,
    factor_p2: Decimal,
) -> Option<(Vec<OrderCost>, OrderCost)> {
    let mut totals = totals_row();
    let mut rows = Vec::with_capacity(orders.len());
    for order in orders {
        let row = OrderCost::priced(order, factor_p1, factor_p2)?;
        totals.accumulate(&row)?;
        rows.push(row);
    }
    Some((rows, totals))
}
