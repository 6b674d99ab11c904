#![deny(warnings)]

//! Core records and invariants for the costing engine.
//!
//! This crate defines the serializable rows that cross the engine boundary
//! (stock movements, ledger rows, allocation rows, final orders) together
//! with validation helpers that enforce field-level invariants at
//! construction time.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tracing::debug;

/// Kind of stock movement recorded on an inventory card.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MovementKind {
    /// Opening balance of the card.
    InitialStock,
    /// Units bought at a known unit cost.
    Purchase,
    /// Units sold or consumed; the exit cost is derived by the costing policy.
    Withdrawal,
}

impl MovementKind {
    /// True for movements that add a cost layer (initial stock and purchases).
    pub fn is_entry(self) -> bool {
        matches!(self, MovementKind::InitialStock | MovementKind::Purchase)
    }

    /// Human-readable caption used in ledger tables.
    pub fn label(self) -> &'static str {
        match self {
            MovementKind::InitialStock => "Initial stock",
            MovementKind::Purchase => "Purchase",
            MovementKind::Withdrawal => "Withdrawal",
        }
    }
}

impl fmt::Display for MovementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A single stock movement. Immutable once recorded.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Movement {
    /// Movement date; movements are processed in the order supplied.
    pub date: NaiveDate,
    /// Movement kind.
    pub kind: MovementKind,
    /// Unit count (> 0).
    pub quantity: Decimal,
    /// Unit cost (>= 0). Always zero for withdrawals.
    #[serde(default)]
    pub unit_cost: Decimal,
}

impl Movement {
    /// Build a validated movement. The unit cost of a withdrawal is discarded.
    pub fn new(
        date: NaiveDate,
        kind: MovementKind,
        quantity: Decimal,
        unit_cost: Decimal,
    ) -> Result<Self, ValidationError> {
        let unit_cost = if kind.is_entry() {
            unit_cost
        } else {
            Decimal::ZERO
        };
        let m = Self {
            date,
            kind,
            quantity,
            unit_cost,
        };
        validate_movement(&m)?;
        Ok(m)
    }

    pub fn initial_stock(
        date: NaiveDate,
        quantity: Decimal,
        unit_cost: Decimal,
    ) -> Result<Self, ValidationError> {
        Self::new(date, MovementKind::InitialStock, quantity, unit_cost)
    }

    pub fn purchase(
        date: NaiveDate,
        quantity: Decimal,
        unit_cost: Decimal,
    ) -> Result<Self, ValidationError> {
        Self::new(date, MovementKind::Purchase, quantity, unit_cost)
    }

    pub fn withdrawal(date: NaiveDate, quantity: Decimal) -> Result<Self, ValidationError> {
        Self::new(date, MovementKind::Withdrawal, quantity, Decimal::ZERO)
    }

    /// Signed effect of this movement on the unit balance.
    pub fn signed_quantity(&self) -> Decimal {
        if self.kind.is_entry() {
            self.quantity
        } else {
            -self.quantity
        }
    }
}

/// One output row of an inventory card: entry, exit and running balance.
///
/// Invariant: `balance_total == previous balance_total + entry_total - exit_total`
/// and `balance_unit_cost == balance_total / balance_units` when units are
/// positive, otherwise zero.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LedgerRow {
    pub date: NaiveDate,
    pub kind: MovementKind,
    pub entry_units: Decimal,
    pub entry_unit_cost: Decimal,
    pub entry_total: Decimal,
    pub exit_units: Decimal,
    pub exit_unit_cost: Decimal,
    pub exit_total: Decimal,
    pub balance_units: Decimal,
    pub balance_unit_cost: Decimal,
    pub balance_total: Decimal,
}

/// One of the four cost centers of the allocation cascade.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Center {
    /// First production center.
    P1,
    /// Second production center.
    P2,
    /// First service center.
    S1,
    /// Second service center.
    S2,
}

impl Center {
    pub const ALL: [Center; 4] = [Center::P1, Center::P2, Center::S1, Center::S2];
}

/// Display labels for the four cost centers. Labels never affect arithmetic.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CenterNames {
    pub p1: String,
    pub p2: String,
    pub s1: String,
    pub s2: String,
}

impl Default for CenterNames {
    fn default() -> Self {
        Self {
            p1: "A".to_string(),
            p2: "B".to_string(),
            s1: "C".to_string(),
            s2: "D".to_string(),
        }
    }
}

impl CenterNames {
    pub fn name(&self, center: Center) -> &str {
        match center {
            Center::P1 => &self.p1,
            Center::P2 => &self.p2,
            Center::S1 => &self.s1,
            Center::S2 => &self.s2,
        }
    }
}

/// Four monetary amounts (or bases), one per cost center.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CenterAmounts {
    pub p1: Decimal,
    pub p2: Decimal,
    pub s1: Decimal,
    pub s2: Decimal,
}

impl CenterAmounts {
    pub fn new(p1: Decimal, p2: Decimal, s1: Decimal, s2: Decimal) -> Self {
        Self { p1, p2, s1, s2 }
    }

    pub fn get(&self, center: Center) -> Decimal {
        match center {
            Center::P1 => self.p1,
            Center::P2 => self.p2,
            Center::S1 => self.s1,
            Center::S2 => self.s2,
        }
    }

    pub fn get_mut(&mut self, center: Center) -> &mut Decimal {
        match center {
            Center::P1 => &mut self.p1,
            Center::P2 => &mut self.p2,
            Center::S1 => &mut self.s1,
            Center::S2 => &mut self.s2,
        }
    }

    /// Sum across the four centers (the TOTAL column).
    pub fn total(&self) -> Decimal {
        self.p1 + self.p2 + self.s1 + self.s2
    }

    /// Like [`total`](Self::total), `None` when the sum leaves the Decimal range.
    pub fn checked_total(&self) -> Option<Decimal> {
        self.p1
            .checked_add(self.p2)?
            .checked_add(self.s1)?
            .checked_add(self.s2)
    }

    /// Multiply every amount by the same factor; `None` on overflow.
    pub fn checked_scaled(&self, factor: Decimal) -> Option<Self> {
        Some(Self {
            p1: self.p1.checked_mul(factor)?,
            p2: self.p2.checked_mul(factor)?,
            s1: self.s1.checked_mul(factor)?,
            s2: self.s2.checked_mul(factor)?,
        })
    }

    pub fn checked_add(&self, rhs: &CenterAmounts) -> Option<Self> {
        Some(Self {
            p1: self.p1.checked_add(rhs.p1)?,
            p2: self.p2.checked_add(rhs.p2)?,
            s1: self.s1.checked_add(rhs.s1)?,
            s2: self.s2.checked_add(rhs.s2)?,
        })
    }
}

impl std::ops::Add for CenterAmounts {
    type Output = CenterAmounts;

    fn add(self, rhs: CenterAmounts) -> CenterAmounts {
        CenterAmounts {
            p1: self.p1 + rhs.p1,
            p2: self.p2 + rhs.p2,
            s1: self.s1 + rhs.s1,
            s2: self.s2 + rhs.s2,
        }
    }
}

impl std::iter::Sum for CenterAmounts {
    fn sum<I: Iterator<Item = CenterAmounts>>(iter: I) -> Self {
        iter.fold(CenterAmounts::default(), |acc, a| acc + a)
    }
}

/// A labelled row of the primary allocation table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AllocationRow {
    /// Cost item, e.g. "Indirect materials" or "Rent".
    pub label: String,
    /// Amount assigned to each center.
    pub amounts: CenterAmounts,
}

impl AllocationRow {
    /// A row entered directly, one amount per center.
    pub fn manual(label: impl Into<String>, amounts: CenterAmounts) -> Result<Self, ValidationError> {
        let row = Self {
            label: label.into(),
            amounts,
        };
        validate_allocation_row(&row)?;
        Ok(row)
    }

    /// A row that spreads `amount` over the centers in proportion to `bases`.
    ///
    /// When the bases sum to zero the factor is zero and the row is all zeros.
    pub fn proportional(
        label: impl Into<String>,
        amount: Decimal,
        bases: CenterAmounts,
    ) -> Result<Self, ValidationError> {
        if amount < Decimal::ZERO {
            return Err(ValidationError::NegativeMoney);
        }
        validate_bases(&bases)?;
        let label = label.into();
        let base_sum = bases.total();
        if base_sum.is_zero() {
            debug!(%label, "proportional row has no bases; factor set to zero");
        }
        let factor = safe_div(amount, base_sum);
        let amounts = bases
            .checked_scaled(factor)
            .ok_or(ValidationError::OutOfRange)?;
        Self::manual(label, amounts)
    }

    /// Row total across the four centers.
    pub fn total(&self) -> Decimal {
        self.amounts.total()
    }
}

/// A customer order or job absorbing production-center cost.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FinalOrder {
    pub label: String,
    /// Consumption base of the first production center.
    pub base_p1: Decimal,
    /// Consumption base of the second production center.
    pub base_p2: Decimal,
    /// Units produced; zero yields a zero unit cost.
    pub units: Decimal,
}

impl FinalOrder {
    pub fn new(
        label: impl Into<String>,
        base_p1: Decimal,
        base_p2: Decimal,
        units: Decimal,
    ) -> Result<Self, ValidationError> {
        let o = Self {
            label: label.into(),
            base_p1,
            base_p2,
            units,
        };
        validate_final_order(&o)?;
        Ok(o)
    }
}

/// Validation errors for record invariants.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    /// Movement quantity must be strictly positive.
    #[error("quantity must be > 0, got {0}")]
    NonPositiveQuantity(Decimal),
    /// Costs and amounts must be non-negative.
    #[error("negative monetary value is invalid")]
    NegativeMoney,
    /// Allocation bases must be non-negative.
    #[error("allocation base must be >= 0")]
    NegativeBase,
    /// Order units must be non-negative.
    #[error("units must be >= 0, got {0}")]
    NegativeUnits(Decimal),
    #[error("amount is out of range")]
    OutOfRange,
}

/// Validate a stock movement.
pub fn validate_movement(m: &Movement) -> Result<(), ValidationError> {
    if m.quantity <= Decimal::ZERO {
        return Err(ValidationError::NonPositiveQuantity(m.quantity));
    }
    if m.unit_cost < Decimal::ZERO {
        return Err(ValidationError::NegativeMoney);
    }
    Ok(())
}

/// Validate a set of allocation bases.
pub fn validate_bases(bases: &CenterAmounts) -> Result<(), ValidationError> {
    if Center::ALL.iter().any(|&c| bases.get(c) < Decimal::ZERO) {
        return Err(ValidationError::NegativeBase);
    }
    Ok(())
}

/// Validate a primary allocation row.
pub fn validate_allocation_row(row: &AllocationRow) -> Result<(), ValidationError> {
    if Center::ALL.iter().any(|&c| row.amounts.get(c) < Decimal::ZERO) {
        return Err(ValidationError::NegativeMoney);
    }
    Ok(())
}

/// Validate a final order.
pub fn validate_final_order(o: &FinalOrder) -> Result<(), ValidationError> {
    if o.base_p1 < Decimal::ZERO || o.base_p2 < Decimal::ZERO {
        return Err(ValidationError::NegativeBase);
    }
    if o.units < Decimal::ZERO {
        return Err(ValidationError::NegativeUnits(o.units));
    }
    Ok(())
}

/// Divide, substituting zero when the divisor is not strictly positive.
///
/// Empty balances and empty base sets are a normal transient state, so the
/// quotient softens to zero instead of failing.
pub fn safe_div(numerator: Decimal, divisor: Decimal) -> Decimal {
    if divisor <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    numerator.checked_div(divisor).unwrap_or(Decimal::ZERO)
}
