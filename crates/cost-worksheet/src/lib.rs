#![deny(warnings)]

//! Worksheet: the caller-owned accumulator of user-entered records.
//!
//! A worksheet collects movements, primary table rows, final orders and the
//! cascade settings across interactions, checks each record at intake, and
//! re-runs the stateless engines over the full accumulated input on demand.
//! It is an ordinary owned value; each session keeps its own.

pub mod scenario;

use cost_allocation::{cascade, Cascade, CascadeConfig};
use cost_core::{
    validate_final_order, AllocationRow, CenterAmounts, CenterNames,
    FinalOrder, Movement, MovementKind, ValidationError,
};
use cost_valuation::{compute_ledger, CostingPolicy, Ledger, ValuationError};
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::{debug, info, warn};

pub use scenario::{load_scenario, PrimaryEntry, Scenario};

#[derive(Debug, Error)]
pub enum WorksheetError {
    /// A withdrawal was entered for more units than currently in stock.
    #[error("insufficient stock: requested {requested}, available {available}")]
    InsufficientStock {
        requested: Decimal,
        available: Decimal,
    },
    #[error("invalid record: {0}")]
    Invalid(#[from] ValidationError),
    #[error("valuation failed: {0}")]
    Valuation(#[from] ValuationError),
    #[error("io error: {0}")]
    Io(String),
    #[error("malformed scenario: {0}")]
    Format(String),
}

impl From<std::io::Error> for WorksheetError {
    fn from(e: std::io::Error) -> Self {
        WorksheetError::Io(e.to_string())
    }
}

/// Accumulated inputs of both calculators.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Worksheet {
    pub names: CenterNames,
    movements: Vec<Movement>,
    primary_rows: Vec<AllocationRow>,
    orders: Vec<FinalOrder>,
    /// Elimination order, bases and factor modes for stages II and III.
    pub config: CascadeConfig,
}

impl Worksheet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_names(names: CenterNames) -> Self {
        Self {
            names,
            ..Self::default()
        }
    }

    /// Rebuild a worksheet from a scenario, applying the same intake checks
    /// as interactive entry.
    pub fn from_scenario(scenario: &Scenario) -> Result<Self, WorksheetError> {
        let mut ws = Self::with_names(scenario.names.clone());
        for m in &scenario.movements {
            ws.record_movement(m.clone())?;
        }
        for entry in &scenario.primary {
            match entry {
                PrimaryEntry::Manual { label, amounts } => {
                    ws.add_manual_row(label.clone(), *amounts)?;
                }
                PrimaryEntry::Proportional {
                    label,
                    amount,
                    bases,
                } => {
                    ws.add_proportional_row(label.clone(), *amount, *bases)?;
                }
            }
        }
        for o in &scenario.orders {
            ws.add_final_order(o.clone())?;
        }
        ws.config = scenario.cascade.clone();
        info!(
            movements = ws.movements.len(),
            primary_rows = ws.primary_rows.len(),
            orders = ws.orders.len(),
            "worksheet loaded from scenario"
        );
        Ok(ws)
    }

    pub fn movements(&self) -> &[Movement] {
        &self.movements
    }

    pub fn primary_rows(&self) -> &[AllocationRow] {
        &self.primary_rows
    }

    pub fn orders(&self) -> &[FinalOrder] {
        &self.orders
    }

    /// Units on hand: entries minus withdrawals recorded so far.
    pub fn stock_on_hand(&self) -> Decimal {
        self.movements.iter().map(Movement::signed_quantity).sum()
    }

    /// Append a movement, rejecting a withdrawal larger than the current stock.
    pub fn record_movement(&mut self, movement: Movement) -> Result<(), WorksheetError> {
        let movement = Movement::new(
            movement.date,
            movement.kind,
            movement.quantity,
            movement.unit_cost,
        )?;
        if movement.kind == MovementKind::Withdrawal {
            let available = self.stock_on_hand();
            if movement.quantity > available {
                warn!(requested = %movement.quantity, %available, "withdrawal rejected");
                return Err(WorksheetError::InsufficientStock {
                    requested: movement.quantity,
                    available,
                });
            }
        }
        debug!(kind = %movement.kind, quantity = %movement.quantity, "movement recorded");
        self.movements.push(movement);
        Ok(())
    }

    pub fn add_manual_row(
        &mut self,
        label: impl Into<String>,
        amounts: CenterAmounts,
    ) -> Result<&AllocationRow, WorksheetError> {
        let row = AllocationRow::manual(label, amounts)?;
        Ok(self.push_row(row))
    }

    /// Append a row spreading `amount` over the centers by `bases`.
    pub fn add_proportional_row(
        &mut self,
        label: impl Into<String>,
        amount: Decimal,
        bases: CenterAmounts,
    ) -> Result<&AllocationRow, WorksheetError> {
        let row = AllocationRow::proportional(label, amount, bases)?;
        Ok(self.push_row(row))
    }

    fn push_row(&mut self, row: AllocationRow) -> &AllocationRow {
        debug!(label = %row.label, total = %row.total(), "primary row added");
        self.primary_rows.push(row);
        &self.primary_rows[self.primary_rows.len() - 1]
    }

    pub fn add_final_order(&mut self, order: FinalOrder) -> Result<(), WorksheetError> {
        validate_final_order(&order)?;
        debug!(label = %order.label, "final order added");
        self.orders.push(order);
        Ok(())
    }

    pub fn clear_movements(&mut self) {
        self.movements.clear();
    }

    pub fn clear_primary(&mut self) {
        self.primary_rows.clear();
    }

    pub fn clear_orders(&mut self) {
        self.orders.clear();
    }

    /// Discard every accumulated record and setting, keeping the center names.
    pub fn clear_all(&mut self) {
        let names = std::mem::take(&mut self.names);
        *self = Self::with_names(names);
    }

    /// Recompute the inventory card from every recorded movement.
    pub fn ledger(&self, policy: CostingPolicy) -> Result<Ledger, WorksheetError> {
        Ok(compute_ledger(&self.movements, policy)?)
    }

    /// Recompute the three allocation schedules from the accumulated input.
    pub fn cascade(&self) -> Cascade {
        cascade(&self.primary_rows, &self.orders, &self.config)
    }
}
