#![deny(warnings)]

//! Inventory valuation: turns an ordered stream of stock movements into an
//! inventory card (entries, exits, running balance) under a costing policy.
//!
//! Supported policies:
//! - Weighted average: exits leave at the running average cost
//! - FIFO: exits consume the oldest cost layers first
//! - LIFO: exits consume the newest cost layers first
//!
//! The calculation is a pure function of its input. A withdrawal that asks
//! for more units than the card holds is reported as an error rather than
//! partially consumed.

pub mod layers;

use chrono::NaiveDate;
use cost_core::{safe_div, validate_movement, LedgerRow, Movement, ValidationError};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::debug;

pub use layers::{ConsumeFrom, CostLayer, LayerStack};

/// Costing policy used to value withdrawals.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CostingPolicy {
    #[default]
    #[serde(alias = "average")]
    WeightedAverage,
    Fifo,
    Lifo,
}

impl CostingPolicy {
    pub const ALL: [CostingPolicy; 3] = [
        CostingPolicy::WeightedAverage,
        CostingPolicy::Fifo,
        CostingPolicy::Lifo,
    ];

    /// Layer end consumed by withdrawals, or `None` for the average policy.
    pub fn consume_from(self) -> Option<ConsumeFrom> {
        match self {
            CostingPolicy::WeightedAverage => None,
            CostingPolicy::Fifo => Some(ConsumeFrom::Head),
            CostingPolicy::Lifo => Some(ConsumeFrom::Tail),
        }
    }
}

impl fmt::Display for CostingPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CostingPolicy::WeightedAverage => "weighted average",
            CostingPolicy::Fifo => "FIFO",
            CostingPolicy::Lifo => "LIFO",
        })
    }
}

impl FromStr for CostingPolicy {
    type Err = ValuationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "average" | "avg" | "weighted_average" | "weighted-average" => {
                Ok(CostingPolicy::WeightedAverage)
            }
            "fifo" => Ok(CostingPolicy::Fifo),
            "lifo" => Ok(CostingPolicy::Lifo),
            other => Err(ValuationError::UnknownPolicy(other.to_string())),
        }
    }
}

/// Errors produced by the valuation ledger.
#[derive(Debug, Error, PartialEq)]
pub enum ValuationError {
    /// A withdrawal asked for more units than the card held at that point.
    #[error("movement #{index} on {date}: withdrawal of {requested} units exceeds stock of {available}")]
    InsufficientStock {
        index: usize,
        date: NaiveDate,
        requested: Decimal,
        available: Decimal,
    },
    /// A movement failed field validation.
    #[error("movement #{index}: {source}")]
    Invalid {
        index: usize,
        #[source]
        source: ValidationError,
    },
    #[error("unknown costing policy: {0}")]
    UnknownPolicy(String),
}

/// A computed inventory card.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Ledger {
    pub policy: CostingPolicy,
    /// One row per movement, in input order.
    pub rows: Vec<LedgerRow>,
    /// Layers left after the last movement; empty for the average policy.
    pub layers: Vec<CostLayer>,
}

impl Ledger {
    /// Balance after the last movement as (units, unit cost, total).
    pub fn closing_balance(&self) -> (Decimal, Decimal, Decimal) {
        self.rows
            .last()
            .map(|r| (r.balance_units, r.balance_unit_cost, r.balance_total))
            .unwrap_or((Decimal::ZERO, Decimal::ZERO, Decimal::ZERO))
    }

    pub fn total_entries(&self) -> Decimal {
        self.rows.iter().map(|r| r.entry_total).sum()
    }

    pub fn total_exits(&self) -> Decimal {
        self.rows.iter().map(|r| r.exit_total).sum()
    }
}

/// Compute the inventory card for `movements` under `policy`.
///
/// Movements are processed in the order given; they are not re-sorted by
/// date. Every row is derived from the running totals, never from a rounded
/// prior row.
pub fn compute_ledger(
    movements: &[Movement],
    policy: CostingPolicy,
) -> Result<Ledger, ValuationError> {
    let mut stack = LayerStack::new();
    let mut units = Decimal::ZERO;
    let mut value = Decimal::ZERO;
    let mut rows = Vec::with_capacity(movements.len());

    for (index, m) in movements.iter().enumerate() {
        validate_movement(m).map_err(|source| ValuationError::Invalid { index, source })?;
        let mut row = LedgerRow {
            date: m.date,
            kind: m.kind,
            entry_units: Decimal::ZERO,
            entry_unit_cost: Decimal::ZERO,
            entry_total: Decimal::ZERO,
            exit_units: Decimal::ZERO,
            exit_unit_cost: Decimal::ZERO,
            exit_total: Decimal::ZERO,
            balance_units: Decimal::ZERO,
            balance_unit_cost: Decimal::ZERO,
            balance_total: Decimal::ZERO,
        };

        if m.kind.is_entry() {
            let total = m.quantity * m.unit_cost;
            if policy.consume_from().is_some() {
                stack.push(CostLayer::new(m.quantity, m.unit_cost));
            }
            row.entry_units = m.quantity;
            row.entry_unit_cost = m.unit_cost;
            row.entry_total = total;
            units += m.quantity;
            value += total;
        } else {
            let shortfall = || ValuationError::InsufficientStock {
                index,
                date: m.date,
                requested: m.quantity,
                available: units,
            };
            if m.quantity > units {
                return Err(shortfall());
            }
            let (exit_unit_cost, exit_total) = match policy.consume_from() {
                None => {
                    let average = safe_div(value, units);
                    // Emptying the card takes out exactly what is held.
                    if m.quantity == units {
                        (average, value)
                    } else {
                        (average, m.quantity * average)
                    }
                }
                Some(from) => {
                    let consumed = stack.consume(m.quantity, from).ok_or_else(shortfall)?;
                    (safe_div(consumed, m.quantity), consumed)
                }
            };
            row.exit_units = m.quantity;
            row.exit_unit_cost = exit_unit_cost;
            row.exit_total = exit_total;
            units -= m.quantity;
            value -= exit_total;
        }

        row.balance_units = units;
        row.balance_total = value;
        row.balance_unit_cost = safe_div(value, units);
        debug!(
            index,
            kind = %m.kind,
            %policy,
            balance_units = %units,
            balance_total = %value,
            "ledger row computed"
        );
        rows.push(row);
    }

    Ok(Ledger {
        policy,
        rows,
        layers: stack.into_vec(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn d(n: i64) -> Decimal {
        Decimal::new(n, 0)
    }

    fn day(n: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, n).unwrap()
    }

    fn textbook(withdraw: i64) -> Vec<Movement> {
        vec![
            Movement::initial_stock(day(1), d(10), d(100)).unwrap(),
            Movement::purchase(day(2), d(10), d(200)).unwrap(),
            Movement::withdrawal(day(3), d(withdraw)).unwrap(),
        ]
    }

    #[test]
    fn weighted_average_exit_uses_running_average() {
        let ledger = compute_ledger(&textbook(5), CostingPolicy::WeightedAverage).unwrap();
        let after_purchase = &ledger.rows[1];
        assert_eq!(after_purchase.balance_units, d(20));
        assert_eq!(after_purchase.balance_total, d(3000));
        assert_eq!(after_purchase.balance_unit_cost, d(150));

        let exit = &ledger.rows[2];
        assert_eq!(exit.exit_unit_cost, d(150));
        assert_eq!(exit.exit_total, d(750));
        assert_eq!(exit.balance_units, d(15));
        assert_eq!(exit.balance_total, d(2250));
        assert!(ledger.layers.is_empty());
    }

    #[test]
    fn fifo_consumes_oldest_layers() {
        let ledger = compute_ledger(&textbook(12), CostingPolicy::Fifo).unwrap();
        let exit = &ledger.rows[2];
        assert_eq!(exit.exit_total, d(1400));
        let drift = (exit.exit_unit_cost * d(12) - d(1400)).abs();
        assert!(drift < Decimal::new(1, 20));
        assert_eq!(ledger.layers, vec![CostLayer::new(d(8), d(200))]);
        assert_eq!(ledger.closing_balance(), (d(8), d(200), d(1600)));
    }

    #[test]
    fn lifo_consumes_newest_layers() {
        let ledger = compute_ledger(&textbook(12), CostingPolicy::Lifo).unwrap();
        assert_eq!(ledger.rows[2].exit_total, d(2200));
        assert_eq!(ledger.layers, vec![CostLayer::new(d(8), d(100))]);
        assert_eq!(ledger.closing_balance(), (d(8), d(100), d(800)));
    }

    #[test]
    fn entry_rows_carry_no_exit() {
        let ledger = compute_ledger(&textbook(5), CostingPolicy::Fifo).unwrap();
        let first = &ledger.rows[0];
        assert_eq!(first.entry_total, d(1000));
        assert_eq!(first.exit_units, Decimal::ZERO);
        assert_eq!(first.exit_total, Decimal::ZERO);
    }

    #[test]
    fn overdrawn_withdrawal_is_an_error_for_every_policy() {
        for policy in CostingPolicy::ALL {
            let err = compute_ledger(&textbook(21), policy).unwrap_err();
            assert_eq!(
                err,
                ValuationError::InsufficientStock {
                    index: 2,
                    date: day(3),
                    requested: d(21),
                    available: d(20),
                }
            );
        }
    }

    #[test]
    fn emptying_the_card_zeroes_the_unit_cost() {
        let ledger = compute_ledger(&textbook(20), CostingPolicy::Lifo).unwrap();
        assert_eq!(ledger.closing_balance(), (d(0), d(0), d(0)));
        assert!(ledger.layers.is_empty());
    }

    #[test]
    fn emptying_an_uneven_average_leaves_nothing_behind() {
        for cost in [1, 2] {
            let movements = vec![
                Movement::purchase(day(1), d(1), d(cost)).unwrap(),
                Movement::purchase(day(2), d(2), d(0)).unwrap(),
                Movement::withdrawal(day(3), d(3)).unwrap(),
            ];
            let ledger = compute_ledger(&movements, CostingPolicy::WeightedAverage).unwrap();
            let exit = &ledger.rows[2];
            assert_eq!(exit.exit_total, d(cost));
            assert_eq!(ledger.closing_balance(), (d(0), d(0), d(0)));
        }
    }

    #[test]
    fn entries_minus_exits_is_the_closing_total() {
        for policy in CostingPolicy::ALL {
            let ledger = compute_ledger(&textbook(12), policy).unwrap();
            assert_eq!(ledger.total_entries(), d(3000));
            assert_eq!(
                ledger.total_entries() - ledger.total_exits(),
                ledger.closing_balance().2
            );
        }
        let fifo = compute_ledger(&textbook(12), CostingPolicy::Fifo).unwrap();
        assert_eq!(fifo.total_exits(), d(1400));
    }

    #[test]
    fn unvalidated_movement_is_rejected() {
        let mut movements = textbook(5);
        movements[1].quantity = Decimal::ZERO;
        let err = compute_ledger(&movements, CostingPolicy::WeightedAverage).unwrap_err();
        assert!(matches!(err, ValuationError::Invalid { index: 1, .. }));
    }

    #[test]
    fn empty_input_gives_empty_card() {
        let ledger = compute_ledger(&[], CostingPolicy::Fifo).unwrap();
        assert!(ledger.rows.is_empty());
        assert_eq!(ledger.closing_balance(), (d(0), d(0), d(0)));
    }

    #[test]
    fn policy_parses_from_text() {
        assert_eq!("Average".parse::<CostingPolicy>().unwrap(), CostingPolicy::WeightedAverage);
        assert_eq!("fifo".parse::<CostingPolicy>().unwrap(), CostingPolicy::Fifo);
        assert_eq!(" LIFO ".parse::<CostingPolicy>().unwrap(), CostingPolicy::Lifo);
        assert!("peps".parse::<CostingPolicy>().is_err());
        let p: CostingPolicy = serde_json::from_str("\"average\"").unwrap();
        assert_eq!(p, CostingPolicy::WeightedAverage);
    }

    #[derive(Clone, Debug)]
    enum Op {
        /// Units, cost mantissa, cost scale.
        Buy(i64, i64, u32),
        Take(i64),
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (1i64..50, 0i64..50_000, 0u32..5).prop_map(|(q, c, s)| Op::Buy(q, c, s)),
            (1i64..60).prop_map(Op::Take),
        ]
    }

    /// Units on hand at the end of `movements`.
    fn stock_of(movements: &[Movement]) -> Decimal {
        movements.iter().map(Movement::signed_quantity).sum()
    }

    /// Build a valid movement stream, clamping withdrawals to the stock on hand.
    fn stream(ops: &[Op]) -> Vec<Movement> {
        let mut stock = 0i64;
        let mut out = vec![Movement::initial_stock(day(1), d(5), Decimal::new(1000, 2)).unwrap()];
        stock += 5;
        for o in ops {
            match *o {
                Op::Buy(q, c, scale) => {
                    out.push(Movement::purchase(day(2), d(q), Decimal::new(c, scale)).unwrap());
                    stock += q;
                }
                Op::Take(q) if stock > 0 => {
                    let q = q.min(stock);
                    out.push(Movement::withdrawal(day(3), d(q)).unwrap());
                    stock -= q;
                }
                Op::Take(_) => {}
            }
        }
        out
    }

    proptest! {
        #[test]
        fn balance_is_additive(ops in proptest::collection::vec(op(), 0..40)) {
            let movements = stream(&ops);
            for policy in CostingPolicy::ALL {
                let ledger = compute_ledger(&movements, policy).unwrap();
                let mut prev = Decimal::ZERO;
                for row in &ledger.rows {
                    prop_assert_eq!(row.balance_total, prev + row.entry_total - row.exit_total);
                    prev = row.balance_total;
                }
            }
        }

        #[test]
        fn layers_account_for_every_unit(ops in proptest::collection::vec(op(), 0..40)) {
            let movements = stream(&ops);
            for policy in [CostingPolicy::Fifo, CostingPolicy::Lifo] {
                for end in 1..=movements.len() {
                    let ledger = compute_ledger(&movements[..end], policy).unwrap();
                    let held: Decimal = ledger.layers.iter().map(|l| l.remaining_units).sum();
                    prop_assert_eq!(held, ledger.closing_balance().0);
                }
            }
        }

        #[test]
        fn average_holds_across_consecutive_exits(ops in proptest::collection::vec(op(), 0..40)) {
            let movements = stream(&ops);
            let ledger = compute_ledger(&movements, CostingPolicy::WeightedAverage).unwrap();
            for pair in ledger.rows.windows(2) {
                let (a, b) = (&pair[0], &pair[1]);
                if b.entry_units.is_zero() && !b.balance_units.is_zero() {
                    let drift = (a.balance_unit_cost - b.balance_unit_cost).abs();
                    prop_assert!(drift < Decimal::new(1, 18));
                }
            }
        }

        #[test]
        fn empty_card_holds_no_value(ops in proptest::collection::vec(op(), 0..40)) {
            let mut movements = stream(&ops);
            let left = stock_of(&movements);
            if left > Decimal::ZERO {
                movements.push(Movement::withdrawal(day(4), left).unwrap());
            }
            for policy in CostingPolicy::ALL {
                let ledger = compute_ledger(&movements, policy).unwrap();
                for row in &ledger.rows {
                    prop_assert!(row.balance_total >= Decimal::ZERO);
                    if row.balance_units.is_zero() {
                        prop_assert_eq!(row.balance_total, Decimal::ZERO);
                    }
                }
                prop_assert_eq!(ledger.closing_balance(), (Decimal::ZERO, Decimal::ZERO, Decimal::ZERO));
                if policy.consume_from().is_some() {
                    prop_assert_eq!(ledger.total_entries() - ledger.total_exits(), Decimal::ZERO);
                }
                prop_assert!(ledger.layers.is_empty());
            }
        }

        #[test]
        fn recomputation_is_identical(ops in proptest::collection::vec(op(), 0..40)) {
            let movements = stream(&ops);
            for policy in CostingPolicy::ALL {
                prop_assert_eq!(
                    compute_ledger(&movements, policy).unwrap(),
                    compute_ledger(&movements, policy).unwrap()
                );
            }
        }
    }
}
