//! Stage II: redistribution of the two service centers into production.
//!
//! The service centers are eliminated in a caller-chosen order with a
//! single forward pass. The first center spreads over both production
//! centers and the second service center; the second center then spreads
//! its own cost plus what it received over production only. The result
//! depends on the order.

use crate::factor::{resolve_factor, FactorMode, ResolvedFactor};
use crate::ratio::RatioError;
use cost_core::{Center, CenterAmounts};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Order in which the service centers are eliminated.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EliminationOrder {
    /// S1 first, then S2.
    #[default]
    S1First,
    /// S2 first, then S1.
    S2First,
}

impl EliminationOrder {
    pub fn first(self) -> Center {
        match self {
            EliminationOrder::S1First => Center::S1,
            EliminationOrder::S2First => Center::S2,
        }
    }

    pub fn second(self) -> Center {
        match self {
            EliminationOrder::S1First => Center::S2,
            EliminationOrder::S2First => Center::S1,
        }
    }
}

/// Bases and factor mode for distributing the first service center.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FirstStepConfig {
    pub base_p1: Decimal,
    pub base_p2: Decimal,
    /// Base of the second service center.
    pub base_service: Decimal,
    pub mode: FactorMode,
}

/// Bases and factor mode for distributing the second service center.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SecondStepConfig {
    pub base_p1: Decimal,
    pub base_p2: Decimal,
    pub mode: FactorMode,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SecondaryConfig {
    pub order: EliminationOrder,
    pub first_step: FirstStepConfig,
    pub second_step: SecondStepConfig,
}

/// Outcome of distributing one service center.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepResult {
    pub source: Center,
    pub to_distribute: Decimal,
    pub factor: ResolvedFactor,
    /// Amount received by each recipient; the source column is zero.
    pub allocated: CenterAmounts,
}

impl StepResult {
    /// Total handed out to the recipients.
    pub fn distributed(&self) -> Decimal {
        self.allocated.total()
    }

    /// What the source keeps because the factor did not absorb it exactly.
    pub fn residual(&self) -> Decimal {
        self.to_distribute - self.distributed()
    }
}

/// Caption of a secondary schedule line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineKind {
    /// Totals carried over from the primary stage.
    StartingTotals,
    /// Transfer out of the named service center.
    TransferFrom(Center),
    /// Running subtotal after the first transfer.
    Subtotal,
    Totals,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleLine {
    pub kind: LineKind,
    pub amounts: CenterAmounts,
    /// Row sum across the four centers.
    pub total: Decimal,
}

impl ScheduleLine {
    fn new(kind: LineKind, amounts: CenterAmounts) -> Self {
        Self {
            kind,
            amounts,
            total: amounts.total(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecondarySchedule {
    pub order: EliminationOrder,
    pub first_step: StepResult,
    pub second_step: StepResult,
    /// Starting totals, first transfer, subtotal, second transfer, totals.
    pub lines: Vec<ScheduleLine>,
}

impl SecondarySchedule {
    /// Per-center amounts after both transfers.
    pub fn final_totals(&self) -> CenterAmounts {
        self.lines
            .last()
            .map(|l| l.amounts)
            .unwrap_or_default()
    }

    /// Accumulated cost of a production center after both transfers.
    pub fn production_total(&self, center: Center) -> Decimal {
        self.final_totals().get(center)
    }

    pub fn advisories(&self) -> impl Iterator<Item = &RatioError> {
        [&self.first_step, &self.second_step]
            .into_iter()
            .filter_map(|s| s.factor.advisory.as_ref())
    }
}

/// Redistribute the service centers of `primary` per `config`.
///
/// A factor whose transfer would leave the Decimal range is replaced by zero
/// with a [`RatioError::Overflow`] advisory; the schedule is still produced.
pub fn compute_secondary(primary: &CenterAmounts, config: &SecondaryConfig) -> SecondarySchedule {
    let first = config.order.first();
    let second = config.order.second();
    let starting = *primary;

    let mut first_bases = CenterAmounts::new(
        config.first_step.base_p1,
        config.first_step.base_p2,
        Decimal::ZERO,
        Decimal::ZERO,
    );
    *first_bases.get_mut(second) = config.first_step.base_service;
    let (first_step, subtotal) = distribute(first, &starting, first_bases, &config.first_step.mode);

    let second_bases = CenterAmounts::new(
        config.second_step.base_p1,
        config.second_step.base_p2,
        Decimal::ZERO,
        Decimal::ZERO,
    );
    let (second_step, totals) = distribute(second, &subtotal, second_bases, &config.second_step.mode);

    debug!(
        ?first,
        ?second,
        p1 = %totals.p1,
        p2 = %totals.p2,
        "secondary distribution computed"
    );

    SecondarySchedule {
        order: config.order,
        lines: vec![
            ScheduleLine::new(LineKind::StartingTotals, starting),
            ScheduleLine::new(LineKind::TransferFrom(first), outflow(&first_step)),
            ScheduleLine::new(LineKind::Subtotal, subtotal),
            ScheduleLine::new(LineKind::TransferFrom(second), outflow(&second_step)),
            ScheduleLine::new(LineKind::Totals, totals),
        ],
        first_step,
        second_step,
    }
}

/// Distribute the `source` column of `before` over `bases`, returning the
/// step and the per-center amounts after the transfer.
fn distribute(
    source: Center,
    before: &CenterAmounts,
    bases: CenterAmounts,
    mode: &FactorMode,
) -> (StepResult, CenterAmounts) {
    let to_distribute = before.get(source);
    let base_sum = bases.checked_total();
    let mut factor = resolve_factor(mode, to_distribute, base_sum.unwrap_or_default());
    let done = base_sum.and_then(|_| transfer(source, before, &bases, factor.factor));
    let (allocated, after) = match done {
        Some(done) => done,
        None => {
            factor.fall_back(RatioError::Overflow);
            (CenterAmounts::default(), *before)
        }
    };
    let step = StepResult {
        source,
        to_distribute,
        factor,
        allocated,
    };
    (step, after)
}

/// Allocation and resulting amounts, or `None` if any sum overflows.
fn transfer(
    source: Center,
    before: &CenterAmounts,
    bases: &CenterAmounts,
    factor: Decimal,
) -> Option<(CenterAmounts, CenterAmounts)> {
    let allocated = bases.checked_scaled(factor)?;
    let mut line = allocated;
    *line.get_mut(source) = -allocated.checked_total()?;
    line.checked_total()?;
    let after = before.checked_add(&line)?;
    after.checked_total()?;
    Some((allocated, after))
}

/// Transfer line of a step: recipients gain, the source gives up the same amount.
fn outflow(step: &StepResult) -> CenterAmounts {
    let mut line = step.allocated;
    *line.get_mut(step.source) = -step.distributed();
    line
}
