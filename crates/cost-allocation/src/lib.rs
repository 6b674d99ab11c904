#![deny(warnings)]

//! Overhead allocation cascade.
//!
//! Three stages, each a pure function of the previous stage's output plus
//! its own configuration:
//! - Stage I ([`primary`]): indirect costs summed per cost center
//! - Stage II ([`secondary`]): service centers redistributed into production
//! - Stage III ([`absorption`]): production cost absorbed by final orders
//!
//! Empty base sets and unparsable ratios soften to a zero factor; a cascade
//! always completes.

pub mod absorption;
pub mod factor;
pub mod primary;
pub mod ratio;
pub mod secondary;

use cost_core::{AllocationRow, FinalOrder};
use serde::{Deserialize, Serialize};

pub use absorption::{compute_final, AbsorptionConfig, FinalSchedule, OrderCost, TOTALS_LABEL};
pub use factor::{resolve_factor, FactorMode, ResolvedFactor};
pub use primary::{compute_primary, PrimarySchedule};
pub use ratio::{parse_ratio, RatioError};
pub use secondary::{
    compute_secondary, EliminationOrder, FirstStepConfig, LineKind, ScheduleLine,
    SecondaryConfig, SecondarySchedule, SecondStepConfig, StepResult,
};

/// Stage II and III settings for one cascade run.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CascadeConfig {
    pub secondary: SecondaryConfig,
    pub absorption: AbsorptionConfig,
}

/// The three schedules produced by a cascade run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Cascade {
    pub primary: PrimarySchedule,
    pub secondary: SecondarySchedule,
    pub absorption: FinalSchedule,
}

impl Cascade {
    /// Every ratio that fell back to a zero factor, in stage order.
    pub fn advisories(&self) -> Vec<&RatioError> {
        self.secondary
            .advisories()
            .chain(
                [&self.absorption.factor_p1, &self.absorption.factor_p2]
                    .into_iter()
                    .filter_map(|f| f.advisory.as_ref()),
            )
            .collect()
    }
}

/// Run all three stages.
pub fn cascade(rows: &[AllocationRow], orders: &[FinalOrder], config: &CascadeConfig) -> Cascade {
    let primary = compute_primary(rows);
    let secondary = compute_secondary(&primary.totals, &config.secondary);
    let absorption = compute_final(&secondary.final_totals(), orders, &config.absorption);
    Cascade {
        primary,
        secondary,
        absorption,
    }
}
