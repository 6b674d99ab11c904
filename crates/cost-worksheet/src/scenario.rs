//! Scenario files: a full set of worksheet inputs in YAML or JSON.

use crate::WorksheetError;
use cost_allocation::CascadeConfig;
use cost_core::{CenterAmounts, CenterNames, FinalOrder, Movement};
use cost_valuation::CostingPolicy;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// A primary table entry as typed by the user.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "entry", rename_all = "snake_case")]
pub enum PrimaryEntry {
    /// Amounts entered per center.
    Manual {
        label: String,
        #[serde(flatten)]
        amounts: CenterAmounts,
    },
    /// An amount spread over the centers by bases.
    Proportional {
        label: String,
        amount: Decimal,
        bases: CenterAmounts,
    },
}

/// Everything needed to rebuild a worksheet.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Scenario {
    pub names: CenterNames,
    pub policy: CostingPolicy,
    pub movements: Vec<Movement>,
    pub primary: Vec<PrimaryEntry>,
    pub cascade: CascadeConfig,
    pub orders: Vec<FinalOrder>,
}

impl Scenario {
    pub fn from_yaml(text: &str) -> Result<Self, WorksheetError> {
        serde_yaml::from_str(text).map_err(|e| WorksheetError::Format(e.to_string()))
    }

    pub fn from_json(text: &str) -> Result<Self, WorksheetError> {
        serde_json::from_str(text).map_err(|e| WorksheetError::Format(e.to_string()))
    }
}

/// Load a scenario, choosing the format from the file extension (`.json`
/// for JSON, anything else is read as YAML).
pub fn load_scenario<P: AsRef<Path>>(path: P) -> Result<Scenario, WorksheetError> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)?;
    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));
    if is_json {
        Scenario::from_json(&text)
    } else {
        Scenario::from_yaml(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cost_allocation::{EliminationOrder, FactorMode};

    const YAML: &str = r#"
names: { p1: Cutting, p2: Assembly, s1: Maintenance, s2: Canteen }
policy: fifo
movements:
  - { date: 2024-01-01, kind: InitialStock, quantity: "10", unit_cost: "100" }
  - { date: 2024-01-05, kind: Purchase, quantity: "10", unit_cost: "200" }
  - { date: 2024-01-09, kind: Withdrawal, quantity: "12" }
primary:
  - { entry: manual, label: Indirect labour, p1: "600", p2: "1200", s1: "50", s2: "150" }
  - entry: proportional
    label: Rent
    amount: "1250"
    bases: { p1: "2", p2: "4", s1: "2", s2: "2" }
cascade:
  secondary:
    order: s2_first
    first_step: { base_p1: "10", base_p2: "10", base_service: "10" }
    second_step: { base_p1: "1", base_p2: "1", mode: { mode: manual, ratio: "50/2" } }
orders:
  - { label: Order 1, base_p1: "60", base_p2: "20", units: "100" }
"#;

    #[test]
    fn yaml_scenario_parses() {
        let s = Scenario::from_yaml(YAML).unwrap();
        assert_eq!(s.names.p2, "Assembly");
        assert_eq!(s.policy, CostingPolicy::Fifo);
        assert_eq!(s.movements.len(), 3);
        assert_eq!(s.movements[2].unit_cost, Decimal::ZERO);
        assert_eq!(s.primary.len(), 2);
        assert!(matches!(&s.primary[0], PrimaryEntry::Manual { amounts, .. } if amounts.s1 == Decimal::new(50, 0)));
        assert_eq!(s.cascade.secondary.order, EliminationOrder::S2First);
        assert_eq!(s.cascade.secondary.first_step.mode, FactorMode::Automatic);
        assert_eq!(s.cascade.secondary.second_step.mode, FactorMode::manual("50/2"));
        assert_eq!(s.orders[0].units, Decimal::new(100, 0));
    }

    #[test]
    fn empty_document_is_an_empty_scenario() {
        let s = Scenario::from_yaml("{}").unwrap();
        assert_eq!(s, Scenario::default());
    }

    #[test]
    fn bad_document_is_a_format_error() {
        assert!(matches!(
            Scenario::from_json("{\"policy\": \"peps\"}"),
            Err(WorksheetError::Format(_))
        ));
    }

    #[test]
    fn bundled_scenario_runs_end_to_end() {
        let path = std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("../../assets/scenarios/textbook.yaml");
        let scenario = load_scenario(&path).unwrap();
        let ws = crate::Worksheet::from_scenario(&scenario).unwrap();
        assert_eq!(ws.stock_on_hand(), Decimal::new(7, 0));

        let fifo = ws.ledger(CostingPolicy::Fifo).unwrap();
        assert_eq!(fifo.rows[2].exit_total, Decimal::new(1400, 0));

        let c = ws.cascade();
        assert_eq!(c.absorption.factor_p2.factor, Decimal::new(41, 0));
        assert_eq!(c.absorption.totals.total, Decimal::new(3250, 0));
        assert!(c.advisories().is_empty());
    }

    #[test]
    fn missing_file_is_an_io_error() {
        assert!(matches!(
            load_scenario("no/such/scenario.yaml"),
            Err(WorksheetError::Io(_))
        ));
    }

    #[test]
    fn json_roundtrip() {
        let s = Scenario::from_yaml(YAML).unwrap();
        let json = serde_json::to_string(&s).unwrap();
        assert_eq!(Scenario::from_json(&json).unwrap(), s);
    }
}
