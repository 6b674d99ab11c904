#![deny(warnings)]

//! Headless CLI: loads a costing scenario, runs the inventory card and the
//! overhead allocation cascade, and prints the resulting tables.

mod table;

use anyhow::{Context, Result};
use cost_allocation::{Cascade, LineKind, ResolvedFactor, StepResult};
use cost_core::{Center, CenterNames};
use cost_valuation::{CostingPolicy, Ledger};
use cost_worksheet::{load_scenario, Worksheet};
use serde::Serialize;
use table::{money, number, Alignment, Table};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const USAGE: &str = "usage: costing --scenario <file.yaml|file.json> [--policy average|fifo|lifo] [--json]";

#[derive(Debug, Default, PartialEq)]
struct Args {
    scenario: Option<String>,
    policy: Option<CostingPolicy>,
    json: bool,
}

fn parse_args<I: IntoIterator<Item = String>>(args: I) -> Result<Args> {
    let mut out = Args::default();
    let mut it = args.into_iter();
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--scenario" => out.scenario = it.next(),
            "--policy" => {
                let value = it.next().context("--policy needs a value")?;
                out.policy = Some(value.parse()?);
            }
            "--json" => out.json = true,
            _ => {}
        }
    }
    Ok(out)
}

#[derive(Serialize)]
struct Report<'a> {
    names: &'a CenterNames,
    ledger: &'a Ledger,
    cascade: &'a Cascade,
}

fn main() -> Result<()> {
    // Logging setup
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let args = parse_args(std::env::args().skip(1))?;
    let path = args.scenario.clone().context(USAGE)?;
    let scenario = load_scenario(&path).with_context(|| format!("loading {path}"))?;
    let policy = args.policy.unwrap_or(scenario.policy);
    info!(%path, %policy, "starting CLI");

    let ws = Worksheet::from_scenario(&scenario)?;
    let ledger = ws.ledger(policy)?;
    let cascade = ws.cascade();
    for advisory in cascade.advisories() {
        warn!(%advisory, "allocation ratio replaced by 0");
    }

    if args.json {
        let report = Report {
            names: &ws.names,
            ledger: &ledger,
            cascade: &cascade,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_ledger(&ledger);
        print_cascade(&ws.names, &cascade);
    }
    Ok(())
}

fn print_ledger(ledger: &Ledger) {
    println!("Inventory card ({})", ledger.policy);
    let mut t = Table::new([
        "Date", "Concept", "In units", "In cost", "In total", "Out units", "Out cost",
        "Out total", "Units", "Unit cost", "Balance",
    ])
    .align(1, Alignment::Left);
    for r in &ledger.rows {
        t.push(vec![
            r.date.to_string(),
            r.kind.to_string(),
            number(r.entry_units, 0),
            money(r.entry_unit_cost),
            money(r.entry_total),
            number(r.exit_units, 0),
            money(r.exit_unit_cost),
            money(r.exit_total),
            number(r.balance_units, 0),
            money(r.balance_unit_cost),
            money(r.balance_total),
        ]);
    }
    println!("{}", t.render());
    println!(
        "Entries {}, exits {}",
        money(ledger.total_entries()),
        money(ledger.total_exits())
    );
    if !ledger.layers.is_empty() {
        let layers: Vec<String> = ledger
            .layers
            .iter()
            .map(|l| format!("{} @ {}", number(l.remaining_units, 0), money(l.unit_cost)))
            .collect();
        println!("Remaining layers: {}", layers.join(", "));
    }
    println!();
}

fn line_caption(names: &CenterNames, kind: LineKind) -> String {
    match kind {
        LineKind::StartingTotals => "Primary totals".to_string(),
        LineKind::TransferFrom(c) => format!("From {}", names.name(c)),
        LineKind::Subtotal => "Subtotal".to_string(),
        LineKind::Totals => "TOTALS".to_string(),
    }
}

fn describe_factor(f: &ResolvedFactor) -> String {
    let mut text = if f.manual {
        format!("manual factor {}", number(f.factor, 4))
    } else {
        format!(
            "factor {} / {} = {}",
            money(f.amount),
            number(f.base_sum, 2),
            number(f.factor, 4)
        )
    };
    if let Some(e) = &f.advisory {
        text.push_str(&format!(" (ratio ignored: {e})"));
    }
    text
}

fn describe_step(names: &CenterNames, step: &StepResult) -> String {
    format!(
        "Distribution of {}: {} to distribute, {}",
        names.name(step.source),
        money(step.to_distribute),
        describe_factor(&step.factor)
    )
}

fn print_cascade(names: &CenterNames, c: &Cascade) {
    println!("Schedule I: primary distribution");
    let mut t = Table::new([
        "Concept",
        names.p1.as_str(),
        names.p2.as_str(),
        names.s1.as_str(),
        names.s2.as_str(),
        "TOTAL",
    ]);
    for r in &c.primary.rows {
        let mut cells = vec![r.label.clone()];
        cells.extend(Center::ALL.iter().map(|&ctr| money(r.amounts.get(ctr))));
        cells.push(money(r.total()));
        t.push(cells);
    }
    let mut totals = vec!["TOTALS".to_string()];
    totals.extend(Center::ALL.iter().map(|&ctr| money(c.primary.total_of(ctr))));
    totals.push(money(c.primary.grand_total()));
    t.push(totals);
    println!("{}\n", t.render());

    let order = c.secondary.order;
    let columns = [Center::P1, Center::P2, order.first(), order.second()];
    println!(
        "Schedule II: secondary distribution ({} -> {})",
        names.name(order.first()),
        names.name(order.second())
    );
    println!("  {}", describe_step(names, &c.secondary.first_step));
    println!("  {}", describe_step(names, &c.secondary.second_step));
    let mut headers = vec!["Concept".to_string()];
    headers.extend(columns.iter().map(|&ctr| names.name(ctr).to_string()));
    headers.push("TOTAL".to_string());
    let mut t = Table::new(headers);
    for line in &c.secondary.lines {
        let mut cells = vec![line_caption(names, line.kind)];
        cells.extend(columns.iter().map(|&ctr| money(line.amounts.get(ctr))));
        cells.push(money(line.total));
        t.push(cells);
    }
    println!("{}\n", t.render());

    let f = &c.absorption;
    println!("Schedule III: final distribution");
    println!("  {}: {}", names.p1, describe_factor(&f.factor_p1));
    println!("  {}: {}", names.p2, describe_factor(&f.factor_p2));
    let mut t = Table::new([
        "Order".to_string(),
        format!("Base {}", names.p1),
        format!("Base {}", names.p2),
        "Units".to_string(),
        format!("Cost {}", names.p1),
        format!("Cost {}", names.p2),
        "TOTAL".to_string(),
        "Unit cost".to_string(),
    ]);
    for r in f.rows.iter().chain(std::iter::once(&f.totals)) {
        t.push(vec![
            r.label.clone(),
            number(r.base_p1, 2),
            number(r.base_p2, 2),
            number(r.units, 0),
            money(r.cost_p1),
            money(r.cost_p2),
            money(r.total),
            money(r.unit_cost),
        ]);
    }
    println!("{}", t.render());
    if !f.unabsorbed_p1.is_zero() || !f.unabsorbed_p2.is_zero() {
        println!(
            "  Unabsorbed: {} {}, {} {}",
            names.p1,
            money(f.unabsorbed_p1),
            names.p2,
            money(f.unabsorbed_p2)
        );
    }
}
