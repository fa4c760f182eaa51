//! CLI command implementations

use anyhow::{Context, Result};
use reckon_core::{AggregatorTransaction, CategoryRuleTable, DateRange, SharedExpenseRecord};
use reckon_import::{export_ledger, import_aggregator, import_shared_expenses, load_rule_table, merge_extracts};
use reckon_reconcile::{fingerprint, CategoryClassifier, LedgerAssembler, StepStats};
use serde::Serialize;
use std::fs::File;
use std::path::Path;

use crate::config::RunConfig;

struct Inputs {
    aggregator: Vec<AggregatorTransaction>,
    shared: Vec<SharedExpenseRecord>,
    rules: CategoryRuleTable,
}

fn load_config(path: &Path) -> Result<RunConfig> {
    RunConfig::load(path).with_context(|| format!("Failed to load config {}", path.display()))
}

fn load_aggregator(config: &RunConfig) -> Result<Vec<AggregatorTransaction>> {
    let mut extracts = Vec::with_capacity(config.inputs.aggregator.len());
    for path in &config.inputs.aggregator {
        let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
        let extract =
            import_aggregator(file).with_context(|| format!("Failed to import {}", path.display()))?;
        tracing::info!("Read {} transactions from {}", extract.len(), path.display());
        extracts.push(extract);
    }
    Ok(merge_extracts(extracts))
}

fn load_rules(config: &RunConfig) -> Result<CategoryRuleTable> {
    let path = &config.inputs.rules;
    let rules = load_rule_table(path)
        .with_context(|| format!("Failed to load rule table {}", path.display()))?;
    tracing::info!("Loaded {} category rules from {}", rules.len(), path.display());
    Ok(rules)
}

fn load_inputs(config: &RunConfig) -> Result<Inputs> {
    let aggregator = load_aggregator(config)?;

    let path = &config.inputs.shared;
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let shared =
        import_shared_expenses(file).with_context(|| format!("Failed to import {}", path.display()))?;
    tracing::info!("Read {} shared-expense records from {}", shared.len(), path.display());

    Ok(Inputs {
        aggregator,
        shared,
        rules: load_rules(config)?,
    })
}

#[derive(Serialize)]
struct RunSummary<'a> {
    fingerprint: &'a str,
    window: DateRange,
    entries: usize,
    stats: &'a [StepStats],
}

pub fn cmd_reconcile(config_path: &Path, output: Option<&Path>, summary: Option<&Path>) -> Result<()> {
    let config = load_config(config_path)?;
    let window = config.window.range();
    let inputs = load_inputs(&config)?;

    let run_fingerprint = fingerprint(
        &inputs.aggregator,
        &inputs.shared,
        &inputs.rules,
        &config.reconcile,
        window,
    )
    .context("Failed to fingerprint run inputs")?;
    tracing::info!(fingerprint = %run_fingerprint, "Run inputs");

    let assembler = LedgerAssembler::new(&inputs.rules, &config.reconcile);
    let result = assembler
        .run(inputs.aggregator, inputs.shared, window)
        .context("Reconciliation failed")?;

    // Encode fully before touching the destination so a failure leaves no partial file.
    let mut encoded = Vec::new();
    export_ledger(&mut encoded, &result.ledger).context("Failed to encode ledger")?;

    match output.or(config.output.ledger.as_deref()) {
        Some(path) => {
            write_file(path, &encoded)?;
            tracing::info!("Wrote {} entries to {}", result.ledger.len(), path.display());
            print_stats(&result.stats);
            println!("\nFingerprint: {run_fingerprint}");
        }
        None => {
            use std::io::Write;
            std::io::stdout()
                .write_all(&encoded)
                .context("Failed to write ledger to stdout")?;
        }
    }

    if let Some(path) = summary {
        let doc = RunSummary {
            fingerprint: &run_fingerprint,
            window,
            entries: result.ledger.len(),
            stats: &result.stats,
        };
        let json = serde_json::to_string_pretty(&doc).context("Failed to encode run summary")?;
        write_file(path, json.as_bytes())?;
    }

    Ok(())
}

pub fn cmd_classify(config_path: &Path) -> Result<()> {
    let config = load_config(config_path)?;
    let aggregator = load_aggregator(&config)?;
    let rules = load_rules(&config)?;
    let classifier = CategoryClassifier::new(&rules);

    println!(
        "{:<10}  {:<24}  {:<32}  {:<20}  Field",
        "Date", "Id", "Name", "Category"
    );
    println!("{}", "-".repeat(104));
    let mut unmatched = 0usize;
    for tx in &aggregator {
        let (category, field) = match classifier.explain(tx) {
            Some((category, field)) => (category.to_string(), field.to_string()),
            None => {
                unmatched += 1;
                ("-".to_string(), String::new())
            }
        };
        println!(
            "{:<10}  {:<24}  {:<32}  {:<20}  {}",
            tx.date,
            truncate(&tx.id, 24),
            truncate(&tx.name, 32),
            truncate(&category, 20),
            field
        );
    }
    println!("\n{} transactions, {} without a category", aggregator.len(), unmatched);
    Ok(())
}

fn print_stats(stats: &[StepStats]) {
    println!(
        "{:<24}  {:>8}  {:>14}  {:>8}  {:>14}",
        "Step", "Rows in", "Total in", "Rows out", "Total out"
    );
    println!("{}", "-".repeat(76));
    for s in stats {
        println!(
            "{:<24}  {:>8}  {:>14}  {:>8}  {:>14}",
            s.step.to_string(),
            s.before.count,
            s.before.total.to_string(),
            s.after.count,
            s.after.total.to_string()
        );
    }
}

fn write_file(path: &Path, contents: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    std::fs::write(path, contents).with_context(|| format!("Failed to write {}", path.display()))
}

/// Truncate a string to a maximum number of characters, adding "..." if truncated
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}
