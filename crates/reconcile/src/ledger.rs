//! Runs the reconciliation steps in order and tags the result.

use reckon_core::{
    AggregatorTransaction, CategoryRuleTable, DateRange, LedgerEntry, Money, SharedExpenseRecord,
};
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;

use crate::classify::CategoryClassifier;
use crate::payments::PaymentMatcher;
use crate::settings::ReconcileSettings;
use crate::shares::ShareReconciler;

#[derive(Error, Debug)]
pub enum ReconcileError {
    #[error("Tracking window is inverted: {0}")]
    InvertedWindow(DateRange),
    #[error("Duplicate aggregator transaction id: {0}")]
    DuplicateTransactionId(String),
    #[error("Duplicate shared-expense id: {0}")]
    DuplicateExpenseId(String),
    #[error("Shared-expense id {0} is also an aggregator transaction id")]
    DuplicateLedgerId(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Classify,
    RemoveSettlements,
    NetInboundTransfers,
    ReconcileShares,
    AppendSharedExpenses,
    DropExclusions,
    FilterWindow,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Step::Classify => "classify",
            Step::RemoveSettlements => "remove settlements",
            Step::NetInboundTransfers => "net inbound transfers",
            Step::ReconcileShares => "reconcile shares",
            Step::AppendSharedExpenses => "append shared expenses",
            Step::DropExclusions => "drop exclusions",
            Step::FilterWindow => "filter window",
        };
        f.write_str(label)
    }
}

/// Row count and amount total at one point of the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    pub count: usize,
    pub total: Money,
}

impl Snapshot {
    pub fn of(transactions: &[AggregatorTransaction]) -> Self {
        Self {
            count: transactions.len(),
            total: transactions.iter().map(|t| t.amount).sum(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StepStats {
    pub step: Step,
    pub before: Snapshot,
    pub after: Snapshot,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reconciliation {
    pub ledger: Vec<LedgerEntry>,
    pub stats: Vec<StepStats>,
}

pub struct LedgerAssembler<'a> {
    rules: &'a CategoryRuleTable,
    settings: &'a ReconcileSettings,
}

impl<'a> LedgerAssembler<'a> {
    pub fn new(rules: &'a CategoryRuleTable, settings: &'a ReconcileSettings) -> Self {
        Self { rules, settings }
    }

    /// Produces the canonical ledger for `window` from one snapshot of each
    /// source. The same inputs always produce the same ledger.
    pub fn run(
        &self,
        mut aggregator: Vec<AggregatorTransaction>,
        mut shared: Vec<SharedExpenseRecord>,
        window: DateRange,
    ) -> Result<Reconciliation, ReconcileError> {
        if window.is_inverted() {
            return Err(ReconcileError::InvertedWindow(window));
        }
        check_unique(aggregator.iter().map(|t| t.id.as_str()))
            .map_err(ReconcileError::DuplicateTransactionId)?;
        check_unique(shared.iter().map(|r| r.id.as_str()))
            .map_err(ReconcileError::DuplicateExpenseId)?;

        let settings = self.settings;
        let mut stats = Vec::new();
        let mut record = |step: Step, before: Snapshot, after: &[AggregatorTransaction]| {
            let after = Snapshot::of(after);
            tracing::info!(
                %step,
                old_count = before.count,
                new_count = after.count,
                old_total = %before.total,
                new_total = %after.total,
                "Reconciliation step"
            );
            stats.push(StepStats { step, before, after });
        };

        let classifier = CategoryClassifier::new(self.rules);
        let before = Snapshot::of(&aggregator);
        let classified = classifier.apply_to_transactions(&mut aggregator);
        let shared_classified = classifier.apply_to_expenses(&mut shared);
        tracing::debug!(
            transactions = classified,
            expenses = shared_classified,
            "Applied category rules"
        );
        record(Step::Classify, before, &aggregator);

        let payments = PaymentMatcher::new(&settings.peer_payment, &settings.tolerances);
        let before = Snapshot::of(&aggregator);
        let aggregator = payments.remove_disguised_settlements(aggregator, &shared);
        record(Step::RemoveSettlements, before, &aggregator);

        let before = Snapshot::of(&aggregator);
        let aggregator = payments.net_inbound_transfers(aggregator, &shared);
        record(Step::NetInboundTransfers, before, &aggregator);

        let shares = ShareReconciler::new(settings);
        let before = Snapshot::of(&aggregator);
        let mut ledger = shares.reconcile_fronted_by_user(aggregator, &shared);
        record(Step::ReconcileShares, before, &ledger);

        let before = Snapshot::of(&ledger);
        ledger.extend(shares.synthesize_fronted_by_other(&shared, window));
        check_unique(ledger.iter().map(|t| t.id.as_str()))
            .map_err(ReconcileError::DuplicateLedgerId)?;
        record(Step::AppendSharedExpenses, before, &ledger);

        let before = Snapshot::of(&ledger);
        ledger.retain(|tx| !settings.exclusions.excludes(&tx.name));
        record(Step::DropExclusions, before, &ledger);

        let before = Snapshot::of(&ledger);
        ledger.retain(|tx| window.contains(tx.date));
        record(Step::FilterWindow, before, &ledger);

        let fixed = &settings.ledger.fixed_categories;
        let mut entries: Vec<LedgerEntry> = ledger
            .into_iter()
            .map(|tx| LedgerEntry::from_transaction(tx, fixed.as_slice()))
            .collect();
        entries.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.id.cmp(&b.id)));

        tracing::info!(entries = entries.len(), %window, "Ledger assembled");
        Ok(Reconciliation {
            ledger: entries,
            stats,
        })
    }
}

fn check_unique<'a>(ids: impl Iterator<Item = &'a str>) -> Result<(), String> {
    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(id) {
            return Err(id.to_string());
        }
    }
    Ok(())
}
