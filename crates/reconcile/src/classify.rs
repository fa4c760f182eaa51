//! Rule-table categorization.
//!
//! Aggregator fields are tried in a fixed priority order. Within a field the
//! table is walked in declaration order and the first category whose rule
//! matches wins, even if a later category would match more specifically.

use reckon_core::{AggregatorRule, AggregatorTransaction, CategoryRuleTable, SharedExpenseRecord};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleField {
    TransactionId,
    Name,
    PersonalFinanceCategory,
    RawCategory,
}

impl fmt::Display for RuleField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleField::TransactionId => write!(f, "transaction_id"),
            RuleField::Name => write!(f, "name"),
            RuleField::PersonalFinanceCategory => write!(f, "personal_finance_category"),
            RuleField::RawCategory => write!(f, "category"),
        }
    }
}

pub type Evaluator = fn(&AggregatorRule, &AggregatorTransaction) -> bool;

pub const FIELD_PRIORITY: [(RuleField, Evaluator); 4] = [
    (RuleField::TransactionId, matches_transaction_id),
    (RuleField::Name, matches_name),
    (RuleField::PersonalFinanceCategory, matches_personal_finance_category),
    (RuleField::RawCategory, matches_raw_category),
];

fn matches_transaction_id(rule: &AggregatorRule, tx: &AggregatorTransaction) -> bool {
    rule.transaction_id
        .as_ref()
        .is_some_and(|ids| ids.contains(&tx.id))
}

fn matches_name(rule: &AggregatorRule, tx: &AggregatorTransaction) -> bool {
    rule.name.as_ref().is_some_and(|names| names.contains(&tx.name))
}

/// `detailed` is consulted before `primary`; a null sub-rule is skipped.
fn matches_personal_finance_category(rule: &AggregatorRule, tx: &AggregatorTransaction) -> bool {
    let (Some(rule), Some(pfc)) = (&rule.personal_finance_category, &tx.personal_finance_category)
    else {
        return false;
    };

    if let (Some(allowed), Some(detailed)) = (&rule.detailed, &pfc.detailed) {
        if allowed.contains(detailed) {
            return true;
        }
    }
    rule.primary
        .as_ref()
        .is_some_and(|allowed| allowed.contains(&pfc.primary))
}

/// Walks the hierarchy from the deepest level to the root so a subcategory
/// rule can claim a transaction before a broad top-level rule does.
fn matches_raw_category(rule: &AggregatorRule, tx: &AggregatorTransaction) -> bool {
    let Some(levels) = &rule.category else {
        return false;
    };

    tx.raw_category
        .iter()
        .enumerate()
        .rev()
        .any(|(depth, value)| {
            levels
                .get(depth)
                .and_then(Option::as_ref)
                .is_some_and(|allowed| allowed.contains(value))
        })
}

pub struct CategoryClassifier<'a> {
    table: &'a CategoryRuleTable,
}

impl<'a> CategoryClassifier<'a> {
    pub fn new(table: &'a CategoryRuleTable) -> Self {
        Self { table }
    }

    /// The winning category and the field that decided it.
    pub fn explain(&self, tx: &AggregatorTransaction) -> Option<(&'a str, RuleField)> {
        let table = self.table;
        for (field, evaluator) in FIELD_PRIORITY {
            if let Some((category, _)) = table
                .iter()
                .find(|(_, rule)| evaluator(&rule.aggregator, tx))
            {
                tracing::trace!(id = %tx.id, %field, category, "classified transaction");
                return Some((category, field));
            }
        }
        tracing::trace!(id = %tx.id, "no category rule matched");
        None
    }

    pub fn classify_transaction(&self, tx: &AggregatorTransaction) -> Option<&'a str> {
        self.explain(tx).map(|(category, _)| category)
    }

    pub fn classify_expense(&self, record: &SharedExpenseRecord) -> Option<&'a str> {
        self.table
            .iter()
            .find(|(_, rule)| {
                rule.shared
                    .category
                    .as_ref()
                    .is_some_and(|names| names.contains(&record.source_category))
            })
            .map(|(category, _)| category)
    }

    /// Assigns categories in place. A record without a match keeps whatever
    /// category it already had. Returns how many records matched.
    pub fn apply_to_transactions(&self, transactions: &mut [AggregatorTransaction]) -> usize {
        let mut matched = 0;
        for tx in transactions.iter_mut() {
            if let Some(category) = self.classify_transaction(tx) {
                tx.category = Some(category.to_string());
                matched += 1;
            }
        }
        matched
    }

    pub fn apply_to_expenses(&self, records: &mut [SharedExpenseRecord]) -> usize {
        let mut matched = 0;
        for record in records.iter_mut() {
            if let Some(category) = self.classify_expense(record) {
                record.category = Some(category.to_string());
                matched += 1;
            }
        }
        matched
    }
}
