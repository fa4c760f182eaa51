pub mod csv;
pub mod rules;

pub use crate::csv::{
    export_ledger, import_aggregator, import_shared_expenses, merge_extracts, AggregatorImporter,
    CsvError, SharedExpenseImporter,
};
pub use crate::rules::{load_rule_table, parse_rule_table, RuleTableError};
