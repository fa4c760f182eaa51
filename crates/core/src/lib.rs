pub mod money;
pub mod period;
pub mod rules;
pub mod transaction;

pub use money::Money;
pub use period::{month_start, week_start, DateRange};
pub use rules::{AggregatorRule, CategoryRule, CategoryRuleTable, PersonalFinanceRule, SharedExpenseRule};
pub use transaction::{AggregatorTransaction, LedgerEntry, PersonalFinanceCategory, SharedExpenseRecord};
