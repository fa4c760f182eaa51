use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::money::Money;
use super::period::{month_start, week_start};

/// Two-level taxonomy attached by the aggregator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonalFinanceCategory {
    pub primary: String,
    #[serde(default)]
    pub detailed: Option<String>,
}

/// One bank or card movement as reported by the aggregator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatorTransaction {
    pub id: String,
    pub date: NaiveDate,
    pub name: String,
    /// Root first, most specific last.
    pub raw_category: Vec<String>,
    pub personal_finance_category: Option<PersonalFinanceCategory>,
    pub category: Option<String>,
    pub amount: Money,
    pub account: String,
    pub merchant_name: Option<String>,
}

/// One entry of the shared-expense ledger, seen from the user's side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SharedExpenseRecord {
    pub id: String,
    pub date: NaiveDate,
    pub description: String,
    /// Settlements move balance between people and are never spending.
    pub is_payment: bool,
    pub cost: Money,
    /// Category name as the shared ledger reports it.
    pub source_category: String,
    pub category: Option<String>,
    /// Positive when others owe the user.
    pub net_balance: Money,
    pub paid_share: Money,
    pub owed_share: Money,
    pub group_id: Option<i64>,
    pub group_name: Option<String>,
}

impl SharedExpenseRecord {
    pub fn is_expense(&self) -> bool {
        !self.is_payment
    }

    pub fn fronted_by_user(&self) -> bool {
        self.is_expense() && self.paid_share.is_positive()
    }

    pub fn fronted_by_other(&self) -> bool {
        self.is_expense() && self.paid_share.is_zero()
    }
}

/// A reconciled row of the canonical ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: String,
    pub date: NaiveDate,
    pub name: String,
    pub category: Option<String>,
    pub amount: Money,
    pub account: String,
    pub merchant_name: Option<String>,
    pub is_variable: bool,
    pub week: NaiveDate,
    pub month: NaiveDate,
}

impl LedgerEntry {
    pub fn from_transaction<S: AsRef<str>>(tx: AggregatorTransaction, fixed_categories: &[S]) -> Self {
        let is_variable = match &tx.category {
            Some(category) => !fixed_categories.iter().any(|c| c.as_ref() == category),
            None => true,
        };
        LedgerEntry {
            week: week_start(tx.date),
            month: month_start(tx.date),
            id: tx.id,
            date: tx.date,
            name: tx.name,
            category: tx.category,
            amount: tx.amount,
            account: tx.account,
            merchant_name: tx.merchant_name,
            is_variable,
        }
    }
}
