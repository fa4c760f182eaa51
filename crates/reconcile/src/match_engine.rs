//! Date-window and amount-tolerance join between the two sources.
//!
//! There is no shared key between an aggregator transaction and a
//! shared-expense record, so pairing is fuzzy: the transaction must land
//! within a few days of the record and within a small amount of it.

use chrono::NaiveDate;
use reckon_core::{AggregatorTransaction, Money, SharedExpenseRecord};
use serde::{Deserialize, Serialize};

const SETTLEMENT_AMOUNT_CENTS: i64 = 100;
const SETTLEMENT_DAYS_AFTER: i64 = 2;

const INBOUND_AMOUNT_CENTS: i64 = 101_000;
const INBOUND_DAYS_AFTER: i64 = 20;

const GROCERY_AMOUNT_CENTS: i64 = 1_500;
const GROCERY_DAYS: i64 = 1;

const RENT_AMOUNT_CENTS: i64 = 500;
const RENT_DAYS: i64 = 15;

const GENERAL_AMOUNT_CENTS: i64 = 500;
const GENERAL_DAYS: i64 = 1;

/// Accepts a transaction dated within `[reference - days_before,
/// reference + days_after]` whose amount is within `amount` of the reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchWindow {
    pub amount: Money,
    pub days_before: i64,
    pub days_after: i64,
}

impl MatchWindow {
    pub fn new(amount: Money, days_before: i64, days_after: i64) -> Self {
        Self {
            amount,
            days_before,
            days_after,
        }
    }

    /// Outbound peer payment clearing after a settlement was recorded.
    pub fn settlement() -> Self {
        Self::new(Money::from_cents(SETTLEMENT_AMOUNT_CENTS), 0, SETTLEMENT_DAYS_AFTER)
    }

    /// Inbound transfers bundle several repayments and lag well behind them.
    pub fn inbound_transfer() -> Self {
        Self::new(Money::from_cents(INBOUND_AMOUNT_CENTS), 0, INBOUND_DAYS_AFTER)
    }

    /// Split grocery orders carry tips the shared ledger does not see.
    pub fn grocery() -> Self {
        Self::new(Money::from_cents(GROCERY_AMOUNT_CENTS), GROCERY_DAYS, GROCERY_DAYS)
    }

    /// Rent checks are cashed whenever the landlord gets to them.
    pub fn rent() -> Self {
        Self::new(Money::from_cents(RENT_AMOUNT_CENTS), RENT_DAYS, RENT_DAYS)
    }

    pub fn general() -> Self {
        Self::new(Money::from_cents(GENERAL_AMOUNT_CENTS), GENERAL_DAYS, GENERAL_DAYS)
    }

    /// Both bounds inclusive.
    pub fn admits(
        &self,
        reference_date: NaiveDate,
        reference_amount: Money,
        date: NaiveDate,
        amount: Money,
    ) -> bool {
        let offset = (date - reference_date).num_days();
        offset >= -self.days_before
            && offset <= self.days_after
            && amount.within(reference_amount, self.amount)
    }
}

/// A shared-expense record that falls inside a transaction's window.
#[derive(Debug, Clone, Copy)]
pub struct Candidate<'a> {
    pub record: &'a SharedExpenseRecord,
    /// Transaction date minus record date.
    pub day_offset: i64,
    pub amount_gap: Money,
}

/// Every record admitted by `window` for `tx`, in input order. `reference`
/// picks the record amount the transaction is compared against.
pub fn find_candidates<'a, I, F>(
    window: &MatchWindow,
    tx: &AggregatorTransaction,
    records: I,
    reference: F,
) -> Vec<Candidate<'a>>
where
    I: IntoIterator<Item = &'a SharedExpenseRecord>,
    F: Fn(&SharedExpenseRecord) -> Money,
{
    records
        .into_iter()
        .filter_map(|record| {
            let amount = reference(record);
            window
                .admits(record.date, amount, tx.date, tx.amount)
                .then(|| Candidate {
                    record,
                    day_offset: (tx.date - record.date).num_days(),
                    amount_gap: (tx.amount - amount).abs(),
                })
        })
        .collect()
}

/// Closest date first, then closest amount; ties keep input order.
pub fn closest<'a>(candidates: &[Candidate<'a>]) -> Option<Candidate<'a>> {
    candidates
        .iter()
        .min_by_key(|c| (c.day_offset.abs(), c.amount_gap))
        .copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn tx(day: u32, cents: i64) -> AggregatorTransaction {
        AggregatorTransaction {
            id: "T1".to_string(),
            date: date(2022, 4, day),
            name: "Venmo".to_string(),
            raw_category: Vec::new(),
            personal_finance_category: None,
            category: None,
            amount: Money::from_cents(cents),
            account: "checking".to_string(),
            merchant_name: None,
        }
    }

    fn record(id: &str, day: u32, net_cents: i64) -> SharedExpenseRecord {
        SharedExpenseRecord {
            id: id.to_string(),
            date: date(2022, 4, day),
            description: "Payment".to_string(),
            is_payment: true,
            cost: Money::from_cents(net_cents.abs()),
            source_category: "Payment".to_string(),
            category: None,
            net_balance: Money::from_cents(net_cents),
            paid_share: Money::from_cents(net_cents.abs()),
            owed_share: Money::zero(),
            group_id: None,
            group_name: None,
        }
    }

    #[test]
    fn settlement_window_bounds_are_inclusive() {
        let w = MatchWindow::settlement();
        let reference = (date(2022, 4, 1), Money::from_cents(12_000));
        let admits = |day, cents| w.admits(reference.0, reference.1, date(2022, 4, day), Money::from_cents(cents));

        assert!(admits(1, 12_000));
        assert!(admits(3, 12_000)); // two days after
        assert!(!admits(4, 12_000)); // three days after
        assert!(admits(1, 12_100)); // +1.00
        assert!(admits(1, 11_900)); // -1.00
        assert!(!admits(1, 12_101));
    }

    #[test]
    fn settlement_window_rejects_earlier_transactions() {
        let w = MatchWindow::settlement();
        assert!(!w.admits(
            date(2022, 4, 2),
            Money::from_cents(12_000),
            date(2022, 4, 1),
            Money::from_cents(12_000)
        ));
    }

    #[test]
    fn symmetric_windows_accept_both_directions() {
        let w = MatchWindow::rent();
        let reference_date = date(2022, 4, 16);
        let amount = Money::from_cents(200_000);
        assert!(w.admits(reference_date, amount, date(2022, 4, 1), amount));
        assert!(w.admits(reference_date, amount, date(2022, 5, 1), amount));
        assert!(!w.admits(reference_date, amount, date(2022, 5, 2), amount));
    }

    #[test]
    fn default_windows_match_tuned_values() {
        assert_eq!(MatchWindow::inbound_transfer().amount, Money::from_cents(101_000));
        assert_eq!(MatchWindow::inbound_transfer().days_after, 20);
        assert_eq!(MatchWindow::grocery().amount, Money::from_cents(1_500));
        assert_eq!(MatchWindow::general(), MatchWindow::new(Money::from_cents(500), 1, 1));
    }

    #[test]
    fn find_candidates_reports_offsets() {
        let records = vec![record("S1", 1, 12_000), record("S2", 10, 12_000), record("S3", 2, 11_950)];
        let found = find_candidates(&MatchWindow::settlement(), &tx(3, 12_000), &records, |r| r.net_balance);
        let ids: Vec<_> = found.iter().map(|c| c.record.id.as_str()).collect();
        assert_eq!(ids, ["S1", "S3"]);
        assert_eq!(found[0].day_offset, 2);
        assert_eq!(found[1].amount_gap, Money::from_cents(50));
    }

    #[test]
    fn closest_prefers_date_then_amount() {
        let records = vec![record("S1", 1, 12_000), record("S2", 2, 11_950), record("S3", 2, 12_000)];
        let found = find_candidates(&MatchWindow::settlement(), &tx(3, 12_000), &records, |r| r.net_balance);
        assert_eq!(closest(&found).unwrap().record.id, "S3");
    }

    #[test]
    fn closest_keeps_input_order_on_ties() {
        let records = vec![record("S1", 2, 12_000), record("S2", 2, 12_000)];
        let found = find_candidates(&MatchWindow::settlement(), &tx(3, 12_000), &records, |r| r.net_balance);
        assert_eq!(closest(&found).unwrap().record.id, "S1");
    }

    #[test]
    fn closest_of_nothing_is_none() {
        assert!(closest(&[]).is_none());
    }
}
