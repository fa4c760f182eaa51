//! Splitting shared expenses down to the user's portion.
//!
//! When the user fronts a shared expense the bank shows the full amount but
//! only the owed share is the user's spending. When someone else fronts it
//! the bank shows nothing, so the owed share is added from the shared ledger.

use reckon_core::{AggregatorTransaction, DateRange, SharedExpenseRecord};
use std::collections::HashMap;
use std::fmt;

use crate::match_engine::{closest, find_candidates, MatchWindow};
use crate::settings::{PeerPaymentRail, ReconcileSettings, ShapeRules, Tolerances};

/// Picks the tolerance window a fronted expense is joined with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpenseShape {
    Grocery,
    Rent,
    General,
}

impl fmt::Display for ExpenseShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExpenseShape::Grocery => write!(f, "grocery"),
            ExpenseShape::Rent => write!(f, "rent"),
            ExpenseShape::General => write!(f, "general"),
        }
    }
}

impl ShapeRules {
    pub fn shape_of(&self, tx: &AggregatorTransaction) -> ExpenseShape {
        fn listed(list: &[String], value: &str) -> bool {
            list.iter().any(|v| v == value)
        }

        let category = tx.category.as_deref();
        if category.is_some_and(|c| listed(&self.grocery_categories, c))
            || tx.raw_category.iter().any(|level| listed(&self.grocery_categories, level))
        {
            ExpenseShape::Grocery
        } else if listed(&self.rent_names, &tx.name)
            || category.is_some_and(|c| listed(&self.rent_categories, c))
        {
            ExpenseShape::Rent
        } else {
            ExpenseShape::General
        }
    }
}

pub struct ShareReconciler<'a> {
    rail: &'a PeerPaymentRail,
    tolerances: &'a Tolerances,
    shapes: &'a ShapeRules,
    shared_account: &'a str,
}

impl<'a> ShareReconciler<'a> {
    pub fn new(settings: &'a ReconcileSettings) -> Self {
        Self {
            rail: &settings.peer_payment,
            tolerances: &settings.tolerances,
            shapes: &settings.shapes,
            shared_account: &settings.ledger.shared_account,
        }
    }

    /// Peer payments are settlements, never the expense itself.
    fn skips(&self, tx: &AggregatorTransaction) -> bool {
        self.rail.carries(tx)
    }

    fn window_for(&self, tx: &AggregatorTransaction) -> (ExpenseShape, &'a MatchWindow) {
        let shape = self.shapes.shape_of(tx);
        (shape, self.tolerances.for_shape(shape))
    }

    /// Replaces the full amount of every expense the user paid up front with
    /// the user's owed share. The transaction also adopts the record's
    /// category when the record has one. Records are not consumed, so one
    /// record may explain several transactions; that case is logged.
    pub fn reconcile_fronted_by_user(
        &self,
        transactions: Vec<AggregatorTransaction>,
        shared: &[SharedExpenseRecord],
    ) -> Vec<AggregatorTransaction> {
        let fronted: Vec<&SharedExpenseRecord> =
            shared.iter().filter(|r| r.fronted_by_user()).collect();
        let mut claims: HashMap<&str, usize> = HashMap::new();

        let reconciled: Vec<AggregatorTransaction> = transactions
            .into_iter()
            .map(|mut tx| {
                if self.skips(&tx) {
                    return tx;
                }
                let (shape, window) = self.window_for(&tx);
                let candidates =
                    find_candidates(window, &tx, fronted.iter().copied(), |r| r.paid_share);
                if candidates.len() > 1 {
                    tracing::warn!(
                        id = %tx.id,
                        %shape,
                        candidates = candidates.len(),
                        "Fronted expense matches several shared records, using the closest"
                    );
                }
                if let Some(best) = closest(&candidates) {
                    let record = best.record;
                    *claims.entry(record.id.as_str()).or_default() += 1;
                    tracing::debug!(
                        id = %tx.id,
                        shared = %record.id,
                        %shape,
                        from = %tx.amount,
                        to = %record.owed_share,
                        "Reducing fronted expense to owed share"
                    );
                    tx.amount = record.owed_share;
                    if record.category.is_some() {
                        tx.category = record.category.clone();
                    }
                }
                tx
            })
            .collect();

        for (id, count) in claims {
            if count > 1 {
                tracing::warn!(shared = id, transactions = count, "Shared record explains several transactions");
            }
        }
        reconciled
    }

    /// One ledger-shaped transaction per expense someone else paid for,
    /// limited to records dated inside `window`.
    pub fn synthesize_fronted_by_other(
        &self,
        shared: &[SharedExpenseRecord],
        window: DateRange,
    ) -> Vec<AggregatorTransaction> {
        shared
            .iter()
            .filter(|r| r.fronted_by_other() && window.contains(r.date))
            .map(|r| AggregatorTransaction {
                id: r.id.clone(),
                date: r.date,
                name: r.description.clone(),
                raw_category: Vec::new(),
                personal_finance_category: None,
                category: r.category.clone(),
                amount: r.owed_share,
                account: self.shared_account.to_string(),
                merchant_name: None,
            })
            .collect()
    }
}
