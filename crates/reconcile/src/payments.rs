//! Peer-payment settlements.
//!
//! Money sent through the peer-payment service to settle a shared-ledger
//! balance shows up twice: once as a bank outflow, once as the expenses it
//! settles. The bank side is dropped so the shared ledger's finer-grained
//! record is the only one counted. Inbound transfers get the mirror
//! treatment and are netted against what the user was owed.

use reckon_core::{AggregatorTransaction, SharedExpenseRecord};
use std::collections::HashMap;

use crate::match_engine::{closest, find_candidates, MatchWindow};
use crate::settings::{PeerPaymentRail, Tolerances};

pub struct PaymentMatcher<'a> {
    rail: &'a PeerPaymentRail,
    settlement: MatchWindow,
    inbound: MatchWindow,
}

impl<'a> PaymentMatcher<'a> {
    pub fn new(rail: &'a PeerPaymentRail, tolerances: &Tolerances) -> Self {
        Self {
            rail,
            settlement: tolerances.settlement,
            inbound: tolerances.inbound,
        }
    }

    /// Settlements the user received money for, i.e. others owed the user.
    fn outbound_settlements<'r>(
        shared: &'r [SharedExpenseRecord],
    ) -> impl Iterator<Item = &'r SharedExpenseRecord> {
        shared
            .iter()
            .filter(|r| r.is_payment && r.net_balance.is_positive())
    }

    fn inbound_settlements<'r>(
        shared: &'r [SharedExpenseRecord],
    ) -> impl Iterator<Item = &'r SharedExpenseRecord> {
        shared
            .iter()
            .filter(|r| r.is_payment && r.net_balance.is_negative())
    }

    /// Ids of the settlements `tx` pairs with. Empty when it is ordinary spending.
    pub fn settlements_for<'r>(
        &self,
        tx: &AggregatorTransaction,
        shared: &'r [SharedExpenseRecord],
    ) -> Vec<&'r str> {
        if !tx.amount.is_positive() || !self.rail.carries(tx) {
            return Vec::new();
        }
        find_candidates(
            &self.settlement,
            tx,
            Self::outbound_settlements(shared),
            |r| r.net_balance,
        )
        .into_iter()
        .map(|c| c.record.id.as_str())
        .collect()
    }

    /// Left anti-join: keeps only transactions with no settlement pairing.
    pub fn remove_disguised_settlements(
        &self,
        transactions: Vec<AggregatorTransaction>,
        shared: &[SharedExpenseRecord],
    ) -> Vec<AggregatorTransaction> {
        let mut claims: HashMap<&str, usize> = HashMap::new();

        let kept: Vec<AggregatorTransaction> = transactions
            .into_iter()
            .filter(|tx| {
                let settlements = self.settlements_for(tx, shared);
                if settlements.len() > 1 {
                    tracing::warn!(
                        id = %tx.id,
                        candidates = settlements.len(),
                        "Transaction pairs with several settlements"
                    );
                }
                for &id in &settlements {
                    *claims.entry(id).or_default() += 1;
                }
                if settlements.is_empty() {
                    true
                } else {
                    tracing::debug!(id = %tx.id, amount = %tx.amount, "Removing disguised settlement");
                    false
                }
            })
            .collect();

        for (id, count) in claims {
            if count > 1 {
                tracing::warn!(settlement = id, transactions = count, "Settlement explains several transactions");
            }
        }
        kept
    }

    /// Subtracts the matching settlement's balance from inbound transfers.
    /// Transfers without a match pass through unchanged.
    pub fn net_inbound_transfers(
        &self,
        transactions: Vec<AggregatorTransaction>,
        shared: &[SharedExpenseRecord],
    ) -> Vec<AggregatorTransaction> {
        transactions
            .into_iter()
            .map(|mut tx| {
                if !tx.amount.is_negative() || !self.rail.carries(&tx) {
                    return tx;
                }
                let candidates =
                    find_candidates(&self.inbound, &tx, Self::inbound_settlements(shared), |r| {
                        r.net_balance
                    });
                if candidates.len() > 1 {
                    tracing::warn!(
                        id = %tx.id,
                        candidates = candidates.len(),
                        "Inbound transfer matches several settlements, using the closest"
                    );
                }
                if let Some(best) = closest(&candidates) {
                    let netted = tx.amount - best.record.net_balance;
                    tracing::debug!(
                        id = %tx.id,
                        settlement = %best.record.id,
                        from = %tx.amount,
                        to = %netted,
                        "Netting inbound transfer"
                    );
                    tx.amount = netted;
                }
                tx
            })
            .collect()
    }
}
