use reckon_core::AggregatorTransaction;
use serde::{Deserialize, Serialize};

use crate::match_engine::MatchWindow;
use crate::shares::ExpenseShape;

/// Tunables for one reconciliation run. Every table falls back to the
/// built-in defaults when omitted from the configuration document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcileSettings {
    pub peer_payment: PeerPaymentRail,
    pub tolerances: Tolerances,
    pub shapes: ShapeRules,
    pub exclusions: Exclusions,
    pub ledger: LedgerOptions,
}

/// Identifies transactions that moved over the peer-payment service.
/// An empty list places no restriction on that field, but a rail with both
/// lists empty carries nothing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PeerPaymentRail {
    pub names: Vec<String>,
    pub accounts: Vec<String>,
}

const PEER_PAYMENT_NAME: &str = "Venmo";

impl Default for PeerPaymentRail {
    fn default() -> Self {
        Self {
            names: vec![PEER_PAYMENT_NAME.to_string()],
            accounts: Vec::new(),
        }
    }
}

impl PeerPaymentRail {
    /// Never true for an unrestricted rail.
    pub fn carries(&self, tx: &AggregatorTransaction) -> bool {
        self.is_restricted()
            && (self.names.is_empty() || self.names.contains(&tx.name))
            && (self.accounts.is_empty() || self.accounts.contains(&tx.account))
    }

    /// Whether a restriction narrows the rail at all.
    pub fn is_restricted(&self) -> bool {
        !self.names.is_empty() || !self.accounts.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tolerances {
    pub settlement: MatchWindow,
    pub inbound: MatchWindow,
    pub grocery: MatchWindow,
    pub rent: MatchWindow,
    pub general: MatchWindow,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            settlement: MatchWindow::settlement(),
            inbound: MatchWindow::inbound_transfer(),
            grocery: MatchWindow::grocery(),
            rent: MatchWindow::rent(),
            general: MatchWindow::general(),
        }
    }
}

impl Tolerances {
    pub fn for_shape(&self, shape: ExpenseShape) -> &MatchWindow {
        match shape {
            ExpenseShape::Grocery => &self.grocery,
            ExpenseShape::Rent => &self.rent,
            ExpenseShape::General => &self.general,
        }
    }
}

/// Decides which tolerance window a fronted expense is joined with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShapeRules {
    pub grocery_categories: Vec<String>,
    pub rent_names: Vec<String>,
    pub rent_categories: Vec<String>,
}

impl Default for ShapeRules {
    fn default() -> Self {
        Self {
            grocery_categories: vec!["groceries".to_string()],
            rent_names: Vec::new(),
            rent_categories: vec!["housing".to_string()],
        }
    }
}

/// Entries already accounted for on the shared-ledger side. The default
/// excludes nothing; the known edge cases are listed in the run config.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Exclusions {
    /// Exact names.
    pub names: Vec<String>,
    /// Name prefixes.
    pub prefixes: Vec<String>,
}

impl Exclusions {
    pub fn excludes(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name) || self.prefixes.iter().any(|p| name.starts_with(p.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty() && self.prefixes.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerOptions {
    /// Categories that are not discretionary spending.
    pub fixed_categories: Vec<String>,
    /// Account tag for entries synthesized from the shared ledger.
    pub shared_account: String,
}

pub const SHARED_LEDGER_ACCOUNT: &str = "splitwise";

impl Default for LedgerOptions {
    fn default() -> Self {
        Self {
            fixed_categories: ["income", "transfer", "housing"]
                .iter()
                .map(|c| c.to_string())
                .collect(),
            shared_account: SHARED_LEDGER_ACCOUNT.to_string(),
        }
    }
}
