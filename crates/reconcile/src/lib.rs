pub mod classify;
pub mod fingerprint;
pub mod ledger;
pub mod match_engine;
pub mod payments;
pub mod settings;
pub mod shares;

pub use classify::{CategoryClassifier, RuleField};
pub use fingerprint::fingerprint;
pub use ledger::{LedgerAssembler, ReconcileError, Reconciliation, Snapshot, Step, StepStats};
pub use match_engine::{closest, find_candidates, Candidate, MatchWindow};
pub use payments::PaymentMatcher;
pub use settings::{
    Exclusions, LedgerOptions, PeerPaymentRail, ReconcileSettings, ShapeRules, Tolerances,
    SHARED_LEDGER_ACCOUNT,
};
pub use shares::{ExpenseShape, ShareReconciler};
