use reckon_core::{AggregatorTransaction, CategoryRuleTable, DateRange, SharedExpenseRecord};
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::settings::ReconcileSettings;

#[derive(Serialize)]
struct RunInputs<'a> {
    aggregator: &'a [AggregatorTransaction],
    shared: &'a [SharedExpenseRecord],
    rules: &'a CategoryRuleTable,
    settings: &'a ReconcileSettings,
    window: DateRange,
}

/// SHA-256 over the JSON encoding of everything a run depends on, as
/// lowercase hex. Equal fingerprints mean equal ledgers.
pub fn fingerprint(
    aggregator: &[AggregatorTransaction],
    shared: &[SharedExpenseRecord],
    rules: &CategoryRuleTable,
    settings: &ReconcileSettings,
    window: DateRange,
) -> Result<String, serde_json::Error> {
    let encoded = serde_json::to_vec(&RunInputs {
        aggregator,
        shared,
        rules,
        settings,
        window,
    })?;
    let mut hasher = Sha256::new();
    hasher.update(&encoded);
    Ok(hex::encode(hasher.finalize()))
}
