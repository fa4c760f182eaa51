use chrono::NaiveDate;
use reckon_core::{
    AggregatorTransaction, LedgerEntry, Money, PersonalFinanceCategory, SharedExpenseRecord,
};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashSet;
use std::io::{Read, Write};
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CsvError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("record {row}: missing required column `{column}`")]
    MissingColumn { row: usize, column: &'static str },
    #[error("record {row}: invalid date `{value}`")]
    InvalidDate { row: usize, value: String },
    #[error("record {row}: invalid amount `{value}` in `{column}`")]
    InvalidAmount {
        row: usize,
        column: &'static str,
        value: String,
    },
    #[error("record {row}: invalid boolean `{value}` in `{column}`")]
    InvalidBoolean {
        row: usize,
        column: &'static str,
        value: String,
    },
    #[error("record {row}: invalid `{column}`: {source}")]
    InvalidCategory {
        row: usize,
        column: &'static str,
        source: serde_json::Error,
    },
    #[error("record {row}: invalid group id `{value}`")]
    InvalidGroupId { row: usize, value: String },
    #[error("record {row}: net_balance, paid_share and owed_share must be all set or all blank")]
    PartialShares { row: usize },
}

#[derive(Debug, Deserialize)]
struct AggregatorRow {
    id: Option<String>,
    date: Option<String>,
    name: Option<String>,
    raw_category: Option<String>,
    personal_finance_category: Option<String>,
    amount: Option<String>,
    account: Option<String>,
    merchant_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SharedExpenseRow {
    id: Option<String>,
    date: Option<String>,
    description: Option<String>,
    is_payment: Option<String>,
    cost: Option<String>,
    category: Option<String>,
    net_balance: Option<String>,
    paid_share: Option<String>,
    owed_share: Option<String>,
    group_id: Option<String>,
    group_name: Option<String>,
}

fn required(value: Option<String>, row: usize, column: &'static str) -> Result<String, CsvError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or(CsvError::MissingColumn { row, column })
}

fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub struct AggregatorImporter;

impl AggregatorImporter {
    pub fn parse<R: Read>(reader: &mut csv::Reader<R>) -> Result<Vec<AggregatorTransaction>, CsvError> {
        let mut transactions = Vec::new();

        for (idx, result) in reader.deserialize::<AggregatorRow>().enumerate() {
            let row = idx + 1;
            let record = result?;

            let date = required(record.date, row, "date")?;
            let amount = required(record.amount, row, "amount")?;

            transactions.push(AggregatorTransaction {
                id: required(record.id, row, "id")?,
                date: parse_date(&date).ok_or(CsvError::InvalidDate { row, value: date })?,
                name: required(record.name, row, "name")?,
                raw_category: parse_raw_category(optional(record.raw_category), row)?,
                personal_finance_category: parse_personal_finance_category(
                    optional(record.personal_finance_category),
                    row,
                )?,
                category: None,
                amount: parse_amount(&amount).ok_or(CsvError::InvalidAmount {
                    row,
                    column: "amount",
                    value: amount,
                })?,
                account: required(record.account, row, "account")?,
                merchant_name: optional(record.merchant_name),
            });
        }

        tracing::debug!("Parsed {} aggregator transactions", transactions.len());
        Ok(transactions)
    }
}

pub struct SharedExpenseImporter;

impl SharedExpenseImporter {
    /// Rows where the user is not a participant carry no shares and are skipped.
    pub fn parse<R: Read>(reader: &mut csv::Reader<R>) -> Result<Vec<SharedExpenseRecord>, CsvError> {
        let mut records = Vec::new();
        let mut skipped = 0usize;

        for (idx, result) in reader.deserialize::<SharedExpenseRow>().enumerate() {
            let row = idx + 1;
            let record = result?;

            let shares = (
                optional(record.net_balance),
                optional(record.paid_share),
                optional(record.owed_share),
            );
            let (net_balance, paid_share, owed_share) = match shares {
                (None, None, None) => {
                    skipped += 1;
                    continue;
                }
                (Some(net), Some(paid), Some(owed)) => (
                    money_field(&net, row, "net_balance")?,
                    money_field(&paid, row, "paid_share")?,
                    money_field(&owed, row, "owed_share")?,
                ),
                _ => return Err(CsvError::PartialShares { row }),
            };

            let date = required(record.date, row, "date")?;
            let is_payment = required(record.is_payment, row, "is_payment")?;
            let cost = required(record.cost, row, "cost")?;

            records.push(SharedExpenseRecord {
                id: required(record.id, row, "id")?,
                date: parse_date(&date).ok_or(CsvError::InvalidDate { row, value: date })?,
                description: required(record.description, row, "description")?,
                is_payment: parse_bool(&is_payment).ok_or(CsvError::InvalidBoolean {
                    row,
                    column: "is_payment",
                    value: is_payment,
                })?,
                cost: money_field(&cost, row, "cost")?,
                source_category: required(record.category, row, "category")?,
                category: None,
                net_balance,
                paid_share,
                owed_share,
                group_id: optional(record.group_id)
                    .map(|v| parse_group_id(&v).ok_or(CsvError::InvalidGroupId { row, value: v }))
                    .transpose()?,
                group_name: optional(record.group_name),
            });
        }

        if skipped > 0 {
            tracing::debug!("Skipped {skipped} shared-expense rows without the user's shares");
        }
        tracing::debug!("Parsed {} shared-expense records", records.len());
        Ok(records)
    }
}

fn money_field(s: &str, row: usize, column: &'static str) -> Result<Money, CsvError> {
    parse_amount(s).ok_or_else(|| CsvError::InvalidAmount {
        row,
        column,
        value: s.to_string(),
    })
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    // Timestamps keep only their calendar day.
    let day = s.split(['T', ' ']).next().unwrap_or(s);

    ["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d", "%m-%d-%Y"]
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(day, fmt).ok())
}

fn parse_amount(s: &str) -> Option<Money> {
    let s = s.trim();
    let (negative, s) = if s.starts_with('(') && s.ends_with(')') {
        (true, &s[1..s.len() - 1])
    } else {
        (false, s)
    };
    let s = s.replace([',', '$', ' '], "");
    let mut dec = Decimal::from_str(&s)
        .or_else(|_| Decimal::from_scientific(&s))
        .ok()?;
    if negative {
        dec = -dec;
    }
    Some(Money::from_decimal(dec))
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

/// Group ids written by dataframe tools may carry a trailing `.0`.
fn parse_group_id(s: &str) -> Option<i64> {
    s.parse::<i64>().ok().or_else(|| {
        let dec = Decimal::from_str(s).ok()?;
        if dec.fract().is_zero() {
            dec.to_i64()
        } else {
            None
        }
    })
}

fn parse_raw_category(value: Option<String>, row: usize) -> Result<Vec<String>, CsvError> {
    match value {
        None => Ok(Vec::new()),
        Some(v) if v.starts_with('[') => serde_json::from_str(&v).map_err(|source| {
            CsvError::InvalidCategory {
                row,
                column: "raw_category",
                source,
            }
        }),
        Some(v) => Ok(vec![v]),
    }
}

fn parse_personal_finance_category(
    value: Option<String>,
    row: usize,
) -> Result<Option<PersonalFinanceCategory>, CsvError> {
    value
        .map(|v| {
            serde_json::from_str(&v).map_err(|source| CsvError::InvalidCategory {
                row,
                column: "personal_finance_category",
                source,
            })
        })
        .transpose()
}

fn reader<R: Read>(data: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::Headers)
        .from_reader(data)
}

pub fn import_aggregator<R: Read>(data: R) -> Result<Vec<AggregatorTransaction>, CsvError> {
    AggregatorImporter::parse(&mut reader(data))
}

pub fn import_shared_expenses<R: Read>(data: R) -> Result<Vec<SharedExpenseRecord>, CsvError> {
    SharedExpenseImporter::parse(&mut reader(data))
}

/// Concatenates several extracts. An id seen in an earlier extract wins;
/// the merged set is ordered by date.
pub fn merge_extracts(extracts: Vec<Vec<AggregatorTransaction>>) -> Vec<AggregatorTransaction> {
    let mut seen = HashSet::new();
    let mut merged: Vec<AggregatorTransaction> = extracts
        .into_iter()
        .flatten()
        .filter(|tx| {
            let fresh = seen.insert(tx.id.clone());
            if !fresh {
                tracing::debug!("Dropping repeated transaction id {}", tx.id);
            }
            fresh
        })
        .collect();
    merged.sort_by_key(|tx| tx.date);
    merged
}

pub fn export_ledger<W: Write>(out: W, entries: &[LedgerEntry]) -> Result<(), CsvError> {
    let mut writer = csv::Writer::from_writer(out);
    for entry in entries {
        writer.serialize(entry)?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    // ── parse_amount ──────────────────────────────────────────────────────────

    #[test]
    fn parse_amount_plain() {
        assert_eq!(parse_amount("123.45"), Some(Money::from_cents(12_345)));
    }

    #[test]
    fn parse_amount_with_dollar_sign_and_commas() {
        assert_eq!(parse_amount("$1,234.56"), Some(Money::from_cents(123_456)));
    }

    #[test]
    fn parse_amount_accounting_parens() {
        assert_eq!(parse_amount("(75.25)"), Some(Money::from_cents(-7_525)));
    }

    #[test]
    fn parse_amount_rounds_float_noise() {
        assert_eq!(parse_amount("29.999999999"), Some(Money::from_cents(3_000)));
    }

    #[test]
    fn parse_amount_invalid() {
        assert_eq!(parse_amount("not_a_number"), None);
        assert_eq!(parse_amount(""), None);
    }

    // ── parse_date / parse_bool / parse_group_id ──────────────────────────────

    #[test]
    fn parse_date_formats() {
        assert_eq!(parse_date("2022-04-01"), Some(date(2022, 4, 1)));
        assert_eq!(parse_date("04/01/2022"), Some(date(2022, 4, 1)));
        assert_eq!(parse_date("2022-04-01T00:00:00Z"), Some(date(2022, 4, 1)));
        assert_eq!(parse_date("2022-04-01 00:00:00"), Some(date(2022, 4, 1)));
        assert_eq!(parse_date("yesterday"), None);
    }

    #[test]
    fn parse_bool_variants() {
        assert_eq!(parse_bool("True"), Some(true));
        assert_eq!(parse_bool("false"), Some(false));
        assert_eq!(parse_bool("1"), Some(true));
        assert_eq!(parse_bool("maybe"), None);
    }

    #[test]
    fn parse_group_id_accepts_float_form() {
        assert_eq!(parse_group_id("31415"), Some(31_415));
        assert_eq!(parse_group_id("31415.0"), Some(31_415));
        assert_eq!(parse_group_id("31415.5"), None);
    }

    // ── aggregator import ─────────────────────────────────────────────────────

    const AGGREGATOR_HEADER: &str =
        "id,date,name,raw_category,personal_finance_category,amount,account,merchant_name\n";

    #[test]
    fn import_aggregator_basic() {
        let data = format!(
            "{AGGREGATOR_HEADER}\
             T1,2022-04-01,Venmo,\"[\"\"Transfer\"\",\"\"Third Party\"\",\"\"Venmo\"\"]\",,120.00,checking,\n\
             T2,2022-04-02,Chipotle,Food and Drink,\"{{\"\"primary\"\":\"\"FOOD_AND_DRINK\"\",\"\"detailed\"\":\"\"FOOD_AND_DRINK_FAST_FOOD\"\"}}\",12.50,credit,Chipotle Mexican Grill\n"
        );
        let txs = import_aggregator(data.as_bytes()).unwrap();
        assert_eq!(txs.len(), 2);

        assert_eq!(txs[0].id, "T1");
        assert_eq!(txs[0].raw_category, ["Transfer", "Third Party", "Venmo"]);
        assert_eq!(txs[0].personal_finance_category, None);
        assert_eq!(txs[0].amount, Money::from_cents(12_000));
        assert_eq!(txs[0].merchant_name, None);
        assert_eq!(txs[0].category, None);

        assert_eq!(txs[1].raw_category, ["Food and Drink"]);
        let pfc = txs[1].personal_finance_category.as_ref().unwrap();
        assert_eq!(pfc.primary, "FOOD_AND_DRINK");
        assert_eq!(pfc.detailed.as_deref(), Some("FOOD_AND_DRINK_FAST_FOOD"));
        assert_eq!(txs[1].merchant_name.as_deref(), Some("Chipotle Mexican Grill"));
    }

    #[test]
    fn import_aggregator_missing_amount_fails() {
        let data = format!("{AGGREGATOR_HEADER}T1,2022-04-01,Venmo,,,,checking,\n");
        let err = import_aggregator(data.as_bytes()).unwrap_err();
        assert!(matches!(
            err,
            CsvError::MissingColumn { row: 1, column: "amount" }
        ));
    }

    #[test]
    fn import_aggregator_bad_date_fails() {
        let data = format!("{AGGREGATOR_HEADER}T1,someday,Venmo,,,1.00,checking,\n");
        assert!(matches!(
            import_aggregator(data.as_bytes()),
            Err(CsvError::InvalidDate { row: 1, .. })
        ));
    }

    #[test]
    fn import_aggregator_bad_category_json_fails() {
        let data = format!("{AGGREGATOR_HEADER}T1,2022-04-01,Venmo,[Transfer,,1.00,checking,\n");
        assert!(matches!(
            import_aggregator(data.as_bytes()),
            Err(CsvError::InvalidCategory { column: "raw_category", .. })
        ));
    }

    #[test]
    fn import_aggregator_missing_header_column_fails() {
        let data = b"id,date,name,amount\nT1,2022-04-01,Venmo,1.00\n";
        assert!(matches!(
            import_aggregator(data.as_ref()),
            Err(CsvError::MissingColumn { column: "account", .. })
        ));
    }

    // ── shared-expense import ─────────────────────────────────────────────────

    const SHARED_HEADER: &str = "id,date,description,is_payment,cost,category,net_balance,paid_share,owed_share,group_id,group_name\n";

    #[test]
    fn import_shared_expenses_basic() {
        let data = format!(
            "{SHARED_HEADER}\
             S1,2022-03-31,Payment,True,120.0,Payment,120.0,120.0,0.0,,\n\
             S2,2022-04-05,Dinner,False,90.0,Dining out,60.0,90.0,30.0,31415.0,House\n"
        );
        let records = import_shared_expenses(data.as_bytes()).unwrap();
        assert_eq!(records.len(), 2);

        assert!(records[0].is_payment);
        assert_eq!(records[0].net_balance, Money::from_cents(12_000));
        assert_eq!(records[0].group_id, None);

        assert!(!records[1].is_payment);
        assert_eq!(records[1].source_category, "Dining out");
        assert_eq!(records[1].owed_share, Money::from_cents(3_000));
        assert_eq!(records[1].group_id, Some(31_415));
        assert_eq!(records[1].group_name.as_deref(), Some("House"));
    }

    #[test]
    fn import_shared_expenses_skips_non_participant_rows() {
        let data = format!(
            "{SHARED_HEADER}\
             S1,2022-04-05,Their dinner,False,90.0,Dining out,,,,,\n\
             S2,2022-04-06,Groceries,False,45.0,Groceries,-15.0,0.0,15.0,,\n"
        );
        let records = import_shared_expenses(data.as_bytes()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, "S2");
    }

    #[test]
    fn import_shared_expenses_partial_shares_fail() {
        let data = format!("{SHARED_HEADER}S1,2022-04-05,Dinner,False,90.0,Dining out,60.0,,30.0,,\n");
        assert!(matches!(
            import_shared_expenses(data.as_bytes()),
            Err(CsvError::PartialShares { row: 1 })
        ));
    }

    #[test]
    fn import_shared_expenses_bad_boolean_fails() {
        let data = format!("{SHARED_HEADER}S1,2022-04-05,Dinner,perhaps,90.0,Dining out,60.0,90.0,30.0,,\n");
        assert!(matches!(
            import_shared_expenses(data.as_bytes()),
            Err(CsvError::InvalidBoolean { column: "is_payment", .. })
        ));
    }

    // ── merge / export ────────────────────────────────────────────────────────

    fn tx(id: &str, day: u32) -> AggregatorTransaction {
        AggregatorTransaction {
            id: id.to_string(),
            date: date(2022, 4, day),
            name: format!("merchant {id}"),
            raw_category: Vec::new(),
            personal_finance_category: None,
            category: None,
            amount: Money::from_cents(100),
            account: "checking".to_string(),
            merchant_name: None,
        }
    }

    #[test]
    fn merge_extracts_dedupes_and_sorts() {
        let mut repeated = tx("A", 9);
        repeated.name = "later copy".to_string();
        let merged = merge_extracts(vec![vec![tx("A", 5), tx("B", 2)], vec![repeated, tx("C", 1)]]);
        let ids: Vec<_> = merged.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, ["C", "B", "A"]);
        assert_eq!(merged[2].name, "merchant A");
    }

    #[test]
    fn export_ledger_writes_header_and_rows() {
        let entry = LedgerEntry::from_transaction(tx("A", 1), &["income"]);
        let mut out = Vec::new();
        export_ledger(&mut out, &[entry]).unwrap();
        let text = String::from_utf8(out).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("id,date,name,category,amount,account,merchant_name,is_variable,week,month")
        );
        assert_eq!(
            lines.next(),
            Some("A,2022-04-01,merchant A,,1.00,checking,,true,2022-03-28,2022-04-01")
        );
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn export_ledger_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.csv");
        let file = std::fs::File::create(&path).unwrap();
        export_ledger(file, &[LedgerEntry::from_transaction(tx("A", 1), &["income"])]).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 2);
    }
}
