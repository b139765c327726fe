//! CSV file of normalized transactions, one fill per row.

use super::{SourceError, TransactionSource};
use crate::domain::{
    AccountKey, Action, CodeKind, Decimal, NormalizedTransaction, OptionType, StoredTransaction,
    TransCode,
};
use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, serde::Deserialize)]
struct Row {
    account_name: Option<String>,
    account_number: Option<String>,
    activity_date: String,
    process_date: Option<String>,
    settle_date: Option<String>,
    instrument: String,
    #[serde(default)]
    description: Option<String>,
    trans_code: String,
    quantity: String,
    price: String,
    amount: Option<String>,
    strike: String,
    option_type: String,
    expiration: String,
    action: String,
}

/// Reads stored transactions from a normalized CSV file.
#[derive(Debug, Clone)]
pub struct CsvTransactionSource {
    path: PathBuf,
    default_account_name: String,
}

impl CsvTransactionSource {
    pub fn new(path: impl Into<PathBuf>, default_account_name: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            default_account_name: default_account_name.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Parse CSV bytes into stored transactions, in file order.
    ///
    /// Rows with a blank account name are assigned `default_account_name`.
    pub fn parse_csv(
        csv_bytes: &[u8],
        default_account_name: &str,
    ) -> Result<Vec<StoredTransaction>, SourceError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(csv_bytes);

        let headers = reader
            .headers()
            .map_err(|e| SourceError::Parse {
                line: 1,
                message: e.to_string(),
            })?
            .clone();

        let mut stored = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|e| SourceError::Parse {
                line: e.position().map(|p| p.line()).unwrap_or(0),
                message: e.to_string(),
            })?;
            let line = record.position().map(|p| p.line()).unwrap_or(0);
            let parse_err = |message: String| SourceError::Parse { line, message };

            let row: Row = record
                .deserialize(Some(&headers))
                .map_err(|e| parse_err(e.to_string()))?;

            let raw: BTreeMap<String, String> = headers
                .iter()
                .zip(record.iter())
                .map(|(header, value)| (header.to_string(), value.to_string()))
                .collect();

            let account_name = row
                .account_name
                .as_deref()
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .unwrap_or(default_account_name)
                .to_string();
            let account = AccountKey::new(account_name, row.account_number);

            let quantity = row
                .quantity
                .parse::<u32>()
                .ok()
                .filter(|q| *q > 0)
                .ok_or_else(|| parse_err(format!("invalid quantity: {}", row.quantity)))?;

            let transaction = NormalizedTransaction {
                activity_date: parse_date("activity_date", &row.activity_date)
                    .map_err(parse_err)?,
                process_date: parse_optional_date("process_date", row.process_date.as_deref())
                    .map_err(parse_err)?,
                settle_date: parse_optional_date("settle_date", row.settle_date.as_deref())
                    .map_err(parse_err)?,
                instrument: row.instrument.trim().to_uppercase(),
                description: row.description.unwrap_or_default(),
                trans_code: TransCode::parse(&row.trans_code),
                quantity,
                price: parse_decimal("price", &row.price).map_err(parse_err)?,
                amount: match row.amount.as_deref().filter(|s| !s.trim().is_empty()) {
                    Some(amount) => Some(parse_decimal("amount", amount).map_err(parse_err)?),
                    None => None,
                },
                strike: parse_decimal("strike", &row.strike).map_err(parse_err)?,
                option_type: row
                    .option_type
                    .parse::<OptionType>()
                    .map_err(|e| parse_err(format!("invalid option_type: {}", e)))?,
                expiration: parse_date("expiration", &row.expiration).map_err(parse_err)?,
                action: row
                    .action
                    .parse::<Action>()
                    .map_err(|e| parse_err(format!("invalid action: {}", e)))?,
                raw,
            };

            if transaction.trans_code.kind() == CodeKind::Unclassified {
                tracing::warn!(
                    line,
                    trans_code = %transaction.trans_code,
                    "unrecognized transaction code"
                );
            }

            stored.push(StoredTransaction::new(account, transaction));
        }

        Ok(stored)
    }
}

fn parse_date(field: &str, value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT)
        .map_err(|e| format!("invalid {}: {} ({})", field, value, e))
}

fn parse_optional_date(field: &str, value: Option<&str>) -> Result<Option<NaiveDate>, String> {
    match value.map(str::trim).filter(|s| !s.is_empty()) {
        Some(value) => parse_date(field, value).map(Some),
        None => Ok(None),
    }
}

fn parse_decimal(field: &str, value: &str) -> Result<Decimal, String> {
    Decimal::from_str_canonical(value).map_err(|e| format!("invalid {}: {} ({})", field, value, e))
}

#[async_trait]
impl TransactionSource for CsvTransactionSource {
    async fn fetch_transactions(&self) -> Result<Vec<StoredTransaction>, SourceError> {
        let bytes = tokio::fs::read(&self.path)
            .await
            .map_err(|e| SourceError::Io {
                path: self.path.display().to_string(),
                message: e.to_string(),
            })?;
        let stored = Self::parse_csv(&bytes, &self.default_account_name)?;
        tracing::info!(
            path = %self.path.display(),
            rows = stored.len(),
            "loaded normalized transactions"
        );
        Ok(stored)
    }
}
