//! Domain primitives: AccountKey, OptionType, Action, TransCode.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Brokerage account identity used to partition fills.
///
/// The name is trimmed on construction so imports with stray whitespace
/// land in the same partition.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AccountKey {
    pub name: String,
    pub number: Option<String>,
}

impl AccountKey {
    pub fn new(name: impl Into<String>, number: Option<String>) -> Self {
        let name: String = name.into();
        let number = number
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());
        AccountKey {
            name: name.trim().to_string(),
            number,
        }
    }

    /// Human label, e.g. `Robinhood IRA (RH-12345)`.
    pub fn label(&self) -> String {
        match &self.number {
            Some(number) => format!("{} ({})", self.name, number),
            None => self.name.clone(),
        }
    }
}

impl fmt::Display for AccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Option right.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OptionType {
    Call,
    Put,
}

impl OptionType {
    /// Single-letter code used inside leg ids.
    pub fn code(&self) -> char {
        match self {
            OptionType::Call => 'C',
            OptionType::Put => 'P',
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OptionType::Call => "CALL",
            OptionType::Put => "PUT",
        }
    }
}

impl FromStr for OptionType {
    type Err = String;

    /// Anything starting with `C` is a call; everything else is a put.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_uppercase();
        if normalized.is_empty() {
            return Err("option type must not be empty".to_string());
        }
        if normalized.starts_with('C') {
            Ok(OptionType::Call)
        } else {
            Ok(OptionType::Put)
        }
    }
}

impl fmt::Display for OptionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalized trade action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Action {
    Buy,
    Sell,
}

impl Action {
    /// Signed multiplier for this action (+1 for Buy, -1 for Sell).
    pub fn sign(&self) -> i64 {
        match self {
            Action::Buy => 1,
            Action::Sell => -1,
        }
    }
}

impl FromStr for Action {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "BUY" => Ok(Action::Buy),
            "SELL" => Ok(Action::Sell),
            other => Err(format!("unknown action: {}", other)),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Buy => write!(f, "BUY"),
            Action::Sell => write!(f, "SELL"),
        }
    }
}

/// How a transaction code affects a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CodeKind {
    Opening,
    Closing,
    /// Not a known option code; sign falls back to the action.
    Unclassified,
}

/// Broker transaction code for an option fill.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum TransCode {
    /// Buy to open.
    Bto,
    /// Sell to open.
    Sto,
    /// Buy to close.
    Btc,
    /// Sell to close.
    Stc,
    /// Option assignment.
    Oasgn,
    /// Option expiration.
    Oexp,
    Other(String),
}

impl TransCode {
    pub fn parse(code: &str) -> Self {
        match code.trim().to_uppercase().as_str() {
            "BTO" => TransCode::Bto,
            "STO" => TransCode::Sto,
            "BTC" => TransCode::Btc,
            "STC" => TransCode::Stc,
            "OASGN" => TransCode::Oasgn,
            "OEXP" => TransCode::Oexp,
            other => TransCode::Other(other.to_string()),
        }
    }

    pub fn kind(&self) -> CodeKind {
        match self {
            TransCode::Bto | TransCode::Sto => CodeKind::Opening,
            TransCode::Btc | TransCode::Stc | TransCode::Oasgn | TransCode::Oexp => {
                CodeKind::Closing
            }
            TransCode::Other(_) => CodeKind::Unclassified,
        }
    }

    pub fn is_opening(&self) -> bool {
        self.kind() == CodeKind::Opening
    }

    pub fn is_closing(&self) -> bool {
        self.kind() == CodeKind::Closing
    }

    /// Ordering priority for same-day fills: opens, then closes, then the rest.
    pub fn priority(&self) -> u8 {
        match self.kind() {
            CodeKind::Opening => 0,
            CodeKind::Closing => 1,
            CodeKind::Unclassified => 2,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            TransCode::Bto => "BTO",
            TransCode::Sto => "STO",
            TransCode::Btc => "BTC",
            TransCode::Stc => "STC",
            TransCode::Oasgn => "OASGN",
            TransCode::Oexp => "OEXP",
            TransCode::Other(code) => code.as_str(),
        }
    }

    /// Label describing how a lot was closed by this code.
    pub fn close_label(&self) -> &str {
        match self {
            TransCode::Btc => "Buy to close",
            TransCode::Stc => "Sell to close",
            TransCode::Oexp => "Expiration",
            TransCode::Oasgn => "Assignment",
            other => other.as_str(),
        }
    }
}

impl From<String> for TransCode {
    fn from(value: String) -> Self {
        TransCode::parse(&value)
    }
}

impl From<TransCode> for String {
    fn from(value: TransCode) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for TransCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
