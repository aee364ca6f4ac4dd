//! Types shared with the host wallet selector

use std::fmt;
use std::str::FromStr;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use super::Action;

/// Account exposed to the selector after sign-in
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub account_id: String,
}

impl Account {
    pub fn new(account_id: &str) -> Self {
        Self {
            account_id: account_id.to_string(),
        }
    }
}

/// One transaction in the selector's neutral schema
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionParams {
    #[serde(default)]
    pub signer_id: String,
    #[serde(default)]
    pub receiver_id: String,
    #[serde(default)]
    pub actions: Vec<Action>,
}

impl TransactionParams {
    pub fn new(signer_id: &str, receiver_id: &str, actions: Vec<Action>) -> Self {
        Self {
            signer_id: signer_id.to_string(),
            receiver_id: receiver_id.to_string(),
            actions,
        }
    }
}

/// Parameters of `signAndSendTransactions`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionBatch {
    pub transactions: Vec<TransactionParams>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyOwnerParams {
    pub message: String,
    #[serde(default)]
    pub callback_url: Option<String>,
    #[serde(default)]
    pub meta: Option<String>,
}

/// Signed ownership proof returned by `verifyOwner`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifiedOwner {
    pub account_id: String,
    pub message: String,
    pub block_id: String,
    pub public_key: String,
    pub signature: String,
    pub key_type: u8,
}

/// Final outcome of an executed transaction, as returned by the `tx` query
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FinalExecutionOutcome {
    #[serde(default)]
    pub status: Value,
    #[serde(default)]
    pub transaction: Value,
    #[serde(default)]
    pub transaction_outcome: Value,
    #[serde(default)]
    pub receipts_outcome: Vec<Value>,
}

impl FinalExecutionOutcome {
    /// Whether the status reports `SuccessValue` or `SuccessReceiptId`
    pub fn is_success(&self) -> bool {
        self.status
            .as_object()
            .map(|status| {
                status.contains_key("SuccessValue") || status.contains_key("SuccessReceiptId")
            })
            .unwrap_or(false)
    }
}

/// `u128` carried as a decimal string in JSON
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, PartialOrd, Ord, Hash)]
pub struct U128(pub u128);

/// `u64` carried as a decimal string in JSON
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, PartialOrd, Ord, Hash)]
pub struct U64(pub u64);

macro_rules! string_number {
    ($name:ident, $inner:ty) => {
        impl From<$inner> for $name {
            fn from(value: $inner) -> Self {
                $name(value)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.collect_str(&self.0)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                // Selectors send amounts as strings; small values sometimes arrive as numbers
                #[derive(Deserialize)]
                #[serde(untagged)]
                enum Raw {
                    Text(String),
                    Number(u64),
                }

                match Raw::deserialize(deserializer)? {
                    Raw::Text(text) => <$inner>::from_str(text.trim())
                        .map($name)
                        .map_err(|e| de::Error::custom(format!("invalid amount {:?}: {}", text, e))),
                    Raw::Number(n) => Ok($name(n.into())),
                }
            }
        }
    };
}

string_number!(U128, u128);
string_number!(U64, u64);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_amounts_accept_strings_and_numbers() {
        let a: U128 = serde_json::from_str("\"1000000000000000000000000\"").unwrap();
        assert_eq!(a.0, 1_000_000_000_000_000_000_000_000);

        let b: U64 = serde_json::from_str("30000000000000").unwrap();
        assert_eq!(b.0, 30_000_000_000_000);

        assert!(serde_json::from_str::<U128>("\"-1\"").is_err());
        assert_eq!(serde_json::to_string(&U128(5)).unwrap(), "\"5\"");
    }

    #[test]
    fn test_transaction_params_defaults() {
        let tx: TransactionParams = serde_json::from_value(serde_json::json!({
            "receiverId": "guest-book.near"
        }))
        .unwrap();

        assert!(tx.signer_id.is_empty());
        assert!(tx.actions.is_empty());
    }

    #[test]
    fn test_outcome_success() {
        let outcome: FinalExecutionOutcome = serde_json::from_value(serde_json::json!({
            "status": { "SuccessValue": "" },
            "transaction": {},
            "transaction_outcome": {},
            "receipts_outcome": []
        }))
        .unwrap();
        assert!(outcome.is_success());

        let failed = FinalExecutionOutcome {
            status: serde_json::json!({ "Failure": {} }),
            ..Default::default()
        };
        assert!(!failed.is_success());
    }
}
