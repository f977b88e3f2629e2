//! Data exchanged with extensions: credentials, query parameters, metadata
//! and the shapes of the domain replies.
use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Credentials handed to every domain capability.
pub type Credentials = BTreeMap<String, String>;

/// Information an extension reports about itself.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginMetadata {
    pub id: String,
    pub name: String,
    pub version: String,
    pub description: String,
    pub author: String,
    pub auth_type: String,
    /// Capability contract revision the extension was built against
    pub contract_version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_credentials_schema: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_credentials_schema: Option<serde_json::Value>,
}

/// Paging and sorting shared by both query kinds.
///
/// `page`/`limit` take priority over `cursor`/`limit`; cursor paging is the default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommonParams {
    pub page: u32,
    pub cursor: String,
    pub limit: u32,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub sort_descending: bool,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub extras: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContactQueryParams {
    #[serde(flatten)]
    pub common: CommonParams,
    pub search: String,
    pub search_ids: Vec<String>,
}

/// Ledger queries are answered sorted by timestamp ascending.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerQueryParams {
    #[serde(flatten)]
    pub common: CommonParams,
    pub customer_id: String,
    pub start_date: String,
    pub end_date: String,
    pub doc_types: Vec<DocType>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocType {
    Invoice,
    Payment,
    Refund,
    CreditNote,
    CreditRefund,
    DebitNote,
    Journal,
}

impl fmt::Display for DocType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            DocType::Invoice => "INVOICE",
            DocType::Payment => "PAYMENT",
            DocType::Refund => "REFUND",
            DocType::CreditNote => "CREDIT NOTE",
            DocType::CreditRefund => "CREDIT REFUND",
            DocType::DebitNote => "DEBIT NOTE",
            DocType::Journal => "JOURNAL",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Contacts {
    #[serde(default)]
    pub source: String,
    #[serde(rename = "contacts", default)]
    pub items: Vec<Contact>,
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub total: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: i64,
    pub date: String,
    pub doc_type: DocType,
    pub amount: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Ledger {
    #[serde(default)]
    pub entries: Vec<LedgerEntry>,
    #[serde(default)]
    pub customer_name: String,
    #[serde(default)]
    pub opening_balance: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
}
