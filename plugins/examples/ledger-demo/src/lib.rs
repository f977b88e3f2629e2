//! # ledger-demo
//!
//! Reference extension for plughost. Serves a small in-memory contact book
//! and ledger through the typed capability table (see [`ffi`]).
pub mod ffi;

use plughost_core::kernel::constants;
use plughost_core::plugin_system::models::{
    CommonParams, Contact, ContactQueryParams, Contacts, DocType, Ledger, LedgerEntry, LedgerQueryParams,
    PluginMetadata,
};

const SOURCE_ID: &str = "ledger-demo";
const DEFAULT_PAGE_SIZE: usize = 20;

// id, name, email
const CONTACTS: &[(&str, &str, &str)] = &[
    ("c-100", "Ada Lovelace", "ada@example.com"),
    ("c-101", "Grace Hopper", "grace@example.com"),
    ("c-102", "Alan Turing", "alan@example.com"),
    ("c-103", "Edsger Dijkstra", "edsger@example.com"),
    ("c-104", "Barbara Liskov", "barbara@example.com"),
];

// id, customer, date, doc type, amount
const ENTRIES: &[(i64, &str, &str, DocType, &str)] = &[
    (7, "c-100", "2024-03-02", DocType::Payment, "-50.00"),
    (1, "c-100", "2024-01-15", DocType::Invoice, "120.00"),
    (4, "c-100", "2024-02-01", DocType::Invoice, "80.00"),
    (9, "c-100", "2024-03-20", DocType::CreditNote, "-10.00"),
    (2, "c-101", "2024-01-20", DocType::Invoice, "300.00"),
    (5, "c-101", "2024-02-10", DocType::Payment, "-300.00"),
];

/// The extension's domain logic, independent of the FFI surface.
#[derive(Debug, Default, Clone, Copy)]
pub struct LedgerDemo;

impl LedgerDemo {
    pub fn metadata(&self) -> PluginMetadata {
        PluginMetadata {
            id: SOURCE_ID.to_string(),
            name: "Ledger Demo".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            description: "In-memory contact book and ledger".to_string(),
            author: "plughost developers".to_string(),
            auth_type: "none".to_string(),
            contract_version: constants::CONTRACT_VERSION.to_string(),
            ..PluginMetadata::default()
        }
    }

    pub fn health(&self) -> &'static str {
        "ok"
    }

    /// Contacts matching `search` (case-insensitive, on the name) and
    /// `search_ids`, sorted by name.
    pub fn contacts(&self, params: &ContactQueryParams) -> Result<Contacts, String> {
        let search = params.search.to_lowercase();
        let mut matching: Vec<Contact> = CONTACTS
            .iter()
            .filter(|(id, _, _)| params.search_ids.is_empty() || params.search_ids.iter().any(|s| s.as_str() == *id))
            .filter(|(_, name, _)| search.is_empty() || name.to_lowercase().contains(&search))
            .map(|(id, name, email)| Contact { id: id.to_string(), name: name.to_string(), email: email.to_string() })
            .collect();
        matching.sort_by(|a, b| a.name.cmp(&b.name));
        if params.common.sort_descending {
            matching.reverse();
        }

        let total = matching.len();
        let (items, next_cursor) = paginate(matching, &params.common)?;
        Ok(Contacts {
            source: SOURCE_ID.to_string(),
            count: items.len() as u64,
            total: total as u64,
            items,
            next_cursor,
        })
    }

    /// Ledger of one customer, sorted by date ascending.
    pub fn ledger(&self, params: &LedgerQueryParams) -> Result<Ledger, String> {
        let customer_id = params.customer_id.trim();
        if customer_id.is_empty() {
            return Err("customer_id is required".to_string());
        }
        let Some((_, customer_name, _)) = CONTACTS.iter().find(|(id, _, _)| *id == customer_id) else {
            return Err(format!("unknown customer '{}'", customer_id));
        };

        let mut entries: Vec<LedgerEntry> = ENTRIES
            .iter()
            .filter(|(_, customer, ..)| *customer == customer_id)
            .filter(|(_, _, date, ..)| params.start_date.is_empty() || *date >= params.start_date.as_str())
            .filter(|(_, _, date, ..)| params.end_date.is_empty() || *date <= params.end_date.as_str())
            .filter(|(_, _, _, doc_type, _)| params.doc_types.is_empty() || params.doc_types.contains(doc_type))
            .map(|(id, _, date, doc_type, amount)| LedgerEntry {
                id: *id,
                date: date.to_string(),
                doc_type: *doc_type,
                amount: amount.to_string(),
            })
            .collect();
        entries.sort_by(|a, b| a.date.cmp(&b.date).then(a.id.cmp(&b.id)));

        let (entries, next_cursor) = paginate(entries, &params.common)?;
        Ok(Ledger {
            entries,
            customer_name: customer_name.to_string(),
            opening_balance: "0.00".to_string(),
            next_cursor,
        })
    }

    /// Exercises both queries against the bundled data.
    pub fn self_test(&self) -> Result<(), String> {
        let everyone = self.contacts(&ContactQueryParams::default())?;
        if everyone.total != CONTACTS.len() as u64 {
            return Err(format!("expected {} contacts, got {}", CONTACTS.len(), everyone.total));
        }
        let ledger = self.ledger(&LedgerQueryParams { customer_id: "c-100".to_string(), ..Default::default() })?;
        if !ledger.entries.windows(2).all(|pair| pair[0].date <= pair[1].date) {
            return Err("ledger entries are not sorted by date".to_string());
        }
        Ok(())
    }
}

/// `page`/`limit` when a page is given, otherwise `cursor`/`limit`. The
/// cursor is the offset of the next item.
fn paginate<T>(items: Vec<T>, common: &CommonParams) -> Result<(Vec<T>, Option<String>), String> {
    let limit = match common.limit {
        0 => DEFAULT_PAGE_SIZE,
        n => n as usize,
    };
    let offset = if common.page > 0 {
        (common.page as usize - 1) * limit
    } else if common.cursor.is_empty() {
        0
    } else {
        common.cursor.parse::<usize>().map_err(|_| format!("invalid cursor '{}'", common.cursor))?
    };

    let end = offset.saturating_add(limit).min(items.len());
    let next_cursor = (end < items.len()).then(|| end.to_string());
    let page = items.into_iter().skip(offset).take(end.saturating_sub(offset)).collect();
    Ok((page, next_cursor))
}
