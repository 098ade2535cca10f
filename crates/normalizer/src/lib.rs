use chrono::{NaiveDate, NaiveDateTime};
use serde_json::Value;

use models::{AgingBucket, Transaction, TxnKind};

/// A raw export row as handed over by the tabular-parsing layer: header-keyed,
/// key order preserved (serde_json `preserve_order`).
pub type RawRow = serde_json::Map<String, Value>;

// Accepted header synonyms per canonical field, matched against trimmed
// lower-cased header text. Pure data; extend here, not in code.
const CUSTOMER_HEADERS: &[&str] = &["customer", "name", "customer_name"];
const TYPE_HEADERS: &[&str] = &["type", "transaction_type"];
const TXN_DATE_HEADERS: &[&str] = &["date", "txn_date", "transaction_date", "invoice_date"];
const DUE_DATE_HEADERS: &[&str] = &["due date", "due_date", "duedate"];
const DOC_NUM_HEADERS: &[&str] = &["num", "no", "invoice_number", "doc_num", "txn_no"];
const BALANCE_HEADERS: &[&str] = &[
    "open balance",
    "open_balance",
    "open amount",
    "openamount",
    "open_amt",
    "amount due",
    "amount_due",
    "balance",
    "amount",
    "amt",
];
const MEMO_HEADERS: &[&str] = &["memo", "description", "memo/description", "memo_description"];

// Explicit non-sales transaction types, always dropped.
const EXCLUDED_TYPES: &[&str] = &["payment", "deposit", "journal", "total", "subtotal", "refund"];

/// Resolved mapping from canonical fields to the actual header names of one
/// export. Resolved once per ingestion from the first row's headers.
#[derive(Debug, Clone, Default)]
pub struct ColumnMap {
    pub customer: Option<String>,
    pub kind: Option<String>,
    pub txn_date: Option<String>,
    pub due_date: Option<String>,
    pub doc_number: Option<String>,
    pub balance: Option<String>,
    pub memo: Option<String>,
}

impl ColumnMap {
    /// First header (in key order) whose trimmed lower-cased name matches a
    /// synonym wins each field.
    pub fn resolve(row: &RawRow) -> Self {
        let find = |names: &[&str]| -> Option<String> {
            row.keys()
                .find(|h| names.contains(&h.trim().to_lowercase().as_str()))
                .cloned()
        };
        ColumnMap {
            customer: find(CUSTOMER_HEADERS),
            kind: find(TYPE_HEADERS),
            txn_date: find(TXN_DATE_HEADERS),
            due_date: find(DUE_DATE_HEADERS),
            doc_number: find(DOC_NUM_HEADERS),
            balance: find(BALANCE_HEADERS),
            memo: find(MEMO_HEADERS),
        }
    }
}

/// Normalize raw export rows into canonical transactions, preserving input
/// order. Rows without a usable type or customer are dropped; unparsable
/// amounts and dates coerce to safe defaults rather than failing the row.
pub fn normalize_rows(rows: &[RawRow], today: NaiveDate) -> Vec<Transaction> {
    let Some(first) = rows.first() else {
        return Vec::new();
    };
    let cols = ColumnMap::resolve(first);
    // Without a customer or balance column there is nothing to aggregate.
    if cols.customer.is_none() || cols.balance.is_none() {
        tracing::warn!("no customer/balance column recognized; no usable rows");
        return Vec::new();
    }

    let mut out = Vec::new();
    for (idx, row) in rows.iter().enumerate() {
        let type_text = cols
            .kind
            .as_deref()
            .map(|c| cell_text(row.get(c)))
            .unwrap_or_default()
            .to_lowercase();
        if type_text.is_empty() || EXCLUDED_TYPES.contains(&type_text.as_str()) {
            tracing::debug!(row = idx, kind = %type_text, "skipping non-sales row");
            continue;
        }
        // Keep invoices and credit memos only.
        if !(type_text.contains("inv") || type_text == "invoice" || type_text.contains("credit")) {
            tracing::debug!(row = idx, kind = %type_text, "skipping unrecognized type");
            continue;
        }

        let customer = cols
            .customer
            .as_deref()
            .map(|c| cell_text(row.get(c)))
            .unwrap_or_default()
            .trim()
            .to_string();
        if customer.is_empty() {
            tracing::debug!(row = idx, "skipping row without customer");
            continue;
        }

        let kind = if type_text.contains("credit") {
            TxnKind::CreditMemo
        } else {
            TxnKind::Invoice
        };

        let open_balance = cols
            .balance
            .as_deref()
            .map(|c| parse_amount(row.get(c)))
            .unwrap_or(0.0);

        let due_raw = cols.due_date.as_deref().map(|c| cell_text(row.get(c)));
        let days_past_due = due_raw
            .as_deref()
            .and_then(parse_date)
            .map(|due| (today - due).num_days().max(0))
            .unwrap_or(0);

        let passthrough = |col: &Option<String>| -> Option<String> {
            let text = cell_text(row.get(col.as_deref()?));
            if text.is_empty() { None } else { Some(text) }
        };

        out.push(Transaction {
            customer,
            kind,
            open_balance,
            days_past_due,
            bucket: AgingBucket::from_days(days_past_due),
            txn_date: passthrough(&cols.txn_date),
            due_date: passthrough(&cols.due_date),
            doc_number: passthrough(&cols.doc_number),
            memo: passthrough(&cols.memo),
        });
    }
    out
}

/// Cell value as display text. Numbers keep their JSON rendering; null and
/// non-scalar values are empty.
fn cell_text(v: Option<&Value>) -> String {
    match v {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}

/// Parse a money cell. Strips everything outside `[0-9.-]` (currency symbols,
/// thousands separators) before conversion; anything unparsable or non-finite
/// becomes 0.0.
pub fn parse_amount(v: Option<&Value>) -> f64 {
    if let Some(Value::Number(n)) = v {
        return n.as_f64().filter(|x| x.is_finite()).unwrap_or(0.0);
    }
    let cleaned: String = cell_text(v)
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();
    cleaned
        .parse::<f64>()
        .ok()
        .filter(|x| x.is_finite())
        .unwrap_or(0.0)
}

/// Best-effort date parsing against common export formats. Returns None for
/// anything unrecognized; callers fall back to days_past_due = 0.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    for fmt in ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%m/%d/%y", "%d-%m-%Y"] {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(d);
        }
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }
    None
}
