use chrono::NaiveDate;
use thiserror::Error;

use models::{AgingBucket, Transaction, ViewPayload};
use normalizer::{RawRow, normalize_rows};

use crate::aggregate::aggregate;
use crate::project::project_invoices;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("no usable rows in input")]
    NoUsableData,
}

/// Active filter. Customer and bucket filters are mutually exclusive;
/// entering one clears the other.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Filter {
    #[default]
    None,
    Customer(String),
    Bucket(AgingBucket),
}

/// Balances-chart mode. A presentation preference of the consumer, except
/// that any active filter forces `Stacked`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartMode {
    Stacked,
    Totals,
}

/// Owns the immutable original dataset and the current derived view. Every
/// filter transition recomputes the payload from the original set; payloads
/// are replaced whole, never mutated in place.
#[derive(Debug)]
pub struct Dashboard {
    original: Vec<Transaction>,
    as_of: NaiveDate,
    filter: Filter,
    payload: ViewPayload,
    totals_only: bool,
}

impl Dashboard {
    /// Capture an already-normalized dataset as the original.
    pub fn from_transactions(txns: Vec<Transaction>, as_of: NaiveDate) -> Self {
        let payload = aggregate(&txns, as_of);
        Dashboard {
            original: txns,
            as_of,
            filter: Filter::None,
            payload,
            totals_only: false,
        }
    }

    /// Normalize raw export rows and capture the result as the original
    /// dataset. Zero usable rows is an error, not an empty dashboard.
    pub fn from_rows(rows: &[RawRow], today: NaiveDate) -> Result<Self, IngestError> {
        let txns = normalize_rows(rows, today);
        if txns.is_empty() {
            return Err(IngestError::NoUsableData);
        }
        tracing::debug!(transactions = txns.len(), "captured original dataset");
        Ok(Self::from_transactions(txns, today))
    }

    /// Replace the original dataset from a fresh export. On failure the
    /// previous dataset, filter, and payload are left untouched.
    pub fn ingest(&mut self, rows: &[RawRow], today: NaiveDate) -> Result<&ViewPayload, IngestError> {
        let txns = normalize_rows(rows, today);
        if txns.is_empty() {
            return Err(IngestError::NoUsableData);
        }
        tracing::debug!(transactions = txns.len(), "replacing original dataset");
        self.original = txns;
        self.as_of = today;
        self.filter = Filter::None;
        self.recompute();
        Ok(&self.payload)
    }

    pub fn payload(&self) -> &ViewPayload {
        &self.payload
    }

    pub fn filter(&self) -> &Filter {
        &self.filter
    }

    pub fn active_customer(&self) -> Option<&str> {
        match &self.filter {
            Filter::Customer(name) => Some(name),
            _ => None,
        }
    }

    pub fn active_bucket(&self) -> Option<AgingBucket> {
        match &self.filter {
            Filter::Bucket(b) => Some(*b),
            _ => None,
        }
    }

    /// Scope the view to one customer. Reselecting the active customer (or
    /// passing `None`) toggles back to the unfiltered view. Any bucket filter
    /// is cleared. The payload's chart sections are replaced with the
    /// per-invoice projection of the customer's transactions.
    pub fn apply_customer_filter(&mut self, name: Option<&str>) -> &ViewPayload {
        match name {
            None => return self.clear_filters(),
            Some(n) if self.active_customer() == Some(n) => return self.clear_filters(),
            Some(n) => {
                tracing::debug!(customer = n, "applying customer filter");
                self.filter = Filter::Customer(n.to_string());
            }
        }
        self.recompute();
        &self.payload
    }

    /// Scope the view to one aging bucket. Same toggle semantics as the
    /// customer filter; no per-invoice projection.
    pub fn apply_bucket_filter(&mut self, bucket: Option<AgingBucket>) -> &ViewPayload {
        match bucket {
            None => return self.clear_filters(),
            Some(b) if self.active_bucket() == Some(b) => return self.clear_filters(),
            Some(b) => {
                tracing::debug!(bucket = b.label(), "applying bucket filter");
                self.filter = Filter::Bucket(b);
            }
        }
        self.recompute();
        &self.payload
    }

    /// Force the unfiltered view and recompute from the full original set.
    pub fn clear_filters(&mut self) -> &ViewPayload {
        self.filter = Filter::None;
        self.recompute();
        &self.payload
    }

    /// Totals-only preference for the balances chart. Only selectable in the
    /// unfiltered state; ignored while a filter is active.
    pub fn set_totals_only(&mut self, flag: bool) {
        if self.filter == Filter::None {
            self.totals_only = flag;
        }
    }

    pub fn totals_only(&self) -> bool {
        self.totals_only
    }

    /// Effective chart mode: any active filter forces stacked-by-bucket.
    pub fn chart_mode(&self) -> ChartMode {
        if self.filter == Filter::None && self.totals_only {
            ChartMode::Totals
        } else {
            ChartMode::Stacked
        }
    }

    fn recompute(&mut self) {
        self.payload = match &self.filter {
            Filter::None => aggregate(&self.original, self.as_of),
            Filter::Customer(name) => {
                let subset: Vec<Transaction> = self
                    .original
                    .iter()
                    .filter(|t| t.customer == *name)
                    .cloned()
                    .collect();
                let mut payload = aggregate(&subset, self.as_of);
                let (cust_bucket, risk_top) = project_invoices(&subset);
                payload.cust_bucket = cust_bucket;
                payload.risk_top = risk_top;
                payload
            }
            Filter::Bucket(b) => {
                let subset: Vec<Transaction> = self
                    .original
                    .iter()
                    .filter(|t| t.bucket == *b)
                    .cloned()
                    .collect();
                aggregate(&subset, self.as_of)
            }
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use models::TxnKind;
    use serde_json::json;

    fn txn(customer: &str, balance: f64, days: i64) -> Transaction {
        Transaction {
            customer: customer.to_string(),
            kind: TxnKind::Invoice,
            open_balance: balance,
            days_past_due: days,
            bucket: AgingBucket::from_days(days),
            txn_date: None,
            due_date: None,
            doc_number: Some(format!("{customer}-{balance}")),
            memo: None,
        }
    }

    fn as_of() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 8, 30).unwrap()
    }

    fn dashboard() -> Dashboard {
        // Acme: 1000 Current; Beta: 200 in 120+.
        Dashboard::from_transactions(
            vec![txn("Acme", 600.0, 0), txn("Acme", 400.0, 0), txn("Beta", 200.0, 150)],
            as_of(),
        )
    }

    #[test]
    fn test_initial_state_unfiltered() {
        let d = dashboard();
        assert_eq!(*d.filter(), Filter::None);
        assert_eq!(d.payload().totals.total_ar, 1200.0);
        assert_eq!(d.payload().cust_bucket.items, vec!["Acme", "Beta"]);
    }

    #[test]
    fn test_customer_filter_scopes_and_projects() {
        let mut d = dashboard();
        let p = d.apply_customer_filter(Some("Beta")).clone();
        assert_eq!(d.active_customer(), Some("Beta"));
        assert_eq!(p.totals.total_ar, 200.0);
        assert_eq!(p.detail.len(), 1);
        // Items are invoice labels now, not customers.
        assert_eq!(p.cust_bucket.items, vec!["Beta-200"]);
        assert_eq!(p.risk_top.len(), 1);
        assert_eq!(p.risk_top[0].label, "Beta-200");
        assert_eq!(p.risk_top[0].transaction_count, 1);
    }

    #[test]
    fn test_customer_filter_toggles_off() {
        let mut d = dashboard();
        let unfiltered = d.clear_filters().clone();
        d.apply_customer_filter(Some("Acme"));
        let p = d.apply_customer_filter(Some("Acme")).clone();
        assert_eq!(*d.filter(), Filter::None);
        assert_eq!(p.totals, unfiltered.totals);
        assert_eq!(p.cust_bucket.items, unfiltered.cust_bucket.items);
        assert_eq!(p.risk_top, unfiltered.risk_top);
    }

    #[test]
    fn test_none_argument_clears() {
        let mut d = dashboard();
        d.apply_customer_filter(Some("Acme"));
        d.apply_customer_filter(None);
        assert_eq!(*d.filter(), Filter::None);

        d.apply_bucket_filter(Some(AgingBucket::Current));
        d.apply_bucket_filter(None);
        assert_eq!(*d.filter(), Filter::None);
    }

    #[test]
    fn test_filters_mutually_exclusive() {
        let mut d = dashboard();
        d.apply_customer_filter(Some("Acme"));
        d.apply_bucket_filter(Some(AgingBucket::Over120));
        assert_eq!(d.active_customer(), None);
        assert_eq!(d.active_bucket(), Some(AgingBucket::Over120));

        d.apply_customer_filter(Some("Beta"));
        assert_eq!(d.active_bucket(), None);
        assert_eq!(d.active_customer(), Some("Beta"));
    }

    #[test]
    fn test_bucket_filter_scenario() {
        let mut d = dashboard();
        let p = d.apply_bucket_filter(Some(AgingBucket::Current)).clone();
        assert!(p.detail.iter().all(|t| t.customer == "Acme"));
        assert_eq!(p.totals.overdue_total, 0.0);
        assert!(p.risk_top.is_empty());
        // Items stay customers under a bucket filter.
        assert_eq!(p.cust_bucket.items, vec!["Acme"]);
    }

    #[test]
    fn test_bucket_filter_toggles_off() {
        let mut d = dashboard();
        d.apply_bucket_filter(Some(AgingBucket::Current));
        d.apply_bucket_filter(Some(AgingBucket::Current));
        assert_eq!(*d.filter(), Filter::None);
        assert_eq!(d.payload().totals.total_ar, 1200.0);
    }

    #[test]
    fn test_stale_filter_yields_empty_payload() {
        let mut d = dashboard();
        let p = d.apply_customer_filter(Some("Gone Corp")).clone();
        assert_eq!(p.totals.total_ar, 0.0);
        assert!(p.detail.is_empty());
        assert!(p.risk_top.is_empty());
        assert_eq!(d.active_customer(), Some("Gone Corp"));
    }

    #[test]
    fn test_recompute_idempotent() {
        let mut d = dashboard();
        d.apply_customer_filter(Some("Acme"));
        let first = serde_json::to_string(d.payload()).unwrap();
        d.clear_filters();
        d.apply_customer_filter(Some("Acme"));
        let second = serde_json::to_string(d.payload()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_chart_mode_contract() {
        let mut d = dashboard();
        assert_eq!(d.chart_mode(), ChartMode::Stacked);
        d.set_totals_only(true);
        assert_eq!(d.chart_mode(), ChartMode::Totals);

        // Any filter forces stacked; the preference cannot change meanwhile.
        d.apply_bucket_filter(Some(AgingBucket::Current));
        assert_eq!(d.chart_mode(), ChartMode::Stacked);
        d.set_totals_only(false);
        assert!(d.totals_only());

        d.clear_filters();
        assert_eq!(d.chart_mode(), ChartMode::Totals);
        d.set_totals_only(false);
        assert_eq!(d.chart_mode(), ChartMode::Stacked);
    }

    fn raw(customer: &str, kind: &str, balance: &str) -> RawRow {
        let mut m = RawRow::new();
        m.insert("Customer".into(), json!(customer));
        m.insert("Type".into(), json!(kind));
        m.insert("Open Balance".into(), json!(balance));
        m
    }

    #[test]
    fn test_from_rows_and_reingest() {
        let rows = vec![raw("Acme", "Invoice", "$500.00")];
        let mut d = Dashboard::from_rows(&rows, as_of()).unwrap();
        assert_eq!(d.payload().totals.total_ar, 500.0);

        d.apply_customer_filter(Some("Acme"));
        let rows2 = vec![raw("Beta", "Invoice", "300")];
        d.ingest(&rows2, as_of()).unwrap();
        // Re-ingestion resets the filter and replaces the original dataset.
        assert_eq!(*d.filter(), Filter::None);
        assert_eq!(d.payload().totals.total_ar, 300.0);
    }

    #[test]
    fn test_failed_ingest_leaves_state_untouched() {
        let mut d = Dashboard::from_rows(&[raw("Acme", "Invoice", "500")], as_of()).unwrap();
        d.apply_customer_filter(Some("Acme"));

        let only_payments = vec![raw("Acme", "Payment", "500")];
        assert!(matches!(
            d.ingest(&only_payments, as_of()),
            Err(IngestError::NoUsableData)
        ));
        assert_eq!(d.active_customer(), Some("Acme"));
        assert_eq!(d.payload().totals.total_ar, 500.0);
    }

    #[test]
    fn test_from_rows_no_usable_data() {
        assert!(matches!(
            Dashboard::from_rows(&[], as_of()),
            Err(IngestError::NoUsableData)
        ));
    }
}
