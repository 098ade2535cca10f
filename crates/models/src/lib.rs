use chrono::NaiveDate;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Fixed aging buckets, oldest last. The order is load-bearing: charts map
/// colors by position and tables list buckets in this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgingBucket {
    #[serde(rename = "Current")]
    Current,
    #[serde(rename = "1-30")]
    Days1To30,
    #[serde(rename = "31-60")]
    Days31To60,
    #[serde(rename = "61-90")]
    Days61To90,
    #[serde(rename = "91-120")]
    Days91To120,
    #[serde(rename = "120+")]
    Over120,
}

impl AgingBucket {
    pub const ALL: [AgingBucket; 6] = [
        AgingBucket::Current,
        AgingBucket::Days1To30,
        AgingBucket::Days31To60,
        AgingBucket::Days61To90,
        AgingBucket::Days91To120,
        AgingBucket::Over120,
    ];

    /// Classify by days past due. Thresholds: <=0, <=30, <=60, <=90, <=120, else 120+.
    pub fn from_days(days: i64) -> Self {
        if days <= 0 {
            AgingBucket::Current
        } else if days <= 30 {
            AgingBucket::Days1To30
        } else if days <= 60 {
            AgingBucket::Days31To60
        } else if days <= 90 {
            AgingBucket::Days61To90
        } else if days <= 120 {
            AgingBucket::Days91To120
        } else {
            AgingBucket::Over120
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AgingBucket::Current => "Current",
            AgingBucket::Days1To30 => "1-30",
            AgingBucket::Days31To60 => "31-60",
            AgingBucket::Days61To90 => "61-90",
            AgingBucket::Days91To120 => "91-120",
            AgingBucket::Over120 => "120+",
        }
    }

    pub fn from_label(s: &str) -> Option<Self> {
        AgingBucket::ALL.iter().copied().find(|b| b.label() == s)
    }

    /// Position in the fixed order.
    pub fn index(&self) -> usize {
        AgingBucket::ALL.iter().position(|b| b == self).unwrap_or(0)
    }

    pub fn is_overdue(&self) -> bool {
        !matches!(self, AgingBucket::Current)
    }

    pub fn labels() -> Vec<String> {
        AgingBucket::ALL.iter().map(|b| b.label().to_string()).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxnKind {
    #[serde(rename = "Invoice")]
    Invoice,
    #[serde(rename = "Credit Memo")]
    CreditMemo,
}

/// Canonical AR transaction produced by the normalizer. The optional fields
/// are raw passthrough text kept for detail display only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub customer: String,
    pub kind: TxnKind,
    pub open_balance: f64,
    pub days_past_due: i64,
    pub bucket: AgingBucket,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub txn_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doc_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memo: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Totals {
    pub total_ar: f64,
    pub current_total: f64,
    pub overdue_total: f64,
    pub over_90: f64,
    pub customers_overdue: usize,
    pub invoices_overdue: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgingSlice {
    pub bucket: String,
    pub amount: f64,
}

/// Item-by-bucket matrix behind the stacked balances chart. Items are
/// customers in the default view and invoice labels under a customer filter.
/// The matrix is insertion-ordered so serialized output keeps the fixed
/// bucket order the legend/color mapping relies on.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CustomerBuckets {
    pub items: Vec<String>,
    pub buckets: Vec<String>,
    /// bucket label -> amounts aligned with `items`, in bucket order.
    pub matrix: IndexMap<String, Vec<f64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskEntry {
    pub label: String,
    pub overdue_amount: f64,
    pub max_days_past_due: i64,
    pub transaction_count: usize,
}

/// Complete derived view handed to the rendering layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewPayload {
    pub as_of: NaiveDate,
    pub totals: Totals,
    pub aging_summary: Vec<AgingSlice>,
    pub cust_bucket: CustomerBuckets,
    pub risk_top: Vec<RiskEntry>,
    pub detail: Vec<Transaction>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bucket_thresholds() {
        assert_eq!(AgingBucket::from_days(-5), AgingBucket::Current);
        assert_eq!(AgingBucket::from_days(0), AgingBucket::Current);
        assert_eq!(AgingBucket::from_days(1), AgingBucket::Days1To30);
        assert_eq!(AgingBucket::from_days(30), AgingBucket::Days1To30);
        assert_eq!(AgingBucket::from_days(31), AgingBucket::Days31To60);
        assert_eq!(AgingBucket::from_days(60), AgingBucket::Days31To60);
        assert_eq!(AgingBucket::from_days(61), AgingBucket::Days61To90);
        assert_eq!(AgingBucket::from_days(90), AgingBucket::Days61To90);
        assert_eq!(AgingBucket::from_days(91), AgingBucket::Days91To120);
        assert_eq!(AgingBucket::from_days(120), AgingBucket::Days91To120);
        assert_eq!(AgingBucket::from_days(121), AgingBucket::Over120);
        assert_eq!(AgingBucket::from_days(10_000), AgingBucket::Over120);
    }

    #[test]
    fn test_bucket_label_round_trip() {
        for b in AgingBucket::ALL {
            assert_eq!(AgingBucket::from_label(b.label()), Some(b));
        }
        assert_eq!(AgingBucket::from_label("1–30"), None); // en dash is not a label
        assert_eq!(AgingBucket::from_label("current"), None);
    }

    #[test]
    fn test_bucket_order_fixed() {
        let labels = AgingBucket::labels();
        assert_eq!(labels, vec!["Current", "1-30", "31-60", "61-90", "91-120", "120+"]);
        for (i, b) in AgingBucket::ALL.iter().enumerate() {
            assert_eq!(b.index(), i);
        }
    }

    #[test]
    fn test_overdue_flag() {
        assert!(!AgingBucket::Current.is_overdue());
        for b in &AgingBucket::ALL[1..] {
            assert!(b.is_overdue());
        }
    }
}
