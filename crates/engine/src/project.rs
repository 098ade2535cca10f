use indexmap::IndexMap;

use models::{AgingBucket, CustomerBuckets, RiskEntry, Transaction, TxnKind};

/// Alternate projection used when a single customer is in scope: the chart
/// items become individual transactions instead of customers, so the same
/// rendering surfaces show "top invoices" without changing their contract.
///
/// Two independent selections: the 20 largest transactions by open balance
/// feed the bucket matrix; the 15 largest among overdue-bucket transactions
/// feed the risk list, one entry per transaction.
pub fn project_invoices(txns: &[Transaction]) -> (CustomerBuckets, Vec<RiskEntry>) {
    struct Item {
        label: String,
        amount: f64,
        bucket: AgingBucket,
        days: i64,
    }

    let items: Vec<Item> = txns
        .iter()
        .enumerate()
        .map(|(idx, t)| {
            let base = t
                .doc_number
                .clone()
                .or_else(|| t.txn_date.clone())
                .unwrap_or_else(|| format!("Txn {}", idx + 1));
            let label = if t.kind == TxnKind::CreditMemo {
                format!("CM {base}")
            } else {
                base
            };
            Item {
                label,
                amount: t.open_balance,
                bucket: t.bucket,
                days: t.days_past_due,
            }
        })
        .collect();

    let mut by_amount: Vec<&Item> = items.iter().collect();
    by_amount.sort_by(|a, b| b.amount.total_cmp(&a.amount));
    by_amount.truncate(20);

    let labels: Vec<String> = by_amount.iter().map(|i| i.label.clone()).collect();
    let mut matrix = IndexMap::new();
    for b in AgingBucket::ALL {
        let row: Vec<f64> = by_amount
            .iter()
            .map(|i| if i.bucket == b { i.amount } else { 0.0 })
            .collect();
        matrix.insert(b.label().to_string(), row);
    }
    let cust_bucket = CustomerBuckets {
        items: labels,
        buckets: AgingBucket::labels(),
        matrix,
    };

    let mut overdue: Vec<&Item> = items.iter().filter(|i| i.bucket.is_overdue()).collect();
    overdue.sort_by(|a, b| b.amount.total_cmp(&a.amount));
    overdue.truncate(15);
    let risk_top: Vec<RiskEntry> = overdue
        .into_iter()
        .map(|i| RiskEntry {
            label: i.label.clone(),
            overdue_amount: i.amount.max(0.0),
            max_days_past_due: i.days,
            transaction_count: 1,
        })
        .collect();

    (cust_bucket, risk_top)
}
