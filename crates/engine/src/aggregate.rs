use chrono::NaiveDate;
use indexmap::IndexMap;
use std::collections::HashMap;

use models::{AgingBucket, AgingSlice, CustomerBuckets, RiskEntry, Totals, Transaction, ViewPayload};

/// Reduce a transaction collection (any subset of the original dataset) into
/// the complete view payload. Pure function of its input; empty input yields
/// an all-zero payload.
pub fn aggregate(txns: &[Transaction], as_of: NaiveDate) -> ViewPayload {
    // Bucket totals seeded with all six buckets so zero-activity buckets still
    // appear in the summary and keep chart colors stable.
    let mut bucket_amounts = [0.0f64; 6];
    for t in txns {
        bucket_amounts[t.bucket.index()] += t.open_balance;
    }
    let aging_summary: Vec<AgingSlice> = AgingBucket::ALL
        .iter()
        .map(|b| AgingSlice {
            bucket: b.label().to_string(),
            amount: bucket_amounts[b.index()],
        })
        .collect();

    let total_ar: f64 = txns.iter().map(|t| t.open_balance).sum();
    let current_total = bucket_amounts[AgingBucket::Current.index()];
    let over_90 = bucket_amounts[AgingBucket::Days91To120.index()]
        + bucket_amounts[AgingBucket::Over120.index()];

    let cust_bucket = customer_buckets(txns);
    let (risk_top, invoices_overdue) = risk_ranking(txns);

    let totals = Totals {
        total_ar,
        current_total,
        overdue_total: total_ar - current_total,
        over_90,
        customers_overdue: risk_top.len(),
        invoices_overdue,
    };

    ViewPayload {
        as_of,
        totals,
        aging_summary,
        cust_bucket,
        risk_top,
        detail: txns.to_vec(),
    }
}

/// Per-customer bucket matrix for the top 20 customers by grand total,
/// descending. The sort is stable, so equal totals keep encounter order.
fn customer_buckets(txns: &[Transaction]) -> CustomerBuckets {
    let mut order: Vec<String> = Vec::new();
    let mut by_customer: HashMap<String, [f64; 6]> = HashMap::new();
    for t in txns {
        let amounts = by_customer.entry(t.customer.clone()).or_insert_with(|| {
            order.push(t.customer.clone());
            [0.0; 6]
        });
        amounts[t.bucket.index()] += t.open_balance;
    }

    let mut ranked: Vec<(String, [f64; 6], f64)> = order
        .into_iter()
        .map(|c| {
            let amounts = by_customer[&c];
            let total: f64 = amounts.iter().sum();
            (c, amounts, total)
        })
        .collect();
    ranked.sort_by(|a, b| b.2.total_cmp(&a.2));
    ranked.truncate(20);

    let items: Vec<String> = ranked.iter().map(|(c, _, _)| c.clone()).collect();
    // Insertion order follows the fixed bucket order and survives serialization.
    let mut matrix = IndexMap::new();
    for b in AgingBucket::ALL {
        let row: Vec<f64> = ranked.iter().map(|(_, amounts, _)| amounts[b.index()]).collect();
        matrix.insert(b.label().to_string(), row);
    }

    CustomerBuckets {
        items,
        buckets: AgingBucket::labels(),
        matrix,
    }
}

/// Overdue risk ranking: non-Current transactions grouped by customer, summed
/// open balance (credit memos may pull a customer negative), floored at zero
/// for display, top 15 by amount descending. Also returns the overdue
/// transaction count for the totals block.
fn risk_ranking(txns: &[Transaction]) -> (Vec<RiskEntry>, usize) {
    struct Acc {
        amount: f64,
        max_days: i64,
        count: usize,
    }

    let mut order: Vec<String> = Vec::new();
    let mut by_customer: HashMap<String, Acc> = HashMap::new();
    let mut invoices_overdue = 0usize;
    for t in txns.iter().filter(|t| t.bucket.is_overdue()) {
        invoices_overdue += 1;
        let acc = by_customer.entry(t.customer.clone()).or_insert_with(|| {
            order.push(t.customer.clone());
            Acc { amount: 0.0, max_days: 0, count: 0 }
        });
        acc.amount += t.open_balance;
        acc.max_days = acc.max_days.max(t.days_past_due);
        acc.count += 1;
    }

    let mut risk: Vec<RiskEntry> = order
        .into_iter()
        .map(|c| {
            let acc = &by_customer[&c];
            RiskEntry {
                label: c,
                overdue_amount: acc.amount.max(0.0),
                max_days_past_due: acc.max_days,
                transaction_count: acc.count,
            }
        })
        .collect();
    risk.sort_by(|a, b| b.overdue_amount.total_cmp(&a.overdue_amount));
    risk.truncate(15);

    (risk, invoices_overdue)
}
