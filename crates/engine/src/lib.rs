//! Aggregation and filtering engine for the AR aging dashboard.
//!
//! Raw export rows flow through the normalizer into canonical transactions;
//! this crate reduces them into the serializable view payload and owns the
//! mutually-exclusive customer/bucket filter state. All derived payloads are
//! full recomputations from the immutable original dataset.

mod aggregate;
mod project;
mod state;

pub use aggregate::aggregate;
pub use project::project_invoices;
pub use state::{ChartMode, Dashboard, Filter, IngestError};
