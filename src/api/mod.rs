mod client;
mod error;
mod parse;

use std::collections::BTreeMap;

pub use client::ApiClient;

/// Named similarity scores; non-numeric fields are dropped.
pub type MetricRecord = BTreeMap<String, f64>;
