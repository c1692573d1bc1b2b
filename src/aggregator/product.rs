//! Per-product statistics over the whole event log
//!
//! Every query rescans the full log. There is no incremental index: the log is
//! bounded by what one shop floor produces and the dashboard polls it
//! periodically, so a rescan keeps the result trivially consistent with the
//! file at the cost of O(lines) work per query.

use super::normalizer::{parse_line, TelemetryRecord};
use crate::store::{EventStore, StoreError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Number of most recent records kept per product
pub const RECENT_RECORDS_LIMIT: usize = 50;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductAggregate {
    pub product: String,
    /// Mean `total_time` over every record of the product, not only the
    /// retained window
    pub average_total_time: f64,
    /// Newest first
    pub recent_records: Vec<TelemetryRecord>,
}

pub struct Aggregator {
    store: Arc<EventStore>,
}

impl Aggregator {
    pub fn new(store: Arc<EventStore>) -> Self {
        Self { store }
    }

    pub fn aggregate(&self) -> Result<HashMap<String, ProductAggregate>, StoreError> {
        let lines = self.store.read_all()?;
        let aggregates = aggregate_lines(lines.iter().map(String::as_str));

        log::debug!(
            "Aggregated {} lines into {} products",
            lines.len(),
            aggregates.len()
        );
        Ok(aggregates)
    }
}

/// Group parsed lines by product. Unparseable lines are dropped.
pub fn aggregate_lines<'a, I>(lines: I) -> HashMap<String, ProductAggregate>
where
    I: IntoIterator<Item = &'a str>,
{
    // (file position, record) so equal timestamps can fall back to append order
    let mut by_product: HashMap<String, Vec<(usize, TelemetryRecord)>> = HashMap::new();

    for (position, line) in lines.into_iter().enumerate() {
        if let Some(record) = parse_line(line) {
            by_product
                .entry(record.product.clone())
                .or_default()
                .push((position, record));
        }
    }

    by_product
        .into_iter()
        .map(|(product, mut records)| {
            records.sort_by(|(pos_a, a), (pos_b, b)| {
                b.timestamp.cmp(&a.timestamp).then(pos_b.cmp(pos_a))
            });

            let sum: i128 = records.iter().map(|(_, r)| i128::from(r.total_time)).sum();
            let average_total_time = sum as f64 / records.len() as f64;

            let recent_records = records
                .into_iter()
                .take(RECENT_RECORDS_LIMIT)
                .map(|(_, r)| r)
                .collect();

            let aggregate = ProductAggregate {
                product: product.clone(),
                average_total_time,
                recent_records,
            };
            (product, aggregate)
        })
        .collect()
}
