//! Read-side entry points used by the dashboard and the CLI binaries

use crate::aggregator::{Aggregator, ProductAggregate};
use crate::store::StoreError;
use std::collections::BTreeMap;

pub use crate::portal::ScrapeOutcome;

/// Per-product statistics keyed by product name, in name order
pub fn product_stats(
    aggregator: &Aggregator,
) -> Result<BTreeMap<String, ProductAggregate>, StoreError> {
    Ok(aggregator.aggregate()?.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::EventStore;
    use std::sync::Arc;

    #[test]
    fn test_product_stats_sorted_by_name() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = Arc::new(EventStore::in_dir(temp_dir.path()));
        store.append("2025-12-01 10:00:00 | TKC110;60;10;70;5").unwrap();
        store.append("2025-12-01 10:01:00 | AB200;30;0;30;1").unwrap();
        store.append("2025-12-01 10:02:00 | TKC110;80;20;100;5").unwrap();

        let stats = product_stats(&Aggregator::new(store)).unwrap();
        let names: Vec<&String> = stats.keys().collect();
        assert_eq!(names, vec!["AB200", "TKC110"]);
        assert_eq!(stats["TKC110"].average_total_time, 85.0);
        assert_eq!(stats["TKC110"].recent_records.len(), 2);
    }

    #[test]
    fn test_product_stats_empty_log() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = Arc::new(EventStore::in_dir(temp_dir.path()));

        let stats = product_stats(&Aggregator::new(store)).unwrap();
        assert!(stats.is_empty());
        assert_eq!(serde_json::to_string(&stats).unwrap(), "{}");
    }
}
