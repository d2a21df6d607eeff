use std::sync::Mutex;

/// Ordered collection of matching lines assembled from per-shard results.
///
/// Shard tasks scan their ranges privately and publish one sub-result
/// each under a single shared lock; the lock is held only for the push.
/// The final ordering follows shard index, not publish order, so the
/// merged output is deterministic regardless of task scheduling.
#[derive(Debug, Default)]
pub struct ResultCollection {
    shards: Mutex<Vec<(usize, Vec<String>)>>,
}

impl ResultCollection {
    /// Creates a new empty collection
    pub fn new() -> Self {
        Default::default()
    }

    /// Publishes one shard's ordered matches.
    pub fn publish(&self, shard: usize, matches: Vec<String>) {
        self.shards
            .lock()
            .expect("result collection lock poisoned")
            .push((shard, matches));
    }

    /// Total number of matches published so far.
    pub fn len(&self) -> usize {
        self.shards
            .lock()
            .expect("result collection lock poisoned")
            .iter()
            .map(|(_, matches)| matches.len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Consumes the collection, merging sub-results in shard index order.
    pub fn into_ordered(self) -> Vec<String> {
        let mut shards = self
            .shards
            .into_inner()
            .expect("result collection lock poisoned");
        shards.sort_by_key(|(shard, _)| *shard);
        shards.into_iter().flat_map(|(_, matches)| matches).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_merge_follows_shard_index_not_publish_order() {
        let collection = ResultCollection::new();
        collection.publish(2, vec!["e".into()]);
        collection.publish(0, vec!["a".into(), "b".into()]);
        collection.publish(3, vec!["f".into()]);
        collection.publish(1, vec!["c".into(), "d".into()]);

        assert_eq!(collection.into_ordered(), vec!["a", "b", "c", "d", "e", "f"]);
    }

    #[test]
    fn test_empty_shards_merge_cleanly() {
        let collection = ResultCollection::new();
        collection.publish(0, vec![]);
        collection.publish(1, vec!["only".into()]);
        collection.publish(2, vec![]);

        assert_eq!(collection.len(), 1);
        assert_eq!(collection.into_ordered(), vec!["only"]);
    }

    #[test]
    fn test_concurrent_publish_loses_nothing() {
        let collection = Arc::new(ResultCollection::new());
        let per_shard = 250;

        let handles: Vec<_> = (0..4)
            .map(|shard| {
                let collection = Arc::clone(&collection);
                thread::spawn(move || {
                    let matches: Vec<String> = (0..per_shard)
                        .map(|i| format!("shard {} line {}", shard, i))
                        .collect();
                    collection.publish(shard, matches);
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(collection.len(), 4 * per_shard);

        let collection = Arc::into_inner(collection).unwrap();
        let merged = collection.into_ordered();
        assert_eq!(merged.len(), 4 * per_shard);
        // No duplicates and shard-major ordering
        assert_eq!(merged[0], "shard 0 line 0");
        assert_eq!(merged[per_shard], "shard 1 line 0");
        assert_eq!(merged.last().unwrap(), &format!("shard 3 line {}", per_shard - 1));
    }
}
