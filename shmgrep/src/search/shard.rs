use std::ops::Range;

/// Splits `0..len` into `shards` contiguous half-open ranges.
///
/// Every shard but the last gets `len / shards` entries; the last shard
/// absorbs the remainder through the end of the range. When there are
/// fewer entries than shards the leading shards come out empty, which is
/// a valid "no work" assignment, not an error.
pub fn shard_ranges(len: usize, shards: usize) -> Vec<Range<usize>> {
    assert!(shards > 0, "shard count must be positive");
    let base = len / shards;
    (0..shards)
        .map(|k| {
            let start = base * k;
            let end = if k == shards - 1 { len } else { base * (k + 1) };
            start..end
        })
        .collect()
}
