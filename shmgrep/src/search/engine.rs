use rayon::prelude::*;
use std::num::NonZeroUsize;
use std::panic::{catch_unwind, AssertUnwindSafe};
use tracing::{debug, info};

use super::matcher::WordMatcher;
use super::shard::shard_ranges;
use crate::errors::{GrepError, GrepResult};
use crate::results::ResultCollection;

/// Searches `lines` for whole-word, case-insensitive occurrences of
/// `word`, fanning the scan out across `shard_count` contiguous shards.
///
/// Matching lines come back in original line order: each shard scans its
/// range in order and the per-shard results are merged by shard index
/// after every task has finished.
pub fn search_lines(
    lines: &[String],
    word: &str,
    shard_count: NonZeroUsize,
) -> GrepResult<Vec<String>> {
    info!(
        "searching {} lines for {:?} across {} shards",
        lines.len(),
        word,
        shard_count
    );

    let matcher = WordMatcher::new(word)?;
    let ranges = shard_ranges(lines.len(), shard_count.get());
    let collection = ResultCollection::new();

    ranges
        .par_iter()
        .enumerate()
        .try_for_each(|(shard, range)| -> GrepResult<()> {
            let outcome = catch_unwind(AssertUnwindSafe(|| {
                let mut local = Vec::new();
                for line in &lines[range.clone()] {
                    if matcher.is_match(line) {
                        local.push(line.clone());
                    }
                }
                local
            }));
            match outcome {
                Ok(local) => {
                    debug!("shard {} matched {} of {} lines", shard, local.len(), range.len());
                    collection.publish(shard, local);
                    Ok(())
                }
                Err(_) => Err(GrepError::task_failure(format!(
                    "matcher shard {} panicked",
                    shard
                ))),
            }
        })?;

    let matches = collection.into_ordered();
    info!("search complete: {} matching lines", matches.len());
    Ok(matches)
}
