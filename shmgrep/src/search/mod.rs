//! Parallel line matching: a received line set is split into contiguous
//! shards, each shard is scanned by its own task, and per-shard results
//! are merged back in shard order so the output is deterministic.

pub mod engine;
pub mod matcher;
pub mod shard;

pub use engine::search_lines;
pub use matcher::WordMatcher;
pub use shard::shard_ranges;
