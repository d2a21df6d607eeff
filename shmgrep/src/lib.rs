pub mod config;
pub mod errors;
pub mod input;
pub mod ipc;
pub mod metrics;
pub mod orchestrator;
pub mod results;
pub mod search;

pub use config::{EncodingMode, RunConfig};
pub use errors::{GrepError, GrepResult};
pub use ipc::{Channel, Mailbox, Semaphore, SLOT_CAPACITY};
pub use orchestrator::{ChannelNames, SourceSession, WorkerSession};
pub use results::ResultCollection;
pub use search::search_lines;
