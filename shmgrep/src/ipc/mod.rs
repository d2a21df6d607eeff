//! Process-shared mailbox transport: one fixed slot plus named semaphores.
//!
//! The slot itself carries no synchronization. Exclusive, ordered use in
//! one direction comes from the handshake in [`channel`]: the writer
//! waits for the slot to be free, fills it, and signals data-ready; the
//! reader waits for data-ready, drains it, and signals the slot free
//! again. Two independent channel instances share the one slot because
//! the downstream and upstream streams never overlap in time.

pub mod channel;
pub mod mailbox;
pub mod sem;

pub use channel::Channel;
pub use mailbox::{Mailbox, SLOT_CAPACITY, SLOT_SIZE};
pub use sem::Semaphore;

use crate::errors::{GrepError, GrepResult};

const POSIX_NAME_MAX: usize = 255;

/// Validates a POSIX shared object name: leading '/', no other slashes,
/// at most NAME_MAX bytes.
pub(crate) fn validate_ipc_name(op: &'static str, name: &str) -> GrepResult<()> {
    let invalid = |reason: &str| {
        GrepError::resource(
            op,
            name,
            std::io::Error::new(std::io::ErrorKind::InvalidInput, reason.to_string()),
        )
    };

    if !name.starts_with('/') {
        return Err(invalid("name must start with '/'"));
    }
    if name[1..].contains('/') {
        return Err(invalid("name must not contain additional '/' characters"));
    }
    if name.len() > POSIX_NAME_MAX {
        return Err(invalid("name length must be <= 255 bytes"));
    }
    Ok(())
}
