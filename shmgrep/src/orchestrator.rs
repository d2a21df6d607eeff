use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, info, warn};

use crate::errors::{GrepError, GrepResult};
use crate::ipc::{Channel, Mailbox};
use crate::metrics::RunMetrics;
use crate::search::search_lines;

/// Names of the shared resources for one run.
///
/// All five objects are derived from a single session id so the worker
/// process can attach with nothing but that id.
#[derive(Debug, Clone)]
pub struct ChannelNames {
    pub mailbox: String,
    pub down_free: String,
    pub down_ready: String,
    pub up_free: String,
    pub up_ready: String,
}

impl ChannelNames {
    pub fn for_session(session: &str) -> Self {
        Self {
            mailbox: format!("/shmgrep-{}", session),
            down_free: format!("/shmgrep-{}-down-free", session),
            down_ready: format!("/shmgrep-{}-down-ready", session),
            up_free: format!("/shmgrep-{}-up-free", session),
            up_ready: format!("/shmgrep-{}-up-ready", session),
        }
    }
}

/// Generates a session id unique across concurrent runs on one host.
pub fn new_session_id() -> String {
    static SEQ: std::sync::atomic::AtomicU32 = std::sync::atomic::AtomicU32::new(0);
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0);
    let seq = SEQ.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
    format!("{}-{:08x}-{}", std::process::id(), nanos, seq)
}

/// The source role: owns the run's shared resources, streams input lines
/// downstream, and collects matches upstream.
///
/// Dropping the session unlinks the mailbox and semaphores. The caller is
/// responsible for dropping it only after the worker process has been
/// waited on, so the peer never loses a resource it still needs.
pub struct SourceSession {
    // Field order matters: channels close their semaphores before the
    // mailbox is unmapped and unlinked.
    down: Channel,
    up: Channel,
    mailbox: Arc<Mailbox>,
    metrics: RunMetrics,
}

impl SourceSession {
    /// Creates the mailbox and both directional channels. Must complete
    /// before the worker process is spawned so attach never races.
    pub fn create(names: &ChannelNames) -> GrepResult<Self> {
        let mailbox = Arc::new(Mailbox::create(&names.mailbox)?);
        let down = Channel::create(Arc::clone(&mailbox), &names.down_free, &names.down_ready)?;
        let up = Channel::create(Arc::clone(&mailbox), &names.up_free, &names.up_ready)?;
        info!("source session ready on {}", names.mailbox);
        Ok(Self {
            down,
            up,
            mailbox,
            metrics: RunMetrics::new(),
        })
    }

    /// Gets the traffic metrics for this session
    pub fn metrics(&self) -> &RunMetrics {
        &self.metrics
    }

    /// The POSIX name of the shared mailbox.
    pub fn mailbox_name(&self) -> &str {
        self.mailbox.name()
    }

    /// Streams every line downstream in order, then signals end-of-stream.
    ///
    /// Lines that do not fit the slot are skipped with a warning; this is
    /// the documented reject-and-skip policy for oversized messages.
    /// Returns the number of lines actually sent.
    pub fn send_lines(&self, lines: &[String]) -> GrepResult<usize> {
        let mut sent = 0;
        for line in lines {
            match self.down.send(line.as_bytes()) {
                Ok(()) => {
                    sent += 1;
                    self.metrics.record_line_sent();
                }
                Err(GrepError::OversizedMessage { len, capacity }) => {
                    warn!("skipping line of {} bytes (slot capacity {})", len, capacity);
                    self.metrics.record_oversized();
                }
                Err(e) => return Err(e),
            }
        }
        self.down.finish()?;
        debug!("sent {} of {} lines downstream", sent, lines.len());
        Ok(sent)
    }

    /// Collects matches upstream, invoking `sink` for each line as it
    /// arrives, and returns the full ordered collection.
    pub fn collect_matches(&self, mut sink: impl FnMut(&str)) -> GrepResult<Vec<String>> {
        let mut matches = Vec::new();
        while let Some(bytes) = self.up.recv()? {
            let line = String::from_utf8(bytes)
                .map_err(|e| GrepError::encoding_error("upstream message", e))?;
            self.metrics.record_match_received();
            sink(&line);
            matches.push(line);
        }
        info!("received {} matches upstream", matches.len());
        Ok(matches)
    }
}

/// The worker role: attaches to the source's resources, accumulates the
/// downstream stream, and answers with matches upstream.
pub struct WorkerSession {
    down: Channel,
    up: Channel,
    #[allow(dead_code)]
    mailbox: Arc<Mailbox>,
    metrics: RunMetrics,
}

impl WorkerSession {
    /// Attaches to a session created by the source process.
    pub fn attach(names: &ChannelNames) -> GrepResult<Self> {
        let mailbox = Arc::new(Mailbox::attach(&names.mailbox)?);
        let down = Channel::attach(Arc::clone(&mailbox), &names.down_free, &names.down_ready)?;
        let up = Channel::attach(Arc::clone(&mailbox), &names.up_free, &names.up_ready)?;
        info!("worker attached to {}", names.mailbox);
        Ok(Self {
            down,
            up,
            mailbox,
            metrics: RunMetrics::new(),
        })
    }

    /// Gets the traffic metrics for this session
    pub fn metrics(&self) -> &RunMetrics {
        &self.metrics
    }

    /// Accumulates the whole downstream stream into an ordered line set.
    pub fn receive_lines(&self) -> GrepResult<Vec<String>> {
        let mut lines = Vec::new();
        while let Some(bytes) = self.down.recv()? {
            let line = String::from_utf8(bytes)
                .map_err(|e| GrepError::encoding_error("downstream message", e))?;
            self.metrics.record_message_received();
            lines.push(line);
        }
        debug!("received {} lines downstream", lines.len());
        Ok(lines)
    }

    /// Streams the match collection upstream, then signals end-of-stream.
    pub fn send_matches(&self, matches: &[String]) -> GrepResult<()> {
        for line in matches {
            self.up.send(line.as_bytes())?;
        }
        self.up.finish()?;
        debug!("sent {} matches upstream", matches.len());
        Ok(())
    }
}

/// Complete worker role: attach, receive, search, reply.
pub fn run_worker(names: &ChannelNames, word: &str, shard_count: NonZeroUsize) -> GrepResult<()> {
    let session = WorkerSession::attach(names)?;
    let lines = session.receive_lines()?;
    let matches = search_lines(&lines, word, shard_count)?;
    session.send_matches(&matches)
}
