use std::sync::Arc;
use tracing::trace;

use super::mailbox::{Mailbox, FRAME_HEADER, SLOT_CAPACITY, SLOT_SIZE};
use super::sem::Semaphore;
use crate::errors::{GrepError, GrepResult};

const TAG_DATA: u8 = 1;
const TAG_END: u8 = 2;

/// One direction of the mailbox handshake.
///
/// A channel turns the single-slot [`Mailbox`] into a reliable ordered
/// stream transport. Two semaphores gate the slot: `slot_free` (initially
/// 1) lets the writer in once the previous message has been consumed,
/// `data_ready` (initially 0) lets the reader in once a frame is staged.
/// End-of-stream is an explicit `End` frame, so a zero-message stream
/// costs one handshake round and can never deadlock the reader, and the
/// last message is always delivered before end-of-stream is observed.
///
/// Each frame carries a tag byte and a little-endian u16 payload length;
/// payloads larger than [`SLOT_CAPACITY`] are rejected, never truncated.
pub struct Channel {
    mailbox: Arc<Mailbox>,
    slot_free: Semaphore,
    data_ready: Semaphore,
}

impl Channel {
    /// Creates the semaphore pair for this direction. Used by the process
    /// that owns the run's shared resources.
    pub fn create(
        mailbox: Arc<Mailbox>,
        slot_free_name: &str,
        data_ready_name: &str,
    ) -> GrepResult<Self> {
        Ok(Self {
            mailbox,
            slot_free: Semaphore::create(slot_free_name, 1)?,
            data_ready: Semaphore::create(data_ready_name, 0)?,
        })
    }

    /// Opens the semaphore pair created by the peer.
    pub fn attach(
        mailbox: Arc<Mailbox>,
        slot_free_name: &str,
        data_ready_name: &str,
    ) -> GrepResult<Self> {
        Ok(Self {
            mailbox,
            slot_free: Semaphore::open(slot_free_name)?,
            data_ready: Semaphore::open(data_ready_name)?,
        })
    }

    /// Sends one message, blocking until the peer has consumed the
    /// previous one.
    pub fn send(&self, msg: &[u8]) -> GrepResult<()> {
        if msg.len() > SLOT_CAPACITY {
            return Err(GrepError::OversizedMessage {
                len: msg.len(),
                capacity: SLOT_CAPACITY,
            });
        }
        self.transmit(TAG_DATA, msg)
    }

    /// Marks the end of the stream. The reader's next `recv` returns
    /// `None` after this.
    pub fn finish(&self) -> GrepResult<()> {
        self.transmit(TAG_END, &[])
    }

    fn transmit(&self, tag: u8, payload: &[u8]) -> GrepResult<()> {
        self.slot_free.wait()?;
        let mut frame = [0u8; SLOT_SIZE];
        frame[0] = tag;
        frame[2..4].copy_from_slice(&(payload.len() as u16).to_le_bytes());
        frame[FRAME_HEADER..FRAME_HEADER + payload.len()].copy_from_slice(payload);
        self.mailbox.store(&frame[..FRAME_HEADER + payload.len()]);
        trace!("staged frame tag={} len={}", tag, payload.len());
        self.data_ready.post()
    }

    /// Receives the next message, or `None` once the peer has finished.
    pub fn recv(&self) -> GrepResult<Option<Vec<u8>>> {
        self.data_ready.wait()?;
        let mut frame = [0u8; SLOT_SIZE];
        self.mailbox.load(&mut frame);

        let tag = frame[0];
        let len = u16::from_le_bytes([frame[2], frame[3]]) as usize;
        trace!("drained frame tag={} len={}", tag, len);

        let msg = match tag {
            TAG_END => None,
            TAG_DATA if len <= SLOT_CAPACITY => {
                Some(frame[FRAME_HEADER..FRAME_HEADER + len].to_vec())
            }
            TAG_DATA => {
                self.slot_free.post()?;
                return Err(GrepError::MalformedFrame(format!(
                    "payload length {} exceeds capacity {}",
                    len, SLOT_CAPACITY
                )));
            }
            other => {
                self.slot_free.post()?;
                return Err(GrepError::MalformedFrame(format!("unknown tag {}", other)));
            }
        };

        self.slot_free.post()?;
        Ok(msg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::thread;

    static SEQ: AtomicU32 = AtomicU32::new(0);

    fn test_channel() -> Channel {
        let id = format!(
            "{}-{}",
            std::process::id(),
            SEQ.fetch_add(1, Ordering::Relaxed)
        );
        let mailbox = Arc::new(Mailbox::create(&format!("/shmgrep-test-ch-{}", id)).unwrap());
        Channel::create(
            mailbox,
            &format!("/shmgrep-test-ch-{}-free", id),
            &format!("/shmgrep-test-ch-{}-ready", id),
        )
        .unwrap()
    }

    #[test]
    fn test_roundtrip_preserves_order_and_content() {
        let channel = Arc::new(test_channel());
        let lines: Vec<String> = (0..50).map(|i| format!("line number {}", i)).collect();

        let writer = {
            let channel = Arc::clone(&channel);
            let lines = lines.clone();
            thread::spawn(move || {
                for line in &lines {
                    channel.send(line.as_bytes()).unwrap();
                }
                channel.finish().unwrap();
            })
        };

        let mut received = Vec::new();
        while let Some(bytes) = channel.recv().unwrap() {
            received.push(String::from_utf8(bytes).unwrap());
        }
        writer.join().unwrap();

        assert_eq!(received, lines);
    }

    #[test]
    fn test_zero_message_stream_does_not_block() {
        let channel = Arc::new(test_channel());

        let writer = {
            let channel = Arc::clone(&channel);
            thread::spawn(move || channel.finish())
        };

        assert_eq!(channel.recv().unwrap(), None);
        writer.join().unwrap().unwrap();
    }

    #[test]
    fn test_one_message_delivered_before_end() {
        let channel = Arc::new(test_channel());

        let writer = {
            let channel = Arc::clone(&channel);
            thread::spawn(move || {
                channel.send(b"only message").unwrap();
                channel.finish().unwrap();
            })
        };

        assert_eq!(channel.recv().unwrap().as_deref(), Some(&b"only message"[..]));
        assert_eq!(channel.recv().unwrap(), None);
        writer.join().unwrap();
    }

    #[test]
    fn test_oversized_message_rejected() {
        let channel = test_channel();
        let big = vec![b'a'; SLOT_CAPACITY + 1];

        let err = channel.send(&big).unwrap_err();
        assert!(matches!(
            err,
            GrepError::OversizedMessage {
                len,
                capacity: SLOT_CAPACITY
            } if len == SLOT_CAPACITY + 1
        ));

        // The slot permit was not consumed; a fitting message still goes
        // through the normal handshake afterwards.
        let full = vec![b'b'; SLOT_CAPACITY];
        let reader = {
            let channel = Arc::new(channel);
            let handle = {
                let channel = Arc::clone(&channel);
                let full = full.clone();
                thread::spawn(move || {
                    assert_eq!(channel.recv().unwrap(), Some(full));
                    assert_eq!(channel.recv().unwrap(), None);
                })
            };
            channel.send(&full).unwrap();
            channel.finish().unwrap();
            handle
        };
        reader.join().unwrap();
    }

    #[test]
    fn test_empty_payload_is_a_valid_message() {
        let channel = Arc::new(test_channel());

        let writer = {
            let channel = Arc::clone(&channel);
            thread::spawn(move || {
                channel.send(b"").unwrap();
                channel.finish().unwrap();
            })
        };

        assert_eq!(channel.recv().unwrap(), Some(Vec::new()));
        assert_eq!(channel.recv().unwrap(), None);
        writer.join().unwrap();
    }
}
