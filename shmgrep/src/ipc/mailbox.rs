use rustix::fs::{fstat, ftruncate, Mode};
use rustix::mm::{mmap, munmap, MapFlags, ProtFlags};
use rustix::shm;
use std::ptr::{null_mut, NonNull};
use tracing::debug;

use super::validate_ipc_name;
use crate::errors::{GrepError, GrepResult};

/// Maximum payload bytes one message may carry.
pub const SLOT_CAPACITY: usize = 256;

/// Frame header: tag byte, one pad byte, u16 little-endian payload length.
pub(crate) const FRAME_HEADER: usize = 4;

/// Total size of the shared slot in bytes.
pub const SLOT_SIZE: usize = FRAME_HEADER + SLOT_CAPACITY;

/// One fixed-capacity memory region shared between the two processes.
///
/// The mailbox holds raw bytes and nothing else: every `store` overwrites
/// the previous contents entirely, so at most one message is in flight at
/// a time. Callers must hold the appropriate channel permit before
/// touching the slot; the mailbox performs no synchronization of its own.
///
/// The creating process unlinks the object on drop; attachers only unmap.
#[derive(Debug)]
pub struct Mailbox {
    ptr: NonNull<u8>,
    name: String,
    owned: bool,
}

// SAFETY: the pointer refers to process-shared memory, not thread-local
// state; concurrent access is governed by the channel permits.
unsafe impl Send for Mailbox {}
unsafe impl Sync for Mailbox {}

impl Mailbox {
    /// Creates a new shared slot and maps it. Fails if the name exists.
    pub fn create(name: &str) -> GrepResult<Self> {
        validate_ipc_name("shm_open", name)?;

        let fd = shm::open(
            name,
            shm::OFlags::CREATE | shm::OFlags::EXCL | shm::OFlags::RDWR,
            Mode::RUSR | Mode::WUSR,
        )
        .map_err(|e| GrepError::resource("shm_open", name, e.into()))?;

        if let Err(e) = ftruncate(&fd, SLOT_SIZE as u64) {
            drop(fd);
            let _ = shm::unlink(name);
            return Err(GrepError::resource("ftruncate", name, e.into()));
        }

        // SAFETY: fresh mapping of SLOT_SIZE bytes over a valid fd; mmap
        // returns page-aligned memory not aliasing any existing object.
        let ptr = match unsafe {
            mmap(
                null_mut(),
                SLOT_SIZE,
                ProtFlags::READ | ProtFlags::WRITE,
                MapFlags::SHARED,
                &fd,
                0,
            )
        } {
            Ok(p) => p,
            Err(e) => {
                drop(fd);
                let _ = shm::unlink(name);
                return Err(GrepError::resource("mmap", name, e.into()));
            }
        };

        debug!("created shared mailbox {}", name);

        // SAFETY: mmap never returns null on success
        let ptr = unsafe { NonNull::new_unchecked(ptr as *mut u8) };
        Ok(Self {
            ptr,
            name: name.to_string(),
            owned: true,
        })
    }

    /// Attaches to a slot created by the peer process. Never unlinks.
    pub fn attach(name: &str) -> GrepResult<Self> {
        validate_ipc_name("shm_open", name)?;

        let fd = shm::open(name, shm::OFlags::RDWR, Mode::empty())
            .map_err(|e| GrepError::resource("shm_open", name, e.into()))?;

        let stat = match fstat(&fd) {
            Ok(stat) => stat,
            Err(e) => {
                drop(fd);
                return Err(GrepError::resource("fstat", name, e.into()));
            }
        };
        if stat.st_size != SLOT_SIZE as i64 {
            drop(fd);
            return Err(GrepError::resource(
                "attach",
                name,
                std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    format!("expected {} bytes, got {}", SLOT_SIZE, stat.st_size),
                ),
            ));
        }

        // SAFETY: object exists and has the expected size; fresh mapping
        // that aliases no local Rust object.
        let ptr = match unsafe {
            mmap(
                null_mut(),
                SLOT_SIZE,
                ProtFlags::READ | ProtFlags::WRITE,
                MapFlags::SHARED,
                &fd,
                0,
            )
        } {
            Ok(p) => p,
            Err(e) => {
                drop(fd);
                return Err(GrepError::resource("mmap", name, e.into()));
            }
        };

        debug!("attached to shared mailbox {}", name);

        // SAFETY: mmap never returns null on success
        let ptr = unsafe { NonNull::new_unchecked(ptr as *mut u8) };
        Ok(Self {
            ptr,
            name: name.to_string(),
            owned: false,
        })
    }

    /// Copies `bytes` into the slot, zero-filling the remainder.
    ///
    /// The caller must hold the write permit for the active direction;
    /// without it a concurrent reader may observe a torn frame.
    pub fn store(&self, bytes: &[u8]) {
        debug_assert!(bytes.len() <= SLOT_SIZE);
        // SAFETY: ptr covers SLOT_SIZE bytes for the lifetime of self and
        // bytes.len() was checked against it.
        unsafe {
            std::ptr::write_bytes(self.ptr.as_ptr(), 0, SLOT_SIZE);
            std::ptr::copy_nonoverlapping(bytes.as_ptr(), self.ptr.as_ptr(), bytes.len());
        }
    }

    /// Copies the current slot contents into `buf`.
    ///
    /// The caller must hold the read permit for the active direction.
    pub fn load(&self, buf: &mut [u8; SLOT_SIZE]) {
        // SAFETY: both regions are SLOT_SIZE bytes and do not overlap.
        unsafe {
            std::ptr::copy_nonoverlapping(self.ptr.as_ptr(), buf.as_mut_ptr(), SLOT_SIZE);
        }
    }

    /// The POSIX name of the underlying shared memory object.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for Mailbox {
    fn drop(&mut self) {
        // SAFETY: ptr/SLOT_SIZE describe the mapping made at construction.
        unsafe {
            let _ = munmap(self.ptr.as_ptr() as *mut _, SLOT_SIZE);
        }
        if self.owned {
            let _ = shm::unlink(&self.name);
        }
    }
}
