use std::ffi::CString;
use std::io;
use std::ptr::NonNull;

use super::validate_ipc_name;
use crate::errors::{GrepError, GrepResult};

/// A named POSIX counting semaphore shared between processes.
///
/// The creating side owns the name and unlinks it on drop; the attaching
/// side only closes its handle. Waits retry on EINTR.
#[derive(Debug)]
pub struct Semaphore {
    raw: NonNull<libc::sem_t>,
    name: String,
    owned: bool,
}

// SAFETY: sem_t handles are process-shared kernel objects; the POSIX sem_*
// calls are thread-safe on the same handle.
unsafe impl Send for Semaphore {}
unsafe impl Sync for Semaphore {}

impl Semaphore {
    /// Creates a new named semaphore with the given initial count.
    /// Fails if the name already exists.
    pub fn create(name: &str, initial: u32) -> GrepResult<Self> {
        validate_ipc_name("sem_open", name)?;
        let cname = cname(name)?;

        // SAFETY: cname is a valid NUL-terminated POSIX name.
        let raw = unsafe {
            libc::sem_open(
                cname.as_ptr(),
                libc::O_CREAT | libc::O_EXCL,
                0o600 as libc::c_uint,
                initial as libc::c_uint,
            )
        };
        if raw == libc::SEM_FAILED || raw.is_null() {
            return Err(GrepError::resource(
                "sem_open",
                name,
                io::Error::last_os_error(),
            ));
        }

        // SAFETY: checked non-null above
        let raw = unsafe { NonNull::new_unchecked(raw) };
        Ok(Self {
            raw,
            name: name.to_string(),
            owned: true,
        })
    }

    /// Opens a semaphore created by the peer process. Never unlinks.
    pub fn open(name: &str) -> GrepResult<Self> {
        validate_ipc_name("sem_open", name)?;
        let cname = cname(name)?;

        // SAFETY: cname is a valid NUL-terminated POSIX name.
        let raw = unsafe { libc::sem_open(cname.as_ptr(), 0) };
        if raw == libc::SEM_FAILED || raw.is_null() {
            return Err(GrepError::resource(
                "sem_open",
                name,
                io::Error::last_os_error(),
            ));
        }

        // SAFETY: checked non-null above
        let raw = unsafe { NonNull::new_unchecked(raw) };
        Ok(Self {
            raw,
            name: name.to_string(),
            owned: false,
        })
    }

    /// Blocks until the count is positive, then decrements it.
    ///
    /// There is no timeout: a peer that never posts blocks this call
    /// forever. That is the documented failure mode of the protocol.
    pub fn wait(&self) -> GrepResult<()> {
        loop {
            // SAFETY: raw is a live semaphore handle.
            if unsafe { libc::sem_wait(self.raw.as_ptr()) } == 0 {
                return Ok(());
            }
            let err = io::Error::last_os_error();
            if err.raw_os_error() == Some(libc::EINTR) {
                continue;
            }
            return Err(GrepError::resource("sem_wait", &self.name, err));
        }
    }

    /// Attempts to decrement without blocking. Returns `false` if the
    /// count was already zero.
    pub fn try_wait(&self) -> GrepResult<bool> {
        loop {
            // SAFETY: raw is a live semaphore handle.
            if unsafe { libc::sem_trywait(self.raw.as_ptr()) } == 0 {
                return Ok(true);
            }
            let err = io::Error::last_os_error();
            match err.raw_os_error() {
                Some(libc::EAGAIN) => return Ok(false),
                Some(libc::EINTR) => continue,
                _ => return Err(GrepError::resource("sem_trywait", &self.name, err)),
            }
        }
    }

    /// Increments the count, waking one waiter if any.
    pub fn post(&self) -> GrepResult<()> {
        // SAFETY: raw is a live semaphore handle.
        if unsafe { libc::sem_post(self.raw.as_ptr()) } == 0 {
            Ok(())
        } else {
            Err(GrepError::resource(
                "sem_post",
                &self.name,
                io::Error::last_os_error(),
            ))
        }
    }

    /// The POSIX name of the semaphore.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for Semaphore {
    fn drop(&mut self) {
        // SAFETY: raw is a live handle owned by this struct.
        unsafe {
            libc::sem_close(self.raw.as_ptr());
        }
        if self.owned {
            if let Ok(cname) = CString::new(self.name.as_bytes()) {
                // SAFETY: cname is a valid NUL-terminated name.
                unsafe {
                    libc::sem_unlink(cname.as_ptr());
                }
            }
        }
    }
}

fn cname(name: &str) -> GrepResult<CString> {
    CString::new(name.as_bytes()).map_err(|_| {
        GrepError::resource(
            "sem_open",
            name,
            io::Error::new(io::ErrorKind::InvalidInput, "name contains NUL byte"),
        )
    })
}
