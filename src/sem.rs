//! Named POSIX semaphores
//!
//! Thin wrapper over the `sem_*` family, used by the channel purely as a
//! hand-off signal between producer and consumer, not a counting pool.

use crate::error::{ChannelError, Result};
use std::ffi::CString;
use std::io;
use std::time::Duration;

/// Handle to a named POSIX semaphore
///
/// The creating side owns the semaphore and unlinks it on drop; an opening
/// side only closes its local handle.
pub struct NamedSemaphore {
    sem: *mut libc::sem_t,
    name: String,
    is_owner: bool,
}

// SAFETY: sem_wait/sem_post/sem_getvalue are thread-safe by POSIX
unsafe impl Send for NamedSemaphore {}
unsafe impl Sync for NamedSemaphore {}

impl NamedSemaphore {
    /// Create a semaphore with the given initial value
    ///
    /// Creation is exclusive. If the name already exists (left over from a
    /// process that exited without cleaning up), the stale semaphore is
    /// unlinked and recreated, so the caller always starts from `initial`
    /// rather than whatever count the previous owner left behind.
    pub fn create(name: &str, initial: u32) -> Result<Self> {
        let c_name = c_name(name);

        let mut sem = unsafe { sem_open_excl(&c_name, initial) };
        if sem == libc::SEM_FAILED {
            let err = io::Error::last_os_error();
            if err.raw_os_error() != Some(libc::EEXIST) {
                return Err(ChannelError::SemCreate {
                    name: name.to_string(),
                    source: err,
                });
            }

            // Stale semaphore from a crashed owner: remove and recreate
            unsafe {
                libc::sem_unlink(c_name.as_ptr());
                sem = sem_open_excl(&c_name, initial);
            }
            if sem == libc::SEM_FAILED {
                return Err(ChannelError::SemCreate {
                    name: name.to_string(),
                    source: io::Error::last_os_error(),
                });
            }
        }

        Ok(Self {
            sem,
            name: name.to_string(),
            is_owner: true,
        })
    }

    /// Open an existing semaphore
    pub fn open(name: &str) -> Result<Self> {
        let c_name = c_name(name);

        let sem = unsafe { libc::sem_open(c_name.as_ptr(), 0) };
        if sem == libc::SEM_FAILED {
            return Err(ChannelError::SemOpen {
                name: name.to_string(),
                source: io::Error::last_os_error(),
            });
        }

        Ok(Self {
            sem,
            name: name.to_string(),
            is_owner: false,
        })
    }

    /// Acquire, blocking until the counter is positive
    pub fn wait(&self) -> Result<()> {
        loop {
            if unsafe { libc::sem_wait(self.sem) } == 0 {
                return Ok(());
            }
            let err = io::Error::last_os_error();
            if err.raw_os_error() != Some(libc::EINTR) {
                return Err(ChannelError::SemWait(err));
            }
        }
    }

    /// Acquire with a deadline, failing with `AcquireTimeout` on expiry
    pub fn wait_timeout(&self, timeout: Duration) -> Result<()> {
        let deadline = deadline_from_now(timeout)?;

        loop {
            if unsafe { libc::sem_timedwait(self.sem, &deadline) } == 0 {
                return Ok(());
            }
            let err = io::Error::last_os_error();
            match err.raw_os_error() {
                Some(libc::EINTR) => continue,
                Some(libc::ETIMEDOUT) => return Err(ChannelError::AcquireTimeout),
                _ => return Err(ChannelError::SemWait(err)),
            }
        }
    }

    /// Release, waking one blocked waiter
    pub fn post(&self) -> Result<()> {
        if unsafe { libc::sem_post(self.sem) } != 0 {
            return Err(ChannelError::SemPost(io::Error::last_os_error()));
        }
        Ok(())
    }

    /// Current counter value
    pub fn value(&self) -> Result<i32> {
        let mut value = 0;
        if unsafe { libc::sem_getvalue(self.sem, &mut value) } != 0 {
            return Err(ChannelError::SemWait(io::Error::last_os_error()));
        }
        Ok(value)
    }

    /// Name of the semaphore
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for NamedSemaphore {
    fn drop(&mut self) {
        let c_name = c_name(&self.name);
        unsafe {
            libc::sem_close(self.sem);
            if self.is_owner {
                libc::sem_unlink(c_name.as_ptr());
            }
        }
    }
}

unsafe fn sem_open_excl(name: &CString, initial: u32) -> *mut libc::sem_t {
    libc::sem_open(
        name.as_ptr(),
        libc::O_CREAT | libc::O_EXCL,
        0o666 as libc::c_uint,
        initial as libc::c_uint,
    )
}

fn c_name(name: &str) -> CString {
    CString::new(name).expect("semaphore name contains NUL")
}

fn deadline_from_now(timeout: Duration) -> Result<libc::timespec> {
    let mut now = libc::timespec {
        tv_sec: 0,
        tv_nsec: 0,
    };
    if unsafe { libc::clock_gettime(libc::CLOCK_REALTIME, &mut now) } != 0 {
        return Err(ChannelError::SemWait(io::Error::last_os_error()));
    }

    const NANOS_PER_SEC: i64 = 1_000_000_000;
    let mut sec = now.tv_sec + timeout.as_secs() as libc::time_t;
    let mut nsec = now.tv_nsec as i64 + timeout.subsec_nanos() as i64;
    if nsec >= NANOS_PER_SEC {
        sec += 1;
        nsec -= NANOS_PER_SEC;
    }

    Ok(libc::timespec {
        tv_sec: sec,
        tv_nsec: nsec as _,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unique(name: &str) -> String {
        format!("/{}_{}", name, std::process::id())
    }

    #[test]
    fn test_create_post_wait() {
        let name = unique("framechan_sem_basic");
        let sem = NamedSemaphore::create(&name, 0).unwrap();

        assert_eq!(sem.value().unwrap(), 0);
        sem.post().unwrap();
        assert_eq!(sem.value().unwrap(), 1);
        sem.wait().unwrap();
        assert_eq!(sem.value().unwrap(), 0);
    }

    #[test]
    fn test_wait_timeout_expires() {
        let name = unique("framechan_sem_timeout");
        let sem = NamedSemaphore::create(&name, 0).unwrap();

        assert!(matches!(
            sem.wait_timeout(Duration::from_millis(50)),
            Err(ChannelError::AcquireTimeout)
        ));
    }

    #[test]
    fn test_stale_semaphore_recreated_with_initial_value() {
        let name = unique("framechan_sem_stale");

        // Simulate a crashed owner: the name stays registered, the handle
        // is never closed or unlinked.
        let stale = NamedSemaphore::create(&name, 0).unwrap();
        stale.post().unwrap();
        stale.post().unwrap();
        std::mem::forget(stale);

        let fresh = NamedSemaphore::create(&name, 1).unwrap();
        assert_eq!(fresh.value().unwrap(), 1);
    }

    #[test]
    fn test_open_requires_existing() {
        let name = unique("framechan_sem_missing");
        assert!(matches!(
            NamedSemaphore::open(&name),
            Err(ChannelError::SemOpen { .. })
        ));
    }
}
