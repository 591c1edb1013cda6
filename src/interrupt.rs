//! Cooperative cancellation.
//!
//! A single process-wide flag is set by the SIGINT handler and polled by the
//! solver at safe points. The handler does one relaxed store and nothing else.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};

static SIGINT: AtomicBool = AtomicBool::new(false);

/// Borrowed view of a cancellation flag.
#[derive(Debug, Copy, Clone)]
pub struct Interrupt<'a> {
    flag: &'a AtomicBool,
}

impl<'a> Interrupt<'a> {
    pub fn new(flag: &'a AtomicBool) -> Self {
        Self { flag }
    }

    pub fn is_set(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }

    pub fn set(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }
}

impl Interrupt<'static> {
    /// The flag set by [`install_sigint_handler`].
    pub fn process() -> Self {
        Self { flag: &SIGINT }
    }
}

extern "C" fn on_sigint(_signum: libc::c_int) {
    SIGINT.store(true, Ordering::Relaxed);
}

/// Routes SIGINT to the process-wide flag.
pub fn install_sigint_handler() -> io::Result<()> {
    let handler = on_sigint as extern "C" fn(libc::c_int);
    // SAFETY: the handler only performs an atomic store, which is async-signal-safe.
    let previous = unsafe { libc::signal(libc::SIGINT, handler as libc::sighandler_t) };
    if previous == libc::SIG_ERR {
        return Err(io::Error::last_os_error());
    }
    log::debug!("SIGINT handler installed");
    Ok(())
}
