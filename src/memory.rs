//! Periodic memory usage sampling
//!
//! A background thread samples process memory on a fixed interval and
//! forwards each sample to an emit callback (a MEMORY frame in piped
//! mode, a direct sink call otherwise). The sampler runs only in the
//! host process; the display process never owns the numbers it shows.
//!
//! Cancellation uses a condvar wait rather than a plain sleep, so a stop
//! is observed mid-interval and no further sample is emitted after it.

use anyhow::{Context, Result};
use std::fs;
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::debug;

/// Sampling interval while a session is open.
pub const SAMPLE_INTERVAL: Duration = Duration::from_millis(100);

/// One ephemeral memory usage reading. Host-reported values are trusted
/// as-is; `used_bytes <= total_bytes` is expected but not enforced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemorySample {
    pub used_bytes: u64,
    pub total_bytes: u64,
}

/// Read the current process resident set and the machine total from
/// procfs. Used as the default source on Linux.
pub fn proc_memory_sample() -> Result<MemorySample> {
    let status =
        fs::read_to_string("/proc/self/status").context("Failed to read /proc/self/status")?;
    let used_kib = parse_kib_line(&status, "VmRSS:").context("VmRSS not in /proc/self/status")?;

    let meminfo = fs::read_to_string("/proc/meminfo").context("Failed to read /proc/meminfo")?;
    let total_kib = parse_kib_line(&meminfo, "MemTotal:").context("MemTotal not in /proc/meminfo")?;

    Ok(MemorySample {
        used_bytes: used_kib * 1024,
        total_bytes: total_kib * 1024,
    })
}

/// Extract the numeric value of a `Key:  1234 kB` procfs line.
fn parse_kib_line(body: &str, key: &str) -> Option<u64> {
    body.lines()
        .find_map(|line| line.strip_prefix(key))
        .and_then(|rest| rest.split_whitespace().next())
        .and_then(|field| field.parse().ok())
}

/// Cancellable periodic sampler thread.
pub struct MemorySampler {
    cancel: Arc<(Mutex<bool>, Condvar)>,
    handle: Option<JoinHandle<()>>,
}

impl MemorySampler {
    /// Start sampling: one sample immediately, then one per `interval`
    /// until [`stop`](Self::stop) is called.
    ///
    /// Source failures are logged and that tick is skipped.
    pub fn spawn<S, F>(interval: Duration, mut source: S, mut emit: F) -> Self
    where
        S: FnMut() -> Result<MemorySample> + Send + 'static,
        F: FnMut(MemorySample) + Send + 'static,
    {
        let cancel = Arc::new((Mutex::new(false), Condvar::new()));
        let thread_cancel = Arc::clone(&cancel);

        let handle = thread::spawn(move || {
            let (flag, condvar) = &*thread_cancel;
            loop {
                match source() {
                    Ok(sample) => emit(sample),
                    Err(e) => debug!("memory sample unavailable: {e}"),
                }

                let guard = flag.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
                let (guard, _) = condvar
                    .wait_timeout_while(guard, interval, |cancelled| !*cancelled)
                    .unwrap_or_else(|poisoned| poisoned.into_inner());
                if *guard {
                    break;
                }
            }
        });

        Self {
            cancel,
            handle: Some(handle),
        }
    }

    /// Stop the sampler and join its thread. Idempotent.
    pub fn stop(&mut self) {
        let (flag, condvar) = &*self.cancel;
        {
            let mut cancelled = flag.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            *cancelled = true;
        }
        condvar.notify_all();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for MemorySampler {
    fn drop(&mut self) {
        self.stop();
    }
}
