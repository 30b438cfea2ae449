//! Process utilities
//!
//! Liveness checks for the display child process.

use nix::errno::Errno;
use nix::sys::signal::kill;
use nix::unistd::Pid;

/// Check whether a process with the given PID is alive.
///
/// Sends the null signal (signal 0), which probes existence without
/// delivering anything. `EPERM` still means the process exists.
pub fn is_process_alive(pid: u32) -> bool {
    let pid_i32 = match i32::try_from(pid) {
        Ok(v) => v,
        Err(_) => return false,
    };

    match kill(Pid::from_raw(pid_i32), None) {
        Ok(()) => true,
        Err(Errno::EPERM) => true,
        Err(_) => false,
    }
}
