//! Host-side IPC transport
//!
//! Owns the display child process and the write end of its stdin pipe.
//! Every frame goes through one mutex so concurrent senders (the control
//! thread and the memory sampler) never interleave bytes of two frames.

use anyhow::{Context, Result};
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use wait_timeout::ChildExt;

use super::protocol::{write_message, Message, ProtocolError};
use crate::process::is_process_alive;

/// Environment handshake passed to the display child.
pub const ENV_GAME: &str = "LOADSCREEN_GAME";
pub const ENV_VARIANT: &str = "LOADSCREEN_VARIANT";
pub const ENV_CONFIG_DIR: &str = "LOADSCREEN_CONFIG_DIR";

/// How long to wait for the display child after CLOSE before killing it.
const CHILD_EXIT_TIMEOUT: Duration = Duration::from_secs(3);

/// Serializes whole frames onto a shared writer.
///
/// This is the atomicity guarantee of the transport: a frame's opcode,
/// count, and arguments are written under one lock acquisition.
pub struct FrameWriter<W: Write> {
    inner: Mutex<W>,
}

impl<W: Write> FrameWriter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            inner: Mutex::new(writer),
        }
    }

    /// Write one frame atomically with respect to other callers.
    pub fn write(&self, message: &Message) -> Result<(), ProtocolError> {
        let mut writer = self
            .inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        write_message(&mut *writer, message)
    }

    pub fn into_inner(self) -> W {
        self.inner
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Handshake parameters for spawning the display child.
#[derive(Debug, Clone)]
pub struct SpawnOptions {
    /// Human-readable game name and version for the window title.
    pub game_label: String,
    /// Whether the variant host ecosystem is active.
    pub variant: bool,
    /// Directory holding the shared display configuration.
    pub config_dir: PathBuf,
}

/// Pipe transport to a spawned display process.
pub struct PipeTransport {
    writer: FrameWriter<ChildStdin>,
    child: Mutex<Child>,
}

impl PipeTransport {
    /// Spawn the display child and connect its stdin to this transport.
    ///
    /// The child is the current executable re-run with the hidden
    /// `display` subcommand; stdout and stderr are inherited so both
    /// processes log to one place. Spawn failure is recoverable: the
    /// caller falls back to same-process display.
    pub fn spawn(options: &SpawnOptions) -> Result<Self> {
        let exe = std::env::current_exe().context("Failed to locate current executable")?;
        let mut child = Command::new(&exe)
            .arg("display")
            .env(ENV_GAME, &options.game_label)
            .env(ENV_VARIANT, if options.variant { "1" } else { "0" })
            .env(ENV_CONFIG_DIR, &options.config_dir)
            .stdin(Stdio::piped())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .spawn()
            .with_context(|| format!("Failed to spawn display process from {}", exe.display()))?;

        let stdin = child
            .stdin
            .take()
            .context("Display child has no stdin pipe")?;

        info!(pid = child.id(), "spawned display process");
        Ok(Self {
            writer: FrameWriter::new(stdin),
            child: Mutex::new(child),
        })
    }

    /// Send one frame, applying the session's write-failure policy.
    ///
    /// A broken or closed pipe means the display side is gone and no
    /// further coordination is possible: the host process terminates
    /// immediately. Any other I/O failure drops this frame only.
    pub fn send(&self, message: &Message) {
        match self.writer.write(message) {
            Ok(()) => {}
            Err(ProtocolError::Io(e)) if is_disconnect(&e) => {
                error!("display pipe closed, cannot continue: {e}");
                std::process::exit(1);
            }
            Err(e) => {
                warn!("dropping frame after write failure: {e}");
            }
        }
    }

    /// Whether the display child is still running.
    pub fn is_alive(&self) -> bool {
        let pid = self
            .child
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .id();
        is_process_alive(pid)
    }

    /// Send CLOSE, release the pipe, and reap the child.
    ///
    /// Errors here are logged and swallowed: the session is tearing down
    /// and a vanished child is the expected failure mode.
    pub fn shutdown(self) {
        if let Err(e) = self.writer.write(&Message::Close) {
            debug!("close frame not delivered: {e}");
        }
        // Dropping stdin ends the child's decode loop even if CLOSE was lost.
        drop(self.writer.into_inner());

        let mut child = self
            .child
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        match child.wait_timeout(CHILD_EXIT_TIMEOUT) {
            Ok(Some(status)) => debug!("display process exited: {status}"),
            Ok(None) => {
                warn!("display process did not exit in time, killing it");
                let _ = child.kill();
                let _ = child.wait();
            }
            Err(e) => warn!("failed to wait for display process: {e}"),
        }
    }
}

/// Classify an I/O error as the display side having gone away.
fn is_disconnect(error: &io::Error) -> bool {
    matches!(
        error.kind(),
        io::ErrorKind::BrokenPipe | io::ErrorKind::WriteZero | io::ErrorKind::ConnectionReset
    )
}
