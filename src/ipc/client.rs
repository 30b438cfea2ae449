//! Display-side decode loop
//!
//! The display process reads frames from its stdin one at a time and
//! applies each to its own tracker and sink with the same semantics a
//! same-process caller gets, so both sides show identical state without
//! the display side re-deriving anything from the host.

use anyhow::{Context, Result};
use std::io::Read;
use tracing::{info, warn};

use super::protocol::{read_message, Message};
use crate::display::DisplaySink;
use crate::progress::ProgressTracker;

/// Run the blocking decode loop until CLOSE, end of stream, or a decode
/// failure.
///
/// CLOSE and a clean end of stream both return `Ok` so the display
/// process exits 0. A malformed frame or unknown opcode is fatal for the
/// display process; there is no resync.
pub fn run_display_client<R: Read>(stream: &mut R, sink: &mut dyn DisplaySink) -> Result<()> {
    let mut tracker = ProgressTracker::new();

    loop {
        let message = match read_message(stream).context("Failed to decode frame")? {
            Some(message) => message,
            None => {
                info!("frame stream ended, display exiting");
                break;
            }
        };
        match message {
            Message::Begin { name, label, max } => {
                if let Err(e) = tracker.begin(&name, &label, max) {
                    warn!("{e}");
                    continue;
                }
                sink.add_bar(&name, &label, max);
            }
            Message::Step {
                name,
                label,
                owner_id,
                owner_name,
            } => {
                let current = tracker.step(&name, &label, Some(&owner_name));
                info!(owner = %owner_id, "calling entrypoint container");
                sink.update_bar(&name, current, &label, Some(&owner_name));
            }
            Message::End { name } => {
                tracker.end(&name);
                sink.remove_bar(&name);
            }
            Message::Memory {
                used_bytes,
                total_bytes,
            } => {
                sink.show_memory(used_bytes, total_bytes);
            }
            Message::Close => {
                info!("close frame received, display exiting");
                break;
            }
        }
    }

    tracker.clear();
    sink.close_window();
    Ok(())
}
