//! Session lifecycle controller
//!
//! One `LoadingSession` is the context object for a whole loading run:
//! it owns the tracker, the display mode, and the memory sampler, and it
//! decides when the indicator closes. All host call sites report
//! progress through it; there is no global state.
//!
//! A session is CLOSED, then OPEN after [`LoadingSession::open`], then
//! CLOSED again once a final entrypoint group completes. A headless
//! environment keeps the session logically closed and degrades every
//! call to logging, which is supported behavior rather than an error.

use anyhow::Result;
use semver::{Version, VersionReq};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

use crate::config::{default_config_dir, DisplayConfig};
use crate::display::{ConsoleDisplay, DisplaySink};
use crate::host::{derive_game_label, EntrypointGroup, EntrypointOwner, EntrypointProvider};
use crate::ipc::{Message, PipeTransport, SpawnOptions};
use crate::memory::{proc_memory_sample, MemorySampler, SAMPLE_INTERVAL};
use crate::progress::ProgressTracker;

/// Companion module versions that run a second `<name>_init` phase after
/// the final entrypoint group, so closing must wait for it.
const COMPANION_DEFERRAL_REQ: &str = ">=5.0.0-beta.4";

/// Group names whose completion closes the indicator by default.
fn default_final_types() -> HashSet<String> {
    ["client", "server", "client_init", "server_init"]
        .into_iter()
        .map(str::to_string)
        .collect()
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Game name and version for the window title; derived from the
    /// host's builtin modules when not set.
    pub game_label: Option<String>,
    /// Group names whose completion ends the session.
    pub final_types: HashSet<String>,
    /// No display capability in this environment; degrade to logging.
    pub headless: bool,
    /// Render in-process instead of spawning the display process.
    pub disable_ipc: bool,
    /// The variant host ecosystem is active (affects label derivation
    /// and close deferral).
    pub variant: bool,
    /// Installed version of the variant's companion module, if any.
    pub companion_version: Option<Version>,
    /// Directory holding the shared display configuration.
    pub config_dir: PathBuf,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            game_label: None,
            final_types: default_final_types(),
            headless: false,
            disable_ipc: false,
            variant: false,
            companion_version: None,
            config_dir: default_config_dir(),
        }
    }
}

/// How progress events leave the session while it is open.
enum SessionMode {
    Closed,
    /// Same-process rendering through a shared sink.
    Local(Arc<Mutex<Box<dyn DisplaySink>>>),
    /// Frames through the pipe to the display process.
    Piped(Arc<PipeTransport>),
}

pub struct LoadingSession {
    config: SessionConfig,
    provider: Box<dyn EntrypointProvider>,
    tracker: ProgressTracker,
    mode: SessionMode,
    sampler: Option<MemorySampler>,
    game_label: String,
}

impl LoadingSession {
    pub fn new(config: SessionConfig, provider: Box<dyn EntrypointProvider>) -> Self {
        Self {
            config,
            provider,
            tracker: ProgressTracker::new(),
            mode: SessionMode::Closed,
            sampler: None,
            game_label: String::new(),
        }
    }

    /// Open the indicator: spawn the display process (or fall back to
    /// in-process rendering) and start the memory sampler.
    pub fn open(&mut self) -> Result<()> {
        self.open_impl(None)
    }

    /// Open with a caller-supplied sink, forcing same-process mode.
    pub fn open_with_sink(&mut self, sink: Box<dyn DisplaySink>) -> Result<()> {
        self.open_impl(Some(sink))
    }

    fn open_impl(&mut self, sink: Option<Box<dyn DisplaySink>>) -> Result<()> {
        if self.is_open() {
            warn!("loading session is already open");
            return Ok(());
        }

        self.game_label = self.config.game_label.clone().unwrap_or_else(|| {
            derive_game_label(&self.provider.host_modules(), self.config.variant)
        });

        if self.config.headless {
            info!("headless environment, progress will only be logged");
            return Ok(());
        }

        let display = DisplayConfig::load_or_init(&self.config.config_dir);
        info!(game = %self.game_label, "opening loading screen");

        self.mode = match sink {
            Some(sink) => self.open_local(sink),
            None if !self.config.disable_ipc => match PipeTransport::spawn(&SpawnOptions {
                game_label: self.game_label.clone(),
                variant: self.config.variant,
                config_dir: self.config.config_dir.clone(),
            }) {
                Ok(transport) => SessionMode::Piped(Arc::new(transport)),
                Err(e) => {
                    warn!("failed to set up display process, rendering in-process: {e:#}");
                    self.open_local(Box::new(ConsoleDisplay::new()))
                }
            },
            None => self.open_local(Box::new(ConsoleDisplay::new())),
        };

        if display.enable_memory_display {
            self.start_sampler();
        }
        Ok(())
    }

    fn open_local(&self, mut sink: Box<dyn DisplaySink>) -> SessionMode {
        sink.open_window(&format!("Loading {}", self.game_label));
        SessionMode::Local(Arc::new(Mutex::new(sink)))
    }

    /// Start the periodic sampler, wired to whichever side displays the
    /// numbers. Only the host process samples; the display process just
    /// renders what arrives.
    fn start_sampler(&mut self) {
        let sampler = match &self.mode {
            SessionMode::Closed => return,
            SessionMode::Piped(transport) => {
                let transport = Arc::clone(transport);
                MemorySampler::spawn(SAMPLE_INTERVAL, proc_memory_sample, move |sample| {
                    transport.send(&Message::Memory {
                        used_bytes: sample.used_bytes,
                        total_bytes: sample.total_bytes,
                    });
                })
            }
            SessionMode::Local(sink) => {
                let sink = Arc::clone(sink);
                MemorySampler::spawn(SAMPLE_INTERVAL, proc_memory_sample, move |sample| {
                    let mut sink = sink.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
                    sink.show_memory(sample.used_bytes, sample.total_bytes);
                })
            }
        };
        self.sampler = Some(sampler);
    }

    /// Report that an entrypoint group is about to be invoked.
    pub fn group_begin(&mut self, name: &str, label: &str, count: u32) {
        if let Err(e) = self.tracker.begin(name, label, count) {
            warn!("{e}");
            return;
        }
        info!(group = name, "preparing loading screen for entrypoint group");

        match &self.mode {
            SessionMode::Closed => {}
            SessionMode::Piped(transport) => transport.send(&Message::Begin {
                name: name.to_string(),
                label: label.to_string(),
                max: count,
            }),
            SessionMode::Local(sink) => {
                let mut sink = sink.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
                sink.add_bar(name, label, count);
            }
        }
    }

    /// Report that one entrypoint implementation is being invoked.
    pub fn step(&mut self, name: &str, label: &str, owner_id: &str, owner_name: &str) {
        let current = self.tracker.step(name, label, Some(owner_name));
        info!(owner = owner_id, "calling entrypoint container");

        match &self.mode {
            SessionMode::Closed => {}
            SessionMode::Piped(transport) => transport.send(&Message::Step {
                name: name.to_string(),
                label: label.to_string(),
                owner_id: owner_id.to_string(),
                owner_name: owner_name.to_string(),
            }),
            SessionMode::Local(sink) => {
                let mut sink = sink.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
                sink.update_bar(name, current, label, Some(owner_name));
            }
        }
    }

    /// Report that an entrypoint group finished.
    pub fn group_end(&mut self, name: &str) {
        self.tracker.end(name);
        info!(group = name, "finished entrypoint group");

        match &self.mode {
            SessionMode::Closed => {}
            SessionMode::Piped(transport) => transport.send(&Message::End {
                name: name.to_string(),
            }),
            SessionMode::Local(sink) => {
                let mut sink = sink.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
                sink.remove_bar(name);
            }
        }
    }

    /// Close the session if `name` is a final group and no later `_init`
    /// phase is expected to close it instead.
    pub fn maybe_close_after(&mut self, name: &str) {
        if !self.config.final_types.contains(name) {
            return;
        }
        if self.defer_close(name) {
            info!(group = name, "deferring close until the matching _init group completes");
            return;
        }
        self.close();
    }

    /// Whether the variant ecosystem will run a `<name>_init` group whose
    /// own completion should close the indicator instead.
    fn defer_close(&self, name: &str) -> bool {
        if !self.config.variant {
            return false;
        }
        let companion_ok = match &self.config.companion_version {
            Some(version) => VersionReq::parse(COMPANION_DEFERRAL_REQ)
                .expect("valid version requirement")
                .matches(version),
            None => false,
        };
        companion_ok && self.provider.has_group(&format!("{name}_init"))
    }

    /// Tear the session down: CLOSE frame, sink disposal, sampler
    /// cancellation, tracker reset. Idempotent.
    pub fn close(&mut self) {
        if let Some(mut sampler) = self.sampler.take() {
            sampler.stop();
        }

        match std::mem::replace(&mut self.mode, SessionMode::Closed) {
            SessionMode::Closed => {
                if !self.tracker.is_empty() {
                    self.tracker.clear();
                }
                return;
            }
            SessionMode::Piped(transport) => match Arc::try_unwrap(transport) {
                Ok(transport) => transport.shutdown(),
                // The sampler has been joined, so this should not happen.
                Err(shared) => {
                    debug!("transport still shared at close, sending CLOSE only");
                    shared.send(&Message::Close);
                }
            },
            SessionMode::Local(sink) => {
                let mut sink = sink.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
                sink.close_window();
            }
        }

        self.tracker.clear();
        info!("loading screen closed");
    }

    /// True while a live sink or transport exists.
    pub fn is_open(&self) -> bool {
        match &self.mode {
            SessionMode::Closed => false,
            SessionMode::Local(_) => true,
            SessionMode::Piped(transport) => transport.is_alive(),
        }
    }

    /// Whether progress is relayed to a separate display process.
    pub fn is_using_ipc(&self) -> bool {
        matches!(self.mode, SessionMode::Piped(_))
    }

    pub fn is_headless(&self) -> bool {
        self.config.headless
    }

    pub fn game_label(&self) -> &str {
        &self.game_label
    }

    pub fn tracker(&self) -> &ProgressTracker {
        &self.tracker
    }

    /// Mutable access to the set of group names that close the session.
    pub fn final_types_mut(&mut self) -> &mut HashSet<String> {
        &mut self.config.final_types
    }

    /// Invoke a whole entrypoint group through the session: begin, one
    /// step per owner around `invoke`, end, and close if this was a
    /// final group.
    ///
    /// An error from `invoke` propagates to the host; the indicator is
    /// left open so the failure stays visible.
    pub fn run_group<F>(&mut self, group: &EntrypointGroup, mut invoke: F) -> Result<()>
    where
        F: FnMut(&EntrypointOwner) -> Result<()>,
    {
        self.group_begin(&group.name, &group.kind, group.owners.len() as u32);
        for owner in &group.owners {
            self.step(&group.name, &group.kind, &owner.id, &owner.name);
            invoke(owner)?;
        }
        self.group_end(&group.name);
        self.maybe_close_after(&group.name);
        Ok(())
    }
}

impl Drop for LoadingSession {
    fn drop(&mut self) {
        self.close();
    }
}
