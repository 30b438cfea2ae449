use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use loadscreen::config::default_config_dir;
use loadscreen::display::{ConsoleDisplay, DisplaySink};
use loadscreen::host::{EntrypointGroup, EntrypointOwner, HostModule, StaticProvider};
use loadscreen::ipc::{run_display_client, ENV_CONFIG_DIR, ENV_GAME};
use loadscreen::session::{LoadingSession, SessionConfig};

#[derive(Parser)]
#[command(name = "loadscreen")]
#[command(about = "Extension-loading progress indicator with cross-process relay", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Simulate a host loading sequence through the full pipeline
    Demo {
        /// Pretend the environment has no display capability
        #[arg(long)]
        headless: bool,

        /// Render in this process instead of spawning the display process
        #[arg(long)]
        no_ipc: bool,

        /// Simulate the variant host ecosystem
        #[arg(long)]
        variant: bool,
    },

    /// Display-side process: decode frames from stdin (spawned internally)
    #[command(hide = true)]
    Display,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Demo {
            headless,
            no_ipc,
            variant,
        } => demo(headless, no_ipc, variant),
        Commands::Display => display(),
    }
}

/// Run the display side: open a sink and mirror frames until CLOSE or
/// the host end of the pipe goes away.
fn display() -> Result<()> {
    let game_label =
        std::env::var(ENV_GAME).unwrap_or_else(|_| "Unknown Game".to_string());
    let config_dir = std::env::var_os(ENV_CONFIG_DIR)
        .map(PathBuf::from)
        .unwrap_or_else(default_config_dir);
    // Load for the side effect of materializing the default file; the
    // console sink has no use for the background image itself.
    let _config = loadscreen::config::DisplayConfig::load_or_init(&config_dir);

    let mut sink = ConsoleDisplay::new();
    sink.open_window(&format!("Loading {game_label}"));

    let mut stdin = io::stdin().lock();
    run_display_client(&mut stdin, &mut sink).context("Display client failed")
}

/// Drive a canned loading sequence so the protocol, transport, sampler,
/// and lifecycle can be watched end to end.
fn demo(headless: bool, no_ipc: bool, variant: bool) -> Result<()> {
    let provider = demo_provider();
    let groups = provider.groups.clone();

    let config = SessionConfig {
        headless,
        disable_ipc: no_ipc,
        variant,
        ..SessionConfig::default()
    };
    let mut session = LoadingSession::new(config, Box::new(provider));
    session.open()?;

    for group in &groups {
        session.run_group(group, |owner| {
            // Stand-in for actually invoking the extension.
            std::thread::sleep(Duration::from_millis(150));
            tracing::debug!(owner = %owner.id, "demo entrypoint invoked");
            Ok(())
        })?;
    }

    Ok(())
}

fn demo_provider() -> StaticProvider {
    let owner = |id: &str, name: &str| EntrypointOwner {
        id: id.to_string(),
        name: name.to_string(),
    };
    StaticProvider {
        groups: vec![
            EntrypointGroup {
                name: "pre_launch".to_string(),
                kind: "PreLaunchEntrypoint".to_string(),
                owners: vec![owner("early-riser", "Early Riser")],
            },
            EntrypointGroup {
                name: "main".to_string(),
                kind: "ModInitializer".to_string(),
                owners: vec![
                    owner("architectury", "Architectury"),
                    owner("cloth-config", "Cloth Config"),
                    owner("example-mod", "Example Mod"),
                ],
            },
            EntrypointGroup {
                name: "client".to_string(),
                kind: "ClientModInitializer".to_string(),
                owners: vec![
                    owner("mod-menu", "Mod Menu"),
                    owner("example-mod", "Example Mod"),
                ],
            },
        ],
        modules: vec![
            HostModule {
                id: "fabricloader".to_string(),
                name: "Fabric Loader".to_string(),
                version: "0.15.0".to_string(),
                builtin: true,
            },
            HostModule {
                id: "minecraft".to_string(),
                name: "Example Game".to_string(),
                version: "1.20.4".to_string(),
                builtin: true,
            },
        ],
    }
}
