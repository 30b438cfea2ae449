mod client;
mod protocol;
mod transport;

pub use client::run_display_client;
pub use protocol::{read_message, write_message, Message, ProtocolError};
pub use transport::{
    FrameWriter, PipeTransport, SpawnOptions, ENV_CONFIG_DIR, ENV_GAME, ENV_VARIANT,
};
