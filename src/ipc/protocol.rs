//! Wire protocol between the host process and the display process
//!
//! Frames flow one way, host to display. Each frame is one byte of
//! opcode, one byte of argument count, then each argument as a 16-bit
//! big-endian length prefix followed by UTF-8 bytes. Numeric fields ride
//! as decimal strings so every argument shares one encoding.

use std::io::{self, Read, Write};
use thiserror::Error;

/// Largest single argument the length prefix can carry.
const MAX_ARG_LEN: usize = u16::MAX as usize;

/// One frame of the host-to-display protocol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// Start a progress bar for an entrypoint group.
    Begin { name: String, label: String, max: u32 },
    /// Advance a bar by one step, attributing it to an extension.
    Step {
        name: String,
        label: String,
        owner_id: String,
        owner_name: String,
    },
    /// Remove a bar.
    End { name: String },
    /// Report a memory usage sample.
    Memory { used_bytes: u64, total_bytes: u64 },
    /// Terminate the session; the display side exits after this.
    Close,
}

impl Message {
    fn opcode(&self) -> u8 {
        match self {
            Message::Begin { .. } => 0,
            Message::Step { .. } => 1,
            Message::End { .. } => 2,
            Message::Memory { .. } => 3,
            Message::Close => 4,
        }
    }

    /// Fixed argument arity for `opcode`, or `None` for an unknown opcode.
    fn arity(opcode: u8) -> Option<usize> {
        match opcode {
            0 => Some(3),
            1 => Some(4),
            2 => Some(1),
            3 => Some(2),
            4 => Some(0),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("unknown opcode {0}")]
    UnknownOpcode(u8),
    #[error("opcode {opcode} expects {expected} arguments, frame carries {actual}")]
    ArityMismatch {
        opcode: u8,
        expected: usize,
        actual: usize,
    },
    #[error("argument is not valid UTF-8")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),
    #[error("argument '{0}' is not a valid decimal number")]
    InvalidNumber(String),
    #[error("argument of {0} bytes exceeds the 16-bit length prefix")]
    ArgumentTooLong(usize),
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Write one frame to a stream.
///
/// Encoding never fails for well-formed in-memory values; the only
/// non-I/O failure is an argument longer than the length prefix allows.
pub fn write_message<W: Write>(stream: &mut W, message: &Message) -> Result<(), ProtocolError> {
    let args: Vec<String> = match message {
        Message::Begin { name, label, max } => {
            vec![name.clone(), label.clone(), max.to_string()]
        }
        Message::Step {
            name,
            label,
            owner_id,
            owner_name,
        } => vec![name.clone(), label.clone(), owner_id.clone(), owner_name.clone()],
        Message::End { name } => vec![name.clone()],
        Message::Memory {
            used_bytes,
            total_bytes,
        } => vec![used_bytes.to_string(), total_bytes.to_string()],
        Message::Close => Vec::new(),
    };

    stream.write_all(&[message.opcode(), args.len() as u8])?;
    for arg in &args {
        let bytes = arg.as_bytes();
        if bytes.len() > MAX_ARG_LEN {
            return Err(ProtocolError::ArgumentTooLong(bytes.len()));
        }
        stream.write_all(&(bytes.len() as u16).to_be_bytes())?;
        stream.write_all(bytes)?;
    }
    stream.flush()?;
    Ok(())
}

/// Read one frame from a stream.
///
/// Returns `Ok(None)` on a clean end of stream (EOF before the first
/// byte of a frame). EOF in the middle of a frame is a truncated frame
/// and surfaces as an error; the decode loop treats any `ProtocolError`
/// as fatal rather than attempting to resync.
pub fn read_message<R: Read>(stream: &mut R) -> Result<Option<Message>, ProtocolError> {
    let mut opcode = [0u8; 1];
    match stream.read_exact(&mut opcode) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }
    let opcode = opcode[0];

    let mut count = [0u8; 1];
    stream.read_exact(&mut count)?;
    let actual = count[0] as usize;

    let expected = Message::arity(opcode).ok_or(ProtocolError::UnknownOpcode(opcode))?;
    if actual != expected {
        return Err(ProtocolError::ArityMismatch {
            opcode,
            expected,
            actual,
        });
    }

    let mut args = Vec::with_capacity(actual);
    for _ in 0..actual {
        let mut len = [0u8; 2];
        stream.read_exact(&mut len)?;
        let mut bytes = vec![0u8; u16::from_be_bytes(len) as usize];
        stream.read_exact(&mut bytes)?;
        args.push(String::from_utf8(bytes)?);
    }

    let mut args = args.into_iter();
    let mut next = || args.next().unwrap_or_default();
    Ok(Some(match opcode {
        0 => Message::Begin {
            name: next(),
            label: next(),
            max: parse_decimal(&next())?,
        },
        1 => Message::Step {
            name: next(),
            label: next(),
            owner_id: next(),
            owner_name: next(),
        },
        2 => Message::End { name: next() },
        3 => Message::Memory {
            used_bytes: parse_decimal(&next())?,
            total_bytes: parse_decimal(&next())?,
        },
        4 => Message::Close,
        _ => unreachable!("arity check rejects unknown opcodes"),
    }))
}

fn parse_decimal<T: std::str::FromStr>(arg: &str) -> Result<T, ProtocolError> {
    arg.parse()
        .map_err(|_| ProtocolError::InvalidNumber(arg.to_string()))
}
