//! Frames over a real OS pipe into the display decode loop
//!
//! The host side writes through the same `FrameWriter` the transport
//! uses; the display side blocks on the read end exactly as the spawned
//! process does.

use loadscreen::ipc::{run_display_client, FrameWriter, Message};
use std::fs::File;
use std::thread;

use super::helpers::RecordingSink;

fn os_pipe() -> (File, File) {
    let (read_fd, write_fd) = nix::unistd::pipe().expect("Failed to create pipe");
    (File::from(read_fd), File::from(write_fd))
}

#[test]
fn test_full_sequence_over_pipe() {
    let (mut read_end, write_end) = os_pipe();

    let writer_handle = thread::spawn(move || {
        let writer = FrameWriter::new(write_end);
        writer
            .write(&Message::Begin {
                name: "main".to_string(),
                label: "ModInitializer".to_string(),
                max: 2,
            })
            .unwrap();
        for owner in ["Mod A", "Mod B"] {
            writer
                .write(&Message::Step {
                    name: "main".to_string(),
                    label: "ModInitializer".to_string(),
                    owner_id: owner.to_lowercase().replace(' ', "-"),
                    owner_name: owner.to_string(),
                })
                .unwrap();
        }
        writer
            .write(&Message::Memory {
                used_bytes: 64 * 1024 * 1024,
                total_bytes: 1024 * 1024 * 1024,
            })
            .unwrap();
        writer
            .write(&Message::End {
                name: "main".to_string(),
            })
            .unwrap();
        writer.write(&Message::Close).unwrap();
    });

    let (mut sink, events) = RecordingSink::new();
    run_display_client(&mut read_end, &mut sink).unwrap();
    writer_handle.join().unwrap();

    assert_eq!(
        *events.lock().unwrap(),
        vec![
            "add:main:ModInitializer:2",
            "update:main:1:Mod A",
            "update:main:2:Mod B",
            "memory:67108864:1073741824",
            "remove:main",
            "close",
        ]
    );
}

#[test]
fn test_dropped_write_end_terminates_loop_cleanly() {
    let (mut read_end, write_end) = os_pipe();

    let writer_handle = thread::spawn(move || {
        let writer = FrameWriter::new(write_end);
        writer
            .write(&Message::Begin {
                name: "main".to_string(),
                label: "ModInitializer".to_string(),
                max: 1,
            })
            .unwrap();
        // Writer goes away without sending CLOSE; the reader must see
        // EOF and exit cleanly, like a crashed host.
    });

    let (mut sink, events) = RecordingSink::new();
    let result = run_display_client(&mut read_end, &mut sink);
    writer_handle.join().unwrap();

    assert!(result.is_ok());
    assert_eq!(
        *events.lock().unwrap(),
        vec!["add:main:ModInitializer:1", "close"]
    );
}

#[test]
fn test_concurrent_senders_decode_intact_over_pipe() {
    const FRAMES_PER_THREAD: usize = 100;

    let (mut read_end, write_end) = os_pipe();

    let writer_handle = thread::spawn(move || {
        let writer = std::sync::Arc::new(FrameWriter::new(write_end));
        let mut senders = Vec::new();
        for thread_id in 0..3 {
            let writer = std::sync::Arc::clone(&writer);
            senders.push(thread::spawn(move || {
                for i in 0..FRAMES_PER_THREAD {
                    let tag = format!("t{thread_id}-{i}");
                    writer
                        .write(&Message::Step {
                            name: tag.clone(),
                            label: tag.clone(),
                            owner_id: tag.clone(),
                            owner_name: tag,
                        })
                        .unwrap();
                }
            }));
        }
        for sender in senders {
            sender.join().unwrap();
        }
        writer.write(&Message::Close).unwrap();
    });

    // Decode concurrently with the writers to exercise real pipe
    // backpressure; each frame's fields must be internally consistent.
    let mut decoded = 0;
    loop {
        match loadscreen::ipc::read_message(&mut read_end).unwrap() {
            Some(Message::Step {
                name,
                label,
                owner_id,
                owner_name,
            }) => {
                assert_eq!(name, label);
                assert_eq!(name, owner_id);
                assert_eq!(name, owner_name);
                decoded += 1;
            }
            Some(Message::Close) | None => break,
            Some(other) => panic!("Unexpected frame: {other:?}"),
        }
    }
    writer_handle.join().unwrap();

    assert_eq!(decoded, 3 * FRAMES_PER_THREAD);
}
