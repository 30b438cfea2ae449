//! Shared test helpers

use loadscreen::display::DisplaySink;
use std::sync::{Arc, Mutex};

/// Sink that records every call as a compact string, so tests can hold
/// the event log while the session owns the sink.
#[derive(Default)]
pub struct RecordingSink {
    pub events: Arc<Mutex<Vec<String>>>,
}

impl RecordingSink {
    pub fn new() -> (Self, Arc<Mutex<Vec<String>>>) {
        let sink = Self::default();
        let events = Arc::clone(&sink.events);
        (sink, events)
    }
}

impl DisplaySink for RecordingSink {
    fn open_window(&mut self, title: &str) {
        self.events.lock().unwrap().push(format!("open:{title}"));
    }

    fn add_bar(&mut self, name: &str, label: &str, max: u32) {
        self.events
            .lock()
            .unwrap()
            .push(format!("add:{name}:{label}:{max}"));
    }

    fn update_bar(&mut self, name: &str, current: u32, _label: &str, owner: Option<&str>) {
        self.events.lock().unwrap().push(format!(
            "update:{name}:{current}:{}",
            owner.unwrap_or("-")
        ));
    }

    fn remove_bar(&mut self, name: &str) {
        self.events.lock().unwrap().push(format!("remove:{name}"));
    }

    fn show_memory(&mut self, used_bytes: u64, total_bytes: u64) {
        self.events
            .lock()
            .unwrap()
            .push(format!("memory:{used_bytes}:{total_bytes}"));
    }

    fn close_window(&mut self) {
        self.events.lock().unwrap().push("close".to_string());
    }
}
