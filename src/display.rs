//! Display sink seam
//!
//! The session and the decode loop both talk to a [`DisplaySink`] and
//! never to a toolkit directly. Real window rendering lives behind this
//! trait; the bundled [`ConsoleDisplay`] renders to the terminal so the
//! pipeline works everywhere a terminal does.

use colored::Colorize;

/// Consumer of progress and memory events, usually a window.
pub trait DisplaySink: Send {
    fn open_window(&mut self, title: &str);
    fn add_bar(&mut self, name: &str, label: &str, max: u32);
    fn update_bar(&mut self, name: &str, current: u32, label: &str, owner: Option<&str>);
    fn remove_bar(&mut self, name: &str);
    fn show_memory(&mut self, used_bytes: u64, total_bytes: u64);
    fn close_window(&mut self);
}

/// Terminal renderer used when no real windowing backend is wired in.
#[derive(Debug, Default)]
pub struct ConsoleDisplay {
    /// Bar maxima by name, kept so updates can render `current/max`.
    maxima: Vec<(String, u32)>,
}

impl ConsoleDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    fn max_for(&self, name: &str) -> Option<u32> {
        self.maxima
            .iter()
            .find(|(bar, _)| bar == name)
            .map(|(_, max)| *max)
    }
}

impl DisplaySink for ConsoleDisplay {
    fn open_window(&mut self, title: &str) {
        println!("{} {}", "▶".cyan().bold(), title.bold());
    }

    fn add_bar(&mut self, name: &str, label: &str, max: u32) {
        self.maxima.push((name.to_string(), max));
        println!("{} {name} ({label}) 0/{max}", "+".green());
    }

    fn update_bar(&mut self, name: &str, current: u32, label: &str, owner: Option<&str>) {
        let max = self.max_for(name).unwrap_or(current);
        let mut line = format!("Loading '{name}' ({label}) {current}/{max}");
        if let Some(owner) = owner {
            line.push_str(&format!(" - {owner}"));
        }
        println!("{} {line}", "→".cyan());
    }

    fn remove_bar(&mut self, name: &str) {
        self.maxima.retain(|(bar, _)| bar != name);
        println!("{} {name} done", "✓".green().bold());
    }

    fn show_memory(&mut self, used_bytes: u64, total_bytes: u64) {
        let used_mb = used_bytes / (1024 * 1024);
        let total_mb = total_bytes / (1024 * 1024);
        println!("{}", format!("  mem {used_mb} MB / {total_mb} MB").dimmed());
    }

    fn close_window(&mut self) {
        self.maxima.clear();
        println!("{} loading finished", "✓".green().bold());
    }
}
