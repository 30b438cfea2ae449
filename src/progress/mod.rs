//! Progress tracking for entrypoint groups
//!
//! The tracker is pure state: an insertion-ordered set of live progress
//! bars, one per entrypoint group currently being invoked. It is mutated
//! only from the session's control thread (or, on the display side, from
//! the decode-loop thread), so it carries no locking of its own.

use thiserror::Error;

/// A group name was begun while a bar with the same name was still live.
#[derive(Debug, Error)]
#[error("progress bar '{0}' is already active")]
pub struct DuplicateBar(pub String);

/// One live progress bar for an entrypoint group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bar {
    /// Group name; unique among live bars.
    pub name: String,
    /// Group kind shown alongside the name (e.g. the entrypoint type).
    pub label: String,
    /// Completed steps so far.
    pub current: u32,
    /// Declared step count. Zero means the count is unknown (the bar was
    /// synthesized by a step that arrived without a begin) and `current`
    /// grows without clamping.
    pub max: u32,
    /// Human-readable attribution of the step currently running.
    pub owner: Option<String>,
}

/// Insertion-ordered mapping from group name to its live bar.
///
/// Backed by a `Vec`: bar counts are small and creation order is what the
/// display wants to show.
#[derive(Debug, Default)]
pub struct ProgressTracker {
    bars: Vec<Bar>,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a bar for `name` with `current = 0`.
    pub fn begin(&mut self, name: &str, label: &str, max: u32) -> Result<(), DuplicateBar> {
        if self.find(name).is_some() {
            return Err(DuplicateBar(name.to_string()));
        }
        self.bars.push(Bar {
            name: name.to_string(),
            label: label.to_string(),
            current: 0,
            max,
            owner: None,
        });
        Ok(())
    }

    /// Advance `name` by one step, refreshing its label and owner.
    ///
    /// A step for a name with no live bar is not an error: it synthesizes
    /// the bar with `current = 1`, modelling a step that arrived without
    /// an explicit begin. Returns the count after the step.
    pub fn step(&mut self, name: &str, label: &str, owner: Option<&str>) -> u32 {
        if let Some(bar) = self.find_mut(name) {
            bar.current = if bar.max > 0 {
                bar.current.saturating_add(1).min(bar.max)
            } else {
                bar.current.saturating_add(1)
            };
            bar.label = label.to_string();
            bar.owner = owner.map(str::to_string);
            return bar.current;
        }
        self.bars.push(Bar {
            name: name.to_string(),
            label: label.to_string(),
            current: 1,
            max: 0,
            owner: owner.map(str::to_string),
        });
        1
    }

    /// Remove the bar for `name`. A name with no live bar is a no-op.
    pub fn end(&mut self, name: &str) {
        self.bars.retain(|bar| bar.name != name);
    }

    /// Current count for `name`, if a bar is live.
    pub fn get(&self, name: &str) -> Option<u32> {
        self.find(name).map(|bar| bar.current)
    }

    /// Read-only copy of the live bars in creation order.
    pub fn snapshot(&self) -> Vec<Bar> {
        self.bars.clone()
    }

    /// Names of the live bars in creation order.
    pub fn active_names(&self) -> Vec<String> {
        self.bars.iter().map(|bar| bar.name.clone()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// Drop every live bar. Used when the session closes.
    pub fn clear(&mut self) {
        self.bars.clear();
    }

    fn find(&self, name: &str) -> Option<&Bar> {
        self.bars.iter().find(|bar| bar.name == name)
    }

    fn find_mut(&mut self, name: &str) -> Option<&mut Bar> {
        self.bars.iter_mut().find(|bar| bar.name == name)
    }
}
