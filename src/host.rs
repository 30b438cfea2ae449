//! Host integration seam
//!
//! The host framework owns entrypoint enumeration; this crate only
//! consumes it. [`EntrypointProvider`] is the seam: it answers which
//! groups exist (the close-deferral check needs that) and lists the
//! host's builtin modules so a game label can be derived.

/// One extension implementing an entrypoint group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntrypointOwner {
    /// Stable identifier, e.g. the extension id.
    pub id: String,
    /// Human-readable name shown on the bar.
    pub name: String,
}

/// A named batch of entrypoint implementations the host invokes together.
#[derive(Debug, Clone)]
pub struct EntrypointGroup {
    /// Group name; unique per invocation of the host.
    pub name: String,
    /// Declared type of the group, e.g. `ModInitializer`.
    pub kind: String,
    /// Implementations in invocation order.
    pub owners: Vec<EntrypointOwner>,
}

/// A module known to the host, used for game-label derivation.
#[derive(Debug, Clone)]
pub struct HostModule {
    pub id: String,
    pub name: String,
    pub version: String,
    /// Whether the host itself ships the module.
    pub builtin: bool,
}

/// Entrypoint enumeration as exposed by the host framework.
pub trait EntrypointProvider: Send {
    /// Declared entrypoint groups in invocation order.
    fn groups(&self) -> Vec<EntrypointGroup>;

    /// Whether a group named `name` exists, even with zero owners.
    fn has_group(&self, name: &str) -> bool;

    /// Modules the host knows about, builtins included.
    fn host_modules(&self) -> Vec<HostModule>;
}

/// Fixed in-memory provider for tests and the demo sequence.
#[derive(Debug, Default)]
pub struct StaticProvider {
    pub groups: Vec<EntrypointGroup>,
    pub modules: Vec<HostModule>,
}

impl EntrypointProvider for StaticProvider {
    fn groups(&self) -> Vec<EntrypointGroup> {
        self.groups.clone()
    }

    fn has_group(&self, name: &str) -> bool {
        self.groups.iter().any(|group| group.name == name)
    }

    fn host_modules(&self) -> Vec<HostModule> {
        self.modules.clone()
    }
}

/// Builtin module ids that never name the game itself.
fn ignored_builtins(variant: bool) -> [&'static str; 2] {
    if variant {
        ["quilt_loader", "java"]
    } else {
        ["fabricloader", "java"]
    }
}

/// Derive a `"<name> <version>"` game label from the host's builtin
/// modules, skipping the loader and runtime entries.
pub fn derive_game_label(modules: &[HostModule], variant: bool) -> String {
    let ignored = ignored_builtins(variant);
    modules
        .iter()
        .filter(|module| module.builtin)
        .find(|module| !ignored.contains(&module.id.as_str()))
        .map(|module| format!("{} {}", module.name, module.version))
        .unwrap_or_else(|| "Unknown Game".to_string())
}
