//! Consumer-facing API over the session
//!
//! Extensions may want to ask about the loading screen (is it open,
//! which bars exist, how far along is one) without depending on whether
//! the screen is installed at all. Capability negotiation happens once,
//! when the facade is built: each feature is either backed by the live
//! session or pinned to a documented fallback. There is no lookup at
//! call time.

use crate::session::LoadingSession;

/// Features the facade managed to negotiate. Anything `false` falls
/// back to a no-op answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Features {
    pub final_entrypoints: bool,
    pub headless_check: bool,
    pub ipc_check: bool,
    pub get_progress: bool,
    pub open_check: bool,
}

impl Features {
    pub fn all() -> Self {
        Self {
            final_entrypoints: true,
            headless_check: true,
            ipc_check: true,
            get_progress: true,
            open_check: true,
        }
    }

    pub fn none() -> Self {
        Self {
            final_entrypoints: false,
            headless_check: false,
            ipc_check: false,
            get_progress: false,
            open_check: false,
        }
    }
}

/// Read-only view over an optional session.
pub struct LoadingScreenApi<'a> {
    session: Option<&'a LoadingSession>,
    features: Features,
}

impl<'a> LoadingScreenApi<'a> {
    /// Negotiate capabilities once. `None` models the loading screen
    /// simply not being installed, which is not an error: every call
    /// then takes its fallback path.
    pub fn negotiate(session: Option<&'a LoadingSession>) -> Self {
        let features = match session {
            Some(_) => Features::all(),
            None => Features::none(),
        };
        Self { session, features }
    }

    pub fn features(&self) -> Features {
        self.features
    }

    /// Whether the environment lacks display capability. Fallback: check
    /// for a display server the way a windowing toolkit would.
    pub fn is_headless(&self) -> bool {
        match self.session {
            Some(session) if self.features.headless_check => session.is_headless(),
            _ => std::env::var_os("DISPLAY").is_none() && std::env::var_os("WAYLAND_DISPLAY").is_none(),
        }
    }

    /// Whether progress is relayed to a separate display process.
    /// Fallback: `false`.
    pub fn is_using_ipc(&self) -> bool {
        match self.session {
            Some(session) if self.features.ipc_check => session.is_using_ipc(),
            _ => false,
        }
    }

    /// Names of the live progress bars. Fallback: empty.
    pub fn active_progress_bars(&self) -> Vec<String> {
        match self.session {
            Some(session) if self.features.get_progress => session.tracker().active_names(),
            _ => Vec::new(),
        }
    }

    /// Current count of one bar. Fallback: `None`.
    pub fn progress(&self, bar_name: &str) -> Option<u32> {
        match self.session {
            Some(session) if self.features.get_progress => session.tracker().get(bar_name),
            _ => None,
        }
    }

    /// Whether a loading screen is currently active. Fallback: `false`.
    pub fn is_open(&self) -> bool {
        match self.session {
            Some(session) if self.features.open_check => session.is_open(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::StaticProvider;
    use crate::session::SessionConfig;

    fn headless_session() -> LoadingSession {
        let config = SessionConfig {
            headless: true,
            game_label: Some("Example Game 1.0".to_string()),
            ..SessionConfig::default()
        };
        let mut session = LoadingSession::new(config, Box::new(StaticProvider::default()));
        session.open().unwrap();
        session
    }

    #[test]
    fn test_absent_screen_negotiates_no_features() {
        let api = LoadingScreenApi::negotiate(None);
        assert_eq!(api.features(), Features::none());
        assert!(!api.is_using_ipc());
        assert!(!api.is_open());
        assert!(api.active_progress_bars().is_empty());
        assert_eq!(api.progress("main"), None);
    }

    #[test]
    fn test_present_screen_negotiates_all_features() {
        let session = headless_session();
        let api = LoadingScreenApi::negotiate(Some(&session));
        assert_eq!(api.features(), Features::all());
        assert!(api.is_headless());
        assert!(!api.is_open());
    }

    #[test]
    #[serial_test::serial]
    fn test_headless_fallback_checks_display_env() {
        let saved_x11 = std::env::var_os("DISPLAY");
        let saved_wayland = std::env::var_os("WAYLAND_DISPLAY");

        std::env::remove_var("DISPLAY");
        std::env::remove_var("WAYLAND_DISPLAY");
        assert!(LoadingScreenApi::negotiate(None).is_headless());

        std::env::set_var("DISPLAY", ":0");
        assert!(!LoadingScreenApi::negotiate(None).is_headless());

        match saved_x11 {
            Some(value) => std::env::set_var("DISPLAY", value),
            None => std::env::remove_var("DISPLAY"),
        }
        if let Some(value) = saved_wayland {
            std::env::set_var("WAYLAND_DISPLAY", value);
        }
    }

    #[test]
    fn test_progress_queries_reflect_session_state() {
        let mut session = headless_session();
        session.group_begin("main", "ModInitializer", 2);
        session.step("main", "ModInitializer", "a", "Mod A");

        let api = LoadingScreenApi::negotiate(Some(&session));
        assert_eq!(api.active_progress_bars(), vec!["main"]);
        assert_eq!(api.progress("main"), Some(1));
        assert_eq!(api.progress("absent"), None);
    }
}
