// src/watch/reload.rs

use crate::config::ConfigSnapshot;

/// What the host should do after the configuration changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadAction {
    Nothing,
    Start,
    Stop,
    Restart,
}

/// Compare two snapshots and decide how to react.
///
/// - enable switched on while nothing runs: start.
/// - enable switched off while running: stop.
/// - launch settings changed while running: restart so they take effect.
///
/// A stopped server (crash loop, clean exit) is not revived by unrelated
/// edits; only toggling `enable` or a manual restart does that.
pub fn plan_reload(prev: &ConfigSnapshot, next: &ConfigSnapshot, running: bool) -> ReloadAction {
    if !next.enabled {
        return if running {
            ReloadAction::Stop
        } else {
            ReloadAction::Nothing
        };
    }

    if !running {
        return if prev.enabled {
            ReloadAction::Nothing
        } else {
            ReloadAction::Start
        };
    }

    if prev.launch_settings_differ(next) {
        ReloadAction::Restart
    } else {
        ReloadAction::Nothing
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::config::{ConfigFile, RateLimitOperation};
    use crate::platform::PlatformDescriptor;

    fn snapshot(cfg: &ConfigFile) -> ConfigSnapshot {
        ConfigSnapshot::resolve(cfg, &PlatformDescriptor::new("linux", "x86_64"), Path::new("."))
    }

    fn config(enable: bool) -> ConfigFile {
        let mut cfg = ConfigFile::default();
        cfg.server.enable = enable;
        cfg.server.path = Some("/opt/mcp/server".to_string());
        cfg
    }

    #[test]
    fn enabling_starts_and_disabling_stops() {
        let off = snapshot(&config(false));
        let on = snapshot(&config(true));

        assert_eq!(plan_reload(&off, &on, false), ReloadAction::Start);
        assert_eq!(plan_reload(&on, &off, true), ReloadAction::Stop);
        assert_eq!(plan_reload(&on, &off, false), ReloadAction::Nothing);
    }

    #[test]
    fn changed_limits_restart_a_running_server() {
        let before = snapshot(&config(true));
        let mut cfg = config(true);
        cfg.rate_limits.set(RateLimitOperation::Diagnostics, 99);
        let after = snapshot(&cfg);

        assert_eq!(plan_reload(&before, &after, true), ReloadAction::Restart);
        assert_eq!(plan_reload(&before, &after, false), ReloadAction::Nothing);
        assert_eq!(plan_reload(&before, &before.clone(), true), ReloadAction::Nothing);
    }

    #[test]
    fn changed_server_path_restarts() {
        let before = snapshot(&config(true));
        let mut cfg = config(true);
        cfg.server.path = Some("/opt/mcp/other".to_string());

        assert_eq!(
            plan_reload(&before, &snapshot(&cfg), true),
            ReloadAction::Restart
        );
    }
}
