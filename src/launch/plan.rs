// src/launch/plan.rs

//! Turn a [`ConfigSnapshot`] into a concrete command line + environment.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use crate::config::ConfigSnapshot;
use crate::host::Notification;
use crate::platform::PlatformDescriptor;

/// Log level variable read by the child.
pub const LOG_LEVEL_ENV: &str = "RUST_LOG";

/// Audit log location; only set when a path is configured.
pub const AUDIT_LOG_ENV: &str = "MCP_AUDIT_LOG_PATH";

/// A fully resolved process invocation.
///
/// `env` is an overlay: the spawned process inherits the host environment and
/// these entries replace or extend it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchPlan {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub env: BTreeMap<String, String>,
}

/// Why a snapshot cannot be launched. None of these are crashes; they never
/// feed the restart policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchBlocked {
    Disabled,
    MissingBinary { platform: PlatformDescriptor },
    MissingCompanion { name: String },
}

impl LaunchBlocked {
    /// What to tell the user, if anything. Being disabled is silent.
    pub fn notification(&self) -> Option<Notification> {
        match self {
            LaunchBlocked::Disabled => None,
            LaunchBlocked::MissingBinary { platform } => Some(Notification::MissingBinary {
                platform: platform.clone(),
            }),
            LaunchBlocked::MissingCompanion { name } => {
                Some(Notification::MissingCompanion { name: name.clone() })
            }
        }
    }
}

impl fmt::Display for LaunchBlocked {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LaunchBlocked::Disabled => write!(f, "MCP server is disabled in settings"),
            LaunchBlocked::MissingBinary { platform } => {
                write!(f, "no MCP server binary for {platform}")
            }
            LaunchBlocked::MissingCompanion { name } => write!(f, "{name} binary not found"),
        }
    }
}

impl LaunchPlan {
    /// Build the plan for `snapshot`, checking the launch preconditions in
    /// order: enabled, executable, companion.
    pub fn from_snapshot(snapshot: &ConfigSnapshot) -> Result<Self, LaunchBlocked> {
        if !snapshot.enabled {
            return Err(LaunchBlocked::Disabled);
        }

        let program = snapshot
            .executable_path
            .clone()
            .ok_or_else(|| LaunchBlocked::MissingBinary {
                platform: snapshot.platform.clone(),
            })?;

        let args = launch_arguments(snapshot)?;
        let env = environment_overlay(snapshot);

        Ok(Self { program, args, env })
    }
}

impl fmt::Display for LaunchPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Companion flag + path, then workspace root, then configured extras.
fn launch_arguments(snapshot: &ConfigSnapshot) -> Result<Vec<String>, LaunchBlocked> {
    let mut args = Vec::new();

    if let Some(ref companion) = snapshot.companion {
        match companion.path {
            Some(ref path) => {
                args.push(companion.flag.clone());
                args.push(path.display().to_string());
            }
            None if companion.required => {
                return Err(LaunchBlocked::MissingCompanion {
                    name: companion.name.clone(),
                });
            }
            None => {}
        }
    }

    if let Some(ref root) = snapshot.workspace_root {
        args.push(snapshot.workspace_flag.clone());
        args.push(root.display().to_string());
    }

    args.extend(snapshot.extra_args.iter().cloned());
    Ok(args)
}

/// Variables layered on top of the inherited host environment.
pub fn environment_overlay(snapshot: &ConfigSnapshot) -> BTreeMap<String, String> {
    let mut env = BTreeMap::new();

    let level = if snapshot.verbose { "debug" } else { "info" };
    env.insert(LOG_LEVEL_ENV.to_string(), level.to_string());

    env.extend(snapshot.rate_limits.env_pairs());

    if let Some(ref path) = snapshot.audit_log_path {
        env.insert(AUDIT_LOG_ENV.to_string(), path.clone());
    }

    env
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::config::{CompanionSection, ConfigFile, RateLimitOperation};

    fn snapshot(cfg: &ConfigFile) -> ConfigSnapshot {
        ConfigSnapshot::resolve(cfg, &PlatformDescriptor::new("linux", "x86_64"), Path::new("."))
    }

    fn enabled_config() -> ConfigFile {
        let mut cfg = ConfigFile::default();
        cfg.server.enable = true;
        cfg.server.path = Some("/opt/mcp/server".to_string());
        cfg
    }

    #[test]
    fn disabled_snapshot_is_blocked_silently() {
        let blocked = LaunchPlan::from_snapshot(&snapshot(&ConfigFile::default())).unwrap_err();
        assert_eq!(blocked, LaunchBlocked::Disabled);
        assert_eq!(blocked.notification(), None);
    }

    #[test]
    fn missing_binary_names_the_platform() {
        let mut cfg = enabled_config();
        cfg.server.path = None;
        let blocked = LaunchPlan::from_snapshot(&snapshot(&cfg)).unwrap_err();
        match blocked.notification() {
            Some(Notification::MissingBinary { platform }) => {
                assert_eq!(platform.to_string(), "linux (x86_64)");
            }
            other => panic!("expected MissingBinary, got {other:?}"),
        }
    }

    #[test]
    fn required_companion_must_resolve() {
        let mut cfg = enabled_config();
        cfg.companion = Some(CompanionSection {
            name: "LSP server".to_string(),
            flag: "--lsp-path".to_string(),
            path: None,
            binary_name: None,
            required: true,
        });
        assert_eq!(
            LaunchPlan::from_snapshot(&snapshot(&cfg)).unwrap_err(),
            LaunchBlocked::MissingCompanion {
                name: "LSP server".to_string()
            }
        );

        cfg.companion.as_mut().unwrap().required = false;
        let plan = LaunchPlan::from_snapshot(&snapshot(&cfg)).unwrap();
        assert!(plan.args.is_empty());
    }

    #[test]
    fn arguments_keep_companion_workspace_extra_order() {
        let mut cfg = enabled_config();
        cfg.companion = Some(CompanionSection {
            name: "LSP server".to_string(),
            flag: "--lsp-path".to_string(),
            path: Some("/opt/lsp".to_string()),
            binary_name: None,
            required: true,
        });
        cfg.workspace.root = Some(PathBuf::from("/work"));
        cfg.server.args = vec!["--stdio".to_string()];

        let plan = LaunchPlan::from_snapshot(&snapshot(&cfg)).unwrap();
        assert_eq!(
            plan.args,
            vec!["--lsp-path", "/opt/lsp", "--workspace-root", "/work", "--stdio"]
        );
        assert_eq!(
            plan.to_string(),
            "/opt/mcp/server --lsp-path /opt/lsp --workspace-root /work --stdio"
        );
    }

    #[test]
    fn environment_carries_limits_and_log_level() {
        let mut cfg = enabled_config();
        cfg.rate_limits.set(RateLimitOperation::Hover, 42);

        let env = environment_overlay(&snapshot(&cfg));
        assert_eq!(env.get("MCP_RATE_LIMIT_HOVER").map(String::as_str), Some("42"));
        assert_eq!(env.get("MCP_RATE_LIMIT_RENAME_PREVIEW").map(String::as_str), Some("2"));
        assert_eq!(env.get(LOG_LEVEL_ENV).map(String::as_str), Some("info"));
        assert!(!env.contains_key(AUDIT_LOG_ENV));

        cfg.server.verbose = true;
        cfg.audit_log.path = "/tmp/audit.log".to_string();
        let env = environment_overlay(&snapshot(&cfg));
        assert_eq!(env.get(LOG_LEVEL_ENV).map(String::as_str), Some("debug"));
        assert_eq!(env.get(AUDIT_LOG_ENV).map(String::as_str), Some("/tmp/audit.log"));
    }
}
