// src/config/model.rs

use std::path::PathBuf;

use serde::Deserialize;

use crate::config::duration::parse_duration;
use crate::config::rate_limits::RateLimits;
use crate::errors::SupervisorError;
use crate::supervisor::SupervisorOptions;

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [server]
/// enable = true
/// bundle_dir = "bin"
/// binary_name = "domainforge-mcp"
///
/// [companion]
/// name = "LSP server"
/// flag = "--lsp-path"
/// binary_name = "domainforge-lsp"
///
/// [workspace]
/// root = "/home/me/project"
///
/// [rate_limits]
/// hover = 42
///
/// [audit_log]
/// path = "/tmp/mcp-audit.log"
/// ```
///
/// All sections are optional and have reasonable defaults.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawConfigFile {
    #[serde(default)]
    pub server: ServerSection,

    /// A second binary whose path the server needs on its command line.
    #[serde(default)]
    pub companion: Option<CompanionSection>,

    #[serde(default)]
    pub workspace: WorkspaceSection,

    #[serde(default)]
    pub rate_limits: RateLimits,

    #[serde(default)]
    pub audit_log: AuditLogSection,

    /// Restart / shutdown timing overrides from `[supervisor]`.
    #[serde(default)]
    pub supervisor: RawSupervisorSection,
}

/// `[server]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSection {
    /// Gate for the whole supervisor. Disabled by default.
    #[serde(default)]
    pub enable: bool,

    /// Custom executable path; wins over the bundle when non-blank.
    #[serde(default)]
    pub path: Option<String>,

    /// Root of the `<platform-dir>/<binary>` bundle layout.
    #[serde(default)]
    pub bundle_dir: Option<PathBuf>,

    #[serde(default = "default_server_binary")]
    pub binary_name: String,

    /// Extra arguments appended after the generated ones.
    #[serde(default)]
    pub args: Vec<String>,

    /// `RUST_LOG=debug` for the child instead of `info`.
    #[serde(default)]
    pub verbose: bool,
}

fn default_server_binary() -> String {
    "domainforge-mcp".to_string()
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            enable: false,
            path: None,
            bundle_dir: None,
            binary_name: default_server_binary(),
            args: Vec::new(),
            verbose: false,
        }
    }
}

/// `[companion]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct CompanionSection {
    /// Human readable name used in notifications.
    #[serde(default = "default_companion_name")]
    pub name: String,

    /// Flag preceding the companion path on the command line.
    #[serde(default = "default_companion_flag")]
    pub flag: String,

    #[serde(default)]
    pub path: Option<String>,

    /// Looked up in `server.bundle_dir` when `path` is blank.
    #[serde(default)]
    pub binary_name: Option<String>,

    /// When false a missing companion is silently skipped.
    #[serde(default = "default_true")]
    pub required: bool,
}

fn default_companion_name() -> String {
    "LSP server".to_string()
}

fn default_companion_flag() -> String {
    "--lsp-path".to_string()
}

fn default_true() -> bool {
    true
}

/// `[workspace]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct WorkspaceSection {
    #[serde(default)]
    pub root: Option<PathBuf>,

    #[serde(default = "default_workspace_flag")]
    pub flag: String,
}

fn default_workspace_flag() -> String {
    "--workspace-root".to_string()
}

impl Default for WorkspaceSection {
    fn default() -> Self {
        Self {
            root: None,
            flag: default_workspace_flag(),
        }
    }
}

/// `[audit_log]` section. An empty path means "no audit log".
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AuditLogSection {
    #[serde(default)]
    pub path: String,
}

/// `[supervisor]` section as written in TOML (durations are strings).
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawSupervisorSection {
    #[serde(default)]
    pub max_restarts: Option<u32>,

    #[serde(default)]
    pub restart_window: Option<String>,

    #[serde(default)]
    pub restart_delay: Option<String>,

    #[serde(default)]
    pub shutdown_grace: Option<String>,
}

/// Validated configuration.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub server: ServerSection,
    pub companion: Option<CompanionSection>,
    pub workspace: WorkspaceSection,
    pub rate_limits: RateLimits,
    pub audit_log: AuditLogSection,
    pub supervisor: SupervisorOptions,
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            server: ServerSection::default(),
            companion: None,
            workspace: WorkspaceSection::default(),
            rate_limits: RateLimits::default(),
            audit_log: AuditLogSection::default(),
            supervisor: SupervisorOptions::default(),
        }
    }
}

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = SupervisorError;

    fn try_from(raw: RawConfigFile) -> Result<Self, Self::Error> {
        crate::config::validate::validate_config(&raw)?;

        let supervisor = resolve_supervisor_options(&raw.supervisor)?;

        Ok(Self {
            server: raw.server,
            companion: raw.companion,
            workspace: raw.workspace,
            rate_limits: raw.rate_limits,
            audit_log: raw.audit_log,
            supervisor,
        })
    }
}

fn resolve_supervisor_options(
    raw: &RawSupervisorSection,
) -> Result<SupervisorOptions, SupervisorError> {
    let mut options = SupervisorOptions::default();

    if let Some(max) = raw.max_restarts {
        options.max_restarts = max;
    }
    if let Some(ref s) = raw.restart_window {
        options.restart_window = duration_field("restart_window", s)?;
    }
    if let Some(ref s) = raw.restart_delay {
        options.restart_delay = duration_field("restart_delay", s)?;
    }
    if let Some(ref s) = raw.shutdown_grace {
        options.shutdown_grace = duration_field("shutdown_grace", s)?;
    }

    Ok(options)
}

fn duration_field(
    field: &str,
    value: &str,
) -> Result<std::time::Duration, SupervisorError> {
    parse_duration(value).map_err(|e| {
        SupervisorError::ConfigError(format!("[supervisor].{field}: {e}"))
    })
}
