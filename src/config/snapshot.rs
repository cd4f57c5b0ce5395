// src/config/snapshot.rs

//! Resolved, immutable view of the configuration taken at process-start time.

use std::path::{Path, PathBuf};

use crate::config::model::ConfigFile;
use crate::config::rate_limits::RateLimits;
use crate::platform::{PlatformDescriptor, resolve_binary};

/// Everything launch control needs, with binary paths already resolved.
///
/// A new snapshot is taken on every start so configuration edits apply to
/// the next spawn without restarting the host.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigSnapshot {
    pub enabled: bool,
    pub platform: PlatformDescriptor,
    /// `None` when neither an override nor a bundled binary was found.
    pub executable_path: Option<PathBuf>,
    pub companion: Option<CompanionPath>,
    pub workspace_root: Option<PathBuf>,
    pub workspace_flag: String,
    pub extra_args: Vec<String>,
    pub rate_limits: RateLimits,
    /// Only `Some` for a non-blank path.
    pub audit_log_path: Option<String>,
    pub verbose: bool,
}

/// Resolved companion binary passed on the server's command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompanionPath {
    pub name: String,
    pub flag: String,
    pub path: Option<PathBuf>,
    pub required: bool,
}

impl ConfigSnapshot {
    /// Resolve `cfg` for `platform`. Relative bundle directories are taken
    /// relative to `base_dir` (normally the directory holding the config
    /// file).
    pub fn resolve(cfg: &ConfigFile, platform: &PlatformDescriptor, base_dir: &Path) -> Self {
        let bundle_root = cfg.server.bundle_dir.as_ref().map(|dir| {
            if dir.is_absolute() {
                dir.clone()
            } else {
                base_dir.join(dir)
            }
        });

        let executable_path = resolve_binary(
            cfg.server.path.as_deref(),
            bundle_root.as_deref(),
            platform,
            &cfg.server.binary_name,
        );

        let companion = cfg.companion.as_ref().map(|c| {
            let path = match c.binary_name.as_deref() {
                Some(binary) => {
                    resolve_binary(c.path.as_deref(), bundle_root.as_deref(), platform, binary)
                }
                None => resolve_binary(c.path.as_deref(), None, platform, ""),
            };
            CompanionPath {
                name: c.name.clone(),
                flag: c.flag.clone(),
                path,
                required: c.required,
            }
        });

        let audit_log_path = Some(cfg.audit_log.path.trim())
            .filter(|p| !p.is_empty())
            .map(str::to_string);

        Self {
            enabled: cfg.server.enable,
            platform: platform.clone(),
            executable_path,
            companion,
            workspace_root: cfg.workspace.root.clone(),
            workspace_flag: cfg.workspace.flag.clone(),
            extra_args: cfg.server.args.clone(),
            rate_limits: cfg.rate_limits,
            audit_log_path,
            verbose: cfg.server.verbose,
        }
    }

    /// True when two snapshots would launch a differently configured child.
    /// The enable flag is not compared; callers handle it on its own.
    pub fn launch_settings_differ(&self, other: &ConfigSnapshot) -> bool {
        self.executable_path != other.executable_path
            || self.companion != other.companion
            || self.workspace_root != other.workspace_root
            || self.workspace_flag != other.workspace_flag
            || self.extra_args != other.extra_args
            || self.rate_limits != other.rate_limits
            || self.audit_log_path != other.audit_log_path
            || self.verbose != other.verbose
    }
}
