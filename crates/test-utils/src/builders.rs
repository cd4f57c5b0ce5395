#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use mcpvisor::config::{
    CompanionSection, ConfigFile, ConfigSnapshot, ConfigSource, RateLimitOperation,
};
use mcpvisor::errors::Result;
use mcpvisor::platform::PlatformDescriptor;
use mcpvisor::supervisor::SupervisorOptions;

/// Executable path every builder config points at by default.
pub const SERVER_PATH: &str = "/opt/mcp/domainforge-mcp";

/// Builder for `ConfigFile` to simplify test setup.
///
/// Starts enabled, with an explicit server path and a workspace root, so a
/// default build is launchable.
pub struct ConfigFileBuilder {
    config: ConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        let mut config = ConfigFile::default();
        config.server.enable = true;
        config.server.path = Some(SERVER_PATH.to_string());
        config.workspace.root = Some(PathBuf::from("/work"));
        Self { config }
    }

    pub fn enabled(mut self, enable: bool) -> Self {
        self.config.server.enable = enable;
        self
    }

    pub fn server_path(mut self, path: Option<&str>) -> Self {
        self.config.server.path = path.map(str::to_string);
        self
    }

    pub fn server_args(mut self, args: &[&str]) -> Self {
        self.config.server.args = args.iter().map(|a| a.to_string()).collect();
        self
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.config.server.verbose = verbose;
        self
    }

    pub fn workspace_root(mut self, root: Option<&str>) -> Self {
        self.config.workspace.root = root.map(PathBuf::from);
        self
    }

    pub fn companion(mut self, path: Option<&str>, required: bool) -> Self {
        self.config.companion = Some(CompanionSection {
            name: "LSP server".to_string(),
            flag: "--lsp-path".to_string(),
            path: path.map(str::to_string),
            binary_name: None,
            required,
        });
        self
    }

    pub fn rate_limit(mut self, op: RateLimitOperation, limit: u32) -> Self {
        self.config.rate_limits.set(op, limit);
        self
    }

    pub fn audit_log(mut self, path: &str) -> Self {
        self.config.audit_log.path = path.to_string();
        self
    }

    pub fn supervisor(mut self, options: SupervisorOptions) -> Self {
        self.config.supervisor = options;
        self
    }

    pub fn build(self) -> ConfigFile {
        self.config
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A mutable in-memory config source, so tests can edit settings between
/// starts the way a user edits the config file.
#[derive(Debug, Clone)]
pub struct SharedConfig {
    config: Arc<Mutex<ConfigFile>>,
    fail: Arc<Mutex<Option<String>>>,
}

impl SharedConfig {
    pub fn new(config: ConfigFile) -> Self {
        Self {
            config: Arc::new(Mutex::new(config)),
            fail: Arc::new(Mutex::new(None)),
        }
    }

    pub fn update(&self, f: impl FnOnce(&mut ConfigFile)) {
        f(&mut self.config.lock().unwrap());
    }

    /// Make subsequent snapshots fail with `error`, or succeed again with
    /// `None`.
    pub fn set_failure(&self, error: Option<&str>) {
        *self.fail.lock().unwrap() = error.map(str::to_string);
    }

    pub fn platform() -> PlatformDescriptor {
        PlatformDescriptor::new("linux", "x86_64")
    }
}

impl ConfigSource for SharedConfig {
    fn snapshot(&self) -> Result<ConfigSnapshot> {
        if let Some(ref error) = *self.fail.lock().unwrap() {
            return Err(mcpvisor::errors::SupervisorError::ConfigError(error.clone()));
        }
        let cfg = self.config.lock().unwrap();
        Ok(ConfigSnapshot::resolve(
            &cfg,
            &Self::platform(),
            std::path::Path::new("."),
        ))
    }
}
