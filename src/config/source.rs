// src/config/source.rs

use std::path::{Path, PathBuf};

use crate::config::loader::load_and_validate;
use crate::config::model::ConfigFile;
use crate::config::snapshot::ConfigSnapshot;
use crate::errors::Result;
use crate::platform::PlatformDescriptor;

/// Where the supervisor reads its configuration from.
///
/// `snapshot` is called on every start, so implementations should return the
/// current values rather than caching the first read.
pub trait ConfigSource: Send + Sync + 'static {
    fn snapshot(&self) -> Result<ConfigSnapshot>;
}

/// Re-reads and validates a TOML file on every snapshot.
#[derive(Debug, Clone)]
pub struct FileConfigSource {
    path: PathBuf,
    platform: PlatformDescriptor,
}

impl FileConfigSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            platform: PlatformDescriptor::current(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Directory relative bundle paths are resolved against.
    pub fn base_dir(&self) -> PathBuf {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        }
    }
}

impl ConfigSource for FileConfigSource {
    fn snapshot(&self) -> Result<ConfigSnapshot> {
        let cfg = load_and_validate(&self.path)?;
        Ok(ConfigSnapshot::resolve(&cfg, &self.platform, &self.base_dir()))
    }
}

/// A fixed, in-memory configuration.
#[derive(Debug, Clone)]
pub struct StaticConfigSource {
    config: ConfigFile,
    platform: PlatformDescriptor,
    base_dir: PathBuf,
}

impl StaticConfigSource {
    pub fn new(config: ConfigFile) -> Self {
        Self {
            config,
            platform: PlatformDescriptor::current(),
            base_dir: PathBuf::from("."),
        }
    }

    pub fn with_platform(mut self, platform: PlatformDescriptor) -> Self {
        self.platform = platform;
        self
    }
}

impl ConfigSource for StaticConfigSource {
    fn snapshot(&self) -> Result<ConfigSnapshot> {
        Ok(ConfigSnapshot::resolve(&self.config, &self.platform, &self.base_dir))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_source_resolves_for_its_platform() {
        let mut cfg = ConfigFile::default();
        cfg.server.enable = true;
        cfg.server.path = Some("C:\\mcp\\server.exe".to_string());

        let source =
            StaticConfigSource::new(cfg).with_platform(PlatformDescriptor::new("windows", "x86_64"));
        let snapshot = source.snapshot().unwrap();

        assert!(snapshot.enabled);
        assert_eq!(snapshot.platform.to_string(), "windows (x86_64)");
        assert_eq!(
            snapshot.executable_path,
            Some(PathBuf::from("C:\\mcp\\server.exe"))
        );
    }

    #[test]
    fn bare_file_name_resolves_against_current_dir() {
        let source = FileConfigSource::new("Mcpvisor.toml");
        assert_eq!(source.path(), Path::new("Mcpvisor.toml"));
        assert!(source.base_dir().is_absolute() || source.base_dir() == Path::new("."));

        let nested = FileConfigSource::new("cfg/Mcpvisor.toml");
        assert_eq!(nested.base_dir(), PathBuf::from("cfg"));
    }
}
