// src/platform.rs

//! Binary discovery for bundled server executables.
//!
//! Bundles are laid out as `<bundle_dir>/<platform-dir>/<binary>`, e.g.
//! `bin/linux-x64/domainforge-mcp` or `bin/windows-x64/domainforge-mcp.exe`.
//! A non-blank custom path always takes precedence and is used as-is.

use std::fmt;
use std::path::{Path, PathBuf};

use tracing::warn;

/// Operating system + CPU architecture of the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformDescriptor {
    pub os: String,
    pub arch: String,
}

impl PlatformDescriptor {
    pub fn new(os: impl Into<String>, arch: impl Into<String>) -> Self {
        Self {
            os: os.into(),
            arch: arch.into(),
        }
    }

    /// The platform this binary was compiled for.
    pub fn current() -> Self {
        Self::new(std::env::consts::OS, std::env::consts::ARCH)
    }

    /// Directory name used inside a bundle, or `None` for unsupported
    /// platforms.
    pub fn bundle_dir_name(&self) -> Option<&'static str> {
        match (self.os.as_str(), self.arch.as_str()) {
            ("windows", "x86_64") => Some("windows-x64"),
            ("macos", "x86_64") => Some("darwin-x64"),
            ("macos", "aarch64") => Some("darwin-arm64"),
            ("linux", "x86_64") => Some("linux-x64"),
            ("linux", "aarch64") => Some("linux-arm64"),
            _ => None,
        }
    }

    /// File name of `base` on this platform (`.exe` suffix on windows).
    pub fn executable_name(&self, base: &str) -> String {
        if self.os == "windows" {
            format!("{base}.exe")
        } else {
            base.to_string()
        }
    }
}

impl fmt::Display for PlatformDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.os, self.arch)
    }
}

/// Locate `base_name` inside a bundle for the given platform.
///
/// Returns `None` when the platform has no bundle directory or the file is
/// not present.
pub fn bundled_binary_path(
    bundle_root: &Path,
    platform: &PlatformDescriptor,
    base_name: &str,
) -> Option<PathBuf> {
    let dir = platform.bundle_dir_name()?;
    let full = bundle_root
        .join(dir)
        .join(platform.executable_name(base_name));

    if !full.is_file() {
        warn!(path = ?full, "bundled binary not found at detected path");
        return None;
    }

    Some(full)
}

/// Resolve a binary: a non-blank override wins, otherwise fall back to the
/// bundle (when one is configured).
pub fn resolve_binary(
    override_path: Option<&str>,
    bundle_root: Option<&Path>,
    platform: &PlatformDescriptor,
    base_name: &str,
) -> Option<PathBuf> {
    if let Some(custom) = override_path.map(str::trim).filter(|s| !s.is_empty()) {
        return Some(PathBuf::from(custom));
    }

    bundle_root.and_then(|root| bundled_binary_path(root, platform, base_name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_supported_platforms_to_bundle_dirs() {
        let cases = [
            ("windows", "x86_64", Some("windows-x64")),
            ("macos", "x86_64", Some("darwin-x64")),
            ("macos", "aarch64", Some("darwin-arm64")),
            ("linux", "x86_64", Some("linux-x64")),
            ("linux", "aarch64", Some("linux-arm64")),
            ("windows", "aarch64", None),
            ("freebsd", "x86_64", None),
        ];
        for (os, arch, expected) in cases {
            assert_eq!(
                PlatformDescriptor::new(os, arch).bundle_dir_name(),
                expected,
                "{os}/{arch}"
            );
        }
    }

    #[test]
    fn override_wins_and_blank_override_is_ignored() {
        let platform = PlatformDescriptor::new("linux", "x86_64");
        assert_eq!(
            resolve_binary(Some("/opt/server"), None, &platform, "srv"),
            Some(PathBuf::from("/opt/server"))
        );
        assert_eq!(resolve_binary(Some("   "), None, &platform, "srv"), None);
    }

    #[test]
    fn finds_bundled_binary_when_present() {
        let dir = tempfile::tempdir().unwrap();
        let platform = PlatformDescriptor::new("windows", "x86_64");
        let bin_dir = dir.path().join("windows-x64");
        std::fs::create_dir_all(&bin_dir).unwrap();
        std::fs::write(bin_dir.join("srv.exe"), b"").unwrap();

        assert_eq!(
            resolve_binary(None, Some(dir.path()), &platform, "srv"),
            Some(bin_dir.join("srv.exe"))
        );
        assert_eq!(
            resolve_binary(None, Some(dir.path()), &platform, "other"),
            None
        );
    }
}
