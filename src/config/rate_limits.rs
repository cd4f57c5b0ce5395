// src/config/rate_limits.rs

//! Named per-operation rate limits handed to the child through its
//! environment.
//!
//! The supervisor never interprets these numbers; it only validates that they
//! are positive and turns each one into a `MCP_RATE_LIMIT_<NAME>` variable.

use std::fmt;

use heck::ToShoutySnakeCase;
use serde::Deserialize;

/// Prefix for every rate-limit environment variable.
pub const RATE_LIMIT_ENV_PREFIX: &str = "MCP_RATE_LIMIT";

/// The fixed set of operations the child server rate-limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RateLimitOperation {
    Diagnostics,
    Hover,
    Definition,
    References,
    RenamePreview,
    CodeActions,
}

impl RateLimitOperation {
    pub const ALL: [RateLimitOperation; 6] = [
        RateLimitOperation::Diagnostics,
        RateLimitOperation::Hover,
        RateLimitOperation::Definition,
        RateLimitOperation::References,
        RateLimitOperation::RenamePreview,
        RateLimitOperation::CodeActions,
    ];

    /// Operation name as it appears in configuration (`renamePreview`).
    pub fn name(self) -> &'static str {
        match self {
            RateLimitOperation::Diagnostics => "diagnostics",
            RateLimitOperation::Hover => "hover",
            RateLimitOperation::Definition => "definition",
            RateLimitOperation::References => "references",
            RateLimitOperation::RenamePreview => "renamePreview",
            RateLimitOperation::CodeActions => "codeActions",
        }
    }

    /// Default requests-per-second ceiling.
    pub fn default_limit(self) -> u32 {
        match self {
            RateLimitOperation::Diagnostics => 10,
            RateLimitOperation::Hover => 20,
            RateLimitOperation::Definition => 10,
            RateLimitOperation::References => 5,
            RateLimitOperation::RenamePreview => 2,
            RateLimitOperation::CodeActions => 5,
        }
    }

    /// Environment variable carrying this limit, e.g.
    /// `MCP_RATE_LIMIT_RENAME_PREVIEW`.
    pub fn env_var(self) -> String {
        env_var_for(self.name())
    }
}

impl fmt::Display for RateLimitOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Build `<PREFIX>_<NAME_IN_UPPER_SNAKE_CASE>` for an arbitrary operation name.
pub fn env_var_for(operation: &str) -> String {
    format!("{RATE_LIMIT_ENV_PREFIX}_{}", operation.to_shouty_snake_case())
}

/// `[rate_limits]` section. Every key is optional and falls back to the
/// operation's default independently of the others.
///
/// ```toml
/// [rate_limits]
/// hover = 42
/// renamePreview = 1
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct RateLimits {
    #[serde(default = "default_diagnostics")]
    pub diagnostics: u32,

    #[serde(default = "default_hover")]
    pub hover: u32,

    #[serde(default = "default_definition")]
    pub definition: u32,

    #[serde(default = "default_references")]
    pub references: u32,

    #[serde(default = "default_rename_preview", alias = "rename_preview", rename = "renamePreview")]
    pub rename_preview: u32,

    #[serde(default = "default_code_actions", alias = "code_actions", rename = "codeActions")]
    pub code_actions: u32,
}

fn default_diagnostics() -> u32 {
    RateLimitOperation::Diagnostics.default_limit()
}

fn default_hover() -> u32 {
    RateLimitOperation::Hover.default_limit()
}

fn default_definition() -> u32 {
    RateLimitOperation::Definition.default_limit()
}

fn default_references() -> u32 {
    RateLimitOperation::References.default_limit()
}

fn default_rename_preview() -> u32 {
    RateLimitOperation::RenamePreview.default_limit()
}

fn default_code_actions() -> u32 {
    RateLimitOperation::CodeActions.default_limit()
}

impl Default for RateLimits {
    fn default() -> Self {
        Self {
            diagnostics: default_diagnostics(),
            hover: default_hover(),
            definition: default_definition(),
            references: default_references(),
            rename_preview: default_rename_preview(),
            code_actions: default_code_actions(),
        }
    }
}

impl RateLimits {
    pub fn get(&self, op: RateLimitOperation) -> u32 {
        match op {
            RateLimitOperation::Diagnostics => self.diagnostics,
            RateLimitOperation::Hover => self.hover,
            RateLimitOperation::Definition => self.definition,
            RateLimitOperation::References => self.references,
            RateLimitOperation::RenamePreview => self.rename_preview,
            RateLimitOperation::CodeActions => self.code_actions,
        }
    }

    pub fn set(&mut self, op: RateLimitOperation, limit: u32) {
        let slot = match op {
            RateLimitOperation::Diagnostics => &mut self.diagnostics,
            RateLimitOperation::Hover => &mut self.hover,
            RateLimitOperation::Definition => &mut self.definition,
            RateLimitOperation::References => &mut self.references,
            RateLimitOperation::RenamePreview => &mut self.rename_preview,
            RateLimitOperation::CodeActions => &mut self.code_actions,
        };
        *slot = limit;
    }

    /// All operations with their configured limit, in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (RateLimitOperation, u32)> + '_ {
        RateLimitOperation::ALL
            .into_iter()
            .map(move |op| (op, self.get(op)))
    }

    /// `(variable, value)` pairs for the child environment.
    pub fn env_pairs(&self) -> Vec<(String, String)> {
        self.iter()
            .map(|(op, limit)| (op.env_var(), limit.to_string()))
            .collect()
    }
}
