//! Build configuration, read from an optional JSON file.
//!
//! Every field has a default, so an absent file and `{}` mean the same
//! thing. Unknown keys are rejected to catch typos early.

use std::path::Path;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::processor::lexer::MAX_INT;

/// Name looked for next to the sources when `--config` is not given.
pub const DEFAULT_FILE_NAME: &str = "jackc.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Initial stack pointer written by the bootstrap.
    pub stack_base: u16,
    /// `None` lets the input mode decide (directory → bootstrap).
    pub bootstrap: Option<bool>,
    /// Echo each VM instruction as a `//` comment in the assembly.
    pub annotate: bool,
    pub runtime: Runtime,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            stack_base: 256,
            bootstrap: None,
            annotate: true,
            runtime: Runtime::default(),
        }
    }
}

/// Operating-system routines the generated code calls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Runtime {
    pub allocator: String,
    pub multiply: String,
    pub divide: String,
    pub string_new: String,
    pub string_append: String,
    /// Function the bootstrap transfers control to.
    pub entry: String,
}

impl Default for Runtime {
    fn default() -> Self {
        Self {
            allocator: "Memory.alloc".into(),
            multiply: "Math.multiply".into(),
            divide: "Math.divide".into(),
            string_new: "String.new".into(),
            string_append: "String.appendChar".into(),
            entry: "Sys.init".into(),
        }
    }
}

/// Parse a configuration from its JSON text.
pub fn load_from_json(json: &str) -> Result<Config> {
    let config: Config =
        serde_json::from_str(json).map_err(|e| anyhow!("Failed to parse config JSON: {}", e))?;

    if config.stack_base == 0 {
        return Err(anyhow!("`stack_base` must be above the pointer registers"));
    }
    if config.stack_base > MAX_INT {
        return Err(anyhow!(
            "`stack_base` {} does not fit an address constant",
            config.stack_base
        ));
    }
    Ok(config)
}

/// Resolve the configuration for a build.
///
/// An explicit path must exist; otherwise `jackc.json` inside `source_dir`
/// is used when present, and the defaults when not.
pub fn load(explicit: Option<&Path>, source_dir: &Path) -> Result<Config> {
    let path = match explicit {
        Some(p) => p.to_path_buf(),
        None => {
            let candidate = source_dir.join(DEFAULT_FILE_NAME);
            if !candidate.is_file() {
                return Ok(Config::default());
            }
            candidate
        }
    };

    let json = std::fs::read_to_string(&path)
        .with_context(|| format!("Reading config {}", path.display()))?;
    load_from_json(&json).with_context(|| format!("Loading config {}", path.display()))
}
