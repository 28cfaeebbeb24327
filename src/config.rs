//! Verifier launch configuration.
//!
//! The verifier command is resolved in priority order:
//! 1. `--config` JSON file
//! 2. `--verifier` CLI flag
//! 3. `PSTEP_VERIFIER` environment variable
//! 4. `verifier.json` in the user config directory
//! 5. the built-in `python -m deduckprover.vscode` default
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable holding a shell-style verifier command line.
pub(crate) const VERIFIER_ENV: &str = "PSTEP_VERIFIER";

const USER_CONFIG_REL: &str = "pstep/verifier.json";

/// How to spawn the external verifier process.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub(crate) struct VerifierConfig {
    /// Program followed by its arguments.
    pub(crate) command: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) working_dir: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub(crate) env: BTreeMap<String, String>,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            command: vec![
                "python".to_string(),
                "-m".to_string(),
                "deduckprover.vscode".to_string(),
            ],
            working_dir: None,
            env: BTreeMap::new(),
        }
    }
}

impl VerifierConfig {
    pub(crate) fn program(&self) -> &str {
        self.command.first().map(String::as_str).unwrap_or_default()
    }

    pub(crate) fn args(&self) -> &[String] {
        self.command.get(1..).unwrap_or_default()
    }
}

/// Resolve the launch configuration from CLI inputs and the environment.
pub(crate) fn resolve_config(
    config_path: Option<&Path>,
    verifier: Option<&str>,
) -> Result<VerifierConfig> {
    let config = if let Some(path) = config_path {
        load_config(path)?
    } else if let Some(raw) = verifier {
        from_command_line(raw).context("parse --verifier")?
    } else if let Ok(raw) = env::var(VERIFIER_ENV) {
        from_command_line(&raw).with_context(|| format!("parse {VERIFIER_ENV}"))?
    } else if let Some(path) = user_config_path().filter(|path| path.is_file()) {
        load_config(&path)?
    } else {
        VerifierConfig::default()
    };
    validate_config(&config)?;
    tracing::debug!(program = config.program(), "resolved verifier config");
    Ok(config)
}

/// Load a JSON launch config from disk.
pub(crate) fn load_config(path: &Path) -> Result<VerifierConfig> {
    let bytes = fs::read(path).with_context(|| format!("read config {}", path.display()))?;
    let config: VerifierConfig =
        serde_json::from_slice(&bytes).context("parse verifier config JSON")?;
    Ok(config)
}

/// Split a shell-style command line into a config with no extra settings.
pub(crate) fn from_command_line(raw: &str) -> Result<VerifierConfig> {
    let command =
        shell_words::split(raw).with_context(|| format!("split verifier command: {raw}"))?;
    Ok(VerifierConfig {
        command,
        ..VerifierConfig::default()
    })
}

/// Reject configs that cannot be spawned.
pub(crate) fn validate_config(config: &VerifierConfig) -> Result<()> {
    if config.command.is_empty() {
        return Err(anyhow!("verifier command is empty"));
    }
    if config.program().trim().is_empty() {
        return Err(anyhow!("verifier program name is empty"));
    }
    if let Some(dir) = &config.working_dir {
        if !dir.is_dir() {
            return Err(anyhow!(
                "verifier working_dir {} is not a directory",
                dir.display()
            ));
        }
    }
    Ok(())
}

fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(USER_CONFIG_REL))
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
