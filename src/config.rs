// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Kernel configuration system

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// File picked up by [`KernelConfig::load`] from the working directory.
pub const CONFIG_FILE: &str = "procgeo.toml";

/// How the CLI prints statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown output format '{other}'")),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Json => write!(f, "json"),
        }
    }
}

/// Kernel configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KernelConfig {
    /// `env_logger` filter used when `RUST_LOG` is unset
    pub log_filter: String,
    /// Seed for operators whose `seed` parameter is not set
    pub default_seed: u64,
    /// Upper bound for Subdivide `levels`
    pub max_subdivision_levels: usize,
    pub output_format: OutputFormat,
    /// Show a progress bar while cooking pipelines
    pub progress: bool,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            log_filter: "info".to_string(),
            default_seed: 42,
            max_subdivision_levels: crate::sop::subdivide::MAX_LEVELS,
            output_format: OutputFormat::Text,
            progress: true,
        }
    }
}

impl KernelConfig {
    /// Load configuration from file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;
        let config: KernelConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path.as_ref()))?;
        Ok(config)
    }

    /// Load configuration with environment variable overrides
    pub fn load() -> Result<Self> {
        let mut config = if PathBuf::from(CONFIG_FILE).exists() {
            Self::from_file(CONFIG_FILE)?
        } else {
            Self::default()
        };
        config.apply_overrides(|name| std::env::var(name).ok());
        Ok(config)
    }

    /// Applies `PROCGEO_*` overrides from `lookup`; unparsable values are
    /// ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(filter) = lookup("PROCGEO_LOG") {
            self.log_filter = filter;
        }
        if let Some(seed) = lookup("PROCGEO_SEED").and_then(|s| s.parse().ok()) {
            self.default_seed = seed;
        }
        if let Some(levels) = lookup("PROCGEO_MAX_SUBDIV").and_then(|s| s.parse().ok()) {
            self.max_subdivision_levels = levels;
        }
        if let Some(format) = lookup("PROCGEO_FORMAT").and_then(|s| s.parse().ok()) {
            self.output_format = format;
        }
    }

    /// Save configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path.as_ref(), content)
            .with_context(|| format!("Failed to write config file: {:?}", path.as_ref()))?;
        Ok(())
    }

    /// Subdivide levels after the configured clamp.
    pub fn clamp_subdivision(&self, levels: usize) -> usize {
        levels.clamp(1, self.max_subdivision_levels.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = KernelConfig::default();
        assert_eq!(config.log_filter, "info");
        assert_eq!(config.default_seed, 42);
        assert_eq!(config.max_subdivision_levels, 10);
        assert_eq!(config.output_format, OutputFormat::Text);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: KernelConfig = toml::from_str("default_seed = 7\noutput_format = \"json\"").unwrap();
        assert_eq!(config.default_seed, 7);
        assert_eq!(config.output_format, OutputFormat::Json);
        assert_eq!(config.max_subdivision_levels, 10);
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("PROCGEO_LOG", "debug"),
            ("PROCGEO_SEED", "9"),
            ("PROCGEO_MAX_SUBDIV", "not a number"),
            ("PROCGEO_FORMAT", "JSON"),
        ]
        .into_iter()
        .collect();
        let mut config = KernelConfig::default();
        config.apply_overrides(|name| env.get(name).map(|v| v.to_string()));
        assert_eq!(config.log_filter, "debug");
        assert_eq!(config.default_seed, 9);
        assert_eq!(config.max_subdivision_levels, 10);
        assert_eq!(config.output_format, OutputFormat::Json);
    }

    #[test]
    fn test_clamp_subdivision() {
        let config = KernelConfig {
            max_subdivision_levels: 3,
            ..KernelConfig::default()
        };
        assert_eq!(config.clamp_subdivision(0), 1);
        assert_eq!(config.clamp_subdivision(8), 3);
    }
}
