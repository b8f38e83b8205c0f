//! Configuration management for joyhub
//!
//! Handles loading, parsing and validation of the YAML configuration file.
//! Every field has a default, so an empty file is a valid configuration.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::fs;

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub joystick: JoystickConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Joystick engine configuration
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct JoystickConfig {
    /// Number of device slots
    #[serde(default = "default_slot_count")]
    pub slot_count: usize,

    /// Interval between internally generated ticks
    #[serde(default = "default_tick_interval")]
    pub tick_interval_ms: u64,

    #[serde(default)]
    pub connect_policy: ConnectPolicy,

    #[serde(default)]
    pub poll_index_policy: PollIndexPolicy,

    /// Generate ticks inside the dispatch loop instead of waiting for the
    /// event source to send them
    #[serde(default = "default_true")]
    pub internal_ticks: bool,
}

impl Default for JoystickConfig {
    fn default() -> Self {
        Self {
            slot_count: default_slot_count(),
            tick_interval_ms: default_tick_interval(),
            connect_policy: ConnectPolicy::default(),
            poll_index_policy: PollIndexPolicy::default(),
            internal_ticks: default_true(),
        }
    }
}

/// When a report-backed slot starts reporting `connected`
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ConnectPolicy {
    /// After the first report decodes successfully
    #[default]
    OnFirstReport,
    /// As soon as the device arrives
    OnArrival,
}

/// How poll indices are handed to poll-backed devices
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PollIndexPolicy {
    /// Lowest index not held by another poll-backed slot
    #[default]
    FirstFree,
    /// Count of poll-backed slots below the new slot; may collide
    Legacy,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Directory for daily rolling log files; console only when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directory: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            directory: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from file with validation
    pub async fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file: {}", path))?;

        let config: AppConfig = if contents.trim().is_empty() {
            AppConfig::default()
        } else {
            serde_yaml::from_str(&contents)
                .with_context(|| format!("Failed to parse YAML config: {}", path))?
        };

        config.validate()?;

        Ok(config)
    }

    /// Save configuration to file
    pub async fn save(&self, path: &str) -> Result<()> {
        let yaml = serde_yaml::to_string(self).context("Failed to serialize config to YAML")?;

        fs::write(path, yaml)
            .await
            .with_context(|| format!("Failed to write config file: {}", path))?;

        Ok(())
    }

    /// Validate configuration for correctness and consistency
    pub fn validate(&self) -> Result<()> {
        self.joystick.validate().context("Invalid joystick configuration")?;

        match self.logging.level.to_ascii_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" | "off" => {}
            other => anyhow::bail!(
                "Unknown log level '{}' (expected trace, debug, info, warn, error or off)",
                other
            ),
        }

        Ok(())
    }
}

impl JoystickConfig {
    pub fn validate(&self) -> Result<()> {
        if !(1..=16).contains(&self.slot_count) {
            anyhow::bail!("slot_count {} is invalid (must be 1-16)", self.slot_count);
        }
        if !(1..=1000).contains(&self.tick_interval_ms) {
            anyhow::bail!(
                "tick_interval_ms {} is invalid (must be 1-1000)",
                self.tick_interval_ms
            );
        }
        Ok(())
    }
}

// Default value functions
fn default_slot_count() -> usize { 8 }
fn default_tick_interval() -> u64 { 8 }
fn default_true() -> bool { true }
fn default_log_level() -> String { "info".to_string() }
