// SPDX-License-Identifier: GPL-3.0-or-later
use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] figment::Error),

    #[error("invalid configuration: {}", .0.join("; "))]
    Invalid(Vec<String>),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    pub base_url: String,
    pub access_token: Option<String>,
    pub timeout_secs: u64,
    pub requests_per_second: u32,
    pub max_retries: u32,
    pub base_delay_ms: u64,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.spotify.com/v1".to_string(),
            access_token: None,
            timeout_secs: 30,
            requests_per_second: 10,
            max_retries: 5,
            base_delay_ms: 500,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchingConfig {
    pub confidence_threshold: f64,
    pub candidate_limit: u32,
    pub strict_duration_tolerance_secs: u32,
    pub loose_duration_tolerance_secs: u32,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.85,
            candidate_limit: 10,
            strict_duration_tolerance_secs: 5,
            loose_duration_tolerance_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankingConfig {
    pub top_n: usize,
    /// Upload window in months ending with the label month; 0 disables the filter.
    pub eligibility_months: u32,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            top_n: 100,
            eligibility_months: 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LibraryConfig {
    pub root: Option<PathBuf>,
    /// Maximum number of files to process; 0 means no limit.
    pub process_limit: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    pub output_dir: PathBuf,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("reports"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    pub log_level: String,
    pub format: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            format: "text".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    pub catalog: CatalogConfig,
    pub matching: MatchingConfig,
    pub ranking: RankingConfig,
    pub library: LibraryConfig,
    pub report: ReportConfig,
    pub telemetry: TelemetryConfig,
}

impl AppConfig {
    /// Check every value the engine depends on and report all problems at once.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        let threshold = self.matching.confidence_threshold;
        if !threshold.is_finite() || !(0.0..=1.0).contains(&threshold) {
            errors.push(format!(
                "matching.confidence_threshold must be between 0 and 1 (got {threshold})"
            ));
        }
        if self.matching.candidate_limit == 0 {
            errors.push("matching.candidate_limit must be at least 1".to_string());
        }
        if self.matching.loose_duration_tolerance_secs < self.matching.strict_duration_tolerance_secs
        {
            errors.push(
                "matching.loose_duration_tolerance_secs must not be below the strict tolerance"
                    .to_string(),
            );
        }
        if self.ranking.top_n == 0 {
            errors.push("ranking.top_n must be at least 1".to_string());
        }
        if self.catalog.requests_per_second == 0 {
            errors.push("catalog.requests_per_second must be at least 1".to_string());
        }
        if self.catalog.max_retries == 0 {
            errors.push("catalog.max_retries must be at least 1".to_string());
        }
        match &self.library.root {
            None => errors.push("library.root is required".to_string()),
            Some(root) if !root.is_dir() => {
                errors.push(format!("library.root does not exist: {}", root.display()))
            }
            Some(_) => {}
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid(errors))
        }
    }
}

/// Load configuration from defaults, optional TOML file, and environment overrides (prefix: TOP100_).
pub fn load(config_path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let mut figment = Figment::from(Serialized::defaults(AppConfig::default()));

    if let Some(path) = config_path {
        figment = figment.merge(Toml::file(path));
    }

    figment = figment.merge(Env::prefixed("TOP100_").split("__"));

    let config: AppConfig = figment.extract()?;
    info!(target: "config", "configuration loaded");
    Ok(config)
}
