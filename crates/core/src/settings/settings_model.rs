//! Engine configuration.

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::constants::{DEFAULT_CHUNK_SIZE, DEFAULT_MAX_CONCURRENT_ACCOUNTS};
use crate::errors::{Error, Result, ValidationError};
use crate::utils::time_utils::{parse_valuation_tz, DEFAULT_VALUATION_TZ};

/// How `AutoImportOperation::performance` is derived from an operation's totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PerformanceMethod {
    /// Realized / CapitalDeployed × 100
    #[default]
    ReturnOnCapitalDeployed,
    /// Realized / |Premium| × 100
    ReturnOnPremium,
}

impl PerformanceMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PerformanceMethod::ReturnOnCapitalDeployed => "RETURN_ON_CAPITAL_DEPLOYED",
            PerformanceMethod::ReturnOnPremium => "RETURN_ON_PREMIUM",
        }
    }
}

impl FromStr for PerformanceMethod {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "RETURN_ON_CAPITAL_DEPLOYED" | "CAPITAL" => Ok(PerformanceMethod::ReturnOnCapitalDeployed),
            "RETURN_ON_PREMIUM" | "PREMIUM" => Ok(PerformanceMethod::ReturnOnPremium),
            other => Err(format!("Unknown performance method: {}", other)),
        }
    }
}

/// Tunables of the aggregation engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineSettings {
    /// Movements fetched and folded per batch. Bounds peak memory.
    pub chunk_size: usize,
    /// Accounts processed in parallel.
    pub max_concurrent_accounts: usize,
    /// Timezone whose calendar days delimit snapshots.
    pub valuation_timezone: Tz,
    pub performance_method: PerformanceMethod,
}

impl Default for EngineSettings {
    fn default() -> Self {
        EngineSettings {
            chunk_size: DEFAULT_CHUNK_SIZE,
            max_concurrent_accounts: DEFAULT_MAX_CONCURRENT_ACCOUNTS,
            valuation_timezone: DEFAULT_VALUATION_TZ,
            performance_method: PerformanceMethod::default(),
        }
    }
}

impl EngineSettings {
    /// Reads `TL_CHUNK_SIZE`, `TL_MAX_CONCURRENT_ACCOUNTS`, `TL_VALUATION_TZ` and
    /// `TL_OPERATION_PERFORMANCE`, falling back to defaults for unset keys.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`EngineSettings::from_env`] with an injectable key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = EngineSettings::default();

        if let Some(raw) = lookup("TL_CHUNK_SIZE") {
            settings.chunk_size = raw
                .trim()
                .parse::<usize>()
                .map_err(ValidationError::NumberParse)?;
        }
        if let Some(raw) = lookup("TL_MAX_CONCURRENT_ACCOUNTS") {
            settings.max_concurrent_accounts = raw
                .trim()
                .parse::<usize>()
                .map_err(ValidationError::NumberParse)?;
        }
        if let Some(raw) = lookup("TL_VALUATION_TZ") {
            settings.valuation_timezone = parse_valuation_tz(&raw).ok_or_else(|| {
                Error::InvalidConfigValue(format!("TL_VALUATION_TZ: unknown timezone '{}'", raw))
            })?;
        }
        if let Some(raw) = lookup("TL_OPERATION_PERFORMANCE") {
            settings.performance_method = raw
                .parse::<PerformanceMethod>()
                .map_err(|e| Error::InvalidConfigValue(format!("TL_OPERATION_PERFORMANCE: {}", e)))?;
        }

        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(Error::InvalidConfigValue(
                "chunk_size must be greater than zero".to_string(),
            ));
        }
        if self.max_concurrent_accounts == 0 {
            return Err(Error::InvalidConfigValue(
                "max_concurrent_accounts must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
