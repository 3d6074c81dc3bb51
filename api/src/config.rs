use std::path::PathBuf;

use chrono::Duration;
use melvis_core::scoring::{Completeness, LEGACY_MAX_OPTION_INDEX, MaxScore, ScoringPolicy};
use melvis_core::session::DEFAULT_SESSION_TTL_HOURS;

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_CORS_ORIGINS: &str = "http://localhost:5173,http://localhost:3000";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("{var}={value:?} is invalid, expected {expected}")]
pub struct ConfigError {
    pub var: &'static str,
    pub value: String,
    pub expected: &'static str,
}

/// Runtime settings, read from the environment (after `.env` is loaded).
#[derive(Debug, Clone, PartialEq)]
pub struct ApiConfig {
    pub port: u16,
    pub cors_origins: Vec<String>,
    pub question_bank: Option<PathBuf>,
    pub scoring: ScoringPolicy,
    pub session_ttl: Duration,
}

impl ApiConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Unset or empty variables take their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let port = match get("PORT") {
            Some(raw) => raw.trim().parse::<u16>().map_err(|_| ConfigError {
                var: "PORT",
                value: raw,
                expected: "a TCP port number",
            })?,
            None => DEFAULT_PORT,
        };

        let cors_origins = get("MELVIS_CORS_ORIGINS")
            .unwrap_or_else(|| DEFAULT_CORS_ORIGINS.to_string())
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();

        let completeness = match get("MELVIS_SCORING_COMPLETENESS") {
            None => Completeness::Strict,
            Some(raw) => match raw.trim().to_lowercase().as_str() {
                "strict" => Completeness::Strict,
                "lenient" => Completeness::Lenient,
                _ => {
                    return Err(ConfigError {
                        var: "MELVIS_SCORING_COMPLETENESS",
                        value: raw,
                        expected: "strict or lenient",
                    });
                }
            },
        };

        let max_score = match get("MELVIS_SCORING_MAX") {
            None => MaxScore::PerQuestion,
            Some(raw) => match raw.trim().to_lowercase().as_str() {
                "per_question" => MaxScore::PerQuestion,
                "legacy" => MaxScore::Uniform(LEGACY_MAX_OPTION_INDEX),
                _ => {
                    return Err(ConfigError {
                        var: "MELVIS_SCORING_MAX",
                        value: raw,
                        expected: "per_question or legacy",
                    });
                }
            },
        };

        let session_ttl = match get("MELVIS_SESSION_TTL_HOURS") {
            Some(raw) => match raw.trim().parse::<i64>() {
                Ok(hours) if hours > 0 => Duration::hours(hours),
                _ => {
                    return Err(ConfigError {
                        var: "MELVIS_SESSION_TTL_HOURS",
                        value: raw,
                        expected: "a positive number of hours",
                    });
                }
            },
            None => Duration::hours(DEFAULT_SESSION_TTL_HOURS),
        };

        Ok(Self {
            port,
            cors_origins,
            question_bank: get("MELVIS_QUESTION_BANK").map(PathBuf::from),
            scoring: ScoringPolicy {
                completeness,
                max_score,
            },
            session_ttl,
        })
    }
}
