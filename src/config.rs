//! Application-level configuration loading: round timing, leaderboard size, score policy.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use serde_with::{DurationSeconds, serde_as};
use tracing::{info, warn};

use crate::{dao::models::ScorePolicy, state::round::DEFAULT_QUESTION_TIME_SECS};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "WEEKLY_BLITZ_CONFIG_PATH";

const DEFAULT_LEADERBOARD_LIMIT: usize = 10;
const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_SESSION_IDLE_TIMEOUT: Duration = Duration::from_secs(30 * 60);

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    question_time_secs: u32,
    leaderboard_limit: usize,
    score_policy: ScorePolicy,
    score_submit_retries: u32,
    fetch_timeout: Duration,
    session_idle_timeout: Duration,
    seed_path: Option<PathBuf>,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let app_config: Self = raw.into();
                    info!(
                        path = %path.display(),
                        question_time_secs = app_config.question_time_secs,
                        score_policy = ?app_config.score_policy,
                        "loaded configuration"
                    );
                    app_config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    /// Seconds allowed per question.
    pub fn question_time_secs(&self) -> u32 {
        self.question_time_secs
    }

    /// Number of rows returned by the leaderboard.
    pub fn leaderboard_limit(&self) -> usize {
        self.leaderboard_limit
    }

    /// Merge policy of the in-memory score sink.
    pub fn score_policy(&self) -> ScorePolicy {
        self.score_policy
    }

    /// Extra attempts made when a score submission fails. Zero means fire once.
    pub fn score_submit_retries(&self) -> u32 {
        self.score_submit_retries
    }

    /// Upper bound on a question fetch before it counts as failed.
    pub fn fetch_timeout(&self) -> Duration {
        self.fetch_timeout
    }

    /// Inactivity after which a play session is discarded.
    pub fn session_idle_timeout(&self) -> Duration {
        self.session_idle_timeout
    }

    /// Optional JSON seed for the in-memory backend.
    pub fn seed_path(&self) -> Option<&PathBuf> {
        self.seed_path.as_ref()
    }

    /// Override the time allowed per question.
    pub fn with_question_time(mut self, secs: u32) -> Self {
        self.question_time_secs = secs.max(1);
        self
    }

    /// Override the number of retries for score submissions.
    pub fn with_score_submit_retries(mut self, retries: u32) -> Self {
        self.score_submit_retries = retries;
        self
    }

    /// Override the fetch timeout.
    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    /// Override the session idle timeout.
    pub fn with_session_idle_timeout(mut self, timeout: Duration) -> Self {
        self.session_idle_timeout = timeout;
        self
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            question_time_secs: DEFAULT_QUESTION_TIME_SECS,
            leaderboard_limit: DEFAULT_LEADERBOARD_LIMIT,
            score_policy: ScorePolicy::default(),
            score_submit_retries: 0,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            session_idle_timeout: DEFAULT_SESSION_IDLE_TIMEOUT,
            seed_path: None,
        }
    }
}

#[serde_as]
#[derive(Debug, Default, Deserialize)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    #[serde(default)]
    question_time_secs: Option<u32>,
    #[serde(default)]
    leaderboard_limit: Option<usize>,
    #[serde(default)]
    score_policy: Option<ScorePolicy>,
    #[serde(default)]
    score_submit_retries: Option<u32>,
    #[serde_as(as = "Option<DurationSeconds<u64>>")]
    fetch_timeout_secs: Option<Duration>,
    #[serde_as(as = "Option<DurationSeconds<u64>>")]
    session_idle_timeout_secs: Option<Duration>,
    #[serde(default)]
    seed_path: Option<PathBuf>,
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        let defaults = AppConfig::default();
        Self {
            question_time_secs: value
                .question_time_secs
                .filter(|secs| *secs > 0)
                .unwrap_or(defaults.question_time_secs),
            leaderboard_limit: value
                .leaderboard_limit
                .filter(|limit| *limit > 0)
                .unwrap_or(defaults.leaderboard_limit),
            score_policy: value.score_policy.unwrap_or(defaults.score_policy),
            score_submit_retries: value
                .score_submit_retries
                .unwrap_or(defaults.score_submit_retries),
            fetch_timeout: value.fetch_timeout_secs.unwrap_or(defaults.fetch_timeout),
            session_idle_timeout: value
                .session_idle_timeout_secs
                .unwrap_or(defaults.session_idle_timeout),
            seed_path: value.seed_path,
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_defaults() {
        let raw: RawConfig = serde_json::from_str("{}").unwrap();
        let config = AppConfig::from(raw);
        assert_eq!(config.question_time_secs(), 20);
        assert_eq!(config.leaderboard_limit(), 10);
        assert_eq!(config.score_policy(), ScorePolicy::Overwrite);
        assert_eq!(config.score_submit_retries(), 0);
        assert_eq!(config.fetch_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn file_values_override_defaults() {
        let raw: RawConfig = serde_json::from_str(
            r#"{
                "question_time_secs": 30,
                "leaderboard_limit": 25,
                "score_policy": "keep_best",
                "score_submit_retries": 2,
                "fetch_timeout_secs": 9,
                "session_idle_timeout_secs": 60,
                "seed_path": "config/questions.json"
            }"#,
        )
        .unwrap();
        let config = AppConfig::from(raw);
        assert_eq!(config.question_time_secs(), 30);
        assert_eq!(config.leaderboard_limit(), 25);
        assert_eq!(config.score_policy(), ScorePolicy::KeepBest);
        assert_eq!(config.score_submit_retries(), 2);
        assert_eq!(config.fetch_timeout(), Duration::from_secs(9));
        assert_eq!(config.session_idle_timeout(), Duration::from_secs(60));
        assert_eq!(
            config.seed_path(),
            Some(&PathBuf::from("config/questions.json"))
        );
    }

    #[test]
    fn zero_values_are_ignored() {
        let raw: RawConfig =
            serde_json::from_str(r#"{"question_time_secs": 0, "leaderboard_limit": 0}"#).unwrap();
        let config = AppConfig::from(raw);
        assert_eq!(config.question_time_secs(), 20);
        assert_eq!(config.leaderboard_limit(), 10);
    }
}
