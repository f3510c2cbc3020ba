use super::error::{RestDaoError, RestResult};

/// Environment variable holding the base URL of the hosted backend.
pub const BACKEND_URL_ENV: &str = "TRIVIA_BACKEND_URL";
/// Environment variable holding the public (anon) API key of the hosted backend.
pub const BACKEND_KEY_ENV: &str = "TRIVIA_BACKEND_KEY";

/// Runtime configuration describing how to reach the hosted backend.
#[derive(Debug, Clone)]
pub struct RestConfig {
    /// Project URL, without the `/rest/v1` suffix.
    pub base_url: String,
    /// Key sent in the `apikey` header of every request.
    pub api_key: String,
}

impl RestConfig {
    /// Construct a configuration from an explicit URL and key.
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }

    /// Build a configuration by reading the expected environment variables.
    pub fn from_env() -> RestResult<Self> {
        let base_url = read_env(BACKEND_URL_ENV)?;
        let api_key = read_env(BACKEND_KEY_ENV)?;
        Ok(Self::new(base_url, api_key))
    }

    /// Whether the environment selects the hosted backend at all.
    pub fn is_configured() -> bool {
        std::env::var_os(BACKEND_URL_ENV).is_some_and(|value| !value.is_empty())
    }
}

fn read_env(var: &'static str) -> RestResult<String> {
    std::env::var(var)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .ok_or(RestDaoError::MissingEnvVar { var })
}
