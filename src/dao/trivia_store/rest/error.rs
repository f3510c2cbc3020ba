//! Error types shared by the hosted backend implementation.

use reqwest::StatusCode;
use thiserror::Error;

/// Convenient result alias returning [`RestDaoError`] failures.
pub type RestResult<T> = Result<T, RestDaoError>;

/// Failures that can occur while talking to the hosted backend.
#[derive(Debug, Error)]
pub enum RestDaoError {
    /// Required environment variable is missing.
    #[error("missing hosted backend environment variable `{var}`")]
    MissingEnvVar {
        /// Name of the variable.
        var: &'static str,
    },
    /// Building the HTTP client failed (invalid TLS setup, etc).
    #[error("failed to build hosted backend client")]
    ClientBuilder {
        /// Underlying client error.
        #[source]
        source: reqwest::Error,
    },
    /// A request could not be sent.
    #[error("failed to send hosted backend request to `{path}`")]
    RequestSend {
        /// Endpoint path.
        path: String,
        /// Underlying transport error.
        #[source]
        source: reqwest::Error,
    },
    /// The backend answered with an unexpected status code.
    #[error("unexpected hosted backend response status {status} for `{path}`")]
    RequestStatus {
        /// Endpoint path.
        path: String,
        /// Status returned.
        status: StatusCode,
    },
    /// Response payload could not be parsed into the expected rows.
    #[error("failed to decode hosted backend response for `{path}`")]
    DecodeResponse {
        /// Endpoint path.
        path: String,
        /// Underlying decode error.
        #[source]
        source: reqwest::Error,
    },
    /// A row decoded but holds a value outside the domain.
    #[error("invalid row from `{path}`: {reason}")]
    InvalidRow {
        /// Endpoint path.
        path: String,
        /// What was wrong with the row.
        reason: String,
    },
}
