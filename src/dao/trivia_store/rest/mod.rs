mod config;
mod error;
mod models;
mod store;

pub use config::RestConfig;
pub use error::RestDaoError;
pub use store::RestTriviaStore;

use crate::dao::storage::StorageError;

impl From<RestDaoError> for StorageError {
    fn from(err: RestDaoError) -> Self {
        match err {
            RestDaoError::InvalidRow { .. } => StorageError::invalid_record(err.to_string()),
            other => StorageError::unavailable(other.to_string(), other),
        }
    }
}
