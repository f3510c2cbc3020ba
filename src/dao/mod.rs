/// Database model definitions.
pub mod models;
/// Storage abstraction layer for backend operations.
pub mod storage;
/// Question, score, leaderboard and identity backends.
pub mod trivia_store;
