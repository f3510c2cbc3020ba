mod seed;
mod store;

pub use seed::{MemorySeed, SeedUser};
pub use store::MemoryTriviaStore;
