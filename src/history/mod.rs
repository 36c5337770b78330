//! Generation history persistence.

pub mod store;

pub use store::{Generation, GenerationOutput, HistoryStore, NewGeneration, SqliteHistoryStore};
