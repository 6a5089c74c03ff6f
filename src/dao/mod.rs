/// Board-game catalog lookups.
pub mod catalog;
/// Database model definitions.
pub mod models;
/// Document storage for users, credentials and game sessions.
pub mod session_store;
/// Storage abstraction layer for database operations.
pub mod storage;
