// Implementations for the leveling system.

// The in-memory store only backs tests; production always runs on SQLite.
#[cfg(test)]
pub mod in_memory;
pub mod sqlite_store;

// Re-export for convenience
#[cfg(test)]
pub use in_memory::InMemoryProgressionStore;
pub use sqlite_store::SqliteProgressionStore;
