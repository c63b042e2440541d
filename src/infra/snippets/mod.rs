pub mod sqlite_snippet_store;

pub use sqlite_snippet_store::SqliteSnippetStore;
